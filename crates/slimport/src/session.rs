//! Per-connection state.
//!
//! Every sub-machine, counter and negotiated value that belongs to one
//! connection lives in [`Session`]. A hardware reset replaces the whole
//! session with a fresh default; nothing is cleared field by field.

use crate::audio::AudioOutput;
use crate::config::BridgeConfig;
use crate::detect::{CableType, SinkInfo};
use crate::hdcp::HdcpAuth;
use crate::link::{LinkBandwidth, LinkTrainer};
use crate::video::VideoOutput;

/// What a sub-machine step may touch: the hardware, a delay provider for
/// the short settle times the chip requires, and the configuration.
pub(crate) struct Ctx<'a, H, D> {
    pub hw: &'a mut H,
    pub delay: &'a mut D,
    pub config: &'a BridgeConfig,
}

/// State of the current connection.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub(crate) cable: CableType,
    pub(crate) sink: SinkInfo,
    pub(crate) bw_hint: Option<LinkBandwidth>,
    pub(crate) aux_failures: u8,
    pub(crate) link: LinkTrainer,
    pub(crate) hdcp: HdcpAuth,
    pub(crate) video: VideoOutput,
    pub(crate) audio: AudioOutput,
}

impl Session {
    /// Classified cable.
    #[must_use]
    pub fn cable(&self) -> CableType {
        self.cable
    }

    /// Sink capabilities captured at classification.
    #[must_use]
    pub fn sink(&self) -> &SinkInfo {
        &self.sink
    }

    /// Rate suggested by the EDID or by the video configurator.
    #[must_use]
    pub fn bandwidth_hint(&self) -> Option<LinkBandwidth> {
        self.bw_hint
    }

    /// Consecutive AUX failures.
    #[must_use]
    pub fn aux_failures(&self) -> u8 {
        self.aux_failures
    }

    /// Link trainer.
    #[must_use]
    pub fn link(&self) -> &LinkTrainer {
        &self.link
    }

    /// HDCP authenticator.
    #[must_use]
    pub fn hdcp(&self) -> &HdcpAuth {
        &self.hdcp
    }

    /// Video configurator.
    #[must_use]
    pub fn video(&self) -> &VideoOutput {
        &self.video
    }

    /// Audio configurator.
    #[must_use]
    pub fn audio(&self) -> &AudioOutput {
        &self.audio
    }
}
