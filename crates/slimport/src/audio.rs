//! Audio enablement.
//!
//! Audio is unmuted only after both the clock-regeneration (CTS) and the
//! audio-sample interrupts have been seen on two consecutive ticks. A
//! single tick with only one of them, or with neither, starts the count
//! over.

use embedded_hal::delay::DelayNs;
use platform::Hardware;

use crate::infoframe::{self, InfoFrameKind};
use crate::registers::{rx_p0, tx_p2};
use crate::session::Ctx;
use crate::state::Outcome;
use crate::Result;

/// Ticks on which both signals must agree.
pub const AGREEMENT_TICKS: u8 = 2;

/// IEC 60958 channel-status bytes copied to the transmitter.
const CH_STATUS_LEN: usize = 5;

/// Audio output sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AudioOutputState {
    /// Mute and start watching the input.
    #[default]
    Init,
    /// Counting ticks on which both interrupts fired.
    WaitInterrupts,
    /// Audio unmuted.
    Finish,
}

/// Audio output configurator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AudioOutput {
    state: AudioOutputState,
    cts_seen: bool,
    samples_seen: bool,
    agree: u8,
}

impl AudioOutput {
    /// Current sub-state.
    #[must_use]
    pub const fn state(&self) -> AudioOutputState {
        self.state
    }

    /// Back to `Init`.
    pub fn restart(&mut self) {
        *self = Self::default();
    }

    /// CTS packet interrupt.
    pub(crate) fn on_cts_received(&mut self) {
        self.cts_seen = true;
    }

    /// Audio sample interrupt.
    pub(crate) fn on_audio_received(&mut self) {
        self.samples_seen = true;
    }

    /// Run as many sub-states as complete immediately.
    pub(crate) fn step<H: Hardware, D: DelayNs>(
        &mut self,
        ctx: &mut Ctx<'_, H, D>,
        hdmi_input: bool,
    ) -> Result<Outcome> {
        loop {
            match self.state {
                AudioOutputState::Init => {
                    if !hdmi_input {
                        info!("DVI input, no audio");
                        self.state = AudioOutputState::Finish;
                        return Ok(Outcome::Advance);
                    }
                    mute(ctx.hw)?;
                    ctx.hw.clear_bits(tx_p2::DEV, tx_p2::POWERD_CTRL, tx_p2::AUDIO_PD)?;
                    self.agree = 0;
                    self.state = AudioOutputState::WaitInterrupts;
                }
                AudioOutputState::WaitInterrupts => {
                    if self.cts_seen && self.samples_seen {
                        self.agree = self.agree.saturating_add(1);
                    } else {
                        if self.agree > 0 {
                            debug!("audio interrupts disagreed, restarting count");
                        }
                        self.agree = 0;
                    }
                    self.cts_seen = false;
                    self.samples_seen = false;

                    if self.agree < AGREEMENT_TICKS {
                        return Ok(Outcome::Continue);
                    }
                    enable(ctx.hw)?;
                    self.state = AudioOutputState::Finish;
                    info!("audio output on");
                    return Ok(Outcome::Advance);
                }
                AudioOutputState::Finish => return Ok(Outcome::Advance),
            }
        }
    }
}

fn enable<H: Hardware>(hw: &mut H) -> Result<()> {
    let mut status = [0u8; CH_STATUS_LEN];
    for (offset, byte) in (rx_p0::AUD_CH_STATUS_0..).zip(status.iter_mut()) {
        *byte = hw.read(rx_p0::DEV, offset)?;
    }
    for (offset, byte) in (tx_p2::AUD_CH_STATUS_0..).zip(status) {
        hw.write(tx_p2::DEV, offset, byte)?;
    }
    infoframe::forward(hw, InfoFrameKind::Audio)?;
    hw.set_bits(tx_p2::DEV, tx_p2::AUD_CTRL, tx_p2::AUD_EN)?;
    hw.clear_bits(tx_p2::DEV, tx_p2::AUD_CTRL, tx_p2::AUD_MUTE)?;
    Ok(())
}

/// Mute audio.
pub(crate) fn mute<H: Hardware>(hw: &mut H) -> Result<()> {
    hw.set_bits(tx_p2::DEV, tx_p2::AUD_CTRL, tx_p2::AUD_MUTE)?;
    Ok(())
}
