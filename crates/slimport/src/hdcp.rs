//! HDCP authentication.
//!
//! ```text
//! CapableCheck ─┬→ WaitingVidStb → HwEnable → WaitingFinish ─┬→ Finish
//!               │        ↑                                   └→ Failed
//!               │        └──────────── (under threshold) ────────┘
//!               └→ NotSupport
//! ```
//!
//! Authentication itself runs in the transmitter's HDCP engine. This module
//! arms it, waits for the authentication-done interrupt and decides what to
//! do with the verdict. The failure counter survives local restarts; only a
//! hardware reset (fresh session) clears it.

use embedded_hal::delay::DelayNs;
use platform::Hardware;

use crate::detect::CableType;
use crate::dpcd;
use crate::registers::{rx_p0, tx_p0, tx_p2};
use crate::session::Ctx;
use crate::state::Outcome;
use crate::Result;

/// HDCP sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HdcpState {
    /// Decide whether to authenticate at all.
    #[default]
    CapableCheck,
    /// Wait for the downstream converter to display video.
    WaitingVidStb,
    /// Arm hardware authentication.
    HwEnable,
    /// Waiting for the authentication-done interrupt.
    WaitingFinish,
    /// Authenticated; turn encryption on.
    Finish,
    /// Authentication failed.
    Failed,
    /// Not authenticating for this connection.
    NotSupport,
}

/// Why HDCP is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NotSupportReason {
    /// Policy disables enforcement for this cable type.
    SourceDisabled,
    /// The sink does not advertise HDCP.
    SinkIncapable,
}

/// Outcome of the capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CapableDecision {
    /// Go on to authenticate.
    Proceed,
    /// Skip authentication.
    NotSupport(NotSupportReason),
}

/// Decide whether to authenticate.
///
/// Enforcement can only be switched off for converter cables; a native
/// DisplayPort sink is always authenticated when it is capable.
#[must_use]
pub fn capable_check(hdcp_enforced: bool, cable: CableType, sink_capable: bool) -> CapableDecision {
    if !hdcp_enforced && cable != CableType::DisplayPort {
        CapableDecision::NotSupport(NotSupportReason::SourceDisabled)
    } else if !sink_capable {
        CapableDecision::NotSupport(NotSupportReason::SinkIncapable)
    } else {
        CapableDecision::Proceed
    }
}

/// BINFO reports a topology the repeater cannot carry.
#[must_use]
pub fn topology_exceeded(binfo: [u8; 2]) -> bool {
    let [devices, depth] = binfo;
    devices & dpcd::BINFO_MAX_DEVS_EXCEEDED != 0 || depth & dpcd::BINFO_MAX_CASCADE_EXCEEDED != 0
}

/// HDCP authenticator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HdcpAuth {
    state: HdcpState,
    fail_count: u8,
    wait_ticks: u8,
    encrypted: bool,
    topology_limited: bool,
    not_supported: Option<NotSupportReason>,
}

impl HdcpAuth {
    /// Current sub-state.
    #[must_use]
    pub const fn state(&self) -> HdcpState {
        self.state
    }

    /// Failures since the last hardware reset.
    #[must_use]
    pub const fn fail_count(&self) -> u8 {
        self.fail_count
    }

    /// Link encryption is on.
    #[must_use]
    pub const fn encryption_enabled(&self) -> bool {
        self.encrypted
    }

    /// Authentication passed but the repeater topology is over its limit.
    #[must_use]
    pub const fn topology_limited(&self) -> bool {
        self.topology_limited
    }

    /// Why authentication was skipped, if it was.
    #[must_use]
    pub const fn not_supported(&self) -> Option<NotSupportReason> {
        self.not_supported
    }

    /// Back to `CapableCheck`, keeping the failure counter.
    pub fn restart(&mut self) {
        *self = Self {
            fail_count: self.fail_count,
            ..Self::default()
        };
    }

    /// Authentication-done interrupt: read the engine's verdict.
    pub(crate) fn on_auth_done<H: Hardware>(&mut self, hw: &mut H) -> Result<()> {
        if self.state != HdcpState::WaitingFinish {
            debug!("auth-done in {:?}, ignored", self.state);
            return Ok(());
        }
        let status = hw.read(tx_p0::DEV, tx_p0::HDCP_STATUS)?;
        if status & tx_p0::HDCP_AUTH_PASS == 0 || status & tx_p0::HDCP_AUTH_FAIL != 0 {
            warn!("HDCP authentication failed, status {:#x}", status);
            self.state = HdcpState::Failed;
            return Ok(());
        }

        let mut binfo = [0u8; 2];
        hw.aux_read(dpcd::BINFO, &mut binfo)?;
        if topology_exceeded(binfo) {
            warn!("HDCP passed but repeater topology exceeded, encryption stays off");
            self.topology_limited = true;
        }
        self.state = HdcpState::Finish;
        Ok(())
    }

    /// Link-integrity failure reported after authentication.
    pub(crate) fn on_link_check_failed(&mut self) {
        warn!("HDCP link integrity lost in {:?}", self.state);
        self.state = HdcpState::Failed;
    }

    /// Run as many sub-states as complete immediately.
    pub(crate) fn step<H: Hardware, D: DelayNs>(
        &mut self,
        ctx: &mut Ctx<'_, H, D>,
        cable: CableType,
    ) -> Result<Outcome> {
        loop {
            match self.state {
                HdcpState::CapableCheck => {
                    let bcaps = ctx.hw.aux_read_byte(dpcd::BCAPS)?;
                    let capable = bcaps & dpcd::BCAPS_HDCP_CAPABLE != 0;
                    match capable_check(ctx.config.policy.hdcp_enforced, cable, capable) {
                        CapableDecision::Proceed => {
                            if bcaps & dpcd::BCAPS_REPEATER != 0 {
                                debug!("sink is an HDCP repeater");
                            }
                            self.state = HdcpState::WaitingVidStb;
                        }
                        CapableDecision::NotSupport(reason) => {
                            info!("HDCP not used: {:?}", reason);
                            self.not_supported = Some(reason);
                            self.state = HdcpState::NotSupport;
                        }
                    }
                }
                HdcpState::WaitingVidStb => {
                    if cable == CableType::HdmiConverter && !wait_video_ready(ctx)? {
                        error!(
                            "downstream video not ready after {} polls",
                            ctx.config.retry.hdcp_vid_stable_polls
                        );
                        return Ok(Outcome::Fatal);
                    }
                    self.state = HdcpState::HwEnable;
                }
                HdcpState::HwEnable => {
                    arm(ctx)?;
                    self.wait_ticks = 0;
                    self.state = HdcpState::WaitingFinish;
                    return Ok(Outcome::Continue);
                }
                HdcpState::WaitingFinish => {
                    self.wait_ticks = self.wait_ticks.saturating_add(1);
                    if self.wait_ticks <= ctx.config.retry.hdcp_finish_ticks {
                        return Ok(Outcome::Continue);
                    }
                    warn!("no auth-done interrupt after {} ticks", self.wait_ticks);
                    self.state = HdcpState::Failed;
                }
                HdcpState::Finish => {
                    if self.topology_limited {
                        disable_encryption(ctx.hw)?;
                        ctx.hw.set_bits(tx_p2::DEV, tx_p2::VID_CTRL1, tx_p2::VIDEO_MUTE)?;
                        self.encrypted = false;
                    } else {
                        ctx.hw.set_bits(tx_p0::DEV, tx_p0::HDCP_CTRL0, tx_p0::ENC_EN)?;
                        ctx.hw.clear_bits(tx_p2::DEV, tx_p2::VID_CTRL1, tx_p2::VIDEO_MUTE)?;
                        self.encrypted = true;
                        info!("HDCP authenticated, encryption on");
                    }
                    self.fail_count = 0;
                    return Ok(Outcome::Advance);
                }
                HdcpState::Failed => {
                    self.fail_count = self.fail_count.saturating_add(1);
                    self.encrypted = false;
                    if self.fail_count > ctx.config.retry.hdcp_fail_threshold {
                        error!("HDCP failed {} times, resetting hardware", self.fail_count);
                        return Ok(Outcome::Fatal);
                    }
                    warn!("HDCP failure {}, re-authenticating", self.fail_count);
                    ctx.hw.clear_bits(
                        tx_p0::DEV,
                        tx_p0::HDCP_CTRL0,
                        tx_p0::HARD_AUTH_EN | tx_p0::ENC_EN,
                    )?;
                    self.state = HdcpState::WaitingVidStb;
                }
                HdcpState::NotSupport => {
                    let input_protected =
                        ctx.hw.read(rx_p0::DEV, rx_p0::HDCP_STATUS)? & rx_p0::ENCRYPTED != 0;
                    if self.not_supported == Some(NotSupportReason::SinkIncapable) && input_protected {
                        warn!("protected input to a non-HDCP sink, video blocked");
                        ctx.hw.set_bits(tx_p2::DEV, tx_p2::VID_CTRL1, tx_p2::VIDEO_MUTE)?;
                    } else {
                        ctx.hw.clear_bits(tx_p2::DEV, tx_p2::VID_CTRL1, tx_p2::VIDEO_MUTE)?;
                    }
                    return Ok(Outcome::Advance);
                }
            }
        }
    }
}

/// Poll the converter's video-ready bit with the configured bound.
fn wait_video_ready<H: Hardware, D: DelayNs>(ctx: &mut Ctx<'_, H, D>) -> Result<bool> {
    for _ in 0..ctx.config.retry.hdcp_vid_stable_polls {
        let status = ctx.hw.aux_read_byte(dpcd::CONVERTER_STATUS)?;
        if status & dpcd::DOWNSTREAM_VIDEO_READY != 0 {
            return Ok(true);
        }
        ctx.delay.delay_ms(ctx.config.retry.hdcp_vid_stable_delay_ms);
    }
    Ok(false)
}

fn arm<H: Hardware, D: DelayNs>(ctx: &mut Ctx<'_, H, D>) -> Result<()> {
    ctx.hw.set_bits(tx_p2::DEV, tx_p2::VID_CTRL1, tx_p2::VIDEO_MUTE)?;
    ctx.hw.clear_bits(tx_p2::DEV, tx_p2::POWERD_CTRL, tx_p2::HDCP_PD)?;
    ctx.hw.write(tx_p0::DEV, tx_p0::HDCP_R0_TIMER, ctx.config.tuning.hdcp_r0_timer)?;
    ctx.hw.write(tx_p0::DEV, tx_p0::HDCP_KSV_TIMER, ctx.config.tuning.hdcp_ksv_timer)?;
    debug!("arming hardware HDCP authentication");
    // The engine starts on a rising edge of HARD_AUTH_EN.
    ctx.hw.write(tx_p0::DEV, tx_p0::HDCP_CTRL0, 0)?;
    ctx.hw.write(tx_p0::DEV, tx_p0::HDCP_CTRL0, tx_p0::HARD_AUTH_EN)?;
    Ok(())
}

/// Turn link encryption off.
pub(crate) fn disable_encryption<H: Hardware>(hw: &mut H) -> Result<()> {
    hw.clear_bits(tx_p0::DEV, tx_p0::HDCP_CTRL0, tx_p0::ENC_EN)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_only_applies_to_converters() {
        assert_eq!(
            capable_check(false, CableType::DisplayPort, true),
            CapableDecision::Proceed
        );
        assert_eq!(
            capable_check(false, CableType::HdmiConverter, true),
            CapableDecision::NotSupport(NotSupportReason::SourceDisabled)
        );
        assert_eq!(
            capable_check(true, CableType::HdmiConverter, false),
            CapableDecision::NotSupport(NotSupportReason::SinkIncapable)
        );
        assert_eq!(
            capable_check(false, CableType::DisplayPort, false),
            CapableDecision::NotSupport(NotSupportReason::SinkIncapable)
        );
    }

    #[test]
    fn binfo_limits() {
        assert!(!topology_exceeded([0x03, 0x01]));
        assert!(topology_exceeded([0x80, 0x00]));
        assert!(topology_exceeded([0x00, 0x08]));
    }

    #[test]
    fn restart_keeps_failures() {
        let mut h = HdcpAuth {
            state: HdcpState::Failed,
            fail_count: 3,
            wait_ticks: 7,
            encrypted: true,
            topology_limited: true,
            not_supported: None,
        };
        h.restart();
        assert_eq!(h.state(), HdcpState::CapableCheck);
        assert_eq!(h.fail_count(), 3);
        assert!(!h.encryption_enabled());
        assert!(!h.topology_limited());
    }
}
