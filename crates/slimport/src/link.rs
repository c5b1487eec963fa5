//! Main-link bandwidth selection and hardware-assisted link training.
//!
//! ```text
//! Init → WaitPllLock → CheckLinkBw → Start → WaitingFinish ─┬→ Finish
//!                                                ↑           └→ Error
//!                                                └──── (retry / step down)
//! ```
//!
//! `WaitingFinish` is left only through the training-finished interrupt
//! ([`LinkTrainer::on_training_finished`]) or its tick bound. Every other
//! wait returns [`Outcome::Continue`] and is re-entered on the next tick.

use embedded_hal::delay::DelayNs;
use platform::Hardware;

use crate::detect::{CableType, SinkInfo};
use crate::dpcd;
use crate::registers::{tx_p0, tx_p1, tx_p2};
use crate::session::Ctx;
use crate::state::Outcome;
use crate::Result;

// ─── Link rates ──────────────────────────────────────────────────────────────

/// Per-lane main-link rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkBandwidth {
    /// 1.62 Gbps (RBR).
    Rate1G62,
    /// 2.7 Gbps (HBR).
    Rate2G7,
    /// 5.4 Gbps (HBR2).
    Rate5G4,
    /// 6.75 Gbps.
    Rate6G75,
}

/// 8b/10b payload bits carried per 27 MHz link-rate unit, in kbit/s.
const PAYLOAD_KBPS_PER_CODE: u64 = 27_000 * 8;

impl LinkBandwidth {
    /// All rates, slowest first.
    pub const ALL: [LinkBandwidth; 4] = [
        LinkBandwidth::Rate1G62,
        LinkBandwidth::Rate2G7,
        LinkBandwidth::Rate5G4,
        LinkBandwidth::Rate6G75,
    ];

    /// LINK_BW_SET code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            LinkBandwidth::Rate1G62 => 0x06,
            LinkBandwidth::Rate2G7 => 0x0A,
            LinkBandwidth::Rate5G4 => 0x14,
            LinkBandwidth::Rate6G75 => 0x19,
        }
    }

    /// Exact code match.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.code() == code)
    }

    /// Fastest known rate not above `code`; never below 1.62 Gbps.
    #[must_use]
    pub fn from_code_floor(code: u8) -> Self {
        Self::ALL
            .into_iter()
            .rev()
            .find(|b| b.code() <= code)
            .unwrap_or(LinkBandwidth::Rate1G62)
    }

    /// Next slower rate.
    #[must_use]
    pub const fn lower(self) -> Option<Self> {
        match self {
            LinkBandwidth::Rate1G62 => None,
            LinkBandwidth::Rate2G7 => Some(LinkBandwidth::Rate1G62),
            LinkBandwidth::Rate5G4 => Some(LinkBandwidth::Rate2G7),
            LinkBandwidth::Rate6G75 => Some(LinkBandwidth::Rate5G4),
        }
    }

    /// Next faster rate.
    #[must_use]
    pub const fn higher(self) -> Option<Self> {
        match self {
            LinkBandwidth::Rate1G62 => Some(LinkBandwidth::Rate2G7),
            LinkBandwidth::Rate2G7 => Some(LinkBandwidth::Rate5G4),
            LinkBandwidth::Rate5G4 => Some(LinkBandwidth::Rate6G75),
            LinkBandwidth::Rate6G75 => None,
        }
    }

    /// Link symbol clock in kHz (code × 27 MHz).
    #[must_use]
    pub fn link_khz(self) -> u32 {
        u32::from(self.code()).saturating_mul(27_000)
    }

    /// Video payload the link carries on `lanes` lanes, in kbit/s.
    #[must_use]
    pub fn payload_kbps(self, lanes: u8) -> u64 {
        u64::from(self.code())
            .saturating_mul(PAYLOAD_KBPS_PER_CODE)
            .saturating_mul(u64::from(lanes))
    }

    /// Slowest rate whose payload carries `required_kbps` on `lanes` lanes.
    #[must_use]
    pub fn min_for(required_kbps: u64, lanes: u8) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|b| b.payload_kbps(lanes) >= required_kbps)
    }
}

// ─── Trainer ─────────────────────────────────────────────────────────────────

/// Link-training sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkTrainingState {
    /// Prepare the video block and pick a rate.
    #[default]
    Init,
    /// Wait for the link PLL.
    WaitPllLock,
    /// Re-check the sink's maximum rate.
    CheckLinkBw,
    /// Program the link and start hardware training.
    Start,
    /// Waiting for the training-finished interrupt.
    WaitingFinish,
    /// Verify the trained link.
    Finish,
    /// Training failed; local reset and retry.
    Error,
}

/// Link trainer. Owned by the session; reset to default on recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkTrainer {
    state: LinkTrainingState,
    bandwidth: Option<LinkBandwidth>,
    lanes: u8,
    retries: u8,
    wait_ticks: u8,
    ceiling: Option<LinkBandwidth>,
    fifo_resets: u8,
}

impl LinkTrainer {
    /// Current sub-state.
    #[must_use]
    pub const fn state(&self) -> LinkTrainingState {
        self.state
    }

    /// Rate selected for the current attempt.
    #[must_use]
    pub const fn bandwidth(&self) -> Option<LinkBandwidth> {
        self.bandwidth
    }

    /// Lanes in use.
    #[must_use]
    pub const fn lanes(&self) -> u8 {
        self.lanes
    }

    /// Highest rate still allowed after step-downs in this session.
    #[must_use]
    pub fn limit(&self, sink: &SinkInfo, source_max: LinkBandwidth) -> LinkBandwidth {
        let mut limit = sink.max_bandwidth.min(source_max);
        if let Some(c) = self.ceiling {
            limit = limit.min(c);
        }
        limit
    }

    /// SerDes FIFO resets for chronic symbol errors at the current rate.
    #[must_use]
    pub const fn fifo_resets(&self) -> u8 {
        self.fifo_resets
    }

    /// Back to `Init` for a fresh attempt. Step-down history and the FIFO
    /// reset count are kept.
    pub fn restart(&mut self) {
        *self = Self {
            ceiling: self.ceiling,
            fifo_resets: self.fifo_resets,
            ..Self::default()
        };
    }

    /// Training-finished interrupt: read the engine's verdict.
    pub(crate) fn on_training_finished<H: Hardware>(&mut self, hw: &mut H) -> Result<()> {
        if self.state != LinkTrainingState::WaitingFinish {
            debug!("training-finished in {:?}, ignored", self.state);
            return Ok(());
        }
        let ctrl = hw.read(tx_p0::DEV, tx_p0::LT_CTRL)?;
        self.state = if ctrl & tx_p0::LT_ERR_MASK == 0 {
            LinkTrainingState::Finish
        } else {
            warn!("hardware link training error {:#x}", ctrl & tx_p0::LT_ERR_MASK);
            LinkTrainingState::Error
        };
        Ok(())
    }

    /// Run as many sub-states as complete immediately.
    pub(crate) fn step<H: Hardware, D: DelayNs>(
        &mut self,
        ctx: &mut Ctx<'_, H, D>,
        sink: &SinkInfo,
        cable: CableType,
        hint: Option<LinkBandwidth>,
    ) -> Result<Outcome> {
        loop {
            match self.state {
                LinkTrainingState::Init => {
                    self.init(ctx, sink, cable, hint)?;
                    self.state = LinkTrainingState::WaitPllLock;
                }
                LinkTrainingState::WaitPllLock => {
                    let status = ctx.hw.read(tx_p0::DEV, tx_p0::PLL_STATUS)?;
                    if status & tx_p0::PLL_LOCK == 0 {
                        debug!("link PLL unlocked, pulsing reset");
                        ctx.hw.set_bits(tx_p0::DEV, tx_p0::PLL_CTRL, tx_p0::PLL_RST)?;
                        ctx.hw.clear_bits(tx_p0::DEV, tx_p0::PLL_CTRL, tx_p0::PLL_RST)?;
                        return Ok(Outcome::Continue);
                    }
                    self.state = LinkTrainingState::CheckLinkBw;
                }
                LinkTrainingState::CheckLinkBw => {
                    let code = ctx.hw.aux_read_byte(dpcd::MAX_LINK_RATE)?;
                    let sink_max = LinkBandwidth::from_code_floor(code);
                    if let Some(bw) = self.bandwidth {
                        if sink_max < bw {
                            info!("sink max rate now {:?}, down from {:?}", sink_max, bw);
                            self.bandwidth = Some(sink_max);
                        }
                    }
                    self.state = LinkTrainingState::Start;
                }
                LinkTrainingState::Start => {
                    self.start(ctx, sink)?;
                    self.wait_ticks = 0;
                    self.state = LinkTrainingState::WaitingFinish;
                    return Ok(Outcome::Continue);
                }
                LinkTrainingState::WaitingFinish => {
                    self.wait_ticks = self.wait_ticks.saturating_add(1);
                    if self.wait_ticks <= ctx.config.retry.lt_finish_ticks {
                        return Ok(Outcome::Continue);
                    }
                    warn!("no training-finished interrupt after {} ticks", self.wait_ticks);
                    self.state = LinkTrainingState::Error;
                }
                LinkTrainingState::Finish => return self.finish(ctx),
                LinkTrainingState::Error => return self.error(ctx),
            }
        }
    }

    fn init<H: Hardware, D: DelayNs>(
        &mut self,
        ctx: &mut Ctx<'_, H, D>,
        sink: &SinkInfo,
        cable: CableType,
        hint: Option<LinkBandwidth>,
    ) -> Result<()> {
        use crate::registers::rx_p0;

        ctx.hw.clear_bits(tx_p2::DEV, tx_p2::POWERD_CTRL, tx_p2::VIDEO_PD | tx_p2::LINK_PD)?;
        ctx.hw.set_bits(tx_p2::DEV, tx_p2::VID_CTRL1, tx_p2::VIDEO_MUTE)?;
        ctx.hw.clear_bits(tx_p2::DEV, tx_p2::VID_CTRL1, tx_p2::VIDEO_EN)?;

        if cable == CableType::HdmiConverter {
            let hdmi = ctx.hw.read(rx_p0::DEV, rx_p0::HDMI_STATUS)? & rx_p0::HDMI_MODE != 0;
            ctx.hw.aux_write_byte(dpcd::INPUT_TYPE, u8::from(hdmi))?;
            debug!("announced {} input to converter", if hdmi { "HDMI" } else { "DVI" });
        }

        if self.bandwidth.is_none() {
            let limit = self.limit(sink, ctx.config.source.max_bandwidth);
            let wanted = hint.unwrap_or(limit).min(limit);
            self.bandwidth = Some(wanted);
        }
        self.lanes = sink.max_lanes.clamp(1, ctx.config.source.lane_count.max(1));
        Ok(())
    }

    fn start<H: Hardware, D: DelayNs>(&mut self, ctx: &mut Ctx<'_, H, D>, sink: &SinkInfo) -> Result<()> {
        let bw = self.bandwidth.unwrap_or(LinkBandwidth::Rate1G62);

        let lane_pd = if self.lanes >= 2 {
            0
        } else {
            tx_p1::CH1_PD
        };
        ctx.hw.write(tx_p1::DEV, tx_p1::ANALOG_PD, lane_pd)?;

        ctx.hw.write(tx_p1::DEV, tx_p1::SSC_DEVIATION, ctx.config.tuning.ssc_deviation)?;
        ctx.hw.set_bits(tx_p1::DEV, tx_p1::SSC_CTRL, tx_p1::SSC_EN)?;
        if sink.downspread {
            ctx.hw.aux_write_byte(dpcd::DOWNSPREAD_CTRL, dpcd::SPREAD_AMP)?;
        }

        ctx.hw.write(tx_p0::DEV, tx_p0::LINK_BW_SET, bw.code())?;
        ctx.hw.write(tx_p0::DEV, tx_p0::LANE_COUNT_SET, self.lanes)?;
        if sink.enhanced_framing {
            ctx.hw.set_bits(tx_p0::DEV, tx_p0::SYS_CTRL4, tx_p0::ENHANCED_FRAMING)?;
        } else {
            ctx.hw.clear_bits(tx_p0::DEV, tx_p0::SYS_CTRL4, tx_p0::ENHANCED_FRAMING)?;
        }

        // SET_POWER only exists from DPCD 1.1 on.
        if sink.dpcd_rev >= 0x11 {
            ctx.hw.aux_write_byte(dpcd::SET_POWER, dpcd::SET_POWER_D0)?;
        }

        info!("link training at {:?} x{}", bw, self.lanes);
        ctx.hw.write(tx_p0::DEV, tx_p0::LT_CTRL, tx_p0::LT_EN)?;
        Ok(())
    }

    fn finish<H: Hardware, D: DelayNs>(&mut self, ctx: &mut Ctx<'_, H, D>) -> Result<Outcome> {
        let mut status = [0u8; 3];
        ctx.hw.aux_read(dpcd::LANE0_1_STATUS, &mut status)?;
        let [lane01, lane23, align] = status;
        if !dpcd::channel_eq_done(&[lane01, lane23], self.lanes)
            || align & dpcd::INTERLANE_ALIGN_DONE == 0
        {
            warn!("lane status {:#x} align {:#x} after training", lane01, align);
            self.state = LinkTrainingState::Error;
            return self.error(ctx);
        }

        let mut errors = read_symbol_errors(ctx.hw)?;
        if self.lanes == 1 && errors > 0 {
            errors = self.tune_pre_emphasis(ctx, errors)?;
        }

        let expected = self.bandwidth.map(LinkBandwidth::code);
        let actual = ctx.hw.read(tx_p0::DEV, tx_p0::LINK_BW_SET)?;
        if expected != Some(actual) {
            warn!("link rate readback {:#x} does not match request", actual);
            self.state = LinkTrainingState::Error;
            return self.error(ctx);
        }

        if errors >= ctx.config.retry.chronic_symbol_errors {
            warn!("{} symbol errors on a trained link, resetting SerDes FIFO", errors);
            serdes_fifo_reset(ctx.hw)?;
            self.fifo_resets = self.fifo_resets.saturating_add(1);
            if self.fifo_resets >= ctx.config.retry.fifo_resets_per_rate && !self.step_down() {
                error!("symbol errors persist at the lowest rate");
                return Ok(Outcome::Fatal);
            }
            return Ok(Outcome::Retry);
        }

        self.retries = 0;
        self.fifo_resets = 0;
        info!("link trained at {:?}", self.bandwidth);
        Ok(Outcome::Advance)
    }

    /// One pre-emphasis step up; kept only if it lowers the error count.
    #[allow(clippy::arithmetic_side_effects)]
    fn tune_pre_emphasis<H: Hardware, D: DelayNs>(
        &mut self,
        ctx: &mut Ctx<'_, H, D>,
        before: u16,
    ) -> Result<u16> {
        let set = ctx.hw.read(tx_p0::DEV, tx_p0::TRAINING_LANE0_SET)?;
        let level = (set & tx_p0::PRE_EMPHASIS_MASK) >> tx_p0::PRE_EMPHASIS_SHIFT;
        if level >= tx_p0::PRE_EMPHASIS_MAX {
            return Ok(before);
        }
        let bumped = level.saturating_add(1) << tx_p0::PRE_EMPHASIS_SHIFT;
        ctx.hw.update_bits(tx_p0::DEV, tx_p0::TRAINING_LANE0_SET, tx_p0::PRE_EMPHASIS_MASK, bumped)?;

        let after = read_symbol_errors(ctx.hw)?;
        if after >= before {
            debug!("pre-emphasis bump did not help ({} -> {}), reverting", before, after);
            ctx.hw.write(tx_p0::DEV, tx_p0::TRAINING_LANE0_SET, set)?;
            return Ok(before);
        }
        debug!("pre-emphasis level {} -> {}, errors {} -> {}", level, level.saturating_add(1), before, after);
        Ok(after)
    }

    fn error<H: Hardware, D: DelayNs>(&mut self, ctx: &mut Ctx<'_, H, D>) -> Result<Outcome> {
        serdes_fifo_reset(ctx.hw)?;
        self.retries = self.retries.saturating_add(1);
        if self.retries >= ctx.config.retry.lt_retries_per_rate {
            warn!("link training failed {} times at {:?}", self.retries, self.bandwidth);
            if !self.step_down() {
                error!("link training failed at the lowest rate");
                return Ok(Outcome::Fatal);
            }
        }
        self.state = LinkTrainingState::Init;
        Ok(Outcome::Continue)
    }

    /// Drop to the next slower rate and cap the session there. `false` when
    /// already at the slowest rate.
    fn step_down(&mut self) -> bool {
        let current = self.bandwidth.unwrap_or(LinkBandwidth::Rate1G62);
        let Some(lower) = current.lower() else {
            return false;
        };
        warn!("stepping link rate down from {:?} to {:?}", current, lower);
        self.bandwidth = Some(lower);
        self.ceiling = Some(lower);
        self.retries = 0;
        self.fifo_resets = 0;
        true
    }
}

fn read_symbol_errors<H: Hardware>(hw: &mut H) -> Result<u16> {
    let mut raw = [0u8; 2];
    hw.aux_read(dpcd::SYMBOL_ERROR_COUNT_LANE0, &mut raw)?;
    let [lo, hi] = raw;
    Ok(dpcd::symbol_error_count(lo, hi).unwrap_or(0))
}

/// Pulse the SerDes FIFO reset.
pub(crate) fn serdes_fifo_reset<H: Hardware>(hw: &mut H) -> Result<()> {
    hw.set_bits(tx_p2::DEV, tx_p2::RST_CTRL2, tx_p2::SERDES_FIFO_RST)?;
    hw.clear_bits(tx_p2::DEV, tx_p2::RST_CTRL2, tx_p2::SERDES_FIFO_RST)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_and_floor() {
        for bw in LinkBandwidth::ALL {
            assert_eq!(LinkBandwidth::from_code(bw.code()), Some(bw));
        }
        assert_eq!(LinkBandwidth::from_code(0x1E), None);
        assert_eq!(LinkBandwidth::from_code_floor(0x1E), LinkBandwidth::Rate6G75);
        assert_eq!(LinkBandwidth::from_code_floor(0x0C), LinkBandwidth::Rate2G7);
        assert_eq!(LinkBandwidth::from_code_floor(0x00), LinkBandwidth::Rate1G62);
    }

    #[test]
    fn lower_and_higher_are_inverse() {
        for bw in LinkBandwidth::ALL {
            if let Some(l) = bw.lower() {
                assert_eq!(l.higher(), Some(bw));
                assert!(l < bw);
            }
        }
        assert_eq!(LinkBandwidth::Rate1G62.lower(), None);
        assert_eq!(LinkBandwidth::Rate6G75.higher(), None);
    }

    #[test]
    fn payload_matches_8b10b() {
        // 2.7 Gbps raw, 2.16 Gbps payload per lane.
        assert_eq!(LinkBandwidth::Rate2G7.payload_kbps(1), 2_160_000);
        assert_eq!(LinkBandwidth::Rate2G7.payload_kbps(2), 4_320_000);
        assert_eq!(LinkBandwidth::Rate5G4.link_khz(), 540_000);
    }

    #[test]
    fn min_for_picks_slowest_sufficient_rate() {
        // 1080p60 at 24 bpp.
        let required = 148_500 * 24;
        assert_eq!(LinkBandwidth::min_for(required, 1), Some(LinkBandwidth::Rate5G4));
        assert_eq!(LinkBandwidth::min_for(required, 2), Some(LinkBandwidth::Rate2G7));
        assert_eq!(LinkBandwidth::min_for(u64::MAX, 1), None);
    }

    #[test]
    fn restart_keeps_ceiling_and_fifo_resets() {
        let mut t = LinkTrainer {
            state: LinkTrainingState::Error,
            bandwidth: Some(LinkBandwidth::Rate2G7),
            lanes: 1,
            retries: 2,
            wait_ticks: 4,
            ceiling: Some(LinkBandwidth::Rate2G7),
            fifo_resets: 1,
        };
        t.restart();
        assert_eq!(t.state(), LinkTrainingState::Init);
        assert_eq!(t.bandwidth(), None);
        assert_eq!(t.fifo_resets(), 1);
        let sink = SinkInfo {
            max_bandwidth: LinkBandwidth::Rate5G4,
            ..SinkInfo::default()
        };
        assert_eq!(t.limit(&sink, LinkBandwidth::Rate6G75), LinkBandwidth::Rate2G7);
    }

    #[test]
    fn step_down_caps_the_session_and_stops_at_rbr() {
        let mut t = LinkTrainer {
            bandwidth: Some(LinkBandwidth::Rate2G7),
            retries: 2,
            fifo_resets: 1,
            ..LinkTrainer::default()
        };
        assert!(t.step_down());
        assert_eq!(t.bandwidth(), Some(LinkBandwidth::Rate1G62));
        assert_eq!(t.fifo_resets(), 0);
        assert!(!t.step_down());
        assert_eq!(t.bandwidth(), Some(LinkBandwidth::Rate1G62));
    }
}
