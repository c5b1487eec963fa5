//! Top-level bridge state machine.
//!
//! One [`Bridge::tick`] does, in order:
//!
//! 1. Sample the cable-detect line. A missing cable past `WaitCable`
//!    cancels the connection before anything touches the chip.
//! 2. Latch and clear the interrupt registers, decode them for the current
//!    state and hand each event to its owner.
//! 3. Step the sub-machine of the current state, moving on for as long as
//!    steps report [`Outcome::Advance`].
//!
//! Errors from a step are mapped to a recovery level here and nowhere else.

use embassy_time::Duration;
use embedded_hal::delay::DelayNs;
use heapless::Deque;
use platform::Hardware;

use crate::audio;
use crate::config::BridgeConfig;
use crate::detect::{self, CableType, ChargingCapability};
use crate::dpcd;
use crate::edid::{self, EdidCache};
use crate::error::Error;
use crate::hdcp;
use crate::irq::{self, CecFrame, Event, InterruptSnapshot};
use crate::registers::{rx_p0, tx_p2, CHIP_IDS};
use crate::session::{Ctx, Session};
use crate::state::{Outcome, SystemState, TopState};
use crate::video;
use crate::Result;

/// CEC frames kept until the host collects them.
pub const CEC_INBOX_LEN: usize = 4;

/// Upper bound on sub-machine steps in one tick.
const MAX_STEPS_PER_TICK: u8 = 12;

/// SlimPort bridge controller.
///
/// Owns the hardware, the current [`Session`] and the few things that
/// outlive a connection: the cable-type cache, the EDID cache, the charging
/// capability and the CEC inbox.
pub struct Bridge<H, D> {
    hw: H,
    delay: D,
    config: BridgeConfig,
    top: TopState,
    session: Session,
    cable_cache: CableType,
    edid_cache: EdidCache,
    charging: ChargingCapability,
    cec_inbox: Deque<CecFrame, CEC_INBOX_LEN>,
}

impl<H: Hardware, D: DelayNs> Bridge<H, D> {
    /// Create a bridge in [`SystemState::Init`].
    pub fn new(hw: H, delay: D, config: BridgeConfig) -> Self {
        Self {
            hw,
            delay,
            config,
            top: TopState::new(),
            session: Session::default(),
            cable_cache: CableType::None,
            edid_cache: EdidCache::default(),
            charging: ChargingCapability::Unknown,
            cec_inbox: Deque::new(),
        }
    }

    /// Shared access to the hardware.
    pub fn hardware(&self) -> &H {
        &self.hw
    }

    /// Exclusive access to the hardware.
    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    /// Give the hardware and delay back.
    pub fn release(self) -> (H, D) {
        (self.hw, self.delay)
    }

    /// Active configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Current top-level state.
    pub fn state(&self) -> SystemState {
        self.top.current()
    }

    /// Top-level state with history.
    pub fn top(&self) -> &TopState {
        &self.top
    }

    /// Current connection.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// EDID kept across connections.
    pub fn edid_cache(&self) -> &EdidCache {
        &self.edid_cache
    }

    /// Charging capability of the last classified converter.
    pub fn charging_capability(&self) -> ChargingCapability {
        self.charging
    }

    /// HDCP failures in the current session.
    pub fn hdcp_failures(&self) -> u8 {
        self.session.hdcp.fail_count()
    }

    /// Oldest CEC frame not yet collected.
    pub fn take_cec_message(&mut self) -> Option<CecFrame> {
        self.cec_inbox.pop_front()
    }

    /// How long the worker should sleep before the next tick.
    pub fn next_tick_delay(&self) -> Duration {
        if self.top.current() == SystemState::Playback {
            self.config.cadence.playback
        } else {
            self.config.cadence.negotiating
        }
    }

    /// Run one scheduling tick.
    pub fn tick(&mut self) {
        if self.top.current() > SystemState::WaitCable && !self.hw.cable_present() {
            info!("cable removed in {:?}", self.top.current());
            self.cancel_connection();
            return;
        }

        if self.top.current() >= SystemState::SinkConnected && !self.service_interrupts() {
            return;
        }

        for _ in 0..MAX_STEPS_PER_TICK {
            let state = self.top.current();
            let outcome = match self.step_state(state) {
                Ok(outcome) => outcome,
                Err(e) => self.on_error(e),
            };
            if !self.apply(outcome) {
                break;
            }
        }
    }

    /// The cable is gone: release the hardware and wait for the next one.
    pub fn cancel_connection(&mut self) {
        self.hw.power_down();
        self.session = Session::default();
        self.top.set_state(SystemState::WaitCable);
    }

    /// Power-cycle the chip and start over from `WaitCable`.
    pub fn force_hardware_reset(&mut self) {
        warn!("hardware reset from {:?}", self.top.current());
        self.cancel_connection();
    }

    // ─── Interrupts ──────────────────────────────────────────────────────────

    /// Latch, decode and dispatch. `false` if a recovery changed the state
    /// and stepping should wait for the next tick.
    ///
    /// Every decoded event is handled: the bits are already cleared in the
    /// chip. The most drastic recovery among them is applied afterwards.
    fn service_interrupts(&mut self) -> bool {
        let snap = match InterruptSnapshot::latch(&mut self.hw, self.session.cable) {
            Ok(snap) => snap,
            Err(e) => {
                let outcome = self.on_error(e);
                self.apply(outcome);
                return false;
            }
        };
        if snap.is_empty() {
            return true;
        }

        let mut pending = Outcome::Continue;
        for event in irq::decode(&snap, self.top.current()) {
            debug!("event {:?} in {:?}", event, self.top.current());
            let outcome = match self.handle_event(event) {
                Ok(outcome) => outcome,
                Err(e) => self.on_error(e),
            };
            pending = pending.escalate(outcome);
        }
        if pending == Outcome::Continue {
            return true;
        }
        self.apply(pending);
        false
    }

    fn handle_event(&mut self, event: Event) -> Result<Outcome> {
        match event {
            Event::PllLockChanged => {
                warn!("link PLL lock changed");
                Ok(Outcome::Rollback(SystemState::LinkTraining))
            }
            Event::TrainingFinished => {
                self.session.link.on_training_finished(&mut self.hw)?;
                Ok(Outcome::Continue)
            }
            Event::LinkChanged | Event::HpdLost => Ok(self.link_down_check()),
            Event::HdcpAuthDone => {
                self.session.hdcp.on_auth_done(&mut self.hw)?;
                Ok(Outcome::Continue)
            }
            Event::HdcpLinkCheckFailed | Event::DownstreamHdcpFailed => {
                self.rollback(SystemState::HdcpAuth);
                self.session.hdcp.on_link_check_failed();
                Ok(Outcome::Continue)
            }
            Event::RxClockChanged | Event::RxSyncChanged => Ok(Outcome::Rollback(SystemState::VideoOutput)),
            Event::HdmiModeChanged => Ok(Outcome::Rollback(SystemState::LinkTraining)),
            Event::NewInfoFrame(kind) => {
                self.session.video.on_new_infoframe(&mut self.hw, kind)?;
                Ok(Outcome::Continue)
            }
            Event::CtsReceived => {
                self.session.audio.on_cts_received();
                Ok(Outcome::Continue)
            }
            Event::AudioReceived => {
                self.session.audio.on_audio_received();
                Ok(Outcome::Continue)
            }
            Event::DownstreamHpdChanged => Ok(Outcome::Rollback(SystemState::SinkConnected)),
            Event::DownstreamEdidChanged => {
                self.edid_cache.invalidate();
                Ok(Outcome::Rollback(SystemState::Edid))
            }
            Event::CecMessage => {
                if let Some(frame) = irq::read_cec(&mut self.hw)? {
                    if let Err(frame) = self.cec_inbox.push_back(frame) {
                        warn!("CEC inbox full, dropping oldest frame");
                        let _ = self.cec_inbox.pop_front();
                        let _ = self.cec_inbox.push_back(frame);
                    }
                }
                Ok(Outcome::Continue)
            }
        }
    }

    /// Decide between retraining and treating the cable as gone: the same
    /// sink must still answer on AUX with the same cable type.
    fn link_down_check(&mut self) -> Outcome {
        match detect::probe(&mut self.hw) {
            Err(e) => {
                warn!("link down and AUX unresponsive ({:?})", e);
                Outcome::Fatal
            }
            Ok(None) => {
                warn!("link down and no sink answers");
                Outcome::Fatal
            }
            Ok(Some((cable, _))) if cable != self.session.cable => {
                warn!("cable changed from {:?} to {:?}", self.session.cable, cable);
                Outcome::Fatal
            }
            Ok(Some(_)) => {
                info!("link down, same sink present, retraining");
                Outcome::Rollback(SystemState::LinkTraining)
            }
        }
    }

    // ─── Stepping ────────────────────────────────────────────────────────────

    fn step_state(&mut self, state: SystemState) -> Result<Outcome> {
        match state {
            SystemState::Init => {
                self.hw.power_down();
                Ok(Outcome::Advance)
            }
            SystemState::WaitCable => {
                if !self.hw.cable_present() {
                    return Ok(Outcome::Continue);
                }
                info!("cable detected, powering up");
                self.hw.power_on();
                self.delay.delay_ms(self.config.tuning.reset_settle_ms);
                Ok(Outcome::Advance)
            }
            SystemState::Initialized => self.initialize_chip(),
            SystemState::SinkConnected => {
                let mut ctx = Ctx {
                    hw: &mut self.hw,
                    delay: &mut self.delay,
                    config: &self.config,
                };
                let Some(found) = detect::classify(&mut ctx)? else {
                    return Ok(Outcome::Fatal);
                };
                if self.cable_cache != CableType::None && self.cable_cache != found.cable {
                    info!("cable type changed from {:?}, dropping cached EDID", self.cable_cache);
                    self.edid_cache.invalidate();
                }
                self.cable_cache = found.cable;
                self.charging = found.charging;
                self.session.cable = found.cable;
                self.session.sink = found.sink;
                Ok(Outcome::Advance)
            }
            SystemState::Edid => {
                if self.config.policy.skip_edid {
                    return Ok(Outcome::Advance);
                }
                let pclk = self.edid_cache.acquire(&mut self.hw, &mut self.delay, &self.config.retry);
                let lanes = self.session.sink.max_lanes.clamp(1, self.config.source.lane_count.max(1));
                self.session.bw_hint = edid::bandwidth_hint(pclk, lanes, self.session.sink.max_bandwidth);
                info!("EDID bandwidth hint {:?}", self.session.bw_hint);
                Ok(Outcome::Advance)
            }
            SystemState::LinkTraining => {
                let mut ctx = Ctx {
                    hw: &mut self.hw,
                    delay: &mut self.delay,
                    config: &self.config,
                };
                self.session.link.step(&mut ctx, &self.session.sink, self.session.cable, self.session.bw_hint)
            }
            SystemState::VideoOutput => {
                let limit = self
                    .session
                    .link
                    .limit(&self.session.sink, self.config.source.max_bandwidth);
                let mut ctx = Ctx {
                    hw: &mut self.hw,
                    delay: &mut self.delay,
                    config: &self.config,
                };
                self.session.video.step(
                    &mut ctx,
                    self.session.cable,
                    &self.session.link,
                    limit,
                    &mut self.session.bw_hint,
                )
            }
            SystemState::HdcpAuth => {
                let mut ctx = Ctx {
                    hw: &mut self.hw,
                    delay: &mut self.delay,
                    config: &self.config,
                };
                self.session.hdcp.step(&mut ctx, self.session.cable)
            }
            SystemState::AudioOutput => {
                let mut ctx = Ctx {
                    hw: &mut self.hw,
                    delay: &mut self.delay,
                    config: &self.config,
                };
                self.session.audio.step(&mut ctx, self.session.video.hdmi_input())
            }
            SystemState::Playback => match self.hw.aux_read_byte(dpcd::LANE_ALIGN_STATUS) {
                Ok(align) if align & dpcd::INTERLANE_ALIGN_DONE != 0 => Ok(Outcome::Continue),
                Ok(align) => {
                    warn!("lane alignment lost ({:#x})", align);
                    Ok(self.link_down_check())
                }
                Err(e) => {
                    warn!("lane status unreadable ({:?})", e);
                    Ok(self.link_down_check())
                }
            },
        }
    }

    fn initialize_chip(&mut self) -> Result<Outcome> {
        let lo = self.hw.read(tx_p2::DEV, tx_p2::DEVICE_ID_L)?;
        let hi = self.hw.read(tx_p2::DEV, tx_p2::DEVICE_ID_H)?;
        let id = u16::from_le_bytes([lo, hi]);
        if !CHIP_IDS.contains(&id) {
            error!("unsupported chip id {:#x}", id);
            return Err(Error::ChipIdMismatch { found: id });
        }
        info!("transmitter {:#x} found", id);

        self.hw.set_bits(tx_p2::DEV, tx_p2::RST_CTRL, tx_p2::SW_RST)?;
        self.delay.delay_ms(self.config.tuning.reset_settle_ms);
        self.hw.clear_bits(tx_p2::DEV, tx_p2::RST_CTRL, tx_p2::SW_RST)?;

        for (dev, status) in [
            (tx_p2::DEV, tx_p2::COMMON_INT1),
            (tx_p2::DEV, tx_p2::COMMON_INT2),
            (tx_p2::DEV, tx_p2::DP_INT),
            (rx_p0::DEV, rx_p0::RX_INT1),
            (rx_p0::DEV, rx_p0::RX_INT2),
            (rx_p0::DEV, rx_p0::RX_INT3),
        ] {
            self.hw.write(dev, status, 0xFF)?;
        }

        self.hw.write(tx_p2::DEV, tx_p2::COMMON_INT_MASK1, tx_p2::PLL_LOCK_CHG)?;
        self.hw.write(
            tx_p2::DEV,
            tx_p2::COMMON_INT_MASK2,
            tx_p2::HDCP_AUTH_DONE | tx_p2::HDCP_LINK_CHK_FAIL,
        )?;
        self.hw.write(
            tx_p2::DEV,
            tx_p2::DP_INT_MASK,
            tx_p2::TRAINING_FINISHED | tx_p2::LINK_CHANGED | tx_p2::HPD_LOST | tx_p2::SINK_IRQ,
        )?;
        self.hw.write(
            rx_p0::DEV,
            rx_p0::RX_INT_MASK1,
            rx_p0::CKDT_CHG | rx_p0::SCDT_CHG | rx_p0::HDMI_DVI_CHG,
        )?;
        self.hw.write(
            rx_p0::DEV,
            rx_p0::RX_INT_MASK2,
            rx_p0::NEW_AVI | rx_p0::NEW_SPD | rx_p0::NEW_VSI | rx_p0::NEW_AUD_IF,
        )?;
        self.hw.write(rx_p0::DEV, rx_p0::RX_INT_MASK3, rx_p0::CTS_RCV | rx_p0::AUDIO_RCV)?;
        Ok(Outcome::Advance)
    }

    // ─── Recovery ────────────────────────────────────────────────────────────

    fn on_error(&mut self, e: Error) -> Outcome {
        match e {
            Error::Bus(e) => {
                error!("register bus failure {:?} in {:?}", e, self.top.current());
                Outcome::Fatal
            }
            Error::Aux(e) => {
                self.session.aux_failures = self.session.aux_failures.saturating_add(1);
                warn!(
                    "AUX failure {:?} in {:?} ({} in a row)",
                    e,
                    self.top.current(),
                    self.session.aux_failures
                );
                if self.session.aux_failures > self.config.retry.aux_fail_threshold {
                    error!("AUX channel keeps failing");
                    return Outcome::Fatal;
                }
                let reset = self
                    .hw
                    .set_bits(tx_p2::DEV, tx_p2::RST_CTRL2, tx_p2::AUX_RST)
                    .and_then(|()| self.hw.clear_bits(tx_p2::DEV, tx_p2::RST_CTRL2, tx_p2::AUX_RST));
                match reset {
                    Ok(()) => Outcome::Retry,
                    Err(_) => Outcome::Fatal,
                }
            }
            Error::ChipIdMismatch { .. } => Outcome::Fatal,
            Error::InvalidInfoFrame => {
                warn!("malformed infoframe in {:?}, retrying", self.top.current());
                Outcome::Retry
            }
        }
    }

    /// Apply a step outcome. `true` to keep stepping in this tick.
    fn apply(&mut self, outcome: Outcome) -> bool {
        let current = self.top.current();
        match outcome {
            Outcome::Continue => false,
            Outcome::Advance => {
                self.session.aux_failures = 0;
                match current.next(self.config.policy.skip_edid) {
                    Some(next) => {
                        info!("{:?} -> {:?}", current, next);
                        self.top.advance_to(next)
                    }
                    None => false,
                }
            }
            Outcome::Retry => {
                warn!("retrying {:?}", current);
                self.restart_from(current);
                false
            }
            Outcome::Rollback(target) => {
                self.rollback(target);
                false
            }
            Outcome::Fatal => {
                self.force_hardware_reset();
                false
            }
        }
    }

    fn rollback(&mut self, target: SystemState) {
        let from = self.top.current();
        if self.top.change_to_and_below(target) {
            warn!("rolling back from {:?} to {:?}", from, target);
            self.restart_from(target);
        }
    }

    /// Reset every sub-machine owned by `state` or a later state.
    fn restart_from(&mut self, state: SystemState) {
        if state <= SystemState::LinkTraining {
            self.session.link.restart();
        }
        if state <= SystemState::VideoOutput {
            self.session.video.restart();
            if let Err(e) = video::mute(&mut self.hw) {
                warn!("video mute failed: {:?}", e);
            }
        }
        if state <= SystemState::HdcpAuth {
            self.session.hdcp.restart();
            if let Err(e) = hdcp::disable_encryption(&mut self.hw) {
                warn!("encryption disable failed: {:?}", e);
            }
        }
        if state <= SystemState::AudioOutput {
            self.session.audio.restart();
            if let Err(e) = audio::mute(&mut self.hw) {
                warn!("audio mute failed: {:?}", e);
            }
        }
    }
}
