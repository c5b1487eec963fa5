//! Bridge configuration: retry bounds, tick cadence, source capability and
//! the externally supplied policy flags.
//!
//! Every bounded wait in the state machines reads its limit from here; no
//! retry count or settle delay is inlined at the call site.

use embassy_time::Duration;

use crate::link::LinkBandwidth;

/// Retry bounds and short hardware delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetryPolicy {
    /// Sink classification attempts before giving up on the cable.
    pub detect_retries: u8,
    /// Pause between classification attempts (connector bounce).
    pub detect_settle_ms: u32,
    /// Attempts per 16-byte EDID chunk.
    pub edid_chunk_retries: u8,
    /// Pause between EDID chunk attempts.
    pub edid_backoff_ms: u32,
    /// HDCP failures tolerated before a hardware reset.
    pub hdcp_fail_threshold: u8,
    /// Polls of the downstream video-ready bit before a hardware reset.
    pub hdcp_vid_stable_polls: u8,
    /// Pause between video-ready polls.
    pub hdcp_vid_stable_delay_ms: u32,
    /// Ticks to wait for the authentication-done interrupt.
    pub hdcp_finish_ticks: u8,
    /// Ticks to wait for the training-finished interrupt.
    pub lt_finish_ticks: u8,
    /// Training attempts at one link rate before stepping down.
    pub lt_retries_per_rate: u8,
    /// Consecutive AUX failures before a hardware reset.
    pub aux_fail_threshold: u8,
    /// Lane-0 symbol error count treated as SerDes FIFO corruption.
    pub chronic_symbol_errors: u16,
    /// SerDes FIFO resets at one link rate before stepping down.
    pub fifo_resets_per_rate: u8,
    /// Ticks to wait for the transmitter stream to become stable.
    pub tx_stable_ticks: u8,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            detect_retries: 5,
            detect_settle_ms: 2,
            edid_chunk_retries: 10,
            edid_backoff_ms: 1,
            hdcp_fail_threshold: 5,
            hdcp_vid_stable_polls: 50,
            hdcp_vid_stable_delay_ms: 2,
            hdcp_finish_ticks: 20,
            lt_finish_ticks: 20,
            lt_retries_per_rate: 3,
            aux_fail_threshold: 5,
            chronic_symbol_errors: 0x0100,
            fifo_resets_per_rate: 2,
            tx_stable_ticks: 10,
        }
    }
}

/// Scheduling cadence of the worker loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickCadence {
    /// Period while the link is being brought up.
    pub negotiating: Duration,
    /// Period once in PLAYBACK.
    pub playback: Duration,
}

impl Default for TickCadence {
    fn default() -> Self {
        Self {
            negotiating: Duration::from_millis(100),
            playback: Duration::from_millis(500),
        }
    }
}

/// What the transmitter itself can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SourceCaps {
    /// Fastest link rate the SerDes supports.
    pub max_bandwidth: LinkBandwidth,
    /// Main-link lanes wired on the board.
    pub lane_count: u8,
}

impl Default for SourceCaps {
    fn default() -> Self {
        Self {
            max_bandwidth: LinkBandwidth::Rate6G75,
            lane_count: 1,
        }
    }
}

/// Policy inputs set by the host system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PolicyFlags {
    /// Require HDCP on every sink type, not only native DisplayPort.
    pub hdcp_enforced: bool,
    /// Skip EDID acquisition and train at the sink's maximum rate.
    pub skip_edid: bool,
}

impl Default for PolicyFlags {
    fn default() -> Self {
        Self {
            hdcp_enforced: true,
            skip_edid: false,
        }
    }
}

/// Complete bridge configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BridgeConfig {
    /// Retry bounds and delays.
    pub retry: RetryPolicy,
    /// Worker cadence.
    pub cadence: TickCadence,
    /// Transmitter capability.
    pub source: SourceCaps,
    /// External policy.
    pub policy: PolicyFlags,
    /// Hardware constants written during bring-up.
    pub tuning: Tuning,
}

/// Register constants written during link and HDCP bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tuning {
    /// Spread-spectrum deviation (TX_P1 SSC_D), 0.5 % down-spread.
    pub ssc_deviation: u8,
    /// R0 calculation window for hardware authentication.
    pub hdcp_r0_timer: u8,
    /// KSV list ready window for hardware authentication.
    pub hdcp_ksv_timer: u8,
    /// Settle time after power-on before the first register access.
    pub reset_settle_ms: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            ssc_deviation: 0x1F,
            hdcp_r0_timer: 0xB0,
            hdcp_ksv_timer: 0xC8,
            reset_settle_ms: 10,
        }
    }
}
