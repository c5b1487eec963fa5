//! Interrupt latching and decoding.
//!
//! Once per tick every status register is read and cleared into an
//! [`InterruptSnapshot`]. The snapshot is then decoded into typed
//! [`Event`]s, keeping only the bits that mean something in the current
//! top-level state. The bridge hands each event to the one component that
//! owns it.

use heapless::Vec;
use platform::{Device, Hardware};

use crate::detect::CableType;
use crate::dpcd;
use crate::infoframe::InfoFrameKind;
use crate::registers::{rx_p0, tx_p2};
use crate::state::SystemState;
use crate::Result;

/// Most events one snapshot can produce.
pub const MAX_EVENTS: usize = 24;

/// A CEC frame from the converter.
pub type CecFrame = Vec<u8, { dpcd::CEC_MAX_LEN }>;

/// Status bytes latched (and cleared) in one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptSnapshot {
    /// TX COMMON_INT1.
    pub common1: u8,
    /// TX COMMON_INT2.
    pub common2: u8,
    /// TX DP_INT.
    pub dp: u8,
    /// RX_INT1.
    pub rx1: u8,
    /// RX_INT2.
    pub rx2: u8,
    /// RX_INT3.
    pub rx3: u8,
    /// DPCD DEVICE_SERVICE_IRQ_VECTOR, when the sink raised an IRQ.
    pub service: u8,
    /// DPCD BSTATUS, when the sink raised a CP_IRQ.
    pub bstatus: u8,
    /// Converter IRQ vector, when a converter raised a sink-specific IRQ.
    pub converter: u8,
}

fn take<H: Hardware>(hw: &mut H, dev: Device, offset: u8) -> Result<u8> {
    let v = hw.read(dev, offset)?;
    if v != 0 {
        hw.write(dev, offset, v)?;
    }
    Ok(v)
}

impl InterruptSnapshot {
    /// Nothing pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Read and clear every interrupt source.
    pub(crate) fn latch<H: Hardware>(hw: &mut H, cable: CableType) -> Result<Self> {
        let mut snap = Self {
            common1: take(hw, tx_p2::DEV, tx_p2::COMMON_INT1)?,
            common2: take(hw, tx_p2::DEV, tx_p2::COMMON_INT2)?,
            dp: take(hw, tx_p2::DEV, tx_p2::DP_INT)?,
            rx1: take(hw, rx_p0::DEV, rx_p0::RX_INT1)?,
            rx2: take(hw, rx_p0::DEV, rx_p0::RX_INT2)?,
            rx3: take(hw, rx_p0::DEV, rx_p0::RX_INT3)?,
            ..Self::default()
        };

        if snap.dp & tx_p2::SINK_IRQ != 0 {
            snap.service = hw.aux_read_byte(dpcd::DEVICE_SERVICE_IRQ_VECTOR)?;
            if snap.service != 0 {
                hw.aux_write_byte(dpcd::DEVICE_SERVICE_IRQ_VECTOR, snap.service)?;
            }
            if snap.service & dpcd::CP_IRQ != 0 {
                snap.bstatus = hw.aux_read_byte(dpcd::BSTATUS)?;
            }
            if snap.service & dpcd::SINK_SPECIFIC_IRQ != 0 && cable.is_converter() {
                snap.converter = hw.aux_read_byte(dpcd::CONVERTER_IRQ)?;
                if snap.converter != 0 {
                    hw.aux_write_byte(dpcd::CONVERTER_IRQ, snap.converter)?;
                }
            }
        }

        if !snap.is_empty() {
            trace!(
                "irq tx {:#x} {:#x} {:#x} rx {:#x} {:#x} {:#x}",
                snap.common1,
                snap.common2,
                snap.dp,
                snap.rx1,
                snap.rx2,
                snap.rx3
            );
        }
        Ok(snap)
    }
}

/// A decoded interrupt, addressed to the component that handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Link PLL lost or regained lock.
    PllLockChanged,
    /// Hardware link training finished.
    TrainingFinished,
    /// Sink reported a link status change.
    LinkChanged,
    /// HPD dropped.
    HpdLost,
    /// Hardware HDCP authentication finished.
    HdcpAuthDone,
    /// HDCP link integrity check failed.
    HdcpLinkCheckFailed,
    /// HDMI input clock detect changed.
    RxClockChanged,
    /// HDMI input sync detect changed.
    RxSyncChanged,
    /// HDMI input switched between HDMI and DVI.
    HdmiModeChanged,
    /// New infoframe on the input.
    NewInfoFrame(InfoFrameKind),
    /// Audio clock regeneration packet received.
    CtsReceived,
    /// Audio samples received.
    AudioReceived,
    /// Converter downstream HPD changed.
    DownstreamHpdChanged,
    /// Converter downstream HDCP failed.
    DownstreamHdcpFailed,
    /// Converter downstream EDID changed.
    DownstreamEdidChanged,
    /// Converter received a CEC message.
    CecMessage,
}

/// Decode a snapshot, dropping bits that do not apply in `state`.
#[must_use]
pub fn decode(snap: &InterruptSnapshot, state: SystemState) -> Vec<Event, MAX_EVENTS> {
    use SystemState as S;

    let mut events = Vec::new();
    let mut emit = |cond: bool, event: Event| {
        if cond && events.push(event).is_err() {
            warn!("event queue full, dropped {:?}", event);
        }
    };

    emit(snap.common1 & tx_p2::PLL_LOCK_CHG != 0 && state > S::LinkTraining, Event::PllLockChanged);
    emit(snap.dp & tx_p2::TRAINING_FINISHED != 0 && state == S::LinkTraining, Event::TrainingFinished);
    emit(snap.dp & tx_p2::LINK_CHANGED != 0 && state > S::LinkTraining, Event::LinkChanged);
    emit(snap.dp & tx_p2::HPD_LOST != 0 && state >= S::SinkConnected, Event::HpdLost);

    emit(snap.common2 & tx_p2::HDCP_AUTH_DONE != 0 && state == S::HdcpAuth, Event::HdcpAuthDone);
    let integrity = snap.common2 & tx_p2::HDCP_LINK_CHK_FAIL != 0
        || snap.bstatus & dpcd::BSTATUS_LINK_INTEGRITY_FAIL != 0;
    emit(integrity && state > S::HdcpAuth, Event::HdcpLinkCheckFailed);

    emit(snap.rx1 & rx_p0::CKDT_CHG != 0 && state >= S::VideoOutput, Event::RxClockChanged);
    emit(snap.rx1 & rx_p0::SCDT_CHG != 0 && state >= S::VideoOutput, Event::RxSyncChanged);
    emit(snap.rx1 & rx_p0::HDMI_DVI_CHG != 0 && state > S::LinkTraining, Event::HdmiModeChanged);

    let frames = [
        (rx_p0::NEW_AVI, InfoFrameKind::Avi, S::VideoOutput),
        (rx_p0::NEW_SPD, InfoFrameKind::Spd, S::VideoOutput),
        (rx_p0::NEW_VSI, InfoFrameKind::Vendor, S::VideoOutput),
        (rx_p0::NEW_AUD_IF, InfoFrameKind::Audio, S::AudioOutput),
    ];
    for (bit, kind, after) in frames {
        emit(snap.rx2 & bit != 0 && state > after, Event::NewInfoFrame(kind));
    }

    emit(snap.rx3 & rx_p0::CTS_RCV != 0 && state == S::AudioOutput, Event::CtsReceived);
    emit(snap.rx3 & rx_p0::AUDIO_RCV != 0 && state == S::AudioOutput, Event::AudioReceived);

    emit(snap.converter & dpcd::DOWNSTREAM_HPD_CHG != 0 && state > S::SinkConnected, Event::DownstreamHpdChanged);
    emit(snap.converter & dpcd::DOWNSTREAM_HDCP_FAIL != 0 && state >= S::HdcpAuth, Event::DownstreamHdcpFailed);
    emit(snap.converter & dpcd::DOWNSTREAM_EDID_CHG != 0 && state > S::Edid, Event::DownstreamEdidChanged);
    emit(snap.converter & dpcd::CEC_MSG_RCV != 0 && state >= S::SinkConnected, Event::CecMessage);

    events
}

/// Read one frame from the converter's CEC buffer.
pub(crate) fn read_cec<H: Hardware>(hw: &mut H) -> Result<Option<CecFrame>> {
    let mut buf = [0u8; 1 + dpcd::CEC_MAX_LEN];
    hw.aux_read(dpcd::CEC_RX_BUF, &mut buf)?;
    let Some((&len, body)) = buf.split_first() else {
        return Ok(None);
    };
    let len = usize::from(len).min(dpcd::CEC_MAX_LEN);
    if len == 0 {
        return Ok(None);
    }
    let frame = body
        .get(..len)
        .and_then(|b| Vec::from_slice(b).ok());
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_decodes_to_nothing() {
        let snap = InterruptSnapshot::default();
        assert!(snap.is_empty());
        assert!(decode(&snap, SystemState::Playback).is_empty());
    }

    #[test]
    fn training_finished_only_while_training() {
        let snap = InterruptSnapshot {
            dp: tx_p2::TRAINING_FINISHED,
            ..Default::default()
        };
        assert_eq!(decode(&snap, SystemState::LinkTraining).as_slice(), &[Event::TrainingFinished]);
        assert!(decode(&snap, SystemState::VideoOutput).is_empty());
        assert!(decode(&snap, SystemState::Edid).is_empty());
    }

    #[test]
    fn audio_bits_gated_to_audio_output() {
        let snap = InterruptSnapshot {
            rx3: rx_p0::CTS_RCV | rx_p0::AUDIO_RCV,
            ..Default::default()
        };
        assert_eq!(
            decode(&snap, SystemState::AudioOutput).as_slice(),
            &[Event::CtsReceived, Event::AudioReceived]
        );
        assert!(decode(&snap, SystemState::Playback).is_empty());
    }

    #[test]
    fn bstatus_integrity_failure_after_auth() {
        let snap = InterruptSnapshot {
            bstatus: dpcd::BSTATUS_LINK_INTEGRITY_FAIL,
            ..Default::default()
        };
        assert_eq!(decode(&snap, SystemState::Playback).as_slice(), &[Event::HdcpLinkCheckFailed]);
        assert!(decode(&snap, SystemState::HdcpAuth).is_empty());
    }

    #[test]
    fn every_bit_at_once_fits() {
        let snap = InterruptSnapshot {
            common1: 0xFF,
            common2: 0xFF,
            dp: 0xFF,
            rx1: 0xFF,
            rx2: 0xFF,
            rx3: 0xFF,
            service: 0xFF,
            bstatus: 0xFF,
            converter: 0xFF,
        };
        for state in [SystemState::LinkTraining, SystemState::HdcpAuth, SystemState::AudioOutput, SystemState::Playback] {
            assert!(decode(&snap, state).len() < MAX_EVENTS);
        }
    }
}
