//! Cable and sink-type detection.
//!
//! Once the cable-detect line is asserted the sink is classified from its
//! DPCD receiver capability field and, for branch devices, the downstream
//! port type. Connectors bounce, so classification is retried with a short
//! settle delay before the cable is declared unusable.
//!
//! Known converter families are recognised by branch OUI and device id and
//! get one-time quirks applied (charging capability, IRQ unmasking).

use embedded_hal::delay::DelayNs;
use platform::{AuxError, Hardware};

use crate::dpcd::{self, PortType};
use crate::link::LinkBandwidth;
use crate::session::Ctx;

/// What is attached at the far end of the cable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CableType {
    /// Nothing classified yet.
    #[default]
    None,
    /// DisplayPort-to-HDMI converter.
    HdmiConverter,
    /// Native DisplayPort sink.
    DisplayPort,
    /// DisplayPort-to-VGA converter.
    Analog,
    /// VGA converter family needing its IRQs unmasked.
    VgaVariant,
}

impl CableType {
    /// The sink is a protocol converter with its own downstream port.
    #[must_use]
    pub const fn is_converter(self) -> bool {
        matches!(
            self,
            CableType::HdmiConverter | CableType::Analog | CableType::VgaVariant
        )
    }

    /// The downstream path is analog; colour-space conversion applies.
    #[must_use]
    pub const fn is_analog(self) -> bool {
        matches!(self, CableType::Analog | CableType::VgaVariant)
    }
}

/// Charging capability advertised by the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargingCapability {
    /// No converter classified yet.
    #[default]
    Unknown,
    /// The attached sink cannot charge the source.
    NotSupported,
    /// The converter can charge the source.
    Supported {
        /// At least 1.5 A available.
        fast: bool,
    },
}

/// Vendor-specific behaviour keyed on branch OUI and device id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Quirk {
    /// HDMI converter with charging support and input-type announce.
    HdmiCharging,
    /// VGA converter whose IRQs come up masked.
    VgaIrqMasked,
}

/// Analogix IEEE OUI.
pub const ANALOGIX_OUI: [u8; 3] = [0x00, 0x22, 0xB9];

const QUIRKS: [([u8; 3], &[u8], Quirk); 2] = [
    (ANALOGIX_OUI, b"7730", Quirk::HdmiCharging),
    (ANALOGIX_OUI, b"9832", Quirk::VgaIrqMasked),
];

/// Look up the quirk for a branch device.
#[must_use]
pub fn lookup_quirk(oui: [u8; 3], device_id: &[u8; 6]) -> Option<Quirk> {
    QUIRKS
        .iter()
        .find(|(o, id, _)| *o == oui && device_id.starts_with(id))
        .map(|&(_, _, q)| q)
}

/// Sink capabilities captured at classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SinkInfo {
    /// DPCD revision byte.
    pub dpcd_rev: u8,
    /// Fastest rate the sink accepts.
    pub max_bandwidth: LinkBandwidth,
    /// Lanes the sink accepts.
    pub max_lanes: u8,
    /// Enhanced framing supported.
    pub enhanced_framing: bool,
    /// 0.5 % down-spread supported.
    pub downspread: bool,
    /// Downstream port type.
    pub port: PortType,
    /// Branch OUI (zero for native sinks).
    pub oui: [u8; 3],
    /// Branch device id string.
    pub device_id: [u8; 6],
    /// Applied vendor quirk.
    pub quirk: Option<Quirk>,
}

impl Default for SinkInfo {
    fn default() -> Self {
        Self {
            dpcd_rev: 0,
            max_bandwidth: LinkBandwidth::Rate1G62,
            max_lanes: 1,
            enhanced_framing: false,
            downspread: false,
            port: PortType::NoBranch,
            oui: [0; 3],
            device_id: [0; 6],
            quirk: None,
        }
    }
}

/// Successful classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Detection {
    pub cable: CableType,
    pub sink: SinkInfo,
    pub charging: ChargingCapability,
}

/// Read the sink once. `Ok(None)` when the answer is not a usable sink.
pub(crate) fn probe<H: Hardware>(hw: &mut H) -> Result<Option<(CableType, SinkInfo)>, AuxError> {
    let mut caps = [0u8; dpcd::RECEIVER_CAP_LEN];
    hw.aux_read(dpcd::DPCD_REV, &mut caps)?;
    let [rev, rate, lanes, spread, _, port, ..] = caps;
    if rev == 0x00 || rev == 0xFF || lanes & 0x1F == 0 {
        return Ok(None);
    }

    let mut branch = [0u8; 9];
    hw.aux_read(dpcd::BRANCH_OUI, &mut branch)?;
    let [o0, o1, o2, d0, d1, d2, d3, d4, d5] = branch;
    let oui = [o0, o1, o2];
    let device_id = [d0, d1, d2, d3, d4, d5];
    let quirk = lookup_quirk(oui, &device_id);

    let port = PortType::from_register(port);
    let cable = match (port, quirk) {
        (PortType::NoBranch | PortType::DisplayPort, _) => CableType::DisplayPort,
        (PortType::Hdmi, _) => CableType::HdmiConverter,
        (PortType::Vga, Some(Quirk::VgaIrqMasked)) => CableType::VgaVariant,
        (PortType::Vga, _) => CableType::Analog,
        (PortType::Other, _) => {
            warn!("unsupported downstream port, device id {:?}", device_id);
            return Ok(None);
        }
    };

    Ok(Some((
        cable,
        SinkInfo {
            dpcd_rev: rev,
            max_bandwidth: LinkBandwidth::from_code_floor(rate),
            max_lanes: lanes & 0x1F,
            enhanced_framing: lanes & 0x80 != 0,
            downspread: spread & 0x01 != 0,
            port,
            oui,
            device_id,
            quirk,
        },
    )))
}

/// Classify the sink, retrying across connector bounce, then apply quirks.
///
/// `Ok(None)` after every attempt failed: the caller treats the cable as
/// unusable and power-cycles.
pub(crate) fn classify<H: Hardware, D: DelayNs>(
    ctx: &mut Ctx<'_, H, D>,
) -> crate::Result<Option<Detection>> {
    let attempts = ctx.config.retry.detect_retries;
    for attempt in 1..=attempts {
        match probe(ctx.hw) {
            Ok(Some((cable, sink))) => {
                info!(
                    "sink classified as {:?} (DPCD rev {:#x}, max {:?} x{})",
                    cable,
                    sink.dpcd_rev,
                    sink.max_bandwidth,
                    sink.max_lanes
                );
                let charging = apply_quirks(ctx, sink.quirk)?;
                return Ok(Some(Detection {
                    cable,
                    sink,
                    charging,
                }));
            }
            Ok(None) => debug!("classification attempt {} found no sink", attempt),
            Err(e) => debug!("classification attempt {} AUX error {:?}", attempt, e),
        }
        ctx.delay.delay_ms(ctx.config.retry.detect_settle_ms);
    }
    warn!("sink classification failed after {} attempts", attempts);
    Ok(None)
}

fn apply_quirks<H: Hardware, D: DelayNs>(
    ctx: &mut Ctx<'_, H, D>,
    quirk: Option<Quirk>,
) -> crate::Result<ChargingCapability> {
    match quirk {
        Some(Quirk::HdmiCharging) => {
            let cap = ctx.hw.aux_read_byte(dpcd::CHARGING_CAP)?;
            let charging = if cap & dpcd::CHARGING_SUPPORTED != 0 {
                ChargingCapability::Supported {
                    fast: cap & dpcd::CHARGING_FAST != 0,
                }
            } else {
                ChargingCapability::NotSupported
            };
            info!("converter charging capability {:?}", charging);
            Ok(charging)
        }
        Some(Quirk::VgaIrqMasked) => {
            ctx.hw.aux_write_byte(dpcd::CONVERTER_IRQ_MASK, 0xFF)?;
            Ok(ChargingCapability::NotSupported)
        }
        None => Ok(ChargingCapability::NotSupported),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quirk_lookup_matches_oui_and_id_prefix() {
        assert_eq!(
            lookup_quirk(ANALOGIX_OUI, b"7730\0\0"),
            Some(Quirk::HdmiCharging)
        );
        assert_eq!(
            lookup_quirk(ANALOGIX_OUI, b"9832A\0"),
            Some(Quirk::VgaIrqMasked)
        );
        assert_eq!(lookup_quirk([0x00, 0x1C, 0xF8], b"7730\0\0"), None);
        assert_eq!(lookup_quirk(ANALOGIX_OUI, b"7737\0\0"), None);
    }

    #[test]
    fn converter_and_analog_classes() {
        assert!(CableType::HdmiConverter.is_converter());
        assert!(!CableType::DisplayPort.is_converter());
        assert!(CableType::VgaVariant.is_analog());
        assert!(!CableType::HdmiConverter.is_analog());
    }
}
