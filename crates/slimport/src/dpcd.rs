//! Sink-side DPCD registers and decoders for the fields the bridge reads.

use platform::AuxAddress;

/// DPCD revision (0x10 = 1.0, 0x11 = 1.1, 0x12 = 1.2).
pub const DPCD_REV: AuxAddress = AuxAddress::force_raw(0x00000);
/// Maximum link rate code.
pub const MAX_LINK_RATE: AuxAddress = AuxAddress::force_raw(0x00001);
/// Maximum lane count (bits 4:0) and enhanced framing (bit 7).
pub const MAX_LANE_COUNT: AuxAddress = AuxAddress::force_raw(0x00002);
/// Bit 0: sink supports 0.5 % down-spread.
pub const MAX_DOWNSPREAD: AuxAddress = AuxAddress::force_raw(0x00003);
/// Branch device and downstream port type.
pub const DOWNSTREAM_PORT_PRESENT: AuxAddress = AuxAddress::force_raw(0x00005);
/// Length of the receiver capability field read at classification.
pub const RECEIVER_CAP_LEN: usize = 16;

/// Link rate actually configured.
pub const LINK_BW_SET: AuxAddress = AuxAddress::force_raw(0x00100);
/// Down-spread control.
pub const DOWNSPREAD_CTRL: AuxAddress = AuxAddress::force_raw(0x00107);
/// SPREAD_AMP: enable 0.5 % down-spread.
pub const SPREAD_AMP: u8 = 1 << 4;

/// Sink count.
pub const SINK_COUNT: AuxAddress = AuxAddress::force_raw(0x00200);
/// Device service IRQ vector (write 1 to clear).
pub const DEVICE_SERVICE_IRQ_VECTOR: AuxAddress = AuxAddress::force_raw(0x00201);
/// Content-protection IRQ.
pub const CP_IRQ: u8 = 1 << 2;
/// Sink-specific IRQ: read the converter vector.
pub const SINK_SPECIFIC_IRQ: u8 = 1 << 6;
/// Lane 0/1 status nibbles.
pub const LANE0_1_STATUS: AuxAddress = AuxAddress::force_raw(0x00202);
/// Lane alignment status.
pub const LANE_ALIGN_STATUS: AuxAddress = AuxAddress::force_raw(0x00204);
/// Inter-lane alignment done.
pub const INTERLANE_ALIGN_DONE: u8 = 1 << 0;
/// Lane 0 symbol error counter (15 bits, bit 15 valid).
pub const SYMBOL_ERROR_COUNT_LANE0: AuxAddress = AuxAddress::force_raw(0x00210);

/// Branch device IEEE OUI (three bytes).
pub const BRANCH_OUI: AuxAddress = AuxAddress::force_raw(0x00500);
/// Branch device id string (six ASCII bytes).
pub const BRANCH_DEVICE_ID: AuxAddress = AuxAddress::force_raw(0x00503);

/// Converter-specific IRQ vector (write 1 to clear).
pub const CONVERTER_IRQ: AuxAddress = AuxAddress::force_raw(0x00510);
/// Downstream HPD changed.
pub const DOWNSTREAM_HPD_CHG: u8 = 1 << 0;
/// Downstream HDCP failure.
pub const DOWNSTREAM_HDCP_FAIL: u8 = 1 << 1;
/// Downstream EDID changed.
pub const DOWNSTREAM_EDID_CHG: u8 = 1 << 2;
/// CEC message waiting in the receive buffer.
pub const CEC_MSG_RCV: u8 = 1 << 3;
/// Converter IRQ mask (1 = enabled).
pub const CONVERTER_IRQ_MASK: AuxAddress = AuxAddress::force_raw(0x00511);
/// Converter charging capability.
pub const CHARGING_CAP: AuxAddress = AuxAddress::force_raw(0x00522);
/// Bit 0: converter can charge the source.
pub const CHARGING_SUPPORTED: u8 = 1 << 0;
/// Bit 1: fast (>= 1.5 A) charging.
pub const CHARGING_FAST: u8 = 1 << 1;
/// Converter status.
pub const CONVERTER_STATUS: AuxAddress = AuxAddress::force_raw(0x00523);
/// Downstream stage is displaying video.
pub const DOWNSTREAM_VIDEO_READY: u8 = 1 << 0;
/// Input-type announce: 1 HDMI, 0 DVI.
pub const INPUT_TYPE: AuxAddress = AuxAddress::force_raw(0x00526);
/// CEC receive buffer: length byte then payload.
pub const CEC_RX_BUF: AuxAddress = AuxAddress::force_raw(0x00570);
/// Largest CEC frame.
pub const CEC_MAX_LEN: usize = 16;

/// Sink power state.
pub const SET_POWER: AuxAddress = AuxAddress::force_raw(0x00600);
/// D0: normal operation.
pub const SET_POWER_D0: u8 = 0x01;

/// HDCP receiver capabilities.
pub const BCAPS: AuxAddress = AuxAddress::force_raw(0x68028);
/// Sink is HDCP capable.
pub const BCAPS_HDCP_CAPABLE: u8 = 1 << 0;
/// Sink is an HDCP repeater.
pub const BCAPS_REPEATER: u8 = 1 << 1;
/// HDCP receiver status.
pub const BSTATUS: AuxAddress = AuxAddress::force_raw(0x68029);
/// Link integrity failure.
pub const BSTATUS_LINK_INTEGRITY_FAIL: u8 = 1 << 2;
/// Repeater topology information (two bytes).
pub const BINFO: AuxAddress = AuxAddress::force_raw(0x6802A);
/// BINFO byte 0: too many downstream devices.
pub const BINFO_MAX_DEVS_EXCEEDED: u8 = 1 << 7;
/// BINFO byte 1: topology too deep.
pub const BINFO_MAX_CASCADE_EXCEEDED: u8 = 1 << 3;

// ─── Decoders ────────────────────────────────────────────────────────────────

/// Status nibble of `lane` from the LANE0_1_STATUS / LANE2_3_STATUS bytes.
#[allow(clippy::arithmetic_side_effects)]
fn lane_nibble(status: &[u8], lane: u8) -> Option<u8> {
    let byte = status.get(usize::from(lane / 2))?;
    let shift = if lane % 2 == 0 { 0 } else { 4 };
    Some((byte >> shift) & 0x0F)
}

/// Every active lane reports clock recovery done.
#[must_use]
pub fn clock_recovery_done(status: &[u8], lanes: u8) -> bool {
    (0..lanes).all(|l| lane_nibble(status, l).is_some_and(|n| n & 0x01 != 0))
}

/// Every active lane reports CR done, channel EQ done and symbol lock.
#[must_use]
pub fn channel_eq_done(status: &[u8], lanes: u8) -> bool {
    (0..lanes).all(|l| lane_nibble(status, l).is_some_and(|n| n & 0x07 == 0x07))
}

/// Decode a SYMBOL_ERROR_COUNT pair. `None` when the valid bit is clear.
#[must_use]
pub fn symbol_error_count(lo: u8, hi: u8) -> Option<u16> {
    if hi & 0x80 == 0 {
        return None;
    }
    Some(u16::from_le_bytes([lo, hi & 0x7F]))
}

/// Downstream port type from DOWNSTREAM_PORT_PRESENT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortType {
    /// No branch device: the sink is a native DisplayPort receiver.
    NoBranch,
    /// Branch to DisplayPort.
    DisplayPort,
    /// Branch to analog VGA.
    Vga,
    /// Branch to HDMI or DVI.
    Hdmi,
    /// Any other converter.
    Other,
}

impl PortType {
    /// Decode DOWNSTREAM_PORT_PRESENT.
    #[must_use]
    pub fn from_register(v: u8) -> Self {
        if v & 0x01 == 0 {
            return PortType::NoBranch;
        }
        match (v >> 1) & 0x03 {
            0 => PortType::DisplayPort,
            1 => PortType::Vga,
            2 => PortType::Hdmi,
            _ => PortType::Other,
        }
    }
}
