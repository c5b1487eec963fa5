//! Behavioural transmitter simulator for tests and host bring-up.
//!
//! [`SimChip`] implements every collaborator trait. It keeps a register file
//! per block, a DPCD space and an EDID ROM, and models just enough of the
//! chip to drive the bridge end to end:
//!
//! - interrupt status registers are write-1-to-clear;
//! - writing LT_EN runs "hardware" link training at once, fills in lane
//!   status, M/N and raises TRAINING_FINISHED;
//! - a rising HARD_AUTH_EN runs HDCP authentication and raises
//!   HDCP_AUTH_DONE;
//! - a streaming audio input keeps re-asserting CTS and audio-sample bits.
//! - injected symbol-error counts are reported per pre-emphasis level and
//!   can optionally be cleared by a SerDes FIFO reset.
//!
//! Faults and counters let tests steer and observe the bridge.

#![allow(
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::large_stack_arrays,
    clippy::cast_possible_truncation
)]

use platform::{AuxAddress, AuxChannel, AuxError, BusError, Device, PowerControl, PresenceDetect, RegisterBus};

use crate::detect::ANALOGIX_OUI;
use crate::dpcd;
use crate::edid::{EDID_HEADER, EDID_SLAVE, SEGMENT_SLAVE};
use crate::registers::{infoframe_slot, rx_p0, rx_p1, tx_p0, tx_p2};

const DPCD_LEN: usize = 0x800;
const HDCP_PORT_BASE: u32 = 0x6_8000;
const HDCP_PORT_LEN: usize = 0x100;
const EDID_ROM_LEN: usize = 512;
const N_VID: u32 = 0x8000;

/// Build a 128-byte EDID base block with one detailed timing.
///
/// `serial` lands in the serial-number field so two otherwise identical
/// sinks can be told apart by checksum.
#[must_use]
pub fn build_edid(pixel_clock_10khz: u16, extensions: u8, serial: u8) -> [u8; 128] {
    let mut block = [0u8; 128];
    block[..8].copy_from_slice(&EDID_HEADER);
    block[0x08] = 0x04;
    block[0x09] = 0x43;
    block[0x0C] = serial;
    block[0x12] = 1;
    block[0x13] = 4;
    block[0x36..0x38].copy_from_slice(&pixel_clock_10khz.to_le_bytes());
    block[0x38] = 0x80;
    block[0x3A] = 0x40;
    block[0x7E] = extensions;
    fix_checksum(&mut block);
    block
}

/// Build a CEA-861 extension block whose detailed timings start at 0x04.
#[must_use]
pub fn build_cea_extension(pixel_clocks_10khz: &[u16]) -> [u8; 128] {
    let mut block = [0u8; 128];
    block[0] = 0x02;
    block[1] = 0x03;
    block[2] = 0x04;
    for (i, clock) in pixel_clocks_10khz.iter().take(6).enumerate() {
        let at = 4 + i * 18;
        block[at..at + 2].copy_from_slice(&clock.to_le_bytes());
    }
    fix_checksum(&mut block);
    block
}

fn fix_checksum(block: &mut [u8; 128]) {
    let sum = block[..127].iter().fold(0u8, |a, b| a.wrapping_add(*b));
    block[127] = 0u8.wrapping_sub(sum);
}

/// Infoframe slot image with a valid checksum.
#[must_use]
pub fn build_infoframe(type_code: u8, version: u8, payload: &[u8]) -> [u8; infoframe_slot::SLOT_LEN] {
    let mut raw = [0u8; infoframe_slot::SLOT_LEN];
    let len = payload.len().min(infoframe_slot::MAX_PAYLOAD);
    raw[0] = type_code;
    raw[1] = version;
    raw[2] = len as u8;
    raw[4..4 + len].copy_from_slice(&payload[..len]);
    let sum = raw.iter().fold(0u8, |a, b| a.wrapping_add(*b));
    raw[3] = 0u8.wrapping_sub(sum);
    raw
}

/// Simulated transmitter plus attached sink.
#[derive(Debug, Clone)]
pub struct SimChip {
    regs: [[u8; 256]; 5],
    dpcd: [u8; DPCD_LEN],
    hdcp_port: [u8; HDCP_PORT_LEN],
    edid: [u8; EDID_ROM_LEN],
    edid_offset: u8,
    edid_segment: u8,

    present: bool,
    powered: bool,
    lt_max_code: u8,
    lane_aligned_after_training: bool,
    hdcp_passes: bool,
    input_pixel_clock_khz: u32,
    audio_streaming: bool,
    aux_fault: bool,
    bus_fault: bool,
    edid_faults: u32,
    symbol_errors: Option<[u16; 4]>,
    fifo_reset_clears_errors: bool,

    edid_chunk_reads: u32,
    aux_reads: u32,
    power_ons: u32,
    power_downs: u32,
    hdcp_arms: u32,
    lt_arms: u32,
    fifo_resets: u32,
}

impl Default for SimChip {
    fn default() -> Self {
        Self::new()
    }
}

impl SimChip {
    /// A powered-down chip with nothing attached.
    #[must_use]
    pub fn new() -> Self {
        let mut chip = Self {
            regs: [[0; 256]; 5],
            dpcd: [0; DPCD_LEN],
            hdcp_port: [0; HDCP_PORT_LEN],
            edid: [0xFF; EDID_ROM_LEN],
            edid_offset: 0,
            edid_segment: 0,
            present: false,
            powered: false,
            lt_max_code: 0xFF,
            lane_aligned_after_training: true,
            hdcp_passes: true,
            input_pixel_clock_khz: 148_500,
            audio_streaming: false,
            aux_fault: false,
            bus_fault: false,
            edid_faults: 0,
            symbol_errors: None,
            fifo_reset_clears_errors: false,
            edid_chunk_reads: 0,
            aux_reads: 0,
            power_ons: 0,
            power_downs: 0,
            hdcp_arms: 0,
            lt_arms: 0,
            fifo_resets: 0,
        };
        chip.set_reg(Device::TxP2, tx_p2::DEVICE_ID_L, 0x16);
        chip.set_reg(Device::TxP2, tx_p2::DEVICE_ID_H, 0x78);
        chip.set_reg(Device::TxP2, tx_p2::POWERD_CTRL, 0xFF);
        chip.set_reg(Device::TxP0, tx_p0::PLL_STATUS, tx_p0::PLL_LOCK);
        chip
    }

    /// Native DisplayPort 1.2 sink at 5.4 Gbps x1, HDCP capable, with a
    /// 1080p60 EDID, and a stable 1080p60 HDMI input carrying audio.
    #[must_use]
    pub fn displayport_sink() -> Self {
        let mut chip = Self::new();
        chip.present = true;
        chip.set_dpcd(dpcd::DPCD_REV, &[0x12, 0x14, 0x81, 0x01, 0x00, 0x00]);
        chip.set_dpcd(dpcd::SYMBOL_ERROR_COUNT_LANE0, &[0x00, 0x80]);
        chip.set_dpcd(dpcd::BCAPS, &[dpcd::BCAPS_HDCP_CAPABLE]);
        chip.load_edid(&build_edid(14_850, 0, 1));

        chip.set_reg(Device::TxP0, tx_p0::SYS_CTRL3, tx_p0::STRM_VALID);
        chip.set_reg(Device::RxP0, rx_p0::SYS_STATUS, rx_p0::CKDT | rx_p0::SCDT);
        chip.set_reg(Device::RxP0, rx_p0::HDMI_STATUS, rx_p0::HDMI_MODE);
        for (i, b) in [0x04, 0x00, 0x00, 0x02, 0x02].into_iter().enumerate() {
            chip.set_reg(Device::RxP0, rx_p0::AUD_CH_STATUS_0 + i as u8, b);
        }
        // VIC 16, RGB, no colorimetry.
        chip.load_rx_buffer(rx_p1::AVI_BUF, &build_infoframe(0x82, 0x02, &[0x00, 0x00, 0x00, 16, 0, 0, 0, 0, 0, 0, 0, 0, 0]));
        chip.load_rx_buffer(rx_p1::AUD_BUF, &build_infoframe(0x84, 0x01, &[0x01, 0x00, 0x00, 0x00, 0, 0, 0, 0, 0, 0]));
        chip.audio_streaming = true;
        chip
    }

    /// Analogix "7730" DisplayPort-to-HDMI converter with fast charging.
    #[must_use]
    pub fn hdmi_converter() -> Self {
        let mut chip = Self::displayport_sink();
        chip.set_dpcd(dpcd::DOWNSTREAM_PORT_PRESENT, &[0x05]);
        chip.set_branch(ANALOGIX_OUI, b"7730\0\0");
        chip.set_dpcd(
            dpcd::CHARGING_CAP,
            &[dpcd::CHARGING_SUPPORTED | dpcd::CHARGING_FAST, dpcd::DOWNSTREAM_VIDEO_READY],
        );
        chip
    }

    /// Analogix "9832" DisplayPort-to-VGA converter.
    #[must_use]
    pub fn vga_converter() -> Self {
        let mut chip = Self::displayport_sink();
        chip.set_dpcd(dpcd::DOWNSTREAM_PORT_PRESENT, &[0x03]);
        chip.set_branch(ANALOGIX_OUI, b"9832\0\0");
        chip
    }

    // ─── Knobs ───────────────────────────────────────────────────────────────

    /// Drive the cable-detect line.
    pub fn set_present(&mut self, present: bool) {
        self.present = present;
    }

    /// Training succeeds only at link-rate codes up to `code`.
    pub fn set_link_training_max_code(&mut self, code: u8) {
        self.lt_max_code = code;
    }

    /// Whether successful training leaves the lanes aligned.
    pub fn set_lane_aligned_after_training(&mut self, aligned: bool) {
        self.lane_aligned_after_training = aligned;
    }

    /// Drive the lane-alignment status bit directly.
    pub fn set_lane_aligned(&mut self, aligned: bool) {
        self.set_dpcd(dpcd::LANE_ALIGN_STATUS, &[u8::from(aligned)]);
    }

    /// Outcome of every HDCP authentication.
    pub fn set_hdcp_passes(&mut self, passes: bool) {
        self.hdcp_passes = passes;
    }

    /// Pixel clock of the HDMI input, reflected in M/N after training.
    pub fn set_input_pixel_clock_khz(&mut self, khz: u32) {
        self.input_pixel_clock_khz = khz;
    }

    /// Keep the audio interrupts firing.
    pub fn set_audio_streaming(&mut self, streaming: bool) {
        self.audio_streaming = streaming;
        let bits = if streaming {
            rx_p0::CTS_RCV | rx_p0::AUDIO_RCV
        } else {
            0
        };
        self.set_reg(Device::RxP0, rx_p0::RX_INT3, bits);
    }

    /// Every AUX transaction times out.
    pub fn set_aux_fault(&mut self, fault: bool) {
        self.aux_fault = fault;
    }

    /// Every register access fails.
    pub fn set_bus_fault(&mut self, fault: bool) {
        self.bus_fault = fault;
    }

    /// Lane-0 symbol errors the sink reports, per pre-emphasis level.
    pub fn set_symbol_errors(&mut self, per_level: [u16; 4]) {
        self.symbol_errors = Some(per_level);
    }

    /// Whether a SerDes FIFO reset pulse clears the symbol errors.
    pub fn set_fifo_reset_clears_errors(&mut self, clears: bool) {
        self.fifo_reset_clears_errors = clears;
    }

    /// Drive the converter's downstream video-ready bit.
    pub fn set_downstream_video_ready(&mut self, ready: bool) {
        let status = if ready { dpcd::DOWNSTREAM_VIDEO_READY } else { 0 };
        self.set_dpcd(dpcd::CONVERTER_STATUS, &[status]);
    }

    /// Fail the next `n` EDID chunk reads.
    pub fn fail_next_edid_reads(&mut self, n: u32) {
        self.edid_faults = n;
    }

    /// Replace the EDID ROM (up to 512 bytes, rest erased).
    pub fn load_edid(&mut self, data: &[u8]) {
        self.edid = [0xFF; EDID_ROM_LEN];
        let len = data.len().min(EDID_ROM_LEN);
        self.edid[..len].copy_from_slice(&data[..len]);
    }

    /// Set branch OUI and device id.
    pub fn set_branch(&mut self, oui: [u8; 3], device_id: &[u8; 6]) {
        self.set_dpcd(dpcd::BRANCH_OUI, &oui);
        self.set_dpcd(dpcd::BRANCH_DEVICE_ID, device_id);
    }

    /// Write DPCD (or HDCP port) bytes without side effects.
    pub fn set_dpcd(&mut self, addr: AuxAddress, data: &[u8]) {
        for (i, b) in data.iter().enumerate() {
            if let Some(slot) = self.dpcd_slot(addr.get() + i as u32) {
                *slot = *b;
            }
        }
    }

    /// Read one DPCD (or HDCP port) byte.
    #[must_use]
    pub fn dpcd(&self, addr: AuxAddress) -> u8 {
        let raw = addr.get();
        if let Some(off) = raw.checked_sub(HDCP_PORT_BASE).filter(|o| (*o as usize) < HDCP_PORT_LEN) {
            return self.hdcp_port[off as usize];
        }
        self.dpcd.get(raw as usize).copied().unwrap_or(0)
    }

    /// Write a register without side effects.
    pub fn set_reg(&mut self, device: Device, offset: u8, value: u8) {
        self.regs[device.index()][usize::from(offset)] = value;
    }

    /// Read a register without side effects.
    #[must_use]
    pub fn reg(&self, device: Device, offset: u8) -> u8 {
        self.regs[device.index()][usize::from(offset)]
    }

    /// Assert interrupt bits.
    pub fn raise(&mut self, device: Device, offset: u8, bits: u8) {
        self.regs[device.index()][usize::from(offset)] |= bits;
    }

    /// Raise a sink IRQ carrying a converter event.
    pub fn raise_converter_irq(&mut self, bits: u8) {
        let vector = self.dpcd(dpcd::CONVERTER_IRQ) | bits;
        self.set_dpcd(dpcd::CONVERTER_IRQ, &[vector]);
        let service = self.dpcd(dpcd::DEVICE_SERVICE_IRQ_VECTOR) | dpcd::SINK_SPECIFIC_IRQ;
        self.set_dpcd(dpcd::DEVICE_SERVICE_IRQ_VECTOR, &[service]);
        self.raise(Device::TxP2, tx_p2::DP_INT, tx_p2::SINK_IRQ);
    }

    /// Load an infoframe into a receiver buffer.
    pub fn load_rx_buffer(&mut self, base: u8, raw: &[u8]) {
        for (i, b) in raw.iter().enumerate() {
            self.set_reg(Device::RxP1, base.wrapping_add(i as u8), *b);
        }
    }

    // ─── Counters ────────────────────────────────────────────────────────────

    /// EDID chunk reads attempted.
    #[must_use]
    pub fn edid_chunk_reads(&self) -> u32 {
        self.edid_chunk_reads
    }

    /// Native AUX reads.
    #[must_use]
    pub fn aux_reads(&self) -> u32 {
        self.aux_reads
    }

    /// SerDes FIFO reset pulses.
    #[must_use]
    pub fn fifo_resets(&self) -> u32 {
        self.fifo_resets
    }

    /// Pre-emphasis level programmed on lane 0.
    #[must_use]
    pub fn pre_emphasis_level(&self) -> u8 {
        (self.reg(Device::TxP0, tx_p0::TRAINING_LANE0_SET) & tx_p0::PRE_EMPHASIS_MASK) >> tx_p0::PRE_EMPHASIS_SHIFT
    }

    /// `power_on` calls.
    #[must_use]
    pub fn power_ons(&self) -> u32 {
        self.power_ons
    }

    /// `power_down` calls.
    #[must_use]
    pub fn power_downs(&self) -> u32 {
        self.power_downs
    }

    /// HDCP authentications started.
    #[must_use]
    pub fn hdcp_arms(&self) -> u32 {
        self.hdcp_arms
    }

    /// Link trainings started.
    #[must_use]
    pub fn lt_arms(&self) -> u32 {
        self.lt_arms
    }

    /// Chip is powered.
    #[must_use]
    pub fn powered(&self) -> bool {
        self.powered
    }

    // ─── Engines ─────────────────────────────────────────────────────────────

    fn dpcd_slot(&mut self, raw: u32) -> Option<&mut u8> {
        if let Some(off) = raw.checked_sub(HDCP_PORT_BASE) {
            return self.hdcp_port.get_mut(off as usize);
        }
        self.dpcd.get_mut(raw as usize)
    }

    fn is_w1c(device: Device, offset: u8) -> bool {
        matches!(
            (device, offset),
            (Device::TxP2, tx_p2::COMMON_INT1 | tx_p2::COMMON_INT2 | tx_p2::DP_INT)
                | (Device::RxP0, rx_p0::RX_INT1 | rx_p0::RX_INT2 | rx_p0::RX_INT3)
        )
    }

    fn run_link_training(&mut self) {
        self.lt_arms += 1;
        let code = self.reg(Device::TxP0, tx_p0::LINK_BW_SET);
        let lanes = self.reg(Device::TxP0, tx_p0::LANE_COUNT_SET).max(1);
        if code <= self.lt_max_code {
            self.set_reg(Device::TxP0, tx_p0::LT_CTRL, 0);
            let status = if lanes >= 2 { [0x77, 0x77] } else { [0x07, 0x00] };
            self.set_dpcd(dpcd::LANE0_1_STATUS, &status);
            self.set_lane_aligned(self.lane_aligned_after_training);
            self.set_dpcd(dpcd::LINK_BW_SET, &[code]);

            let link_khz = u64::from(code) * 27_000;
            let m = (u64::from(self.input_pixel_clock_khz) * u64::from(N_VID))
                .checked_div(link_khz)
                .unwrap_or(0) as u32;
            for (i, b) in m.to_le_bytes().into_iter().take(3).enumerate() {
                self.set_reg(Device::TxP0, tx_p0::M_VID_0 + i as u8, b);
            }
            for (i, b) in N_VID.to_le_bytes().into_iter().take(3).enumerate() {
                self.set_reg(Device::TxP0, tx_p0::N_VID_0 + i as u8, b);
            }
        } else {
            self.set_reg(Device::TxP0, tx_p0::LT_CTRL, 0x10);
            self.set_dpcd(dpcd::LANE0_1_STATUS, &[0x00, 0x00]);
            self.set_lane_aligned(false);
        }
        self.raise(Device::TxP2, tx_p2::DP_INT, tx_p2::TRAINING_FINISHED);
    }

    fn refresh_symbol_errors(&mut self) {
        if let Some(per_level) = self.symbol_errors {
            let count = per_level[usize::from(self.pre_emphasis_level())];
            let [lo, hi] = count.to_le_bytes();
            self.set_dpcd(dpcd::SYMBOL_ERROR_COUNT_LANE0, &[lo, (hi & 0x7F) | 0x80]);
        }
    }

    fn reset_serdes_fifo(&mut self) {
        self.fifo_resets += 1;
        if self.fifo_reset_clears_errors {
            self.symbol_errors = None;
            self.set_dpcd(dpcd::SYMBOL_ERROR_COUNT_LANE0, &[0x00, 0x80]);
        }
    }

    fn run_hdcp(&mut self) {
        self.hdcp_arms += 1;
        let status = if self.hdcp_passes {
            tx_p0::HDCP_AUTH_PASS
        } else {
            tx_p0::HDCP_AUTH_FAIL
        };
        self.set_reg(Device::TxP0, tx_p0::HDCP_STATUS, status);
        self.raise(Device::TxP2, tx_p2::COMMON_INT2, tx_p2::HDCP_AUTH_DONE);
    }
}

impl RegisterBus for SimChip {
    fn read(&mut self, device: Device, offset: u8) -> Result<u8, BusError> {
        if self.bus_fault {
            return Err(BusError::Nack(device));
        }
        Ok(self.reg(device, offset))
    }

    fn write(&mut self, device: Device, offset: u8, value: u8) -> Result<(), BusError> {
        if self.bus_fault {
            return Err(BusError::Nack(device));
        }
        let old = self.reg(device, offset);
        if Self::is_w1c(device, offset) {
            let mut next = old & !value;
            if self.audio_streaming && (device, offset) == (Device::RxP0, rx_p0::RX_INT3) {
                next |= rx_p0::CTS_RCV | rx_p0::AUDIO_RCV;
            }
            self.set_reg(device, offset, next);
            return Ok(());
        }
        self.set_reg(device, offset, value);

        match (device, offset) {
            (Device::TxP0, tx_p0::LT_CTRL) if value & tx_p0::LT_EN != 0 => self.run_link_training(),
            (Device::TxP2, tx_p2::RST_CTRL2)
                if value & tx_p2::SERDES_FIFO_RST != 0 && old & tx_p2::SERDES_FIFO_RST == 0 =>
            {
                self.reset_serdes_fifo();
            }
            (Device::TxP0, tx_p0::HDCP_CTRL0)
                if value & tx_p0::HARD_AUTH_EN != 0 && old & tx_p0::HARD_AUTH_EN == 0 =>
            {
                self.run_hdcp();
            }
            _ => {}
        }
        Ok(())
    }
}

impl AuxChannel for SimChip {
    fn aux_read(&mut self, addr: AuxAddress, buf: &mut [u8]) -> Result<(), AuxError> {
        self.aux_reads += 1;
        if self.aux_fault {
            return Err(AuxError::Timeout);
        }
        self.refresh_symbol_errors();
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.dpcd(addr + i as u32);
        }
        Ok(())
    }

    fn aux_write(&mut self, addr: AuxAddress, data: &[u8]) -> Result<(), AuxError> {
        if self.aux_fault {
            return Err(AuxError::Timeout);
        }
        for (i, b) in data.iter().enumerate() {
            let at = addr + i as u32;
            let value = if at == dpcd::DEVICE_SERVICE_IRQ_VECTOR || at == dpcd::CONVERTER_IRQ {
                self.dpcd(at) & !*b
            } else {
                *b
            };
            self.set_dpcd(at, &[value]);
        }
        Ok(())
    }

    fn i2c_read(&mut self, slave: u8, buf: &mut [u8]) -> Result<(), AuxError> {
        if slave != EDID_SLAVE {
            return Err(AuxError::Nack);
        }
        self.edid_chunk_reads += 1;
        if self.aux_fault {
            return Err(AuxError::Timeout);
        }
        if self.edid_faults > 0 {
            self.edid_faults -= 1;
            return Err(AuxError::Defer);
        }
        let base = usize::from(self.edid_segment) * 256;
        for b in buf.iter_mut() {
            *b = self
                .edid
                .get(base + usize::from(self.edid_offset))
                .copied()
                .unwrap_or(0xFF);
            self.edid_offset = self.edid_offset.wrapping_add(1);
        }
        self.edid_segment = 0;
        Ok(())
    }

    fn i2c_write(&mut self, slave: u8, data: &[u8]) -> Result<(), AuxError> {
        if self.aux_fault {
            return Err(AuxError::Timeout);
        }
        let first = data.first().copied().unwrap_or(0);
        match slave {
            SEGMENT_SLAVE => self.edid_segment = first,
            EDID_SLAVE => self.edid_offset = first,
            _ => return Err(AuxError::Nack),
        }
        Ok(())
    }
}

impl PowerControl for SimChip {
    fn power_on(&mut self) {
        self.power_ons += 1;
        self.powered = true;
    }

    fn power_down(&mut self) {
        self.power_downs += 1;
        self.powered = false;
    }
}

impl PresenceDetect for SimChip {
    fn cable_present(&mut self) -> bool {
        self.present
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::edid::checksum_ok;

    #[test]
    fn interrupt_registers_clear_on_write() {
        let mut chip = SimChip::new();
        chip.raise(Device::TxP2, tx_p2::DP_INT, 0x05);
        chip.write(Device::TxP2, tx_p2::DP_INT, 0x01).unwrap();
        assert_eq!(chip.reg(Device::TxP2, tx_p2::DP_INT), 0x04);
    }

    #[test]
    fn built_edid_is_valid() {
        assert!(checksum_ok(&build_edid(14_850, 1, 7)));
        assert!(checksum_ok(&build_cea_extension(&[7_425, 29_700])));
    }

    #[test]
    fn segment_pointer_resets_after_read() {
        let mut chip = SimChip::new();
        let mut rom = [0u8; 512];
        rom[256] = 0xAB;
        rom[0] = 0xCD;
        chip.load_edid(&rom);
        let mut b = [0u8; 1];
        chip.i2c_write(SEGMENT_SLAVE, &[1]).unwrap();
        chip.i2c_write(EDID_SLAVE, &[0]).unwrap();
        chip.i2c_read(EDID_SLAVE, &mut b).unwrap();
        assert_eq!(b[0], 0xAB);
        chip.i2c_write(EDID_SLAVE, &[0]).unwrap();
        chip.i2c_read(EDID_SLAVE, &mut b).unwrap();
        assert_eq!(b[0], 0xCD);
    }
}
