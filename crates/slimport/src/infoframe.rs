//! Infoframe forwarding from the HDMI receiver to the DisplayPort packet
//! slots.
//!
//! Frames are republished, not synthesized. The only edit ever made is the
//! AVI colour-format field when the transmitter down-samples to 4:2:2, and
//! the checksum is recomputed whenever a frame is written.

use platform::{Device, Hardware};

use crate::error::Error;
use crate::registers::{infoframe_slot, rx_p1, tx_p2};
use crate::Result;

/// Packet kinds forwarded to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InfoFrameKind {
    /// Auxiliary video information.
    Avi,
    /// Source product description.
    Spd,
    /// Vendor-specific.
    Vendor,
    /// Audio.
    Audio,
}

impl InfoFrameKind {
    /// CEA-861 packet type byte.
    #[must_use]
    pub const fn type_code(self) -> u8 {
        match self {
            InfoFrameKind::Vendor => 0x81,
            InfoFrameKind::Avi => 0x82,
            InfoFrameKind::Spd => 0x83,
            InfoFrameKind::Audio => 0x84,
        }
    }

    const fn rx_buffer(self) -> u8 {
        match self {
            InfoFrameKind::Avi => rx_p1::AVI_BUF,
            InfoFrameKind::Spd => rx_p1::SPD_BUF,
            InfoFrameKind::Vendor => rx_p1::VSI_BUF,
            InfoFrameKind::Audio => rx_p1::AUD_BUF,
        }
    }

    const fn tx_slot(self) -> u8 {
        match self {
            InfoFrameKind::Avi => tx_p2::AVI_SLOT,
            InfoFrameKind::Spd => tx_p2::SPD_SLOT,
            InfoFrameKind::Vendor => tx_p2::VSI_SLOT,
            InfoFrameKind::Audio => tx_p2::AUD_SLOT,
        }
    }

    const fn enable_bit(self) -> u8 {
        match self {
            InfoFrameKind::Avi => tx_p2::AVI_EN,
            InfoFrameKind::Spd => tx_p2::SPD_EN,
            InfoFrameKind::Vendor => tx_p2::VSI_EN,
            InfoFrameKind::Audio => tx_p2::AUD_IF_EN,
        }
    }
}

/// AVI Y field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ColorFormat {
    /// RGB.
    Rgb,
    /// YCbCr 4:2:2.
    YCbCr422,
    /// YCbCr 4:4:4.
    YCbCr444,
    /// YCbCr 4:2:0.
    YCbCr420,
}

/// AVI C field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Colorimetry {
    /// Not signalled; derive from the VIC.
    NoData,
    /// SMPTE 170M / BT.601.
    Bt601,
    /// BT.709.
    Bt709,
    /// Extended colorimetry field is valid.
    Extended,
}

const Y_SHIFT: u8 = 5;
const Y_MASK: u8 = 0b0110_0000;
const C_SHIFT: u8 = 6;
const VIC_MASK: u8 = 0x7F;

/// One received or transmitted infoframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InfoFrame {
    type_code: u8,
    version: u8,
    len: u8,
    checksum: u8,
    payload: [u8; infoframe_slot::MAX_PAYLOAD],
}

impl InfoFrame {
    /// Decode a raw slot. Rejects lengths the slot cannot hold.
    pub fn parse(raw: &[u8; infoframe_slot::SLOT_LEN]) -> Result<Self> {
        let (header, body) = raw.split_at(usize::from(infoframe_slot::PAYLOAD));
        let &[type_code, version, len, checksum] = header else {
            return Err(Error::InvalidInfoFrame);
        };
        if usize::from(len) > infoframe_slot::MAX_PAYLOAD {
            return Err(Error::InvalidInfoFrame);
        }
        let mut payload = [0u8; infoframe_slot::MAX_PAYLOAD];
        for (dst, src) in payload.iter_mut().zip(body).take(usize::from(len)) {
            *dst = *src;
        }
        Ok(Self {
            type_code,
            version,
            len,
            checksum,
            payload,
        })
    }

    /// Encode into a slot image.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; infoframe_slot::SLOT_LEN] {
        let mut raw = [0u8; infoframe_slot::SLOT_LEN];
        let header = [self.type_code, self.version, self.len, self.checksum];
        for (dst, src) in raw.iter_mut().zip(header.iter().chain(self.payload())) {
            *dst = *src;
        }
        raw
    }

    /// Packet type byte.
    #[must_use]
    pub const fn type_code(&self) -> u8 {
        self.type_code
    }

    /// Payload bytes, PB1 onward.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        self.payload
            .get(..usize::from(self.len))
            .unwrap_or(&self.payload)
    }

    fn sum_without_checksum(&self) -> u8 {
        [self.type_code, self.version, self.len]
            .iter()
            .chain(self.payload())
            .fold(0u8, |acc, b| acc.wrapping_add(*b))
    }

    /// Header, checksum and payload sum to zero.
    #[must_use]
    pub fn checksum_ok(&self) -> bool {
        self.sum_without_checksum().wrapping_add(self.checksum) == 0
    }

    /// Recompute PB0.
    pub fn update_checksum(&mut self) {
        self.checksum = 0u8.wrapping_sub(self.sum_without_checksum());
    }

    fn pb(&self, n: usize) -> u8 {
        self.payload().get(n.saturating_sub(1)).copied().unwrap_or(0)
    }

    /// AVI colour format.
    #[must_use]
    pub fn color_format(&self) -> ColorFormat {
        match (self.pb(1) & Y_MASK) >> Y_SHIFT {
            0 => ColorFormat::Rgb,
            1 => ColorFormat::YCbCr422,
            2 => ColorFormat::YCbCr444,
            _ => ColorFormat::YCbCr420,
        }
    }

    /// Rewrite the AVI colour format and the checksum.
    pub fn set_color_format(&mut self, format: ColorFormat) {
        let y: u8 = match format {
            ColorFormat::Rgb => 0,
            ColorFormat::YCbCr422 => 1,
            ColorFormat::YCbCr444 => 2,
            ColorFormat::YCbCr420 => 3,
        };
        if let Some(pb1) = self.payload.first_mut() {
            *pb1 = (*pb1 & !Y_MASK) | (y << Y_SHIFT);
        }
        self.len = self.len.max(1);
        self.update_checksum();
    }

    /// AVI colorimetry.
    #[must_use]
    pub fn colorimetry(&self) -> Colorimetry {
        match self.pb(2) >> C_SHIFT {
            0 => Colorimetry::NoData,
            1 => Colorimetry::Bt601,
            2 => Colorimetry::Bt709,
            _ => Colorimetry::Extended,
        }
    }

    /// AVI video identification code.
    #[must_use]
    pub fn vic(&self) -> u8 {
        self.pb(4) & VIC_MASK
    }
}

/// Standard-definition VICs, which use the BT.601 matrix.
#[must_use]
pub fn is_sd_vic(vic: u8) -> bool {
    matches!(vic, 1..=3 | 6..=15 | 17..=18 | 21..=30 | 35..=38 | 42..=45 | 48..=59)
}

fn read_slot<H: Hardware>(hw: &mut H, dev: Device, base: u8) -> Result<[u8; infoframe_slot::SLOT_LEN]> {
    let mut raw = [0u8; infoframe_slot::SLOT_LEN];
    for (offset, byte) in (base..).zip(raw.iter_mut()) {
        *byte = hw.read(dev, offset)?;
    }
    Ok(raw)
}

/// Read the frame most recently received on the HDMI input. `None` when
/// no frame of that kind has arrived.
pub(crate) fn read_received<H: Hardware>(hw: &mut H, kind: InfoFrameKind) -> Result<Option<InfoFrame>> {
    let raw = read_slot(hw, rx_p1::DEV, kind.rx_buffer())?;
    let frame = InfoFrame::parse(&raw)?;
    match frame.type_code {
        0 => Ok(None),
        t if t == kind.type_code() => Ok(Some(frame)),
        t => {
            warn!("{:?} buffer holds packet type {:#x}", kind, t);
            Err(Error::InvalidInfoFrame)
        }
    }
}

/// Load a frame into its transmitter slot and enable the packet.
pub(crate) fn publish<H: Hardware>(hw: &mut H, kind: InfoFrameKind, frame: &InfoFrame) -> Result<()> {
    let mut frame = *frame;
    if !frame.checksum_ok() {
        warn!("{:?} infoframe checksum bad, recomputing", kind);
        frame.update_checksum();
    }
    hw.clear_bits(tx_p2::DEV, tx_p2::PACKET_CTRL, kind.enable_bit())?;
    for (offset, byte) in (kind.tx_slot()..).zip(frame.to_bytes()) {
        hw.write(tx_p2::DEV, offset, byte)?;
    }
    hw.set_bits(tx_p2::DEV, tx_p2::PACKET_CTRL, kind.enable_bit())?;
    trace!("{:?} infoframe published", kind);
    Ok(())
}

/// Forward the received frame of `kind` to the sink, if there is one.
pub(crate) fn forward<H: Hardware>(hw: &mut H, kind: InfoFrameKind) -> Result<Option<InfoFrame>> {
    let Some(frame) = read_received(hw, kind)? else {
        debug!("no {:?} infoframe received", kind);
        return Ok(None);
    };
    publish(hw, kind, &frame)?;
    Ok(Some(frame))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn avi(pb1: u8, pb2: u8, vic: u8) -> InfoFrame {
        let mut raw = [0u8; infoframe_slot::SLOT_LEN];
        raw[0] = 0x82;
        raw[1] = 0x02;
        raw[2] = 13;
        raw[4] = pb1;
        raw[5] = pb2;
        raw[7] = vic;
        let mut f = InfoFrame::parse(&raw).unwrap();
        f.update_checksum();
        f
    }

    #[test]
    fn parse_rejects_oversized_length() {
        let mut raw = [0u8; infoframe_slot::SLOT_LEN];
        raw[0] = 0x82;
        raw[2] = 28;
        assert_eq!(InfoFrame::parse(&raw), Err(Error::InvalidInfoFrame));
    }

    #[test]
    fn checksum_recompute() {
        let mut f = avi(0x40, 0x00, 16);
        assert!(f.checksum_ok());
        f.set_color_format(ColorFormat::YCbCr422);
        assert!(f.checksum_ok());
        assert_eq!(f.color_format(), ColorFormat::YCbCr422);
        assert_eq!(f.to_bytes()[4] & Y_MASK, 1 << Y_SHIFT);
    }

    #[test]
    fn avi_fields() {
        let f = avi(0x40, 0x80, 0x84);
        assert_eq!(f.color_format(), ColorFormat::YCbCr444);
        assert_eq!(f.colorimetry(), Colorimetry::Bt709);
        assert_eq!(f.vic(), 4);
    }

    #[test]
    fn sd_vics() {
        assert!(is_sd_vic(3));
        assert!(is_sd_vic(17));
        assert!(!is_sd_vic(4));
        assert!(!is_sd_vic(16));
        assert!(!is_sd_vic(60));
        assert!(!is_sd_vic(0));
    }
}
