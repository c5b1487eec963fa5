//! AUX channel: the sink's DPCD register space and I2C-over-AUX.

use core::convert::TryFrom;

/// Largest payload a single native AUX transaction may carry.
pub const AUX_MAX_PAYLOAD: usize = 16;

/// Address inside the sink's 20-bit DPCD space.
///
/// An `AuxAddress` is always in range: bits 20..32 are zero.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AuxAddress(u32);

impl AuxAddress {
    /// Bits of a `u32` that contribute to an address.
    pub const MASK: u32 = 0x000F_FFFF;

    /// `true` only if `raw` fits the 20-bit address space.
    #[must_use]
    pub const fn is_valid(raw: u32) -> bool {
        (raw >> 20) == 0
    }

    /// Mask `raw` into range.
    ///
    /// Meant for constants naming well-known registers. For addresses
    /// computed at run time use the `TryFrom<u32>` implementation.
    #[must_use]
    pub const fn force_raw(raw: u32) -> Self {
        Self(raw & Self::MASK)
    }

    /// Raw 20-bit value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Returned when a raw value does not fit 20 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AddressOutOfRange(pub u32);

impl TryFrom<u32> for AuxAddress {
    type Error = AddressOutOfRange;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        if Self::is_valid(raw) {
            Ok(Self(raw))
        } else {
            Err(AddressOutOfRange(raw))
        }
    }
}

/// Offsets wrap modulo 2^20.
impl core::ops::Add<u32> for AuxAddress {
    type Output = Self;

    fn add(self, offset: u32) -> Self {
        Self::force_raw(self.0.wrapping_add(offset))
    }
}

impl core::ops::AddAssign<u32> for AuxAddress {
    fn add_assign(&mut self, offset: u32) {
        *self = *self + offset;
    }
}

impl From<AuxAddress> for u32 {
    fn from(addr: AuxAddress) -> u32 {
        addr.0
    }
}

/// AUX transaction failure, as reported by the transmitter's AUX engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AuxError {
    /// The sink answered AUX_NACK (or I2C_NACK for I2C-over-AUX).
    #[error("AUX NACK")]
    Nack,
    /// The sink kept answering DEFER past the engine's retry limit.
    #[error("AUX DEFER limit reached")]
    Defer,
    /// No reply within the AUX reply timeout.
    #[error("AUX reply timeout")]
    Timeout,
}

/// Side-band channel to the sink.
///
/// Native transactions address the DPCD space; `i2c_*` transactions are
/// tunnelled I2C transfers to a 7-bit slave behind the sink (EDID at 0x50,
/// segment pointer at 0x30). Implementations split or reject payloads
/// larger than [`AUX_MAX_PAYLOAD`].
pub trait AuxChannel {
    /// Native read of `buf.len()` bytes starting at `addr`.
    fn aux_read(&mut self, addr: AuxAddress, buf: &mut [u8]) -> Result<(), AuxError>;

    /// Native write of `data` starting at `addr`.
    fn aux_write(&mut self, addr: AuxAddress, data: &[u8]) -> Result<(), AuxError>;

    /// I2C-over-AUX read from `slave`.
    fn i2c_read(&mut self, slave: u8, buf: &mut [u8]) -> Result<(), AuxError>;

    /// I2C-over-AUX write to `slave`.
    fn i2c_write(&mut self, slave: u8, data: &[u8]) -> Result<(), AuxError>;

    /// Single-byte native read.
    fn aux_read_byte(&mut self, addr: AuxAddress) -> Result<u8, AuxError> {
        let mut buf = [0u8; 1];
        self.aux_read(addr, &mut buf)?;
        let [b] = buf;
        Ok(b)
    }

    /// Single-byte native write.
    fn aux_write_byte(&mut self, addr: AuxAddress, value: u8) -> Result<(), AuxError> {
        self.aux_write(addr, &[value])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_raw_masks_high_bits() {
        assert_eq!(AuxAddress::force_raw(0x0016_8028).get(), 0x68028);
        assert_eq!(AuxAddress::force_raw(0xFFF0_0200).get(), 0x00200);
    }

    #[test]
    fn try_from_rejects_21_bit_values() {
        assert!(AuxAddress::try_from(0x000F_FFFF).is_ok());
        assert_eq!(
            AuxAddress::try_from(0x0010_0000),
            Err(AddressOutOfRange(0x0010_0000))
        );
    }

    #[test]
    fn add_wraps_inside_address_space() {
        let top = AuxAddress::force_raw(0xF_FFFE);
        assert_eq!((top + 3).get(), 0x1);
        let mut a = AuxAddress::force_raw(0x200);
        a += 4;
        assert_eq!(u32::from(a), 0x204);
    }
}
