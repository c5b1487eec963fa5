//! Register-bus access to the bridge chip.
//!
//! The transmitter exposes five register blocks, each answering on its own
//! 7-bit I2C slave address. Every register is one byte wide and addressed by
//! a one-byte offset inside its block.

use embedded_hal::i2c::I2c;

/// One of the chip's register blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Device {
    /// Transmitter page 0: link training, HDCP engine, stream timing.
    TxP0,
    /// Transmitter page 1: SerDes PHY and lane power.
    TxP1,
    /// Transmitter page 2: system control, resets, interrupts, packets.
    TxP2,
    /// Receiver page 0: HDMI input status and interrupts.
    RxP0,
    /// Receiver page 1: received infoframe buffers.
    RxP1,
}

impl Device {
    /// All register blocks, in index order.
    pub const ALL: [Device; 5] = [
        Device::TxP0,
        Device::TxP1,
        Device::TxP2,
        Device::RxP0,
        Device::RxP1,
    ];

    /// 7-bit I2C slave address of this block.
    #[must_use]
    pub const fn i2c_addr(self) -> u8 {
        match self {
            Device::TxP0 => 0x38,
            Device::TxP1 => 0x3D,
            Device::TxP2 => 0x39,
            Device::RxP0 => 0x3F,
            Device::RxP1 => 0x40,
        }
    }

    /// Dense index (0..5), useful for register-file simulations.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Device::TxP0 => 0,
            Device::TxP1 => 1,
            Device::TxP2 => 2,
            Device::RxP0 => 3,
            Device::RxP1 => 4,
        }
    }
}

/// Register-bus failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// The slave did not acknowledge its address or a data byte.
    #[error("register bus NACK from {0:?}")]
    Nack(Device),
    /// Arbitration loss, bus stuck or other transport fault.
    #[error("register bus transport fault on {0:?}")]
    Transport(Device),
}

impl BusError {
    /// Register block the failed transfer targeted.
    #[must_use]
    pub const fn device(self) -> Device {
        match self {
            BusError::Nack(d) | BusError::Transport(d) => d,
        }
    }
}

/// Byte-wide register access.
///
/// Implementations are synchronous: the bridge core runs from a single
/// periodic task and every transfer is a few bytes long.
pub trait RegisterBus {
    /// Read one register.
    fn read(&mut self, device: Device, offset: u8) -> Result<u8, BusError>;

    /// Write one register.
    fn write(&mut self, device: Device, offset: u8, value: u8) -> Result<(), BusError>;

    /// Read-modify-write: set the bits in `mask`.
    fn set_bits(&mut self, device: Device, offset: u8, mask: u8) -> Result<(), BusError> {
        let v = self.read(device, offset)?;
        self.write(device, offset, v | mask)
    }

    /// Read-modify-write: clear the bits in `mask`.
    fn clear_bits(&mut self, device: Device, offset: u8, mask: u8) -> Result<(), BusError> {
        let v = self.read(device, offset)?;
        self.write(device, offset, v & !mask)
    }

    /// Read-modify-write: replace the bits selected by `mask` with `value`.
    fn update_bits(
        &mut self,
        device: Device,
        offset: u8,
        mask: u8,
        value: u8,
    ) -> Result<(), BusError> {
        let v = self.read(device, offset)?;
        self.write(device, offset, (v & !mask) | (value & mask))
    }
}

/// Transfer attempts made by [`I2cRegisterBus`] before reporting a failure.
pub const I2C_ATTEMPTS: u8 = 3;

/// [`RegisterBus`] over an `embedded-hal` 1.0 I2C master.
///
/// Each register access is a single transaction (`write_read` for reads,
/// a two-byte write for writes). Failed transfers are retried up to
/// [`I2C_ATTEMPTS`] times in total; this absorbs the occasional NACK the chip
/// produces while its internal clock is switching.
pub struct I2cRegisterBus<I> {
    i2c: I,
}

impl<I: I2c> I2cRegisterBus<I> {
    /// Wrap an I2C master.
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// Release the I2C master.
    pub fn release(self) -> I {
        self.i2c
    }

    fn classify(device: Device, err: &I::Error) -> BusError {
        use embedded_hal::i2c::{Error as _, ErrorKind};
        match err.kind() {
            ErrorKind::NoAcknowledge(_) => BusError::Nack(device),
            _ => BusError::Transport(device),
        }
    }
}

impl<I: I2c> RegisterBus for I2cRegisterBus<I> {
    fn read(&mut self, device: Device, offset: u8) -> Result<u8, BusError> {
        let addr = device.i2c_addr();
        let mut last = BusError::Transport(device);
        for _ in 0..I2C_ATTEMPTS {
            let mut buf = [0u8; 1];
            match self.i2c.write_read(addr, &[offset], &mut buf) {
                Ok(()) => {
                    let [value] = buf;
                    return Ok(value);
                }
                Err(e) => last = Self::classify(device, &e),
            }
        }
        Err(last)
    }

    fn write(&mut self, device: Device, offset: u8, value: u8) -> Result<(), BusError> {
        let addr = device.i2c_addr();
        let mut last = BusError::Transport(device);
        for _ in 0..I2C_ATTEMPTS {
            match self.i2c.write(addr, &[offset, value]) {
                Ok(()) => return Ok(()),
                Err(e) => last = Self::classify(device, &e),
            }
        }
        Err(last)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    const NACK: ErrorKind = ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address);

    #[test]
    fn device_addresses_are_distinct() {
        for (i, a) in Device::ALL.iter().enumerate() {
            assert_eq!(a.index(), i);
            for b in &Device::ALL[i + 1..] {
                assert_ne!(a.i2c_addr(), b.i2c_addr());
            }
        }
    }

    #[test]
    fn transient_failures_are_retried() {
        let expectations = [
            I2cTransaction::write(0x3F, vec![0x10, 0x01]).with_error(ErrorKind::Bus),
            I2cTransaction::write(0x3F, vec![0x10, 0x01]).with_error(ErrorKind::Bus),
            I2cTransaction::write(0x3F, vec![0x10, 0x01]),
        ];
        let mut bus = I2cRegisterBus::new(I2cMock::new(&expectations));
        bus.write(Device::RxP0, 0x10, 0x01).unwrap();
        bus.release().done();
    }

    #[test]
    fn read_recovers_after_one_nack() {
        let expectations = [
            I2cTransaction::write_read(0x39, vec![0x05], vec![0x00]).with_error(NACK),
            I2cTransaction::write_read(0x39, vec![0x05], vec![0xA5]),
        ];
        let mut bus = I2cRegisterBus::new(I2cMock::new(&expectations));
        assert_eq!(bus.read(Device::TxP2, 0x05).unwrap(), 0xA5);
        bus.release().done();
    }

    #[test]
    fn persistent_nack_is_reported_after_three_attempts() {
        let expectations: Vec<_> = (0..I2C_ATTEMPTS)
            .map(|_| I2cTransaction::write_read(0x3D, vec![0x00], vec![0x00]).with_error(NACK))
            .collect();
        let mut bus = I2cRegisterBus::new(I2cMock::new(&expectations));
        assert_eq!(bus.read(Device::TxP1, 0x00), Err(BusError::Nack(Device::TxP1)));
        bus.release().done();
    }

    #[test]
    fn last_attempt_decides_the_error_kind() {
        let expectations = [
            I2cTransaction::write(0x40, vec![0x00, 0x00]).with_error(NACK),
            I2cTransaction::write(0x40, vec![0x00, 0x00]).with_error(NACK),
            I2cTransaction::write(0x40, vec![0x00, 0x00]).with_error(ErrorKind::ArbitrationLoss),
        ];
        let mut bus = I2cRegisterBus::new(I2cMock::new(&expectations));
        let err = bus.write(Device::RxP1, 0x00, 0).unwrap_err();
        assert_eq!(err, BusError::Transport(Device::RxP1));
        assert_eq!(err.device(), Device::RxP1);
        bus.release().done();
    }

    #[test]
    fn read_modify_write_only_touches_mask() {
        let expectations = [
            I2cTransaction::write_read(0x38, vec![0xA3], vec![0b1110_0111]),
            I2cTransaction::write(0x38, vec![0xA3, 0b1110_1111]),
            I2cTransaction::write_read(0x38, vec![0xA3], vec![0b1110_1111]),
            I2cTransaction::write(0x38, vec![0xA3, 0b0110_1111]),
            I2cTransaction::write_read(0x38, vec![0xA3], vec![0b0110_1111]),
            I2cTransaction::write(0x38, vec![0xA3, 0b0111_1111]),
        ];
        let mut bus = I2cRegisterBus::new(I2cMock::new(&expectations));
        bus.update_bits(Device::TxP0, 0xA3, 0b0001_1000, 0b0000_1000).unwrap();
        bus.clear_bits(Device::TxP0, 0xA3, 0b1000_0000).unwrap();
        bus.set_bits(Device::TxP0, 0xA3, 0b0001_0000).unwrap();
        bus.release().done();
    }
}
