//! `I2cRegisterBus` against `embedded-hal-mock` transaction scripts.

#![allow(clippy::unwrap_used)]

use embedded_hal::i2c::ErrorKind;
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
use platform::{BusError, Device, I2cRegisterBus, RegisterBus};

#[test]
fn read_uses_repeated_start_on_block_address() {
    let expectations = [I2cTransaction::write_read(0x39, vec![0x02], vec![0x16])];
    let mut bus = I2cRegisterBus::new(I2cMock::new(&expectations));
    assert_eq!(bus.read(Device::TxP2, 0x02).unwrap(), 0x16);
    bus.release().done();
}

#[test]
fn write_sends_offset_then_value() {
    let expectations = [I2cTransaction::write(0x38, vec![0xA0, 0x0A])];
    let mut bus = I2cRegisterBus::new(I2cMock::new(&expectations));
    bus.write(Device::TxP0, 0xA0, 0x0A).unwrap();
    bus.release().done();
}

#[test]
fn failed_write_is_retried_then_succeeds() {
    let expectations = [
        I2cTransaction::write(0x3F, vec![0x05, 0x01]).with_error(ErrorKind::Other),
        I2cTransaction::write(0x3F, vec![0x05, 0x01]),
    ];
    let mut bus = I2cRegisterBus::new(I2cMock::new(&expectations));
    bus.write(Device::RxP0, 0x05, 0x01).unwrap();
    bus.release().done();
}

#[test]
fn read_gives_up_after_three_attempts() {
    let expectations = [
        I2cTransaction::write_read(0x40, vec![0x00], vec![0x00]).with_error(ErrorKind::Other),
        I2cTransaction::write_read(0x40, vec![0x00], vec![0x00]).with_error(ErrorKind::Other),
        I2cTransaction::write_read(0x40, vec![0x00], vec![0x00]).with_error(ErrorKind::Other),
    ];
    let mut bus = I2cRegisterBus::new(I2cMock::new(&expectations));
    assert_eq!(bus.read(Device::RxP1, 0x00), Err(BusError::Transport(Device::RxP1)));
    bus.release().done();
}
