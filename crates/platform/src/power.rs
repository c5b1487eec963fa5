//! Power sequencing and cable presence.

/// Reset / power-rail sequencing of the transmitter.
///
/// Both operations are fixed pulse sequences with the mandatory settle
/// delays built in; the bridge core calls them only when entering INIT or on
/// a forced hardware reset.
pub trait PowerControl {
    /// Enable the rails, release reset, and wait for the chip to come up.
    fn power_on(&mut self);

    /// Assert reset and drop the rails.
    fn power_down(&mut self);
}

/// Cable-detect line, sampled synchronously.
pub trait PresenceDetect {
    /// `true` while a cable (and therefore a sink) is attached.
    fn cable_present(&mut self) -> bool;
}
