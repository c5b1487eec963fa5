//! Error type shared by every sub-machine.

use platform::{AuxError, BusError};

/// Failure surfaced by a sub-machine step.
///
/// Transient transfer faults never reach this type: the register bus and
/// the AUX engine retry internally. What arrives here is an exhausted
/// retry or a protocol-level inconsistency, and the bridge maps each
/// variant to a recovery level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Register bus failed after collaborator retries.
    #[error("register bus: {0}")]
    Bus(BusError),
    /// AUX transaction failed after engine retries.
    #[error("AUX channel: {0}")]
    Aux(AuxError),
    /// The device-id registers did not name a supported transmitter.
    #[error("unsupported chip id {found:#06x}")]
    ChipIdMismatch {
        /// Value read from DEVICE_ID_H:DEVICE_ID_L.
        found: u16,
    },
    /// A received infoframe had an impossible length or type.
    #[error("malformed infoframe")]
    InvalidInfoFrame,
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Error::Bus(e)
    }
}

impl From<AuxError> for Error {
    fn from(e: AuxError) -> Self {
        Error::Aux(e)
    }
}

/// Result alias used across the crate.
pub type Result<T> = core::result::Result<T, Error>;
