//! Hardware Abstraction Layer (HAL) for the SlimPort bridge
//!
//! This crate provides the trait seams between the bridge control core
//! (`slimport` crate) and the board it runs on, so the state machines can be
//! developed and tested without a physical transmitter.
//!
//! # Architecture Layers
//!
//! ```text
//! Scheduler / runner (slimport::runner)
//!         ↓
//! Bridge control core (slimport: detect, EDID, link, HDCP, output)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Board support (I2C peripheral, AUX engine, GPIO power rails)
//! ```
//!
//! # Collaborators
//!
//! - [`RegisterBus`] - byte-addressed access to the chip's five register blocks
//! - [`AuxChannel`] - DPCD and I2C-over-AUX access to the sink
//! - [`PowerControl`] - reset / power-rail sequencing
//! - [`PresenceDetect`] - the cable-detect signal
//!
//! [`Hardware`] bundles all four for the bridge core.
//!
//! # Features
//!
//! - `std`: Enable standard library support (for testing)
//! - `defmt`: Enable defmt logging derives

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod aux;
pub mod bus;
pub mod power;

pub use aux::{AddressOutOfRange, AuxAddress, AuxChannel, AuxError, AUX_MAX_PAYLOAD};
pub use bus::{BusError, Device, I2cRegisterBus, RegisterBus};
pub use power::{PowerControl, PresenceDetect};

/// Everything the bridge core needs from the board.
///
/// Implemented automatically for any type providing all four collaborator
/// traits; board crates normally implement them on one struct that owns the
/// I2C peripheral, the AUX engine and the GPIOs.
pub trait Hardware: RegisterBus + AuxChannel + PowerControl + PresenceDetect {}

impl<T> Hardware for T where T: RegisterBus + AuxChannel + PowerControl + PresenceDetect {}
