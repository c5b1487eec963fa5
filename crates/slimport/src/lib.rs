//! SlimPort transmitter control core
//!
//! Drives an HDMI-to-SlimPort bridge chip from cable insertion to a stable,
//! optionally HDCP-protected audio/video stream, and back down again when
//! the cable goes away or the link degrades.
//!
//! # Architecture
//!
//! ```text
//! runner (embassy worker: timer + presence signal)
//!         ↓
//! Bridge::tick  (top-level SystemState, recovery mapping)
//!         ↓
//! detect → edid → link → video → hdcp → audio   (sub-machines)
//!         ↓
//! platform::Hardware (register bus, AUX channel, power, presence)
//! ```
//!
//! Every sub-machine step returns an [`Outcome`]; only the bridge moves the
//! top-level state. Interrupts are latched once per tick and turned into
//! [`irq::Event`]s gated by the current state.
//!
//! # Features
//!
//! - `std`: host builds (tests, emulator)
//! - `defmt`: hardware logging and `defmt::Format` derives
//! - `tracing`: host logging

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
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::doc_markdown)] // register and DPCD names in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

// Must come first so the logging macros are visible in every module.
#[macro_use]
mod fmt;

pub mod audio;
pub mod bridge;
pub mod config;
pub mod detect;
pub mod dpcd;
pub mod edid;
pub mod error;
pub mod hdcp;
pub mod infoframe;
pub mod irq;
pub mod link;
pub mod mock;
pub mod registers;
pub mod runner;
pub mod session;
pub mod state;
pub mod video;

pub use audio::{AudioOutput, AudioOutputState};
pub use bridge::Bridge;
pub use config::{BridgeConfig, PolicyFlags, RetryPolicy, SourceCaps, TickCadence, Tuning};
pub use detect::{CableType, ChargingCapability, Quirk, SinkInfo};
pub use edid::{EdidCache, EdidSummary};
pub use error::{Error, Result};
pub use hdcp::{HdcpAuth, HdcpState};
pub use infoframe::{InfoFrame, InfoFrameKind};
pub use irq::{CecFrame, Event};
pub use link::{LinkBandwidth, LinkTrainer, LinkTrainingState};
pub use runner::{PresenceEvent, PresenceSignal};
pub use session::Session;
pub use state::{Outcome, SystemState, TopState};
pub use video::{VideoOutput, VideoOutputState};
