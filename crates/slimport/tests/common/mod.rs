//! Shared helpers for the bridge integration tests.

#![allow(dead_code)]

use embedded_hal_mock::eh1::delay::NoopDelay;
use slimport::mock::SimChip;
use slimport::{Bridge, BridgeConfig, SystemState};

pub type SimBridge = Bridge<SimChip, NoopDelay>;

pub fn bridge(chip: SimChip) -> SimBridge {
    bridge_with(chip, BridgeConfig::default())
}

pub fn bridge_with(chip: SimChip, config: BridgeConfig) -> SimBridge {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    Bridge::new(chip, NoopDelay::new(), config)
}

/// Tick until `target` is reached. Returns the number of ticks taken, or
/// `None` if `max_ticks` ran out first.
pub fn tick_until(bridge: &mut SimBridge, target: SystemState, max_ticks: usize) -> Option<usize> {
    for n in 1..=max_ticks {
        bridge.tick();
        if bridge.state() == target {
            return Some(n);
        }
    }
    None
}

/// Tick `n` times.
pub fn ticks(bridge: &mut SimBridge, n: usize) {
    for _ in 0..n {
        bridge.tick();
    }
}
