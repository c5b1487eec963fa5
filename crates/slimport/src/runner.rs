//! Cooperative worker driving [`Bridge::tick`].
//!
//! The worker sleeps for the bridge's current cadence or until the
//! presence line changes, whichever comes first. A disconnect cancels the
//! connection straight away so no tick ever runs against a cable that is
//! already gone. The worker owns the bridge outright, so nothing is locked.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Timer;
use embedded_hal::delay::DelayNs;
use platform::Hardware;

use crate::bridge::Bridge;

/// Edge on the cable-detect line, delivered by the board's interrupt
/// handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PresenceEvent {
    /// Cable inserted.
    Connected,
    /// Cable removed.
    Disconnected,
}

/// Signal the board raises on presence edges.
pub type PresenceSignal<M> = Signal<M, PresenceEvent>;

/// Run the bridge forever.
pub async fn run<M, H, D>(bridge: &mut Bridge<H, D>, presence: &PresenceSignal<M>) -> !
where
    M: RawMutex,
    H: Hardware,
    D: DelayNs,
{
    loop {
        wait_and_tick(bridge, presence).await;
    }
}

/// Run `ticks` worker iterations, counting presence wake-ups as one each.
pub async fn run_ticks<M, H, D>(bridge: &mut Bridge<H, D>, presence: &PresenceSignal<M>, ticks: usize)
where
    M: RawMutex,
    H: Hardware,
    D: DelayNs,
{
    for _ in 0..ticks {
        wait_and_tick(bridge, presence).await;
    }
}

async fn wait_and_tick<M, H, D>(bridge: &mut Bridge<H, D>, presence: &PresenceSignal<M>)
where
    M: RawMutex,
    H: Hardware,
    D: DelayNs,
{
    match select(Timer::after(bridge.next_tick_delay()), presence.wait()).await {
        Either::First(()) => bridge.tick(),
        Either::Second(PresenceEvent::Connected) => {
            debug!("presence: connected");
            bridge.tick();
        }
        Either::Second(PresenceEvent::Disconnected) => {
            info!("presence: disconnected in {:?}", bridge.state());
            bridge.cancel_connection();
        }
    }
}
