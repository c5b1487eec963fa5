//! Top-level system state and the step outcome shared by all sub-machines.

/// Top-level bridge state, in bring-up order.
///
/// The derived ordering is the bring-up order: a state compares greater
/// than every state it depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SystemState {
    /// Cold start or just after a forced reset; chip held powered down.
    Init,
    /// Waiting for the cable-detect line.
    WaitCable,
    /// Chip powered; identity check and register defaults.
    Initialized,
    /// Sink present; classify it over AUX.
    SinkConnected,
    /// Read the sink's EDID.
    Edid,
    /// Train the main link.
    LinkTraining,
    /// Configure the video datapath and infoframes.
    VideoOutput,
    /// HDCP authentication.
    HdcpAuth,
    /// Configure and unmute audio.
    AudioOutput,
    /// Steady state.
    Playback,
}

impl SystemState {
    /// State entered after `self` completes.
    ///
    /// `None` for [`SystemState::Playback`]. EDID acquisition is skipped when
    /// `skip_edid` is set.
    #[must_use]
    pub const fn next(self, skip_edid: bool) -> Option<SystemState> {
        Some(match self {
            SystemState::Init => SystemState::WaitCable,
            SystemState::WaitCable => SystemState::Initialized,
            SystemState::Initialized => SystemState::SinkConnected,
            SystemState::SinkConnected if skip_edid => SystemState::LinkTraining,
            SystemState::SinkConnected => SystemState::Edid,
            SystemState::Edid => SystemState::LinkTraining,
            SystemState::LinkTraining => SystemState::VideoOutput,
            SystemState::VideoOutput => SystemState::HdcpAuth,
            SystemState::HdcpAuth => SystemState::AudioOutput,
            SystemState::AudioOutput => SystemState::Playback,
            SystemState::Playback => return None,
        })
    }
}

/// Result of one sub-machine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// Not finished; call again next tick.
    Continue,
    /// Finished; move the top level forward and keep stepping this tick.
    Advance,
    /// Re-run the current top-level state from its first sub-state.
    Retry,
    /// Drop the top level back to the given earlier state.
    Rollback(SystemState),
    /// Unrecoverable for this connection: power-cycle and wait for the cable.
    Fatal,
}

impl Outcome {
    /// The more drastic of two outcomes: `Fatal`, then the earliest
    /// `Rollback`, then `Retry`. `Continue` and `Advance` yield to either.
    #[must_use]
    pub fn escalate(self, other: Outcome) -> Outcome {
        use Outcome::{Fatal, Retry, Rollback};
        match (self, other) {
            (Fatal, _) | (_, Fatal) => Fatal,
            (Rollback(a), Rollback(b)) => Rollback(a.min(b)),
            (Rollback(a), _) | (_, Rollback(a)) => Rollback(a),
            (Retry, _) | (_, Retry) => Retry,
            (first, _) => first,
        }
    }
}

/// Current and previous top-level state.
///
/// [`advance_to`](Self::advance_to) only moves forward. Moving backward is
/// only possible through [`set_state`](Self::set_state) and
/// [`change_to_and_below`](Self::change_to_and_below), and every backward move
/// bumps [`recoveries`](Self::recoveries).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TopState {
    current: SystemState,
    previous: SystemState,
    recoveries: u32,
}

impl Default for TopState {
    fn default() -> Self {
        Self::new()
    }
}

impl TopState {
    /// Start in [`SystemState::Init`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: SystemState::Init,
            previous: SystemState::Init,
            recoveries: 0,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn current(&self) -> SystemState {
        self.current
    }

    /// State before the last transition.
    #[must_use]
    pub const fn previous(&self) -> SystemState {
        self.previous
    }

    /// Number of backward moves so far.
    #[must_use]
    pub const fn recoveries(&self) -> u32 {
        self.recoveries
    }

    /// Move forward to `next`. Returns `false` and leaves the state alone if
    /// `next` is not strictly later than the current state.
    pub fn advance_to(&mut self, next: SystemState) -> bool {
        if next <= self.current {
            return false;
        }
        self.previous = self.current;
        self.current = next;
        true
    }

    /// Recovery: jump to `state` unconditionally. Returns `true` when this
    /// was a regression.
    pub fn set_state(&mut self, state: SystemState) -> bool {
        let regressed = state < self.current;
        if regressed {
            self.recoveries = self.recoveries.saturating_add(1);
        }
        self.previous = self.current;
        self.current = state;
        regressed
    }

    /// Recovery: drop back to `state` if the current state is at or above it.
    /// Returns `true` if the state changed or was re-entered.
    pub fn change_to_and_below(&mut self, state: SystemState) -> bool {
        if self.current < state {
            return false;
        }
        self.set_state(state);
        true
    }

    /// `true` if the last transition moved backward.
    #[must_use]
    pub fn regressed(&self) -> bool {
        self.current < self.previous
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn bring_up_order_is_total() {
        let mut s = SystemState::Init;
        let mut steps = 0;
        while let Some(n) = s.next(false) {
            assert!(n > s);
            s = n;
            steps += 1;
        }
        assert_eq!(s, SystemState::Playback);
        assert_eq!(steps, 9);
    }

    #[test]
    fn skip_edid_bypasses_edid_state() {
        assert_eq!(
            SystemState::SinkConnected.next(true),
            Some(SystemState::LinkTraining)
        );
        assert_eq!(SystemState::SinkConnected.next(false), Some(SystemState::Edid));
    }

    #[test]
    fn escalate_keeps_the_most_drastic_outcome() {
        use Outcome::{Continue, Fatal, Retry, Rollback};
        let edid = Rollback(SystemState::Edid);
        let video = Rollback(SystemState::VideoOutput);
        assert_eq!(Continue.escalate(video), video);
        assert_eq!(video.escalate(edid), edid);
        assert_eq!(edid.escalate(video), edid);
        assert_eq!(Retry.escalate(video), video);
        assert_eq!(Continue.escalate(Retry), Retry);
        assert_eq!(edid.escalate(Fatal), Fatal);
        assert_eq!(Fatal.escalate(Continue), Fatal);
        assert_eq!(Continue.escalate(Continue), Continue);
    }

    #[test]
    fn advance_never_moves_backward() {
        let mut t = TopState::new();
        assert!(t.advance_to(SystemState::LinkTraining));
        assert!(!t.advance_to(SystemState::Edid));
        assert!(!t.advance_to(SystemState::LinkTraining));
        assert_eq!(t.current(), SystemState::LinkTraining);
        assert_eq!(t.recoveries(), 0);
    }

    #[test]
    fn change_to_and_below_ignores_later_targets() {
        let mut t = TopState::new();
        t.advance_to(SystemState::Edid);
        assert!(!t.change_to_and_below(SystemState::VideoOutput));
        assert_eq!(t.current(), SystemState::Edid);
        assert!(t.change_to_and_below(SystemState::SinkConnected));
        assert_eq!(t.current(), SystemState::SinkConnected);
        assert_eq!(t.previous(), SystemState::Edid);
        assert!(t.regressed());
        assert_eq!(t.recoveries(), 1);
    }
}
