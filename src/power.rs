//! Display power supervision: wake debounce, dim timeout, deep-sleep grace.
//!
//! [`SleepSupervisor`] holds the timing ladder as plain state and returns
//! decisions; the motion classifier applies them to the [`PowerControl`]
//! collaborator and the SLEEP flag.
//!
//! [`PowerControl`]: crate::device::PowerControl

use crate::time::{TimeDuration, TimeInstant};

/// Timing configuration for the power ladder.
#[derive(Debug, Clone, Copy)]
pub struct PowerConfig<D: TimeDuration> {
    /// Inactivity span before the display may dim.
    pub display_timeout: D,
    /// Free-running gate the dim transition must also pass. Re-arms itself
    /// each time it fires, so a dim can lag the display timeout by up to
    /// one full period.
    pub idle_timeout: D,
    /// Minimum spacing between wake (full brightness) events.
    pub wake_debounce: D,
    /// Delay between deep-sleep eligibility and actually entering it.
    pub deep_sleep_grace: D,
}

impl<D: TimeDuration> Default for PowerConfig<D> {
    fn default() -> Self {
        Self {
            display_timeout: D::from_millis(30_000),
            idle_timeout: D::from_millis(60_000),
            wake_debounce: D::from_millis(200),
            deep_sleep_grace: D::from_millis(20_000),
        }
    }
}

/// Brightness decision produced by [`SleepSupervisor::evaluate_dim`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DimAction {
    /// No change.
    None,
    /// Activity observed: restore full brightness and clear SLEEP.
    Wake,
    /// Inactive long enough: drop brightness and set SLEEP.
    Dim,
}

/// Tracks the wake/dim/deep-sleep timing ladder.
#[derive(Debug)]
pub struct SleepSupervisor<I: TimeInstant> {
    config: PowerConfig<I::Duration>,
    last_wake: I,
    idle_gate: I,
    grace_started: Option<I>,
}

impl<I: TimeInstant> SleepSupervisor<I> {
    /// Creates a supervisor with both timers anchored at `now`.
    pub fn new(now: I, config: PowerConfig<I::Duration>) -> Self {
        Self {
            config,
            last_wake: now,
            idle_gate: now,
            grace_started: None,
        }
    }

    /// Advances the wake/dim ladder for one tick.
    ///
    /// `active` is whether the current tick saw motion above the activity
    /// threshold; `sleeping` is the current SLEEP flag.
    pub fn evaluate_dim(&mut self, active: bool, sleeping: bool, now: I) -> DimAction {
        if active
            && now.duration_since(self.last_wake).as_millis() >= self.config.wake_debounce.as_millis()
        {
            self.last_wake = now;
            return DimAction::Wake;
        }

        if now.duration_since(self.last_wake).as_millis() >= self.config.display_timeout.as_millis()
            && !sleeping
            && self.idle_gate_fires(now)
        {
            return DimAction::Dim;
        }

        DimAction::None
    }

    /// Advances the deep-sleep countdown for one tick.
    ///
    /// `eligible` is whether the classifier currently reports sustained
    /// inactivity. Returns true when the grace period has run out and the
    /// device should enter deep sleep now.
    pub fn evaluate_deep_sleep(&mut self, eligible: bool, now: I) -> bool {
        if !eligible {
            self.grace_started = None;
            return false;
        }

        let started = *self.grace_started.get_or_insert(now);
        if now.duration_since(started).as_millis() >= self.config.deep_sleep_grace.as_millis() {
            self.grace_started = Some(now);
            return true;
        }
        false
    }

    // Free-running; consulted only once the display timeout has passed.
    fn idle_gate_fires(&mut self, now: I) -> bool {
        if now.duration_since(self.idle_gate).as_millis() >= self.config.idle_timeout.as_millis() {
            self.idle_gate = now;
            return true;
        }
        false
    }
}
