//! Animation arbitration.
//!
//! [`AnimationSequencer`] decides which emote should play next. Each call to
//! [`select`](AnimationSequencer::select) inspects the motion classifier and
//! the pairing link and returns a single [`SequenceAction`]. Urgent sources
//! are checked first (link toggles, deep sleep, interaction flags, tilt), and
//! only when none of them claim the tick does the sequencer fall through to
//! the paired conversation or the free-running rest cycle.
//!
//! Crash and sleep reactions span two ticks: `select` starts the entry
//! animation and parks the state machine in a transient stage, and the caller
//! reports back through
//! [`on_playback_finished`](AnimationSequencer::on_playback_finished) once the
//! clip has stopped so the stage can settle. The caller must report every
//! playback it starts, including ones that failed to load.

use crate::device::{Accelerometer, Conversation, PairingLink, PowerControl};
use crate::emotes::{ACTIVE_EMOTES, Emote, EmotePool, RESTING_EMOTES, XorShift32};
use crate::motion::MotionClassifier;
use crate::time::{TimeDuration, TimeInstant, TimeSource};
use crate::types::MotionKind;

/// Upper bound on the emote collections fed to the shuffle pool.
const POOL_CAPACITY: usize = 16;

/// Timing knobs for the rest cycle and the link reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SequencerConfig<D: TimeDuration> {
    /// Dwell time between emotes while cycling.
    pub cycle_delay: D,
    /// How long the blink loop runs before the next wink.
    pub idle_delay: D,
    /// Minimum gap between "link enabled but unpaired" reminders.
    pub link_check_interval: D,
}

impl<D: TimeDuration> Default for SequencerConfig<D> {
    fn default() -> Self {
        Self {
            cycle_delay: D::from_millis(3_000),
            idle_delay: D::from_millis(20_000),
            link_check_interval: D::from_millis(20_000),
        }
    }
}

/// Phase of the free-running rest cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequenceState {
    /// About to wink and start a new cycle.
    RestStart,
    /// Alternating between resting and active emotes.
    AnimationCycle,
    /// Blinking until the idle delay expires.
    RestEnd,
}

/// Progress of the crash reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CrashState {
    /// Upright, nothing pending.
    None,
    /// Crash entry clip is playing.
    Entering,
    /// Fully tilted and settled.
    Crashed,
    /// Recovery clip is playing.
    Recovering,
}

/// Progress of the sleep reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepStage {
    /// Awake, nothing pending.
    None,
    /// Falling-asleep clip is playing.
    Entering,
    /// Settled into sleep.
    Sleeping,
    /// Wake-up clip is playing.
    Waking,
}

/// What the caller should do with the playback surface this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequenceAction {
    /// Start the given emote.
    Play(Emote),
    /// Stop whatever is playing and leave the display alone.
    StopPlayback,
    /// Nothing to do.
    None,
}

/// Emote selection state machine.
///
/// Owns the rest cycle, the crash and sleep reactions, and the shuffled
/// emote pool. Time only enters through the `now` arguments, so the
/// sequencer itself never touches a clock.
pub struct AnimationSequencer<I: TimeInstant> {
    config: SequencerConfig<I::Duration>,
    state: SequenceState,
    state_started: I,
    idle_mode: bool,
    crash: CrashState,
    was_crashed: bool,
    sleep: SleepStage,
    was_asleep: bool,
    pool: EmotePool<POOL_CAPACITY>,
    rng: XorShift32,
    last_link_check: I,
}

impl<I: TimeInstant> AnimationSequencer<I> {
    /// Create a sequencer resting at the start of the cycle.
    ///
    /// `now` anchors the dwell timers and the link reminder. `seed` feeds
    /// the shuffle; any value works, including zero.
    pub fn new(now: I, seed: u32, config: SequencerConfig<I::Duration>) -> Self {
        Self {
            config,
            state: SequenceState::RestStart,
            state_started: now,
            idle_mode: true,
            crash: CrashState::None,
            was_crashed: false,
            sleep: SleepStage::None,
            was_asleep: false,
            pool: EmotePool::new(),
            rng: XorShift32::new(seed),
            last_link_check: now,
        }
    }

    /// Pick the action for this tick.
    ///
    /// Motion flags that trigger a reaction are consumed here. Tilt and
    /// half-tilt are level signals and stay set; pairing toggles are
    /// acknowledged on the link once answered.
    pub fn select<A, P, W, T>(
        &mut self,
        motion: &mut MotionClassifier<'_, I, A, P, T>,
        pairing: &mut W,
        now: I,
    ) -> SequenceAction
    where
        A: Accelerometer,
        P: PowerControl,
        W: PairingLink,
        T: TimeSource<I>,
    {
        if let Some(action) = self.special_states(motion, pairing) {
            return action;
        }

        // Remind an unpaired device that its link is still on, at most once
        // per interval and only while the ordinary cycle is running.
        if self.state == SequenceState::AnimationCycle
            && now.duration_since(self.last_link_check).as_millis()
                >= self.config.link_check_interval.as_millis()
            && pairing.link_enabled()
            && !pairing.is_paired()
        {
            self.last_link_check = now;
            return SequenceAction::Play(Emote::ComsConnect);
        }

        if pairing.is_paired() {
            match pairing.conversation() {
                Conversation::Processing => match pairing.inbound_animation() {
                    Some(emote) => SequenceAction::Play(emote),
                    None => SequenceAction::None,
                },
                Conversation::Waiting => SequenceAction::Play(Emote::ComsIdle),
                Conversation::Idle => SequenceAction::None,
            }
        } else {
            pairing.clear_inbound_animation();
            self.sequence_step(now)
        }
    }

    /// Settle any transient crash or sleep stage.
    ///
    /// Called once per started playback, after it stops for any reason.
    pub fn on_playback_finished(&mut self) {
        match self.crash {
            CrashState::Entering => {
                self.crash = CrashState::Crashed;
                self.was_crashed = true;
            }
            CrashState::Recovering => {
                self.crash = CrashState::None;
                self.was_crashed = false;
            }
            CrashState::None | CrashState::Crashed => {}
        }
        match self.sleep {
            SleepStage::Entering => {
                self.sleep = SleepStage::Sleeping;
                self.was_asleep = true;
            }
            SleepStage::Waking => {
                self.sleep = SleepStage::None;
                self.was_asleep = false;
            }
            SleepStage::None | SleepStage::Sleeping => {}
        }
    }

    /// Current phase of the rest cycle.
    pub fn state(&self) -> SequenceState {
        self.state
    }

    /// Current crash stage.
    pub fn crash_state(&self) -> CrashState {
        self.crash
    }

    /// Current sleep stage.
    pub fn sleep_stage(&self) -> SleepStage {
        self.sleep
    }

    /// Urgent sources, highest priority first.
    fn special_states<A, P, W, T>(
        &mut self,
        motion: &mut MotionClassifier<'_, I, A, P, T>,
        pairing: &mut W,
    ) -> Option<SequenceAction>
    where
        A: Accelerometer,
        P: PowerControl,
        W: PairingLink,
        T: TimeSource<I>,
    {
        if pairing.toggled() {
            pairing.acknowledge_toggle();
            let emote = if pairing.link_enabled() {
                Emote::ComsConnect
            } else {
                Emote::ComsDisconnect
            };
            return Some(SequenceAction::Play(emote));
        }

        if motion.take(MotionKind::DeepSleep) {
            return Some(SequenceAction::StopPlayback);
        }

        if motion.interacted() {
            if motion.take(MotionKind::Shaking) {
                return Some(SequenceAction::Play(Emote::Dizzy));
            }
            if motion.take(MotionKind::DoubleTapped) {
                return Some(SequenceAction::Play(Emote::Shock));
            }
            if motion.take(MotionKind::Tapped) {
                return Some(SequenceAction::Play(Emote::Tap));
            }
            if motion.take(MotionKind::SuddenAcceleration) {
                return Some(SequenceAction::Play(Emote::Startled));
            }
        }

        // A half tilt that never became a full tilt reads as a wobble.
        let half_tilted = motion.half_tilted_left() || motion.half_tilted_right();
        let full_tilted = motion.tilted_left() || motion.tilted_right() || motion.upside_down();
        if half_tilted && !full_tilted {
            return Some(SequenceAction::Play(Emote::Shock));
        }

        if motion.oriented() || self.was_crashed {
            if let Some(action) = self.crash_step(motion) {
                return Some(action);
            }
        }

        if motion.sleeping() || self.was_asleep {
            if let Some(action) = self.sleep_step(motion) {
                return Some(action);
            }
        }

        None
    }

    fn crash_step<A, P, T>(
        &mut self,
        motion: &MotionClassifier<'_, I, A, P, T>,
    ) -> Option<SequenceAction>
    where
        A: Accelerometer,
        P: PowerControl,
        T: TimeSource<I>,
    {
        if motion.tilted_left() || motion.tilted_right() || motion.upside_down() {
            match self.crash {
                CrashState::None => {
                    self.crash = CrashState::Entering;
                    return Some(SequenceAction::Play(Emote::Crash01));
                }
                CrashState::Crashed => return Some(SequenceAction::Play(Emote::Crash02)),
                CrashState::Entering | CrashState::Recovering => {}
            }
        } else if self.was_crashed {
            self.crash = CrashState::Recovering;
            return Some(SequenceAction::Play(Emote::Crash03));
        }
        None
    }

    fn sleep_step<A, P, T>(
        &mut self,
        motion: &MotionClassifier<'_, I, A, P, T>,
    ) -> Option<SequenceAction>
    where
        A: Accelerometer,
        P: PowerControl,
        T: TimeSource<I>,
    {
        if motion.sleeping() {
            match self.sleep {
                SleepStage::None => {
                    self.sleep = SleepStage::Entering;
                    return Some(SequenceAction::Play(Emote::Sleep01));
                }
                SleepStage::Sleeping => return Some(SequenceAction::Play(Emote::Sleep02)),
                SleepStage::Entering | SleepStage::Waking => {}
            }
        } else if self.was_asleep {
            self.sleep = SleepStage::Waking;
            return Some(SequenceAction::Play(Emote::Sleep03));
        }
        None
    }

    /// Free-running rest cycle, stepped only when nothing else claimed the
    /// tick and the device is unpaired.
    fn sequence_step(&mut self, now: I) -> SequenceAction {
        match self.state {
            SequenceState::RestStart => {
                self.state = SequenceState::AnimationCycle;
                self.state_started = now;
                SequenceAction::Play(Emote::Wink)
            }
            SequenceState::AnimationCycle => {
                if now.duration_since(self.state_started).as_millis()
                    < self.config.cycle_delay.as_millis()
                {
                    return SequenceAction::None;
                }

                let collection = if self.idle_mode {
                    RESTING_EMOTES
                } else {
                    ACTIVE_EMOTES
                };
                let Some(emote) = self.pool.pick(collection, &mut self.rng) else {
                    log::error!("emote collection of {} does not fit the pool", collection.len());
                    return SequenceAction::None;
                };

                // Alternate collections; dropping back to resting starts the
                // blink countdown.
                self.idle_mode = !self.idle_mode;
                if self.idle_mode {
                    self.state = SequenceState::RestEnd;
                    self.state_started = now;
                }
                SequenceAction::Play(emote)
            }
            SequenceState::RestEnd => {
                if now.duration_since(self.state_started).as_millis()
                    >= self.config.idle_delay.as_millis()
                {
                    self.state = SequenceState::RestStart;
                    self.state_started = now;
                }
                SequenceAction::Play(Emote::Blink)
            }
        }
    }
}
