//! The full device loop in one place.
//!
//! [`Engine`] wires the motion classifier, the sequencer, and playback
//! together behind a single [`service`](Engine::service) call, which the
//! host invokes from its main loop. Each call polls the menu, dispatches
//! on the system mode, and either advances the running clip or asks the
//! sequencer for the next one.
//!
//! The engine owns every collaborator except the clock. Hosts that need
//! finer control can assemble the pieces themselves; the engine exists so
//! the common case is one constructor and one loop.

use crate::device::{
    Accelerometer, AnimationPlayer, MenuInput, ModeSource, PairingLink, PowerControl, SystemMode,
};
use crate::emotes::Emote;
use crate::motion::{MotionClassifier, MotionConfig};
use crate::playback::{PlaybackConfig, PlaybackError, PlaybackSession, PlaybackStatus};
use crate::power::PowerConfig;
use crate::sequencer::{AnimationSequencer, SequenceAction, SequencerConfig};
use crate::time::{TimeDuration, TimeInstant, TimeSource};

/// Timing knobs for every subsystem, bundled.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig<D: TimeDuration> {
    /// Motion classifier thresholds and lockouts.
    pub motion: MotionConfig<D>,
    /// Display dim and deep sleep ladder.
    pub power: PowerConfig<D>,
    /// Rest cycle dwell times.
    pub sequencer: SequencerConfig<D>,
    /// Frame, poll, and timeout intervals.
    pub playback: PlaybackConfig<D>,
}

impl<D: TimeDuration> Default for EngineConfig<D> {
    fn default() -> Self {
        Self {
            motion: MotionConfig::default(),
            power: PowerConfig::default(),
            sequencer: SequencerConfig::default(),
            playback: PlaybackConfig::default(),
        }
    }
}

/// What a service call did, and when to come back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickStatus<D> {
    /// Nothing is playing. Call again at the host's idle cadence.
    Idle,
    /// A clip is running. Call again within the given duration.
    Animating(D),
}

/// Motion-reactive animation engine.
///
/// Generic over every hardware seam so hosts and tests supply their own
/// implementations. Only the time source is borrowed; the engine owns the
/// rest for the life of the device.
pub struct Engine<'t, I, A, P, G, M, S, W, T>
where
    I: TimeInstant,
    A: Accelerometer,
    P: PowerControl,
    G: AnimationPlayer,
    M: MenuInput,
    S: ModeSource,
    W: PairingLink,
    T: TimeSource<I>,
{
    motion: MotionClassifier<'t, I, A, P, T>,
    sequencer: AnimationSequencer<I>,
    session: Option<PlaybackSession<'t, I, T>>,
    player: G,
    menu: M,
    mode: S,
    pairing: W,
    playback_config: PlaybackConfig<I::Duration>,
    last_mode: SystemMode,
    time_source: &'t T,
}

impl<'t, I, A, P, G, M, S, W, T> Engine<'t, I, A, P, G, M, S, W, T>
where
    I: TimeInstant,
    A: Accelerometer,
    P: PowerControl,
    G: AnimationPlayer,
    M: MenuInput,
    S: ModeSource,
    W: PairingLink,
    T: TimeSource<I>,
{
    /// Build an engine with default timing.
    ///
    /// `seed` feeds the emote shuffle; pass something device-unique so two
    /// units next to each other do not animate in lockstep.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        accel: A,
        power: P,
        player: G,
        menu: M,
        mode: S,
        pairing: W,
        time_source: &'t T,
        seed: u32,
    ) -> Self {
        Self::with_config(
            accel,
            power,
            player,
            menu,
            mode,
            pairing,
            time_source,
            seed,
            EngineConfig::default(),
        )
    }

    /// Build an engine with explicit timing.
    #[allow(clippy::too_many_arguments)]
    pub fn with_config(
        accel: A,
        power: P,
        player: G,
        menu: M,
        mode: S,
        pairing: W,
        time_source: &'t T,
        seed: u32,
        config: EngineConfig<I::Duration>,
    ) -> Self {
        let now = time_source.now();
        let last_mode = mode.current_mode();
        Self {
            motion: MotionClassifier::new(accel, power, time_source, config.motion, config.power),
            sequencer: AnimationSequencer::new(now, seed, config.sequencer),
            session: None,
            player,
            menu,
            mode,
            pairing,
            playback_config: config.playback,
            last_mode,
            time_source,
        }
    }

    /// Start the boot clip.
    ///
    /// Call once after construction; subsequent [`service`](Engine::service)
    /// calls run it like any other playback.
    pub fn play_boot_animation(&mut self) -> Result<(), PlaybackError> {
        let session = PlaybackSession::start(
            &mut self.player,
            Emote::Startup,
            self.playback_config,
            self.time_source,
        )?;
        self.session = Some(session);
        Ok(())
    }

    /// Advance the device by one tick.
    ///
    /// Polls the menu, clears motion state on a mode change, and then
    /// either services the running clip or selects the next action. An
    /// in-flight clip is serviced even in update mode so its own abort
    /// check can release the decoder. While the menu is open nothing
    /// animates and the sensor goes unpolled, so stale interaction flags
    /// cannot pile up behind the menu.
    pub fn service(&mut self) -> TickStatus<I::Duration> {
        self.menu.poll();

        let mode = self.mode.current_mode();
        if mode != self.last_mode {
            log::debug!("system mode changed, clearing motion state");
            self.motion.reset_states();
            self.last_mode = mode;
        }

        if let Some(session) = self.session.as_mut() {
            let status = session.service(
                &mut self.player,
                &mut self.motion,
                &mut self.menu,
                &self.mode,
                &self.pairing,
            );
            return match status {
                PlaybackStatus::Active { next_service } => TickStatus::Animating(next_service),
                PlaybackStatus::Finished(reason) => {
                    log::debug!("playback finished: {:?}", reason);
                    self.session = None;
                    self.sequencer.on_playback_finished();
                    TickStatus::Idle
                }
            };
        }

        // Update mode keeps the sensor and power ladder alive but never
        // starts a clip.
        if mode == SystemMode::Update {
            if !self.menu.is_active() {
                self.motion.poll(&mut self.menu);
            }
            return TickStatus::Idle;
        }

        if self.menu.is_active() {
            return TickStatus::Idle;
        }

        let now = self.time_source.now();
        match self
            .sequencer
            .select(&mut self.motion, &mut self.pairing, now)
        {
            SequenceAction::Play(emote) => self.start_playback(emote),
            SequenceAction::StopPlayback => {
                self.player.release();
                TickStatus::Idle
            }
            SequenceAction::None => {
                // Keep the classifier fed between clips.
                self.motion.poll(&mut self.menu);
                TickStatus::Idle
            }
        }
    }

    /// A clip is currently running.
    pub fn is_animating(&self) -> bool {
        self.session.is_some()
    }

    /// The clip currently running, if any.
    pub fn current_emote(&self) -> Option<Emote> {
        self.session.as_ref().map(PlaybackSession::emote)
    }

    /// Read access to the motion classifier.
    pub fn motion(&self) -> &MotionClassifier<'t, I, A, P, T> {
        &self.motion
    }

    /// Mutable access to the motion classifier, for hosts that drive
    /// deep sleep or state resets from their own inputs.
    pub fn motion_mut(&mut self) -> &mut MotionClassifier<'t, I, A, P, T> {
        &mut self.motion
    }

    /// Read access to the sequencer.
    pub fn sequencer(&self) -> &AnimationSequencer<I> {
        &self.sequencer
    }

    fn start_playback(&mut self, emote: Emote) -> TickStatus<I::Duration> {
        match PlaybackSession::start(
            &mut self.player,
            emote,
            self.playback_config,
            self.time_source,
        ) {
            Ok(session) => {
                self.session = Some(session);
                TickStatus::Animating(I::Duration::ZERO)
            }
            Err(PlaybackError::LoadFailed(_)) => {
                // A clip that never started still finishes, so the crash
                // and sleep stages cannot wedge on a missing asset.
                self.sequencer.on_playback_finished();
                TickStatus::Idle
            }
        }
    }
}
