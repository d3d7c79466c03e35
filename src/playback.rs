//! Cooperative playback of a single animation.
//!
//! [`PlaybackSession`] wraps one running clip. The caller services it from
//! the main loop; each call advances at most one frame, polls the inputs
//! that may abort the clip, and reports how long the caller can sleep
//! before the next deadline. Frames advance at a fixed rate and input
//! polling runs on its own faster cadence, so a long clip stays responsive
//! without redrawing on every loop iteration.
//!
//! A session releases the decoder exactly once, no matter how it ends.

use crate::device::{
    Accelerometer, AnimationPlayer, FrameStatus, MenuInput, ModeSource, PairingLink, PowerControl,
    SystemMode,
};
use crate::emotes::Emote;
use crate::motion::MotionClassifier;
use crate::time::{TimeDuration, TimeInstant, TimeSource, earliest};

/// Timing knobs for a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlaybackConfig<D: TimeDuration> {
    /// Gap between frame advances.
    pub frame_interval: D,
    /// Gap between input polls while a clip plays.
    pub poll_interval: D,
    /// Hard cap on clip runtime.
    pub timeout: D,
}

impl<D: TimeDuration> Default for PlaybackConfig<D> {
    fn default() -> Self {
        Self {
            // 62.5ms per frame, 16 frames per second.
            frame_interval: D::from_micros(62_500),
            poll_interval: D::from_millis(10),
            timeout: D::from_millis(10_000),
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopReason {
    /// The clip played its last frame.
    Completed,
    /// The menu opened mid-clip.
    MenuOpened,
    /// The device switched into update mode.
    ModeChanged,
    /// The pairing link was toggled.
    LinkToggled,
    /// A motion interaction flag came up.
    MotionInterrupt,
    /// The device was tilted over or flipped.
    Orientation,
    /// The clip overran the runtime cap.
    TimedOut,
    /// The decoder reported a bad frame.
    DecodeFailed,
}

/// Outcome of one service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlaybackStatus<D> {
    /// Still playing. Service again within `next_service`.
    Active {
        /// Time until the nearest frame, poll, or timeout deadline.
        next_service: D,
    },
    /// The clip stopped and the decoder was released.
    Finished(StopReason),
}

/// Errors from starting a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlaybackError {
    /// The decoder could not open the clip.
    LoadFailed(Emote),
}

impl core::fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PlaybackError::LoadFailed(emote) => {
                write!(f, "failed to load animation {}", emote.path())
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PlaybackError {}

/// One running clip.
///
/// Holds the deadline bookkeeping but not the decoder. The caller passes
/// the player back in on every call so it can own the hardware between
/// sessions.
pub struct PlaybackSession<'t, I: TimeInstant, T: TimeSource<I>> {
    emote: Emote,
    started: I,
    last_frame: Option<I>,
    last_poll: Option<I>,
    config: PlaybackConfig<I::Duration>,
    time_source: &'t T,
}

impl<'t, I: TimeInstant, T: TimeSource<I>> PlaybackSession<'t, I, T> {
    /// Load a clip and start the deadline clocks.
    ///
    /// On a failed load the decoder holds nothing and no session exists.
    /// The first service call after a successful start advances the first
    /// frame immediately.
    pub fn start<G: AnimationPlayer>(
        player: &mut G,
        emote: Emote,
        config: PlaybackConfig<I::Duration>,
        time_source: &'t T,
    ) -> Result<Self, PlaybackError> {
        if !player.load(emote) {
            log::error!("failed to load {}", emote.path());
            return Err(PlaybackError::LoadFailed(emote));
        }
        log::debug!("playing {}", emote.path());
        Ok(Self {
            emote,
            started: time_source.now(),
            last_frame: None,
            last_poll: None,
            config,
            time_source,
        })
    }

    /// The clip this session is playing.
    pub fn emote(&self) -> Emote {
        self.emote
    }

    /// Advance the session by one tick.
    ///
    /// Runs the frame advance if one is due, then the input poll, then the
    /// timeout check. Aborts are checked in a fixed order: menu, mode,
    /// link toggle, motion interaction, orientation. The link toggle and
    /// the motion flags are left set so the next selection can answer
    /// them. Clips that react to orientation are exempt from the
    /// orientation abort.
    ///
    /// Once this returns [`PlaybackStatus::Finished`] the session is spent
    /// and must be dropped.
    pub fn service<G, A, P, M, S, W>(
        &mut self,
        player: &mut G,
        motion: &mut MotionClassifier<'t, I, A, P, T>,
        menu: &mut M,
        mode: &S,
        pairing: &W,
    ) -> PlaybackStatus<I::Duration>
    where
        G: AnimationPlayer,
        A: Accelerometer,
        P: PowerControl,
        M: MenuInput,
        S: ModeSource,
        W: PairingLink,
    {
        let now = self.time_source.now();

        if self.due(self.last_frame, self.config.frame_interval, now) {
            self.last_frame = Some(now);
            match player.advance_frame(false) {
                FrameStatus::Playing => {}
                FrameStatus::Complete => {
                    player.release();
                    return PlaybackStatus::Finished(StopReason::Completed);
                }
                FrameStatus::Failed => {
                    log::warn!("frame decode failed for {}", self.emote.path());
                    player.release();
                    return PlaybackStatus::Finished(StopReason::DecodeFailed);
                }
            }
        }

        if self.due(self.last_poll, self.config.poll_interval, now) {
            self.last_poll = Some(now);
            motion.poll(menu);

            if menu.is_active() {
                player.release();
                return PlaybackStatus::Finished(StopReason::MenuOpened);
            }
            if mode.current_mode() == SystemMode::Update {
                player.release();
                return PlaybackStatus::Finished(StopReason::ModeChanged);
            }
            if pairing.toggled() {
                player.release();
                return PlaybackStatus::Finished(StopReason::LinkToggled);
            }
            if motion.interacted() {
                player.release();
                return PlaybackStatus::Finished(StopReason::MotionInterrupt);
            }
            let flipped =
                motion.tilted_left() || motion.tilted_right() || motion.upside_down();
            if flipped && !self.emote.is_orientation_driven() {
                player.release();
                return PlaybackStatus::Finished(StopReason::Orientation);
            }
        }

        if now.duration_since(self.started).as_micros() > self.config.timeout.as_micros() {
            log::error!("playback of {} timed out", self.emote.path());
            player.release();
            return PlaybackStatus::Finished(StopReason::TimedOut);
        }

        PlaybackStatus::Active {
            next_service: self.next_deadline(now),
        }
    }

    // Half-millisecond frame intervals need the comparison in microseconds.
    fn due(&self, last: Option<I>, interval: I::Duration, now: I) -> bool {
        match last {
            None => true,
            Some(at) => now.duration_since(at).as_micros() >= interval.as_micros(),
        }
    }

    /// Time until the nearest of the frame, poll, and timeout deadlines.
    fn next_deadline(&self, now: I) -> I::Duration {
        let frame = self.remaining(self.last_frame, self.config.frame_interval, now);
        let poll = self.remaining(self.last_poll, self.config.poll_interval, now);
        let timeout = self
            .config
            .timeout
            .saturating_sub(now.duration_since(self.started));
        earliest(earliest(frame, poll), timeout)
    }

    fn remaining(&self, last: Option<I>, interval: I::Duration, now: I) -> I::Duration {
        match last {
            None => I::Duration::ZERO,
            Some(at) => interval.saturating_sub(now.duration_since(at)),
        }
    }
}
