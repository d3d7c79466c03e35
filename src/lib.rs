#![cfg_attr(not(feature = "std"), no_std)]
#![doc = include_str!("../README.md")]

//! # Core Concepts
//!
//! - **`Engine`**: The whole device loop behind one `service()` call
//! - **`MotionClassifier`**: Turns accelerometer batches into motion flags
//! - **`MotionStateSet`**: The flag set consumers read and take from
//! - **`AnimationSequencer`**: Decides which emote plays next
//! - **`PlaybackSession`**: One running clip, serviced cooperatively
//! - **`SleepSupervisor`**: Display dim and deep sleep timing ladder
//! - **`Emote`**: The animation catalog, with asset paths
//! - **`Accelerometer`** / **`AnimationPlayer`** / **`MenuInput`** /
//!   **`ModeSource`** / **`PairingLink`** / **`PowerControl`**: Traits to
//!   implement for your hardware
//! - **`TimeSource`**: Trait to implement for your timing system
//!
//! Acceleration is in m/s² on all three axes. When implementing
//! `Accelerometer` for your hardware, convert the sensor's native units
//! before handing samples over.

pub mod device;
pub mod emotes;
pub mod engine;
pub mod motion;
pub mod playback;
pub mod power;
pub mod sequencer;
pub mod time;
pub mod types;

pub use device::{
    Accelerometer, AnimationPlayer, Brightness, Conversation, FrameStatus, InterruptSource,
    MenuInput, ModeSource, PairingLink, PowerControl, SystemMode, TapAxes,
};
pub use emotes::{ACTIVE_EMOTES, Emote, RESTING_EMOTES};
pub use engine::{Engine, EngineConfig, TickStatus};
pub use motion::{MotionClassifier, MotionConfig};
pub use playback::{PlaybackConfig, PlaybackError, PlaybackSession, PlaybackStatus, StopReason};
pub use power::{DimAction, PowerConfig, SleepSupervisor};
pub use sequencer::{
    AnimationSequencer, CrashState, SequenceAction, SequenceState, SequencerConfig, SleepStage,
};
pub use time::{TimeDuration, TimeInstant, TimeSource};
pub use types::{AccelSample, MotionKind, MotionStateSet};

/// Standard gravity in m/s², subtracted when isolating dynamic motion.
pub const GRAVITY_EARTH: f32 = 9.80665;
