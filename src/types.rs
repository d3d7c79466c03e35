//! Core types for the motion data model.

/// A discrete motion condition recognized by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionKind {
    /// Sustained high-energy movement.
    Shaking,
    /// Single tap on the X axis (or any non-Z axis fallback).
    Tapped,
    /// Double tap on the X or Y axis (or any non-Z axis fallback).
    DoubleTapped,
    /// Display dimmed after a stretch without movement.
    Sleep,
    /// Prolonged stillness; deep-sleep entry is pending.
    DeepSleep,
    /// Device held face-down.
    UpsideDown,
    /// Full tilt toward the left side.
    TiltedLeft,
    /// Full tilt toward the right side.
    TiltedRight,
    /// Partial tilt toward the left side.
    HalfTiltedLeft,
    /// Partial tilt toward the right side.
    HalfTiltedRight,
    /// Magnitude jump exceeding both absolute and delta thresholds.
    SuddenAcceleration,
}

impl MotionKind {
    const fn mask(self) -> u16 {
        1 << (self as u16)
    }
}

/// Fixed set of motion flags, one per [`MotionKind`].
///
/// Flags are written only by the motion classifier; consumers read them or
/// hand them back through the classifier's take-API so that every write
/// keeps its side effects (pending sensor interrupts are drained on each
/// state change).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionStateSet {
    bits: u16,
}

impl MotionStateSet {
    /// Creates an empty set.
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    /// Returns whether the given flag is set.
    pub fn get(&self, kind: MotionKind) -> bool {
        self.bits & kind.mask() != 0
    }

    /// Sets or clears the given flag.
    pub fn set(&mut self, kind: MotionKind, active: bool) {
        if active {
            self.bits |= kind.mask();
        } else {
            self.bits &= !kind.mask();
        }
    }

    /// Clears every flag.
    pub fn clear_all(&mut self) {
        self.bits = 0;
    }

    /// Returns whether any of the given flags is set.
    pub fn any_of(&self, kinds: &[MotionKind]) -> bool {
        kinds.iter().any(|&kind| self.get(kind))
    }

    /// Returns whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

/// One accelerometer reading in m/s² per axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AccelSample {
    /// X axis acceleration.
    pub x: f32,
    /// Y axis acceleration.
    pub y: f32,
    /// Z axis acceleration.
    pub z: f32,
}

impl AccelSample {
    /// Creates a new sample.
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}
