//! Hardware and system collaborator traits.
//!
//! The engine never touches hardware directly. Implement these traits for
//! your platform (sensor driver, GIF decoder, display/power rails, menu
//! system, wireless pairing layer) and hand them to [`Engine`].
//!
//! [`Engine`]: crate::engine::Engine

use crate::emotes::Emote;
use crate::types::AccelSample;

/// Pending interrupt bits reported by the accelerometer.
///
/// The bit layout follows the ADXL345 `INT_SOURCE` register; drivers for
/// other parts translate their own status into this encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptSource(u8);

impl InterruptSource {
    /// Single-tap interrupt bit.
    pub const SINGLE_TAP: u8 = 0x40;
    /// Double-tap interrupt bit.
    pub const DOUBLE_TAP: u8 = 0x20;

    /// Wraps a raw interrupt-source byte.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Returns the raw byte.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// A single tap is pending.
    pub const fn single_tap(self) -> bool {
        self.0 & Self::SINGLE_TAP != 0
    }

    /// A double tap is pending.
    pub const fn double_tap(self) -> bool {
        self.0 & Self::DOUBLE_TAP != 0
    }

    /// Any tap interrupt is pending.
    pub const fn any_tap(self) -> bool {
        self.0 & (Self::SINGLE_TAP | Self::DOUBLE_TAP) != 0
    }
}

/// Axis attribution for the most recent tap event.
///
/// Bit layout follows the ADXL345 `ACT_TAP_STATUS` register tap bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TapAxes(u8);

impl TapAxes {
    /// Tap involved the X axis.
    pub const X: u8 = 0x04;
    /// Tap involved the Y axis.
    pub const Y: u8 = 0x02;
    /// Tap involved the Z axis.
    pub const Z: u8 = 0x01;

    /// Wraps a raw tap-status byte.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Returns the raw byte.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Tap registered on the X axis.
    pub const fn x(self) -> bool {
        self.0 & Self::X != 0
    }

    /// Tap registered on the Y axis.
    pub const fn y(self) -> bool {
        self.0 & Self::Y != 0
    }

    /// Tap registered on the Z axis.
    pub const fn z(self) -> bool {
        self.0 & Self::Z != 0
    }
}

/// Batched accelerometer access.
///
/// The classifier pulls samples in bursts: it asks for the number of
/// buffered samples once per tick, then draws that many fresh readings
/// across its detectors. A disabled or unready sensor must report a count
/// of zero, which turns the whole classification tick into a no-op.
pub trait Accelerometer {
    /// Number of samples currently buffered (0 to FIFO depth, typically 32).
    fn sample_count(&mut self) -> u8;

    /// Reads the next sample in m/s² per axis.
    fn read_sample(&mut self) -> AccelSample;

    /// Drains any pending interrupt state.
    ///
    /// Called by the classifier after every motion-flag write so stale
    /// events cannot re-trigger detection.
    fn clear_interrupts(&mut self);

    /// Reads the pending interrupt bits.
    fn read_interrupt_source(&mut self) -> InterruptSource;

    /// Reads the axis attribution for the most recent tap.
    fn read_tap_axes(&mut self) -> TapAxes;
}

/// Result of advancing one animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameStatus {
    /// Frame rendered; more frames remain.
    Playing,
    /// The animation finished on this frame.
    Complete,
    /// The decoder failed; the asset cannot continue.
    Failed,
}

/// GIF decoding and rendering backend.
pub trait AnimationPlayer {
    /// Loads the asset for the given emote. Returns false on failure.
    ///
    /// A failed load must leave the player with no playback resources
    /// allocated; the caller will not issue a matching [`release`].
    ///
    /// [`release`]: AnimationPlayer::release
    fn load(&mut self, emote: Emote) -> bool;

    /// Decodes and renders the next frame.
    ///
    /// `sync` asks the player to handle frame timing itself; the playback
    /// session passes `false` and paces frames externally.
    fn advance_frame(&mut self, sync: bool) -> FrameStatus;

    /// Releases playback resources for the current asset.
    ///
    /// Must be safe to call with nothing loaded.
    fn release(&mut self);
}

/// Menu/input subsystem.
pub trait MenuInput {
    /// Processes pending input events. Invoked once per classifier tick.
    fn poll(&mut self);

    /// Returns whether the menu overlay is open.
    fn is_active(&self) -> bool;
}

/// Top-level operating mode of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SystemMode {
    /// Normal interactive operation.
    Normal,
    /// Firmware-update mode; animations are suspended.
    Update,
}

/// Reports the current [`SystemMode`].
pub trait ModeSource {
    /// Returns the current operating mode.
    fn current_mode(&self) -> SystemMode;
}

/// Conversation phase of a paired wireless session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Conversation {
    /// No exchange in progress.
    Idle,
    /// Waiting for the peer to respond.
    Waiting,
    /// A message arrived and is being acted on.
    Processing,
}

/// Wireless pairing and conversation state.
pub trait PairingLink {
    /// A peer is currently paired.
    fn is_paired(&self) -> bool;

    /// The radio is switched on.
    fn link_enabled(&self) -> bool;

    /// Current conversation phase.
    fn conversation(&self) -> Conversation;

    /// Emote requested by the most recent inbound message, if any.
    fn inbound_animation(&self) -> Option<Emote>;

    /// Forgets any stale inbound emote request.
    fn clear_inbound_animation(&mut self);

    /// The radio was toggled on or off since the edge was last acknowledged.
    fn toggled(&self) -> bool;

    /// Consumes the toggle edge.
    fn acknowledge_toggle(&mut self);
}

/// Display brightness tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Brightness {
    /// Minimum drive, used just before deep sleep.
    Dim,
    /// Reduced drive for the dimmed-idle state.
    Low,
    /// Normal interactive brightness.
    Full,
}

/// Display power and system sleep control.
pub trait PowerControl {
    /// Sets the display brightness tier.
    fn set_brightness(&mut self, level: Brightness);

    /// Shows the static standby image before sleeping.
    fn show_standby_image(&mut self);

    /// Enters deep sleep. Does not return on real hardware; host and test
    /// implementations may return so the call remains observable.
    fn enter_deep_sleep(&mut self);
}
