//! Shared test infrastructure for emote-sequencer integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use emote_sequencer::{
    AccelSample, Accelerometer, AnimationPlayer, Brightness, Conversation, Emote, FrameStatus,
    GRAVITY_EARTH, InterruptSource, MenuInput, ModeSource, MotionClassifier, MotionConfig,
    PairingLink, PowerConfig, PowerControl, SystemMode, TapAxes, TimeDuration, TimeInstant,
    TimeSource,
};

// ============================================================================
// Mock Time Types
// ============================================================================

/// Mock duration type for testing (wraps microseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestDuration(pub u64);

impl TimeDuration for TestDuration {
    const ZERO: Self = TestDuration(0);

    fn as_millis(&self) -> u64 {
        self.0 / 1_000
    }

    fn from_millis(millis: u64) -> Self {
        TestDuration(millis * 1_000)
    }

    fn as_micros(&self) -> u64 {
        self.0
    }

    fn from_micros(micros: u64) -> Self {
        TestDuration(micros)
    }

    fn saturating_sub(self, other: Self) -> Self {
        TestDuration(self.0.saturating_sub(other.0))
    }
}

/// Mock instant type for testing (microseconds from an arbitrary zero)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestInstant(pub u64);

impl TimeInstant for TestInstant {
    type Duration = TestDuration;

    fn duration_since(&self, earlier: Self) -> Self::Duration {
        TestDuration(self.0 - earlier.0)
    }
}

/// Millisecond shorthand for durations
pub fn ms(millis: u64) -> TestDuration {
    TestDuration::from_millis(millis)
}

/// Millisecond shorthand for instants
pub fn at_ms(millis: u64) -> TestInstant {
    TestInstant(millis * 1_000)
}

// ============================================================================
// Mock Time Source
// ============================================================================

/// Mock time source with controllable time advancement
pub struct MockTimeSource {
    current_time: Cell<TestInstant>,
}

impl MockTimeSource {
    pub fn new() -> Self {
        Self {
            current_time: Cell::new(TestInstant(0)),
        }
    }

    /// Advance time by the given duration
    pub fn advance(&self, duration: TestDuration) {
        let current = self.current_time.get();
        self.current_time.set(TestInstant(current.0 + duration.0));
    }

    /// Advance time by whole milliseconds
    pub fn advance_ms(&self, millis: u64) {
        self.advance(ms(millis));
    }

    pub fn set_time(&self, time: TestInstant) {
        self.current_time.set(time);
    }
}

impl TimeSource<TestInstant> for MockTimeSource {
    fn now(&self) -> TestInstant {
        self.current_time.get()
    }
}

// ============================================================================
// Mock Accelerometer
// ============================================================================

/// A sample with no dynamic motion: gravity on the upright z axis
pub fn quiet_sample() -> AccelSample {
    AccelSample::new(0.0, 0.0, GRAVITY_EARTH)
}

/// Staged accelerometer registers, shared with the test body
#[derive(Debug, Clone)]
pub struct AccelState {
    /// Sample returned by every read until restaged
    pub sample: AccelSample,
    /// Batch size reported to the classifier
    pub fifo_count: u8,
    /// Pending interrupt source bits
    pub interrupts: u8,
    /// Tap axis status bits
    pub tap_axes: u8,
    /// Number of clear_interrupts calls observed
    pub clear_count: u32,
}

/// Mock accelerometer whose registers the test stages through a shared handle
pub struct MockAccel {
    pub state: Rc<RefCell<AccelState>>,
}

impl MockAccel {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(AccelState {
                sample: quiet_sample(),
                fifo_count: 0,
                interrupts: 0,
                tap_axes: 0,
                clear_count: 0,
            })),
        }
    }

    /// Shared handle for staging registers after the mock is moved away
    pub fn handle(&self) -> Rc<RefCell<AccelState>> {
        self.state.clone()
    }
}

impl Accelerometer for MockAccel {
    fn sample_count(&mut self) -> u8 {
        self.state.borrow().fifo_count
    }

    fn read_sample(&mut self) -> AccelSample {
        self.state.borrow().sample
    }

    fn clear_interrupts(&mut self) {
        let mut state = self.state.borrow_mut();
        state.interrupts = 0;
        state.tap_axes = 0;
        state.clear_count += 1;
    }

    fn read_interrupt_source(&mut self) -> InterruptSource {
        InterruptSource::from_bits(self.state.borrow().interrupts)
    }

    fn read_tap_axes(&mut self) -> TapAxes {
        TapAxes::from_bits(self.state.borrow().tap_axes)
    }
}

// ============================================================================
// Mock Animation Player
// ============================================================================

/// Recorded player activity, shared with the test body
#[derive(Debug, Default)]
pub struct PlayerState {
    /// Every clip loaded, in order
    pub loads: heapless::Vec<Emote, 32>,
    /// Frames served for the current clip
    pub frames_served: u32,
    /// Frames served across all clips
    pub total_frames: u32,
    /// Frame count at which a clip reports Complete (0 = never completes)
    pub complete_after: u32,
    /// Fail the next load call
    pub fail_next_load: bool,
    /// Fail every frame decode
    pub fail_frames: bool,
    /// Number of release calls observed
    pub release_count: u32,
    /// An asset is currently held
    pub loaded: bool,
}

/// Mock player that records loads, frames, and releases
pub struct MockPlayer {
    pub state: Rc<RefCell<PlayerState>>,
}

impl MockPlayer {
    /// A player whose clips never finish on their own
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(PlayerState::default())),
        }
    }

    /// A player whose clips report Complete on the given frame
    pub fn with_clip_length(frames: u32) -> Self {
        let player = Self::new();
        player.state.borrow_mut().complete_after = frames;
        player
    }

    pub fn handle(&self) -> Rc<RefCell<PlayerState>> {
        self.state.clone()
    }
}

impl AnimationPlayer for MockPlayer {
    fn load(&mut self, emote: Emote) -> bool {
        let mut state = self.state.borrow_mut();
        if state.fail_next_load {
            state.fail_next_load = false;
            return false;
        }
        let _ = state.loads.push(emote);
        state.frames_served = 0;
        state.loaded = true;
        true
    }

    fn advance_frame(&mut self, _sync: bool) -> FrameStatus {
        let mut state = self.state.borrow_mut();
        if state.fail_frames {
            return FrameStatus::Failed;
        }
        state.frames_served += 1;
        state.total_frames += 1;
        if state.complete_after != 0 && state.frames_served >= state.complete_after {
            FrameStatus::Complete
        } else {
            FrameStatus::Playing
        }
    }

    fn release(&mut self) {
        let mut state = self.state.borrow_mut();
        state.release_count += 1;
        state.loaded = false;
    }
}

// ============================================================================
// Mock Menu
// ============================================================================

#[derive(Debug, Default)]
pub struct MenuState {
    /// The menu is open
    pub active: bool,
    /// Number of poll calls observed
    pub poll_count: u32,
}

/// Mock menu toggled by the test body through a shared handle
pub struct MockMenu {
    pub state: Rc<RefCell<MenuState>>,
}

impl MockMenu {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(MenuState::default())),
        }
    }

    pub fn handle(&self) -> Rc<RefCell<MenuState>> {
        self.state.clone()
    }
}

impl MenuInput for MockMenu {
    fn poll(&mut self) {
        self.state.borrow_mut().poll_count += 1;
    }

    fn is_active(&self) -> bool {
        self.state.borrow().active
    }
}

// ============================================================================
// Mock Mode Source
// ============================================================================

/// Mock system mode switched by the test body through a shared handle
pub struct MockMode {
    pub mode: Rc<Cell<SystemMode>>,
}

impl MockMode {
    pub fn new() -> Self {
        Self {
            mode: Rc::new(Cell::new(SystemMode::Normal)),
        }
    }

    pub fn handle(&self) -> Rc<Cell<SystemMode>> {
        self.mode.clone()
    }
}

impl ModeSource for MockMode {
    fn current_mode(&self) -> SystemMode {
        self.mode.get()
    }
}

// ============================================================================
// Mock Pairing Link
// ============================================================================

/// Staged pairing link state, shared with the test body
#[derive(Debug)]
pub struct PairingState {
    pub paired: bool,
    pub link_on: bool,
    pub conversation: Conversation,
    pub inbound: Option<Emote>,
    /// An unanswered on/off toggle is pending
    pub toggle_pending: bool,
    /// Number of acknowledge_toggle calls observed
    pub ack_count: u32,
    /// Number of clear_inbound_animation calls observed
    pub inbound_clears: u32,
}

impl Default for PairingState {
    fn default() -> Self {
        Self {
            paired: false,
            link_on: true,
            conversation: Conversation::Idle,
            inbound: None,
            toggle_pending: false,
            ack_count: 0,
            inbound_clears: 0,
        }
    }
}

/// Mock pairing link staged by the test body through a shared handle
pub struct MockPairing {
    pub state: Rc<RefCell<PairingState>>,
}

impl MockPairing {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(PairingState::default())),
        }
    }

    pub fn handle(&self) -> Rc<RefCell<PairingState>> {
        self.state.clone()
    }
}

impl PairingLink for MockPairing {
    fn is_paired(&self) -> bool {
        self.state.borrow().paired
    }

    fn link_enabled(&self) -> bool {
        self.state.borrow().link_on
    }

    fn conversation(&self) -> Conversation {
        self.state.borrow().conversation
    }

    fn inbound_animation(&self) -> Option<Emote> {
        self.state.borrow().inbound
    }

    fn clear_inbound_animation(&mut self) {
        let mut state = self.state.borrow_mut();
        state.inbound = None;
        state.inbound_clears += 1;
    }

    fn toggled(&self) -> bool {
        self.state.borrow().toggle_pending
    }

    fn acknowledge_toggle(&mut self) {
        let mut state = self.state.borrow_mut();
        state.toggle_pending = false;
        state.ack_count += 1;
    }
}

// ============================================================================
// Mock Power Control
// ============================================================================

/// Recorded power actions, shared with the test body
#[derive(Debug, Default)]
pub struct PowerLog {
    /// Every brightness change, in order
    pub brightness: heapless::Vec<Brightness, 32>,
    /// Number of show_standby_image calls observed
    pub standby_count: u32,
    /// Number of enter_deep_sleep calls observed
    pub deep_sleep_count: u32,
}

impl PowerLog {
    pub fn last_brightness(&self) -> Option<Brightness> {
        self.brightness.last().copied()
    }
}

/// Mock power control that records everything asked of it
pub struct MockPower {
    pub state: Rc<RefCell<PowerLog>>,
}

impl MockPower {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(PowerLog::default())),
        }
    }

    pub fn handle(&self) -> Rc<RefCell<PowerLog>> {
        self.state.clone()
    }
}

impl PowerControl for MockPower {
    fn set_brightness(&mut self, level: Brightness) {
        let _ = self.state.borrow_mut().brightness.push(level);
    }

    fn show_standby_image(&mut self) {
        self.state.borrow_mut().standby_count += 1;
    }

    fn enter_deep_sleep(&mut self) {
        self.state.borrow_mut().deep_sleep_count += 1;
    }
}

// ============================================================================
// Classifier Assembly
// ============================================================================

/// The classifier type every integration test drives
pub type TestClassifier<'t> =
    MotionClassifier<'t, TestInstant, MockAccel, MockPower, MockTimeSource>;

/// Classifier with default thresholds and throwaway hardware mocks, for
/// tests that only stage motion flags rather than sensor batches
pub fn new_classifier(clock: &MockTimeSource) -> TestClassifier<'_> {
    MotionClassifier::new(
        MockAccel::new(),
        MockPower::new(),
        clock,
        MotionConfig::default(),
        PowerConfig::default(),
    )
}
