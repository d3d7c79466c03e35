//! Motion classification from batched accelerometer samples.
//!
//! Provides [`MotionClassifier`], which turns raw sensor batches into the
//! discrete motion flags the rest of the engine consumes: shakes, taps,
//! orientation, sudden acceleration, and the inactivity signals feeding the
//! power ladder. One classifier owns all flag writes; every write also
//! drains pending sensor interrupts so a handled event cannot re-trigger.

use crate::GRAVITY_EARTH;
use crate::device::{Accelerometer, Brightness, MenuInput, PowerControl};
use crate::power::{DimAction, PowerConfig, SleepSupervisor};
use crate::time::{TimeDuration, TimeInstant, TimeSource};
use crate::types::{AccelSample, MotionKind, MotionStateSet};

/// EMA weight for the smoothed magnitude. Low and sluggish on purpose: the
/// detectors want sustained energy, not single-sample spikes.
const SMOOTHING_FACTOR: f32 = 0.1;

/// Detection thresholds and lockout windows.
///
/// Thresholds are in m/s². The defaults are calibrated for a palm-sized
/// desk toy with the sensor mounted flat; tune per device.
#[derive(Debug, Clone, Copy)]
pub struct MotionConfig<D: TimeDuration> {
    /// Average smoothed magnitude that counts as shaking.
    pub shake_threshold: f32,
    /// Average smoothed magnitude below which the device is still.
    pub inactivity_threshold: f32,
    /// Y-axis average for a full left/right tilt.
    pub tilt_threshold: f32,
    /// Y-axis average for a partial tilt.
    pub half_tilt_threshold: f32,
    /// Z-axis average at or below which the device is upside down.
    pub flip_threshold: f32,
    /// Absolute smoothed magnitude a sudden-acceleration event must reach.
    pub accel_threshold: f32,
    /// Magnitude change from the previous tick a sudden-acceleration event
    /// must reach.
    pub accel_delta_threshold: f32,
    /// Shake suppression window after a tap.
    pub tap_lockout: D,
    /// Sudden-acceleration suppression window after taps or shakes.
    pub accel_lockout: D,
    /// Sustained stillness before the DEEP_SLEEP flag is raised.
    pub inactivity_timeout: D,
}

impl<D: TimeDuration> Default for MotionConfig<D> {
    fn default() -> Self {
        Self {
            shake_threshold: 8.0,
            inactivity_threshold: 1.5,
            tilt_threshold: 9.0,
            half_tilt_threshold: 4.2,
            flip_threshold: -8.0,
            accel_threshold: 6.0,
            accel_delta_threshold: 4.0,
            tap_lockout: D::from_millis(500),
            accel_lockout: D::from_millis(600),
            inactivity_timeout: D::from_millis(90_000),
        }
    }
}

/// Exponential moving average over the gravity-compensated magnitude.
#[derive(Debug, Default)]
struct MagnitudeFilter {
    smoothed: f32,
}

impl MagnitudeFilter {
    /// Feeds one sample and returns the updated smoothed magnitude.
    fn update(&mut self, sample: AccelSample) -> f32 {
        let raw = libm::sqrtf(sample.x * sample.x + sample.y * sample.y + sample.z * sample.z);
        let dynamic = libm::fabsf(raw - GRAVITY_EARTH);
        self.smoothed = SMOOTHING_FACTOR * dynamic + (1.0 - SMOOTHING_FACTOR) * self.smoothed;
        self.smoothed
    }
}

/// Classifies accelerometer motion into discrete flags and supervises
/// display power.
///
/// Owns the sensor and the power collaborator; borrows the time source.
/// Call [`poll`] once per tick (both idle ticks and playback polls). Each
/// detector draws its own fresh batch of samples through the shared
/// magnitude filter; running order inside a tick is part of the contract.
///
/// # Type Parameters
/// * `'t` - Lifetime of the time source reference
/// * `I` - Time instant type
/// * `A` - Accelerometer implementation
/// * `P` - Power control implementation
/// * `T` - Time source implementation
///
/// [`poll`]: MotionClassifier::poll
pub struct MotionClassifier<'t, I: TimeInstant, A: Accelerometer, P: PowerControl, T: TimeSource<I>>
{
    accel: A,
    power: P,
    time_source: &'t T,
    config: MotionConfig<I::Duration>,
    states: MotionStateSet,
    magnitude: MagnitudeFilter,
    supervisor: SleepSupervisor<I>,
    tap_lockout_at: Option<I>,
    accel_lockout_at: Option<I>,
    inactive_since: Option<I>,
    prev_magnitude: f32,
}

impl<'t, I: TimeInstant, A: Accelerometer, P: PowerControl, T: TimeSource<I>>
    MotionClassifier<'t, I, A, P, T>
{
    /// Creates a classifier with all flags clear and timers anchored at the
    /// current time.
    pub fn new(
        accel: A,
        power: P,
        time_source: &'t T,
        config: MotionConfig<I::Duration>,
        power_config: PowerConfig<I::Duration>,
    ) -> Self {
        let now = time_source.now();
        Self {
            accel,
            power,
            time_source,
            config,
            states: MotionStateSet::new(),
            magnitude: MagnitudeFilter::default(),
            supervisor: SleepSupervisor::new(now, power_config),
            tap_lockout_at: None,
            accel_lockout_at: None,
            inactive_since: None,
            prev_magnitude: 0.0,
        }
    }

    /// Runs one classification tick.
    ///
    /// Polls the menu first, then runs every detector against fresh sample
    /// batches. A tick with no buffered samples (sensor disabled or FIFO
    /// empty) changes nothing.
    pub fn poll<M: MenuInput>(&mut self, menu: &mut M) {
        menu.poll();

        let samples = self.accel.sample_count();
        if samples == 0 {
            return;
        }
        let now = self.time_source.now();

        // Detector order is load-bearing: shake gates taps, taps must read
        // the interrupt source before any flag write drains it, and the
        // power ladder runs on whatever the earlier detectors left behind.
        self.detect_shake(samples, now);
        if !self.states.get(MotionKind::Shaking) {
            self.detect_tapping();
            self.detect_inactivity(samples, now);
        }
        self.detect_sudden_acceleration(samples, now);
        self.detect_orientation(samples);
        self.monitor_sleep(samples, now);
        self.auto_dim(samples, now);
    }

    /// Writes a motion flag and drains pending sensor interrupts.
    ///
    /// Public because hosts occasionally need to inject a state (the menu's
    /// sleep entry does), but the classifier is the only writer during
    /// normal operation.
    pub fn set_state(&mut self, kind: MotionKind, active: bool) {
        self.states.set(kind, active);
        self.accel.clear_interrupts();
    }

    /// Reads a flag and, when set, clears it through [`set_state`].
    ///
    /// [`set_state`]: MotionClassifier::set_state
    pub fn take(&mut self, kind: MotionKind) -> bool {
        let active = self.states.get(kind);
        if active {
            self.set_state(kind, false);
        }
        active
    }

    /// Clears every flag without touching the sensor.
    pub fn reset_states(&mut self) {
        self.states.clear_all();
    }

    /// Dims the display, shows the standby image, and enters deep sleep.
    ///
    /// Runs on demand (a menu request, say) as well as from the inactivity
    /// ladder.
    pub fn force_deep_sleep(&mut self) {
        log::info!("entering deep sleep");
        self.power.set_brightness(Brightness::Dim);
        self.power.show_standby_image();
        self.power.enter_deep_sleep();
    }

    /// Snapshot of all flags.
    pub fn states(&self) -> MotionStateSet {
        self.states
    }

    /// Device is being shaken.
    pub fn shaking(&self) -> bool {
        self.states.get(MotionKind::Shaking)
    }

    /// Device was single-tapped.
    pub fn tapped(&self) -> bool {
        self.states.get(MotionKind::Tapped)
    }

    /// Device was double-tapped.
    pub fn double_tapped(&self) -> bool {
        self.states.get(MotionKind::DoubleTapped)
    }

    /// Device is upside down.
    pub fn upside_down(&self) -> bool {
        self.states.get(MotionKind::UpsideDown)
    }

    /// Device is fully tilted left.
    pub fn tilted_left(&self) -> bool {
        self.states.get(MotionKind::TiltedLeft)
    }

    /// Device is fully tilted right.
    pub fn tilted_right(&self) -> bool {
        self.states.get(MotionKind::TiltedRight)
    }

    /// Device is half tilted left.
    pub fn half_tilted_left(&self) -> bool {
        self.states.get(MotionKind::HalfTiltedLeft)
    }

    /// Device is half tilted right.
    pub fn half_tilted_right(&self) -> bool {
        self.states.get(MotionKind::HalfTiltedRight)
    }

    /// A sudden acceleration spike was detected.
    pub fn sudden_acceleration(&self) -> bool {
        self.states.get(MotionKind::SuddenAcceleration)
    }

    /// Display has dimmed into the sleep state.
    pub fn sleeping(&self) -> bool {
        self.states.get(MotionKind::Sleep)
    }

    /// Sustained stillness has made deep sleep pending.
    pub fn deep_sleep_pending(&self) -> bool {
        self.states.get(MotionKind::DeepSleep)
    }

    /// Any interaction flag is set (shake, taps, sudden acceleration).
    pub fn interacted(&self) -> bool {
        self.states.any_of(&[
            MotionKind::Shaking,
            MotionKind::Tapped,
            MotionKind::DoubleTapped,
            MotionKind::SuddenAcceleration,
        ])
    }

    /// Any orientation flag is set (tilts, half tilts, upside down).
    pub fn oriented(&self) -> bool {
        self.states.any_of(&[
            MotionKind::TiltedLeft,
            MotionKind::TiltedRight,
            MotionKind::HalfTiltedLeft,
            MotionKind::HalfTiltedRight,
            MotionKind::UpsideDown,
        ])
    }

    /// Draws `samples` readings and returns their average smoothed
    /// magnitude.
    fn average_magnitude(&mut self, samples: u8) -> f32 {
        let mut total = 0.0;
        for _ in 0..samples {
            let sample = self.accel.read_sample();
            total += self.magnitude.update(sample);
        }
        total / samples as f32
    }

    fn detect_shake(&mut self, samples: u8, now: I) {
        if self.states.get(MotionKind::Tapped) || self.states.get(MotionKind::DoubleTapped) {
            self.tap_lockout_at = Some(now);
            return;
        }
        if let Some(at) = self.tap_lockout_at
            && now.duration_since(at).as_millis() < self.config.tap_lockout.as_millis()
        {
            return;
        }

        let avg = self.average_magnitude(samples);
        if avg >= self.config.shake_threshold {
            self.set_state(MotionKind::Shaking, true);
        }
    }

    fn detect_tapping(&mut self) {
        let source = self.accel.read_interrupt_source();
        if !source.any_tap() {
            return;
        }
        let axes = self.accel.read_tap_axes();

        // Z-axis hits are presses on the case face, not side taps.
        if axes.z() && (source.double_tap() || source.single_tap()) {
            return;
        }

        if axes.y() && source.double_tap() {
            self.set_state(MotionKind::DoubleTapped, true);
            return;
        }

        if axes.x() {
            if source.double_tap() {
                self.set_state(MotionKind::DoubleTapped, true);
                return;
            }
            if source.single_tap() {
                self.set_state(MotionKind::Tapped, true);
                return;
            }
        }

        // Fallback for taps without a usable axis attribution.
        if source.double_tap() {
            self.set_state(MotionKind::DoubleTapped, true);
            return;
        }
        if source.single_tap() {
            self.set_state(MotionKind::Tapped, true);
        }
    }

    /// Returns true when stillness has lasted long enough for deep sleep.
    fn detect_inactivity(&mut self, samples: u8, now: I) -> bool {
        if samples == 0 {
            return false;
        }

        let avg = self.average_magnitude(samples);
        if avg < self.config.inactivity_threshold {
            match self.inactive_since {
                None => self.inactive_since = Some(now),
                Some(since) => {
                    if now.duration_since(since).as_millis()
                        >= self.config.inactivity_timeout.as_millis()
                    {
                        self.set_state(MotionKind::DeepSleep, true);
                        return true;
                    }
                }
            }
        } else {
            self.inactive_since = None;
            self.set_state(MotionKind::DeepSleep, false);
        }
        false
    }

    fn detect_sudden_acceleration(&mut self, samples: u8, now: I) {
        // A lone reading cannot tell a spike from noise.
        if samples < 2 {
            return;
        }

        if self.states.any_of(&[
            MotionKind::DoubleTapped,
            MotionKind::Tapped,
            MotionKind::Shaking,
        ]) {
            self.accel_lockout_at = Some(now);
            return;
        }
        if let Some(at) = self.accel_lockout_at
            && now.duration_since(at).as_millis() < self.config.accel_lockout.as_millis()
        {
            return;
        }

        let sample = self.accel.read_sample();
        let current = self.magnitude.update(sample);
        let change = libm::fabsf(current - self.prev_magnitude);
        self.prev_magnitude = current;

        if current >= self.config.accel_threshold && change >= self.config.accel_delta_threshold {
            log::info!("sudden acceleration: magnitude {current} change {change}");
            self.set_state(MotionKind::SuddenAcceleration, true);
        } else {
            self.set_state(MotionKind::SuddenAcceleration, false);
        }
    }

    fn detect_orientation(&mut self, samples: u8) {
        if samples == 0 {
            return;
        }

        let mut avg = AccelSample::default();
        for _ in 0..samples {
            let sample = self.accel.read_sample();
            avg.x += sample.x;
            avg.y += sample.y;
            avg.z += sample.z;
        }
        let count = samples as f32;
        avg.x /= count;
        avg.y /= count;
        avg.z /= count;

        self.set_state(MotionKind::UpsideDown, false);
        self.set_state(MotionKind::TiltedLeft, false);
        self.set_state(MotionKind::TiltedRight, false);
        self.set_state(MotionKind::HalfTiltedLeft, false);
        self.set_state(MotionKind::HalfTiltedRight, false);

        let tilt = self.config.tilt_threshold;
        let half_tilt = self.config.half_tilt_threshold;

        if avg.z <= self.config.flip_threshold {
            self.set_state(MotionKind::UpsideDown, true);
        } else if avg.y >= tilt {
            self.set_state(MotionKind::TiltedRight, true);
        } else if avg.y <= -tilt {
            self.set_state(MotionKind::TiltedLeft, true);
        } else if avg.y >= half_tilt && avg.y < tilt {
            self.set_state(MotionKind::HalfTiltedRight, true);
        } else if avg.y <= -half_tilt && avg.y > -tilt {
            self.set_state(MotionKind::HalfTiltedLeft, true);
        }
    }

    fn monitor_sleep(&mut self, samples: u8, now: I) {
        let eligible = self.detect_inactivity(samples, now);
        if self.supervisor.evaluate_deep_sleep(eligible, now) {
            self.force_deep_sleep();
        }
    }

    fn auto_dim(&mut self, samples: u8, now: I) {
        if samples == 0 {
            return;
        }

        let avg = self.average_magnitude(samples);
        let active = avg > self.config.inactivity_threshold;
        let sleeping = self.states.get(MotionKind::Sleep);

        match self.supervisor.evaluate_dim(active, sleeping, now) {
            DimAction::Wake => {
                self.power.set_brightness(Brightness::Full);
                self.set_state(MotionKind::Sleep, false);
            }
            DimAction::Dim => {
                self.power.set_brightness(Brightness::Low);
                self.set_state(MotionKind::Sleep, true);
            }
            DimAction::None => {}
        }
    }
}
