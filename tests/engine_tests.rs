//! Integration tests for the full engine loop

mod common;
use common::*;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use emote_sequencer::{
    Brightness, CrashState, Emote, Engine, EngineConfig, InterruptSource, MotionKind,
    RESTING_EMOTES, SystemMode, TapAxes, TickStatus, TimeSource,
};

type TestEngine<'t> = Engine<
    't,
    TestInstant,
    MockAccel,
    MockPower,
    MockPlayer,
    MockMenu,
    MockMode,
    MockPairing,
    MockTimeSource,
>;

/// Shared handles into every mock the engine owns
struct Handles {
    regs: Rc<RefCell<AccelState>>,
    power: Rc<RefCell<PowerLog>>,
    player: Rc<RefCell<PlayerState>>,
    menu: Rc<RefCell<MenuState>>,
    mode: Rc<Cell<SystemMode>>,
    link: Rc<RefCell<PairingState>>,
}

fn build_engine(
    clock: &MockTimeSource,
    frames: u32,
    config: EngineConfig<TestDuration>,
) -> (TestEngine<'_>, Handles) {
    let accel = MockAccel::new();
    let power = MockPower::new();
    let player = if frames == 0 {
        MockPlayer::new()
    } else {
        MockPlayer::with_clip_length(frames)
    };
    let menu = MockMenu::new();
    let mode = MockMode::new();
    let pairing = MockPairing::new();
    let handles = Handles {
        regs: accel.handle(),
        power: power.handle(),
        player: player.handle(),
        menu: menu.handle(),
        mode: mode.handle(),
        link: pairing.handle(),
    };
    let engine = Engine::with_config(accel, power, player, menu, mode, pairing, clock, 7, config);
    (engine, handles)
}

/// Engine with default timing and a fixed clip length (0 = endless clips)
fn engine_with_clip_length(
    clock: &MockTimeSource,
    frames: u32,
) -> (TestEngine<'_>, Handles) {
    build_engine(clock, frames, EngineConfig::default())
}

/// Service on schedule until the running clip finishes
fn run_clip(clock: &MockTimeSource, engine: &mut TestEngine<'_>) {
    let mut guard = 0;
    while let TickStatus::Animating(next_service) = engine.service() {
        clock.advance(next_service);
        guard += 1;
        assert!(guard < 400, "clip never finished");
    }
}

#[test]
fn boot_clip_runs_then_the_wink_follows() {
    let clock = MockTimeSource::new();
    let (mut engine, h) = engine_with_clip_length(&clock, 16);

    engine.play_boot_animation().unwrap();
    assert!(engine.is_animating());
    assert_eq!(engine.current_emote(), Some(Emote::Startup));

    run_clip(&clock, &mut engine);
    assert!(!engine.is_animating());
    assert_eq!(clock.now(), TestInstant(937_500));

    // The next tick opens the rest cycle
    let status = engine.service();
    assert_eq!(status, TickStatus::Animating(TestDuration(0)));
    assert_eq!(engine.current_emote(), Some(Emote::Wink));
    assert_eq!(
        h.player.borrow().loads.as_slice(),
        [Emote::Startup, Emote::Wink]
    );
}

#[test]
fn open_menu_blocks_selection_and_the_sensor() {
    let clock = MockTimeSource::new();
    let (mut engine, h) = engine_with_clip_length(&clock, 16);

    h.menu.borrow_mut().active = true;
    assert_eq!(engine.service(), TickStatus::Idle);
    assert!(h.player.borrow().loads.is_empty());
    // Only the loop-top menu poll ran; the motion poll was skipped
    assert_eq!(h.menu.borrow().poll_count, 1);

    h.menu.borrow_mut().active = false;
    assert!(matches!(engine.service(), TickStatus::Animating(_)));
    assert_eq!(engine.current_emote(), Some(Emote::Wink));
}

#[test]
fn update_mode_polls_without_animating() {
    let clock = MockTimeSource::new();
    let (mut engine, h) = engine_with_clip_length(&clock, 16);

    h.mode.set(SystemMode::Update);
    h.regs.borrow_mut().fifo_count = 4;

    assert_eq!(engine.service(), TickStatus::Idle);
    assert!(h.player.borrow().loads.is_empty());
    // Menu polled at the loop top and again inside the motion poll
    assert_eq!(h.menu.borrow().poll_count, 2);
}

#[test]
fn update_mode_aborts_a_running_clip() {
    let clock = MockTimeSource::new();
    let (mut engine, h) = engine_with_clip_length(&clock, 0);

    engine.service();
    engine.service();
    assert!(engine.is_animating());

    h.mode.set(SystemMode::Update);
    clock.advance_ms(10);
    assert_eq!(engine.service(), TickStatus::Idle);
    assert!(!engine.is_animating());
    assert_eq!(h.player.borrow().release_count, 1);
    assert!(!h.player.borrow().loaded);
}

#[test]
fn mode_change_clears_motion_flags() {
    let clock = MockTimeSource::new();
    let (mut engine, h) = engine_with_clip_length(&clock, 16);

    engine.motion_mut().set_state(MotionKind::Shaking, true);
    h.mode.set(SystemMode::Update);

    assert_eq!(engine.service(), TickStatus::Idle);
    assert!(!engine.motion().shaking());
}

#[test]
fn tap_mid_clip_aborts_then_plays_the_tap() {
    let clock = MockTimeSource::new();
    let (mut engine, h) = engine_with_clip_length(&clock, 0);

    engine.service();
    engine.service();
    assert_eq!(engine.current_emote(), Some(Emote::Wink));

    {
        let mut regs = h.regs.borrow_mut();
        regs.fifo_count = 4;
        regs.interrupts = InterruptSource::SINGLE_TAP;
        regs.tap_axes = TapAxes::X;
    }
    clock.advance_ms(10);
    assert_eq!(engine.service(), TickStatus::Idle);
    assert!(!engine.is_animating());
    assert!(engine.motion().tapped());

    // The surviving flag is answered on the very next selection
    assert!(matches!(engine.service(), TickStatus::Animating(_)));
    assert_eq!(engine.current_emote(), Some(Emote::Tap));
    assert_eq!(h.player.borrow().loads.as_slice(), [Emote::Wink, Emote::Tap]);
}

#[test]
fn link_toggle_mid_clip_is_answered_next() {
    let clock = MockTimeSource::new();
    let (mut engine, h) = engine_with_clip_length(&clock, 0);

    engine.service();
    engine.service();

    h.link.borrow_mut().toggle_pending = true;
    clock.advance_ms(10);
    assert_eq!(engine.service(), TickStatus::Idle);
    assert_eq!(h.link.borrow().ack_count, 0);

    assert!(matches!(engine.service(), TickStatus::Animating(_)));
    assert_eq!(engine.current_emote(), Some(Emote::ComsConnect));
    assert_eq!(h.link.borrow().ack_count, 1);
}

#[test]
fn deep_sleep_flag_stops_the_player() {
    let clock = MockTimeSource::new();
    let (mut engine, h) = engine_with_clip_length(&clock, 16);

    engine.motion_mut().set_state(MotionKind::DeepSleep, true);

    assert_eq!(engine.service(), TickStatus::Idle);
    assert_eq!(h.player.borrow().release_count, 1);
    assert!(h.player.borrow().loads.is_empty());
    assert!(!engine.motion().deep_sleep_pending());
}

#[test]
fn failed_load_reports_idle_and_recovers() {
    let clock = MockTimeSource::new();
    let (mut engine, h) = engine_with_clip_length(&clock, 16);

    h.player.borrow_mut().fail_next_load = true;
    assert_eq!(engine.service(), TickStatus::Idle);
    assert!(!engine.is_animating());
    assert!(h.player.borrow().loads.is_empty());

    // Once the cycle delay passes the next pick loads normally
    clock.advance_ms(3_000);
    assert!(matches!(engine.service(), TickStatus::Animating(_)));
    let loaded = engine.current_emote().unwrap();
    assert!(RESTING_EMOTES.contains(&loaded));
}

#[test]
fn crash_arc_runs_through_the_engine() {
    let clock = MockTimeSource::new();
    let (mut engine, h) = engine_with_clip_length(&clock, 16);

    engine.motion_mut().set_state(MotionKind::TiltedRight, true);

    engine.service();
    assert_eq!(engine.current_emote(), Some(Emote::Crash01));
    run_clip(&clock, &mut engine);
    assert_eq!(engine.sequencer().crash_state(), CrashState::Crashed);

    // Still on its side after the entry clip
    engine.service();
    assert_eq!(engine.current_emote(), Some(Emote::Crash02));
    run_clip(&clock, &mut engine);
    assert_eq!(engine.sequencer().crash_state(), CrashState::Crashed);

    // Picked back upright
    engine.motion_mut().set_state(MotionKind::TiltedRight, false);
    engine.service();
    assert_eq!(engine.current_emote(), Some(Emote::Crash03));
    run_clip(&clock, &mut engine);
    assert_eq!(engine.sequencer().crash_state(), CrashState::None);

    engine.service();
    assert_eq!(engine.current_emote(), Some(Emote::Wink));
    assert_eq!(
        h.player.borrow().loads.as_slice(),
        [Emote::Crash01, Emote::Crash02, Emote::Crash03, Emote::Wink]
    );
}

#[test]
fn quiet_device_dims_then_powers_down() {
    let mut config = EngineConfig::default();
    config.motion.inactivity_timeout = ms(500);
    config.power.display_timeout = ms(200);
    config.power.idle_timeout = ms(300);
    config.power.deep_sleep_grace = ms(100);

    let clock = MockTimeSource::new();
    let (mut engine, h) = build_engine(&clock, 16, config);
    // A quiet sample batch on every poll keeps the ladder fed
    h.regs.borrow_mut().fifo_count = 4;

    engine.service();
    assert_eq!(engine.current_emote(), Some(Emote::Wink));
    run_clip(&clock, &mut engine);

    // Mid-clip the ladder dimmed the display, then powered down
    {
        let power = h.power.borrow();
        assert!(power.brightness.contains(&Brightness::Low));
        assert_eq!(power.last_brightness(), Some(Brightness::Dim));
        assert!(power.standby_count >= 1);
        assert!(power.deep_sleep_count >= 1);
    }

    // The pending flag stops the player on the next selection
    assert_eq!(engine.service(), TickStatus::Idle);
    assert!(!engine.motion().deep_sleep_pending());
    assert_eq!(h.player.borrow().release_count, 2);
}
