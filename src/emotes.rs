//! Emote asset catalog, random selection pool, and PRNG.
//!
//! Assets are 128x128 GIFs at 16 FPS stored on the device filesystem. The
//! catalog names every animation the engine or the pairing layer can
//! request; the pool provides repeat-free random selection for the idle
//! cycle.

use heapless::Vec;

/// Every GIF emote the device can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Emote {
    /// Boot splash animation.
    Startup,
    /// Single slow wink, opens the rest cycle.
    Wink,
    /// Idle blink loop between cycles.
    Blink,
    /// Settled resting pose.
    Rest,
    /// Neutral idle.
    Idle,
    /// Glance downward.
    LookDown,
    /// Glance upward.
    LookUp,
    /// Glance side to side.
    LookLeftRight,
    /// Spaced-out stare.
    Zoned,
    /// Skeptical look.
    Doubtful,
    /// Chattering.
    Talk,
    /// Scanning back and forth.
    Scan,
    /// Angry outburst.
    Angry,
    /// Crying.
    Cry,
    /// Glitched pixelation.
    Pixelated,
    /// Gleeful grin.
    Glee,
    /// Bouncing excitement.
    Excited,
    /// Heart eyes.
    Hearts,
    /// Bashful uwu face.
    Uwu,
    /// Casual whistling.
    Whistle,
    /// Scheming look.
    Mischief,
    /// Thumbs up.
    ThumbsUp,
    /// Quick double wink.
    Wink02,
    /// Dizzy spiral after shaking.
    Dizzy,
    /// Wide-eyed shock.
    Shock,
    /// Reaction to a single tap.
    Tap,
    /// Startled jump.
    Startled,
    /// Crash impact.
    Crash01,
    /// Crashed loop while left on its side.
    Crash02,
    /// Crash recovery.
    Crash03,
    /// Falling asleep.
    Sleep01,
    /// Sleeping loop.
    Sleep02,
    /// Waking up.
    Sleep03,
    /// Link established / searching for a peer.
    ComsConnect,
    /// Link lost or switched off.
    ComsDisconnect,
    /// Waiting on the paired peer.
    ComsIdle,
    /// Conversation: agreement.
    ComsAgreed,
    /// Conversation: disagreement.
    ComsDisagree,
    /// Conversation: greeting.
    ComsHello,
    /// Conversation: laughter.
    ComsLaugh,
    /// Conversation: shock.
    ComsShock,
    /// Conversation: chatter, first variant.
    ComsTalk01,
    /// Conversation: chatter, second variant.
    ComsTalk02,
    /// Conversation: chatter, third variant.
    ComsTalk03,
    /// Conversation: wink.
    ComsWink,
    /// Conversation: yelling.
    ComsYell,
    /// Conversation: zoned out.
    ComsZoned,
}

impl Emote {
    /// Filesystem path of the GIF asset.
    pub const fn path(self) -> &'static str {
        match self {
            Emote::Startup => "/gifs/startup.gif",
            Emote::Wink => "/gifs/wink.gif",
            Emote::Blink => "/gifs/blink.gif",
            Emote::Rest => "/gifs/rest.gif",
            Emote::Idle => "/gifs/idle.gif",
            Emote::LookDown => "/gifs/look_down.gif",
            Emote::LookUp => "/gifs/look_up.gif",
            Emote::LookLeftRight => "/gifs/look_left_right.gif",
            Emote::Zoned => "/gifs/zoned.gif",
            Emote::Doubtful => "/gifs/doubtful.gif",
            Emote::Talk => "/gifs/talk.gif",
            Emote::Scan => "/gifs/scan.gif",
            Emote::Angry => "/gifs/angry.gif",
            Emote::Cry => "/gifs/cry.gif",
            Emote::Pixelated => "/gifs/pixelated.gif",
            Emote::Glee => "/gifs/glee.gif",
            Emote::Excited => "/gifs/excited.gif",
            Emote::Hearts => "/gifs/hearts.gif",
            Emote::Uwu => "/gifs/uwu.gif",
            Emote::Whistle => "/gifs/whistle.gif",
            Emote::Mischief => "/gifs/mischief.gif",
            Emote::ThumbsUp => "/gifs/humsup.gif",
            Emote::Wink02 => "/gifs/wink_02.gif",
            Emote::Dizzy => "/gifs/dizzy.gif",
            Emote::Shock => "/gifs/shock.gif",
            Emote::Tap => "/gifs/tap.gif",
            Emote::Startled => "/gifs/startled.gif",
            Emote::Crash01 => "/gifs/crash_01.gif",
            Emote::Crash02 => "/gifs/crash_02.gif",
            Emote::Crash03 => "/gifs/crash_03.gif",
            Emote::Sleep01 => "/gifs/sleep_01.gif",
            Emote::Sleep02 => "/gifs/sleep_02.gif",
            Emote::Sleep03 => "/gifs/sleep_03.gif",
            Emote::ComsConnect => "/gifs/coms_connect.gif",
            Emote::ComsDisconnect => "/gifs/coms_disconnect.gif",
            Emote::ComsIdle => "/gifs/coms_idle.gif",
            Emote::ComsAgreed => "/gifs/coms_agreed.gif",
            Emote::ComsDisagree => "/gifs/coms_disagree.gif",
            Emote::ComsHello => "/gifs/coms_hello.gif",
            Emote::ComsLaugh => "/gifs/coms_laugh.gif",
            Emote::ComsShock => "/gifs/coms_shock.gif",
            Emote::ComsTalk01 => "/gifs/coms_talk_01.gif",
            Emote::ComsTalk02 => "/gifs/coms_talk_02.gif",
            Emote::ComsTalk03 => "/gifs/coms_talk_03.gif",
            Emote::ComsWink => "/gifs/coms_wink.gif",
            Emote::ComsYell => "/gifs/coms_yell.gif",
            Emote::ComsZoned => "/gifs/coms_zoned.gif",
        }
    }

    /// Whether playback of this emote may continue while the device is
    /// tilted or upside down. Crash and shock animations are themselves
    /// orientation reactions, so the orientation abort exempts them.
    pub const fn is_orientation_driven(self) -> bool {
        matches!(self, Emote::Crash01 | Emote::Crash02 | Emote::Shock)
    }
}

/// Calm poses for the idle half of the rest cycle.
pub const RESTING_EMOTES: &[Emote] = &[
    Emote::Rest,
    Emote::Idle,
    Emote::LookDown,
    Emote::LookUp,
    Emote::LookLeftRight,
];

/// Expressive emotes for the active half of the rest cycle.
pub const ACTIVE_EMOTES: &[Emote] = &[
    Emote::Wink02,
    Emote::Zoned,
    Emote::Doubtful,
    Emote::Talk,
    Emote::Scan,
    Emote::Angry,
    Emote::Cry,
    Emote::Pixelated,
    Emote::Excited,
    Emote::Hearts,
    Emote::Uwu,
    Emote::Whistle,
    Emote::Glee,
    Emote::Mischief,
    Emote::ThumbsUp,
];

/// Xorshift pseudo-random generator for emote selection.
///
/// Small, deterministic under a fixed seed, and good enough to keep a
/// five-minute idle loop from looking scripted. Not a source of
/// cryptographic randomness.
#[derive(Debug, Clone)]
pub struct XorShift32 {
    state: u32,
}

impl XorShift32 {
    /// Creates a generator from a seed. A zero seed is remapped, since the
    /// xorshift state must never be zero.
    pub const fn new(seed: u32) -> Self {
        let state = if seed == 0 { 0x9E37_79B9 } else { seed };
        Self { state }
    }

    /// Returns the next raw 32-bit value.
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Returns a value in `0..bound`. `bound` must be non-zero.
    pub fn next_below(&mut self, bound: u32) -> u32 {
        self.next_u32() % bound
    }
}

/// Repeat-free random selection over an emote slice.
///
/// Keeps the indices not yet played in a fixed-capacity vector, refills it
/// when exhausted, and resets it whenever the backing slice length changes.
/// One pool instance may serve several collections in turn; switching
/// between collections of different sizes restarts the no-repeat window.
#[derive(Debug, Default)]
pub struct EmotePool<const N: usize> {
    unplayed: Vec<u8, N>,
    pool_len: usize,
}

impl<const N: usize> EmotePool<N> {
    /// Creates an empty pool.
    pub const fn new() -> Self {
        Self {
            unplayed: Vec::new(),
            pool_len: 0,
        }
    }

    /// Picks one emote from `emotes` without repeating until every entry
    /// has been played once.
    ///
    /// Returns `None` for an empty slice or one larger than the pool
    /// capacity `N`.
    pub fn pick(&mut self, emotes: &[Emote], rng: &mut XorShift32) -> Option<Emote> {
        if emotes.is_empty() || emotes.len() > N {
            return None;
        }

        if self.pool_len != emotes.len() {
            self.unplayed.clear();
            self.pool_len = emotes.len();
        }

        if self.unplayed.is_empty() {
            for index in 0..emotes.len() {
                let _ = self.unplayed.push(index as u8);
            }
        }

        let position = rng.next_below(self.unplayed.len() as u32) as usize;
        let selected = self.unplayed.swap_remove(position);
        Some(emotes[selected as usize])
    }

    /// Number of unplayed entries remaining in the current window.
    pub fn remaining(&self) -> usize {
        self.unplayed.len()
    }
}
