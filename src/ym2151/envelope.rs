//! YM2151 Envelope Generator
//!
//! Every operator owns a five-state attenuation machine:
//! Attack → Decay1 → Decay2 (sustain) → Off, with Release reachable from any
//! keyed state. Attenuation is 10 bits, 0 being the loudest.
//!
//! The chip advances all 32 envelopes together on a global counter (`eg_cnt`).
//! Each rate register selects, through [`EG_RATE_SHIFT`] and
//! [`EG_RATE_SELECT`], how often a step happens and which 8-step increment
//! pattern of [`EG_INC`] it uses.

use std::fmt;

use super::tables::{shared_tables, MAX_ATT_INDEX, MIN_ATT_INDEX};

/// Steps in one increment pattern
pub const RATE_STEPS: usize = 8;

/// Increment patterns, eight cycles each
#[rustfmt::skip]
pub const EG_INC: [u8; 19 * RATE_STEPS] = [
    // cycle: 0 1  2 3  4 5  6 7
    0,1, 0,1, 0,1, 0,1,           //  0: rates 00..11, shape 0 (0 or 1)
    0,1, 0,1, 1,1, 0,1,           //  1: rates 00..11, shape 1
    0,1, 1,1, 0,1, 1,1,           //  2: rates 00..11, shape 2
    0,1, 1,1, 1,1, 1,1,           //  3: rates 00..11, shape 3

    1,1, 1,1, 1,1, 1,1,           //  4: rate 12, shape 0 (by 1)
    1,1, 1,2, 1,1, 1,2,           //  5: rate 12, shape 1
    1,2, 1,2, 1,2, 1,2,           //  6: rate 12, shape 2
    1,2, 2,2, 1,2, 2,2,           //  7: rate 12, shape 3

    2,2, 2,2, 2,2, 2,2,           //  8: rate 13, shape 0 (by 2)
    2,2, 2,4, 2,2, 2,4,           //  9: rate 13, shape 1
    2,4, 2,4, 2,4, 2,4,           // 10: rate 13, shape 2
    2,4, 4,4, 2,4, 4,4,           // 11: rate 13, shape 3

    4,4, 4,4, 4,4, 4,4,           // 12: rate 14, shape 0 (by 4)
    4,4, 4,8, 4,4, 4,8,           // 13: rate 14, shape 1
    4,8, 4,8, 4,8, 4,8,           // 14: rate 14, shape 2
    4,8, 8,8, 4,8, 8,8,           // 15: rate 14, shape 3

    8,8, 8,8, 8,8, 8,8,           // 16: rate 15, all shapes (by 8)
    16,16,16,16,16,16,16,16,      // 17: instant attack
    0,0, 0,0, 0,0, 0,0,           // 18: infinite time
];

/// Row of [`EG_INC`] used when the attack rate saturates
const INSTANT_ATTACK_ROW: u8 = (17 * RATE_STEPS) as u8;
/// Row of [`EG_INC`] that never moves the envelope
const INFINITE_ROW: u8 = (18 * RATE_STEPS) as u8;

/// Number of rate indices: 32 infinite, 64 real (16 rates x 4 shapes), 32 key-scaled overflow
pub const RATE_INDICES: usize = 32 + 64 + 32;

/// Rate index at or above which attack happens instantly
const ATTACK_SATURATION: u32 = 32 + 62;

/// Offset into [`EG_INC`] for each rate index
pub const EG_RATE_SELECT: [u8; RATE_INDICES] = build_rate_select();

/// Counter shift for each rate index; a step happens every `1 << shift` ticks
pub const EG_RATE_SHIFT: [u8; RATE_INDICES] = build_rate_shift();

const fn build_rate_select() -> [u8; RATE_INDICES] {
    let mut table = [0u8; RATE_INDICES];
    let mut i = 0;
    while i < RATE_INDICES {
        table[i] = if i < 32 {
            INFINITE_ROW
        } else if i < 32 + 48 {
            // rates 00..11 cycle through the four shapes
            (((i - 32) % 4) * RATE_STEPS) as u8
        } else if i < 32 + 60 {
            // rates 12..14 use their own rows
            ((4 + (i - 32 - 48)) * RATE_STEPS) as u8
        } else {
            // rate 15 and the key-scaled overflow
            (16 * RATE_STEPS) as u8
        };
        i += 1;
    }
    table
}

const fn build_rate_shift() -> [u8; RATE_INDICES] {
    let mut table = [0u8; RATE_INDICES];
    let mut i = 32;
    while i < 32 + 48 {
        // rate 0 shifts by 11, rate 11 by 0
        table[i] = (11 - (i - 32) / 4) as u8;
        i += 1;
    }
    table
}

/// Envelope state, ordered so that keyed states compare above Release
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum EnvelopeState {
    /// Silent until the next key-on
    #[default]
    Off = 0,
    /// Key released, heading to silence at RR
    Release = 1,
    /// Sustain phase, heading to silence at D2R
    Decay2 = 2,
    /// First decay, heading to D1L at D1R
    Decay1 = 3,
    /// Exponential approach to full volume at AR
    Attack = 4,
}

impl fmt::Display for EnvelopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeState::Off => write!(f, "Off"),
            EnvelopeState::Release => write!(f, "Release"),
            EnvelopeState::Decay2 => write!(f, "Decay2 (Sustain)"),
            EnvelopeState::Decay1 => write!(f, "Decay1"),
            EnvelopeState::Attack => write!(f, "Attack"),
        }
    }
}

/// Cached shift/select pair for one rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateSelect {
    shift: u8,
    select: u8,
}

impl RateSelect {
    const INSTANT: Self = Self {
        shift: 0,
        select: INSTANT_ATTACK_ROW,
    };

    fn lookup(index: u32) -> Self {
        let index = index as usize;
        Self {
            shift: EG_RATE_SHIFT[index],
            select: EG_RATE_SELECT[index],
        }
    }

    /// Increment for the current counter position, regardless of the shift mask
    #[inline]
    fn increment_at(self, eg_cnt: u32) -> i32 {
        let cycle = ((eg_cnt >> self.shift) & 7) as usize;
        i32::from(EG_INC[self.select as usize + cycle])
    }

    /// Increment if this rate steps on the current counter value
    #[inline]
    fn step(self, eg_cnt: u32) -> Option<i32> {
        if eg_cnt & ((1u32 << self.shift) - 1) != 0 {
            None
        } else {
            Some(self.increment_at(eg_cnt))
        }
    }
}

/// Per-operator envelope generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    state: EnvelopeState,
    volume: i32,
    /// Key-on sources: bit 0 register 0x08, bit 1 CSM
    key: u32,

    // Register-derived rates, already in rate-index units
    key_scale_shift: u32,
    ar: u32,
    d1r: u32,
    d2r: u32,
    rr: u32,
    d1l: u32,

    // Caches, refreshed whenever a rate, KS or the key code changes
    attack: RateSelect,
    decay1: RateSelect,
    decay2: RateSelect,
    release: RateSelect,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            state: EnvelopeState::Off,
            volume: MAX_ATT_INDEX,
            key: 0,
            key_scale_shift: 0,
            ar: 0,
            d1r: 0,
            d2r: 0,
            rr: 0,
            d1l: 0,
            attack: RateSelect::default(),
            decay1: RateSelect::default(),
            decay2: RateSelect::default(),
            release: RateSelect::default(),
        }
    }
}

/// Convert a 5-bit rate register to a rate index (0 stays infinite)
#[inline]
fn rate_index(rate: u8) -> u32 {
    let rate = u32::from(rate & 0x1f);
    if rate != 0 {
        32 + (rate << 1)
    } else {
        0
    }
}

impl Envelope {
    /// Create a silent envelope
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    #[inline]
    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    /// Current attenuation (0 = loudest, 1023 = silent)
    #[inline]
    pub fn volume(&self) -> u32 {
        self.volume as u32
    }

    /// Whether any key-on source holds this operator
    #[inline]
    pub fn is_keyed(&self) -> bool {
        self.key != 0
    }

    /// Recompute all four rate caches for a channel key code
    pub fn refresh_rates(&mut self, key_code: u32) {
        let scaled = key_code >> self.key_scale_shift;

        self.attack = if self.ar + scaled < ATTACK_SATURATION {
            RateSelect::lookup(self.ar + scaled)
        } else {
            RateSelect::INSTANT
        };
        self.decay1 = RateSelect::lookup(self.d1r + scaled);
        self.decay2 = RateSelect::lookup(self.d2r + scaled);
        self.release = RateSelect::lookup(self.rr + scaled);
    }

    /// Register 0x80: KS (bits 6-7) and AR (bits 0-4)
    pub fn set_ks_ar(&mut self, value: u8, key_code: u32) {
        self.key_scale_shift = 5 - u32::from(value >> 6);
        self.ar = rate_index(value);
        self.refresh_rates(key_code);
    }

    /// Register 0xA0: D1R (bits 0-4)
    pub fn set_d1r(&mut self, value: u8, key_code: u32) {
        self.d1r = rate_index(value);
        self.refresh_rates(key_code);
    }

    /// Register 0xC0: D2R (bits 0-4)
    pub fn set_d2r(&mut self, value: u8, key_code: u32) {
        self.d2r = rate_index(value);
        self.refresh_rates(key_code);
    }

    /// Register 0xE0: D1L (bits 4-7) and RR (bits 0-3)
    pub fn set_d1l_rr(&mut self, value: u8, key_code: u32) {
        self.d1l = shared_tables().d1l[usize::from(value >> 4)];
        self.rr = 34 + (u32::from(value & 0x0f) << 2);
        self.refresh_rates(key_code);
    }

    /// Apply a key-on from `source`
    ///
    /// Returns `true` when the operator was not held by any source and the
    /// envelope restarted; the caller then clears the operator's phase. The
    /// first attack step is applied immediately, as the chip does.
    pub fn key_on(&mut self, source: u32, eg_cnt: u32) -> bool {
        let restarted = self.key == 0;
        if restarted {
            self.state = EnvelopeState::Attack;
            self.apply_attack(self.attack.increment_at(eg_cnt));
        }
        self.key |= source;
        restarted
    }

    /// Release `source`; the envelope enters Release once no source holds it
    pub fn key_off(&mut self, source: u32) {
        if self.key != 0 {
            self.key &= !source;
            if self.key == 0 && self.state > EnvelopeState::Release {
                self.state = EnvelopeState::Release;
            }
        }
    }

    /// Advance one envelope tick
    #[inline]
    pub fn step(&mut self, eg_cnt: u32) {
        match self.state {
            EnvelopeState::Attack => {
                if let Some(inc) = self.attack.step(eg_cnt) {
                    self.apply_attack(inc);
                }
            }
            EnvelopeState::Decay1 => {
                if let Some(inc) = self.decay1.step(eg_cnt) {
                    self.volume += inc;
                    if self.volume as u32 >= self.d1l {
                        self.state = EnvelopeState::Decay2;
                    }
                }
            }
            EnvelopeState::Decay2 => {
                if let Some(inc) = self.decay2.step(eg_cnt) {
                    self.decay_to_silence(inc);
                }
            }
            EnvelopeState::Release => {
                if let Some(inc) = self.release.step(eg_cnt) {
                    self.decay_to_silence(inc);
                }
            }
            EnvelopeState::Off => {}
        }
    }

    #[inline]
    fn apply_attack(&mut self, inc: i32) {
        self.volume += (!self.volume * inc) >> 4;
        if self.volume <= MIN_ATT_INDEX {
            self.volume = MIN_ATT_INDEX;
            self.state = EnvelopeState::Decay1;
        }
    }

    #[inline]
    fn decay_to_silence(&mut self, inc: i32) {
        self.volume += inc;
        if self.volume >= MAX_ATT_INDEX {
            self.volume = MAX_ATT_INDEX;
            self.state = EnvelopeState::Off;
        }
    }
}
