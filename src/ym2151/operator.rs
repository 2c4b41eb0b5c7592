//! FM operator (slot)
//!
//! One sine oscillator with its own envelope, detune, multiplier and total
//! level. The chip has 32 of them, four per channel, stored M1, M2, C1, C2.

use super::envelope::{Envelope, EnvelopeState};
use super::tables::{
    shared_tables, ClockTables, CENTS_PER_OCTAVE, DT2_TAB, FREQ_MASK, FREQ_SH, SIN_MASK,
    TL_TAB_LEN,
};

/// Key-on source used by register 0x08
pub const KEY_SOURCE_REGISTER: u32 = 1;
/// Key-on source used by CSM mode
pub const KEY_SOURCE_CSM: u32 = 2;

/// Read-only view of one operator for debuggers and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorSnapshot {
    /// Envelope state
    pub state: EnvelopeState,
    /// Attenuation, 0 (loud) to 1023 (silent)
    pub volume: u32,
    /// Phase accumulator (16.16)
    pub phase: u32,
    /// Whether any key-on source holds the operator
    pub key_on: bool,
}

/// One of the 32 operators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    /// Phase accumulator, 10.16 into the sine table
    pub(crate) phase: u32,
    /// Phase increment without LFO modulation
    pub(crate) freq: u32,
    /// Current DT1 phase offset
    pub(crate) dt1: i32,
    /// Frequency multiplier x2 (0.5 is stored as 1)
    pub(crate) mul: u32,
    /// DT1 row offset into the detune table (DT1 * 32)
    pub(crate) dt1_row: u32,
    /// DT2 offset in cents
    pub(crate) dt2: u32,
    /// Channel key code (KC register, 7 bits)
    pub(crate) key_code: u32,
    /// Index into the frequency table: octave and note in cents plus key fraction
    pub(crate) key_index: u32,
    /// Total level, already scaled to envelope units
    pub(crate) tl: u32,
    /// All ones when amplitude modulation is enabled for this operator
    pub(crate) am_mask: u32,
    pub(crate) envelope: Envelope,
}

impl Default for Operator {
    fn default() -> Self {
        Self {
            phase: 0,
            freq: 0,
            dt1: 0,
            mul: 0,
            dt1_row: 0,
            dt2: 0,
            key_code: 0,
            key_index: CENTS_PER_OCTAVE as u32,
            tl: 0,
            am_mask: 0,
            envelope: Envelope::new(),
        }
    }
}

impl Operator {
    /// Create an operator in its power-on state
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot for inspection
    pub fn snapshot(&self) -> OperatorSnapshot {
        OperatorSnapshot {
            state: self.envelope.state(),
            volume: self.envelope.volume(),
            phase: self.phase,
            key_on: self.envelope.is_keyed(),
        }
    }

    /// Recompute the base phase increment from KC/KF, DT1, DT2 and MUL
    pub(crate) fn update_freq(&mut self, tables: &ClockTables) {
        self.freq = self.increment_at(self.key_index + self.dt2, tables);
    }

    /// Phase increment for an arbitrary frequency table index
    #[inline]
    pub(crate) fn increment_at(&self, index: u32, tables: &ClockTables) -> u32 {
        tables.freq[index as usize]
            .wrapping_add_signed(self.dt1)
            .wrapping_mul(self.mul)
            >> 1
    }

    #[inline]
    fn update_dt1(&mut self, tables: &ClockTables) {
        self.dt1 = tables.dt1[(self.dt1_row + (self.key_code >> 2)) as usize];
    }

    /// Register 0x40: DT1 (bits 4-6) and MUL (bits 0-3)
    pub fn set_dt1_mul(&mut self, value: u8, tables: &ClockTables) {
        self.dt1_row = u32::from(value & 0x70) << 1;
        let mul = u32::from(value & 0x0f);
        self.mul = if mul != 0 { mul << 1 } else { 1 };
        self.update_dt1(tables);
        self.update_freq(tables);
    }

    /// Register 0x60: TL (bits 0-6)
    pub fn set_total_level(&mut self, value: u8) {
        self.tl = u32::from(value & 0x7f) << 3;
    }

    /// Register 0x80: KS (bits 6-7) and AR (bits 0-4)
    pub fn set_ks_ar(&mut self, value: u8) {
        self.envelope.set_ks_ar(value, self.key_code);
    }

    /// Register 0xA0: AMS-EN (bit 7) and D1R (bits 0-4)
    pub fn set_am_d1r(&mut self, value: u8) {
        self.am_mask = if value & 0x80 != 0 { u32::MAX } else { 0 };
        self.envelope.set_d1r(value, self.key_code);
    }

    /// Register 0xC0: DT2 (bits 6-7) and D2R (bits 0-4)
    pub fn set_dt2_d2r(&mut self, value: u8, tables: &ClockTables) {
        let dt2 = DT2_TAB[usize::from(value >> 6)];
        if dt2 != self.dt2 {
            self.dt2 = dt2;
            self.update_freq(tables);
        }
        self.envelope.set_d2r(value, self.key_code);
    }

    /// Register 0xE0: D1L (bits 4-7) and RR (bits 0-3)
    pub fn set_d1l_rr(&mut self, value: u8) {
        self.envelope.set_d1l_rr(value, self.key_code);
    }

    /// New channel key code (register 0x28); the caller only calls this on change
    pub(crate) fn set_key_code(&mut self, key_code: u32, tables: &ClockTables) {
        // 12 notes per octave out of 16 codes
        let note = (key_code - (key_code >> 2)) * 64 + CENTS_PER_OCTAVE as u32;
        self.key_index = note | (self.key_index & 63);
        self.key_code = key_code;
        self.update_dt1(tables);
        self.update_freq(tables);
        self.envelope.refresh_rates(key_code);
    }

    /// New channel key fraction (register 0x30, already shifted to 6 bits)
    pub(crate) fn set_key_fraction(&mut self, fraction: u32, tables: &ClockTables) {
        self.key_index = fraction | (self.key_index & !63);
        self.update_freq(tables);
    }

    /// Key-on from `source`; restarting the envelope also clears the phase
    #[inline]
    pub(crate) fn key_on(&mut self, source: u32, eg_cnt: u32) {
        if self.envelope.key_on(source, eg_cnt) {
            self.phase = 0;
        }
    }

    #[inline]
    pub(crate) fn key_off(&mut self, source: u32) {
        self.envelope.key_off(source);
    }

    /// Attenuation fed to the sine lookup, including tremolo
    #[inline]
    pub(crate) fn attenuation(&self, am: u32) -> u32 {
        self.tl + self.envelope.volume() + (am & self.am_mask)
    }

    /// Operator output for a modulation input taken from another operator
    #[inline]
    pub(crate) fn output(&self, env: u32, pm: i32) -> i32 {
        let index = (self.phase & !FREQ_MASK).wrapping_add((pm << 15) as u32);
        lookup(env, index)
    }

    /// Operator output for the M1 self-feedback path
    #[inline]
    pub(crate) fn output_feedback(&self, env: u32, pm: i32) -> i32 {
        let index = (self.phase & !FREQ_MASK).wrapping_add(pm as u32);
        lookup(env, index)
    }
}

#[inline]
fn lookup(env: u32, phase: u32) -> i32 {
    let tables = shared_tables();
    let p = (env << 3) as usize + tables.sin[((phase >> FREQ_SH) & SIN_MASK) as usize] as usize;
    if p >= TL_TAB_LEN {
        0
    } else {
        tables.tl[p]
    }
}
