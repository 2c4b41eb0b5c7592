//! Low-frequency oscillator
//!
//! An 8-bit phase stepped by a programmable divider. Each step produces an
//! amplitude sample (`lfa`, 0..=254, added to operator attenuation) and a
//! signed phase sample (`lfp`, fed into pitch modulation), scaled by AMD and
//! PMD respectively.

use super::tables::LFO_SH;

/// Waveform used for LFO "noise": one period of the chip's noise output
#[rustfmt::skip]
const LFO_NOISE_WAVEFORM: [u8; 256] = [
    0xFF,0xEE,0xD3,0x80,0x58,0xDA,0x7F,0x94,0x9E,0xE3,0xFA,0x00,0x4D,0xFA,0xFF,0x6A,
    0x7A,0xDE,0x49,0xF6,0x00,0x33,0xBB,0x63,0x91,0x60,0x51,0xFF,0x00,0xD8,0x7F,0xDE,
    0xDC,0x73,0x21,0x85,0xB2,0x9C,0x5D,0x24,0xCD,0x91,0x9E,0x76,0x7F,0x20,0xFB,0xF3,
    0x00,0xA6,0x3E,0x42,0x27,0x69,0xAE,0x33,0x45,0x44,0x11,0x41,0x72,0x73,0xDF,0xA2,

    0x32,0xBD,0x7E,0xA8,0x13,0xEB,0xD3,0x15,0xDD,0xFB,0xC9,0x9D,0x61,0x2F,0xBE,0x9D,
    0x23,0x65,0x51,0x6A,0x84,0xF9,0xC9,0xD7,0x23,0xBF,0x65,0x19,0xDC,0x03,0xF3,0x24,
    0x33,0xB6,0x1E,0x57,0x5C,0xAC,0x25,0x89,0x4D,0xC5,0x9C,0x99,0x15,0x07,0xCF,0xBA,
    0xC5,0x9B,0x15,0x4D,0x8D,0x2A,0x1E,0x1F,0xEA,0x2B,0x2F,0x64,0xA9,0x50,0x3D,0xAB,

    0x50,0x77,0xE9,0xC0,0xAC,0x6D,0x3F,0xCA,0xCF,0x71,0x7D,0x80,0xA6,0xFD,0xFF,0xB5,
    0xBD,0x6F,0x24,0x7B,0x00,0x99,0x5D,0xB1,0x48,0xB0,0x28,0x7F,0x80,0xEC,0xBF,0x6F,
    0x6E,0x39,0x90,0x42,0xD9,0x4E,0x2E,0x12,0x66,0xC8,0xCF,0x3B,0x3F,0x10,0x7D,0x79,
    0x00,0xD3,0x1F,0x21,0x93,0x34,0xD7,0x19,0x22,0xA2,0x08,0x20,0xB9,0xB9,0xEF,0x51,

    0x99,0xDE,0xBF,0xD4,0x09,0x75,0xE9,0x8A,0xEE,0xFD,0xE4,0x4E,0x30,0x17,0xDF,0xCE,
    0x11,0xB2,0x28,0x35,0xC2,0x7C,0x64,0xEB,0x91,0x5F,0x32,0x0C,0x6E,0x00,0xF9,0x92,
    0x19,0xDB,0x8F,0xAB,0xAE,0xD6,0x12,0xC4,0x26,0x62,0xCE,0xCC,0x0A,0x03,0xE7,0xDD,
    0xE2,0x4D,0x8A,0xA6,0x46,0x95,0x0F,0x8F,0xF5,0x15,0x97,0x32,0xD4,0x28,0x1E,0x55,
];

/// LFO waveform select (register 0x1B bits 0-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LfoWaveform {
    /// Falling ramp for AM, rising ramp for PM
    #[default]
    Sawtooth,
    /// Full level for the first half of the period
    Square,
    /// Symmetric triangle
    Triangle,
    /// Captured pseudo-random waveform
    Noise,
}

impl From<u8> for LfoWaveform {
    fn from(value: u8) -> Self {
        match value & 3 {
            0 => LfoWaveform::Sawtooth,
            1 => LfoWaveform::Square,
            2 => LfoWaveform::Triangle,
            _ => LfoWaveform::Noise,
        }
    }
}

impl LfoWaveform {
    /// Raw (amplitude, phase) shapes for an 8-bit LFO phase
    #[inline]
    pub fn shape(self, phase: u8) -> (i32, i32) {
        let i = i32::from(phase);
        match self {
            LfoWaveform::Sawtooth => {
                let p = if i < 128 { i } else { i - 255 };
                (255 - i, p)
            }
            LfoWaveform::Square => {
                if i < 128 {
                    (255, 128)
                } else {
                    (0, -128)
                }
            }
            LfoWaveform::Triangle => {
                let a = if i < 128 { 255 - i * 2 } else { i * 2 - 256 };
                let p = if i < 64 {
                    i * 2
                } else if i < 128 {
                    255 - i * 2
                } else if i < 192 {
                    256 - i * 2
                } else {
                    i * 2 - 511
                };
                (a, p)
            }
            LfoWaveform::Noise => {
                let a = i32::from(LFO_NOISE_WAVEFORM[usize::from(phase)]);
                (a, a - 128)
            }
        }
    }
}

/// Low frequency oscillator shared by all channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lfo {
    phase: u8,
    timer: u32,
    timer_add: u32,
    overflow: u32,
    counter: u32,
    counter_add: u32,
    waveform: LfoWaveform,
    amd: i32,
    pmd: i32,
    /// Amplitude modulation output
    lfa: u32,
    /// Phase modulation output
    lfp: i32,
}

impl Lfo {
    /// LFO stepped by `timer_add` per sample
    pub fn new(timer_add: u32) -> Self {
        let mut lfo = Self {
            phase: 0,
            timer: 0,
            timer_add,
            overflow: 0,
            counter: 0,
            counter_add: 0,
            waveform: LfoWaveform::default(),
            amd: 0,
            pmd: 0,
            lfa: 0,
            lfp: 0,
        };
        lfo.set_frequency(0);
        lfo
    }

    /// Register 0x18: LFRQ. The high nibble picks the divider octave, the low
    /// nibble the fine step.
    pub fn set_frequency(&mut self, value: u8) {
        let octave = 15 - u32::from(value >> 4);
        self.overflow = (1u32 << (octave + 3)) * (1u32 << LFO_SH);
        self.counter_add = 0x10 + u32::from(value & 0x0f);
    }

    /// Register 0x19: PMD when bit 7 is set, AMD otherwise
    pub fn set_depth(&mut self, value: u8) {
        if value & 0x80 != 0 {
            self.pmd = i32::from(value & 0x7f);
        } else {
            self.amd = i32::from(value & 0x7f);
        }
    }

    /// Register 0x1B bits 0-1
    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.waveform = waveform;
    }

    /// Test register bit 1 resets the phase
    pub fn reset_phase(&mut self) {
        self.phase = 0;
    }

    /// Amplitude modulation output, in envelope units
    #[inline]
    pub fn am(&self) -> u32 {
        self.lfa
    }

    /// Signed phase modulation output
    #[inline]
    pub fn pm(&self) -> i32 {
        self.lfp
    }

    /// Current 8-bit phase
    #[inline]
    pub fn phase(&self) -> u8 {
        self.phase
    }

    /// Advance one sample. When `held` the phase stays at zero.
    #[inline]
    pub fn clock(&mut self, held: bool) {
        if held {
            self.phase = 0;
        } else {
            self.timer += self.timer_add;
            if self.timer >= self.overflow {
                self.timer -= self.overflow;
                self.counter += self.counter_add;
                self.phase = self.phase.wrapping_add((self.counter >> 4) as u8);
                self.counter &= 15;
            }
        }

        let (a, p) = self.waveform.shape(self.phase);
        self.lfa = (a * self.amd / 128) as u32;
        self.lfp = p * self.pmd / 128;
    }
}
