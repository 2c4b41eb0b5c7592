//! Noise generator
//!
//! A 17-bit LFSR shifted at a rate picked by register 0x0F. Its top bit
//! replaces the C2 sine of channel 7 when noise is enabled.

/// Bit of the LFSR that drives the noise output sign
const OUTPUT_BIT: u32 = 1 << 16;

/// Noise generator using a 17-bit LFSR
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NoiseGenerator {
    /// 17-bit LFSR state
    lfsr: u32,
    /// Fractional shift accumulator (16.16)
    phase: u32,
    /// Shifts per sample (16.16), from the noise period table
    step: u32,
    /// Last value written to register 0x0F
    register: u8,
}

impl NoiseGenerator {
    /// Create a new noise generator with the given step
    pub fn new(step: u32) -> Self {
        Self {
            step,
            ..Self::default()
        }
    }

    /// Register 0x0F: NE (bit 7) and NFRQ (bits 0-4)
    ///
    /// `step` is the noise table entry for `value & 0x1f`.
    #[inline]
    pub fn set_control(&mut self, value: u8, step: u32) {
        self.register = value;
        self.step = step;
    }

    /// Whether channel 7 C2 is replaced by noise
    #[inline]
    pub fn enabled(&self) -> bool {
        self.register & 0x80 != 0
    }

    /// Noise output sign: `true` for the positive half
    #[inline]
    pub fn output_high(&self) -> bool {
        self.lfsr & OUTPUT_BIT != 0
    }

    /// LFSR state
    #[inline]
    pub fn lfsr(&self) -> u32 {
        self.lfsr
    }

    /// Advance one output sample
    #[inline]
    pub fn tick(&mut self) {
        self.phase += self.step;
        let mut shifts = self.phase >> 16;
        self.phase &= 0xffff;
        while shifts != 0 {
            // XNOR of taps 0 and 3 feeds bit 16
            let feedback = ((self.lfsr ^ (self.lfsr >> 3)) & 1) ^ 1;
            self.lfsr = (feedback << 16) | (self.lfsr >> 1);
            shifts -= 1;
        }
    }

    /// Noise operator output for an attenuation value
    ///
    /// Noise ignores the sine table: the envelope level is used directly,
    /// loudest at 0 and silent from 0x3FF.
    #[inline]
    pub fn output(&self, env: u32) -> i32 {
        let level = if env < 0x3ff {
            ((env ^ 0x3ff) * 2) as i32
        } else {
            0
        };
        if self.output_high() {
            level
        } else {
            -level
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_generator_lfsr_varies() {
        let mut noise = NoiseGenerator::new(1 << 16);
        let mut outputs = Vec::new();
        for _ in 0..100 {
            noise.tick();
            outputs.push(noise.output_high());
        }
        assert!(outputs.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_zero_lfsr_shifts_in_ones() {
        let mut noise = NoiseGenerator::new(1 << 16);
        noise.tick();
        assert_eq!(noise.lfsr(), 1 << 16);
    }

    #[test]
    fn test_fractional_step_accumulates() {
        let mut noise = NoiseGenerator::new(1 << 15);
        noise.tick();
        assert_eq!(noise.lfsr(), 0);
        noise.tick();
        assert_eq!(noise.lfsr(), 1 << 16);
    }

    #[test]
    fn test_lfsr_stays_in_17_bits() {
        let mut noise = NoiseGenerator::new(7 << 16);
        for _ in 0..10_000 {
            noise.tick();
            assert!(noise.lfsr() < 1 << 17);
        }
    }

    #[test]
    fn test_output_level_and_sign() {
        let mut noise = NoiseGenerator::new(1 << 16);
        assert_eq!(noise.output(0x3ff), 0);
        assert_eq!(noise.output(0), -(0x3ff * 2));
        noise.tick();
        assert_eq!(noise.output(0), 0x3ff * 2);
        assert_eq!(noise.output(0x3fe), 2);
    }

    #[test]
    fn test_enable_bit() {
        let mut noise = NoiseGenerator::new(0);
        noise.set_control(0x1f, 5);
        assert!(!noise.enabled());
        noise.set_control(0x9f, 5);
        assert!(noise.enabled());
    }
}
