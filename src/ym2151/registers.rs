//! YM2151 Register Definitions
//!
//! The chip exposes a flat 256-byte register space:
//!
//! - `0x00-0x1F`: global registers (test, key-on, noise, timers, LFO, CT)
//! - `0x20-0x3F`: channel registers, 8 banks of 8 channels
//! - `0x40-0xFF`: operator registers, 6 banks of 32 operators
//!
//! Operator registers are ordered by slot then channel: `addr & 7` is the
//! channel and `(addr >> 3) & 3` the slot (M1, M2, C1, C2).

use std::fmt;

/// Decoded YM2151 register address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// 0x01: test register (bit 1 resets the LFO phase)
    Test,
    /// 0x08: key on/off, channel in bits 0-2, slot mask in bits 3-6
    KeyOn,
    /// 0x0F: noise enable and frequency
    Noise,
    /// 0x10: Timer A high bits
    TimerAHigh,
    /// 0x11: Timer A low bits
    TimerALow,
    /// 0x12: Timer B
    TimerB,
    /// 0x14: CSM, flag reset, IRQ enable, timer load
    TimerControl,
    /// 0x18: LFO frequency
    LfoFrequency,
    /// 0x19: AM depth (bit 7 clear) or PM depth (bit 7 set)
    ModulationDepth,
    /// 0x1B: CT output pins and LFO waveform
    ControlWaveform,
    /// 0x20+ch: pan, feedback, algorithm
    ChannelControl(u8),
    /// 0x28+ch: key code
    KeyCode(u8),
    /// 0x30+ch: key fraction
    KeyFraction(u8),
    /// 0x38+ch: PMS and AMS
    Sensitivity(u8),
    /// 0x40+op: DT1 and MUL
    DetuneMultiple(u8),
    /// 0x60+op: total level
    TotalLevel(u8),
    /// 0x80+op: key scale and attack rate
    KeyScaleAttack(u8),
    /// 0xA0+op: AM enable and first decay rate
    AmDecay1(u8),
    /// 0xC0+op: DT2 and second decay rate
    Detune2Decay2(u8),
    /// 0xE0+op: first decay level and release rate
    SustainRelease(u8),
    /// Address with no function
    Unused(u8),
}

/// Operator index (0..32, four per channel in slot order) for an operator register
#[inline]
pub fn operator_index(addr: u8) -> u8 {
    (addr & 7) * 4 + ((addr & 0x18) >> 3)
}

/// Inverse of [`operator_index`]: offset of an operator inside a register bank
#[inline]
fn operator_offset(op: u8) -> u8 {
    (op / 4) | ((op % 4) << 3)
}

impl Register {
    /// Decode a register address
    pub fn decode(addr: u8) -> Self {
        match addr {
            0x01 => Register::Test,
            0x08 => Register::KeyOn,
            0x0f => Register::Noise,
            0x10 => Register::TimerAHigh,
            0x11 => Register::TimerALow,
            0x12 => Register::TimerB,
            0x14 => Register::TimerControl,
            0x18 => Register::LfoFrequency,
            0x19 => Register::ModulationDepth,
            0x1b => Register::ControlWaveform,
            0x00..=0x1f => Register::Unused(addr),
            0x20..=0x3f => {
                let ch = addr & 7;
                match addr & 0x18 {
                    0x00 => Register::ChannelControl(ch),
                    0x08 => Register::KeyCode(ch),
                    0x10 => Register::KeyFraction(ch),
                    _ => Register::Sensitivity(ch),
                }
            }
            _ => {
                let op = operator_index(addr);
                match addr & 0xe0 {
                    0x40 => Register::DetuneMultiple(op),
                    0x60 => Register::TotalLevel(op),
                    0x80 => Register::KeyScaleAttack(op),
                    0xa0 => Register::AmDecay1(op),
                    0xc0 => Register::Detune2Decay2(op),
                    _ => Register::SustainRelease(op),
                }
            }
        }
    }

    /// Register address
    pub fn addr(&self) -> u8 {
        match *self {
            Register::Test => 0x01,
            Register::KeyOn => 0x08,
            Register::Noise => 0x0f,
            Register::TimerAHigh => 0x10,
            Register::TimerALow => 0x11,
            Register::TimerB => 0x12,
            Register::TimerControl => 0x14,
            Register::LfoFrequency => 0x18,
            Register::ModulationDepth => 0x19,
            Register::ControlWaveform => 0x1b,
            Register::ChannelControl(ch) => 0x20 | ch,
            Register::KeyCode(ch) => 0x28 | ch,
            Register::KeyFraction(ch) => 0x30 | ch,
            Register::Sensitivity(ch) => 0x38 | ch,
            Register::DetuneMultiple(op) => 0x40 | operator_offset(op),
            Register::TotalLevel(op) => 0x60 | operator_offset(op),
            Register::KeyScaleAttack(op) => 0x80 | operator_offset(op),
            Register::AmDecay1(op) => 0xa0 | operator_offset(op),
            Register::Detune2Decay2(op) => 0xc0 | operator_offset(op),
            Register::SustainRelease(op) => 0xe0 | operator_offset(op),
            Register::Unused(addr) => addr,
        }
    }
}

const SLOT_NAMES: [&str; 4] = ["M1", "M2", "C1", "C2"];

struct OperatorName(u8);

impl fmt::Display for OperatorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{} {}", self.0 / 4, SLOT_NAMES[usize::from(self.0 % 4)])
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let addr = self.addr();
        match *self {
            Register::Test => write!(f, "${addr:02X} (Test)"),
            Register::KeyOn => write!(f, "${addr:02X} (Key On/Off)"),
            Register::Noise => write!(f, "${addr:02X} (Noise Enable/Frequency)"),
            Register::TimerAHigh => write!(f, "${addr:02X} (Timer A High)"),
            Register::TimerALow => write!(f, "${addr:02X} (Timer A Low)"),
            Register::TimerB => write!(f, "${addr:02X} (Timer B)"),
            Register::TimerControl => write!(f, "${addr:02X} (CSM/Timer Control)"),
            Register::LfoFrequency => write!(f, "${addr:02X} (LFO Frequency)"),
            Register::ModulationDepth => write!(f, "${addr:02X} (AM/PM Depth)"),
            Register::ControlWaveform => write!(f, "${addr:02X} (CT/LFO Waveform)"),
            Register::ChannelControl(ch) => write!(f, "${addr:02X} (ch{ch} Pan/FB/Algorithm)"),
            Register::KeyCode(ch) => write!(f, "${addr:02X} (ch{ch} Key Code)"),
            Register::KeyFraction(ch) => write!(f, "${addr:02X} (ch{ch} Key Fraction)"),
            Register::Sensitivity(ch) => write!(f, "${addr:02X} (ch{ch} PMS/AMS)"),
            Register::DetuneMultiple(op) => {
                write!(f, "${addr:02X} ({} DT1/MUL)", OperatorName(op))
            }
            Register::TotalLevel(op) => write!(f, "${addr:02X} ({} TL)", OperatorName(op)),
            Register::KeyScaleAttack(op) => write!(f, "${addr:02X} ({} KS/AR)", OperatorName(op)),
            Register::AmDecay1(op) => write!(f, "${addr:02X} ({} AMS-EN/D1R)", OperatorName(op)),
            Register::Detune2Decay2(op) => {
                write!(f, "${addr:02X} ({} DT2/D2R)", OperatorName(op))
            }
            Register::SustainRelease(op) => {
                write!(f, "${addr:02X} ({} D1L/RR)", OperatorName(op))
            }
            Register::Unused(_) => write!(f, "${addr:02X} (unused)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_registers() {
        assert_eq!(Register::decode(0x08), Register::KeyOn);
        assert_eq!(Register::decode(0x14), Register::TimerControl);
        assert_eq!(Register::decode(0x1b), Register::ControlWaveform);
        assert_eq!(Register::decode(0x00), Register::Unused(0x00));
        assert_eq!(Register::decode(0x1f), Register::Unused(0x1f));
    }

    #[test]
    fn test_channel_registers() {
        assert_eq!(Register::decode(0x20), Register::ChannelControl(0));
        assert_eq!(Register::decode(0x2f), Register::KeyCode(7));
        assert_eq!(Register::decode(0x33), Register::KeyFraction(3));
        assert_eq!(Register::decode(0x3a), Register::Sensitivity(2));
    }

    #[test]
    fn test_operator_ordering() {
        // Bank offset 0x08 is M2 of channel 0, 0x10 is C1, 0x18 is C2
        assert_eq!(Register::decode(0x40), Register::DetuneMultiple(0));
        assert_eq!(Register::decode(0x48), Register::DetuneMultiple(1));
        assert_eq!(Register::decode(0x50), Register::DetuneMultiple(2));
        assert_eq!(Register::decode(0x58), Register::DetuneMultiple(3));
        assert_eq!(Register::decode(0x41), Register::DetuneMultiple(4));
        assert_eq!(Register::decode(0xff), Register::SustainRelease(31));
        assert_eq!(Register::decode(0x7b), Register::TotalLevel(15));
    }

    #[test]
    fn test_every_address_maps_back() {
        for addr in 0..=255u8 {
            assert_eq!(Register::decode(addr).addr(), addr, "address ${addr:02X}");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Register::decode(0x08).to_string(), "$08 (Key On/Off)");
        assert_eq!(Register::decode(0x2a).to_string(), "$2A (ch2 Key Code)");
        assert_eq!(Register::decode(0x91).to_string(), "$91 (ch1 C1 KS/AR)");
        assert_eq!(Register::decode(0x02).to_string(), "$02 (unused)");
    }
}
