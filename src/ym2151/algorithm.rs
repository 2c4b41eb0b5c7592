//! Channel algorithms and per-sample operator mixing
//!
//! Each channel wires its four operators with one of eight fixed algorithms.
//! Operators feed three modulation accumulators (M2, C1, C2), a per-channel
//! one-sample delay cell (MEM) and the channel output.
//!
//! # MEM ordering
//!
//! Every sample starts by writing the value MEM held at the end of the
//! previous sample into its destination, before any operator of the channel
//! is computed. MEM is then rebuilt from this sample's operators and saved
//! for the next one. Reordering these two steps changes the sound.

use super::noise::NoiseGenerator;
use super::operator::Operator;
use super::tables::ENV_QUIET;

/// Position of an operator inside its channel, in register order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Modulator 1, the only slot with self-feedback
    M1 = 0,
    /// Modulator 2
    M2 = 1,
    /// Carrier 1
    C1 = 2,
    /// Carrier 2, always routed to the channel output
    C2 = 3,
}

/// Where an operator's output goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Modulation input of another operator in the same channel
    ToOperator(Slot),
    /// Channel output accumulator
    ToChannelOutput,
    /// The channel's one-sample delay cell
    ToMemoryCell,
}

use Destination::{ToChannelOutput as Out, ToMemoryCell as Mem, ToOperator as Op};

/// Operator routing for one algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wiring {
    /// M1 output; algorithm 5 sends it to several places at once
    pub m1: &'static [Destination],
    /// Where M2 goes
    pub m2: Destination,
    /// Where C1 goes
    pub c1: Destination,
    /// Where the delayed MEM value is written at the start of a sample
    pub mem: Destination,
}

/// The eight YM2151 algorithms (C2 always goes to the channel output)
pub const ALGORITHMS: [Wiring; 8] = [
    // M1-C1-MEM-M2-C2
    Wiring { m1: &[Op(Slot::C1)], m2: Op(Slot::C2), c1: Mem, mem: Op(Slot::M2) },
    // (M1+C1)-MEM-M2-C2
    Wiring { m1: &[Mem], m2: Op(Slot::C2), c1: Mem, mem: Op(Slot::M2) },
    // (M1 + (C1-MEM-M2))-C2
    Wiring { m1: &[Op(Slot::C2)], m2: Op(Slot::C2), c1: Mem, mem: Op(Slot::M2) },
    // ((M1-C1) + (M2 via MEM))-C2
    Wiring { m1: &[Op(Slot::C1)], m2: Op(Slot::C2), c1: Mem, mem: Op(Slot::C2) },
    // M1-C1 and M2-C2, two outputs
    Wiring { m1: &[Op(Slot::C1)], m2: Op(Slot::C2), c1: Out, mem: Mem },
    // M1 modulates C1, C2 and (delayed) M2; three outputs
    Wiring {
        m1: &[Op(Slot::C1), Op(Slot::C2), Mem],
        m2: Out,
        c1: Out,
        mem: Op(Slot::M2),
    },
    // M1-C1, M2, C2 all to output
    Wiring { m1: &[Op(Slot::C1)], m2: Out, c1: Out, mem: Mem },
    // All four to output
    Wiring { m1: &[Out], m2: Out, c1: Out, mem: Mem },
];

/// Accumulators used while computing one channel for one sample
#[derive(Debug, Default)]
struct Accumulators {
    /// Modulation inputs indexed by [`Slot`] (M1 is never a target)
    inputs: [i32; 4],
    mem: i32,
    out: i32,
}

impl Accumulators {
    #[inline]
    fn cell(&mut self, destination: Destination) -> &mut i32 {
        match destination {
            Destination::ToOperator(slot) => &mut self.inputs[slot as usize],
            Destination::ToChannelOutput => &mut self.out,
            Destination::ToMemoryCell => &mut self.mem,
        }
    }
}

/// Per-channel state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    algorithm: u8,
    wiring: Wiring,
    /// M1 feedback shift, 0 when feedback is off
    fb_shift: u32,
    /// M1 output history, oldest first
    fb_prev: i32,
    fb_curr: i32,
    /// MEM contents carried to the next sample
    mem_value: i32,
    pan_left: bool,
    pan_right: bool,
    /// Last KC written, used to skip redundant frequency updates
    key_code: u8,
    pms: u8,
    ams: u8,
    /// Output of the last computed sample, before panning
    output: i32,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            algorithm: 0,
            wiring: ALGORITHMS[0],
            fb_shift: 0,
            fb_prev: 0,
            fb_curr: 0,
            mem_value: 0,
            pan_left: false,
            pan_right: false,
            key_code: 0,
            pms: 0,
            ams: 0,
            output: 0,
        }
    }
}

impl Channel {
    /// Channel in its power-on state
    pub fn new() -> Self {
        Self::default()
    }

    /// Register 0x20: R (bit 7), L (bit 6), FB (bits 3-5), CONNECT (bits 0-2)
    pub fn set_control(&mut self, value: u8) {
        self.pan_left = value & 0x40 != 0;
        self.pan_right = value & 0x80 != 0;
        let feedback = u32::from((value >> 3) & 7);
        self.fb_shift = if feedback != 0 { feedback + 6 } else { 0 };
        self.algorithm = value & 7;
        self.wiring = ALGORITHMS[usize::from(self.algorithm)];
    }

    /// Register 0x38: PMS (bits 4-6) and AMS (bits 0-1)
    pub fn set_sensitivity(&mut self, value: u8) {
        self.pms = (value >> 4) & 7;
        self.ams = value & 3;
    }

    /// Store a new key code; returns `false` when it equals the current one
    pub(crate) fn update_key_code(&mut self, key_code: u8) -> bool {
        if self.key_code == key_code {
            false
        } else {
            self.key_code = key_code;
            true
        }
    }

    /// Connection algorithm (0-7)
    #[inline]
    pub fn algorithm(&self) -> u8 {
        self.algorithm
    }

    /// Phase modulation sensitivity
    #[inline]
    pub fn pms(&self) -> u8 {
        self.pms
    }

    /// Left and right output enables
    #[inline]
    pub fn pan(&self) -> (bool, bool) {
        (self.pan_left, self.pan_right)
    }

    /// Output of the last computed sample
    #[inline]
    pub fn output(&self) -> i32 {
        self.output
    }

    /// Compute one sample for this channel
    ///
    /// `operators` are the channel's four operators in slot order. `noise`
    /// is only passed for channel 7; when it is enabled it replaces C2.
    pub fn compute(
        &mut self,
        operators: &[Operator],
        lfo_am: u32,
        noise: Option<&NoiseGenerator>,
    ) -> i32 {
        let mut acc = Accumulators::default();

        // Previous sample's MEM goes in before anything is computed
        *acc.cell(self.wiring.mem) = self.mem_value;

        let am = if self.ams != 0 {
            lfo_am << (self.ams - 1)
        } else {
            0
        };

        // M1: self feedback, its output reaches the other operators one computation late
        let m1 = &operators[Slot::M1 as usize];
        let env = m1.attenuation(am);
        let feedback = self.fb_prev + self.fb_curr;
        self.fb_prev = self.fb_curr;
        for &destination in self.wiring.m1 {
            *acc.cell(destination) = self.fb_prev;
        }
        self.fb_curr = 0;
        if env < ENV_QUIET {
            let pm = if self.fb_shift != 0 {
                feedback << self.fb_shift
            } else {
                0
            };
            self.fb_curr = m1.output_feedback(env, pm);
        }

        let m2 = &operators[Slot::M2 as usize];
        let env = m2.attenuation(am);
        if env < ENV_QUIET {
            let out = m2.output(env, acc.inputs[Slot::M2 as usize]);
            *acc.cell(self.wiring.m2) += out;
        }

        let c1 = &operators[Slot::C1 as usize];
        let env = c1.attenuation(am);
        if env < ENV_QUIET {
            let out = c1.output(env, acc.inputs[Slot::C1 as usize]);
            *acc.cell(self.wiring.c1) += out;
        }

        let c2 = &operators[Slot::C2 as usize];
        let env = c2.attenuation(am);
        match noise {
            Some(noise) if noise.enabled() => acc.out += noise.output(env),
            _ => {
                if env < ENV_QUIET {
                    acc.out += c2.output(env, acc.inputs[Slot::C2 as usize]);
                }
            }
        }

        self.mem_value = acc.mem;
        self.output = acc.out;
        acc.out
    }
}
