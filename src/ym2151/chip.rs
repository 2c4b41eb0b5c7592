//! YM2151 (OPM) FM synthesis chip
//!
//! 8 channels of 4 operators each, one LFO, one noise generator and two
//! timers. The chip is driven by two calls:
//!
//! - [`Ym2151::write_register`] whenever the sound program writes a register
//! - [`Ym2151::stream_update`] once per video frame, rendering `sample_rate / fps`
//!   interleaved stereo samples into the chip's frame buffer
//!
//! # Per-sample order
//!
//! 1. envelope tick (all 32 operators)
//! 2. channel outputs: channels 0-6 normally, channel 7 with the noise path
//! 3. pan, sum, clip to 16 bits, apply volume
//! 4. timers A and B
//! 5. LFO, noise, phase and CSM key-on/off

use log::{debug, trace, warn};

use super::algorithm::Channel;
use super::lfo::{Lfo, LfoWaveform};
use super::noise::NoiseGenerator;
use super::operator::{Operator, OperatorSnapshot, KEY_SOURCE_CSM, KEY_SOURCE_REGISTER};
use super::phase;
use super::registers::Register;
use super::tables::{ClockTables, EG_SH};
use super::timer::{CsmRequest, Status, Timers};
use crate::backend::{clip_and_scale, FrameBuffer, SoundChip};
use crate::config::ChipConfig;
use crate::Result;

/// Number of FM channels
pub const NUM_CHANNELS: usize = 8;
/// Number of operators
pub const NUM_OPERATORS: usize = NUM_CHANNELS * 4;

/// The envelope generator steps once every three chip sample periods
const EG_TIMER_OVERFLOW: u32 = 3 << EG_SH;

const UNINITIALIZED: &str = "Ym2151 used before init()";

/// Everything that changes while the chip runs
#[derive(Debug, Clone)]
struct ChipState {
    operators: [Operator; NUM_OPERATORS],
    channels: [Channel; NUM_CHANNELS],
    lfo: Lfo,
    noise: NoiseGenerator,
    timers: Timers,
    eg_timer: u32,
    eg_cnt: u32,
    /// Test register (0x01)
    test: u8,
    /// CT1/CT2 output pins (0x1B bits 6-7)
    ct: u8,
}

impl ChipState {
    fn new(lfo_timer_add: u32, noise_step: u32) -> Self {
        Self {
            operators: std::array::from_fn(|_| Operator::new()),
            channels: std::array::from_fn(|_| Channel::new()),
            lfo: Lfo::new(lfo_timer_add),
            noise: NoiseGenerator::new(noise_step),
            timers: Timers::new(),
            eg_timer: 0,
            eg_cnt: 0,
            test: 0,
            ct: 0,
        }
    }

    /// Hardware reset: clear everything, then write 0 to the LFO and every
    /// channel and operator register so all derived state is consistent
    fn reset(tables: &ClockTables) -> Self {
        let mut state = Self::new(tables.lfo_timer_add, tables.noise[0]);
        state.write(0x1b, 0, tables);
        state.write(0x18, 0, tables);
        for addr in 0x20..=0xff {
            state.write(addr, 0, tables);
        }
        state
    }

    fn channel_operators(&mut self, ch: usize) -> &mut [Operator] {
        &mut self.operators[ch * 4..ch * 4 + 4]
    }

    fn write(&mut self, addr: u8, value: u8, tables: &ClockTables) {
        match Register::decode(addr) {
            Register::Test => {
                self.test = value;
                if value & 0x02 != 0 {
                    self.lfo.reset_phase();
                }
            }
            Register::KeyOn => self.write_key_on(value),
            Register::Noise => {
                self.noise
                    .set_control(value, tables.noise[usize::from(value & 0x1f)]);
            }
            Register::TimerAHigh => self.timers.set_timer_a_high(value),
            Register::TimerALow => self.timers.set_timer_a_low(value),
            Register::TimerB => self.timers.set_timer_b(value),
            Register::TimerControl => self.timers.write_control(value, tables),
            Register::LfoFrequency => self.lfo.set_frequency(value),
            Register::ModulationDepth => self.lfo.set_depth(value),
            Register::ControlWaveform => {
                self.ct = value >> 6;
                self.lfo.set_waveform(LfoWaveform::from(value));
            }
            Register::ChannelControl(ch) => self.channels[usize::from(ch)].set_control(value),
            Register::KeyCode(ch) => {
                let ch = usize::from(ch);
                let key_code = value & 0x7f;
                if self.channels[ch].update_key_code(key_code) {
                    for op in self.channel_operators(ch) {
                        op.set_key_code(u32::from(key_code), tables);
                    }
                }
            }
            Register::KeyFraction(ch) => {
                let ch = usize::from(ch);
                let fraction = u32::from(value >> 2);
                if fraction != self.operators[ch * 4].key_index & 63 {
                    for op in self.channel_operators(ch) {
                        op.set_key_fraction(fraction, tables);
                    }
                }
            }
            Register::Sensitivity(ch) => self.channels[usize::from(ch)].set_sensitivity(value),
            Register::DetuneMultiple(op) => {
                self.operators[usize::from(op)].set_dt1_mul(value, tables);
            }
            Register::TotalLevel(op) => self.operators[usize::from(op)].set_total_level(value),
            Register::KeyScaleAttack(op) => self.operators[usize::from(op)].set_ks_ar(value),
            Register::AmDecay1(op) => self.operators[usize::from(op)].set_am_d1r(value),
            Register::Detune2Decay2(op) => {
                self.operators[usize::from(op)].set_dt2_d2r(value, tables);
            }
            Register::SustainRelease(op) => self.operators[usize::from(op)].set_d1l_rr(value),
            Register::Unused(addr) => {
                trace!("Write to undocumented register ${addr:02X} = ${value:02X}");
            }
        }
    }

    /// Register 0x08: bits 3-6 select M1, C1, M2, C2 of channel `value & 7`
    fn write_key_on(&mut self, value: u8) {
        const SLOT_BITS: [u8; 4] = [0x08, 0x20, 0x10, 0x40];

        let ch = usize::from(value & 7);
        let eg_cnt = self.eg_cnt;
        for (op, bit) in self.channel_operators(ch).iter_mut().zip(SLOT_BITS) {
            if value & bit != 0 {
                op.key_on(KEY_SOURCE_REGISTER, eg_cnt);
            } else {
                op.key_off(KEY_SOURCE_REGISTER);
            }
        }
    }

    #[inline]
    fn advance_eg(&mut self, eg_timer_add: u32) {
        self.eg_timer += eg_timer_add;
        while self.eg_timer >= EG_TIMER_OVERFLOW {
            self.eg_timer -= EG_TIMER_OVERFLOW;
            self.eg_cnt = self.eg_cnt.wrapping_add(1);
            for op in self.operators.iter_mut() {
                op.envelope.step(self.eg_cnt);
            }
        }
    }

    /// Compute every channel and return the panned (left, right) sums
    #[inline]
    fn mix_channels(&mut self, muted: &[bool; NUM_CHANNELS]) -> (i32, i32) {
        let am = self.lfo.am();
        let (mut left, mut right) = (0i32, 0i32);

        for (ch, channel) in self.channels.iter_mut().enumerate() {
            let operators = &self.operators[ch * 4..ch * 4 + 4];
            let noise = (ch == NUM_CHANNELS - 1).then_some(&self.noise);
            let out = channel.compute(operators, am, noise);

            if muted[ch] {
                continue;
            }
            let (pan_left, pan_right) = channel.pan();
            if pan_left {
                left += out;
            }
            if pan_right {
                right += out;
            }
        }

        (left, right)
    }

    /// LFO, noise, phase generator, then CSM
    #[inline]
    fn advance(&mut self, tables: &ClockTables) {
        self.lfo.clock(self.test & 0x02 != 0);
        self.noise.tick();

        let lfp = self.lfo.pm();
        for ch in 0..NUM_CHANNELS {
            let mod_index = phase::modulation_index(lfp, self.channels[ch].pms());
            phase::advance_channel(&mut self.operators[ch * 4..ch * 4 + 4], mod_index, tables);
        }

        match self.timers.take_csm_request() {
            CsmRequest::KeyOn => {
                debug!("CSM key-on");
                let eg_cnt = self.eg_cnt;
                for op in self.operators.iter_mut() {
                    op.key_on(KEY_SOURCE_CSM, eg_cnt);
                }
            }
            CsmRequest::KeyOff => {
                for op in self.operators.iter_mut() {
                    op.key_off(KEY_SOURCE_CSM);
                }
            }
            CsmRequest::Idle => {}
        }
    }

    /// Render interleaved stereo samples into `out`
    fn render(
        &mut self,
        tables: &ClockTables,
        out: &mut [i16],
        volume: f32,
        muted: &[bool; NUM_CHANNELS],
    ) {
        for frame in out.chunks_exact_mut(2) {
            self.advance_eg(tables.eg_timer_add);
            let (left, right) = self.mix_channels(muted);
            frame[0] = clip_and_scale(left, volume);
            frame[1] = clip_and_scale(right, volume);
            self.timers.tick(tables);
            self.advance(tables);
        }
    }
}

/// YM2151 emulator
///
/// A chip starts un-initialized ([`Ym2151::with_clock`]) until
/// [`Ym2151::init`] builds its tables. Using it before then panics.
///
/// # Example
///
/// ```
/// use ym2151::{ChipConfig, Ym2151};
///
/// let mut chip = Ym2151::new(ChipConfig::default()).unwrap();
/// chip.write_register(0x20, 0xc7); // both speakers, algorithm 7
/// chip.write_register(0x28, 0x4a); // A4
/// chip.write_register(0x08, 0x78); // key on all four operators
/// chip.stream_update();
/// assert_eq!(chip.get_buffer().len(), 735 * 2);
/// ```
#[derive(Clone)]
pub struct Ym2151 {
    clock: u32,
    sample_rate: u32,
    tables: Option<ClockTables>,
    state: ChipState,
    frame: FrameBuffer,
    muted: [bool; NUM_CHANNELS],
}

impl Ym2151 {
    /// Create an un-initialized chip running at `clock` Hz
    ///
    /// Call [`Ym2151::init`] before anything else.
    pub fn with_clock(clock: u32) -> Self {
        Self {
            clock,
            sample_rate: 0,
            tables: None,
            state: ChipState::new(0, 0),
            frame: FrameBuffer::new(0, 1.0),
            muted: [false; NUM_CHANNELS],
        }
    }

    /// Create and initialize a chip from a configuration
    pub fn new(config: ChipConfig) -> Result<Self> {
        let mut chip = Self::with_clock(config.clock);
        chip.frame.set_volume(config.volume);
        chip.init(config.sample_rate, config.fps)?;
        Ok(chip)
    }

    /// Build the tables for an output rate, size the frame buffer and reset
    ///
    /// # Errors
    ///
    /// Returns [`crate::Ym2151Error::ConfigError`] for a zero clock, sample rate
    /// or fps, or when `fps` exceeds the sample rate.
    pub fn init(&mut self, sample_rate: u32, fps: u32) -> Result<()> {
        let config = ChipConfig {
            clock: self.clock,
            sample_rate,
            fps,
            volume: self.frame.volume(),
        };
        config.validate()?;

        self.sample_rate = sample_rate;
        self.tables = Some(ClockTables::new(self.clock, sample_rate));
        self.frame = FrameBuffer::new(config.frame_size(), config.volume);
        debug!(
            "YM2151 initialized: clock {} Hz, {} Hz output, {} samples per frame",
            self.clock,
            sample_rate,
            config.frame_size()
        );

        self.reset();
        Ok(())
    }

    #[inline]
    fn clock_tables(&self) -> &ClockTables {
        self.tables.as_ref().expect(UNINITIALIZED)
    }

    /// Whether [`Ym2151::init`] has been called
    pub fn is_initialized(&self) -> bool {
        self.tables.is_some()
    }

    /// Hardware reset. Channel mutes and the output volume are kept.
    pub fn reset(&mut self) {
        self.state = ChipState::reset(self.clock_tables());
        self.frame.clear();
        debug!("YM2151 reset");
    }

    /// Write a chip register
    ///
    /// Unknown addresses are ignored.
    pub fn write_register(&mut self, addr: u8, value: u8) {
        let tables = self.tables.as_ref().expect(UNINITIALIZED);
        self.state.write(addr, value, tables);
    }

    /// Status register: bit 0 Timer A expired, bit 1 Timer B expired
    pub fn read_status(&self) -> u8 {
        self.state.timers.status().bits()
    }

    /// Typed view of the status register
    pub fn status(&self) -> Status {
        self.state.timers.status()
    }

    /// Whether the chip's IRQ line is asserted
    pub fn irq_asserted(&self) -> bool {
        !self.state.timers.status().is_empty()
    }

    /// CT1 (bit 0) and CT2 (bit 1) output pins
    pub fn ct_pins(&self) -> u8 {
        self.state.ct
    }

    /// Render one frame into the chip's buffer
    pub fn stream_update(&mut self) {
        let tables = self.tables.as_ref().expect(UNINITIALIZED);
        let volume = self.frame.volume();
        self.state
            .render(tables, self.frame.samples_mut(), volume, &self.muted);
    }

    /// Render `buffer.len() / 2` interleaved stereo samples into `buffer`
    pub fn generate_samples_into(&mut self, buffer: &mut [i16]) {
        let tables = self.tables.as_ref().expect(UNINITIALIZED);
        let volume = self.frame.volume();
        self.state.render(tables, buffer, volume, &self.muted);
    }

    /// The last rendered frame (interleaved left/right)
    pub fn get_buffer(&self) -> &[i16] {
        self.frame.as_slice()
    }

    /// Samples per channel rendered by [`Ym2151::stream_update`]
    pub fn frame_size(&self) -> usize {
        self.frame.frame_size()
    }

    /// Output sample rate, 0 before init
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Master clock in Hz
    pub fn clock(&self) -> u32 {
        self.clock
    }

    /// Output gain applied after clipping
    ///
    /// NaN, infinite and negative gains are ignored and the current gain is kept.
    pub fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() || volume < 0.0 {
            warn!("ignoring invalid output gain {volume}");
            return;
        }
        self.frame.set_volume(volume);
    }

    /// Output gain
    pub fn volume(&self) -> f32 {
        self.frame.volume()
    }

    /// Mute or unmute a channel (0-7). Muted channels keep running.
    pub fn set_channel_mute(&mut self, channel: usize, mute: bool) {
        if channel < NUM_CHANNELS {
            self.muted[channel] = mute;
        }
    }

    /// Whether a channel is muted
    pub fn is_channel_muted(&self, channel: usize) -> bool {
        channel < NUM_CHANNELS && self.muted[channel]
    }

    /// Per-channel output of the last rendered sample, before pan and mute
    pub fn channel_outputs(&self) -> [i32; NUM_CHANNELS] {
        std::array::from_fn(|ch| self.state.channels[ch].output())
    }

    /// Snapshot of operator `index` (channel * 4 + slot, slots M1 M2 C1 C2)
    pub fn operator_state(&self, index: usize) -> Option<OperatorSnapshot> {
        self.state.operators.get(index).map(Operator::snapshot)
    }
}

impl SoundChip for Ym2151 {
    fn frame_size(&self) -> usize {
        Ym2151::frame_size(self)
    }

    fn stream_update(&mut self) {
        Ym2151::stream_update(self)
    }

    fn buffer(&self) -> &[i16] {
        self.get_buffer()
    }

    fn set_volume(&mut self, volume: f32) {
        Ym2151::set_volume(self, volume)
    }

    fn reset(&mut self) {
        Ym2151::reset(self)
    }
}

impl std::fmt::Debug for Ym2151 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ym2151")
            .field("clock", &self.clock)
            .field("sample_rate", &self.sample_rate)
            .field("initialized", &self.is_initialized())
            .field("frame_size", &self.frame.frame_size())
            .field("status", &self.status())
            .field("muted", &self.muted)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ym2151::envelope::EnvelopeState;

    fn chip() -> Ym2151 {
        Ym2151::new(ChipConfig::default()).unwrap()
    }

    /// Channel 0, algorithm 7, both speakers, instant attack on all operators
    fn setup_tone(chip: &mut Ym2151) {
        chip.write_register(0x20, 0xc7);
        for slot in 0..4u8 {
            let offset = slot << 3;
            chip.write_register(0x40 + offset, 0x01);
            chip.write_register(0x60 + offset, 0x00);
            chip.write_register(0x80 + offset, 0x1f);
            chip.write_register(0xe0 + offset, 0x0f);
        }
        chip.write_register(0x28, 0x4a);
    }

    #[test]
    #[should_panic(expected = "Ym2151 used before init()")]
    fn test_write_before_init_panics() {
        let mut chip = Ym2151::with_clock(4_000_000);
        chip.write_register(0x08, 0x78);
    }

    #[test]
    #[should_panic(expected = "Ym2151 used before init()")]
    fn test_render_before_init_panics() {
        let mut chip = Ym2151::with_clock(4_000_000);
        chip.stream_update();
    }

    #[test]
    fn test_init_rejects_zero_sample_rate() {
        let mut chip = Ym2151::with_clock(4_000_000);
        assert!(chip.init(0, 60).is_err());
        assert!(!chip.is_initialized());
        assert!(chip.init(44_100, 60).is_ok());
        assert_eq!(chip.frame_size(), 735);
    }

    #[test]
    fn test_reset_state() {
        let chip = chip();
        for i in 0..NUM_OPERATORS {
            let op = chip.operator_state(i).unwrap();
            assert_eq!(op.state, EnvelopeState::Off);
            assert_eq!(op.volume, 1023);
            assert!(!op.key_on);
        }
        assert!(chip.operator_state(NUM_OPERATORS).is_none());
        assert_eq!(chip.read_status(), 0);
    }

    #[test]
    fn test_key_on_register_slot_bits() {
        let mut chip = chip();
        setup_tone(&mut chip);
        // C1 only (bit 4) on channel 0
        chip.write_register(0x08, 0x10);
        let keyed: Vec<bool> = (0..4)
            .map(|i| chip.operator_state(i).unwrap().key_on)
            .collect();
        assert_eq!(keyed, vec![false, false, true, false]);

        chip.write_register(0x08, 0x00);
        assert_eq!(chip.operator_state(2).unwrap().state, EnvelopeState::Release);
    }

    #[test]
    fn test_key_on_targets_selected_channel() {
        let mut chip = chip();
        chip.write_register(0x08, 0x7b);
        for i in 0..NUM_OPERATORS {
            assert_eq!(chip.operator_state(i).unwrap().key_on, i / 4 == 3);
        }
    }

    #[test]
    fn test_tone_renders_and_mutes() {
        let mut chip = chip();
        setup_tone(&mut chip);
        chip.write_register(0x08, 0x78);
        chip.stream_update();
        assert!(chip.get_buffer().iter().any(|&s| s != 0));
        // Only channel 0 is programmed
        assert!(chip.channel_outputs()[1..].iter().all(|&out| out == 0));

        chip.set_channel_mute(0, true);
        assert!(chip.is_channel_muted(0));
        chip.stream_update();
        assert!(chip.get_buffer().iter().all(|&s| s == 0));
    }

    #[test]
    fn test_pan_selects_speakers() {
        let mut chip = chip();
        setup_tone(&mut chip);
        chip.write_register(0x20, 0x47);
        chip.write_register(0x08, 0x78);
        chip.stream_update();
        let buffer = chip.get_buffer();
        assert!(buffer.chunks(2).any(|f| f[0] != 0));
        assert!(buffer.chunks(2).all(|f| f[1] == 0));
    }

    #[test]
    fn test_ct_pins_and_waveform_register() {
        let mut chip = chip();
        chip.write_register(0x1b, 0xc2);
        assert_eq!(chip.ct_pins(), 3);
        chip.write_register(0x1b, 0x40);
        assert_eq!(chip.ct_pins(), 1);
    }

    #[test]
    fn test_reset_keeps_mutes_and_volume() {
        let mut chip = chip();
        chip.set_channel_mute(5, true);
        chip.set_volume(0.5);
        chip.reset();
        assert!(chip.is_channel_muted(5));
        assert_eq!(chip.volume(), 0.5);
    }

    #[test]
    fn test_invalid_volume_is_ignored() {
        let mut chip = chip();
        chip.set_volume(0.25);
        chip.set_volume(f32::NAN);
        chip.set_volume(-1.0);
        chip.set_volume(f32::INFINITY);
        assert_eq!(chip.volume(), 0.25);
        chip.set_volume(0.0);
        assert_eq!(chip.volume(), 0.0);
    }

    #[test]
    fn test_clone_renders_identically() {
        let mut a = chip();
        setup_tone(&mut a);
        a.write_register(0x08, 0x78);
        let mut b = a.clone();
        a.stream_update();
        b.stream_update();
        assert_eq!(a.get_buffer(), b.get_buffer());
    }
}
