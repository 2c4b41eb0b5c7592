//! Register-level scenarios: tone, Timer A, CSM

use ym2151::ym2151::ClockTables;
use ym2151::{ChipConfig, EnvelopeState, Status, Ym2151, NUM_CHANNELS};

const CLOCK: u32 = 4_000_000;
const RATE: u32 = 44_100;

fn chip() -> Ym2151 {
    Ym2151::new(ChipConfig::default()).unwrap()
}

fn render(chip: &mut Ym2151, samples: usize) -> Vec<i16> {
    let mut buffer = vec![0i16; samples * 2];
    chip.generate_samples_into(&mut buffer);
    buffer
}

/// Channel 0 as four sine operators summed to both speakers
fn program_tone(chip: &mut Ym2151, key_code: u8) {
    for slot in 0..4u8 {
        let offset = slot << 3;
        chip.write_register(0x40 + offset, 0x01); // DT1 0, MUL 1
        chip.write_register(0x60 + offset, 0x00); // TL 0
        chip.write_register(0x80 + offset, 0x1f); // instant attack
        chip.write_register(0xa0 + offset, 0x00);
        chip.write_register(0xc0 + offset, 0x00);
        chip.write_register(0xe0 + offset, 0x0f);
    }
    chip.write_register(0x20, 0xc7);
    chip.write_register(0x28, key_code);
    chip.write_register(0x08, 0x78);
}

/// Frequency estimated from the spacing of rising zero crossings
fn estimate_frequency(left: &[i16]) -> f64 {
    let rising: Vec<usize> = left
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[0] < 0 && w[1] >= 0)
        .map(|(i, _)| i + 1)
        .collect();
    assert!(rising.len() >= 3, "too few cycles: {}", rising.len());

    let first = rising[0];
    let last = rising[rising.len() - 1];
    (rising.len() - 1) as f64 * f64::from(RATE) / (last - first) as f64
}

fn timer_a_samples(index: u32) -> usize {
    let tables = ClockTables::new(CLOCK, RATE);
    tables.timer_a_period(index).div_ceil(1 << 16) as usize
}

#[test]
fn tone_frame_is_audible_and_bounded() {
    let mut chip = chip();
    program_tone(&mut chip, 0x4a);
    chip.stream_update();

    let frame = chip.get_buffer();
    assert_eq!(frame.len(), 735 * 2);
    // Four carriers at TL 0 reach close to full scale without clipping
    let peak = frame.iter().map(|&s| i32::from(s).abs()).max().unwrap_or(0);
    assert!(peak > 16_000, "peak {peak}");
    assert!(frame.iter().all(|&s| s > i16::MIN && s < i16::MAX));
    // Both speakers carry the same channel
    assert!(frame.chunks_exact(2).all(|f| f[0] == f[1]));
}

#[test]
fn tone_pitch_follows_key_code() {
    // Octave 4 note A: 440 Hz at 3.58 MHz, scaled by the 4 MHz clock
    let expected = 440.0 * f64::from(CLOCK) / 3_579_545.0;

    let mut chip = chip();
    program_tone(&mut chip, 0x4a);
    let left: Vec<i16> = render(&mut chip, 4410).iter().step_by(2).copied().collect();
    let measured = estimate_frequency(&left);
    assert!(
        (measured - expected).abs() / expected < 0.02,
        "measured {measured:.1} Hz, expected {expected:.1} Hz"
    );

    let mut octave_up = self::chip();
    program_tone(&mut octave_up, 0x5a);
    let left: Vec<i16> = render(&mut octave_up, 4410)
        .iter()
        .step_by(2)
        .copied()
        .collect();
    let ratio = estimate_frequency(&left) / measured;
    assert!((ratio - 2.0).abs() < 0.05, "octave ratio {ratio:.3}");
}

#[test]
fn timer_a_flags_after_exact_sample_count() {
    let mut chip = chip();
    chip.write_register(0x10, 0xf0);
    chip.write_register(0x11, 0x00);
    let k = timer_a_samples(0x3c0);

    chip.write_register(0x14, 0x05); // load A, IRQ enable A
    render(&mut chip, k - 1);
    assert_eq!(chip.read_status() & 1, 0);
    assert!(!chip.irq_asserted());

    render(&mut chip, 1);
    assert_eq!(chip.read_status() & 1, 1);
    assert!(chip.irq_asserted());
    assert_eq!(chip.status(), Status::TIMER_A);

    chip.write_register(0x14, 0x15); // reset flag A, keep running
    assert_eq!(chip.read_status() & 1, 0);

    render(&mut chip, k);
    assert_eq!(chip.read_status() & 1, 1);
}

#[test]
fn timer_b_flags_independently() {
    let mut chip = chip();
    chip.write_register(0x12, 0xf0);
    chip.write_register(0x14, 0x0a); // load B, IRQ enable B

    let tables = ClockTables::new(CLOCK, RATE);
    let k = tables.timer_b_period(0xf0).div_ceil(1 << 16) as usize;
    render(&mut chip, k);
    assert_eq!(chip.read_status(), 2);

    chip.write_register(0x14, 0x20);
    assert_eq!(chip.read_status(), 0);
}

#[test]
fn slow_timer_on_low_clock_high_rate_chip() {
    let config = ChipConfig::with_clock(1_000_000).with_sample_rate(192_000);
    assert!(config.validate().is_ok());
    let mut chip = Ym2151::new(config).unwrap();

    let tables = ClockTables::new(1_000_000, 192_000);
    let k = tables.timer_b_period(0).div_ceil(1 << 16) as usize;

    chip.write_register(0x12, 0x00);
    chip.write_register(0x14, 0x0a);
    render(&mut chip, 1);
    assert_eq!(chip.read_status(), 0);

    render(&mut chip, k - 2);
    assert_eq!(chip.read_status(), 0);
    render(&mut chip, 1);
    assert_eq!(chip.read_status(), 2);
}

#[test]
fn csm_keys_all_operators_on_then_off() {
    let mut chip = chip();
    chip.write_register(0x10, 0xf0);
    let k = timer_a_samples(0x3c0);

    chip.write_register(0x14, 0x81); // CSM, load A
    render(&mut chip, k - 1);
    assert!((0..NUM_CHANNELS * 4).all(|i| !chip.operator_state(i).unwrap().key_on));

    render(&mut chip, 1);
    for i in 0..NUM_CHANNELS * 4 {
        let op = chip.operator_state(i).unwrap();
        assert!(op.key_on, "operator {i} not keyed by CSM");
        assert_eq!(op.state, EnvelopeState::Attack);
    }

    render(&mut chip, 1);
    for i in 0..NUM_CHANNELS * 4 {
        let op = chip.operator_state(i).unwrap();
        assert!(!op.key_on, "operator {i} still keyed");
        assert_eq!(op.state, EnvelopeState::Release);
    }
    // CSM without IRQ enable leaves the status clear
    assert_eq!(chip.read_status(), 0);
}

#[test]
fn csm_key_off_keeps_register_key_on() {
    let mut chip = chip();
    chip.write_register(0x10, 0xf0);
    let k = timer_a_samples(0x3c0);

    chip.write_register(0x08, 0x7a); // channel 2, all slots
    chip.write_register(0x14, 0x81);
    render(&mut chip, k + 1);

    for i in 0..NUM_CHANNELS * 4 {
        let held = chip.operator_state(i).unwrap().key_on;
        assert_eq!(held, i / 4 == 2, "operator {i}");
    }
}
