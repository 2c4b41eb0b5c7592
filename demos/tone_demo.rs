//! YM2151 Tone Demo
//!
//! Plays a short arpeggio on channel 0 with a two-operator FM patch, a
//! vibrato LFO and a Timer B interrupt pacing the notes, then writes the
//! result to a WAV file.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=debug cargo run --example tone_demo --features export-wav -- out.wav
//! ```

use anyhow::{Context, Result};
use log::info;
use std::path::Path;
use ym2151::export::write_wav_file;
use ym2151::{ChipConfig, Ym2151};

/// Key codes for C4 E4 G4 C5 (octave in bits 4-6, note code in bits 0-3)
const ARPEGGIO: [u8; 4] = [0x3e, 0x44, 0x48, 0x4e];

fn program_patch(chip: &mut Ym2151) {
    // Channel 0: both speakers, feedback 5, algorithm 4 (two FM pairs)
    chip.write_register(0x20, 0xc0 | (5 << 3) | 4);
    chip.write_register(0x38, 0x20); // PMS 2

    // Slots M1 M2 C1 C2: modulators bright, carriers loud
    let patch: [(u8, u8, u8, u8, u8); 4] = [
        // DT1/MUL, TL, KS/AR, D1R, D1L/RR
        (0x32, 0x1c, 0x1f, 0x0a, 0x37),
        (0x01, 0x00, 0x1f, 0x06, 0x27),
        (0x34, 0x22, 0x1f, 0x0a, 0x37),
        (0x01, 0x04, 0x1f, 0x06, 0x27),
    ];
    for (slot, &(dt_mul, tl, ar, d1r, d1l_rr)) in patch.iter().enumerate() {
        let offset = (slot as u8) << 3;
        chip.write_register(0x40 + offset, dt_mul);
        chip.write_register(0x60 + offset, tl);
        chip.write_register(0x80 + offset, ar);
        chip.write_register(0xa0 + offset, d1r);
        chip.write_register(0xc0 + offset, 0x02);
        chip.write_register(0xe0 + offset, d1l_rr);
    }

    // Vibrato: triangle LFO around 6 Hz
    chip.write_register(0x18, 0xb0);
    chip.write_register(0x19, 0x80 | 0x18);
    chip.write_register(0x1b, 0x02);
}

fn main() -> Result<()> {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tone_demo.wav".to_string());

    let mut chip = Ym2151::new(ChipConfig::default()).context("initializing chip")?;
    program_patch(&mut chip);

    // Timer B (about 65 ms) paces the notes; the sequencer polls the IRQ line every frame
    chip.write_register(0x12, 0x00);
    chip.write_register(0x14, 0x2a);

    let mut samples = Vec::new();
    let mut step = 0usize;
    let mut frame = vec![0i16; chip.frame_size() * 2];

    for _ in 0..240 {
        if chip.irq_asserted() || step == 0 {
            let key_code = ARPEGGIO[step % ARPEGGIO.len()];
            info!("note {step}: key code ${key_code:02X}");
            chip.write_register(0x08, 0x00);
            chip.write_register(0x28, key_code);
            chip.write_register(0x08, 0x78);
            chip.write_register(0x14, 0x2a); // acknowledge Timer B
            step += 1;
        }
        chip.generate_samples_into(&mut frame);
        samples.extend_from_slice(&frame);
    }

    write_wav_file(Path::new(&path), &samples, chip.sample_rate())
        .with_context(|| format!("writing {path}"))?;
    println!("Wrote {step} notes to {path}");
    Ok(())
}
