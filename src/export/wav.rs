//! WAV file export functionality

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use log::info;

use crate::ym2151::Ym2151;
use crate::{Result, Ym2151Error};

/// Render `frames` frames from `chip` into a 16-bit stereo WAV file
///
/// The chip keeps running from its current state, so register writes made
/// before the call are heard in the file.
///
/// # Arguments
///
/// * `chip` - initialized chip
/// * `frames` - number of frames (`chip.frame_size()` samples each) to render
/// * `output_path` - path where the WAV file will be written
///
/// # Examples
///
/// ```no_run
/// use ym2151::{render_to_wav, ChipConfig, Ym2151};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut chip = Ym2151::new(ChipConfig::default())?;
/// chip.write_register(0x20, 0xc7);
/// chip.write_register(0x08, 0x78);
/// render_to_wav(&mut chip, 120, "tone.wav")?;
/// # Ok(())
/// # }
/// ```
pub fn render_to_wav<P: AsRef<Path>>(
    chip: &mut Ym2151,
    frames: usize,
    output_path: P,
) -> Result<()> {
    let frame_len = chip.frame_size() * 2;
    let mut samples = Vec::with_capacity(frame_len * frames);
    for _ in 0..frames {
        chip.stream_update();
        samples.extend_from_slice(chip.get_buffer());
    }

    info!(
        "Writing {} frames ({:.1}s) to {}",
        frames,
        (samples.len() / 2) as f32 / chip.sample_rate() as f32,
        output_path.as_ref().display()
    );
    write_wav_file(output_path.as_ref(), &samples, chip.sample_rate())
}

/// Write interleaved stereo 16-bit samples to a WAV file
///
/// Failing to create the file is reported as [`Ym2151Error::Io`].
pub fn write_wav_file(path: &Path, samples: &[i16], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let file = File::create(path)?;
    let mut writer = hound::WavWriter::new(BufWriter::new(file), spec)
        .map_err(|e| Ym2151Error::ExportError(format!("Failed to write WAV header: {e}")))?;

    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|e| Ym2151Error::ExportError(format!("Failed to write sample: {e}")))?;
    }

    writer
        .finalize()
        .map_err(|e| Ym2151Error::ExportError(format!("Failed to finalize WAV file: {e}")))?;

    Ok(())
}
