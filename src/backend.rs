//! Sound chip abstraction and frame storage
//!
//! The arcade board mixes the FM chip with a sample-playback chip before the
//! result reaches the platform audio callback. Both expose the same
//! frame-oriented interface: render one frame per video frame into an
//! interleaved stereo buffer, then let the caller mix the buffers.

/// Common interface for frame-driven sound chips
///
/// # Example
///
/// ```
/// use ym2151::{mix_frames, ChipConfig, SoundChip, Ym2151};
///
/// fn render_board(chips: &mut [&mut dyn SoundChip], out: &mut Vec<i16>) {
///     out.clear();
///     for chip in chips.iter_mut() {
///         chip.stream_update();
///         if out.is_empty() {
///             out.extend_from_slice(chip.buffer());
///         } else {
///             mix_frames(out, chip.buffer());
///         }
///     }
/// }
///
/// let mut fm = Ym2151::new(ChipConfig::default()).unwrap();
/// let mut out = Vec::new();
/// let mut chips: [&mut dyn SoundChip; 1] = [&mut fm];
/// render_board(&mut chips, &mut out);
/// assert_eq!(out.len(), fm.frame_size() * 2);
/// ```
pub trait SoundChip: Send {
    /// Samples per channel in one frame
    fn frame_size(&self) -> usize;

    /// Render one frame into the chip's buffer
    fn stream_update(&mut self);

    /// Last rendered frame, interleaved left/right
    fn buffer(&self) -> &[i16];

    /// Output gain
    fn set_volume(&mut self, volume: f32);

    /// Hardware reset
    fn reset(&mut self);
}

/// Interleaved stereo frame storage with an output gain
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    samples: Vec<i16>,
    frame_size: usize,
    volume: f32,
}

impl FrameBuffer {
    /// Zeroed buffer holding `frame_size` stereo samples
    pub fn new(frame_size: usize, volume: f32) -> Self {
        Self {
            samples: vec![0; frame_size * 2],
            frame_size,
            volume,
        }
    }

    /// Samples per channel in one frame
    #[inline]
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Output gain
    #[inline]
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Set the output gain
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    /// Stored frame, interleaved left/right
    #[inline]
    pub fn as_slice(&self) -> &[i16] {
        &self.samples
    }

    /// Mutable frame storage for the renderer
    #[inline]
    pub fn samples_mut(&mut self) -> &mut [i16] {
        &mut self.samples
    }

    /// Zero the stored frame
    pub fn clear(&mut self) {
        self.samples.fill(0);
    }
}

/// Clip a mixed sample to 16 bits, then apply the output gain
#[inline]
pub fn clip_and_scale(sample: i32, volume: f32) -> i16 {
    let clipped = sample.clamp(i32::from(i16::MIN), i32::from(i16::MAX));
    (clipped as f32 * volume) as i16
}

/// Add `src` into `dst` sample by sample, saturating at the 16-bit range
pub fn mix_frames(dst: &mut [i16], src: &[i16]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = d.saturating_add(s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_and_scale() {
        assert_eq!(clip_and_scale(100_000, 1.0), i16::MAX);
        assert_eq!(clip_and_scale(-100_000, 1.0), i16::MIN);
        assert_eq!(clip_and_scale(1000, 0.5), 500);
        assert_eq!(clip_and_scale(-1001, 0.5), -500);
        assert_eq!(clip_and_scale(1234, 0.0), 0);
    }

    #[test]
    fn test_clip_happens_before_gain() {
        // Clipped to 32767 first, then halved
        assert_eq!(clip_and_scale(60_000, 0.5), 16383);
    }

    #[test]
    fn test_mix_frames_saturates() {
        let mut dst = vec![30_000, -30_000, 10, 0];
        mix_frames(&mut dst, &[10_000, -10_000, 5]);
        assert_eq!(dst, vec![i16::MAX, i16::MIN, 15, 0]);
    }

    #[test]
    fn test_frame_buffer_layout() {
        let mut frame = FrameBuffer::new(735, 1.0);
        assert_eq!(frame.as_slice().len(), 1470);
        frame.samples_mut()[3] = 7;
        frame.clear();
        assert!(frame.as_slice().iter().all(|&s| s == 0));
    }
}
