//! Chip configuration

use serde::{Deserialize, Serialize};

use crate::{Result, Ym2151Error};

/// Default YM2151 master clock (4 MHz)
pub const DEFAULT_CLOCK: u32 = 4_000_000;
/// Default output sample rate
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
/// Default frame rate driving [`crate::Ym2151::stream_update`]
pub const DEFAULT_FPS: u32 = 60;

/// Clock, output rate and gain for one chip
///
/// Missing fields take their defaults when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChipConfig {
    /// Chip master clock in Hz
    pub clock: u32,
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Frames rendered per second; each frame holds `sample_rate / fps` samples
    pub fps: u32,
    /// Gain applied to the clipped 16-bit output
    pub volume: f32,
}

impl Default for ChipConfig {
    fn default() -> Self {
        Self {
            clock: DEFAULT_CLOCK,
            sample_rate: DEFAULT_SAMPLE_RATE,
            fps: DEFAULT_FPS,
            volume: 1.0,
        }
    }
}

impl ChipConfig {
    /// Default configuration with a different master clock
    pub fn with_clock(clock: u32) -> Self {
        Self {
            clock,
            ..Self::default()
        }
    }

    /// Set the output sample rate
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the frame rate
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Set the output gain
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Samples per channel in one frame
    pub fn frame_size(&self) -> usize {
        if self.fps == 0 {
            0
        } else {
            (self.sample_rate / self.fps) as usize
        }
    }

    /// Check the configuration before building tables
    pub fn validate(&self) -> Result<()> {
        if self.clock == 0 {
            return Err(Ym2151Error::ConfigError("clock must be non-zero".into()));
        }
        if self.sample_rate == 0 {
            return Err(Ym2151Error::ConfigError(
                "sample rate must be non-zero".into(),
            ));
        }
        if self.fps == 0 {
            return Err(Ym2151Error::ConfigError("fps must be non-zero".into()));
        }
        if self.fps > self.sample_rate {
            return Err(Ym2151Error::ConfigError(format!(
                "fps {} exceeds sample rate {}: frames would be empty",
                self.fps, self.sample_rate
            )));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(Ym2151Error::ConfigError(format!(
                "volume must be a finite, non-negative gain (got {})",
                self.volume
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_config() {
        let config = ChipConfig::default();
        assert_eq!(config.clock, 4_000_000);
        assert_eq!(config.frame_size(), 735);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = ChipConfig::with_clock(3_579_545)
            .with_sample_rate(48_000)
            .with_fps(50)
            .with_volume(0.25);
        assert_eq!(config.frame_size(), 960);
        assert_relative_eq!(config.volume, 0.25);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = ChipConfig::default();
        assert!(ChipConfig::with_clock(0).validate().is_err());
        assert!(base.with_sample_rate(0).validate().is_err());
        assert!(base.with_fps(0).validate().is_err());
        assert!(base.with_sample_rate(30).validate().is_err());
        assert!(base.with_volume(-1.0).validate().is_err());
        assert!(base.with_volume(f32::NAN).validate().is_err());
    }

    #[test]
    fn test_validate_error_kind() {
        match ChipConfig::default().with_sample_rate(0).validate() {
            Err(Ym2151Error::ConfigError(msg)) => assert!(msg.contains("sample rate")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: ChipConfig =
            serde_json::from_str(r#"{ "clock": 3579545, "volume": 0.5 }"#).unwrap();
        assert_eq!(config.clock, 3_579_545);
        assert_eq!(config.sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(config.fps, DEFAULT_FPS);
        assert_relative_eq!(config.volume, 0.5);
    }

    #[test]
    fn test_serialize_round_trip() {
        let config = ChipConfig::default().with_fps(50);
        let json = serde_json::to_string(&config).unwrap();
        let back: ChipConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
