//! YM2151 (OPM) FM Synthesis Emulator
//!
//! A sample-accurate emulator of the Yamaha YM2151 FM sound chip as used in
//! arcade audio subsystems, where it sits next to a sample-playback chip and
//! renders one frame of interleaved stereo audio per video frame.
//!
//! # Features
//! - 8 channels of 4 operators with all 8 connection algorithms
//! - ADSR envelope generator with key scaling
//! - LFO with 4 waveforms, amplitude and phase modulation
//! - Noise generator on channel 7
//! - Timers A/B with status flags, IRQ line and CSM key-on
//! - Per-channel mute and output gain
//!
//! # Crate feature flags
//! - `emulator` (default): core YM2151 emulator (`ym2151`)
//! - `export-wav` (opt-in): render frames to a WAV file (enables optional `hound` dep)
//!
//! # Quick start
//! ```
//! use ym2151::{ChipConfig, Ym2151};
//!
//! let mut chip = Ym2151::new(ChipConfig::default()).unwrap();
//! chip.write_register(0x20, 0xc7); // channel 0: both speakers, algorithm 7
//! chip.write_register(0x28, 0x4a); // key code A4
//! chip.write_register(0x08, 0x78); // key on M1 M2 C1 C2
//! chip.stream_update();
//! let frame = chip.get_buffer(); // 735 stereo samples at 44.1 kHz / 60 fps
//! assert_eq!(frame.len(), 1470);
//! ```
//!
//! ## Audio thread
//! ```
//! use ym2151::{ChipConfig, SharedChip};
//!
//! let chip = SharedChip::from_config(ChipConfig::default()).unwrap();
//! let sequencer = chip.clone();
//! std::thread::spawn(move || sequencer.write_register(0x08, 0x78))
//!     .join()
//!     .unwrap();
//! let mut out = Vec::new();
//! chip.render_frame(&mut out);
//! ```

#![warn(missing_docs)]

pub mod backend; // Sound chip trait, frame buffer, mixing
pub mod config; // Chip configuration
#[cfg(feature = "export-wav")]
pub mod export; // WAV export
pub mod shared; // Cross-thread chip handle
pub mod ym2151; // YM2151 FM emulation (core)

/// Error types for YM2151 emulator operations
#[derive(thiserror::Error, Debug)]
pub enum Ym2151Error {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// IO error from filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error writing audio file
    #[error("Audio export error: {0}")]
    ExportError(String),
}

/// Result type for emulator operations
pub type Result<T> = std::result::Result<T, Ym2151Error>;

// Public API exports
pub use backend::{mix_frames, FrameBuffer, SoundChip};
pub use config::ChipConfig;
#[cfg(feature = "export-wav")]
pub use export::render_to_wav;
pub use shared::SharedChip;
pub use ym2151::{
    EnvelopeState, OperatorSnapshot, Register, Status, TimerControl, Ym2151, NUM_CHANNELS,
};
