//! YM2151 (OPM) FM Synthesis Domain
//!
//! Sample-accurate emulation of the Yamaha YM2151 as found in arcade sound
//! boards: 32 operators in 8 channels, 8 algorithms, envelope generator,
//! LFO, noise on channel 7, two timers with IRQ and CSM.
//!
//! Implementation:
//! - `chip` - register front end and per-sample pipeline
//! - `tables` - attenuation, sine, frequency, detune and timer tables
//! - `operator` / `envelope` / `phase` - per-operator state
//! - `algorithm` - channel connection graphs and feedback
//! - `lfo` / `noise` / `timer` - global generators

// Internal modules
pub mod algorithm;
pub mod chip;
pub mod envelope;
pub mod lfo;
pub mod noise;
pub mod operator;
pub mod phase;
pub mod registers;
pub mod tables;
pub mod timer;

// Re-export public API
pub use chip::{Ym2151, NUM_CHANNELS, NUM_OPERATORS};
pub use envelope::EnvelopeState;
pub use lfo::LfoWaveform;
pub use operator::OperatorSnapshot;
pub use registers::Register;
pub use tables::ClockTables;
pub use timer::{Status, TimerControl};
