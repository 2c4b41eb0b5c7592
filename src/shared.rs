//! Chip shared between a sequencer context and an audio context
//!
//! The emulator itself is single-threaded. When register writes come from one
//! thread (the sound program) and rendering happens on another (the audio
//! callback), wrap the chip in a [`SharedChip`] so every call is serialized
//! through one lock.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::ChipConfig;
use crate::ym2151::Ym2151;
use crate::Result;

/// Cloneable handle to a chip behind a mutex
#[derive(Clone, Debug)]
pub struct SharedChip {
    inner: Arc<Mutex<Ym2151>>,
}

impl SharedChip {
    /// Wrap an initialized chip
    pub fn new(chip: Ym2151) -> Self {
        Self {
            inner: Arc::new(Mutex::new(chip)),
        }
    }

    /// Build and wrap a chip from a configuration
    pub fn from_config(config: ChipConfig) -> Result<Self> {
        Ok(Self::new(Ym2151::new(config)?))
    }

    /// Write a chip register
    pub fn write_register(&self, addr: u8, value: u8) {
        self.inner.lock().write_register(addr, value);
    }

    /// Read the status register
    pub fn read_status(&self) -> u8 {
        self.inner.lock().read_status()
    }

    /// Render one frame and copy it into `out`, replacing its contents
    pub fn render_frame(&self, out: &mut Vec<i16>) {
        let mut chip = self.inner.lock();
        chip.stream_update();
        out.clear();
        out.extend_from_slice(chip.get_buffer());
    }

    /// Run `f` with exclusive access to the chip
    pub fn with_chip<R>(&self, f: impl FnOnce(&mut Ym2151) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
