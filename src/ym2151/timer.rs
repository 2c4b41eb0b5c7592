//! Timer A / Timer B
//!
//! Both timers count down in 16.16 sample units and reload from the timer
//! tables when they expire. Expiry can raise a status flag and, for Timer A,
//! request a CSM key-on of every operator.
//!
//! Only the sample-driven model exists: timers are ticked once per rendered
//! sample by the chip.

use bitflags::bitflags;
use log::debug;

use super::tables::{ClockTables, TIMER_SH};

bitflags! {
    /// Timer control register (0x14)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TimerControl: u8 {
        /// Run Timer A
        const LOAD_A = 0x01;
        /// Run Timer B
        const LOAD_B = 0x02;
        /// Timer A expiry sets status bit 0
        const IRQ_EN_A = 0x04;
        /// Timer B expiry sets status bit 1
        const IRQ_EN_B = 0x08;
        /// Clear status bit 0
        const RESET_A = 0x10;
        /// Clear status bit 1
        const RESET_B = 0x20;
        /// CSM: Timer A expiry keys on every operator
        const CSM = 0x80;
    }
}

bitflags! {
    /// Status register as returned by [`crate::Ym2151::read_status`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Status: u8 {
        /// Timer A expired
        const TIMER_A = 0x01;
        /// Timer B expired
        const TIMER_B = 0x02;
    }
}

/// Pending CSM action, resolved by the phase tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsmRequest {
    /// Nothing pending
    #[default]
    Idle,
    /// Timer A expired: key on all operators on the next tick
    KeyOn,
    /// Key-on happened last tick: release all operators
    KeyOff,
}

/// A single down-counting timer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timer {
    /// Load value from the registers
    index: u32,
    running: bool,
    /// Remaining time in 16.16 samples
    remaining: i64,
}

impl Timer {
    /// Load value
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Whether the timer counts
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Start the timer; a running timer keeps its current count
    fn start(&mut self, period: u64) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.remaining = period as i64;
        true
    }

    fn stop(&mut self) -> bool {
        std::mem::replace(&mut self.running, false)
    }

    /// Count one sample; returns `true` on expiry
    #[inline]
    fn tick(&mut self, period: u64) -> bool {
        if !self.running {
            return false;
        }
        self.remaining -= 1 << TIMER_SH;
        if self.remaining <= 0 {
            self.remaining += period as i64;
            true
        } else {
            false
        }
    }
}

/// Both timers, the status flags and the CSM latch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timers {
    a: Timer,
    b: Timer,
    control: TimerControl,
    status: Status,
    csm: CsmRequest,
}

impl Timers {
    /// Both timers stopped, status clear
    pub fn new() -> Self {
        Self::default()
    }

    /// Register 0x10: Timer A bits 9-2
    pub fn set_timer_a_high(&mut self, value: u8) {
        self.a.index = (self.a.index & 0x003) | (u32::from(value) << 2);
    }

    /// Register 0x11: Timer A bits 1-0
    pub fn set_timer_a_low(&mut self, value: u8) {
        self.a.index = (self.a.index & 0x3fc) | u32::from(value & 3);
    }

    /// Register 0x12: Timer B
    pub fn set_timer_b(&mut self, value: u8) {
        self.b.index = u32::from(value);
    }

    /// Register 0x14: IRQ enables, flag resets, timer start/stop and CSM
    pub fn write_control(&mut self, value: u8, tables: &ClockTables) {
        let control = TimerControl::from_bits_truncate(value);
        self.control = control;

        if control.contains(TimerControl::RESET_B) {
            self.status.remove(Status::TIMER_B);
        }
        if control.contains(TimerControl::RESET_A) {
            self.status.remove(Status::TIMER_A);
        }

        if control.contains(TimerControl::LOAD_B) {
            if self.b.start(tables.timer_b_period(self.b.index)) {
                debug!("Timer B started (load {})", self.b.index);
            }
        } else if self.b.stop() {
            debug!("Timer B stopped");
        }

        if control.contains(TimerControl::LOAD_A) {
            if self.a.start(tables.timer_a_period(self.a.index)) {
                debug!(
                    "Timer A started (load {}, CSM {})",
                    self.a.index,
                    control.contains(TimerControl::CSM)
                );
            }
        } else if self.a.stop() {
            debug!("Timer A stopped");
        }
    }

    /// Count one output sample
    #[inline]
    pub fn tick(&mut self, tables: &ClockTables) {
        if self.a.tick(tables.timer_a_period(self.a.index)) {
            if self.control.contains(TimerControl::IRQ_EN_A) {
                self.status.insert(Status::TIMER_A);
            }
            if self.control.contains(TimerControl::CSM) {
                self.csm = CsmRequest::KeyOn;
            }
        }
        if self.b.tick(tables.timer_b_period(self.b.index))
            && self.control.contains(TimerControl::IRQ_EN_B)
        {
            self.status.insert(Status::TIMER_B);
        }
    }

    /// Take the pending CSM action and move the latch to its next state
    #[inline]
    pub fn take_csm_request(&mut self) -> CsmRequest {
        let request = self.csm;
        self.csm = match request {
            CsmRequest::KeyOn => CsmRequest::KeyOff,
            CsmRequest::KeyOff | CsmRequest::Idle => CsmRequest::Idle,
        };
        request
    }

    /// Status flags
    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Last value written to 0x14
    /// Timer A
    pub fn timer_a(&self) -> &Timer {
        &self.a
    }

    /// Timer B
    pub fn timer_b(&self) -> &Timer {
        &self.b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> ClockTables {
        ClockTables::new(4_000_000, 44_100)
    }

    fn samples_until_expiry(period: u64) -> u64 {
        period.div_ceil(1 << TIMER_SH)
    }

    #[test]
    fn test_timer_a_index_split() {
        let mut timers = Timers::new();
        timers.set_timer_a_high(0xff);
        timers.set_timer_a_low(0x02);
        assert_eq!(timers.timer_a().index(), 0x3fe);
        timers.set_timer_a_high(0x00);
        assert_eq!(timers.timer_a().index(), 0x002);
    }

    #[test]
    fn test_timer_a_sets_status_after_exact_period() {
        let tables = tables();
        let mut timers = Timers::new();
        timers.set_timer_a_high(0xf0);
        let k = samples_until_expiry(tables.timer_a_period(timers.timer_a().index()));
        timers.write_control(0x05, &tables);

        for _ in 0..k - 1 {
            timers.tick(&tables);
        }
        assert!(timers.status().is_empty());
        timers.tick(&tables);
        assert_eq!(timers.status(), Status::TIMER_A);

        timers.write_control(0x15, &tables);
        assert!(timers.status().is_empty());
        assert!(timers.timer_a().is_running());
    }

    #[test]
    fn test_expiry_without_irq_enable_leaves_status_clear() {
        let tables = tables();
        let mut timers = Timers::new();
        timers.set_timer_b(0xff);
        timers.write_control(0x02, &tables);
        for _ in 0..1000 {
            timers.tick(&tables);
        }
        assert!(timers.status().is_empty());
        assert!(timers.timer_b().is_running());
    }

    #[test]
    fn test_timer_b_reloads() {
        let tables = tables();
        let mut timers = Timers::new();
        timers.set_timer_b(0xfe);
        timers.write_control(0x0a, &tables);

        let mut expiries = 0;
        for _ in 0..10_000 {
            timers.tick(&tables);
            if timers.status().contains(Status::TIMER_B) {
                expiries += 1;
                timers.write_control(0x2a, &tables);
            }
        }
        assert!(expiries > 1);
    }

    #[test]
    fn test_stopped_timer_does_not_count() {
        let tables = tables();
        let mut timers = Timers::new();
        timers.set_timer_a_high(0xff);
        timers.write_control(0x05, &tables);
        timers.write_control(0x04, &tables);
        assert!(!timers.timer_a().is_running());
        for _ in 0..1000 {
            timers.tick(&tables);
        }
        assert!(timers.status().is_empty());
    }

    #[test]
    fn test_long_period_counts_without_overflow() {
        // Timer B load 0 at 1 MHz / 192 kHz is longer than i32::MAX in 16.16
        let tables = ClockTables::new(1_000_000, 192_000);
        let mut timers = Timers::new();
        timers.set_timer_b(0x00);
        timers.write_control(0x0a, &tables);

        let k = samples_until_expiry(tables.timer_b_period(0));
        assert!(k > 50_000);
        for _ in 0..k - 1 {
            timers.tick(&tables);
        }
        assert!(timers.status().is_empty());
        timers.tick(&tables);
        assert_eq!(timers.status(), Status::TIMER_B);

        // Reloaded: the next expiry is again a full period away
        timers.write_control(0x2a, &tables);
        for _ in 0..k - 2 {
            timers.tick(&tables);
        }
        assert!(timers.status().is_empty());
    }

    #[test]
    fn test_csm_latch_sequence() {
        let tables = tables();
        let mut timers = Timers::new();
        timers.set_timer_a_high(0xff);
        timers.set_timer_a_low(0x03);
        timers.write_control(0x81, &tables);

        assert_eq!(timers.take_csm_request(), CsmRequest::Idle);
        let k = samples_until_expiry(tables.timer_a_period(0x3ff));
        for _ in 0..k {
            timers.tick(&tables);
        }
        assert_eq!(timers.take_csm_request(), CsmRequest::KeyOn);
        assert_eq!(timers.take_csm_request(), CsmRequest::KeyOff);
        assert_eq!(timers.take_csm_request(), CsmRequest::Idle);
        // CSM alone does not raise the IRQ flag
        assert!(timers.status().is_empty());
    }
}
