//! Wake scheduling
//!
//! A hardware countdown raises an interrupt once per [`WakeInterval`]. The
//! interrupt handler's only job is [`WakeSignal::signal`]; the cycle consumes the
//! signal with [`WakeSignal::take`] between cycles.

use core::cell::Cell;

use critical_section::Mutex;

use crate::error::Result;
use crate::hal::WakeTimer;

/// Wake timer periods, indexed 0 to 9
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum WakeInterval {
    Ms16 = 0,
    Ms32 = 1,
    Ms64 = 2,
    Ms128 = 3,
    Ms250 = 4,
    Ms500 = 5,
    S1 = 6,
    S2 = 7,
    S4 = 8,
    S8 = 9,
}

impl WakeInterval {
    pub const MAX_INDEX: u8 = 9;

    /// Maps an interval index to its period.
    /// Indices above MAX_INDEX clamp to the longest period.
    pub const fn from_index(index: u8) -> Self {
        match index {
            0 => WakeInterval::Ms16,
            1 => WakeInterval::Ms32,
            2 => WakeInterval::Ms64,
            3 => WakeInterval::Ms128,
            4 => WakeInterval::Ms250,
            5 => WakeInterval::Ms500,
            6 => WakeInterval::S1,
            7 => WakeInterval::S2,
            8 => WakeInterval::S4,
            _ => WakeInterval::S8,
        }
    }

    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Nominal period in milliseconds
    pub const fn millis(self) -> u32 {
        match self {
            WakeInterval::Ms16 => 16,
            WakeInterval::Ms32 => 32,
            WakeInterval::Ms64 => 64,
            WakeInterval::Ms128 => 128,
            WakeInterval::Ms250 => 250,
            WakeInterval::Ms500 => 500,
            WakeInterval::S1 => 1_000,
            WakeInterval::S2 => 2_000,
            WakeInterval::S4 => 4_000,
            WakeInterval::S8 => 8_000,
        }
    }
}

/// Single pending-wake flag shared between the timer interrupt and the cycle.
///
/// Fires that arrive before the flag is taken collapse into one pending wake.
pub struct WakeSignal {
    pending: Mutex<Cell<bool>>,
}

impl WakeSignal {
    /// Creates a signal with a wake already pending, so the first cycle runs
    /// straight after boot.
    pub const fn new() -> Self {
        Self {
            pending: Mutex::new(Cell::new(true)),
        }
    }

    /// Creates a signal with nothing pending
    pub const fn idle() -> Self {
        Self {
            pending: Mutex::new(Cell::new(false)),
        }
    }

    /// Marks a wake as pending. Safe to call from interrupt context.
    pub fn signal(&self) {
        critical_section::with(|cs| self.pending.borrow(cs).set(true));
    }

    /// Reads and clears the flag in one critical section
    /// returns: whether a wake was pending
    pub fn take(&self) -> bool {
        critical_section::with(|cs| self.pending.borrow(cs).replace(false))
    }

    pub fn is_pending(&self) -> bool {
        critical_section::with(|cs| self.pending.borrow(cs).get())
    }
}

impl Default for WakeSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the wake timer once it has been armed.
///
/// The period is fixed for the life of the device; there is no re-arm.
pub struct WakeScheduler<T> {
    timer: T,
    interval: WakeInterval,
}

impl<T: WakeTimer> WakeScheduler<T> {
    /// Starts `timer` with the interval at `index`, clamping out-of-range indices
    pub fn arm(mut timer: T, index: u8) -> Result<Self> {
        if index > WakeInterval::MAX_INDEX {
            log_debug!("wake interval index {} clamped to {}", index, WakeInterval::MAX_INDEX);
        }
        let interval = WakeInterval::from_index(index);
        timer.start(interval)?;
        log_info!("wake timer armed, period {} ms", interval.millis());
        Ok(Self { timer, interval })
    }

    pub fn interval(&self) -> WakeInterval {
        self.interval
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NodeError;
    use crate::mock::MockWakeTimer;

    #[test]
    fn test_index_above_max_clamps_to_max() {
        assert_eq!(WakeInterval::from_index(15), WakeInterval::from_index(9));
        assert_eq!(WakeInterval::from_index(255), WakeInterval::S8);
    }

    #[test]
    fn test_periods_double_from_16ms() {
        assert_eq!(WakeInterval::from_index(0).millis(), 16);
        assert_eq!(WakeInterval::from_index(4).millis(), 250);
        assert_eq!(WakeInterval::from_index(6).millis(), 1_000);
        assert_eq!(WakeInterval::from_index(9).millis(), 8_000);
        for index in 0..=WakeInterval::MAX_INDEX {
            assert_eq!(WakeInterval::from_index(index).index(), index);
        }
    }

    #[test]
    fn test_take_clears_flag() {
        let wake = WakeSignal::new();
        assert!(wake.is_pending());
        assert!(wake.take());
        assert!(!wake.is_pending());
        assert!(!wake.take());
    }

    #[test]
    fn test_repeated_fires_coalesce() {
        let wake = WakeSignal::idle();
        wake.signal();
        wake.signal();
        wake.signal();
        assert!(wake.take());
        assert!(!wake.take());
    }

    #[test]
    fn test_arm_with_out_of_range_index_uses_max_interval() {
        let clamped = WakeScheduler::arm(MockWakeTimer::new(), 15).unwrap();
        let max = WakeScheduler::arm(MockWakeTimer::new(), 9).unwrap();

        assert_eq!(clamped.interval(), max.interval());
        assert_eq!(clamped.timer().started, Some(WakeInterval::S8));
        assert_eq!(clamped.timer().starts, 1);
    }

    #[test]
    fn test_arm_reports_timer_failure() {
        let mut timer = MockWakeTimer::failing();

        assert!(matches!(WakeScheduler::arm(&mut timer, 9), Err(NodeError::WakeTimer)));
        assert_eq!(timer.starts, 1);
        assert_eq!(timer.started, None);
    }
}
