//! Shared, lock-free coordination state
//!
//! Every run owns exactly one cell that all its workers poll. The cell is only
//! ever changed through compare-and-swap or atomic increments.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Values that can live in a [`CoordinationCell`]
pub trait CellValue: Copy + Eq {
    fn into_raw(self) -> u64;
    fn from_raw(raw: u64) -> Self;
}

impl CellValue for u64 {
    fn into_raw(self) -> u64 {
        self
    }

    fn from_raw(raw: u64) -> Self {
        raw
    }
}

/// Atomic cell holding a single [`CellValue`]
#[derive(Debug)]
pub struct CoordinationCell<T> {
    raw: AtomicU64,
    _value: PhantomData<T>,
}

impl<T: CellValue> CoordinationCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            raw: AtomicU64::new(value.into_raw()),
            _value: PhantomData,
        }
    }

    pub fn load(&self) -> T {
        T::from_raw(self.raw.load(Ordering::Acquire))
    }

    pub fn store(&self, value: T) {
        self.raw.store(value.into_raw(), Ordering::Release);
    }

    /// Replace `current` with `new`; on failure returns the value actually held
    pub fn compare_and_swap(&self, current: T, new: T) -> Result<T, T> {
        self.raw
            .compare_exchange(current.into_raw(), new.into_raw(), Ordering::AcqRel, Ordering::Acquire)
            .map(T::from_raw)
            .map_err(T::from_raw)
    }
}

impl CoordinationCell<u64> {
    /// Atomically add one, returning the new value
    pub fn increment(&self) -> u64 {
        self.raw.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// The "stop now" view of a coordination cell that worker pools need
pub trait StopSignal: Sync {
    /// Whether workers should wind down
    fn should_stop(&self) -> bool;

    /// Move the cell to a terminal value so every worker stops
    fn halt(&self);
}

/// Mining lifecycle token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MiningStatus {
    Stopped,
    InProgress,
    Found,
}

impl CellValue for MiningStatus {
    fn into_raw(self) -> u64 {
        match self {
            MiningStatus::Stopped => 0,
            MiningStatus::InProgress => 1,
            MiningStatus::Found => 2,
        }
    }

    fn from_raw(raw: u64) -> Self {
        match raw {
            0 => MiningStatus::Stopped,
            1 => MiningStatus::InProgress,
            _ => MiningStatus::Found,
        }
    }
}

impl StopSignal for CoordinationCell<MiningStatus> {
    fn should_stop(&self) -> bool {
        self.load() != MiningStatus::InProgress
    }

    fn halt(&self) {
        // Losing to Found or an explicit stop is fine: both are terminal
        let _ = self.compare_and_swap(MiningStatus::InProgress, MiningStatus::Stopped);
    }
}

/// Found-counter with an immutable target, used by key search
#[derive(Debug)]
pub struct FoundCounter {
    found: CoordinationCell<u64>,
    target: u64,
    halted: AtomicBool,
}

impl FoundCounter {
    pub fn new(target: u64) -> Self {
        Self {
            found: CoordinationCell::new(0),
            target,
            halted: AtomicBool::new(false),
        }
    }

    /// Discoveries actually recorded
    pub fn found(&self) -> u64 {
        self.found.load()
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    pub fn reached(&self) -> bool {
        self.found() >= self.target
    }

    /// Count one discovery, returning the new total
    pub fn record(&self) -> u64 {
        self.found.increment()
    }
}

impl StopSignal for FoundCounter {
    fn should_stop(&self) -> bool {
        self.reached() || self.halted.load(Ordering::Acquire)
    }

    fn halt(&self) {
        self.halted.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_mining_status_transitions() {
        let cell = CoordinationCell::new(MiningStatus::Stopped);
        assert!(cell.should_stop());

        assert_eq!(
            cell.compare_and_swap(MiningStatus::Stopped, MiningStatus::InProgress),
            Ok(MiningStatus::Stopped)
        );
        assert!(!cell.should_stop());

        assert_eq!(
            cell.compare_and_swap(MiningStatus::Stopped, MiningStatus::InProgress),
            Err(MiningStatus::InProgress)
        );

        cell.halt();
        assert_eq!(cell.load(), MiningStatus::Stopped);
    }

    #[test]
    fn test_halt_does_not_override_found() {
        let cell = CoordinationCell::new(MiningStatus::Found);
        cell.halt();
        assert_eq!(cell.load(), MiningStatus::Found);
    }

    #[test]
    fn test_exactly_one_winner() {
        let cell = Arc::new(CoordinationCell::new(MiningStatus::InProgress));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = Arc::clone(&cell);
                thread::spawn(move || {
                    cell.compare_and_swap(MiningStatus::InProgress, MiningStatus::Found)
                        .is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_found_counter() {
        let counter = FoundCounter::new(3);
        assert!(!counter.should_stop());
        assert_eq!(counter.record(), 1);
        assert_eq!(counter.record(), 2);
        assert!(!counter.reached());
        assert_eq!(counter.record(), 3);
        assert!(counter.reached());
    }

    #[test]
    fn test_found_counter_halt_keeps_count() {
        let counter = FoundCounter::new(5);
        counter.record();
        counter.halt();
        assert!(counter.should_stop());
        assert!(!counter.reached());
        assert_eq!(counter.found(), 1);

        counter.record();
        assert_eq!(counter.found(), 2);
        assert!(counter.should_stop());
    }
}
