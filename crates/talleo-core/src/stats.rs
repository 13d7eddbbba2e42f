//! Live search statistics

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Thread-safe candidate counter shared by the workers of one run
#[derive(Debug)]
pub struct SearchStats {
    /// Candidates evaluated so far
    counted: AtomicU64,
    start_time: Instant,
}

impl SearchStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add a batch of evaluated candidates
    pub fn add(&self, count: u64) {
        self.counted.fetch_add(count, Ordering::Relaxed);
    }

    /// Total candidates evaluated
    pub fn total(&self) -> u64 {
        self.counted.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average candidates per second since the run started
    pub fn per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.total() as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl Default for SearchStats {
    fn default() -> Self {
        Self {
            counted: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

/// Format a rate like `12.345 kH/s`
pub fn format_rate(per_second: f64, unit: &str) -> String {
    if per_second >= 1e6 {
        format!("{:.3} M{}/s", per_second / 1e6, unit)
    } else if per_second > 1e3 {
        format!("{:.3} k{}/s", per_second / 1e3, unit)
    } else {
        format!("{:.3} {}/s", per_second, unit)
    }
}

/// Format a large count with a metric suffix
pub fn format_count(count: u64) -> String {
    if count >= 1_000_000_000_000 {
        format!("{:.2}T", count as f64 / 1e12)
    } else if count >= 1_000_000_000 {
        format!("{:.2}G", count as f64 / 1e9)
    } else if count >= 1_000_000 {
        format!("{:.2}M", count as f64 / 1e6)
    } else if count >= 1000 {
        format!("{:.2}K", count as f64 / 1e3)
    } else {
        format!("{}", count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_accumulate() {
        let stats = SearchStats::new();
        stats.add(10);
        stats.add(32);
        assert_eq!(stats.total(), 42);
        assert!(stats.per_second() >= 0.0);
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(12_345.0, "H"), "12.345 kH/s");
        assert_eq!(format_rate(2_500_000.0, "H"), "2.500 MH/s");
        assert_eq!(format_rate(1000.0, "keys"), "1000.000 keys/s");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1500), "1.50K");
        assert_eq!(format_count(3_000_000_000), "3.00G");
    }
}
