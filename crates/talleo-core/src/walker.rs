//! Overflow-safe partitioning of a single lane across workers

use crate::error::PoolError;

/// Mask selecting the low `bits` bits of a lane (64 = full width)
pub fn lane_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Largest offset `<= max` congruent to `worker_id` modulo `worker_count`.
///
/// Requires `worker_count >= 1` and `worker_id <= max`.
pub fn last_safe_offset(worker_id: u64, worker_count: u64, max: u64) -> u64 {
    max - (max - worker_id) % worker_count
}

/// Walks one worker's residue class of a lane.
///
/// Worker `id` of `count` visits `start + id`, `start + id + count`, ... up to
/// and including its last safe offset, so the walkers of all workers together
/// cover every lane value exactly once. Offsets never wrap; only the produced
/// value wraps around the lane.
#[derive(Debug, Clone)]
pub struct BoundedStrideWalker {
    start: u64,
    mask: u64,
    stride: u64,
    next: u64,
    last: u64,
    done: bool,
}

impl BoundedStrideWalker {
    /// Walker over a full 64-bit lane
    pub fn new(worker_id: u64, worker_count: u64, start: u64) -> Result<Self, PoolError> {
        Self::with_width(worker_id, worker_count, start, 64)
    }

    /// Walker over a lane of `lane_bits` bits
    pub fn with_width(
        worker_id: u64,
        worker_count: u64,
        start: u64,
        lane_bits: u32,
    ) -> Result<Self, PoolError> {
        if worker_count == 0 {
            return Err(PoolError::NoThreads);
        }
        if worker_id >= worker_count {
            return Err(PoolError::WorkerOutOfRange {
                worker_id,
                worker_count,
            });
        }

        let mask = lane_mask(lane_bits);
        // More workers than lane values: this worker owns nothing
        let done = worker_id > mask;
        let last = if done {
            0
        } else {
            last_safe_offset(worker_id, worker_count, mask)
        };

        Ok(Self {
            start: start & mask,
            mask,
            stride: worker_count,
            next: worker_id,
            last,
            done,
        })
    }

    /// Offset of the final value this walker produces
    pub fn last_safe_offset(&self) -> u64 {
        self.last
    }

    /// Distance between consecutive values
    pub fn stride(&self) -> u64 {
        self.stride
    }
}

impl Iterator for BoundedStrideWalker {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.done {
            return None;
        }

        let offset = self.next;
        if offset < self.last {
            self.next = offset + self.stride;
        } else {
            self.done = true;
        }

        Some(self.start.wrapping_add(offset) & self.mask)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        let remaining = (self.last - self.next) / self.stride;
        match usize::try_from(remaining).ok().and_then(|r| r.checked_add(1)) {
            Some(n) => (n, Some(n)),
            None => (usize::MAX, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage(worker_count: u64, start: u64, bits: u32) -> Vec<u8> {
        let mut seen = vec![0u8; 1 << bits];
        for worker_id in 0..worker_count {
            let walker = BoundedStrideWalker::with_width(worker_id, worker_count, start, bits).unwrap();
            for value in walker {
                seen[value as usize] += 1;
            }
        }
        seen
    }

    #[test]
    fn test_partition_covers_16_bit_lane_exactly_once() {
        for start in [0u64, 1, 0x1234, 0xffff] {
            for worker_count in 1..=64 {
                let seen = coverage(worker_count, start, 16);
                assert!(
                    seen.iter().all(|&n| n == 1),
                    "count={} start={:#x}",
                    worker_count,
                    start
                );
            }
        }
    }

    #[test]
    fn test_more_workers_than_values() {
        let seen = coverage(8, 3, 2);
        assert_eq!(seen, vec![1, 1, 1, 1]);

        let idle = BoundedStrideWalker::with_width(6, 8, 0, 2).unwrap();
        assert_eq!(idle.count(), 0);
    }

    #[test]
    fn test_stride_order() {
        let walker = BoundedStrideWalker::with_width(1, 3, 10, 8).unwrap();
        let values: Vec<u64> = walker.take(4).collect();
        assert_eq!(values, vec![11, 14, 17, 20]);
    }

    #[test]
    fn test_value_wraps_but_offset_does_not() {
        let walker = BoundedStrideWalker::new(0, 1, u64::MAX - 1).unwrap();
        let values: Vec<u64> = walker.take(4).collect();
        assert_eq!(values, vec![u64::MAX - 1, u64::MAX, 0, 1]);
    }

    #[test]
    fn test_last_safe_offset_full_width() {
        assert_eq!(BoundedStrideWalker::new(0, 1, 0).unwrap().last_safe_offset(), u64::MAX);
        // 2^64 - 1 is divisible by 3
        assert_eq!(BoundedStrideWalker::new(0, 3, 0).unwrap().last_safe_offset(), u64::MAX);
        assert_eq!(BoundedStrideWalker::new(1, 3, 0).unwrap().last_safe_offset(), u64::MAX - 2);
        assert_eq!(BoundedStrideWalker::new(2, 3, 0).unwrap().last_safe_offset(), u64::MAX - 1);
        assert_eq!(BoundedStrideWalker::new(3, 4, 0).unwrap().last_safe_offset(), u64::MAX);
    }

    #[test]
    fn test_size_hint_matches_count() {
        let walker = BoundedStrideWalker::with_width(2, 5, 7, 10).unwrap();
        let (lower, upper) = walker.size_hint();
        let count = walker.count();
        assert_eq!(lower, count);
        assert_eq!(upper, Some(count));
    }

    #[test]
    fn test_invalid_assignment() {
        assert!(matches!(
            BoundedStrideWalker::new(0, 0, 0),
            Err(PoolError::NoThreads)
        ));
        assert!(matches!(
            BoundedStrideWalker::new(4, 4, 0),
            Err(PoolError::WorkerOutOfRange { worker_id: 4, worker_count: 4 })
        ));
    }
}
