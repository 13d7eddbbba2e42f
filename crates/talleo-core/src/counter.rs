//! Multi-lane big-number counter over key material
//!
//! A key is a run of little-endian 64-bit lanes: lane 0 is the least
//! significant and the last lane is the outermost one, which workers split
//! between themselves with a [`BoundedStrideWalker`](crate::BoundedStrideWalker).
//! Every inner lane sweeps its whole local range `start, start + 1, ...,
//! start - 1` (mod 2^bits) before carrying into the next lane.

use crate::walker::lane_mask;

/// Lanes in one 32-byte secret key
pub const KEY_LANES: usize = 4;

/// Convert a 32-byte key into its four little-endian lanes
pub fn lanes_from_key(key: &[u8; 32]) -> [u64; KEY_LANES] {
    let mut lanes = [0u64; KEY_LANES];
    for (lane, chunk) in lanes.iter_mut().zip(key.chunks_exact(8)) {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        *lane = u64::from_le_bytes(word);
    }
    lanes
}

/// Convert four lanes back into a 32-byte key
pub fn key_from_lanes(lanes: &[u64]) -> [u8; 32] {
    let mut key = [0u8; 32];
    for (chunk, lane) in key.chunks_exact_mut(8).zip(lanes) {
        chunk.copy_from_slice(&lane.to_le_bytes());
    }
    key
}

#[derive(Debug, Clone)]
pub struct MultiWordCounter {
    start: Vec<u64>,
    offsets: Vec<u64>,
    values: Vec<u64>,
    mask: u64,
}

impl MultiWordCounter {
    /// Counter positioned at `start`, every lane `lane_bits` wide
    pub fn new(start: &[u64], lane_bits: u32) -> Self {
        let mask = lane_mask(lane_bits);
        let start: Vec<u64> = start.iter().map(|lane| lane & mask).collect();

        Self {
            offsets: vec![0; start.len()],
            values: start.clone(),
            start,
            mask,
        }
    }

    pub fn lane_count(&self) -> usize {
        self.values.len()
    }

    /// Index of the outermost (most significant) lane
    pub fn outer_lane(&self) -> usize {
        self.values.len().saturating_sub(1)
    }

    /// Current value of every lane, least significant first
    pub fn lanes(&self) -> &[u64] {
        &self.values
    }

    /// Add `delta` to one lane, wrapping within the lane.
    ///
    /// Returns `true` when the lane wrapped past the end of its local range
    /// (a carry into the next lane). The carry is reported, not applied.
    pub fn increment(&mut self, lane: usize, delta: u64) -> bool {
        let delta = delta & self.mask;
        let offset = self.offsets[lane];
        let carry = offset > self.mask - delta;
        self.set_offset(lane, offset.wrapping_add(delta) & self.mask);
        carry
    }

    /// Move one lane to the last value of its local range (`start - 1`),
    /// the position it holds just before borrowing from the next lane.
    pub fn borrow_decrement(&mut self, lane: usize) -> u64 {
        self.set_offset(lane, self.mask);
        self.values[lane]
    }

    /// Advance the inner lanes by one, carrying least to most significant.
    ///
    /// Returns `false` once every inner lane has wrapped back to its start,
    /// i.e. the inner range under the current outer value is exhausted.
    pub fn step(&mut self) -> bool {
        for lane in 0..self.outer_lane() {
            if !self.increment(lane, 1) {
                return true;
            }
        }
        false
    }

    /// Pin a lane to an absolute value
    pub fn set_lane(&mut self, lane: usize, value: u64) {
        let value = value & self.mask;
        self.set_offset(lane, value.wrapping_sub(self.start[lane]) & self.mask);
    }

    /// Reset every inner lane to its start value
    pub fn rewind_inner(&mut self) {
        for lane in 0..self.outer_lane() {
            self.set_offset(lane, 0);
        }
    }

    fn set_offset(&mut self, lane: usize, offset: u64) {
        self.offsets[lane] = offset;
        self.values[lane] = self.start[lane].wrapping_add(offset) & self.mask;
    }
}
