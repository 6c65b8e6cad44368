// Fixed-capacity pre-onset context buffer.
//
// The writer thread feeds every sample it drains from the ringbuffer
// through the prebuffer before the gate decides whether it is part of a
// triggered segment. While the gate is closed, this is the only record
// of recent audio; when the gate opens, its contents become the lead-in
// written ahead of the trigger sample. Backed by a `VecDeque` sized once
// at construction, the same way the teacher's config layer pre-sizes
// its buffers up front rather than growing them on the fly.

use std::collections::VecDeque;

/// Ring of the most recent `capacity` samples, oldest evicted first.
pub struct Prebuffer {
    ring: VecDeque<f32>,
    capacity: usize,
}

impl Prebuffer {
    pub fn new(capacity: usize) -> Self {
        Prebuffer {
            ring: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of samples currently held (less than capacity until primed).
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Push one sample, evicting the oldest if already at capacity.
    pub fn push(&mut self, sample: f32) {
        if self.capacity == 0 {
            return;
        }
        if self.ring.len() == self.capacity {
            self.ring.pop_front();
        }
        self.ring.push_back(sample);
    }

    /// Push a whole block of samples in order.
    pub fn push_block(&mut self, samples: &[f32]) {
        for &s in samples {
            self.push(s);
        }
    }

    /// Copy the buffer's full contents, oldest-first, into `dst` (which is
    /// cleared first). Does not consume or reorder the buffer.
    pub fn snapshot_into(&self, dst: &mut Vec<f32>) {
        dst.clear();
        dst.extend(self.ring.iter().copied());
    }

    /// Drop every held sample without changing capacity.
    pub fn clear(&mut self) {
        self.ring.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_below_capacity_keeps_everything() {
        let mut pb = Prebuffer::new(4);
        pb.push_block(&[1.0, 2.0, 3.0]);
        let mut dst = Vec::new();
        pb.snapshot_into(&mut dst);
        assert_eq!(dst, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn push_past_capacity_evicts_oldest() {
        let mut pb = Prebuffer::new(4);
        pb.push_block(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let mut dst = Vec::new();
        pb.snapshot_into(&mut dst);
        assert_eq!(dst, vec![3.0, 4.0, 5.0, 6.0]);
        assert_eq!(pb.len(), 4);
    }

    #[test]
    fn zero_capacity_holds_nothing() {
        let mut pb = Prebuffer::new(0);
        pb.push_block(&[1.0, 2.0, 3.0]);
        assert_eq!(pb.len(), 0);
        assert!(pb.is_empty());
    }

    #[test]
    fn clear_empties_without_changing_capacity() {
        let mut pb = Prebuffer::new(4);
        pb.push_block(&[1.0, 2.0, 3.0]);
        pb.clear();
        assert!(pb.is_empty());
        assert_eq!(pb.capacity(), 4);
    }
}
