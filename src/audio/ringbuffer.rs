// Single-producer/single-consumer sample ringbuffer.
//
// Wraps `rtrb::RingBuffer<f32>` (the crate's lock-free SPSC primitive,
// also used by the buffer-pool pattern this crate's teacher reaches for)
// with the push/peek/read_advance contract the capture engine needs:
// push never blocks or allocates, peek exposes the readable region
// without advancing the read cursor, and read_advance commits a prior
// peek. `write_available() + read_available()` always equals the
// ringbuffer's capacity.

use rtrb::RingBuffer;

/// Fixed-capacity SPSC sample ringbuffer. Construct with [`SampleRingbuffer::new`]
/// to obtain a producer/consumer pair; there is no shared handle because
/// the realtime thread and the writer thread never touch the same half.
pub struct SampleRingbuffer;

impl SampleRingbuffer {
    /// Create a ringbuffer with room for `capacity` samples and split it
    /// into its producer and consumer halves.
    pub fn new(capacity: usize) -> (RingProducer, RingConsumer) {
        assert!(capacity > 0, "ringbuffer capacity must be greater than 0");
        let (producer, consumer) = RingBuffer::<f32>::new(capacity);
        (
            RingProducer { producer, capacity },
            RingConsumer { consumer, capacity },
        )
    }
}

/// Producer half, owned by the realtime audio thread.
pub struct RingProducer {
    producer: rtrb::Producer<f32>,
    capacity: usize,
}

impl RingProducer {
    /// Number of samples that could currently be pushed without loss.
    pub fn write_available(&self) -> usize {
        self.producer.slots()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Push up to `src.len()` samples. Never blocks or allocates. Returns
    /// the number of samples actually accepted; if this is less than
    /// `src.len()`, the caller has overrun the ringbuffer and the excess
    /// samples are lost.
    pub fn push(&mut self, src: &[f32]) -> usize {
        let accepted = src.len().min(self.producer.slots());
        if accepted == 0 {
            return 0;
        }
        match self.producer.write_chunk(accepted) {
            Ok(mut chunk) => {
                let (a, b) = chunk.as_mut_slices();
                a.copy_from_slice(&src[..a.len()]);
                b.copy_from_slice(&src[a.len()..a.len() + b.len()]);
                chunk.commit_all();
                accepted
            }
            // Another thread can only ever increase available slots between
            // the slots() check and here, never shrink it, so this arm is
            // unreachable in the SPSC contract; treat it as zero accepted
            // rather than panicking.
            Err(_) => 0,
        }
    }
}

/// Consumer half, owned by the non-realtime writer thread.
pub struct RingConsumer {
    consumer: rtrb::Consumer<f32>,
    capacity: usize,
}

impl RingConsumer {
    /// Number of samples currently available to read.
    pub fn read_available(&self) -> usize {
        self.consumer.slots()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copy the entire readable region into `dst` (which is cleared
    /// first), in production order, without advancing the read cursor.
    /// Returns the number of samples copied.
    pub fn peek_into(&mut self, dst: &mut Vec<f32>) -> usize {
        dst.clear();
        let n = self.consumer.slots();
        if n == 0 {
            return 0;
        }
        if let Ok(chunk) = self.consumer.read_chunk(n) {
            let (a, b) = chunk.as_slices();
            dst.extend_from_slice(a);
            dst.extend_from_slice(b);
            // Dropping `chunk` without committing leaves the read cursor
            // untouched, matching `peek`'s non-advancing contract.
        }
        dst.len()
    }

    /// Advance the read cursor by `n` samples, committing a prior peek.
    /// `n` must not exceed `read_available()`.
    pub fn read_advance(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        let n = n.min(self.consumer.slots());
        if let Ok(chunk) = self.consumer.read_chunk(n) {
            chunk.commit_all();
        }
    }
}
