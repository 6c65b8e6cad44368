//! Realtime-safe audio primitives: the sample ringbuffer and the prebuffer.
//!
//! Both types are pre-allocated at construction and never allocate again;
//! the ringbuffer is safe to push from a realtime thread, the prebuffer is
//! only ever touched by the writer thread.

mod prebuffer;
mod ringbuffer;

pub use prebuffer::Prebuffer;
pub use ringbuffer::{RingConsumer, RingProducer, SampleRingbuffer};
