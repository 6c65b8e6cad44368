//! The triggered writer: the orchestrator that ties the ringbuffer, gate,
//! and prebuffer to an external sound-file writer, plus the event type it
//! emits on gate transitions.

mod event;
mod writer;

pub use event::{Event, EventKind};
pub use writer::{build, CaptureProducer, TriggeredWriter};
