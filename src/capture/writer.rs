// The triggered writer: realtime push on one side, non-realtime flush on
// the other, split into two handles so the borrow checker enforces the
// ownership split the concurrency model requires (§5: the realtime
// callback holds only the producer end; the writer thread exclusively
// owns the prebuffer, gate, and consumer end).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Local;

use crate::analysis::{Gate, GateState};
use crate::audio::{Prebuffer, RingConsumer, RingProducer, SampleRingbuffer};
use crate::capture::event::Event;
use crate::error::{log_capture_error, CaptureError};
use crate::io::{SoundFileWriter, TemplateExpander, TemplateVars};

struct OverrunFlag {
    requested: AtomicU64,
    accepted: AtomicU64,
    pending: AtomicBool,
}

impl OverrunFlag {
    fn new() -> Self {
        OverrunFlag {
            requested: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            pending: AtomicBool::new(false),
        }
    }

    fn raise(&self, requested: usize, accepted: usize) {
        self.requested.store(requested as u64, Ordering::Relaxed);
        self.accepted.store(accepted as u64, Ordering::Relaxed);
        self.pending.store(true, Ordering::Release);
    }

    fn take(&self) -> Option<(usize, usize)> {
        if self.pending.swap(false, Ordering::Acquire) {
            Some((
                self.requested.load(Ordering::Relaxed) as usize,
                self.accepted.load(Ordering::Relaxed) as usize,
            ))
        } else {
            None
        }
    }
}

/// Realtime-thread handle. Owns only the ringbuffer producer and a
/// try-lock snapshot of the last frame time; never blocks, allocates, or
/// performs I/O.
pub struct CaptureProducer {
    producer: RingProducer,
    last_frame_time: Arc<Mutex<u64>>,
    overrun: Arc<OverrunFlag>,
}

impl CaptureProducer {
    /// Push one block of samples. `frame_time_start` is the absolute
    /// sample index of `samples[0]`.
    pub fn on_process(&mut self, samples: &[f32], frame_time_start: u64) {
        let accepted = self.producer.push(samples);
        if accepted < samples.len() {
            self.overrun.raise(samples.len(), accepted);
        }
        if let Ok(mut t) = self.last_frame_time.try_lock() {
            *t = frame_time_start + samples.len() as u64;
        }
        // Contention on `last_frame_time` just means a stale read next
        // time; tolerated per the realtime contract.
    }
}

/// Writer-thread handle: the orchestrator. Owns the ringbuffer consumer,
/// the gate, the prebuffer, and the external writer/expander.
pub struct TriggeredWriter<W, T> {
    consumer: RingConsumer,
    gate: Gate,
    prebuffer: Prebuffer,
    writer: W,
    expander: T,
    template: String,
    program: String,
    enabled: bool,
    entry_counter: u64,
    current_path: Option<PathBuf>,
    segment_frames: u64,
    last_frame_time: Arc<Mutex<u64>>,
    overrun: Arc<OverrunFlag>,
    scratch: Vec<f32>,
}

#[allow(clippy::too_many_arguments)]
pub fn build<W: SoundFileWriter, T: TemplateExpander>(
    ringbuffer_capacity: usize,
    prebuffer_capacity: usize,
    gate: Gate,
    writer: W,
    expander: T,
    template: impl Into<String>,
    program: impl Into<String>,
) -> (CaptureProducer, TriggeredWriter<W, T>) {
    let (producer, consumer) = SampleRingbuffer::new(ringbuffer_capacity);
    let last_frame_time = Arc::new(Mutex::new(0));
    let overrun = Arc::new(OverrunFlag::new());

    let capture_producer = CaptureProducer {
        producer,
        last_frame_time: Arc::clone(&last_frame_time),
        overrun: Arc::clone(&overrun),
    };

    let triggered_writer = TriggeredWriter {
        consumer,
        gate,
        prebuffer: Prebuffer::new(prebuffer_capacity),
        writer,
        expander,
        template: template.into(),
        program: program.into(),
        enabled: true,
        entry_counter: 0,
        current_path: None,
        segment_frames: 0,
        last_frame_time,
        overrun,
        scratch: Vec::new(),
    };

    (capture_producer, triggered_writer)
}

impl<W: SoundFileWriter, T: TemplateExpander> TriggeredWriter<W, T> {
    /// Suspend (`false`) or resume (`true`) capture without tearing down
    /// the pipeline. While disabled, `flush` keeps draining the
    /// ringbuffer into the prebuffer so it never backs up; the gate is
    /// not fed at all.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled && !enabled {
            let _ = self.close_current(self.frame_time_snapshot());
        }
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current gate state, exposed for monitoring/testing; not needed by
    /// the realtime path.
    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    fn frame_time_snapshot(&self) -> u64 {
        *self
            .last_frame_time
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn open_entry(&mut self) -> Result<PathBuf, CaptureError> {
        let now = Local::now();
        let vars = TemplateVars::from_wall_time(now, self.entry_counter, 0);
        let filename = self.expander.expand(&self.template, &vars);
        match self.writer.open_entry(&filename) {
            Ok(path) => {
                self.entry_counter += 1;
                self.segment_frames = 0;
                self.current_path = Some(path.clone());
                Ok(path)
            }
            Err(err) => {
                log_capture_error(&err, "open_entry");
                // Forced back to Closed without a GateOpen event, per
                // the OpenFailed handling contract.
                self.gate.force_close();
                Err(err)
            }
        }
    }

    fn write_checked(&mut self, samples: &[f32]) -> Result<(), CaptureError> {
        if samples.is_empty() {
            return Ok(());
        }
        match self.writer.write(samples) {
            Ok(written) if written == samples.len() => {
                self.segment_frames += written as u64;
                Ok(())
            }
            Ok(written) => {
                self.segment_frames += written as u64;
                let err = CaptureError::WriteShort {
                    requested: samples.len(),
                    written,
                };
                log_capture_error(&err, "write");
                self.close_current(self.frame_time_snapshot())?;
                Err(err)
            }
            Err(err) => {
                log_capture_error(&err, "write");
                self.close_current(self.frame_time_snapshot())?;
                Err(err)
            }
        }
    }

    fn close_current(&mut self, sample_time: u64) -> Result<Option<PathBuf>, CaptureError> {
        if self.current_path.is_none() {
            return Ok(None);
        }
        self.writer.close_entry()?;
        let path = self.current_path.take();
        self.gate.force_close();
        self.log_event(Event::gate_close(sample_time, Some(Local::now())));
        Ok(path)
    }

    fn log_event(&self, event: Event) {
        log::info!("{}", event.format_line(&self.program));
    }

    /// Close the current entry if one is open. Idempotent when closed.
    pub fn close_entry(&mut self) -> Result<Option<PathBuf>, CaptureError> {
        let sample_time = self.frame_time_snapshot();
        self.close_current(sample_time)
    }

    /// Drain the ringbuffer once, run the gate, and drive the prebuffer
    /// and external writer accordingly. Returns the path of a file
    /// opened or closed during this call, if any.
    pub fn flush(&mut self) -> Result<Option<PathBuf>, CaptureError> {
        let mut result_path = None;

        if let Some((requested, accepted)) = self.overrun.take() {
            let err = CaptureError::Overrun { requested, accepted };
            log_capture_error(&err, "flush");
            match self.close_current(self.frame_time_snapshot()) {
                Ok(Some(path)) => result_path = Some(path),
                Ok(None) => {}
                Err(e) => log_capture_error(&e, "flush"),
            }
        }

        let mut span = std::mem::take(&mut self.scratch);
        let n = self.consumer.peek_into(&mut span);
        if n == 0 {
            self.scratch = span;
            return Ok(result_path);
        }

        let frame_time_now = self.frame_time_snapshot();

        if !self.enabled {
            self.prebuffer.push_block(&span);
            self.consumer.read_advance(n);
            self.scratch = span;
            return Ok(result_path);
        }

        let prev_state = self.gate.state();
        let offset = self.gate.push(&span);
        let new_state = self.gate.state();

        match (prev_state, new_state, offset) {
            (GateState::Closed, GateState::Closed, None) => {
                self.prebuffer.push_block(&span);
            }
            (GateState::Open, GateState::Open, None) => {
                // Write errors are logged and close the segment inside
                // write_checked; nothing further to do here.
                let _ = self.write_checked(&span);
            }
            (GateState::Closed, GateState::Open, Some(offset)) => {
                if let Ok(path) = self.open_entry() {
                    let mut lead_in = Vec::new();
                    self.prebuffer.snapshot_into(&mut lead_in);
                    let _ = self.write_checked(&lead_in);
                    let _ = self.write_checked(&span[offset..]);
                    let sample_time = frame_time_now.saturating_sub((n - offset) as u64);
                    self.log_event(Event::gate_open(sample_time, Some(Local::now())));
                    self.prebuffer.clear();
                    result_path = Some(path);
                }
                // On OpenFailed, open_entry already logged the error and
                // forced the gate back to Closed without a GateOpen.
            }
            (GateState::Open, GateState::Closed, Some(offset)) => {
                let _ = self.write_checked(&span[..offset]);
                let sample_time = frame_time_now.saturating_sub((n - offset) as u64);
                match self.close_current(sample_time) {
                    Ok(Some(path)) => result_path = Some(path),
                    Ok(None) => {}
                    Err(e) => log_capture_error(&e, "flush"),
                }
                self.prebuffer.push_block(&span[offset..]);
            }
            // Unreachable given Gate::push's contract (state changes
            // exactly with a Some(offset) return), kept to make the
            // match exhaustive rather than panicking on drift.
            _ => {}
        }

        self.consumer.read_advance(n);
        self.scratch = span;
        Ok(result_path)
    }
}
