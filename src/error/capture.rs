// Capture-engine error types and constants.
//
// Error code range: 2001-2010.

use std::fmt;

use log::error;

use super::ErrorCode;

/// Error code constants for [`CaptureError`].
pub struct CaptureErrorCodes {}

impl CaptureErrorCodes {
    /// The realtime ringbuffer could not accept all pushed frames.
    pub const OVERRUN: i32 = 2001;

    /// The sound-file writer wrote fewer frames than requested.
    pub const WRITE_SHORT: i32 = 2002;

    /// The sound-file writer signaled an I/O error.
    pub const WRITE_FAILED: i32 = 2003;

    /// A new output file could not be created.
    pub const OPEN_FAILED: i32 = 2004;

    /// A quota-interval line could not be parsed; the line was skipped.
    pub const BAD_QUOTA_LINE: i32 = 2005;

    /// A mutex/lock used for cross-thread snapshots was poisoned.
    pub const LOCK_POISONED: i32 = 2006;
}

/// Errors produced by the capture pipeline.
///
/// `Overrun`, `WriteShort`, and `WriteFailed` are all fatal to the
/// current segment, never to the process: the writer closes the entry
/// (if open) and the pipeline continues on the next `flush`.
/// `ShutdownRequested` is not represented here — it is a control signal
/// (an `AtomicBool` consulted by the mainloop), not an error value.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureError {
    /// The ringbuffer accepted fewer frames than the realtime thread pushed.
    Overrun { requested: usize, accepted: usize },

    /// The sound-file writer wrote fewer frames than requested.
    WriteShort { requested: usize, written: usize },

    /// The sound-file writer failed outright.
    WriteFailed { reason: String },

    /// Opening the next output file failed.
    OpenFailed { reason: String },

    /// A line in the quota-interval file could not be parsed.
    BadQuotaLine { line: String },

    /// A lock used for cross-thread state snapshots was poisoned.
    LockPoisoned { component: String },
}

impl ErrorCode for CaptureError {
    fn code(&self) -> i32 {
        match self {
            CaptureError::Overrun { .. } => CaptureErrorCodes::OVERRUN,
            CaptureError::WriteShort { .. } => CaptureErrorCodes::WRITE_SHORT,
            CaptureError::WriteFailed { .. } => CaptureErrorCodes::WRITE_FAILED,
            CaptureError::OpenFailed { .. } => CaptureErrorCodes::OPEN_FAILED,
            CaptureError::BadQuotaLine { .. } => CaptureErrorCodes::BAD_QUOTA_LINE,
            CaptureError::LockPoisoned { .. } => CaptureErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            CaptureError::Overrun {
                requested,
                accepted,
            } => format!(
                "ringbuffer overrun: accepted {accepted} of {requested} requested frames"
            ),
            CaptureError::WriteShort { requested, written } => {
                format!("short write: wrote {written} of {requested} requested frames")
            }
            CaptureError::WriteFailed { reason } => format!("write failed: {reason}"),
            CaptureError::OpenFailed { reason } => format!("failed to open entry: {reason}"),
            CaptureError::BadQuotaLine { line } => {
                format!("could not parse quota interval line: {line:?}")
            }
            CaptureError::LockPoisoned { component } => format!("lock poisoned on {component}"),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CaptureError(code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for CaptureError {}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::WriteFailed {
            reason: err.to_string(),
        }
    }
}

/// Log a capture error with its numeric code and the context it occurred in.
pub fn log_capture_error(err: &CaptureError, context: &str) {
    error!(
        "capture error in {}: code={}, message={}",
        context,
        err.code(),
        err.message()
    );
}
