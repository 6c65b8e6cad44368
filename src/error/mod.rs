// Error types for the triggered capture engine.
//
// Mirrors the structured-error-code convention used throughout the
// capture pipeline: one enum per concern, a numeric code range for
// programmatic handling, and a logging helper that formats a single
// line through the `log` facade.

mod capture;

pub use capture::{log_capture_error, CaptureError, CaptureErrorCodes};

/// Standard way to get an error code and message from a crate error type.
pub trait ErrorCode {
    /// Numeric error code.
    fn code(&self) -> i32;

    /// Human-readable error message.
    fn message(&self) -> String;
}
