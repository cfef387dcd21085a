//! Error types for tuishot.
//!
//! The main error type [`TuiShotError`] covers every failure mode in the
//! capture-interpret-render-compare pipeline, and [`Result<T>`] is a type
//! alias for convenience.
//!
//! Two taxonomic rules shape this enum:
//!
//! - Capture timeouts are *soft*: the overall capture budget never raises,
//!   it bounds the final drain and returns partial output. The
//!   [`TuiShotError::Timeout`] variant is only produced by hard waits such
//!   as [`crate::PtySession::wait_timeout`].
//! - Interpreter and key-encoder anomalies (malformed SGR parameters,
//!   unknown key names, invalid UTF-8 in the output stream) are absorbed
//!   locally and never surface here.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Result type alias for tuishot operations.
pub type Result<T> = std::result::Result<T, TuiShotError>;

/// Errors that can occur while capturing, rendering, or comparing
/// terminal output.
#[derive(Debug, Error)]
pub enum TuiShotError {
    /// The capture target does not exist.
    ///
    /// Raised by pre-flight validation, before any PTY is allocated.
    #[error("target not found: {path}")]
    TargetNotFound {
        /// Path that was checked.
        path: PathBuf,
    },

    /// The capture target exists but is not an executable file.
    #[error("target is not executable: {path}")]
    TargetNotExecutable {
        /// Path that was checked.
        path: PathBuf,
    },

    /// Error from PTY (pseudo-terminal) operations.
    #[error("PTY error: {0}")]
    Pty(String),

    /// Standard I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Process spawn failed.
    #[error("failed to spawn process: {0}")]
    SpawnFailed(String),

    /// A bounded wait expired.
    ///
    /// Only hard waits produce this; the capture budget itself is soft and
    /// returns whatever output was collected.
    #[error("timed out after {timeout_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// The capture completed but the target produced no output at all.
    ///
    /// Kept distinct from [`TuiShotError::Timeout`] and
    /// [`TuiShotError::TargetNotFound`] so test authors can tell a hung
    /// golden comparison apart from a silent target.
    #[error("target produced no output within the capture budget")]
    NoOutput,

    /// Invalid terminal dimensions.
    #[error("invalid terminal dimensions: width={width}, height={height}")]
    InvalidDimensions {
        /// Terminal width in columns.
        width: u16,
        /// Terminal height in rows.
        height: u16,
    },

    /// Error parsing a golden file.
    #[error("parse error: {0}")]
    Parse(String),

    /// Captured output does not match the stored golden.
    ///
    /// The message carries a unified diff (text goldens) or the pixel
    /// difference summary (image goldens).
    #[error("golden mismatch: {0}")]
    GoldenMismatch(String),

    /// Font loading or rasterization setup failed.
    ///
    /// Font *resolution* never fails (the builtin bitmap font is the
    /// terminal fallback); this covers an explicitly requested font file
    /// that cannot be used.
    #[error("font error: {0}")]
    Font(String),

    /// Image encode or decode error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

// portable-pty surfaces its failures as anyhow errors.
impl From<anyhow::Error> for TuiShotError {
    fn from(err: anyhow::Error) -> Self {
        TuiShotError::Pty(err.to_string())
    }
}
