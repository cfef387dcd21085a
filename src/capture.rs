//! High-level capture of a TUI application's rendered output.
//!
//! [`capture`] drives one target program through one PTY: spawn, settle,
//! drain, type, drain again, and tear down. The returned string is the
//! lossy-UTF-8 decode of every byte the target wrote, ANSI escapes
//! included, byte-faithful otherwise. That artifact feeds
//! [`crate::ansi::interpret`] and can be stored for offline reprocessing.
//!
//! The overall timeout is *soft*: a target that never exits does not make
//! the capture fail, it just bounds the final drain pass, and whatever was
//! collected is returned. The child process is guaranteed terminated before
//! `capture` returns on every path, success or error.
//!
//! # Example
//!
//! ```rust,no_run
//! use tuishot::capture::{capture, CaptureConfig};
//!
//! # fn main() -> tuishot::Result<()> {
//! let raw = capture("./my-tui-app", "jj<enter>", &CaptureConfig::default())?;
//! assert!(raw.contains("\x1b["));
//! # Ok(())
//! # }
//! ```

use std::{
    path::Path,
    thread,
    time::{Duration, Instant},
};

use portable_pty::CommandBuilder;

use crate::{
    error::{Result, TuiShotError},
    keys::encode_keys,
    pty::PtySession,
};

/// Timing and geometry parameters for a capture.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Terminal width in columns.
    pub width: u16,
    /// Terminal height in rows.
    pub height: u16,
    /// Overall wall-clock budget. Soft: bounds the final drain pass.
    pub timeout: Duration,
    /// Wait for the target to finish rendering before each drain pass.
    pub settle: Duration,
    /// Quiescence window for output draining.
    pub poll_interval: Duration,
    /// Pause between injected keystrokes, emulating typing cadence.
    pub key_delay: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
            timeout: Duration::from_secs(5),
            settle: Duration::from_millis(500),
            poll_interval: Duration::from_millis(100),
            key_delay: Duration::from_millis(100),
        }
    }
}

/// Captures the terminal output of `target`, optionally typing `keys`.
///
/// The target is launched with no arguments, its stdin/stdout/stderr on the
/// PTY slave, in its own process group, with `TERM=xterm-256color` and
/// `COLUMNS`/`LINES` matching the configured size.
///
/// A target that exits on its own mid-capture is not an error; the drain
/// passes simply see EOF and the partial output is returned.
///
/// # Errors
///
/// - [`TuiShotError::TargetNotFound`] / [`TuiShotError::TargetNotExecutable`]
///   from pre-flight validation, before any PTY is allocated.
/// - [`TuiShotError::SpawnFailed`] / [`TuiShotError::Pty`] for launch
///   failures.
/// - [`TuiShotError::NoOutput`] when the target wrote nothing at all within
///   the budget.
pub fn capture(
    target: impl AsRef<Path>,
    keys: &str,
    config: &CaptureConfig,
) -> Result<String> {
    let target = target.as_ref();
    preflight(target)?;

    let mut cmd = CommandBuilder::new(target);
    cmd.env("TERM", "xterm-256color");
    cmd.env("COLUMNS", config.width.to_string());
    cmd.env("LINES", config.height.to_string());
    if let Ok(cwd) = std::env::current_dir() {
        cmd.cwd(cwd);
    }

    let start = Instant::now();
    // Teardown is guaranteed from here on: the session's Drop terminates
    // the process group even if an early return fires below.
    let mut session = PtySession::spawn(cmd, config.width, config.height)?;

    let mut output: Vec<u8> = Vec::new();

    // Initial render.
    thread::sleep(config.settle);
    output.extend(session.drain_quiet(config.poll_interval));

    if !keys.is_empty() {
        for bytes in encode_keys(keys) {
            // A write failure means the child is gone; what was captured
            // so far is still the result.
            if session.write_all(&bytes).is_err() {
                break;
            }
            thread::sleep(config.key_delay);
        }
        thread::sleep(config.settle);
        output.extend(session.drain_quiet(config.poll_interval));
    }

    // Final pass, bounded by whatever remains of the budget.
    let remaining = config.timeout.saturating_sub(start.elapsed());
    if !remaining.is_zero() {
        thread::sleep(remaining.min(config.settle));
        output.extend(session.drain_quiet(config.poll_interval));
    }

    session.terminate();

    if output.is_empty() {
        return Err(TuiShotError::NoOutput);
    }

    Ok(String::from_utf8_lossy(&output).into_owned())
}

/// Validates the target path before any resource allocation.
fn preflight(target: &Path) -> Result<()> {
    let meta = match std::fs::metadata(target) {
        Ok(meta) => meta,
        Err(_) => {
            return Err(TuiShotError::TargetNotFound { path: target.to_path_buf() });
        }
    };

    if !meta.is_file() {
        return Err(TuiShotError::TargetNotExecutable { path: target.to_path_buf() });
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 == 0 {
            return Err(TuiShotError::TargetNotExecutable { path: target.to_path_buf() });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_target_fails_fast() {
        let err = capture("/no/such/binary", "", &CaptureConfig::default()).unwrap_err();
        assert!(matches!(err, TuiShotError::TargetNotFound { .. }));
    }

    #[test]
    fn directory_is_not_executable() {
        let err = capture("/tmp", "", &CaptureConfig::default()).unwrap_err();
        assert!(matches!(err, TuiShotError::TargetNotExecutable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_file_is_rejected() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not a program").unwrap();

        let err = capture(file.path(), "", &CaptureConfig::default()).unwrap_err();
        assert!(matches!(err, TuiShotError::TargetNotExecutable { .. }));
    }

    #[test]
    fn default_config_matches_documented_cadence() {
        let config = CaptureConfig::default();
        assert_eq!(config.width, 80);
        assert_eq!(config.height, 24);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.settle, Duration::from_millis(500));
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.key_delay, Duration::from_millis(100));
    }
}
