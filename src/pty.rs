//! PTY (pseudo-terminal) session management.
//!
//! This module wraps `portable-pty` in a [`PtySession`] that owns one PTY
//! pair, one child process, and one reader pump for the session's lifetime.
//! The slave side is dropped immediately after spawn so that only the child
//! holds it open; when the child's last descriptor closes, the pump sees
//! EOF and the output channel disconnects cleanly.
//!
//! Output draining is cooperative bounded-wait polling: the pump thread
//! forwards raw chunks into an `mpsc` channel, and [`drain_until_quiet`]
//! polls that channel with a short timeout, treating an empty poll window
//! as "output has quiesced for now" rather than end-of-stream.
//!
//! Teardown is guaranteed and idempotent: [`PtySession::terminate`] signals
//! the child's whole process group, reaps it with a bounded wait, escalates
//! to a hard kill if needed, and runs again from `Drop` if the owner never
//! called it.

use std::{
    io::{ErrorKind, Read, Write},
    sync::mpsc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use portable_pty::{Child, CommandBuilder, ExitStatus, MasterPty, PtySize};

use crate::error::{Result, TuiShotError};

/// Read chunk size for the output pump.
const READ_CHUNK_SIZE: usize = 8192;

/// Poll interval for bounded process waits.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Grace period between SIGTERM and the hard-kill escalation.
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// A live pseudo-terminal session around one child process.
pub struct PtySession {
    // Held for the session's lifetime so the PTY stays open; reads and
    // writes go through the cloned reader and taken writer.
    _master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
    output_rx: mpsc::Receiver<Vec<u8>>,
    pump: Option<JoinHandle<()>>,
    exit_status: Option<ExitStatus>,
    terminated: bool,
}

impl std::fmt::Debug for PtySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtySession")
            .field("pid", &self.child.process_id())
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}

impl PtySession {
    /// Spawns `cmd` attached to a fresh PTY of the given size.
    ///
    /// The PTY window size is set before the child inherits it, so programs
    /// that size themselves from the terminal see `width` x `height` from
    /// their first ioctl. Environment variables (`TERM`, `COLUMNS`,
    /// `LINES`) are the caller's responsibility via the `CommandBuilder`.
    ///
    /// # Errors
    ///
    /// Returns [`TuiShotError::InvalidDimensions`] for a zero dimension,
    /// [`TuiShotError::Pty`] if PTY allocation fails, and
    /// [`TuiShotError::SpawnFailed`] if the process cannot be started.
    pub fn spawn(cmd: CommandBuilder, width: u16, height: u16) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(TuiShotError::InvalidDimensions { width, height });
        }

        let pty_system = portable_pty::native_pty_system();
        let pair = pty_system.openpty(PtySize {
            rows: height,
            cols: width,
            pixel_width: 0,
            pixel_height: 0,
        })?;

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| TuiShotError::SpawnFailed(e.to_string()))?;

        // Only the child keeps the slave open from here on; master reads
        // will see EOF once the child's last handle closes.
        drop(pair.slave);

        let writer = pair.master.take_writer()?;
        let mut reader = pair.master.try_clone_reader()?;

        let (tx, output_rx) = mpsc::channel::<Vec<u8>>();
        let pump = thread::Builder::new()
            .name("tuishot-pty-pump".to_owned())
            .spawn(move || loop {
                let mut chunk = vec![0u8; READ_CHUNK_SIZE];
                match reader.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        chunk.truncate(n);
                        if tx.send(chunk).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            })
            .map_err(TuiShotError::Io)?;

        Ok(Self {
            _master: pair.master,
            writer,
            child,
            output_rx,
            pump: Some(pump),
            exit_status: None,
            terminated: false,
        })
    }

    /// Drains all output that is currently flowing, stopping at the first
    /// quiet poll window. See [`drain_until_quiet`].
    pub fn drain_quiet(&mut self, poll_interval: Duration) -> Vec<u8> {
        let (bytes, _eof) = drain_until_quiet(&self.output_rx, poll_interval);
        bytes
    }

    /// Writes raw input bytes to the PTY master, retrying on EINTR.
    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        loop {
            match self.writer.write_all(data) {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(TuiShotError::Io(e)),
            }
        }
    }

    /// Checks whether the child process is still running, caching the exit
    /// status once it has exited.
    pub fn is_running(&mut self) -> bool {
        if self.exit_status.is_some() {
            return false;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.exit_status = Some(status);
                false
            }
            Ok(None) => true,
            Err(_) => false,
        }
    }

    /// Waits for the child to exit, polling up to `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TuiShotError::Timeout`] if the child is still running when
    /// the timeout expires.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<ExitStatus> {
        let start = Instant::now();
        loop {
            if let Some(status) = &self.exit_status {
                return Ok(status.clone());
            }
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    self.exit_status = Some(status.clone());
                    return Ok(status);
                }
                Ok(None) => {
                    if start.elapsed() >= timeout {
                        return Err(TuiShotError::Timeout {
                            timeout_ms: timeout.as_millis() as u64,
                        });
                    }
                    thread::sleep(WAIT_POLL_INTERVAL);
                }
                Err(e) => return Err(TuiShotError::Pty(e.to_string())),
            }
        }
    }

    /// The child's exit status, if it has been observed to exit.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status.clone()
    }

    /// Terminates the child and releases the PTY. Idempotent.
    ///
    /// The termination signal goes to the child's process group, not just
    /// the child, so grandchildren the target may have spawned are not
    /// orphaned. A graceful signal comes first; if the group has not been
    /// reaped within a short grace period, the child is hard-killed.
    pub fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;

        if self.exit_status.is_none() {
            match self.child.try_wait() {
                Ok(Some(status)) => self.exit_status = Some(status),
                _ => {
                    signal_group_term(self.child.process_id());
                    if self.wait_timeout(TERMINATE_GRACE).is_err() {
                        let _ = self.child.kill();
                        let _ = self.wait_timeout(TERMINATE_GRACE);
                    }
                }
            }
        }

        // The pump exits on its own once the dead group's slave side
        // closes; the handle is dropped rather than joined so teardown
        // cannot block on a straggler holding the slave open.
        self.pump.take();
    }
}

impl Drop for PtySession {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Sends SIGTERM to the process group led by `pid`.
///
/// The PTY child is its session and group leader (the PTY layer calls
/// setsid before exec), so the group id equals the child pid.
#[cfg(unix)]
#[allow(unsafe_code)]
fn signal_group_term(pid: Option<u32>) {
    if let Some(pid) = pid {
        unsafe {
            libc::killpg(pid as libc::pid_t, libc::SIGTERM);
        }
    }
}

#[cfg(not(unix))]
fn signal_group_term(_pid: Option<u32>) {}

/// Accumulates output chunks until a poll window comes up empty.
///
/// Each iteration waits up to `poll_interval` for the next chunk. An empty
/// window means the stream has quiesced *for now*, not that it has ended,
/// so the caller may drain again later. The returned flag is true when the
/// channel has disconnected, i.e. the producer saw real EOF.
///
/// Parameterized by a plain channel receiver so the quiescence logic is
/// testable without an OS descriptor.
pub fn drain_until_quiet(
    rx: &mpsc::Receiver<Vec<u8>>,
    poll_interval: Duration,
) -> (Vec<u8>, bool) {
    let mut bytes = Vec::new();
    loop {
        match rx.recv_timeout(poll_interval) {
            Ok(chunk) => bytes.extend_from_slice(&chunk),
            Err(mpsc::RecvTimeoutError::Timeout) => return (bytes, false),
            Err(mpsc::RecvTimeoutError::Disconnected) => return (bytes, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_dimensions_rejected() {
        let cmd = CommandBuilder::new("true");
        assert!(matches!(
            PtySession::spawn(cmd, 0, 24),
            Err(TuiShotError::InvalidDimensions { .. })
        ));

        let cmd = CommandBuilder::new("true");
        assert!(matches!(
            PtySession::spawn(cmd, 80, 0),
            Err(TuiShotError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn drain_stops_on_quiet_window() {
        let (tx, rx) = mpsc::channel();
        tx.send(b"abc".to_vec()).unwrap();
        tx.send(b"def".to_vec()).unwrap();

        let (bytes, eof) = drain_until_quiet(&rx, Duration::from_millis(20));
        assert_eq!(bytes, b"abcdef");
        // Sender still alive: quiet, not EOF.
        assert!(!eof);
    }

    #[test]
    fn drain_reports_eof_on_disconnect() {
        let (tx, rx) = mpsc::channel();
        tx.send(b"tail".to_vec()).unwrap();
        drop(tx);

        let (bytes, eof) = drain_until_quiet(&rx, Duration::from_millis(20));
        assert_eq!(bytes, b"tail");
        assert!(eof);
    }

    #[test]
    fn drain_empty_channel_is_quiet() {
        let (_tx, rx) = mpsc::channel::<Vec<u8>>();
        let start = Instant::now();
        let (bytes, eof) = drain_until_quiet(&rx, Duration::from_millis(50));
        assert!(bytes.is_empty());
        assert!(!eof);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn spawn_and_read_output() {
        let mut cmd = CommandBuilder::new("echo");
        cmd.arg("pty works");
        let mut session = PtySession::spawn(cmd, 80, 24).unwrap();

        thread::sleep(Duration::from_millis(200));
        let bytes = session.drain_quiet(Duration::from_millis(100));
        assert!(String::from_utf8_lossy(&bytes).contains("pty works"));

        session.terminate();
    }

    #[test]
    fn write_reaches_child() {
        let cmd = CommandBuilder::new("cat");
        let mut session = PtySession::spawn(cmd, 80, 24).unwrap();

        thread::sleep(Duration::from_millis(100));
        session.write_all(b"echo me\n").unwrap();
        thread::sleep(Duration::from_millis(200));

        let bytes = session.drain_quiet(Duration::from_millis(100));
        assert!(String::from_utf8_lossy(&bytes).contains("echo me"));

        session.terminate();
    }

    #[test]
    fn short_lived_child_reports_not_running() {
        let cmd = CommandBuilder::new("true");
        let mut session = PtySession::spawn(cmd, 80, 24).unwrap();

        let status = session.wait_timeout(Duration::from_secs(5)).unwrap();
        assert!(status.success());
        assert!(!session.is_running());
    }

    #[test]
    fn terminate_is_idempotent() {
        let mut cmd = CommandBuilder::new("sleep");
        cmd.arg("30");
        let mut session = PtySession::spawn(cmd, 80, 24).unwrap();

        assert!(session.is_running());
        session.terminate();
        assert!(!session.is_running());
        session.terminate();
    }

    #[test]
    fn wait_timeout_expires_for_hung_child() {
        let mut cmd = CommandBuilder::new("sleep");
        cmd.arg("30");
        let mut session = PtySession::spawn(cmd, 80, 24).unwrap();

        let result = session.wait_timeout(Duration::from_millis(100));
        assert!(matches!(result, Err(TuiShotError::Timeout { .. })));

        session.terminate();
    }
}
