//! End-to-end tests for the capture, interpret, render, compare pipeline.
//!
//! These spawn small shell scripts under a real PTY, so they are Unix-only.

#![cfg(unix)]

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::PathBuf,
    time::{Duration, Instant},
};

use tempfile::TempDir;
use tuishot::{
    capture, compare, interpret, CaptureConfig, FontFace, Rasterizer, TuiShotError, DARK,
};

/// Write an executable shell script into `dir` and return its path.
fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).expect("Failed to write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("Failed to chmod script");
    path
}

/// Config with short settling so the suite stays fast.
fn fast_config() -> CaptureConfig {
    CaptureConfig {
        timeout: Duration::from_secs(2),
        settle: Duration::from_millis(150),
        poll_interval: Duration::from_millis(50),
        key_delay: Duration::from_millis(20),
        ..CaptureConfig::default()
    }
}

#[test]
fn test_capture_preserves_ansi_escapes() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let app = script(
        &temp,
        "colored.sh",
        "printf '\\033[31mError:\\033[0m disk full\\n'",
    );

    let raw = capture(&app, "", &fast_config()).expect("capture failed");

    assert!(raw.contains("\x1b[31m"), "escape stripped from {raw:?}");
    assert!(raw.contains("disk full"));
}

#[test]
fn test_capture_interpret_resolves_colors() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let app = script(
        &temp,
        "colored.sh",
        "printf '\\033[31mError:\\033[0m disk full\\n'",
    );

    let raw = capture(&app, "", &fast_config()).expect("capture failed");
    let frame = interpret(&raw, &DARK);

    assert!(frame.text().contains("Error: disk full"));

    let line = frame
        .lines()
        .iter()
        .find(|l| l.iter().map(|c| c.ch).collect::<String>().contains("Error"))
        .expect("no line with Error");
    let e_col = line.iter().position(|c| c.ch == 'E').expect("no E cell");
    let red = tuishot::Rgb(204, 0, 0);
    assert_eq!(line[e_col].style.fg.resolve(DARK.foreground), red);
    // The text after the reset is back on the default foreground.
    let d_col = line.iter().position(|c| c.ch == 'd').expect("no d cell");
    assert_eq!(line[d_col].style.fg.resolve(DARK.foreground), DARK.foreground);
}

#[test]
fn test_capture_with_scripted_keys() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let app = script(&temp, "echoer.sh", "read line\nprintf 'got:%s\\n' \"$line\"");

    let raw = capture(&app, "hi<enter>", &fast_config()).expect("capture failed");

    assert!(raw.contains("got:hi"), "missing echoed input in {raw:?}");
}

#[test]
fn test_capture_missing_target_fails_before_spawn() {
    let start = Instant::now();
    let err = capture("/no/such/tui-app", "", &fast_config()).unwrap_err();

    assert!(matches!(err, TuiShotError::TargetNotFound { .. }));
    // Pre-flight validation means no PTY, no settling, no waiting.
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_capture_non_executable_target_rejected() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = temp.path().join("data.txt");
    fs::write(&path, "just text").expect("Failed to write file");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644))
        .expect("Failed to chmod file");

    let err = capture(&path, "", &fast_config()).unwrap_err();
    assert!(matches!(err, TuiShotError::TargetNotExecutable { .. }));
}

#[test]
fn test_capture_of_hung_target_is_bounded() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let app = script(&temp, "hang.sh", "printf 'spinner\\n'\nsleep 30");

    let config = CaptureConfig {
        timeout: Duration::from_secs(1),
        ..fast_config()
    };

    let start = Instant::now();
    let raw = capture(&app, "", &config).expect("capture failed");
    let elapsed = start.elapsed();

    assert!(raw.contains("spinner"));
    // Budget plus settling and teardown grace, nowhere near the sleep.
    assert!(elapsed < Duration::from_secs(6), "capture took {elapsed:?}");
}

#[test]
fn test_silent_target_reports_no_output() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let app = script(&temp, "silent.sh", "exit 0");

    let err = capture(&app, "", &fast_config()).unwrap_err();
    assert!(matches!(err, TuiShotError::NoOutput));
}

#[test]
fn test_repeated_captures_render_identically() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let app = script(
        &temp,
        "stable.sh",
        "printf '\\033[1;32mPASS\\033[0m all 12 checks\\n'",
    );

    let config = fast_config();
    let first = capture(&app, "", &config).expect("first capture failed");
    let second = capture(&app, "", &config).expect("second capture failed");

    // Builtin face keeps the render independent of installed fonts.
    let mut rasterizer = Rasterizer::with_face(FontFace::Builtin, 14.0);
    let img_a = rasterizer.render(&interpret(&first, &DARK), &DARK);
    let img_b = rasterizer.render(&interpret(&second, &DARK), &DARK);

    let report = compare(&img_a, &img_b);
    assert_eq!(report.differing_pixels, 0, "{report:?}");
    assert_eq!(report.difference_percent, 0.0);
}
