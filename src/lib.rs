//! # tuishot
//!
//! Automated visual regression testing for terminal user interface (TUI)
//! applications.
//!
//! ## Overview
//!
//! `tuishot` runs a TUI application inside a real pseudo-terminal, captures
//! its raw output (ANSI escape sequences included), and turns that capture
//! into comparable artifacts:
//!
//! - **PTY capture**: spawn the target under a PTY with scripted keystrokes
//!   and quiescence-based settling
//! - **ANSI interpretation**: replay SGR color and attribute sequences into
//!   a styled character grid
//! - **Rasterization**: paint the grid into an RGB image with a monospace
//!   font, falling back to a builtin bitmap font on bare machines
//! - **Comparison**: pixel-level diffing with percentage thresholds and a
//!   side-by-side review image
//! - **Golden files**: store blessed captures (text or PNG) and compare new
//!   runs against them, with `UPDATE_GOLDENS=1` to re-bless
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tuishot::{capture, interpret, CaptureConfig, Rasterizer, RenderOptions};
//! use tuishot::theme::DARK;
//!
//! fn main() -> tuishot::Result<()> {
//!     // Run the app in an 80x24 PTY, press 'j' twice, then Enter.
//!     let config = CaptureConfig::default();
//!     let raw = capture("./my-tui-app", "jj<enter>", &config)?;
//!
//!     // Interpret escape sequences and rasterize to a PNG.
//!     let frame = interpret(&raw, &DARK);
//!     let mut rasterizer = Rasterizer::new(&RenderOptions::default());
//!     let img = rasterizer.render(&frame, &DARK);
//!     img.save("screenshot.png")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Golden Testing
//!
//! ```rust,no_run
//! use tuishot::{capture, CaptureConfig, GoldenStore};
//!
//! # fn main() -> tuishot::Result<()> {
//! let config = CaptureConfig::default();
//! let raw = capture("./my-tui-app", "", &config)?;
//!
//! // Compares against tests/golden/main_view.golden.txt, or rewrites it
//! // when UPDATE_GOLDENS=1 is set.
//! let store = GoldenStore::from_env();
//! store.assert_text("main_view", config.width, config.height, &raw)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The pipeline is organized as independent layers, each usable on its own:
//!
//! 1. **Key encoding** (`keys`): `"jj<enter>"` style specs to terminal bytes
//! 2. **PTY control** (`pty`, `capture`): session lifecycle and quiescence
//! 3. **Interpretation** (`ansi`, `theme`): escape sequences to styled cells
//! 4. **Rasterization** (`render`, `builtin_font`): styled cells to pixels
//! 5. **Comparison** (`diff`, `golden`): pixels and text to pass/fail

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]
#![deny(unsafe_code)]

pub mod ansi;
mod builtin_font;
pub mod capture;
pub mod diff;
mod error;
pub mod golden;
pub mod keys;
pub mod pty;
pub mod render;
pub mod theme;

// Public API exports
pub use ansi::{interpret, strip_cursor_controls, Attrs, Frame, Style, StyledCell};
pub use capture::{capture, CaptureConfig};
pub use diff::{compare, visualize, DiffReport};
pub use error::{Result, TuiShotError};
pub use golden::{GoldenCapture, GoldenMetadata, GoldenStore};
pub use keys::{encode_keys, parse_keys, unknown_names, KeyToken, Modifiers};
pub use pty::PtySession;
pub use render::{resolve_font, FontFace, Rasterizer, RenderOptions};
pub use theme::{ansi256_to_rgb, Color, Rgb, Theme, DARK, LIGHT};

// Re-export commonly used types for convenience
pub use portable_pty::CommandBuilder;
