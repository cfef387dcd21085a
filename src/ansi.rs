//! Streaming ANSI escape-sequence interpreter.
//!
//! This module flattens a raw terminal byte stream into lines of styled
//! character cells. It tracks SGR (Select Graphic Rendition) state across
//! the stream and snapshots it into every emitted cell; it deliberately does
//! *not* emulate a terminal. Cursor motion, erase and mode sequences are
//! stripped during preprocessing, carriage returns are dropped, and newlines
//! become line breaks. What remains is exactly the model a rasterizer
//! needs: a grid of characters with colors and attributes.
//!
//! # Example
//!
//! ```rust
//! use tuishot::ansi::interpret;
//! use tuishot::theme::{Color, Rgb, DARK};
//!
//! let frame = interpret("\x1b[31mhi\x1b[0m", &DARK);
//! assert_eq!(frame.height(), 1);
//! assert_eq!(frame.lines()[0][0].ch, 'h');
//! assert_eq!(frame.lines()[0][0].style.fg, Color::Rgb(Rgb(204, 0, 0)));
//! ```

use std::sync::OnceLock;

use bitflags::bitflags;
use regex::Regex;

use crate::theme::{Color, Rgb, Theme};

bitflags! {
    /// Text attributes tracked alongside colors.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Attrs: u8 {
        /// Bold weight (SGR 1 / 22).
        const BOLD = 0b01;
        /// Underline (SGR 4 / 24).
        const UNDERLINE = 0b10;
    }
}

/// The rendition state carried by a cell.
///
/// A value type: cells snapshot the interpreter's current style at emission
/// time, so later SGR changes never retroactively alter emitted cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    /// Foreground color.
    pub fg: Color,
    /// Background color.
    pub bg: Color,
    /// Bold and underline flags.
    pub attrs: Attrs,
}

impl Default for Style {
    fn default() -> Self {
        Self { fg: Color::Default, bg: Color::Default, attrs: Attrs::empty() }
    }
}

impl Style {
    /// True if the bold attribute is set.
    pub fn bold(&self) -> bool {
        self.attrs.contains(Attrs::BOLD)
    }

    /// True if the underline attribute is set.
    pub fn underline(&self) -> bool {
        self.attrs.contains(Attrs::UNDERLINE)
    }
}

/// A single character cell with its rendition state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyledCell {
    /// The character.
    pub ch: char,
    /// Style snapshot at the time the character was emitted.
    pub style: Style,
}

/// A captured screen flattened to lines of styled cells.
///
/// Width is the length of the longest line; height is the line count. Short
/// lines are not padded; consumers must treat missing trailing cells as
/// background-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    lines: Vec<Vec<StyledCell>>,
}

impl Frame {
    /// The lines of the frame, in order.
    pub fn lines(&self) -> &[Vec<StyledCell>] {
        &self.lines
    }

    /// Width in cells of the longest line.
    pub fn width(&self) -> usize {
        self.lines.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Number of lines.
    pub fn height(&self) -> usize {
        self.lines.len()
    }

    /// True if the frame contains no lines at all.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The frame's plain text, styles discarded.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.extend(line.iter().map(|c| c.ch));
        }
        out
    }
}

/// Parser states for the escape-sequence state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Emitting literal characters.
    Ground,
    /// Just saw ESC, deciding whether a CSI follows.
    Escape,
    /// Inside `ESC [`, collecting parameter characters.
    CsiParams,
}

fn cursor_control_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // Private-mode sequences, e.g. cursor hide/show, bracketed paste.
            Regex::new(r"\x1b\[\?[0-9;]*[a-zA-Z]").unwrap(),
            // Cursor position / erase / save-restore sequences.
            Regex::new(r"\x1b\[[0-9;]*[HJKfsu]").unwrap(),
        ]
    })
}

/// Removes cursor-positioning and mode-setting sequences.
///
/// This model does not track cursor or screen state; stripping these up
/// front keeps their parameter bytes from garbling the character stream.
pub fn strip_cursor_controls(raw: &str) -> String {
    let patterns = cursor_control_patterns();
    let pass1 = patterns[0].replace_all(raw, "");
    patterns[1].replace_all(&pass1, "").into_owned()
}

/// Interprets a raw ANSI stream into a [`Frame`] under the given theme.
///
/// Never fails: malformed escape parameters are ignored and the stream
/// continues. The theme is consulted for the named 16-color SGR codes;
/// extended `38;5;N` indices resolve through the fixed xterm palette at
/// rasterization time.
pub fn interpret(raw: &str, theme: &Theme) -> Frame {
    let stripped = strip_cursor_controls(raw);

    let mut lines: Vec<Vec<StyledCell>> = vec![Vec::new()];
    let mut style = Style::default();
    let mut state = State::Ground;
    let mut params = String::new();

    for ch in stripped.chars() {
        match state {
            State::Ground => match ch {
                '\x1b' => state = State::Escape,
                '\n' => lines.push(Vec::new()),
                '\r' => {}
                c => put(&mut lines, c, style),
            },
            State::Escape => match ch {
                '[' => {
                    params.clear();
                    state = State::CsiParams;
                }
                // ESC ESC: emit the first literally, stay armed.
                '\x1b' => put(&mut lines, '\x1b', style),
                // Not a CSI introducer: the ESC was a literal after all.
                c => {
                    put(&mut lines, '\x1b', style);
                    state = State::Ground;
                    match c {
                        '\n' => lines.push(Vec::new()),
                        '\r' => {}
                        c => put(&mut lines, c, style),
                    }
                }
            },
            State::CsiParams => {
                if ('\x40'..='\x7e').contains(&ch) {
                    // Final byte. Only SGR is applied; every other control
                    // function is outside this model and discarded.
                    if ch == 'm' {
                        apply_sgr(&params, theme, &mut style);
                    }
                    state = State::Ground;
                } else {
                    params.push(ch);
                }
            }
        }
    }

    // A dangling ESC at end of stream is a literal.
    if state == State::Escape {
        put(&mut lines, '\x1b', style);
    }

    // A stream ending in a newline does not open a trailing blank line.
    if lines.len() > 1 || lines.first().is_some_and(|l| l.is_empty()) {
        if lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
    }

    Frame { lines }
}

fn put(lines: &mut Vec<Vec<StyledCell>>, ch: char, style: Style) {
    if let Some(line) = lines.last_mut() {
        line.push(StyledCell { ch, style });
    }
}

/// Applies an SGR parameter list to the running style.
///
/// Parameters are evaluated left to right, first match wins per parameter.
/// Empty segments (consecutive `;;`) are code 0. Malformed extended color
/// sequences leave the style unchanged and scanning continues with the next
/// parameter.
fn apply_sgr(params: &str, theme: &Theme, style: &mut Style) {
    let parts: Vec<&str> = params.split(';').collect();
    let mut i = 0;

    while i < parts.len() {
        let code: u16 = if parts[i].is_empty() {
            0
        } else {
            match parts[i].parse() {
                Ok(c) => c,
                Err(_) => {
                    i += 1;
                    continue;
                }
            }
        };

        match code {
            0 => *style = Style::default(),
            1 => style.attrs |= Attrs::BOLD,
            22 => style.attrs -= Attrs::BOLD,
            4 => style.attrs |= Attrs::UNDERLINE,
            24 => style.attrs -= Attrs::UNDERLINE,
            38 => {
                if let Some((color, consumed)) = parse_extended_color(&parts[i + 1..]) {
                    style.fg = color;
                    i += consumed;
                }
            }
            48 => {
                if let Some((color, consumed)) = parse_extended_color(&parts[i + 1..]) {
                    style.bg = color;
                    i += consumed;
                }
            }
            39 => style.fg = Color::Default,
            49 => style.bg = Color::Default,
            _ => {
                if let Some(rgb) = theme.fg_for_sgr(code) {
                    style.fg = Color::Rgb(rgb);
                } else if let Some(rgb) = theme.bg_for_sgr(code) {
                    style.bg = Color::Rgb(rgb);
                }
                // Anything else is an unsupported rendition; ignored.
            }
        }

        i += 1;
    }
}

/// Parses the lookahead of a 38/48 extended color introducer.
///
/// `5;N` is an indexed palette color, `2;R;G;B` a truecolor triple. Returns
/// the color and how many parameters were consumed, or `None` when the
/// sequence is truncated or has out-of-range components, in which case the
/// caller leaves the style untouched and continues scanning.
fn parse_extended_color(rest: &[&str]) -> Option<(Color, usize)> {
    match rest.first() {
        Some(&"5") => {
            let n: u8 = rest.get(1)?.parse().ok()?;
            Some((Color::Indexed(n), 2))
        }
        Some(&"2") => {
            let r: u8 = rest.get(1)?.parse().ok()?;
            let g: u8 = rest.get(2)?.parse().ok()?;
            let b: u8 = rest.get(3)?.parse().ok()?;
            Some((Color::Rgb(Rgb(r, g, b)), 4))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::DARK;

    fn style_of(frame: &Frame, row: usize, col: usize) -> Style {
        frame.lines()[row][col].style
    }

    #[test]
    fn plain_text_single_line() {
        let frame = interpret("hello", &DARK);
        assert_eq!(frame.height(), 1);
        assert_eq!(frame.width(), 5);
        assert_eq!(frame.text(), "hello");
        assert_eq!(style_of(&frame, 0, 0), Style::default());
    }

    #[test]
    fn red_hello_green_world_scenario() {
        let frame = interpret("\x1b[31mHello\x1b[0m\n\x1b[42mWorld\x1b[0m", &DARK);

        assert_eq!(frame.height(), 2);
        assert_eq!(frame.text(), "Hello\nWorld");

        for cell in &frame.lines()[0] {
            assert_eq!(cell.style.fg, Color::Rgb(Rgb(204, 0, 0)));
            assert_eq!(cell.style.bg, Color::Default);
        }
        for cell in &frame.lines()[1] {
            assert_eq!(cell.style.fg, Color::Default);
            assert_eq!(cell.style.bg, Color::Rgb(Rgb(0, 204, 0)));
        }
    }

    #[test]
    fn reset_clears_everything() {
        let frame = interpret("\x1b[1;4;31;42ma\x1b[0mb", &DARK);
        let a = style_of(&frame, 0, 0);
        let b = style_of(&frame, 0, 1);

        assert!(a.bold());
        assert!(a.underline());
        assert_eq!(a.fg, Color::Rgb(Rgb(204, 0, 0)));
        assert_eq!(a.bg, Color::Rgb(Rgb(0, 204, 0)));

        assert_eq!(b, Style::default());
    }

    #[test]
    fn thirty_nine_resets_foreground_only() {
        // ESC[31;42m then ESC[39m: default fg, background untouched.
        let frame = interpret("\x1b[31;42ma\x1b[39mb", &DARK);
        let b = style_of(&frame, 0, 1);
        assert_eq!(b.fg, Color::Default);
        assert_eq!(b.bg, Color::Rgb(Rgb(0, 204, 0)));
    }

    #[test]
    fn forty_nine_resets_background_only() {
        let frame = interpret("\x1b[1;31;42ma\x1b[49mb", &DARK);
        let b = style_of(&frame, 0, 1);
        assert_eq!(b.fg, Color::Rgb(Rgb(204, 0, 0)));
        assert_eq!(b.bg, Color::Default);
        assert!(b.bold());
    }

    #[test]
    fn combined_31_39_ends_at_default() {
        let frame = interpret("\x1b[42m\x1b[31;39ma", &DARK);
        let a = style_of(&frame, 0, 0);
        assert_eq!(a.fg, Color::Default);
        assert_eq!(a.bg, Color::Rgb(Rgb(0, 204, 0)));
    }

    #[test]
    fn indexed_and_truecolor() {
        let frame = interpret("\x1b[38;5;196ma\x1b[48;2;10;20;30mb", &DARK);
        assert_eq!(style_of(&frame, 0, 0).fg, Color::Indexed(196));
        assert_eq!(style_of(&frame, 0, 1).bg, Color::Rgb(Rgb(10, 20, 30)));
    }

    #[test]
    fn extended_color_consumes_parameters() {
        // The 196 must not be re-read as a standalone code; 4 after it
        // still applies underline.
        let frame = interpret("\x1b[38;5;196;4ma", &DARK);
        let a = style_of(&frame, 0, 0);
        assert_eq!(a.fg, Color::Indexed(196));
        assert!(a.underline());
    }

    #[test]
    fn truncated_extended_color_is_ignored() {
        let frame = interpret("\x1b[38;5ma", &DARK);
        assert_eq!(style_of(&frame, 0, 0).fg, Color::Default);

        let frame = interpret("\x1b[38;2;10;20ma", &DARK);
        assert_eq!(style_of(&frame, 0, 0).fg, Color::Default);
    }

    #[test]
    fn out_of_range_component_is_ignored() {
        let frame = interpret("\x1b[38;5;300ma", &DARK);
        assert_eq!(style_of(&frame, 0, 0).fg, Color::Default);
    }

    #[test]
    fn empty_segments_are_reset() {
        let frame = interpret("\x1b[31ma\x1b[;mb", &DARK);
        assert_eq!(style_of(&frame, 0, 1), Style::default());
    }

    #[test]
    fn bold_underline_toggles() {
        let frame = interpret("\x1b[1ma\x1b[22mb\x1b[4mc\x1b[24md", &DARK);
        assert!(style_of(&frame, 0, 0).bold());
        assert!(!style_of(&frame, 0, 1).bold());
        assert!(style_of(&frame, 0, 2).underline());
        assert!(!style_of(&frame, 0, 3).underline());
    }

    #[test]
    fn carriage_returns_are_dropped() {
        let frame = interpret("ab\r\ncd\r", &DARK);
        assert_eq!(frame.text(), "ab\ncd");
    }

    #[test]
    fn cursor_controls_are_stripped() {
        let raw = "\x1b[?25l\x1b[2J\x1b[1;1Hhi\x1b[K\x1b[s\x1b[u";
        let frame = interpret(raw, &DARK);
        assert_eq!(frame.text(), "hi");
    }

    #[test]
    fn non_sgr_csi_is_discarded() {
        // Cursor forward is consumed but has no effect on the stream.
        let frame = interpret("a\x1b[3Cb", &DARK);
        assert_eq!(frame.text(), "ab");
    }

    #[test]
    fn bare_escape_is_literal() {
        let frame = interpret("a\x1bZb", &DARK);
        assert_eq!(frame.text(), "a\x1bZb");

        let frame = interpret("a\x1b", &DARK);
        assert_eq!(frame.text(), "a\x1b");
    }

    #[test]
    fn trailing_newline_does_not_add_a_line() {
        assert_eq!(interpret("a\n", &DARK).height(), 1);
        assert_eq!(interpret("a\n\n", &DARK).height(), 2);
        assert_eq!(interpret("a\nb", &DARK).height(), 2);
    }

    #[test]
    fn empty_input_is_empty_frame() {
        let frame = interpret("", &DARK);
        assert!(frame.is_empty());
        assert_eq!(frame.width(), 0);
        assert_eq!(frame.height(), 0);
    }

    #[test]
    fn short_lines_are_not_padded() {
        let frame = interpret("abcd\nx", &DARK);
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.lines()[1].len(), 1);
    }

    #[test]
    fn cells_snapshot_style_at_emission() {
        let frame = interpret("\x1b[31ma\x1b[32mb", &DARK);
        assert_eq!(style_of(&frame, 0, 0).fg, Color::Rgb(Rgb(204, 0, 0)));
        assert_eq!(style_of(&frame, 0, 1).fg, Color::Rgb(Rgb(0, 204, 0)));
    }
}
