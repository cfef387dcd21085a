//! Color themes and palette resolution.
//!
//! A [`Theme`] maps the sixteen standard SGR color codes (30-37, 90-97 and
//! their background counterparts) to concrete RGB values, plus the default
//! foreground and background used when no color is active. Two built-in
//! themes are provided as process-wide constants: [`DARK`] and [`LIGHT`].
//!
//! Themes only cover the *named* 16 colors. Extended indexed colors
//! (`38;5;N`) resolve through the fixed xterm 256-color palette via
//! [`ansi256_to_rgb`], independent of the theme.

/// A 24-bit RGB color value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// A cell color as tracked by the interpreter.
///
/// `Default` stays symbolic until rasterization so that the renderer can
/// decide whether a cell background actually differs from the canvas
/// background. Theme-mapped SGR codes resolve eagerly to `Rgb` at interpret
/// time; palette indices stay symbolic because their mapping is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    /// The theme's default foreground or background.
    Default,
    /// An index into the fixed xterm 256-color palette.
    Indexed(u8),
    /// A concrete 24-bit color.
    Rgb(Rgb),
}

impl Color {
    /// Resolves to a concrete RGB value against the given theme default.
    pub fn resolve(self, theme_default: Rgb) -> Rgb {
        match self {
            Color::Default => theme_default,
            Color::Indexed(n) => ansi256_to_rgb(n),
            Color::Rgb(c) => c,
        }
    }
}

/// An immutable color theme.
///
/// The palette holds the eight standard colors followed by the eight bright
/// colors; foreground and background SGR codes share the same RGB values, as
/// terminal themes conventionally do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    /// Default foreground color.
    pub foreground: Rgb,
    /// Default background (canvas) color.
    pub background: Rgb,
    /// Standard colors 0-7 and bright colors 8-15.
    pub palette: [Rgb; 16],
}

impl Theme {
    /// Looks up a foreground SGR code (30-37, 90-97).
    pub fn fg_for_sgr(&self, code: u16) -> Option<Rgb> {
        match code {
            30..=37 => Some(self.palette[(code - 30) as usize]),
            90..=97 => Some(self.palette[(code - 90 + 8) as usize]),
            _ => None,
        }
    }

    /// Looks up a background SGR code (40-47, 100-107).
    pub fn bg_for_sgr(&self, code: u16) -> Option<Rgb> {
        match code {
            40..=47 => Some(self.palette[(code - 40) as usize]),
            100..=107 => Some(self.palette[(code - 100 + 8) as usize]),
            _ => None,
        }
    }

    /// Returns a built-in theme by name (`"dark"` or `"light"`),
    /// case-insensitively.
    pub fn by_name(name: &str) -> Option<&'static Theme> {
        match name.to_ascii_lowercase().as_str() {
            "dark" => Some(&DARK),
            "light" => Some(&LIGHT),
            _ => None,
        }
    }
}

/// Dark theme: light gray text on a near-black canvas.
pub const DARK: Theme = Theme {
    foreground: Rgb(204, 204, 204),
    background: Rgb(30, 30, 30),
    palette: [
        Rgb(0, 0, 0),
        Rgb(204, 0, 0),
        Rgb(0, 204, 0),
        Rgb(204, 204, 0),
        Rgb(0, 0, 204),
        Rgb(204, 0, 204),
        Rgb(0, 204, 204),
        Rgb(204, 204, 204),
        Rgb(128, 128, 128),
        Rgb(255, 0, 0),
        Rgb(0, 255, 0),
        Rgb(255, 255, 0),
        Rgb(0, 0, 255),
        Rgb(255, 0, 255),
        Rgb(0, 255, 255),
        Rgb(255, 255, 255),
    ],
};

/// Light theme: black text on white, with the classic xterm light palette.
pub const LIGHT: Theme = Theme {
    foreground: Rgb(0, 0, 0),
    background: Rgb(255, 255, 255),
    palette: [
        Rgb(0, 0, 0),
        Rgb(194, 54, 33),
        Rgb(37, 188, 36),
        Rgb(173, 173, 39),
        Rgb(73, 46, 225),
        Rgb(211, 56, 211),
        Rgb(51, 187, 200),
        Rgb(203, 204, 205),
        Rgb(129, 131, 131),
        Rgb(252, 57, 31),
        Rgb(49, 231, 34),
        Rgb(234, 236, 35),
        Rgb(88, 51, 255),
        Rgb(249, 53, 248),
        Rgb(20, 240, 240),
        Rgb(233, 235, 235),
    ],
};

/// The fixed first 16 entries of the xterm 256-color palette.
///
/// Distinct from any theme palette: `38;5;1` is always the muted (128,0,0)
/// red regardless of how the active theme renders SGR 31.
const XTERM_16: [Rgb; 16] = [
    Rgb(0, 0, 0),
    Rgb(128, 0, 0),
    Rgb(0, 128, 0),
    Rgb(128, 128, 0),
    Rgb(0, 0, 128),
    Rgb(128, 0, 128),
    Rgb(0, 128, 128),
    Rgb(192, 192, 192),
    Rgb(128, 128, 128),
    Rgb(255, 0, 0),
    Rgb(0, 255, 0),
    Rgb(255, 255, 0),
    Rgb(0, 0, 255),
    Rgb(255, 0, 255),
    Rgb(0, 255, 255),
    Rgb(255, 255, 255),
];

/// Resolves an xterm 256-color palette index to RGB.
///
/// Total over all of `u8`:
///
/// - 0-15: the fixed 16-entry table above;
/// - 16-231: a 6x6x6 color cube with each axis stepping by 51;
/// - 232-255: a 24-step grayscale ramp `gray = (n - 232) * 10 + 8`.
pub fn ansi256_to_rgb(n: u8) -> Rgb {
    match n {
        0..=15 => XTERM_16[n as usize],
        16..=231 => {
            let idx = (n - 16) as u16;
            let r = (idx / 36) * 51;
            let g = ((idx / 6) % 6) * 51;
            let b = (idx % 6) * 51;
            Rgb(r as u8, g as u8, b as u8)
        }
        232..=255 => {
            let gray = (n - 232) * 10 + 8;
            Rgb(gray, gray, gray)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_is_total_over_u8() {
        for n in 0..=255u8 {
            // Resolution is defined for every index; the match is
            // exhaustive so this is a smoke test over the formulas.
            let _ = ansi256_to_rgb(n);
        }
    }

    #[test]
    fn fixed_table_for_low_indices() {
        assert_eq!(ansi256_to_rgb(0), Rgb(0, 0, 0));
        assert_eq!(ansi256_to_rgb(1), Rgb(128, 0, 0));
        assert_eq!(ansi256_to_rgb(7), Rgb(192, 192, 192));
        assert_eq!(ansi256_to_rgb(15), Rgb(255, 255, 255));
    }

    #[test]
    fn cube_formula() {
        assert_eq!(ansi256_to_rgb(16), Rgb(0, 0, 0));
        assert_eq!(ansi256_to_rgb(21), Rgb(0, 0, 255));
        assert_eq!(ansi256_to_rgb(196), Rgb(255, 0, 0));
        assert_eq!(ansi256_to_rgb(231), Rgb(255, 255, 255));
    }

    #[test]
    fn grayscale_ramp() {
        assert_eq!(ansi256_to_rgb(232), Rgb(8, 8, 8));
        assert_eq!(ansi256_to_rgb(244), Rgb(128, 128, 128));
        assert_eq!(ansi256_to_rgb(255), Rgb(238, 238, 238));
    }

    #[test]
    fn theme_sgr_lookups() {
        assert_eq!(DARK.fg_for_sgr(31), Some(Rgb(204, 0, 0)));
        assert_eq!(DARK.fg_for_sgr(97), Some(Rgb(255, 255, 255)));
        assert_eq!(DARK.bg_for_sgr(42), Some(Rgb(0, 204, 0)));
        assert_eq!(DARK.bg_for_sgr(100), Some(Rgb(128, 128, 128)));
        assert_eq!(DARK.fg_for_sgr(38), None);
        assert_eq!(DARK.bg_for_sgr(39), None);

        assert_eq!(LIGHT.fg_for_sgr(31), Some(Rgb(194, 54, 33)));
    }

    #[test]
    fn theme_and_palette_disagree_on_red() {
        // SGR 31 is a theme lookup; 38;5;1 is the fixed palette.
        assert_ne!(DARK.fg_for_sgr(31), Some(ansi256_to_rgb(1)));
    }

    #[test]
    fn color_resolution() {
        assert_eq!(Color::Default.resolve(DARK.foreground), DARK.foreground);
        assert_eq!(Color::Indexed(196).resolve(DARK.foreground), Rgb(255, 0, 0));
        assert_eq!(Color::Rgb(Rgb(1, 2, 3)).resolve(DARK.foreground), Rgb(1, 2, 3));
    }

    #[test]
    fn theme_by_name() {
        assert_eq!(Theme::by_name("dark"), Some(&DARK));
        assert_eq!(Theme::by_name("LIGHT"), Some(&LIGHT));
        assert_eq!(Theme::by_name("solarized"), None);
    }
}
