//! Rasterizes interpreted frames into RGB images.
//!
//! Each cell of a [`Frame`](crate::ansi::Frame) is painted into a fixed-size
//! grid: background rectangle first (only when it differs from the theme
//! default, which the canvas is already filled with), then the glyph in the
//! foreground color, then attribute marks. Bold is a double-strike one pixel
//! to the right, underline is a one-pixel rule near the cell bottom.
//!
//! Font resolution never fails. An explicit path is tried first, then a
//! probe list of common monospace font files, and if nothing loads the
//! built-in 8x8 bitmap font is used. That keeps rendering usable on bare CI
//! machines with no font packages installed.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use fontdue::{Font, FontSettings, Metrics};
use image::{Rgb as Pixel, RgbImage};

use crate::ansi::Frame;
use crate::error::{Result, TuiShotError};
use crate::theme::{Rgb, Theme};

/// Pixel padding around the cell grid on all four sides.
const GRID_PADDING: u32 = 10;

/// Cell height as a multiple of the font size.
const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Advance width assumed for the builtin face, as a multiple of font size.
const BUILTIN_ADVANCE_FACTOR: f32 = 0.6;

/// Grid dimensions used when the frame has no lines at all.
const EMPTY_FRAME_COLS: usize = 80;
const EMPTY_FRAME_ROWS: usize = 24;

/// Monospace font files probed when no explicit path is given.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/liberation-mono/LiberationMono-Regular.ttf",
    "/System/Library/Fonts/Menlo.ttc",
    "/System/Library/Fonts/Monaco.ttf",
];

/// A font the rasterizer can draw with.
pub enum FontFace {
    /// A parsed TrueType/OpenType font.
    Truetype(Font),
    /// The embedded 8x8 bitmap font.
    Builtin,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FontFace::Truetype(_) => f.write_str("FontFace::Truetype"),
            FontFace::Builtin => f.write_str("FontFace::Builtin"),
        }
    }
}

impl FontFace {
    /// Loads a TrueType face from a file on disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| TuiShotError::Font(format!("{}: {e}", path.display())))?;
        Ok(FontFace::Truetype(font))
    }
}

/// Resolves a drawable font face, falling back to the builtin bitmap font.
///
/// The explicit path is tried first when given, then each entry of the
/// probe list. A path that exists but fails to parse is skipped, not fatal.
pub fn resolve_font(explicit: Option<&Path>) -> FontFace {
    let candidates = explicit
        .into_iter()
        .map(PathBuf::from)
        .chain(FONT_CANDIDATES.iter().map(PathBuf::from));
    for path in candidates {
        if let Ok(face) = FontFace::from_file(&path) {
            return face;
        }
    }
    FontFace::Builtin
}

/// Rasterizer settings.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Font size in pixels.
    pub font_size: f32,
    /// Explicit font file to try before the probe list.
    pub font_path: Option<PathBuf>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            font_size: 14.0,
            font_path: None,
        }
    }
}

/// Paints frames into images using a fixed-metric cell grid.
///
/// Cell metrics are computed once at construction. For a TrueType face the
/// cell width is the advance of `M` rounded up; the builtin face uses a
/// fixed fraction of the font size. Glyph coverage bitmaps are cached per
/// character across renders.
#[derive(Debug)]
pub struct Rasterizer {
    face: FontFace,
    font_size: f32,
    cell_width: u32,
    cell_height: u32,
    ascent: f32,
    glyph_cache: HashMap<char, (Metrics, Vec<u8>)>,
}

impl Rasterizer {
    /// Builds a rasterizer, resolving the font per [`resolve_font`].
    pub fn new(options: &RenderOptions) -> Self {
        let face = resolve_font(options.font_path.as_deref());
        Self::with_face(face, options.font_size)
    }

    /// Builds a rasterizer around an already-resolved face.
    pub fn with_face(face: FontFace, font_size: f32) -> Self {
        let cell_height = (font_size * LINE_HEIGHT_FACTOR).round().max(1.0) as u32;
        let (cell_width, ascent) = match &face {
            FontFace::Truetype(font) => {
                let advance = font.metrics('M', font_size).advance_width;
                let ascent = font
                    .horizontal_line_metrics(font_size)
                    .map(|m| m.ascent)
                    .unwrap_or(font_size * 0.8);
                (advance.ceil().max(1.0) as u32, ascent)
            }
            FontFace::Builtin => (
                (font_size * BUILTIN_ADVANCE_FACTOR).round().max(1.0) as u32,
                font_size * 0.8,
            ),
        };
        Self {
            face,
            font_size,
            cell_width,
            cell_height,
            ascent,
            glyph_cache: HashMap::new(),
        }
    }

    /// Cell dimensions in pixels as `(width, height)`.
    pub fn cell_size(&self) -> (u32, u32) {
        (self.cell_width, self.cell_height)
    }

    /// Image dimensions a frame would produce, without rendering it.
    pub fn image_size(&self, frame: &Frame) -> (u32, u32) {
        let (cols, rows) = grid_size(frame);
        (
            cols as u32 * self.cell_width + 2 * GRID_PADDING,
            rows as u32 * self.cell_height + 2 * GRID_PADDING,
        )
    }

    /// Renders a frame onto a canvas filled with the theme's background.
    ///
    /// The grid is as wide as the frame's longest line. An empty frame
    /// still produces a blank 80x24 canvas so that captures which emitted
    /// only control sequences yield a comparable image.
    pub fn render(&mut self, frame: &Frame, theme: &Theme) -> RgbImage {
        let (width, height) = self.image_size(frame);
        let canvas_bg = pixel(theme.background);
        let mut img = RgbImage::from_pixel(width, height, canvas_bg);

        for (row, line) in frame.lines().iter().enumerate() {
            let cell_y = GRID_PADDING + row as u32 * self.cell_height;
            for (col, cell) in line.iter().enumerate() {
                let cell_x = GRID_PADDING + col as u32 * self.cell_width;
                let fg = cell.style.fg.resolve(theme.foreground);
                let bg = cell.style.bg.resolve(theme.background);

                if bg != theme.background {
                    fill_rect(
                        &mut img,
                        cell_x,
                        cell_y,
                        self.cell_width,
                        self.cell_height,
                        pixel(bg),
                    );
                }

                if cell.ch != ' ' {
                    self.draw_glyph(&mut img, cell_x, cell_y, cell.ch, fg);
                    if cell.style.bold() {
                        self.draw_glyph(&mut img, cell_x + 1, cell_y, cell.ch, fg);
                    }
                }

                if cell.style.underline() && self.cell_height >= 2 {
                    fill_rect(
                        &mut img,
                        cell_x,
                        cell_y + self.cell_height - 2,
                        self.cell_width,
                        1,
                        pixel(fg),
                    );
                }
            }
        }
        img
    }

    fn draw_glyph(&mut self, img: &mut RgbImage, cell_x: u32, cell_y: u32, ch: char, fg: Rgb) {
        match &self.face {
            FontFace::Truetype(font) => {
                let size = self.font_size;
                let (metrics, coverage) = self
                    .glyph_cache
                    .entry(ch)
                    .or_insert_with(|| font.rasterize(ch, size));
                let origin_x = cell_x as i32 + metrics.xmin;
                let origin_y = cell_y as i32 + self.ascent.round() as i32
                    - metrics.height as i32
                    - metrics.ymin;
                blend_coverage(img, origin_x, origin_y, metrics.width, coverage, fg);
            }
            FontFace::Builtin => {
                let bitmap = crate::builtin_font::glyph(ch);
                // Nearest-neighbor scale of the 8x8 bitmap to the cell.
                for py in 0..self.cell_height {
                    let sy = (py * 8 / self.cell_height) as usize;
                    for px in 0..self.cell_width {
                        let sx = px * 8 / self.cell_width;
                        if bitmap[sy] & (1u8 << sx) != 0 {
                            put_clipped(img, cell_x + px, cell_y + py, pixel(fg));
                        }
                    }
                }
            }
        }
    }
}

fn grid_size(frame: &Frame) -> (usize, usize) {
    if frame.is_empty() {
        (EMPTY_FRAME_COLS, EMPTY_FRAME_ROWS)
    } else {
        (frame.width(), frame.height())
    }
}

fn pixel(rgb: Rgb) -> Pixel<u8> {
    Pixel([rgb.0, rgb.1, rgb.2])
}

fn fill_rect(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Pixel<u8>) {
    let x1 = (x + w).min(img.width());
    let y1 = (y + h).min(img.height());
    for py in y.min(img.height())..y1 {
        for px in x.min(img.width())..x1 {
            img.put_pixel(px, py, color);
        }
    }
}

fn put_clipped(img: &mut RgbImage, x: u32, y: u32, color: Pixel<u8>) {
    if x < img.width() && y < img.height() {
        img.put_pixel(x, y, color);
    }
}

/// Alpha-blends a glyph coverage bitmap over the image, clipping at edges.
fn blend_coverage(
    img: &mut RgbImage,
    origin_x: i32,
    origin_y: i32,
    glyph_width: usize,
    coverage: &[u8],
    fg: Rgb,
) {
    if glyph_width == 0 {
        return;
    }
    for (i, &alpha) in coverage.iter().enumerate() {
        if alpha == 0 {
            continue;
        }
        let gx = origin_x + (i % glyph_width) as i32;
        let gy = origin_y + (i / glyph_width) as i32;
        if gx < 0 || gy < 0 || gx as u32 >= img.width() || gy as u32 >= img.height() {
            continue;
        }
        let under = *img.get_pixel(gx as u32, gy as u32);
        let a = alpha as u16;
        let mix = |top: u8, bottom: u8| ((top as u16 * a + bottom as u16 * (255 - a)) / 255) as u8;
        img.put_pixel(
            gx as u32,
            gy as u32,
            Pixel([
                mix(fg.0, under.0[0]),
                mix(fg.1, under.0[1]),
                mix(fg.2, under.0[2]),
            ]),
        );
    }
}
