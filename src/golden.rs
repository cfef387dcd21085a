//! Golden file storage for visual regression tests.
//!
//! Text goldens store the raw captured output (ANSI escapes preserved) under
//! a small header with capture metadata. Image goldens store rendered PNG
//! screenshots and compare pixel-for-pixel through [`crate::diff`].
//!
//! The golden directory comes from the `GOLDEN_DIR` environment variable or
//! defaults to `tests/golden`. Setting `UPDATE_GOLDENS=1` rewrites goldens
//! instead of comparing, which is how baselines are blessed after an
//! intentional UI change.

use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use image::RgbImage;
use similar::{ChangeTag, TextDiff};

use crate::{
    diff::{self, DiffReport},
    error::{Result, TuiShotError},
};

/// Default directory for golden files.
const DEFAULT_GOLDEN_DIR: &str = "tests/golden";

/// Header marker for the text golden format.
const GOLDEN_HEADER_START: &str = "--- GOLDEN FILE ---";

/// Content marker for the text golden format.
const GOLDEN_CONTENT_START: &str = "--- CONTENT ---";

/// Get the golden file directory from the environment or use the default.
pub fn golden_dir() -> PathBuf {
    std::env::var("GOLDEN_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_GOLDEN_DIR))
}

/// Check if golden files should be rewritten instead of compared.
pub fn should_update_goldens() -> bool {
    std::env::var("UPDATE_GOLDENS").map(|v| v == "1").unwrap_or(false)
}

/// Metadata stored in a text golden's header.
#[derive(Debug, Clone)]
pub struct GoldenMetadata {
    /// Name of the capture that created this golden.
    pub name: String,
    /// Terminal width in columns at capture time.
    pub width: u16,
    /// Terminal height in rows at capture time.
    pub height: u16,
    /// Timestamp when the golden was created.
    pub timestamp: String,
}

impl GoldenMetadata {
    /// Create new metadata, stamped with the current UTC time.
    pub fn new(name: impl Into<String>, width: u16, height: u16) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| {
                let secs = d.as_secs();
                let dt = chrono::DateTime::<chrono::Utc>::from_timestamp(secs as i64, 0);
                dt.map(|d| d.format("%Y-%m-%dT%H:%M:%SZ").to_string())
                    .unwrap_or_else(|| format!("{}s", secs))
            })
            .unwrap_or_else(|_| "unknown".to_string());

        Self { name: name.into(), width, height, timestamp }
    }

    /// Serialize metadata to the golden file header format.
    pub fn to_header(&self) -> String {
        format!(
            "{}\nname: {}\nsize: {}x{}\ntimestamp: {}\n",
            GOLDEN_HEADER_START, self.name, self.width, self.height, self.timestamp
        )
    }

    /// Parse metadata from a golden file header.
    pub fn from_header(header: &str) -> Option<Self> {
        let lines: Vec<&str> = header.lines().collect();

        if lines.is_empty() || !lines[0].contains(GOLDEN_HEADER_START) {
            return None;
        }

        let mut name = String::new();
        let mut width = 0;
        let mut height = 0;
        let mut timestamp = String::new();

        for line in lines.iter().skip(1) {
            if let Some(value) = line.strip_prefix("name: ") {
                name = value.to_string();
            } else if let Some(value) = line.strip_prefix("size: ") {
                if let Some((w, h)) = value.split_once('x') {
                    width = w.parse().ok()?;
                    height = h.parse().ok()?;
                }
            } else if let Some(value) = line.strip_prefix("timestamp: ") {
                timestamp = value.to_string();
            }
        }

        Some(Self { name, width, height, timestamp })
    }
}

/// A text golden: expected terminal output plus capture metadata.
#[derive(Debug, Clone)]
pub struct GoldenCapture {
    /// Metadata about the golden.
    pub metadata: GoldenMetadata,
    /// Captured output, ANSI escape codes preserved.
    pub content: String,
}

impl GoldenCapture {
    /// Create a golden from freshly captured output.
    pub fn new(name: impl Into<String>, width: u16, height: u16, content: impl Into<String>) -> Self {
        Self {
            metadata: GoldenMetadata::new(name, width, height),
            content: content.into(),
        }
    }

    /// Serialize the golden to its on-disk format.
    pub fn to_file_string(&self) -> String {
        format!("{}{}\n{}", self.metadata.to_header(), GOLDEN_CONTENT_START, self.content)
    }

    /// Parse a golden from its on-disk format.
    pub fn from_file_string(content: &str) -> Result<Self> {
        let content_start = content
            .find(GOLDEN_CONTENT_START)
            .ok_or_else(|| TuiShotError::Parse("golden file missing content marker".to_string()))?;

        let header = &content[..content_start];
        let body = &content[content_start + GOLDEN_CONTENT_START.len()..];

        let metadata = GoldenMetadata::from_header(header)
            .ok_or_else(|| TuiShotError::Parse("failed to parse golden file header".to_string()))?;

        let content = body.trim_start_matches('\n').to_string();

        Ok(Self { metadata, content })
    }

    /// Compare stored content against freshly captured output.
    pub fn compare(&self, actual: &str) -> Result<()> {
        if self.content == actual {
            return Ok(());
        }

        let diff = generate_diff(&self.content, actual);
        Err(TuiShotError::GoldenMismatch(format!("{}\n{}", self.metadata.name, diff)))
    }
}

/// A directory of golden files.
///
/// Construct with an explicit directory for hermetic tests, or with
/// [`GoldenStore::from_env`] to honor `GOLDEN_DIR`.
#[derive(Debug, Clone)]
pub struct GoldenStore {
    dir: PathBuf,
}

impl GoldenStore {
    /// A store rooted at an explicit directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// A store rooted at `GOLDEN_DIR`, or `tests/golden` if unset.
    pub fn from_env() -> Self {
        Self { dir: golden_dir() }
    }

    /// The directory this store reads and writes.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn text_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.golden.txt", name))
    }

    fn image_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.golden.png", name))
    }

    /// Save a text golden, creating the directory if needed.
    pub fn save(&self, golden: &GoldenCapture) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.text_path(&golden.metadata.name);
        fs::write(&path, golden.to_file_string())?;
        Ok(path)
    }

    /// Load a text golden by name.
    pub fn load(&self, name: &str) -> Result<GoldenCapture> {
        let path = self.text_path(name);
        let content = fs::read_to_string(&path).map_err(|e| {
            TuiShotError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "failed to read golden '{}' (set UPDATE_GOLDENS=1 to create it): {}",
                    path.display(),
                    e
                ),
            ))
        })?;
        GoldenCapture::from_file_string(&content)
    }

    /// Compare captured output against a stored text golden.
    ///
    /// With `UPDATE_GOLDENS=1` the golden is rewritten from the captured
    /// output instead and the comparison passes.
    pub fn assert_text(&self, name: &str, width: u16, height: u16, actual: &str) -> Result<()> {
        if should_update_goldens() {
            let path = self.save(&GoldenCapture::new(name, width, height, actual))?;
            eprintln!("updated golden file: {}", path.display());
            return Ok(());
        }
        self.load(name)?.compare(actual)
    }

    /// Save a rendered screenshot as a PNG golden.
    pub fn save_image(&self, name: &str, img: &RgbImage) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.image_path(name);
        img.save(&path)?;
        Ok(path)
    }

    /// Load a PNG golden by name.
    pub fn load_image(&self, name: &str) -> Result<RgbImage> {
        let path = self.image_path(name);
        if !path.exists() {
            return Err(TuiShotError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!(
                    "golden image '{}' not found (set UPDATE_GOLDENS=1 to create it)",
                    path.display()
                ),
            )));
        }
        Ok(image::open(&path)?.into_rgb8())
    }

    /// Compare a rendered screenshot against a stored PNG golden.
    ///
    /// Passes when the pixel difference stays at or below `threshold`
    /// percent. On mismatch a side-by-side review image is written next to
    /// the golden as `<name>.diff.png` and the error message carries the
    /// difference summary. With `UPDATE_GOLDENS=1` the golden is rewritten
    /// instead.
    pub fn assert_image(&self, name: &str, img: &RgbImage, threshold: f64) -> Result<DiffReport> {
        if should_update_goldens() {
            let path = self.save_image(name, img)?;
            eprintln!("updated golden image: {}", path.display());
            return Ok(diff::compare(img, img));
        }

        let golden = self.load_image(name)?;
        let report = diff::compare(&golden, img);
        if report.within(threshold) {
            return Ok(report);
        }

        let viz_path = self.dir.join(format!("{}.diff.png", name));
        let viz = diff::visualize(&golden, img);
        let viz_note = match viz.save(&viz_path) {
            Ok(()) => format!(", review image at {}", viz_path.display()),
            Err(_) => String::new(),
        };

        Err(TuiShotError::GoldenMismatch(format!(
            "{}: {:.4}% of pixels differ ({} of {}, threshold {}%){}",
            name,
            report.difference_percent,
            report.differing_pixels,
            report.total_pixels,
            threshold,
            viz_note
        )))
    }
}

/// Generate a unified diff between expected and actual content.
pub fn generate_diff(expected: &str, actual: &str) -> String {
    let diff = TextDiff::from_lines(expected, actual);

    let mut output = String::new();
    output.push_str("--- expected (golden)\n");
    output.push_str("+++ actual\n");

    let mut line_num = 1;

    for (idx, group) in diff.grouped_ops(3).iter().enumerate() {
        if idx > 0 {
            output.push_str("...\n");
        }

        for op in group {
            let old_start = op.old_range().start + 1;
            let old_len = op.old_range().len();
            let new_start = op.new_range().start + 1;
            let new_len = op.new_range().len();

            output.push_str(&format!(
                "@@ -{},{} +{},{} @@\n",
                old_start, old_len, new_start, new_len
            ));

            for change in diff.iter_changes(op) {
                let sign = match change.tag() {
                    ChangeTag::Delete => "-",
                    ChangeTag::Insert => "+",
                    ChangeTag::Equal => " ",
                };

                output.push_str(&format!("{:>4} {} {}", line_num, sign, change.value()));
                if !change.value().ends_with('\n') {
                    output.push('\n');
                }

                line_num += 1;
            }
        }
    }

    output
}
