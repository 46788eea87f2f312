use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{fs, io};

use fontdue::{Font, FontSettings};
use thiserror::Error;
use tracing::{debug, info};

use super::canvas::{Canvas, ClipRect};
use super::color::Color;

const DEFAULT_SIZE_PT: f32 = 10.0;
const DPI: f32 = 96.0;

/// Logical pixel extent of a run of text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextSize {
    pub width: i32,
    pub height: i32,
}

pub trait TextMeasure {
    fn measure(&self, text: &str) -> TextSize;
}

pub trait TextRenderer: TextMeasure {
    /// Draws `text` with its top-left corner at logical `(x, y)`, clipped to
    /// `clip`.
    fn draw(&self, canvas: &mut Canvas<'_>, text: &str, x: i32, y: i32, clip: ClipRect, color: Color);
}

#[derive(Debug, Error)]
pub enum FontError {
    #[error("no font file found for family {0:?}")]
    NotFound(String),
    #[error("failed to read font {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse font {path:?}: {message}")]
    Parse { path: PathBuf, message: &'static str },
}

/// A pango-style description such as `"pango:Sans 10"`.
#[derive(Clone, Debug, PartialEq)]
pub struct FontDescription {
    pub family: String,
    pub size_pt: f32,
}

impl FontDescription {
    pub fn pixel_size(&self) -> f32 { self.size_pt * DPI / 72.0 }
}

impl FromStr for FontDescription {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("pango:").unwrap_or(s).trim();
        let (family, size_pt) = match s.rsplit_once(char::is_whitespace) {
            Some((family, size)) => match size.parse::<f32>() {
                Ok(size) if size > 0.0 => (family.trim(), size),
                _ => (s, DEFAULT_SIZE_PT),
            },
            None => match s.parse::<f32>() {
                Ok(size) if size > 0.0 => ("", size),
                _ => (s, DEFAULT_SIZE_PT),
            },
        };
        let family = if family.is_empty() { "Sans" } else { family };
        Ok(FontDescription { family: family.to_string(), size_pt })
    }
}

fn normalize(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii_alphanumeric()).map(|c| c.to_ascii_lowercase()).collect()
}

/// File stems to look for, best first.
fn candidate_stems(family: &str) -> Vec<String> {
    let generic: &[&str] = match normalize(family).as_str() {
        "sans" | "sansserif" => {
            &["DejaVuSans", "NotoSans-Regular", "LiberationSans-Regular", "Cantarell-Regular", "FreeSans"]
        }
        "serif" => &["DejaVuSerif", "NotoSerif-Regular", "LiberationSerif-Regular", "FreeSerif"],
        "mono" | "monospace" => {
            &["DejaVuSansMono", "NotoSansMono-Regular", "LiberationMono-Regular", "FreeMono"]
        }
        _ => &[],
    };
    let mut stems: Vec<String> = generic.iter().map(|s| normalize(s)).collect();
    stems.push(normalize(&format!("{family}-Regular")));
    stems.push(normalize(family));
    stems
}

fn font_dirs() -> Vec<PathBuf> {
    let mut dirs_out = Vec::new();
    dirs_out.extend(dirs::font_dir());
    dirs_out.extend(dirs::data_dir().map(|d| d.join("fonts")));
    dirs_out.extend(dirs::home_dir().map(|d| d.join(".fonts")));
    dirs_out.push(PathBuf::from("/usr/local/share/fonts"));
    dirs_out.push(PathBuf::from("/usr/share/fonts"));
    dirs_out
}

fn collect_font_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_font_files(&path, out);
        } else if let Some(ext) = path.extension().and_then(|e| e.to_str())
            && matches!(ext.to_ascii_lowercase().as_str(), "ttf" | "otf")
        {
            out.push(path);
        }
    }
}

/// Picks the file whose stem matches the earliest candidate.
fn pick_font<'a>(family: &str, files: &'a [PathBuf]) -> Option<&'a PathBuf> {
    candidate_stems(family).iter().find_map(|stem| {
        files.iter().find(|path| {
            path.file_stem().and_then(|s| s.to_str()).is_some_and(|s| normalize(s) == *stem)
        })
    })
}

pub fn resolve_font(family: &str) -> Result<PathBuf, FontError> {
    let as_path = Path::new(family);
    if as_path.is_absolute() && as_path.is_file() {
        return Ok(as_path.to_path_buf());
    }
    let mut files = Vec::new();
    for dir in font_dirs() {
        collect_font_files(&dir, &mut files);
    }
    debug!(count = files.len(), "scanned font files");
    pick_font(family, &files).cloned().ok_or_else(|| FontError::NotFound(family.to_string()))
}

/// Text backend rasterizing with `fontdue`.
pub struct FontdueText {
    font: Font,
    px: f32,
}

impl FontdueText {
    pub fn load(description: &FontDescription) -> Result<Self, FontError> {
        let path = resolve_font(&description.family)?;
        let bytes = fs::read(&path).map_err(|source| FontError::Read { path: path.clone(), source })?;
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|message| FontError::Parse { path: path.clone(), message })?;
        info!(?path, px = description.pixel_size(), "loaded font");
        Ok(FontdueText { font, px: description.pixel_size() })
    }

    fn ascent(&self, px: f32) -> f32 {
        self.font.horizontal_line_metrics(px).map_or(px, |m| m.ascent)
    }
}

impl TextMeasure for FontdueText {
    fn measure(&self, text: &str) -> TextSize {
        let width: f32 = text.chars().map(|c| self.font.metrics(c, self.px).advance_width).sum();
        let height = self.font.horizontal_line_metrics(self.px).map_or(self.px * 1.2, |m| m.new_line_size);
        TextSize {
            width: width.ceil() as i32,
            height: height.ceil() as i32,
        }
    }
}

impl TextRenderer for FontdueText {
    fn draw(&self, canvas: &mut Canvas<'_>, text: &str, x: i32, y: i32, clip: ClipRect, color: Color) {
        let scale = canvas.scale();
        let px = self.px * scale as f32;
        let baseline = y * scale + self.ascent(px).round() as i32;
        let mut pen = (x * scale) as f32;
        for c in text.chars() {
            let (metrics, coverage) = self.font.rasterize(c, px);
            let gx = (pen + metrics.xmin as f32).round() as i32;
            let gy = baseline - (metrics.height as i32 + metrics.ymin);
            canvas.blend_coverage(gx, gy, metrics.width, &coverage, clip, color);
            pen += metrics.advance_width;
        }
    }
}
