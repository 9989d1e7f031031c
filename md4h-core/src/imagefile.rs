//! Image filename generation and parsing
//!
//! Saved images have gone through three naming generations. The current
//! form is a bare sanitized stem; older files embedded the paste/drop
//! origin, a millisecond timestamp, and pixel dimensions. The generator
//! only produces the current form, but the parser accepts every
//! generation so existing documents keep resolving, degrading to a
//! whole-stem fallback rather than failing.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// How an image arrived in the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageOrigin {
    Dropped,
    Pasted,
}

impl ImageOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageOrigin::Dropped => "dropped",
            ImageOrigin::Pasted => "pasted",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "dropped" => Some(ImageOrigin::Dropped),
            "pasted" => Some(ImageOrigin::Pasted),
            _ => None,
        }
    }
}

/// Pixel dimensions parsed out of a legacy filename.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A filename decomposed into its naming-convention parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedImageFilename {
    pub source: Option<ImageOrigin>,
    pub name: String,
    pub dimensions: Option<Dimensions>,
    pub extension: String,
}

/// Original names that carry no information and get replaced with an
/// origin-plus-timestamp name instead.
pub const GENERIC_STEMS: &[&str] = &["image", "screenshot", "clipboard-image", "clipboard_image"];

const MAX_STEM_LEN: usize = 50;

/// Generates filenames for saved images. Extra generic names can be
/// supplied from configuration on top of the built-in set.
#[derive(Clone, Debug, Default)]
pub struct ImageNamer {
    extra_generic_names: Vec<String>,
}

impl ImageNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_generic_names(extra: Vec<String>) -> Self {
        Self {
            extra_generic_names: extra,
        }
    }

    /// Generate a filename for a saved image. Dimensions are accepted for
    /// call-site parity with the legacy convention but are no longer
    /// embedded in the name; `parse_image_filename` still reads them from
    /// old files.
    pub fn generate(
        &self,
        original: &str,
        origin: ImageOrigin,
        dimensions: Option<Dimensions>,
    ) -> String {
        self.generate_at(original, origin, dimensions, Utc::now())
    }

    pub fn generate_at(
        &self,
        original: &str,
        origin: ImageOrigin,
        _dimensions: Option<Dimensions>,
        now: DateTime<Utc>,
    ) -> String {
        let (stem, ext) = split_extension(original);
        let ext = if ext.is_empty() {
            "png".to_string()
        } else {
            ext.to_lowercase()
        };
        let sanitized = sanitize_stem(stem);
        if sanitized.is_empty() || self.is_generic(stem) {
            format!("{}_{}.{ext}", origin.as_str(), now.format("%Y%m%d%H%M%S"))
        } else {
            format!("{sanitized}.{ext}")
        }
    }

    fn is_generic(&self, stem: &str) -> bool {
        let lower = stem.trim().to_lowercase();
        GENERIC_STEMS.contains(&lower.as_str())
            || self
                .extra_generic_names
                .iter()
                .any(|n| n.to_lowercase() == lower)
    }
}

/// Replace everything outside `[A-Za-z0-9-_]` with a hyphen, collapse
/// repeats, trim, and cap the length.
fn sanitize_stem(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len());
    let mut prev_hyphen = false;
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
            prev_hyphen = false;
        } else if !prev_hyphen {
            out.push('-');
            prev_hyphen = true;
        }
    }
    let trimmed = out.trim_matches('-');
    trimmed.chars().take(MAX_STEM_LEN).collect()
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => (stem, ext),
        _ => (name, ""),
    }
}

fn timestamped_dims_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(dropped|pasted)_)?(.+)_\d{13}_(\d+)x(\d+)px\.([A-Za-z0-9]+)$").unwrap()
    })
}

fn dims_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(dropped|pasted)_)?(.+)_(\d+)x(\d+)px\.([A-Za-z0-9]+)$").unwrap()
    })
}

fn hyphen_timestamp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+)-\d{10,14}\.([A-Za-z0-9]+)$").unwrap())
}

/// Decompose a saved image filename. Tries the naming generations from
/// most to least specific and never fails: an unrecognized name comes
/// back whole as the stem.
pub fn parse_image_filename(filename: &str) -> ParsedImageFilename {
    if let Some(caps) = timestamped_dims_re().captures(filename) {
        return ParsedImageFilename {
            source: caps.get(1).and_then(|m| ImageOrigin::from_str(m.as_str())),
            name: caps[2].to_string(),
            dimensions: parse_dims(&caps[3], &caps[4]),
            extension: caps[5].to_lowercase(),
        };
    }
    if let Some(caps) = dims_re().captures(filename) {
        return ParsedImageFilename {
            source: caps.get(1).and_then(|m| ImageOrigin::from_str(m.as_str())),
            name: caps[2].to_string(),
            dimensions: parse_dims(&caps[3], &caps[4]),
            extension: caps[5].to_lowercase(),
        };
    }
    if let Some(caps) = hyphen_timestamp_re().captures(filename) {
        return ParsedImageFilename {
            source: None,
            name: caps[1].to_string(),
            dimensions: None,
            extension: caps[2].to_lowercase(),
        };
    }
    let (stem, ext) = split_extension(filename);
    ParsedImageFilename {
        source: None,
        name: stem.to_string(),
        dimensions: None,
        extension: ext.to_lowercase(),
    }
}

fn parse_dims(w: &str, h: &str) -> Option<Dimensions> {
    Some(Dimensions {
        width: w.parse().ok()?,
        height: h.parse().ok()?,
    })
}
