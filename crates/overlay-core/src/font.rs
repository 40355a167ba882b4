//! Signature font loading, measurement and process-wide caching
//!
//! Fonts are resolved from an ordered candidate list (environment override
//! first, then bundled and system locations) and parsed once per path into a
//! process-wide cache. Measurement works in PDF glyph space (1/1000 em) so
//! the same numbers feed both width fitting and font embedding.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use crate::error::OverlayError;

/// Environment variable overriding the signature font location.
pub const FONT_PATH_ENV: &str = "SIGNATURE_FONT_PATH";

/// Fraction of the font size assumed above the baseline when the face
/// carries no usable vertical metrics.
const FALLBACK_ASCENT_RATIO: f64 = 0.80;

/// Advance assumed for characters the face has no glyph for, in 1/1000 em.
const MISSING_GLYPH_ADVANCE: f64 = 500.0;

/// Width measurement contract used by the placement transform.
pub trait TextMeasurer {
    /// Width of `text` rendered on one line at `size` points.
    fn line_width(&self, text: &str, size: f64) -> f64;

    /// Distance from the baseline to the top of typical glyphs at `size`.
    fn ascent(&self, size: f64) -> f64;
}

/// A parsed TrueType/OpenType font with the metrics needed for fitting and
/// embedding. The raw bytes are kept so a renderer can embed the file.
#[derive(Debug)]
pub struct FontAsset {
    data: Vec<u8>,
    units_per_em: f64,
    ascent_units: f64,
    descent_units: f64,
    cap_height_units: f64,
    bbox_units: [f64; 4],
}

impl FontAsset {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, OverlayError> {
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|e| OverlayError::FontParse(e.to_string()))?;

        let units_per_em = f64::from(face.units_per_em());
        let ascent_units = f64::from(face.ascender());
        let descent_units = f64::from(face.descender());
        let cap_height_units = face
            .capital_height()
            .map(f64::from)
            .unwrap_or(ascent_units);
        let bbox = face.global_bounding_box();
        let bbox_units = [
            f64::from(bbox.x_min),
            f64::from(bbox.y_min),
            f64::from(bbox.x_max),
            f64::from(bbox.y_max),
        ];

        Ok(Self {
            data,
            units_per_em,
            ascent_units,
            descent_units,
            cap_height_units,
            bbox_units,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, OverlayError> {
        let data = std::fs::read(path).map_err(|source| OverlayError::FontRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(data)
    }

    /// Raw font file bytes, for embedding.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn to_glyph_space(&self, units: f64) -> f64 {
        units * 1000.0 / self.units_per_em
    }

    /// Advance width of `ch` in 1/1000 em (PDF glyph space).
    pub fn advance_1000(&self, ch: char) -> f64 {
        // The face borrows the owned bytes, so it is reparsed per call; the
        // parse is a header scan, not a font decode.
        let Ok(face) = ttf_parser::Face::parse(&self.data, 0) else {
            return MISSING_GLYPH_ADVANCE;
        };
        face.glyph_index(ch)
            .and_then(|gid| face.glyph_hor_advance(gid))
            .map(|adv| self.to_glyph_space(f64::from(adv)))
            .unwrap_or(MISSING_GLYPH_ADVANCE)
    }

    /// Ascent in 1/1000 em.
    pub fn ascent_1000(&self) -> f64 {
        self.to_glyph_space(self.ascent_units)
    }

    /// Descent in 1/1000 em (negative below the baseline).
    pub fn descent_1000(&self) -> f64 {
        self.to_glyph_space(self.descent_units)
    }

    /// Cap height in 1/1000 em.
    pub fn cap_height_1000(&self) -> f64 {
        self.to_glyph_space(self.cap_height_units)
    }

    /// Font bounding box in 1/1000 em.
    pub fn bbox_1000(&self) -> [f64; 4] {
        [
            self.to_glyph_space(self.bbox_units[0]),
            self.to_glyph_space(self.bbox_units[1]),
            self.to_glyph_space(self.bbox_units[2]),
            self.to_glyph_space(self.bbox_units[3]),
        ]
    }
}

impl TextMeasurer for FontAsset {
    fn line_width(&self, text: &str, size: f64) -> f64 {
        let Ok(face) = ttf_parser::Face::parse(&self.data, 0) else {
            return text.chars().count() as f64 * MISSING_GLYPH_ADVANCE / 1000.0 * size;
        };

        let total_1000: f64 = text
            .chars()
            .map(|ch| {
                face.glyph_index(ch)
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map(|adv| self.to_glyph_space(f64::from(adv)))
                    .unwrap_or(MISSING_GLYPH_ADVANCE)
            })
            .sum();

        total_1000 / 1000.0 * size
    }

    fn ascent(&self, size: f64) -> f64 {
        if self.cap_height_units > 0.0 {
            self.cap_height_units / self.units_per_em * size
        } else {
            FALLBACK_ASCENT_RATIO * size
        }
    }
}

/// Candidate font locations, most specific first.
///
/// The environment override is consulted first, then the bundled signature
/// font, then common system locations.
pub fn candidate_font_paths() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(path) = std::env::var(FONT_PATH_ENV) {
        if !path.is_empty() {
            candidates.push(PathBuf::from(path));
        }
    }

    candidates.push(PathBuf::from("assets/fonts/Signature.ttf"));
    candidates.push(PathBuf::from(
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    ));
    candidates.push(PathBuf::from("/usr/local/share/fonts/Signature.ttf"));
    candidates.push(PathBuf::from("/Library/Fonts/Arial Unicode.ttf"));

    candidates
}

/// Pick the first existing candidate.
///
/// Absence of every candidate is an error, never a silent fallback to a
/// degraded rendering path.
pub fn resolve_font_path(candidates: &[PathBuf]) -> Result<PathBuf, OverlayError> {
    for candidate in candidates {
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "resolved signature font");
            return Ok(candidate.clone());
        }
    }

    Err(OverlayError::FontMissing {
        searched: candidates.to_vec(),
    })
}

/// Process-wide font cache keyed by path.
static FONT_CACHE: OnceLock<Mutex<HashMap<PathBuf, Arc<FontAsset>>>> = OnceLock::new();

/// Load a font through the process-wide cache.
///
/// The first request for a path reads and parses the file; later requests
/// (including concurrent ones) share the parsed asset. Re-registering a path
/// is a no-op.
pub fn cached_font(path: &Path) -> Result<Arc<FontAsset>, OverlayError> {
    let cache = FONT_CACHE.get_or_init(|| Mutex::new(HashMap::new()));

    let mut cache = cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(asset) = cache.get(path) {
        return Ok(Arc::clone(asset));
    }

    let asset = Arc::new(FontAsset::from_path(path)?);
    cache.insert(path.to_path_buf(), Arc::clone(&asset));
    tracing::info!(path = %path.display(), "registered signature font");

    Ok(asset)
}
