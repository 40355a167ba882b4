//! Signature placement planning
//!
//! Converts normalized viewer-space anchor points (origin top-left, y grows
//! downward) into absolute PDF page coordinates (origin bottom-left, y grows
//! upward), choosing one render scale per request that fits a requested
//! width. The plan produced here is handed to a rendering collaborator that
//! draws the signature text or image onto the affected pages.

pub mod error;
pub mod font;
pub mod placement;

pub use error::OverlayError;
pub use font::{
    cached_font, candidate_font_paths, resolve_font_path, FontAsset, TextMeasurer, FONT_PATH_ENV,
};
pub use placement::{
    fit_font_size, plan_overlays, resolve_render_spec, OverlayPlan, PageGeometry, PageOverlay,
    PagePlacements, PlacementPoint, RenderSpec, SignatureAsset,
};
