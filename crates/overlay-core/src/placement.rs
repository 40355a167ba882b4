//! Anchor-point transformation between viewer space and page space
//!
//! Viewer space is normalized with the origin at the top-left and y growing
//! downward; page space is in points with the origin at the bottom-left and
//! y growing upward. One `RenderSpec` is resolved per request and shared by
//! every anchor in it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::OverlayError;
use crate::font::TextMeasurer;

/// Size the fitting search starts from.
pub const INITIAL_FONT_SIZE: f64 = 180.0;

/// Floor below which the fitting search gives up shrinking.
pub const MIN_FONT_SIZE: f64 = 4.0;

/// Iteration cap for the fitting search.
pub const MAX_FIT_ITERATIONS: usize = 20;

/// One signature anchor in viewer space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementPoint {
    pub page_index: usize,
    pub x_norm: f64,
    pub y_norm: f64,
}

/// Anchors grouped by page, insertion order preserved within a page.
#[derive(Debug, Clone, Default)]
pub struct PagePlacements {
    by_page: BTreeMap<usize, Vec<PlacementPoint>>,
}

impl PagePlacements {
    pub fn from_points(points: impl IntoIterator<Item = PlacementPoint>) -> Self {
        let mut by_page: BTreeMap<usize, Vec<PlacementPoint>> = BTreeMap::new();
        for point in points {
            by_page.entry(point.page_index).or_default().push(point);
        }
        Self { by_page }
    }

    pub fn is_empty(&self) -> bool {
        self.by_page.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[PlacementPoint])> {
        self.by_page.iter().map(|(&idx, pts)| (idx, pts.as_slice()))
    }
}

/// Page dimensions in points, bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
}

/// What is being stamped: a raster image with a fixed pixel aspect ratio, or
/// a text label measured by a font.
pub enum SignatureAsset<'a> {
    Raster {
        /// `height_px / width_px` of the uploaded image.
        aspect: f64,
    },
    Text {
        label: &'a str,
        measurer: &'a dyn TextMeasurer,
    },
}

/// The one scale shared by all anchors of a request.
///
/// `anchor_drop` is the vertical distance from the viewer-space anchor down
/// to the emitted y coordinate: the full rendered height for images (whose y
/// names the bottom edge) and `height - ascent` for text (whose y names the
/// baseline).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderSpec {
    pub width_pt: f64,
    pub height_pt: f64,
    /// Set in text mode only.
    pub font_size: Option<f64>,
    pub anchor_drop: f64,
}

/// An anchor resolved to page space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PagePoint {
    pub x: f64,
    pub y: f64,
}

/// All anchors of one page, in placement order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageOverlay {
    pub page_index: usize,
    pub anchors: Vec<PagePoint>,
}

/// The complete, validated output of the placement transform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayPlan {
    pub spec: RenderSpec,
    pub pages: Vec<PageOverlay>,
}

/// Search a font size whose rendered line width fits `target_width`.
///
/// Starts large and scales by `target / measured`, refining downward for at
/// most [`MAX_FIT_ITERATIONS`] steps or until [`MIN_FONT_SIZE`]; the size
/// sequence is strictly decreasing while the text does not fit, so the
/// search always terminates.
pub fn fit_font_size(measurer: &dyn TextMeasurer, text: &str, target_width: f64) -> f64 {
    let mut size = INITIAL_FONT_SIZE;

    for _ in 0..MAX_FIT_ITERATIONS {
        let measured = measurer.line_width(text, size);
        if measured <= target_width || size <= MIN_FONT_SIZE {
            break;
        }
        // The proportional step lands exactly for linear measurers; the
        // shrink floor keeps progress when a measurer is not linear.
        let scaled = size * (target_width / measured);
        size = scaled.min(size - 0.25).max(MIN_FONT_SIZE);
    }

    size
}

/// Resolve the scale shared by every anchor of a request.
pub fn resolve_render_spec(
    asset: &SignatureAsset<'_>,
    width_pt: f64,
) -> Result<RenderSpec, OverlayError> {
    if !(width_pt > 0.0) {
        return Err(OverlayError::InvalidWidth(width_pt));
    }

    match asset {
        SignatureAsset::Raster { aspect } => {
            let height_pt = width_pt * aspect;
            Ok(RenderSpec {
                width_pt,
                height_pt,
                font_size: None,
                anchor_drop: height_pt,
            })
        }
        SignatureAsset::Text { label, measurer } => {
            let size = fit_font_size(*measurer, label, width_pt);
            let ascent = measurer.ascent(size);
            Ok(RenderSpec {
                width_pt: measurer.line_width(label, size),
                height_pt: size,
                font_size: Some(size),
                anchor_drop: size - ascent,
            })
        }
    }
}

/// Convert grouped anchors to page space under one `RenderSpec`.
///
/// Every anchor must name an existing page; an out-of-range index fails the
/// whole request rather than being dropped.
pub fn plan_overlays(
    placements: &PagePlacements,
    pages: &[PageGeometry],
    spec: RenderSpec,
) -> Result<OverlayPlan, OverlayError> {
    let mut out = Vec::new();

    for (page_index, points) in placements.iter() {
        let geometry = pages
            .get(page_index)
            .ok_or(OverlayError::PageOutOfRange {
                page_index,
                page_count: pages.len(),
            })?;

        let anchors = points
            .iter()
            .map(|p| {
                let x = p.x_norm * geometry.width;
                let y_top = p.y_norm * geometry.height;
                PagePoint {
                    x,
                    y: geometry.height - y_top - spec.anchor_drop,
                }
            })
            .collect();

        out.push(PageOverlay { page_index, anchors });
    }

    Ok(OverlayPlan { spec, pages: out })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Measurer whose width is `chars * ratio * size`, ascent 80% of size.
    struct LinearMeasurer {
        per_char_em: f64,
    }

    impl TextMeasurer for LinearMeasurer {
        fn line_width(&self, text: &str, size: f64) -> f64 {
            text.chars().count() as f64 * self.per_char_em * size
        }

        fn ascent(&self, size: f64) -> f64 {
            0.80 * size
        }
    }

    const LETTER: PageGeometry = PageGeometry {
        width: 612.0,
        height: 792.0,
    };

    fn raster_spec(width_pt: f64, aspect: f64) -> RenderSpec {
        resolve_render_spec(&SignatureAsset::Raster { aspect }, width_pt).unwrap()
    }

    #[test]
    fn top_left_corner_maps_to_page_top() {
        // h = 20pt on US Letter: the bottom edge of the stamp sits at 772.
        let spec = raster_spec(200.0, 0.1);
        assert_eq!(spec.height_pt, 20.0);

        let placements = PagePlacements::from_points([PlacementPoint {
            page_index: 0,
            x_norm: 0.0,
            y_norm: 0.0,
        }]);
        let plan = plan_overlays(&placements, &[LETTER], spec).unwrap();

        assert_eq!(plan.pages.len(), 1);
        assert_eq!(plan.pages[0].anchors, vec![PagePoint { x: 0.0, y: 772.0 }]);
    }

    #[test]
    fn bottom_right_corner_drops_below_page_edge() {
        let spec = raster_spec(100.0, 0.5);
        let placements = PagePlacements::from_points([PlacementPoint {
            page_index: 0,
            x_norm: 1.0,
            y_norm: 1.0,
        }]);
        let plan = plan_overlays(&placements, &[LETTER], spec).unwrap();

        let anchor = plan.pages[0].anchors[0];
        assert_eq!(anchor.x, 612.0);
        // y_top = page height, so the stamp bottom ends up below the page.
        assert_eq!(anchor.y, -50.0);
    }

    #[test]
    fn text_anchor_uses_baseline_offset() {
        let measurer = LinearMeasurer { per_char_em: 0.05 };
        let spec = resolve_render_spec(
            &SignatureAsset::Text {
                label: "Jane Doe",
                measurer: &measurer,
            },
            200.0,
        )
        .unwrap();

        // 8 chars * 0.05em fits 200pt at any size <= 500, so the initial
        // size survives and the baseline sits ascent below the anchor top.
        let size = spec.font_size.unwrap();
        assert_eq!(size, INITIAL_FONT_SIZE);
        assert!((spec.anchor_drop - (size - 0.80 * size)).abs() < 1e-9);

        let placements = PagePlacements::from_points([PlacementPoint {
            page_index: 0,
            x_norm: 0.5,
            y_norm: 0.25,
        }]);
        let plan = plan_overlays(&placements, &[LETTER], spec).unwrap();
        let anchor = plan.pages[0].anchors[0];
        assert_eq!(anchor.x, 306.0);
        assert!((anchor.y - (792.0 - 198.0 - spec.anchor_drop)).abs() < 1e-9);
    }

    #[test]
    fn fitted_width_meets_target() {
        let measurer = LinearMeasurer { per_char_em: 0.6 };
        let text = "Alexandra Featherstonehaugh";
        let size = fit_font_size(&measurer, text, 200.0);

        assert!(measurer.line_width(text, size) <= 200.0);
        assert!(size >= MIN_FONT_SIZE);
    }

    #[test]
    fn fitting_hits_floor_for_impossible_targets() {
        let measurer = LinearMeasurer { per_char_em: 10.0 };
        let size = fit_font_size(&measurer, "wide", 1.0);
        assert_eq!(size, MIN_FONT_SIZE);
    }

    #[test]
    fn empty_text_keeps_initial_size() {
        let measurer = LinearMeasurer { per_char_em: 0.6 };
        assert_eq!(fit_font_size(&measurer, "", 200.0), INITIAL_FONT_SIZE);
    }

    #[test]
    fn zero_width_is_rejected() {
        let result = resolve_render_spec(&SignatureAsset::Raster { aspect: 0.5 }, 0.0);
        assert!(matches!(result, Err(OverlayError::InvalidWidth(_))));

        let result = resolve_render_spec(&SignatureAsset::Raster { aspect: 0.5 }, -3.0);
        assert!(matches!(result, Err(OverlayError::InvalidWidth(_))));
    }

    #[test]
    fn nan_width_is_rejected() {
        let result = resolve_render_spec(&SignatureAsset::Raster { aspect: 0.5 }, f64::NAN);
        assert!(matches!(result, Err(OverlayError::InvalidWidth(_))));
    }

    #[test]
    fn placement_past_last_page_fails_whole_request() {
        let spec = raster_spec(200.0, 0.25);
        let placements = PagePlacements::from_points([
            PlacementPoint {
                page_index: 0,
                x_norm: 0.1,
                y_norm: 0.1,
            },
            PlacementPoint {
                page_index: 3,
                x_norm: 0.1,
                y_norm: 0.1,
            },
        ]);

        let result = plan_overlays(&placements, &[LETTER, LETTER], spec);
        match result {
            Err(OverlayError::PageOutOfRange {
                page_index,
                page_count,
            }) => {
                assert_eq!(page_index, 3);
                assert_eq!(page_count, 2);
            }
            _ => panic!("expected PageOutOfRange"),
        }
    }

    #[test]
    fn pages_without_placements_are_skipped() {
        let spec = raster_spec(200.0, 0.25);
        let placements = PagePlacements::from_points([
            PlacementPoint {
                page_index: 2,
                x_norm: 0.5,
                y_norm: 0.5,
            },
            PlacementPoint {
                page_index: 0,
                x_norm: 0.5,
                y_norm: 0.5,
            },
        ]);

        let plan = plan_overlays(&placements, &[LETTER; 3], spec).unwrap();
        let indexes: Vec<usize> = plan.pages.iter().map(|p| p.page_index).collect();
        assert_eq!(indexes, vec![0, 2]);
    }

    #[test]
    fn multiple_anchors_on_one_page_keep_order() {
        let spec = raster_spec(100.0, 0.2);
        let placements = PagePlacements::from_points([
            PlacementPoint {
                page_index: 0,
                x_norm: 0.75,
                y_norm: 0.1,
            },
            PlacementPoint {
                page_index: 0,
                x_norm: 0.25,
                y_norm: 0.9,
            },
        ]);

        let plan = plan_overlays(&placements, &[LETTER], spec).unwrap();
        assert_eq!(plan.pages[0].anchors.len(), 2);
        assert!(plan.pages[0].anchors[0].x > plan.pages[0].anchors[1].x);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    struct LinearMeasurer {
        per_char_em: f64,
    }

    impl TextMeasurer for LinearMeasurer {
        fn line_width(&self, text: &str, size: f64) -> f64 {
            text.chars().count() as f64 * self.per_char_em * size
        }

        fn ascent(&self, size: f64) -> f64 {
            0.80 * size
        }
    }

    proptest! {
        /// Property: fitting meets the target or bottoms out at the floor.
        #[test]
        fn fit_meets_target_or_floor(
            per_char_em in 0.2f64..2.0,
            len in 1usize..60,
            target in 10.0f64..600.0,
        ) {
            let measurer = LinearMeasurer { per_char_em };
            let text: String = "x".repeat(len);
            let size = fit_font_size(&measurer, &text, target);

            prop_assert!(size >= MIN_FONT_SIZE);
            prop_assert!(size <= INITIAL_FONT_SIZE);
            let fits = measurer.line_width(&text, size) <= target;
            prop_assert!(fits || size <= MIN_FONT_SIZE + 1e-9);
        }

        /// Property: anchors stay on the page for interior placements once
        /// the stamp height fits above the anchor.
        #[test]
        fn interior_anchor_positions_are_linear(
            x_norm in 0.0f64..=1.0,
            y_norm in 0.0f64..=1.0,
            width in 50.0f64..400.0,
            aspect in 0.05f64..1.0,
        ) {
            let spec = resolve_render_spec(&SignatureAsset::Raster { aspect }, width).unwrap();
            let page = PageGeometry { width: 612.0, height: 792.0 };
            let placements = PagePlacements::from_points([PlacementPoint {
                page_index: 0,
                x_norm,
                y_norm,
            }]);

            let plan = plan_overlays(&placements, &[page], spec).unwrap();
            let anchor = plan.pages[0].anchors[0];

            prop_assert!((anchor.x - x_norm * page.width).abs() < 1e-9);
            let expected_y = page.height - y_norm * page.height - spec.height_pt;
            prop_assert!((anchor.y - expected_y).abs() < 1e-9);
        }

        /// Property: planning the same request twice yields the same plan.
        #[test]
        fn planning_is_deterministic(
            points in prop::collection::vec((0usize..3, 0.0f64..=1.0, 0.0f64..=1.0), 1..10),
            width in 50.0f64..400.0,
        ) {
            let spec = resolve_render_spec(&SignatureAsset::Raster { aspect: 0.3 }, width).unwrap();
            let pages = [PageGeometry { width: 612.0, height: 792.0 }; 3];
            let placements = PagePlacements::from_points(points.iter().map(|&(p, x, y)| {
                PlacementPoint { page_index: p, x_norm: x, y_norm: y }
            }));

            let a = plan_overlays(&placements, &pages, spec).unwrap();
            let b = plan_overlays(&placements, &pages, spec).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
