//! Document metadata: page count and per-page geometry.

use lopdf::{Document, Object};
use overlay_core::PageGeometry;

use crate::error::PdfError;

/// US Letter, the fallback when a page carries no usable MediaBox.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// How far up the Pages tree to look for an inherited MediaBox.
const MEDIA_BOX_WALK_LIMIT: usize = 10;

/// Parse PDF bytes and return the page count.
pub fn page_count(bytes: &[u8]) -> Result<u32, PdfError> {
    let doc = Document::load_mem(bytes).map_err(|e| PdfError::Parse(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}

/// Per-page dimensions in points, in page order (index 0 = first page).
pub fn page_geometries(bytes: &[u8]) -> Result<Vec<PageGeometry>, PdfError> {
    let doc = Document::load_mem(bytes).map_err(|e| PdfError::Parse(e.to_string()))?;

    let mut geometries = Vec::new();
    for (_, page_id) in doc.get_pages() {
        let page = doc
            .get_object(page_id)
            .map_err(|e| PdfError::Parse(e.to_string()))?;
        let media_box = resolve_media_box(&doc, page, MEDIA_BOX_WALK_LIMIT);
        geometries.push(PageGeometry {
            width: media_box[2] - media_box[0],
            height: media_box[3] - media_box[1],
        });
    }

    Ok(geometries)
}

/// Resolve a page's MediaBox, following indirect references and walking up
/// the Pages tree when the page itself carries none.
fn resolve_media_box(doc: &Document, page: &Object, depth: usize) -> [f64; 4] {
    if depth == 0 {
        return DEFAULT_MEDIA_BOX;
    }

    let Object::Dictionary(dict) = page else {
        return DEFAULT_MEDIA_BOX;
    };

    if let Ok(media_box) = dict.get(b"MediaBox") {
        let array = match media_box {
            Object::Array(array) => Some(array),
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(Object::Array(array)) => Some(array),
                _ => None,
            },
            _ => None,
        };

        if let Some(array) = array {
            let values: Vec<f64> = array
                .iter()
                .filter_map(|obj| match obj {
                    Object::Integer(i) => Some(*i as f64),
                    Object::Real(r) => Some(f64::from(*r)),
                    _ => None,
                })
                .collect();
            if values.len() == 4 {
                return [values[0], values[1], values[2], values[3]];
            }
        }
    }

    if let Ok(Object::Reference(parent_id)) = dict.get(b"Parent") {
        if let Ok(parent) = doc.get_object(*parent_id) {
            return resolve_media_box(doc, parent, depth - 1);
        }
    }

    DEFAULT_MEDIA_BOX
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::build_pdf;
    use pretty_assertions::assert_eq;

    #[test]
    fn counts_pages() {
        let pdf = build_pdf(&["one", "two", "three"]);
        assert_eq!(page_count(&pdf).unwrap(), 3);
    }

    #[test]
    fn rejects_garbage() {
        assert!(page_count(b"this is not a pdf").is_err());
    }

    #[test]
    fn reads_letter_geometry() {
        let pdf = build_pdf(&["one", "two"]);
        let geometries = page_geometries(&pdf).unwrap();
        assert_eq!(geometries.len(), 2);
        for g in geometries {
            assert_eq!(g.width, 612.0);
            assert_eq!(g.height, 792.0);
        }
    }

    #[test]
    fn offset_media_box_yields_extent_not_corners() {
        use lopdf::{dictionary, Document, Object};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                Object::Integer(10),
                Object::Integer(20),
                Object::Integer(622),
                Object::Integer(812),
            ],
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Count" => 1,
            "Kids" => vec![Object::Reference(page_id)],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        let geometries = page_geometries(&bytes).unwrap();
        assert_eq!(geometries[0].width, 612.0);
        assert_eq!(geometries[0].height, 792.0);
    }
}
