//! Overlay stamping
//!
//! Draws a signature onto the pages named by an [`OverlayPlan`]. Text mode
//! embeds the resolved TrueType font once and writes `BT/Tf/Td/Tj` content;
//! raster mode embeds the uploaded PNG as an image XObject and writes
//! `cm/Do` content. New streams are appended after each page's existing
//! `Contents`, so the signature always renders on top.

use std::fmt::Write as _;
use std::io::Write as _;
use std::sync::Arc;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use overlay_core::{FontAsset, OverlayPlan};

use crate::error::PdfError;

/// Resource name of the embedded signature font.
const FONT_RESOURCE: &str = "FSig";

/// Resource name of the embedded signature image.
const IMAGE_RESOURCE: &str = "ImSig";

/// Near-black ink, matching the drawn-signature look.
const INK: &str = "0.08 0.08 0.08";

/// What gets drawn at each anchor of the plan.
pub enum OverlayContent {
    Text {
        label: String,
        font: Arc<FontAsset>,
    },
    Image {
        png_data: Vec<u8>,
    },
}

/// Width and height of a PNG in pixels.
pub fn png_dimensions(data: &[u8]) -> Result<(u32, u32), PdfError> {
    let decoder = png::Decoder::new(data);
    let reader = decoder
        .read_info()
        .map_err(|e| PdfError::Image(e.to_string()))?;
    let info = reader.info();
    Ok((info.width, info.height))
}

/// Stamp the plan's anchors onto the document and return the new bytes.
pub fn stamp_overlays(
    bytes: &[u8],
    plan: &OverlayPlan,
    content: &OverlayContent,
) -> Result<Vec<u8>, PdfError> {
    let mut doc = Document::load_mem(bytes).map_err(|e| PdfError::Parse(e.to_string()))?;
    let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();

    // One shared resource object for the whole request.
    let (category, resource_id) = match content {
        OverlayContent::Text { font, .. } => ("Font", embed_signature_font(&mut doc, font)),
        OverlayContent::Image { png_data } => {
            ("XObject", embed_signature_image(&mut doc, png_data)?)
        }
    };

    for page in &plan.pages {
        let &page_id = page_ids.get(page.page_index).ok_or_else(|| {
            PdfError::Operation(format!(
                "overlay targets page index {} but the document has {} pages",
                page.page_index,
                page_ids.len()
            ))
        })?;

        let ops = match content {
            OverlayContent::Text { label, .. } => text_ops(label, plan, page),
            OverlayContent::Image { .. } => image_ops(plan, page),
        };

        let resource_name = match content {
            OverlayContent::Text { .. } => FONT_RESOURCE,
            OverlayContent::Image { .. } => IMAGE_RESOURCE,
        };

        attach_page_resource(&mut doc, page_id, category, resource_name, resource_id)?;
        append_page_content(&mut doc, page_id, ops)?;
    }

    tracing::debug!(pages = plan.pages.len(), "stamped signature overlays");

    doc.compress();
    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| PdfError::Operation(format!("save failed: {}", e)))?;
    Ok(out)
}

/// Content stream drawing the label at every anchor of one page.
fn text_ops(label: &str, plan: &OverlayPlan, page: &overlay_core::PageOverlay) -> String {
    let size = plan.spec.font_size.unwrap_or(plan.spec.height_pt);
    let mut ops = String::new();

    ops.push_str("q\n");
    let _ = writeln!(ops, "{} rg", INK);
    for anchor in &page.anchors {
        ops.push_str("BT\n");
        let _ = writeln!(ops, "/{} {:.2} Tf", FONT_RESOURCE, size);
        let _ = writeln!(ops, "{:.2} {:.2} Td", anchor.x, anchor.y);
        let _ = writeln!(ops, "({}) Tj", escape_pdf_text(label));
        ops.push_str("ET\n");
    }
    ops.push_str("Q\n");

    ops
}

/// Content stream drawing the image XObject at every anchor of one page.
fn image_ops(plan: &OverlayPlan, page: &overlay_core::PageOverlay) -> String {
    let mut ops = String::new();

    for anchor in &page.anchors {
        ops.push_str("q\n");
        let _ = writeln!(
            ops,
            "{:.2} 0 0 {:.2} {:.2} {:.2} cm",
            plan.spec.width_pt, plan.spec.height_pt, anchor.x, anchor.y
        );
        let _ = writeln!(ops, "/{} Do", IMAGE_RESOURCE);
        ops.push_str("Q\n");
    }

    ops
}

/// Escape a label for a PDF literal string, mapping non-Latin-1 characters
/// to octal-escaped bytes the WinAnsi-encoded font can address.
fn escape_pdf_text(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for ch in label.chars() {
        match ch {
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\\' => out.push_str("\\\\"),
            ' '..='~' => out.push(ch),
            _ => {
                let byte = u32::from(ch);
                let byte = if (0xA0..=0xFF).contains(&byte) {
                    byte as u8
                } else {
                    b'?'
                };
                let _ = write!(out, "\\{:03o}", byte);
            }
        }
    }
    out
}

/// Embed the signature font as a simple WinAnsi TrueType font.
fn embed_signature_font(doc: &mut Document, font: &FontAsset) -> ObjectId {
    let font_file_id = doc.add_object(Object::Stream(Stream::new(
        dictionary! {
            "Length1" => font.data().len() as i64,
        },
        font.data().to_vec(),
    )));

    let bbox = font.bbox_1000();
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => "SigScript",
        // Nonsymbolic, so the WinAnsi encoding below applies.
        "Flags" => 32,
        "FontBBox" => vec![
            Object::Integer(bbox[0].round() as i64),
            Object::Integer(bbox[1].round() as i64),
            Object::Integer(bbox[2].round() as i64),
            Object::Integer(bbox[3].round() as i64),
        ],
        "ItalicAngle" => 0,
        "Ascent" => Object::Integer(font.ascent_1000().round() as i64),
        "Descent" => Object::Integer(font.descent_1000().round() as i64),
        "CapHeight" => Object::Integer(font.cap_height_1000().round() as i64),
        "StemV" => 80,
        "FontFile2" => Object::Reference(font_file_id),
    });

    let widths: Vec<Object> = (32u8..=255)
        .map(|code| Object::Integer(font.advance_1000(char::from(code)).round() as i64))
        .collect();

    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "TrueType",
        "BaseFont" => "SigScript",
        "FirstChar" => 32,
        "LastChar" => 255,
        "Widths" => widths,
        "Encoding" => "WinAnsiEncoding",
        "FontDescriptor" => Object::Reference(descriptor_id),
    })
}

/// Embed an 8-bit RGB/RGBA PNG as an image XObject (SMask carries alpha).
fn embed_signature_image(doc: &mut Document, png_data: &[u8]) -> Result<ObjectId, PdfError> {
    let decoder = png::Decoder::new(png_data);
    let mut reader = decoder
        .read_info()
        .map_err(|e| PdfError::Image(e.to_string()))?;
    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| PdfError::Image(e.to_string()))?;
    buf.truncate(info.buffer_size());

    if info.bit_depth != png::BitDepth::Eight {
        return Err(PdfError::Image(format!(
            "unsupported bit depth {:?}",
            info.bit_depth
        )));
    }

    let (rgb, alpha): (Vec<u8>, Option<Vec<u8>>) = match info.color_type {
        png::ColorType::Rgb => (buf, None),
        png::ColorType::Rgba => {
            let mut rgb = Vec::with_capacity(buf.len() / 4 * 3);
            let mut alpha = Vec::with_capacity(buf.len() / 4);
            for px in buf.chunks_exact(4) {
                rgb.extend_from_slice(&px[..3]);
                alpha.push(px[3]);
            }
            (rgb, Some(alpha))
        }
        png::ColorType::Grayscale => {
            let rgb = buf.iter().flat_map(|&g| [g, g, g]).collect();
            (rgb, None)
        }
        other => {
            return Err(PdfError::Image(format!(
                "unsupported color type {:?}",
                other
            )));
        }
    };

    let width = info.width as i64;
    let height = info.height as i64;

    let smask_id = match alpha {
        Some(alpha) => {
            let stream = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width,
                    "Height" => height,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                    "Filter" => "FlateDecode",
                },
                deflate(&alpha)?,
            );
            Some(doc.add_object(Object::Stream(stream)))
        }
        None => None,
    };

    let mut image_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width,
        "Height" => height,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    if let Some(smask_id) = smask_id {
        image_dict.set("SMask", Object::Reference(smask_id));
    }

    Ok(doc.add_object(Object::Stream(Stream::new(image_dict, deflate(&rgb)?))))
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, PdfError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| PdfError::Image(format!("compression failed: {}", e)))
}

/// Give the page its own Resources dictionary (cloning any inherited one)
/// and register `name` under `category` in it.
fn attach_page_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &str,
    name: &str,
    target: ObjectId,
) -> Result<(), PdfError> {
    let mut resources = effective_resources(doc, page_id)?;

    let mut entries = match resources.get(category.as_bytes()) {
        Ok(Object::Dictionary(existing)) => existing.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Dictionary(existing)) => existing.clone(),
            _ => Dictionary::new(),
        },
        _ => Dictionary::new(),
    };
    entries.set(name, Object::Reference(target));
    resources.set(category, Object::Dictionary(entries));

    let page = doc
        .get_object_mut(page_id)
        .map_err(|e| PdfError::Operation(e.to_string()))?;
    match page {
        Object::Dictionary(dict) => {
            dict.set("Resources", Object::Dictionary(resources));
            Ok(())
        }
        _ => Err(PdfError::Operation("page is not a dictionary".into())),
    }
}

/// The page's effective Resources dictionary: its own, an indirect one, or
/// one inherited from the Pages tree. Missing everywhere yields an empty
/// dictionary.
fn effective_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary, PdfError> {
    let mut current = doc
        .get_object(page_id)
        .map_err(|e| PdfError::Operation(e.to_string()))?;

    for _ in 0..10 {
        let Object::Dictionary(dict) = current else {
            break;
        };

        match dict.get(b"Resources") {
            Ok(Object::Dictionary(resources)) => return Ok(resources.clone()),
            Ok(Object::Reference(id)) => {
                if let Ok(Object::Dictionary(resources)) = doc.get_object(*id) {
                    return Ok(resources.clone());
                }
                break;
            }
            _ => {}
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => match doc.get_object(*parent_id) {
                Ok(parent) => current = parent,
                Err(_) => break,
            },
            _ => break,
        }
    }

    Ok(Dictionary::new())
}

/// Append a content stream after the page's existing Contents.
fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    ops: String,
) -> Result<(), PdfError> {
    let content_id = doc.add_object(Object::Stream(Stream::new(
        Dictionary::new(),
        ops.into_bytes(),
    )));

    let page = doc
        .get_object_mut(page_id)
        .map_err(|e| PdfError::Operation(e.to_string()))?;

    let Object::Dictionary(dict) = page else {
        return Err(PdfError::Operation("page is not a dictionary".into()));
    };

    match dict.get(b"Contents").ok().cloned() {
        Some(Object::Reference(existing)) => {
            dict.set(
                "Contents",
                Object::Array(vec![
                    Object::Reference(existing),
                    Object::Reference(content_id),
                ]),
            );
        }
        Some(Object::Array(mut streams)) => {
            streams.push(Object::Reference(content_id));
            dict.set("Contents", Object::Array(streams));
        }
        _ => {
            dict.set("Contents", Object::Reference(content_id));
        }
    }

    Ok(())
}
