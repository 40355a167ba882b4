//! Builders shared by the crate's tests.

use lopdf::{dictionary, Document, Object, Stream};

/// Build a US-Letter PDF with one page per entry, each drawing its text with
/// the built-in Helvetica font.
pub(crate) fn build_pdf(page_texts: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => Object::Reference(font_id),
        },
    });

    let mut page_ids = Vec::new();
    for text in page_texts {
        let content = format!("BT /F1 24 Tf 72 700 Td ({}) Tj ET", text);
        let content_id = doc.add_object(Stream::new(
            lopdf::Dictionary::new(),
            content.into_bytes(),
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Reference(content_id),
            "Resources" => Object::Reference(resources_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        page_ids.push(page_id);
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Count" => page_ids.len() as i64,
        "Kids" => page_ids
            .iter()
            .map(|&id| Object::Reference(id))
            .collect::<Vec<_>>(),
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Encode a tiny RGBA PNG for signature-image tests.
pub(crate) fn build_png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut bytes, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        let pixel = [20u8, 20, 20, 255];
        let data: Vec<u8> = pixel
            .iter()
            .copied()
            .cycle()
            .take((width * height * 4) as usize)
            .collect();
        writer.write_image_data(&data).unwrap();
    }
    bytes
}
