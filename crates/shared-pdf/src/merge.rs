//! Document merging
//!
//! Appends the pages of each source document after the previous one. Object
//! IDs of every subsequent source are shifted past the destination's highest
//! ID so references never collide, then the destination page tree is rebuilt
//! with the combined page list.

use std::collections::BTreeMap;

use lopdf::{Document, Object, ObjectId};

use crate::error::PdfError;

/// Merge documents in the given order into one PDF.
pub fn merge_documents(documents: Vec<Vec<u8>>) -> Result<Vec<u8>, PdfError> {
    if documents.is_empty() {
        return Err(PdfError::Operation("no documents to merge".into()));
    }
    if documents.len() == 1 {
        return Ok(documents.into_iter().next().unwrap());
    }

    let mut sources = Vec::with_capacity(documents.len());
    for (i, bytes) in documents.iter().enumerate() {
        let doc = Document::load_mem(bytes)
            .map_err(|e| PdfError::Parse(format!("document {}: {}", i + 1, e)))?;
        sources.push(doc);
    }

    let mut dest = sources.remove(0);
    let mut next_id = dest.max_id;
    let mut page_refs: Vec<ObjectId> = dest.get_pages().values().copied().collect();

    for source in sources {
        let offset = next_id;
        let source_pages: Vec<ObjectId> = source.get_pages().values().copied().collect();

        let mut shifted: BTreeMap<ObjectId, Object> = BTreeMap::new();
        for (id, object) in source.objects.into_iter() {
            shifted.insert((id.0 + offset, id.1), shift_references(object, offset));
        }
        dest.objects.extend(shifted);

        page_refs.extend(source_pages.into_iter().map(|id| (id.0 + offset, id.1)));
        next_id = (source.max_id + offset).max(next_id);
    }

    rebuild_page_tree(&mut dest, page_refs)?;
    dest.max_id = next_id;
    dest.compress();

    let mut buffer = Vec::new();
    dest.save_to(&mut buffer)
        .map_err(|e| PdfError::Operation(format!("save failed: {}", e)))?;

    Ok(buffer)
}

/// Shift every object reference inside `object` by `offset`.
fn shift_references(object: Object, offset: u32) -> Object {
    match object {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(items) => Object::Array(
            items
                .into_iter()
                .map(|item| shift_references(item, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = shift_references(value.clone(), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = shift_references(value.clone(), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// Point the destination's Pages node at the combined page list.
fn rebuild_page_tree(doc: &mut Document, page_refs: Vec<ObjectId>) -> Result<(), PdfError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .ok()
        .and_then(|root| root.as_reference().ok())
        .ok_or_else(|| PdfError::Operation("trailer has no Root reference".into()))?;

    let pages_id = doc
        .objects
        .get(&catalog_id)
        .and_then(|catalog| catalog.as_dict().ok())
        .and_then(|catalog| catalog.get(b"Pages").ok())
        .and_then(|pages| pages.as_reference().ok())
        .ok_or_else(|| PdfError::Operation("catalog has no Pages reference".into()))?;

    match doc.objects.get_mut(&pages_id) {
        Some(Object::Dictionary(pages_dict)) => {
            let kids: Vec<Object> = page_refs.iter().map(|&id| Object::Reference(id)).collect();
            pages_dict.set("Count", Object::Integer(page_refs.len() as i64));
            pages_dict.set("Kids", Object::Array(kids));
            Ok(())
        }
        _ => Err(PdfError::Operation("Pages node is not a dictionary".into())),
    }
}
