//! HTTP handlers for the PDF tools
//!
//! Every tool accepts a multipart form, runs the in-memory pipeline and
//! returns the produced file as an attachment download.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::Path;

use axum::extract::Multipart;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use docxgen_core::DocxBuilder;
use overlay_core::{
    cached_font, candidate_font_paths, plan_overlays, resolve_font_path, resolve_render_spec,
    PagePlacements, PlacementPoint, SignatureAsset,
};
use rangeplan_core::normalize_ranges;
use shared_pdf::{
    extract_range, extract_text, find_urls, merge_documents, page_count, page_geometries,
    png_dimensions, stamp_overlays, OverlayContent,
};

use crate::error::ServerError;

const PDF_MIME: &str = "application/pdf";
const ZIP_MIME: &str = "application/zip";
const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Default signature width in PDF points (1/72 inch).
const DEFAULT_SIG_WIDTH_PT: f64 = 200.0;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "ihatepdf-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Handler: POST /api/convert
///
/// Field `pdf`: the document. Returns its text layer as `{stem}.docx`.
pub async fn handle_convert(multipart: Multipart) -> Result<Response, ServerError> {
    let form = FormData::collect(multipart).await?;
    let (name, bytes) = form.pdf_file("pdf", "Please upload a PDF file.")?;

    info!("Convert request: file={}, {} bytes", name, bytes.len());

    page_count(bytes)?;
    let text = extract_text(bytes)?;

    let mut builder = DocxBuilder::new();
    append_text_paragraphs(&mut builder, &text);
    if builder.is_empty() {
        builder.paragraph("No text layer was found in this PDF.");
        builder.paragraph("(Note: scanned PDFs/images need OCR; text-only extraction was used.)");
    }

    let docx_name = format!("{}.docx", stem_of(&name));
    Ok(attachment(builder.build()?, &docx_name, DOCX_MIME))
}

/// Handler: POST /api/merge
///
/// Fields `pdf1` and `pdf2`, optional `output_format` (`pdf` default or
/// `docx`). Returns `merged.pdf` or `merged.docx`.
pub async fn handle_merge(multipart: Multipart) -> Result<Response, ServerError> {
    let form = FormData::collect(multipart).await?;
    let (n1, first) = form.pdf_file("pdf1", "Please upload two PDF files.")?;
    let (n2, second) = form.pdf_file("pdf2", "Please upload two PDF files.")?;
    let format = output_format(&form, "pdf")?;

    info!("Merge request: {} + {} as {}", n1, n2, format);

    match format.as_str() {
        "pdf" => {
            let merged = merge_documents(vec![first.to_vec(), second.to_vec()])?;
            Ok(attachment(merged, "merged.pdf", PDF_MIME))
        }
        _ => {
            let mut builder = DocxBuilder::new();
            for bytes in [first, second] {
                page_count(bytes)?;
                append_text_paragraphs(&mut builder, &extract_text(bytes)?);
            }
            Ok(attachment(builder.build()?, "merged.docx", DOCX_MIME))
        }
    }
}

/// Handler: POST /api/split
///
/// Fields `file`, `output_format` (`pdf` or `docx`) and repeated
/// `start[]`/`end[]` pairs. Returns a zip of the plan's parts.
pub async fn handle_split(multipart: Multipart) -> Result<Response, ServerError> {
    let form = FormData::collect(multipart).await?;
    let (name, bytes) = form.pdf_file("file", "Please upload a PDF file.")?;
    let format = form.value("output_format").unwrap_or("").to_lowercase();
    if !matches!(format.as_str(), "pdf" | "docx") {
        return Err(ServerError::InvalidRequest(
            "Please choose an output format: PDF or DOCX.".into(),
        ));
    }

    let total_pages = page_count(bytes)?;
    if total_pages < 1 {
        return Err(ServerError::InvalidRequest(
            "The uploaded PDF appears to be empty.".into(),
        ));
    }

    let plan = normalize_ranges(form.values("start[]"), form.values("end[]"), total_pages)?;
    info!(
        "Split request: file={}, total_pages={}, parts={}, format={}",
        name,
        total_pages,
        plan.len(),
        format
    );

    let stem = stem_of(&name);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (idx, range) in plan.iter().enumerate() {
        let ordinal = idx + 1;
        let slice = extract_range(bytes, range.start, range.end)?;

        let (part_name, part_bytes) = if format == "pdf" {
            (range.artifact_name(&stem, ordinal, "pdf"), slice)
        } else {
            let mut builder = DocxBuilder::new();
            append_text_paragraphs(&mut builder, &extract_text(&slice)?);
            if builder.is_empty() {
                builder.paragraph("No text layer was found in these pages.");
            }
            (range.artifact_name(&stem, ordinal, "docx"), builder.build()?)
        };

        debug!("adding {} ({} bytes)", part_name, part_bytes.len());
        zip.start_file(part_name, options)
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        zip.write_all(&part_bytes)
            .map_err(|e| ServerError::Internal(e.to_string()))?;
    }

    let archive = zip
        .finish()
        .map_err(|e| ServerError::Internal(e.to_string()))?
        .into_inner();

    let download = if format == "pdf" {
        "splits_pdfs.zip"
    } else {
        "splits_docx.zip"
    };
    Ok(attachment(archive, download, ZIP_MIME))
}

/// Handler: POST /api/sign
///
/// Fields `file`, `full_name`, `placements_json` (list of
/// `{page_index, x_norm, y_norm}` in viewer coordinates), optional
/// `sig_width_pt` and optional `signature_image` PNG. Returns
/// `{stem}_signed.pdf`.
pub async fn handle_sign(multipart: Multipart) -> Result<Response, ServerError> {
    let form = FormData::collect(multipart).await?;
    let (name, bytes) = form.pdf_file("file", "Please upload a PDF.")?;

    let full_name = form.value("full_name").unwrap_or("").trim().to_string();
    if full_name.is_empty() {
        return Err(ServerError::InvalidRequest(
            "Please enter your full name.".into(),
        ));
    }

    let placements: Vec<PlacementPoint> = form
        .value("placements_json")
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| ServerError::InvalidRequest(format!("Invalid placements: {}", e)))?
        .unwrap_or_default();
    if placements.is_empty() {
        return Err(ServerError::InvalidRequest(
            "Please add at least one signature placement.".into(),
        ));
    }

    let width_pt = match form.value("sig_width_pt") {
        None | Some("") => DEFAULT_SIG_WIDTH_PT,
        Some(raw) => raw.parse().map_err(|_| {
            ServerError::InvalidRequest("Signature width must be a number.".into())
        })?,
    };

    info!(
        "Sign request: file={}, placements={}, width={}pt",
        name,
        placements.len(),
        width_pt
    );

    let geometries = page_geometries(bytes)?;
    let grouped = PagePlacements::from_points(placements);

    let signature_image = form
        .file("signature_image")
        .filter(|(_, data)| !data.is_empty());

    let (plan, content) = match signature_image {
        Some((_, png_data)) => {
            let (w, h) = png_dimensions(png_data)?;
            let aspect = f64::from(h) / f64::from(w);
            let spec = resolve_render_spec(&SignatureAsset::Raster { aspect }, width_pt)?;
            let plan = plan_overlays(&grouped, &geometries, spec)?;
            (
                plan,
                OverlayContent::Image {
                    png_data: png_data.to_vec(),
                },
            )
        }
        None => {
            let font_path = resolve_font_path(&candidate_font_paths())?;
            let font = cached_font(&font_path)?;
            let spec = resolve_render_spec(
                &SignatureAsset::Text {
                    label: &full_name,
                    measurer: font.as_ref(),
                },
                width_pt,
            )?;
            let plan = plan_overlays(&grouped, &geometries, spec)?;
            (
                plan,
                OverlayContent::Text {
                    label: full_name.clone(),
                    font,
                },
            )
        }
    };

    let signed = stamp_overlays(bytes, &plan, &content)?;
    let download = format!("{}_signed.pdf", stem_of(&name));
    Ok(attachment(signed, &download, PDF_MIME))
}

/// Handler: POST /api/identify-urls
///
/// Field `file`. Returns `{stem}_URLs.docx` listing the unique URLs found
/// in the document's text layer.
pub async fn handle_identify_urls(multipart: Multipart) -> Result<Response, ServerError> {
    let form = FormData::collect(multipart).await?;
    let (name, bytes) = form.pdf_file("file", "Please upload a PDF file.")?;

    let total_pages = page_count(bytes)?;
    if total_pages < 1 {
        return Err(ServerError::InvalidRequest(
            "The uploaded PDF appears to be empty.".into(),
        ));
    }

    let text = extract_text(bytes)?;
    let urls = find_urls(&text);
    let stem = stem_of(&name);

    info!("Identify-urls request: file={}, urls={}", name, urls.len());

    let mut builder = DocxBuilder::new();
    builder.heading(format!("URLs found in \"{}.pdf\"", stem));
    if urls.is_empty() {
        builder.paragraph("No URLs were found in the text of this PDF.");
        builder.paragraph("(Note: scanned PDFs/images need OCR; text-only extraction was used.)");
    } else {
        builder.paragraph(format!("Total unique URLs: {}", urls.len()));
        for url in urls {
            builder.paragraph(url);
        }
    }

    let download = format!("{}_URLs.docx", stem);
    Ok(attachment(builder.build()?, &download, DOCX_MIME))
}

/// Collected multipart form: file parts keyed by field name, plus repeated
/// text values.
struct FormData {
    files: HashMap<String, (String, Vec<u8>)>,
    values: HashMap<String, Vec<String>>,
}

impl FormData {
    async fn collect(mut multipart: Multipart) -> Result<Self, ServerError> {
        let mut files = HashMap::new();
        let mut values: HashMap<String, Vec<String>> = HashMap::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name.is_empty() {
                continue;
            }

            if let Some(file_name) = field.file_name() {
                let file_name = sanitize_filename(file_name);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
                files.insert(name, (file_name, data.to_vec()));
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
                values.entry(name).or_default().push(value);
            }
        }

        Ok(Self { files, values })
    }

    fn file(&self, name: &str) -> Option<&(String, Vec<u8>)> {
        self.files.get(name)
    }

    /// A required upload that must be a non-empty `.pdf`.
    fn pdf_file(&self, name: &str, missing: &str) -> Result<(String, &[u8]), ServerError> {
        let (file_name, data) = self
            .file(name)
            .filter(|(file_name, data)| !file_name.is_empty() && !data.is_empty())
            .ok_or_else(|| ServerError::InvalidRequest(missing.to_string()))?;

        if !is_pdf(file_name) {
            return Err(ServerError::InvalidRequest(
                "Only PDF files are accepted.".into(),
            ));
        }

        Ok((file_name.clone(), data))
    }

    fn value(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    fn values(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn output_format(form: &FormData, default: &str) -> Result<String, ServerError> {
    let format = form.value("output_format").unwrap_or(default).to_lowercase();
    match format.as_str() {
        "pdf" | "docx" => Ok(format),
        other => Err(ServerError::InvalidRequest(format!(
            "Unknown output format '{}'. Use 'pdf' or 'docx'.",
            other
        ))),
    }
}

/// Strip path components and non-portable characters from an uploaded name.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    base.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect()
}

fn is_pdf(name: &str) -> bool {
    name.to_lowercase().ends_with(".pdf")
}

fn stem_of(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// Push one paragraph per non-empty line of extracted text.
fn append_text_paragraphs(builder: &mut DocxBuilder, text: &str) {
    for line in text.lines() {
        let line = line.trim_end();
        if !line.is_empty() {
            builder.paragraph(line);
        }
    }
}

/// Build a download response.
fn attachment(bytes: Vec<u8>, filename: &str, content_type: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}
