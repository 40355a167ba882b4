//! Tool registry and the crawler surface generated from it.

use axum::extract::State;
use axum::http::header;
use axum::Json;
use serde::Serialize;

use crate::AppState;

/// One tool exposed by the service.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

/// Every tool the service offers, in display order.
pub fn tools() -> &'static [ToolInfo] {
    &[
        ToolInfo {
            name: "Convert PDF to DOCX",
            path: "/api/convert",
            description: "Upload one PDF and download its text as a Word document.",
        },
        ToolInfo {
            name: "Merge 2 PDFs",
            path: "/api/merge",
            description: "Upload two PDFs and download them merged into one file.",
        },
        ToolInfo {
            name: "Split PDF",
            path: "/api/split",
            description: "Split a PDF into page ranges and download the parts as a zip.",
        },
        ToolInfo {
            name: "Sign PDF",
            path: "/api/sign",
            description: "Place a typed or drawn signature anywhere on a PDF.",
        },
        ToolInfo {
            name: "Identify URLs",
            path: "/api/identify-urls",
            description: "List every URL found in a PDF's text layer.",
        },
    ]
}

/// Tool list response
#[derive(Serialize)]
pub struct ToolListResponse {
    pub success: bool,
    pub tools: Vec<ToolEntry>,
    pub count: usize,
}

/// Tool metadata with its absolute URL
#[derive(Serialize)]
pub struct ToolEntry {
    pub name: &'static str,
    pub path: &'static str,
    pub description: &'static str,
    pub absolute_url: String,
}

/// Handler: GET /api/tools
pub async fn handle_list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    let tools: Vec<ToolEntry> = tools()
        .iter()
        .map(|t| ToolEntry {
            name: t.name,
            path: t.path,
            description: t.description,
            absolute_url: format!("{}{}", state.base_url, t.path),
        })
        .collect();

    let count = tools.len();

    Json(ToolListResponse {
        success: true,
        tools,
        count,
    })
}

/// Handler: GET /robots.txt
pub async fn handle_robots(State(state): State<AppState>) -> ([(header::HeaderName, &'static str); 1], String) {
    let body = [
        "User-agent: *".to_string(),
        "Allow: /".to_string(),
        format!("Sitemap: {}/sitemap.xml", state.base_url),
    ]
    .join("\n");

    ([(header::CONTENT_TYPE, "text/plain")], body)
}

/// Handler: GET /sitemap.xml
pub async fn handle_sitemap(State(state): State<AppState>) -> ([(header::HeaderName, &'static str); 1], String) {
    let mut urls = vec![format!("{}/", state.base_url)];
    urls.extend(
        tools()
            .iter()
            .map(|t| format!("{}{}", state.base_url, t.path)),
    );

    let mut xml = vec![
        r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string(),
        r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#.to_string(),
    ];
    xml.extend(urls.iter().map(|u| format!("<url><loc>{}</loc></url>", u)));
    xml.push("</urlset>".to_string());

    ([(header::CONTENT_TYPE, "application/xml")], xml.join("\n"))
}
