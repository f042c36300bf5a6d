//! # Folio
//!
//! Renders ticket records into print-ready, paginated PDF documents.
//!
//! Two layouts are available: a **list** layout that sets many records per
//! page as a table with fitted columns, and a **detail** layout with one
//! card-based page per record. Optional assets (a custom font, a logo and a
//! stamp image) are fetched up front; when any of them is missing or broken
//! the document is still produced, with Helvetica or without the image.
//!
//! ## Architecture
//!
//! ```text
//! Records + RenderOptions
//!       ↓
//!   [assets]   : fetch font/logo/stamp (the only await), degrade on failure
//!       ↓
//!   [layout]   : fit columns, wrap/clip text, paginate, stamp footers
//!       ↓
//!   [pdf]      : serialize pages to PDF bytes
//! ```
//!
//! Every build is independent: nothing is cached or shared between calls.

pub mod assets;
pub mod error;
pub mod export;
pub mod font;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod style;
pub mod text;

use chrono::{Local, NaiveDate, NaiveDateTime};

pub use assets::{AssetFetcher, AssetLoader, Assets, FsFetcher, HttpFetcher, Offline};
pub use error::{FolioError, Result};
pub use model::{ExportRequest, LayoutMode, Priority, Record, RenderOptions, Status};

use pdf::{PdfMetadata, PdfWriter};

/// A finished document.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub page_count: usize,
}

/// Build a document, fetching optional assets through `fetcher` first.
///
/// Asset failures never fail the build; only serialization errors do.
pub async fn build<F: AssetFetcher>(
    records: &[Record],
    options: &RenderOptions,
    fetcher: F,
) -> Result<RenderedDocument> {
    let assets = AssetLoader::new(fetcher).resolve(options).await;
    build_with_assets(records, options, &assets, Local::now().naive_local())
}

/// Build a document from already-resolved assets. Fully synchronous.
pub fn build_with_assets(
    records: &[Record],
    options: &RenderOptions,
    assets: &Assets,
    generated_at: NaiveDateTime,
) -> Result<RenderedDocument> {
    log::debug!(
        "building {} document for {} records",
        options.layout.as_str(),
        records.len()
    );
    let pages = layout::layout_document(records, options, assets, generated_at);

    let metadata = PdfMetadata {
        title: options.resolved_title().to_string(),
        creator: options.resolved_app_title().to_string(),
        created: generated_at,
    };
    let bytes = PdfWriter::new().write(&pages, &metadata, &assets.typeface)?;
    log::debug!(
        "build phase: finalizing -> serialized ({} pages, {} bytes)",
        pages.len(),
        bytes.len()
    );

    let filename = match options.filename.as_deref() {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => suggested_filename(options.layout, records, generated_at.date()),
    };

    Ok(RenderedDocument {
        bytes,
        filename,
        page_count: pages.len(),
    })
}

/// Parse a JSON export request and build it.
pub async fn build_json<F: AssetFetcher>(json: &str, fetcher: F) -> Result<RenderedDocument> {
    let request = parse_request(json)?;
    build(&request.records, &request.options, fetcher).await
}

/// Parse either an export request object or a bare array of records.
pub fn parse_request(json: &str) -> Result<ExportRequest> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if value.is_array() {
        Ok(ExportRequest {
            records: serde_json::from_value(value)?,
            options: RenderOptions::default(),
        })
    } else {
        Ok(serde_json::from_value(value)?)
    }
}

/// Default file name for a document built on `date`.
pub fn suggested_filename(layout: LayoutMode, records: &[Record], date: NaiveDate) -> String {
    let date = date.format("%Y-%m-%d");
    match (layout, records) {
        (LayoutMode::Detail, [only]) => format!("ticket-{}-{}.pdf", only.id, date),
        (LayoutMode::Detail, _) => format!("tickets-{}-detail.pdf", date),
        (LayoutMode::List, _) => format!("tickets-{}-list.pdf", date),
    }
}
