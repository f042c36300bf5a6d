//! Structured error types for the Folio renderer.
//!
//! Only failures that abort a build live in [`FolioError`]. Asset problems
//! are reported through [`AssetError`] by fetchers and absorbed by the asset
//! loader, so they never reach a caller of [`crate::build`].

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FolioError>;

/// The unified error type returned by all public Folio API functions.
#[derive(Debug, Error)]
pub enum FolioError {
    /// JSON input failed to parse as records or an export request.
    #[error("Failed to parse export request: {source}{}", format_hint(.hint))]
    Parse {
        #[source]
        source: serde_json::Error,
        hint: String,
    },
    /// A font could not be parsed or embedded while writing the PDF.
    #[error("Font error: {0}")]
    Font(String),
    /// Layout or PDF serialization failed.
    #[error("Render error: {0}")]
    Render(String),
    /// Writing an export failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Delimited-text export failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

fn format_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => concat!(
                "The JSON is valid but doesn't match the record schema. ",
                "Check field names and types."
            )
            .to_string(),
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        FolioError::Parse { source: e, hint }
    }
}

/// Why an optional asset could not be used.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("no asset URL given")]
    Missing,
    #[error("fetch of '{url}' failed: {reason}")]
    Fetch { url: String, reason: String },
    #[error("invalid data URI: {0}")]
    DataUri(String),
    #[error("malformed asset bytes: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_carries_hint() {
        let err: FolioError = serde_json::from_str::<Vec<u32>>("[1, 2,]").unwrap_err().into();
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to parse export request"));
        assert!(msg.contains("Hint: Check for trailing commas"));
    }

    #[test]
    fn data_error_hint_mentions_schema() {
        let err: FolioError = serde_json::from_str::<Vec<u32>>("[\"x\"]").unwrap_err().into();
        assert!(err.to_string().contains("record schema"));
    }

    #[test]
    fn render_error_display() {
        let err = FolioError::Render("bad page".to_string());
        assert_eq!(err.to_string(), "Render error: bad page");
    }
}
