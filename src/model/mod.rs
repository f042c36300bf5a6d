//! # Input Model
//!
//! Records and render options as handed over by the record source. The
//! engine never mutates them: one build borrows a slice of [`Record`]s and a
//! [`RenderOptions`] value, and everything derived from them (columns, pages,
//! font handles) is created fresh per build.
//!
//! Geometry constants for both layout modes also live here. They are
//! compatibility-relevant and must stay bit-exact.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A single ticket, the renderable unit.
///
/// Deserialization never rejects a record over a single field: `null` or a
/// value of the wrong type coerces to the field's empty value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: u64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub subject: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub body: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub customer_name: String,
    #[serde(default, deserialize_with = "lenient_key")]
    pub status: Status,
    #[serde(default, deserialize_with = "lenient_key")]
    pub priority: Priority,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub assignee: Option<String>,
    /// Calendar date, e.g. `2026-10-19`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub updated_at: String,
}

/// Scalar JSON as text. Null, arrays and objects have no text form.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(value).unwrap_or_default())
}

fn lenient_opt_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(value))
}

/// Identifiers are not validated: anything that isn't a non-negative
/// integer (or a string holding one) becomes 0.
fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let id = match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(id.unwrap_or_default())
}

/// Status and priority keys: a missing key falls back to the default value.
fn lenient_key<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: From<String> + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(value)
        .filter(|s| !s.is_empty())
        .map(T::from)
        .unwrap_or_default())
}

impl Record {
    /// Assignee for display; an unassigned ticket renders as a dash.
    pub fn assignee_label(&self) -> &str {
        match self.assignee.as_deref() {
            Some(a) if !a.trim().is_empty() => a,
            _ => "-",
        }
    }
}

/// Ticket status. Unknown values survive as [`Status::Other`] so they still
/// render (with the neutral badge theme).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    #[default]
    Open,
    InProgress,
    Pending,
    Resolved,
    Closed,
    Other(String),
}

impl Status {
    /// The wire key, as stored by the record source.
    pub fn key(&self) -> &str {
        match self {
            Status::Open => "open",
            Status::InProgress => "in_progress",
            Status::Pending => "pending",
            Status::Resolved => "resolved",
            Status::Closed => "closed",
            Status::Other(s) => s,
        }
    }

    /// Human-readable badge label.
    pub fn label(&self) -> &str {
        match self {
            Status::Open => "Open",
            Status::InProgress => "In Progress",
            Status::Pending => "Pending",
            Status::Resolved => "Resolved",
            Status::Closed => "Closed",
            Status::Other(s) => s,
        }
    }
}

impl From<String> for Status {
    fn from(s: String) -> Self {
        match s.as_str() {
            "open" => Status::Open,
            "in_progress" => Status::InProgress,
            "pending" => Status::Pending,
            "resolved" => Status::Resolved,
            "closed" => Status::Closed,
            _ => Status::Other(s),
        }
    }
}

impl From<Status> for String {
    fn from(s: Status) -> Self {
        s.key().to_string()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Ticket priority. Unknown values survive as [`Priority::Other`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
    Other(String),
}

impl Priority {
    pub fn key(&self) -> &str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
            Priority::Other(s) => s,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Urgent => "Urgent",
            Priority::Other(s) => s,
        }
    }
}

impl From<String> for Priority {
    fn from(s: String) -> Self {
        match s.as_str() {
            "low" => Priority::Low,
            "medium" => Priority::Medium,
            "high" => Priority::High,
            "urgent" => Priority::Urgent,
            _ => Priority::Other(s),
        }
    }
}

impl From<Priority> for String {
    fn from(p: Priority) -> Self {
        p.key().to_string()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Which document strategy to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Tabular, many rows per page.
    #[default]
    List,
    /// One card-based page per record.
    Detail,
}

impl LayoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutMode::List => "list",
            LayoutMode::Detail => "detail",
        }
    }
}

pub const DEFAULT_APP_TITLE: &str = "Helpdesk";
pub const DEFAULT_LIST_TITLE: &str = "Ticket List";
pub const DEFAULT_DETAIL_TITLE: &str = "Ticket Detail";

/// Per-build configuration. Every field is optional; see the accessors for
/// the defaults that apply when a field is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOptions {
    #[serde(default)]
    pub layout: LayoutMode,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub app_title: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub font_url: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub stamp_url: Option<String>,
}

impl RenderOptions {
    pub fn list() -> Self {
        Self::default()
    }

    pub fn detail() -> Self {
        Self {
            layout: LayoutMode::Detail,
            ..Self::default()
        }
    }

    pub fn resolved_title(&self) -> &str {
        match (&self.title, self.layout) {
            (Some(t), _) if !t.is_empty() => t,
            (_, LayoutMode::List) => DEFAULT_LIST_TITLE,
            (_, LayoutMode::Detail) => DEFAULT_DETAIL_TITLE,
        }
    }

    pub fn resolved_app_title(&self) -> &str {
        match &self.app_title {
            Some(t) if !t.is_empty() => t,
            _ => DEFAULT_APP_TITLE,
        }
    }
}

/// A JSON export request: records plus options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub records: Vec<Record>,
    #[serde(default)]
    pub options: RenderOptions,
}

// ── Geometry ────────────────────────────────────────────────────

/// Edge values (margins).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub const fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }
}

/// ISO A4 in points.
pub const PAGE_WIDTH: f64 = 595.28;
pub const PAGE_HEIGHT: f64 = 841.89;

/// Fixed geometry of the tabular list layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListGeometry {
    pub margin: Edges,
    pub header_height: f64,
    pub row_height: f64,
    pub font_size: f64,
    /// Inner horizontal padding on each side of a table cell.
    pub cell_padding: f64,
}

pub const LIST_GEOMETRY: ListGeometry = ListGeometry {
    margin: Edges::new(48.0, 48.0, 52.0, 48.0),
    header_height: 72.0,
    row_height: 18.0,
    font_size: 10.0,
    cell_padding: 4.0,
};

impl ListGeometry {
    /// Page width minus left/right margins.
    pub fn usable_width(&self) -> f64 {
        PAGE_WIDTH - self.margin.horizontal()
    }

    /// Top of the column-heading row, directly below the header band.
    pub fn table_top(&self) -> f64 {
        self.margin.top + self.header_height
    }

    /// Top of the first data row on every page.
    pub fn body_top(&self) -> f64 {
        self.table_top() + self.row_height
    }

    /// Lowest y a row may extend to.
    pub fn body_bottom(&self) -> f64 {
        PAGE_HEIGHT - self.margin.bottom
    }
}

/// Fixed geometry of the one-record-per-page detail layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetailGeometry {
    pub margin: Edges,
    pub header_height: f64,
    pub card_gap: f64,
    pub card_padding: f64,
    pub meta_row_height: f64,
    pub body_font_size: f64,
    pub body_line_height: f64,
}

pub const DETAIL_GEOMETRY: DetailGeometry = DetailGeometry {
    margin: Edges::new(46.0, 52.0, 56.0, 52.0),
    header_height: 98.0,
    card_gap: 14.0,
    card_padding: 14.0,
    meta_row_height: 34.0,
    body_font_size: 10.5,
    body_line_height: 15.0,
};

impl DetailGeometry {
    pub fn usable_width(&self) -> f64 {
        PAGE_WIDTH - self.margin.horizontal()
    }

    pub fn content_bottom(&self) -> f64 {
        PAGE_HEIGHT - self.margin.bottom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_defaults_missing_text_fields() {
        let r: Record = serde_json::from_str(r#"{ "id": 7 }"#).unwrap();
        assert_eq!(r.id, 7);
        assert_eq!(r.subject, "");
        assert_eq!(r.body, "");
        assert_eq!(r.assignee, None);
        assert_eq!(r.assignee_label(), "-");
    }

    #[test]
    fn record_camel_case_fields() {
        let r: Record = serde_json::from_str(
            r#"{ "id": 1, "customerName": "Acme", "createdAt": "2026-01-02",
                 "status": "in_progress", "priority": "urgent", "assignee": "kim" }"#,
        )
        .unwrap();
        assert_eq!(r.customer_name, "Acme");
        assert_eq!(r.created_at, "2026-01-02");
        assert_eq!(r.status, Status::InProgress);
        assert_eq!(r.priority, Priority::Urgent);
        assert_eq!(r.assignee_label(), "kim");
    }

    #[test]
    fn null_text_fields_render_empty() {
        let r: Record = serde_json::from_str(
            r#"{ "id": 2, "subject": null, "body": null, "customerName": null,
                 "assignee": null, "createdAt": null, "updatedAt": null }"#,
        )
        .unwrap();
        assert_eq!(r.subject, "");
        assert_eq!(r.body, "");
        assert_eq!(r.customer_name, "");
        assert_eq!(r.assignee, None);
        assert_eq!(r.created_at, "");
        assert_eq!(r.updated_at, "");
    }

    #[test]
    fn scalar_text_fields_are_stringified() {
        let r: Record = serde_json::from_str(
            r#"{ "id": 3, "subject": 42, "body": true, "customerName": 1.5, "assignee": 7 }"#,
        )
        .unwrap();
        assert_eq!(r.subject, "42");
        assert_eq!(r.body, "true");
        assert_eq!(r.customer_name, "1.5");
        assert_eq!(r.assignee.as_deref(), Some("7"));
    }

    #[test]
    fn structured_text_fields_render_empty() {
        let r: Record =
            serde_json::from_str(r#"{ "subject": ["a"], "body": { "text": "x" } }"#).unwrap();
        assert_eq!(r.subject, "");
        assert_eq!(r.body, "");
    }

    #[test]
    fn null_status_and_priority_use_defaults() {
        let r: Record =
            serde_json::from_str(r#"{ "id": 4, "status": null, "priority": null }"#).unwrap();
        assert_eq!(r.status, Status::default());
        assert_eq!(r.priority, Priority::default());

        let r: Record = serde_json::from_str(r#"{ "status": 3, "priority": "" }"#).unwrap();
        assert_eq!(r.status, Status::Other("3".to_string()));
        assert_eq!(r.priority, Priority::Medium);
    }

    #[test]
    fn ids_are_coerced_not_validated() {
        let id = |json: &str| serde_json::from_str::<Record>(json).unwrap().id;
        assert_eq!(id(r#"{ "id": null }"#), 0);
        assert_eq!(id(r#"{ "id": "17" }"#), 17);
        assert_eq!(id(r#"{ "id": "seven" }"#), 0);
        assert_eq!(id(r#"{ "id": -5 }"#), 0);
        assert_eq!(id(r#"{ "id": 9.0 }"#), 9);
    }

    #[test]
    fn unknown_status_is_preserved() {
        let s: Status = serde_json::from_str(r#""escalated""#).unwrap();
        assert_eq!(s, Status::Other("escalated".to_string()));
        assert_eq!(s.label(), "escalated");
        assert_eq!(serde_json::to_string(&s).unwrap(), r#""escalated""#);
    }

    #[test]
    fn options_defaults() {
        let o: RenderOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(o.layout, LayoutMode::List);
        assert_eq!(o.resolved_title(), DEFAULT_LIST_TITLE);
        assert_eq!(o.resolved_app_title(), DEFAULT_APP_TITLE);
        assert_eq!(RenderOptions::detail().resolved_title(), DEFAULT_DETAIL_TITLE);
    }

    #[test]
    fn options_camel_case() {
        let o: RenderOptions = serde_json::from_str(
            r#"{ "layout": "detail", "appTitle": "Desk", "logoUrl": null,
                 "fontUrl": "fonts/a.ttf" }"#,
        )
        .unwrap();
        assert_eq!(o.layout, LayoutMode::Detail);
        assert_eq!(o.resolved_app_title(), "Desk");
        assert_eq!(o.logo_url, None);
        assert_eq!(o.font_url.as_deref(), Some("fonts/a.ttf"));
    }

    #[test]
    fn list_geometry_values() {
        let g = LIST_GEOMETRY;
        assert!((g.usable_width() - 499.28).abs() < 1e-9);
        assert_eq!(g.body_top(), 138.0);
        assert!((g.body_bottom() - 789.89).abs() < 1e-9);
    }
}
