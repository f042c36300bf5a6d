//! Delimited-text export of the same record set.
//!
//! One record per CRLF-terminated line. Fields are quoted only when they
//! contain a quote, comma or line break, with embedded quotes doubled. The
//! output starts with a UTF-8 byte-order mark so spreadsheet tools detect
//! the encoding.

use std::path::Path;

use chrono::NaiveDate;

use crate::error::{FolioError, Result};
use crate::model::Record;

const BOM: &str = "\u{FEFF}";

pub const CSV_HEADER: [&str; 8] = [
    "id",
    "subject",
    "customer",
    "assignee",
    "status",
    "priority",
    "createdAt",
    "updatedAt",
];

/// Render `records` as CSV text, BOM included.
pub fn to_csv(records: &[Record]) -> Result<String> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    wtr.write_record(CSV_HEADER)?;
    for record in records {
        wtr.write_record([
            record.id.to_string().as_str(),
            &record.subject,
            &record.customer_name,
            record.assignee.as_deref().unwrap_or(""),
            record.status.key(),
            record.priority.key(),
            &record.created_at,
            &record.updated_at,
        ])?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| FolioError::Io(e.into_error()))?;
    let body = String::from_utf8(bytes).map_err(|e| FolioError::Render(e.to_string()))?;
    Ok(format!("{}{}", BOM, body))
}

/// Write the CSV export to `path`.
pub fn write_csv(path: &Path, records: &[Record]) -> Result<()> {
    std::fs::write(path, to_csv(records)?)?;
    Ok(())
}

/// Suggested file name for a CSV export made on `date`.
pub fn csv_filename(date: NaiveDate) -> String {
    format!("tickets-{}.csv", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, Status};

    fn record() -> Record {
        Record {
            id: 3,
            subject: "Login fails, \"sometimes\"".into(),
            body: "ignored".into(),
            customer_name: "Acme\nWest".into(),
            status: Status::InProgress,
            priority: Priority::High,
            assignee: None,
            created_at: "2026-10-01".into(),
            updated_at: "2026-10-02".into(),
        }
    }

    #[test]
    fn starts_with_bom_and_header() {
        let out = to_csv(&[]).unwrap();
        assert_eq!(
            out,
            "\u{FEFF}id,subject,customer,assignee,status,priority,createdAt,updatedAt\r\n"
        );
    }

    #[test]
    fn quotes_only_when_needed() {
        let out = to_csv(&[record()]).unwrap();
        let line = out.split("\r\n").nth(1).unwrap();
        assert!(line.starts_with("3,\"Login fails, \"\"sometimes\"\"\",\"Acme\nWest\",,"));
        assert!(out.ends_with("in_progress,high,2026-10-01,2026-10-02\r\n"));
    }

    #[test]
    fn writes_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&path, &[record()]).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(&[0xEF, 0xBB, 0xBF]));
    }

    #[test]
    fn filename_has_date() {
        let d = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(csv_filename(d), "tickets-2026-10-19.csv");
    }
}
