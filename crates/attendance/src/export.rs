//! Attendance export boundary.
//!
//! The service only hands a session and its ordered records to a
//! [`RecordExporter`]; file formats live behind that trait.

use crate::error::Result;
use rollcall_models::{AttendanceRecord, Session};
use std::fmt::Write;

pub trait RecordExporter: Send + Sync {
    fn content_type(&self) -> &'static str;

    fn file_extension(&self) -> &'static str;

    fn render(&self, session: &Session, records: &[AttendanceRecord]) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportedFile {
    pub fn build(exporter: &dyn RecordExporter, session: &Session, bytes: Vec<u8>) -> Self {
        let stem = format!(
            "attendance_{}_{}_{}",
            session.course,
            session.section,
            session.created_at.format("%Y%m%d")
        );
        Self {
            filename: format!("{}.{}", sanitize_filename(&stem), exporter.file_extension()),
            content_type: exporter.content_type(),
            bytes,
        }
    }
}

fn sanitize_filename(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Comma-separated export with the dashboard's column order.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvExporter;

impl RecordExporter for CsvExporter {
    fn content_type(&self) -> &'static str {
        "text/csv; charset=utf-8"
    }

    fn file_extension(&self) -> &'static str {
        "csv"
    }

    fn render(&self, _session: &Session, records: &[AttendanceRecord]) -> Result<Vec<u8>> {
        let mut out = String::from("Student ID,Name,Roll Number,Timestamp,Status,Verified At\r\n");

        for record in records {
            let verified_at = record
                .verified_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default();
            // Writing into a String cannot fail.
            let _ = write!(
                out,
                "{},{},{},{},{},{}\r\n",
                csv_field(&record.student_id),
                csv_field(&record.student_name),
                csv_field(&record.roll_number),
                record.timestamp.to_rfc3339(),
                record.status(),
                verified_at,
            );
        }

        Ok(out.into_bytes())
    }
}

/// Quote a field when needed and neutralise spreadsheet formula prefixes.
fn csv_field(value: &str) -> String {
    let value = if value.starts_with(['=', '+', '-', '@']) {
        format!("'{}", value)
    } else {
        value.to_string()
    };

    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value
    }
}
