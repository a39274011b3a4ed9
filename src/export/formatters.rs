//! Record formatters
//!
//! Render a flat record list into export bytes.

use crate::error::{Error, Result};
use crate::types::{ExportFormat, JsonValue, Record};

/// Renders records into a downloadable document
pub trait RecordFormatter: Send + Sync {
    /// Render the records
    fn format(&self, records: &[Record]) -> Result<Vec<u8>>;

    /// File extension without the dot
    fn extension(&self) -> &'static str;

    /// MIME type of the rendered document
    fn content_type(&self) -> &'static str;
}

/// Get the formatter for an export format
pub fn formatter_for(format: ExportFormat) -> Box<dyn RecordFormatter> {
    match format {
        ExportFormat::Csv => Box::new(CsvFormatter),
        ExportFormat::Json => Box::new(JsonFormatter),
    }
}

// ============================================================================
// CSV
// ============================================================================

/// CSV with a header row taken from the first record's attribute names
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvFormatter;

impl CsvFormatter {
    const SEPARATOR: char = ',';
    const MULTI_VALUE_SEPARATOR: &'static str = "; ";

    fn render_value(value: &JsonValue) -> String {
        match value {
            JsonValue::Null => String::new(),
            JsonValue::String(s) => s.clone(),
            JsonValue::Bool(b) => b.to_string(),
            JsonValue::Number(n) => n.to_string(),
            JsonValue::Array(values) => values
                .iter()
                .map(Self::render_value)
                .collect::<Vec<_>>()
                .join(Self::MULTI_VALUE_SEPARATOR),
            JsonValue::Object(_) => value.to_string(),
        }
    }

    fn escape(field: &str) -> String {
        if field.contains([Self::SEPARATOR, '"', '\n', '\r']) {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn write_row(out: &mut String, cells: impl Iterator<Item = String>) {
        let row: Vec<String> = cells.map(|cell| Self::escape(&cell)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
}

impl RecordFormatter for CsvFormatter {
    fn format(&self, records: &[Record]) -> Result<Vec<u8>> {
        let Some(first) = records.first() else {
            return Ok(Vec::new());
        };
        let fields: Vec<&String> = first.keys().collect();

        let mut out = String::new();
        Self::write_row(&mut out, fields.iter().map(|f| (*f).clone()));
        for record in records {
            Self::write_row(
                &mut out,
                fields
                    .iter()
                    .map(|field| record.get(field).map(Self::render_value).unwrap_or_default()),
            );
        }
        Ok(out.into_bytes())
    }

    fn extension(&self) -> &'static str {
        "csv"
    }

    fn content_type(&self) -> &'static str {
        "text/csv"
    }
}

// ============================================================================
// JSON
// ============================================================================

/// Pretty-printed JSON array
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl RecordFormatter for JsonFormatter {
    fn format(&self, records: &[Record]) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(records)
            .map_err(|e| Error::export(format!("Failed to render JSON: {e}")))
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}
