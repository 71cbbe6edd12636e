//! CSV source-file parsing for the upload endpoint.
//!
//! The pipeline treats file parsing as a narrow collaborator: bytes go
//! in, column names and row objects come out. Rows keep their upload
//! order; row numbers elsewhere in the pipeline are 1-based indices into
//! this order.

use portage_core::types::JsonMap;

/// A parsed tabular source.
#[derive(Debug)]
pub struct ParsedSource {
    /// Header names, in file order.
    pub columns: Vec<String>,
    /// One JSON object per data row (column -> string value).
    pub rows: Vec<JsonMap>,
}

/// Parse CSV bytes into columns and row objects.
///
/// The first record is the header. Rows shorter than the header are
/// padded with empty strings; fully empty rows are dropped. Returns a
/// human-readable message on malformed input.
pub fn parse_csv(bytes: &[u8]) -> Result<ParsedSource, String> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(bytes);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| format!("Cannot read CSV header: {e}"))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if columns.is_empty() || columns.iter().all(|c| c.is_empty()) {
        return Err("CSV header row is empty".to_string());
    }

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| format!("Malformed CSV row {}: {e}", i + 2))?;

        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let mut row = JsonMap::new();
        for (j, column) in columns.iter().enumerate() {
            let value = record.get(j).unwrap_or("");
            row.insert(column.clone(), serde_json::Value::String(value.to_string()));
        }
        rows.push(row);
    }

    Ok(ParsedSource { columns, rows })
}
