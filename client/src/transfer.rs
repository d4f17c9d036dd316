//! CSV and JSON import/export.
//!
//! Exports read rows with [`AdminClient::select`] and write them to a file;
//! imports read a file and insert its rows in sequential batches. CSV fields
//! are coerced to numbers where they look numeric; JSON values are inserted
//! as typed.
//!
//! The file-level helpers ([`read_csv_rows`], [`write_csv_rows`],
//! [`rows_from_json`]) work on any reader or writer and do no I/O against
//! the server.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde_json::Value;
use supa_admin_core::{FilterSpec, QuerySpec, TableRef, ValidationError, coerce_row};
use tracing::{debug, info, warn};

use crate::client::AdminClient;
use crate::error::{ClientError, Result};
use crate::model::Row;
use crate::transport::Transport;

/// File formats supported by import and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Json,
}

impl FileFormat {
    /// Picks the format from a file extension: `.csv` (any case) is CSV,
    /// everything else JSON.
    ///
    /// # Examples
    ///
    /// ```
    /// use supa_admin_client::FileFormat;
    ///
    /// assert_eq!(FileFormat::from_path("dump/products.CSV"), FileFormat::Csv);
    /// assert_eq!(FileFormat::from_path("products.json"), FileFormat::Json);
    /// assert_eq!(FileFormat::from_path("products"), FileFormat::Json);
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Json,
        }
    }
}

/// Reads CSV with a header row into coerced rows.
///
/// # Errors
///
/// Returns [`ClientError::Format`] for malformed CSV (e.g. a record with
/// a different number of fields than the header).
pub fn read_csv_rows(reader: impl Read) -> Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{FEFF}').to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(coerce_row(headers.iter().cloned().zip(record.iter())));
    }
    Ok(rows)
}

/// Writes rows as CSV with a header taken from the first row's keys.
///
/// Missing keys are written as empty fields. Strings are written raw,
/// `null` as an empty field, numbers and booleans as their JSON text, and
/// arrays and objects as compact JSON.
///
/// # Errors
///
/// Returns [`ClientError::Format`] if a later row has a key the header does
/// not contain.
pub fn write_csv_rows(writer: impl Write, rows: &[Row]) -> Result<()> {
    let Some(first) = rows.first() else {
        return Ok(());
    };
    let header: Vec<&str> = first.keys().map(String::as_str).collect();

    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(&header)?;

    for (index, row) in rows.iter().enumerate() {
        if let Some(extra) = row.keys().find(|k| !header.contains(&k.as_str())) {
            return Err(ClientError::format(
                "CSV",
                format!("row {} has column '{extra}' missing from the header", index + 1),
            ));
        }
        let record: Vec<String> = header
            .iter()
            .map(|column| row.get(*column).map(csv_field).unwrap_or_default())
            .collect();
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

fn csv_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Converts a parsed JSON document into rows.
///
/// An array must contain only objects; a single object is one row.
///
/// # Errors
///
/// Returns [`ClientError::Format`] for any other shape.
pub fn rows_from_json(value: Value) -> Result<Vec<Row>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(row) => Ok(row),
                other => Err(ClientError::format(
                    "JSON",
                    format!("element {index} is {}, expected an object", kind(&other)),
                )),
            })
            .collect(),
        Value::Object(row) => Ok(vec![row]),
        other => Err(ClientError::format(
            "JSON",
            format!("expected an array of objects or an object, found {}", kind(&other)),
        )),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl<T: Transport> AdminClient<T> {
    /// Exports matching rows to a CSV file and returns the row count.
    ///
    /// When no rows match, no file is written and `0` is returned. Rows are
    /// rendered before the file is opened, so a [`ClientError::Format`]
    /// leaves any existing file at `path` untouched.
    pub fn export_to_csv(
        &self,
        table: impl Into<TableRef>,
        path: impl AsRef<Path>,
        filters: Option<&FilterSpec>,
    ) -> Result<usize> {
        let table = table.into();
        let path = path.as_ref();
        let rows = self.select(&table, &export_query(filters))?;
        if rows.is_empty() {
            warn!(table = %table, "no rows to export");
            return Ok(0);
        }

        let mut rendered = Vec::new();
        write_csv_rows(&mut rendered, &rows)?;
        fs::write(path, rendered)?;
        info!(table = %table, rows = rows.len(), path = %path.display(), "exported CSV");
        Ok(rows.len())
    }

    /// Exports matching rows to a pretty-printed JSON array and returns the
    /// row count. The file is written even when no rows match.
    pub fn export_to_json(
        &self,
        table: impl Into<TableRef>,
        path: impl AsRef<Path>,
        filters: Option<&FilterSpec>,
    ) -> Result<usize> {
        let table = table.into();
        let path = path.as_ref();
        let rows = self.select(&table, &export_query(filters))?;

        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &rows)
            .map_err(|e| ClientError::format("JSON", e.to_string()))?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        info!(table = %table, rows = rows.len(), path = %path.display(), "exported JSON");
        Ok(rows.len())
    }

    /// Imports a CSV file and returns the number of inserted rows.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidBatchSize`] for a zero batch size.
    /// A failed batch aborts the import; earlier batches stay inserted.
    pub fn import_from_csv(
        &self,
        table: impl Into<TableRef>,
        path: impl AsRef<Path>,
        batch_size: usize,
    ) -> Result<usize> {
        if batch_size == 0 {
            return Err(ValidationError::InvalidBatchSize.into());
        }
        let table = table.into();
        let path = path.as_ref();
        let rows = read_csv_rows(BufReader::new(File::open(path)?))?;
        let total = self.insert_batched(&table, &rows, batch_size)?;
        info!(table = %table, rows = total, path = %path.display(), "imported CSV");
        Ok(total)
    }

    /// Imports a JSON file (an array of objects or a single object) and
    /// returns the number of inserted rows.
    ///
    /// # Errors
    ///
    /// See [`import_from_csv`](Self::import_from_csv); additionally
    /// [`ClientError::Format`] for invalid JSON or non-object elements.
    pub fn import_from_json(
        &self,
        table: impl Into<TableRef>,
        path: impl AsRef<Path>,
        batch_size: usize,
    ) -> Result<usize> {
        if batch_size == 0 {
            return Err(ValidationError::InvalidBatchSize.into());
        }
        let table = table.into();
        let path = path.as_ref();
        let value: Value = serde_json::from_reader(BufReader::new(File::open(path)?))
            .map_err(|e| ClientError::format("JSON", format!("{}: {e}", path.display())))?;
        let rows = rows_from_json(value)?;
        let total = self.insert_batched(&table, &rows, batch_size)?;
        info!(table = %table, rows = total, path = %path.display(), "imported JSON");
        Ok(total)
    }

    /// Inserts rows in sequential batches of at most `batch_size`.
    ///
    /// Stops at the first failed batch.
    pub fn insert_batched(
        &self,
        table: impl Into<TableRef>,
        rows: &[Row],
        batch_size: usize,
    ) -> Result<usize> {
        if batch_size == 0 {
            return Err(ValidationError::InvalidBatchSize.into());
        }
        let table = table.into();
        let mut total = 0;
        for (index, batch) in rows.chunks(batch_size).enumerate() {
            debug!(table = %table, batch = index + 1, rows = batch.len(), "inserting batch");
            self.insert(&table, batch)?;
            total += batch.len();
        }
        Ok(total)
    }
}

fn export_query(filters: Option<&FilterSpec>) -> QuerySpec {
    match filters {
        Some(filters) => QuerySpec::new().filters(filters.clone()),
        None => QuerySpec::new(),
    }
}
