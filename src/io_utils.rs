//! CSV parsing and text decoding for fetched source payloads.
//!
//! Sources arrive as raw bytes (HTTP body or local file). This module turns
//! them into rows of untyped cells:
//!
//! - **Encoding**: decoded via `encoding_rs`, defaulting to UTF-8; a leading
//!   byte-order mark is honoured and stripped.
//! - **Shape**: the reader is flexible, since spreadsheet exports routinely
//!   emit ragged rows around merged header cells.
//! - **Headers**: never consumed here; header selection happens on the
//!   resulting [`RawTable`].

use std::io::Read;

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

use crate::data::{Cell, RawTable, Row};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Row> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding).map(|text| Cell::text(&text)))
        .collect()
}

/// Parses a CSV payload into a [`RawTable`] with no header row selected.
pub fn parse_csv(bytes: &[u8], encoding: &'static Encoding) -> Result<RawTable> {
    let text = decode_bytes(bytes, encoding)?;
    let mut reader = open_csv_reader(text.as_bytes(), DEFAULT_CSV_DELIMITER);
    let mut rows = Vec::new();
    for (idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", idx + 1))?;
        rows.push(decode_record(&record, UTF_8)?);
    }
    Ok(RawTable::new(rows))
}
