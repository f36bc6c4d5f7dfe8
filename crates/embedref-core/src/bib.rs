//! Format already-enriched records as BibTeX `@misc` entries.
//!
//! Input is the exiftool `-j` JSON shape the batch loop consumes; only
//! records that went through enrichment carry the eprint identifier, the
//! creator list and the date this formatter needs. No network calls.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDateTime};
use serde_json::Value;

use crate::error::{EmbedRefError, Result};
use crate::record::fields;

/// One `@misc` entry, keyed by the full `eprinttype:eprint` identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct EprintEntry {
    pub key: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: i32,
    pub month: u32,
    pub eprinttype: String,
    pub eprint: String,
}

impl EprintEntry {
    /// Build an entry from one object of an exiftool `-j` JSON array.
    pub fn from_json_object(object: &serde_json::Map<String, Value>) -> Result<Self> {
        let text = |key: &str| -> Result<&str> {
            object
                .get(key)
                .and_then(Value::as_str)
                .ok_or_else(|| missing(key))
        };

        let identifier = text(fields::DC_IDENTIFIER)?;
        let (eprinttype, eprint) = identifier
            .split_once(':')
            .ok_or_else(|| EmbedRefError::Parse(format!(
                "identifier '{identifier}' has no scheme prefix"
            )))?;

        // exiftool may expose a single creator as a bare string.
        let authors = match object.get(fields::DC_CREATOR) {
            Some(Value::String(name)) => vec![name.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => return Err(missing(fields::DC_CREATOR)),
        };

        let date = text(fields::DC_DATE)?;
        let (year, month) = parse_xmp_timestamp(date).ok_or_else(|| {
            EmbedRefError::Parse(format!("unrecognized timestamp '{date}'"))
        })?;

        Ok(Self {
            key: identifier.to_string(),
            title: text(fields::DC_TITLE)?.to_string(),
            authors,
            year,
            month,
            eprinttype: eprinttype.to_string(),
            eprint: eprint.to_string(),
        })
    }
}

impl fmt::Display for EprintEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "@misc{{{},", self.key)?;
        writeln!(f, "    title = {{{}}},", self.title)?;
        writeln!(f, "    author = {{{}}},", self.authors.join(" and "))?;
        writeln!(f, "    year = {},", self.year)?;
        writeln!(f, "    month = {},", self.month)?;
        writeln!(f, "    eprint = {{{}}},", self.eprint)?;
        writeln!(f, "    eprinttype = {{{}}},", self.eprinttype)?;
        writeln!(f, "}}")
    }
}

/// Parse a batch-file JSON array into one result per record, so a malformed
/// record is reported without aborting the rest of the stream.
pub fn entries(value: &Value) -> Result<Vec<Result<EprintEntry>>> {
    let array = value
        .as_array()
        .ok_or_else(|| EmbedRefError::Parse("expected a JSON array of records".to_string()))?;
    Ok(array
        .iter()
        .map(|item| {
            item.as_object()
                .ok_or_else(|| {
                    EmbedRefError::Parse("expected record objects in array".to_string())
                })
                .and_then(EprintEntry::from_json_object)
        })
        .collect())
}

// exiftool writes timestamps either with a numeric offset or a literal Z.
fn parse_xmp_timestamp(value: &str) -> Option<(i32, u32)> {
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y:%m:%d %H:%M:%S%z") {
        return Some((dt.year(), dt.month()));
    }
    NaiveDateTime::parse_from_str(value, "%Y:%m:%d %H:%M:%SZ")
        .ok()
        .map(|dt| (dt.year(), dt.month()))
}

fn missing(key: &str) -> EmbedRefError {
    EmbedRefError::Parse(format!("record is missing '{key}'"))
}
