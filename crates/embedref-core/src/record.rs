//! Per-document metadata record and the additive patch applied to it.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field vocabulary, exiftool group-prefixed tag names.
pub mod fields {
    pub const SOURCE_FILE: &str = "SourceFile";
    pub const FILE_NAME: &str = "System:FileName";

    pub const PDF_DOI: &str = "PDF:Doi";
    pub const DC_IDENTIFIER: &str = "XMP-dc:Identifier";
    pub const PRISM_DOI: &str = "XMP-prism:DOI";
    pub const CROSSMARK_DOI: &str = "XMP-crossmark:Doi";
    pub const PDFX_DOI: &str = "XMP-pdfx:Doi";

    pub const SUBJECT: &str = "PDF:Subject";
    pub const DC_DESCRIPTION: &str = "XMP-dc:Description";
    pub const PRISM_URL: &str = "XMP-prism:URL";
    pub const IEEE_ARTICLE_ID: &str = "PDF:IEEE_Article_ID";

    pub const DC_CREATOR: &str = "XMP-dc:Creator";
    pub const DC_TITLE: &str = "XMP-dc:Title";
    pub const DC_DATE: &str = "XMP-dc:Date";
    pub const TITLE: &str = "Title";
    pub const URL: &str = "URL";
    pub const IDENTIFIER: &str = "Identifier";
    pub const DATE: &str = "date";
}

/// One document's extracted metadata: field name to string value. Owned by
/// the caller and read-only to the pipeline except through [`Patch::apply_to`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetadataRecord {
    fields: BTreeMap<String, String>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from one object of an exiftool `-j` JSON array.
    /// Non-string scalars (page counts, numeric ids) are coerced to strings;
    /// arrays and objects are skipped.
    pub fn from_json_object(object: &serde_json::Map<String, Value>) -> Self {
        let mut fields = BTreeMap::new();
        for (key, value) in object {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            fields.insert(key.clone(), text);
        }
        Self { fields }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Like [`get`](Self::get) but empty and whitespace-only values count as
    /// absent.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Document path for diagnostics and write-back.
    pub fn source_file(&self) -> Option<&str> {
        self.get_non_empty(fields::SOURCE_FILE)
    }

    /// Title inferred from the filename with the extension stripped. An
    /// embedded title field is deliberately not consulted here: it may itself
    /// be unreliable or absent.
    pub fn title_from_filename(&self) -> Option<String> {
        let name = self
            .get_non_empty(fields::FILE_NAME)
            .or_else(|| self.source_file())?;
        Path::new(name)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
    }
}

/// A patch value: a plain string or an ordered list (author names).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PatchValue {
    Text(String),
    List(Vec<String>),
}

impl PatchValue {
    fn as_record_value(&self) -> String {
        match self {
            PatchValue::Text(s) => s.clone(),
            PatchValue::List(items) => items.join("; "),
        }
    }
}

/// Additive set of metadata field overrides. Applying a patch only adds or
/// overwrites the keys it defines; fields absent from the patch are never
/// removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Patch {
    #[serde(flatten)]
    fields: BTreeMap<String, PatchValue>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_text(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields
            .insert(key.into(), PatchValue::Text(value.into()));
    }

    pub fn set_list(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.fields.insert(key.into(), PatchValue::List(values));
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&PatchValue> {
        self.fields.get(key)
    }

    pub fn apply_to(&self, record: &mut MetadataRecord) {
        for (key, value) in &self.fields {
            record.set(key.clone(), value.as_record_value());
        }
    }
}
