use serde::{Deserialize, Serialize};

use crate::error::{EmbedRefError, Result};

/// Strip resolver-host and explicit scheme prefixes so that equivalent DOIs
/// compare equal. Case is preserved: disagreeing embedded fields must surface
/// as a conflict, not be papered over by folding.
pub fn strip_doi_prefixes(input: &str) -> &str {
    let input = input.trim();
    for prefix in [
        "https://doi.org/",
        "http://doi.org/",
        "https://dx.doi.org/",
        "http://dx.doi.org/",
    ] {
        if let Some(s) = input.strip_prefix(prefix) {
            return s;
        }
    }
    for prefix in ["doi:", "DOI:"] {
        if let Some(s) = input.strip_prefix(prefix) {
            return s.trim_start();
        }
    }
    input
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doi {
    pub raw: String,
    pub normalized: String,
    pub url: String,
}

impl Doi {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let stripped = strip_doi_prefixes(input);

        // Must start with "10.", contain "/", and have a non-empty suffix.
        if !stripped.starts_with("10.") {
            return Err(EmbedRefError::InvalidDoi(input.to_string()));
        }
        let slash_pos = stripped
            .find('/')
            .ok_or_else(|| EmbedRefError::InvalidDoi(input.to_string()))?;
        if stripped[slash_pos + 1..].is_empty() {
            return Err(EmbedRefError::InvalidDoi(input.to_string()));
        }

        let normalized = stripped.to_string();
        let url = format!("https://doi.org/{normalized}");

        Ok(Self {
            raw: input.to_string(),
            normalized,
            url,
        })
    }
}
