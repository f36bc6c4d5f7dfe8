use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{EmbedRefError, Result};

// New format: YYMM.NNNNN with optional version suffix
static NEW_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4}\.\d{4,5})(v(\d+))?$").unwrap());

// Old format: category/YYMMNNN
static OLD_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-zA-Z\-]+(?:\.[A-Z]{2})?/\d{7})(v(\d+))?$").unwrap());

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArxivId {
    pub raw: String,
    pub id: String,
    pub version: Option<u8>,
    pub abs_url: String,
}

impl ArxivId {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        let stripped = if let Some(s) = input.strip_prefix("https://arxiv.org/abs/") {
            s
        } else if let Some(s) = input.strip_prefix("http://arxiv.org/abs/") {
            s
        } else if let Some(s) = input.strip_prefix("arXiv:") {
            s
        } else if let Some(s) = input.strip_prefix("arxiv:") {
            s
        } else {
            input
        };

        if let Some(caps) = NEW_FORMAT.captures(stripped) {
            let id = caps.get(1).unwrap().as_str().to_string();
            let version = caps.get(3).and_then(|v| v.as_str().parse::<u8>().ok());
            return Ok(Self {
                raw: input.to_string(),
                abs_url: format!("https://arxiv.org/abs/{id}"),
                id,
                version,
            });
        }

        if let Some(caps) = OLD_FORMAT.captures(stripped) {
            let id = caps.get(1).unwrap().as_str().to_string();
            let version = caps.get(3).and_then(|v| v.as_str().parse::<u8>().ok());
            return Ok(Self {
                raw: input.to_string(),
                abs_url: format!("https://arxiv.org/abs/{id}"),
                id,
                version,
            });
        }

        Err(EmbedRefError::InvalidArxivId(input.to_string()))
    }

    /// The identifier as queried against the export API, version included when
    /// the source carried one. Version-suffixed ids are distinct from the bare
    /// id for conflict detection.
    pub fn versioned(&self) -> String {
        match self.version {
            Some(v) => format!("{}v{v}", self.id),
            None => self.id.clone(),
        }
    }
}
