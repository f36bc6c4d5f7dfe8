//! Enrichment: dereference a resolved identifier against its registry and
//! produce the metadata patch for the document.

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Deserialize;

use crate::config::EmbedRefConfig;
use crate::error::{EmbedRefError, Result};
use crate::http::HttpClient;
use crate::identifiers::Doi;
use crate::record::{Patch, fields};
use crate::resolve::Identifier;
use crate::sources::ArxivClient;

const CSL_JSON: &str = "application/vnd.citationstyles.csl+json";
const BIBTEX: &str = "application/x-bibtex";

/// Authoritative bibliographic data for one identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct BibliographicRecord {
    pub authors: Vec<String>,
    pub title: String,
    pub published_date: String,
    pub source_type: String,
}

/// DOI registry client using content negotiation on the resolver host.
pub struct DoiRegistryClient {
    client: HttpClient,
    base_url: String,
}

impl DoiRegistryClient {
    pub fn new(user_agent: &str) -> Self {
        Self::with_base_url("https://doi.org", user_agent)
    }

    pub fn with_base_url(base_url: &str, user_agent: &str) -> Self {
        Self {
            client: HttpClient::new(user_agent),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Citation-style (CSL JSON) record for a DOI.
    pub async fn fetch_csl(&self, doi: &Doi) -> Result<CslItem> {
        let text = self.negotiate(doi, CSL_JSON).await?;
        serde_json::from_str(&text).map_err(|e| EmbedRefError::Parse(e.to_string()))
    }

    /// Raw BibTeX entry for a DOI.
    pub async fn fetch_bibtex(&self, doi: &Doi) -> Result<String> {
        self.negotiate(doi, BIBTEX).await
    }

    async fn negotiate(&self, doi: &Doi, accept: &'static str) -> Result<String> {
        let url = format!("{}/{}", self.base_url, doi.normalized);
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        self.client.get_with_headers(&url, headers).await
    }
}

#[derive(Debug, Deserialize)]
pub struct CslItem {
    #[serde(default)]
    author: Vec<CslAuthor>,
    title: Option<String>,
    issued: Option<CslDate>,
    #[serde(rename = "type")]
    item_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CslAuthor {
    family: Option<String>,
    given: Option<String>,
    literal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CslDate {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<serde_json::Value>>,
}

impl CslItem {
    pub fn into_record(self) -> BibliographicRecord {
        BibliographicRecord {
            authors: self.author.iter().map(CslAuthor::display_name).collect(),
            title: self.title.unwrap_or_default(),
            published_date: self
                .issued
                .map(|date| date.to_iso_string())
                .unwrap_or_default(),
            source_type: self.item_type.unwrap_or_default(),
        }
    }
}

impl CslAuthor {
    fn display_name(&self) -> String {
        match (&self.given, &self.family) {
            (Some(given), Some(family)) => format!("{given} {family}"),
            (None, Some(family)) => family.clone(),
            (Some(given), None) => given.clone(),
            (None, None) => self.literal.clone().unwrap_or_default(),
        }
    }
}

impl CslDate {
    fn to_iso_string(&self) -> String {
        let Some(parts) = self.date_parts.first() else {
            return String::new();
        };
        parts
            .iter()
            .filter_map(|part| part.as_i64())
            .enumerate()
            .map(|(i, n)| {
                if i == 0 {
                    n.to_string()
                } else {
                    format!("{n:02}")
                }
            })
            .collect::<Vec<_>>()
            .join("-")
    }
}

pub struct Enricher {
    registry: DoiRegistryClient,
    arxiv: ArxivClient,
}

impl Enricher {
    pub fn from_config(config: &EmbedRefConfig) -> Self {
        let user_agent = config.user_agent();
        Self {
            registry: DoiRegistryClient::with_base_url(&config.doi_registry_base_url, &user_agent),
            arxiv: ArxivClient::with_base_url(&config.arxiv_base_url, &user_agent),
        }
    }

    pub fn new(registry: DoiRegistryClient, arxiv: ArxivClient) -> Self {
        Self { registry, arxiv }
    }

    /// Produce the patch for one resolved identifier.
    ///
    /// A DOI patch asserts only the ordered author list. The preprint path
    /// additionally asserts title, URL, identifier and date, since those are
    /// more reliable from the repository than anything inferred locally.
    /// Fields the patch does not fetch are never touched.
    pub async fn enrich(&self, identifier: &Identifier) -> Result<Patch> {
        let mut patch = Patch::new();
        match identifier {
            Identifier::Doi(doi) => {
                let record = self.registry.fetch_csl(doi).await?.into_record();
                patch.set_list(fields::DC_CREATOR, record.authors);
            }
            Identifier::Arxiv(id) => {
                let entry = self.arxiv.fetch_entry(id).await?;
                patch.set_list(fields::DC_CREATOR, entry.authors);
                patch.set_text(fields::TITLE, entry.title);
                patch.set_text(fields::URL, entry.entry_url);
                patch.set_text(fields::IDENTIFIER, format!("arxiv:{}", id.versioned()));
                patch.set_text(fields::DATE, entry.published.to_rfc3339());
            }
        }
        Ok(patch)
    }
}
