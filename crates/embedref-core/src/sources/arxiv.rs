//! Preprint repository (arXiv export API, Atom feed).

use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::{EmbedRefError, Result};
use crate::http::HttpClient;
use crate::identifiers::arxiv::ArxivId;

pub struct ArxivClient {
    client: HttpClient,
    base_url: String,
}

impl ArxivClient {
    pub fn new(user_agent: &str) -> Self {
        Self::with_base_url("https://export.arxiv.org/api/query", user_agent)
    }

    pub fn with_base_url(base_url: &str, user_agent: &str) -> Self {
        Self {
            client: HttpClient::new(user_agent),
            base_url: base_url.to_string(),
        }
    }

    /// Dereference one id against the export API.
    pub async fn fetch_entry(&self, id: &ArxivId) -> Result<ArxivEntry> {
        let url = if self.base_url.contains('?') {
            format!("{}&id_list={}", self.base_url, id.versioned())
        } else {
            format!("{}?id_list={}", self.base_url, id.versioned())
        };

        let xml = self.client.get(&url).await?;
        let entries = parse_atom_response(&xml)?;
        entries.into_iter().next().ok_or_else(|| {
            EmbedRefError::ApiError(url, format!("no entry for arXiv id {}", id.versioned()))
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArxivEntry {
    pub arxiv_id: ArxivId,
    pub title: String,
    pub authors: Vec<String>,
    pub published: DateTime<Utc>,
    /// The entry's own `<id>` URL, versioned abstract page.
    pub entry_url: String,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: String,
    title: String,
    published: String,
    #[serde(rename = "author", default)]
    authors: Vec<AtomAuthor>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: String,
}

pub fn parse_atom_response(xml: &str) -> Result<Vec<ArxivEntry>> {
    let feed: AtomFeed =
        from_str(xml).map_err(|e| EmbedRefError::Parse(format!("invalid atom xml: {e}")))?;
    feed.entries.into_iter().map(parse_entry).collect()
}

fn parse_entry(entry: AtomEntry) -> Result<ArxivEntry> {
    let arxiv_id = ArxivId::parse(entry.id.trim())
        .map_err(|_| EmbedRefError::Parse(format!("invalid arXiv id in entry: {}", entry.id)))?;

    let published = DateTime::parse_from_rfc3339(entry.published.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EmbedRefError::Parse(format!("invalid published datetime: {e}")))?;

    Ok(ArxivEntry {
        entry_url: entry.id.trim().to_string(),
        arxiv_id,
        title: clean_text(&entry.title),
        authors: entry
            .authors
            .into_iter()
            .map(|author| clean_text(&author.name))
            .collect(),
        published,
    })
}

// Atom titles wrap long lines; collapse all runs of whitespace.
fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
