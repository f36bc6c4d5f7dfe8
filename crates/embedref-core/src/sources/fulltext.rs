//! Patent/journal full-text index (IEEE Xplore search endpoint).
//!
//! Two query shapes: a free-text title query returning ranked hits, and an
//! exact article-number query whose contract guarantees at most one record.

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, ORIGIN};
use serde_json::{Value, json};

use crate::error::{EmbedRefError, Result};
use crate::http::HttpClient;
use crate::sources::SearchHit;

pub struct FullTextIndexClient {
    client: HttpClient,
    base_url: String,
}

impl FullTextIndexClient {
    pub fn new(user_agent: &str) -> Self {
        Self::with_base_url("https://ieeexplore.ieee.org", user_agent)
    }

    pub fn with_base_url(base_url: &str, user_agent: &str) -> Self {
        Self {
            client: HttpClient::new(user_agent),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Free-text title query; ranked hits, page size capped by the service.
    pub async fn search_title(&self, title: &str) -> Result<Vec<SearchHit>> {
        let records = self.search(title).await?;
        Ok(records
            .iter()
            .filter_map(|record| {
                let doi = record["doi"].as_str()?;
                let title = record["articleTitle"].as_str().unwrap_or_default();
                Some(SearchHit {
                    identifier: doi.to_string(),
                    title: title.to_string(),
                })
            })
            .collect())
    }

    /// Exact article-number lookup. At most one record is possible by
    /// contract; more than one is a protocol violation, not a disambiguation
    /// case.
    pub async fn lookup_article(&self, article_id: &str) -> Result<Option<SearchHit>> {
        let query = format!("(\"Article Number\":{article_id})");
        let records = self.search(&query).await?;

        if records.len() > 1 {
            return Err(EmbedRefError::ProtocolViolation(
                self.base_url.clone(),
                records.len(),
            ));
        }

        Ok(records.first().and_then(|record| {
            let doi = record["doi"].as_str()?;
            Some(SearchHit {
                identifier: doi.to_string(),
                title: record["articleTitle"].as_str().unwrap_or_default().to_string(),
            })
        }))
    }

    async fn search(&self, query_text: &str) -> Result<Vec<Value>> {
        let url = format!("{}/rest/search/", self.base_url);
        let body = json!({
            "newsearch": true,
            "queryText": query_text,
            "highlight": true,
            "returnFacets": ["ALL"],
            "returnType": "SEARCH",
        });

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(origin) = HeaderValue::from_str(&self.base_url) {
            headers.insert(ORIGIN, origin);
        }

        let val: Value = self.client.post_json(&url, &body, headers).await?;
        Ok(val["records"].as_array().cloned().unwrap_or_default())
    }
}
