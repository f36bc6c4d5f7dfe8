//! Bibliographic search index (Crossref works API).

use serde_json::Value;

use crate::error::Result;
use crate::http::HttpClient;
use crate::sources::SearchHit;

pub struct CrossrefClient {
    client: HttpClient,
    base_url: String,
}

impl CrossrefClient {
    pub fn new(user_agent: &str) -> Self {
        Self::with_base_url("https://api.crossref.org", user_agent)
    }

    pub fn with_base_url(base_url: &str, user_agent: &str) -> Self {
        Self {
            client: HttpClient::new(user_agent),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Free-text bibliographic query, ranked hits capped at `rows`.
    pub async fn search_bibliographic(&self, query: &str, rows: u32) -> Result<Vec<SearchHit>> {
        let url = format!(
            "{}/works?query.bibliographic={}&rows={rows}",
            self.base_url,
            urlencoding::encode(query)
        );
        let val: Value = self.client.get_json(&url).await?;

        let mut hits = Vec::new();
        if let Some(items) = val["message"]["items"].as_array() {
            for item in items {
                let Some(doi) = item["DOI"].as_str() else {
                    continue;
                };
                let title = item["title"][0].as_str().unwrap_or_default().to_string();
                hits.push(SearchHit {
                    identifier: doi.to_string(),
                    title,
                });
            }
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn search_parses_ranked_hits() {
        let mut server = Server::new_async().await;

        let _m = server
            .mock("GET", "/works?query.bibliographic=AwesomePaper&rows=3")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "status": "ok",
                    "message": {
                        "items": [
                            {"DOI": "10.2/z", "title": ["AwesomePaper"], "score": 91.0},
                            {"DOI": "10.3/w", "title": ["Another Paper"], "score": 45.0}
                        ]
                    }
                }"#,
            )
            .create_async()
            .await;

        let client = CrossrefClient::with_base_url(&server.url(), "embedref/0.1");
        let hits = client.search_bibliographic("AwesomePaper", 3).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].identifier, "10.2/z");
        assert_eq!(hits[0].title, "AwesomePaper");
    }

    #[tokio::test]
    async fn items_without_doi_are_skipped() {
        let mut server = Server::new_async().await;

        let _m = server
            .mock("GET", "/works?query.bibliographic=q&rows=3")
            .with_status(200)
            .with_body(r#"{"message": {"items": [{"title": ["No DOI here"]}]}}"#)
            .create_async()
            .await;

        let client = CrossrefClient::with_base_url(&server.url(), "embedref/0.1");
        let hits = client.search_bibliographic("q", 3).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn server_error_surfaces_as_api_error() {
        let mut server = Server::new_async().await;

        let _m = server
            .mock("GET", "/works?query.bibliographic=q&rows=3")
            .with_status(503)
            .create_async()
            .await;

        let client = CrossrefClient::with_base_url(&server.url(), "embedref/0.1");
        assert!(client.search_bibliographic("q", 3).await.is_err());
    }
}
