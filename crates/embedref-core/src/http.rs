use reqwest::header::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{EmbedRefError, Result};

/// Thin wrapper over a shared reqwest client.
///
/// There is deliberately no retry or backoff here: a failed lookup is treated
/// as an empty candidate set for its tier and the resolution algorithm moves
/// on, so retrying would only delay the fallback.
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .build()
            .expect("failed to build reqwest client");
        Self { client }
    }

    pub async fn get(&self, url: &str) -> Result<String> {
        self.get_with_headers(url, HeaderMap::new()).await
    }

    pub async fn get_with_headers(&self, url: &str, headers: HeaderMap) -> Result<String> {
        let resp = self.client.get(url).headers(headers).send().await?;
        Self::read_body(url, resp).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let text = self.get(url).await?;
        serde_json::from_str(&text).map_err(|e| EmbedRefError::Parse(e.to_string()))
    }

    pub async fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
        headers: HeaderMap,
    ) -> Result<R> {
        let resp = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await?;
        let text = Self::read_body(url, resp).await?;
        serde_json::from_str(&text).map_err(|e| EmbedRefError::Parse(e.to_string()))
    }

    async fn read_body(url: &str, resp: reqwest::Response) -> Result<String> {
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(EmbedRefError::ApiError(
                url.to_string(),
                format!("HTTP {status}: {body}"),
            ));
        }
        resp.text().await.map_err(EmbedRefError::Http)
    }
}
