use serde::{Deserialize, Serialize};

/// Process-wide configuration, set once before the batch loop starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedRefConfig {
    /// Whether ambiguous search results may be disambiguated at the console.
    /// Off by default: unattended pipelines must decline rather than guess.
    pub interactive: bool,

    /// Mail address for the Crossref polite pool, appended to the user agent.
    pub polite_pool_email: Option<String>,

    /// Budget for the local page-text extraction collaborator, in milliseconds.
    pub page_text_timeout_ms: u64,

    pub crossref_base_url: String,
    pub fulltext_index_base_url: String,
    pub doi_registry_base_url: String,
    pub arxiv_base_url: String,
}

impl Default for EmbedRefConfig {
    fn default() -> Self {
        Self {
            interactive: false,
            polite_pool_email: None,
            page_text_timeout_ms: 1000,
            crossref_base_url: "https://api.crossref.org".to_string(),
            fulltext_index_base_url: "https://ieeexplore.ieee.org".to_string(),
            doi_registry_base_url: "https://doi.org".to_string(),
            arxiv_base_url: "https://export.arxiv.org/api/query".to_string(),
        }
    }
}

impl EmbedRefConfig {
    pub fn user_agent(&self) -> String {
        match &self.polite_pool_email {
            Some(email) => format!("embedref/0.1 (mailto:{email})"),
            None => "embedref/0.1".to_string(),
        }
    }
}
