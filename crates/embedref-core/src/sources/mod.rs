//! Query/parse wrappers around the external lookup services.

use serde::{Deserialize, Serialize};

pub mod arxiv;
pub mod crossref;
pub mod fulltext;

pub use arxiv::{ArxivClient, ArxivEntry};
pub use crossref::CrossrefClient;
pub use fulltext::FullTextIndexClient;

/// One ranked hit from a search service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub identifier: String,
    pub title: String,
}
