//! Named extraction rules for identifier-like strings in free text.
//!
//! Each rule is a pure function from text to an optional identifier string,
//! kept in an explicit ordered list so the heuristics stay unit-testable
//! independently of any network call.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::identifiers::arxiv::ArxivId;
use crate::identifiers::doi::strip_doi_prefixes;

// arXiv stamps the margin of the first page with "arXiv:YYMM.NNNNNvN".
static ARXIV_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^arxiv:(\d{4}\.\d+(?:v\d+)?)").unwrap());

pub struct ExtractionRule {
    pub name: &'static str,
    pub apply: fn(&str) -> Option<String>,
}

/// Rules applied to free-text fields (subject line, description line), in
/// order. A token only counts when it carries the DOI directory prefix.
pub const FREE_TEXT_RULES: &[ExtractionRule] = &[
    ExtractionRule {
        name: "last-semicolon-token",
        apply: last_semicolon_token,
    },
    ExtractionRule {
        name: "last-space-token",
        apply: last_space_token,
    },
];

fn last_semicolon_token(text: &str) -> Option<String> {
    doi_token(text.rsplit(';').next()?)
}

fn last_space_token(text: &str) -> Option<String> {
    doi_token(text.rsplit(' ').next()?)
}

fn doi_token(token: &str) -> Option<String> {
    let token = token.trim();
    if token.starts_with("10.") {
        Some(token.to_string())
    } else {
        None
    }
}

/// Extract a DOI from a resolver URL (doi.org / dx.doi.org).
pub fn doi_from_resolver_url(url: &str) -> Option<String> {
    let url = url.trim();
    let stripped = strip_doi_prefixes(url);
    if stripped != url && stripped.starts_with("10.") {
        Some(stripped.to_string())
    } else {
        None
    }
}

/// Find the arXiv marker on a page of extracted text. Exactly one distinct id
/// is required; zero or several means the page cannot be trusted.
pub fn find_arxiv_marker(text: &str) -> Option<ArxivId> {
    let mut ids: Vec<&str> = ARXIV_MARKER
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.len() != 1 {
        return None;
    }
    ArxivId::parse(ids[0]).ok()
}
