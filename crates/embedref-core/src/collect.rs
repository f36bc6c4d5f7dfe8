//! Candidate collection: identifier-like strings already present in a
//! document's metadata. Pure — no network calls happen here.

use serde::{Deserialize, Serialize};

use crate::identifiers::doi::strip_doi_prefixes;
use crate::identifiers::extract::{FREE_TEXT_RULES, doi_from_resolver_url};
use crate::record::{MetadataRecord, fields};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateSource {
    EmbeddedField,
    TitleSearch,
    PatentIndexSearch,
    PreprintIndexSearch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    Exact,
    Ranked,
    Heuristic,
}

/// A provisional identifier gathered from one source, not yet trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub identifier: String,
    pub source: CandidateSource,
    pub confidence: Confidence,
}

impl Candidate {
    pub fn embedded_exact(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            source: CandidateSource::EmbeddedField,
            confidence: Confidence::Exact,
        }
    }

    pub fn embedded_heuristic(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            source: CandidateSource::EmbeddedField,
            confidence: Confidence::Heuristic,
        }
    }

    pub fn secondary_index(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            source: CandidateSource::PatentIndexSearch,
            confidence: Confidence::Heuristic,
        }
    }
}

/// Embedded DOI fields in priority order, most authoritative first.
pub const EMBEDDED_DOI_FIELDS: &[&str] = &[
    fields::PDF_DOI,
    fields::DC_IDENTIFIER,
    fields::PRISM_DOI,
    fields::CROSSMARK_DOI,
    fields::PDFX_DOI,
];

/// Tier 1: explicit identifier fields. One `EmbeddedField/Exact` candidate per
/// non-empty field, scheme prefixes stripped so equivalent values compare
/// equal.
pub fn collect_embedded(record: &MetadataRecord) -> Vec<Candidate> {
    EMBEDDED_DOI_FIELDS
        .iter()
        .filter_map(|field| record.get_non_empty(field))
        .map(|value| Candidate::embedded_exact(strip_doi_prefixes(value)))
        .collect()
}

/// Tier 2: heuristic extraction from free-text fields plus the resolver-URL
/// field. The secondary-index lookup candidate also belongs to this tier but
/// is network-derived, so the resolution engine fetches and appends it when
/// it enters the tier, keeping this function pure.
pub fn collect_heuristic(record: &MetadataRecord) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for field in [fields::SUBJECT, fields::DC_DESCRIPTION] {
        let Some(text) = record.get_non_empty(field) else {
            continue;
        };
        for rule in FREE_TEXT_RULES {
            if let Some(identifier) = (rule.apply)(text) {
                candidates.push(Candidate::embedded_heuristic(identifier));
            }
        }
    }

    if let Some(url) = record.get_non_empty(fields::PRISM_URL)
        && let Some(identifier) = doi_from_resolver_url(url)
    {
        candidates.push(Candidate::embedded_heuristic(identifier));
    }

    candidates
}
