//! The precedence/conflict/fallback algorithm that turns untrustworthy
//! candidate identifiers plus a document title into exactly one identifier or
//! a definitive unresolved outcome.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::collect::{Candidate, collect_embedded, collect_heuristic};
use crate::config::EmbedRefConfig;
use crate::disambiguate::Disambiguator;
use crate::error::{EmbedRefError, Result};
use crate::identifiers::doi::strip_doi_prefixes;
use crate::identifiers::{ArxivId, Doi};
use crate::record::{MetadataRecord, fields};
use crate::sources::{CrossrefClient, FullTextIndexClient, SearchHit};

/// Ranked-result cap for title searches.
const SEARCH_ROWS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Identifier {
    Doi(Doi),
    Arxiv(ArxivId),
}

impl Identifier {
    pub fn value(&self) -> &str {
        match self {
            Identifier::Doi(doi) => &doi.normalized,
            Identifier::Arxiv(id) => &id.id,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Doi(doi) => write!(f, "doi:{}", doi.normalized),
            Identifier::Arxiv(id) => write!(f, "arxiv:{}", id.versioned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnresolvedReason {
    /// Authoritative embedded fields disagree; the conflicting set is carried
    /// for diagnostics. Majority voting is deliberately not applied.
    ConflictingEmbedded(Vec<String>),
    ConflictingHeuristic(Vec<String>),
    NoSearchMatch,
    AmbiguousDeclined,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::ConflictingEmbedded(set) => {
                write!(f, "conflicting embedded identifiers: {set:?}")
            }
            UnresolvedReason::ConflictingHeuristic(set) => {
                write!(f, "conflicting heuristic identifiers: {set:?}")
            }
            UnresolvedReason::NoSearchMatch => write!(f, "no search match"),
            UnresolvedReason::AmbiguousDeclined => write!(f, "ambiguous, declined"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(Identifier),
    Unresolved(UnresolvedReason),
}

pub struct Resolver {
    crossref: CrossrefClient,
    fulltext: FullTextIndexClient,
    disambiguator: Disambiguator,
}

impl Resolver {
    pub fn from_config(config: &EmbedRefConfig) -> Self {
        let user_agent = config.user_agent();
        Self {
            crossref: CrossrefClient::with_base_url(&config.crossref_base_url, &user_agent),
            fulltext: FullTextIndexClient::with_base_url(
                &config.fulltext_index_base_url,
                &user_agent,
            ),
            disambiguator: Disambiguator::new(config.interactive),
        }
    }

    pub fn new(
        crossref: CrossrefClient,
        fulltext: FullTextIndexClient,
        disambiguator: Disambiguator,
    ) -> Self {
        Self {
            crossref,
            fulltext,
            disambiguator,
        }
    }

    /// Resolve one document's DOI.
    ///
    /// Tier 1: embedded identifier fields, trusted only when unanimous.
    /// Tier 2: heuristic free-text / resolver-URL extraction plus the
    /// id-scoped secondary-index candidate, same unanimity rule.
    /// Tier 3: title search (full-text index, then bibliographic index) with
    /// exact-title auto-accept and bounded disambiguation.
    /// Last resort: one more id-scoped lookup before giving up.
    pub async fn resolve(&self, record: &MetadataRecord) -> Result<Resolution> {
        let path = record.source_file().unwrap_or("<unknown>");

        let embedded = collect_embedded(record);
        if !embedded.is_empty() {
            debug!(path, candidates = embedded.len(), "embedded identifier fields found");
            return match unanimous(&embedded) {
                Some(value) => Ok(Resolution::Resolved(Identifier::Doi(Doi::parse(value)?))),
                None => Ok(Resolution::Unresolved(UnresolvedReason::ConflictingEmbedded(
                    identifiers_of(&embedded),
                ))),
            };
        }

        let mut heuristic = collect_heuristic(record);
        if let Some(candidate) = self.secondary_index_candidate(record, path).await? {
            heuristic.push(candidate);
        }
        if !heuristic.is_empty() {
            debug!(path, candidates = heuristic.len(), "heuristic candidates found");
            return match unanimous(&heuristic) {
                Some(value) => Ok(Resolution::Resolved(Identifier::Doi(Doi::parse(value)?))),
                None => Ok(Resolution::Unresolved(
                    UnresolvedReason::ConflictingHeuristic(identifiers_of(&heuristic)),
                )),
            };
        }

        if let Some(title) = record.title_from_filename() {
            if let Some(resolution) = self.resolve_by_title(path, &title).await? {
                return Ok(resolution);
            }
        } else {
            warn!(path, "no filename available for title fallback");
        }

        if let Some(candidate) = self.secondary_index_candidate(record, path).await? {
            return Ok(Resolution::Resolved(Identifier::Doi(Doi::parse(
                &candidate.identifier,
            )?)));
        }

        Ok(Resolution::Unresolved(UnresolvedReason::NoSearchMatch))
    }

    /// The network-derived tier-2 candidate: the registry-specific
    /// article-number lookup, run only when the record carries that id.
    /// A transport failure means no candidate; a >1-record response violates
    /// the lookup contract and is fatal for the document.
    async fn secondary_index_candidate(
        &self,
        record: &MetadataRecord,
        path: &str,
    ) -> Result<Option<Candidate>> {
        let Some(article_id) = record.get_non_empty(fields::IEEE_ARTICLE_ID) else {
            return Ok(None);
        };
        match self.fulltext.lookup_article(article_id).await {
            Ok(hit) => Ok(hit.map(|hit| {
                Candidate::secondary_index(strip_doi_prefixes(&hit.identifier))
            })),
            Err(err @ EmbedRefError::ProtocolViolation(..)) => Err(err),
            Err(err) => {
                warn!(path, stage = "article-id-lookup", error = %err, "lookup failed");
                Ok(None)
            }
        }
    }

    /// Tier 3. `Ok(None)` means both indexes came back empty and the caller
    /// may try the last-resort lookup.
    async fn resolve_by_title(&self, path: &str, title: &str) -> Result<Option<Resolution>> {
        let hits = match self.fulltext.search_title(title).await {
            Ok(hits) => hits,
            Err(err) => {
                warn!(path, stage = "fulltext-title-search", error = %err, "lookup failed");
                Vec::new()
            }
        };
        if !hits.is_empty() {
            return self.pick_from_hits(title, &hits).map(Some);
        }

        let hits = match self.crossref.search_bibliographic(title, SEARCH_ROWS).await {
            Ok(hits) => hits,
            Err(err) => {
                warn!(path, stage = "bibliographic-search", error = %err, "lookup failed");
                Vec::new()
            }
        };
        if !hits.is_empty() {
            return self.pick_from_hits(title, &hits).map(Some);
        }

        Ok(None)
    }

    /// Exact case-insensitive title equality is the only automatic
    /// disambiguator; anything else goes through the bounded choice.
    fn pick_from_hits(&self, title: &str, hits: &[SearchHit]) -> Result<Resolution> {
        let query = title.to_lowercase();
        let exact: Vec<&SearchHit> = hits
            .iter()
            .filter(|hit| hit.title.to_lowercase() == query)
            .collect();

        if exact.len() == 1 {
            return Ok(Resolution::Resolved(Identifier::Doi(Doi::parse(
                &exact[0].identifier,
            )?)));
        }

        match self.disambiguator.choose(hits) {
            Some(identifier) => Ok(Resolution::Resolved(Identifier::Doi(Doi::parse(
                &identifier,
            )?))),
            None => Ok(Resolution::Unresolved(UnresolvedReason::AmbiguousDeclined)),
        }
    }
}

fn unanimous(candidates: &[Candidate]) -> Option<&str> {
    let first = candidates.first()?.identifier.as_str();
    candidates
        .iter()
        .all(|c| c.identifier == first)
        .then_some(first)
}

fn identifiers_of(candidates: &[Candidate]) -> Vec<String> {
    candidates.iter().map(|c| c.identifier.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disambiguate::Prompter;
    use mockito::Server;

    struct PanicPrompter;

    impl Prompter for PanicPrompter {
        fn ask(&self, _prompt: &str) -> Option<String> {
            panic!("disambiguator must not be consulted");
        }
    }

    fn resolver(
        crossref_url: &str,
        fulltext_url: &str,
        disambiguator: Disambiguator,
    ) -> Resolver {
        Resolver::new(
            CrossrefClient::with_base_url(crossref_url, "embedref/0.1"),
            FullTextIndexClient::with_base_url(fulltext_url, "embedref/0.1"),
            disambiguator,
        )
    }

    fn record_with_file(name: &str) -> MetadataRecord {
        let mut record = MetadataRecord::new();
        record.set(fields::SOURCE_FILE, format!("/papers/{name}"));
        record.set(fields::FILE_NAME, name);
        record
    }

    #[tokio::test]
    async fn agreeing_embedded_fields_resolve_without_network() {
        let mut server = Server::new_async().await;
        let crossref = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let fulltext = server
            .mock("POST", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let mut record = record_with_file("paper.pdf");
        record.set(fields::PDF_DOI, "10.1/x");
        record.set(fields::DC_IDENTIFIER, "doi:10.1/x");

        let r = resolver(&server.url(), &server.url(), Disambiguator::new(false));
        let resolution = r.resolve(&record).await.unwrap();

        assert_eq!(
            resolution,
            Resolution::Resolved(Identifier::Doi(Doi::parse("10.1/x").unwrap()))
        );
        crossref.assert_async().await;
        fulltext.assert_async().await;
    }

    #[tokio::test]
    async fn disagreeing_embedded_fields_conflict_even_with_majority() {
        let server = Server::new_async().await;

        let mut record = record_with_file("paper.pdf");
        record.set(fields::PDF_DOI, "10.1/x");
        record.set(fields::PRISM_DOI, "10.1/x");
        record.set(fields::DC_IDENTIFIER, "doi:10.1/y");

        let r = resolver(&server.url(), &server.url(), Disambiguator::new(false));
        let resolution = r.resolve(&record).await.unwrap();

        match resolution {
            Resolution::Unresolved(UnresolvedReason::ConflictingEmbedded(set)) => {
                assert_eq!(set, vec!["10.1/x", "10.1/y", "10.1/x"]);
            }
            other => panic!("expected embedded conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unanimous_heuristic_candidates_resolve() {
        let server = Server::new_async().await;

        let mut record = record_with_file("paper.pdf");
        record.set(fields::SUBJECT, "security; 10.2/y");
        record.set(fields::PRISM_URL, "https://doi.org/10.2/y");

        let r = resolver(&server.url(), &server.url(), Disambiguator::new(false));
        let resolution = r.resolve(&record).await.unwrap();

        assert_eq!(
            resolution,
            Resolution::Resolved(Identifier::Doi(Doi::parse("10.2/y").unwrap()))
        );
    }

    #[tokio::test]
    async fn conflicting_heuristic_candidates_stay_unresolved() {
        let server = Server::new_async().await;

        let mut record = record_with_file("paper.pdf");
        record.set(fields::SUBJECT, "security; 10.2/y");
        record.set(fields::PRISM_URL, "https://doi.org/10.2/z");

        let r = resolver(&server.url(), &server.url(), Disambiguator::new(false));
        let resolution = r.resolve(&record).await.unwrap();

        assert!(matches!(
            resolution,
            Resolution::Unresolved(UnresolvedReason::ConflictingHeuristic(_))
        ));
    }

    #[tokio::test]
    async fn single_exact_title_match_skips_disambiguation() {
        let mut fulltext_server = Server::new_async().await;
        let mut crossref_server = Server::new_async().await;

        let _ft = fulltext_server
            .mock("POST", "/rest/search/")
            .with_status(200)
            .with_body(r#"{"records": []}"#)
            .create_async()
            .await;

        let cr = crossref_server
            .mock(
                "GET",
                "/works?query.bibliographic=Smith_2020_AwesomePaper&rows=3",
            )
            .with_status(200)
            .with_body(
                r#"{"message": {"items": [
                    {"DOI": "10.2/z", "title": ["smith_2020_awesomepaper"]},
                    {"DOI": "10.3/w", "title": ["Unrelated"]}
                ]}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let record = record_with_file("Smith_2020_AwesomePaper.pdf");
        let disambiguator = Disambiguator::with_prompter(true, Box::new(PanicPrompter));
        let r = resolver(&crossref_server.url(), &fulltext_server.url(), disambiguator);
        let resolution = r.resolve(&record).await.unwrap();

        assert_eq!(
            resolution,
            Resolution::Resolved(Identifier::Doi(Doi::parse("10.2/z").unwrap()))
        );
        cr.assert_async().await;
    }

    #[tokio::test]
    async fn ambiguous_hits_declined_in_non_interactive_mode() {
        let mut fulltext_server = Server::new_async().await;

        let _ft = fulltext_server
            .mock("POST", "/rest/search/")
            .with_status(200)
            .with_body(
                r#"{"records": [
                    {"doi": "10.2/z", "articleTitle": "Close But Not Equal"},
                    {"doi": "10.3/w", "articleTitle": "Also Plausible"}
                ]}"#,
            )
            .create_async()
            .await;

        let record = record_with_file("paper.pdf");
        let r = resolver(
            "http://127.0.0.1:1",
            &fulltext_server.url(),
            Disambiguator::new(false),
        );
        let resolution = r.resolve(&record).await.unwrap();

        assert_eq!(
            resolution,
            Resolution::Unresolved(UnresolvedReason::AmbiguousDeclined)
        );
    }

    #[tokio::test]
    async fn article_id_candidate_resolves_in_tier_two_without_title_search() {
        let mut fulltext_server = Server::new_async().await;
        let mut crossref_server = Server::new_async().await;

        let title = fulltext_server
            .mock("POST", "/rest/search/")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"queryText": "paper"}"#.to_string(),
            ))
            .expect(0)
            .create_async()
            .await;
        let crossref = crossref_server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let _id = fulltext_server
            .mock("POST", "/rest/search/")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"queryText": "(\"Article Number\":771073)"}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"records": [{"doi": "10.1109/5.771073", "articleTitle": "T"}]}"#)
            .create_async()
            .await;

        let mut record = record_with_file("paper.pdf");
        record.set(fields::IEEE_ARTICLE_ID, "771073");

        let r = resolver(
            &crossref_server.url(),
            &fulltext_server.url(),
            Disambiguator::new(false),
        );
        let resolution = r.resolve(&record).await.unwrap();

        assert_eq!(
            resolution,
            Resolution::Resolved(Identifier::Doi(Doi::parse("10.1109/5.771073").unwrap()))
        );
        title.assert_async().await;
        crossref.assert_async().await;
    }

    #[tokio::test]
    async fn article_id_candidate_joins_the_heuristic_unanimity_check() {
        let mut fulltext_server = Server::new_async().await;

        // Free-text extraction says 10.2/y, the article-number lookup says
        // 10.2/z: that is a heuristic conflict, not a resolution.
        let id = fulltext_server
            .mock("POST", "/rest/search/")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"queryText": "(\"Article Number\":771073)"}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"records": [{"doi": "10.2/z", "articleTitle": "T"}]}"#)
            .expect(1)
            .create_async()
            .await;

        let mut record = record_with_file("paper.pdf");
        record.set(fields::SUBJECT, "security; 10.2/y");
        record.set(fields::IEEE_ARTICLE_ID, "771073");

        let r = resolver(
            "http://127.0.0.1:1",
            &fulltext_server.url(),
            Disambiguator::new(false),
        );
        let resolution = r.resolve(&record).await.unwrap();

        match resolution {
            Resolution::Unresolved(UnresolvedReason::ConflictingHeuristic(set)) => {
                assert!(set.contains(&"10.2/y".to_string()));
                assert!(set.contains(&"10.2/z".to_string()));
            }
            other => panic!("expected heuristic conflict, got {other:?}"),
        }
        id.assert_async().await;
    }

    #[tokio::test]
    async fn empty_article_lookup_is_retried_as_the_last_resort() {
        let mut fulltext_server = Server::new_async().await;
        let mut crossref_server = Server::new_async().await;

        // Once on entering tier 2, once more after the title search fails.
        let id = fulltext_server
            .mock("POST", "/rest/search/")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"queryText": "(\"Article Number\":771073)"}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"records": []}"#)
            .expect(2)
            .create_async()
            .await;
        let _ft = fulltext_server
            .mock("POST", "/rest/search/")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"queryText": "paper"}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"records": []}"#)
            .create_async()
            .await;
        let _cr = crossref_server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"message": {"items": []}}"#)
            .create_async()
            .await;

        let mut record = record_with_file("paper.pdf");
        record.set(fields::IEEE_ARTICLE_ID, "771073");

        let r = resolver(
            &crossref_server.url(),
            &fulltext_server.url(),
            Disambiguator::new(false),
        );
        let resolution = r.resolve(&record).await.unwrap();

        assert_eq!(
            resolution,
            Resolution::Unresolved(UnresolvedReason::NoSearchMatch)
        );
        id.assert_async().await;
    }

    #[tokio::test]
    async fn everything_empty_is_no_search_match() {
        let mut fulltext_server = Server::new_async().await;
        let mut crossref_server = Server::new_async().await;

        let _ft = fulltext_server
            .mock("POST", "/rest/search/")
            .with_status(200)
            .with_body(r#"{"records": []}"#)
            .create_async()
            .await;
        let _cr = crossref_server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"message": {"items": []}}"#)
            .create_async()
            .await;

        let record = record_with_file("paper.pdf");
        let r = resolver(
            &crossref_server.url(),
            &fulltext_server.url(),
            Disambiguator::new(false),
        );
        let resolution = r.resolve(&record).await.unwrap();

        assert_eq!(
            resolution,
            Resolution::Unresolved(UnresolvedReason::NoSearchMatch)
        );
    }

    #[tokio::test]
    async fn search_failures_degrade_to_empty_tiers() {
        // Both services unreachable: resolution still completes, unresolved.
        let record = record_with_file("paper.pdf");
        let r = resolver(
            "http://127.0.0.1:1",
            "http://127.0.0.1:1",
            Disambiguator::new(false),
        );
        let resolution = r.resolve(&record).await.unwrap();

        assert_eq!(
            resolution,
            Resolution::Unresolved(UnresolvedReason::NoSearchMatch)
        );
    }

    #[tokio::test]
    async fn protocol_violation_is_fatal_for_the_document() {
        let mut fulltext_server = Server::new_async().await;
        let mut crossref_server = Server::new_async().await;

        let _cr = crossref_server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"message": {"items": []}}"#)
            .create_async()
            .await;

        // The id-scoped query illegally returns two records.
        let _ft = fulltext_server
            .mock("POST", "/rest/search/")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"queryText": "paper"}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"records": []}"#)
            .create_async()
            .await;
        let _id = fulltext_server
            .mock("POST", "/rest/search/")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"queryText": "(\"Article Number\":771073)"}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"records": [{"doi": "10.1/a"}, {"doi": "10.1/b"}]}"#)
            .create_async()
            .await;

        let mut record = record_with_file("paper.pdf");
        record.set(fields::IEEE_ARTICLE_ID, "771073");

        let r = resolver(
            &crossref_server.url(),
            &fulltext_server.url(),
            Disambiguator::new(false),
        );
        let err = r.resolve(&record).await.unwrap_err();
        assert!(matches!(err, EmbedRefError::ProtocolViolation(..)));
    }
}
