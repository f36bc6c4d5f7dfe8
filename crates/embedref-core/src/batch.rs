//! Sequential batch processing: one resolution + enrichment pass per document.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::EmbedRefConfig;
use crate::enrich::Enricher;
use crate::error::{EmbedRefError, Result};
use crate::identifiers::extract::find_arxiv_marker;
use crate::pagetext::{PageTextExtractor, PdftotextExtractor};
use crate::record::{MetadataRecord, fields};
use crate::resolve::{Identifier, Resolution, Resolver, UnresolvedReason};
use crate::writeback::{ExiftoolWriter, MetadataWriter};

#[derive(Debug)]
pub enum DocumentOutcome {
    /// Resolution and write-back both succeeded.
    Enriched {
        identifier: Identifier,
        fields: Vec<String>,
    },
    /// Resolution completed without error but found no trustworthy
    /// identifier.
    Unresolved(UnresolvedReason),
    /// A hard per-document failure (protocol violation, enrichment or
    /// write-back error). Other documents are unaffected.
    Failed(String),
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<(String, DocumentOutcome)>,
    pub interrupted: bool,
}

impl BatchReport {
    pub fn enriched(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::Enriched { .. }))
    }

    pub fn unresolved(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::Unresolved(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::Failed(_)))
    }

    fn count(&self, predicate: impl Fn(&DocumentOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| predicate(o)).count()
    }
}

/// Load the batch-description file: an exiftool `-j` JSON array, one object
/// per document.
pub fn load_records(path: &Path) -> Result<Vec<MetadataRecord>> {
    let batch_error = |message: String| EmbedRefError::BatchFile {
        path: path.display().to_string(),
        message,
    };

    let text = std::fs::read_to_string(path).map_err(|e| batch_error(e.to_string()))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| batch_error(e.to_string()))?;
    let array = value
        .as_array()
        .ok_or_else(|| batch_error("expected a JSON array of records".to_string()))?;

    array
        .iter()
        .map(|item| {
            item.as_object()
                .map(MetadataRecord::from_json_object)
                .ok_or_else(|| batch_error("expected record objects in array".to_string()))
        })
        .collect()
}

pub struct BatchRunner {
    resolver: Resolver,
    enricher: Enricher,
    page_text: Arc<dyn PageTextExtractor>,
    writer: Arc<dyn MetadataWriter>,
}

impl BatchRunner {
    pub fn from_config(config: &EmbedRefConfig) -> Self {
        Self {
            resolver: Resolver::from_config(config),
            enricher: Enricher::from_config(config),
            page_text: Arc::new(PdftotextExtractor::new(Duration::from_millis(
                config.page_text_timeout_ms,
            ))),
            writer: Arc::new(ExiftoolWriter::new()),
        }
    }

    pub fn new(
        resolver: Resolver,
        enricher: Enricher,
        page_text: Arc<dyn PageTextExtractor>,
        writer: Arc<dyn MetadataWriter>,
    ) -> Self {
        Self {
            resolver,
            enricher,
            page_text,
            writer,
        }
    }

    /// Process documents strictly in order. Ctrl-C aborts the whole batch
    /// immediately; it is a hard stop, not a per-document skip.
    pub async fn run(&self, records: &[MetadataRecord]) -> BatchReport {
        self.run_until(records, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    /// Like [`run`](Self::run), with an explicit shutdown signal raced
    /// against each document's work.
    pub async fn run_until(
        &self,
        records: &[MetadataRecord],
        shutdown: impl Future<Output = ()>,
    ) -> BatchReport {
        tokio::pin!(shutdown);
        let mut report = BatchReport::default();

        for record in records {
            let path = record.source_file().unwrap_or("<unknown>").to_string();

            tokio::select! {
                _ = &mut shutdown => {
                    warn!("interrupted, aborting batch");
                    report.interrupted = true;
                    break;
                }
                outcome = self.process(record) => {
                    match &outcome {
                        DocumentOutcome::Enriched { identifier, .. } => {
                            info!(path = %path, identifier = %identifier, "document enriched");
                        }
                        DocumentOutcome::Unresolved(reason) => {
                            info!(path = %path, reason = %reason, "document unresolved");
                        }
                        DocumentOutcome::Failed(message) => {
                            warn!(path = %path, message = %message, "document failed");
                        }
                    }
                    report.outcomes.push((path, outcome));
                }
            }
        }

        report
    }

    async fn process(&self, record: &MetadataRecord) -> DocumentOutcome {
        let Some(path) = record.source_file() else {
            return DocumentOutcome::Failed("record has no SourceFile".to_string());
        };

        let resolution = match self.resolver.resolve(record).await {
            Ok(resolution) => resolution,
            Err(err) => return DocumentOutcome::Failed(err.to_string()),
        };

        let identifier = match resolution {
            Resolution::Resolved(identifier) => identifier,
            Resolution::Unresolved(reason) => match self.try_arxiv_marker(record, path).await {
                Some(identifier) => identifier,
                None => return DocumentOutcome::Unresolved(reason),
            },
        };

        let patch = match self.enricher.enrich(&identifier).await {
            Ok(patch) => patch,
            Err(err) => return DocumentOutcome::Failed(err.to_string()),
        };

        let fields = patch.keys().map(str::to_string).collect();
        match self.writer.apply(Path::new(path), &patch).await {
            Ok(()) => DocumentOutcome::Enriched { identifier, fields },
            Err(err) => DocumentOutcome::Failed(err.to_string()),
        }
    }

    /// Fallback strategy for preprints: read the arXiv marker off the first
    /// page. Skipped when the record already carries a registry DOI field, and
    /// when extraction fails or overruns its budget.
    async fn try_arxiv_marker(
        &self,
        record: &MetadataRecord,
        path: &str,
    ) -> Option<Identifier> {
        if record.contains(fields::PRISM_DOI) {
            return None;
        }

        let text = match self.page_text.first_page_text(Path::new(path)).await {
            Ok(text) => text,
            Err(err) => {
                warn!(path, stage = "page-text", error = %err, "extraction skipped");
                return None;
            }
        };

        find_arxiv_marker(&text).map(Identifier::Arxiv)
    }
}
