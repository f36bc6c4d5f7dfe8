//! embedref-core — DOI/arXiv resolution and metadata enrichment for documents.
//!
//! The pipeline runs one document at a time: embedded metadata fields are
//! scanned for identifier candidates, a precedence/conflict algorithm turns
//! them into exactly one identifier or a definitive unresolved outcome, and a
//! resolved identifier is dereferenced against its registry to produce an
//! additive metadata patch.

pub mod error;
pub mod config;
pub mod http;
pub mod identifiers;
pub mod record;
pub mod collect;
pub mod sources;
pub mod disambiguate;
pub mod resolve;
pub mod enrich;
pub mod pagetext;
pub mod writeback;
pub mod batch;
pub mod bib;

pub use batch::{BatchReport, BatchRunner, DocumentOutcome};
pub use config::EmbedRefConfig;
pub use error::{EmbedRefError, Result};
pub use record::{MetadataRecord, Patch, PatchValue};
pub use resolve::{Identifier, Resolution, Resolver, UnresolvedReason};
