//! patentyx-ingestion — Patent ingestion pipeline.
//! - Provider adapters (PatentsView, WIPO PATENTSCOPE, EPO OPS)
//! - Concurrent aggregation and family-aware merge
//! - Full-text enrichment (local files, Google Patents)
//! - Normalisation, component tagging and snippet chunking
//! - Coverage reporting against canonical lists
//! - Persistence boundary and in-memory sink

pub mod aggregate;
pub mod chunker;
pub mod coverage;
pub mod enrich;
pub mod fulltext;
pub mod manual;
pub mod merge;
pub mod models;
pub mod normalise;
pub mod pipeline;
pub mod repository;
pub mod sources;

pub use aggregate::collect_provider_records;
pub use coverage::{load_doc_numbers, summarise_coverage, CoverageReport};
pub use enrich::enrich_with_full_text;
pub use fulltext::{FullText, FullTextFetcher, GooglePatentsFetcher, LocalFullTextFetcher};
pub use merge::{merge_by_family, merge_two_records};
pub use models::{PatentRecord, RawRecord, SnippetPayload, SnippetSection};
pub use normalise::{normalise_to_patent_record, ComponentPatterns};
pub use pipeline::{run_ingestion, IngestionJob, IngestionProgress, IngestionResult, PipelineDeps};
pub use repository::{ingest_records, persist_record, snippet_hash, MemoryRepository, PatentSink};
pub use sources::{EpoOpsProvider, PatentProvider, PatentsViewProvider, WipoPatentscopeProvider};
