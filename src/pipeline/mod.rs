// Data pipeline: listing crawl, detail enrichment, normalization and storage

pub mod ingestion;
pub mod orchestrator;
pub mod processing;
pub mod storage;

pub use orchestrator::{CleanJob, CrawlJob, EnrichJob, Pipeline, PipelineReport, RunJob};
