pub mod apis;
pub mod app;
pub mod common;
pub mod config;
pub mod infra;
pub mod observability;
pub mod parser;
pub mod pipeline;

pub use common::error::{FetchError, Result, ScraperError};
pub use config::Config;
pub use pipeline::{Pipeline, PipelineReport};
