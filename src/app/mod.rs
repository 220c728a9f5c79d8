pub mod ports;

pub use ports::{FetchOptions, PageFetcher};
