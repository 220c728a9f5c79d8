// Ingestion: sequential walk over the paginated listing

pub mod crawler;

pub use crawler::PaginationCrawler;
