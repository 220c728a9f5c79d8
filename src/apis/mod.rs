// Site-specific markup adapters

pub mod vessel_finder;

pub use vessel_finder::{parse_detail_page, parse_listing_page, ListingPage, PageSignal};
