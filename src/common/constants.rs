//! Site and field constants for the vessel listing source.

pub const SITE_BASE_URL: &str = "https://www.vesselfinder.com";
pub const LISTING_PATH: &str = "/vessels";
pub const DETAIL_PATH_PREFIX: &str = "/vessels";

// Entity type names (used in CLI) and the listing's `t=` codes
pub const CARGO_SHIPS: &str = "Cargo ships";
pub const TANKER: &str = "Tanker";
pub const CARGO_SHIPS_CODE: &str = "4";
pub const TANKER_CODE: &str = "6";
pub const DEFAULT_ENTITY_TYPE: &str = TANKER;

// Listing row fields
pub const FIELD_SHIP_NAME: &str = "ship_name";
pub const FIELD_COUNTRY_OWNER: &str = "ship_country_owner";
pub const FIELD_DETAILS_PATH: &str = "ship_details_url_path";
pub const FIELD_MMSI: &str = "ship_MMSI";
pub const FIELD_LAST_REPORT: &str = "last_report_ts";

pub const MMSI_MARKER: &str = "-MMSI-";
pub const FLAG_TITLE_PREFIX: &str = "Flag of ";

/// Values the site renders in place of data. Compared case-insensitively.
pub const PLACEHOLDER_TOKENS: &[&str] = &["n/a", "premium users only"];

// Output defaults
pub const DEFAULT_LISTING_FILE: &str = "vessels.csv";
pub const DEFAULT_DETAILS_FILE: &str = "vessels-details.csv";
pub const DEFAULT_CLEAN_FILE: &str = "vessels-clean.csv";
pub const LISTING_CACHE_DIR: &str = "urlcaching";
pub const DETAILS_CACHE_DIR: &str = "urlcaching-details";

pub const DEFAULT_POOL_SIZE: usize = 20;
pub const DEFAULT_OUTLIER_K: f64 = 6.0;

/// Map a user-facing entity type name to the listing's type code.
pub fn entity_type_code(name: &str) -> Option<&'static str> {
    match name {
        CARGO_SHIPS => Some(CARGO_SHIPS_CODE),
        TANKER => Some(TANKER_CODE),
        _ => None,
    }
}

/// Get all supported entity type names
pub fn supported_entity_types() -> Vec<&'static str> {
    vec![CARGO_SHIPS, TANKER]
}
