// Processing: field adaptation, detail enrichment and normalization

pub mod enrich;
pub mod fields;
pub mod normalize;

pub use enrich::DetailEnricher;
pub use fields::FieldAdapter;
pub use normalize::{NormalizedTable, Normalizer, TableSchema};
