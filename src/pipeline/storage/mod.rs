// Storage: delimited files at the pipeline boundaries

pub mod tabular;
