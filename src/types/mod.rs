pub mod cache_key;
pub mod dataset;
pub mod location;
pub mod series;
