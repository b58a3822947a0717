pub mod enrichment;
pub mod fallback;
pub(crate) mod generation;
pub mod navigation;
pub mod pagination;
pub mod stats_cache;
pub mod time_range;
