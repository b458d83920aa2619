pub use crate::cache::Cache;
pub use crate::config::{CacheBuilder, EvictionPolicy};
pub use crate::error::CacheError;
pub use crate::stats::Statistics;
pub use crate::weight::ByteSize;
