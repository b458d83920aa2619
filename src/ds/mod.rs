pub mod frequency_buckets;
pub mod recency_list;

pub use frequency_buckets::FrequencyBuckets;
pub use recency_list::{EntryId, RecencyList};
