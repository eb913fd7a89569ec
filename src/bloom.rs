//! Approximate membership filter used as the memory-bounded duplicate
//! detector.
pub mod config;
pub mod filter;
pub mod traits;

pub use config::{BloomFilterConfig, BloomFilterConfigBuilder, BloomParams};
pub use filter::BloomFilter;
pub use traits::{FilterStats, MembershipFilter};
