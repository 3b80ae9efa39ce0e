//! Harvests a localized game dataset from a JSON API into an on-disk tree, then downloads
//! every image asset referenced anywhere in that data, once per unique URL.

pub mod config;
pub mod engine;
pub mod source;

pub use config::{Category, HarvestConfig, RetryPolicy};
pub use engine::harvester::Harvester;
pub use engine::stats::HarvestSnapshot;
