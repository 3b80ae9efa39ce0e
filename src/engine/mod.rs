// Harvest engine — asset discovery, bounded fetching, on-disk cache and run orchestration.

pub mod cache;
pub mod collector;
pub mod fetcher;
pub mod harvester;
pub mod resolver;
pub mod stats;
