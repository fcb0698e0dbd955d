//! Runtime layer for the patent dashboard.
//!
//! Loads uploads concurrently on tokio's blocking pool and memoizes document
//! text extraction by content hash.

pub mod extraction_cache;
pub mod loader;

pub use portfolio_core as core;
pub use portfolio_data as data;
