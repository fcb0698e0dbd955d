//! Data layer for the patent dashboard.
//!
//! Discovers and reads CSV exports, merges them into a deduplicated
//! [`reader::Dataset`], aggregates applicants, years and FI facets, and
//! re-exports filtered rows.

pub mod aggregator;
pub mod analysis;
pub mod export;
pub mod facets;
pub mod reader;

pub use portfolio_core as core;
