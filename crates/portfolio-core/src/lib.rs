//! Core types and algorithms for the patent portfolio dashboard.
//!
//! Holds the record model, FI classification normalization, date parsing,
//! number formatting, CLI settings and the shared error type.

pub mod classification;
pub mod dates;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{PortfolioError, Result};
