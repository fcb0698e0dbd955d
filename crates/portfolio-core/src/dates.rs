use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::{PortfolioError, Result};

// ── DateParser ────────────────────────────────────────────────────────────────

/// Parses the date cells found in patent-database CSV exports.
pub struct DateParser;

impl DateParser {
    /// Parse a date cell, accepting the formats used by J-PlatPat style
    /// exports as well as ISO 8601 dates and date-times.
    ///
    /// Returns `None` for blank cells and unrecognised formats.
    pub fn parse(s: &str) -> Option<NaiveDate> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        const DATE_FORMATS: &[&str] = &[
            "%Y/%m/%d",
            "%Y-%m-%d",
            "%Y.%m.%d",
            "%Y%m%d",
            "%Y年%m月%d日",
        ];
        for fmt in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return Some(date);
            }
        }

        const DATETIME_FORMATS: &[&str] = &[
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
            "%Y/%m/%d %H:%M:%S",
            "%Y/%m/%d %H:%M",
        ];
        for fmt in DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(naive.date());
            }
        }

        // RFC 3339 with offset; keep the local calendar date.
        DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
    }

    /// Like [`DateParser::parse`] but reports the offending value.
    pub fn parse_strict(s: &str) -> Result<NaiveDate> {
        Self::parse(s).ok_or_else(|| PortfolioError::DateParse(s.to_string()))
    }
}

/// Parse a user-supplied `YYYY-MM-DD` bound, e.g. from the command line.
pub fn parse_bound(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD, got \"{}\": {}", s, e))
}
