//! FI classification code normalization.
//!
//! Raw FI cells arrive as comma-separated tokens where a code may be split
//! across several tokens (`"A01B3/00,101"`). [`merge_codes`] reassembles
//! those continuations and [`parse_hierarchy`] decomposes the merged codes
//! into section / class / subclass / group facets.

use std::collections::BTreeSet;

use crate::models::ClassificationFacets;

// ── Tokenizing ────────────────────────────────────────────────────────────────

/// Split a raw FI cell on commas, trimming tokens and dropping empty ones.
pub fn split_codes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split and merge a raw FI cell in one step.
pub fn normalize_codes(raw: &str) -> Vec<String> {
    merge_codes(&split_codes(raw))
}

/// `true` when `token` is a continuation fragment: the part before the first
/// `@` is non-empty and made of digits only.
pub fn is_continuation(token: &str) -> bool {
    let head = token.split('@').next().unwrap_or_default();
    !head.is_empty() && head.chars().all(|c| matches!(c, '0'..='9' | '０'..='９'))
}

// ── Merging ───────────────────────────────────────────────────────────────────

/// Reassemble continuation tokens with the code they belong to.
///
/// A continuation is joined to the most recent non-continuation code as
/// `"{base}-{token}"`. Only non-continuation codes become the base, so
/// `["A01B", "3", "4"]` yields `["A01B-3", "A01B-4"]`: the first continuation
/// replaces the bare base entry and later ones get an entry of their own.
///
/// A continuation with no preceding base is kept verbatim and does not become
/// a base itself, so merged output never contains a continuation after the
/// first real code.
///
/// # Examples
///
/// ```
/// use portfolio_core::classification::merge_codes;
///
/// let merged = merge_codes(&["A01B", "3", "4", "B02C"]);
/// assert_eq!(merged, vec!["A01B-3", "A01B-4", "B02C"]);
/// ```
pub fn merge_codes<S: AsRef<str>>(codes: &[S]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(codes.len());
    let mut base: Option<&str> = None;
    // Whether the last retained entry is still the bare base code.
    let mut base_is_last = false;

    for code in codes {
        let code = code.as_ref();
        match base {
            Some(prev) if is_continuation(code) => {
                let joined = format!("{}-{}", prev, code);
                match merged.last_mut() {
                    Some(last) if base_is_last => *last = joined,
                    _ => merged.push(joined),
                }
                base_is_last = false;
            }
            None if is_continuation(code) => {
                merged.push(code.to_string());
                base_is_last = false;
            }
            _ => {
                merged.push(code.to_string());
                base = Some(code);
                base_is_last = true;
            }
        }
    }

    merged
}

// ── Hierarchy ─────────────────────────────────────────────────────────────────

/// Decompose merged codes into their hierarchy facets.
///
/// Only codes with a `/` contribute; anything else is skipped entirely,
/// including its section letter. Prefix lengths are counted in characters.
/// The group facet is the main group identifier (`"A01B3/00-101@Z"` gives
/// `"A01B3"`).
pub fn parse_hierarchy<S: AsRef<str>>(codes: &[S]) -> ClassificationFacets {
    let mut sections = BTreeSet::new();
    let mut classes = BTreeSet::new();
    let mut subclasses = BTreeSet::new();
    let mut groups = BTreeSet::new();

    for code in codes {
        let code = code.as_ref();
        let Some((main_part, _)) = code.split_once('/') else {
            continue;
        };

        let length = main_part.chars().count();
        if length >= 1 {
            sections.insert(prefix(main_part, 1));
        }
        if length >= 4 {
            subclasses.insert(prefix(main_part, 4));
        }
        if length >= 3 {
            classes.insert(prefix(main_part, 3));
        }

        groups.insert(group_of(code).to_string());
    }

    ClassificationFacets {
        sections,
        classes,
        subclasses,
        groups,
    }
}

/// Leading group identifier of a code: drop any merged continuation, then
/// any `@` qualifier, then the subgroup after `/`.
fn group_of(code: &str) -> &str {
    let head = code.split('-').next().unwrap_or_default();
    let head = head.split('@').next().unwrap_or_default();
    head.split('/').next().unwrap_or_default()
}

fn prefix(s: &str, chars: usize) -> String {
    s.chars().take(chars).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    // ── split_codes ───────────────────────────────────────────────────────────

    #[test]
    fn test_split_codes_trims_and_drops_empty() {
        let tokens = split_codes(" A01B3/00 , 101,, B02C1/00@Z ,");
        assert_eq!(tokens, vec!["A01B3/00", "101", "B02C1/00@Z"]);
    }

    #[test]
    fn test_split_codes_empty_cell() {
        assert!(split_codes("").is_empty());
        assert!(split_codes(" , ").is_empty());
    }

    // ── is_continuation ───────────────────────────────────────────────────────

    #[test]
    fn test_is_continuation() {
        assert!(is_continuation("101"));
        assert!(is_continuation("101@A"));
        assert!(is_continuation("１０１"));
        assert!(!is_continuation("A01B3/00"));
        assert!(!is_continuation("@A"));
        assert!(!is_continuation(""));
        assert!(!is_continuation("10-1"));
    }

    // ── merge_codes ───────────────────────────────────────────────────────────

    #[test]
    fn test_merge_two_continuations_share_base() {
        let merged = merge_codes(&["A01B", "3", "4", "B02C"]);
        assert_eq!(merged, vec!["A01B-3", "A01B-4", "B02C"]);
    }

    #[test]
    fn test_merge_single_continuation_replaces_base() {
        let merged = merge_codes(&["G06F17/30", "170", "H04L9/00"]);
        assert_eq!(merged, vec!["G06F17/30-170", "H04L9/00"]);
    }

    #[test]
    fn test_merge_keeps_qualifier_on_continuation() {
        let merged = merge_codes(&["A61K8/00", "101@Z"]);
        assert_eq!(merged, vec!["A61K8/00-101@Z"]);
    }

    #[test]
    fn test_merge_no_continuations_is_identity() {
        let codes = vec!["A01B3/00", "B02C1/00@A", "C07D"];
        assert_eq!(merge_codes(&codes), codes);
    }

    #[test]
    fn test_merge_leading_continuation_kept_verbatim() {
        // Data-quality edge case: a continuation with nothing to attach to.
        let merged = merge_codes(&["101", "A01B3/00"]);
        assert_eq!(merged, vec!["101", "A01B3/00"]);
    }

    #[test]
    fn test_merge_leading_continuations_do_not_chain() {
        let merged = merge_codes(&["0@A", "0", "0"]);
        assert_eq!(merged, vec!["0@A", "0", "0"]);
        assert_eq!(merge_codes(&merged), merged);

        let merged = merge_codes(&["3", "4", "B02C", "5"]);
        assert_eq!(merged, vec!["3", "4", "B02C-5"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let once = merge_codes(&["A01B", "3", "4", "B02C", "7@X"]);
        let twice = merge_codes(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_empty() {
        let empty: [&str; 0] = [];
        assert!(merge_codes(&empty).is_empty());
    }

    // ── parse_hierarchy ───────────────────────────────────────────────────────

    #[test]
    fn test_parse_hierarchy_full_code() {
        let facets = parse_hierarchy(&["A01B3/00"]);
        assert_eq!(facets.sections, set(&["A"]));
        assert_eq!(facets.classes, set(&["A01"]));
        assert_eq!(facets.subclasses, set(&["A01B"]));
        assert_eq!(facets.groups, set(&["A01B3"]));
    }

    #[test]
    fn test_parse_hierarchy_without_slash_is_skipped() {
        let facets = parse_hierarchy(&["XYZ"]);
        assert!(facets.is_empty());
    }

    #[test]
    fn test_parse_hierarchy_group_strips_merge_and_qualifier() {
        let facets = parse_hierarchy(&["A61K8/00-101@Z", "B02C1/00@A"]);
        assert_eq!(facets.groups, set(&["A61K8", "B02C1"]));
        assert_eq!(facets.sections, set(&["A", "B"]));
    }

    #[test]
    fn test_parse_hierarchy_short_main_part() {
        let facets = parse_hierarchy(&["A0/12"]);
        assert_eq!(facets.sections, set(&["A"]));
        assert!(facets.classes.is_empty());
        assert!(facets.subclasses.is_empty());
        assert_eq!(facets.groups, set(&["A0"]));
    }

    #[test]
    fn test_parse_hierarchy_deduplicates() {
        let facets = parse_hierarchy(&["A01B3/00", "A01B5/00", "A01C1/00"]);
        assert_eq!(facets.sections, set(&["A"]));
        assert_eq!(facets.classes, set(&["A01"]));
        assert_eq!(facets.subclasses, set(&["A01B", "A01C"]));
        assert_eq!(facets.groups.len(), 3);
    }

    #[test]
    fn test_parse_hierarchy_empty_input() {
        let empty: [&str; 0] = [];
        assert!(parse_hierarchy(&empty).is_empty());
    }

    #[test]
    fn test_normalize_codes_end_to_end() {
        let codes = normalize_codes("A01B3/00,101,102,B02C1/00@A");
        assert_eq!(
            codes,
            vec!["A01B3/00-101", "A01B3/00-102", "B02C1/00@A"]
        );
        let facets = parse_hierarchy(&codes);
        assert_eq!(facets.groups, set(&["A01B3", "B02C1"]));
    }
}
