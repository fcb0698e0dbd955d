use portfolio_core::classification::{is_continuation, merge_codes, parse_hierarchy};
use proptest::prelude::*;

fn code_token() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-H][0-9]{2}[A-Z][0-9]{1,3}/[0-9]{2,3}",
        "[A-H][0-9]{2}[A-Z][0-9]{1,3}/[0-9]{2,3}@[A-Z]",
        "[0-9]{1,3}",
        "[0-9]{1,3}@[A-Z]",
        "[A-Z]{1,4}",
    ]
}

proptest! {
    #[test]
    fn merge_never_grows(codes in prop::collection::vec(code_token(), 0..12)) {
        let merged = merge_codes(&codes);
        prop_assert!(merged.len() <= codes.len());
    }

    #[test]
    fn merge_is_idempotent(codes in prop::collection::vec(code_token(), 0..12)) {
        let once = merge_codes(&codes);
        let twice = merge_codes(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn merge_leaves_no_attached_continuations(
        base in "[A-H][0-9]{2}[A-Z][0-9]{1,3}/[0-9]{2}",
        rest in prop::collection::vec(code_token(), 0..12),
    ) {
        let mut codes = vec![base];
        codes.extend(rest);
        let merged = merge_codes(&codes);
        prop_assert!(merged.iter().all(|c| !is_continuation(c)));
    }

    #[test]
    fn facets_only_come_from_slashed_codes(codes in prop::collection::vec("[A-Z0-9@-]{0,8}", 0..8)) {
        // No generated token contains '/', so nothing may contribute.
        let facets = parse_hierarchy(&codes);
        prop_assert!(facets.is_empty());
    }

    #[test]
    fn section_is_prefix_of_class_and_subclass(codes in prop::collection::vec(code_token(), 0..8)) {
        let facets = parse_hierarchy(&codes);
        for class in &facets.classes {
            prop_assert!(facets.sections.iter().any(|s| class.starts_with(s.as_str())));
        }
        for subclass in &facets.subclasses {
            prop_assert!(facets.classes.iter().any(|c| subclass.starts_with(c.as_str())));
        }
    }
}
