// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Property-based tests for pod-image-swap-webhook.
//!
//! Uses proptest to generate random inputs and verify invariants.

use proptest::prelude::*;

use pod_image_swap_webhook::config::{ExclusionRule, ReplacementRule};
use pod_image_swap_webhook::image::normalize_image;
use pod_image_swap_webhook::{Config, Pattern};

/// Strategy for image-like strings, with and without registry host and tag.
fn any_image() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z0-9]{1,12}(:[a-z0-9.]{1,8})?",
        "[a-z0-9]{1,8}/[a-z0-9-]{1,12}(:[a-z0-9.]{1,8})?",
        "[a-z0-9]{1,8}\\.(io|org|com)(:[0-9]{2,5})?/[a-z0-9]{1,8}/[a-z0-9-]{1,12}(:[a-z0-9.]{1,8})?",
        ".{0,40}",
    ]
}

/// Leading characters of an image, at least one.
fn prefix_of(image: &str, len: usize) -> String {
    image.chars().take(len.max(1)).collect()
}

proptest! {
    /// Property: normalization is idempotent.
    #[test]
    fn test_normalize_idempotent(image in any_image()) {
        let once = normalize_image(&image);
        prop_assert_eq!(normalize_image(&once), once);
    }

    /// Property: a matching exclusion rule keeps the image unchanged,
    /// whatever the replacement rules are.
    #[test]
    fn test_exclusion_dominates(image in any_image(), len in 1usize..20, replacement in "[a-z.]{1,16}") {
        let normalized = normalize_image(&image);
        let prefix = prefix_of(&normalized, len);
        let config = Config::new(
            vec![ExclusionRule { pattern: Pattern::prefix(prefix.clone()) }],
            vec![
                ReplacementRule::new(Pattern::prefix(prefix), replacement.clone()).unwrap(),
                ReplacementRule::new(Pattern::regex(".*").unwrap(), replacement).unwrap(),
            ],
        );
        prop_assert_eq!(config.evaluate(&image), image);
    }

    /// Property: appending replacement rules after a matching one never
    /// changes the result.
    #[test]
    fn test_first_match_wins(image in any_image(), len in 1usize..20, extra in proptest::collection::vec("[a-z.]{1,16}", 0..4)) {
        let normalized = normalize_image(&image);
        let first = ReplacementRule::new(Pattern::prefix(prefix_of(&normalized, len)), "mirror.example.com").unwrap();
        let single = Config::new(vec![], vec![first.clone()]);

        let mut rules = vec![first];
        for replacement in extra {
            rules.push(ReplacementRule::new(Pattern::regex("^").unwrap(), replacement).unwrap());
        }
        let extended = Config::new(vec![], rules);

        prop_assert_eq!(single.evaluate(&image), extended.evaluate(&image));
    }

    /// Property: with no matching rule the original image is returned.
    #[test]
    fn test_unmatched_image_is_unchanged(image in any_image()) {
        let config = Config::new(
            vec![],
            vec![ReplacementRule::new(Pattern::prefix("\u{0}never"), "mirror.example.com").unwrap()],
        );
        prop_assert_eq!(config.evaluate(&image), image);
    }

    /// Property: evaluation is deterministic.
    #[test]
    fn test_evaluate_deterministic(image in any_image()) {
        let config = Config::new(
            vec![],
            vec![ReplacementRule::new(Pattern::regex("^(?P<host>[^/]+)/").unwrap(), "mirror.example.com/${host}/").unwrap()],
        );
        prop_assert_eq!(config.evaluate(&image), config.evaluate(&image));
    }
}
