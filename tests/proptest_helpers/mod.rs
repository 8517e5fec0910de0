#![allow(dead_code)]

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Labels the grounding grammar can carry: non-empty, no tag delimiters,
/// no brackets or commas that would collide with the coordinate list.
pub fn arb_label() -> BoxedStrategy<String> {
    "[a-zA-Z][a-zA-Z0-9 _-]{0,15}"
        .prop_map(|s| s.trim().to_string())
        .prop_filter("label must stay non-empty after trimming", |s| !s.is_empty())
        .boxed()
}

/// A normalized coordinate list with an even, kind-mappable length.
pub fn arb_normalized_coords() -> BoxedStrategy<Vec<f64>> {
    (1usize..=6)
        .prop_flat_map(|pairs| {
            proptest::collection::vec(0.0f64..=1.0, pairs * 2)
        })
        .boxed()
}
