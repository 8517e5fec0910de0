//! Property tests for the grounding codec.

use labelbridge::codec::{decode, encode, round_trip_tolerance};
use labelbridge::ir::AnnotationKind;
use proptest::prelude::*;

mod proptest_helpers;

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn encode_decode_roundtrip_within_tolerance(
        label in proptest_helpers::arb_label(),
        coords in proptest_helpers::arb_normalized_coords(),
    ) {
        let text = encode(&label, &coords);
        let decoded = decode(&text);

        prop_assert!(decoded.warnings.is_empty(), "warnings: {:?}", decoded.warnings);
        prop_assert_eq!(decoded.annotations.len(), 1);

        let restored = &decoded.annotations[0];
        prop_assert_eq!(&restored.label, &label);
        prop_assert_eq!(restored.coords.len(), coords.len());

        let tolerance = round_trip_tolerance();
        for (orig, back) in coords.iter().zip(&restored.coords) {
            prop_assert!((orig - back).abs() <= tolerance, "{} vs {}", orig, back);
        }
    }

    #[test]
    fn kind_classification_is_stable_across_roundtrip(
        label in proptest_helpers::arb_label(),
        coords in proptest_helpers::arb_normalized_coords(),
    ) {
        let expected = AnnotationKind::for_count(coords.len()).expect("even count >= 2");
        let decoded = decode(&encode(&label, &coords));
        prop_assert_eq!(decoded.annotations[0].kind, expected);
    }

    #[test]
    fn decode_never_panics_and_embedded_fragment_survives(
        prefix in "[^<\\[]{0,40}",
        label in proptest_helpers::arb_label(),
        coords in proptest_helpers::arb_normalized_coords(),
        suffix in "[^<\\[]{0,40}",
    ) {
        let text = format!("{prefix}{}{suffix}", encode(&label, &coords));
        let decoded = decode(&text);
        prop_assert_eq!(decoded.annotations.len(), 1);
        prop_assert_eq!(&decoded.annotations[0].label, &label);
    }

    #[test]
    fn decode_is_total_on_arbitrary_text(text in ".{0,200}") {
        // No input may panic or error; warnings are the only escape hatch.
        let _ = decode(&text);
    }
}
