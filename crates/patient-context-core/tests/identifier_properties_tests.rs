//! Property tests for identifier handling and mirroring.

use proptest::prelude::*;

use patient_context_core::models::PatientId;
use patient_context_core::{
    encode_for_store, is_valid_uuid, parse_stored, ContextResolver, KeyStore,
};

fn uuid_strategy() -> impl Strategy<Value = String> {
    (
        "[0-9a-fA-F]{8}",
        "[0-9a-fA-F]{4}",
        "[1-5]",
        "[0-9a-fA-F]{3}",
        "[89abAB]",
        "[0-9a-fA-F]{3}",
        "[0-9a-fA-F]{12}",
    )
        .prop_map(|(a, b, version, c, variant, d, e)| {
            format!("{a}-{b}-{version}{c}-{variant}{d}-{e}")
        })
}

proptest! {
    #[test]
    fn valid_uuids_accepted(s in uuid_strategy()) {
        prop_assert!(is_valid_uuid(&s));
    }

    #[test]
    fn bad_version_rejected(
        s in uuid_strategy(),
        version in "[06-9a-fA-F]",
    ) {
        let mut chars: Vec<char> = s.chars().collect();
        chars[14] = version.chars().next().unwrap();
        let s: String = chars.into_iter().collect();
        prop_assert!(!is_valid_uuid(&s));
    }

    #[test]
    fn bad_variant_rejected(
        s in uuid_strategy(),
        variant in "[0-7c-fC-F]",
    ) {
        let mut chars: Vec<char> = s.chars().collect();
        chars[19] = variant.chars().next().unwrap();
        let s: String = chars.into_iter().collect();
        prop_assert!(!is_valid_uuid(&s));
    }

    #[test]
    fn arbitrary_text_rejected(s in "[^-]{0,40}") {
        prop_assert!(!is_valid_uuid(&s));
    }

    #[test]
    fn encode_then_parse_is_identity(raw in ".+") {
        if let Some(id) = PatientId::new(raw) {
            prop_assert_eq!(parse_stored(Some(&encode_for_store(&id))), Some(id));
        }
    }

    #[test]
    fn parse_never_panics(raw in ".*") {
        let _ = parse_stored(Some(&raw));
    }

    #[test]
    fn mirror_is_idempotent(raw in "[a-z0-9-]{1,36}") {
        let resolver = ContextResolver::with_defaults(KeyStore::in_memory());
        let id = PatientId::new(raw);
        prop_assume!(id.is_some());
        let id = id.unwrap();

        resolver.mirror(&id);
        let once: Vec<_> = resolver.slots().iter().map(|n| resolver.store().read_slot(n)).collect();
        resolver.mirror(&id);
        let twice: Vec<_> = resolver.slots().iter().map(|n| resolver.store().read_slot(n)).collect();

        prop_assert_eq!(&once, &twice);
        prop_assert!(once.iter().all(|v| v.as_deref() == Some(encode_for_store(&id).as_str())));
    }
}
