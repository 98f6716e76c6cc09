//! Patient identifier normalizer.
//!
//! Handles:
//! - Unwrapping JSON-quoted values found in storage slots
//! - Canonical UUID shape validation (v1-v5, RFC 4122 variant)
//! - Encoding identifiers the way historical slot readers expect

use uuid::{Uuid, Variant};

use crate::models::PatientId;

/// Byte offsets of the hyphens in the 8-4-4-4-12 grouping.
const HYPHEN_OFFSETS: [usize; 4] = [8, 13, 18, 23];

/// Length of a hyphenated UUID.
const HYPHENATED_LEN: usize = 36;

/// Normalizer for identifiers read from storage or the route.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    /// Reject stored values that are not canonical UUIDs.
    require_uuid_in_storage: bool,
}

impl Normalizer {
    /// Create a normalizer that accepts loosely formed stored ids.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a normalizer that only accepts canonical UUIDs from storage.
    pub fn strict() -> Self {
        Self {
            require_uuid_in_storage: true,
        }
    }

    pub fn requires_uuid_in_storage(&self) -> bool {
        self.require_uuid_in_storage
    }

    /// Candidate id from a raw slot value, applying storage strictness.
    pub fn candidate_from_store(&self, raw: Option<&str>) -> Option<PatientId> {
        let id = parse_stored(raw)?;
        if self.require_uuid_in_storage && !id.is_uuid() {
            tracing::debug!(value = id.as_str(), "Ignoring non-UUID stored patient id");
            return None;
        }
        Some(id)
    }

    /// Candidate id from a route query value.
    ///
    /// Deep links are accepted loosely: any non-absent value is authoritative.
    pub fn candidate_from_query(&self, raw: Option<&str>) -> Option<PatientId> {
        raw.and_then(PatientId::new)
    }
}

/// Parse a raw slot value.
///
/// Quoted values are JSON-decoded; anything that fails to decode is kept
/// literally. Empty values and absent markers yield `None`.
pub fn parse_stored(raw: Option<&str>) -> Option<PatientId> {
    let raw = raw?;
    if raw.starts_with('"') {
        if let Ok(unwrapped) = serde_json::from_str::<String>(raw) {
            return PatientId::new(unwrapped);
        }
    }
    PatientId::new(raw)
}

/// Check a string against the canonical hyphenated UUID shape.
///
/// Version nibble must be 1-5 and variant nibble one of 8, 9, a, b.
/// Case-insensitive.
pub fn is_valid_uuid(s: &str) -> bool {
    if s.len() != HYPHENATED_LEN {
        return false;
    }

    // Uuid::parse_str also takes simple, braced and urn forms
    let hyphens_in_place = s
        .bytes()
        .enumerate()
        .all(|(i, b)| HYPHEN_OFFSETS.contains(&i) == (b == b'-'));
    if !hyphens_in_place {
        return false;
    }

    match Uuid::parse_str(s) {
        Ok(uuid) => {
            (1..=5).contains(&uuid.get_version_num()) && uuid.get_variant() == Variant::RFC4122
        }
        Err(_) => false,
    }
}

/// Encode an identifier for storage (JSON string, i.e. quoted).
pub fn encode_for_store(id: &PatientId) -> String {
    serde_json::Value::String(id.as_str().to_owned()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "123e4567-e89b-12d3-a456-426614174000";

    #[test]
    fn test_parse_stored_absent() {
        assert_eq!(parse_stored(None), None);
        assert_eq!(parse_stored(Some("")), None);
        assert_eq!(parse_stored(Some("null")), None);
        assert_eq!(parse_stored(Some("undefined")), None);
        assert_eq!(parse_stored(Some("\"\"")), None);
        assert_eq!(parse_stored(Some("\"null\"")), None);
    }

    #[test]
    fn test_parse_stored_unwraps_quotes() {
        let id = parse_stored(Some("\"abc\"")).unwrap();
        assert_eq!(id.as_str(), "abc");

        let id = parse_stored(Some(&format!("\"{}\"", SAMPLE))).unwrap();
        assert_eq!(id.as_str(), SAMPLE);
    }

    #[test]
    fn test_parse_stored_raw_string() {
        let id = parse_stored(Some("abc")).unwrap();
        assert_eq!(id.as_str(), "abc");
    }

    #[test]
    fn test_parse_stored_malformed_json_is_literal() {
        let id = parse_stored(Some("{not-json")).unwrap();
        assert_eq!(id.as_str(), "{not-json");

        let id = parse_stored(Some("\"unterminated")).unwrap();
        assert_eq!(id.as_str(), "\"unterminated");
    }

    #[test]
    fn test_is_valid_uuid() {
        assert!(is_valid_uuid(SAMPLE));
        assert!(is_valid_uuid(&SAMPLE.to_uppercase()));
        assert!(is_valid_uuid(&Uuid::new_v4().to_string()));

        // Version 0 and 6+ rejected
        assert!(!is_valid_uuid("123e4567-e89b-02d3-a456-426614174000"));
        assert!(!is_valid_uuid("123e4567-e89b-72d3-a456-426614174000"));
        // Variant nibble outside 8..b
        assert!(!is_valid_uuid("123e4567-e89b-12d3-c456-426614174000"));
        assert!(!is_valid_uuid("123e4567-e89b-12d3-7456-426614174000"));
        // Wrong shape
        assert!(!is_valid_uuid("123e4567e89b12d3a456426614174000"));
        assert!(!is_valid_uuid(&format!("{{{}}}", SAMPLE)));
        assert!(!is_valid_uuid("123e4567-e89b-12d3-a456-42661417400g"));
        assert!(!is_valid_uuid("123e4567-e89b-12d3-a456426614174000-"));
        assert!(!is_valid_uuid(""));
        assert!(!is_valid_uuid("abc"));
    }

    #[test]
    fn test_encode_for_store() {
        let id = PatientId::new("abc").unwrap();
        assert_eq!(encode_for_store(&id), "\"abc\"");

        let id = PatientId::new("a\"b").unwrap();
        assert_eq!(encode_for_store(&id), "\"a\\\"b\"");
        assert_eq!(parse_stored(Some(&encode_for_store(&id))), Some(id));
    }

    #[test]
    fn test_strict_storage() {
        let strict = Normalizer::strict();
        assert!(strict.candidate_from_store(Some("\"abc\"")).is_none());
        assert!(strict
            .candidate_from_store(Some(&format!("\"{}\"", SAMPLE)))
            .is_some());

        let loose = Normalizer::new();
        assert!(loose.candidate_from_store(Some("\"abc\"")).is_some());
    }

    #[test]
    fn test_query_candidates_are_loose() {
        let strict = Normalizer::strict();
        assert_eq!(
            strict.candidate_from_query(Some("legacy-42")).unwrap().as_str(),
            "legacy-42"
        );
        assert!(strict.candidate_from_query(Some("")).is_none());
        assert!(strict.candidate_from_query(Some("undefined")).is_none());
        assert!(strict.candidate_from_query(None).is_none());
    }
}
