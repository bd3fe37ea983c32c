//! Detection events
//!
//! An event binds one request parameter to the signatures that matched its
//! normalized candidate. The value kept here is the original, un-normalized
//! value so reports stay readable; matching happened against the candidate.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::sync::{Arc, OnceLock};

use crate::error::SignatureError;
use crate::signature::Signature;

/// One parameter that matched at least one signature
#[derive(Debug, Clone)]
pub struct Event {
    name: String,
    value: String,
    signatures: Vec<Arc<Signature>>,
    impact: OnceLock<u32>,
}

impl Event {
    /// Create an event; the matched-signature set must be non-empty
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        signatures: Vec<Arc<Signature>>,
    ) -> Result<Self, SignatureError> {
        let name = name.into();
        if signatures.is_empty() {
            return Err(SignatureError::NoMatchedSignatures { name });
        }

        Ok(Self {
            name,
            value: value.into(),
            signatures,
            impact: OnceLock::new(),
        })
    }

    /// Parameter name, usually `scope.key`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Original parameter value
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Sum of the matched signatures' impacts, computed once.
    /// Saturates at `u32::MAX`.
    pub fn impact(&self) -> u32 {
        *self.impact.get_or_init(|| {
            self.signatures
                .iter()
                .map(|s| s.impact())
                .fold(0, u32::saturating_add)
        })
    }

    /// De-duplicated union of matched signatures' tags, first-seen order
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for tag in self.signatures.iter().flat_map(|s| s.tags()) {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
        tags
    }

    /// Matched signatures in evaluation order
    pub fn signatures(&self) -> &[Arc<Signature>] {
        &self.signatures
    }

    /// Number of matched signatures
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    /// Always false; kept for parity with `len`
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Signature>> {
        self.signatures.iter()
    }
}

impl<'a> IntoIterator for &'a Event {
    type Item = &'a Arc<Signature>;
    type IntoIter = std::slice::Iter<'a, Arc<Signature>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let ids: Vec<u32> = self.signatures.iter().map(|s| s.id()).collect();

        let mut state = serializer.serialize_struct("Event", 5)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("value", &self.value)?;
        state.serialize_field("impact", &self.impact())?;
        state.serialize_field("tags", &self.tags())?;
        state.serialize_field("signatures", &ids)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::SignatureBuilder;

    fn sig(id: u32, impact: u32, tags: &[&str]) -> Arc<Signature> {
        Arc::new(
            SignatureBuilder::new(id)
                .pattern("x")
                .impact(impact)
                .tags(tags)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_impact_is_sum_of_signatures() {
        let event = Event::new(
            "GET.test",
            "\"><script>",
            vec![sig(1, 6, &["xss"]), sig(2, 4, &["xss", "csrf"]), sig(3, 0, &[])],
        )
        .unwrap();

        assert_eq!(event.impact(), 10);
        // cached value is stable
        assert_eq!(event.impact(), 10);
        assert_eq!(event.len(), 3);
    }

    #[test]
    fn test_impact_saturates_on_large_weights() {
        let heavy = u32::MAX / 2 + 1;
        let event = Event::new("GET.q", "xy", vec![sig(1, heavy, &[]), sig(2, heavy, &[])]).unwrap();

        assert_eq!(event.impact(), u32::MAX);
    }

    #[test]
    fn test_tags_are_deduplicated_in_first_seen_order() {
        let event = Event::new(
            "POST.comment",
            "payload",
            vec![
                sig(1, 1, &["xss", "csrf"]),
                sig(2, 1, &["sqli", "xss"]),
                sig(3, 1, &["id", "csrf"]),
            ],
        )
        .unwrap();

        let expected = vec!["xss", "csrf", "sqli", "id"];
        assert_eq!(event.tags(), expected);
        assert_eq!(event.tags(), expected);
    }

    #[test]
    fn test_empty_signature_set_is_rejected() {
        let err = Event::new("GET.q", "harmless", vec![]).unwrap_err();
        assert!(matches!(err, SignatureError::NoMatchedSignatures { ref name } if name == "GET.q"));
    }

    #[test]
    fn test_event_keeps_original_value() {
        let event = Event::new("COOKIE.sid", "%3Cscript%3E", vec![sig(1, 2, &["xss"])]).unwrap();
        assert_eq!(event.name(), "COOKIE.sid");
        assert_eq!(event.value(), "%3Cscript%3E");
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::new("GET.id", "1 or 1=1", vec![sig(7, 5, &["sqli"])]).unwrap();
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["name"], "GET.id");
        assert_eq!(json["impact"], 5);
        assert_eq!(json["tags"][0], "sqli");
        assert_eq!(json["signatures"][0], 7);
    }
}
