use std::collections::BTreeSet;

use mnemo_core::{MemoryId, new_memory_id, now_epoch_secs};
use serde::{Deserialize, Serialize};

use crate::tokenize::tokenize;

/// A single remembered statement.
///
/// This struct is also the on-disk record shape: the persisted document is
/// a JSON object mapping id to records with exactly these fields. `tags`
/// is a [`BTreeSet`] so it serializes as a sorted array, and timestamps
/// are fractional epoch seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: MemoryId,
    pub text: String,
    /// Normalized terms derived from `text`. Recomputed on every text
    /// change, never supplied by the caller.
    pub tokens: Vec<String>,
    pub tags: BTreeSet<String>,
    /// Intrinsic priority in [0, 1].
    pub importance: f64,
    pub created_at: f64,
    /// Refreshed whenever a touching recall returns this record.
    pub last_access: f64,
    /// Expired once `now - created_at` exceeds this. Measured from
    /// creation, never reset by access.
    pub ttl_seconds: Option<u64>,
    /// Opaque caller-defined attributes, passed through unmodified.
    #[serde(default)]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl Memory {
    /// Build a new record stamped with the current time.
    pub fn new(
        text: &str,
        tags: &[String],
        importance: f64,
        ttl_seconds: Option<u64>,
        meta: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        let text = text.trim().to_string();
        let now = now_epoch_secs();
        Self {
            id: new_memory_id(),
            tokens: tokenize(&text),
            text,
            tags: normalize_tags(tags),
            importance: clamp_importance(importance),
            created_at: now,
            last_access: now,
            ttl_seconds,
            meta,
        }
    }

    /// Replace the text and recompute the derived tokens.
    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.tokens = tokenize(&self.text);
    }

    /// Whether this record's TTL has elapsed at `now`.
    pub fn is_expired(&self, now: f64) -> bool {
        match self.ttl_seconds {
            Some(ttl) => now - self.created_at > ttl as f64,
            None => false,
        }
    }
}

/// Lowercase and de-duplicate a tag list.
pub(crate) fn normalize_tags(tags: &[String]) -> BTreeSet<String> {
    tags.iter().map(|t| t.to_lowercase()).collect()
}

/// Clamp an importance weight into [0, 1]. Out-of-range input is folded
/// in silently rather than rejected.
pub(crate) fn clamp_importance(importance: f64) -> f64 {
    importance.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_derives_tokens_and_stamps() {
        let m = Memory::new("  The sky is blue  ", &[], 0.5, None, Default::default());
        assert_eq!(m.text, "The sky is blue");
        assert_eq!(m.tokens, vec!["the", "sky", "is", "blue"]);
        assert_eq!(m.created_at, m.last_access);
        assert!(!m.id.is_empty());
    }

    #[test]
    fn test_tags_lowercased_and_sorted() {
        let m = Memory::new(
            "x",
            &["Zeta".into(), "alpha".into(), "ALPHA".into()],
            0.5,
            None,
            Default::default(),
        );
        let tags: Vec<&str> = m.tags.iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_importance_clamped() {
        assert_eq!(Memory::new("x", &[], 1.5, None, Default::default()).importance, 1.0);
        assert_eq!(Memory::new("x", &[], -1.0, None, Default::default()).importance, 0.0);
        assert_eq!(Memory::new("x", &[], 0.3, None, Default::default()).importance, 0.3);
    }

    #[test]
    fn test_expiry_measured_from_creation() {
        let mut m = Memory::new("x", &[], 0.5, Some(10), Default::default());
        let now = m.created_at;
        assert!(!m.is_expired(now + 5.0));
        assert!(!m.is_expired(now + 10.0)); // boundary is strictly greater-than
        assert!(m.is_expired(now + 10.5));

        // last_access plays no part in expiry
        m.last_access = now + 100.0;
        assert!(m.is_expired(now + 10.5));

        m.ttl_seconds = None;
        assert!(!m.is_expired(now + 1e9));
    }

    #[test]
    fn test_set_text_recomputes_tokens() {
        let mut m = Memory::new("old words", &[], 0.5, None, Default::default());
        m.set_text("entirely new phrase");
        assert_eq!(m.tokens, vec!["entirely", "new", "phrase"]);
    }

    #[test]
    fn test_record_serde_roundtrip() {
        let mut meta = serde_json::Map::new();
        meta.insert("source".to_string(), serde_json::json!("chat"));
        let m = Memory::new("round trip", &["a".into()], 0.7, Some(60), meta);
        let json = serde_json::to_string(&m).unwrap();
        let restored: Memory = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, m);
    }
}
