use std::collections::HashSet;

use crate::record::Memory;

/// Weight of lexical overlap between query and record tokens.
pub const OVERLAP_WEIGHT: f64 = 0.55;
/// Weight of recency decay since last access.
pub const RECENCY_WEIGHT: f64 = 0.25;
/// Weight of the caller-supplied importance.
pub const IMPORTANCE_WEIGHT: f64 = 0.20;

/// Recency contribution halves every ten days.
pub const HALF_LIFE_SECS: f64 = 10.0 * 24.0 * 3600.0;

/// Relevance of `memory` for a query at time `now`.
///
/// Combines Jaccard token overlap, exponential recency decay, and the
/// record's importance. Recency is measured from `last_access`, not
/// `created_at`: a record that keeps getting recalled stays buoyant even
/// if it was written long ago.
pub fn score(query_tokens: &[String], memory: &Memory, now: f64) -> f64 {
    let overlap = jaccard(query_tokens, &memory.tokens);
    let age_secs = (now - memory.last_access).max(1.0);
    let recency = 0.5_f64.powf(age_secs / HALF_LIFE_SECS);
    OVERLAP_WEIGHT * overlap + RECENCY_WEIGHT * recency + IMPORTANCE_WEIGHT * memory.importance
}

/// Jaccard similarity over two term sets. A record with no tokens scores 0.
fn jaccard(query_tokens: &[String], record_tokens: &[String]) -> f64 {
    if record_tokens.is_empty() {
        return 0.0;
    }
    let q: HashSet<&str> = query_tokens.iter().map(String::as_str).collect();
    let t: HashSet<&str> = record_tokens.iter().map(String::as_str).collect();
    let inter = q.intersection(&t).count();
    let union = q.union(&t).count();
    inter as f64 / union.max(1) as f64
}
