use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use mnemo_core::{MemoryId, Result, now_epoch_secs};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use crate::persist;
use crate::record::{Memory, clamp_importance, normalize_tags};
use crate::score::score;
use crate::tokenize::tokenize;

/// Optional attributes for [`MemoryStore::remember_with`].
#[derive(Debug, Clone)]
pub struct RememberOptions {
    pub tags: Vec<String>,
    pub importance: f64,
    pub ttl_seconds: Option<u64>,
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl Default for RememberOptions {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            importance: 0.5,
            ttl_seconds: None,
            meta: serde_json::Map::new(),
        }
    }
}

/// Field-level changes for [`MemoryStore::update`]. `None` leaves a field
/// untouched; `ttl_seconds: Some(None)` clears the TTL.
#[derive(Debug, Clone, Default)]
pub struct MemoryPatch {
    pub text: Option<String>,
    pub tags: Option<Vec<String>>,
    pub importance: Option<f64>,
    pub ttl_seconds: Option<Option<u64>>,
    pub meta: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Knobs for [`MemoryStore::recall`].
#[derive(Debug, Clone)]
pub struct RecallOptions {
    /// Maximum number of records returned.
    pub k: usize,
    /// Keep only records sharing at least one of these tags.
    pub any_tag: Vec<String>,
    /// Keep only records carrying every one of these tags.
    pub must_tags: Vec<String>,
    pub include_expired: bool,
    /// Refresh `last_access` on every returned record. On by default, and
    /// note the consequence: a read can cause a persisted write.
    pub touch: bool,
}

impl Default for RecallOptions {
    fn default() -> Self {
        Self {
            k: 5,
            any_tag: Vec::new(),
            must_tags: Vec::new(),
            include_expired: false,
            touch: true,
        }
    }
}

/// Read-only snapshot of store occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total: usize,
    pub expired: usize,
    pub active: usize,
}

struct Inner {
    records: HashMap<MemoryId, Memory>,
    autosave: bool,
}

/// File-backed associative memory store.
///
/// All operations are internally synchronized: mutations (including a
/// touching [`recall`](Self::recall)) serialize behind a write lock that
/// also covers the document rewrite, and plain reads share a read lock.
/// Every read operation returns owned copies, so callers can never
/// corrupt store state by mutating a returned record; changes go through
/// [`update`](Self::update).
///
/// Persistence rewrites the whole document per mutation, which is fine at
/// the intended scale (hundreds to low thousands of records).
pub struct MemoryStore {
    path: PathBuf,
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Open or create a store whose document lives at `path`, persisting
    /// after every mutation.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with(path, true)
    }

    /// Open or create a store, choosing the autosave mode. With
    /// `autosave` off, nothing is written until [`save`](Self::save).
    pub fn open_with(path: impl Into<PathBuf>, autosave: bool) -> Result<Self> {
        let path = path.into();
        info!(?path, autosave, "opening memory store");
        let records = match persist::read_document(&path)? {
            Some(records) => {
                info!(count = records.len(), "loaded memories");
                records
            }
            None => {
                // First open: put an empty document on disk right away so
                // external readers always find a well-formed file.
                let empty = HashMap::new();
                persist::write_document(&path, &empty)?;
                empty
            }
        };
        Ok(Self {
            path,
            inner: RwLock::new(Inner { records, autosave }),
        })
    }

    // ── Creation and mutation ──────────────────────────────────

    /// Store a new memory with default attributes and return its id.
    pub fn remember(&self, text: &str) -> Result<MemoryId> {
        self.remember_with(text, RememberOptions::default())
    }

    /// Store a new memory and return its id. Tags are lowercased and
    /// de-duplicated, importance is clamped to [0, 1].
    pub fn remember_with(&self, text: &str, opts: RememberOptions) -> Result<MemoryId> {
        let memory = Memory::new(text, &opts.tags, opts.importance, opts.ttl_seconds, opts.meta);
        let id = memory.id.clone();
        let mut inner = self.inner.write();
        inner.records.insert(id.clone(), memory);
        debug!(%id, "remembered");
        if inner.autosave {
            persist::write_document(&self.path, &inner.records)?;
        }
        Ok(id)
    }

    /// Apply field-level changes to a record. A `text` change recomputes
    /// the derived tokens; a `tags` change re-normalizes them. Returns
    /// `Ok(false)` when the id is unknown.
    pub fn update(&self, id: &str, patch: MemoryPatch) -> Result<bool> {
        let mut inner = self.inner.write();
        let Some(memory) = inner.records.get_mut(id) else {
            return Ok(false);
        };
        if let Some(text) = patch.text {
            memory.set_text(&text);
        }
        if let Some(tags) = patch.tags {
            memory.tags = normalize_tags(&tags);
        }
        if let Some(importance) = patch.importance {
            memory.importance = clamp_importance(importance);
        }
        if let Some(ttl) = patch.ttl_seconds {
            memory.ttl_seconds = ttl;
        }
        if let Some(meta) = patch.meta {
            memory.meta = meta;
        }
        if inner.autosave {
            persist::write_document(&self.path, &inner.records)?;
        }
        Ok(true)
    }

    /// Remove a record. Returns `Ok(false)` when the id is unknown.
    pub fn forget(&self, id: &str) -> Result<bool> {
        let mut inner = self.inner.write();
        if inner.records.remove(id).is_none() {
            return Ok(false);
        }
        debug!(%id, "forgot");
        if inner.autosave {
            persist::write_document(&self.path, &inner.records)?;
        }
        Ok(true)
    }

    /// Remove every record matching all supplied predicates: tag
    /// membership and case-insensitive substring of the text are ANDed
    /// when both are given. With neither predicate every record matches.
    /// Returns the number removed.
    pub fn forget_where(&self, tag: Option<&str>, contains: Option<&str>) -> Result<usize> {
        let tag = tag.map(str::to_lowercase);
        let needle = contains.map(str::to_lowercase);
        let mut inner = self.inner.write();
        let doomed: Vec<MemoryId> = inner
            .records
            .values()
            .filter(|m| {
                if let Some(ref t) = tag {
                    if !m.tags.contains(t) {
                        return false;
                    }
                }
                if let Some(ref n) = needle {
                    if !m.text.to_lowercase().contains(n) {
                        return false;
                    }
                }
                true
            })
            .map(|m| m.id.clone())
            .collect();
        for id in &doomed {
            inner.records.remove(id);
        }
        if !doomed.is_empty() && inner.autosave {
            persist::write_document(&self.path, &inner.records)?;
        }
        Ok(doomed.len())
    }

    // ── Recall ─────────────────────────────────────────────────

    /// Return the top-k records most relevant to `query`, best first.
    ///
    /// Candidates are filtered (expiry unless `include_expired`, then the
    /// tag filters), scored, sorted descending, and truncated to `k`.
    /// Equal scores fall back to a deterministic order: older
    /// `created_at` first, then id. When `touch` is on, the returned
    /// records get a fresh `last_access` and that change is persisted
    /// under autosave.
    pub fn recall(&self, query: &str, opts: &RecallOptions) -> Result<Vec<Memory>> {
        let now = now_epoch_secs();
        let query_tokens = tokenize(query);
        let any_tag: Vec<String> = opts.any_tag.iter().map(|t| t.to_lowercase()).collect();
        let must_tags: Vec<String> = opts.must_tags.iter().map(|t| t.to_lowercase()).collect();

        if !opts.touch {
            let inner = self.inner.read();
            let ids = ranked_ids(
                &inner.records,
                &query_tokens,
                &any_tag,
                &must_tags,
                opts.include_expired,
                opts.k,
                now,
            );
            return Ok(ids.iter().filter_map(|id| inner.records.get(id).cloned()).collect());
        }

        let mut inner = self.inner.write();
        let ids = ranked_ids(
            &inner.records,
            &query_tokens,
            &any_tag,
            &must_tags,
            opts.include_expired,
            opts.k,
            now,
        );
        let ts = now_epoch_secs();
        let mut changed = false;
        for id in &ids {
            if let Some(m) = inner.records.get_mut(id) {
                if m.last_access != ts {
                    m.last_access = ts;
                    changed = true;
                }
            }
        }
        // Clone after touching so the copies carry the refreshed stamp.
        let out: Vec<Memory> = ids.iter().filter_map(|id| inner.records.get(id).cloned()).collect();
        if changed && inner.autosave {
            persist::write_document(&self.path, &inner.records)?;
        }
        Ok(out)
    }

    // ── Expiration and maintenance ─────────────────────────────

    /// Remove every record whose TTL has elapsed and return the count.
    /// Expiration is purely cooperative: until this runs, expired records
    /// stay present and operable, they are merely omitted from default
    /// recalls.
    pub fn prune_expired(&self) -> Result<usize> {
        let now = now_epoch_secs();
        let mut inner = self.inner.write();
        let doomed: Vec<MemoryId> = inner
            .records
            .values()
            .filter(|m| m.is_expired(now))
            .map(|m| m.id.clone())
            .collect();
        for id in &doomed {
            inner.records.remove(id);
        }
        if !doomed.is_empty() {
            debug!(count = doomed.len(), "pruned expired memories");
            if inner.autosave {
                persist::write_document(&self.path, &inner.records)?;
            }
        }
        Ok(doomed.len())
    }

    /// Occupancy snapshot. Computed on demand; mutates nothing.
    pub fn stats(&self) -> StoreStats {
        let now = now_epoch_secs();
        let inner = self.inner.read();
        let total = inner.records.len();
        let expired = inner.records.values().filter(|m| m.is_expired(now)).count();
        StoreStats {
            total,
            expired,
            active: total - expired,
        }
    }

    // ── Persistence control ────────────────────────────────────

    /// Write the current state to disk. The one way to persist when
    /// autosave is off; harmless (one extra rewrite) when it is on.
    pub fn save(&self) -> Result<()> {
        // Write lock: document rewrites are serialized with mutations.
        let inner = self.inner.write();
        persist::write_document(&self.path, &inner.records)
    }

    /// Location of the on-disk document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn autosave(&self) -> bool {
        self.inner.read().autosave
    }

    /// Toggle autosave. Turning it off groups subsequent mutations into
    /// one explicit [`save`](Self::save); turning it back on does not
    /// itself write.
    pub fn set_autosave(&self, autosave: bool) {
        self.inner.write().autosave = autosave;
    }

    // ── Read accessors ─────────────────────────────────────────

    /// Copy of a single record, if present.
    pub fn get(&self, id: &str) -> Option<Memory> {
        self.inner.read().records.get(id).cloned()
    }

    /// The `n` most recently created records, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Memory> {
        let inner = self.inner.read();
        let mut all: Vec<&Memory> = inner.records.values().collect();
        all.sort_by(|a, b| {
            a.created_at
                .partial_cmp(&b.created_at)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        let start = all.len().saturating_sub(n);
        all[start..].iter().map(|m| (*m).clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// Drop every record and return how many there were.
    pub fn clear(&self) -> Result<usize> {
        let mut inner = self.inner.write();
        let removed = inner.records.len();
        inner.records.clear();
        if removed > 0 && inner.autosave {
            persist::write_document(&self.path, &inner.records)?;
        }
        Ok(removed)
    }
}

/// Filter, score, and rank candidate ids; best first, truncated to `k`.
fn ranked_ids(
    records: &HashMap<MemoryId, Memory>,
    query_tokens: &[String],
    any_tag: &[String],
    must_tags: &[String],
    include_expired: bool,
    k: usize,
    now: f64,
) -> Vec<MemoryId> {
    let mut candidates: Vec<(f64, &Memory)> = records
        .values()
        .filter(|m| {
            if !include_expired && m.is_expired(now) {
                return false;
            }
            if !must_tags.is_empty() && !must_tags.iter().all(|t| m.tags.contains(t)) {
                return false;
            }
            if !any_tag.is_empty() && !any_tag.iter().any(|t| m.tags.contains(t)) {
                return false;
            }
            true
        })
        .map(|m| (score(query_tokens, m, now), m))
        .collect();

    candidates.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                a.1.created_at
                    .partial_cmp(&b.1.created_at)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.1.id.cmp(&b.1.id))
    });
    candidates.truncate(k);
    candidates.into_iter().map(|(_, m)| m.id.clone()).collect()
}
