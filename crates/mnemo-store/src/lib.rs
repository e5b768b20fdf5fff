//! # mnemo-store
//!
//! Associative memory store: persist short free-text notes ("memories")
//! with optional tags, an importance weight, and an optional expiry, then
//! retrieve the top-k most relevant to a free-text query.
//!
//! - **Ranking**: lexical token overlap (Jaccard) + recency decay from
//!   last access + importance, with fixed calibrated weights.
//! - **Persistence**: one JSON document per store, atomically replaced on
//!   every mutation, or batched behind an explicit [`MemoryStore::save`].
//! - **Value semantics**: read operations return owned copies, never live
//!   references into the store.
//!
//! There is no semantic/embedding similarity here and no background
//! expiry timer; expiration is cooperative via
//! [`MemoryStore::prune_expired`].

mod persist;
pub mod record;
pub mod score;
pub mod store;
pub mod tokenize;

pub use record::Memory;
pub use score::{HALF_LIFE_SECS, IMPORTANCE_WEIGHT, OVERLAP_WEIGHT, RECENCY_WEIGHT, score};
pub use store::{MemoryPatch, MemoryStore, RecallOptions, RememberOptions, StoreStats};
pub use tokenize::tokenize;
