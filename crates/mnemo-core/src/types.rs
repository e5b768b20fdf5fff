use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Unique identifier for a stored memory.
pub type MemoryId = String;

/// Mint a fresh memory id.
pub fn new_memory_id() -> MemoryId {
    Uuid::new_v4().to_string()
}

/// Current wall-clock time as fractional seconds since the Unix epoch.
///
/// Timestamps are plain epoch seconds because that is what the on-disk
/// document format carries.
pub fn now_epoch_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_ids_are_unique() {
        let a = new_memory_id();
        let b = new_memory_id();
        assert_ne!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_now_is_recent() {
        // 2020-01-01 in epoch seconds; any sane clock is past this
        assert!(now_epoch_secs() > 1_577_836_800.0);
    }
}
