//! Per-session holding area for imports awaiting a duplicate decision
//!
//! One entry per (user, login session). Entries are single-use and expire
//! after a fixed TTL; nothing here is persisted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::types::import::{ConflictEntry, NewRowEntry};

/// Identity of a login session: the user plus the token's session id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

/// Validated upload with at least one conflict, waiting for resolution
#[derive(Debug, Clone)]
pub struct StagedImport {
    pub total_rows: usize,
    pub new_rows: Vec<NewRowEntry>,
    pub conflicts: Vec<ConflictEntry>,
    pub imported_by: Uuid,
}

struct Entry {
    staged_at: Instant,
    import: StagedImport,
}

/// Expiring association `SessionKey -> StagedImport`
#[derive(Clone)]
pub struct ImportStaging {
    entries: Arc<Mutex<HashMap<SessionKey, Entry>>>,
    ttl: Duration,
}

impl ImportStaging {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Store an import for the session, replacing any earlier one
    pub fn stage(&self, key: SessionKey, import: StagedImport) {
        let replaced = self.entries.lock().insert(
            key,
            Entry {
                staged_at: Instant::now(),
                import,
            },
        );
        if replaced.is_some() {
            tracing::debug!("Replaced staged import for user {}", key.user_id);
        }
    }

    /// Remove and return the session's import if it has not expired
    pub fn take(&self, key: &SessionKey) -> Option<StagedImport> {
        let entry = self.entries.lock().remove(key)?;
        if entry.staged_at.elapsed() >= self.ttl {
            tracing::debug!("Staged import for user {} expired", key.user_id);
            return None;
        }
        Some(entry.import)
    }

    /// Drop the session's import. Returns whether one was present.
    pub fn discard(&self, key: &SessionKey) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Drop all expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.staged_at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SessionKey {
        SessionKey {
            user_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
        }
    }

    fn staged(total_rows: usize) -> StagedImport {
        StagedImport {
            total_rows,
            new_rows: vec![],
            conflicts: vec![],
            imported_by: Uuid::nil(),
        }
    }

    #[test]
    fn test_take_is_single_use() {
        let staging = ImportStaging::new(Duration::from_secs(60));
        let k = key();
        staging.stage(k, staged(2));

        assert_eq!(staging.take(&k).map(|s| s.total_rows), Some(2));
        assert!(staging.take(&k).is_none());
    }

    #[test]
    fn test_second_stage_overwrites_first() {
        let staging = ImportStaging::new(Duration::from_secs(60));
        let k = key();
        staging.stage(k, staged(2));
        staging.stage(k, staged(7));

        assert_eq!(staging.len(), 1);
        assert_eq!(staging.take(&k).map(|s| s.total_rows), Some(7));
    }

    #[test]
    fn test_sessions_are_isolated() {
        let staging = ImportStaging::new(Duration::from_secs(60));
        let a = key();
        let b = SessionKey {
            user_id: a.user_id,
            session_id: Uuid::new_v4(),
        };
        staging.stage(a, staged(1));

        assert!(staging.take(&b).is_none());
        assert!(staging.take(&a).is_some());
    }

    #[test]
    fn test_expired_entry_is_not_returned() {
        let staging = ImportStaging::new(Duration::ZERO);
        let k = key();
        staging.stage(k, staged(1));

        assert!(staging.take(&k).is_none());
        assert_eq!(staging.len(), 0);
    }

    #[test]
    fn test_purge_expired_drops_stale_entries() {
        let staging = ImportStaging::new(Duration::ZERO);
        staging.stage(key(), staged(1));
        staging.stage(key(), staged(2));

        assert_eq!(staging.purge_expired(), 2);
        assert_eq!(staging.len(), 0);
    }

    #[test]
    fn test_discard() {
        let staging = ImportStaging::new(Duration::from_secs(60));
        let k = key();
        staging.stage(k, staged(1));

        assert!(staging.discard(&k));
        assert!(!staging.discard(&k));
    }
}
