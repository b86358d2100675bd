use super::domain::{DatasetKind, NormalizedTable};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime};

/// Identity of one source batch as seen at discovery time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchStamp {
    pub id: String,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

/// The ordered set of batch stamps for a dataset kind. Any change to the set
/// (a file added, removed, resized or touched) invalidates cached tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFingerprint(Vec<BatchStamp>);

impl SourceFingerprint {
    pub fn new(mut stamps: Vec<BatchStamp>) -> Self {
        stamps.sort_by(|a, b| a.id.cmp(&b.id));
        Self(stamps)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn stamps(&self) -> &[BatchStamp] {
        &self.0
    }
}

#[derive(Debug)]
struct CacheEntry {
    fingerprint: SourceFingerprint,
    loaded_at: Instant,
    table: Arc<NormalizedTable>,
}

/// Loaded tables keyed by dataset kind, valid while the fingerprint matches and
/// the entry is younger than the TTL.
#[derive(Debug)]
pub struct DatasetCache {
    ttl: Duration,
    entries: Mutex<HashMap<DatasetKind, CacheEntry>>,
}

impl DatasetCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(
        &self,
        kind: DatasetKind,
        fingerprint: &SourceFingerprint,
    ) -> Option<Arc<NormalizedTable>> {
        self.get_at(kind, fingerprint, Instant::now())
    }

    pub(crate) fn get_at(
        &self,
        kind: DatasetKind,
        fingerprint: &SourceFingerprint,
        now: Instant,
    ) -> Option<Arc<NormalizedTable>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let fresh = entries.get(&kind).is_some_and(|entry| {
            entry.fingerprint == *fingerprint
                && now.saturating_duration_since(entry.loaded_at) < self.ttl
        });

        if fresh {
            entries.get(&kind).map(|entry| Arc::clone(&entry.table))
        } else {
            entries.remove(&kind);
            None
        }
    }

    pub fn insert(
        &self,
        kind: DatasetKind,
        fingerprint: SourceFingerprint,
        table: Arc<NormalizedTable>,
    ) {
        self.insert_at(kind, fingerprint, table, Instant::now());
    }

    pub(crate) fn insert_at(
        &self,
        kind: DatasetKind,
        fingerprint: SourceFingerprint,
        table: Arc<NormalizedTable>,
        loaded_at: Instant,
    ) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            kind,
            CacheEntry {
                fingerprint,
                loaded_at,
                table,
            },
        );
    }

    pub fn invalidate(&self, kind: DatasetKind) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(&kind);
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fingerprint(id: &str, len: u64) -> SourceFingerprint {
        SourceFingerprint::new(vec![BatchStamp {
            id: id.to_string(),
            len,
            modified: None,
        }])
    }

    fn table() -> Arc<NormalizedTable> {
        Arc::new(NormalizedTable::new(DatasetKind::Enrolment, Vec::new()))
    }

    #[test]
    fn hit_requires_matching_fingerprint() {
        let cache = DatasetCache::new(Duration::from_secs(60));
        cache.insert(DatasetKind::Enrolment, fingerprint("a.csv", 10), table());

        assert!(cache
            .get(DatasetKind::Enrolment, &fingerprint("a.csv", 10))
            .is_some());
        assert!(cache
            .get(DatasetKind::DemographicUpdate, &fingerprint("a.csv", 10))
            .is_none());
        assert!(cache
            .get(DatasetKind::Enrolment, &fingerprint("a.csv", 11))
            .is_none());
        // The stale entry was evicted by the mismatch above.
        assert!(cache
            .get(DatasetKind::Enrolment, &fingerprint("a.csv", 10))
            .is_none());
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = DatasetCache::new(Duration::from_secs(60));
        let loaded_at = Instant::now();
        let fp = fingerprint("a.csv", 10);
        cache.insert_at(DatasetKind::Enrolment, fp.clone(), table(), loaded_at);

        assert!(cache
            .get_at(DatasetKind::Enrolment, &fp, loaded_at + Duration::from_secs(59))
            .is_some());
        assert!(cache
            .get_at(DatasetKind::Enrolment, &fp, loaded_at + Duration::from_secs(60))
            .is_none());
    }

    #[test]
    fn invalidate_and_clear_drop_entries() {
        let cache = DatasetCache::new(Duration::from_secs(60));
        let fp = fingerprint("a.csv", 10);
        cache.insert(DatasetKind::Enrolment, fp.clone(), table());
        cache.insert(DatasetKind::BiometricUpdate, fp.clone(), table());

        cache.invalidate(DatasetKind::Enrolment);
        assert!(cache.get(DatasetKind::Enrolment, &fp).is_none());
        assert!(cache.get(DatasetKind::BiometricUpdate, &fp).is_some());

        cache.clear();
        assert!(cache.get(DatasetKind::BiometricUpdate, &fp).is_none());
    }

    #[test]
    fn fingerprint_order_is_canonical() {
        let stamp = |id: &str| BatchStamp {
            id: id.to_string(),
            len: 1,
            modified: None,
        };
        assert_eq!(
            SourceFingerprint::new(vec![stamp("b"), stamp("a")]),
            SourceFingerprint::new(vec![stamp("a"), stamp("b")])
        );
    }
}
