use crate::domain::snapshot::MacroSnapshot;
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Snapshot and its store time, swapped in as one unit so readers never see
/// one without the other.
#[derive(Debug)]
struct CachedSnapshot {
    snapshot: MacroSnapshot,
    stored_at: DateTime<Utc>,
}

/// Single-slot holder for the latest [`MacroSnapshot`]. Each `put` replaces
/// the previous value outright; there is no history.
#[derive(Debug, Default)]
pub struct MacroSnapshotCache {
    slot: ArcSwapOption<CachedSnapshot>,
}

impl MacroSnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, snapshot: MacroSnapshot) {
        self.put_at(snapshot, Utc::now());
    }

    pub fn put_at(&self, snapshot: MacroSnapshot, stored_at: DateTime<Utc>) {
        self.slot.store(Some(Arc::new(CachedSnapshot {
            snapshot,
            stored_at,
        })));
    }

    pub fn latest(&self) -> Option<MacroSnapshot> {
        self.slot.load_full().map(|c| c.snapshot.clone())
    }

    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        self.slot.load_full().map(|c| c.stored_at)
    }

    /// Snapshot and store time from the same `put`.
    pub fn latest_with_time(&self) -> Option<(MacroSnapshot, DateTime<Utc>)> {
        self.slot
            .load_full()
            .map(|c| (c.snapshot.clone(), c.stored_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap()
    }

    fn snapshot(ffr: f64) -> MacroSnapshot {
        MacroSnapshot {
            ffr_upper_pct: Some(ffr),
            core_pce_yoy_pct: Some(ffr / 2.0),
            ..MacroSnapshot::empty_at(t0())
        }
    }

    #[test]
    fn empty_before_first_put() {
        let cache = MacroSnapshotCache::new();
        assert_eq!(cache.latest(), None);
        assert_eq!(cache.last_updated_at(), None);
    }

    #[test]
    fn last_put_wins() {
        let cache = MacroSnapshotCache::new();
        cache.put_at(snapshot(5.5), t0());
        cache.put_at(snapshot(5.25), t0() + Duration::hours(1));

        assert_eq!(cache.latest(), Some(snapshot(5.25)));
        assert_eq!(cache.last_updated_at(), Some(t0() + Duration::hours(1)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_see_a_torn_record() {
        let cache = Arc::new(MacroSnapshotCache::new());
        cache.put_at(snapshot(0.0), t0());

        let mut writers = Vec::new();
        for w in 0..4 {
            let cache = cache.clone();
            writers.push(tokio::spawn(async move {
                for i in 0..500 {
                    let v = (w * 1000 + i) as f64;
                    cache.put_at(snapshot(v), t0() + Duration::seconds(v as i64));
                    tokio::task::yield_now().await;
                }
            }));
        }

        let reader = {
            let cache = cache.clone();
            tokio::spawn(async move {
                for _ in 0..2000 {
                    let (s, at) = cache.latest_with_time().unwrap();
                    let ffr = s.ffr_upper_pct.unwrap();
                    // Every field comes from the same put.
                    assert_eq!(s.core_pce_yoy_pct, Some(ffr / 2.0));
                    assert_eq!(at, t0() + Duration::seconds(ffr as i64));
                    tokio::task::yield_now().await;
                }
            })
        };

        for w in writers {
            w.await.unwrap();
        }
        reader.await.unwrap();
        assert!(cache.latest().is_some());
    }
}
