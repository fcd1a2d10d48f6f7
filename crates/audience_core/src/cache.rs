//! Audience memoization keyed by selection criterion.
//!
//! The cache retains audiences weakly: an entry lives exactly as long as some
//! caller still holds the handle. Dropping an entry and recreating it later
//! is indistinguishable from keeping it, since audiences hold no state beyond
//! their criterion.

use crate::audience::{Audience, AudienceInner};
use crate::criterion::SelectionCriterion;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

/// Criterion-keyed cache of live audiences.
pub struct AudienceCache {
    entries: DashMap<SelectionCriterion, Weak<AudienceInner>>,
    prune_threshold: usize,
    /// Entry count above which the next insert sweeps
    next_sweep: AtomicUsize,
}

impl AudienceCache {
    /// Creates a cache that sweeps dead entries on insert once it holds more
    /// than `prune_threshold` of them.
    ///
    /// After a sweep the trigger moves to twice the surviving entry count, so
    /// a cache full of live audiences is not swept on every insert.
    pub fn new(prune_threshold: usize) -> Self {
        let prune_threshold = prune_threshold.max(1);
        Self {
            entries: DashMap::new(),
            prune_threshold,
            next_sweep: AtomicUsize::new(prune_threshold),
        }
    }

    /// Returns the cached audience for `criterion`, creating it with `create`
    /// if there is none or the previous one has been dropped.
    ///
    /// Concurrent callers with equal criteria always receive the same instance.
    pub(crate) fn get_or_create<F>(&self, criterion: SelectionCriterion, create: F) -> Audience
    where
        F: FnOnce(SelectionCriterion) -> Arc<AudienceInner>,
    {
        let (inner, inserted) = match self.entries.entry(criterion) {
            Entry::Occupied(mut entry) => match entry.get().upgrade() {
                Some(existing) => (existing, false),
                None => {
                    let fresh = create(entry.key().clone());
                    entry.insert(Arc::downgrade(&fresh));
                    (fresh, true)
                }
            },
            Entry::Vacant(entry) => {
                let fresh = create(entry.key().clone());
                let _ = entry.insert(Arc::downgrade(&fresh));
                (fresh, true)
            }
        };

        // the entry guard is released above; retain() locks every shard
        if inserted && self.entries.len() > self.next_sweep.load(Ordering::Relaxed) {
            self.prune();
        }

        Audience::from_inner(inner)
    }

    /// Drops entries whose audience no caller holds any more.
    pub fn prune(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, weak| weak.strong_count() > 0);
        let remaining = self.entries.len();
        self.next_sweep
            .store(self.prune_threshold.max(remaining * 2), Ordering::Relaxed);
        let removed = before.saturating_sub(remaining);
        if removed > 0 {
            trace!(removed, "🧹 Pruned dead audience cache entries");
        }
        removed
    }

    /// Number of entries whose audience is still held somewhere.
    pub fn live_len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().strong_count() > 0)
            .count()
    }

    /// Number of entries, dead ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.next_sweep.store(self.prune_threshold, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for AudienceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudienceCache")
            .field("entries", &self.entries.len())
            .field("prune_threshold", &self.prune_threshold)
            .field("next_sweep", &self.next_sweep.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(criterion: SelectionCriterion) -> Arc<AudienceInner> {
        AudienceInner::new(criterion, Weak::new())
    }

    #[test]
    fn test_equal_criteria_share_instance() {
        let cache = AudienceCache::new(16);
        let a = cache.get_or_create(SelectionCriterion::Permission("vip".into()), make);
        let b = cache.get_or_create(SelectionCriterion::Permission("vip".into()), make);
        let c = cache.get_or_create(SelectionCriterion::Permission("mod".into()), make);

        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_dropped_audience_is_recreated() {
        let cache = AudienceCache::new(16);
        let criterion = SelectionCriterion::Server("lobby".into());

        let first = cache.get_or_create(criterion.clone(), make);
        drop(first);
        assert_eq!(cache.live_len(), 0);

        let mut created = false;
        let second = cache.get_or_create(criterion.clone(), |c| {
            created = true;
            make(c)
        });
        assert!(created);
        assert_eq!(second.criterion(), &criterion);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_prune_sweeps_dead_entries() {
        let cache = AudienceCache::new(4);
        let kept = cache.get_or_create(SelectionCriterion::Permission("kept".into()), make);
        for i in 0..4 {
            let _ = cache.get_or_create(SelectionCriterion::Permission(format!("tmp.{i}")), make);
        }

        // the insert that crossed the threshold swept the dropped handles
        assert!(cache.len() <= 4);
        assert_eq!(cache.live_len(), 1);
        let before = cache.len();
        assert_eq!(cache.prune(), before - 1);
        assert_eq!(cache.len(), 1);
        drop(kept);
    }

    #[test]
    fn test_hits_never_sweep() {
        let cache = AudienceCache::new(2);
        let live: Vec<Audience> = ["a", "b", "c"]
            .iter()
            .map(|key| cache.get_or_create(SelectionCriterion::Permission((*key).into()), make))
            .collect();

        // the third insert swept nothing and moved the trigger to 6
        drop(cache.get_or_create(SelectionCriterion::Permission("gone".into()), make));
        assert_eq!(cache.len(), 4);

        for _ in 0..100 {
            let hit = cache.get_or_create(SelectionCriterion::Permission("a".into()), |_| {
                panic!("cached audience was recreated")
            });
            assert!(hit.ptr_eq(&live[0]));
        }
        assert_eq!(cache.len(), 4, "dead entry survives cache hits");

        for i in 0..3 {
            drop(cache.get_or_create(SelectionCriterion::Permission(format!("tmp.{i}")), make));
        }
        // the seventh entry crossed the raised trigger and swept the dead ones
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.live_len(), 3);
    }
}
