//! Per-kind mutual exclusion for running jobs.

use crate::JobKind;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Process-wide table of busy job kinds.
///
/// Create one at startup and hand clones to whoever starts jobs; every clone
/// shares the same table.
#[derive(Debug, Clone, Default)]
pub struct ExclusionRegistry {
    busy: Arc<Mutex<HashSet<JobKind>>>,
}

impl ExclusionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `kind` busy if it is free.
    ///
    /// Returns false, with no side effect, if the kind is already busy. The
    /// check and the set happen under one lock.
    pub fn try_acquire(&self, kind: &JobKind) -> bool {
        let acquired = self.lock().insert(kind.clone());
        if acquired {
            tracing::debug!(%kind, "Acquired job kind");
        }
        acquired
    }

    /// Marks `kind` free. Releasing a kind that is not held does nothing.
    pub fn release(&self, kind: &JobKind) {
        if self.lock().remove(kind) {
            tracing::debug!(%kind, "Released job kind");
        }
    }

    /// Acquires `kind` and returns a lease that releases it on drop.
    #[must_use]
    pub fn lease(&self, kind: JobKind) -> Option<KindLease> {
        self.try_acquire(&kind).then(|| KindLease {
            registry: self.clone(),
            kind,
        })
    }

    /// Returns true if `kind` is currently held.
    pub fn is_busy(&self, kind: &JobKind) -> bool {
        self.lock().contains(kind)
    }

    /// Returns the held kinds, sorted.
    pub fn busy_kinds(&self) -> Vec<JobKind> {
        let mut kinds: Vec<_> = self.lock().iter().cloned().collect();
        kinds.sort();
        kinds
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<JobKind>> {
        self.busy.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A held job kind. Dropping the lease releases the kind.
#[derive(Debug)]
#[must_use = "dropping the lease releases the job kind immediately"]
pub struct KindLease {
    registry: ExclusionRegistry,
    kind: JobKind,
}

impl KindLease {
    /// Returns the leased kind.
    #[must_use]
    pub const fn kind(&self) -> &JobKind {
        &self.kind
    }
}

impl Drop for KindLease {
    fn drop(&mut self) {
        self.registry.release(&self.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SOLVE: JobKind = JobKind::from_static("solve");
    const MATCH: JobKind = JobKind::from_static("match-features");

    #[test]
    fn test_acquire_and_release() {
        let registry = ExclusionRegistry::new();

        assert!(registry.try_acquire(&SOLVE));
        assert!(!registry.try_acquire(&SOLVE));
        assert!(registry.is_busy(&SOLVE));

        // Different kinds are independent
        assert!(registry.try_acquire(&MATCH));
        assert_eq!(registry.busy_kinds(), vec![MATCH, SOLVE]);

        registry.release(&SOLVE);
        assert!(!registry.is_busy(&SOLVE));
        assert!(registry.try_acquire(&SOLVE));
    }

    #[test]
    fn test_release_is_idempotent() {
        let registry = ExclusionRegistry::new();
        registry.release(&SOLVE);
        registry.release(&SOLVE);
        assert!(registry.busy_kinds().is_empty());

        assert!(registry.try_acquire(&SOLVE));
        registry.release(&SOLVE);
        registry.release(&SOLVE);
        assert!(registry.try_acquire(&SOLVE));
    }

    #[test]
    fn test_clones_share_state() {
        let registry = ExclusionRegistry::new();
        let other = registry.clone();

        assert!(registry.try_acquire(&SOLVE));
        assert!(!other.try_acquire(&SOLVE));
    }

    #[test]
    fn test_lease_releases_on_drop() {
        let registry = ExclusionRegistry::new();

        let lease = registry.lease(SOLVE).unwrap();
        assert_eq!(lease.kind(), &SOLVE);
        assert!(registry.lease(SOLVE).is_none());

        drop(lease);
        assert!(!registry.is_busy(&SOLVE));
        assert!(registry.lease(SOLVE).is_some());
    }

    #[test]
    fn test_concurrent_acquire_has_one_winner() {
        const THREADS: usize = 16;

        for _ in 0..50 {
            let registry = ExclusionRegistry::new();
            let barrier = Barrier::new(THREADS);
            let winners = AtomicUsize::new(0);

            std::thread::scope(|scope| {
                for _ in 0..THREADS {
                    scope.spawn(|| {
                        barrier.wait();
                        if registry.try_acquire(&SOLVE) {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                    });
                }
            });

            assert_eq!(winners.load(Ordering::SeqCst), 1);
        }
    }
}
