//! Memoized async lookups
//!
//! Every key maps to one shared future. The first caller creates it, later
//! callers await the same future, so at most one request per key is ever in
//! flight. Results, failures included, stay cached until a caller holding the
//! failed lookup replaces it.

use std::future::Future;
use std::hash::Hash;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared, TryFutureExt};

use crate::core::{DepwalkError, DepwalkResult};

/// Handle on one in-flight or settled lookup
pub type MemoLookup<V> = Shared<BoxFuture<'static, Result<V, std::sync::Arc<DepwalkError>>>>;

pub struct AsyncMemo<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    entries: DashMap<K, MemoLookup<V>>,
}

impl<K, V> AsyncMemo<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Await the cached lookup for `key`, starting it with `compute` if this
    /// is the first request
    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> DepwalkResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DepwalkResult<V>> + Send + 'static,
    {
        settle(self.lookup(key, compute)).await
    }

    /// The shared lookup for `key`, started with `compute` if absent
    ///
    /// `compute` only builds the future; it runs once polled, outside the map
    /// lock.
    pub fn lookup<F, Fut>(&self, key: K, compute: F) -> MemoLookup<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DepwalkResult<V>> + Send + 'static,
    {
        match self.entries.entry(key) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => entry.insert(start(compute)).value().clone(),
        }
    }

    /// Run `compute` in place of `failed`
    ///
    /// When another caller already replaced `failed`, its lookup is joined
    /// instead, so all holders of one failure share a single rerun.
    pub fn relookup<F, Fut>(&self, key: K, failed: &MemoLookup<V>, compute: F) -> MemoLookup<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DepwalkResult<V>> + Send + 'static,
    {
        match self.entries.entry(key) {
            Entry::Occupied(mut entry) => {
                if Shared::ptr_eq(entry.get(), failed) {
                    entry.insert(start(compute));
                }
                entry.get().clone()
            }
            Entry::Vacant(entry) => entry.insert(start(compute)).value().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> Default for AsyncMemo<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

fn start<V, F, Fut>(compute: F) -> MemoLookup<V>
where
    V: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = DepwalkResult<V>> + Send + 'static,
{
    compute().map_err(std::sync::Arc::new).boxed().shared()
}

/// Await a lookup, unwrapping its shared error
pub async fn settle<V>(lookup: MemoLookup<V>) -> DepwalkResult<V>
where
    V: Clone + Send + Sync + 'static,
{
    lookup.await.map_err(DepwalkError::Shared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_requests_share_one_lookup() {
        let memo: Arc<AsyncMemo<String, u32>> = Arc::new(AsyncMemo::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let requests = (0..8).map(|_| {
            let memo = Arc::clone(&memo);
            let calls = Arc::clone(&calls);
            async move {
                memo.get_or_compute("a".to_string(), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(42)
                })
                .await
            }
        });
        let results = futures::future::join_all(requests).await;

        assert!(results.iter().all(|r| matches!(r, Ok(42))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn test_failures_are_shared_until_replaced() {
        let memo: AsyncMemo<u32, u32> = AsyncMemo::new();

        let failed = memo.lookup(1, || async { Err(DepwalkError::other("boom")) });
        assert!(matches!(
            tokio_test::block_on(settle(failed.clone())),
            Err(DepwalkError::Shared(_))
        ));

        let cached = tokio_test::block_on(memo.get_or_compute(1, || async { Ok(5) }));
        assert!(cached.is_err());

        let fresh = memo.relookup(1, &failed, || async { Ok(5) });
        assert_eq!(tokio_test::block_on(settle(fresh)).unwrap(), 5);
        assert_eq!(tokio_test::block_on(memo.get_or_compute(1, || async { Ok(6) })).unwrap(), 5);
        assert_eq!(memo.len(), 1);
    }

    #[tokio::test]
    async fn test_holders_of_one_failure_share_the_rerun() {
        let memo: AsyncMemo<u32, u32> = AsyncMemo::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let failed = memo.lookup(1, || async { Err(DepwalkError::other("boom")) });
        assert!(settle(failed.clone()).await.is_err());

        let reruns = (0..3).map(|_| {
            let calls = Arc::clone(&calls);
            settle(memo.relookup(1, &failed, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(7)
            }))
        });
        let results = futures::future::join_all(reruns).await;

        assert!(results.iter().all(|r| matches!(r, Ok(7))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
