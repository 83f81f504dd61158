//! Fork-join parallel batch runner (C13, spec.md §5): the only concurrency
//! in the core, used for primer-oracle invocations and off-target
//! screening. Workers share no mutable state; results are collected into
//! per-item slots owned by the calling thread.

use crate::timeout::CancellationToken;
use rayon::prelude::*;

/// Runs `work` over every item in `items` using a bounded worker pool,
/// polling `cancel` before starting each item. If cancellation is observed
/// before an item starts, that item's slot is `None`.
///
/// This is a barrier: every item completes (or is skipped) before the call
/// returns, matching spec.md §5's "submits a static set of independent
/// tasks, awaits all, and proceeds".
pub fn run_all<T, R, F>(items: &[T], cancel: &CancellationToken, work: F) -> Vec<Option<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    items
        .par_iter()
        .map(|item| {
            if cancel.is_cancelled() {
                None
            } else {
                Some(work(item))
            }
        })
        .collect()
}

/// Builds the thread pool used for a single invocation's parallel batches,
/// sized from `num_threads` (spec.md §9: configuration is passed by value,
/// no process-wide state).
pub fn build_pool(num_threads: usize) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads.max(1))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_all_applies_work_to_every_item() {
        let cancel = CancellationToken::new();
        let items = vec![1, 2, 3, 4];
        let results = run_all(&items, &cancel, |x| x * 2);
        assert_eq!(
            results.into_iter().collect::<Option<Vec<_>>>().unwrap(),
            vec![2, 4, 6, 8]
        );
    }

    #[test]
    fn cancelled_token_yields_none_slots() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let items = vec![1, 2, 3];
        let results = run_all(&items, &cancel, |x| x * 2);
        assert!(results.iter().all(|r| r.is_none()));
    }

    #[test]
    fn build_pool_respects_thread_count() {
        let pool = build_pool(2).unwrap();
        assert_eq!(pool.current_num_threads(), 2);
    }
}
