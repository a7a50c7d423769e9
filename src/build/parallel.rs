//! Parallel entry execution.
//!
//! Entries are independent, so a pool of scoped worker threads claims them
//! one at a time from a shared counter. Cancellation stops workers from
//! claiming new work; anything already claimed runs to completion.
//!
//! # Example
//!
//! ```ignore
//! use sassbuild::build::{run_parallel, CancellationToken};
//!
//! let token = CancellationToken::new();
//! let lengths = run_parallel(&items, 4, &token, |item| item.len(), |_| 0);
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Default number of parallel jobs (uses available parallelism).
pub fn default_jobs() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Shared flag that asks workers to stop claiming new work.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Run `work` over `items` on up to `jobs` threads.
///
/// Results come back in item order. Items never claimed because the token
/// was cancelled are mapped through `skipped` instead.
pub fn run_parallel<T, R, W, S>(
    items: &[T],
    jobs: usize,
    cancel: &CancellationToken,
    work: W,
    skipped: S,
) -> Vec<R>
where
    T: Sync,
    R: Send,
    W: Fn(&T) -> R + Sync,
    S: Fn(&T) -> R,
{
    if items.is_empty() {
        return Vec::new();
    }

    let num_workers = jobs.max(1).min(items.len());
    let next_idx = AtomicUsize::new(0);
    let results: Mutex<Vec<(usize, R)>> = Mutex::new(Vec::with_capacity(items.len()));

    if num_workers == 1 {
        worker_loop(items, cancel, &work, &next_idx, &results);
    } else {
        debug!(workers = num_workers, items = items.len(), "starting worker pool");
        std::thread::scope(|s| {
            for _ in 0..num_workers {
                s.spawn(|| worker_loop(items, cancel, &work, &next_idx, &results));
            }
        });
    }

    let mut results = results.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
    results.sort_by_key(|(idx, _)| *idx);

    // Fill the gaps left by cancellation, preserving item order.
    let mut done = results.into_iter().peekable();
    let mut ordered = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        match done.peek() {
            Some((done_idx, _)) if *done_idx == idx => {
                if let Some((_, result)) = done.next() {
                    ordered.push(result);
                }
            }
            _ => ordered.push(skipped(item)),
        }
    }
    ordered
}

fn worker_loop<T, R, W>(
    items: &[T],
    cancel: &CancellationToken,
    work: &W,
    next_idx: &AtomicUsize,
    results: &Mutex<Vec<(usize, R)>>,
) where
    W: Fn(&T) -> R,
{
    loop {
        if cancel.is_cancelled() {
            break;
        }

        let idx = next_idx.fetch_add(1, Ordering::SeqCst);
        let Some(item) = items.get(idx) else {
            break;
        };

        let result = work(item);
        results.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push((idx, result));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_default_jobs_positive() {
        assert!(default_jobs() >= 1);
    }

    #[test]
    fn test_results_in_item_order() {
        let items: Vec<u64> = (0..50).collect();
        let token = CancellationToken::new();
        let out = run_parallel(
            &items,
            8,
            &token,
            |n| {
                // uneven work so completion order differs from item order
                std::thread::sleep(std::time::Duration::from_micros((50 - n) * 20));
                n * 2
            },
            |_| u64::MAX,
        );
        assert_eq!(out, items.iter().map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_input() {
        let items: Vec<u32> = vec![];
        let out = run_parallel(&items, 4, &CancellationToken::new(), |n| *n, |n| *n);
        assert!(out.is_empty());
    }

    #[test]
    fn test_cancelled_before_start_skips_everything() {
        let items = vec![1, 2, 3];
        let token = CancellationToken::new();
        token.cancel();
        let out = run_parallel(&items, 2, &token, |_| "ran", |_| "skipped");
        assert_eq!(out, vec!["skipped"; 3]);
    }

    #[test]
    fn test_cancel_mid_run_finishes_claimed_work() {
        let items: Vec<usize> = (0..20).collect();
        let token = CancellationToken::new();
        let ran = AtomicUsize::new(0);
        let out = run_parallel(
            &items,
            1,
            &token,
            |n| {
                ran.fetch_add(1, Ordering::SeqCst);
                if *n == 4 {
                    token.cancel();
                }
                "ran"
            },
            |_| "skipped",
        );

        assert_eq!(ran.load(Ordering::SeqCst), 5);
        assert_eq!(&out[..5], &["ran"; 5]);
        assert!(out[5..].iter().all(|s| *s == "skipped"));
    }

    #[test]
    fn test_token_clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
