//! Task runner: bounded-parallel execution of independent sub-tasks.
//!
//! Decoders use this to fetch and parse sibling resources (textures,
//! external buffers) without serializing the whole pipeline. Three modes:
//! fire-and-forget ([`run_task`]), full batch ([`run_tasks`]) and bounded
//! batch ([`run_tasks_batch`]). Within any batch the result slot order
//! always matches submission order, regardless of completion order, and
//! one task's failure never removes or reorders other slots.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::util::{Error, Result};

/// Handle to a fire-and-forget task. Dropping it detaches the task.
pub struct TaskHandle<T> {
    handle: thread::JoinHandle<T>,
}

impl<T> TaskHandle<T> {
    /// True when the task has finished.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the task completes and take its result.
    pub fn join(self) -> Result<T> {
        self.handle.join().map_err(|_| Error::TaskPanicked(0))
    }
}

/// Cancellation token for bounded batches.
///
/// Checked only at task-start boundaries: cancelling prevents not-yet-started
/// tasks from starting, while in-flight tasks run to completion and still
/// contribute their results.
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Schedule one task without waiting for it.
pub fn run_task<T, F>(task: F) -> TaskHandle<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    TaskHandle { handle: thread::spawn(task) }
}

/// Run all tasks concurrently and collect results in submission order.
pub fn run_tasks<T, F>(tasks: Vec<F>) -> Vec<Result<T>>
where
    T: Send,
    F: FnOnce() -> Result<T> + Send,
{
    run_group(tasks, 0)
}

/// Run tasks in fixed-size groups to cap concurrent resource use.
///
/// Groups execute sequentially; tasks within a group concurrently. Group
/// N+1 never starts before every task of group N has settled. The final
/// result order matches submission order. Tasks skipped due to
/// cancellation produce [`Error::Cancelled`] in their slot.
pub fn run_tasks_batch<T, F>(
    tasks: Vec<F>,
    batch_size: usize,
    cancel: Option<&CancelToken>,
) -> Vec<Result<T>>
where
    T: Send,
    F: FnOnce() -> Result<T> + Send,
{
    let batch_size = batch_size.max(1);
    let mut results = Vec::with_capacity(tasks.len());
    let mut remaining = tasks;
    let mut offset = 0;

    while !remaining.is_empty() {
        let rest = remaining.split_off(batch_size.min(remaining.len()));
        let group = std::mem::replace(&mut remaining, rest);
        let group_len = group.len();

        if cancel.is_some_and(|c| c.is_cancelled()) {
            results.extend((0..group_len).map(|_| Err(Error::Cancelled)));
        } else {
            results.append(&mut run_group(group, offset));
        }
        offset += group_len;
    }

    results
}

/// Run one group of tasks on scoped threads, preserving slot order.
fn run_group<T, F>(tasks: Vec<F>, index_offset: usize) -> Vec<Result<T>>
where
    T: Send,
    F: FnOnce() -> Result<T> + Send,
{
    let count = tasks.len();
    let slots: Mutex<Vec<Option<Result<T>>>> =
        Mutex::new((0..count).map(|_| None).collect());

    thread::scope(|scope| {
        for (i, task) in tasks.into_iter().enumerate() {
            let slots = &slots;
            scope.spawn(move || {
                let result = task();
                slots.lock()[i] = Some(result);
            });
        }
    });

    slots
        .into_inner()
        .into_iter()
        .enumerate()
        // A slot left empty means the task's thread panicked
        .map(|(i, slot)| slot.unwrap_or(Err(Error::TaskPanicked(index_offset + i))))
        .collect()
}

/// Poll `predicate` until it returns false or `timeout` elapses.
///
/// Timeouts apply only to this polling helper, never to task execution.
pub fn wait_while<P>(mut predicate: P, timeout: Duration, poll_interval: Duration) -> Result<()>
where
    P: FnMut() -> bool,
{
    let start = Instant::now();
    while predicate() {
        if start.elapsed() >= timeout {
            return Err(Error::Timeout(timeout.as_millis() as u64));
        }
        thread::sleep(poll_interval.min(timeout));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_run_task_fire_and_forget() {
        let handle = run_task(|| 21 * 2);
        assert_eq!(handle.join().unwrap(), 42);
    }

    #[test]
    fn test_run_tasks_preserves_order() {
        // Later tasks finish first; slots must still match submission order
        let tasks: Vec<_> = (0..8usize)
            .map(|i| {
                move || {
                    thread::sleep(Duration::from_millis((8 - i) as u64 * 2));
                    Ok(i)
                }
            })
            .collect();
        let results = run_tasks(tasks);
        let values: Vec<usize> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_batch_single_failure_keeps_other_slots() {
        const K: usize = 7;
        const FAILING: usize = 3;
        let tasks: Vec<_> = (0..K)
            .map(|i| {
                move || {
                    if i == FAILING {
                        Err(Error::other("boom"))
                    } else {
                        Ok(i * 10)
                    }
                }
            })
            .collect();

        let results = run_tasks_batch(tasks, 3, None);
        assert_eq!(results.len(), K);
        for (i, slot) in results.iter().enumerate() {
            if i == FAILING {
                assert!(slot.is_err());
            } else {
                assert_eq!(*slot.as_ref().unwrap(), i * 10);
            }
        }
    }

    #[test]
    fn test_batch_groups_run_sequentially() {
        let max_concurrent = Arc::new(AtomicUsize::new(0));
        let current = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<_> = (0..9)
            .map(|i| {
                let max_concurrent = max_concurrent.clone();
                let current = current.clone();
                move || {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    max_concurrent.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    current.fetch_sub(1, Ordering::SeqCst);
                    Ok(i)
                }
            })
            .collect();

        let results = run_tasks_batch(tasks, 3, None);
        assert_eq!(results.len(), 9);
        assert!(max_concurrent.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn test_cancelled_batch_skips_later_groups() {
        let token = CancelToken::new();
        let cancel_after_first = token.clone();
        let tasks: Vec<_> = (0..6usize)
            .map(|i| {
                let token = cancel_after_first.clone();
                move || {
                    if i == 0 {
                        token.cancel();
                    }
                    Ok(i)
                }
            })
            .collect();

        let results = run_tasks_batch(tasks, 2, Some(&token));
        assert_eq!(results.len(), 6);
        // First group ran to completion despite cancelling mid-group
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        // Later groups never started
        for slot in &results[2..] {
            assert!(matches!(slot, Err(Error::Cancelled)));
        }
    }

    #[test]
    fn test_wait_while_times_out() {
        let start = Instant::now();
        let result = wait_while(
            || true,
            Duration::from_millis(30),
            Duration::from_millis(5),
        );
        assert!(matches!(result, Err(Error::Timeout(30))));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_wait_while_passes_when_condition_clears() {
        let flips = AtomicUsize::new(0);
        let result = wait_while(
            || flips.fetch_add(1, Ordering::SeqCst) < 3,
            Duration::from_millis(500),
            Duration::from_millis(1),
        );
        assert!(result.is_ok());
    }
}
