pub mod config;
#[cfg(feature = "gdal")]
pub mod gdal;

use crate::error::Error;
use std::ops::{Deref, Range};
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, ScopedJoinHandle};
use tracing::warn;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Get a lock for mutex and recover from poisoning
pub fn safe_lock_mutex<M, T>(lock: &M) -> MutexGuard<T>
where
    M: Deref<Target = Mutex<T>>,
{
    match lock.deref().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Number of threads to use for fan-out stages if nothing else is configured.
pub fn hardware_concurrency() -> usize {
    num_cpus::get().max(1)
}

enum RangeTask<'scope, T> {
    Spawned(ScopedJoinHandle<'scope, T>),
    Inline(Range<usize>),
}

/// Runs `work` for every range on its own scoped thread and returns the results in range order.
///
/// Ranges whose thread cannot be spawned run on the calling thread after the others were started.
/// The returned flag tells whether that happened.
pub fn run_in_ranges<T, F>(name: &str, ranges: Vec<Range<usize>>, work: F) -> (Vec<T>, bool)
where
    T: Send,
    F: Fn(Range<usize>) -> T + Sync,
{
    let work = &work;
    let mut spawn_failed = false;

    let results = thread::scope(|scope| {
        let tasks: Vec<RangeTask<T>> = ranges
            .into_iter()
            .enumerate()
            .map(|(i, range)| {
                let job = range.clone();
                match thread::Builder::new()
                    .name(format!("{name}-{i}"))
                    .spawn_scoped(scope, move || work(job))
                {
                    Ok(handle) => RangeTask::Spawned(handle),
                    Err(e) => {
                        warn!("Failed to spawn {name} thread {i}: {e}");
                        spawn_failed = true;
                        RangeTask::Inline(range)
                    }
                }
            })
            .collect();

        tasks
            .into_iter()
            .map(|task| match task {
                RangeTask::Spawned(handle) => handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic)),
                RangeTask::Inline(range) => work(range),
            })
            .collect()
    });

    (results, spawn_failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_keep_their_order() {
        let ranges = vec![0..3, 3..5, 5..9];
        let (results, spawn_failed) = run_in_ranges("test", ranges, |range| range.sum::<usize>());

        assert!(!spawn_failed);
        assert_eq!(results, vec![3, 7, 26]);
    }

    #[test]
    fn recovers_poisoned_mutex() {
        let lock = std::sync::Arc::new(Mutex::new(1));
        let poisoner = lock.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison");
        })
        .join();

        assert!(lock.is_poisoned());
        assert_eq!(*safe_lock_mutex(&lock), 1);
    }
}
