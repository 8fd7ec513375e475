//! Extended-lifetime work tracking.
//!
//! Work that must finish before an event is considered settled (a cache write
//! started after the response was returned, a background revalidation) is
//! spawned onto the tokio runtime and its [`JoinHandle`] is kept here.
//! [`ExtendLifetime::join`] drains the set, including tasks that were added
//! while it was already waiting.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use smol_str::SmolStr;
use tokio::task::{JoinError, JoinHandle};
use tracing::{Instrument, debug, info_span};

/// Set of spawned tasks an owner must wait for before it is settled.
#[derive(Debug)]
pub struct ExtendLifetime<E> {
    tasks: DashMap<u64, JoinHandle<Result<(), E>>>,
    next_id: AtomicU64,
}

impl<E> Default for ExtendLifetime<E> {
    fn default() -> Self {
        ExtendLifetime {
            tasks: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<E> ExtendLifetime<E>
where
    E: Send + 'static,
{
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `task` and tracks it. `kind` labels the tracing span.
    pub fn wait_until<F>(&self, kind: impl Into<SmolStr>, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
    {
        let kind = kind.into();
        let span = info_span!("extend_lifetime", kind = %kind);
        self.push(tokio::spawn(task.instrument(span)));
    }

    /// Tracks an already spawned task.
    pub fn push(&self, handle: JoinHandle<Result<(), E>>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.tasks.insert(id, handle);
    }

    /// Number of tasks not yet joined.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// `true` when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn pop_oldest(&self) -> Option<JoinHandle<Result<(), E>>> {
        loop {
            let id = self.tasks.iter().map(|entry| *entry.key()).min()?;
            if let Some((_, handle)) = self.tasks.remove(&id) {
                return Some(handle);
            }
        }
    }

    /// Waits until the set is empty.
    ///
    /// Every task is awaited, even after one fails. The first failure in
    /// insertion order is returned; a panicked or cancelled task counts as a
    /// failure.
    pub async fn join(&self) -> Result<(), E>
    where
        E: From<JoinError>,
    {
        let mut first_error = None;
        while let Some(handle) = self.pop_oldest() {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_error) => Err(E::from(join_error)),
            };
            if let Err(error) = result {
                if first_error.is_none() {
                    first_error = Some(error);
                } else {
                    debug!("extended-lifetime task failed after an earlier failure");
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Failed(&'static str),
        Join,
    }

    impl From<JoinError> for TestError {
        fn from(_: JoinError) -> Self {
            TestError::Join
        }
    }

    #[tokio::test]
    async fn join_on_empty_set_is_ok() {
        let lifetime = ExtendLifetime::<TestError>::new();
        assert!(lifetime.is_empty());
        assert_eq!(lifetime.join().await, Ok(()));
    }

    #[tokio::test]
    async fn join_waits_for_tasks_added_while_waiting() {
        let lifetime = Arc::new(ExtendLifetime::<TestError>::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let inner_lifetime = lifetime.clone();
        let inner_counter = counter.clone();
        lifetime.wait_until("outer", async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let nested_counter = inner_counter.clone();
            inner_lifetime.wait_until("nested", async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                nested_counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
            inner_counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(lifetime.join().await, Ok(()));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(lifetime.is_empty());
    }

    #[tokio::test]
    async fn first_error_wins_and_all_tasks_run() {
        let lifetime = ExtendLifetime::<TestError>::new();
        let counter = Arc::new(AtomicUsize::new(0));

        lifetime.wait_until("a", async { Err(TestError::Failed("a")) });
        let c = counter.clone();
        lifetime.wait_until("b", async move {
            c.fetch_add(1, Ordering::SeqCst);
            Err(TestError::Failed("b"))
        });

        assert_eq!(lifetime.join().await, Err(TestError::Failed("a")));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    async fn explode() -> Result<(), TestError> {
        panic!("boom")
    }

    #[tokio::test]
    async fn panicking_task_is_reported() {
        let lifetime = ExtendLifetime::<TestError>::new();
        lifetime.wait_until("panics", explode());
        assert_eq!(lifetime.join().await, Err(TestError::Join));
    }
}
