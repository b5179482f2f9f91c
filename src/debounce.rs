//! Trailing-edge debouncer holding its pending timer in the struct.

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

type Sink<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

/// Runs `sink` with the latest pushed value once `delay` passes without a
/// newer push.
///
/// Must be used inside a tokio runtime. Sink calls never overlap and run in
/// push order, so the last value written is the last value pushed. Dropping
/// the debouncer discards a value still waiting for its turn; a sink call
/// already started runs to completion.
///
/// # Example
/// ```rust,ignore
/// let mut save = Debouncer::new(Duration::from_millis(500), |text: String| async move {
///     persist(text).await;
/// });
/// save.push("d".into());
/// save.push("draft".into()); // only "draft" is persisted
/// ```
pub struct Debouncer<T> {
    delay: Duration,
    sink: Sink<T>,
    writing: Arc<Mutex<()>>,
    pending: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F, Fut>(delay: Duration, sink: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            delay,
            sink: Arc::new(move |value| sink(value).boxed()),
            writing: Arc::new(Mutex::new(())),
            pending: None,
        }
    }

    /// Replace the pending value and restart the delay.
    pub fn push(&mut self, value: T) {
        self.cancel();

        let sink = Arc::clone(&self.sink);
        let writing = Arc::clone(&self.writing);
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let guard = writing.lock_owned().await;
            // Detached so a later push cannot abort a write midway.
            tokio::spawn(async move {
                sink(value).await;
                drop(guard);
            });
        }));
    }

    /// Drop the pending value. Returns whether one was waiting.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn recording() -> (Arc<StdMutex<Vec<u32>>>, Debouncer<u32>) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let debouncer = Debouncer::new(Duration::from_millis(500), move |value| {
            let seen = Arc::clone(&sink_seen);
            async move {
                seen.lock().unwrap().push(value);
            }
        });
        (seen, debouncer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_latest_value_is_written() {
        let (seen, mut debouncer) = recording();
        debouncer.push(1);
        tokio::time::sleep(Duration::from_millis(200)).await;
        debouncer.push(2);
        tokio::time::sleep(Duration::from_millis(200)).await;
        debouncer.push(3);
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!debouncer.is_pending());
        assert_eq!(*seen.lock().unwrap(), vec![3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_each_write() {
        let (seen, mut debouncer) = recording();
        debouncer.push(1);
        tokio::time::sleep(Duration::from_secs(1)).await;
        debouncer.push(2);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_write_is_not_overtaken() {
        let stored = Arc::new(StdMutex::new(0u32));
        let finished = Arc::new(StdMutex::new(Vec::new()));
        let (sink_stored, sink_finished) = (Arc::clone(&stored), Arc::clone(&finished));
        let mut debouncer = Debouncer::new(Duration::from_millis(500), move |value: u32| {
            let stored = Arc::clone(&sink_stored);
            let finished = Arc::clone(&sink_finished);
            async move {
                let latency = if value == 1 { 2000 } else { 10 };
                tokio::time::sleep(Duration::from_millis(latency)).await;
                *stored.lock().unwrap() = value;
                finished.lock().unwrap().push(value);
            }
        });

        debouncer.push(1);
        tokio::time::sleep(Duration::from_secs(1)).await;
        // First write is still in flight.
        debouncer.push(2);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(*finished.lock().unwrap(), vec![1, 2]);
        assert_eq!(*stored.lock().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_drop_discard_pending() {
        let (seen, mut debouncer) = recording();
        debouncer.push(1);
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        debouncer.push(2);
        drop(debouncer);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(seen.lock().unwrap().is_empty());
    }
}
