//! Per-ticket debouncer with cancel-and-replace semantics.
//!
//! Each ticket has at most one pending action. Scheduling again within the
//! window aborts the pending one and restarts the timer, so a burst collapses
//! into a single run after the last event. Nothing is persisted.

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    dashmap::DashMap,
    helpline_common::types::TicketId,
    tokio::task::JoinHandle,
    tracing::debug,
};

#[cfg(feature = "metrics")]
use helpline_metrics::{automation, counter};

struct Slot {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Decrements the in-flight count when the task ends or is aborted.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Debouncer {
    window: Duration,
    slots: Arc<DashMap<TicketId, Slot>>,
    next_generation: AtomicU64,
    in_flight: Arc<AtomicUsize>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            slots: Arc::new(DashMap::new()),
            next_generation: AtomicU64::new(0),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Run `action` for `key` once the window passes without another call for
    /// the same key.
    pub fn schedule<F>(&self, key: TicketId, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let slots = Arc::clone(&self.slots);
        let window = self.window;

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight(Arc::clone(&self.in_flight));

        let handle = tokio::spawn(async move {
            let _guard = guard;
            tokio::time::sleep(window).await;
            // Past this point a newer schedule no longer finds this slot.
            slots.remove_if(&key, |_, slot| slot.generation == generation);
            action.await;
        });

        if let Some(previous) = self.slots.insert(key, Slot { generation, handle }) {
            previous.handle.abort();
            debug!(ticket_id = key, "debounced action replaced");
            #[cfg(feature = "metrics")]
            counter!(automation::DEBOUNCE_REPLACED_TOTAL).increment(1);
        }
    }

    /// Actions scheduled or running and not yet finished.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Wait until every scheduled action has run or been replaced.
    pub async fn drain(&self) {
        while self.pending_count() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Abort every pending action.
    pub fn cancel_all(&self) {
        self.slots.retain(|_, slot| {
            slot.handle.abort();
            false
        });
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::sync::Mutex};

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn push(log: &Log, tag: &'static str) -> impl Future<Output = ()> + Send + 'static {
        let log = Arc::clone(log);
        async move {
            log.lock().unwrap().push(tag);
        }
    }

    fn window() -> Duration {
        Duration::from_millis(60)
    }

    #[tokio::test]
    async fn burst_collapses_into_last_action() {
        let debouncer = Debouncer::new(window());
        let log = Log::default();

        debouncer.schedule(1, push(&log, "first"));
        tokio::time::sleep(Duration::from_millis(10)).await;
        debouncer.schedule(1, push(&log, "second"));
        tokio::time::sleep(Duration::from_millis(10)).await;
        debouncer.schedule(1, push(&log, "third"));

        debouncer.drain().await;
        assert_eq!(*log.lock().unwrap(), vec!["third"]);
        assert_eq!(debouncer.pending_count(), 0);
    }

    #[tokio::test]
    async fn tickets_are_independent() {
        let debouncer = Debouncer::new(window());
        let log = Log::default();

        debouncer.schedule(1, push(&log, "a"));
        debouncer.schedule(2, push(&log, "b"));
        debouncer.drain().await;

        let mut seen = log.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn calls_after_the_window_run_again() {
        let debouncer = Debouncer::new(window());
        let log = Log::default();

        debouncer.schedule(1, push(&log, "a"));
        debouncer.drain().await;
        debouncer.schedule(1, push(&log, "b"));
        debouncer.drain().await;
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn cancel_all_drops_pending() {
        let debouncer = Debouncer::new(window());
        let log = Log::default();

        debouncer.schedule(1, push(&log, "a"));
        debouncer.cancel_all();
        debouncer.drain().await;
        assert!(log.lock().unwrap().is_empty());
    }
}
