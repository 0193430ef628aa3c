//! Unbounded FIFO queue with blocking dequeue and an explicit close signal
//! (§4.2), grounded on the teacher's thread-per-worker concurrency style and
//! on `safe_queue.h`'s close()/is_closed() shape from the original source.
//! `std::sync::mpsc` has no native close, so closing is layered on with an
//! `AtomicBool` plus a sentinel wakeup.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

/// Producer handle. Enqueue never blocks (§5) — `mpsc::Sender::send` only
/// fails if every receiver has been dropped, which for a shard queue means
/// the worker has already exited.
#[derive(Clone)]
pub struct QueueProducer<T> {
    tx: Sender<T>,
    closed: Arc<AtomicBool>,
}

impl<T> QueueProducer<T> {
    /// Enqueues `item`. Silently drops it if the queue has been closed or
    /// the worker side is gone — matches the "no draining guarantee at
    /// shutdown" semantics in §5.
    pub fn push(&self, item: T) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let _ = self.tx.send(item);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Consumer handle, owned exclusively by one Shard Worker.
pub struct QueueConsumer<T> {
    rx: Receiver<T>,
    closed: Arc<AtomicBool>,
}

impl<T> QueueConsumer<T> {
    /// Blocks until an item is available, the queue closes, or `poll`
    /// elapses without an item — whichever comes first. Returns `None` once
    /// the queue is closed and fully drained.
    pub fn pop(&self, poll: Duration) -> Option<T> {
        loop {
            match self.rx.recv_timeout(poll) {
                Ok(item) => return Some(item),
                Err(RecvTimeoutError::Timeout) => {
                    if self.closed.load(Ordering::Acquire) {
                        // Drain whatever arrived between the timeout and the
                        // close flag being observed, then stop.
                        match self.rx.try_recv() {
                            Ok(item) => return Some(item),
                            Err(_) => return None,
                        }
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

pub fn closable_queue<T>() -> (QueueProducer<T>, QueueConsumer<T>, Arc<AtomicBool>) {
    let (tx, rx) = mpsc::channel();
    let closed = Arc::new(AtomicBool::new(false));
    (
        QueueProducer {
            tx,
            closed: closed.clone(),
        },
        QueueConsumer {
            rx,
            closed: closed.clone(),
        },
        closed,
    )
}

/// Signals close to both ends; the consumer observes this on its next poll
/// timeout and exits once drained.
pub fn close(closed: &AtomicBool) {
    closed.store(true, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn producer_never_blocks_and_consumer_drains_fifo() {
        let (tx, rx, _closed) = closable_queue::<u32>();
        tx.push(1);
        tx.push(2);
        tx.push(3);
        assert_eq!(rx.pop(Duration::from_millis(10)), Some(1));
        assert_eq!(rx.pop(Duration::from_millis(10)), Some(2));
        assert_eq!(rx.pop(Duration::from_millis(10)), Some(3));
    }

    #[test]
    fn closed_queue_drains_then_returns_none() {
        let (tx, rx, closed) = closable_queue::<u32>();
        tx.push(1);
        close(&closed);
        assert!(tx.is_closed());
        assert_eq!(rx.pop(Duration::from_millis(50)), Some(1));
        assert_eq!(rx.pop(Duration::from_millis(50)), None);
    }

    #[test]
    fn push_after_close_is_dropped() {
        let (tx, rx, closed) = closable_queue::<u32>();
        close(&closed);
        tx.push(1);
        assert_eq!(rx.pop(Duration::from_millis(50)), None);
    }
}
