use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use kanal::{AsyncReceiver, Receiver, Sender};
use tokio::sync::Notify;
use tracing::trace;

use crate::generator::{Generator, LoopInt};

/// A single iteration step: the value plus the capability to cancel the
/// iteration it came from.
#[derive(Clone)]
pub struct Item<T: LoopInt> {
    /// The iteration value.
    pub value: T,
    breaker: Breaker<T>,
}

impl<T: LoopInt> Item<T> {
    /// Cancels the iteration this item came from and returns once the
    /// producer has stopped. Calling it again, or from several threads at
    /// once, is a no-op.
    pub fn cancel(&self) {
        self.breaker.cancel();
    }

    /// A handle that can cancel the iteration from another thread.
    pub fn breaker(&self) -> Breaker<T> {
        self.breaker.clone()
    }
}

/// One-shot cancellation handle for a blocking range iteration.
#[derive(Clone)]
pub struct Breaker<T: LoopInt> {
    cancelled: Arc<AtomicBool>,
    drain: Receiver<Item<T>>,
}

impl<T: LoopInt> Breaker<T> {
    /// Signals the producer to stop and discards any value already in
    /// flight. Only the first invocation does the work; it returns once the
    /// producer has closed the value channel, so no value can reach the
    /// consumer after this call completes.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        trace!("loop cancelled, draining in-flight values");
        while self.drain.recv().is_ok() {}
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Producer-side half of the rendezvous handoff.
pub(crate) struct Handoff<T: LoopInt> {
    tx: Sender<Item<T>>,
    breaker: Breaker<T>,
}

impl<T: LoopInt> Handoff<T> {
    pub(crate) fn new() -> (Self, Receiver<Item<T>>) {
        let (tx, rx) = kanal::bounded(0);
        let breaker = Breaker {
            cancelled: Arc::new(AtomicBool::new(false)),
            drain: rx.clone(),
        };
        (Handoff { tx, breaker }, rx)
    }

    /// Offers one value to the consumer, blocking until it is taken.
    /// Returns true once the iteration has been cancelled and the producer
    /// should stop.
    pub(crate) fn offer(&self, value: T) -> bool {
        if self.breaker.is_cancelled() {
            return true;
        }
        let item = Item {
            value,
            breaker: self.breaker.clone(),
        };
        self.tx.send(item).is_err()
    }

    /// Closes the value channel; consumers observe end-of-sequence.
    pub(crate) fn finish(self) {
        drop(self.tx);
    }
}

/// Blocking cancellable iteration over a progression, backed by a producer
/// thread and a rendezvous channel.
///
/// Dropping the iterator cancels the iteration and joins the producer, so
/// breaking out of a `for` loop releases the producer thread on its own.
pub struct RangeIter<T: LoopInt> {
    rx: Receiver<Item<T>>,
    breaker: Breaker<T>,
    producer: Option<JoinHandle<()>>,
}

impl<T: LoopInt> RangeIter<T> {
    /// Cancels the iteration without consuming it.
    pub fn cancel(&self) {
        self.breaker.cancel();
    }
}

impl<T: LoopInt> Iterator for RangeIter<T> {
    type Item = Item<T>;

    fn next(&mut self) -> Option<Item<T>> {
        self.rx.recv().ok()
    }
}

impl<T: LoopInt> Drop for RangeIter<T> {
    fn drop(&mut self) {
        self.breaker.cancel();
        if let Some(producer) = self.producer.take() {
            let _ = producer.join();
        }
    }
}

pub(crate) fn spawn_range<T, G>(mut gen: G) -> RangeIter<T>
where
    T: LoopInt,
    G: Generator<T> + Send + 'static,
{
    let (handoff, rx) = Handoff::new();
    let breaker = handoff.breaker.clone();
    let producer = thread::spawn(move || {
        while gen.advance() {
            if handoff.offer(gen.current()) {
                trace!("cancellation observed, producer stopping");
                break;
            }
        }
        handoff.finish();
    });
    RangeIter {
        rx,
        breaker,
        producer: Some(producer),
    }
}

/// A single step of a task-backed iteration.
#[derive(Clone)]
pub struct AsyncItem<T: LoopInt> {
    /// The iteration value.
    pub value: T,
    breaker: AsyncBreaker<T>,
}

impl<T: LoopInt> AsyncItem<T> {
    /// Cancels the iteration this item came from and returns once the
    /// producer task has stopped sending.
    pub async fn cancel(&self) {
        self.breaker.cancel().await;
    }

    /// A handle that can cancel the iteration from another task.
    pub fn breaker(&self) -> AsyncBreaker<T> {
        self.breaker.clone()
    }
}

/// One-shot cancellation handle for a task-backed range iteration.
#[derive(Clone)]
pub struct AsyncBreaker<T: LoopInt> {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
    drain: AsyncReceiver<AsyncItem<T>>,
}

impl<T: LoopInt> AsyncBreaker<T> {
    /// Signals the producer task to stop and discards any value already in
    /// flight. Redundant invocations, concurrent ones included, return
    /// immediately.
    pub async fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.notify.notify_one();
        trace!("async loop cancelled, draining in-flight values");
        while self.drain.recv().await.is_ok() {}
    }

    /// Flags cancellation without waiting for the producer to wind down.
    /// The producer observes the signal at its next send attempt.
    fn trip(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            self.notify.notify_one();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Task-backed cancellable iteration over a progression.
pub struct AsyncRangeIter<T: LoopInt> {
    rx: AsyncReceiver<AsyncItem<T>>,
    breaker: AsyncBreaker<T>,
    producer: Option<tokio::task::JoinHandle<()>>,
}

impl<T: LoopInt> AsyncRangeIter<T> {
    /// Receives the next step, or None once the sequence ends.
    pub async fn next(&mut self) -> Option<AsyncItem<T>> {
        self.rx.recv().await.ok()
    }

    /// Flags cancellation without waiting for the producer task to stop.
    pub fn cancel(&self) {
        self.breaker.trip();
    }

    /// Cancels the iteration and waits until the producer task has fully
    /// terminated.
    pub async fn shutdown(mut self) {
        self.breaker.trip();
        if let Some(producer) = self.producer.take() {
            let _ = producer.await;
        }
    }
}

impl<T: LoopInt> Drop for AsyncRangeIter<T> {
    fn drop(&mut self) {
        // Wakes a producer blocked on a send; the task then exits on its own.
        self.breaker.trip();
    }
}

/// Spawns the producer task. Must be called within a Tokio runtime.
pub(crate) fn spawn_range_async<T, G>(mut gen: G) -> AsyncRangeIter<T>
where
    T: LoopInt,
    G: Generator<T> + Send + 'static,
{
    let (tx, rx) = kanal::bounded_async(0);
    let breaker = AsyncBreaker {
        cancelled: Arc::new(AtomicBool::new(false)),
        notify: Arc::new(Notify::new()),
        drain: rx.clone(),
    };
    let handoff = breaker.clone();
    let producer = tokio::spawn(async move {
        while gen.advance() {
            if handoff.is_cancelled() {
                break;
            }
            let item = AsyncItem {
                value: gen.current(),
                breaker: handoff.clone(),
            };
            tokio::select! {
                _ = handoff.notify.notified() => {
                    trace!("cancellation observed, async producer stopping");
                    break;
                }
                sent = tx.send(item) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
    });
    AsyncRangeIter {
        rx,
        breaker,
        producer: Some(producer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::IntGen;

    fn handoff_run(values: &[i8], breakpoint: Option<i8>) -> Vec<i8> {
        let (handoff, rx) = Handoff::new();
        let consumer = thread::spawn(move || {
            let mut got = Vec::new();
            while let Ok(item) = rx.recv() {
                got.push(item.value);
                if breakpoint == Some(item.value) {
                    item.cancel();
                }
            }
            got
        });
        for &value in values {
            if handoff.offer(value) {
                break;
            }
        }
        handoff.finish();
        consumer.join().unwrap()
    }

    #[test]
    fn handoff_delivers_everything_without_a_break() {
        assert_eq!(handoff_run(&[], None), Vec::<i8>::new());
        assert_eq!(handoff_run(&[], Some(3)), Vec::<i8>::new());
        assert_eq!(handoff_run(&[-1, 0, 1, 2], None), vec![-1, 0, 1, 2]);
        assert_eq!(handoff_run(&[1, 0, -1], None), vec![1, 0, -1]);
    }

    #[test]
    fn break_truncates_at_the_breakpoint() {
        assert_eq!(handoff_run(&[-1, 0, 1, 2], Some(-1)), vec![-1]);
        assert_eq!(handoff_run(&[-1, 0, 1, 2], Some(0)), vec![-1, 0]);
        assert_eq!(handoff_run(&[-1, 0, 1, 2], Some(1)), vec![-1, 0, 1]);
        assert_eq!(handoff_run(&[1, 0, -1], Some(0)), vec![1, 0]);
    }

    #[test]
    fn break_on_the_final_or_an_absent_value_changes_nothing() {
        assert_eq!(handoff_run(&[-1, 0, 1, 2], Some(2)), vec![-1, 0, 1, 2]);
        assert_eq!(handoff_run(&[-1, 0, 1, 2], Some(-2)), vec![-1, 0, 1, 2]);
        assert_eq!(handoff_run(&[-1, 0, 1, 2], Some(9)), vec![-1, 0, 1, 2]);
        assert_eq!(handoff_run(&[1, 0, -1], Some(-1)), vec![1, 0, -1]);
    }

    #[test]
    fn redundant_cancel_is_absorbed() {
        let mut iter = spawn_range(IntGen::unit(0i64, 5));
        let first = iter.next().unwrap();
        let other = first.breaker();
        first.cancel();
        first.cancel();
        other.cancel();
        iter.cancel();
        assert!(iter.next().is_none());
    }

    #[test]
    fn cancel_terminates_the_producer_thread() {
        let mut iter = spawn_range(IntGen::unit(0u8, 255));
        let item = iter.next().unwrap();
        assert_eq!(item.value, 0);
        item.cancel();
        let producer = iter.producer.take().unwrap();
        producer.join().unwrap();
        assert!(iter.next().is_none());
    }

    #[test]
    fn dropping_mid_iteration_releases_the_producer() {
        let mut iter = spawn_range(IntGen::unit(0i64, i64::MAX));
        let first = iter.next().unwrap();
        assert_eq!(first.value, 0);
        drop(iter);
    }

    #[test]
    fn no_leak_with_concurrent_cancels() {
        for _ in 0..200 {
            let mut iter = spawn_range(IntGen::unit(0u8, 255));
            let mut cancellers = Vec::new();
            while let Some(item) = iter.next() {
                if item.value % 2 == 0 {
                    let breaker = item.breaker();
                    cancellers.push(thread::spawn(move || breaker.cancel()));
                }
            }
            for canceller in cancellers {
                canceller.join().unwrap();
            }
            let producer = iter.producer.take().unwrap();
            producer.join().unwrap();
        }
    }

    #[tokio::test]
    async fn async_range_delivers_in_order() {
        let mut iter = spawn_range_async(IntGen::unit(0i64, 4));
        let mut got = Vec::new();
        while let Some(item) = iter.next().await {
            got.push(item.value);
        }
        assert_eq!(got, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn async_cancel_truncates_and_stops_the_task() {
        let mut iter = spawn_range_async(IntGen::unit(0i64, i64::MAX));
        let mut got = Vec::new();
        while let Some(item) = iter.next().await {
            got.push(item.value);
            if item.value == 3 {
                item.cancel().await;
            }
        }
        assert_eq!(got, vec![0, 1, 2, 3]);
        let producer = iter.producer.take().unwrap();
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn async_redundant_cancel_is_absorbed() {
        let mut iter = spawn_range_async(IntGen::unit(0u8, 200));
        let item = iter.next().await.unwrap();
        let breaker = item.breaker();
        item.cancel().await;
        item.cancel().await;
        breaker.cancel().await;
        iter.shutdown().await;
    }

    #[tokio::test]
    async fn async_shutdown_waits_for_the_task() {
        let iter = spawn_range_async(IntGen::unit(0i64, i64::MAX));
        iter.shutdown().await;
    }
}
