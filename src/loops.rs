use std::thread::{self, JoinHandle};

use kanal::{bounded, Receiver};

use crate::generator::{Generator, IntGen, LoopInt, RangeError};
use crate::iterator::{spawn_range, spawn_range_async, AsyncRangeIter, RangeIter};

/// Lazy `0..times` sequence backed by a producer thread.
///
/// Values are plain integers with no cancellation capability; dropping the
/// sequence stops the producer.
pub struct Repeat {
    rx: Option<Receiver<i64>>,
    producer: Option<JoinHandle<()>>,
}

impl Iterator for Repeat {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        self.rx.as_ref()?.recv().ok()
    }
}

impl Drop for Repeat {
    fn drop(&mut self) {
        // Dropping the receiver fails the producer's next send.
        self.rx.take();
        if let Some(producer) = self.producer.take() {
            let _ = producer.join();
        }
    }
}

/// Produces `0, 1, ..., times - 1` one value at a time. No values are
/// produced if `times` is not greater than 0.
///
/// # Example
/// ```
/// use rangeloop::loops::repeat;
/// let got: Vec<i64> = repeat(3).collect();
/// assert_eq!(got, vec![0, 1, 2]);
/// ```
pub fn repeat(times: i64) -> Repeat {
    let (tx, rx) = bounded(0);
    let producer = thread::spawn(move || {
        for i in 0..times {
            if tx.send(i).is_err() {
                // Consumer is gone; stop producing.
                break;
            }
        }
    });
    Repeat {
        rx: Some(rx),
        producer: Some(producer),
    }
}

/// The cancellable form of [`repeat`]: every delivered item carries a cancel
/// handle.
///
/// # Example
/// ```
/// use rangeloop::loops::repeat_with_break;
/// let mut got = Vec::new();
/// for item in repeat_with_break(50) {
///     got.push(item.value);
///     if item.value == 1 {
///         item.cancel();
///     }
/// }
/// assert_eq!(got, vec![0, 1]);
/// ```
pub fn repeat_with_break(times: i64) -> RangeIter<i64> {
    let mut iter = range(0, times.saturating_sub(1));
    if times <= 0 {
        // The underlying range would count downward; consume its first value
        // and cancel so the caller sees an already-closed sequence.
        if let Some(item) = iter.next() {
            item.cancel();
        }
    }
    iter
}

/// Lazy unit-step progression from `start` to `stop` inclusive, counting in
/// whichever direction reaches `stop`. When start equals stop the sequence
/// is the single value start.
pub fn range<T: LoopInt>(start: T, stop: T) -> RangeIter<T> {
    spawn_range(IntGen::unit(start, stop))
}

/// Lazy progression with an explicit step magnitude.
///
/// The step must be greater than zero; the direction is inferred from
/// `start` vs `stop`. A cadence point past `stop`, or one that would wrap
/// the integer type, ends the sequence.
///
/// # Example
/// ```
/// use rangeloop::loops::range_by;
/// let mut got = Vec::new();
/// for item in range_by(3i64, 26, 5).unwrap() {
///     got.push(item.value);
///     if item.value == 18 {
///         item.cancel();
///     }
/// }
/// assert_eq!(got, vec![3, 8, 13, 18]);
/// ```
pub fn range_by<T: LoopInt>(start: T, stop: T, step: T) -> Result<RangeIter<T>, RangeError> {
    Ok(spawn_range(IntGen::new(start, stop, step)?))
}

/// Lazy progression with a signed step offset.
///
/// A step pointing away from `stop` can never terminate, so it is rejected
/// with [`RangeError::InfiniteLoop`] before any value is produced. As with
/// the other forms, the step is ignored when start equals stop.
pub fn range_step(start: i64, stop: i64, step: i64) -> Result<RangeIter<i64>, RangeError> {
    Ok(spawn_range(signed_gen(start, stop, step)?))
}

fn signed_gen(start: i64, stop: i64, step: i64) -> Result<IntGen<i64>, RangeError> {
    if start == stop {
        return IntGen::new(start, stop, 1);
    }
    if step == 0 {
        return Err(RangeError::NonPositiveStep {
            start: start.to_string(),
            stop: stop.to_string(),
            step: step.to_string(),
        });
    }
    if (step > 0) != (start < stop) {
        return Err(RangeError::InfiniteLoop {
            start: start.to_string(),
            stop: stop.to_string(),
            step: step.to_string(),
        });
    }
    let magnitude = step.checked_abs().ok_or_else(|| RangeError::StepOutOfRange {
        step: step.to_string(),
    })?;
    IntGen::new(start, stop, magnitude)
}

/// Eagerly collects the unit-step progression into a `Vec`.
///
/// # Example
/// ```
/// use rangeloop::loops::range_to_vec;
/// assert_eq!(range_to_vec(250u8, 255), vec![250, 251, 252, 253, 254, 255]);
/// ```
pub fn range_to_vec<T: LoopInt>(start: T, stop: T) -> Vec<T> {
    materialize(IntGen::unit(start, stop))
}

/// Eagerly collects the progression with an explicit step magnitude.
pub fn range_to_vec_by<T: LoopInt>(start: T, stop: T, step: T) -> Result<Vec<T>, RangeError> {
    Ok(materialize(IntGen::new(start, stop, step)?))
}

fn materialize<T: LoopInt>(mut gen: IntGen<T>) -> Vec<T> {
    let mut values = Vec::new();
    while gen.advance() {
        values.push(gen.current());
    }
    values
}

/// Task-backed form of [`range`]. Must be called within a Tokio runtime.
pub fn range_async<T: LoopInt>(start: T, stop: T) -> AsyncRangeIter<T> {
    spawn_range_async(IntGen::unit(start, stop))
}

/// Task-backed form of [`range_by`]. Must be called within a Tokio runtime.
pub fn range_by_async<T: LoopInt>(
    start: T,
    stop: T,
    step: T,
) -> Result<AsyncRangeIter<T>, RangeError> {
    Ok(spawn_range_async(IntGen::new(start, stop, step)?))
}
