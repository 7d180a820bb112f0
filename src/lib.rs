//! # Range Loop Library
//!
//! This library provides cancellable, lazily produced integer progressions that are consumed
//! through standard Rust iteration. A progression runs on its own producer thread (or Tokio
//! task) and hands values to the consumer one at a time over a rendezvous channel; every
//! delivered value carries a capability to cancel the whole iteration, after which the
//! producer stops promptly and its resources are released deterministically.
//!
//! ## Key Features
//! - **Any integer width**: Progressions are generic over every primitive signed and unsigned
//!   integer type, using checked arithmetic so overflow ends a sequence instead of wrapping.
//! - **Inclusive stop**: A progression covers every point of the step cadence up to and
//!   including `stop` when the cadence lands on it exactly.
//! - **Cancellation**: Each delivered item carries an idempotent cancel handle that is safe
//!   to invoke many times, from many threads, concurrently.
//! - **No producer leak**: Whether a sequence is drained to exhaustion, broken out of early,
//!   or cancelled from several threads at once, the producer always terminates.
//! - **Concurrency**: The blocking form runs on `std::thread` with `kanal` channels; an
//!   asynchronous form runs the same contract on a Tokio task.
//!
//! ## Overview of Functions
//!
//! ### Errors
//! - `RangeError`: Enum representing the conditions rejected at construction time, such as a
//!   non-positive step, a step whose direction can never reach `stop`, or a step magnitude
//!   that does not fit the integer type.
//!
//! ### Entry Points
//!
//! #### `repeat`
//! Produces `0, 1, ..., times - 1` lazily over a channel, with no cancel capability. An empty
//! sequence when `times` is not greater than 0.
//!
//! #### `repeat_with_break`
//! The cancellable form of `repeat`; every item carries a cancel handle.
//!
//! #### `range` / `range_by`
//! Lazy progression from `start` towards `stop` over any integer width. `range` uses a unit
//! step; `range_by` takes a positive step magnitude, with the direction inferred from the
//! bounds.
//!
//! #### `range_step`
//! Variant taking a signed step offset, validated against the direction implied by the
//! bounds.
//!
//! #### `range_to_vec` / `range_to_vec_by`
//! Eager variants collecting the whole progression into a `Vec` with no background producer.
//!
//! #### `range_async` / `range_by_async`
//! Task-backed variants of `range` / `range_by` for use inside a Tokio runtime.
//!
//! ## Usage Example
//! ```rust
//! use rangeloop::loops::range_by;
//!
//! let mut seen = Vec::new();
//! for item in range_by(3i64, 26, 5).unwrap() {
//!     seen.push(item.value);
//!     if item.value == 18 {
//!         item.cancel();
//!     }
//! }
//! assert_eq!(seen, vec![3, 8, 13, 18]);
//! ```

pub mod generator;
pub mod iterator;
pub mod loops;
