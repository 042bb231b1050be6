//! Cooperative cancellation.
//!
//! A [`CancellationToken`] is the cancellation source wrapped by every
//! [`ExecutionContext`](crate::context::ExecutionContext).

mod token;

pub use token::{CancelCallback, CancellationToken};
