//! Cooperative cancellation.
//!
//! A [`CancellationToken`] is owned by whoever bounds an operation (a timeout,
//! or the caller of a pipeline run) and observed by the work underneath it.

mod token;

pub use token::{CancelCallback, CancellationToken};
