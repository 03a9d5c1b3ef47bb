//! Retry and backoff policy.
//!
//! Every remote-store call goes through [`run_with_retry`]. Store errors are
//! classified as transient (retried with linear backoff) or fatal (returned
//! unchanged). Nothing else in the engine retries.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, kind_for_io};
pub use error::{StoreError, StoreErrorKind};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
