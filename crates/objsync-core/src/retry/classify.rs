//! Classify store errors (and the I/O errors a store may hit) for retry decisions.

use std::io;

use super::error::{StoreError, StoreErrorKind};
use super::policy::ErrorKind;

/// Classify a store error into a retry [`ErrorKind`].
pub fn classify(e: &StoreError) -> ErrorKind {
    match e.kind {
        StoreErrorKind::Transient => ErrorKind::Transient,
        StoreErrorKind::Permanent | StoreErrorKind::NotFound => ErrorKind::Fatal,
    }
}

/// Map an I/O error raised inside a store implementation onto a store error kind.
pub fn kind_for_io(e: &io::Error) -> StoreErrorKind {
    match e.kind() {
        io::ErrorKind::NotFound => StoreErrorKind::NotFound,
        io::ErrorKind::Interrupted | io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
            StoreErrorKind::Transient
        }
        _ => StoreErrorKind::Permanent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_is_retryable() {
        assert_eq!(classify(&StoreError::transient("503")), ErrorKind::Transient);
    }

    #[test]
    fn permanent_and_not_found_are_fatal() {
        assert_eq!(classify(&StoreError::permanent("403")), ErrorKind::Fatal);
        assert_eq!(classify(&StoreError::not_found("k")), ErrorKind::Fatal);
    }

    #[test]
    fn io_kinds() {
        let nf = io::Error::new(io::ErrorKind::NotFound, "x");
        assert_eq!(kind_for_io(&nf), StoreErrorKind::NotFound);
        let to = io::Error::new(io::ErrorKind::TimedOut, "x");
        assert_eq!(kind_for_io(&to), StoreErrorKind::Transient);
        let pd = io::Error::new(io::ErrorKind::PermissionDenied, "x");
        assert_eq!(kind_for_io(&pd), StoreErrorKind::Permanent);
    }
}
