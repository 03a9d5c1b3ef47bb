pub mod config;
pub mod logging;

pub mod checksum;
pub mod error;
pub mod filter;
pub mod local;
pub mod multipart;
pub mod planner;
pub mod queue;
pub mod retry;
pub mod scheduler;
pub mod store;
pub mod sync;
pub mod upload;
pub mod verify;

pub use error::{SyncError, VerifyError};
