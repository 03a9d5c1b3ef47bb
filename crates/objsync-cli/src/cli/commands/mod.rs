//! CLI command handlers, one file per command.

mod checksum;
mod hash;
mod list;
mod sync;
mod verify;
mod verify_dir;

pub use checksum::run_checksum;
pub use hash::run_hash;
pub use list::run_list;
pub use sync::{run_sync, SyncArgs};
pub use verify::run_verify;
pub use verify_dir::run_verify_dir;
