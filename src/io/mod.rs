// CSV/JSON import-export and directory backups.

pub mod backup;
mod export;
mod import;

pub use backup::{BackupResult, backup, directory_size};
pub use export::*;
pub use import::*;
