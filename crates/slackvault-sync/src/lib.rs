pub mod archive;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetcher;
pub mod media;
pub mod threads;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use archive::{ArchiveSummary, run_archive};
pub use config::ArchiveConfig;
pub use controller::SyncController;
pub use error::SyncError;
