//! Basic Google Drive operations over the Drive v3 REST API: upload,
//! download, list files and folders, create folders and resolve files by name.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod google_drive;

pub use error::{DriveError, UsageError};
