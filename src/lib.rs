// Public modules
pub mod archive;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod download;
pub mod error;
pub mod install;
pub mod models;
pub mod output;
pub mod platform;
pub mod shell;
pub mod version;

// Re-export commonly used types
pub use error::{InstallerError, InstallerResult};
pub use models::*;
