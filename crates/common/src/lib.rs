//! Zypin Selenium Common Library
//!
//! Shared types, configuration resolution and file discovery for the
//! Zypin Selenium plugin.

pub mod config;
pub mod discovery;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{ConfigLayer, ConfigResolver, ProjectManifest, ValidatedConfig};
pub use discovery::{discover, validate_files, DiscoveryOptions, FileValidation};
pub use error::{Error, Result};
pub use types::*;

/// Plugin version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default directory for the downloaded Grid JAR, under the given home directory
pub fn default_jar_dir(home: Option<std::path::PathBuf>) -> std::path::PathBuf {
    home.unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".zypin")
        .join("selenium")
        .join("lib")
}
