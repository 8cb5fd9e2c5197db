//! Error types for Grid lifecycle and test execution

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Failed to spawn {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("Selenium is already running")]
    AlreadyRunning,

    #[error("Selenium start timeout after {seconds} seconds")]
    StartupTimeout { seconds: u64 },

    #[error("Selenium exited before becoming ready ({0})")]
    ExitedEarly(String),

    #[error("Java is not installed or not in PATH")]
    JavaMissing,

    #[error("Java {version} found, but Java {required} or higher is required")]
    JavaTooOld { version: String, required: u32 },

    #[error("Failed to download Selenium JAR from {url}: {reason}")]
    JarDownload { url: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Common(#[from] zypin_selenium_common::Error),
}

impl GridError {
    /// Environment problems the user fixes outside this tool
    pub fn is_environment(&self) -> bool {
        matches!(
            self,
            GridError::JavaMissing | GridError::JavaTooOld { .. } | GridError::JarDownload { .. }
        )
    }

    /// Remediation hint shown next to the error, if any
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            GridError::JavaMissing => Some("Please install Java 11 or higher: https://adoptium.net/"),
            GridError::JavaTooOld { .. } => Some("Please upgrade Java: https://adoptium.net/"),
            GridError::JarDownload { .. } => Some("Check your network connection or place the JAR in the jar directory"),
            GridError::AlreadyRunning => Some("Stop the running Grid or choose another --port"),
            GridError::StartupTimeout { .. } => Some("Run with --debug to see Selenium output"),
            _ => None,
        }
    }
}

pub type GridResult<T> = Result<T, GridError>;
