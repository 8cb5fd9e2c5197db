//! Zypin Selenium Grid plugin
//!
//! Starts a local Selenium Grid, checks its health and runs browser tests
//! through one of the supported templates.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use zypin_selenium::{RunContext, Runner};
//! use zypin_selenium_common::ConfigLayer;
//!
//! # async fn example() {
//! let ctx = RunContext::new("/path/to/project").with_env(std::env::vars());
//! let summary = Runner::new(ctx)
//!     .run(&[PathBuf::from("tests")], &ConfigLayer::new())
//!     .await;
//! println!("{} of {} passed", summary.tests_passed, summary.tests_run);
//! # }
//! ```

pub mod context;
pub mod error;
pub mod health;
pub mod jar;
pub mod java;
pub mod plugin;
pub mod runner;
pub mod server;
pub mod supervisor;
pub mod templates;

pub use context::{Programs, RunContext};
pub use error::{GridError, GridResult};
pub use health::HealthProbe;
pub use java::JavaLocator;
pub use plugin::{Plugin, PluginMetadata, ProcessManager, ProcessRegistry, SeleniumPlugin};
pub use runner::Runner;
pub use server::{GridProcess, GridServer};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
