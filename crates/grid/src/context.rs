//! Explicit invocation context
//!
//! Everything a component would otherwise read from the ambient process
//! (working directory, environment, debug flag, executable locations) is
//! captured once by the entry point and threaded through as a [`RunContext`].

use std::collections::BTreeMap;
use std::path::PathBuf;

/// External executables the plugin launches
#[derive(Debug, Clone)]
pub struct Programs {
    pub java: PathBuf,
    pub node: PathBuf,
    pub npx: PathBuf,
}

impl Default for Programs {
    fn default() -> Self {
        Self {
            java: PathBuf::from("java"),
            node: PathBuf::from("node"),
            npx: PathBuf::from("npx"),
        }
    }
}

/// Per-invocation context handed to every component
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Project directory: holds `package.json`, children run here
    pub cwd: PathBuf,
    /// Echo subprocess output and list discovered files
    pub debug: bool,
    /// Environment inherited by child processes
    pub env: BTreeMap<String, String>,
    /// Where the Grid JAR lives (downloaded on first start)
    pub jar_dir: PathBuf,
    pub programs: Programs,
}

impl RunContext {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        let cwd = cwd.into();
        Self {
            jar_dir: cwd.join("lib"),
            cwd,
            debug: false,
            env: BTreeMap::new(),
            programs: Programs::default(),
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_env(mut self, env: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env = env.into_iter().collect();
        self
    }

    pub fn with_jar_dir(mut self, jar_dir: impl Into<PathBuf>) -> Self {
        self.jar_dir = jar_dir.into();
        self
    }

    pub fn with_programs(mut self, programs: Programs) -> Self {
        self.programs = programs;
        self
    }
}

