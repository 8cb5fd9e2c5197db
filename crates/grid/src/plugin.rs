//! Host-facing plugin surface

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use zypin_selenium_common::{ConfigLayer, ConfigResolver, HealthReport, RunSummary, TemplateKind};

use crate::context::RunContext;
use crate::error::GridResult;
use crate::health::{HealthProbe, DEFAULT_HEALTH_PORT, DEFAULT_HEALTH_TIMEOUT};
use crate::java::JavaLocator;
use crate::runner::Runner;
use crate::server::{GridProcess, GridServer};

pub const PLUGIN_NAME: &str = "selenium";
pub const PLUGIN_DESCRIPTION: &str = "Selenium Grid integration for web testing";

/// Static description of a plugin
#[derive(Debug, Clone, Serialize)]
pub struct PluginMetadata {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub templates: Vec<TemplateKind>,
}

/// A process the host should track and clean up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedProcess {
    pub name: String,
    pub pid: Option<u32>,
}

/// Host-side registry of long-lived processes started by plugins
pub trait ProcessManager: Send {
    fn register(&mut self, name: &str, pid: Option<u32>);
}

/// In-memory [`ProcessManager`]
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    processes: Vec<ManagedProcess>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn processes(&self) -> &[ManagedProcess] {
        &self.processes
    }
}

impl ProcessManager for ProcessRegistry {
    fn register(&mut self, name: &str, pid: Option<u32>) {
        info!("Registered process {} (pid: {:?})", name, pid);
        self.processes.push(ManagedProcess {
            name: name.to_string(),
            pid,
        });
    }
}

/// Operations a test-framework plugin exposes to the host
#[async_trait]
pub trait Plugin: Send + Sync {
    fn metadata(&self) -> PluginMetadata;

    /// Start the backing service. `Ok(None)` means the environment is not
    /// ready (Java missing or too old, JAR unavailable) and the user was told why.
    async fn start(
        &self,
        manager: &mut dyn ProcessManager,
        config: &ConfigLayer,
    ) -> GridResult<Option<GridProcess>>;

    /// Run tests. Never fails: problems are reported in the summary.
    async fn run(&self, inputs: &[PathBuf], params: &ConfigLayer) -> RunSummary;

    /// Probe the backing service
    async fn health(&self, config: &ConfigLayer) -> HealthReport;
}

/// The Selenium Grid plugin
pub struct SeleniumPlugin {
    ctx: RunContext,
}

impl SeleniumPlugin {
    pub fn new(ctx: RunContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Plugin for SeleniumPlugin {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata {
            name: PLUGIN_NAME,
            version: crate::VERSION,
            description: PLUGIN_DESCRIPTION,
            templates: TemplateKind::ALL.to_vec(),
        }
    }

    async fn start(
        &self,
        manager: &mut dyn ProcessManager,
        config: &ConfigLayer,
    ) -> GridResult<Option<GridProcess>> {
        let config = ConfigResolver::resolve(&ConfigResolver::builtin_defaults(), &ConfigLayer::new(), config);

        match GridServer::new(&self.ctx).start(&config).await {
            Ok(process) => {
                manager.register(PLUGIN_NAME, process.pid);
                Ok(Some(process))
            }
            Err(e) if e.is_environment() => {
                error!("❌ {}", e);
                if let Some(hint) = e.remediation() {
                    info!("   {}", hint);
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn run(&self, inputs: &[PathBuf], params: &ConfigLayer) -> RunSummary {
        Runner::new(self.ctx.clone()).run(inputs, params).await
    }

    async fn health(&self, config: &ConfigLayer) -> HealthReport {
        let port = config
            .get("port")
            .and_then(Value::as_u64)
            .and_then(|p| u16::try_from(p).ok())
            .unwrap_or(DEFAULT_HEALTH_PORT);
        let timeout = config
            .get("timeout")
            .and_then(Value::as_u64)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_HEALTH_TIMEOUT);

        HealthProbe::new(JavaLocator::new(&self.ctx.programs.java))
            .probe(port, timeout)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata() {
        let plugin = SeleniumPlugin::new(RunContext::new("."));
        let metadata = plugin.metadata();
        assert_eq!(metadata.name, "selenium");
        assert_eq!(metadata.description, "Selenium Grid integration for web testing");
        assert_eq!(
            metadata.templates,
            vec![TemplateKind::BasicWebdriver, TemplateKind::CucumberBdd]
        );
    }

    #[test]
    fn test_registry_records_processes() {
        let mut registry = ProcessRegistry::new();
        registry.register("selenium", Some(4242));
        assert_eq!(
            registry.processes(),
            &[ManagedProcess {
                name: "selenium".to_string(),
                pid: Some(4242)
            }]
        );
    }

    #[tokio::test]
    async fn test_start_without_java_is_not_an_error() {
        let ctx = RunContext::new(".").with_programs(crate::context::Programs {
            java: "/nonexistent/bin/java".into(),
            ..Default::default()
        });
        let plugin = SeleniumPlugin::new(ctx);
        let mut registry = ProcessRegistry::new();

        let started = plugin.start(&mut registry, &ConfigLayer::new()).await.unwrap();
        assert!(started.is_none());
        assert!(registry.processes().is_empty());
    }
}
