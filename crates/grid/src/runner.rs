//! Test run orchestration

use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use zypin_selenium_common::{ConfigLayer, ConfigResolver, ProjectManifest, Result, RunSummary};

use crate::context::RunContext;
use crate::templates;

/// File name used by [`Runner::write_summary`]
pub const SUMMARY_FILE: &str = "zypin-results.json";

/// Detects the project's template, resolves configuration and runs the tests
pub struct Runner {
    ctx: RunContext,
}

impl Runner {
    pub fn new(ctx: RunContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Run `inputs`. Every failure becomes an unsuccessful summary.
    pub async fn run(&self, inputs: &[PathBuf], overrides: &ConfigLayer) -> RunSummary {
        match self.try_run(inputs, overrides).await {
            Ok(summary) => summary,
            Err(e) => {
                error!("❌ Test execution failed: {}", e);
                RunSummary::failure(e.to_string())
            }
        }
    }

    async fn try_run(&self, inputs: &[PathBuf], overrides: &ConfigLayer) -> Result<RunSummary> {
        info!("🔍 Detecting template...");
        let manifest = ProjectManifest::load(&self.ctx.cwd)?;
        let kind = manifest.template_kind()?;
        info!("Template detected: {}", kind);

        debug!("🔧 Merging configuration...");
        let config = ConfigResolver::resolve(&ConfigResolver::builtin_defaults(), &manifest.config, overrides);
        if self.ctx.debug {
            debug!("Final configuration: {}", serde_json::to_string_pretty(&config)?);
        }

        info!("🚀 Executing tests...");
        templates::execute(kind, inputs, &config, &self.ctx).await
    }

    /// Write a summary as JSON into `output_dir`
    pub fn write_summary(summary: &RunSummary, output_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(output_dir)?;
        let path = output_dir.join(SUMMARY_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(summary)?)?;
        info!("Results written to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_manifest_is_reported() {
        let dir = TempDir::new().unwrap();
        let runner = Runner::new(RunContext::new(dir.path()));

        let summary = runner.run(&[PathBuf::from("tests")], &ConfigLayer::new()).await;
        assert!(!summary.success);
        assert_eq!(summary.tests_run, 0);
        assert!(summary.message.starts_with("No package.json found"));
    }

    #[tokio::test]
    async fn test_unknown_template_is_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            json!({"zypin": {"template": "playwright"}}).to_string(),
        )
        .unwrap();
        let runner = Runner::new(RunContext::new(dir.path()));

        let summary = runner.run(&[PathBuf::from(".")], &ConfigLayer::new()).await;
        assert!(!summary.success);
        assert_eq!(
            summary.message,
            "Template runner not found: playwright. Available templates: basic-webdriver, cucumber-bdd"
        );
    }

    #[tokio::test]
    async fn test_no_files_is_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        let runner = Runner::new(RunContext::new(dir.path()));

        let summary = runner.run(&[PathBuf::from(".")], &ConfigLayer::new()).await;
        assert!(!summary.success);
        assert_eq!(summary.message, "No test files found to execute");
        assert_eq!(summary.tests_run, 0);
    }

    #[test]
    fn test_write_summary() {
        let dir = TempDir::new().unwrap();
        let summary = RunSummary::from_counts(1, 0, vec![]).with_message("All tests passed");

        let path = Runner::write_summary(&summary, &dir.path().join("reports")).unwrap();
        let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written["testsPassed"], 1);
        assert_eq!(written["message"], "All tests passed");
    }
}
