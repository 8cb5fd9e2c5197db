//! Direct-script template: every `.js` file is run with node, one at a time

use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use zypin_selenium_common::{FileResult, RunSummary, ValidatedConfig};

use super::test_env;
use crate::context::RunContext;
use crate::supervisor::{self, ChildSpec, OutputTags};

pub(super) async fn run(files: &[PathBuf], config: &ValidatedConfig, ctx: &RunContext) -> RunSummary {
    if config.parallel > 1 {
        warn!(
            "parallel={} is ignored by basic-webdriver; files run sequentially",
            config.parallel
        );
    }
    if config.retries > 0 {
        debug!("retries={} is ignored by basic-webdriver", config.retries);
    }

    let env = test_env(config, ctx);
    let mut results = Vec::with_capacity(files.len());
    let mut passed = 0;
    let mut failed = 0;

    for file in files {
        info!("Running: {}", file.display());

        let spec = ChildSpec {
            label: "Test".to_string(),
            program: ctx.programs.node.clone(),
            args: vec![file.display().to_string()],
            env: env.clone(),
            cwd: ctx.cwd.clone(),
            timeout: Duration::from_millis(config.timeout),
            echo_output: ctx.debug,
            tags: OutputTags::TEST,
        };
        let outcome = supervisor::run_child(&spec).await;
        let duration_ms = outcome.duration.as_millis() as u64;
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());

        let error = outcome.error_message();
        match &error {
            None => {
                passed += 1;
                info!("✓ {} passed ({} ms)", name, duration_ms);
            }
            Some(reason) => {
                failed += 1;
                error!("✗ {} failed: {}", name, reason);
            }
        }

        results.push(FileResult {
            path: file.clone(),
            success: error.is_none(),
            duration_ms,
            error,
        });
    }

    info!("Test Results:");
    info!("  Tests run: {}", passed + failed);
    info!("  Passed: {}", passed);
    info!("  Failed: {}", failed);

    let message = if failed == 0 {
        "All tests passed".to_string()
    } else {
        format!("{} test(s) failed", failed)
    };
    RunSummary::from_counts(passed, failed, results).with_message(message)
}
