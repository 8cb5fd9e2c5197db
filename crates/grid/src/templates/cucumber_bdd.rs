//! BDD template: one cucumber-js invocation over every `.feature` file

use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{error, info, warn};
use zypin_selenium_common::{RunSummary, ValidatedConfig};

use super::test_env;
use crate::context::RunContext;
use crate::supervisor::{self, ChildSpec, ChildStatus, OutputTags};

/// Floor for the whole-suite timeout
pub const MIN_SUITE_TIMEOUT: Duration = Duration::from_millis(120_000);

/// Report file written by the JSON formatter, relative to the project
pub const JSON_REPORT: &str = "./cucumber-report.json";

/// Scenario totals from the runner's summary line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioCounts {
    pub total: usize,
    pub failed: usize,
}

impl ScenarioCounts {
    pub fn passed(&self) -> usize {
        self.total.saturating_sub(self.failed)
    }
}

/// The suite gets three per-test timeouts, and never less than two minutes
pub fn suite_timeout(per_test_ms: u64) -> Duration {
    Duration::from_millis(per_test_ms.saturating_mul(3)).max(MIN_SUITE_TIMEOUT)
}

/// Arguments after `npx`
pub fn bdd_args(files: &[PathBuf], parallel: u32) -> Vec<String> {
    let mut args: Vec<String> = [
        "cucumber-js",
        "--require",
        "./step-definitions/**/*.js",
        "--require",
        "./support/**/*.js",
        "--format",
        "progress",
        "--format",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(format!("json:{}", JSON_REPORT));
    args.extend(files.iter().map(|f| f.display().to_string()));

    if parallel > 1 {
        args.push("--parallel".to_string());
        args.push(parallel.to_string());
    }
    args
}

fn scenario_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+) scenarios? \(([^)]+)\)").expect("static regex"))
}

fn failed_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+) failed").expect("static regex"))
}

/// Find `N scenarios (…)` in runner output. The last summary line wins;
/// a summary of zero scenarios counts as no summary.
pub fn parse_scenario_summary(output: &str) -> Option<ScenarioCounts> {
    let mut counts = None;
    for line in output.lines() {
        let Some(captures) = scenario_line_pattern().captures(line) else {
            continue;
        };
        let Ok(total) = captures[1].parse::<usize>() else {
            continue;
        };
        let failed = failed_pattern()
            .captures(&captures[2])
            .and_then(|c| c[1].parse::<usize>().ok())
            .unwrap_or(0);
        counts = Some(ScenarioCounts {
            total,
            failed: failed.min(total),
        });
    }
    counts.filter(|c| c.total > 0)
}

pub(super) async fn run(files: &[PathBuf], config: &ValidatedConfig, ctx: &RunContext) -> RunSummary {
    let mut env = test_env(config, ctx);
    env.entry("TEST_ENV".to_string()).or_insert_with(|| "test".to_string());
    env.entry("LOG_LEVEL".to_string()).or_insert_with(|| "info".to_string());

    info!("Running {} feature file(s) with cucumber-js", files.len());
    if config.retries > 0 {
        warn!("retries={} is not applied by cucumber-bdd", config.retries);
    }

    let timeout = suite_timeout(config.timeout);
    let spec = ChildSpec {
        label: "Test suite".to_string(),
        program: ctx.programs.npx.clone(),
        args: bdd_args(files, config.parallel),
        env,
        cwd: ctx.cwd.clone(),
        timeout,
        echo_output: ctx.debug,
        tags: OutputTags::CUCUMBER,
    };
    let outcome = supervisor::run_child(&spec).await;
    let parsed = parse_scenario_summary(&outcome.stdout);

    let summary = match &outcome.status {
        ChildStatus::SpawnError(reason) | ChildStatus::WaitFailed(reason) => {
            error!("❌ Cucumber process error: {}", reason);
            RunSummary::from_counts(0, 1, Vec::new())
                .with_message(format!("Cucumber execution failed: {}", reason))
        }
        ChildStatus::TimedOut => {
            let message = outcome.error_message().unwrap_or_default();
            warn!("{}", message);
            let counts = parsed.unwrap_or(ScenarioCounts { total: 0, failed: 0 });
            let mut summary = RunSummary::from_counts(counts.passed(), counts.failed, Vec::new());
            summary.success = false;
            summary.with_message(message)
        }
        ChildStatus::Exited(code) => {
            let exit_ok = *code == Some(0);
            let counts = parsed.unwrap_or(ScenarioCounts {
                total: 1,
                failed: if exit_ok { 0 } else { 1 },
            });
            let mut summary = RunSummary::from_counts(counts.passed(), counts.failed, Vec::new());
            summary.success = exit_ok && counts.failed == 0;

            let message = if summary.success {
                "All scenarios passed".to_string()
            } else if counts.failed > 0 {
                format!("{} scenario(s) failed", counts.failed)
            } else {
                match code {
                    Some(code) => format!("cucumber-js exited with code {}", code),
                    None => "cucumber-js was terminated by a signal".to_string(),
                }
            };
            summary.with_message(message)
        }
    };

    info!("Test Results:");
    info!("  Scenarios run: {}", summary.tests_run);
    info!("  Passed: {}", summary.tests_passed);
    info!("  Failed: {}", summary.tests_failed);
    summary
}
