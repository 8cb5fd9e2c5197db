//! Test-execution templates
//!
//! A project picks one template in its manifest. [`execute`] dispatches on
//! the closed [`TemplateKind`] set; each template discovers its files,
//! launches the children and folds their outcomes into a [`RunSummary`].

mod basic_webdriver;
mod cucumber_bdd;

pub use cucumber_bdd::{bdd_args, parse_scenario_summary, suite_timeout, ScenarioCounts};

use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use zypin_selenium_common::discovery::file_stats;
use zypin_selenium_common::{
    discover, validate_files, DiscoveryOptions, Error, Result, RunSummary, TemplateKind, ValidatedConfig,
};

use crate::context::RunContext;

/// Directory depth templates scan below each input
pub const TEMPLATE_SCAN_DEPTH: usize = 5;

/// Run `inputs` with the given template
pub async fn execute(
    kind: TemplateKind,
    inputs: &[PathBuf],
    config: &ValidatedConfig,
    ctx: &RunContext,
) -> Result<RunSummary> {
    let files = collect_files(kind, inputs, ctx)?;
    match kind {
        TemplateKind::BasicWebdriver => Ok(basic_webdriver::run(&files, config, ctx).await),
        TemplateKind::CucumberBdd => Ok(cucumber_bdd::run(&files, config, ctx).await),
    }
}

/// Environment for test children: the inherited environment plus browser settings
pub fn test_env(config: &ValidatedConfig, ctx: &RunContext) -> BTreeMap<String, String> {
    let mut env = ctx.env.clone();
    env.insert("BROWSER".to_string(), config.browser.as_str().to_string());
    env.insert("HEADLESS".to_string(), config.headless.to_string());
    env.insert("SELENIUM_GRID_URL".to_string(), config.grid_url.clone());
    env.insert("TIMEOUT".to_string(), config.timeout.to_string());
    env.insert("WINDOW_SIZE".to_string(), config.window_size.clone());
    env
}

fn collect_files(kind: TemplateKind, inputs: &[PathBuf], ctx: &RunContext) -> Result<Vec<PathBuf>> {
    let options = DiscoveryOptions {
        max_depth: TEMPLATE_SCAN_DEPTH,
        verbose: ctx.debug,
        base_dir: Some(ctx.cwd.clone()),
    };

    let files = discover(inputs, kind, &options);
    if files.is_empty() {
        return Err(Error::NoFilesFound {
            kind: kind.file_kind(),
        });
    }

    let validation = validate_files(&files);
    for invalid in &validation.invalid {
        warn!("Skipping unreadable file: {}", invalid.display());
    }
    if validation.valid.is_empty() {
        return Err(Error::NoFilesFound {
            kind: kind.file_kind(),
        });
    }

    info!("Found {} {} file(s)", validation.valid.len(), kind.file_kind());
    if ctx.debug {
        let stats = file_stats(&validation.valid);
        debug!(
            "{} file(s), {} bytes total, {} bytes average",
            stats.total, stats.total_size, stats.average_size
        );
        for file in &validation.valid {
            debug!("  - {}", file.display());
        }
    }

    Ok(validation.valid)
}
