//! `run` - execute tests with the project's template

use clap::Args;
use std::path::PathBuf;
use tracing::warn;
use zypin_selenium::{Plugin, Runner, SeleniumPlugin};

use super::Overrides;
use crate::output::{print_error, print_item, print_list, print_success, OutputFormat};

#[derive(Args)]
pub struct RunArgs {
    /// Test files, directories or glob patterns
    #[arg(default_value = ".")]
    pub inputs: Vec<PathBuf>,

    /// Browser: chrome, firefox, safari or edge
    #[arg(long)]
    pub browser: Option<String>,

    /// Run the browser without a window
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub headless: Option<bool>,

    /// Selenium Grid URL
    #[arg(long)]
    pub grid_url: Option<String>,

    /// Browser window size, WIDTHxHEIGHT
    #[arg(long)]
    pub window_size: Option<String>,

    /// Per-test timeout in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Parallel workers (cucumber-bdd only)
    #[arg(long)]
    pub parallel: Option<u32>,

    /// Retry count
    #[arg(long)]
    pub retries: Option<u32>,

    /// Write the JSON summary into this directory
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl RunArgs {
    fn overrides(&self) -> Overrides {
        Overrides::default()
            .set("browser", self.browser.clone())
            .set("headless", self.headless)
            .set("gridUrl", self.grid_url.clone())
            .set("windowSize", self.window_size.clone())
            .set("timeout", self.timeout)
            .set("parallel", self.parallel)
            .set("retries", self.retries)
    }
}

pub async fn execute(args: RunArgs, plugin: &SeleniumPlugin, format: OutputFormat) -> anyhow::Result<bool> {
    let layer = args.overrides().into_layer();
    let summary = plugin.run(&args.inputs, &layer).await;

    if let Some(dir) = &args.output {
        if let Err(e) = Runner::write_summary(&summary, dir) {
            warn!("Failed to write results to {}: {}", dir.display(), e);
        }
    }

    if format.is_structured() {
        print_item(&summary, format);
        return Ok(summary.success);
    }

    if !summary.files.is_empty() {
        print_list(&summary.files, format);
    }
    print_item(&summary, format);

    if summary.success {
        print_success(&summary.message);
    } else {
        print_error(&summary.message);
    }
    Ok(summary.success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: RunArgs,
    }

    #[test]
    fn test_only_given_flags_become_overrides() {
        let harness = Harness::parse_from(["run", "tests", "--browser", "firefox", "--headless", "--timeout", "5000"]);
        let layer = harness.args.overrides().into_layer();

        assert_eq!(harness.args.inputs, vec![PathBuf::from("tests")]);
        assert_eq!(layer["browser"], "firefox");
        assert_eq!(layer["headless"], true);
        assert_eq!(layer["timeout"], 5000);
        assert!(!layer.contains_key("parallel"));
        assert!(!layer.contains_key("gridUrl"));
    }

    #[test]
    fn test_inputs_default_to_current_directory() {
        let harness = Harness::parse_from(["run"]);
        assert_eq!(harness.args.inputs, vec![PathBuf::from(".")]);
        assert!(harness.args.overrides().into_layer().is_empty());
    }
}
