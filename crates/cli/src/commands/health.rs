//! `health` - probe Java and the Grid status endpoint

use clap::Args;
use serde_json::json;
use zypin_selenium::{Plugin, SeleniumPlugin};
use zypin_selenium_common::ConfigLayer;

use crate::output::{print_error, print_item, print_success, OutputFormat};

#[derive(Args)]
pub struct HealthArgs {
    /// Grid port
    #[arg(long, default_value_t = 8422)]
    pub port: u16,

    /// Request timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    pub timeout: u64,
}

pub async fn execute(args: HealthArgs, plugin: &SeleniumPlugin, format: OutputFormat) -> anyhow::Result<bool> {
    let mut layer = ConfigLayer::new();
    layer.insert("port".to_string(), json!(args.port));
    layer.insert("timeout".to_string(), json!(args.timeout));

    let report = plugin.health(&layer).await;

    match format {
        OutputFormat::Plain => println!("{}", report.display),
        _ => print_item(&report, format),
    }

    if !format.is_structured() {
        if report.healthy {
            print_success("Selenium Grid is healthy");
        } else {
            print_error(&report.message);
        }
    }
    Ok(report.healthy)
}
