//! `start` - launch Selenium Grid and supervise it until Ctrl+C

use clap::Args;
use zypin_selenium::{Plugin, ProcessRegistry, SeleniumPlugin};

use super::Overrides;
use crate::output::{print_error, print_info, print_success, print_warning};

#[derive(Args)]
pub struct StartArgs {
    /// Grid port
    #[arg(long)]
    pub port: Option<u16>,

    /// Maximum concurrent browser sessions
    #[arg(long)]
    pub max_sessions: Option<u32>,

    /// Selenium log level (INFO, FINE, ...)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl StartArgs {
    fn overrides(&self) -> Overrides {
        Overrides::default()
            .set("port", self.port)
            .set("maxSessions", self.max_sessions)
            .set("logLevel", self.log_level.clone())
    }
}

pub async fn execute(args: StartArgs, plugin: &SeleniumPlugin) -> anyhow::Result<bool> {
    let mut registry = ProcessRegistry::new();
    let layer = args.overrides().into_layer();

    let mut process = match plugin.start(&mut registry, &layer).await {
        Ok(Some(process)) => process,
        Ok(None) => return Ok(false),
        Err(e) => {
            print_error(&e.to_string());
            if let Some(hint) = e.remediation() {
                print_info(hint);
            }
            return Ok(false);
        }
    };

    print_success(&format!("Selenium Grid running at {}", process.base_url()));
    print_info("Press Ctrl+C to stop");

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            process.stop().await?;
            print_success("Selenium Grid stopped");
            Ok(true)
        }
        exit = process.wait() => {
            let code = exit?;
            print_warning(&format!("Selenium Grid exited (code: {:?})", code));
            Ok(code == Some(0))
        }
    }
}
