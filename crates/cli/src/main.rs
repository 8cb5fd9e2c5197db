//! Zypin Selenium CLI - Main Entry Point
//!
//! Hosts the Selenium plugin from the command line: start a Grid, run
//! tests against it and check its health.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use zypin_selenium::{Plugin, Programs, RunContext, SeleniumPlugin};

mod commands;
mod output;

use commands::{health, run, start, templates};

/// Zypin Selenium - Selenium Grid integration for web testing
#[derive(Parser)]
#[command(name = "zypin-selenium")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Echo subprocess output and list discovered files
    #[arg(
        short,
        long,
        global = true,
        env = "ZYPIN_DEBUG",
        action = clap::ArgAction::SetTrue,
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    debug: bool,

    /// Project directory (defaults to the current directory)
    #[arg(long, global = true)]
    project_dir: Option<PathBuf>,

    /// Directory holding the Selenium server JAR
    #[arg(long, global = true, env = "ZYPIN_SELENIUM_JAR_DIR")]
    jar_dir: Option<PathBuf>,

    /// Java executable
    #[arg(long, default_value = "java", global = true, env = "ZYPIN_JAVA")]
    java: PathBuf,

    /// Node.js executable used by basic-webdriver
    #[arg(long, default_value = "node", global = true, env = "ZYPIN_NODE")]
    node: PathBuf,

    /// npx executable used by cucumber-bdd
    #[arg(long, default_value = "npx", global = true, env = "ZYPIN_NPX")]
    npx: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start Selenium Grid and keep it running until interrupted
    Start(start::StartArgs),

    /// Run tests with the project's template
    Run(run::RunArgs),

    /// Check Selenium Grid health
    Health(health::HealthArgs),

    /// List supported templates
    Templates,

    /// Show version information
    Version,
}

fn inherited_env() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os().filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "info,zypin_selenium=debug,zypin_selenium_common=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let cwd = match cli.project_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let jar_dir = cli
        .jar_dir
        .unwrap_or_else(|| zypin_selenium_common::default_jar_dir(std::env::var_os("HOME").map(PathBuf::from)));

    let ctx = RunContext::new(cwd)
        .with_debug(cli.debug)
        .with_env(inherited_env())
        .with_jar_dir(jar_dir)
        .with_programs(Programs {
            java: cli.java,
            node: cli.node,
            npx: cli.npx,
        });
    let plugin = SeleniumPlugin::new(ctx);

    let ok = match cli.command {
        Commands::Start(args) => start::execute(args, &plugin).await?,
        Commands::Run(args) => run::execute(args, &plugin, cli.format).await?,
        Commands::Health(args) => health::execute(args, &plugin, cli.format).await?,
        Commands::Templates => {
            templates::execute(&plugin, cli.format);
            true
        }
        Commands::Version => {
            let metadata = plugin.metadata();
            println!("Zypin Selenium v{}", metadata.version);
            println!("{}", metadata.description);
            true
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_env_accepts_any_non_falsey_value() {
        for (value, expected) in [("1", true), ("yes", true), ("true", true), ("0", false), ("false", false)] {
            std::env::set_var("ZYPIN_DEBUG", value);
            let cli = Cli::try_parse_from(["zypin-selenium", "templates"]).unwrap();
            assert_eq!(cli.debug, expected, "ZYPIN_DEBUG={}", value);
        }
        std::env::remove_var("ZYPIN_DEBUG");

        let cli = Cli::try_parse_from(["zypin-selenium", "--debug", "templates"]).unwrap();
        assert!(cli.debug);
    }
}
