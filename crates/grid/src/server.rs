//! Selenium Grid server management - provisioning, launching and stopping

use std::path::Path;
use std::time::Duration;
use tokio::process::Child;
use tracing::{info, warn};
use zypin_selenium_common::ValidatedConfig;

use crate::context::RunContext;
use crate::error::GridResult;
use crate::jar::JarProvisioner;
use crate::java::JavaLocator;
use crate::supervisor::{self, ServerLaunch};

/// How long a stopping Grid gets between SIGTERM and SIGKILL
const STOP_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Command-line arguments for `java -jar <jar> standalone`
pub fn build_args(jar_path: &Path, config: &ValidatedConfig) -> Vec<String> {
    vec![
        "-jar".to_string(),
        jar_path.display().to_string(),
        "standalone".to_string(),
        "--port".to_string(),
        config.port.to_string(),
        "--max-sessions".to_string(),
        config.max_sessions.to_string(),
        "--log-level".to_string(),
        config.log_level.clone(),
    ]
}

/// Starts Selenium Grid in standalone mode
pub struct GridServer<'a> {
    ctx: &'a RunContext,
}

impl<'a> GridServer<'a> {
    pub fn new(ctx: &'a RunContext) -> Self {
        Self { ctx }
    }

    /// Check Java, make sure the JAR is present, then launch and wait for readiness
    pub async fn start(&self, config: &ValidatedConfig) -> GridResult<GridProcess> {
        let java = JavaLocator::new(&self.ctx.programs.java).require().await?;
        info!(
            "Java {} detected",
            java.version.as_deref().unwrap_or("unknown")
        );

        let jar_path = JarProvisioner::new(&self.ctx.jar_dir)
            .ensure(&config.jar_file, &config.jar_url)
            .await?;

        self.launch(&jar_path, config).await
    }

    /// Launch an already-provisioned JAR
    pub async fn launch(&self, jar_path: &Path, config: &ValidatedConfig) -> GridResult<GridProcess> {
        info!("🚀 Starting Selenium Grid on port {}...", config.port);

        let mut launch = ServerLaunch::new(&self.ctx.programs.java, build_args(jar_path, config));
        launch.env = self.ctx.env.clone();
        launch.echo_output = self.ctx.debug;

        let child = supervisor::start_server(&launch).await?;
        let process = GridProcess::new(child, config.port);

        info!("✅ Selenium Grid started at {}", process.base_url());
        Ok(process)
    }
}

/// Handle to a running Grid
pub struct GridProcess {
    child: Child,
    pub pid: Option<u32>,
    pub port: u16,
    pub base_url: String,
}

impl GridProcess {
    pub fn new(child: Child, port: u16) -> Self {
        Self {
            pid: child.id(),
            child,
            port,
            base_url: format!("http://localhost:{}", port),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Wait for the Grid to exit on its own
    pub async fn wait(&mut self) -> GridResult<Option<i32>> {
        let status = self.child.wait().await?;
        Ok(status.code())
    }

    /// Stop the Grid: SIGTERM, then kill after a grace period
    pub async fn stop(&mut self) -> GridResult<()> {
        info!("Stopping Selenium Grid (pid: {:?})", self.pid);

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.child.id() {
                if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok() {
                    match tokio::time::timeout(STOP_GRACE_PERIOD, self.child.wait()).await {
                        Ok(Ok(_)) => return Ok(()),
                        Ok(Err(e)) => warn!("Failed waiting for Grid to exit: {}", e),
                        Err(_) => warn!("Grid did not stop within {:?}, killing", STOP_GRACE_PERIOD),
                    }
                }
            }
        }

        // Already exited is fine
        let _ = self.child.kill().await;
        Ok(())
    }
}
