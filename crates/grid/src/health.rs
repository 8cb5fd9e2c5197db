//! Grid health probing

use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use zypin_selenium_common::{HealthReport, HealthStatus, JavaInfo};

use crate::java::JavaLocator;

pub const DEFAULT_HEALTH_PORT: u16 = 8422;
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_millis(5000);
pub const STATUS_PATH: &str = "/wd/hub/status";

const JAVA_MISSING_MESSAGE: &str = "Java is not installed. Install from https://adoptium.net/";
const INVALID_RESPONSE_MESSAGE: &str = "Invalid response from Grid";
const TIMEOUT_MESSAGE: &str = "Health check timed out";

/// One-shot status check against a Grid's status endpoint
#[derive(Debug, Clone)]
pub struct HealthProbe {
    java: JavaLocator,
    host: String,
}

impl HealthProbe {
    pub fn new(java: JavaLocator) -> Self {
        Self {
            java,
            host: "localhost".to_string(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn status_url(&self, port: u16) -> String {
        format!("http://{}:{}{}", self.host, port, STATUS_PATH)
    }

    /// Probe Java and the Grid. Never fails: every outcome is a report.
    pub async fn probe(&self, port: u16, timeout: Duration) -> HealthReport {
        let java = self.java.probe().await;

        let client = match reqwest::Client::builder().timeout(timeout).build() {
            Ok(client) => client,
            Err(e) => return HealthReport::new(HealthStatus::Error, e.to_string(), java),
        };

        let url = self.status_url(port);
        debug!("Checking Grid status at {}", url);

        let response = match client.get(&url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return HealthReport::new(HealthStatus::Timeout, TIMEOUT_MESSAGE, java)
            }
            Err(e) => {
                debug!("Grid status request failed: {}", e);
                return unreachable(port, java);
            }
        };

        let http_ok = response.status().is_success();
        match response.text().await {
            Ok(body) => classify_status_body(&body, http_ok, java),
            Err(e) if e.is_timeout() => HealthReport::new(HealthStatus::Timeout, TIMEOUT_MESSAGE, java),
            Err(_) => HealthReport::new(HealthStatus::Error, INVALID_RESPONSE_MESSAGE, java),
        }
    }
}

fn unreachable(port: u16, java: JavaInfo) -> HealthReport {
    if java.installed {
        HealthReport::new(
            HealthStatus::Unreachable,
            format!("Grid not running on port {}", port),
            java,
        )
    } else {
        HealthReport::new(HealthStatus::JavaMissing, JAVA_MISSING_MESSAGE, java)
    }
}

/// Turn a status response body into a report.
///
/// `healthy` needs both a 2xx response and `value.ready == true`.
pub fn classify_status_body(body: &str, http_ok: bool, java: JavaInfo) -> HealthReport {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(value @ Value::Object(_)) => value,
        _ => return HealthReport::new(HealthStatus::Error, INVALID_RESPONSE_MESSAGE, java),
    };

    let ready = parsed["value"]["ready"].as_bool().unwrap_or(false);
    let nodes = parsed["value"]["nodes"].as_array().cloned().unwrap_or_default();
    let grid_version = nodes
        .first()
        .and_then(|node| node["version"].as_str())
        .unwrap_or("unknown")
        .to_string();

    let (status, message) = if ready {
        (HealthStatus::Ready, "Grid is ready")
    } else {
        (HealthStatus::Starting, "Grid is starting")
    };

    let mut report = HealthReport::new(status, message, java);
    report.healthy = http_ok && ready;
    report.grid_version = Some(grid_version);
    report.nodes = nodes;
    report.display = report.render_display();
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn java17() -> JavaInfo {
        JavaInfo {
            installed: true,
            version: Some("17.0.2".into()),
            major_version: Some(17),
        }
    }

    #[test]
    fn test_ready_grid_is_healthy() {
        let body = r#"{"value":{"ready":true,"nodes":[{"version":"4.25.0"}]}}"#;
        let report = classify_status_body(body, true, java17());
        assert!(report.healthy);
        assert_eq!(report.status, HealthStatus::Ready);
        assert_eq!(report.grid_version.as_deref(), Some("4.25.0"));
        assert!(report.display.contains("Grid version: 4.25.0"));
        assert!(report.display.contains("Java: ✓ 17.0.2"));
    }

    #[test]
    fn test_not_ready_grid_is_starting() {
        let body = r#"{"value":{"ready":false,"nodes":[]}}"#;
        let report = classify_status_body(body, true, java17());
        assert!(!report.healthy);
        assert_eq!(report.status, HealthStatus::Starting);
        assert_eq!(report.grid_version.as_deref(), Some("unknown"));
        assert!(!report.display.contains("Grid version"));
    }

    #[test]
    fn test_ready_body_with_error_status_is_not_healthy() {
        let body = r#"{"value":{"ready":true,"nodes":[]}}"#;
        let report = classify_status_body(body, false, java17());
        assert!(!report.healthy);
        assert_eq!(report.status, HealthStatus::Ready);
    }

    #[test]
    fn test_garbage_body_is_error() {
        for body in ["<html>", "null", ""] {
            let report = classify_status_body(body, true, java17());
            assert_eq!(report.status, HealthStatus::Error);
            assert_eq!(report.message, "Invalid response from Grid");
        }
    }

    #[test]
    fn test_unreachable_depends_on_java() {
        assert_eq!(unreachable(8422, java17()).status, HealthStatus::Unreachable);
        assert_eq!(
            unreachable(8422, java17()).message,
            "Grid not running on port 8422"
        );
        assert_eq!(unreachable(8422, JavaInfo::missing()).status, HealthStatus::JavaMissing);
    }
}
