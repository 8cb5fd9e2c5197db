//! Core types for the Zypin Selenium plugin

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Browser requested for a test run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    Chrome,
    Firefox,
    Safari,
    Edge,
}

impl Browser {
    pub const ALL: [Browser; 4] = [Browser::Chrome, Browser::Firefox, Browser::Safari, Browser::Edge];

    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::Safari => "safari",
            Browser::Edge => "edge",
        }
    }

    /// Exact, case-sensitive lookup
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.as_str() == name)
    }
}

impl Default for Browser {
    fn default() -> Self {
        Self::Chrome
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Test-execution strategy selected by the project manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateKind {
    /// Each `.js` file is its own process
    #[serde(rename = "basic-webdriver")]
    BasicWebdriver,
    /// One BDD runner invocation over all `.feature` files
    #[serde(rename = "cucumber-bdd")]
    CucumberBdd,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 2] = [TemplateKind::BasicWebdriver, TemplateKind::CucumberBdd];

    pub fn id(&self) -> &'static str {
        match self {
            TemplateKind::BasicWebdriver => "basic-webdriver",
            TemplateKind::CucumberBdd => "cucumber-bdd",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }

    /// File extensions (lowercase, with dot) this template runs
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            TemplateKind::BasicWebdriver => &[".js"],
            TemplateKind::CucumberBdd => &[".feature"],
        }
    }

    /// Noun used in user-facing messages
    pub fn file_kind(&self) -> &'static str {
        match self {
            TemplateKind::BasicWebdriver => "test",
            TemplateKind::CucumberBdd => "feature",
        }
    }
}

impl Default for TemplateKind {
    fn default() -> Self {
        Self::BasicWebdriver
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Local Java runtime as reported by `java -version`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaInfo {
    pub installed: bool,
    pub version: Option<String>,
    pub major_version: Option<u32>,
}

impl JavaInfo {
    pub fn missing() -> Self {
        Self::default()
    }
}

/// Grid health classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HealthStatus {
    Ready,
    Starting,
    Error,
    JavaMissing,
    Unreachable,
    Timeout,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Ready => "ready",
            HealthStatus::Starting => "starting",
            HealthStatus::Error => "error",
            HealthStatus::JavaMissing => "java-missing",
            HealthStatus::Unreachable => "unreachable",
            HealthStatus::Timeout => "timeout",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single health probe
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub healthy: bool,
    pub status: HealthStatus,
    pub message: String,
    /// Version reported by the first Grid node, when the Grid answered
    pub grid_version: Option<String>,
    #[serde(default)]
    pub nodes: Vec<serde_json::Value>,
    pub java: JavaInfo,
    /// Multi-line text combining Java and Grid status
    pub display: String,
}

impl HealthReport {
    pub fn new(status: HealthStatus, message: impl Into<String>, java: JavaInfo) -> Self {
        let mut report = Self {
            healthy: false,
            status,
            message: message.into(),
            grid_version: None,
            nodes: Vec::new(),
            java,
            display: String::new(),
        };
        report.display = report.render_display();
        report
    }

    /// Rebuild `display` from the other fields
    pub fn render_display(&self) -> String {
        let mut lines = Vec::with_capacity(4);

        match (self.java.installed, self.java.version.as_deref()) {
            (true, Some(version)) => lines.push(format!("     Java: ✓ {}", version)),
            (true, None) => lines.push("     Java: ✓ unknown".to_string()),
            (false, _) => lines.push("     Java: ✗ not installed".to_string()),
        }

        lines.push(format!("     Status: {}", self.status));
        lines.push(format!("     {}", self.message));

        if self.healthy {
            if let Some(version) = self.grid_version.as_deref().filter(|v| *v != "unknown") {
                lines.push(format!("     Grid version: {}", version));
            }
        }

        lines.join("\n")
    }
}

/// Outcome of one test file (or one BDD invocation)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResult {
    pub path: PathBuf,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Aggregate result of a run, returned to the host
///
/// `tests_run == tests_passed + tests_failed` always holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub success: bool,
    pub tests_run: usize,
    pub tests_passed: usize,
    pub tests_failed: usize,
    pub message: String,
    #[serde(default)]
    pub files: Vec<FileResult>,
}

impl RunSummary {
    /// Summary for a run that never got to execute anything
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Default::default()
        }
    }

    /// Build a summary from pass/fail counts
    pub fn from_counts(passed: usize, failed: usize, files: Vec<FileResult>) -> Self {
        Self {
            success: failed == 0,
            tests_run: passed + failed,
            tests_passed: passed,
            tests_failed: failed,
            message: String::new(),
            files,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_lookup_is_exact() {
        assert_eq!(Browser::from_name("firefox"), Some(Browser::Firefox));
        assert_eq!(Browser::from_name("Firefox"), None);
        assert_eq!(Browser::from_name("opera"), None);
    }

    #[test]
    fn test_template_ids_round_trip() {
        for kind in TemplateKind::ALL {
            assert_eq!(TemplateKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(TemplateKind::from_id("playwright"), None);
        assert_eq!(TemplateKind::BasicWebdriver.extensions(), &[".js"]);
        assert_eq!(TemplateKind::CucumberBdd.extensions(), &[".feature"]);
    }

    #[test]
    fn test_health_status_serializes_kebab_case() {
        let json = serde_json::to_string(&HealthStatus::JavaMissing).unwrap();
        assert_eq!(json, "\"java-missing\"");
    }

    #[test]
    fn test_health_display_without_java() {
        let report = HealthReport::new(
            HealthStatus::JavaMissing,
            "Java is not installed. Install from https://adoptium.net/",
            JavaInfo::missing(),
        );
        assert!(report.display.contains("Java: ✗ not installed"));
        assert!(report.display.contains("Status: java-missing"));
    }

    #[test]
    fn test_run_summary_counts_are_consistent() {
        let summary = RunSummary::from_counts(2, 1, vec![]);
        assert_eq!(summary.tests_run, 3);
        assert!(!summary.success);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["testsRun"], 3);
        assert_eq!(json["testsFailed"], 1);
    }
}
