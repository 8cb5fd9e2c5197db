//! Java runtime detection

use regex::Regex;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;
use zypin_selenium_common::JavaInfo;

use crate::error::{GridError, GridResult};

/// Oldest Java release the Grid server runs on
pub const MIN_JAVA_MAJOR: u32 = 11;

/// How long `java -version` may take before Java counts as missing
pub const JAVA_VERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Probes the Java executable configured in the run context
#[derive(Debug, Clone)]
pub struct JavaLocator {
    program: PathBuf,
    timeout: Duration,
}

impl JavaLocator {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: JAVA_VERSION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `java -version` and report what was found
    pub async fn probe(&self) -> JavaInfo {
        let mut command = Command::new(&self.program);
        command
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Err(_) => {
                debug!("{} -version did not finish within {:?}", self.program.display(), self.timeout);
                return JavaInfo::missing();
            }
            Ok(Err(e)) => {
                debug!("Java probe failed to launch {}: {}", self.program.display(), e);
                return JavaInfo::missing();
            }
        };

        if !output.status.success() {
            debug!("Java probe exited with {}", output.status);
            return JavaInfo::missing();
        }

        // `java -version` writes to stderr; some builds use stdout
        let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stdout));

        let (version, major_version) = parse_java_version(&text);
        JavaInfo {
            installed: true,
            version: Some(version.unwrap_or_else(|| "unknown".to_string())),
            major_version,
        }
    }

    /// Probe and require at least [`MIN_JAVA_MAJOR`]
    pub async fn require(&self) -> GridResult<JavaInfo> {
        let info = self.probe().await;
        check_java(&info, MIN_JAVA_MAJOR)?;
        Ok(info)
    }
}

/// Fail unless `info` describes an installed Java of at least `required`
pub fn check_java(info: &JavaInfo, required: u32) -> GridResult<()> {
    if !info.installed {
        return Err(GridError::JavaMissing);
    }
    match info.major_version {
        Some(major) if major >= required => Ok(()),
        _ => Err(GridError::JavaTooOld {
            version: info.version.clone().unwrap_or_else(|| "unknown".to_string()),
            required,
        }),
    }
}

fn version_string_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"version "([^"]+)""#).expect("static regex"))
}

/// Extract the quoted version and its major number from `java -version` output.
///
/// Legacy `1.x` versions report `x` as the major (`1.8.0_292` is 8).
pub fn parse_java_version(output: &str) -> (Option<String>, Option<u32>) {
    let Some(captures) = version_string_pattern().captures(output) else {
        return (None, None);
    };
    let version = captures[1].to_string();

    let mut parts = version.split(|c: char| !c.is_ascii_digit());
    let first = parts.next().and_then(|p| p.parse::<u32>().ok());
    let major = match first {
        Some(1) => parts.next().and_then(|p| p.parse::<u32>().ok()),
        other => other,
    };

    (Some(version), major)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(r#"openjdk version "17.0.2" 2022-01-18"#, "17.0.2", 17 ; "modern")]
    #[test_case(r#"java version "1.8.0_292""#, "1.8.0_292", 8 ; "legacy")]
    #[test_case(r#"openjdk version "21" 2023-09-19"#, "21", 21 ; "bare major")]
    #[test_case(r#"openjdk version "11.0.20.1" 2023-08-24 LTS"#, "11.0.20.1", 11 ; "lts")]
    fn test_parse_java_version(output: &str, version: &str, major: u32) {
        let (parsed, parsed_major) = parse_java_version(output);
        assert_eq!(parsed.as_deref(), Some(version));
        assert_eq!(parsed_major, Some(major));
    }

    #[test]
    fn test_parse_java_version_without_version_line() {
        assert_eq!(parse_java_version("command not found"), (None, None));
    }

    #[test]
    fn test_check_java() {
        let modern = JavaInfo {
            installed: true,
            version: Some("17.0.2".into()),
            major_version: Some(17),
        };
        assert!(check_java(&modern, MIN_JAVA_MAJOR).is_ok());

        let legacy = JavaInfo {
            installed: true,
            version: Some("1.8.0_292".into()),
            major_version: Some(8),
        };
        assert!(matches!(
            check_java(&legacy, MIN_JAVA_MAJOR),
            Err(GridError::JavaTooOld { required: 11, .. })
        ));

        assert!(matches!(
            check_java(&JavaInfo::missing(), MIN_JAVA_MAJOR),
            Err(GridError::JavaMissing)
        ));
    }

    #[tokio::test]
    async fn test_probe_missing_program() {
        let locator = JavaLocator::new("/nonexistent/bin/java");
        let info = locator.probe().await;
        assert!(!info.installed);
        assert!(info.version.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_reads_stderr() {
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let fake = dir.path().join("java");
        std::fs::write(
            &fake,
            "#!/bin/sh\necho 'openjdk version \"17.0.9\" 2023-10-17' >&2\n",
        )
        .unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let info = JavaLocator::new(&fake).probe().await;
        assert!(info.installed);
        assert_eq!(info.version.as_deref(), Some("17.0.9"));
        assert_eq!(info.major_version, Some(17));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_java_counts_as_missing() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::Instant;
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let fake = dir.path().join("java");
        std::fs::write(&fake, "#!/bin/sh
exec sleep 30
").unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let started = Instant::now();
        let info = JavaLocator::new(&fake)
            .with_timeout(Duration::from_millis(200))
            .probe()
            .await;
        assert!(!info.installed);
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
