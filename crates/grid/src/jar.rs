//! Selenium server JAR provisioning

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{GridError, GridResult};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Makes sure the Grid JAR exists locally, downloading it on first use
#[derive(Debug, Clone)]
pub struct JarProvisioner {
    dir: PathBuf,
}

impl JarProvisioner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn jar_path(&self, jar_file: &str) -> PathBuf {
        self.dir.join(jar_file)
    }

    /// Where an in-flight download is written before it is renamed into place
    pub fn partial_path(&self, jar_file: &str) -> PathBuf {
        self.dir.join(format!("{}.part", jar_file))
    }

    /// Return the local JAR path, downloading from `url` when absent.
    ///
    /// Only a completed download is renamed to the final path, so an
    /// interrupted one is never mistaken for a usable JAR.
    pub async fn ensure(&self, jar_file: &str, url: &str) -> GridResult<PathBuf> {
        let path = self.jar_path(jar_file);
        if fs::try_exists(&path).await.unwrap_or(false) {
            debug!("Using Selenium JAR at {}", path.display());
            return Ok(path);
        }

        let failed = |reason: String| GridError::JarDownload {
            url: url.to_string(),
            reason,
        };

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| failed(format!("cannot create {}: {}", self.dir.display(), e)))?;
        info!("📥 Downloading Selenium Server {}...", jar_file);

        let partial = self.partial_path(jar_file);
        let result = match download(url, &partial).await {
            Ok(()) => fs::rename(&partial, &path).await.map_err(GridError::from),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            if let Err(remove_err) = fs::remove_file(&partial).await {
                if remove_err.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove partial download {}: {}", partial.display(), remove_err);
                }
            }
            return Err(failed(e.to_string()));
        }

        info!("✅ Selenium Server downloaded");
        Ok(path)
    }
}

async fn download(url: &str, dest: &Path) -> GridResult<()> {
    let client = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()?;

    let mut response = client.get(url).send().await?.error_for_status()?;
    let mut file = fs::File::create(dest).await?;
    let mut written: u64 = 0;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    debug!("Wrote {} bytes to {}", written, dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn serve_once(status_line: &'static str, body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            let head = format!(
                "{}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                status_line,
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
        });
        format!("http://{}/selenium.jar", addr)
    }

    #[tokio::test]
    async fn test_existing_jar_is_reused() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("selenium.jar"), b"jar").unwrap();

        let provisioner = JarProvisioner::new(dir.path());
        let path = provisioner
            .ensure("selenium.jar", "http://127.0.0.1:1/unreachable")
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("selenium.jar"));
    }

    #[tokio::test]
    async fn test_download_writes_jar() {
        let dir = TempDir::new().unwrap();
        let url = serve_once("HTTP/1.1 200 OK", b"PK-fake-jar").await;

        let provisioner = JarProvisioner::new(dir.path().join("lib"));
        let path = provisioner.ensure("selenium.jar", &url).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"PK-fake-jar");
    }

    #[tokio::test]
    async fn test_failed_download_leaves_no_partial_file() {
        let dir = TempDir::new().unwrap();
        let url = serve_once("HTTP/1.1 404 Not Found", b"missing").await;

        let provisioner = JarProvisioner::new(dir.path());
        let err = provisioner.ensure("selenium.jar", &url).await.unwrap_err();
        assert!(matches!(err, GridError::JarDownload { .. }));
        assert!(!dir.path().join("selenium.jar").exists());
        assert!(!dir.path().join("selenium.jar.part").exists());
    }

    #[tokio::test]
    async fn test_leftover_partial_download_is_replaced() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("selenium.jar.part"), b"PK-trunc").unwrap();
        let url = serve_once("HTTP/1.1 200 OK", b"PK-complete-jar").await;

        let provisioner = JarProvisioner::new(dir.path());
        let path = provisioner.ensure("selenium.jar", &url).await.unwrap();
        assert_eq!(path, dir.path().join("selenium.jar"));
        assert_eq!(std::fs::read(&path).unwrap(), b"PK-complete-jar");
        assert!(!provisioner.partial_path("selenium.jar").exists());
    }

    #[tokio::test]
    async fn test_unwritable_jar_dir_is_a_download_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let provisioner = JarProvisioner::new(blocker.join("lib"));
        let err = provisioner
            .ensure("selenium.jar", "http://127.0.0.1:1/unreachable")
            .await
            .unwrap_err();
        assert!(matches!(err, GridError::JarDownload { .. }));
        assert!(err.is_environment());
    }
}
