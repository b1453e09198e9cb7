use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::warn;

/// Captures raw requests and built responses as fixture files.
///
/// Each exchange lands in `<root>/<unix-seconds>/{request,response}.txt`.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    root: Option<PathBuf>,
}

impl Recorder {
    pub fn disabled() -> Self {
        Self { root: None }
    }

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: Some(root.into()) }
    }

    pub fn is_enabled(&self) -> bool {
        self.root.is_some()
    }

    /// Writes `text` to `<name>.txt`. Failures are logged and otherwise ignored.
    pub async fn record(&self, name: &str, text: &str) -> Option<PathBuf> {
        let root = self.root.as_deref()?;
        match write_fixture(root, name, text).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(cause = %e, name, "failed to record fixture");
                None
            }
        }
    }
}

async fn write_fixture(root: &Path, name: &str, text: &str) -> std::io::Result<PathBuf> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let dir = root.join(now.to_string());
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(format!("{}.txt", name));
    tokio::fs::write(&path, text).await?;
    Ok(path)
}
