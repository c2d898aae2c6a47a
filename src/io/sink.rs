//! Download targets.
//!
//! A workflow never decides where bytes end up; it hands a finished
//! buffer and a file name to a [`DownloadSink`]. The binary saves into a
//! directory, tests collect deliveries in memory.

use anyhow::{Result, bail};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Receives finished buffers to be saved under a file name
#[async_trait]
pub trait DownloadSink: Send + Sync {
    async fn deliver(&self, file_name: &str, bytes: &[u8]) -> Result<()>;
}

/// One delivered buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Collects deliveries in memory, in delivery order
#[derive(Debug, Default)]
pub struct MemorySink {
    downloads: Mutex<Vec<Download>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far
    pub fn downloads(&self) -> Vec<Download> {
        self.downloads.lock().clone()
    }

    /// Most recent delivery, if any
    pub fn last(&self) -> Option<Download> {
        self.downloads.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.downloads.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.downloads.lock().is_empty()
    }
}

#[async_trait]
impl DownloadSink for MemorySink {
    async fn deliver(&self, file_name: &str, bytes: &[u8]) -> Result<()> {
        self.downloads.lock().push(Download {
            file_name: file_name.to_string(),
            bytes: bytes.to_vec(),
        });
        Ok(())
    }
}

/// Saves deliveries below a base directory, keeping archive folder structure
#[derive(Debug, Clone)]
pub struct DirectorySink {
    base: PathBuf,
}

impl DirectorySink {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Resolve an archive-style name below the base directory.
    ///
    /// Absolute names and `..` components are refused so an archive
    /// member can never be written outside the base.
    fn resolve(&self, file_name: &str) -> Result<PathBuf> {
        let relative = Path::new(file_name);
        let mut resolved = self.base.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => bail!("Refusing to write outside the output directory: {file_name}"),
            }
        }
        if resolved == self.base {
            bail!("Empty download name");
        }
        Ok(resolved)
    }
}

#[async_trait]
impl DownloadSink for DirectorySink {
    async fn deliver(&self, file_name: &str, bytes: &[u8]) -> Result<()> {
        let output_path = self.resolve(file_name)?;

        // Create parent directories if needed
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&output_path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;

        debug!("Saved {} ({} bytes)", output_path.display(), bytes.len());
        Ok(())
    }
}
