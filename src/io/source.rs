use anyhow::{Context, Result, bail};
use std::path::Path;
use tokio::fs;
use walkdir::WalkDir;

use crate::entry::FileEntry;

/// Turn command-line paths into archive entries.
///
/// A plain file becomes an entry named after the file itself. A directory
/// is walked recursively and every file below it becomes
/// `<directory name>/<relative path>`, so the first path segment names the
/// folder the way a browser folder drop does.
pub async fn collect_inputs<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<FileEntry>> {
    let mut entries = Vec::new();

    for path in paths {
        let path = path.as_ref();
        let metadata = fs::metadata(path)
            .await
            .with_context(|| format!("Cannot read input {}", path.display()))?;

        if metadata.is_file() {
            let name = file_name_of(path)?;
            let content = fs::read(path).await?;
            entries.push(FileEntry::new(name, content));
            continue;
        }

        let root = file_name_of(path)?;
        for item in WalkDir::new(path).sort_by_file_name() {
            let item = item?;
            if !item.file_type().is_file() {
                continue;
            }
            let relative = item.path().strip_prefix(path)?;
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let content = fs::read(item.path()).await?;
            entries.push(FileEntry::new(format!("{root}/{relative}"), content));
        }
    }

    Ok(entries)
}

fn file_name_of(path: &Path) -> Result<String> {
    match path.file_name() {
        Some(name) => Ok(name.to_string_lossy().to_string()),
        None => bail!("Input has no file name: {}", path.display()),
    }
}
