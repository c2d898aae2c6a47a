//! Entry types flowing through the workflows.

use crate::registry::ResourceHandle;

/// A file to be archived: archive-relative path plus its bytes.
///
/// Paths always use forward slashes. Duplicate paths within one
/// compression are not rejected here; the later one wins in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    path: String,
    content: Vec<u8>,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into().replace('\\', "/"),
            content: content.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// File name without any folder prefix
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Leading folder of the path, if the entry came from a folder
    pub fn folder(&self) -> Option<&str> {
        self.path
            .split_once('/')
            .map(|(folder, _)| folder)
            .filter(|folder| !folder.is_empty())
    }
}

/// One file produced by extraction, owning the handle to its bytes
#[derive(Debug)]
pub struct ExtractedEntry {
    pub name: String,
    pub handle: ResourceHandle,
    pub selected: bool,
}

impl ExtractedEntry {
    pub fn new(name: String, handle: ResourceHandle) -> Self {
        Self {
            name,
            handle,
            selected: false,
        }
    }

    pub fn view(&self) -> EntryView {
        EntryView {
            name: self.name.clone(),
            size: self.handle.len(),
            selected: self.selected,
        }
    }
}

/// Read-only snapshot of an extracted entry for presentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryView {
    pub name: String,
    pub size: usize,
    pub selected: bool,
}
