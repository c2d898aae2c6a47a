//! Archive Codec Adapter.
//!
//! The workflows only see [`ArchiveCodec`]: "entries in, archive bytes
//! out" and back, with progress reported as integer percentages. The
//! default implementation, [`ZipCodec`], is backed by the crate's own ZIP
//! container. Progress callbacks are non-decreasing but need not end at
//! 100; pinning the final value is the workflow's job.

mod progress;
mod zip_codec;

pub use progress::{ProgressScale, round_percent};
pub use zip_codec::ZipCodec;

use async_trait::async_trait;

use crate::entry::FileEntry;
use crate::error::Result;
use crate::zip::CompressionMethod;

/// Progress callback receiving percentages in `0..=100`
pub type ProgressFn<'a> = &'a (dyn Fn(u8) + Send + Sync);

/// Progress callback that discards every update
pub fn ignore_progress(_: u8) {}

/// One member read back from an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    pub name: String,
    pub is_directory: bool,
    pub content: Vec<u8>,
}

#[async_trait]
pub trait ArchiveCodec: Send + Sync {
    /// Archive `entries` with the given member method.
    async fn compress_with(
        &self,
        entries: &[FileEntry],
        method: CompressionMethod,
        on_progress: ProgressFn<'_>,
    ) -> Result<Vec<u8>>;

    /// Archive `entries` with DEFLATE at the maximum level.
    async fn compress(&self, entries: &[FileEntry], on_progress: ProgressFn<'_>) -> Result<Vec<u8>> {
        self.compress_with(entries, CompressionMethod::Deflate, on_progress)
            .await
    }

    /// Read every member of `archive`, directories included.
    async fn decompress(
        &self,
        archive: &[u8],
        on_progress: ProgressFn<'_>,
    ) -> Result<Vec<ArchiveMember>>;
}
