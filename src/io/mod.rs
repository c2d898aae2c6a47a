mod memory;
mod sink;
mod source;

pub use memory::MemoryReader;
pub use sink::{DirectorySink, Download, DownloadSink, MemorySink};
pub use source::collect_inputs;

use anyhow::Result;
use async_trait::async_trait;

/// Trait for random access reading from an archive source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Fill `buf` with the bytes starting at `offset`
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;
}
