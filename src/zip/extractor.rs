use flate2::read::DeflateDecoder;
use std::io::Read;
use std::sync::Arc;

use crate::io::ReadAt;
use anyhow::{Context, Result, bail};

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// Archive reader that lists members and inflates their contents
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all members of the archive
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files().await
    }

    /// Extract a member's content to memory, verifying size and CRC-32
    pub async fn extract_to_memory(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        if entry.is_directory {
            return Ok(Vec::new());
        }

        let data_offset = self.parser.get_data_offset(entry).await?;
        let mut raw = vec![0u8; entry.compressed_size as usize];
        self.parser.reader().read_at(data_offset, &mut raw).await?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => inflate(&raw, entry.uncompressed_size)
                .with_context(|| format!("Failed to inflate {}", entry.file_name))?,
            CompressionMethod::Unknown(code) => {
                bail!("Unsupported compression method {code} for {}", entry.file_name)
            }
        };

        if data.len() as u64 != entry.uncompressed_size {
            bail!(
                "Size mismatch for {}: expected {} bytes, got {}",
                entry.file_name,
                entry.uncompressed_size,
                data.len()
            );
        }

        let actual = crc32fast::hash(&data);
        if actual != entry.crc32 {
            bail!(
                "CRC mismatch for {}: expected {:08x}, got {actual:08x}",
                entry.file_name,
                entry.crc32
            );
        }

        Ok(data)
    }
}

/// Inflate raw DEFLATE data, reading at most one byte past the declared size
/// so an oversized stream is detected without being fully expanded.
fn inflate(raw: &[u8], declared: u64) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(declared.min(raw.len() as u64 * 4) as usize);
    DeflateDecoder::new(raw)
        .take(declared.saturating_add(1))
        .read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryReader;
    use crate::zip::ZipWriter;

    async fn extractor_for(bytes: Vec<u8>) -> (ZipExtractor<MemoryReader>, Vec<ZipFileEntry>) {
        let extractor = ZipExtractor::new(Arc::new(MemoryReader::new(bytes)));
        let entries = extractor.list_files().await.unwrap();
        (extractor, entries)
    }

    #[tokio::test]
    async fn inflates_deflated_members() {
        let text = b"a line of text\n".repeat(200);
        let mut writer = ZipWriter::new();
        writer.add_file("docs/a.txt", &text, CompressionMethod::Deflate).unwrap();
        let (extractor, entries) = extractor_for(writer.finish().unwrap()).await;

        assert!(entries[0].is_directory);
        assert_eq!(extractor.extract_to_memory(&entries[1]).await.unwrap(), text);
    }

    #[tokio::test]
    async fn corrupted_payload_fails_crc() {
        let mut writer = ZipWriter::new();
        writer.add_file("a.txt", b"payload", CompressionMethod::Stored).unwrap();
        let mut bytes = writer.finish().unwrap();
        // Flip a payload byte right after the 30 + 5 byte local header
        bytes[35] ^= 0xFF;

        let (extractor, entries) = extractor_for(bytes).await;
        let err = extractor.extract_to_memory(&entries[0]).await.unwrap_err();
        assert!(err.to_string().contains("CRC mismatch"));
    }
}
