use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::{ArchiveCodec, ArchiveMember, ProgressFn, ProgressScale};
use crate::entry::FileEntry;
use crate::error::{Error, Result};
use crate::io::MemoryReader;
use crate::zip::{CompressionMethod, ZipExtractor, ZipWriter};

/// [`ArchiveCodec`] backed by the ZIP container
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipCodec;

impl ZipCodec {
    pub fn new() -> Self {
        Self
    }
}

/// Collapse duplicate paths: the last content wins, the first position stays.
fn dedup_by_path(entries: &[FileEntry]) -> Vec<&FileEntry> {
    let mut unique: Vec<&FileEntry> = Vec::with_capacity(entries.len());
    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(entries.len());
    for entry in entries {
        match positions.get(entry.path()) {
            Some(&index) => unique[index] = entry,
            None => {
                positions.insert(entry.path(), unique.len());
                unique.push(entry);
            }
        }
    }
    unique
}

#[async_trait]
impl ArchiveCodec for ZipCodec {
    async fn compress_with(
        &self,
        entries: &[FileEntry],
        method: CompressionMethod,
        on_progress: ProgressFn<'_>,
    ) -> Result<Vec<u8>> {
        let entries = dedup_by_path(entries);
        // Every entry weighs at least one unit so empty files still advance
        let total = entries.iter().map(|e| e.content().len() as u64 + 1).sum();
        let mut scale = ProgressScale::new(total);
        let mut writer = ZipWriter::new();

        for entry in entries {
            writer
                .add_file(entry.path(), entry.content(), method)
                .map_err(Error::codec)?;
            if let Some(pct) = scale.advance(entry.content().len() as u64 + 1) {
                on_progress(pct);
            }
            tokio::task::yield_now().await;
        }

        let members = writer.len();
        let bytes = writer.finish().map_err(Error::codec)?;
        debug!("Wrote archive with {members} members ({} bytes)", bytes.len());
        Ok(bytes)
    }

    async fn decompress(
        &self,
        archive: &[u8],
        on_progress: ProgressFn<'_>,
    ) -> Result<Vec<ArchiveMember>> {
        let extractor = ZipExtractor::new(Arc::new(MemoryReader::new(archive.to_vec())));
        let listing = extractor.list_files().await.map_err(Error::codec)?;

        let mut scale = ProgressScale::new(listing.len() as u64);
        let mut members = Vec::with_capacity(listing.len());
        for entry in &listing {
            let content = extractor
                .extract_to_memory(entry)
                .await
                .map_err(Error::codec)?;
            members.push(ArchiveMember {
                name: entry.file_name.clone(),
                is_directory: entry.is_directory,
                content,
            });
            if let Some(pct) = scale.advance(1) {
                on_progress(pct);
            }
            tokio::task::yield_now().await;
        }

        debug!("Read {} members from archive", members.len());
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ignore_progress;
    use parking_lot::Mutex;

    #[tokio::test]
    async fn roundtrip_keeps_folders_and_content() {
        let codec = ZipCodec::new();
        let entries = vec![
            FileEntry::new("trip/day1.txt", "sunny"),
            FileEntry::new("trip/photos/a.jpg", vec![0xFFu8, 0xD8, 0xFF]),
        ];

        let bytes = codec.compress(&entries, &ignore_progress).await.unwrap();
        let members = codec.decompress(&bytes, &ignore_progress).await.unwrap();

        let files: Vec<_> = members.iter().filter(|m| !m.is_directory).collect();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "trip/day1.txt");
        assert_eq!(files[0].content, b"sunny");
        assert_eq!(files[1].content, [0xFF, 0xD8, 0xFF]);
        assert!(members.iter().any(|m| m.is_directory && m.name == "trip/photos/"));
    }

    #[tokio::test]
    async fn compress_progress_is_monotonic() {
        let seen = Mutex::new(Vec::new());
        let entries: Vec<_> = (0..20)
            .map(|i| FileEntry::new(format!("f{i}.bin"), vec![i as u8; 100 * i]))
            .collect();

        ZipCodec::new()
            .compress(&entries, &|pct: u8| seen.lock().push(pct))
            .await
            .unwrap();

        let seen = seen.into_inner();
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(seen.last(), Some(&100));
    }

    #[tokio::test]
    async fn decompress_progress_counts_every_member() {
        let codec = ZipCodec::new();
        let entries = vec![
            FileEntry::new("x/a.txt", "a"),
            FileEntry::new("x/b.txt", "b"),
            FileEntry::new("c.txt", "c"),
        ];
        let bytes = codec.compress(&entries, &ignore_progress).await.unwrap();

        let seen = Mutex::new(Vec::new());
        let members = codec
            .decompress(&bytes, &|pct: u8| seen.lock().push(pct))
            .await
            .unwrap();

        // "x/" is a member too
        assert_eq!(members.len(), 4);
        assert_eq!(seen.into_inner(), [25, 50, 75, 100]);
    }

    #[tokio::test]
    async fn duplicate_paths_overwrite() {
        let codec = ZipCodec::new();
        let entries = vec![
            FileEntry::new("a.txt", "old"),
            FileEntry::new("b.txt", "b1"),
            FileEntry::new("a.txt", "new"),
            FileEntry::new("c.txt", "c"),
            FileEntry::new("b.txt", "b2"),
        ];

        let bytes = codec.compress(&entries, &ignore_progress).await.unwrap();
        let members = codec.decompress(&bytes, &ignore_progress).await.unwrap();

        let files: Vec<_> = members
            .iter()
            .map(|m| (m.name.as_str(), m.content.as_slice()))
            .collect();
        assert_eq!(
            files,
            [
                ("a.txt", &b"new"[..]),
                ("b.txt", &b"b2"[..]),
                ("c.txt", &b"c"[..])
            ]
        );
    }

    #[tokio::test]
    async fn malformed_archive_is_a_codec_error() {
        let err = ZipCodec::new()
            .decompress(b"PK\x03\x04 not really", &ignore_progress)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Codec(_)));
    }
}
