use super::ReadAt;
use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::Arc;

/// Random access over an archive held entirely in memory
pub struct MemoryReader {
    data: Arc<[u8]>,
}

impl MemoryReader {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into() }
    }
}

#[async_trait]
impl ReadAt for MemoryReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let start = match usize::try_from(offset) {
            Ok(start) if start <= self.data.len() => start,
            _ => bail!("Read past end of archive at offset {offset}"),
        };
        let end = start
            .checked_add(buf.len())
            .filter(|end| *end <= self.data.len());
        let Some(end) = end else {
            bail!(
                "Unexpected end of archive: wanted {} bytes at offset {offset}, archive is {} bytes",
                buf.len(),
                self.data.len()
            );
        };

        buf.copy_from_slice(&self.data[start..end]);
        Ok(buf.len())
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_exact_ranges() {
        let reader = MemoryReader::new(b"0123456789".to_vec());
        let mut buf = [0u8; 4];
        assert_eq!(reader.read_at(3, &mut buf).await.unwrap(), 4);
        assert_eq!(&buf, b"3456");
        assert_eq!(reader.size(), 10);
    }

    #[tokio::test]
    async fn short_reads_are_errors() {
        let reader = MemoryReader::new(b"0123".to_vec());
        let mut buf = [0u8; 4];
        assert!(reader.read_at(1, &mut buf).await.is_err());
        assert!(reader.read_at(u64::MAX, &mut buf).await.is_err());
    }
}
