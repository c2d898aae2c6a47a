use anyhow::{Context, Result, bail};
use chrono::{Datelike, Local, Timelike};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::collections::HashSet;
use std::io::Write;

use super::structures::{CompressionMethod, EndOfCentralDirectory, ZipFileEntry};

/// Maximum DEFLATE level, used for every compressed member
pub const MAX_LEVEL: u32 = 9;

/// In-memory archive writer.
///
/// Members are appended as local header plus payload; `finish` writes the
/// central directory and end record. Nested paths also get directory
/// members for each parent folder, emitted once, before the first file
/// beneath them.
pub struct ZipWriter {
    buf: Vec<u8>,
    entries: Vec<ZipFileEntry>,
    folders: HashSet<String>,
    mod_time: u16,
    mod_date: u16,
}

impl Default for ZipWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ZipWriter {
    pub fn new() -> Self {
        let (mod_time, mod_date) = dos_timestamp_now();
        Self {
            buf: Vec::new(),
            entries: Vec::new(),
            folders: HashSet::new(),
            mod_time,
            mod_date,
        }
    }

    /// Number of members written so far, directories included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a file member.
    pub fn add_file(&mut self, path: &str, data: &[u8], method: CompressionMethod) -> Result<()> {
        let path = path.trim_start_matches('/');
        if path.is_empty() || path.ends_with('/') {
            bail!("Invalid member name: {path:?}");
        }

        self.add_parent_folders(path)?;

        let payload = match method {
            CompressionMethod::Stored => data.to_vec(),
            CompressionMethod::Deflate => {
                deflate(data).with_context(|| format!("Failed to deflate {path}"))?
            }
            CompressionMethod::Unknown(code) => bail!("Unsupported compression method: {code}"),
        };

        self.push_member(
            path.to_string(),
            crc32fast::hash(data),
            data.len(),
            payload,
            method,
            false,
        )
    }

    fn add_parent_folders(&mut self, path: &str) -> Result<()> {
        let mut end = 0;
        while let Some(pos) = path[end..].find('/') {
            end += pos + 1;
            self.add_folder(path[..end].to_string())?;
        }
        Ok(())
    }

    fn add_folder(&mut self, name: String) -> Result<()> {
        if !self.folders.insert(name.clone()) {
            return Ok(());
        }
        self.push_member(name, 0, 0, Vec::new(), CompressionMethod::Stored, true)
    }

    fn push_member(
        &mut self,
        file_name: String,
        crc32: u32,
        uncompressed_size: usize,
        payload: Vec<u8>,
        method: CompressionMethod,
        is_directory: bool,
    ) -> Result<()> {
        let entry = ZipFileEntry {
            file_name,
            compression_method: method,
            compressed_size: payload.len() as u64,
            uncompressed_size: uncompressed_size as u64,
            crc32,
            lfh_offset: self.buf.len() as u64,
            last_mod_time: self.mod_time,
            last_mod_date: self.mod_date,
            is_directory,
        };

        entry.write_local_header(&mut self.buf)?;
        self.buf.extend_from_slice(&payload);
        self.entries.push(entry);
        Ok(())
    }

    /// Write the central directory and end record, returning the archive.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let Ok(count) = u16::try_from(self.entries.len()) else {
            bail!("Too many members for ZIP32: {}", self.entries.len());
        };

        let cd_offset = self.buf.len();
        for entry in &self.entries {
            entry.write_central_header(&mut self.buf)?;
        }
        let cd_size = self.buf.len() - cd_offset;

        match (u32::try_from(cd_offset), u32::try_from(cd_size)) {
            (Ok(offset), Ok(size)) if offset != u32::MAX && count != u16::MAX => {
                EndOfCentralDirectory::new(count, size, offset).write_to(&mut self.buf)?;
            }
            _ => bail!("Archive too large for ZIP32"),
        }

        Ok(self.buf)
    }
}

/// Raw DEFLATE at the maximum level.
fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(
        Vec::with_capacity(data.len() / 2),
        Compression::new(MAX_LEVEL),
    );
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Current local time as MS-DOS (time, date); clamps to the 1980 epoch.
fn dos_timestamp_now() -> (u16, u16) {
    let now = Local::now();
    if now.year() < 1980 {
        return (0, (1 << 5) | 1);
    }
    let time =
        ((now.hour() as u16) << 11) | ((now.minute() as u16) << 5) | (now.second() as u16 / 2);
    let date =
        (((now.year() - 1980) as u16) << 9) | ((now.month() as u16) << 5) | now.day() as u16;
    (time, date)
}
