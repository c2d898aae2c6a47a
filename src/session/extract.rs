use tracing::{debug, error, info, warn};

use super::Session;
use crate::codec::{ArchiveCodec, ignore_progress, round_percent};
use crate::entry::{ExtractedEntry, FileEntry};
use crate::error::{Error, Outcome, Rejection};
use crate::io::DownloadSink;
use crate::state::{
    Phase, STATUS_DECOMPRESS_FAILED, STATUS_DECOMPRESSED, STATUS_DECOMPRESSING,
    wrong_extension_status,
};

impl<C: ArchiveCodec, S: DownloadSink> Session<C, S> {
    /// Unpack a `.bnd` archive into individually downloadable entries.
    ///
    /// Only the first file is used. A file without the archive extension
    /// only updates the status. Starting a decompression releases the
    /// previous result set before anything is read.
    ///
    /// Entries join the result set as soon as their handle exists, so a
    /// failure while building the download-all bundle leaves the entries
    /// extracted so far in place, without a bundle.
    pub async fn decompress(&self, files: Vec<FileEntry>) -> Outcome {
        let Some(file) = files.into_iter().next() else {
            return Outcome::Rejected(Rejection::EmptyInput);
        };
        if self.is_processing() {
            warn!("Decompression ignored: another operation is running");
            return Outcome::Rejected(Rejection::Busy);
        }

        let Some(stem) = self.config.strip_archive_extension(file.file_name()) else {
            warn!("Decompression ignored: {} is not a bundle", file.file_name());
            self.set_status(wrong_extension_status(&self.config.archive_extension));
            return Outcome::Rejected(Rejection::WrongExtension {
                file_name: file.file_name().to_string(),
            });
        };
        let stem = stem.to_string();

        if !self.try_start(STATUS_DECOMPRESSING) {
            return Outcome::Rejected(Rejection::Busy);
        }

        self.clear();
        self.results.lock().original_file_name = stem.clone();
        info!("Decompressing {} ({} bytes)", file.file_name(), file.content().len());

        let outcome = match self.extract_members(&file).await {
            Ok(count) => {
                self.finish(Phase::Succeeded, STATUS_DECOMPRESSED, 100);
                info!("Decompression of {stem} complete: {count} entries");
                Outcome::Completed
            }
            Err(err) => {
                error!("Decompression error: {err}");
                self.finish(Phase::Failed, STATUS_DECOMPRESS_FAILED, 0);
                Outcome::Failed(err)
            }
        };

        self.settle(false).await;
        outcome
    }

    async fn extract_members(&self, file: &FileEntry) -> Result<usize, Error> {
        let members = self
            .codec
            .decompress(file.content(), &|pct: u8| self.report_progress(pct))
            .await?;
        let total = members.len() as u64;

        for (processed, member) in (1u64..).zip(members) {
            if !member.is_directory {
                debug!("Extracted {} ({} bytes)", member.name, member.content.len());
                let handle = self.registry.create(member.content);
                self.results
                    .lock()
                    .entries
                    .push(ExtractedEntry::new(member.name, handle));
            }
            self.report_progress(round_percent(processed, total));
            tokio::task::yield_now().await;
        }

        let sources: Vec<_> = self
            .results
            .lock()
            .entries
            .iter()
            .map(|entry| (entry.name.clone(), entry.handle.clone()))
            .collect();
        let contents = self.read_back(&sources)?;

        let bundle = self
            .codec
            .compress_with(&contents, self.config.rebundle_method, &ignore_progress)
            .await?;
        let handle = self.registry.create(bundle);
        self.results.lock().bundle = Some(handle);

        Ok(sources.len())
    }
}
