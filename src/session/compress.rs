use tracing::{error, info, warn};

use super::Session;
use crate::codec::ArchiveCodec;
use crate::entry::FileEntry;
use crate::error::{Outcome, Rejection};
use crate::io::DownloadSink;
use crate::state::{Phase, STATUS_COMPRESS_FAILED, STATUS_COMPRESSED, STATUS_COMPRESSING};

impl<C: ArchiveCodec, S: DownloadSink> Session<C, S> {
    /// Bundle `files` into one archive and deliver it as `<base>.bnd`.
    ///
    /// The base name is the folder the first file came from, or the
    /// configured default for loose files. Empty input, or a call while
    /// another operation is running, changes nothing.
    pub async fn compress(&self, files: Vec<FileEntry>) -> Outcome {
        if files.is_empty() {
            return Outcome::Rejected(Rejection::EmptyInput);
        }
        if !self.try_start(STATUS_COMPRESSING) {
            warn!("Compression ignored: another operation is running");
            return Outcome::Rejected(Rejection::Busy);
        }

        let base_name = files[0]
            .folder()
            .unwrap_or(self.config.default_base_name.as_str())
            .to_string();
        let file_name = self.config.archive_name(&base_name);
        info!("Compressing {} files into {file_name}", files.len());

        let result = match self
            .codec
            .compress(&files, &|pct: u8| self.report_progress(pct))
            .await
        {
            Ok(bytes) => {
                // The archive is only needed until the download is handed off
                let handle = self.registry.create(bytes);
                let delivered = self.deliver_handle(&handle, &file_name).await;
                self.registry.release(&handle);
                delivered
            }
            Err(err) => Err(err),
        };

        let outcome = match result {
            Ok(()) => {
                self.finish(Phase::Succeeded, STATUS_COMPRESSED, 100);
                info!("Compression of {file_name} complete");
                Outcome::Completed
            }
            Err(err) => {
                error!("Compression error: {err}");
                self.finish(Phase::Failed, STATUS_COMPRESS_FAILED, 0);
                Outcome::Failed(err)
            }
        };

        self.settle(true).await;
        outcome
    }
}
