use tracing::{error, info, warn};

use super::Session;
use crate::codec::{ArchiveCodec, ignore_progress};
use crate::error::{Error, Outcome, Rejection, Result};
use crate::io::DownloadSink;
use crate::registry::ResourceHandle;
use crate::state::{Phase, STATUS_SELECTION_FAILED};

impl<C: ArchiveCodec, S: DownloadSink> Session<C, S> {
    pub fn select_mode(&self) -> bool {
        self.results.lock().select_mode
    }

    /// Flip selection mode; entering it starts from an empty selection.
    ///
    /// Returns whether selection mode is now on.
    pub fn toggle_select_mode(&self) -> bool {
        let mut results = self.results.lock();
        results.select_mode = !results.select_mode;
        if results.select_mode {
            for entry in &mut results.entries {
                entry.selected = false;
            }
        }
        results.select_mode
    }

    /// Flip the selected flag of one entry, returning its new value.
    pub fn toggle_entry(&self, index: usize) -> Result<bool> {
        let mut results = self.results.lock();
        let len = results.entries.len();
        let entry = results
            .entries
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })?;
        entry.selected = !entry.selected;
        Ok(entry.selected)
    }

    pub fn selected_count(&self) -> usize {
        self.results
            .lock()
            .entries
            .iter()
            .filter(|entry| entry.selected)
            .count()
    }

    /// Re-bundle only the selected entries and deliver `<original>_selected.zip`.
    ///
    /// The archive is built fresh on every call and its handle is released
    /// as soon as the download has been handed off.
    pub async fn download_selected(&self) -> Outcome {
        let (sources, file_name) = {
            let results = self.results.lock();
            let sources: Vec<_> = results
                .entries
                .iter()
                .filter(|entry| entry.selected)
                .map(|entry| (entry.name.clone(), entry.handle.clone()))
                .collect();
            (sources, format!("{}_selected.zip", results.original_file_name))
        };
        if sources.is_empty() {
            return Outcome::Rejected(Rejection::NothingSelected);
        }
        if !self.claim() {
            warn!("Selection download ignored: another operation is running");
            return Outcome::Rejected(Rejection::Busy);
        }

        let result = self.bundle_and_deliver(&sources, &file_name).await;
        self.unclaim();

        match result {
            Ok(()) => {
                info!("Delivered {} selected entries as {file_name}", sources.len());
                Outcome::Completed
            }
            Err(err) => {
                error!("Selection bundle error: {err}");
                self.set_status(STATUS_SELECTION_FAILED.to_string());
                Outcome::Failed(err)
            }
        }
    }

    async fn bundle_and_deliver(
        &self,
        sources: &[(String, ResourceHandle)],
        file_name: &str,
    ) -> Result<()> {
        let contents = self.read_back(sources)?;
        let bytes = self
            .codec
            .compress_with(&contents, self.config.rebundle_method, &ignore_progress)
            .await?;

        let handle = self.registry.create(bytes);
        let delivered = self.deliver_handle(&handle, file_name).await;
        self.registry.release(&handle);
        delivered
    }

    /// Mark an operation in flight without touching status or progress.
    fn claim(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_processing {
                return false;
            }
            state.is_processing = true;
            state.phase = Phase::Running;
            true
        })
    }

    fn unclaim(&self) {
        self.state.send_modify(|state| {
            state.is_processing = false;
            state.phase = Phase::Idle;
        });
    }
}
