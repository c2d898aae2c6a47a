//! The archive workflow engine.
//!
//! A [`Session`] holds everything one interactive run needs: the workflow
//! state, the handle registry, and the current extraction result set. The
//! workflows themselves live in submodules:
//!
//! - [`compress`](Session::compress): files in, one `.bnd` download out
//! - [`decompress`](Session::decompress): one `.bnd` in, extracted entries
//!   plus a download-all bundle out
//! - selection: choose entries and re-bundle just those
//!
//! At most one archive operation runs at a time. The check happens inside
//! the state channel's lock, so a second call made while the first is in
//! flight (or still settling) returns [`Rejection::Busy`] without touching
//! the session.

mod compress;
mod extract;
mod selection;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::codec::ArchiveCodec;
use crate::config::EngineConfig;
use crate::entry::{EntryView, ExtractedEntry, FileEntry};
use crate::error::{Error, Outcome, Rejection};
use crate::io::DownloadSink;
use crate::registry::{HandleRegistry, ResourceHandle};
use crate::state::{Mode, Phase, WorkflowState};

/// Entries produced by the last decompression and the handles they own
#[derive(Debug, Default)]
struct ResultSet {
    entries: Vec<ExtractedEntry>,
    bundle: Option<ResourceHandle>,
    original_file_name: String,
    select_mode: bool,
}

pub struct Session<C, S> {
    config: EngineConfig,
    codec: C,
    sink: S,
    registry: HandleRegistry,
    state: watch::Sender<WorkflowState>,
    results: Mutex<ResultSet>,
}

impl<C: ArchiveCodec, S: DownloadSink> Session<C, S> {
    pub fn new(codec: C, sink: S, config: EngineConfig) -> Self {
        let (state, _) = watch::channel(WorkflowState::default());
        Self {
            config,
            codec,
            sink,
            registry: HandleRegistry::new(),
            state,
            results: Mutex::new(ResultSet::default()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    /// Current state snapshot
    pub fn state(&self) -> WorkflowState {
        self.state.borrow().clone()
    }

    /// Observe every state change
    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.state.subscribe()
    }

    pub fn mode(&self) -> Mode {
        self.state.borrow().mode
    }

    pub fn is_processing(&self) -> bool {
        self.state.borrow().is_processing
    }

    /// Switch between compressing and decompressing.
    ///
    /// Always clears the current result set, even when the mode is unchanged.
    pub fn switch_mode(&self, mode: Mode) {
        self.state.send_if_modified(|state| {
            let changed = state.mode != mode;
            state.mode = mode;
            changed
        });
        self.clear();
        info!("Switched to {mode} mode");
    }

    /// Route dropped files to the workflow of the current mode.
    pub async fn submit(&self, files: Vec<FileEntry>) -> Outcome {
        match self.mode() {
            Mode::Compress => self.compress(files).await,
            Mode::Decompress => self.decompress(files).await,
        }
    }

    /// Discard the result set, releasing every handle it owns.
    pub fn clear(&self) {
        let previous = std::mem::take(&mut *self.results.lock());
        let released = self.registry.release_all(
            previous
                .entries
                .iter()
                .map(|entry| &entry.handle)
                .chain(previous.bundle.as_ref()),
        );
        if released > 0 {
            debug!("Cleared result set, released {released} handles");
        }
    }

    /// Snapshot of the extracted entries
    pub fn entries(&self) -> Vec<EntryView> {
        self.results
            .lock()
            .entries
            .iter()
            .map(ExtractedEntry::view)
            .collect()
    }

    /// Handles currently owned by the result set, bundle last
    pub fn owned_handles(&self) -> Vec<ResourceHandle> {
        let results = self.results.lock();
        results
            .entries
            .iter()
            .map(|entry| entry.handle.clone())
            .chain(results.bundle.clone())
            .collect()
    }

    /// Name of the last decompressed archive without its extension
    pub fn original_file_name(&self) -> String {
        self.results.lock().original_file_name.clone()
    }

    pub fn has_bundle(&self) -> bool {
        self.results.lock().bundle.is_some()
    }

    /// Deliver one extracted entry under its archive name.
    pub async fn download_entry(&self, index: usize) -> Outcome {
        let target = {
            let results = self.results.lock();
            results
                .entries
                .get(index)
                .map(|entry| (entry.name.clone(), entry.handle.clone()))
                .ok_or(Error::IndexOutOfRange {
                    index,
                    len: results.entries.len(),
                })
        };

        let result = match target {
            Ok((name, handle)) => self.deliver_handle(&handle, &name).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => Outcome::Completed,
            Err(err) => Outcome::Failed(err),
        }
    }

    /// Deliver the download-all bundle as `<original>.zip`.
    pub async fn download_all(&self) -> Outcome {
        let target = {
            let results = self.results.lock();
            results
                .bundle
                .clone()
                .map(|handle| (format!("{}.zip", results.original_file_name), handle))
        };
        let Some((name, handle)) = target else {
            return Outcome::Rejected(Rejection::NoBundle);
        };

        match self.deliver_handle(&handle, &name).await {
            Ok(()) => Outcome::Completed,
            Err(err) => Outcome::Failed(err),
        }
    }

    async fn deliver_handle(&self, handle: &ResourceHandle, file_name: &str) -> Result<(), Error> {
        let bytes = self.registry.read(handle)?;
        self.sink
            .deliver(file_name, &bytes)
            .await
            .map_err(|source| Error::Delivery {
                file_name: file_name.to_string(),
                source,
            })?;
        info!("Delivered {file_name} ({} bytes)", bytes.len());
        Ok(())
    }

    /// Read entries back through their handles, e.g. to re-bundle them.
    fn read_back<'a, I>(&self, handles: I) -> Result<Vec<FileEntry>, Error>
    where
        I: IntoIterator<Item = &'a (String, ResourceHandle)>,
    {
        handles
            .into_iter()
            .map(|(name, handle)| {
                let bytes = self.registry.read(handle)?;
                Ok(FileEntry::new(name.clone(), bytes.to_vec()))
            })
            .collect()
    }

    fn try_start(&self, status: &str) -> bool {
        self.state.send_if_modified(|state| state.try_start(status))
    }

    fn report_progress(&self, progress: u8) {
        self.state.send_if_modified(|state| state.advance(progress));
    }

    fn set_status(&self, status: String) {
        self.state.send_modify(|state| state.status = status);
    }

    fn finish(&self, phase: Phase, status: &str, progress: u8) {
        self.state
            .send_modify(|state| state.finish(phase, status, progress));
    }

    /// Hold the terminal state for the observation delay, then go idle.
    ///
    /// Without a delay the task still yields once, so subscribers get to
    /// see the terminal state before it is replaced.
    async fn settle(&self, reset_status: bool) {
        match self.config.observation_delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
        self.state.send_modify(|state| state.settle(reset_status));
    }
}
