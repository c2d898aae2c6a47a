//! Observable workflow state.
//!
//! The session owns a single [`WorkflowState`] and publishes every change
//! through a `tokio::sync::watch` channel. Presentation layers either
//! subscribe to it or poll the current snapshot.

use std::fmt;

pub const STATUS_COMPRESSING: &str = "Compressing files...";
pub const STATUS_COMPRESSED: &str = "Compression complete!";
pub const STATUS_COMPRESS_FAILED: &str = "Error during compression";
pub const STATUS_DECOMPRESSING: &str = "Decompressing file...";
pub const STATUS_DECOMPRESSED: &str = "Decompression complete!";
pub const STATUS_DECOMPRESS_FAILED: &str = "Error during decompression";
pub const STATUS_SELECTION_FAILED: &str = "Error while bundling selection";

/// Status shown when decompression is given a file of the wrong type
pub fn wrong_extension_status(extension: &str) -> String {
    format!("Please select a .{extension} file")
}

/// Which side of the archiver is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Compress,
    Decompress,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Compress => write!(f, "compress"),
            Mode::Decompress => write!(f, "decompress"),
        }
    }
}

/// Lifecycle of one workflow: `Idle -> Running -> {Succeeded, Failed} -> Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkflowState {
    pub mode: Mode,
    pub phase: Phase,
    /// Percentage in `0..=100`
    pub progress: u8,
    pub status: String,
    /// True from the start of a workflow until it settles back to idle
    pub is_processing: bool,
}

impl WorkflowState {
    /// Begin a workflow unless one is already in flight.
    pub(crate) fn try_start(&mut self, status: &str) -> bool {
        if self.is_processing {
            return false;
        }
        self.is_processing = true;
        self.phase = Phase::Running;
        self.progress = 0;
        self.status = status.to_string();
        true
    }

    /// Raise progress; lower or equal values are ignored.
    pub(crate) fn advance(&mut self, progress: u8) -> bool {
        let progress = progress.min(100);
        if progress <= self.progress {
            return false;
        }
        self.progress = progress;
        true
    }

    pub(crate) fn finish(&mut self, phase: Phase, status: &str, progress: u8) {
        self.phase = phase;
        self.status = status.to_string();
        self.progress = progress;
    }

    pub(crate) fn settle(&mut self, reset_status: bool) {
        self.is_processing = false;
        self.phase = Phase::Idle;
        self.progress = 0;
        if reset_status {
            self.status.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_extension_message_names_the_extension() {
        assert_eq!(wrong_extension_status("bnd"), "Please select a .bnd file");
    }

    #[test]
    fn second_start_is_refused() {
        let mut state = WorkflowState::default();
        assert!(state.try_start(STATUS_COMPRESSING));
        state.advance(40);

        let before = state.clone();
        assert!(!state.try_start(STATUS_DECOMPRESSING));
        assert_eq!(state, before);
    }

    #[test]
    fn progress_never_moves_backwards() {
        let mut state = WorkflowState::default();
        assert!(state.advance(30));
        assert!(!state.advance(10));
        assert!(!state.advance(30));
        assert!(state.advance(250));
        assert_eq!(state.progress, 100);
    }

    #[test]
    fn settle_returns_to_idle() {
        let mut state = WorkflowState::default();
        state.try_start(STATUS_DECOMPRESSING);
        state.finish(Phase::Succeeded, STATUS_DECOMPRESSED, 100);
        assert!(state.phase.is_terminal());

        state.settle(false);
        assert_eq!(state.phase, Phase::Idle);
        assert!(!state.is_processing);
        assert_eq!(state.progress, 0);
        assert_eq!(state.status, STATUS_DECOMPRESSED);

        state.settle(true);
        assert!(state.status.is_empty());
    }
}
