//! # nfh-archiver
//!
//! Bundle a set of files, folder structure included, into a single `.bnd`
//! archive, and unpack such an archive into individually downloadable
//! entries that can be re-bundled selectively.
//!
//! The core is a workflow engine, [`Session`], which drives an
//! [`ArchiveCodec`] and hands finished buffers to a [`DownloadSink`].
//! Every buffer it hands out is tracked in a [`HandleRegistry`] and
//! released when the result set that owns it is discarded.
//!
//! ## Features
//!
//! - `.bnd` bundles in a ZIP-compatible container, DEFLATE at maximum level
//! - Extraction into per-entry handles plus an eager "download all" bundle
//! - Entry selection and re-bundling of the selection
//! - Observable workflow state (`Idle -> Running -> Succeeded/Failed -> Idle`)
//!   with non-decreasing progress
//! - At most one archive operation in flight per session
//!
//! ## Example
//!
//! ```no_run
//! use nfh_archiver::{EngineConfig, FileEntry, MemorySink, Mode, Session, ZipCodec};
//!
//! #[tokio::main]
//! async fn main() {
//!     let session = Session::new(ZipCodec::new(), MemorySink::new(), EngineConfig::default());
//!
//!     let files = vec![
//!         FileEntry::new("holiday/notes.txt", "day one"),
//!         FileEntry::new("holiday/route.gpx", "<gpx/>"),
//!     ];
//!     let _ = session.compress(files).await;
//!     let archive = session.sink().last().unwrap();
//!     assert_eq!(archive.file_name, "holiday.bnd");
//!
//!     session.switch_mode(Mode::Decompress);
//!     let _ = session
//!         .decompress(vec![FileEntry::new(archive.file_name, archive.bytes)])
//!         .await;
//!     for entry in session.entries() {
//!         println!("{} ({} bytes)", entry.name, entry.size);
//!     }
//! }
//! ```

pub mod cli;
pub mod codec;
pub mod config;
pub mod entry;
pub mod error;
pub mod io;
pub mod registry;
pub mod session;
pub mod state;
pub mod zip;

pub use cli::Cli;
pub use codec::{ArchiveCodec, ArchiveMember, ProgressFn, ZipCodec};
pub use config::EngineConfig;
pub use entry::{EntryView, ExtractedEntry, FileEntry};
pub use error::{Error, Outcome, Rejection, Result};
pub use io::{DirectorySink, Download, DownloadSink, MemoryReader, MemorySink, ReadAt};
pub use registry::{HandleRegistry, RegistryStats, ResourceHandle};
pub use session::Session;
pub use state::{Mode, Phase, WorkflowState};
pub use zip::CompressionMethod;
