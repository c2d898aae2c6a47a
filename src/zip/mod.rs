//! ZIP-compatible container used for `.bnd` bundles.
//!
//! ## Architecture
//!
//! - [`structures`]: records of the format (EOCD, headers) with their
//!   byte-level encoding
//! - [`parser`]: async parsing of those records from any [`ReadAt`](crate::io::ReadAt)
//! - [`extractor`]: member listing and content extraction
//! - [`writer`]: in-memory archive creation
//!
//! ## Supported Features
//!
//! - STORED and DEFLATE members, CRC-32 verified on read
//! - ZIP64 end records and extra fields on read
//! - UTF-8 member names
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archives
//! - ZIP64 is never written; archives are limited to 65534 members and 4 GiB

mod extractor;
mod parser;
mod structures;
mod writer;

pub use extractor::ZipExtractor;
pub use parser::ZipParser;
pub use structures::*;
pub use writer::{MAX_LEVEL, ZipWriter};
