//! Command-line driver for the nfh archiver.
//!
//! Files and folders come from the filesystem, and every download the
//! session triggers is saved into the output directory.

use anyhow::{Result, bail};
use clap::Parser;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use nfh_archiver::cli::Command;
use nfh_archiver::io::collect_inputs;
use nfh_archiver::{
    Cli, DirectorySink, EngineConfig, FileEntry, Mode, Outcome, Session, ZipCodec,
};

type CliSession = Session<ZipCodec, DirectorySink>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.engine_config();
    match &cli.command {
        Command::Compress { paths, out_dir } => compress(paths, out_dir, config).await,
        Command::Decompress {
            file,
            out_dir,
            list,
            all,
            select,
            ..
        } => {
            let session = Session::new(ZipCodec::new(), DirectorySink::new(out_dir), config);
            decompress(&session, file, *list, *all, select).await
        }
    }
}

/// Bundle the given paths into one archive inside `out_dir`.
async fn compress(
    paths: &[std::path::PathBuf],
    out_dir: &Path,
    config: EngineConfig,
) -> Result<()> {
    let files = collect_inputs(paths).await?;
    if files.is_empty() {
        bail!("Nothing to compress: no files found");
    }

    let session = Session::new(ZipCodec::new(), DirectorySink::new(out_dir), config);
    let outcome = session.compress(files).await;
    report(&session, outcome)
}

/// Unpack an archive, then list, bundle, select or save its entries.
async fn decompress(
    session: &CliSession,
    file: &Path,
    list: bool,
    all: bool,
    select: &[String],
) -> Result<()> {
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let content = tokio::fs::read(file).await?;

    session.switch_mode(Mode::Decompress);
    let outcome = session
        .decompress(vec![FileEntry::new(file_name, content)])
        .await;
    report(session, outcome)?;

    let entries = session.entries();

    if list {
        for entry in &entries {
            println!("{:>12}  {}", format_size(entry.size as u64), entry.name);
        }
        println!("{} entries", entries.len());
        return Ok(());
    }

    if !select.is_empty() {
        session.toggle_select_mode();
        for (index, entry) in entries.iter().enumerate() {
            if select.iter().any(|pattern| matches_pattern(pattern, &entry.name)) {
                session.toggle_entry(index)?;
            }
        }
        println!("  selected: {} of {} entries", session.selected_count(), entries.len());
        return report(session, session.download_selected().await);
    }

    if all {
        return report(session, session.download_all().await);
    }

    for (index, entry) in entries.iter().enumerate() {
        println!("  extracting: {}", entry.name);
        report(session, session.download_entry(index).await)?;
    }

    Ok(())
}

/// Print the session status and turn a failed or rejected outcome into an error.
fn report(session: &CliSession, outcome: Outcome) -> Result<()> {
    let status = session.state().status;
    match outcome {
        Outcome::Completed => {
            if !status.is_empty() {
                println!("{status}");
            }
            Ok(())
        }
        Outcome::Rejected(rejection) => {
            if status.is_empty() {
                bail!("{rejection}")
            }
            bail!("{status} ({rejection})")
        }
        Outcome::Failed(err) => Err(err.into()),
    }
}

/// Match an entry name against a selection pattern.
///
/// Patterns without wildcards match the full name or its last segment.
fn matches_pattern(pattern: &str, name: &str) -> bool {
    if has_glob_chars(pattern) {
        return glob_match(pattern, name);
    }
    name == pattern || name.rsplit('/').next() == Some(pattern)
}

/// Check if a pattern contains glob wildcard characters.
fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Glob matching supporting `*` (any run, including `/`) and `?` (one character).
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();

    fn do_match(pattern: &[char], text: &[char]) -> bool {
        match (pattern.first(), text.first()) {
            (None, None) => true,
            // Zero characters, or one more and keep the star
            (Some('*'), _) => {
                do_match(&pattern[1..], text)
                    || (!text.is_empty() && do_match(pattern, &text[1..]))
            }
            (Some('?'), Some(_)) => do_match(&pattern[1..], &text[1..]),
            (Some(p), Some(t)) if *p == *t => do_match(&pattern[1..], &text[1..]),
            _ => false,
        }
    }

    do_match(&pattern_chars, &text_chars)
}

/// Format a byte size with the largest fitting unit.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_match_names_and_basenames() {
        assert!(matches_pattern("*.jpg", "trip/photos/a.jpg"));
        assert!(matches_pattern("notes.txt", "trip/notes.txt"));
        assert!(matches_pattern("trip/notes.txt", "trip/notes.txt"));
        assert!(matches_pattern("day?.txt", "day1.txt"));
        assert!(!matches_pattern("*.png", "trip/photos/a.jpg"));
        assert!(!matches_pattern("otes.txt", "trip/notes.txt"));
    }

    #[test]
    fn sizes_pick_units() {
        assert_eq!(format_size(500), "500 bytes");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1048576), "1.00 MB");
    }
}
