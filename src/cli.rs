use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::zip::CompressionMethod;

#[derive(Parser, Debug)]
#[command(name = "nfh")]
#[command(version)]
#[command(about = "Bundle files into .bnd archives and unpack them again", long_about = None)]
#[command(after_help = "Examples:\n  \
  nfh compress holiday/              bundle a folder into holiday.bnd\n  \
  nfh compress a.txt b.txt -d out    bundle loose files into out/compressed.bnd\n  \
  nfh decompress holiday.bnd -l      list the entries of a bundle\n  \
  nfh decompress holiday.bnd --select '*.jpg'   re-bundle matches into holiday_selected.zip")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose logging (-vv for debug output)
    #[arg(short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Keep the final status visible for this many milliseconds
    #[arg(long, value_name = "MS", default_value_t = 0, global = true)]
    pub delay_ms: u64,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bundle files and folders into a .bnd archive
    Compress {
        /// Files or folders to bundle
        #[arg(value_name = "PATHS", required = true)]
        paths: Vec<PathBuf>,

        /// Write the archive into DIR
        #[arg(short = 'd', value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,
    },

    /// Unpack a .bnd archive
    Decompress {
        /// The .bnd archive
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Write output into DIR
        #[arg(short = 'd', value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,

        /// List entries only
        #[arg(short = 'l')]
        list: bool,

        /// Save every entry as one <name>.zip bundle instead of loose files
        #[arg(long)]
        all: bool,

        /// Re-bundle entries matching these patterns into <name>_selected.zip
        #[arg(long, value_name = "PATTERN", num_args = 1..)]
        select: Vec<String>,

        /// Store re-bundled archives without compression
        #[arg(long)]
        stored: bool,
    },
}

impl Cli {
    /// Default log filter when RUST_LOG is unset
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        let config =
            EngineConfig::default().with_observation_delay(Duration::from_millis(self.delay_ms));
        match &self.command {
            Command::Decompress { stored: true, .. } => {
                config.with_rebundle_method(CompressionMethod::Stored)
            }
            _ => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decompress_selection() {
        let cli = Cli::parse_from([
            "nfh", "-v", "decompress", "trip.bnd", "--select", "*.jpg", "notes.txt", "--stored",
        ]);
        let Command::Decompress { file, select, .. } = &cli.command else {
            panic!("expected decompress");
        };
        assert_eq!(file, &PathBuf::from("trip.bnd"));
        assert_eq!(select, &["*.jpg", "notes.txt"]);
        assert_eq!(cli.log_filter(), "info");
        assert_eq!(cli.engine_config().rebundle_method, CompressionMethod::Stored);
    }

    #[test]
    fn compress_requires_paths() {
        assert!(Cli::try_parse_from(["nfh", "compress"]).is_err());
    }
}
