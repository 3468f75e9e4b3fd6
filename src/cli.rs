//! Command-line interface for sieve.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// What kind of input is being filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// An Ogg container carrying Theora and/or Vorbis
    Ogg,
    /// Markup tags, one per line
    Tags,
}

/// Sieve - fail-closed sanitizer for Ogg media and markup tags.
///
/// Ogg input is demultiplexed and every codec packet is validated; only
/// packets that conform to the codec grammar are written back out. Tag
/// input is run through a markup policy one tag per line.
#[derive(Parser, Debug)]
#[command(
    name = "sieve",
    author = "Contentsieve Contributors",
    version,
    about = "Fail-closed sanitizer for Ogg media streams and markup tags",
    after_help = "Examples:\n  \
                  sieve clip.ogv -o clean.ogv\n  \
                  sieve -m tags -p generic -b http://127.0.0.1:8888/site/ < tags.txt\n  \
                  sieve -c '[container]\\nCodecs = [\"vorbis\"]' song.oga -o clean.oga"
)]
pub struct Cli {
    /// Input file (reads from stdin if not provided)
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Input kind
    #[arg(short = 'm', long = "mode", value_enum, default_value = "ogg")]
    pub mode: Mode,

    /// Output file (writes to stdout if not provided)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Use a custom config file or inline TOML
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    /// Set the logging level (trace, debug, info, warn, error)
    #[arg(short = 'l', long = "loglevel", default_value = "warn")]
    pub log_level: String,

    /// Markup policy for tag mode (overrides the configured one)
    #[arg(short = 'p', long = "policy")]
    pub policy: Option<String>,

    /// Base URL of the document the tags come from
    #[arg(short = 'b', long = "base", value_name = "URL")]
    pub base: Option<String>,

    /// Show configuration paths and exit
    #[arg(long = "paths")]
    pub show_paths: bool,
}

/// Show paths information.
pub fn show_paths() {
    use contentsieve_config::Config;

    let config_path = Config::config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not found)".to_string());

    println!("paths:");
    println!("  config                {}", config_path);
}
