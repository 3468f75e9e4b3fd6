//! Sieve - fail-closed sanitizer for Ogg media and markup tags.
//!
//! This binary provides the CLI interface to the contentsieve libraries,
//! reading from a file or stdin and writing to a file or stdout.

mod cli;

use clap::Parser as ClapParser;
use cli::{Cli, Mode};
use log::{debug, error, info, LevelFilter};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};

use contentsieve_config::Config;
use contentsieve_container::OggFilter;
use contentsieve_core::{FilterError, Result, Verdict};
use contentsieve_markup::{rewrite_uri_attributes, FilterCallback, ParsedTag};
use contentsieve_policy::create_policy;
use url::Url;

fn main() {
    let cli = <Cli as ClapParser>::parse();

    // Handle --paths flag
    if cli.show_paths {
        cli::show_paths();
        return;
    }

    // Set up logging
    setup_logging(&cli.log_level);
    info!("Sieve v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&cli) {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Set up logging based on the log level argument.
fn setup_logging(level: &str) {
    let filter = match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Warn,
    };

    env_logger::Builder::new()
        .filter_level(filter)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

/// Main application logic.
fn run(cli: &Cli) -> Result<()> {
    let config = Config::load_with_override(cli.config.as_deref())?;
    debug!("Loaded config: {:?}", config);

    match cli.mode {
        Mode::Ogg => {
            let sanitized = sanitize_ogg(cli, &config)?;
            let mut output = open_output(cli)?;
            output.write_all(&sanitized)?;
            output.flush()?;
        }
        Mode::Tags => {
            let mut output = open_output(cli)?;
            run_tags(cli, &config, &mut output)?;
            output.flush()?;
        }
    }
    Ok(())
}

fn open_input(cli: &Cli) -> Result<Box<dyn Read>> {
    Ok(match &cli.input {
        Some(path) => {
            info!("Reading {}", path.display());
            Box::new(File::open(path)?)
        }
        None => {
            info!("Reading from stdin");
            Box::new(io::stdin().lock())
        }
    })
}

fn open_output(cli: &Cli) -> Result<Box<dyn Write>> {
    Ok(match &cli.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    })
}

/// Filter a whole Ogg container in memory.
///
/// The output is opened only after this succeeds, so a rejected
/// container never creates or truncates the output file.
fn sanitize_ogg(cli: &Cli, config: &Config) -> Result<Vec<u8>> {
    let mut input = Vec::new();
    open_input(cli)?.read_to_end(&mut input)?;

    let filter = OggFilter::new(config.container.clone());
    let (sanitized, report) = filter.filter_to_vec(&input)?;
    info!("{}", report);
    Ok(sanitized)
}

/// Filter tags, one per line.
fn run_tags<W: Write>(cli: &Cli, config: &Config, output: &mut W) -> Result<()> {
    let base = cli
        .base
        .as_deref()
        .map(Url::parse)
        .transpose()
        .map_err(|e| FilterError::UriSyntax(format!("Invalid base URL: {}", e)))?;
    let name = cli.policy.as_deref().unwrap_or(&config.markup.policy);
    let mut policy = create_policy(name, &config.markup, base.as_ref())?;
    info!("Using policy {}", name);

    for line in BufReader::new(open_input(cli)?).lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(filtered) = filter_tag(policy.as_mut(), line) {
            writeln!(output, "{}", filtered)?;
        }
    }
    policy.on_finished();
    Ok(())
}

/// Sanitize one tag, or `None` when it must be removed.
///
/// The policy may replace or drop the whole tag. If it abstains, each URI
/// attribute is vetted on its own.
fn filter_tag(policy: &mut dyn FilterCallback, text: &str) -> Option<String> {
    let Some(tag) = ParsedTag::parse(text) else {
        debug!("Not a tag, removing: {}", text);
        return None;
    };

    match policy.process_tag(&tag) {
        Verdict::Replace(replacement) => Some(replacement),
        Verdict::Drop => {
            debug!("Policy dropped <{}>", tag.element);
            None
        }
        Verdict::Abstain => {
            let mut write_after_tag = String::new();
            let rewritten = rewrite_uri_attributes(&tag, policy, &mut write_after_tag);
            Some(format!("{}{}", rewritten, write_after_tag))
        }
    }
}
