//! `structflex` command-line harness
//!
//! Runs one conversion over a JSON fixture (see `structflex_serde::Fixture`)
//! and prints `{"result": ..., "diagnostics": [...]}` to stdout. The process
//! exits with 1 when the conversion recorded an error and with 2 when the
//! fixture itself could not be loaded.
//!
//! ```text
//! structflex externalize firewall.json
//! structflex internalize firewall.json --options strict.json -vv
//! structflex check schema.json
//! structflex matrix
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::{json, Value as Json};
use structflex_engine::{Engine, Options};
use structflex_serde::{Fixture, Schema, SchemaError};
use thiserror::Error;

/// structflex - run domain/wire conversions over JSON fixtures
#[derive(Parser, Debug)]
#[command(name = "structflex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert the fixture's `domain` value into its wire type
    Externalize(ConvertArgs),
    /// Convert the fixture's `wire` value into its domain type
    Internalize(ConvertArgs),
    /// Load a schema document and list the types it declares
    Check {
        /// Schema document (JSON)
        schema: PathBuf,
    },
    /// Print the coercion matrix
    Matrix,
}

#[derive(clap::Args, Debug)]
pub struct ConvertArgs {
    /// Fixture document (JSON)
    pub fixture: PathBuf,

    /// Options document (JSON); replaces the fixture's `options`
    #[arg(long)]
    pub options: Option<PathBuf>,
}

impl Cli {
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Errors that stop the harness before or after a conversion.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Fixture {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },

    #[error("invalid options in {}: {source}", path.display())]
    Options {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot write output: {0}")]
    Write(#[from] std::io::Error),

    #[error("cannot render output: {0}")]
    Render(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Run one command, writing JSON to `out`.
///
/// Returns `Ok(false)` when a conversion finished with error diagnostics.
pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<bool> {
    let (output, ok) = match &cli.command {
        Command::Externalize(args) => convert(args, Direction::Externalize)?,
        Command::Internalize(args) => convert(args, Direction::Internalize)?,
        Command::Check { schema } => (check(schema)?, true),
        Command::Matrix => (matrix(), true),
    };

    if cli.pretty {
        serde_json::to_writer_pretty(&mut *out, &output)?;
    } else {
        serde_json::to_writer(&mut *out, &output)?;
    }
    writeln!(out)?;
    Ok(ok)
}

#[derive(Clone, Copy, Debug)]
enum Direction {
    Externalize,
    Internalize,
}

fn convert(args: &ConvertArgs, direction: Direction) -> Result<(Json, bool)> {
    let text = read(&args.fixture)?;
    let fixture = Fixture::parse(&text).map_err(|source| CliError::Fixture {
        path: args.fixture.clone(),
        source,
    })?;

    let options = match &args.options {
        Some(path) => load_options(path)?,
        None => fixture.options.clone(),
    };
    tracing::debug!(
        fixture = %args.fixture.display(),
        domain_type = %fixture.domain_type,
        wire_type = %fixture.wire_type,
        ?direction,
        "running fixture"
    );

    let engine = Engine::new();
    let report = match direction {
        Direction::Externalize => fixture.externalize(&engine, &options),
        Direction::Internalize => fixture.internalize(&engine, &options),
    }
    .map_err(|source| CliError::Fixture {
        path: args.fixture.clone(),
        source,
    })?;

    for diagnostic in report.diagnostics.errors() {
        tracing::warn!("{}", diagnostic);
    }
    Ok((report.to_json(), !report.has_error()))
}

fn load_options(path: &Path) -> Result<Options> {
    let text = read(path)?;
    serde_json::from_str(&text).map_err(|source| CliError::Options {
        path: path.to_path_buf(),
        source,
    })
}

fn check(path: &Path) -> Result<Json> {
    let text = read(path)?;
    let schema = Schema::parse(&text).map_err(|source| CliError::Fixture {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(json!({
        "wire": schema.wire_names().collect::<Vec<_>>(),
        "domain": schema.domain_names().collect::<Vec<_>>(),
    }))
}

fn matrix() -> Json {
    let engine = Engine::new();
    let matrix = engine.matrix();
    let externalize: Vec<Json> = matrix
        .externalize_entries()
        .map(|(from, to, rule)| {
            json!({
                "from": format!("{:?}", from),
                "to": format!("{:?}", to),
                "rule": rule.to_string()
            })
        })
        .collect();
    let internalize: Vec<Json> = matrix
        .internalize_entries()
        .map(|(from, to, rule)| {
            json!({
                "from": format!("{:?}", from),
                "to": format!("{:?}", to),
                "rule": rule.to_string()
            })
        })
        .collect();
    json!({ "externalize": externalize, "internalize": internalize })
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}
