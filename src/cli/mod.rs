//! Command line front end.
//!
//! - `classify <image>`: send a fundus photograph to the classifier
//! - `colour-test`: run an interactive Ishihara test
//! - `diagnose --input <file>`: rerun the colour diagnosis on a saved
//!   evaluator answer, offline
//! - `normalize --input <file>`: rebuild a report from a saved classifier
//!   answer, offline

mod interactive;
mod render;

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::adapters::OculusApiClient;
use crate::application::{self, ColourTestService, RetinalService};
use crate::config::OculusConfig;
use crate::domain::ClassificationResult;
use crate::ports::{EvaluationResponse, ImagePayload};

pub use interactive::{run_colour_test, Prompter};
pub use render::{render_report, render_test_result};

#[derive(Debug, Parser)]
#[command(name = "oculus")]
#[command(about = "Retinal disease screening and colour vision testing", long_about = None)]
pub struct Cli {
    /// Base URL of the screening API (overrides OCULUS_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Request timeout in seconds (overrides OCULUS_HTTP_TIMEOUT_SECS)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Classify a retinal fundus image
    Classify {
        /// Image file (JPEG or PNG)
        image: PathBuf,
    },
    /// Take an interactive Ishihara colour vision test
    ColourTest {
        /// Number of plates (overrides OCULUS_PLATE_COUNT)
        #[arg(long)]
        count: Option<usize>,

        /// Directory the plate images are written to
        #[arg(long)]
        save_plates: Option<PathBuf>,
    },
    /// Diagnose a saved evaluator answer without contacting any service
    Diagnose {
        /// JSON file, or `-` for stdin
        #[arg(long)]
        input: PathBuf,
    },
    /// Build a report from a saved classifier answer without contacting any service
    Normalize {
        /// JSON file, or `-` for stdin
        #[arg(long)]
        input: PathBuf,
    },
}

impl Cli {
    /// Apply command line overrides on top of `config`.
    #[must_use]
    pub fn apply(&self, mut config: OculusConfig) -> OculusConfig {
        if let Some(url) = &self.api_url {
            config.api_url.clone_from(url);
        }
        if let Some(secs) = self.timeout.filter(|s| *s > 0) {
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Commands::ColourTest {
            count: Some(count), ..
        } = self.command
        {
            config.plate_count = count;
        }
        config
    }
}

/// Run the parsed command.
///
/// # Errors
/// Returns error if input cannot be read, a service fails during a colour
/// test, or output cannot be written.
pub fn run(cli: &Cli, config: &OculusConfig) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Commands::Classify { image } => {
            let payload = ImagePayload::from_path(image, config.max_image_bytes)?;
            let client = api_client(config)?;
            let report = RetinalService::new(Arc::new(client)).analyze(&payload);
            emit(&mut out, cli.json, &report, render_report)?;
        }
        Commands::ColourTest { save_plates, .. } => {
            let client = Arc::new(api_client(config)?);
            let service = ColourTestService::new(Arc::clone(&client), client);
            let plates_dir = save_plates
                .clone()
                .unwrap_or_else(|| std::env::temp_dir().join("oculus-plates"));

            let stdin = std::io::stdin();
            let mut prompter = Prompter::new(stdin.lock(), std::io::stderr());
            let result = run_colour_test(&service, config.plate_count, &plates_dir, &mut prompter)?;
            emit(&mut out, cli.json, &result, render_test_result)?;
        }
        Commands::Diagnose { input } => {
            let response: EvaluationResponse = read_json(input)?;
            let result = application::evaluate(response);
            emit(&mut out, cli.json, &result, render_test_result)?;
        }
        Commands::Normalize { input } => {
            let classification: ClassificationResult = read_json(input)?;
            let report = application::normalize(&classification);
            emit(&mut out, cli.json, &report, render_report)?;
        }
    }

    out.flush()?;
    Ok(())
}

fn api_client(config: &OculusConfig) -> anyhow::Result<OculusApiClient> {
    OculusApiClient::new(&config.api_url, config.http_timeout)
        .with_context(|| format!("cannot use API at {}", config.api_url))
}

fn emit<T, W>(out: &mut W, json: bool, value: &T, render: fn(&T) -> String) -> anyhow::Result<()>
where
    T: Serialize,
    W: Write,
{
    if json {
        serde_json::to_writer_pretty(&mut *out, value)?;
        writeln!(out)?;
    } else {
        write!(out, "{}", render(value))?;
    }
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let mut raw = String::new();
    if path == Path::new("-") {
        std::io::stdin()
            .lock()
            .read_to_string(&mut raw)
            .context("cannot read stdin")?;
    } else {
        raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
    }
    parse_json(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn parse_json<T: DeserializeOwned>(raw: &str) -> anyhow::Result<T> {
    Ok(serde_json::from_str(raw)?)
}
