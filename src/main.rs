//! CSV agent binary.
//!
//! Subcommands: `serve` (HTTP API) and `ask` (one question from the terminal).

mod config;

use std::net::SocketAddr;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use csv_agent_controller::{QueryConfig, QueryController, QueryOutcome, TextSink};
use csv_agent_core::{PromptRequest, Result};
use csv_agent_gateway::{serve, AppState};
use csv_agent_model_gateway::{DataFrameAgent, Dataset, OpenAiClient};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "csv-agent")]
#[command(about = "Ask questions about a CSV file and get text, tables or charts back")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,

    /// Model name (overrides CSV_AGENT_MODEL)
    #[arg(long, global = true, value_name = "NAME")]
    model: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Listen address (overrides CSV_AGENT_BIND)
        #[arg(long, value_name = "ADDR")]
        bind: Option<SocketAddr>,
    },
    /// Ask one question about a CSV file and print the answer
    Ask(AskArgs),
}

#[derive(Args, Debug)]
struct AskArgs {
    /// CSV file to analyze
    #[arg(long, value_name = "FILE")]
    csv: PathBuf,

    /// The question
    #[arg(short, long)]
    query: String,

    /// Agent context, e.g. "You are skilled in transportation pattern analysis."
    #[arg(long, default_value = "")]
    persona: String,

    /// What the dataset is
    #[arg(long, default_value = "")]
    description: String,

    /// What the analysis should achieve
    #[arg(long, default_value = "")]
    objectives: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let dotenv_path = dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = dotenv_path {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(model) = cli.model {
        config.model = model;
    }

    match cli.cmd {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or(config.bind);
            run_serve(config, bind).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Ask(args) => run_ask(config, args).await,
    }
}

async fn run_serve(config: AppConfig, bind: SocketAddr) -> anyhow::Result<()> {
    let llm = OpenAiClient::new(config.openai()?)?;
    tracing::info!(model = %llm.model(), "Starting CSV agent gateway");

    let state = Arc::new(AppState::new(Arc::new(llm), config.gateway()));
    serve(bind, state).await
}

async fn run_ask(config: AppConfig, args: AskArgs) -> anyhow::Result<ExitCode> {
    let bytes = std::fs::read(&args.csv)
        .with_context(|| format!("failed to read {}", args.csv.display()))?;
    let name = args
        .csv
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.csv.display().to_string());

    // Dropped at the end of this function, which removes the temporary copy.
    let dataset = Dataset::from_bytes(name, &bytes, config.preview_rows)?;
    let llm = OpenAiClient::new(config.openai()?)?;
    let agent = DataFrameAgent::new(Arc::new(llm), dataset);
    let controller = QueryController::new(config.query()).with_agent(Arc::new(agent));

    let request = PromptRequest::new(args.query)
        .with_persona(args.persona)
        .with_dataset_description(args.description)
        .with_objectives(args.objectives);

    let stdout = std::io::stdout();
    let mut sink = TextSink::new(stdout.lock());
    let result = controller.run(&request, &mut sink).await;

    let answered = report(result, config.excerpt_len, &mut std::io::stderr())?;
    Ok(if answered {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Turn the query result into whether `ask` succeeded.
///
/// Undecodable replies are written to `err` as the error kind, the
/// message and a bounded excerpt of the raw reply, and count as a failed
/// answer. Any other error is returned.
fn report(result: Result<QueryOutcome>, excerpt_len: usize, err: &mut impl Write) -> anyhow::Result<bool> {
    match result {
        Ok(outcome) => {
            tracing::debug!(attempts = outcome.attempts, kind = outcome.response.kind(), "Query answered");
            Ok(true)
        }
        Err(e) => match e.decode_error() {
            Some(decode) => {
                writeln!(err, "error[{}]: {e}", decode.kind())?;
                if let Some(excerpt) = decode.raw_excerpt(excerpt_len) {
                    writeln!(err, "raw response: {excerpt}")?;
                }
                Ok(false)
            }
            None => Err(e.into()),
        },
    }
}
