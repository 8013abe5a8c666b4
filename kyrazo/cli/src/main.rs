//! Kyrazo CLI - publish events and call the Kyrazo API from the shell

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use kyrazo::config::ENV_BASE_URL;
use kyrazo::{
    CancellationToken, ClientConfig, HttpMethod, Kyrazo, KyrazoError, PublishEventPayload,
    PublishOptions, QueryParams, RequestOptions, RequestSpec,
};
use serde_json::Value;
use thiserror::Error;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "kyrazo")]
#[command(version, about = "Command-line client for the Kyrazo webhook API", long_about = None)]
struct Cli {
    /// Enable debug logging (same as -vv)
    #[arg(long, global = true)]
    debug: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// API base URL [default: $KYRAZO_BASE_URL or https://api.kyrazo.com]
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish an event described by a JSON file
    Publish {
        /// Project that owns the webhook
        #[arg(long, value_name = "ID")]
        project: String,

        /// Event payload (webhookId, eventType, payload, targets)
        #[arg(long, value_name = "FILE")]
        file: PathBuf,

        /// Idempotency key; the platform drops repeats with the same key
        #[arg(long, value_name = "KEY")]
        idempotency_key: Option<String>,
    },

    /// Send a raw request and print the response body
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        #[arg(value_name = "METHOD", value_parser = parse_method)]
        method: HttpMethod,

        /// Path relative to the base URL, e.g. /v1/sources/proj_1
        #[arg(value_name = "PATH")]
        path: String,

        /// JSON request body
        #[arg(long, value_name = "JSON")]
        data: Option<String>,

        /// Query parameter (repeatable: --query page=2 --query limit=20)
        #[arg(long = "query", value_name = "KEY=VALUE", value_parser = parse_query_pair)]
        query: Vec<(String, String)>,

        /// Per-attempt timeout in milliseconds
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Api(#[from] KyrazoError),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {what}: {source}")]
    Json {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

fn parse_method(raw: &str) -> Result<HttpMethod, String> {
    raw.parse()
        .map_err(|_| format!("unsupported method '{raw}' (expected GET, POST, PUT, PATCH or DELETE)"))
}

fn parse_query_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

/// Initialize tracing subscriber based on verbosity and output format
fn init_tracing(verbose: u8, json: bool) {
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn".to_string(),
            // -v: one line per request
            1 => "warn,kyrazo=info".to_string(),
            // -vv: attempts and retries
            2 => "info,kyrazo=debug".to_string(),
            _ => "debug,kyrazo=trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_file(verbose >= 3)
                    .with_line_number(verbose >= 3)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    }
}

/// Reads `KYRAZO_*` settings from `env`, letting `--base-url` win.
fn client_config<F>(base_url: Option<String>, env: F) -> Result<ClientConfig, KyrazoError>
where
    F: Fn(&str) -> Option<String>,
{
    ClientConfig::from_lookup(|name| match (&base_url, name) {
        (Some(url), ENV_BASE_URL) => Some(url.clone()),
        _ => env(name),
    })
}

/// Cancels `token` on the first Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling request");
            token.cancel();
        }
    });
}

async fn run(cli: Cli) -> Result<Value, CliError> {
    let config = client_config(cli.base_url, |name| std::env::var(name).ok())?;
    let kyrazo = Kyrazo::new(config)?;
    let token = CancellationToken::new();
    cancel_on_ctrl_c(token.clone());

    match cli.command {
        Commands::Publish {
            project,
            file,
            idempotency_key,
        } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .map_err(|source| CliError::Read {
                    path: file.clone(),
                    source,
                })?;
            let payload: PublishEventPayload =
                serde_json::from_str(&raw).map_err(|source| CliError::Json {
                    what: file.display().to_string(),
                    source,
                })?;

            let options = PublishOptions {
                idempotency_key,
                request: RequestOptions::new().cancel_token(token),
            };
            let queued = kyrazo.events().publish(&project, &payload, options).await?;
            serde_json::to_value(queued).map_err(|source| CliError::Json {
                what: "response".to_string(),
                source,
            })
        }

        Commands::Request {
            method,
            path,
            data,
            query,
            timeout_ms,
        } => {
            let mut options = RequestOptions::new().cancel_token(token);
            if let Some(ms) = timeout_ms {
                options = options.timeout(Duration::from_millis(ms));
            }

            let mut spec = RequestSpec::new(method, path)
                .query(query.into_iter().map(|(k, v)| (k, Some(v))).collect::<QueryParams>())
                .options(options);
            if let Some(data) = data {
                let body = serde_json::from_str(&data).map_err(|source| CliError::Json {
                    what: "--data".to_string(),
                    source,
                })?;
                spec = spec.json(body);
            }

            let response = kyrazo.http().execute::<Value>(spec).await?;
            tracing::info!(status = response.status(), "request completed");
            Ok(response.into_data())
        }
    }
}

fn report(err: &CliError) -> ExitCode {
    match err {
        CliError::Api(api) => {
            eprintln!("Error [{}]: {}", api.kind(), api.message());
            eprintln!("  code: {}", api.code());
            if let Some(status) = api.status() {
                eprintln!("  status: {status}");
            }
            if let Some(request_id) = api.request_id() {
                eprintln!("  request id: {request_id}");
            }
            if let Some(seconds) = api.retry_after() {
                eprintln!("  retry after: {seconds}s");
            }
            if api.is_cancelled() {
                return ExitCode::from(130);
            }
        }
        other => eprintln!("Error: {other}"),
    }
    ExitCode::FAILURE
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbosity = if cli.debug { cli.verbose.max(2) } else { cli.verbose };
    init_tracing(verbosity, cli.json_logs);

    match run(cli).await {
        Ok(body) => {
            match serde_json::to_string_pretty(&body) {
                Ok(pretty) => println!("{pretty}"),
                Err(_) => println!("{body}"),
            }
            ExitCode::SUCCESS
        }
        Err(err) => report(&err),
    }
}
