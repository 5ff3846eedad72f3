//! CLI binary for w9-extract.
//!
//! A thin shim over the library crate: maps flags and environment variables
//! to an [`ExtractionConfig`], acquires the gateway token once at startup,
//! and either serves the HTTP API or runs a one-shot batch.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use w9_extract::server::{self, AppState};
use w9_extract::{auth, extract_batch, AuthConfig, ExtractionConfig};

#[derive(Parser)]
#[command(name = "w9x", version, about = "Extract structured data from scanned W-9 tax forms")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    service: ServiceArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (and frontend, when built).
    Serve(ServeArgs),
    /// Extract from local PDF files and print the JSON outcomes.
    Batch(BatchArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Directory holding the built frontend; skipped when absent.
    #[arg(long, default_value = "dist")]
    frontend_dir: PathBuf,
}

#[derive(Args)]
struct BatchArgs {
    /// PDF files to process, in order.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

/// External-service settings, usually provided via the environment.
#[derive(Args)]
struct ServiceArgs {
    /// Layout analysis service base URL.
    #[arg(long, env = "LAYOUT_ENDPOINT")]
    layout_endpoint: Option<String>,

    /// Layout analysis subscription key.
    #[arg(long, env = "LAYOUT_KEY", hide_env_values = true)]
    layout_key: Option<String>,

    /// Chat-completion gateway base URL.
    #[arg(long, env = "LLM_ENDPOINT")]
    llm_endpoint: Option<String>,

    /// Chat deployment (model) identifier.
    #[arg(long, env = "LLM_DEPLOYMENT")]
    llm_deployment: Option<String>,

    /// Project identifier header forwarded to the gateway.
    #[arg(long, env = "PROJECT_ID")]
    project_id: Option<String>,

    /// Pre-acquired bearer token; skips the OAuth2 exchange.
    #[arg(long, env = "LLM_TOKEN", hide_env_values = true)]
    llm_token: Option<String>,

    /// OAuth2 token endpoint.
    #[arg(long, env = "AUTH_TOKEN_URL")]
    token_url: Option<String>,

    /// OAuth2 scope.
    #[arg(long, env = "AUTH_SCOPE")]
    scope: Option<String>,

    /// OAuth2 client id.
    #[arg(long, env = "AUTH_CLIENT_ID")]
    client_id: Option<String>,

    /// OAuth2 client secret.
    #[arg(long, env = "AUTH_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "w9_extract=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli.service).await?;

    match cli.command {
        Command::Serve(args) => {
            let addr: SocketAddr = format!("{}:{}", args.host, args.port)
                .parse()
                .with_context(|| format!("invalid bind address {}:{}", args.host, args.port))?;
            let state = AppState { config: Arc::new(config) };
            let frontend = args.frontend_dir.is_dir().then_some(args.frontend_dir);
            server::serve(addr, state, frontend.as_deref()).await?;
        }
        Command::Batch(args) => {
            let outcomes = extract_batch(&args.files, &config).await?;
            println!("{}", serde_json::to_string_pretty(&outcomes)?);
        }
    }

    Ok(())
}

/// Assemble the extraction config, exchanging client credentials for a
/// bearer token when none was supplied directly.
async fn build_config(args: &ServiceArgs) -> Result<ExtractionConfig> {
    let token = match (&args.llm_token, &args.token_url) {
        (Some(token), _) => Some(token.clone()),
        (None, Some(token_url)) => {
            let auth = AuthConfig {
                token_url: token_url.clone(),
                scope: args.scope.clone().context("AUTH_SCOPE is required with AUTH_TOKEN_URL")?,
                client_id: args.client_id.clone().context("AUTH_CLIENT_ID is required")?,
                client_secret: args.client_secret.clone().context("AUTH_CLIENT_SECRET is required")?,
            };
            let http = reqwest::Client::new();
            Some(auth::fetch_access_token(&http, &auth).await?)
        }
        (None, None) => None,
    };

    let mut builder = ExtractionConfig::builder();
    if let Some(ref endpoint) = args.layout_endpoint {
        builder = builder.layout_endpoint(endpoint.as_str());
    }
    if let Some(ref key) = args.layout_key {
        builder = builder.layout_key(key.as_str());
    }
    if let Some(ref endpoint) = args.llm_endpoint {
        builder = builder.llm_endpoint(endpoint.as_str());
    }
    if let Some(ref deployment) = args.llm_deployment {
        builder = builder.llm_deployment(deployment.as_str());
    }
    if let Some(ref project) = args.project_id {
        builder = builder.project_id(project.as_str());
    }
    if let Some(token) = token {
        builder = builder.llm_token(token);
    }

    Ok(builder.build()?)
}
