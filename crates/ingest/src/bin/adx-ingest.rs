//! adx-ingest: provision the StormEvents table and ingest the sample blob.
//!
//! Reads cluster and service-principal settings from the environment (see
//! `adx_core::Config`), then runs provision → submit → wait once and exits
//! non-zero unless the ingestion succeeded. Ctrl-C cancels the run.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use adx_core::config::load_dotenv;
use adx_core::{samples, Config, SourceLocation};
use adx_ingest::client::CredentialProvider;
use adx_ingest::kusto::{AadAppCredentials, KustoClient, KustoIngestClient};
use adx_ingest::{IngestionOrchestrator, IngestionOutcome, OrchestratorConfig, ProvisionMode};

// ── CLI ─────────────────────────────────────────────────────────────

/// Create the sample table and mapping, ingest a blob, wait for the result.
#[derive(Parser, Debug)]
#[command(name = "adx-ingest", version, about)]
struct Cli {
    /// Config profile; keys resolve as {PROFILE}_{KEY} before {KEY}.
    #[arg(long, env = "ADX_PROFILE")]
    profile: Option<String>,

    /// Blob to ingest. Defaults to the public StormEvents sample.
    #[arg(long, env = "INGEST_SOURCE_URI")]
    source_uri: Option<String>,

    /// SAS token appended to the blob URI.
    #[arg(long, env = "INGEST_SOURCE_TOKEN", hide_env_values = true)]
    source_token: Option<String>,

    /// Override INGEST_MAX_WAIT_SECS.
    #[arg(long)]
    max_wait_secs: Option<u64>,

    /// Keep existing table data (create-merge instead of drop + create).
    #[arg(long)]
    no_reset: bool,

    /// Tag attached to the ingested extents; repeatable.
    #[arg(long = "tag")]
    tags: Vec<String>,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.profile {
        Some(profile) => Config::for_profile(profile)?,
        None => Config::from_env()?,
    };
    config.log_summary();

    let credentials = Arc::new(AadAppCredentials::from_config(&config.auth));
    match credentials.ingestion_endpoint(&config.cluster.endpoint) {
        Ok(endpoint) => info!(
            app_id = %credentials.application_id(),
            ingestion_endpoint = %endpoint,
            "Resolved ingestion endpoint"
        ),
        Err(e) => warn!(error = %e, "Could not resolve ingestion endpoint"),
    }

    let control = Arc::new(KustoClient::new(&config.cluster.endpoint, credentials));
    let data = Arc::new(KustoIngestClient::new(control.clone(), &config.cluster.database));

    let mut orchestrator_config = OrchestratorConfig::from_config(&config);
    if cli.no_reset {
        orchestrator_config.provision_mode = ProvisionMode::Merge;
    }
    orchestrator_config.tags = cli.tags.clone();
    let orchestrator = Arc::new(IngestionOrchestrator::new(control, data, orchestrator_config));

    let schema = samples::storm_events_schema()?;
    let mapping = samples::storm_events_mapping()?;
    let source = match &cli.source_uri {
        Some(uri) => {
            let source = SourceLocation::new(uri)?;
            match &cli.source_token {
                Some(token) => source.with_token(token),
                None => source,
            }
        }
        None => samples::storm_events_source(cli.source_token.as_deref())?,
    };
    let max_wait = Duration::from_secs(cli.max_wait_secs.unwrap_or(config.ingest.max_wait_secs));

    let task = orchestrator.spawn(schema, mapping, source, max_wait);
    let cancel = task.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling ingestion");
            cancel.cancel();
        }
    });

    let outcome = task.wait().await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    match outcome {
        IngestionOutcome::Succeeded => {
            info!("adx-ingest finished");
            Ok(())
        }
        other => anyhow::bail!("ingestion {other}"),
    }
}
