mod aggregate;
mod classifier;
mod config;
mod error;
mod export;
mod model;
mod pipeline;
mod report;

use std::path::Path;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wordstat_common::wordstat::{HttpTransport, WordstatClient, WordstatClientConfig};

use classifier::Classifier;
use config::Config;
use error::{AppError, RunError};
use pipeline::Pipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load YANDEX_WORDSTAT_TOKEN and friends from .env if present
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting wordstat parser");

    // 1. Load settings, phrase list and credential
    let config = Config::from_env()?;
    let queries = config::load_queries(&config.queries_path)?;
    info!(
        city = %config.settings.city,
        region = config.settings.region_code,
        devices = %config.settings.devices.join(","),
        results_limit = config.settings.results_limit,
        delay_ms = config.settings.request_delay.as_millis(),
        queries = queries.len(),
        "configuration loaded"
    );

    // 2. Build the client
    let client_config = WordstatClientConfig::from_env();
    info!(
        base_url = %client_config.base_url,
        timeout_ms = client_config.attempt_timeout.as_millis(),
        max_attempts = client_config.max_attempts,
        "wordstat client configured"
    );
    let pipeline = build_pipeline(&config, &client_config)?;

    // 3. Fetch every query in order
    let started_at = chrono::Local::now().naive_local();
    let run = match pipeline.run(&queries, started_at).await {
        Ok(run) => run,
        Err(RunError::NoData { failures }) => {
            for failure in &failures {
                error!(
                    query = %failure.phrase,
                    attempts = failure.attempts,
                    error = %failure.last_error,
                    "no data for query"
                );
            }
            anyhow::bail!("no data to report: all {} queries failed", failures.len());
        }
    };

    // 4. Render and write the report
    let classifier = Classifier::default();
    let markdown = report::render_report(&config.settings, &run, &classifier);
    let csv = export::export_csv(&config.settings, &run, &classifier);

    std::fs::create_dir_all(&config.output_dir).map_err(|source| AppError::Io {
        path: config.output_dir.display().to_string(),
        source,
    })?;
    write_output(&config.report_path(), &markdown)?;
    write_output(&config.csv_path(), &csv)?;

    info!(
        report = %config.report_path().display(),
        csv = %config.csv_path().display(),
        succeeded = run.success_count(),
        failed = run.failure_count(),
        duplicates = run.index.duplicates().len(),
        "report written"
    );
    Ok(())
}

fn build_pipeline(
    config: &Config,
    client_config: &WordstatClientConfig,
) -> Result<Pipeline<HttpTransport>, AppError> {
    let transport = HttpTransport::new(client_config, config.token.clone())?;
    let client = WordstatClient::new(transport, client_config);
    Ok(Pipeline::new(client, config.settings.clone()))
}

fn write_output(path: &Path, content: &str) -> Result<(), AppError> {
    std::fs::write(path, content).map_err(|source| AppError::Io {
        path: path.display().to_string(),
        source,
    })
}
