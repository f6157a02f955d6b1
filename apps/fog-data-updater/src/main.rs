use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use fog_data_updater::cli::Cli;
use fog_data_updater::config::{read_token_file, Config};
use fog_data_updater::pipeline::{self, Window};
use fog_data_updater::sheets::{Credentials, GoogleSheetsSink};
use fog_data_updater::zentra::{SensorFetcher, ZentraClient};
use reqwest::Client;

fn init_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,fog_data_updater=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing()?;

    let token = read_token_file(&cli.zentra_token_file)?;
    let window = cli.window(Utc::now(), config.request_interval_days)?;

    let http = Client::builder()
        .timeout(config.request_timeout)
        .build()
        .context("failed to build HTTP client")?;
    let zentra = ZentraClient::new(http.clone(), &config.zentra_base_url)
        .context("invalid ZENTRA_BASE_URL")?;
    let fetcher = SensorFetcher::new(zentra, config.fetcher_config());

    let credentials = match config.google_access_token.clone() {
        Some(token) => Credentials::AccessToken(token),
        None => Credentials::ServiceAccount(cli.service_account_file.clone()),
    };
    let sink = GoogleSheetsSink::new(
        http,
        config.sheets_base_url.clone(),
        config.spreadsheet_id.clone(),
        config.sheet_id,
        credentials,
    );

    tokio::select! {
        res = update(&cli, &fetcher, &sink, &token, window) => {
            if let Err(err) = res {
                tracing::error!(error = %err, "update failed");
                return Err(err);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}

async fn update(
    cli: &Cli,
    fetcher: &SensorFetcher<ZentraClient>,
    sink: &GoogleSheetsSink,
    token: &str,
    window: Window,
) -> Result<()> {
    if cli.dry_run {
        let grid = pipeline::fetch_grid(fetcher, token, window).await?;
        tracing::info!(
            columns = grid.width(),
            rows = grid.data_row_count(),
            "dry run; skipping sheet update"
        );
        return Ok(());
    }

    pipeline::run(fetcher, sink, token, window).await?;
    tracing::info!("Update complete 🎉");
    Ok(())
}
