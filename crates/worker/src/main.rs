use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use barvault_core::config::Settings;
use barvault_core::ingest::alpha_vantage::AlphaVantageClient;
use barvault_core::pipeline::{self, RunOptions, RunOutcome};

#[derive(Debug, Parser)]
#[command(name = "barvault_worker")]
struct Args {
    /// Ticker symbol to ingest. The compact series covers roughly the last
    /// 100 trading days.
    #[arg(long, default_value = "IBM")]
    symbol: String,

    /// Opaque trigger payload from the invoking scheduler, as JSON.
    #[arg(long)]
    event_json: Option<String>,

    /// Do everything except writing to the blob and table stores.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    log_trigger(args.event_json.as_deref());

    // The single catch point: whatever any step raises becomes one 500
    // outcome here, with no retry inside the run.
    let outcome = match ingest(&settings, &args).await {
        Ok(count) if args.dry_run => RunOutcome {
            status_code: 200,
            body: format!("Dry run: validated {count} records, nothing written"),
        },
        Ok(count) => RunOutcome::success(count),
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(symbol = %args.symbol, error = %err, "ingestion run failed");
            RunOutcome::failure(&err)
        }
    };

    println!(
        "{}",
        serde_json::to_string(&outcome).context("serialize run outcome")?
    );
    Ok(())
}

async fn ingest(settings: &Settings, args: &Args) -> anyhow::Result<u64> {
    let db_url = settings.require_database_url()?;
    // Lazy pool: the store is first touched by the credential read, so an
    // unreachable store surfaces with the credential classification.
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect_lazy(db_url)
        .context("configure DATABASE_URL pool failed")?;

    let market = AlphaVantageClient::from_settings(settings)?;

    let count = pipeline::run(
        settings,
        &pool,
        &market,
        RunOptions {
            symbol: &args.symbol,
            dry_run: args.dry_run,
        },
    )
    .await?;

    Ok(count)
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

/// The trigger payload is inspected for one thing only: whether this run
/// was schedule-driven. Nothing else branches on event content.
fn log_trigger(event_json: Option<&str>) {
    let Some(raw) = event_json else { return };
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(event) => {
            if event.get("source").and_then(|s| s.as_str()) == Some("schedule") {
                tracing::info!("scheduled execution triggered by event source");
            }
        }
        Err(err) => tracing::warn!(error = %err, "trigger payload is not valid JSON"),
    }
}
