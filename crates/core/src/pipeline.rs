use crate::config::Settings;
use crate::ingest::alpha_vantage::MarketDataClient;
use crate::ingest::normalize::normalize;
use crate::secrets;
use crate::storage::{self, blob::RawStore, daily_bars};
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;

#[derive(Debug, Clone, Copy)]
pub struct RunOptions<'a> {
    pub symbol: &'a str,
    pub dry_run: bool,
}

/// One end-to-end ingestion: credential, fetch, normalize, dual write.
/// Strictly sequential, no branching on anything but errors; returns the
/// number of records stored (or validated, on a dry run).
///
/// Configuration is resolved at the step that needs it, never up front, so
/// a missing variable surfaces exactly where it is first referenced.
pub async fn run(
    settings: &Settings,
    pool: &PgPool,
    market: &dyn MarketDataClient,
    opts: RunOptions<'_>,
) -> anyhow::Result<u64> {
    let secret_name = settings.require_secret_name()?;
    let api_key = secrets::fetch_api_key(pool, secret_name).await?;

    info!(
        provider = market.provider_name(),
        symbol = opts.symbol,
        "fetching daily series"
    );
    let raw = market.fetch_daily(opts.symbol, &api_key).await?;

    let records = normalize(&raw)?;
    info!(
        symbol = opts.symbol,
        records = records.len(),
        "normalized daily series"
    );

    if opts.dry_run {
        info!(symbol = opts.symbol, dry_run = true, "skipping blob and table writes");
        return Ok(records.len() as u64);
    }

    let bucket = settings.require_raw_bucket()?;
    let store = RawStore::connect(bucket).await?;
    let object_key = store.put_raw(&raw).await?;

    let table = settings.require_daily_bars_table()?;
    storage::migrate(pool, table).await?;
    daily_bars::upsert_daily_bars(pool, table, &records).await?;

    info!(
        symbol = opts.symbol,
        records = records.len(),
        object = %object_key,
        "ingestion run complete"
    );
    Ok(records.len() as u64)
}

/// What the invocation hands back to its trigger: a coarse 200/500 status
/// and a human-readable message, nothing more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl RunOutcome {
    pub fn success(records: u64) -> Self {
        Self {
            status_code: 200,
            body: format!("Success: Stored {records} records"),
        }
    }

    pub fn failure(err: &anyhow::Error) -> Self {
        Self {
            status_code: 500,
            body: format!("Error: {err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct RecordingMarket {
        called: AtomicBool,
    }

    #[async_trait::async_trait]
    impl MarketDataClient for RecordingMarket {
        fn provider_name(&self) -> &'static str {
            "recording"
        }

        async fn fetch_daily(&self, _: &str, _: &str) -> Result<Value, IngestError> {
            self.called.store(true, Ordering::SeqCst);
            Err(IngestError::EmptyData)
        }
    }

    fn settings_with_secret() -> Settings {
        Settings {
            database_url: None,
            secret_name: Some("alpha_vantage_api_key".to_string()),
            raw_bucket: None,
            daily_bars_table: None,
            market_data_base_url: None,
            sentry_dsn: None,
        }
    }

    #[tokio::test]
    async fn credential_failure_precedes_any_http_call() {
        // Nothing listens here; the credential read is the first store
        // access and must fail before the market client is touched.
        let pool = sqlx::postgres::PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_secs(1))
            .connect_lazy("postgres://127.0.0.1:1/unused")
            .unwrap();
        let market = RecordingMarket {
            called: AtomicBool::new(false),
        };

        let err = run(
            &settings_with_secret(),
            &pool,
            &market,
            RunOptions {
                symbol: "IBM",
                dry_run: false,
            },
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("secret retrieval failed"));
        assert!(!market.called.load(Ordering::SeqCst));

        let outcome = RunOutcome::failure(&err);
        assert_eq!(outcome.status_code, 500);
    }

    #[test]
    fn success_outcome_counts_records() {
        let outcome = RunOutcome::success(100);
        assert_eq!(outcome.status_code, 200);
        assert_eq!(outcome.body, "Success: Stored 100 records");
    }

    #[test]
    fn failure_outcome_carries_error_text() {
        let err = anyhow::Error::from(IngestError::RateLimit("rate limit exceeded".to_string()));
        let outcome = RunOutcome::failure(&err);
        assert_eq!(outcome.status_code, 500);
        assert_eq!(
            outcome.body,
            "Error: upstream rate limit notice: rate limit exceeded"
        );
    }

    #[test]
    fn failure_outcome_keeps_store_classification() {
        let err = anyhow::Error::from(IngestError::Credential(
            "access denied: permission denied for relation".to_string(),
        ));
        let outcome = RunOutcome::failure(&err);
        assert!(outcome.body.contains("access denied"));
    }

    #[test]
    fn outcome_serializes_with_status_code_field() {
        let outcome = RunOutcome::success(3);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["body"], "Success: Stored 3 records");
    }
}
