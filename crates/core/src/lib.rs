pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod secrets;
pub mod storage;

pub mod config {
    use anyhow::Context;

    pub const DEFAULT_MARKET_DATA_BASE_URL: &str = "https://www.alphavantage.co";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub secret_name: Option<String>,
        pub raw_bucket: Option<String>,
        pub daily_bars_table: Option<String>,
        pub market_data_base_url: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                secret_name: std::env::var("SECRET_NAME").ok(),
                raw_bucket: std::env::var("RAW_BUCKET").ok(),
                daily_bars_table: std::env::var("DAILY_BARS_TABLE").ok(),
                market_data_base_url: std::env::var("ALPHA_VANTAGE_BASE_URL").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_secret_name(&self) -> anyhow::Result<&str> {
            self.secret_name.as_deref().context("SECRET_NAME is required")
        }

        pub fn require_raw_bucket(&self) -> anyhow::Result<&str> {
            self.raw_bucket.as_deref().context("RAW_BUCKET is required")
        }

        pub fn require_daily_bars_table(&self) -> anyhow::Result<&str> {
            self.daily_bars_table
                .as_deref()
                .context("DAILY_BARS_TABLE is required")
        }

        pub fn market_data_base_url(&self) -> &str {
            self.market_data_base_url
                .as_deref()
                .unwrap_or(DEFAULT_MARKET_DATA_BASE_URL)
        }
    }
}
