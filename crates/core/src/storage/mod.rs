use crate::error::IngestError;

pub mod blob;
pub mod daily_bars;

/// Invocations are stateless, so the sink schema is asserted on every run
/// rather than during a one-time setup step.
pub async fn migrate(pool: &sqlx::PgPool, table: &str) -> Result<(), IngestError> {
    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (\
           symbol_date TEXT PRIMARY KEY, \
           symbol TEXT NOT NULL, \
           date TEXT NOT NULL, \
           open NUMERIC NOT NULL, \
           high NUMERIC NOT NULL, \
           low NUMERIC NOT NULL, \
           close NUMERIC NOT NULL, \
           volume BIGINT NOT NULL, \
           last_refreshed TEXT NOT NULL)"
    ))
    .persistent(false)
    .execute(pool)
    .await
    .map_err(|err| IngestError::TableWrite(format!("create table {table} failed: {err}")))?;

    Ok(())
}
