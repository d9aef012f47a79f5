use crate::error::IngestError;
use crate::ingest::types::DailyRecord;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

const DEFAULT_BATCH: usize = 200;

/// Batched upsert keyed by `symbol_date`: re-ingesting the same payload
/// overwrites rows in place, never duplicates them.
///
/// Batches are deliberately not wrapped in one transaction. A fault mid-way
/// leaves earlier batches applied; each row is independently idempotent by
/// key, so the accepted partial state is overwritten on the next run.
pub async fn upsert_daily_bars(
    pool: &PgPool,
    table: &str,
    records: &[DailyRecord],
) -> Result<u64, IngestError> {
    if records.is_empty() {
        return Err(IngestError::TableWrite("no records to write".to_string()));
    }

    let batch_size = std::env::var("DAILY_BARS_UPSERT_BATCH")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n >= 1)
        .unwrap_or(DEFAULT_BATCH);

    let mut affected: u64 = 0;
    let mut batch_idx: usize = 0;
    for chunk in records.chunks(batch_size) {
        batch_idx += 1;
        let t0 = std::time::Instant::now();

        let mut qb = build_upsert(table, chunk);
        let res = qb
            .build()
            .persistent(false)
            .execute(pool)
            .await
            .map_err(|err| {
                IngestError::TableWrite(format!(
                    "batch {batch_idx} upsert into {table} failed: {err}"
                ))
            })?;
        affected += res.rows_affected();

        debug!(
            table,
            batch_idx,
            batch_size = chunk.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "daily bars batch upsert"
        );
    }

    Ok(affected)
}

fn build_upsert<'a>(table: &str, chunk: &'a [DailyRecord]) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "INSERT INTO {table} \
         (symbol_date, symbol, date, open, high, low, close, volume, last_refreshed) "
    ));
    qb.push_values(chunk, |mut b, rec| {
        b.push_bind(&rec.symbol_date)
            .push_bind(&rec.symbol)
            .push_bind(&rec.date)
            .push_bind(rec.open)
            .push_bind(rec.high)
            .push_bind(rec.low)
            .push_bind(rec.close)
            .push_bind(rec.volume)
            .push_bind(&rec.last_refreshed);
    });
    qb.push(
        " ON CONFLICT (symbol_date) DO UPDATE SET \
           symbol = EXCLUDED.symbol, \
           date = EXCLUDED.date, \
           open = EXCLUDED.open, \
           high = EXCLUDED.high, \
           low = EXCLUDED.low, \
           close = EXCLUDED.close, \
           volume = EXCLUDED.volume, \
           last_refreshed = EXCLUDED.last_refreshed",
    );
    qb
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn record(date: &str) -> DailyRecord {
        DailyRecord {
            symbol_date: DailyRecord::composite_key("IBM", date),
            symbol: "IBM".to_string(),
            date: date.to_string(),
            open: Decimal::from_str("190.10").unwrap(),
            high: Decimal::from_str("191.00").unwrap(),
            low: Decimal::from_str("189.50").unwrap(),
            close: Decimal::from_str("190.75").unwrap(),
            volume: 1_000_000,
            last_refreshed: "2024-01-02".to_string(),
        }
    }

    #[test]
    fn upsert_statement_targets_composite_key() {
        let records = [record("2024-01-02"), record("2024-01-03")];
        let mut qb = build_upsert("daily_bars", &records);
        let sql = qb.sql();

        assert!(sql.starts_with("INSERT INTO daily_bars (symbol_date, symbol, date,"));
        assert!(sql.contains("ON CONFLICT (symbol_date) DO UPDATE"));
        assert!(sql.contains("volume = EXCLUDED.volume"));
        // Two rows, nine placeholders each.
        assert!(sql.contains("$9"));
        assert!(sql.contains("$18"));
    }

    #[tokio::test]
    async fn empty_batch_is_rejected_without_touching_the_pool() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();

        match upsert_daily_bars(&pool, "daily_bars", &[]).await {
            Err(IngestError::TableWrite(msg)) => assert!(msg.contains("no records")),
            other => panic!("expected TableWrite, got {other:?}"),
        }
    }
}
