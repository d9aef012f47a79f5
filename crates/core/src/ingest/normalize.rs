use crate::error::IngestError;
use crate::ingest::types::{
    DailyBarFields, DailyRecord, MetaDataFields, META_SECTION, SERIES_SECTION,
};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Flattens a validated raw payload into one record per date entry.
///
/// Symbol and refresh timestamp come from the metadata section once and are
/// copied onto every row. A single malformed date entry fails the whole
/// batch; the writer only ever sees a fully-formed set.
pub fn normalize(raw: &Value) -> Result<Vec<DailyRecord>, IngestError> {
    let meta = raw
        .get(META_SECTION)
        .ok_or_else(|| IngestError::Normalization(format!("missing '{META_SECTION}' section")))?;
    let meta: MetaDataFields = serde_json::from_value(meta.clone())
        .map_err(|err| IngestError::Normalization(format!("metadata: {err}")))?;

    let series = raw
        .get(SERIES_SECTION)
        .and_then(Value::as_object)
        .ok_or_else(|| IngestError::Normalization(format!("missing '{SERIES_SECTION}' section")))?;

    let mut records = Vec::with_capacity(series.len());
    for (date, values) in series {
        let bar: DailyBarFields = serde_json::from_value(values.clone())
            .map_err(|err| IngestError::Normalization(format!("date {date}: {err}")))?;

        records.push(DailyRecord {
            symbol_date: DailyRecord::composite_key(&meta.symbol, date),
            symbol: meta.symbol.clone(),
            date: date.clone(),
            open: parse_price(date, "1. open", &bar.open)?,
            high: parse_price(date, "2. high", &bar.high)?,
            low: parse_price(date, "3. low", &bar.low)?,
            close: parse_price(date, "4. close", &bar.close)?,
            volume: parse_volume(date, &bar.volume)?,
            last_refreshed: meta.last_refreshed.clone(),
        });
    }

    Ok(records)
}

fn parse_price(date: &str, field: &str, value: &str) -> Result<Decimal, IngestError> {
    Decimal::from_str(value.trim()).map_err(|err| {
        IngestError::Normalization(format!("date {date}, field '{field}': {err}"))
    })
}

fn parse_volume(date: &str, value: &str) -> Result<i64, IngestError> {
    let volume = value.trim().parse::<i64>().map_err(|err| {
        IngestError::Normalization(format!("date {date}, field '5. volume': {err}"))
    })?;
    if volume < 0 {
        return Err(IngestError::Normalization(format!(
            "date {date}: negative volume {volume}"
        )));
    }
    Ok(volume)
}
