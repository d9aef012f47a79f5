use rust_decimal::Decimal;
use serde::Deserialize;

/// Top-level section holding the symbol and refresh timestamp.
pub const META_SECTION: &str = "Meta Data";
/// Top-level section mapping date strings to OHLCV objects.
pub const SERIES_SECTION: &str = "Time Series (Daily)";

pub const KEY_SEPARATOR: char = '_';

/// The metadata fields we read out of the raw payload. Field names follow
/// the upstream numbering scheme verbatim.
#[derive(Debug, Clone, Deserialize)]
pub struct MetaDataFields {
    #[serde(rename = "2. Symbol")]
    pub symbol: String,
    #[serde(rename = "3. Last Refreshed")]
    pub last_refreshed: String,
}

/// One date entry of the time series. All values arrive as strings and are
/// parsed downstream so prices never pass through binary floating point.
#[derive(Debug, Clone, Deserialize)]
pub struct DailyBarFields {
    #[serde(rename = "1. open")]
    pub open: String,
    #[serde(rename = "2. high")]
    pub high: String,
    #[serde(rename = "3. low")]
    pub low: String,
    #[serde(rename = "4. close")]
    pub close: String,
    #[serde(rename = "5. volume")]
    pub volume: String,
}

/// One normalized row per (symbol, date), keyed by `symbol_date`.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub symbol_date: String,
    pub symbol: String,
    pub date: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
    pub last_refreshed: String,
}

impl DailyRecord {
    pub fn composite_key(symbol: &str, date: &str) -> String {
        format!("{symbol}{KEY_SEPARATOR}{date}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn composite_key_round_trips() {
        let key = DailyRecord::composite_key("IBM", "2024-01-02");
        assert_eq!(key, "IBM_2024-01-02");

        let (symbol, date) = key.split_once(KEY_SEPARATOR).unwrap();
        assert_eq!(symbol, "IBM");
        assert_eq!(date, "2024-01-02");
    }

    #[test]
    fn parses_upstream_field_names() {
        let bar: DailyBarFields = serde_json::from_value(json!({
            "1. open": "190.10",
            "2. high": "191.00",
            "3. low": "189.50",
            "4. close": "190.75",
            "5. volume": "1000000"
        }))
        .unwrap();

        assert_eq!(bar.open, "190.10");
        assert_eq!(bar.volume, "1000000");
    }

    #[test]
    fn rejects_bar_with_missing_field() {
        let res = serde_json::from_value::<DailyBarFields>(json!({
            "1. open": "190.10",
            "2. high": "191.00"
        }));
        assert!(res.is_err());
    }
}
