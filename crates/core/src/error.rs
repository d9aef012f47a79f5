use thiserror::Error;

/// Failure kinds for one ingestion run.
///
/// Every variant is terminal for the invocation: nothing is retried or
/// recovered locally, the worker converts whichever one surfaces into a
/// single 500 outcome.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IngestError {
    /// The credential store reported a classified failure (not found,
    /// access denied, unreachable).
    #[error("secret retrieval failed: {0}")]
    Credential(String),

    /// The market data request exceeded the request timeout.
    #[error("request to the market data API timed out")]
    Timeout,

    /// Transport-level failure: DNS, connection reset, non-2xx status.
    #[error("market data request failed: {0}")]
    Connectivity(String),

    /// Response body was not valid JSON.
    #[error("failed to parse market data response: {0}")]
    MalformedResponse(String),

    /// The upstream API returned an explicit error payload.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The upstream API returned a rate-limit notice instead of data.
    #[error("upstream rate limit notice: {0}")]
    RateLimit(String),

    /// The response carried no time-series section, or an empty one.
    #[error("no time series data returned, possibly an invalid symbol or no recent trading data")]
    EmptyData,

    /// A date entry in the series was missing a field or failed to parse.
    /// One bad entry invalidates the whole batch.
    #[error("normalization failed: {0}")]
    Normalization(String),

    /// The raw payload could not be stored in the blob store.
    #[error("raw payload write failed: {0}")]
    BlobWrite(String),

    /// The normalized records could not be upserted into the table store.
    #[error("daily bars write failed: {0}")]
    TableWrite(String),
}
