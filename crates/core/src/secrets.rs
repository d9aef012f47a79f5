use crate::error::IngestError;

// Supabase-style vault view: plaintext secrets addressed by name.
const VAULT_QUERY: &str = "SELECT decrypted_secret FROM vault.decrypted_secrets WHERE name = $1";

const SQLSTATE_INSUFFICIENT_PRIVILEGE: &str = "42501";

/// Reads the named credential from the vault. No caching: every run fetches
/// fresh so a rotated key takes effect on the next invocation.
pub async fn fetch_api_key(pool: &sqlx::PgPool, secret_name: &str) -> Result<String, IngestError> {
    let secret = sqlx::query_scalar::<_, String>(VAULT_QUERY)
        .persistent(false)
        .bind(secret_name)
        .fetch_optional(pool)
        .await
        .map_err(|err| IngestError::Credential(classify_store_error(&err)))?;

    secret.ok_or_else(|| IngestError::Credential(format!("secret '{secret_name}' not found")))
}

/// Maps the store's failure onto the classification the run outcome must
/// carry: unreachable, access denied, or the store's own error text.
fn classify_store_error(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => format!("store unreachable: {err}"),
        sqlx::Error::Database(db) if db.code().as_deref() == Some(SQLSTATE_INSUFFICIENT_PRIVILEGE) => {
            format!("access denied: {db}")
        }
        _ => err.to_string(),
    }
}
