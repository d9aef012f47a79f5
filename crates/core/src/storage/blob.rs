use crate::error::IngestError;
use chrono::{DateTime, SecondsFormat, Utc};
use google_cloud_storage::client::{Client, ClientConfig};
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use serde_json::Value;
use tracing::info;

/// Blob-store sink for the untouched upstream payload.
pub struct RawStore {
    client: Client,
    bucket: String,
}

impl RawStore {
    /// Authenticates with application-default credentials.
    pub async fn connect(bucket: impl Into<String>) -> Result<Self, IngestError> {
        let config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|err| IngestError::BlobWrite(format!("blob store auth failed: {err}")))?;

        Ok(Self {
            client: Client::new(config),
            bucket: bucket.into(),
        })
    }

    /// Serializes the payload and uploads it under a fresh timestamped key.
    /// Returns the object key that was written.
    pub async fn put_raw(&self, payload: &Value) -> Result<String, IngestError> {
        let object_name = raw_object_name(Utc::now());
        let body = serde_json::to_vec(payload)
            .map_err(|err| IngestError::BlobWrite(format!("serialize raw payload: {err}")))?;

        let mut media = Media::new(object_name.clone());
        media.content_type = "application/json".into();
        let request = UploadObjectRequest {
            bucket: self.bucket.clone(),
            ..Default::default()
        };

        self.client
            .upload_object(&request, body, &UploadType::Simple(media))
            .await
            .map_err(|err| {
                IngestError::BlobWrite(format!(
                    "upload {object_name} to bucket {} failed: {err}",
                    self.bucket
                ))
            })?;

        info!(bucket = %self.bucket, object = %object_name, "stored raw payload");
        Ok(object_name)
    }
}

fn raw_object_name(at: DateTime<Utc>) -> String {
    format!("raw/{}.json", at.to_rfc3339_opts(SecondsFormat::Micros, true))
}
