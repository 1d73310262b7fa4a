use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;

use super::{ObjectStore, ObjectStoreError, PutOptions};

/// Object storage bucket on the hosted backend, spoken to over its storage REST API.
pub struct BucketStore {
    base_url: String,
    bucket: String,
    api_key: String,
    client: Client,
}

/// Error body returned by the storage API on non-2xx responses.
#[derive(Deserialize)]
struct StorageErrorBody {
    message: String,
}

impl BucketStore {
    pub fn new(base_url: &str, bucket: &str, api_key: &str) -> Result<Self, anyhow::Error> {
        let client = Client::builder().build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    fn upload_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }
}

#[async_trait]
impl ObjectStore for BucketStore {
    async fn put(
        &self,
        path: &str,
        data: Bytes,
        options: &PutOptions,
    ) -> Result<(), ObjectStoreError> {
        let content_type = options
            .content_type
            .as_deref()
            .unwrap_or("application/octet-stream");

        let resp = self
            .client
            .put(self.upload_url(path))
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .header("Content-Type", content_type)
            .header(
                "Cache-Control",
                format!("max-age={}", options.cache_control_secs),
            )
            .header("x-upsert", options.upsert.to_string())
            .body(data)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StorageErrorBody>(&body)
                .map(|b| b.message)
                .unwrap_or_else(|_| format!("upload failed ({status}): {body}"));
            return Err(ObjectStoreError::Backend(message));
        }

        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }
}
