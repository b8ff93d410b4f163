use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::core::config::Settings;

#[derive(Debug, Clone)]
pub(crate) struct StorageService {
    client: Client,
    http: reqwest::Client,
    bucket: String,
    presign_expiry: Duration,
}

#[derive(Debug, Clone)]
pub(crate) struct StoredObject {
    pub(crate) key: String,
    pub(crate) url: String,
}

/// A per-object retrieval failure. Recoverable by design: callers record it
/// against the one submission and keep going.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub(crate) struct FetchError {
    message: String,
}

impl FetchError {
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    #[cfg(test)]
    pub(crate) fn test(message: &str) -> Self {
        Self::new(message)
    }
}

impl StorageService {
    pub(crate) async fn from_settings(settings: &Settings) -> anyhow::Result<Option<Self>> {
        if settings.s3().access_key.is_empty() || settings.s3().secret_key.is_empty() {
            return Ok(None);
        }

        let creds = Credentials::new(
            settings.s3().access_key.clone(),
            settings.s3().secret_key.clone(),
            None,
            None,
            "examdrop-static",
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(settings.s3().endpoint.clone())
            .region(aws_config::Region::new(settings.s3().region.clone()))
            .credentials_provider(creds)
            .load()
            .await;

        let client = Client::new(&config);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.storage().fetch_timeout_seconds))
            .build()?;
        let presign_expiry =
            Duration::from_secs(settings.storage().presigned_url_expire_minutes * 60);

        Ok(Some(Self { client, http, bucket: settings.s3().bucket.clone(), presign_expiry }))
    }

    pub(crate) async fn upload_bytes(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> anyhow::Result<(i64, String)> {
        let size = bytes.len() as i64;
        let hash = Sha256::digest(&bytes);
        let hash_hex = hex::encode(hash);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await?;

        Ok((size, hash_hex))
    }

    pub(crate) async fn presign_get(&self, key: &str) -> anyhow::Result<String> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(PresigningConfig::expires_in(self.presign_expiry)?)
            .await?;

        Ok(presigned.uri().to_string())
    }

    /// Lists every object under `prefix`, in the order the store returns
    /// them, paired with a presigned download URL.
    pub(crate) async fn list(&self, prefix: &str) -> anyhow::Result<Vec<StoredObject>> {
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await?;

            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                let url = self.presign_get(key).await?;
                objects.push(StoredObject { key: key.to_string(), url });
            }

            match page.next_continuation_token() {
                Some(token) if page.is_truncated() == Some(true) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(objects)
    }

    pub(crate) async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::new(fetch_error_message(&err)))?
            .error_for_status()
            .map_err(|err| FetchError::new(fetch_error_message(&err)))?;

        let bytes =
            response.bytes().await.map_err(|err| FetchError::new(fetch_error_message(&err)))?;
        Ok(bytes.to_vec())
    }
}

// Presigned URLs embed credentials in the query string, so the reqwest error
// (which prints the URL) is never forwarded verbatim.
fn fetch_error_message(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "submission download timed out".to_string()
    } else if let Some(status) = err.status() {
        format!("submission download failed with status {status}")
    } else {
        "submission download failed".to_string()
    }
}
