//! Object storage client for uploaded media.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::http::{HttpClient, HttpMethod};
use bridge_traits::storage::BlobStore;
use bytes::Bytes;
use core_runtime::config::RemoteEndpoint;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::client::RestClient;
use crate::error::RemoteError;

/// REST client for one storage bucket.
///
/// Objects live at `{base}/storage/v1/object/<bucket>/<path>`; public copies
/// are served from `{base}/storage/v1/object/public/<bucket>/<path>`.
#[derive(Clone)]
pub struct RestBlobStore {
    client: RestClient,
    bucket: String,
}

impl RestBlobStore {
    pub fn new(client: RestClient, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn from_endpoint(http_client: Arc<dyn HttpClient>, endpoint: &RemoteEndpoint) -> Self {
        Self::new(
            RestClient::from_endpoint(http_client, endpoint),
            endpoint.storage_bucket.clone(),
        )
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_path(&self, path: &str) -> String {
        format!("storage/v1/object/{}/{}", self.bucket, encode_path(path))
    }
}

/// Percent-encode each `/`-separated segment, dropping empty ones.
fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl BlobStore for RestBlobStore {
    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> Result<String> {
        let request = self
            .client
            .request(HttpMethod::Post, &self.object_path(path))
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(data);
        self.client.send(request).await?;
        debug!(bucket = %self.bucket, path, "Uploaded object");
        Ok(path.trim_start_matches('/').to_string())
    }

    #[instrument(skip(self))]
    async fn download(&self, path: &str) -> Result<Bytes> {
        let request = self
            .client
            .request(HttpMethod::Get, &self.object_path(path))
            .header("Accept", "*/*");
        match self.client.send(request).await {
            Ok(response) => Ok(response.body),
            Err(RemoteError::Api {
                status_code: 400 | 404,
                ..
            }) => Err(BridgeError::NotFound(format!("{}/{}", self.bucket, path))),
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, path: &str) -> String {
        self.client.url(&format!(
            "storage/v1/object/public/{}/{}",
            self.bucket,
            encode_path(path)
        ))
    }
}
