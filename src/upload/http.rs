//! Upload slots from an HTTP endpoint
use super::{ByteTransfer, SlotRequest, UploadSlot, UploadSlots};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use std::sync::Arc;
use tracing::debug;

/// Requests slots with a JSON `POST` and transfers bytes with a `PUT`
#[derive(Debug, Clone)]
pub struct HttpUploadService {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

async fn failure(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if body.is_empty() {
        format!("status {}", status)
    } else {
        format!("status {}: {}", status, body)
    }
}

impl HttpUploadService {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            token,
        }
    }
}

#[async_trait]
impl UploadSlots for HttpUploadService {
    async fn request_upload_slot(&self, request: &SlotRequest) -> Result<UploadSlot, String> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| format!("network error: {}", e))?;
        if !response.status().is_success() {
            return Err(failure(response).await);
        }
        let slot = response
            .json::<UploadSlot>()
            .await
            .map_err(|e| format!("invalid slot response: {}", e))?;
        debug!("Slot for {} at {}", request.filename, slot.upload_target);
        Ok(slot)
    }
}

#[async_trait]
impl ByteTransfer for HttpUploadService {
    async fn transfer(
        &self,
        slot: &UploadSlot,
        content_type: &str,
        bytes: Arc<[u8]>,
    ) -> Result<(), String> {
        let response = self
            .client
            .put(&slot.upload_target)
            .header(CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| format!("network error: {}", e))?;
        if !response.status().is_success() {
            return Err(failure(response).await);
        }
        Ok(())
    }
}
