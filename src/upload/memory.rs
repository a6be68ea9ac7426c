//! Upload slots backed by memory
use super::{ByteTransfer, SlotRequest, UploadSlot, UploadSlots};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Keeps uploaded files in memory, for replays without an upload endpoint
#[derive(Debug, Default)]
pub struct MemoryStore {
    base_url: String,
    slots: Mutex<u64>,
    files: Mutex<HashMap<String, Arc<[u8]>>>,
}

impl MemoryStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// The bytes stored at a public URL
    pub async fn get(&self, url: &str) -> Option<Arc<[u8]>> {
        self.files.lock().await.get(url).cloned()
    }

    pub async fn len(&self) -> usize {
        self.files.lock().await.len()
    }
}

#[async_trait]
impl UploadSlots for MemoryStore {
    async fn request_upload_slot(&self, request: &SlotRequest) -> Result<UploadSlot, String> {
        let mut slots = self.slots.lock().await;
        let url = format!("{}/{}/{}", self.base_url, *slots, request.filename);
        *slots += 1;
        Ok(UploadSlot {
            upload_target: url.clone(),
            public_url: url,
        })
    }
}

#[async_trait]
impl ByteTransfer for MemoryStore {
    async fn transfer(
        &self,
        slot: &UploadSlot,
        _content_type: &str,
        bytes: Arc<[u8]>,
    ) -> Result<(), String> {
        debug!("Storing {} bytes at {}", bytes.len(), slot.upload_target);
        self.files
            .lock()
            .await
            .insert(slot.upload_target.clone(), bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::{BatchId, PendingFile, UploadId, UploadJob, UploadPolicy, Uploader};
    use super::*;

    #[tokio::test]
    async fn test_same_name_gets_separate_slots() {
        let store = Arc::new(MemoryStore::new("memory://uploads"));
        let uploader = Uploader::new(store.clone(), store.clone(), UploadPolicy::default());
        let mut urls = Vec::new();
        for id in 0..2 {
            let job = UploadJob {
                id: UploadId::from(id),
                batch: BatchId::from(0),
                file: PendingFile::new("Photo.PNG", "image/png", vec![id as u8; 3]),
            };
            urls.push(uploader.run(job).await.result.unwrap().url);
        }
        assert_eq!(
            urls,
            ["memory://uploads/0/photo.png", "memory://uploads/1/photo.png"]
        );
        assert_eq!(store.len().await, 2);
        assert_eq!(store.get(&urls[1]).await.as_deref(), Some(&[1u8, 1, 1][..]));
    }
}
