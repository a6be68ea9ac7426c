//! # Attachments
//!
//! Files dropped, pasted or picked in the editor are checked against an
//! [`UploadPolicy`], sent through an upload slot and turned into an
//! `attachment` node once the bytes are stored. Figma and Loom links skip the
//! upload and become embeds directly.
#[cfg(feature = "http")]
mod http;
mod memory;

#[cfg(feature = "http")]
pub use http::HttpUploadService;
pub use memory::MemoryStore;

use crate::config::deserialize_from_str;
use crate::model::{AttachmentAttrs, AttachmentKind};
use crate::tree::NodeKey;
use crate::util::make_id;
use async_trait::async_trait;
use displaydoc::Display;
use serde::{Deserialize, Deserializer, Serialize};
use slug::slugify;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Largest file accepted for upload, 100 MiB
pub const MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

make_id!(
    /// A single file upload
    UploadId,
    "upload#{0}"
);

make_id!(
    /// Files that were dropped or picked together
    BatchId,
    "batch#{0}"
);

/// Error when attaching a file
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// {name}: size exceeds limit ({size} bytes, at most {limit})
    TooLarge { name: String, size: u64, limit: u64 },
    /// {name}: type not allowed ({mime_type})
    TypeNotAllowed { name: String, mime_type: String },
    /// {name}: could not get an upload slot: {reason}
    Slot { name: String, reason: String },
    /// {name}: upload failed: {reason}
    Transfer { name: String, reason: String },
}

/// A file handed to the editor by the host
#[derive(Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
    /// Pixel size reported by the host, for images and videos
    pub dimensions: Option<(u32, u32)>,
}

impl fmt::Debug for PendingFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl PendingFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
            dimensions: None,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some((width, height));
        self
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// The attachment kind for a declared MIME type
pub fn classify(mime_type: &str) -> AttachmentKind {
    let mime_type = mime_type.to_ascii_lowercase();
    if mime_type.starts_with("image/") {
        AttachmentKind::Image
    } else if mime_type.starts_with("video/") {
        AttachmentKind::Video
    } else {
        AttachmentKind::File
    }
}

fn host_and_path(url: &str) -> Option<(String, &str)> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let (host, path) = match rest.find('/') {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };
    let host = host.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_owned();
    Some((host, path))
}

/// The embed kind of a pasted link, if it is a Figma or Loom link
pub fn classify_embed(url: &str) -> Option<AttachmentKind> {
    let url = url.trim();
    if url.contains(char::is_whitespace) {
        return None;
    }
    let (host, path) = host_and_path(url)?;
    match host.as_str() {
        "figma.com" if path.len() > 1 => Some(AttachmentKind::Figma),
        "loom.com" if path.starts_with("/share/") || path.starts_with("/embed/") => {
            Some(AttachmentKind::Loom)
        }
        _ => None,
    }
}

/// Attachment attributes for an embed link
pub fn embed_attrs(kind: AttachmentKind, url: &str) -> AttachmentAttrs {
    let url = url.trim();
    let filename = url.rsplit('/').find(|s| !s.is_empty()).unwrap_or(url);
    AttachmentAttrs {
        kind,
        url: url.to_owned(),
        filename: filename.to_owned(),
        mime_type: String::from("text/uri-list"),
        size_bytes: 0,
        thumbnail_url: None,
        width: None,
        height: None,
        metadata: None,
    }
}

/// Storage key hint: slugified stem plus the original extension
pub fn storage_name(filename: &str) -> String {
    let (stem, ext) = match filename.rfind('.') {
        Some(idx) if idx > 0 => (&filename[..idx], Some(&filename[idx + 1..])),
        _ => (filename, None),
    };
    let mut name = slugify(stem);
    if name.is_empty() {
        name.push_str("file");
    }
    if let Some(ext) = ext.filter(|ext| !ext.is_empty()) {
        name.push('.');
        name.push_str(&ext.to_ascii_lowercase());
    }
    name
}

/// A MIME type, or a whole top-level type like `image/*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimePattern {
    Any,
    TopLevel(String),
    Exact(String),
}

impl MimePattern {
    pub fn matches(&self, mime_type: &str) -> bool {
        let mime_type = mime_type.to_ascii_lowercase();
        match self {
            Self::Any => true,
            Self::TopLevel(top) => mime_type
                .split_once('/')
                .map_or(false, |(t, _)| t == top.as_str()),
            Self::Exact(exact) => &mime_type == exact,
        }
    }
}

impl FromStr for MimePattern {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Ok(match s.strip_suffix("/*") {
            _ if s == "*" || s == "*/*" => Self::Any,
            Some(top) => Self::TopLevel(top.to_owned()),
            None => Self::Exact(s),
        })
    }
}

impl<'de> Deserialize<'de> for MimePattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_from_str(deserializer)
    }
}

fn default_allowed() -> Vec<MimePattern> {
    ["image/*", "video/*", "audio/*", "text/*", "application/pdf", "application/zip"]
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect()
}

fn default_max_bytes() -> u64 {
    MAX_UPLOAD_BYTES
}

/// Which files may be uploaded
#[derive(Debug, Clone, Deserialize)]
pub struct UploadPolicy {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "default_allowed", rename = "allowed_types")]
    pub allowed: Vec<MimePattern>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
            allowed: default_allowed(),
        }
    }
}

impl UploadPolicy {
    /// Rejects a file before anything is sent over the network
    pub fn check(&self, file: &PendingFile) -> Result<(), UploadError> {
        if file.size() > self.max_bytes {
            return Err(UploadError::TooLarge {
                name: file.name.clone(),
                size: file.size(),
                limit: self.max_bytes,
            });
        }
        if !self.allowed.iter().any(|p| p.matches(&file.mime_type)) {
            return Err(UploadError::TypeNotAllowed {
                name: file.name.clone(),
                mime_type: file.mime_type.clone(),
            });
        }
        Ok(())
    }
}

/// Body of an upload slot request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRequest {
    pub filename: String,
    pub content_type: String,
    pub size_bytes: u64,
}

/// A one-time destination for a single file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSlot {
    pub upload_target: String,
    pub public_url: String,
}

/// Hands out upload slots
#[async_trait]
pub trait UploadSlots: Send + Sync {
    /// Failures are reported as a reason string, the caller adds the file name
    async fn request_upload_slot(&self, request: &SlotRequest) -> Result<UploadSlot, String>;
}

/// Moves the bytes of a file to its slot
#[async_trait]
pub trait ByteTransfer: Send + Sync {
    async fn transfer(
        &self,
        slot: &UploadSlot,
        content_type: &str,
        bytes: Arc<[u8]>,
    ) -> Result<(), String>;
}

/// One file of a batch, ready to be uploaded
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub id: UploadId,
    pub batch: BatchId,
    pub file: PendingFile,
}

/// The result of an [`UploadJob`]
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub id: UploadId,
    pub batch: BatchId,
    pub result: Result<AttachmentAttrs, UploadError>,
}

/// Where the attachments of a batch go
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BatchAnchor {
    /// The node the next attachment is inserted after
    pub after: NodeKey,
}

/// Runs uploads against the slot and transfer collaborators
#[derive(Clone)]
pub struct Uploader {
    slots: Arc<dyn UploadSlots>,
    transfer: Arc<dyn ByteTransfer>,
    policy: UploadPolicy,
}

impl Uploader {
    pub fn new(
        slots: Arc<dyn UploadSlots>,
        transfer: Arc<dyn ByteTransfer>,
        policy: UploadPolicy,
    ) -> Self {
        Self {
            slots,
            transfer,
            policy,
        }
    }

    /// Checks, requests a slot, transfers and describes the stored file
    #[instrument(skip(self, job), fields(id = %job.id, file = %job.file.name))]
    pub async fn run(&self, job: UploadJob) -> UploadOutcome {
        let result = self.upload(&job.file).await;
        match &result {
            Ok(attrs) => info!("Stored at {}", attrs.url),
            Err(err) => info!("{}", err),
        }
        UploadOutcome {
            id: job.id,
            batch: job.batch,
            result,
        }
    }

    async fn upload(&self, file: &PendingFile) -> Result<AttachmentAttrs, UploadError> {
        self.policy.check(file)?;
        let request = SlotRequest {
            filename: storage_name(&file.name),
            content_type: file.mime_type.clone(),
            size_bytes: file.size(),
        };
        let slot = self
            .slots
            .request_upload_slot(&request)
            .await
            .map_err(|reason| UploadError::Slot {
                name: file.name.clone(),
                reason,
            })?;
        debug!("Got slot {:?}", slot.upload_target);
        self.transfer
            .transfer(&slot, &file.mime_type, file.bytes.clone())
            .await
            .map_err(|reason| UploadError::Transfer {
                name: file.name.clone(),
                reason,
            })?;

        let kind = classify(&file.mime_type);
        let (width, height) = match file.dimensions {
            Some((w, h)) if kind.is_media() => (Some(w), Some(h)),
            _ => (None, None),
        };
        Ok(AttachmentAttrs {
            kind,
            thumbnail_url: (kind == AttachmentKind::Image).then(|| slot.public_url.clone()),
            url: slot.public_url,
            filename: file.name.clone(),
            mime_type: file.mime_type.clone(),
            size_bytes: file.size(),
            width,
            height,
            metadata: None,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording upload collaborators for tests
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct Recorder {
        pub slot_requests: Mutex<Vec<SlotRequest>>,
        pub transfers: Mutex<Vec<(String, usize)>>,
        pub fail_slots: bool,
        pub fail_transfers: bool,
    }

    #[async_trait]
    impl UploadSlots for Recorder {
        async fn request_upload_slot(&self, request: &SlotRequest) -> Result<UploadSlot, String> {
            self.slot_requests.lock().unwrap().push(request.clone());
            if self.fail_slots {
                return Err(String::from("quota exceeded"));
            }
            Ok(UploadSlot {
                upload_target: format!("https://upload.test/{}", request.filename),
                public_url: format!("https://cdn.test/{}", request.filename),
            })
        }
    }

    #[async_trait]
    impl ByteTransfer for Recorder {
        async fn transfer(
            &self,
            slot: &UploadSlot,
            _content_type: &str,
            bytes: Arc<[u8]>,
        ) -> Result<(), String> {
            self.transfers
                .lock()
                .unwrap()
                .push((slot.upload_target.clone(), bytes.len()));
            if self.fail_transfers {
                return Err(String::from("status 500"));
            }
            Ok(())
        }
    }

    pub fn uploader(recorder: &Arc<Recorder>) -> Uploader {
        Uploader::new(recorder.clone(), recorder.clone(), UploadPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{uploader, Recorder};
    use super::*;
    use pretty_assertions::assert_eq;

    fn job(file: PendingFile) -> UploadJob {
        UploadJob {
            id: UploadId::from(0),
            batch: BatchId::from(0),
            file,
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("image/png"), AttachmentKind::Image);
        assert_eq!(classify("Video/MP4"), AttachmentKind::Video);
        assert_eq!(classify("application/pdf"), AttachmentKind::File);
    }

    #[test]
    fn test_classify_embed() {
        assert_eq!(
            classify_embed("https://www.figma.com/file/abc/Design"),
            Some(AttachmentKind::Figma)
        );
        assert_eq!(
            classify_embed("https://loom.com/share/0123"),
            Some(AttachmentKind::Loom)
        );
        assert_eq!(classify_embed("https://figma.com"), None);
        assert_eq!(classify_embed("see https://figma.com/file/x"), None);
        assert_eq!(classify_embed("https://example.com/share/1"), None);
    }

    #[test]
    fn test_storage_name() {
        assert_eq!(storage_name("My Holiday Photo.PNG"), "my-holiday-photo.png");
        assert_eq!(storage_name(".env"), "env");
        assert_eq!(storage_name("???.pdf"), "file.pdf");
        assert_eq!(storage_name("README"), "readme");
    }

    #[test]
    fn test_policy_rejects_before_network() {
        assert_eq!(UploadPolicy::default().max_bytes, 104_857_600);
        let policy = UploadPolicy {
            max_bytes: 1024,
            ..UploadPolicy::default()
        };
        let big = PendingFile::new("big.png", "image/png", vec![0; 1025]);
        let err = policy.check(&big).unwrap_err();
        assert_eq!(err.to_string(), "big.png: size exceeds limit (1025 bytes, at most 1024)");
        let exe = PendingFile::new("a.exe", "application/x-msdownload", vec![1]);
        let err = policy.check(&exe).unwrap_err();
        assert_eq!(err.to_string(), "a.exe: type not allowed (application/x-msdownload)");
        assert!(policy.check(&PendingFile::new("a.pdf", "application/pdf", vec![1])).is_ok());
    }

    #[test]
    fn test_mime_patterns() {
        let image: MimePattern = "image/*".parse().unwrap();
        assert!(image.matches("IMAGE/png"));
        assert!(!image.matches("video/mp4"));
        assert_eq!("*/*".parse::<MimePattern>().unwrap(), MimePattern::Any);
        let policy: UploadPolicy =
            toml::from_str("max_bytes = 10\nallowed_types = [\"text/plain\"]").unwrap();
        assert_eq!(policy.allowed, vec![MimePattern::Exact("text/plain".into())]);
    }

    #[tokio::test]
    async fn test_upload_builds_attachment() {
        let recorder = Arc::new(Recorder::default());
        let file = PendingFile::new("Cat Pic.png", "image/png", vec![7; 2048]).with_dimensions(64, 48);
        let outcome = uploader(&recorder).run(job(file)).await;
        let attrs = outcome.result.unwrap();
        assert_eq!(attrs.kind, AttachmentKind::Image);
        assert_eq!(attrs.url, "https://cdn.test/cat-pic.png");
        assert_eq!(attrs.thumbnail_url.as_deref(), Some("https://cdn.test/cat-pic.png"));
        assert_eq!(attrs.filename, "Cat Pic.png");
        assert_eq!((attrs.width, attrs.height), (Some(64), Some(48)));
        assert_eq!(
            recorder.slot_requests.lock().unwrap()[0],
            SlotRequest {
                filename: "cat-pic.png".into(),
                content_type: "image/png".into(),
                size_bytes: 2048,
            }
        );
        assert_eq!(recorder.transfers.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_slot_failure_skips_transfer() {
        let recorder = Arc::new(Recorder {
            fail_slots: true,
            ..Recorder::default()
        });
        let file = PendingFile::new("a.pdf", "application/pdf", vec![1]);
        let outcome = uploader(&recorder).run(job(file)).await;
        assert!(matches!(outcome.result, Err(UploadError::Slot { .. })));
        assert!(recorder.transfers.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disallowed_file_makes_no_calls() {
        let recorder = Arc::new(Recorder::default());
        let file = PendingFile::new("a.exe", "application/x-msdownload", vec![1]);
        let outcome = uploader(&recorder).run(job(file)).await;
        assert!(matches!(outcome.result, Err(UploadError::TypeNotAllowed { .. })));
        assert!(recorder.slot_requests.lock().unwrap().is_empty());
    }
}
