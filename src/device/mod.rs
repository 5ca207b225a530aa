//! Local device collaborators: file reads for attachments and camera capture
//! for receipts.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

pub use crate::errors::DeviceError;

const CAPTURE_MIME: &str = "image/jpeg";

/// `data:<mime>;base64,<payload>` string holding an inlined file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataUri(String);

impl DataUri {
    pub fn encode(mime: &str, bytes: &[u8]) -> Self {
        DataUri(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
    }

    /// Accepts an already-encoded data URI, e.g. a value typed into a field.
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.trim().strip_prefix("data:")?;
        let (_, payload) = rest.split_once(";base64,")?;
        STANDARD.decode(payload).ok()?;
        Some(DataUri(raw.trim().to_string()))
    }

    pub fn mime(&self) -> &str {
        self.0
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .unwrap_or("application/octet-stream")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DataUri {
    /// Abbreviated form for summaries; the payload can be megabytes long.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} attachment, {} bytes>", self.mime(), self.0.len())
    }
}

pub fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Converts a local file into a data URI. No network access.
#[async_trait]
pub trait FileSource: Send + Sync {
    async fn read_data_uri(&self, path: &Path) -> Result<DataUri, DeviceError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FsFileSource;

#[async_trait]
impl FileSource for FsFileSource {
    async fn read_data_uri(&self, path: &Path) -> Result<DataUri, DeviceError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| DeviceError::Read {
                path: path.display().to_string(),
                source,
            })?;
        Ok(DataUri::encode(mime_for(path), &bytes))
    }
}

/// Handle for a file read running on its own task.
pub struct PendingRead {
    pub path: PathBuf,
    handle: JoinHandle<Result<DataUri, DeviceError>>,
}

impl PendingRead {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn wait(self) -> Result<DataUri, DeviceError> {
        self.handle.await?
    }
}

/// Starts reading `path` in the background so the wizard stays navigable.
pub fn spawn_read(source: Arc<dyn FileSource>, path: PathBuf) -> PendingRead {
    let target = path.clone();
    let handle = tokio::spawn(async move { source.read_data_uri(&target).await });
    PendingRead { path, handle }
}

/// Opaque identifier of an acquired camera stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHandle {
    pub id: u64,
}

/// Exclusive capture device.
#[async_trait]
pub trait Camera: Send + Sync {
    async fn acquire(&self) -> Result<StreamHandle, DeviceError>;

    /// Grabs one JPEG frame from an acquired stream.
    async fn capture(&self, stream: &StreamHandle) -> Result<Vec<u8>, DeviceError>;

    fn release(&self, stream: StreamHandle);
}

/// Owns one acquired stream and releases it exactly once, either through
/// [`CameraSession::release`] or on drop.
pub struct CameraSession {
    camera: Arc<dyn Camera>,
    stream: Option<StreamHandle>,
}

impl CameraSession {
    pub async fn open(camera: Arc<dyn Camera>) -> Result<Self, DeviceError> {
        let stream = camera.acquire().await?;
        tracing::debug!(stream = stream.id, "camera stream acquired");
        Ok(Self {
            camera,
            stream: Some(stream),
        })
    }

    pub async fn capture(&self) -> Result<DataUri, DeviceError> {
        let stream = self.stream.as_ref().ok_or(DeviceError::NoCameraSession)?;
        let frame = self.camera.capture(stream).await?;
        Ok(DataUri::encode(CAPTURE_MIME, &frame))
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    pub fn release(mut self) {
        self.release_stream();
    }

    fn release_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            tracing::debug!(stream = stream.id, "camera stream released");
            self.camera.release(stream);
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.release_stream();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingCamera {
        releases: AtomicUsize,
    }

    #[async_trait]
    impl Camera for CountingCamera {
        async fn acquire(&self) -> Result<StreamHandle, DeviceError> {
            Ok(StreamHandle { id: 7 })
        }

        async fn capture(&self, _stream: &StreamHandle) -> Result<Vec<u8>, DeviceError> {
            Ok(vec![0xFF, 0xD8, 0xFF])
        }

        fn release(&self, _stream: StreamHandle) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn data_uri_round_trips_mime() {
        let uri = DataUri::encode("image/png", b"png-bytes");
        assert_eq!(uri.mime(), "image/png");
        assert_eq!(DataUri::parse(uri.as_str()), Some(uri.clone()));
        assert!(DataUri::parse("data:image/png;base64,***").is_none());
        assert!(DataUri::parse("receipt.png").is_none());
    }

    #[test]
    fn mime_is_derived_from_extension() {
        assert_eq!(mime_for(Path::new("scan.PDF")), "application/pdf");
        assert_eq!(mime_for(Path::new("beleg.jpeg")), "image/jpeg");
        assert_eq!(mime_for(Path::new("notes")), "application/octet-stream");
    }

    #[tokio::test]
    async fn explicit_release_does_not_release_again_on_drop() {
        let camera = Arc::new(CountingCamera::default());
        let session = CameraSession::open(camera.clone()).await.unwrap();
        let frame = session.capture().await.unwrap();
        assert_eq!(frame.mime(), CAPTURE_MIME);
        session.release();
        assert_eq!(camera.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropping_an_open_session_releases_it() {
        let camera = Arc::new(CountingCamera::default());
        {
            let _session = CameraSession::open(camera.clone()).await.unwrap();
        }
        assert_eq!(camera.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn spawn_read_produces_data_uri() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("beleg.png");
        std::fs::write(&path, b"\x89PNG").unwrap();
        let pending = spawn_read(Arc::new(FsFileSource), path);
        let uri = pending.wait().await.unwrap();
        assert_eq!(uri.mime(), "image/png");
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let err = FsFileSource
            .read_data_uri(Path::new("/definitely/not/here.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::Read { .. }));
    }
}
