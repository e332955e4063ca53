//! Camera device access
//!
//! The capture controller only sees the [`DeviceAccess`] and
//! [`VideoStream`] capability traits. Two concrete sources ship with the
//! booth:
//! - [`StillImageDevice`]: serves a fixed image file as the feed
//! - [`PatternDevice`]: synthetic gradient at a configured resolution

use crate::error::CaptureError;
use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Source of live video streams
#[async_trait]
pub trait DeviceAccess: Send + Sync {
    /// Request a video-only stream
    ///
    /// Fails with [`CaptureError::DeviceAccess`] when permission is denied
    /// or no device is available.
    async fn open_video(&self) -> Result<Arc<dyn VideoStream>, CaptureError>;
}

/// Live handle to a camera feed
pub trait VideoStream: Send + Sync {
    /// Stream identifier for log correlation
    fn id(&self) -> Uuid;

    /// Native (width, height) of the feed
    fn resolution(&self) -> (u32, u32);

    /// Copy the current frame at native resolution
    fn grab_frame(&self) -> Result<RgbaImage, CaptureError>;

    /// Stop every track of the stream; idempotent
    fn stop_tracks(&self);

    /// Number of tracks still running
    fn active_tracks(&self) -> usize;
}

/// Stream over a fixed frame
///
/// Shared by both concrete devices; a stopped stream refuses to produce
/// frames.
pub struct StaticStream {
    id: Uuid,
    frame: RgbaImage,
    tracks: AtomicUsize,
}

impl StaticStream {
    pub fn new(frame: RgbaImage) -> Self {
        Self {
            id: Uuid::new_v4(),
            frame,
            tracks: AtomicUsize::new(1),
        }
    }
}

impl VideoStream for StaticStream {
    fn id(&self) -> Uuid {
        self.id
    }

    fn resolution(&self) -> (u32, u32) {
        self.frame.dimensions()
    }

    fn grab_frame(&self) -> Result<RgbaImage, CaptureError> {
        if self.active_tracks() == 0 {
            return Err(CaptureError::Frame(format!("stream {} already stopped", self.id)));
        }
        Ok(self.frame.clone())
    }

    fn stop_tracks(&self) {
        let stopped = self.tracks.swap(0, Ordering::SeqCst);
        if stopped > 0 {
            tracing::debug!(stream_id = %self.id, tracks = stopped, "Stopped stream tracks");
        }
    }

    fn active_tracks(&self) -> usize {
        self.tracks.load(Ordering::SeqCst)
    }
}

/// Camera backed by an image file
pub struct StillImageDevice {
    path: PathBuf,
}

impl StillImageDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DeviceAccess for StillImageDevice {
    async fn open_video(&self) -> Result<Arc<dyn VideoStream>, CaptureError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            CaptureError::DeviceAccess(format!("{}: {}", self.path.display(), e))
        })?;
        let frame = image::load_from_memory(&bytes)
            .map_err(|e| CaptureError::DeviceAccess(format!("{}: {}", self.path.display(), e)))?
            .to_rgba8();

        let stream = StaticStream::new(frame);
        tracing::debug!(
            stream_id = %stream.id(),
            source = %self.path.display(),
            "Opened still-image stream"
        );
        Ok(Arc::new(stream))
    }
}

/// Synthetic camera producing a gradient test pattern
pub struct PatternDevice {
    width: u32,
    height: u32,
    opened: AtomicU64,
}

impl PatternDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            opened: AtomicU64::new(0),
        }
    }

    fn render(&self, seed: u64) -> RgbaImage {
        let shift = (seed % 256) as u32;
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let r = (x * 255 / self.width.max(1)) as u8;
            let g = (y * 255 / self.height.max(1)) as u8;
            let b = ((x + y + shift) % 256) as u8;
            Rgba([r, g, b, 255])
        })
    }
}

#[async_trait]
impl DeviceAccess for PatternDevice {
    async fn open_video(&self) -> Result<Arc<dyn VideoStream>, CaptureError> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::DeviceAccess(
                "pattern device has zero resolution".to_string(),
            ));
        }
        let seed = self.opened.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(StaticStream::new(self.render(seed))))
    }
}
