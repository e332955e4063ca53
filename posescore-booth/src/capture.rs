//! Capture controller
//!
//! Runs one capture per slot: acquire stream -> bind preview -> warm-up ->
//! visible countdown -> snapshot -> release. The stream is held by a
//! [`StreamLease`] whose `Drop` stops every track and detaches the preview,
//! so release happens on success, error and cancellation alike.
//!
//! Errors never leave this module. They are logged, published on the
//! event bus as user-facing text, and returned as
//! [`CaptureOutcome::Failed`] for callers that want to inspect them. A
//! failed or cancelled capture never touches the session.
//!
//! Re-invoking [`CaptureController::capture`] for a slot that is still
//! capturing cancels the earlier operation and waits until its stream is
//! released before acquiring a new one. Front ends that run captures on
//! spawned tasks register them first with [`CaptureController::begin`], so
//! a cancel issued before the task is scheduled still reaches it.

use crate::countdown::{Countdown, CountdownScheduler};
use crate::device::{DeviceAccess, VideoStream};
use crate::display::{PreviewSink, SinkRegistry, SlotSinks};
use crate::error::CaptureError;
use crate::session::SharedSession;
use chrono::Utc;
use image::{ImageOutputFormat, RgbaImage};
use posescore_common::config::TomlConfig;
use posescore_common::events::{BoothEvent, EventBus};
use posescore_common::{Artifact, SlotKind};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Timing knobs for a capture
#[derive(Debug, Clone, Copy)]
pub struct CaptureSettings {
    /// Pause after acquisition so the sensor settles
    pub warmup: Duration,
    /// Visible countdown length
    pub countdown_secs: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self::from(&TomlConfig::default())
    }
}

impl From<&TomlConfig> for CaptureSettings {
    fn from(config: &TomlConfig) -> Self {
        Self {
            warmup: config.warmup(),
            countdown_secs: config.countdown_secs,
        }
    }
}

/// How a capture ended
#[derive(Debug)]
pub enum CaptureOutcome {
    /// Artifact stored; dimensions of the captured frame
    Captured { width: u32, height: u32 },
    /// Interrupted or superseded before the snapshot
    Cancelled,
    /// Failed; the slot is unchanged
    Failed(CaptureError),
}

impl CaptureOutcome {
    pub fn is_captured(&self) -> bool {
        matches!(self, CaptureOutcome::Captured { .. })
    }
}

/// Exclusive ownership of an open stream
///
/// Binds the preview on creation; stops all tracks and unbinds on drop.
struct StreamLease {
    stream: Arc<dyn VideoStream>,
    preview: Arc<dyn PreviewSink>,
}

impl StreamLease {
    fn bind(stream: Arc<dyn VideoStream>, preview: Arc<dyn PreviewSink>) -> Self {
        preview.bind(stream.as_ref());
        Self { stream, preview }
    }

    fn stream(&self) -> &dyn VideoStream {
        self.stream.as_ref()
    }
}

impl Drop for StreamLease {
    fn drop(&mut self) {
        self.stream.stop_tracks();
        self.preview.unbind();
        debug!(stream_id = %self.stream.id(), "Stream released");
    }
}

/// Bookkeeping for the capture currently running on a slot
struct InFlight {
    generation: u64,
    token: CancellationToken,
    /// Resolves (sender dropped) once the operation has fully finished
    released: oneshot::Receiver<()>,
}

impl InFlight {
    async fn cancel_and_wait(self) {
        self.token.cancel();
        let _ = self.released.await;
    }
}

/// A capture registered on a slot but not yet run
///
/// Dropping a ticket without completing it releases the slot for anyone
/// waiting on it.
pub struct CaptureTicket {
    slot: SlotKind,
    generation: u64,
    token: CancellationToken,
    release_tx: oneshot::Sender<()>,
    /// Release signal of the capture this one superseded
    previous: Option<oneshot::Receiver<()>>,
}

impl CaptureTicket {
    pub fn slot(&self) -> SlotKind {
        self.slot
    }
}

/// Capture controller for one booth front end
pub struct CaptureController {
    device: Arc<dyn DeviceAccess>,
    sinks: SinkRegistry,
    events: EventBus,
    settings: CaptureSettings,
    countdowns: CountdownScheduler,
    in_flight: Mutex<HashMap<SlotKind, InFlight>>,
    generation: AtomicU64,
}

impl CaptureController {
    pub fn new(
        device: Arc<dyn DeviceAccess>,
        sinks: SinkRegistry,
        events: EventBus,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            device,
            sinks,
            events,
            settings,
            countdowns: CountdownScheduler::new(),
            in_flight: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> CaptureSettings {
        self.settings
    }

    /// Capture a frame into `slot`
    ///
    /// Supersedes any capture already running on the same slot and waits
    /// for its stream to be released before acquiring a new one. Captures
    /// on other slots are untouched.
    ///
    /// # Arguments
    /// * `session` - Session that receives the artifact on success
    /// * `slot` - Slot whose sinks and artifact are used
    ///
    /// # Returns
    /// How the capture ended. Failures have already been logged and
    /// published as [`BoothEvent::CaptureFailed`].
    ///
    /// # Examples
    /// ```ignore
    /// let outcome = controller.capture(&session, SlotKind::Happy).await;
    /// if outcome.is_captured() {
    ///     assert!(session.read().await.artifact(SlotKind::Happy).is_some());
    /// }
    /// ```
    pub async fn capture(&self, session: &SharedSession, slot: SlotKind) -> CaptureOutcome {
        let ticket = self.begin(slot).await;
        self.complete(session, ticket).await
    }

    /// Register a capture on `slot` without running it yet
    ///
    /// From the moment this returns, [`cancel`](Self::cancel),
    /// [`cancel_all`](Self::cancel_all) and [`skip`](Self::skip) see the
    /// capture as in flight, even if [`complete`](Self::complete) has not
    /// started. A capture already running on the slot is signalled to stop.
    pub async fn begin(&self, slot: SlotKind) -> CaptureTicket {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let (release_tx, released) = oneshot::channel::<()>();

        let previous = self.in_flight.lock().await.insert(
            slot,
            InFlight {
                generation,
                token: token.clone(),
                released,
            },
        );
        let previous = previous.map(|previous| {
            info!(slot = %slot, "Superseding in-flight capture");
            previous.token.cancel();
            previous.released
        });

        CaptureTicket {
            slot,
            generation,
            token,
            release_tx,
            previous,
        }
    }

    /// Run a capture registered with [`begin`](Self::begin)
    pub async fn complete(&self, session: &SharedSession, ticket: CaptureTicket) -> CaptureOutcome {
        let CaptureTicket {
            slot,
            generation,
            token,
            release_tx,
            previous,
        } = ticket;
        let session_id = session.read().await.id();

        if let Some(previous) = previous {
            let _ = previous.await;
        }

        let result = match self.sinks.get(slot) {
            Ok(sinks) => {
                info!(slot = %slot, session_id = %session_id, "Capture started");
                let sinks = sinks.clone();
                self.run(session, slot, &sinks, &token).await
            }
            Err(e) => Err(e),
        };

        {
            let mut in_flight = self.in_flight.lock().await;
            if in_flight.get(&slot).map(|f| f.generation) == Some(generation) {
                in_flight.remove(&slot);
            }
        }
        drop(release_tx);

        match result {
            Ok(Some((width, height))) => {
                info!(slot = %slot, width, height, "{} image captured", slot);
                self.events.emit_lossy(BoothEvent::CaptureCompleted {
                    session_id,
                    slot,
                    width,
                    height,
                    timestamp: Utc::now(),
                });
                CaptureOutcome::Captured { width, height }
            }
            Ok(None) => {
                info!(slot = %slot, "Capture cancelled");
                self.events.emit_lossy(BoothEvent::CaptureCancelled {
                    session_id,
                    slot,
                    timestamp: Utc::now(),
                });
                CaptureOutcome::Cancelled
            }
            Err(e) => self.report_failure(session_id, slot, e),
        }
    }

    /// Acquisition through storage; `Ok(None)` means cancelled
    async fn run(
        &self,
        session: &SharedSession,
        slot: SlotKind,
        sinks: &SlotSinks,
        token: &CancellationToken,
    ) -> Result<Option<(u32, u32)>, CaptureError> {
        let stream = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(None),
            stream = self.device.open_video() => stream?,
        };
        let lease = StreamLease::bind(stream, sinks.preview.clone());
        debug!(slot = %slot, stream_id = %lease.stream().id(), "Stream acquired");

        tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(None),
            _ = tokio::time::sleep(self.settings.warmup) => {}
        }

        let (done_tx, done_rx) = oneshot::channel::<()>();
        let events = self.events.clone();
        let countdown = Countdown::new(self.settings.countdown_secs).with_observer(Arc::new(
            move |remaining| {
                events.emit_lossy(BoothEvent::CountdownTick {
                    slot,
                    remaining,
                    timestamp: Utc::now(),
                });
            },
        ));
        self.countdowns
            .start(slot, countdown, sinks.countdown.clone(), move || {
                let _ = done_tx.send(());
            })
            .await;

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                self.countdowns.cancel(slot).await;
                return Ok(None);
            }
            done = done_rx => {
                if done.is_err() {
                    // Countdown was cancelled from outside this operation
                    return Ok(None);
                }
            }
        }

        let frame = grab_native_frame(lease.stream())?;
        let png = encode_png(&frame)?;
        let artifact =
            Artifact::from_png_bytes(&png).map_err(|e| CaptureError::Encode(e.to_string()))?;

        drop(lease);

        sinks.still.draw(&frame);
        debug!(slot = %slot, bytes = artifact.encoded_len(), "Storing artifact");
        session.write().await.store(slot, artifact);

        Ok(Some(frame.dimensions()))
    }

    /// Empty `slot` and detach its preview
    ///
    /// A capture still running on the same slot is cancelled first.
    pub async fn skip(&self, session: &SharedSession, slot: SlotKind) {
        self.cancel(slot).await;

        let session_id = {
            let mut session = session.write().await;
            session.clear(slot);
            session.id()
        };
        if let Ok(sinks) = self.sinks.get(slot) {
            sinks.preview.unbind();
        }

        info!(slot = %slot, "Skipped {} image", slot);
        self.events.emit_lossy(BoothEvent::SlotSkipped {
            session_id,
            slot,
            timestamp: Utc::now(),
        });
    }

    /// Load an image file into `slot` instead of capturing one
    pub async fn load_file(
        &self,
        session: &SharedSession,
        slot: SlotKind,
        path: &Path,
    ) -> CaptureOutcome {
        let session_id = session.read().await.id();

        let result = async {
            let sinks = self.sinks.get(slot)?.clone();
            let bytes = tokio::fs::read(path).await?;
            let frame = image::load_from_memory(&bytes)
                .map_err(|e| CaptureError::Decode(format!("{}: {}", path.display(), e)))?
                .to_rgba8();
            let png = encode_png(&frame)?;
            let artifact = Artifact::from_png_bytes(&png)
                .map_err(|e| CaptureError::Encode(e.to_string()))?;
            sinks.still.draw(&frame);
            Ok::<_, CaptureError>((artifact, frame.dimensions()))
        }
        .await;

        match result {
            Ok((artifact, (width, height))) => {
                self.cancel(slot).await;
                session.write().await.store(slot, artifact);
                info!(slot = %slot, path = %path.display(), "Loaded {} image from file", slot);
                self.events.emit_lossy(BoothEvent::SlotLoaded {
                    session_id,
                    slot,
                    timestamp: Utc::now(),
                });
                CaptureOutcome::Captured { width, height }
            }
            Err(e) => self.report_failure(session_id, slot, e),
        }
    }

    /// Interrupt the capture running on `slot` and wait for its release
    pub async fn cancel(&self, slot: SlotKind) {
        let previous = self.in_flight.lock().await.remove(&slot);
        if let Some(previous) = previous {
            previous.cancel_and_wait().await;
        }
    }

    /// Interrupt every running capture
    pub async fn cancel_all(&self) {
        let drained: Vec<InFlight> = self.in_flight.lock().await.drain().map(|(_, f)| f).collect();
        for in_flight in drained {
            in_flight.cancel_and_wait().await;
        }
    }

    /// True while a capture is running on `slot`
    pub async fn is_capturing(&self, slot: SlotKind) -> bool {
        self.in_flight.lock().await.contains_key(&slot)
    }

    fn report_failure(&self, session_id: Uuid, slot: SlotKind, e: CaptureError) -> CaptureOutcome {
        match &e {
            CaptureError::DeviceAccess(_) => warn!(slot = %slot, error = %e, "Webcam error"),
            _ => error!(slot = %slot, error = %e, "Capture failed"),
        }
        self.events.emit_lossy(BoothEvent::CaptureFailed {
            session_id,
            slot,
            message: e.user_message(),
            timestamp: Utc::now(),
        });
        CaptureOutcome::Failed(e)
    }
}

/// Copy the current frame, checking it matches the stream's resolution
fn grab_native_frame(stream: &dyn VideoStream) -> Result<RgbaImage, CaptureError> {
    let frame = stream.grab_frame()?;
    let native = stream.resolution();
    if frame.dimensions() != native || native.0 == 0 || native.1 == 0 {
        return Err(CaptureError::Frame(format!(
            "frame is {:?}, stream reports {:?}",
            frame.dimensions(),
            native
        )));
    }
    Ok(frame)
}

/// Encode an RGBA frame as PNG bytes
pub fn encode_png(frame: &RgbaImage) -> Result<Vec<u8>, CaptureError> {
    let mut bytes = Vec::new();
    frame
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;
    Ok(bytes)
}
