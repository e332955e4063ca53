//! In-process fakes for device, display, results and scorer

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use posescore_booth::aggregator::ScoreReport;
use posescore_booth::device::{DeviceAccess, StaticStream, VideoStream};
use posescore_booth::display::{
    CountdownSink, PreviewSink, ResultsMessage, ResultsView, SinkRegistry, SlotSinks, StillSink,
};
use posescore_booth::error::{CaptureError, ScoringError};
use posescore_booth::scoring::{AnalyzeRequest, ScoreResponse, Scorer};
use posescore_common::events::BoothEvent;
use posescore_common::SlotKind;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Stream whose frames cannot be read
pub struct BrokenStream {
    id: Uuid,
    tracks: AtomicUsize,
}

impl VideoStream for BrokenStream {
    fn id(&self) -> Uuid {
        self.id
    }

    fn resolution(&self) -> (u32, u32) {
        (32, 24)
    }

    fn grab_frame(&self) -> Result<RgbaImage, CaptureError> {
        Err(CaptureError::Frame("sensor returned no data".to_string()))
    }

    fn stop_tracks(&self) {
        self.tracks.store(0, Ordering::SeqCst);
    }

    fn active_tracks(&self) -> usize {
        self.tracks.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeviceMode {
    Working,
    Denied,
    BrokenFrames,
}

/// Device that records every stream it hands out
pub struct FakeDevice {
    mode: DeviceMode,
    width: u32,
    height: u32,
    streams: Mutex<Vec<Arc<dyn VideoStream>>>,
}

impl FakeDevice {
    fn with_mode(mode: DeviceMode) -> Self {
        Self {
            mode,
            width: 32,
            height: 24,
            streams: Mutex::new(Vec::new()),
        }
    }

    pub fn working() -> Self {
        Self::with_mode(DeviceMode::Working)
    }

    pub fn denied() -> Self {
        Self::with_mode(DeviceMode::Denied)
    }

    pub fn broken_frames() -> Self {
        Self::with_mode(DeviceMode::BrokenFrames)
    }

    pub fn streams(&self) -> Vec<Arc<dyn VideoStream>> {
        self.streams.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.streams.lock().unwrap().len()
    }
}

#[async_trait]
impl DeviceAccess for FakeDevice {
    async fn open_video(&self) -> Result<Arc<dyn VideoStream>, CaptureError> {
        let stream: Arc<dyn VideoStream> = match self.mode {
            DeviceMode::Denied => {
                return Err(CaptureError::DeviceAccess("NotAllowedError: permission denied".to_string()))
            }
            DeviceMode::Working => Arc::new(StaticStream::new(RgbaImage::from_pixel(
                self.width,
                self.height,
                Rgba([200, 100, 50, 255]),
            ))),
            DeviceMode::BrokenFrames => Arc::new(BrokenStream {
                id: Uuid::new_v4(),
                tracks: AtomicUsize::new(1),
            }),
        };
        self.streams.lock().unwrap().push(stream.clone());
        Ok(stream)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayOp {
    Bind(Uuid),
    Unbind,
    Draw(u32, u32),
    Text(u32),
    Show,
    Hide,
}

/// Display recording every sink call
#[derive(Default)]
pub struct RecordingDisplay {
    ops: Mutex<Vec<DisplayOp>>,
}

impl RecordingDisplay {
    pub fn ops(&self) -> Vec<DisplayOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn countdown_ops(&self) -> Vec<DisplayOp> {
        self.ops()
            .into_iter()
            .filter(|op| matches!(op, DisplayOp::Text(_) | DisplayOp::Show | DisplayOp::Hide))
            .collect()
    }

    fn push(&self, op: DisplayOp) {
        self.ops.lock().unwrap().push(op);
    }
}

impl PreviewSink for RecordingDisplay {
    fn bind(&self, stream: &dyn VideoStream) {
        self.push(DisplayOp::Bind(stream.id()));
    }

    fn unbind(&self) {
        self.push(DisplayOp::Unbind);
    }
}

impl StillSink for RecordingDisplay {
    fn draw(&self, frame: &RgbaImage) {
        self.push(DisplayOp::Draw(frame.width(), frame.height()));
    }
}

impl CountdownSink for RecordingDisplay {
    fn set_text(&self, remaining: u32) {
        self.push(DisplayOp::Text(remaining));
    }

    fn show(&self) {
        self.push(DisplayOp::Show);
    }

    fn hide(&self) {
        self.push(DisplayOp::Hide);
    }
}

/// Registry with one recording display per slot
pub fn recording_registry() -> (SinkRegistry, HashMap<SlotKind, Arc<RecordingDisplay>>) {
    let displays: HashMap<SlotKind, Arc<RecordingDisplay>> = SlotKind::ALL
        .iter()
        .map(|slot| (*slot, Arc::new(RecordingDisplay::default())))
        .collect();
    let sinks = displays
        .iter()
        .map(|(slot, display)| (*slot, SlotSinks::uniform(display.clone())))
        .collect();
    (SinkRegistry::new(sinks).unwrap(), displays)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultsOp {
    Processing,
    Message(ResultsMessage),
    Report(Vec<String>),
}

/// Results view recording what was rendered
#[derive(Default)]
pub struct RecordingResults {
    ops: Mutex<Vec<ResultsOp>>,
}

impl RecordingResults {
    pub fn ops(&self) -> Vec<ResultsOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<ResultsOp> {
        self.ops.lock().unwrap().last().cloned()
    }
}

impl ResultsView for RecordingResults {
    fn show_processing(&self) {
        self.ops.lock().unwrap().push(ResultsOp::Processing);
    }

    fn show_message(&self, message: &ResultsMessage) {
        self.ops.lock().unwrap().push(ResultsOp::Message(message.clone()));
    }

    fn show_report(&self, report: &ScoreReport) {
        self.ops.lock().unwrap().push(ResultsOp::Report(report.lines()));
    }
}

/// Scorer returning a canned result and recording requests
pub struct MockScorer {
    reply: Mutex<Option<Result<ScoreResponse, ScoringError>>>,
    requests: Mutex<Vec<AnalyzeRequest>>,
}

impl MockScorer {
    pub fn returning(scores: ScoreResponse) -> Self {
        Self {
            reply: Mutex::new(Some(Ok(scores))),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ScoringError) -> Self {
        Self {
            reply: Mutex::new(Some(Err(error))),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<AnalyzeRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Scorer for MockScorer {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<ScoreResponse, ScoringError> {
        self.requests.lock().unwrap().push(request.clone());
        self.reply
            .lock()
            .unwrap()
            .take()
            .expect("MockScorer called more than once")
    }
}

/// Collect every event currently buffered on a receiver
pub fn drain_events(rx: &mut broadcast::Receiver<BoothEvent>) -> Vec<BoothEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
