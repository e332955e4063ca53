//! Presentation sinks
//!
//! Business logic never looks displays up by name. Each slot gets an
//! explicit [`SlotSinks`] triad (live preview, captured still, countdown)
//! registered in a [`SinkRegistry`] that is handed to the capture
//! controller. Analysis output goes to a [`ResultsView`].

use crate::aggregator::ScoreReport;
use crate::device::VideoStream;
use crate::error::CaptureError;
use image::RgbaImage;
use posescore_common::{Error, SlotKind};
use std::collections::HashMap;
use std::sync::Arc;

/// Live video sink for one slot
pub trait PreviewSink: Send + Sync {
    fn bind(&self, stream: &dyn VideoStream);
    fn unbind(&self);
}

/// Still-image sink showing the captured frame
pub trait StillSink: Send + Sync {
    fn draw(&self, frame: &RgbaImage);
}

/// Countdown text/visibility sink
pub trait CountdownSink: Send + Sync {
    fn set_text(&self, remaining: u32);
    fn show(&self);
    fn hide(&self);
}

/// Display triad for one slot
#[derive(Clone)]
pub struct SlotSinks {
    pub preview: Arc<dyn PreviewSink>,
    pub still: Arc<dyn StillSink>,
    pub countdown: Arc<dyn CountdownSink>,
}

impl SlotSinks {
    /// Use one object for all three sinks
    pub fn uniform<D>(display: Arc<D>) -> Self
    where
        D: PreviewSink + StillSink + CountdownSink + 'static,
    {
        Self {
            preview: display.clone(),
            still: display.clone(),
            countdown: display,
        }
    }
}

/// Explicit slot -> sinks mapping
///
/// Built once up front; a registry always covers every slot.
#[derive(Clone)]
pub struct SinkRegistry {
    sinks: HashMap<SlotKind, SlotSinks>,
}

impl SinkRegistry {
    /// Build a registry; every slot in [`SlotKind::ALL`] must be present
    pub fn new(sinks: HashMap<SlotKind, SlotSinks>) -> posescore_common::Result<Self> {
        if let Some(missing) = SlotKind::ALL.iter().find(|s| !sinks.contains_key(s)) {
            return Err(Error::InvalidInput(format!(
                "No display sinks registered for slot '{}'",
                missing
            )));
        }
        Ok(Self { sinks })
    }

    /// Registry with a fresh console display per slot
    pub fn console() -> Self {
        let sinks = SlotKind::ALL
            .iter()
            .map(|slot| (*slot, SlotSinks::uniform(Arc::new(ConsoleDisplay::new(*slot)))))
            .collect();
        Self { sinks }
    }

    pub fn get(&self, slot: SlotKind) -> Result<&SlotSinks, CaptureError> {
        self.sinks.get(&slot).ok_or(CaptureError::UnknownSlot(slot))
    }
}

/// Terminal display for one slot
pub struct ConsoleDisplay {
    slot: SlotKind,
}

impl ConsoleDisplay {
    pub fn new(slot: SlotKind) -> Self {
        Self { slot }
    }

    fn countdown_line(&self, remaining: u32) -> String {
        format!("[{}] {}...", self.slot, remaining)
    }

    fn done_line(&self) -> String {
        format!("[{}] countdown done", self.slot)
    }
}

impl PreviewSink for ConsoleDisplay {
    fn bind(&self, stream: &dyn VideoStream) {
        let (width, height) = stream.resolution();
        tracing::debug!(slot = %self.slot, stream_id = %stream.id(), width, height, "Preview bound");
    }

    fn unbind(&self) {
        tracing::debug!(slot = %self.slot, "Preview unbound");
    }
}

impl StillSink for ConsoleDisplay {
    fn draw(&self, frame: &RgbaImage) {
        println!("[{}] captured {}x{} frame", self.slot, frame.width(), frame.height());
    }
}

impl CountdownSink for ConsoleDisplay {
    fn set_text(&self, remaining: u32) {
        println!("{}", self.countdown_line(remaining));
    }

    fn show(&self) {
        tracing::debug!(slot = %self.slot, "Countdown shown");
    }

    fn hide(&self) {
        println!("{}", self.done_line());
    }
}

/// Inline message kinds for the results area
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultsMessage {
    /// Submission refused before any request was made
    Validation(String),
    /// Request failed; always the generic text
    Failure(String),
}

impl ResultsMessage {
    pub fn text(&self) -> &str {
        match self {
            ResultsMessage::Validation(text) | ResultsMessage::Failure(text) => text,
        }
    }
}

/// Results area
pub trait ResultsView: Send + Sync {
    /// Replace the content with the "processing" indicator
    fn show_processing(&self);
    fn show_message(&self, message: &ResultsMessage);
    fn show_report(&self, report: &ScoreReport);
}

/// Terminal results area
#[derive(Default)]
pub struct ConsoleResults;

impl ResultsView for ConsoleResults {
    fn show_processing(&self) {
        println!("Analyzing your images...");
    }

    fn show_message(&self, message: &ResultsMessage) {
        match message {
            ResultsMessage::Validation(text) => println!("{}", text),
            ResultsMessage::Failure(text) => eprintln!("{}", text),
        }
    }

    fn show_report(&self, report: &ScoreReport) {
        for line in report.lines() {
            println!("{}", line);
        }
    }
}
