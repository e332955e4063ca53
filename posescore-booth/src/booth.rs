//! Interactive booth front end
//!
//! Reads one command per line and drives the capture controller and the
//! aggregator for a single session. Captures run as spawned tasks so a
//! second `capture` on a busy slot supersedes the first; analysis runs
//! inline.

use crate::aggregator::SessionAggregator;
use crate::capture::{CaptureController, CaptureSettings};
use crate::device::{DeviceAccess, PatternDevice, StillImageDevice};
use crate::display::{ConsoleResults, SinkRegistry};
use crate::error::ScoringError;
use crate::scoring::HttpScorer;
use crate::session::{CaptureSession, SharedSession};
use posescore_common::config::TomlConfig;
use posescore_common::events::{BoothEvent, EventBus};
use posescore_common::{Category, SlotKind};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

pub const HELP: &str = "\
Commands:
  gender <male|female>     select category
  capture <slot>           capture happy, serious or body
  skip <slot>              clear a slot
  load <slot> <path>       use an image file for a slot
  status                   show slot and category state
  analyze                  send images for scoring
  quit                     exit";

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Gender(Category),
    Capture(SlotKind),
    Skip(SlotKind),
    Load(SlotKind, PathBuf),
    Status,
    Analyze,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().unwrap_or_default().to_ascii_lowercase();
        let arg = parts.next();

        let slot = |arg: Option<&str>| -> Result<SlotKind, String> {
            arg.ok_or_else(|| format!("'{}' needs a slot (happy, serious, body)", verb))?
                .parse::<SlotKind>()
                .map_err(|e| e.to_string())
        };

        let command = match verb.as_str() {
            "gender" => Command::Gender(
                arg.ok_or("'gender' needs male or female")?
                    .parse::<Category>()
                    .map_err(|e| e.to_string())?,
            ),
            "capture" => Command::Capture(slot(arg)?),
            "skip" => Command::Skip(slot(arg)?),
            "load" => {
                let slot = slot(arg)?;
                let rest: Vec<&str> = parts.collect();
                if rest.is_empty() {
                    return Err("'load' needs a file path".to_string());
                }
                Command::Load(slot, PathBuf::from(rest.join(" ")))
            }
            "status" => Command::Status,
            "analyze" | "analyse" => Command::Analyze,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("Unknown command '{}'. Type 'help'.", other)),
        };
        Ok(command)
    }
}

/// Whether the command loop keeps going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// One booth: a session plus the components acting on it
pub struct Booth {
    controller: Arc<CaptureController>,
    aggregator: Arc<SessionAggregator>,
    session: SharedSession,
    events: EventBus,
    captures: Vec<JoinHandle<()>>,
}

impl Booth {
    pub fn new(
        controller: Arc<CaptureController>,
        aggregator: Arc<SessionAggregator>,
        events: EventBus,
    ) -> Self {
        Self {
            controller,
            aggregator,
            session: CaptureSession::new().shared(),
            events,
            captures: Vec::new(),
        }
    }

    /// Wire a console booth from configuration
    pub fn from_config(config: &TomlConfig) -> Result<Self, ScoringError> {
        let events = EventBus::new(100);

        let device: Arc<dyn DeviceAccess> = match &config.device.source_image {
            Some(path) => Arc::new(StillImageDevice::new(path)),
            None => Arc::new(PatternDevice::new(config.device.width, config.device.height)),
        };

        let controller = Arc::new(CaptureController::new(
            device,
            SinkRegistry::console(),
            events.clone(),
            CaptureSettings::from(config),
        ));
        let aggregator = Arc::new(SessionAggregator::new(
            Arc::new(HttpScorer::from_config(config)?),
            Arc::new(ConsoleResults),
            events.clone(),
            config.weighting,
        ));

        Ok(Self::new(controller, aggregator, events))
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub async fn execute(&mut self, command: Command) -> Flow {
        self.captures.retain(|task| !task.is_finished());

        match command {
            Command::Gender(category) => {
                self.session.write().await.set_category(category);
                println!("Selected gender: {}", category);
            }
            Command::Capture(slot) => {
                // Registered before spawning so a following skip or quit can cancel it
                let ticket = self.controller.begin(slot).await;
                let controller = self.controller.clone();
                let session = self.session.clone();
                self.captures.push(tokio::spawn(async move {
                    controller.complete(&session, ticket).await;
                }));
            }
            Command::Skip(slot) => self.controller.skip(&self.session, slot).await,
            Command::Load(slot, path) => {
                self.controller.load_file(&self.session, slot, &path).await;
            }
            Command::Status => {
                for line in self.status_lines().await {
                    println!("{}", line);
                }
            }
            Command::Analyze => {
                // Outcome is already rendered to the results view
                let _ = self.aggregator.submit(&self.session).await;
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// Slot and category summary
    pub async fn status_lines(&self) -> Vec<String> {
        let session = self.session.read().await;
        let mut lines = Vec::with_capacity(SlotKind::ALL.len() + 1);
        lines.push(format!(
            "gender: {}",
            session
                .category()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "not selected".to_string())
        ));
        for slot in SlotKind::ALL {
            let state = if self.controller.is_capturing(slot).await {
                "capturing"
            } else if session.artifact(slot).is_some() {
                "captured"
            } else {
                "empty"
            };
            lines.push(format!("{}: {}", slot, state));
        }
        lines
    }

    /// Read commands until `quit` or end of input, then shut down
    pub async fn run<R>(&mut self, input: R) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        println!("{}", HELP);
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(command) => {
                    if self.execute(command).await == Flow::Quit {
                        break;
                    }
                }
                Err(message) => println!("{}", message),
            }
        }
        self.shutdown().await;
        Ok(())
    }

    /// Cancel in-flight captures and wait for their streams to be released
    pub async fn shutdown(&mut self) {
        self.controller.cancel_all().await;
        for task in self.captures.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Capture task ended abnormally");
            }
        }
        tracing::info!("Booth shut down");
    }
}

/// User-facing notice for an event, if it warrants one
pub fn notice_text(event: &BoothEvent) -> Option<String> {
    match event {
        BoothEvent::CaptureCompleted { slot, .. } => Some(format!("{} image captured", slot)),
        BoothEvent::CaptureFailed { message, .. } => Some(message.clone()),
        BoothEvent::CaptureCancelled { slot, .. } => Some(format!("{} capture cancelled", slot)),
        BoothEvent::SlotSkipped { slot, .. } => Some(format!("Skipped {} image", slot)),
        BoothEvent::SlotLoaded { slot, .. } => Some(format!("{} image loaded", slot)),
        BoothEvent::CountdownTick { .. }
        | BoothEvent::AnalysisStarted { .. }
        | BoothEvent::AnalysisCompleted { .. }
        | BoothEvent::AnalysisFailed { .. } => None,
    }
}

/// Print notices for booth events until the bus closes
pub fn spawn_notifier(events: &EventBus) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(text) = notice_text(&event) {
                        println!(">> {}", text);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Notifier lagged behind event bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
