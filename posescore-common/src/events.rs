//! Event types for the booth notification system
//!
//! Provides [`BoothEvent`] and the broadcast-backed [`EventBus`]. Transient
//! confirmations ("happy image captured") and blocking notices ("webcam
//! access denied") are published here; whatever front end is attached
//! subscribes and presents them.

use crate::types::{Category, SlotKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Booth event types
///
/// Serialized with a `type` tag so a front end can switch on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BoothEvent {
    /// Countdown display changed
    CountdownTick {
        slot: SlotKind,
        remaining: u32,
        timestamp: DateTime<Utc>,
    },

    /// A capture stored a new artifact
    CaptureCompleted {
        session_id: Uuid,
        slot: SlotKind,
        width: u32,
        height: u32,
        timestamp: DateTime<Utc>,
    },

    /// A capture or file load failed; the slot is unchanged
    ///
    /// `message` is user-facing text.
    CaptureFailed {
        session_id: Uuid,
        slot: SlotKind,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A capture was interrupted before its frame was taken
    CaptureCancelled {
        session_id: Uuid,
        slot: SlotKind,
        timestamp: DateTime<Utc>,
    },

    /// The user skipped a slot
    SlotSkipped {
        session_id: Uuid,
        slot: SlotKind,
        timestamp: DateTime<Utc>,
    },

    /// An image file was loaded into a slot
    SlotLoaded {
        session_id: Uuid,
        slot: SlotKind,
        timestamp: DateTime<Utc>,
    },

    /// Analysis request sent
    AnalysisStarted {
        session_id: Uuid,
        category: Category,
        slots: Vec<SlotKind>,
        timestamp: DateTime<Utc>,
    },

    /// Analysis response rendered
    AnalysisCompleted {
        session_id: Uuid,
        composite: Option<f64>,
        timestamp: DateTime<Utc>,
    },

    /// Analysis did not produce a report (validation or transport failure)
    AnalysisFailed {
        session_id: Uuid,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl BoothEvent {
    /// Slot the event concerns, if any
    pub fn slot(&self) -> Option<SlotKind> {
        match self {
            BoothEvent::CountdownTick { slot, .. }
            | BoothEvent::CaptureCompleted { slot, .. }
            | BoothEvent::CaptureFailed { slot, .. }
            | BoothEvent::CaptureCancelled { slot, .. }
            | BoothEvent::SlotSkipped { slot, .. }
            | BoothEvent::SlotLoaded { slot, .. } => Some(*slot),
            BoothEvent::AnalysisStarted { .. }
            | BoothEvent::AnalysisCompleted { .. }
            | BoothEvent::AnalysisFailed { .. } => None,
        }
    }
}

/// Central event distribution bus
///
/// Cloning shares the same channel. The capture controller and the
/// aggregator publish here; front ends subscribe.
///
/// # Examples
///
/// ```
/// use posescore_common::events::{BoothEvent, EventBus};
/// use posescore_common::SlotKind;
///
/// let bus = EventBus::new(100);
/// let mut rx = bus.subscribe();
///
/// bus.emit_lossy(BoothEvent::CountdownTick {
///     slot: SlotKind::Happy,
///     remaining: 3,
///     timestamp: chrono::Utc::now(),
/// });
///
/// let event = rx.try_recv().unwrap();
/// assert_eq!(event.slot(), Some(SlotKind::Happy));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BoothEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events buffered before slow subscribers
    ///   start lagging. The booth uses 100.
    ///
    /// # Examples
    ///
    /// ```
    /// use posescore_common::events::EventBus;
    ///
    /// let bus = EventBus::new(100);
    /// assert_eq!(bus.capacity(), 100);
    /// assert_eq!(bus.subscriber_count(), 0);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<BoothEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// # Returns
    ///
    /// Number of subscribers that received the event, or `Err` if no
    /// subscribers are listening. Use [`emit_lossy`](Self::emit_lossy)
    /// when nobody listening is fine.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: BoothEvent,
    ) -> Result<usize, broadcast::error::SendError<BoothEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: BoothEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
