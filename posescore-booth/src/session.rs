//! Capture session state
//!
//! A [`CaptureSession`] owns the slot -> artifact mapping and the
//! category selection for one user. It is passed explicitly to the
//! capture controller and the aggregator, so several sessions can run in
//! one process without sharing anything.

use posescore_common::{Artifact, Category, SlotKind};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Shared handle used by concurrently running capture tasks
pub type SharedSession = Arc<RwLock<CaptureSession>>;

/// Slots plus category selection for one user
#[derive(Debug, Clone)]
pub struct CaptureSession {
    id: Uuid,
    slots: BTreeMap<SlotKind, Option<Artifact>>,
    category: Option<Category>,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSession {
    /// New session with every slot empty and no category selected
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            slots: SlotKind::ALL.iter().map(|s| (*s, None)).collect(),
            category: None,
        }
    }

    pub fn shared(self) -> SharedSession {
        Arc::new(RwLock::new(self))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn set_category(&mut self, category: Category) {
        self.category = Some(category);
    }

    pub fn artifact(&self, slot: SlotKind) -> Option<&Artifact> {
        self.slots.get(&slot).and_then(|a| a.as_ref())
    }

    /// Store an artifact, replacing whatever the slot held
    pub fn store(&mut self, slot: SlotKind, artifact: Artifact) {
        self.slots.insert(slot, Some(artifact));
    }

    /// Empty a slot
    pub fn clear(&mut self, slot: SlotKind) {
        self.slots.insert(slot, None);
    }

    /// True iff at least one slot holds an artifact
    pub fn can_submit(&self) -> bool {
        self.slots.values().any(|a| a.is_some())
    }

    /// Populated slots in display order
    pub fn populated(&self) -> Vec<SlotKind> {
        self.slots
            .iter()
            .filter(|(_, a)| a.is_some())
            .map(|(s, _)| *s)
            .collect()
    }
}
