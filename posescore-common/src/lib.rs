//! # PoseScore Common Library
//!
//! Shared code for the PoseScore booth:
//! - Slot, category and artifact types
//! - Event types (BoothEvent) and the EventBus
//! - Configuration loading
//! - Common error type

pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use error::{Error, Result};
pub use types::{Artifact, Category, SlotKind};
