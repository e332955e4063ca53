//! posescore-booth library interface
//!
//! Capture orchestration and scoring for the PoseScore booth:
//! - [`capture`]: per-slot acquire -> warm-up -> countdown -> snapshot -> release
//! - [`countdown`]: cancellable one-second countdown and per-slot scheduler
//! - [`session`]: slot -> artifact state for one user
//! - [`aggregator`]: validation, submission and composite scoring
//! - [`scoring`]: HTTP client for the remote scoring service
//! - [`device`], [`display`]: capability traits for camera and presentation

pub mod aggregator;
pub mod booth;
pub mod capture;
pub mod composite;
pub mod countdown;
pub mod device;
pub mod display;
pub mod error;
pub mod scoring;
pub mod session;

pub use crate::aggregator::{ScoreReport, SessionAggregator};
pub use crate::capture::{CaptureController, CaptureOutcome, CaptureSettings, CaptureTicket};
pub use crate::error::{CaptureError, ScoringError, SubmitError};
pub use crate::session::{CaptureSession, SharedSession};
