//! Test Helper Utilities
//!
//! Shared fakes for testing posescore-booth

#![allow(dead_code)]

pub mod fake_scorer;
pub mod fakes;

pub use fake_scorer::{spawn_fake_scorer, FakeReply, FakeScorerHandle};
pub use fakes::{
    drain_events, recording_registry, DisplayOp, FakeDevice, MockScorer, RecordingDisplay,
    RecordingResults, ResultsOp,
};
