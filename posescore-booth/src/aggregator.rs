//! Session aggregator
//!
//! Validates a session, submits its populated slots plus the category to
//! the scorer in one request, attaches the client-side composite
//! (`final_score`) and renders the result.
//!
//! Every call resolves the results view to a final state: a validation
//! prompt, the generic failure message, or a report. Raw transport and
//! parse errors go to the log only.

use crate::composite::{composite, Weighting};
use crate::display::{ResultsMessage, ResultsView};
use crate::error::SubmitError;
use crate::scoring::{AnalyzeRequest, ScoreResponse, Scorer};
use crate::session::SharedSession;
use chrono::Utc;
use posescore_common::events::{BoothEvent, EventBus};
use posescore_common::{Category, SlotKind};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const MSG_NO_IMAGES: &str = "Please provide at least one image to analyze!";
pub const MSG_NO_CATEGORY: &str = "Please select a gender before analyzing.";
pub const MSG_ANALYSIS_FAILED: &str = "Failed to analyze images. Please try again.";

/// Rendered analysis result
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreReport {
    pub category: Category,
    /// Service response with `final_score` filled in client-side
    pub scores: ScoreResponse,
}

impl ScoreReport {
    pub fn composite(&self) -> Option<f64> {
        self.scores.final_score
    }

    /// Results block, one entry per line; absent scores produce no line
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Gender: {}", self.category)];
        if let Some(score) = self.scores.final_score {
            lines.push(format!("Overall Score: {:.1}%", score));
        }
        if let Some(score) = self.scores.emotion_score {
            lines.push(format!("Emotion Score: {}%", format_score(score)));
        }
        if let Some(score) = self.scores.symmetry_score {
            lines.push(format!("Symmetry Score: {}%", format_score(score)));
        }
        if let Some(score) = self.scores.body_score {
            lines.push(format!("Body Score: {}%", format_score(score)));
        }
        if let Some(message) = self.scores.server_error() {
            lines.push(message.to_string());
        }
        lines
    }
}

fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{:.0}", score)
    } else {
        format!("{:.1}", score)
    }
}

/// Submits sessions to the scorer and renders the outcome
pub struct SessionAggregator {
    scorer: Arc<dyn Scorer>,
    results: Arc<dyn ResultsView>,
    events: EventBus,
    weighting: Weighting,
}

impl SessionAggregator {
    pub fn new(
        scorer: Arc<dyn Scorer>,
        results: Arc<dyn ResultsView>,
        events: EventBus,
        weighting: Weighting,
    ) -> Self {
        Self {
            scorer,
            results,
            events,
            weighting,
        }
    }

    /// True iff at least one slot is populated
    pub async fn can_submit(&self, session: &SharedSession) -> bool {
        session.read().await.can_submit()
    }

    /// Validate, submit and render
    ///
    /// Validation runs first: an empty session or a missing category shows
    /// a prompt and returns without contacting the scorer. Otherwise the
    /// results view shows "processing", exactly one request is made, and
    /// the view ends on either the report or the generic failure message.
    ///
    /// # Arguments
    ///
    /// * `session` - Session whose populated slots and category are sent
    ///
    /// # Errors
    ///
    /// * [`SubmitError::Validation`] - nothing to submit or no category
    /// * [`SubmitError::Scoring`] - transport, status or parse failure;
    ///   the user only ever sees [`MSG_ANALYSIS_FAILED`]
    ///
    /// # Examples
    ///
    /// ```ignore
    /// session.write().await.set_category(Category::Female);
    /// let report = aggregator.submit(&session).await?;
    /// for line in report.lines() {
    ///     println!("{}", line);
    /// }
    /// ```
    pub async fn submit(&self, session: &SharedSession) -> Result<ScoreReport, SubmitError> {
        let (session_id, request) = {
            let session = session.read().await;
            (session.id(), build_request(&session))
        };

        let request = match request {
            Ok(request) => request,
            Err(message) => {
                info!(session_id = %session_id, reason = message, "Analysis refused");
                self.results
                    .show_message(&ResultsMessage::Validation(message.to_string()));
                self.events.emit_lossy(BoothEvent::AnalysisFailed {
                    session_id,
                    message: message.to_string(),
                    timestamp: Utc::now(),
                });
                return Err(SubmitError::Validation(message.to_string()));
            }
        };

        self.results.show_processing();
        let slots: Vec<SlotKind> = SlotKind::ALL
            .into_iter()
            .filter(|s| request.slot(*s).is_some())
            .collect();
        info!(
            session_id = %session_id,
            category = %request.gender,
            slots = ?slots,
            "Submitting images for analysis"
        );
        self.events.emit_lossy(BoothEvent::AnalysisStarted {
            session_id,
            category: request.gender,
            slots,
            timestamp: Utc::now(),
        });

        let mut scores = match self.scorer.analyze(&request).await {
            Ok(scores) => scores,
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Error analyzing images");
                self.results
                    .show_message(&ResultsMessage::Failure(MSG_ANALYSIS_FAILED.to_string()));
                self.events.emit_lossy(BoothEvent::AnalysisFailed {
                    session_id,
                    message: MSG_ANALYSIS_FAILED.to_string(),
                    timestamp: Utc::now(),
                });
                return Err(SubmitError::Scoring(e));
            }
        };

        scores.final_score = composite(&scores, self.weighting);
        if let Some(message) = scores.server_error() {
            warn!(session_id = %session_id, server_error = message, "Scoring service reported an error");
        }

        let report = ScoreReport {
            category: request.gender,
            scores,
        };
        self.results.show_report(&report);
        self.events.emit_lossy(BoothEvent::AnalysisCompleted {
            session_id,
            composite: report.composite(),
            timestamp: Utc::now(),
        });

        Ok(report)
    }
}

/// Build the request, or the validation prompt explaining why not
fn build_request(session: &crate::session::CaptureSession) -> Result<AnalyzeRequest, &'static str> {
    if !session.can_submit() {
        return Err(MSG_NO_IMAGES);
    }
    let gender = session.category().ok_or(MSG_NO_CATEGORY)?;

    Ok(AnalyzeRequest {
        happy: session.artifact(SlotKind::Happy).cloned(),
        serious: session.artifact(SlotKind::Serious).cloned(),
        body: session.artifact(SlotKind::Body).cloned(),
        gender,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(scores: ScoreResponse) -> ScoreReport {
        ScoreReport {
            category: Category::Male,
            scores,
        }
    }

    #[test]
    fn test_lines_all_scores() {
        let lines = report(ScoreResponse {
            emotion_score: Some(80.0),
            symmetry_score: Some(90.0),
            body_score: Some(70.0),
            error_msg: None,
            final_score: Some(80.0),
        })
        .lines();

        assert_eq!(
            lines,
            vec![
                "Gender: male",
                "Overall Score: 80.0%",
                "Emotion Score: 80%",
                "Symmetry Score: 90%",
                "Body Score: 70%",
            ]
        );
    }

    #[test]
    fn test_lines_omit_missing_scores() {
        let lines = report(ScoreResponse {
            symmetry_score: Some(88.0),
            final_score: Some(88.0),
            ..Default::default()
        })
        .lines();

        assert!(lines.iter().any(|l| l == "Symmetry Score: 88%"));
        assert!(!lines.iter().any(|l| l.starts_with("Emotion")));
        assert!(!lines.iter().any(|l| l.starts_with("Body")));
    }

    #[test]
    fn test_lines_include_server_error() {
        let lines = report(ScoreResponse {
            error_msg: Some("No face detected in serious image".to_string()),
            ..Default::default()
        })
        .lines();
        assert_eq!(lines, vec!["Gender: male", "No face detected in serious image"]);
    }

    #[test]
    fn test_fractional_scores_keep_one_decimal() {
        assert_eq!(format_score(72.5), "72.5");
        assert_eq!(format_score(72.0), "72");
    }
}
