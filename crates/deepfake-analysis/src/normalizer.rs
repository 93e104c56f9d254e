//! Terminal-state reconciliation and per-face verdicts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{AnalysisResult, DeepfakeError, DeepfakeResult, SessionStatus};

pub const NO_FACES_MESSAGE: &str = "No faces detected in the image.";

const REAL_THRESHOLD: f64 = 0.8;
const FAKE_THRESHOLD: f64 = 0.2;

/// What a finished poll loop observed.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub session_id: String,
    pub status: SessionStatus,
    pub message: Option<String>,
    pub embedded: Option<AnalysisResult>,
    /// True when `embedded` came with the terminal status response itself
    /// rather than with an earlier, still running one.
    pub embedded_is_final: bool,
    /// Status re-queries made after the initial check.
    pub attempts: u32,
}

/// How a terminal outcome resolves.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The result is complete as-is.
    Ready(AnalysisResult),
    /// The status reports success but the result must be fetched explicitly.
    FetchRequired,
}

/// Collapse a terminal poll outcome into a single result shape.
///
/// A result captured while the session was still running only counts once
/// the session finishes successfully, and then carries the terminal status.
pub fn normalize(outcome: PollOutcome) -> DeepfakeResult<Resolution> {
    let PollOutcome {
        session_id,
        status,
        message,
        embedded,
        embedded_is_final,
        ..
    } = outcome;

    match embedded {
        Some(result) if embedded_is_final => return Ok(Resolution::Ready(result)),
        Some(mut result) if status.is_success() => {
            result.status = status;
            return Ok(Resolution::Ready(result));
        }
        _ => {}
    }

    match status {
        SessionStatus::NoFacesFound => Ok(Resolution::Ready(AnalysisResult {
            session_id,
            sha256: None,
            status: SessionStatus::NoFacesFound,
            message: Some(NO_FACES_MESSAGE.to_string()),
            faces: Vec::new(),
            total_faces: Some(0),
        })),
        status if status.is_success() => Ok(Resolution::FetchRequired),
        status => Err(DeepfakeError::AnalysisIncomplete {
            session_id,
            status: status.to_string(),
            message,
        }),
    }
}

/// Human-facing classification of a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    LikelyReal,
    LikelyFake,
    Uncertain,
    NoScore,
}

impl Verdict {
    pub fn from_score(score: Option<f64>) -> Self {
        match score {
            None => Verdict::NoScore,
            Some(p) if p.is_nan() => Verdict::NoScore,
            Some(p) if p > REAL_THRESHOLD => Verdict::LikelyReal,
            Some(p) if p < FAKE_THRESHOLD => Verdict::LikelyFake,
            Some(_) => Verdict::Uncertain,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::LikelyReal => "Likely Real",
            Verdict::LikelyFake => "Likely Fake",
            Verdict::Uncertain => "Uncertain",
            Verdict::NoScore => "Uncertain (no score)",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Verdict label for a primary probability score.
pub fn verdict(score: Option<f64>) -> &'static str {
    Verdict::from_score(score).label()
}
