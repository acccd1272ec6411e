use serde::Serialize;

use crate::models::ForecastResponse;

pub const PENDING_TREND: &str = "Calculating...";
pub const MISSING_SCORE: &str = "---";
pub const DEFAULT_DISORDER: &str = "Orofacial / Counselor Dystonia";
pub const DEFAULT_SPECIALIST: &str = "Neurologist / Speech Therapist";

pub const DEFAULT_SUGGESTIONS: [&str; 4] = [
    "Patient appears to be stable — continue monitoring, consider follow-up as needed.",
    "High orofacial involvement — recommend speech/swallowing assessment and ENT if swallowing issues.",
    "Significant limb involvement — physiotherapy referral recommended.",
    "High emotional distress — recommend mental health evaluation (counseling/psychiatry).",
];

/// Analysis summary shown under the forecast chart. Each field falls back
/// on its own when the payload is absent or lacks it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryPanel {
    pub trend: String,
    pub current_severity: String,
    pub probable_disorder: String,
    pub six_month_severity: String,
    pub recommended_specialist: String,
    pub suggestions: Vec<String>,
}

impl SummaryPanel {
    pub fn from_payload(payload: Option<&ForecastResponse>) -> Self {
        let suggestions = match payload {
            Some(payload) if !payload.suggestions.is_empty() => payload.suggestions.clone(),
            _ => DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
        };

        Self {
            trend: text_or(payload.and_then(|p| p.trend.as_deref()), PENDING_TREND),
            current_severity: score_or_dash(
                payload.and_then(|p| p.current_severity_score.or(p.severity_score)),
            ),
            probable_disorder: text_or(
                payload.and_then(|p| p.probable_disorder.as_deref()),
                DEFAULT_DISORDER,
            ),
            six_month_severity: score_or_dash(
                payload.and_then(|p| p.predicted_future_severity_score),
            ),
            recommended_specialist: text_or(
                payload.and_then(|p| p.recommended_specialist.as_deref()),
                DEFAULT_SPECIALIST,
            ),
            suggestions,
        }
    }
}

fn text_or(value: Option<&str>, fallback: &str) -> String {
    value.unwrap_or(fallback).to_string()
}

fn score_or_dash(value: Option<f64>) -> String {
    value
        .map(|score| score.to_string())
        .unwrap_or_else(|| MISSING_SCORE.to_string())
}
