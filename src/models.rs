use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::InvalidScore;

pub const MAX_SUB_SCORE: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    pub facial_muscles: u8,
    pub lips_perioral: u8,
    pub jaw: u8,
    pub tongue: u8,
    pub upper_extremities: u8,
    pub lower_extremities: u8,
    pub neck_shoulders_hips: u8,
    pub severity_of_movements: u8,
    pub incapacitation_due_to_movements: u8,
    pub patient_awareness: u8,
    pub emotional_distress: u8,
    pub global_rating: u8,
}

impl SurveyRecord {
    /// The twelve sub-scores in trend-chart order.
    pub fn airs_scores(&self) -> [(&'static str, u8); 12] {
        [
            ("Facial", self.facial_muscles),
            ("Lips", self.lips_perioral),
            ("Jaw", self.jaw),
            ("Tongue", self.tongue),
            ("Upper Ext", self.upper_extremities),
            ("Lower Ext", self.lower_extremities),
            ("Neck/Hips", self.neck_shoulders_hips),
            ("Severity", self.severity_of_movements),
            ("Incapacitation", self.incapacitation_due_to_movements),
            ("Awareness", self.patient_awareness),
            ("Distress", self.emotional_distress),
            ("Global", self.global_rating),
        ]
    }

    /// Rows of the score table. Emotional distress is charted but not tabled.
    pub fn score_items(&self) -> [(&'static str, u8); 11] {
        [
            ("Facial Muscles", self.facial_muscles),
            ("Lips", self.lips_perioral),
            ("Jaw", self.jaw),
            ("Tongue Management", self.tongue),
            ("Physical Activity", self.upper_extremities),
            ("Walking", self.lower_extremities),
            ("Neck/Hips", self.neck_shoulders_hips),
            ("Mental Health", self.severity_of_movements),
            ("Performance", self.incapacitation_due_to_movements),
            ("Self Assessment", self.patient_awareness),
            ("Overall", self.global_rating),
        ]
    }

    pub fn validate(&self) -> Result<(), InvalidScore> {
        for (field, value) in self.airs_scores() {
            if value > MAX_SUB_SCORE {
                return Err(InvalidScore { field, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
    pub gender: String,
    pub survey_date: NaiveDate,
}

impl PatientRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// What the result page receives when it is opened.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigationState {
    #[serde(default)]
    pub patient: Option<PatientRecord>,
    #[serde(default)]
    pub survey: Option<SurveyRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u8")]
pub enum ForecastHorizon {
    Current,
    OneMonth,
    ThreeMonths,
    SixMonths,
}

impl ForecastHorizon {
    /// Request order and chart x-axis order.
    pub const ALL: [ForecastHorizon; 4] = [
        ForecastHorizon::Current,
        ForecastHorizon::OneMonth,
        ForecastHorizon::ThreeMonths,
        ForecastHorizon::SixMonths,
    ];

    pub fn months(self) -> u8 {
        match self {
            ForecastHorizon::Current => 0,
            ForecastHorizon::OneMonth => 1,
            ForecastHorizon::ThreeMonths => 3,
            ForecastHorizon::SixMonths => 6,
        }
    }

    pub fn label(self) -> String {
        match self {
            ForecastHorizon::Current => "Current".to_string(),
            other => format!("{} mo", other.months()),
        }
    }
}

impl From<ForecastHorizon> for u8 {
    fn from(horizon: ForecastHorizon) -> Self {
        horizon.months()
    }
}

impl fmt::Display for ForecastHorizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub horizon: ForecastHorizon,
    pub label: String,
    pub score: f64,
}

impl ForecastPoint {
    pub fn new(horizon: ForecastHorizon, raw_score: f64) -> Self {
        Self {
            horizon,
            label: horizon.label(),
            score: round2(raw_score),
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Payload returned by the prediction service for one horizon.
///
/// The service does not promise a fixed schema, so every field is optional.
/// The severity used for charting is read in this order:
/// `predictedFutureSeverityScore`, then `currentSeverityScore`, then
/// `severityScore`, then 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub months_ahead: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_severity_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_future_severity_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<String>,
    #[serde(
        default,
        rename = "probable_disorder",
        alias = "probableDisorder",
        skip_serializing_if = "Option::is_none"
    )]
    pub probable_disorder: Option<String>,
    #[serde(
        default,
        rename = "recommended_specialist",
        alias = "recommendedSpecialist",
        skip_serializing_if = "Option::is_none"
    )]
    pub recommended_specialist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub suggestions: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ForecastResponse {
    pub fn severity(&self) -> f64 {
        self.predicted_future_severity_score
            .or(self.current_severity_score)
            .or(self.severity_score)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    pub points: Vec<ForecastPoint>,
    /// Response for the last configured horizon.
    pub last_payload: ForecastResponse,
}
