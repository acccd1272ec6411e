use std::fmt::Write;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use crate::client::PredictionService;
use crate::forecast;
use crate::models::{AggregationResult, PatientRecord, SurveyRecord};
use crate::page::ResultPage;
use crate::summary::SummaryPanel;

#[derive(Debug)]
pub struct BatchEntry {
    pub patient: PatientRecord,
    pub outcome: Result<AggregationResult, String>,
}

impl BatchEntry {
    fn six_month_score(&self) -> Option<f64> {
        self.outcome
            .as_ref()
            .ok()
            .and_then(|result| result.points.last())
            .map(|point| point.score)
    }
}

pub fn read_csv(csv_path: &Path) -> anyhow::Result<Vec<ResultPage>> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        patient_id: Option<String>,
        first_name: String,
        last_name: String,
        age: u32,
        gender: String,
        survey_date: NaiveDate,
        facial_muscles: u8,
        lips_perioral: u8,
        jaw: u8,
        tongue: u8,
        upper_extremities: u8,
        lower_extremities: u8,
        neck_shoulders_hips: u8,
        severity_of_movements: u8,
        incapacitation_due_to_movements: u8,
        patient_awareness: u8,
        emotional_distress: u8,
        global_rating: u8,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut pages = Vec::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("invalid row on line {line}"))?;
        let survey = SurveyRecord {
            id: None,
            patient_id: row.patient_id.clone(),
            facial_muscles: row.facial_muscles,
            lips_perioral: row.lips_perioral,
            jaw: row.jaw,
            tongue: row.tongue,
            upper_extremities: row.upper_extremities,
            lower_extremities: row.lower_extremities,
            neck_shoulders_hips: row.neck_shoulders_hips,
            severity_of_movements: row.severity_of_movements,
            incapacitation_due_to_movements: row.incapacitation_due_to_movements,
            patient_awareness: row.patient_awareness,
            emotional_distress: row.emotional_distress,
            global_rating: row.global_rating,
        };
        survey
            .validate()
            .with_context(|| format!("invalid survey on line {line}"))?;

        pages.push(ResultPage {
            patient: PatientRecord {
                id: row.patient_id,
                first_name: row.first_name,
                last_name: row.last_name,
                age: row.age,
                gender: row.gender,
                survey_date: row.survey_date,
            },
            survey,
        });
    }

    Ok(pages)
}

/// Aggregates each page in file order. A failed row is recorded and the
/// batch moves on.
pub async fn run_batch<S: PredictionService>(
    service: &S,
    base_url: &str,
    pages: &[ResultPage],
) -> Vec<BatchEntry> {
    let mut entries = Vec::with_capacity(pages.len());
    for page in pages {
        let outcome = forecast::aggregate(service, base_url, &page.survey)
            .await
            .map_err(|err| err.to_string());
        match &outcome {
            Ok(_) => info!(patient = %page.patient.full_name(), "forecast complete"),
            Err(err) => warn!(patient = %page.patient.full_name(), error = %err, "forecast failed"),
        }
        entries.push(BatchEntry {
            patient: page.patient.clone(),
            outcome,
        });
    }
    entries
}

pub fn build_report(entries: &[BatchEntry], generated_at: DateTime<Utc>) -> String {
    let mut output = String::new();
    let succeeded = entries.iter().filter(|e| e.outcome.is_ok()).count();

    let _ = writeln!(output, "# AIMS Forecast Report");
    let _ = writeln!(
        output,
        "Generated {} for {} surveys ({} forecast, {} failed)",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        entries.len(),
        succeeded,
        entries.len() - succeeded
    );

    let mut ranked: Vec<&BatchEntry> = entries
        .iter()
        .filter(|entry| entry.six_month_score().is_some())
        .collect();
    ranked.sort_by(|a, b| {
        b.six_month_score()
            .partial_cmp(&a.six_month_score())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest 6-month Severity");
    if ranked.is_empty() {
        let _ = writeln!(output, "No forecasts completed.");
    } else {
        for entry in ranked.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} ({}): {:.2}",
                entry.patient.full_name(),
                entry.patient.survey_date,
                entry.six_month_score().unwrap_or_default()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Patients");
    if entries.is_empty() {
        let _ = writeln!(output, "No surveys in this batch.");
    }
    for entry in entries {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "### {} (age {}, {})",
            entry.patient.full_name(),
            entry.patient.age,
            entry.patient.gender
        );
        match &entry.outcome {
            Ok(result) => {
                let trajectory: Vec<String> = result
                    .points
                    .iter()
                    .map(|point| format!("{} {}", point.label, point.score))
                    .collect();
                let _ = writeln!(output, "- Forecast: {}", trajectory.join(" → "));
                let summary = SummaryPanel::from_payload(Some(&result.last_payload));
                let _ = writeln!(output, "- Trend: {}", summary.trend);
                let _ = writeln!(output, "- Probable Disorder: {}", summary.probable_disorder);
                let _ = writeln!(
                    output,
                    "- Recommended Specialist: {}",
                    summary.recommended_specialist
                );
            }
            Err(err) => {
                let _ = writeln!(output, "- Forecast unavailable: {err}");
            }
        }
    }

    output
}
