use std::fmt::Write;
use std::sync::{Arc, Mutex};

use tracing::error;

use crate::chart;
use crate::client::PredictionService;
use crate::error::MissingInput;
use crate::forecast::{ForecastAggregator, ForecastInput, ForecastState};
use crate::models::{ForecastResponse, NavigationState, PatientRecord, SurveyRecord};
use crate::status::ScoreStatus;
use crate::summary::SummaryPanel;

pub const MISSING_DATA: &str = "Missing data. Please restart the survey.";
pub const FORECAST_IDLE: &str = "Please complete the survey to see predictions.";
pub const FORECAST_LOADING: &str = "Loading predictions…";
const DISCLAIMER: &str = "This assessment provides insights into various health and wellness \
dimensions with AI-powered predictions. Please consult with a healthcare professional for \
personalized medical advice.";

/// The result page for one patient and one completed survey.
#[derive(Debug, Clone)]
pub struct ResultPage {
    pub patient: PatientRecord,
    pub survey: SurveyRecord,
}

impl ResultPage {
    pub fn from_state(state: NavigationState) -> Result<Self, MissingInput> {
        let patient = state.patient.ok_or(MissingInput::Patient)?;
        let survey = state.survey.ok_or(MissingInput::Survey)?;
        Ok(Self { patient, survey })
    }

    pub fn forecast_input(&self, api_base_url: &str) -> ForecastInput {
        ForecastInput {
            survey: self.survey.clone(),
            api_base_url: api_base_url.to_string(),
        }
    }

    /// Runs one aggregation for this page's survey and returns the settled
    /// state with the payload handed to the summary panel, if any.
    pub async fn run_forecast<S: PredictionService>(
        &self,
        service: S,
        api_base_url: &str,
    ) -> (ForecastState, Option<ForecastResponse>) {
        let latest: Arc<Mutex<Option<ForecastResponse>>> = Arc::new(Mutex::new(None));
        let sink = latest.clone();
        let mut aggregator = ForecastAggregator::with_callback(service, move |payload| {
            if let Ok(mut slot) = sink.lock() {
                *slot = Some(payload.clone());
            }
        });

        // The attempt publishes its state and runs the callback before it
        // finishes, so joining it is enough. A panicked attempt never leaves
        // `Loading` and is reported as a failure here.
        if let Some(attempt) = aggregator.update(Some(self.forecast_input(api_base_url))) {
            if let Err(err) = attempt.await {
                error!(error = %err, "forecast attempt aborted");
                return (
                    ForecastState::Failed(format!("forecast attempt aborted: {err}")),
                    None,
                );
            }
        }
        let payload = latest.lock().ok().and_then(|slot| slot.clone());
        (aggregator.state(), payload)
    }

    pub fn render(&self, forecast: &ForecastState, payload: Option<&ForecastResponse>) -> String {
        let mut output = String::new();
        let patient = &self.patient;

        let _ = writeln!(output, "# Survey Result");
        let _ = writeln!(output);
        let _ = writeln!(output, "## Patient Information");
        let _ = writeln!(output, "- Name: {}", patient.full_name());
        let _ = writeln!(output, "- Age: {}", patient.age);
        let _ = writeln!(output, "- Gender: {}", patient.gender);
        let _ = writeln!(output, "- Survey Date: {}", patient.survey_date);

        let _ = writeln!(output);
        let _ = writeln!(output, "## AIRS Score Trends");
        let _ = writeln!(output, "| Item | Score | Status |");
        let _ = writeln!(output, "| --- | --- | --- |");
        for (label, value) in self.survey.score_items() {
            let _ = writeln!(
                output,
                "| {} | {} | {} |",
                label,
                value,
                ScoreStatus::classify(value)
            );
        }

        let _ = writeln!(output);
        let _ = writeln!(output, "## Predicted Severity (Current → 6 months)");
        match forecast {
            ForecastState::Idle => {
                let _ = writeln!(output, "{FORECAST_IDLE}");
            }
            ForecastState::Loading => {
                let _ = writeln!(output, "{FORECAST_LOADING}");
            }
            ForecastState::Failed(message) => {
                let _ = writeln!(output, "Error: {message}");
            }
            ForecastState::Ready(points) => {
                let _ = writeln!(output, "```");
                let _ = write!(output, "{}", chart::forecast_bars(points));
                let _ = writeln!(output, "```");
            }
        }

        let summary = SummaryPanel::from_payload(payload);
        let _ = writeln!(output);
        let _ = writeln!(output, "## Analysis Summary");
        let _ = writeln!(output, "- Trend: {}", summary.trend);
        let _ = writeln!(output, "- Current Severity Score: {}", summary.current_severity);
        let _ = writeln!(output, "- Probable Disorder: {}", summary.probable_disorder);
        let _ = writeln!(output, "- 6-month Severity Score: {}", summary.six_month_severity);
        let _ = writeln!(output, "- Recommended Specialist: {}", summary.recommended_specialist);

        let _ = writeln!(output);
        let _ = writeln!(output, "## Suggestions");
        for suggestion in &summary.suggestions {
            let _ = writeln!(output, "- {suggestion}");
        }

        let _ = writeln!(output);
        let _ = writeln!(output, "> {DISCLAIMER}");
        output
    }
}
