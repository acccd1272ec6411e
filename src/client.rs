use std::future::Future;

use serde::Serialize;
use tracing::debug;

use crate::error::ForecastError;
use crate::models::{ForecastHorizon, ForecastResponse, SurveyRecord};

/// The prediction service exposes the current snapshot and future
/// projections as separate operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Current,
    Future,
}

impl Endpoint {
    pub fn for_horizon(horizon: ForecastHorizon) -> Self {
        match horizon {
            ForecastHorizon::Current => Endpoint::Current,
            _ => Endpoint::Future,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Current => "predict",
            Endpoint::Future => "predict-future",
        }
    }

    pub fn url(self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.path())
    }
}

/// Survey fields merged with the horizon being asked about.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest<'a> {
    #[serde(flatten)]
    pub survey: &'a SurveyRecord,
    pub months_ahead: u8,
}

impl<'a> PredictionRequest<'a> {
    pub fn new(survey: &'a SurveyRecord, horizon: ForecastHorizon) -> Self {
        Self {
            survey,
            months_ahead: horizon.months(),
        }
    }
}

pub trait PredictionService: Send + Sync + 'static {
    fn predict(
        &self,
        base_url: &str,
        endpoint: Endpoint,
        request: &PredictionRequest<'_>,
    ) -> impl Future<Output = Result<ForecastResponse, ForecastError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpPredictionClient {
    client: reqwest::Client,
}

impl HttpPredictionClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl PredictionService for HttpPredictionClient {
    async fn predict(
        &self,
        base_url: &str,
        endpoint: Endpoint,
        request: &PredictionRequest<'_>,
    ) -> Result<ForecastResponse, ForecastError> {
        let url = endpoint.url(base_url);
        debug!(%url, months_ahead = request.months_ahead, "requesting prediction");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|source| ForecastError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ForecastError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| ForecastError::Transport { url, source })?;
        serde_json::from_slice(&bytes).map_err(|e| ForecastError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::models::fixtures::sample_survey;
    use crate::testing::{prediction_router, serve, RequestLog};

    #[test]
    fn horizon_zero_is_routed_to_current_endpoint() {
        assert_eq!(Endpoint::for_horizon(ForecastHorizon::Current), Endpoint::Current);
        for horizon in &ForecastHorizon::ALL[1..] {
            assert_eq!(Endpoint::for_horizon(*horizon), Endpoint::Future);
        }
        assert_eq!(Endpoint::Current.url("http://x/api/"), "http://x/api/predict");
        assert_eq!(Endpoint::Future.url("http://x/api"), "http://x/api/predict-future");
    }

    #[test]
    fn request_flattens_survey_with_horizon() {
        let survey = sample_survey();
        let request = PredictionRequest::new(&survey, ForecastHorizon::ThreeMonths);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["monthsAhead"], 3);
        assert_eq!(value["tongue"], 3);
        assert_eq!(value["globalRating"], 2);
        assert!(value.get("survey").is_none());
    }

    #[tokio::test]
    async fn decodes_successful_response() {
        let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
        let base = serve(prediction_router(log.clone(), None)).await;
        let client = HttpPredictionClient::new(reqwest::Client::new());
        let survey = sample_survey();

        let response = client
            .predict(
                &base,
                Endpoint::Future,
                &PredictionRequest::new(&survey, ForecastHorizon::OneMonth),
            )
            .await
            .unwrap();

        assert_eq!(response.predicted_future_severity_score, Some(1.2));
        assert_eq!(log.lock().unwrap().as_slice(), &[("predict-future".to_string(), 1)]);
    }

    #[tokio::test]
    async fn non_success_status_is_a_service_error() {
        let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
        let base = serve(prediction_router(log, Some(3))).await;
        let client = HttpPredictionClient::new(reqwest::Client::new());
        let survey = sample_survey();

        let err = client
            .predict(
                &base,
                Endpoint::Future,
                &PredictionRequest::new(&survey, ForecastHorizon::ThreeMonths),
            )
            .await
            .unwrap_err();

        match err {
            ForecastError::Service { status, .. } => assert_eq!(status, 500),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        let client = HttpPredictionClient::new(reqwest::Client::new());
        let survey = sample_survey();
        let err = client
            .predict(
                "http://127.0.0.1:9/api",
                Endpoint::Current,
                &PredictionRequest::new(&survey, ForecastHorizon::Current),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ForecastError::Transport { .. }));
    }
}
