use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::client::{Endpoint, PredictionRequest, PredictionService};
use crate::error::ForecastError;
use crate::models::{
    AggregationResult, ForecastHorizon, ForecastPoint, ForecastResponse, SurveyRecord,
};

/// One request per horizon, strictly in order. The first failure ends the
/// pass and nothing after it is requested.
pub async fn aggregate<S: PredictionService>(
    service: &S,
    base_url: &str,
    survey: &SurveyRecord,
) -> Result<AggregationResult, ForecastError> {
    let mut points = Vec::with_capacity(ForecastHorizon::ALL.len());
    let mut last_payload = None;

    for horizon in ForecastHorizon::ALL {
        let request = PredictionRequest::new(survey, horizon);
        let response = service
            .predict(base_url, Endpoint::for_horizon(horizon), &request)
            .await?;
        points.push(ForecastPoint::new(horizon, response.severity()));
        last_payload = Some(response);
    }

    let last_payload = last_payload.ok_or_else(|| {
        ForecastError::Decode("no forecast horizons configured".to_string())
    })?;
    Ok(AggregationResult {
        points,
        last_payload,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForecastState {
    Idle,
    Loading,
    Ready(Vec<ForecastPoint>),
    Failed(String),
}

impl ForecastState {
    pub fn is_settled(&self) -> bool {
        matches!(self, ForecastState::Ready(_) | ForecastState::Failed(_))
    }
}

/// What an aggregation attempt is keyed on.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastInput {
    pub survey: SurveyRecord,
    pub api_base_url: String,
}

type UpdateCallback = Box<dyn Fn(&ForecastResponse) + Send + Sync>;

struct Shared<S> {
    service: S,
    generation: AtomicU64,
    state: watch::Sender<ForecastState>,
    on_update: Option<UpdateCallback>,
}

/// Drives aggregation attempts for a changing input and publishes the state
/// of the newest one.
///
/// Each input change starts a new attempt tagged with a fresh generation.
/// Older attempts keep running to completion but their results are dropped
/// once a newer generation exists.
pub struct ForecastAggregator<S> {
    shared: Arc<Shared<S>>,
    input: Option<ForecastInput>,
}

impl<S: PredictionService> ForecastAggregator<S> {
    pub fn new(service: S) -> Self {
        Self::build(service, None)
    }

    /// `on_update` receives the last horizon's payload once per successful
    /// attempt that is still current when it finishes.
    pub fn with_callback<F>(service: S, on_update: F) -> Self
    where
        F: Fn(&ForecastResponse) + Send + Sync + 'static,
    {
        Self::build(service, Some(Box::new(on_update)))
    }

    fn build(service: S, on_update: Option<UpdateCallback>) -> Self {
        let (state, _) = watch::channel(ForecastState::Idle);
        Self {
            shared: Arc::new(Shared {
                service,
                generation: AtomicU64::new(0),
                state,
                on_update,
            }),
            input: None,
        }
    }

    pub fn state(&self) -> ForecastState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ForecastState> {
        self.shared.state.subscribe()
    }

    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    /// Waits until the current attempt has reached `Ready` or `Failed`.
    /// Returns immediately with `Idle` when there is nothing to wait for.
    pub async fn settled(&self) -> ForecastState {
        let mut rx = self.subscribe();
        let settled = rx
            .wait_for(|state| state.is_settled() || *state == ForecastState::Idle)
            .await
            .map(|state| state.clone());
        settled.unwrap_or_else(|_| self.state())
    }

    /// Feeds a new input. Unchanged input is a no-op; `None` returns to
    /// `Idle` without touching the network.
    pub fn update(&mut self, input: Option<ForecastInput>) -> Option<JoinHandle<()>> {
        if input == self.input {
            return None;
        }
        self.input = input.clone();

        let shared = self.shared.clone();
        let mut generation = 0;
        shared.state.send_modify(|state| {
            generation = shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = if input.is_some() {
                ForecastState::Loading
            } else {
                ForecastState::Idle
            };
        });

        let input = input?;
        let attempt = Uuid::new_v4();
        let span = info_span!("forecast_attempt", generation, %attempt);
        Some(tokio::spawn(
            async move {
                info!(base_url = %input.api_base_url, "aggregation started");
                let outcome = aggregate(&shared.service, &input.api_base_url, &input.survey).await;
                shared.finish(generation, outcome);
            }
            .instrument(span),
        ))
    }
}

impl<S> Shared<S> {
    fn finish(&self, generation: u64, outcome: Result<AggregationResult, ForecastError>) {
        let (next, payload) = match outcome {
            Ok(result) => (ForecastState::Ready(result.points), Some(result.last_payload)),
            Err(err) => {
                warn!(error = %err, "aggregation failed");
                (ForecastState::Failed(err.to_string()), None)
            }
        };

        let applied = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *state = next;
            true
        });

        if !applied {
            info!("superseded by a newer input, result discarded");
            return;
        }
        info!("aggregation settled");
        if let (Some(callback), Some(payload)) = (&self.on_update, payload) {
            callback(&payload);
        }
    }
}
