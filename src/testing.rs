//! Local stand-ins for the remote services, used by HTTP-level tests.

use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

/// (endpoint path, monthsAhead) for every prediction call received.
pub(crate) type RequestLog = Arc<Mutex<Vec<(String, u8)>>>;

pub(crate) async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api")
}

pub(crate) fn canned_prediction(months_ahead: u8) -> Value {
    match months_ahead {
        0 => json!({
            "assessment": "Mild",
            "currentSeverityScore": 1.0,
            "probableDisorder": "Unspecified Motor Dysfunction",
            "recommendedSpecialist": "General Practitioner"
        }),
        months => {
            let predicted = match months {
                1 => 1.2,
                3 => 2.456,
                _ => 3.001,
            };
            json!({
                "monthsAhead": months,
                "currentSeverityScore": 1.0,
                "predictedFutureSeverityScore": predicted,
                "trend": "Worsening",
                "probableDisorder": format!("disorder at {months} mo"),
                "recommendedSpecialist": "Neurologist / Physiotherapist",
                "confidence": 0.85,
                "suggestions": ["Arrange specialist review within 1 month."]
            })
        }
    }
}

/// Prediction endpoints answering with [`canned_prediction`]. When `fail_on`
/// names a horizon, that call gets a 500.
pub(crate) fn prediction_router(log: RequestLog, fail_on: Option<u8>) -> Router {
    let respond = move |path: &'static str, log: RequestLog, body: Value| {
        let months = body["monthsAhead"].as_u64().unwrap_or(u64::MAX) as u8;
        log.lock().unwrap().push((path.to_string(), months));
        if fail_on == Some(months) {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Prediction service failed"})),
            );
        }
        (StatusCode::OK, Json(canned_prediction(months)))
    };

    let current_log = log.clone();
    let future_log = log;
    Router::new()
        .route(
            "/api/predict",
            post(move |Json(body): Json<Value>| async move {
                respond("predict", current_log, body)
            }),
        )
        .route(
            "/api/predict-future",
            post(move |Json(body): Json<Value>| async move {
                respond("predict-future", future_log, body)
            }),
        )
}
