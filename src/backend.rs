use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::BackendError;
use crate::models::{NavigationState, PatientRecord, SurveyRecord};

/// Read access to records stored by the survey backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    keyword: &'a str,
}

impl BackendClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn patient(&self, patient_id: &str) -> Result<PatientRecord, BackendError> {
        let url = format!("{}/patients/{patient_id}", self.base_url);
        let response = self.send(self.client.get(&url), &url).await?;
        match response {
            Some(response) => decode(response).await,
            None => Err(BackendError::PatientNotFound(patient_id.to_string())),
        }
    }

    /// `Ok(None)` when the patient has no stored survey.
    pub async fn survey_for(&self, patient_id: &str) -> Result<Option<SurveyRecord>, BackendError> {
        let url = format!("{}/surveys/by-patient-id/{patient_id}", self.base_url);
        match self.send(self.client.get(&url), &url).await? {
            Some(response) => decode(response).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn search(&self, keyword: &str) -> Result<Vec<PatientRecord>, BackendError> {
        let url = format!("{}/patients/search-results", self.base_url);
        let request = self.client.post(&url).json(&SearchRequest { keyword });
        match self.send(request, &url).await? {
            Some(response) => decode(response).await,
            None => Ok(Vec::new()),
        }
    }

    /// Builds what the result page would be opened with for this patient.
    /// A missing survey leaves the survey slot empty.
    pub async fn navigation_state(&self, patient_id: &str) -> Result<NavigationState, BackendError> {
        let patient = self.patient(patient_id).await?;
        let survey = self.survey_for(patient_id).await?;
        Ok(NavigationState {
            patient: Some(patient),
            survey,
        })
    }

    /// `Ok(None)` on 404, error on any other non-success status.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<Option<reqwest::Response>, BackendError> {
        debug!(%url, "backend request");
        let response = request
            .send()
            .await
            .map_err(|source| BackendError::Transport {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(BackendError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(Some(response))
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| BackendError::Decode(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
}
