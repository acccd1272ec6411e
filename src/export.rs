use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::chart;
use crate::error::ExportError;
use crate::models::{PatientRecord, SurveyRecord};

const PDF_MAGIC: &[u8] = b"%PDF";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PdfRequest<'a> {
    patient: &'a PatientRecord,
    survey: &'a SurveyRecord,
    chart_image: String,
}

/// Names come from state files and the backend, so anything that could
/// leave `out_dir` or is not valid in a file name is replaced.
pub fn pdf_file_name(patient: &PatientRecord) -> String {
    format!(
        "{}_{}_Survey.pdf",
        file_component(&patient.first_name),
        file_component(&patient.last_name)
    )
}

fn file_component(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Sends the chart snapshot and records to `{base}/download-pdf` and saves
/// the returned document into `out_dir`. One attempt, no retry.
pub async fn export_pdf(
    client: &reqwest::Client,
    base_url: &str,
    patient: &PatientRecord,
    survey: &SurveyRecord,
    chart_png: &[u8],
    out_dir: &Path,
) -> Result<PathBuf, ExportError> {
    let result = request_pdf(client, base_url, patient, survey, chart_png, out_dir).await;
    if let Err(err) = &result {
        error!(error = %err, patient = %patient.full_name(), "PDF export failed");
    }
    result
}

async fn request_pdf(
    client: &reqwest::Client,
    base_url: &str,
    patient: &PatientRecord,
    survey: &SurveyRecord,
    chart_png: &[u8],
    out_dir: &Path,
) -> Result<PathBuf, ExportError> {
    let url = format!("{}/download-pdf", base_url.trim_end_matches('/'));
    let body = PdfRequest {
        patient,
        survey,
        chart_image: chart::to_data_url(chart_png),
    };

    let response = client
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(|source| ExportError::Transport {
            url: url.clone(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ExportError::Service {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|source| ExportError::Transport { url, source })?;
    if !bytes.starts_with(PDF_MAGIC) {
        warn!(len = bytes.len(), "response does not start with a PDF header");
    }

    let path = out_dir.join(pdf_file_name(patient));
    if path.parent() != Some(out_dir) {
        return Err(ExportError::Write {
            path: path.display().to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "file name escapes the output directory",
            ),
        });
    }
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|source| ExportError::Write {
            path: path.display().to_string(),
            source,
        })?;
    info!(path = %path.display(), bytes = bytes.len(), "PDF saved");
    Ok(path)
}
