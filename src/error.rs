use thiserror::Error;

/// The page was opened without the records it needs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MissingInput {
    #[error("patient record is missing")]
    Patient,
    #[error("survey record is missing")]
    Survey,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} must be between 0 and 5, got {value}")]
pub struct InvalidScore {
    pub field: &'static str,
    pub value: u8,
}

/// Failure of one prediction call. Any variant aborts the whole aggregation.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("prediction service unreachable at {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("API error {status}")]
    Service { status: u16, body: String },

    #[error("could not decode prediction response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("PDF service unreachable at {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("PDF service returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error("chart snapshot failed: {0}")]
    Chart(String),

    #[error("could not write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unreachable at {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("backend returned {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("patient {0} not found")]
    PatientNotFound(String),

    #[error("could not decode backend response: {0}")]
    Decode(String),
}
