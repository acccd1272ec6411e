use std::fmt;

use serde::Serialize;

/// Qualitative band for a single 0-5 sub-score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScoreStatus {
    Excellent,
    Fair,
    Poor,
}

impl ScoreStatus {
    /// 3 is a band of its own; everything above it is Poor.
    pub fn classify(score: u8) -> Self {
        match score {
            0..=2 => ScoreStatus::Excellent,
            3 => ScoreStatus::Fair,
            _ => ScoreStatus::Poor,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreStatus::Excellent => "Excellent",
            ScoreStatus::Fair => "Fair",
            ScoreStatus::Poor => "Poor",
        }
    }
}

impl fmt::Display for ScoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
