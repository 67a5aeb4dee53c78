use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreStats {
    pub genre: String,
    pub avg_roi: f64,
    pub roi_volatility: f64,
    /// Percentage of titles labelled a hit, 0..=100.
    pub success_rate: f64,
    pub total_movies: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_budget: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    Safe,
    Moderate,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub genre: String,
    pub risk_score: f64,
    pub risk_category: RiskCategory,
}

/// How much weight a genre's figures deserve given its sample size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Moderate,
    Low,
}

impl Confidence {
    pub fn from_sample_size(total_movies: u32) -> Self {
        match total_movies {
            n if n >= 10 => Self::High,
            n if n >= 5 => Self::Moderate,
            _ => Self::Low,
        }
    }
}
