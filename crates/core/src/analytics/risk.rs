use crate::domain::genre::{GenreStats, RiskCategory, RiskProfile};

pub const HIGH_RISK_THRESHOLD: f64 = 1.5;
pub const MODERATE_RISK_THRESHOLD: f64 = 0.8;

// Floor for `avg_roi + 1` when upstream breaks the non-negative ROI guarantee.
const MIN_DENOMINATOR: f64 = 1e-9;

/// Volatility-to-return ratio: `roi_volatility / (avg_roi + 1)`.
pub fn risk_score(avg_roi: f64, roi_volatility: f64) -> f64 {
    let denominator = avg_roi + 1.0;
    let denominator = if denominator > MIN_DENOMINATOR {
        denominator
    } else {
        MIN_DENOMINATOR
    };
    roi_volatility / denominator
}

impl RiskCategory {
    pub fn from_score(risk_score: f64) -> Self {
        if risk_score > HIGH_RISK_THRESHOLD {
            Self::High
        } else if risk_score > MODERATE_RISK_THRESHOLD {
            Self::Moderate
        } else {
            Self::Safe
        }
    }
}

pub fn score(stats: &GenreStats) -> RiskProfile {
    let risk_score = risk_score(stats.avg_roi, stats.roi_volatility);
    RiskProfile {
        genre: stats.genre.clone(),
        risk_score,
        risk_category: RiskCategory::from_score(risk_score),
    }
}
