use crate::error::CoreError;
use serde::{Deserialize, Serialize};

const SPECULATIVE_CAP: f64 = 60.0;
const SAFE_FLOOR: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppetiteLabel {
    Conservative,
    Balanced,
    Aggressive,
}

impl AppetiteLabel {
    pub fn from_appetite(risk_appetite: f64) -> Self {
        if risk_appetite < 30.0 {
            Self::Conservative
        } else if risk_appetite < 70.0 {
            Self::Balanced
        } else {
            Self::Aggressive
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub risk_appetite: f64,
    pub appetite_label: AppetiteLabel,
    pub safe_pct: u32,
    pub moderate_pct: u32,
    pub speculative_pct: u32,
    pub expected_roi: f64,
    pub success_probability: f64,
    pub volatility: f64,
}

/// Splits capital across safe/moderate/speculative buckets for an appetite in `0..=100`.
///
/// Buckets always sum to 100; rounding drift lands in the moderate bucket, which has neither
/// a floor nor a cap.
pub fn allocate(risk_appetite: f64) -> Result<AllocationPlan, CoreError> {
    if !risk_appetite.is_finite() || !(0.0..=100.0).contains(&risk_appetite) {
        return Err(CoreError::invalid(
            "risk_appetite",
            format!("risk appetite must be between 0 and 100 (got {risk_appetite})"),
        ));
    }

    let speculative_raw = (risk_appetite * 0.8).min(SPECULATIVE_CAP);
    let safe_raw = (100.0 - risk_appetite * 1.2).max(SAFE_FLOOR);
    let moderate_raw = 100.0 - speculative_raw - safe_raw;

    let speculative = speculative_raw.round() as i64;
    let safe = safe_raw.round() as i64;
    let mut moderate = moderate_raw.round() as i64;

    let drift = 100 - (speculative + safe + moderate);
    if drift != 0 {
        tracing::debug!(risk_appetite, drift, "allocation rounding drift folded into moderate bucket");
        moderate += drift;
    }

    let ratio = risk_appetite / 100.0;
    Ok(AllocationPlan {
        risk_appetite,
        appetite_label: AppetiteLabel::from_appetite(risk_appetite),
        safe_pct: safe as u32,
        moderate_pct: moderate as u32,
        speculative_pct: speculative as u32,
        expected_roi: 1.2 + ratio * 0.8,
        success_probability: 75.0 - ratio * 20.0,
        volatility: 0.4 + ratio * 1.2,
    })
}
