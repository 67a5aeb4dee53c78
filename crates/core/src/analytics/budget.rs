use crate::domain::genre::GenreStats;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Suggested ceiling relative to the genre's historical average budget.
pub const SUGGESTED_CAP_FACTOR: f64 = 1.2;
/// Budgets beyond this multiple of the average carry an explicit warning.
pub const WARNING_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    AboveAverage,
    WithinRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAssessment {
    pub genre: String,
    pub budget: f64,
    pub avg_budget: f64,
    pub status: BudgetStatus,
    /// Only set when the budget is above the historical average.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_cap: Option<f64>,
    /// Percent above the historical average; only set when above it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_increase_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub success_rate: f64,
    pub avg_roi: f64,
}

pub fn validate_budget(budget: f64) -> Result<(), CoreError> {
    if !budget.is_finite() || budget <= 0.0 {
        return Err(CoreError::invalid(
            "budget",
            format!("budget must be a positive amount (got {budget})"),
        ));
    }
    Ok(())
}

fn known_avg_budget(stats: &GenreStats) -> Option<f64> {
    stats.avg_budget.filter(|b| *b > 0.0)
}

/// Compares a planned budget against the genre's historical average.
pub fn assess(stats: &GenreStats, budget: f64) -> Result<BudgetAssessment, CoreError> {
    validate_budget(budget)?;
    let avg_budget = known_avg_budget(stats).ok_or_else(|| {
        CoreError::invalid(
            "genre",
            format!("no average budget recorded for {:?}", stats.genre),
        )
    })?;

    let above = budget > avg_budget;
    Ok(BudgetAssessment {
        genre: stats.genre.clone(),
        budget,
        avg_budget,
        status: if above {
            BudgetStatus::AboveAverage
        } else {
            BudgetStatus::WithinRange
        },
        suggested_cap: above.then(|| avg_budget * SUGGESTED_CAP_FACTOR),
        risk_increase_pct: above.then(|| (budget - avg_budget) / avg_budget * 100.0),
        warning: warning(&stats.genre, avg_budget, budget),
        success_rate: stats.success_rate,
        avg_roi: stats.avg_roi,
    })
}

/// Warning text once `budget` exceeds the warning multiple of `avg_budget`.
pub fn warning(label: &str, avg_budget: f64, budget: f64) -> Option<String> {
    (budget > avg_budget * WARNING_FACTOR).then(|| {
        format!(
            "budget {budget:.0} exceeds {:.0}% of the historical average ({avg_budget:.0}) for {label}",
            WARNING_FACTOR * 100.0
        )
    })
}

/// Mean recorded average budget over the genres that have one.
pub fn blended_avg_budget<'a>(genres: impl IntoIterator<Item = &'a GenreStats>) -> Option<f64> {
    let budgets: Vec<f64> = genres.into_iter().filter_map(known_avg_budget).collect();
    if budgets.is_empty() {
        return None;
    }
    Some(budgets.iter().sum::<f64>() / budgets.len() as f64)
}
