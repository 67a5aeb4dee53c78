use crate::analytics::risk;
use crate::domain::genre::{GenreStats, RiskProfile};
use serde::{Deserialize, Serialize};

/// A genre's raw statistics paired with its derived risk profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredGenre {
    pub stats: GenreStats,
    pub profile: RiskProfile,
}

impl ScoredGenre {
    pub fn new(stats: GenreStats) -> Self {
        let profile = risk::score(&stats);
        Self { stats, profile }
    }

    pub fn genre(&self) -> &str {
        &self.stats.genre
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkVerdict {
    pub efficiency_leader: String,
    pub stability_leader: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub genre_a: ScoredGenre,
    pub genre_b: ScoredGenre,
    pub verdict: BenchmarkVerdict,
    pub roi_diff: f64,
    pub success_diff: f64,
}

/// Ties go to `b`: `a` only leads on a strictly better figure.
pub fn compare(a: &ScoredGenre, b: &ScoredGenre) -> BenchmarkVerdict {
    let efficiency_leader = if a.stats.avg_roi > b.stats.avg_roi {
        a.genre()
    } else {
        b.genre()
    };
    let stability_leader = if a.profile.risk_score < b.profile.risk_score {
        a.genre()
    } else {
        b.genre()
    };

    BenchmarkVerdict {
        efficiency_leader: efficiency_leader.to_string(),
        stability_leader: stability_leader.to_string(),
    }
}

pub fn report(a: ScoredGenre, b: ScoredGenre) -> BenchmarkReport {
    let verdict = compare(&a, &b);
    let roi_diff = a.stats.avg_roi - b.stats.avg_roi;
    let success_diff = a.stats.success_rate - b.stats.success_rate;
    BenchmarkReport {
        genre_a: a,
        genre_b: b,
        verdict,
        roi_diff,
        success_diff,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genre(name: &str, avg_roi: f64, roi_volatility: f64, success_rate: f64) -> ScoredGenre {
        ScoredGenre::new(GenreStats {
            genre: name.to_string(),
            avg_roi,
            roi_volatility,
            success_rate,
            total_movies: 25,
            avg_budget: None,
        })
    }

    #[test]
    fn higher_roi_leads_efficiency() {
        let a = genre("Action", 2.0, 1.0, 40.0);
        let b = genre("Drama", 1.5, 1.0, 40.0);
        assert_eq!(compare(&a, &b).efficiency_leader, "Action");
        assert_eq!(compare(&b, &a).efficiency_leader, "Action");
    }

    #[test]
    fn lower_risk_leads_stability() {
        // Action: 1.0 / 3.0 = 0.33, Horror: 2.0 / 2.0 = 1.0
        let a = genre("Action", 2.0, 1.0, 40.0);
        let b = genre("Horror", 1.0, 2.0, 20.0);
        let v = compare(&a, &b);
        assert_eq!(v.stability_leader, "Action");
        assert_eq!(v.efficiency_leader, "Action");
    }

    #[test]
    fn ties_resolve_to_second_operand() {
        let a = genre("Comedy", 1.5, 0.9, 45.0);
        let b = genre("Romance", 1.5, 0.9, 30.0);
        let v = compare(&a, &b);
        assert_eq!(v.efficiency_leader, "Romance");
        assert_eq!(v.stability_leader, "Romance");

        let v = compare(&b, &a);
        assert_eq!(v.efficiency_leader, "Comedy");
        assert_eq!(v.stability_leader, "Comedy");
    }

    #[test]
    fn report_carries_differences() {
        let r = report(genre("Action", 2.0, 1.0, 40.0), genre("Drama", 1.5, 0.6, 55.0));
        assert!((r.roi_diff - 0.5).abs() < 1e-12);
        assert!((r.success_diff + 15.0).abs() < 1e-12);
        assert_eq!(r.verdict.efficiency_leader, "Action");
        // Drama: 0.6 / 2.5 = 0.24 beats Action: 1.0 / 3.0.
        assert_eq!(r.verdict.stability_leader, "Drama");
    }
}
