use anyhow::Context;
use chrono::{DateTime, Utc};
use cineintel_core::analytics::allocation::{self, AllocationPlan};
use cineintel_core::analytics::benchmark::BenchmarkReport;
use cineintel_core::analytics::insight::StrategicInsight;
use cineintel_core::analytics::{AnalyticsService, RiskAnalysis};
use cineintel_core::error::CoreError;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub risk_appetite: f64,
    pub benchmark: Option<(String, String)>,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsReport {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub provider: &'static str,
    pub stats_loaded_at: DateTime<Utc>,
    pub risk: RiskAnalysis,
    pub insight: Option<StrategicInsight>,
    pub allocation: AllocationPlan,
    pub benchmark: Option<BenchmarkReport>,
}

/// Parses `GenreA,GenreB`.
pub fn parse_benchmark_pair(s: &str) -> anyhow::Result<(String, String)> {
    let (a, b) = s
        .split_once(',')
        .context("benchmark must be two genres separated by a comma")?;
    let (a, b) = (a.trim(), b.trim());
    anyhow::ensure!(
        !a.is_empty() && !b.is_empty(),
        "benchmark genres must be non-empty (got {s:?})"
    );
    Ok((a.to_string(), b.to_string()))
}

pub async fn build_report(
    service: &AnalyticsService,
    opts: &ReportOptions,
) -> Result<AnalyticsReport, CoreError> {
    // Reject a bad appetite before touching the provider.
    let allocation = allocation::allocate(opts.risk_appetite)?;

    let snapshot = service.snapshot().await?;
    let benchmark = match &opts.benchmark {
        Some((a, b)) => Some(snapshot.benchmark(a, b)?),
        None => None,
    };

    Ok(AnalyticsReport {
        report_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        provider: service.provider_name(),
        stats_loaded_at: snapshot.loaded_at(),
        risk: snapshot.risk_analysis(),
        insight: snapshot.strategic_insight(),
        allocation,
        benchmark,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cineintel_core::domain::genre::GenreStats;
    use cineintel_core::provider::dataset::StaticDataset;
    use std::sync::Arc;

    fn service() -> AnalyticsService {
        let genres = vec![
            GenreStats {
                genre: "Comedy".into(),
                avg_roi: 1.8,
                roi_volatility: 1.2,
                success_rate: 44.0,
                total_movies: 80,
                avg_budget: Some(12_000_000.0),
            },
            GenreStats {
                genre: "Thriller".into(),
                avg_roi: 1.1,
                roi_volatility: 2.4,
                success_rate: 31.0,
                total_movies: 9,
                avg_budget: None,
            },
        ];
        AnalyticsService::new(Arc::new(StaticDataset::new(genres, vec![])))
    }

    #[test]
    fn parses_benchmark_pair() {
        assert_eq!(
            parse_benchmark_pair(" Comedy , Thriller").unwrap(),
            ("Comedy".to_string(), "Thriller".to_string())
        );
        assert!(parse_benchmark_pair("Comedy").is_err());
        assert!(parse_benchmark_pair("Comedy,").is_err());
    }

    #[tokio::test]
    async fn report_includes_requested_benchmark() {
        let opts = ReportOptions {
            risk_appetite: 30.0,
            benchmark: Some(("Thriller".into(), "Comedy".into())),
        };
        let report = build_report(&service(), &opts).await.unwrap();
        assert_eq!(report.provider, "static_dataset");
        assert_eq!(report.risk.genres.len(), 2);
        assert_eq!(report.risk.genres[0].stats.genre, "Comedy");
        let insight = report.insight.unwrap();
        assert_eq!(insight.top_roi_genre, "Comedy");
        assert_eq!(insight.most_volatile_genre, "Thriller");
        let bench = report.benchmark.unwrap();
        assert_eq!(bench.verdict.efficiency_leader, "Comedy");
        assert_eq!(bench.verdict.stability_leader, "Comedy");
        assert_eq!(
            report.allocation.safe_pct + report.allocation.moderate_pct + report.allocation.speculative_pct,
            100
        );
    }

    #[tokio::test]
    async fn unknown_benchmark_genre_fails_the_report() {
        let opts = ReportOptions {
            risk_appetite: 30.0,
            benchmark: Some(("Comedy".into(), "Musical".into())),
        };
        let err = build_report(&service(), &opts).await.unwrap_err();
        assert!(err.is_invalid_input());
    }
}
