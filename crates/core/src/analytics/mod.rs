pub mod allocation;
pub mod benchmark;
pub mod budget;
pub mod insight;
pub mod risk;

use crate::domain::genre::{Confidence, GenreStats, RiskProfile};
use crate::error::CoreError;
use crate::provider::GenreStatsProvider;
use benchmark::{BenchmarkReport, ScoredGenre};
use budget::BudgetAssessment;
use chrono::{DateTime, Utc};
use insight::StrategicInsight;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreReport {
    pub stats: GenreStats,
    pub profile: RiskProfile,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAnalysis {
    /// Safest first.
    pub genres: Vec<GenreReport>,
    /// Mean risk score across all genres; absent for an empty snapshot.
    pub industry_risk_index: Option<f64>,
}

/// Immutable per-cycle view of the provider's genre statistics, keyed by genre name.
#[derive(Debug, Clone)]
pub struct GenreStatsSnapshot {
    genres: BTreeMap<String, ScoredGenre>,
    loaded_at: DateTime<Utc>,
}

impl GenreStatsSnapshot {
    pub fn from_stats(stats: Vec<GenreStats>) -> anyhow::Result<Self> {
        let mut genres = BTreeMap::new();
        for s in stats {
            let name = s.genre.clone();
            anyhow::ensure!(
                genres.insert(name.clone(), ScoredGenre::new(s)).is_none(),
                "duplicate genre in provider stats: {name}"
            );
        }
        Ok(Self {
            genres,
            loaded_at: Utc::now(),
        })
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn len(&self) -> usize {
        self.genres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
    }

    pub fn genre_names(&self) -> Vec<String> {
        self.genres.keys().cloned().collect()
    }

    fn scored(&self, field: &'static str, genre: &str) -> Result<&ScoredGenre, CoreError> {
        self.genres
            .get(genre.trim())
            .ok_or_else(|| CoreError::invalid(field, format!("unknown genre {genre:?}")))
    }

    pub fn risk_profile(&self, genre: &str) -> Result<RiskProfile, CoreError> {
        Ok(self.scored("genre", genre)?.profile.clone())
    }

    pub fn genre_report(&self, genre: &str) -> Result<GenreReport, CoreError> {
        Ok(to_report(self.scored("genre", genre)?))
    }

    pub fn risk_analysis(&self) -> RiskAnalysis {
        let mut genres: Vec<GenreReport> = self.genres.values().map(to_report).collect();
        genres.sort_by(|a, b| {
            a.profile
                .risk_score
                .total_cmp(&b.profile.risk_score)
                .then_with(|| a.stats.genre.cmp(&b.stats.genre))
        });

        let industry_risk_index = if genres.is_empty() {
            None
        } else {
            let total: f64 = genres.iter().map(|g| g.profile.risk_score).sum();
            Some(total / genres.len() as f64)
        };

        RiskAnalysis {
            genres,
            industry_risk_index,
        }
    }

    pub fn benchmark(&self, genre_a: &str, genre_b: &str) -> Result<BenchmarkReport, CoreError> {
        let a = self.scored("genre_a", genre_a)?.clone();
        let b = self.scored("genre_b", genre_b)?.clone();
        Ok(benchmark::report(a, b))
    }

    pub fn strategic_insight(&self) -> Option<StrategicInsight> {
        insight::derive(self.genres.values().map(|s| &s.stats))
    }

    pub fn budget_assessment(
        &self,
        genre: &str,
        budget: f64,
    ) -> Result<BudgetAssessment, CoreError> {
        budget::assess(&self.scored("genre", genre)?.stats, budget)
    }

    /// Warning for an over-budget plan. A pipe-separated genre list that matches no single
    /// genre is checked against the mean average budget of the genres it names; names the
    /// snapshot does not know yield no warning.
    pub fn budget_warning(&self, genre: &str, budget: f64) -> Result<Option<String>, CoreError> {
        budget::validate_budget(budget)?;
        let genre = genre.trim();
        let avg_budget = match self.genres.get(genre) {
            Some(scored) => budget::blended_avg_budget([&scored.stats]),
            None => budget::blended_avg_budget(
                genre
                    .split('|')
                    .filter_map(|g| self.genres.get(g.trim()))
                    .map(|s| &s.stats),
            ),
        };
        Ok(avg_budget.and_then(|avg| budget::warning(genre, avg, budget)))
    }
}

fn to_report(scored: &ScoredGenre) -> GenreReport {
    GenreReport {
        stats: scored.stats.clone(),
        profile: scored.profile.clone(),
        confidence: Confidence::from_sample_size(scored.stats.total_movies),
    }
}

/// Serves derived analytics from a lazily loaded, swappable genre snapshot.
pub struct AnalyticsService {
    provider: Arc<dyn GenreStatsProvider>,
    snapshot: RwLock<Option<Arc<GenreStatsSnapshot>>>,
    // Held across a provider fetch so concurrent loads collapse into one.
    load: Mutex<()>,
}

impl AnalyticsService {
    pub fn new(provider: Arc<dyn GenreStatsProvider>) -> Self {
        Self {
            provider,
            snapshot: RwLock::new(None),
            load: Mutex::new(()),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    async fn current(&self) -> Option<Arc<GenreStatsSnapshot>> {
        self.snapshot.read().await.clone()
    }

    /// Returns the current snapshot, loading it on first use.
    pub async fn snapshot(&self) -> Result<Arc<GenreStatsSnapshot>, CoreError> {
        if let Some(snapshot) = self.current().await {
            return Ok(snapshot);
        }
        let _load = self.load.lock().await;
        // Another caller may have finished the load while we waited.
        if let Some(snapshot) = self.current().await {
            return Ok(snapshot);
        }
        self.fetch_and_swap().await
    }

    /// Replaces the snapshot with a fresh provider fetch. A failed fetch keeps the old one.
    pub async fn refresh(&self) -> Result<Arc<GenreStatsSnapshot>, CoreError> {
        let _load = self.load.lock().await;
        self.fetch_and_swap().await
    }

    async fn fetch_and_swap(&self) -> Result<Arc<GenreStatsSnapshot>, CoreError> {
        let provider = self.provider.provider_name();
        let t0 = std::time::Instant::now();
        let stats = self
            .provider
            .fetch_genre_stats()
            .await
            .map_err(|e| CoreError::provider(provider, "fetch", &e))?;
        let snapshot = GenreStatsSnapshot::from_stats(stats)
            .map_err(|e| CoreError::provider(provider, "contract", &e))?;
        let snapshot = Arc::new(snapshot);

        tracing::info!(
            provider,
            genres = snapshot.len(),
            elapsed_ms = t0.elapsed().as_millis(),
            "genre stats snapshot loaded"
        );

        *self.snapshot.write().await = Some(snapshot.clone());
        Ok(snapshot)
    }

    pub async fn risk_profile(&self, genre: &str) -> Result<RiskProfile, CoreError> {
        require_name("genre", genre)?;
        self.snapshot().await?.risk_profile(genre)
    }

    pub async fn genre_report(&self, genre: &str) -> Result<GenreReport, CoreError> {
        require_name("genre", genre)?;
        self.snapshot().await?.genre_report(genre)
    }

    pub async fn risk_analysis(&self) -> Result<RiskAnalysis, CoreError> {
        Ok(self.snapshot().await?.risk_analysis())
    }

    pub async fn benchmark(
        &self,
        genre_a: &str,
        genre_b: &str,
    ) -> Result<BenchmarkReport, CoreError> {
        require_name("genre_a", genre_a)?;
        require_name("genre_b", genre_b)?;
        self.snapshot().await?.benchmark(genre_a, genre_b)
    }

    pub async fn strategic_insight(&self) -> Result<Option<StrategicInsight>, CoreError> {
        Ok(self.snapshot().await?.strategic_insight())
    }

    pub async fn budget_assessment(
        &self,
        genre: &str,
        budget: f64,
    ) -> Result<BudgetAssessment, CoreError> {
        require_name("genre", genre)?;
        budget::validate_budget(budget)?;
        self.snapshot().await?.budget_assessment(genre, budget)
    }

    pub async fn budget_warning(
        &self,
        genre: &str,
        budget: f64,
    ) -> Result<Option<String>, CoreError> {
        require_name("genre", genre)?;
        budget::validate_budget(budget)?;
        self.snapshot().await?.budget_warning(genre, budget)
    }
}

fn require_name(field: &'static str, name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::invalid(field, "genre name must be non-empty"));
    }
    Ok(())
}
