use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cineintel_core::analytics::allocation::{self, AllocationPlan};
use cineintel_core::analytics::benchmark::BenchmarkReport;
use cineintel_core::analytics::budget::BudgetAssessment;
use cineintel_core::analytics::insight::StrategicInsight;
use cineintel_core::analytics::{AnalyticsService, GenreReport, RiskAnalysis};
use cineintel_core::domain::movie::{
    GenreFilter, MovieQuery, OutcomeFilter, PageResult, SortField, SortOrder, DEFAULT_PAGE_SIZE,
};
use cineintel_core::error::CoreError;
use cineintel_core::provider::{MovieCatalogProvider, Providers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = cineintel_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let state = match Providers::from_settings(&settings) {
        Ok(Some(providers)) => AppState::from_providers(providers),
        Ok(None) => {
            tracing::error!("no DATASET_PATH or DATA_PROVIDER_BASE_URL; starting API in degraded mode");
            AppState::degraded()
        }
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "provider setup failed; starting API in degraded mode");
            AppState::degraded()
        }
    };

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/genres", get(list_genres))
        .route("/genres/refresh", post(refresh_genres))
        .route("/risk/genres", get(get_risk_analysis))
        .route("/risk/genres/:genre", get(get_genre_risk))
        .route("/allocation", get(get_allocation))
        .route("/benchmark", get(get_benchmark))
        .route("/insight", get(get_insight))
        .route("/budget", get(get_budget))
        .route("/budget/warning", get(get_budget_warning))
        .route("/movies/explore", get(explore_movies))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    analytics: Option<Arc<AnalyticsService>>,
    catalog: Option<Arc<dyn MovieCatalogProvider>>,
}

impl AppState {
    fn from_providers(providers: Providers) -> Self {
        Self {
            analytics: Some(Arc::new(AnalyticsService::new(providers.genres))),
            catalog: Some(providers.catalog),
        }
    }

    fn degraded() -> Self {
        Self {
            analytics: None,
            catalog: None,
        }
    }

    fn analytics(&self) -> Result<&AnalyticsService, StatusCode> {
        self.analytics
            .as_deref()
            .ok_or(StatusCode::SERVICE_UNAVAILABLE)
    }
}

fn status_for(err: CoreError) -> StatusCode {
    match err {
        CoreError::InvalidInput { field, detail } => {
            tracing::debug!(field, %detail, "rejected request");
            StatusCode::BAD_REQUEST
        }
        CoreError::ProviderUnavailable { .. } => {
            let err = anyhow::Error::new(err);
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "provider unavailable");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiGenres {
    genres: Vec<String>,
}

async fn list_genres(State(state): State<AppState>) -> Result<Json<ApiGenres>, StatusCode> {
    let snapshot = state.analytics()?.snapshot().await.map_err(status_for)?;
    Ok(Json(ApiGenres {
        genres: snapshot.genre_names(),
    }))
}

#[derive(Debug, Serialize)]
struct ApiRefresh {
    genres: usize,
    loaded_at: String,
}

async fn refresh_genres(State(state): State<AppState>) -> Result<Json<ApiRefresh>, StatusCode> {
    let snapshot = state.analytics()?.refresh().await.map_err(status_for)?;
    Ok(Json(ApiRefresh {
        genres: snapshot.len(),
        loaded_at: snapshot.loaded_at().to_rfc3339(),
    }))
}

async fn get_risk_analysis(
    State(state): State<AppState>,
) -> Result<Json<RiskAnalysis>, StatusCode> {
    let analysis = state
        .analytics()?
        .risk_analysis()
        .await
        .map_err(status_for)?;
    Ok(Json(analysis))
}

async fn get_genre_risk(
    State(state): State<AppState>,
    Path(genre): Path<String>,
) -> Result<Json<GenreReport>, StatusCode> {
    let report = state
        .analytics()?
        .genre_report(&genre)
        .await
        .map_err(|e| match e {
            // A path that names no genre is a missing resource, not a malformed request.
            CoreError::InvalidInput { .. } => StatusCode::NOT_FOUND,
            other => status_for(other),
        })?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
struct AllocationParams {
    risk_appetite: f64,
}

// Pure computation: served even without a provider.
async fn get_allocation(
    Query(params): Query<AllocationParams>,
) -> Result<Json<AllocationPlan>, StatusCode> {
    let plan = allocation::allocate(params.risk_appetite).map_err(status_for)?;
    Ok(Json(plan))
}

#[derive(Debug, Deserialize)]
struct BenchmarkParams {
    genre_a: String,
    genre_b: String,
}

async fn get_benchmark(
    State(state): State<AppState>,
    Query(params): Query<BenchmarkParams>,
) -> Result<Json<BenchmarkReport>, StatusCode> {
    let report = state
        .analytics()?
        .benchmark(&params.genre_a, &params.genre_b)
        .await
        .map_err(status_for)?;
    Ok(Json(report))
}

async fn get_insight(
    State(state): State<AppState>,
) -> Result<Json<StrategicInsight>, StatusCode> {
    let insight = state
        .analytics()?
        .strategic_insight()
        .await
        .map_err(status_for)?;
    insight.map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[derive(Debug, Deserialize)]
struct BudgetParams {
    genre: String,
    budget: f64,
}

async fn get_budget(
    State(state): State<AppState>,
    Query(params): Query<BudgetParams>,
) -> Result<Json<BudgetAssessment>, StatusCode> {
    let assessment = state
        .analytics()?
        .budget_assessment(&params.genre, params.budget)
        .await
        .map_err(status_for)?;
    Ok(Json(assessment))
}

#[derive(Debug, Serialize)]
struct ApiBudgetWarning {
    warning: Option<String>,
}

async fn get_budget_warning(
    State(state): State<AppState>,
    Query(params): Query<BudgetParams>,
) -> Result<Json<ApiBudgetWarning>, StatusCode> {
    let warning = state
        .analytics()?
        .budget_warning(&params.genre, params.budget)
        .await
        .map_err(status_for)?;
    Ok(Json(ApiBudgetWarning { warning }))
}

#[derive(Debug, Deserialize)]
struct ExploreParams {
    page: Option<u32>,
    limit: Option<u32>,
    search: Option<String>,
    genre: Option<String>,
    success_label: Option<String>,
    sort_by: Option<String>,
    sort_order: Option<String>,
}

impl ExploreParams {
    fn into_query(self) -> Result<MovieQuery, CoreError> {
        let query = MovieQuery {
            page: self.page.unwrap_or(1),
            page_size: self.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            search: self.search.unwrap_or_default(),
            genre_filter: self.genre.map(GenreFilter::from).unwrap_or(GenreFilter::All),
            outcome_filter: match self.success_label.as_deref() {
                Some(s) => s.parse::<OutcomeFilter>()?,
                None => OutcomeFilter::All,
            },
            sort_by: match self.sort_by.as_deref() {
                Some(s) => s.parse::<SortField>()?,
                None => SortField::default(),
            },
            sort_order: match self.sort_order.as_deref() {
                Some(s) => s.parse::<SortOrder>()?,
                None => SortOrder::default(),
            },
        };
        query.validate()?;
        Ok(query)
    }
}

async fn explore_movies(
    State(state): State<AppState>,
    Query(params): Query<ExploreParams>,
) -> Result<Json<PageResult>, StatusCode> {
    let Some(catalog) = &state.catalog else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let query = params.into_query().map_err(status_for)?;
    let page = catalog.query(&query).await.map_err(|e| {
        status_for(CoreError::provider(catalog.provider_name(), "query", &e))
    })?;
    Ok(Json(page))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &cineintel_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use cineintel_core::provider::dataset::StaticDataset;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let dataset = StaticDataset::from_json_str(
            &json!({
                "genres": [
                    {"genre": "Action", "avg_roi": 2.0, "roi_volatility": 1.5,
                     "success_rate": 52.0, "total_movies": 40, "avg_budget": 900000.0},
                    {"genre": "Horror", "avg_roi": 0.5, "roi_volatility": 3.0,
                     "success_rate": 18.0, "total_movies": 6},
                ],
                "movies": [
                    {"title": "War", "year": 2019, "genres": "Action|Thriller", "roi": 3.1,
                     "box_office": 4750000, "imdb_rating": 6.5, "success_label": "Hit"},
                    {"title": "Stree", "year": 2018, "genres": "Horror|Comedy", "roi": 5.6,
                     "box_office": 1800000, "imdb_rating": 7.5, "success_label": "Hit"},
                ],
            })
            .to_string(),
        )
        .unwrap();
        let provider = Arc::new(dataset);
        router(AppState::from_providers(Providers {
            genres: provider.clone(),
            catalog: provider,
        }))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        let res = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn allocation_route_validates_range() {
        let (status, body) = get(app(), "/allocation?risk_appetite=100").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["speculative_pct"], 60);
        assert_eq!(body["safe_pct"], 10);

        let (status, _) = get(app(), "/allocation?risk_appetite=140").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn genre_risk_route() {
        let (status, body) = get(app(), "/risk/genres/Horror").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["profile"]["risk_category"], "High");
        assert_eq!(body["confidence"], "Moderate");

        let (status, _) = get(app(), "/risk/genres/Western").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn benchmark_route_reports_leaders() {
        let (status, body) = get(app(), "/benchmark?genre_a=Horror&genre_b=Action").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verdict"]["efficiency_leader"], "Action");
        assert_eq!(body["verdict"]["stability_leader"], "Action");

        let (status, _) = get(app(), "/benchmark?genre_a=Horror&genre_b=Western").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn explore_route_filters_and_rejects_bad_params() {
        let (status, body) = get(app(), "/movies/explore?genre=horror&limit=10").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_count"], 1);
        assert_eq!(body["records"][0]["title"], "Stree");

        let (status, _) = get(app(), "/movies/explore?success_label=Blockbuster").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get(app(), "/movies/explore?limit=500").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn insight_route_names_headline_genres() {
        let (status, body) = get(app(), "/insight").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["top_roi_genre"], "Action");
        assert_eq!(body["most_volatile_genre"], "Horror");
        assert_eq!(body["safest_genre"], "Action");
        // (2.0 + 0.5) / 2 clears the expansion bar.
        assert_eq!(body["market_phase"], "Expansion");
    }

    #[tokio::test]
    async fn budget_routes() {
        let (status, body) = get(app(), "/budget?genre=Action&budget=1200000").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "above_average");
        let cap = body["suggested_cap"].as_f64().unwrap();
        assert!((cap - 1_080_000.0).abs() < 1e-6);
        assert_eq!(body["warning"], Value::Null);

        // No recorded average budget for Horror.
        let (status, _) = get(app(), "/budget?genre=Horror&budget=100").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = get(app(), "/budget/warning?genre=Action&budget=2000000").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["warning"].is_string());
    }

    #[tokio::test]
    async fn degraded_mode_returns_503() {
        let app = router(AppState::degraded());
        let (status, _) = get(app.clone(), "/risk/genres").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let (status, _) = get(app.clone(), "/insight").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, body) = get(app, "/allocation?risk_appetite=50").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["appetite_label"], "Balanced");
    }
}
