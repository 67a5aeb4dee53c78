use crate::config::Settings;
use crate::domain::contract::{self, ExploreResponse, GenreStatsRow};
use crate::domain::genre::GenreStats;
use crate::domain::movie::{GenreFilter, MovieQuery, PageResult};
use crate::provider::{GenreStatsProvider, MovieCatalogProvider};
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;
const GENRE_STATS_PATH: &str = "/api/genre/overall";
const EXPLORE_PATH: &str = "/api/movies/explore";

/// Client for the analytics backend's JSON routes.
#[derive(Debug, Clone)]
pub struct HttpJsonProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    retries: u32,
}

impl HttpJsonProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_data_provider_base_url()?.to_string();
        let api_key = settings.data_provider_api_key.clone();

        let timeout_secs = std::env::var("DATA_PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("DATA_PROVIDER_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES)
            .max(1);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build data provider http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
            retries,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let res = self
            .http
            .get(self.url(path))
            .headers(self.headers()?)
            .query(query)
            .send()
            .await
            .with_context(|| format!("data provider request to {path} failed"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read provider response")?;
        let raw_json = serde_json::from_str::<serde_json::Value>(&text)
            .with_context(|| format!("provider response is not valid JSON: {text}"))?;

        if !status.is_success() {
            anyhow::bail!("data provider HTTP {status}: {raw_json}");
        }

        serde_json::from_value::<T>(raw_json)
            .with_context(|| format!("failed to decode provider response from {path}"))
    }
}

/// Query-string parameters in the names the explore route expects.
pub fn explore_params(query: &MovieQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("page", query.page.to_string()),
        ("limit", query.page_size.to_string()),
        ("sort_by", query.sort_by.as_str().to_string()),
        ("sort_order", query.sort_order.as_str().to_string()),
        ("success_label", query.outcome_filter.as_str().to_string()),
    ];
    if !query.search.trim().is_empty() {
        params.push(("search", query.search.trim().to_string()));
    }
    if let GenreFilter::Genre(genre) = &query.genre_filter {
        params.push(("genre", genre.clone()));
    }
    params
}

#[async_trait::async_trait]
impl GenreStatsProvider for HttpJsonProvider {
    fn provider_name(&self) -> &'static str {
        "external_http_json"
    }

    async fn fetch_genre_stats(&self) -> Result<Vec<GenreStats>> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let res = self
                .get_json::<Vec<GenreStatsRow>>(GENRE_STATS_PATH, &[])
                .await;
            match res {
                Ok(rows) => return contract::validate_genre_rows(rows),
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(attempt, ?backoff, error = %err, "genre stats fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl MovieCatalogProvider for HttpJsonProvider {
    fn provider_name(&self) -> &'static str {
        "external_http_json"
    }

    // Single attempt: retrying a superseded query is the caller's decision.
    async fn query(&self, query: &MovieQuery) -> Result<PageResult> {
        let params = explore_params(query);
        let resp = self.get_json::<ExploreResponse>(EXPLORE_PATH, &params).await?;
        resp.validate_and_into_page(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::movie::{OutcomeFilter, SortField, SortOrder};

    #[test]
    fn explore_params_use_backend_names() {
        let q = MovieQuery {
            page: 3,
            page_size: 50,
            search: "  dil ".into(),
            genre_filter: GenreFilter::Genre("Romance".into()),
            outcome_filter: OutcomeFilter::Hit,
            sort_by: SortField::ImdbRating,
            sort_order: SortOrder::Asc,
        };
        let params = explore_params(&q);
        let get = |k: &str| {
            params
                .iter()
                .find(|(name, _)| *name == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("page"), Some("3"));
        assert_eq!(get("limit"), Some("50"));
        assert_eq!(get("search"), Some("dil"));
        assert_eq!(get("genre"), Some("Romance"));
        assert_eq!(get("success_label"), Some("Hit"));
        assert_eq!(get("sort_by"), Some("imdb_rating"));
        assert_eq!(get("sort_order"), Some("asc"));
    }

    #[test]
    fn explore_params_omit_empty_filters() {
        let params = explore_params(&MovieQuery::default());
        assert!(params.iter().all(|(k, _)| *k != "search" && *k != "genre"));
    }

    #[test]
    fn url_joins_without_double_slash() {
        let provider = HttpJsonProvider {
            http: reqwest::Client::new(),
            base_url: "http://localhost:8000/".into(),
            api_key: None,
            retries: 1,
        };
        assert_eq!(
            provider.url(GENRE_STATS_PATH),
            "http://localhost:8000/api/genre/overall"
        );
    }
}
