pub mod dataset;
pub mod http;

use crate::domain::genre::GenreStats;
use crate::domain::movie::{MovieQuery, PageResult};
use anyhow::Result;

/// Source of per-genre aggregate statistics.
#[async_trait::async_trait]
pub trait GenreStatsProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_genre_stats(&self) -> Result<Vec<GenreStats>>;
}

/// Source of filtered, sorted, paginated catalog pages.
///
/// Implementations must report `total_pages = ceil(total_count / page_size)`.
#[async_trait::async_trait]
pub trait MovieCatalogProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn query(&self, query: &MovieQuery) -> Result<PageResult>;
}

/// The pair of providers a process needs, backed by the same source.
#[derive(Clone)]
pub struct Providers {
    pub genres: std::sync::Arc<dyn GenreStatsProvider>,
    pub catalog: std::sync::Arc<dyn MovieCatalogProvider>,
}

impl Providers {
    fn shared<P>(provider: P) -> Self
    where
        P: GenreStatsProvider + MovieCatalogProvider + 'static,
    {
        let provider = std::sync::Arc::new(provider);
        Self {
            genres: provider.clone(),
            catalog: provider,
        }
    }

    /// A configured `DATASET_PATH` wins over `DATA_PROVIDER_BASE_URL`; `None` when neither is set.
    pub fn from_settings(settings: &crate::config::Settings) -> Result<Option<Self>> {
        if let Some(path) = settings.dataset_path.as_deref() {
            let dataset = dataset::StaticDataset::from_json_file(path)?;
            tracing::info!(path, movies = dataset.movie_count(), "using static dataset provider");
            return Ok(Some(Self::shared(dataset)));
        }
        if settings.data_provider_base_url.is_some() {
            let http = http::HttpJsonProvider::from_settings(settings)?;
            return Ok(Some(Self::shared(http)));
        }
        Ok(None)
    }
}
