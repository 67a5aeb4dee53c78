pub mod analytics;
pub mod domain;
pub mod error;
pub mod provider;
pub mod query;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub data_provider_base_url: Option<String>,
        pub data_provider_api_key: Option<String>,
        pub dataset_path: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                data_provider_base_url: non_empty_var("DATA_PROVIDER_BASE_URL"),
                data_provider_api_key: non_empty_var("DATA_PROVIDER_API_KEY"),
                dataset_path: non_empty_var("DATASET_PATH"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        pub fn require_data_provider_base_url(&self) -> anyhow::Result<&str> {
            self.data_provider_base_url
                .as_deref()
                .context("DATA_PROVIDER_BASE_URL is required")
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }
}
