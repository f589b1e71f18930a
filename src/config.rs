use serde::Deserialize;

/// Where catalog, profile and progress rows are persisted
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process store seeded with the demo catalog
    Memory,
    /// The hosted Postgres database
    Postgres,
}

/// Which authentication capability the service is wired with
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthProviderKind {
    /// Three fixed demo accounts, no real credentials
    Mock,
    /// The hosted backend's auth REST API
    Hosted,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_storage_backend")]
    pub storage_backend: StorageBackend,

    /// PostgreSQL database connection URL, required for the postgres backend
    #[serde(default)]
    pub database_url: Option<String>,

    /// Redis connection URL; catalog caching is disabled when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    #[serde(default = "default_auth_provider")]
    pub auth_provider: AuthProviderKind,

    /// Hosted backend project URL (auth and REST root)
    #[serde(default)]
    pub backend_url: Option<String>,

    /// Hosted backend anonymous API key
    #[serde(default)]
    pub backend_api_key: Option<String>,

    /// Number of videos per category anyone may stream in full
    #[serde(default = "default_free_preview_per_category")]
    pub free_preview_per_category: usize,

    /// Size of the "recommended for you" row
    #[serde(default = "default_recommendation_limit")]
    pub recommendation_limit: usize,

    /// Minimum wall-clock gap between two non-terminal progress saves
    #[serde(default = "default_progress_save_interval_secs")]
    pub progress_save_interval_secs: u64,

    /// Timeout for the startup connectivity probe
    #[serde(default = "default_connectivity_timeout_secs")]
    pub connectivity_timeout_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::Memory
}

fn default_auth_provider() -> AuthProviderKind {
    AuthProviderKind::Mock
}

fn default_free_preview_per_category() -> usize {
    2
}

fn default_recommendation_limit() -> usize {
    6
}

fn default_progress_save_interval_secs() -> u64 {
    5
}

fn default_connectivity_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            storage_backend: default_storage_backend(),
            database_url: None,
            redis_url: None,
            auth_provider: default_auth_provider(),
            backend_url: None,
            backend_api_key: None,
            free_preview_per_category: default_free_preview_per_category(),
            recommendation_limit: default_recommendation_limit(),
            progress_save_interval_secs: default_progress_save_interval_secs(),
            connectivity_timeout_secs: default_connectivity_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects combinations that cannot be wired at startup
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.storage_backend == StorageBackend::Postgres && self.database_url.is_none() {
            anyhow::bail!("DATABASE_URL is required when STORAGE_BACKEND=postgres");
        }

        if self.auth_provider == AuthProviderKind::Hosted
            && (self.backend_url.is_none() || self.backend_api_key.is_none())
        {
            anyhow::bail!("BACKEND_URL and BACKEND_API_KEY are required when AUTH_PROVIDER=hosted");
        }

        if self.recommendation_limit == 0 {
            anyhow::bail!("RECOMMENDATION_LIMIT must be at least 1");
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
