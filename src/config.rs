use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum number of recommendations returned per request
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Minimum number of ratings before collaborative filtering applies
    #[serde(default = "default_cold_start_threshold")]
    pub cold_start_threshold: usize,

    /// Lowest accepted rating value
    #[serde(default = "default_rating_scale_min")]
    pub rating_scale_min: f64,

    /// Highest accepted rating value
    #[serde(default = "default_rating_scale_max")]
    pub rating_scale_max: f64,

    /// Location of the persisted model artifact
    #[serde(default = "default_model_path")]
    pub model_path: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_page_size() -> usize {
    10
}

fn default_cold_start_threshold() -> usize {
    7
}

fn default_rating_scale_min() -> f64 {
    1.0
}

fn default_rating_scale_max() -> f64 {
    5.0
}

fn default_model_path() -> String {
    "data/svd_model.json".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            page_size: default_page_size(),
            cold_start_threshold: default_cold_start_threshold(),
            rating_scale_min: default_rating_scale_min(),
            rating_scale_max: default_rating_scale_max(),
            model_path: default_model_path(),
        }
    }
}
