use crate::algorithms::pruning::PruneThresholds;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub recommendation: RecommendationConfig,
    pub session: SessionConfig,
    pub pruning: PruningConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub main_interactions: PathBuf,
    pub dessert_interactions: PathBuf,
    pub recipes: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    /// Neighbor count used when a request does not pick one.
    pub default_k: usize,
    pub max_k: usize,
    /// Fixes the fallback picks for reproducible runs.
    pub random_seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sessions untouched for this long are dropped.
    pub idle_timeout_secs: u64,
    pub eviction_interval_secs: u64,
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> chrono::Duration {
        let secs = i64::try_from(self.idle_timeout_secs).unwrap_or(i64::MAX);
        chrono::Duration::seconds(secs.min(i64::MAX / 1_000))
    }

    pub fn eviction_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.eviction_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PruningConfig {
    pub min_ratings_per_user: usize,
    pub min_ratings_per_recipe: usize,
}

impl PruningConfig {
    pub fn thresholds(&self) -> PruneThresholds {
        PruneThresholds {
            min_ratings_per_user: self.min_ratings_per_user,
            min_ratings_per_recipe: self.min_ratings_per_recipe,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                workers: num_cpus::get(),
            },
            data: DataConfig {
                main_interactions: PathBuf::from("data/PP_user_main_dishes.csv"),
                dessert_interactions: PathBuf::from("data/PP_user_desserts.csv"),
                recipes: PathBuf::from("data/PP_recipes_data.csv"),
            },
            recommendation: RecommendationConfig {
                default_k: 3,
                max_k: 50,
                random_seed: None,
            },
            session: SessionConfig {
                idle_timeout_secs: 3600,
                eviction_interval_secs: 60,
            },
            pruning: PruningConfig {
                min_ratings_per_user: 5,
                min_ratings_per_recipe: 5,
            },
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("FOODER").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Reads `path` when it exists, otherwise falls back to the defaults.
    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        if std::path::Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::info!("Config file {} not found, using default configuration", path);
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
host = "127.0.0.1"
port = 9000
workers = 2

[data]
main_interactions = "main.csv"
dessert_interactions = "dessert.csv"
recipes = "recipes.csv"

[recommendation]
default_k = 5
max_k = 20
random_seed = 7

[session]
idle_timeout_secs = 600
eviction_interval_secs = 30

[pruning]
min_ratings_per_user = 2
min_ratings_per_recipe = 3
"#
        )
        .unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.socket_addr().unwrap().port(), 9000);
        assert_eq!(config.recommendation.default_k, 5);
        assert_eq!(config.recommendation.random_seed, Some(7));
        assert_eq!(config.session.idle_timeout(), chrono::Duration::minutes(10));
        assert_eq!(config.session.eviction_interval().as_secs(), 30);
        assert_eq!(config.pruning.thresholds().min_ratings_per_recipe, 3);
        assert_eq!(config.data.recipes, PathBuf::from("recipes.csv"));
    }
}
