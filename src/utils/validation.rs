use crate::algorithms::EngineError;
use crate::config::Config;
use crate::models::*;
use anyhow::{anyhow, Result};
use std::num::NonZeroUsize;

pub fn validate_neighbor_count(k: usize, max_k: usize) -> Result<NonZeroUsize, EngineError> {
    if k > max_k {
        return Err(EngineError::InvalidInput(format!(
            "neighbor count too large: {} (max {})",
            k, max_k
        )));
    }

    NonZeroUsize::new(k)
        .ok_or_else(|| EngineError::InvalidInput("neighbor count must be positive".to_string()))
}

pub fn validate_recipe(recipe: &Recipe) -> Result<()> {
    if recipe.name.trim().is_empty() {
        return Err(anyhow!("Recipe {} has an empty name", recipe.id));
    }

    if recipe.name.len() > 500 {
        return Err(anyhow!("Recipe {} name too long (max 500 characters)", recipe.id));
    }

    Ok(())
}

pub fn validate_config(config: &Config) -> Result<()> {
    if config.recommendation.max_k == 0 {
        return Err(anyhow!("recommendation.max_k must be positive"));
    }

    validate_neighbor_count(config.recommendation.default_k, config.recommendation.max_k)
        .map_err(|e| anyhow!("recommendation.default_k: {}", e))?;

    if config.server.port == 0 {
        return Err(anyhow!("server.port cannot be zero"));
    }

    if config.server.workers == 0 {
        return Err(anyhow!("server.workers must be positive"));
    }

    if config.session.idle_timeout_secs == 0 || config.session.eviction_interval_secs == 0 {
        return Err(anyhow!("session timeouts must be positive"));
    }

    Ok(())
}
