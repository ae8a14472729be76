use crate::algorithms::{graph, EngineError, NeighborGraphs, RecommendationEngine};
use crate::config::Config;
use crate::models::*;
use crate::services::rating_store::RatingStore;
use crate::services::session::{SessionError, SessionStore};
use crate::utils::validation::validate_neighbor_count;
use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use rand::SeedableRng;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("recipe {0} is not in the catalog")]
    UnknownRecipe(RecipeId),
    #[error("recipe {recipe_id} is not a {dish} recipe")]
    WrongDish { recipe_id: RecipeId, dish: DishType },
    #[error("no more {0} recipes to suggest")]
    CatalogExhausted(DishType),
    #[error("recommendation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug)]
pub struct RecommendationService {
    store: Arc<RatingStore>,
    sessions: Arc<SessionStore>,
    config: Arc<Config>,
    rng: Mutex<StdRng>,
}

impl RecommendationService {
    pub fn new(store: Arc<RatingStore>, sessions: Arc<SessionStore>, config: Arc<Config>) -> Self {
        let rng = match config.recommendation.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            store,
            sessions,
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn store(&self) -> &RatingStore {
        &self.store
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn neighbor_count(&self, k: Option<usize>) -> Result<NonZeroUsize, ServiceError> {
        let k = k.unwrap_or(self.config.recommendation.default_k);
        Ok(validate_neighbor_count(k, self.config.recommendation.max_k)?)
    }

    pub fn rate_recipe(
        &self,
        session_id: Uuid,
        recipe_id: RecipeId,
        rating: Rating,
    ) -> Result<Option<Rating>, ServiceError> {
        let dish = self.sessions.with_session(session_id, |s| s.profile.dish)?;
        if self.store.recipe(recipe_id).is_none() {
            return Err(ServiceError::UnknownRecipe(recipe_id));
        }
        // Only recipes the dish's community rated can take part in distances.
        if !self.store.table(dish).has_recipe(recipe_id) {
            return Err(ServiceError::WrongDish { recipe_id, dish });
        }
        Ok(self.sessions.rate(session_id, recipe_id, rating)?)
    }

    /// Picks the recipe to show next: the neighbors' favourite when they have
    /// one, otherwise a random recipe the user has not rated.
    pub async fn next_recipe(
        &self,
        session_id: Uuid,
        k: Option<usize>,
    ) -> Result<NextRecipe, ServiceError> {
        let k = self.neighbor_count(k)?;
        let profile = self.sessions.profile(session_id)?;

        let (recipe_id, source, neighbors) = if profile.is_empty() {
            info!("Session {} has no ratings yet, suggesting a random recipe", session_id);
            (self.random_unrated(&profile)?, SuggestionSource::Random, NeighborSet::default())
        } else {
            let recommendation = self.run_engine(&profile, k).await?;
            self.sessions
                .remember_neighbors(&profile, recommendation.neighbors.clone())?;

            match recommendation.suggestion {
                Some(scored) => (
                    scored.recipe_id,
                    SuggestionSource::Neighbors {
                        score: scored.score,
                    },
                    recommendation.neighbors,
                ),
                None => {
                    info!(
                        "Neighbors of session {} have nothing new, suggesting a random recipe",
                        session_id
                    );
                    (
                        self.random_unrated(&profile)?,
                        SuggestionSource::Random,
                        recommendation.neighbors,
                    )
                }
            }
        };

        Ok(NextRecipe {
            session_id,
            recipe_id,
            source,
            neighbors: neighbors.iter().copied().collect(),
            recipe: self.store.recipe(recipe_id).cloned(),
            generated_at: Utc::now(),
        })
    }

    pub async fn neighbor_graphs(&self, session_id: Uuid) -> Result<NeighborGraphs, ServiceError> {
        let (profile, neighbors) = self.current_neighbors(session_id).await?;
        Ok(graph::build(&neighbors, &profile, self.store.table(profile.dish)))
    }

    pub async fn neighbor_summaries(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<NeighborSummary>, ServiceError> {
        let (profile, neighbors) = self.current_neighbors(session_id).await?;
        Ok(graph::summarize(&neighbors, &profile, self.store.table(profile.dish)))
    }

    /// Neighbors of the last suggestion, or a fresh set with the default k.
    async fn current_neighbors(
        &self,
        session_id: Uuid,
    ) -> Result<(ActiveUserProfile, NeighborSet), ServiceError> {
        let (profile, cached) = self
            .sessions
            .with_session(session_id, |s| (s.profile.clone(), s.last_neighbors.clone()))?;

        if let Some(neighbors) = cached {
            return Ok((profile, neighbors));
        }

        let k = self.neighbor_count(None)?;
        let neighbors = self.run_engine(&profile, k).await?.neighbors;
        self.sessions.remember_neighbors(&profile, neighbors.clone())?;
        Ok((profile, neighbors))
    }

    async fn run_engine(
        &self,
        profile: &ActiveUserProfile,
        k: NonZeroUsize,
    ) -> Result<crate::algorithms::Recommendation, ServiceError> {
        let store = Arc::clone(&self.store);
        let profile = profile.clone();

        let recommendation = tokio::task::spawn_blocking(move || {
            RecommendationEngine::new(store.table(profile.dish)).recommend(&profile, k)
        })
        .await??;

        debug!(
            neighbors = ?recommendation.neighbors.user_ids(),
            suggestion = ?recommendation.suggestion,
            "Engine finished"
        );
        Ok(recommendation)
    }

    fn random_unrated(&self, profile: &ActiveUserProfile) -> Result<RecipeId, ServiceError> {
        let rated = profile.ratings();
        let mut rng = self.rng.lock();
        self.store
            .table(profile.dish)
            .recipe_ids()
            .filter(|r| !rated.contains_key(r))
            .choose(&mut *rng)
            .ok_or(ServiceError::CatalogExhausted(profile.dish))
    }
}
