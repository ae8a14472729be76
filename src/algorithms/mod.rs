pub mod distance;
pub mod graph;
pub mod neighbors;
pub mod pruning;

use crate::models::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroUsize;
use tracing::debug;

pub use distance::{distance, DistanceTable, PivotTable};
pub use graph::{NeighborGraphs, RelationGraph};
pub use neighbors::select;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Aggregated neighbor opinion for each recipe the active user has not rated.
pub type RecipeScoreTable = BTreeMap<RecipeId, i64>;

/// Everything a single recommendation pass produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub neighbors: NeighborSet,
    pub scores: RecipeScoreTable,
    pub suggestion: Option<ScoredRecipe>,
}

/// Memory-based nearest-neighbor recommender over a community table.
#[derive(Debug, Clone, Copy)]
pub struct RecommendationEngine<'a> {
    community: &'a CommunityTable,
}

impl<'a> RecommendationEngine<'a> {
    pub fn new(community: &'a CommunityTable) -> Self {
        Self { community }
    }

    pub fn community(&self) -> &'a CommunityTable {
        self.community
    }

    pub fn neighbors(
        &self,
        profile: &ActiveUserProfile,
        k: NonZeroUsize,
    ) -> Result<NeighborSet, EngineError> {
        let distances = distance(profile.ratings(), self.community)?;
        Ok(select(
            &distances,
            profile.user_id,
            &profile.rated_ids(),
            self.community,
            k,
        ))
    }

    pub fn recommend(
        &self,
        profile: &ActiveUserProfile,
        k: NonZeroUsize,
    ) -> Result<Recommendation, EngineError> {
        let neighbors = self.neighbors(profile, k)?;
        let scores = score_recipes(&neighbors, &profile.rated_ids(), self.community);
        let suggestion = top_recipe(&scores);

        debug!(
            neighbors = neighbors.len(),
            candidates = scores.len(),
            suggestion = ?suggestion,
            "Computed recommendation"
        );

        Ok(Recommendation {
            neighbors,
            scores,
            suggestion,
        })
    }

    /// `Ok(None)` means the neighbors have nothing new to offer.
    pub fn suggest(
        &self,
        profile: &ActiveUserProfile,
        k: NonZeroUsize,
    ) -> Result<Option<ScoredRecipe>, EngineError> {
        Ok(self.recommend(profile, k)?.suggestion)
    }
}

pub fn score_recipes(
    neighbors: &NeighborSet,
    active_rated_ids: &BTreeSet<RecipeId>,
    community: &CommunityTable,
) -> RecipeScoreTable {
    let mut scores = RecipeScoreTable::new();

    for neighbor in neighbors.iter() {
        let Some(row) = community.user_ratings(neighbor.user_id) else {
            continue;
        };
        for (recipe_id, rating) in row {
            if active_rated_ids.contains(recipe_id) {
                continue;
            }
            *scores.entry(*recipe_id).or_insert(0) += i64::from(rating.value());
        }
    }

    scores
}

/// Highest score wins; among equal scores the lowest recipe id.
pub fn top_recipe(scores: &RecipeScoreTable) -> Option<ScoredRecipe> {
    let mut best: Option<ScoredRecipe> = None;
    for (&recipe_id, &score) in scores {
        match best {
            Some(current) if current.score >= score => {}
            _ => best = Some(ScoredRecipe { recipe_id, score }),
        }
    }
    best
}
