use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use chrono::{DateTime, Utc};

pub mod table;

pub use table::{CommunityTable, DuplicateInteraction};

pub type UserId = u64;
pub type RecipeId = u64;

/// Id given to a session user that has no counterpart in the community data.
pub const ANONYMOUS_USER_ID: UserId = u64::MAX;

/// A binary opinion on a recipe. The unrated placeholder (0) is not a rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Dislike,
    Like,
}

impl Rating {
    pub fn value(self) -> i8 {
        match self {
            Rating::Dislike => -1,
            Rating::Like => 1,
        }
    }

    /// Maps a raw table value. `Ok(None)` is the unrated sentinel.
    pub fn from_raw(raw: i64) -> Result<Option<Self>, InvalidRating> {
        match raw {
            -1 => Ok(Some(Rating::Dislike)),
            0 => Ok(None),
            1 => Ok(Some(Rating::Like)),
            other => Err(InvalidRating(other)),
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Rating::Dislike => Rating::Like,
            Rating::Like => Rating::Dislike,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rating must be -1 or +1, got {0}")]
pub struct InvalidRating(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DishType {
    Main,
    Dessert,
}

impl fmt::Display for DishType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DishType::Main => f.write_str("main"),
            DishType::Dessert => f.write_str("dessert"),
        }
    }
}

impl FromStr for DishType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(DishType::Main),
            "dessert" => Ok(DishType::Dessert),
            other => Err(anyhow::anyhow!(
                "The type of dish must be \"main\" or \"dessert\", not \"{}\"",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: UserId,
    pub recipe_id: RecipeId,
    pub rating: Rating,
}

impl Interaction {
    pub fn new(user_id: UserId, recipe_id: RecipeId, rating: Rating) -> Self {
        Self {
            user_id,
            recipe_id,
            rating,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub description: String,
    pub steps: Vec<String>,
    pub ingredients: Vec<String>,
}

/// The session user's rating history. Re-rating a recipe replaces the
/// previous opinion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveUserProfile {
    pub session_id: Uuid,
    pub user_id: UserId,
    pub dish: DishType,
    ratings: BTreeMap<RecipeId, Rating>,
    /// Bumped on every change to the ratings.
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl ActiveUserProfile {
    pub fn new(dish: DishType) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            user_id: ANONYMOUS_USER_ID,
            dish,
            ratings: BTreeMap::new(),
            revision: 0,
            created_at: now,
            last_updated: now,
        }
    }

    pub fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_ratings<I>(mut self, ratings: I) -> Self
    where
        I: IntoIterator<Item = (RecipeId, Rating)>,
    {
        self.ratings.extend(ratings);
        self
    }

    /// Returns the rating that was replaced, if any.
    pub fn rate(&mut self, recipe_id: RecipeId, rating: Rating) -> Option<Rating> {
        self.revision += 1;
        self.last_updated = Utc::now();
        self.ratings.insert(recipe_id, rating)
    }

    pub fn unrate(&mut self, recipe_id: RecipeId) -> Option<Rating> {
        let removed = self.ratings.remove(&recipe_id);
        if removed.is_some() {
            self.revision += 1;
            self.last_updated = Utc::now();
        }
        removed
    }

    pub fn ratings(&self) -> &BTreeMap<RecipeId, Rating> {
        &self.ratings
    }

    pub fn rated_ids(&self) -> BTreeSet<RecipeId> {
        self.ratings.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbor {
    pub user_id: UserId,
    pub distance: u32,
}

/// Closest eligible community users, nearest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborSet {
    neighbors: Vec<Neighbor>,
}

impl NeighborSet {
    pub(crate) fn from_sorted(neighbors: Vec<Neighbor>) -> Self {
        Self { neighbors }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Neighbor> {
        self.neighbors.iter()
    }

    pub fn user_ids(&self) -> Vec<UserId> {
        self.neighbors.iter().map(|n| n.user_id).collect()
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.neighbors.iter().any(|n| n.user_id == user_id)
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredRecipe {
    pub recipe_id: RecipeId,
    pub score: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SuggestionSource {
    Neighbors { score: i64 },
    Random,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextRecipe {
    pub session_id: Uuid,
    pub recipe_id: RecipeId,
    #[serde(flatten)]
    pub source: SuggestionSource,
    pub neighbors: Vec<Neighbor>,
    pub recipe: Option<Recipe>,
    pub generated_at: DateTime<Utc>,
}

/// Per-neighbor overlap with the active user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborSummary {
    pub user_id: UserId,
    pub common_likes: usize,
    pub common_dislikes: usize,
    pub remaining_recommendable: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_from_raw() {
        assert_eq!(Rating::from_raw(1), Ok(Some(Rating::Like)));
        assert_eq!(Rating::from_raw(-1), Ok(Some(Rating::Dislike)));
        assert_eq!(Rating::from_raw(0), Ok(None));
        assert_eq!(Rating::from_raw(4), Err(InvalidRating(4)));
    }

    #[test]
    fn test_dish_type_parse() {
        assert_eq!("main".parse::<DishType>().unwrap(), DishType::Main);
        assert_eq!("dessert".parse::<DishType>().unwrap(), DishType::Dessert);
        assert!("starter".parse::<DishType>().is_err());
    }

    #[test]
    fn test_profile_rate_overwrites() {
        let mut profile = ActiveUserProfile::new(DishType::Main);
        assert_eq!(profile.rate(101, Rating::Like), None);
        assert_eq!(profile.rate(101, Rating::Dislike), Some(Rating::Like));
        assert_eq!(profile.len(), 1);
        assert_eq!(profile.ratings()[&101], Rating::Dislike);

        assert_eq!(profile.unrate(101), Some(Rating::Dislike));
        assert_eq!(profile.unrate(101), None);
        assert!(profile.is_empty());
    }

    #[test]
    fn test_next_recipe_wire_format() {
        let next = NextRecipe {
            session_id: Uuid::nil(),
            recipe_id: 5,
            source: SuggestionSource::Neighbors { score: 2 },
            neighbors: vec![Neighbor { user_id: 1, distance: 1 }],
            recipe: None,
            generated_at: Utc::now(),
        };
        let json = serde_json::to_value(&next).unwrap();
        assert_eq!(json["source"], "neighbors");
        assert_eq!(json["score"], 2);
        assert_eq!(json["neighbors"][0]["distance"], 1);

        let random = NextRecipe {
            source: SuggestionSource::Random,
            ..next
        };
        let json = serde_json::to_value(&random).unwrap();
        assert_eq!(json["source"], "random");
        assert!(json.get("score").is_none());

        let back: Rating = serde_json::from_str("\"dislike\"").unwrap();
        assert_eq!(back, Rating::Dislike);
    }
}
