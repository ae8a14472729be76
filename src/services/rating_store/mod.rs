use crate::config::DataConfig;
use crate::models::*;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

pub mod source;

pub use source::{
    write_interactions, CsvInteractionSource, CsvRecipeSource, InteractionSource, RecipeSource,
    StaticSource,
};

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("{}: row {row}: {source}", .path.display())]
    InvalidRating {
        path: PathBuf,
        row: usize,
        source: InvalidRating,
    },
    #[error("{}: {source}", .path.display())]
    Duplicate {
        path: PathBuf,
        source: DuplicateInteraction,
    },
    #[error("{}: row {row}: column `{column}` is not a list literal", .path.display())]
    MalformedList {
        path: PathBuf,
        row: usize,
        column: &'static str,
    },
    #[error("{}: row {row}: {message}", .path.display())]
    InvalidRecipe {
        path: PathBuf,
        row: usize,
        message: String,
    },
    #[error("{}: recipe {recipe_id} is listed twice", .path.display())]
    DuplicateRecipe { path: PathBuf, recipe_id: RecipeId },
    #[error("{dish} table rates recipe {recipe_id}, which has no metadata")]
    MissingRecipe { dish: DishType, recipe_id: RecipeId },
    #[error("{}: {source}", .path.display())]
    Csv { path: PathBuf, source: csv::Error },
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct RecipeCatalog {
    recipes: BTreeMap<RecipeId, Recipe>,
}

impl RecipeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the previous entry when the id was already present.
    pub fn insert(&mut self, recipe: Recipe) -> Option<Recipe> {
        self.recipes.insert(recipe.id, recipe)
    }

    pub fn get(&self, recipe_id: RecipeId) -> Option<&Recipe> {
        self.recipes.get(&recipe_id)
    }

    pub fn contains(&self, recipe_id: RecipeId) -> bool {
        self.recipes.contains_key(&recipe_id)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

impl FromIterator<Recipe> for RecipeCatalog {
    fn from_iter<I: IntoIterator<Item = Recipe>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for recipe in iter {
            catalog.insert(recipe);
        }
        catalog
    }
}

/// Read-only community ratings for both dish types plus recipe metadata.
/// Shared between sessions without locking.
#[derive(Debug, Clone)]
pub struct RatingStore {
    main: CommunityTable,
    dessert: CommunityTable,
    catalog: RecipeCatalog,
}

impl RatingStore {
    pub fn new(
        main: CommunityTable,
        dessert: CommunityTable,
        catalog: RecipeCatalog,
    ) -> Result<Self, DataError> {
        for (dish, table) in [(DishType::Main, &main), (DishType::Dessert, &dessert)] {
            if let Some(recipe_id) = table.recipe_ids().find(|r| !catalog.contains(*r)) {
                return Err(DataError::MissingRecipe { dish, recipe_id });
            }
        }

        Ok(Self {
            main,
            dessert,
            catalog,
        })
    }

    pub async fn from_sources(
        main: &dyn InteractionSource,
        dessert: &dyn InteractionSource,
        recipes: &dyn RecipeSource,
    ) -> Result<Self, DataError> {
        let (main, dessert, catalog) = futures::try_join!(
            main.load_table(),
            dessert.load_table(),
            recipes.load_catalog()
        )?;

        let store = Self::new(main, dessert, catalog)?;
        info!(
            main_users = store.main.user_count(),
            main_recipes = store.main.recipe_count(),
            dessert_users = store.dessert.user_count(),
            dessert_recipes = store.dessert.recipe_count(),
            catalog = store.catalog.len(),
            "Rating store loaded"
        );
        Ok(store)
    }

    pub async fn load(config: &DataConfig) -> Result<Self, DataError> {
        Self::from_sources(
            &CsvInteractionSource::new(&config.main_interactions),
            &CsvInteractionSource::new(&config.dessert_interactions),
            &CsvRecipeSource::new(&config.recipes),
        )
        .await
    }

    pub fn table(&self, dish: DishType) -> &CommunityTable {
        match dish {
            DishType::Main => &self.main,
            DishType::Dessert => &self.dessert,
        }
    }

    pub fn recipe(&self, recipe_id: RecipeId) -> Option<&Recipe> {
        self.catalog.get(recipe_id)
    }

    pub fn catalog(&self) -> &RecipeCatalog {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(id: RecipeId) -> Recipe {
        Recipe {
            id,
            name: format!("recipe {}", id),
            description: String::new(),
            steps: vec![],
            ingredients: vec![],
        }
    }

    #[test]
    fn test_missing_metadata_is_rejected() {
        let main = CommunityTable::from_interactions([Interaction::new(1, 10, Rating::Like)])
            .unwrap();
        let dessert = CommunityTable::from_interactions([Interaction::new(1, 20, Rating::Like)])
            .unwrap();
        let catalog: RecipeCatalog = [recipe(10)].into_iter().collect();

        let err = RatingStore::new(main, dessert, catalog).unwrap_err();
        assert!(matches!(
            err,
            DataError::MissingRecipe { dish: DishType::Dessert, recipe_id: 20 }
        ));
    }

    #[test]
    fn test_tables_are_split_by_dish() {
        let main = CommunityTable::from_interactions([Interaction::new(1, 10, Rating::Like)])
            .unwrap();
        let dessert = CommunityTable::from_interactions([Interaction::new(2, 20, Rating::Dislike)])
            .unwrap();
        let catalog: RecipeCatalog = [recipe(10), recipe(20)].into_iter().collect();

        let store = RatingStore::new(main, dessert, catalog).unwrap();
        assert!(store.table(DishType::Main).has_recipe(10));
        assert!(!store.table(DishType::Main).has_recipe(20));
        assert_eq!(store.table(DishType::Dessert).rating(2, 20), Some(Rating::Dislike));
        assert_eq!(store.recipe(20).map(|r| r.name.as_str()), Some("recipe 20"));
    }
}
