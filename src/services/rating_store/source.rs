use super::{DataError, RecipeCatalog};
use crate::models::*;
use crate::utils::parse_list_literal;
use crate::utils::validation::validate_recipe;
use async_trait::async_trait;
use csv::{ReaderBuilder, Writer};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where a community rating table comes from.
#[async_trait]
pub trait InteractionSource: Send + Sync {
    async fn load_table(&self) -> Result<CommunityTable, DataError>;
}

#[async_trait]
pub trait RecipeSource: Send + Sync {
    async fn load_catalog(&self) -> Result<RecipeCatalog, DataError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct InteractionRow {
    user_id: UserId,
    recipe_id: RecipeId,
    rate: i64,
}

#[derive(Debug, Deserialize)]
struct RecipeRow {
    id: RecipeId,
    name: String,
    #[serde(default)]
    description: String,
    steps: String,
    ingredients: String,
}

/// `user_id,recipe_id,rate` export of the preprocessing job.
#[derive(Debug, Clone)]
pub struct CsvInteractionSource {
    path: PathBuf,
}

impl CsvInteractionSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn parse(&self, bytes: &[u8]) -> Result<CommunityTable, DataError> {
        let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(bytes);
        let mut table = CommunityTable::new();
        let mut skipped = 0usize;

        for (index, row) in reader.deserialize::<InteractionRow>().enumerate() {
            let row = row.map_err(|source| DataError::Csv {
                path: self.path.clone(),
                source,
            })?;
            let rating = Rating::from_raw(row.rate).map_err(|source| DataError::InvalidRating {
                path: self.path.clone(),
                row: index + 1,
                source,
            })?;
            let Some(rating) = rating else {
                skipped += 1;
                continue;
            };
            table
                .insert(Interaction::new(row.user_id, row.recipe_id, rating))
                .map_err(|source| DataError::Duplicate {
                    path: self.path.clone(),
                    source,
                })?;
        }

        if skipped > 0 {
            debug!(path = %self.path.display(), skipped, "Skipped unrated rows");
        }
        Ok(table)
    }
}

#[async_trait]
impl InteractionSource for CsvInteractionSource {
    async fn load_table(&self) -> Result<CommunityTable, DataError> {
        let bytes = read_file(&self.path).await?;
        let table = self.parse(&bytes)?;
        info!(
            path = %self.path.display(),
            users = table.user_count(),
            recipes = table.recipe_count(),
            interactions = table.interaction_count(),
            "Loaded interaction table"
        );
        Ok(table)
    }
}

/// `id,name,steps,description,ingredients` recipe metadata.
#[derive(Debug, Clone)]
pub struct CsvRecipeSource {
    path: PathBuf,
}

impl CsvRecipeSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn parse(&self, bytes: &[u8]) -> Result<RecipeCatalog, DataError> {
        let mut reader = ReaderBuilder::new().from_reader(bytes);
        let mut catalog = RecipeCatalog::new();

        for (index, row) in reader.deserialize::<RecipeRow>().enumerate() {
            let row = row.map_err(|source| DataError::Csv {
                path: self.path.clone(),
                source,
            })?;
            let list = |raw: &str, column: &'static str| {
                parse_list_literal(raw).ok_or_else(|| DataError::MalformedList {
                    path: self.path.clone(),
                    row: index + 1,
                    column,
                })
            };
            let recipe = Recipe {
                id: row.id,
                steps: list(&row.steps, "steps")?,
                ingredients: list(&row.ingredients, "ingredients")?,
                name: row.name,
                description: row.description,
            };
            validate_recipe(&recipe).map_err(|e| DataError::InvalidRecipe {
                path: self.path.clone(),
                row: index + 1,
                message: e.to_string(),
            })?;
            if catalog.insert(recipe).is_some() {
                return Err(DataError::DuplicateRecipe {
                    path: self.path.clone(),
                    recipe_id: row.id,
                });
            }
        }

        Ok(catalog)
    }
}

#[async_trait]
impl RecipeSource for CsvRecipeSource {
    async fn load_catalog(&self) -> Result<RecipeCatalog, DataError> {
        let bytes = read_file(&self.path).await?;
        let catalog = self.parse(&bytes)?;
        info!(path = %self.path.display(), recipes = catalog.len(), "Loaded recipe catalog");
        Ok(catalog)
    }
}

/// Writes `table` back out in the `user_id,recipe_id,rate` layout.
pub fn write_interactions<W: std::io::Write>(
    table: &CommunityTable,
    writer: W,
) -> Result<(), csv::Error> {
    let mut writer = Writer::from_writer(writer);
    for interaction in table.interactions() {
        writer.serialize(InteractionRow {
            user_id: interaction.user_id,
            recipe_id: interaction.recipe_id,
            rate: i64::from(interaction.rating.value()),
        })?;
    }
    writer.flush()?;
    Ok(())
}

async fn read_file(path: &Path) -> Result<Vec<u8>, DataError> {
    tokio::fs::read(path).await.map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// In-memory data, for tests and embedding callers.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    pub interactions: Vec<Interaction>,
    pub recipes: Vec<Recipe>,
}

#[async_trait]
impl InteractionSource for StaticSource {
    async fn load_table(&self) -> Result<CommunityTable, DataError> {
        CommunityTable::from_interactions(self.interactions.iter().copied()).map_err(|source| {
            DataError::Duplicate {
                path: PathBuf::from("<memory>"),
                source,
            }
        })
    }
}

#[async_trait]
impl RecipeSource for StaticSource {
    async fn load_catalog(&self) -> Result<RecipeCatalog, DataError> {
        Ok(self.recipes.iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interactions_skips_unrated() {
        let source = CsvInteractionSource::new("ratings.csv");
        let table = source
            .parse(b"user_id,recipe_id,rate\n1,101,1\n2,101,-1\n3,102,0\n")
            .unwrap();
        assert_eq!(table.shape(), (2, 1, 2));
        assert_eq!(table.rating(2, 101), Some(Rating::Dislike));
    }

    #[test]
    fn test_parse_interactions_rejects_bad_rating() {
        let source = CsvInteractionSource::new("ratings.csv");
        let err = source
            .parse(b"user_id,recipe_id,rate\n1,101,1\n2,101,5\n")
            .unwrap_err();
        assert!(matches!(err, DataError::InvalidRating { row: 2, .. }));
    }

    #[test]
    fn test_parse_interactions_rejects_duplicates() {
        let source = CsvInteractionSource::new("ratings.csv");
        let err = source
            .parse(b"user_id,recipe_id,rate\n1,101,1\n1,101,-1\n")
            .unwrap_err();
        assert!(matches!(err, DataError::Duplicate { .. }));
    }

    #[test]
    fn test_written_table_reloads() {
        let table = CommunityTable::from_interactions([
            Interaction::new(3, 30, Rating::Dislike),
            Interaction::new(1, 10, Rating::Like),
        ])
        .unwrap();
        let mut out = Vec::new();
        write_interactions(&table, &mut out).unwrap();

        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.starts_with("user_id,recipe_id,rate\n1,10,1\n"));
        let reloaded = CsvInteractionSource::new("pruned.csv").parse(&out).unwrap();
        assert_eq!(reloaded.rows(), table.rows());
    }

    #[test]
    fn test_parse_recipes() {
        let source = CsvRecipeSource::new("recipes.csv");
        let csv = "id,name,steps,description,ingredients\n\
                   7,pancakes,\"['mix', 'fry']\",fluffy,\"['flour', 'egg', 'milk']\"\n";
        let catalog = source.parse(csv.as_bytes()).unwrap();
        let recipe = catalog.get(7).unwrap();
        assert_eq!(recipe.name, "pancakes");
        assert_eq!(recipe.steps, vec!["mix", "fry"]);
        assert_eq!(recipe.ingredients.len(), 3);
        assert_eq!(recipe.description, "fluffy");
    }

    #[test]
    fn test_parse_recipes_rejects_bad_list() {
        let source = CsvRecipeSource::new("recipes.csv");
        let csv = "id,name,steps,description,ingredients\n7,pancakes,mix then fry,,[]\n";
        let err = source.parse(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::MalformedList { column: "steps", .. }));
    }
}
