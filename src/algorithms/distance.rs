use super::EngineError;
use crate::models::{CommunityTable, Rating, RecipeId, UserId};
use rayon::prelude::*;
use std::collections::BTreeMap;

pub type DistanceTable = BTreeMap<UserId, u32>;

/// Community ratings restricted to the recipes the active user has rated.
/// Every community user gets a row; unrated cells hold 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotTable {
    columns: Vec<RecipeId>,
    rows: BTreeMap<UserId, Vec<i8>>,
}

impl PivotTable {
    pub fn build(columns: &[RecipeId], community: &CommunityTable) -> Self {
        let rows = community
            .rows()
            .par_iter()
            .map(|(&user_id, ratings)| {
                let cells = columns
                    .iter()
                    .map(|recipe_id| ratings.get(recipe_id).map_or(0, |r| r.value()))
                    .collect();
                (user_id, cells)
            })
            .collect();

        Self {
            columns: columns.to_vec(),
            rows,
        }
    }

    pub fn columns(&self) -> &[RecipeId] {
        &self.columns
    }

    pub fn row(&self, user_id: UserId) -> Option<&[i8]> {
        self.rows.get(&user_id).map(Vec::as_slice)
    }

    pub fn user_count(&self) -> usize {
        self.rows.len()
    }

    /// L1 deviation of every row from `reference`, aligned with `columns`.
    pub fn abs_deviation(&self, reference: &[i8]) -> DistanceTable {
        self.rows
            .par_iter()
            .map(|(&user_id, cells)| (user_id, l1_gap(cells, reference)))
            .collect()
    }
}

fn l1_gap(cells: &[i8], reference: &[i8]) -> u32 {
    cells
        .iter()
        .zip(reference)
        .map(|(a, b)| u32::from((a - b).unsigned_abs()))
        .sum()
}

/// Sum of absolute rating differences between the active user and each
/// community user over the recipes the active user rated. Recipes nobody in
/// the community rated are skipped.
pub fn distance(
    active: &BTreeMap<RecipeId, Rating>,
    community: &CommunityTable,
) -> Result<DistanceTable, EngineError> {
    if active.is_empty() {
        return Err(EngineError::InvalidInput(
            "the active user has not rated any recipe yet".to_string(),
        ));
    }

    let (columns, reference): (Vec<RecipeId>, Vec<i8>) = active
        .iter()
        .filter(|(recipe_id, _)| community.has_recipe(**recipe_id))
        .map(|(&recipe_id, rating)| (recipe_id, rating.value()))
        .unzip();

    let pivot = PivotTable::build(&columns, community);
    Ok(pivot.abs_deviation(&reference))
}
