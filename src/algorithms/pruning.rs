use crate::models::{CommunityTable, RecipeId, UserId};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneThresholds {
    pub min_ratings_per_user: usize,
    pub min_ratings_per_recipe: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneReport {
    pub passes: usize,
    pub users_removed: usize,
    pub recipes_removed: usize,
    pub interactions_removed: usize,
}

/// Drops under-rated recipes and users until a pass removes nothing.
///
/// Every pass that changes the table removes at least one interaction, and
/// the table is finite, so the loop ends; an unchanged shape after a pass
/// means no row is left below either threshold.
pub fn prune(table: &mut CommunityTable, thresholds: PruneThresholds) -> PruneReport {
    let mut report = PruneReport::default();
    let (initial_users, initial_recipes, initial_interactions) = table.shape();

    loop {
        let before = table.shape();
        report.passes += 1;

        let sparse_recipes: Vec<RecipeId> = table
            .recipe_ids()
            .filter(|&r| table.recipe_rating_count(r) < thresholds.min_ratings_per_recipe)
            .collect();
        for recipe_id in &sparse_recipes {
            table.remove_recipe(*recipe_id);
        }

        let sparse_users: Vec<UserId> = table
            .rows()
            .iter()
            .filter(|(_, row)| row.len() < thresholds.min_ratings_per_user)
            .map(|(&user_id, _)| user_id)
            .collect();
        for user_id in &sparse_users {
            table.remove_user(*user_id);
        }

        debug!(
            pass = report.passes,
            recipes = sparse_recipes.len(),
            users = sparse_users.len(),
            "Pruning pass"
        );

        if table.shape() == before {
            break;
        }
    }

    // Rows and columns emptied as a side effect count as removed too.
    let (users, recipes, interactions) = table.shape();
    report.users_removed = initial_users - users;
    report.recipes_removed = initial_recipes - recipes;
    report.interactions_removed = initial_interactions - interactions;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Interaction, Rating};

    #[test]
    fn test_cascade_reaches_fixed_point() {
        // Dropping recipe 3 leaves user 2 with a single rating, which in turn
        // leaves recipe 2 with a single rating.
        let mut table = CommunityTable::from_interactions([
            Interaction::new(1, 1, Rating::Like),
            Interaction::new(1, 2, Rating::Like),
            Interaction::new(2, 2, Rating::Dislike),
            Interaction::new(2, 3, Rating::Like),
            Interaction::new(3, 1, Rating::Like),
            Interaction::new(3, 4, Rating::Like),
            Interaction::new(4, 1, Rating::Dislike),
            Interaction::new(4, 4, Rating::Like),
        ])
        .unwrap();

        let report = prune(
            &mut table,
            PruneThresholds {
                min_ratings_per_user: 2,
                min_ratings_per_recipe: 2,
            },
        );

        assert_eq!(table.user_ids().collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(table.recipe_ids().collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(report.interactions_removed, 4);
        assert_eq!(report.users_removed, 2);
        assert_eq!(report.recipes_removed, 2);
        assert!(report.passes >= 2);

        let again = prune(
            &mut table,
            PruneThresholds {
                min_ratings_per_user: 2,
                min_ratings_per_recipe: 2,
            },
        );
        assert_eq!(again.passes, 1);
        assert_eq!(again.interactions_removed, 0);
    }

    #[test]
    fn test_zero_thresholds_keep_everything() {
        let mut table =
            CommunityTable::from_interactions([Interaction::new(1, 1, Rating::Like)]).unwrap();
        let report = prune(
            &mut table,
            PruneThresholds {
                min_ratings_per_user: 0,
                min_ratings_per_recipe: 0,
            },
        );
        assert_eq!(report, PruneReport { passes: 1, ..Default::default() });
        assert_eq!(table.shape(), (1, 1, 1));
    }
}
