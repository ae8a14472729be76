use super::{Interaction, Rating, RecipeId, UserId};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("user {user_id} rated recipe {recipe_id} more than once")]
pub struct DuplicateInteraction {
    pub user_id: UserId,
    pub recipe_id: RecipeId,
}

/// Sparse user × recipe rating table. Absent cells are "not rated".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommunityTable {
    users: BTreeMap<UserId, BTreeMap<RecipeId, Rating>>,
    // recipe -> number of users who rated it
    recipes: BTreeMap<RecipeId, usize>,
}

impl CommunityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_interactions<I>(interactions: I) -> Result<Self, DuplicateInteraction>
    where
        I: IntoIterator<Item = Interaction>,
    {
        let mut table = Self::new();
        for interaction in interactions {
            table.insert(interaction)?;
        }
        Ok(table)
    }

    pub fn insert(&mut self, interaction: Interaction) -> Result<(), DuplicateInteraction> {
        let row = self.users.entry(interaction.user_id).or_default();
        if row.contains_key(&interaction.recipe_id) {
            return Err(DuplicateInteraction {
                user_id: interaction.user_id,
                recipe_id: interaction.recipe_id,
            });
        }
        row.insert(interaction.recipe_id, interaction.rating);
        *self.recipes.entry(interaction.recipe_id).or_insert(0) += 1;
        Ok(())
    }

    pub fn user_ratings(&self, user_id: UserId) -> Option<&BTreeMap<RecipeId, Rating>> {
        self.users.get(&user_id)
    }

    pub fn rating(&self, user_id: UserId, recipe_id: RecipeId) -> Option<Rating> {
        self.users.get(&user_id)?.get(&recipe_id).copied()
    }

    pub fn rows(&self) -> &BTreeMap<UserId, BTreeMap<RecipeId, Rating>> {
        &self.users
    }

    pub fn user_ids(&self) -> impl Iterator<Item = UserId> + '_ {
        self.users.keys().copied()
    }

    pub fn recipe_ids(&self) -> impl Iterator<Item = RecipeId> + '_ {
        self.recipes.keys().copied()
    }

    pub fn has_recipe(&self, recipe_id: RecipeId) -> bool {
        self.recipes.contains_key(&recipe_id)
    }

    pub fn recipe_rating_count(&self, recipe_id: RecipeId) -> usize {
        self.recipes.get(&recipe_id).copied().unwrap_or(0)
    }

    pub fn interactions(&self) -> impl Iterator<Item = Interaction> + '_ {
        self.users.iter().flat_map(|(&user_id, row)| {
            row.iter()
                .map(move |(&recipe_id, &rating)| Interaction::new(user_id, recipe_id, rating))
        })
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    pub fn interaction_count(&self) -> usize {
        self.recipes.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// (users, recipes, interactions)
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.user_count(), self.recipe_count(), self.interaction_count())
    }

    pub fn remove_user(&mut self, user_id: UserId) -> bool {
        let Some(row) = self.users.remove(&user_id) else {
            return false;
        };
        for recipe_id in row.keys() {
            self.decrement_recipe(*recipe_id);
        }
        true
    }

    pub fn remove_recipe(&mut self, recipe_id: RecipeId) -> bool {
        if self.recipes.remove(&recipe_id).is_none() {
            return false;
        }
        self.users.retain(|_, row| {
            row.remove(&recipe_id);
            !row.is_empty()
        });
        true
    }

    fn decrement_recipe(&mut self, recipe_id: RecipeId) {
        if let Some(count) = self.recipes.get_mut(&recipe_id) {
            *count -= 1;
            if *count == 0 {
                self.recipes.remove(&recipe_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CommunityTable {
        CommunityTable::from_interactions([
            Interaction::new(1, 101, Rating::Like),
            Interaction::new(2, 102, Rating::Like),
            Interaction::new(3, 103, Rating::Dislike),
            Interaction::new(4, 102, Rating::Like),
            Interaction::new(4, 103, Rating::Like),
        ])
        .unwrap()
    }

    #[test]
    fn test_shape_and_lookup() {
        let table = sample();
        assert_eq!(table.shape(), (4, 3, 5));
        assert_eq!(table.rating(4, 103), Some(Rating::Like));
        assert_eq!(table.rating(1, 103), None);
        assert_eq!(table.recipe_rating_count(102), 2);
        assert_eq!(table.recipe_ids().collect::<Vec<_>>(), vec![101, 102, 103]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut table = sample();
        let err = table.insert(Interaction::new(4, 102, Rating::Dislike)).unwrap_err();
        assert_eq!(err, DuplicateInteraction { user_id: 4, recipe_id: 102 });
    }

    #[test]
    fn test_remove_keeps_counts_consistent() {
        let mut table = sample();
        assert!(table.remove_user(4));
        assert_eq!(table.recipe_rating_count(102), 1);
        assert!(table.remove_recipe(101));
        assert!(table.user_ratings(1).is_none());
        assert_eq!(table.shape(), (2, 2, 2));
        assert!(!table.remove_recipe(101));
    }
}
