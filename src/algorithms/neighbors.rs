use super::distance::DistanceTable;
use crate::models::{CommunityTable, Neighbor, NeighborSet, RecipeId, UserId};
use std::collections::BTreeSet;
use std::num::NonZeroUsize;

/// Picks the `k` closest community users that still have something to
/// recommend. Equal distances are ordered by ascending user id.
pub fn select(
    distances: &DistanceTable,
    active_user_id: UserId,
    active_rated_ids: &BTreeSet<RecipeId>,
    community: &CommunityTable,
    k: NonZeroUsize,
) -> NeighborSet {
    let mut candidates: Vec<Neighbor> = distances
        .iter()
        .filter(|&(&user_id, _)| user_id != active_user_id)
        .filter(|&(&user_id, _)| has_unrated_recipe(user_id, active_rated_ids, community))
        .map(|(&user_id, &distance)| Neighbor { user_id, distance })
        .collect();

    candidates.sort_unstable_by_key(|n| (n.distance, n.user_id));
    candidates.truncate(k.get());

    NeighborSet::from_sorted(candidates)
}

// Checked against the full history, not the pivot view.
fn has_unrated_recipe(
    user_id: UserId,
    active_rated_ids: &BTreeSet<RecipeId>,
    community: &CommunityTable,
) -> bool {
    community
        .user_ratings(user_id)
        .map_or(false, |row| row.keys().any(|r| !active_rated_ids.contains(r)))
}
