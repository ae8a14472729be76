use crate::models::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// `None` for an anonymous active user.
    pub user_id: Option<UserId>,
    pub label: String,
    pub active: bool,
}

impl GraphNode {
    fn active(user_id: UserId) -> Self {
        Self {
            user_id: (user_id != ANONYMOUS_USER_ID).then_some(user_id),
            label: "you".to_string(),
            active: true,
        }
    }

    fn neighbor(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            label: format!("user: {}", user_id),
            active: false,
        }
    }
}

/// Edge from the active user to one neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub target: UserId,
    pub distance: u32,
    pub common_likes: usize,
    pub common_dislikes: usize,
    pub remaining_recommendable: usize,
}

/// Users connected by a shared opinion of one polarity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationGraph {
    pub polarity: Rating,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl RelationGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// No edges at all. A valid state, e.g. "no common dislikes".
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn has_edge(&self, neighbor_id: UserId) -> bool {
        self.edges.iter().any(|e| e.target == neighbor_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborGraphs {
    pub likes: RelationGraph,
    pub dislikes: RelationGraph,
}

/// Overlap between the active user and every neighbor, in neighbor order.
pub fn summarize(
    neighbors: &NeighborSet,
    profile: &ActiveUserProfile,
    community: &CommunityTable,
) -> Vec<NeighborSummary> {
    let active = profile.ratings();

    neighbors
        .iter()
        .map(|neighbor| {
            let mut summary = NeighborSummary {
                user_id: neighbor.user_id,
                common_likes: 0,
                common_dislikes: 0,
                remaining_recommendable: 0,
            };
            let Some(row) = community.user_ratings(neighbor.user_id) else {
                return summary;
            };
            for (recipe_id, theirs) in row {
                match active.get(recipe_id) {
                    Some(ours) if ours == theirs && *ours == Rating::Like => summary.common_likes += 1,
                    Some(ours) if ours == theirs => summary.common_dislikes += 1,
                    Some(_) => {}
                    None => summary.remaining_recommendable += 1,
                }
            }
            summary
        })
        .collect()
}

pub fn build(
    neighbors: &NeighborSet,
    profile: &ActiveUserProfile,
    community: &CommunityTable,
) -> NeighborGraphs {
    let mut nodes = Vec::with_capacity(neighbors.len() + 1);
    nodes.push(GraphNode::active(profile.user_id));
    nodes.extend(neighbors.iter().map(|n| GraphNode::neighbor(n.user_id)));

    let mut likes = RelationGraph {
        polarity: Rating::Like,
        nodes: nodes.clone(),
        edges: Vec::new(),
    };
    let mut dislikes = RelationGraph {
        polarity: Rating::Dislike,
        nodes,
        edges: Vec::new(),
    };

    let summaries = summarize(neighbors, profile, community);
    for (neighbor, summary) in neighbors.iter().zip(summaries) {
        let edge = GraphEdge {
            target: neighbor.user_id,
            distance: neighbor.distance,
            common_likes: summary.common_likes,
            common_dislikes: summary.common_dislikes,
            remaining_recommendable: summary.remaining_recommendable,
        };
        if summary.common_likes > 0 {
            likes.edges.push(edge);
        }
        if summary.common_dislikes > 0 {
            dislikes.edges.push(edge);
        }
    }

    NeighborGraphs { likes, dislikes }
}
