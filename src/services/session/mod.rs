use crate::models::*;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(Uuid),
    #[error("recipe {recipe_id} is not in the preferences of session {session_id}")]
    NotRated { session_id: Uuid, recipe_id: RecipeId },
}

#[derive(Debug, Clone)]
pub struct Session {
    pub profile: ActiveUserProfile,
    /// Neighbors behind the last suggestion; cleared whenever the ratings change.
    pub last_neighbors: Option<NeighborSet>,
    /// Any access counts as activity, reads included.
    pub last_active: DateTime<Utc>,
}

/// One profile per session. Each entry has a single writer at a time.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<Uuid, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, dish: DishType, user_id: Option<UserId>) -> ActiveUserProfile {
        let mut profile = ActiveUserProfile::new(dish);
        if let Some(user_id) = user_id {
            profile = profile.with_user_id(user_id);
        }

        self.sessions.insert(
            profile.session_id,
            Session {
                last_active: profile.created_at,
                profile: profile.clone(),
                last_neighbors: None,
            },
        );
        info!("Created {} session {}", dish, profile.session_id);
        profile
    }

    pub fn profile(&self, session_id: Uuid) -> Result<ActiveUserProfile, SessionError> {
        self.with_session(session_id, |s| s.profile.clone())
    }

    pub fn with_session<R>(
        &self,
        session_id: Uuid,
        f: impl FnOnce(&Session) -> R,
    ) -> Result<R, SessionError> {
        self.with_session_mut(session_id, |session| f(session))
    }

    pub fn with_session_mut<R>(
        &self,
        session_id: Uuid,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Result<R, SessionError> {
        let mut session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(SessionError::NotFound(session_id))?;
        session.last_active = Utc::now();
        Ok(f(&mut session))
    }

    /// Likes or dislikes a recipe, replacing any earlier opinion on it.
    pub fn rate(
        &self,
        session_id: Uuid,
        recipe_id: RecipeId,
        rating: Rating,
    ) -> Result<Option<Rating>, SessionError> {
        self.with_session_mut(session_id, |session| {
            session.last_neighbors = None;
            let previous = session.profile.rate(recipe_id, rating);
            debug!(%session_id, recipe_id, ?rating, ?previous, "Rated recipe");
            previous
        })
    }

    pub fn unrate(&self, session_id: Uuid, recipe_id: RecipeId) -> Result<Rating, SessionError> {
        self.with_session_mut(session_id, |session| {
            let removed = session.profile.unrate(recipe_id);
            if removed.is_some() {
                session.last_neighbors = None;
            }
            removed
        })?
        .ok_or(SessionError::NotRated {
            session_id,
            recipe_id,
        })
    }

    /// Keeps `neighbors` for the graph view, unless the profile changed since
    /// `snapshot` was taken.
    pub fn remember_neighbors(
        &self,
        snapshot: &ActiveUserProfile,
        neighbors: NeighborSet,
    ) -> Result<bool, SessionError> {
        self.with_session_mut(snapshot.session_id, |session| {
            if session.profile.revision != snapshot.revision {
                return false;
            }
            session.last_neighbors = Some(neighbors);
            true
        })
    }

    pub fn remove(&self, session_id: Uuid) -> bool {
        let removed = self.sessions.remove(&session_id).is_some();
        if removed {
            info!("Closed session {}", session_id);
        }
        removed
    }

    /// Drops sessions with no activity for longer than `max_idle`.
    pub fn evict_idle(&self, max_idle: Duration, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| now.signed_duration_since(session.last_active) <= max_idle);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            info!("Evicted {} idle sessions", evicted);
        }
        evicted
    }

    /// Runs [`evict_idle`](Self::evict_idle) every `every` until the store is dropped.
    pub fn spawn_eviction(
        self: &Arc<Self>,
        max_idle: Duration,
        every: std::time::Duration,
    ) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                store.evict_idle(max_idle, Utc::now());
            }
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_overwrites_and_clears_neighbors() {
        let store = SessionStore::new();
        let profile = store.create(DishType::Main, None);
        let id = profile.session_id;

        assert_eq!(store.rate(id, 101, Rating::Like).unwrap(), None);
        let snapshot = store.profile(id).unwrap();
        assert!(store.remember_neighbors(&snapshot, NeighborSet::default()).unwrap());
        assert!(store.with_session(id, |s| s.last_neighbors.is_some()).unwrap());

        assert_eq!(store.rate(id, 101, Rating::Dislike).unwrap(), Some(Rating::Like));
        assert!(store.with_session(id, |s| s.last_neighbors.is_none()).unwrap());
        assert_eq!(store.profile(id).unwrap().len(), 1);
    }

    #[test]
    fn test_stale_neighbors_are_dropped() {
        let store = SessionStore::new();
        let id = store.create(DishType::Dessert, Some(12)).session_id;
        store.rate(id, 1, Rating::Like).unwrap();
        let stale = store.profile(id).unwrap();

        store.rate(id, 2, Rating::Like).unwrap();
        assert!(!store.remember_neighbors(&stale, NeighborSet::default()).unwrap());
    }

    #[test]
    fn test_unrate_missing_recipe() {
        let store = SessionStore::new();
        let id = store.create(DishType::Main, None).session_id;
        assert_eq!(
            store.unrate(id, 999),
            Err(SessionError::NotRated {
                session_id: id,
                recipe_id: 999
            })
        );
    }

    #[test]
    fn test_evict_idle_drops_backdated_sessions() {
        let store = SessionStore::new();
        let stale = store.create(DishType::Main, None).session_id;
        let fresh = store.create(DishType::Main, None).session_id;
        store.rate(stale, 1, Rating::Like).unwrap();

        if let Some(mut session) = store.sessions.get_mut(&stale) {
            session.last_active = Utc::now() - Duration::hours(2);
        }

        assert_eq!(store.evict_idle(Duration::hours(1), Utc::now()), 1);
        assert_eq!(store.profile(stale).unwrap_err(), SessionError::NotFound(stale));
        assert!(store.profile(fresh).is_ok());
        assert_eq!(store.evict_idle(Duration::hours(1), Utc::now()), 0);
    }

    #[test]
    fn test_reads_count_as_activity() {
        let store = SessionStore::new();
        let id = store.create(DishType::Dessert, None).session_id;
        if let Some(mut session) = store.sessions.get_mut(&id) {
            session.last_active = Utc::now() - Duration::hours(2);
        }

        store.profile(id).unwrap();
        assert_eq!(store.evict_idle(Duration::hours(1), Utc::now()), 0);
    }

    #[tokio::test]
    async fn test_eviction_task_stops_with_store() {
        let store = Arc::new(SessionStore::new());
        let id = store.create(DishType::Main, None).session_id;
        if let Some(mut session) = store.sessions.get_mut(&id) {
            session.last_active = Utc::now() - Duration::hours(2);
        }

        let handle = store.spawn_eviction(Duration::hours(1), std::time::Duration::from_millis(10));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(store.is_empty());

        drop(store);
        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_sessions_are_independent() {
        let store = SessionStore::new();
        let a = store.create(DishType::Main, None).session_id;
        let b = store.create(DishType::Main, None).session_id;
        store.rate(a, 5, Rating::Like).unwrap();

        assert_eq!(store.profile(a).unwrap().len(), 1);
        assert!(store.profile(b).unwrap().is_empty());
        assert!(store.remove(a));
        assert_eq!(store.profile(a).unwrap_err(), SessionError::NotFound(a));
        assert_eq!(store.len(), 1);
    }
}
