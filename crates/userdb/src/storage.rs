//! Storage engine implementation
//!
//! The catalog is a fixed table published before first use. Reads take no
//! locks; every fetch through [`UserSource`] suspends for the configured
//! latency to stand in for a real round trip.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ahash::RandomState;
use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::user::{User, UserId};

/// Default catalog size
pub const DEFAULT_USERS: usize = 100;

/// Default simulated round trip (3 ms)
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(3);

/// Slow authoritative source of users
///
/// Implementations must be idempotent: fetching the same id twice yields
/// equal values, so a caller may fetch redundantly without harm.
#[async_trait]
pub trait UserSource: Send + Sync + 'static {
    /// Fetch a user, or [`Error::NotFound`] if the id does not resolve
    async fn fetch(&self, id: UserId) -> Result<Arc<User>>;
}

/// UserStore is the immutable user catalog
#[derive(Debug)]
pub struct UserStore {
    /// id -> user, fixed after construction
    users: HashMap<UserId, Arc<User>, RandomState>,

    /// Simulated round trip per fetch
    latency: Duration,
}

impl UserStore {
    /// Build a catalog holding ids `1..=count` named `User{id}`
    ///
    /// # Arguments
    /// * `count` - Number of users
    /// * `latency` - Delay applied to every [`UserSource::fetch`]
    pub fn generate(count: usize, latency: Duration) -> Self {
        let users = (1..=count as UserId)
            .map(|id| (id, Arc::new(User::generated(id))))
            .collect();

        Self { users, latency }
    }

    /// Build a catalog from explicit records; later duplicates win
    pub fn from_users<I>(users: I, latency: Duration) -> Self
    where
        I: IntoIterator<Item = User>,
    {
        let users = users
            .into_iter()
            .map(|user| (user.id, Arc::new(user)))
            .collect();

        Self { users, latency }
    }

    /// Read an entry without paying the round trip
    pub fn peek(&self, id: UserId) -> Option<&Arc<User>> {
        self.users.get(&id)
    }

    /// All ids in ascending order
    pub fn ids(&self) -> Vec<UserId> {
        let mut ids: Vec<_> = self.users.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Configured round trip
    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Get the number of users in the catalog
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::generate(DEFAULT_USERS, DEFAULT_LATENCY)
    }
}

#[async_trait]
impl UserSource for UserStore {
    async fn fetch(&self, id: UserId) -> Result<Arc<User>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.peek(id).cloned().ok_or(Error::NotFound(id))
    }
}
