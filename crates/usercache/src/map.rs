//! Sharded concurrent map from user id to user
//!
//! Entries are only ever inserted, never removed. Each operation takes at
//! most one shard lock and never holds it across an await point.

use std::collections::HashMap;
use std::sync::Arc;

use ahash::RandomState;
use parking_lot::RwLock;
use userdb::{User, UserId};

type Shard = RwLock<HashMap<UserId, Arc<User>, RandomState>>;

/// Grow-only map split into independently locked shards
pub struct ShardedMap {
    shards: Box<[Shard]>,
}

impl ShardedMap {
    /// Create a map with `shard_count` shards; one shard is a single global lock
    pub fn new(shard_count: usize) -> Self {
        assert!(shard_count > 0, "Shard count must be greater than 0");

        let shards = (0..shard_count)
            .map(|_| RwLock::new(HashMap::with_hasher(RandomState::new())))
            .collect();

        Self { shards }
    }

    fn shard(&self, id: UserId) -> &Shard {
        let idx = id.rem_euclid(self.shards.len() as UserId) as usize;
        &self.shards[idx]
    }

    /// Get a user if cached
    pub fn get(&self, id: UserId) -> Option<Arc<User>> {
        self.shard(id).read().get(&id).cloned()
    }

    /// Check if a user is cached
    pub fn contains(&self, id: UserId) -> bool {
        self.shard(id).read().contains_key(&id)
    }

    /// Insert a user under its own id
    ///
    /// Re-inserting an id replaces the entry. Values for one id never
    /// differ, so this is a no-op in practice.
    pub fn put(&self, user: Arc<User>) {
        self.shard(user.id).write().insert(user.id, user);
    }

    /// Number of cached users
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    /// Check if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }

    /// Number of shards
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Copy out every cached user, sorted by id
    pub fn snapshot(&self) -> Vec<Arc<User>> {
        let mut users: Vec<_> = self
            .shards
            .iter()
            .flat_map(|shard| shard.read().values().cloned().collect::<Vec<_>>())
            .collect();
        users.sort_unstable_by_key(|user| user.id);
        users
    }
}
