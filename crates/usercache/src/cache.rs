//! UserCache: read-through cache wrapping a UserSource

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ahash::RandomState;
use parking_lot::Mutex;
use tokio::sync::{Mutex as SlotLock, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::debug;
use userdb::{parse_user_id, User, UserId, UserSource, UserStore};

use crate::error::LookupError;
use crate::map::ShardedMap;
use crate::stats::CacheStats;

/// Default number of cache shards
pub const DEFAULT_SHARDS: usize = 16;

/// What happens when several callers miss on the same id at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPolicy {
    /// Every miss fetches on its own; `misses` counts fetch attempts
    Independent,
    /// Misses on one id share a single in-flight fetch; `misses` counts
    /// distinct ids loaded
    #[default]
    Coalesced,
}

impl FetchPolicy {
    /// Lowercase name, as accepted by [`FromStr`]
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchPolicy::Independent => "independent",
            FetchPolicy::Coalesced => "coalesced",
        }
    }
}

impl fmt::Display for FetchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "independent" => Ok(FetchPolicy::Independent),
            "coalesced" => Ok(FetchPolicy::Coalesced),
            other => Err(format!(
                "unknown fetch policy '{}' (expected 'independent' or 'coalesced')",
                other
            )),
        }
    }
}

/// Cache construction options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Number of lock shards; 1 means a single lock over the whole map
    pub shards: usize,
    /// Miss handling policy
    pub policy: FetchPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            shards: DEFAULT_SHARDS,
            policy: FetchPolicy::default(),
        }
    }
}

/// Result a leader hands to the callers waiting on its slot
type Outcome = Result<Arc<User>, LookupError>;

/// Per-id lock held by the leader for the duration of its fetch; holds the
/// outcome once published
type Slot = Arc<SlotLock<Option<Outcome>>>;

type InFlight = Mutex<HashMap<UserId, Slot, RandomState>>;

/// Leader's hold on a slot
///
/// Dropping it, including on unwind, takes the slot out of the in-flight
/// table before releasing the lock, so later cold lookups start fresh.
struct SlotLease {
    id: UserId,
    slot: Slot,
    inflight: Arc<InFlight>,
    guard: OwnedMutexGuard<Option<Outcome>>,
}

impl SlotLease {
    fn publish(&mut self, outcome: Outcome) {
        *self.guard = Some(outcome);
    }
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        let mut slots = self.inflight.lock();
        if slots
            .get(&self.id)
            .is_some_and(|current| Arc::ptr_eq(current, &self.slot))
        {
            slots.remove(&self.id);
        }
    }
}

/// Read-through cache combining a sharded map with a slow [`UserSource`]
///
/// Cloning is cheap and every clone shares the same cache, counters and
/// store.
pub struct UserCache<S: UserSource = UserStore> {
    /// Authoritative storage
    store: Arc<S>,

    /// Lazily populated mirror of the store
    cache: Arc<ShardedMap>,

    /// Fetches currently running under the coalesced policy
    inflight: Arc<InFlight>,

    /// Lookup statistics
    stats: Arc<CacheStats>,

    policy: FetchPolicy,
}

impl<S: UserSource> Clone for UserCache<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            inflight: Arc::clone(&self.inflight),
            stats: Arc::clone(&self.stats),
            policy: self.policy,
        }
    }
}

impl<S: UserSource> UserCache<S> {
    /// Create an empty cache in front of `store`
    ///
    /// # Arguments
    /// * `store` - Backing source, shared with any other holders
    /// * `config` - Shard count and miss policy
    pub fn new(store: Arc<S>, config: CacheConfig) -> Self {
        Self {
            store,
            cache: Arc::new(ShardedMap::new(config.shards)),
            inflight: Arc::new(Mutex::new(HashMap::with_hasher(RandomState::new()))),
            stats: Arc::new(CacheStats::new()),
            policy: config.policy,
        }
    }

    /// Look up a user from a raw request parameter
    ///
    /// # Returns
    /// * `Err(LookupError::InvalidId)` - `raw` is not an integer
    /// * otherwise whatever [`UserCache::get`] returns
    pub async fn get_by_id(&self, raw: &str) -> Result<Arc<User>, LookupError> {
        let id = parse_user_id(raw).map_err(|err| {
            self.stats.record_invalid();
            debug!(%err, "rejected user id");
            LookupError::from(err)
        })?;

        self.get(id).await
    }

    /// Get a user from cache or storage
    ///
    /// A successful store fetch populates the cache and bumps the miss
    /// counter once. A not-found id leaves both untouched.
    pub async fn get(&self, id: UserId) -> Result<Arc<User>, LookupError> {
        if let Some(user) = self.cache.get(id) {
            self.stats.record_hit();
            return Ok(user);
        }

        let result = match self.policy {
            FetchPolicy::Independent => self.fetch_independent(id).await,
            FetchPolicy::Coalesced => self.fetch_coalesced(id).await,
        };

        if matches!(result, Err(LookupError::NotFound)) {
            self.stats.record_not_found();
            debug!(user_id = id, "user not in store");
        }

        result
    }

    async fn fetch_independent(&self, id: UserId) -> Result<Arc<User>, LookupError> {
        debug!(user_id = id, "cache miss, fetching");
        self.spawn_fetch(id, None).await?
    }

    async fn fetch_coalesced(&self, id: UserId) -> Result<Arc<User>, LookupError> {
        let slot = self.slot(id);
        let guard = Arc::clone(&slot).lock_owned().await;

        // The leader we waited on published its outcome, found or not
        if let Some(outcome) = &*guard {
            if outcome.is_ok() {
                self.stats.record_coalesced();
            }
            debug!(user_id = id, "served by in-flight fetch");
            return outcome.clone();
        }

        // A slot retired before we got here may still have loaded it
        if let Some(user) = self.cache.get(id) {
            drop(guard);
            self.stats.record_coalesced();
            debug!(user_id = id, "served by completed fetch");
            return Ok(user);
        }

        debug!(user_id = id, "cache miss, leading fetch");
        let lease = SlotLease {
            id,
            slot,
            inflight: Arc::clone(&self.inflight),
            guard,
        };
        self.spawn_fetch(id, Some(lease)).await?
    }

    fn slot(&self, id: UserId) -> Slot {
        let mut inflight = self.inflight.lock();
        Arc::clone(
            inflight
                .entry(id)
                .or_insert_with(|| Arc::new(SlotLock::new(None))),
        )
    }

    /// Fetch and populate on a detached task so the cache is filled even if
    /// the caller is dropped mid-fetch. A lease, if given, gets the outcome
    /// published and is released only after the cache holds the result.
    fn spawn_fetch(&self, id: UserId, lease: Option<SlotLease>) -> JoinHandle<Outcome> {
        let store = Arc::clone(&self.store);
        let cache = Arc::clone(&self.cache);
        let stats = Arc::clone(&self.stats);

        tokio::spawn(async move {
            let mut lease = lease;
            let result = store.fetch(id).await.map_err(LookupError::from);

            if let Ok(user) = &result {
                cache.put(Arc::clone(user));
                stats.record_miss();
            }

            if let Some(lease) = lease.as_mut() {
                lease.publish(result.clone());
            }
            drop(lease);

            result
        })
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Backing-store fetches performed so far
    pub fn misses(&self) -> u64 {
        self.stats.misses()
    }

    /// Miss policy in effect
    pub fn policy(&self) -> FetchPolicy {
        self.policy
    }

    /// Get current cache size
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Number of cache shards
    pub fn shard_count(&self) -> usize {
        self.cache.shard_count()
    }

    /// Check whether an id has been loaded
    pub fn is_cached(&self, id: UserId) -> bool {
        self.cache.contains(id)
    }

    /// Every cached user, sorted by id
    pub fn cached(&self) -> Vec<Arc<User>> {
        self.cache.snapshot()
    }

    /// Backing store handle
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

impl UserCache<UserStore> {
    /// Get the number of users in storage
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if storage is empty
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
