//! Freshness caches in front of the search collaborators
use super::{Directory, EmojiCatalog, EmojiEntry, LookupError, ProjectSummary, UserSummary};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug)]
struct Entry<T> {
    fetched: Instant,
    value: T,
}

#[derive(Debug)]
struct Cache<T> {
    freshness: Duration,
    entries: Mutex<HashMap<String, Entry<T>>>,
}

impl<T: Clone> Cache<T> {
    fn new(freshness: Duration) -> Self {
        Self {
            freshness,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a fresh cached value or fetches and stores a new one
    ///
    /// Failed fetches are not stored.
    async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<T, LookupError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, LookupError>>,
    {
        if let Some(entry) = self.entries.lock().await.get(key) {
            if entry.fetched.elapsed() < self.freshness {
                trace!("Cache hit for {:?}", key);
                return Ok(entry.value.clone());
            }
        }
        let value = fetch().await?;
        self.entries.lock().await.insert(
            key.to_owned(),
            Entry {
                fetched: Instant::now(),
                value: value.clone(),
            },
        );
        Ok(value)
    }
}

/// A [`Directory`] that reuses results for the same query within a window
#[derive(Debug)]
pub struct CachedDirectory<D> {
    inner: D,
    users: Cache<Vec<UserSummary>>,
    projects: Cache<Vec<ProjectSummary>>,
}

impl<D: Directory> CachedDirectory<D> {
    pub fn new(inner: D, freshness: Duration) -> Self {
        Self {
            inner,
            users: Cache::new(freshness),
            projects: Cache::new(freshness),
        }
    }
}

#[async_trait]
impl<D: Directory> Directory for CachedDirectory<D> {
    async fn search_users(&self, query: &str) -> Result<Vec<UserSummary>, LookupError> {
        let key = query.to_lowercase();
        self.users
            .get_or_fetch(&key, || self.inner.search_users(query))
            .await
    }

    async fn search_projects(&self, query: &str) -> Result<Vec<ProjectSummary>, LookupError> {
        let key = query.to_lowercase();
        self.projects
            .get_or_fetch(&key, || self.inner.search_projects(query))
            .await
    }
}

/// An [`EmojiCatalog`] that fetches the full list at most once per window
#[derive(Debug)]
pub struct CachedEmojiCatalog<C> {
    inner: C,
    list: Cache<Vec<EmojiEntry>>,
}

impl<C: EmojiCatalog> CachedEmojiCatalog<C> {
    pub fn new(inner: C, freshness: Duration) -> Self {
        Self {
            inner,
            list: Cache::new(freshness),
        }
    }
}

#[async_trait]
impl<C: EmojiCatalog> EmojiCatalog for CachedEmojiCatalog<C> {
    async fn list_emoji(&self) -> Result<Vec<EmojiEntry>, LookupError> {
        self.list.get_or_fetch("", || self.inner.list_emoji()).await
    }
}
