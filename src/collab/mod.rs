//! # External collaborators
//!
//! The editor looks up people, projects and emoji through the traits in this
//! module. Implementations live elsewhere (a backend client, a cache, or the
//! in-memory tables used by the command line tool and the tests).
mod cache;
mod memory;

pub use cache::{CachedDirectory, CachedEmojiCatalog};
pub use memory::{StaticDirectory, StaticEmojiCatalog};

use async_trait::async_trait;
use displaydoc::Display;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Error from a search collaborator
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Search is unavailable: {0}
    Unavailable(String),
    /// Search timed out
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
}

/// A custom or built-in emoji
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmojiEntry {
    /// Short name, as in `:name:`
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Image the emoji renders as
    #[serde(default)]
    pub url: String,
}

/// Read-only search over the people and projects of the workspace
#[async_trait]
pub trait Directory: Send + Sync {
    async fn search_users(&self, query: &str) -> Result<Vec<UserSummary>, LookupError>;

    async fn search_projects(&self, query: &str) -> Result<Vec<ProjectSummary>, LookupError>;
}

/// The list of emoji that can be inserted
#[async_trait]
pub trait EmojiCatalog: Send + Sync {
    async fn list_emoji(&self) -> Result<Vec<EmojiEntry>, LookupError>;
}

#[async_trait]
impl<T: Directory + ?Sized> Directory for Arc<T> {
    async fn search_users(&self, query: &str) -> Result<Vec<UserSummary>, LookupError> {
        (**self).search_users(query).await
    }

    async fn search_projects(&self, query: &str) -> Result<Vec<ProjectSummary>, LookupError> {
        (**self).search_projects(query).await
    }
}

#[async_trait]
impl<T: EmojiCatalog + ?Sized> EmojiCatalog for Arc<T> {
    async fn list_emoji(&self) -> Result<Vec<EmojiEntry>, LookupError> {
        (**self).list_emoji().await
    }
}
