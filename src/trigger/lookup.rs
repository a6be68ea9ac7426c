use super::commands::SLASH_COMMANDS;
use super::rank::rank_by;
use super::{Suggestion, TriggerKind};
use crate::collab::{Directory, EmojiCatalog, LookupError};
use futures_util::future::try_join;
use std::sync::Arc;
use tracing::debug;

/// Runs typeahead lookups against the collaborators
#[derive(Clone)]
pub struct Suggester {
    directory: Arc<dyn Directory>,
    emoji: Arc<dyn EmojiCatalog>,
    limit: usize,
}

impl Suggester {
    pub fn new(directory: Arc<dyn Directory>, emoji: Arc<dyn EmojiCatalog>, limit: usize) -> Self {
        Self {
            directory,
            emoji,
            limit,
        }
    }

    /// Ranked suggestions for a query, at most `limit` of them
    pub async fn lookup(
        &self,
        kind: TriggerKind,
        query: &str,
    ) -> Result<Vec<Suggestion>, LookupError> {
        let mut items = match kind {
            TriggerKind::Mention => {
                let (users, projects) = try_join(
                    self.directory.search_users(query),
                    self.directory.search_projects(query),
                )
                .await?;
                let users = rank_by(users, query, |u| {
                    vec![u.display_name.as_str(), u.username.as_str()]
                });
                let projects = rank_by(projects, query, |p| vec![p.name.as_str()]);
                users
                    .into_iter()
                    .map(Suggestion::User)
                    .chain(projects.into_iter().map(Suggestion::Project))
                    .collect::<Vec<_>>()
            }
            TriggerKind::Emoji => {
                let all = self.emoji.list_emoji().await?;
                rank_by(all, query, |e| {
                    let mut keys = vec![e.name.as_str()];
                    keys.extend(e.aliases.iter().map(String::as_str));
                    keys
                })
                .into_iter()
                .map(Suggestion::Emoji)
                .collect()
            }
            TriggerKind::Command => {
                rank_by(SLASH_COMMANDS.iter().collect::<Vec<_>>(), query, |c| c.search_keys())
                    .into_iter()
                    .map(Suggestion::Command)
                    .collect()
            }
        };
        items.truncate(self.limit);
        debug!("{} suggestions for {}{}", items.len(), kind.symbol(), query);
        Ok(items)
    }
}
