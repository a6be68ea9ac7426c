use super::{Directory, EmojiCatalog, EmojiEntry, LookupError, ProjectSummary, UserSummary};
use async_trait::async_trait;
use derive_new::new;
use serde::Deserialize;

fn any_contains(query: &str, fields: &[&str]) -> bool {
    let query = query.to_lowercase();
    fields.iter().any(|f| f.to_lowercase().contains(&query))
}

/// A fixed set of users and projects
#[derive(Debug, Clone, Default, Deserialize, new)]
pub struct StaticDirectory {
    #[serde(default)]
    pub users: Vec<UserSummary>,
    #[serde(default)]
    pub projects: Vec<ProjectSummary>,
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn search_users(&self, query: &str) -> Result<Vec<UserSummary>, LookupError> {
        Ok(self
            .users
            .iter()
            .filter(|u| any_contains(query, &[u.display_name.as_str(), u.username.as_str()]))
            .cloned()
            .collect())
    }

    async fn search_projects(&self, query: &str) -> Result<Vec<ProjectSummary>, LookupError> {
        Ok(self
            .projects
            .iter()
            .filter(|p| any_contains(query, &[p.name.as_str()]))
            .cloned()
            .collect())
    }
}

/// A fixed emoji list
#[derive(Debug, Clone, Default, Deserialize, new)]
#[serde(transparent)]
pub struct StaticEmojiCatalog {
    pub emoji: Vec<EmojiEntry>,
}

#[async_trait]
impl EmojiCatalog for StaticEmojiCatalog {
    async fn list_emoji(&self) -> Result<Vec<EmojiEntry>, LookupError> {
        Ok(self.emoji.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, name: &str, username: &str) -> UserSummary {
        UserSummary {
            id: id.into(),
            display_name: name.into(),
            username: username.into(),
        }
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let dir = StaticDirectory::new(
            vec![user("u1", "Jane Doe", "jdoe"), user("u2", "Ali", "ali")],
            vec![ProjectSummary {
                id: "p1".into(),
                name: "Janitor bot".into(),
            }],
        );
        let users = dir.search_users("JA").await.unwrap();
        assert_eq!(users, vec![user("u1", "Jane Doe", "jdoe")]);
        assert_eq!(dir.search_users("doe").await.unwrap().len(), 1);
        assert_eq!(dir.search_projects("jan").await.unwrap().len(), 1);
        assert_eq!(dir.search_users("").await.unwrap().len(), 2);
    }
}
