//! # Configuration

use crate::collab::{StaticDirectory, StaticEmojiCatalog};
use crate::editor::EditorConfig;
use crate::session::SessionConfig;
use crate::upload::UploadPolicy;
use color_eyre::eyre::WrapErr;
use color_eyre::Report;
use serde::{de, Deserialize, Deserializer};
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use structopt::StructOpt;
use tokio::fs::read_to_string;
use tracing::instrument;

/// The commandline flags
#[derive(Debug, StructOpt)]
#[structopt(name = "postpad", about = "Inspect, normalize and replay post body snapshots")]
pub struct Flags {
    /// Which config file to use
    #[structopt(long = "cfg", short = "c")]
    pub cfg: Option<PathBuf>,
    #[structopt(subcommand)]
    pub cmd: Subcommand,
}

#[derive(Debug, StructOpt)]
pub enum Subcommand {
    /// Print the attachments, mentions and previews of a snapshot as JSON
    Inspect {
        /// The snapshot file
        snapshot: PathBuf,
    },
    /// Decode and re-encode a snapshot
    Normalize {
        /// The snapshot file
        snapshot: PathBuf,
    },
    /// Drive an editing session from a command script
    Replay {
        /// One `kind|arg` command per line
        script: PathBuf,
        /// The snapshot to start from, an empty document otherwise
        #[structopt(long = "snapshot", short = "s")]
        snapshot: Option<PathBuf>,
    },
}

impl Flags {
    #[instrument]
    /// Load the configuration from a file
    pub async fn load_cfg(&self) -> Result<Config, Report> {
        if let Some(cfg) = &self.cfg {
            let cfg_string: String = read_to_string(cfg)
                .await
                .wrap_err("Could not read config file")?;
            let config: Config =
                toml::from_str(&cfg_string).wrap_err("Could not parse config file")?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_max_suggestions() -> usize {
    10
}

fn default_freshness_secs() -> u64 {
    300
}

/// The `[editor]` options
#[derive(Debug, Clone, Deserialize)]
pub struct EditorSection {
    /// Quiet time before a typeahead lookup runs
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// How many suggestions the menu shows at most
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
    #[serde(default)]
    pub submit_on_enter: bool,
}

impl Default for EditorSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            max_suggestions: default_max_suggestions(),
            submit_on_enter: false,
        }
    }
}

/// The `[catalog]` options
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSection {
    /// How long directory and emoji results are reused
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            freshness_secs: default_freshness_secs(),
        }
    }
}

/// The `[upload]` options
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadSection {
    #[serde(flatten)]
    pub policy: UploadPolicy,
    /// Where upload slots are requested; files are kept in memory without it
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// The `[directory]` options
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectorySection {
    #[serde(flatten)]
    pub people: StaticDirectory,
    #[serde(default)]
    pub emoji: StaticEmojiCatalog,
}

/// A configuration for the system
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub editor: EditorSection,
    #[serde(default)]
    pub catalog: CatalogSection,
    #[serde(default)]
    pub upload: UploadSection,
    #[serde(default)]
    pub directory: DirectorySection,
}

impl Config {
    pub fn editor_config(&self) -> EditorConfig {
        EditorConfig {
            max_suggestions: self.editor.max_suggestions,
            submit_on_enter: self.editor.submit_on_enter,
            upload: self.upload.policy.clone(),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            debounce: Duration::from_millis(self.editor.debounce_ms),
            ..SessionConfig::default()
        }
    }

    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.catalog.freshness_secs)
    }
}

// You can use this deserializer for any type that implements FromStr
// and the FromStr::Err implements Display
pub(crate) fn deserialize_from_str<'de, S, D>(deserializer: D) -> Result<S, D::Error>
where
    S: FromStr,      // Required for S::from_str...
    S::Err: Display, // Required for .map_err(de::Error::custom)
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    S::from_str(&s).map_err(de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::{MimePattern, PendingFile, MAX_UPLOAD_BYTES};

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.editor.debounce_ms, 300);
        assert_eq!(config.editor.max_suggestions, 10);
        assert!(!config.editor.submit_on_enter);
        assert_eq!(config.freshness(), Duration::from_secs(300));
        assert_eq!(config.upload.policy.max_bytes, MAX_UPLOAD_BYTES);
        assert!(config.upload.endpoint.is_none());
        assert!(config.directory.people.users.is_empty());
    }

    #[test]
    fn test_full_file() {
        let config: Config = toml::from_str(
            r#"
            [editor]
            debounce_ms = 150
            submit_on_enter = true

            [catalog]
            freshness_secs = 60

            [upload]
            max_bytes = 1024
            allowed_types = ["image/*", "application/pdf"]
            endpoint = "https://api.example/uploads"

            [[directory.users]]
            id = "u1"
            display_name = "Jane Doe"
            username = "jane"

            [[directory.projects]]
            id = "p1"
            name = "Roadmap"

            [[directory.emoji]]
            name = "tada"
            aliases = ["party"]
            url = "https://cdn.example/tada.png"
            "#,
        )
        .unwrap();

        assert_eq!(config.session_config().debounce, Duration::from_millis(150));
        assert!(config.editor_config().submit_on_enter);
        assert_eq!(config.freshness(), Duration::from_secs(60));
        assert_eq!(
            config.upload.policy.allowed,
            [
                MimePattern::TopLevel("image".into()),
                MimePattern::Exact("application/pdf".into())
            ]
        );
        assert_eq!(
            config.upload.endpoint.as_deref(),
            Some("https://api.example/uploads")
        );
        let policy = config.editor_config().upload;
        assert!(policy
            .check(&PendingFile::new("a.zip", "application/zip", vec![0]))
            .is_err());
        assert_eq!(config.directory.people.users[0].display_name, "Jane Doe");
        assert_eq!(config.directory.people.projects[0].name, "Roadmap");
        assert_eq!(config.directory.emoji.emoji[0].aliases, ["party"]);
    }
}
