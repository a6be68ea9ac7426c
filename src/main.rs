use cfg_if::cfg_if;
use color_eyre::eyre::WrapErr;
use color_eyre::Report;
use postpad::collab::{CachedDirectory, CachedEmojiCatalog};
use postpad::command::{parse_script, Command};
use postpad::config::{Config, Flags, Subcommand};
use postpad::editor::{Editor, EditorEvent};
use postpad::extract::{
    extract_attachments, extract_mentions, extract_project_mentions, has_content,
    preview_media, render_plain_text,
};
use postpad::session::Session;
use postpad::snapshot::Snapshot;
use postpad::trigger::Suggester;
use postpad::upload::{MemoryStore, Uploader};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use structopt::StructOpt;
use tokio::fs::read_to_string;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

cfg_if! {
    if #[cfg(debug_assertions)] {
        const DEFAULT_FILTER: &str = "warn,postpad=trace";
    } else {
        const DEFAULT_FILTER: &str = "warn,postpad=info";
    }
}

fn install_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish()
        .with(ErrorLayer::default())
        .init();
}

async fn load_snapshot(path: &Path) -> Result<Snapshot, Report> {
    let json = read_to_string(path)
        .await
        .wrap_err_with(|| format!("Could not read {}", path.display()))?;
    Snapshot::from_json(&json).wrap_err("Could not decode snapshot")
}

async fn inspect(path: &Path) -> Result<(), Report> {
    let snapshot = load_snapshot(path).await?;
    let report = json!({
        "attachments": extract_attachments(&snapshot),
        "mentions": extract_mentions(&snapshot),
        "projectMentions": extract_project_mentions(&snapshot),
        "hasContent": has_content(&snapshot),
        "plainText": render_plain_text(&snapshot),
        "previewMedia": preview_media(&snapshot),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn normalize(path: &Path) -> Result<(), Report> {
    let snapshot = load_snapshot(path).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot.to_value())?);
    Ok(())
}

#[cfg(feature = "http")]
fn remote_uploader(config: &Config) -> Option<Uploader> {
    use postpad::upload::HttpUploadService;

    let endpoint = config.upload.endpoint.clone()?;
    info!("Uploading to {}", endpoint);
    let service = Arc::new(HttpUploadService::new(endpoint, config.upload.token.clone()));
    Some(Uploader::new(
        service.clone(),
        service,
        config.upload.policy.clone(),
    ))
}

#[cfg(not(feature = "http"))]
fn remote_uploader(config: &Config) -> Option<Uploader> {
    if config.upload.endpoint.is_some() {
        warn!("Built without the `http` feature, keeping uploads in memory");
    }
    None
}

fn uploader(config: &Config) -> Uploader {
    remote_uploader(config).unwrap_or_else(|| {
        let store = Arc::new(MemoryStore::new("memory://uploads"));
        Uploader::new(store.clone(), store, config.upload.policy.clone())
    })
}

async fn replay(config: &Config, script: &Path, snapshot: Option<&Path>) -> Result<(), Report> {
    let text = read_to_string(script)
        .await
        .wrap_err_with(|| format!("Could not read {}", script.display()))?;
    let commands = parse_script(&text).wrap_err("Invalid script")?;
    let start = match snapshot {
        Some(path) => Some(load_snapshot(path).await?),
        None => None,
    };
    let editor = Editor::from_snapshot(start.as_ref(), config.editor_config())
        .wrap_err("Snapshot is not a valid document")?;

    let directory = Arc::new(CachedDirectory::new(
        config.directory.people.clone(),
        config.freshness(),
    ));
    let emoji = Arc::new(CachedEmojiCatalog::new(
        config.directory.emoji.clone(),
        config.freshness(),
    ));
    let suggester = Suggester::new(directory, emoji, config.editor.max_suggestions);
    let handle = Session::spawn(editor, suggester, uploader(config), config.session_config());

    let mut events = handle.events();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                Ok(EditorEvent::Notice(message)) => warn!("{}", message),
                Ok(EditorEvent::Menu(Some(menu))) => {
                    info!("Suggestions for {:?}: {}", menu.query, menu.items.join(", "))
                }
                Ok(EditorEvent::FilePickerRequested(filter)) => {
                    info!("File picker requested ({:?})", filter)
                }
                Ok(EditorEvent::Submitted(_)) => info!("Submitted"),
                Ok(event) => debug!("{:?}", event),
                Err(err) => warn!("{}", err),
            }
        }
    });

    for command in commands {
        match command {
            Command::Input(event) => handle.send(event).await?,
            Command::Wait(duration) => tokio::time::sleep(duration).await,
        }
    }
    let snapshot = handle.finish().await?;
    printer.await?;
    println!("{}", serde_json::to_string_pretty(&snapshot.to_value())?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Report> {
    install_tracing();
    color_eyre::install()?;

    let flags = Flags::from_args();
    let config = flags.load_cfg().await?;

    match &flags.cmd {
        Subcommand::Inspect { snapshot } => inspect(snapshot).await,
        Subcommand::Normalize { snapshot } => normalize(snapshot).await,
        Subcommand::Replay { script, snapshot } => {
            replay(&config, script, snapshot.as_deref()).await
        }
    }
}
