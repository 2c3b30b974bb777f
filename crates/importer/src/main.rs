//! `nexus-importer` -- run one bulk import against the Nexus backend.
//!
//! Reads a spreadsheet from disk, uploads it for the chosen import kind,
//! shows the server preview and (optionally) saves the rows in batches.
//! Ctrl-C during the upload abandons it at once; during a batched save it
//! stops the save at the next batch boundary.
//!
//! See [`ImporterSettings`] and [`ClientConfig::from_env`] for the
//! environment variables read.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nexus_client::{
    AccessTokenProvider, ClientConfig, ImportApi, ImportContext, ImportSurface, StaticToken,
    SubmitOutcome,
};
use nexus_core::import::file_check::mime_for_path;
use nexus_core::import::{Outcome, SourceFile};
use nexus_events::{EventBus, EventLogger};
use nexus_importer::render::{render_preview, render_status};
use nexus_importer::settings::ImporterSettings;

/// Preview rows printed before confirming.
const PREVIEW_LIMIT: usize = 20;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = ImporterSettings::from_env()?;
    init_tracing(settings.json_logs);

    let config = Arc::new(ClientConfig::from_env()?);
    let file = read_source(&settings.file).await?;

    tracing::info!(
        kind = settings.kind.as_str(),
        file = %file.name,
        size_bytes = file.size_bytes,
        api_url = %config.api_url,
        batch_size = config.batch_size,
        "Starting nexus-importer",
    );

    let events = Arc::new(EventBus::default());
    let logger = tokio::spawn(EventLogger::run(events.subscribe()));

    let api = Arc::new(ImportApi::new(&config).context("Failed to build HTTP client")?);
    let auth: Arc<dyn AccessTokenProvider> =
        Arc::new(StaticToken::new(settings.access_token.clone()));
    let mut surface = ImportSurface::new(
        settings.kind,
        ImportContext::new(api, auth, config, Arc::clone(&events)),
    );

    let result = run(&mut surface, &settings, file).await;
    println!("{}", render_status(&surface.status()));

    drop(surface);
    drop(events);
    let _ = logger.await;

    result
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "nexus_importer=info,nexus_client=info,nexus_events=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn read_source(path: &Path) -> anyhow::Result<SourceFile> {
    let contents = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(SourceFile::new(name, mime_for_path(path), contents))
}

async fn run(
    surface: &mut ImportSurface<ImportApi>,
    settings: &ImporterSettings,
    file: SourceFile,
) -> anyhow::Result<()> {
    surface.set_term(settings.term.clone())?;
    surface.select_file(Some(file))?;

    // Dropping the upload future fails the session as abandoned.
    let submitted = tokio::select! {
        result = surface.submit() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupt received, abandoning the upload");
            anyhow::bail!("Upload interrupted");
        }
    };

    match submitted {
        SubmitOutcome::Preview { rows } => {
            if let Some(session) = surface.session() {
                println!("{}", render_preview(session.preview(), PREVIEW_LIMIT));
            }
            if !settings.auto_confirm {
                tracing::info!(rows, "Preview only; set IMPORT_AUTO_CONFIRM=true to save");
                return Ok(());
            }
            let outcome = confirm(surface).await?;
            if !outcome.failed_batches.is_empty() {
                tracing::warn!(
                    failed_batches = ?outcome.failed_batches,
                    "Some batches were rejected; re-run with the failed rows after fixing them",
                );
            }
        }
        SubmitOutcome::NothingToPreview => {}
        SubmitOutcome::Saved { records } => {
            tracing::debug!(records, "Saved on upload");
        }
    }
    Ok(())
}

/// Run the batched save, turning Ctrl-C into a cancel at the next batch.
async fn confirm(surface: &mut ImportSurface<ImportApi>) -> anyhow::Result<Outcome> {
    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, stopping after the current batch");
                cancel.cancel();
            }
        }
    });
    let result = surface.confirm(&cancel).await;
    interrupt.abort();
    Ok(result?)
}
