//! neuro-galaxy API server.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use galaxy_api::{cors_layer, router, AppState, ServerConfig};
use galaxy_core::{EmbeddingBackend, GenerationBackend, NoteRepository};
use galaxy_inference::OllamaBackend;
use galaxy_layout::{GalaxyPipeline, PipelineConfig};
use galaxy_store::FileNoteStore;

const DEFAULT_LOG_FILTER: &str = "galaxy_api=debug,galaxy_layout=debug,tower_http=debug";

/// Log output settings.
///
/// - `LOG_FORMAT`: `json` or `text` (default: text)
/// - `LOG_FILE`: daily-rotated log file instead of stdout
/// - `LOG_ANSI`: force ANSI colors on or off (default: on for stdout, off for files)
/// - `RUST_LOG`: filter directives
#[derive(Debug, Default, PartialEq)]
struct LogSettings {
    json: bool,
    file: Option<PathBuf>,
    ansi: Option<bool>,
}

impl LogSettings {
    fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            json: lookup("LOG_FORMAT").is_some_and(|f| f.trim().eq_ignore_ascii_case("json")),
            file: lookup("LOG_FILE")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            ansi: lookup("LOG_ANSI").map(|v| matches!(v.trim(), "true" | "1")),
        }
    }
}

/// Install the global subscriber. The returned guard flushes the file writer
/// on drop and must live as long as the process logs.
fn init_tracing(settings: &LogSettings) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let (writer, guard) = match &settings.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .and_then(|f| f.to_str())
                .unwrap_or("galaxy-api.log");
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };
    let ansi = settings.ansi.unwrap_or(settings.file.is_none());

    let registry = tracing_subscriber::registry().with(filter);
    if settings.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_ansi(ansi).with_writer(writer))
            .init();
    }
    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let logging = LogSettings::from_env();
    let _log_guard = init_tracing(&logging);
    info!(
        json = logging.json,
        log_file = %logging.file.as_deref().map_or("(stdout)".into(), |p| p.display().to_string()),
        "Logging initialized"
    );

    let server = ServerConfig::from_env();
    let layout = PipelineConfig::from_env();

    // The embedding model must be reachable before serving anything.
    let ollama = Arc::new(OllamaBackend::from_env());
    if let Err(e) = ollama.probe().await {
        error!(error = %e, base_url = ollama.base_url(), "Embedding model unavailable");
        std::process::exit(1);
    }
    info!(
        model = EmbeddingBackend::model_name(ollama.as_ref()),
        dimension = ollama.dimension(),
        "Embedding model ready"
    );

    let embedder: Arc<dyn EmbeddingBackend> = ollama.clone();
    let generator: Arc<dyn GenerationBackend> = ollama;
    let pipeline = GalaxyPipeline::from_config(embedder, Some(generator), layout);
    info!(
        clusters = pipeline.config().clusters,
        labeler = pipeline.labeler_name(),
        "Layout pipeline configured"
    );

    let store = FileNoteStore::new(server.notes_file.clone());
    let notes: Arc<dyn NoteRepository> = Arc::new(store);
    info!(
        path = %server.notes_file.display(),
        notes = notes.count().await?,
        "Note store opened"
    );

    let state =
        AppState::new(notes, Arc::new(pipeline)).with_default_top_k(server.similar_top_k);
    let app = router(state).layer(cors_layer(server.allowed_origins()));

    let addr: SocketAddr = server.addr().parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_settings_defaults() {
        assert_eq!(LogSettings::from_lookup(|_| None), LogSettings::default());
    }

    #[test]
    fn test_log_settings_from_lookup() {
        let settings = LogSettings::from_lookup(|name| match name {
            "LOG_FORMAT" => Some("JSON".to_string()),
            "LOG_FILE" => Some("/var/log/galaxy/api.log".to_string()),
            "LOG_ANSI" => Some("0".to_string()),
            _ => None,
        });
        assert!(settings.json);
        assert_eq!(settings.file, Some(PathBuf::from("/var/log/galaxy/api.log")));
        assert_eq!(settings.ansi, Some(false));
    }

    #[test]
    fn test_blank_log_file_means_stdout() {
        let settings = LogSettings::from_lookup(|name| (name == "LOG_FILE").then(|| " ".to_string()));
        assert!(settings.file.is_none());
    }
}
