//! Drives the site runtime over a site directory.
//!
//! Usage: `site-runtime <site-root> [<url> | @<language>]...`
//!
//! Every `<url>` argument is navigated to in order, every `@<language>`
//! switches the language. The resulting document state is logged.

use std::path::{
    Path,
    PathBuf,
};
use std::process::ExitCode;

use site_runtime::SiteRuntime;
use site_runtime::config::ConfigManager;
use site_runtime::dom::Document;
use site_runtime::fetch::FsFetcher;
use site_runtime::site::shell_spec;
use site_runtime::storage::{
    FileStorage,
    MemoryStorage,
    Storage,
};
use tracing_appender::non_blocking::WorkerGuard;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let site_root = args.next().map_or_else(|| PathBuf::from("."), PathBuf::from);
    let commands: Vec<String> = args.collect();

    let mut config_manager = ConfigManager::new(site_root);
    let config_result = config_manager.load_settings();
    let settings = config_manager.get_settings().clone();
    let _guard = init_tracing(settings.debug, config_manager.log_path());

    if let Err(error) = config_result {
        tracing::error!(error = %error, "Invalid site configuration");
        return ExitCode::FAILURE;
    }

    let storage: Box<dyn Storage> = match FileStorage::open(config_manager.storage_path()) {
        Ok(storage) => Box::new(storage),
        Err(error) => {
            tracing::warn!(error = %error, "Durable storage unavailable, using memory storage");
            Box::new(MemoryStorage::new())
        }
    };

    let mut document = Document::new("/");
    let shell = document.instantiate(&shell_spec(&settings));
    let body = document.body();
    document.append_child(body, shell);

    let runtime = SiteRuntime::new(settings, document, storage, FsFetcher::new(config_manager.site_root()));
    if let Err(error) = runtime.hydrate("/").await {
        tracing::warn!(error = %error, "Failed to load initial content");
    }
    runtime.document().lock().await.mark_complete();
    runtime.start().await;
    report(&runtime).await;

    let mut failed = false;
    for command in &commands {
        if let Some(code) = command.strip_prefix('@') {
            if !runtime.change_language(code).await {
                tracing::info!(language = %code, "Language unchanged");
            }
        } else if let Err(error) = runtime.navigate(command).await {
            tracing::error!(url = %command, error = %error, "Navigation failed");
            failed = true;
        }
        report(&runtime).await;
    }

    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

/// Logs to `log_path` when set, to stderr otherwise.
fn init_tracing(debug: bool, log_path: Option<PathBuf>) -> Option<WorkerGuard> {
    let level = if debug { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    let Some(path) = log_path else {
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        return None;
    };

    let directory = path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let file_name = path.file_name().map(ToOwned::to_owned).unwrap_or_else(|| "site-runtime.log".into());
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
    Some(guard)
}

/// Logs the visible state of the document.
async fn report(runtime: &SiteRuntime<FsFetcher>) {
    let language = runtime.current_language().await;
    let tab = runtime.selected_tab().await;
    let doc = runtime.document().lock().await;
    let key_attribute = &runtime.settings().markers.key_attribute;

    tracing::info!(
        location = %doc.location(),
        title = %doc.title(),
        language = %language,
        tab = ?tab,
        "Document state"
    );
    for node in doc.query_attribute(key_attribute) {
        let key = doc.attribute(node, key_attribute).unwrap_or_default();
        let text = doc.inner_markup(node).or_else(|| doc.value(node)).unwrap_or_default();
        tracing::info!(key = %key, text = %text, "Localized element");
    }
}
