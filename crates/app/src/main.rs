mod config;
mod console;

use providers::BackendClient;
use services::chat::ChatController;
use services::chat_history::{ChatHistory, FileStore, KeyValueStore, MemoryStore};
use services::disk::probe_from_settings;
use services::downloads::DownloadOrchestrator;
use services::toast::ToastQueue;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let (settings, found) = config::load_settings_or_default();
    if !found {
        info!("no settings file found, writing defaults");
        config::save_settings(&settings);
    }

    let client = Arc::new(BackendClient::new(&settings.api)?);
    info!(api = %client.base_url(), "using backend");

    let toasts = ToastQueue::new(Duration::from_millis(settings.toasts.default_ttl_ms));

    let mut downloads = DownloadOrchestrator::new(
        client.clone(),
        probe_from_settings(&settings.disk),
        toasts.clone(),
        Duration::from_millis(settings.polling.interval_ms),
    );
    let (ready_tx, ready_rx) = mpsc::unbounded_channel();
    downloads.on_module_ready(move |module| {
        let _ = ready_tx.send(module.clone());
    });

    let store: Box<dyn KeyValueStore> = match config::data_dir(&settings) {
        Some(dir) => Box::new(FileStore::new(dir)),
        None => {
            warn!("no data directory available, chat history will not persist");
            Box::new(MemoryStore::default())
        }
    };
    let history = ChatHistory::new(
        store,
        settings.history.storage_key.clone(),
        settings.history.max_saved_chats,
    );
    let chat = ChatController::new(client, history, toasts);

    console::Console::new(downloads, chat, ready_rx).run().await
}
