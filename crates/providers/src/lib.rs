//! Clients for the Freddie backend.
//!
//! The rest of the workspace talks to the backend only through the
//! [`ModuleService`] and [`ChatService`] traits, so tests can swap in
//! in-memory fakes.

pub mod backend;
pub mod error;
pub mod types;

use async_trait::async_trait;
use shared::modules::RegistrySnapshot;

pub use backend::BackendClient;
pub use error::ApiError;
pub use types::{
    CancelReply, CancelStatus, ChatReply, ChatRequest, DeleteReply, DownloadReply,
    DownloadStartStatus, HistoryTurn,
};

/// Module registry and download jobs.
#[async_trait]
pub trait ModuleService: Send + Sync {
    /// Fetch every module with its current download state.
    async fn list_modules(&self) -> Result<RegistrySnapshot, ApiError>;

    async fn start_download(&self, module_id: &str) -> Result<DownloadReply, ApiError>;

    async fn cancel_download(&self, module_id: &str) -> Result<CancelReply, ApiError>;

    async fn delete_module(&self, module_id: &str) -> Result<DeleteReply, ApiError>;
}

/// Chat completions against a downloaded module.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ApiError>;
}
