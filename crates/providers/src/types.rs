//! Request and response bodies of the backend endpoints.

use serde::{Deserialize, Serialize};
use shared::chat::Role;
use shared::modules::ModuleDescriptor;

#[derive(Debug, Deserialize)]
pub(crate) struct ModuleListResponse {
    pub modules: Vec<ModuleDescriptor>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ModuleRequest<'a> {
    pub module_id: &'a str,
}

/// Body of a non-2xx response.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStartStatus {
    Downloading,
    AlreadyDownloaded,
    AlreadyDownloading,
    Failed,
}

/// Reply of `POST /api/modules/download/`.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadReply {
    pub status: DownloadStartStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub progress: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelStatus {
    Cancelled,
    NotDownloading,
}

/// Reply of `POST /api/modules/cancel/`.
#[derive(Debug, Clone, Deserialize)]
pub struct CancelReply {
    pub status: CancelStatus,
    #[serde(default)]
    pub message: Option<String>,
}

/// Reply of `POST /api/modules/delete/`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteReply {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// One prior turn sent along with a chat message.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

/// Body of `POST /api/chat/`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub module_id: String,
    pub message: String,
    /// Attachment file names
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryTurn>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub module_name: Option<String>,
    #[serde(default)]
    pub module_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_reply_variants() {
        let reply: DownloadReply = serde_json::from_str(
            r#"{"status": "already_downloading", "message": "busy", "module_id": "m1", "progress": 40}"#,
        )
        .unwrap();
        assert_eq!(reply.status, DownloadStartStatus::AlreadyDownloading);
        assert_eq!(reply.progress, Some(40));

        let reply: DownloadReply = serde_json::from_str(
            r#"{"status": "failed", "error": "Failed to start download (already in progress or locked)"}"#,
        )
        .unwrap();
        assert_eq!(reply.status, DownloadStartStatus::Failed);
        assert!(reply.error.unwrap().contains("locked"));
    }

    #[test]
    fn test_chat_request_omits_empty_history() {
        let req = ChatRequest {
            module_id: "m1".into(),
            message: "hello".into(),
            files: vec!["notes.txt".into()],
            history: Vec::new(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["files"][0], "notes.txt");
        assert!(json.get("history").is_none());
    }
}
