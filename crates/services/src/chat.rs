//! Conversation state: the selected module, the open chat and sending turns.

use crate::chat_history::ChatHistory;
use crate::toast::ToastQueue;
use chrono::Utc;
use providers::{ApiError, ChatRequest, ChatService, HistoryTurn};
use shared::chat::{AttachedFile, ChatMessage, SavedChat};
use shared::format::truncate_chars;
use shared::modules::{ModuleDescriptor, RegistrySnapshot};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Prior turns sent with each message.
const HISTORY_TURNS: usize = 10;
const TITLE_CHARS: usize = 50;
const PREVIEW_CHARS: usize = 100;
const SWITCH_TOAST_TTL: Duration = Duration::from_millis(2000);

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Type a message or attach a file first.")]
    EmptyMessage,
    #[error("Please select an AI model first.")]
    NoModuleSelected,
    #[error("{0} is not downloaded yet. Download it from Settings.")]
    ModuleNotDownloaded(String),
    #[error("{message}")]
    Remote {
        message: String,
        #[source]
        source: ApiError,
    },
}

pub struct ChatController {
    service: Arc<dyn ChatService>,
    history: ChatHistory,
    toasts: ToastQueue,
    selected: Option<ModuleDescriptor>,
    chat_id: Option<String>,
    messages: Vec<ChatMessage>,
}

impl ChatController {
    pub fn new(service: Arc<dyn ChatService>, history: ChatHistory, toasts: ToastQueue) -> Self {
        Self {
            service,
            history,
            toasts,
            selected: None,
            chat_id: None,
            messages: Vec::new(),
        }
    }

    /// Load saved chats, downgrading failure to a warning toast.
    pub fn load_history(&mut self) {
        if let Err(e) = self.history.load() {
            warn!(error = %e, "failed to load chat history");
            self.toasts.warning("Failed to load chat history.");
        }
    }

    pub fn selected(&self) -> Option<&ModuleDescriptor> {
        self.selected.as_ref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn current_chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Returns true if the module is now selected.
    pub fn select_module(&mut self, module: &ModuleDescriptor) -> bool {
        if !module.downloaded {
            self.toasts.warning(format!(
                "{} is not downloaded yet. Download it from Settings.",
                module.display_name
            ));
            return false;
        }
        self.selected = Some(module.clone());
        self.toasts.push_with_ttl(
            format!("Switched to {}", module.display_name),
            crate::toast::Severity::Success,
            SWITCH_TOAST_TTL,
        );
        true
    }

    /// Keep the selection in line with a fresh snapshot.
    pub fn sync_modules(&mut self, snapshot: &RegistrySnapshot) {
        let current = self
            .selected
            .as_ref()
            .and_then(|s| snapshot.get(&s.id))
            .filter(|m| m.downloaded)
            .cloned();

        self.selected = match current {
            Some(module) => Some(module),
            None => {
                let fallback = snapshot.first_downloaded().cloned();
                if let Some(m) = &fallback {
                    debug!(module = %m.id, "auto-selected module");
                }
                fallback
            }
        };
    }

    /// A download finished: switch to it and start a fresh conversation.
    pub fn on_module_ready(&mut self, module: &ModuleDescriptor) {
        info!(module = %module.id, "switching to newly downloaded module");
        self.selected = Some(module.clone());
        self.toasts.success(format!(
            "{} ready! You can now start chatting.",
            module.display_name
        ));
        self.new_chat();
    }

    pub fn new_chat(&mut self) {
        self.chat_id = None;
        self.messages.clear();
    }

    /// Reopen a saved chat. Returns false for an unknown id.
    pub fn open_chat(&mut self, id: &str) -> bool {
        match self.history.get(id) {
            Some(chat) => {
                self.chat_id = Some(chat.id.clone());
                self.messages = chat.messages.clone();
                true
            }
            None => false,
        }
    }

    /// Remove a saved chat. Forgetting the open chat also clears the transcript.
    pub fn forget_chat(&mut self, id: &str) -> bool {
        match self.history.delete(id) {
            Ok(true) => {
                if self.chat_id.as_deref() == Some(id) {
                    self.new_chat();
                }
                true
            }
            Ok(false) => false,
            Err(e) => {
                warn!(chat = %id, error = %e, "failed to delete chat");
                self.toasts.error("Failed to delete chat.");
                false
            }
        }
    }

    /// Send one user turn and wait for the reply.
    ///
    /// The user message stays in the transcript even when the request fails.
    pub async fn send_message(
        &mut self,
        text: &str,
        files: Vec<AttachedFile>,
    ) -> Result<&ChatMessage, ChatError> {
        let text = text.trim();
        if text.is_empty() && files.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let module = self.selected.clone().ok_or(ChatError::NoModuleSelected)?;
        if !module.downloaded {
            return Err(ChatError::ModuleNotDownloaded(module.display_name));
        }

        let request = ChatRequest {
            module_id: module.id.clone(),
            message: text.to_string(),
            files: files.iter().map(|f| f.name.clone()).collect(),
            history: self.recent_turns(),
        };
        self.messages.push(ChatMessage::user(text, files));

        let reply = match self.service.send_chat(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(module = %module.id, error = %e, "chat request failed");
                let message = e.user_message_or("Failed to get a response. Please try again.");
                return Err(ChatError::Remote { message, source: e });
            }
        };

        self.messages.push(ChatMessage::assistant(reply.response));
        self.save_current(text);
        // Just pushed above
        Ok(&self.messages[self.messages.len() - 1])
    }

    fn recent_turns(&self) -> Vec<HistoryTurn> {
        let skip = self.messages.len().saturating_sub(HISTORY_TURNS);
        self.messages[skip..]
            .iter()
            .map(|m| HistoryTurn {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }

    /// `latest` is the user message just sent; the sidebar preview follows it.
    fn save_current(&mut self, latest: &str) {
        let Some(first) = self.messages.first() else {
            return;
        };
        let existing = self.chat_id.as_deref().and_then(|id| self.history.get(id));
        let title = match existing {
            Some(chat) => chat.title.clone(),
            None => truncate_chars(&first.content, TITLE_CHARS),
        };
        let preview: String = latest.chars().take(PREVIEW_CHARS).collect();
        let id = self
            .chat_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let chat = SavedChat {
            id: id.clone(),
            title,
            preview,
            timestamp: Utc::now(),
            messages: self.messages.clone(),
        };
        self.chat_id = Some(id);
        if let Err(e) = self.history.save(chat) {
            warn!(error = %e, "failed to save chat");
        }
    }
}
