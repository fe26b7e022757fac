//! Saved chat list, newest first, persisted through a key-value store.

use shared::chat::SavedChat;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed chat history: {0}")]
    Json(#[from] serde_json::Error),
}

/// String values addressed by key.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, HistoryError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), HistoryError>;
}

/// One `<key>.json` file per key inside `dir`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, HistoryError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), HistoryError> {
        std::fs::create_dir_all(&self.dir)?;
        // Written aside and renamed into place
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, HistoryError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), HistoryError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

pub struct ChatHistory {
    store: Box<dyn KeyValueStore>,
    key: String,
    max_chats: usize,
    chats: Vec<SavedChat>,
}

impl ChatHistory {
    pub fn new(store: Box<dyn KeyValueStore>, key: impl Into<String>, max_chats: usize) -> Self {
        Self {
            store,
            key: key.into(),
            max_chats: max_chats.max(1),
            chats: Vec::new(),
        }
    }

    /// Read the stored list. On error the in-memory list is left empty.
    pub fn load(&mut self) -> Result<usize, HistoryError> {
        self.chats.clear();
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(0);
        };
        let mut chats: Vec<SavedChat> = serde_json::from_str(&raw)?;
        chats.truncate(self.max_chats);
        self.chats = chats;
        tracing::debug!(count = self.chats.len(), "loaded chat history");
        Ok(self.chats.len())
    }

    /// Insert or replace `chat` and write the list back.
    ///
    /// A chat already in the list keeps its position; a new one goes to the
    /// front and the oldest entries beyond the cap are dropped.
    pub fn save(&mut self, chat: SavedChat) -> Result<(), HistoryError> {
        match self.chats.iter_mut().find(|c| c.id == chat.id) {
            Some(existing) => *existing = chat,
            None => {
                self.chats.insert(0, chat);
                self.chats.truncate(self.max_chats);
            }
        }
        self.persist()
    }

    /// Remove a chat. Returns false if no chat had that id.
    pub fn delete(&mut self, id: &str) -> Result<bool, HistoryError> {
        let before = self.chats.len();
        self.chats.retain(|c| c.id != id);
        if self.chats.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    pub fn get(&self, id: &str) -> Option<&SavedChat> {
        self.chats.iter().find(|c| c.id == id)
    }

    pub fn list(&self) -> &[SavedChat] {
        &self.chats
    }

    fn persist(&mut self) -> Result<(), HistoryError> {
        let json = serde_json::to_string(&self.chats)?;
        self.store.set(&self.key, &json)
    }
}
