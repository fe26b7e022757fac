//! Module registry types.
//!
//! A module is an installable model tracked by the remote download service.
//! The service reports every module on each fetch, so the client works with
//! whole snapshots rather than incremental updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Lifecycle of a download job as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadState {
    Idle,
    Downloading,
    /// The worker is backing off between attempts; still counts as active.
    Retrying,
    Completed,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl DownloadState {
    pub fn is_active(&self) -> bool {
        matches!(self, DownloadState::Downloading | DownloadState::Retrying)
    }
}

/// Progress record attached to a module while a job runs (or just failed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadStatus {
    pub status: DownloadState,
    #[serde(default)]
    pub progress: u8,
    /// Bytes per second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Seconds remaining
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloaded_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
}

impl DownloadStatus {
    pub fn new(status: DownloadState, progress: u8) -> Self {
        Self {
            status,
            progress,
            speed: None,
            eta: None,
            downloaded_bytes: None,
            total_bytes: None,
            error: None,
            retries: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(DownloadState::Failed, 0)
        }
    }
}

/// One installable model as reported by `GET /api/modules/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub downloaded: bool,
    #[serde(default)]
    pub is_downloading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_status: Option<DownloadStatus>,

    // Display metadata, all optional on the wire
    /// Human-readable size, e.g. "4.7 GB"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(default)]
    pub recommended: bool,
    #[serde(default)]
    pub bundled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_ram: Option<String>,
}

/// What a view should show for a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    NotDownloaded,
    Downloading,
    Downloaded,
    /// Display-only; the module can be requested again.
    Failed,
}

impl ModuleDescriptor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            description: String::new(),
            category: String::new(),
            size_bytes,
            downloaded: false,
            is_downloading: false,
            download_status: None,
            size: None,
            parameters: None,
            context_length: None,
            speed: None,
            quality: None,
            recommended: false,
            bundled: false,
            requires_ram: None,
        }
    }

    pub fn state(&self) -> ModuleState {
        if self.downloaded {
            ModuleState::Downloaded
        } else if self.is_downloading {
            ModuleState::Downloading
        } else if self.failure().is_some() {
            ModuleState::Failed
        } else {
            ModuleState::NotDownloaded
        }
    }

    /// Error message of a failed job, if the last reported status is a failure.
    pub fn failure(&self) -> Option<&str> {
        match &self.download_status {
            Some(s) if s.status == DownloadState::Failed => {
                Some(s.error.as_deref().unwrap_or("Unknown error"))
            }
            _ => None,
        }
    }

    /// Download progress in percent while a job is active.
    pub fn progress(&self) -> Option<u8> {
        if !self.is_downloading {
            return None;
        }
        Some(self.download_status.as_ref().map_or(0, |s| s.progress.min(100)))
    }

    /// Human-readable size, falling back to the byte count.
    pub fn size_label(&self) -> String {
        self.size
            .clone()
            .unwrap_or_else(|| crate::format::format_bytes(self.size_bytes))
    }

    fn matches_query(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let q = query.to_lowercase();
        self.display_name.to_lowercase().contains(&q) || self.description.to_lowercase().contains(&q)
    }
}

/// One fetched, immutable view of every module.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrySnapshot {
    modules: Vec<ModuleDescriptor>,
    fetched_at: DateTime<Utc>,
}

impl RegistrySnapshot {
    /// Build a snapshot from a fetched module list.
    ///
    /// Duplicate ids keep their first occurrence. A module reported as both
    /// downloaded and downloading is treated as still downloading, since the
    /// file on the server may be partial.
    pub fn new(modules: Vec<ModuleDescriptor>) -> Self {
        let mut seen = HashSet::new();
        let modules = modules
            .into_iter()
            .filter(|m| {
                let fresh = seen.insert(m.id.clone());
                if !fresh {
                    tracing::warn!(module = %m.id, "duplicate module id in registry, ignoring");
                }
                fresh
            })
            .map(|mut m| {
                if m.downloaded && m.is_downloading {
                    tracing::warn!(module = %m.id, "module reported downloaded and downloading");
                    m.downloaded = false;
                }
                m
            })
            .collect();

        Self {
            modules,
            fetched_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn modules(&self) -> &[ModuleDescriptor] {
        &self.modules
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn get(&self, id: &str) -> Option<&ModuleDescriptor> {
        self.modules.iter().find(|m| m.id == id)
    }

    pub fn any_downloading(&self) -> bool {
        self.modules.iter().any(|m| m.is_downloading)
    }

    pub fn downloaded_count(&self) -> usize {
        self.modules.iter().filter(|m| m.downloaded).count()
    }

    pub fn downloading_count(&self) -> usize {
        self.modules.iter().filter(|m| m.is_downloading).count()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn first_downloaded(&self) -> Option<&ModuleDescriptor> {
        self.modules.iter().find(|m| m.downloaded)
    }

    /// Modules in `category` (or all for `"all"`) whose name or description
    /// contains `query`, case-insensitively.
    pub fn filter<'a>(&'a self, category: &'a str, query: &'a str) -> impl Iterator<Item = &'a ModuleDescriptor> {
        self.modules.iter().filter(move |m| {
            (category == "all" || m.category == category) && m.matches_query(query)
        })
    }

    /// Categories present in this snapshot, in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for m in &self.modules {
            if !m.category.is_empty() && !out.contains(&m.category.as_str()) {
                out.push(&m.category);
            }
        }
        out
    }
}

impl Default for RegistrySnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(id: &str, category: &str) -> ModuleDescriptor {
        let mut m = ModuleDescriptor::new(id, id.to_uppercase(), 1_000);
        m.category = category.to_string();
        m
    }

    #[test]
    fn test_parse_backend_module() {
        let json = r#"{
            "id": "qwen2.5-coder-7b",
            "display_name": "Qwen2.5 Coder 7B",
            "description": "Advanced coding assistant",
            "category": "coding",
            "size": "4.7 GB",
            "size_bytes": 4700000000,
            "parameters": "7B",
            "context_length": 8192,
            "n_threads": 6,
            "hf_repo": "Qwen/Qwen2.5-Coder-7B-Instruct-GGUF",
            "recommended": true,
            "downloaded": false,
            "is_downloading": true,
            "download_status": {
                "status": "retrying",
                "progress": 0,
                "error": "Retry 1/3: timeout",
                "retries": 1,
                "last_update": 1718000000.5
            }
        }"#;

        let m: ModuleDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(m.size_bytes, 4_700_000_000);
        assert!(m.recommended);
        let status = m.download_status.as_ref().unwrap();
        assert_eq!(status.status, DownloadState::Retrying);
        assert!(status.status.is_active());
        assert_eq!(m.state(), ModuleState::Downloading);
        assert_eq!(m.progress(), Some(0));
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let status: DownloadStatus =
            serde_json::from_str(r#"{"status": "verifying", "progress": 99}"#).unwrap();
        assert_eq!(status.status, DownloadState::Unknown);
    }

    #[test]
    fn test_failed_state_reports_error() {
        let mut m = module("m1", "general");
        m.download_status = Some(DownloadStatus::failed("disk full"));
        assert_eq!(m.state(), ModuleState::Failed);
        assert_eq!(m.failure(), Some("disk full"));

        m.download_status = Some(DownloadStatus::new(DownloadState::Failed, 0));
        assert_eq!(m.failure(), Some("Unknown error"));
    }

    #[test]
    fn test_snapshot_drops_duplicates_and_normalizes() {
        let mut both = module("m2", "coding");
        both.downloaded = true;
        both.is_downloading = true;

        let snapshot = RegistrySnapshot::new(vec![
            module("m1", "general"),
            module("m1", "coding"),
            both,
        ]);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("m1").unwrap().category, "general");
        let m2 = snapshot.get("m2").unwrap();
        assert!(m2.is_downloading);
        assert!(!m2.downloaded);
        assert!(snapshot.any_downloading());
    }

    #[test]
    fn test_filter_by_category_and_query() {
        let mut coder = module("coder", "coding");
        coder.description = "Writes Rust".into();
        let snapshot = RegistrySnapshot::new(vec![coder, module("chat", "general")]);

        let ids: Vec<_> = snapshot.filter("all", "rust").map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["coder"]);

        let ids: Vec<_> = snapshot.filter("general", "").map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["chat"]);

        assert_eq!(snapshot.categories(), vec!["coding", "general"]);
    }
}
