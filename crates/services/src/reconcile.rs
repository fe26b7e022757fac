//! Snapshot reconciliation.
//!
//! Compares two registry snapshots and reports the download transitions the
//! rest of the app reacts to. Pure: no I/O, no hidden state.

use shared::modules::{DownloadState, ModuleDescriptor, RegistrySnapshot};

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileEvent {
    /// A module that was downloading is now installed.
    ModuleReady(ModuleDescriptor),
    /// A module that was downloading reported a failed job.
    ModuleFailed {
        module: ModuleDescriptor,
        error: String,
    },
}

/// Transitions from `previous` to `next`, in `next` order.
///
/// Modules absent from `previous` are treated as newly seen and produce no
/// event.
pub fn diff(previous: &RegistrySnapshot, next: &RegistrySnapshot) -> Vec<ReconcileEvent> {
    next.modules()
        .iter()
        .filter_map(|module| {
            let before = previous.get(&module.id)?;
            transition(before, module)
        })
        .collect()
}

fn transition(before: &ModuleDescriptor, after: &ModuleDescriptor) -> Option<ReconcileEvent> {
    if !before.is_downloading {
        return None;
    }

    if after.downloaded && !after.is_downloading {
        return Some(ReconcileEvent::ModuleReady(after.clone()));
    }

    match &after.download_status {
        Some(status) if status.status == DownloadState::Failed => {
            Some(ReconcileEvent::ModuleFailed {
                module: after.clone(),
                error: status
                    .error
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            })
        }
        _ => None,
    }
}
