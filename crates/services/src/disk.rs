//! Available disk space used to reject downloads that cannot fit.

use shared::settings::DiskSettings;
use std::path::{Path, PathBuf};
use sysinfo::Disks;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskSpace {
    pub total: u64,
    pub used: u64,
    pub available: u64,
}

impl DiskSpace {
    pub fn new(total: u64, available: u64) -> Self {
        Self {
            total,
            used: total.saturating_sub(available),
            available,
        }
    }
}

pub trait DiskSpaceProbe: Send + Sync {
    /// Current figure, or `None` if it cannot be determined.
    fn probe(&self) -> Option<DiskSpace>;
}

/// A fixed figure taken from configuration.
pub struct StaticDiskSpace(pub DiskSpace);

impl DiskSpaceProbe for StaticDiskSpace {
    fn probe(&self) -> Option<DiskSpace> {
        Some(self.0)
    }
}

/// Queries the disk that holds `path`.
pub struct SystemDiskSpace {
    path: PathBuf,
}

impl SystemDiskSpace {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DiskSpaceProbe for SystemDiskSpace {
    fn probe(&self) -> Option<DiskSpace> {
        let path = self
            .path
            .canonicalize()
            .unwrap_or_else(|_| self.path.clone());
        let disks = Disks::new_with_refreshed_list();
        let found = disks
            .list()
            .iter()
            .map(|d| (d.mount_point(), d.total_space(), d.available_space()))
            .collect::<Vec<_>>();
        let space = best_mount(&path, &found);
        if space.is_none() {
            tracing::warn!(path = %path.display(), "no disk found for models directory");
        }
        space
    }
}

/// The disk whose mount point is the longest prefix of `path`.
fn best_mount(path: &Path, disks: &[(&Path, u64, u64)]) -> Option<DiskSpace> {
    disks
        .iter()
        .filter(|(mount, _, _)| path.starts_with(mount))
        .max_by_key(|(mount, _, _)| mount.components().count())
        .map(|(_, total, available)| DiskSpace::new(*total, *available))
}

/// Pick the probe described by the settings.
pub fn probe_from_settings(settings: &DiskSettings) -> Box<dyn DiskSpaceProbe> {
    if let Some(available) = settings.available_bytes {
        let total = settings.total_bytes.unwrap_or(available).max(available);
        return Box::new(StaticDiskSpace(DiskSpace::new(total, available)));
    }
    let dir = settings
        .models_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    Box::new(SystemDiskSpace::new(dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_mount_wins() {
        let root = Path::new("/");
        let data = Path::new("/data");
        let disks = [(root, 100, 10), (data, 1000, 500)];

        let space = best_mount(Path::new("/data/models"), &disks).unwrap();
        assert_eq!(space.available, 500);
        assert_eq!(space.used, 500);

        let space = best_mount(Path::new("/home/me"), &disks).unwrap();
        assert_eq!(space.available, 10);

        assert!(best_mount(Path::new("relative"), &disks).is_none());
    }

    #[test]
    fn test_static_figure_from_settings() {
        let settings = DiskSettings {
            available_bytes: Some(256_000_000_000),
            total_bytes: Some(512_000_000_000),
            models_dir: None,
        };
        let space = probe_from_settings(&settings).probe().unwrap();
        assert_eq!(space.available, 256_000_000_000);
        assert_eq!(space.used, 256_000_000_000);
    }
}
