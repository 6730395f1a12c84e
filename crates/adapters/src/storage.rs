//! Disk-backed recording store
//!
//! Capacity guard for voicemail recordings: the voicemail disposition is
//! refused (cleanly, by the router) when the filesystem holding the
//! recordings directory drops below a configured amount of free space.
//! A threshold of zero disables the check.

use std::path::PathBuf;

use async_trait::async_trait;
use sysinfo::Disks;
use tracing::{debug, info};

use callscreen_core::error::{Result, ScreenError};
use callscreen_core::ports::RecordingStore;

/// Recording store rooted at a directory with a minimum-free-space guard
pub struct DiskRecordingStore {
    dir: PathBuf,
    min_free_mb: u64,
}

impl DiskRecordingStore {
    /// Create the store, ensuring the recordings directory exists
    pub fn new(dir: impl Into<PathBuf>, min_free_mb: u64) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            ScreenError::storage(format!(
                "cannot create recordings directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        info!(
            "Recording store at {} (min free: {} MB)",
            dir.display(),
            min_free_mb
        );
        Ok(Self { dir, min_free_mb })
    }

    /// Free megabytes on the filesystem holding the recordings directory
    fn available_mb(&self) -> Result<u64> {
        let dir = self.dir.canonicalize().unwrap_or_else(|_| self.dir.clone());

        // Pick the mounted filesystem with the longest matching prefix
        let disks = Disks::new_with_refreshed_list();
        let mut best: Option<(usize, u64)> = None;
        for disk in disks.list() {
            let mount = disk.mount_point();
            if dir.starts_with(mount) {
                let specificity = mount.as_os_str().len();
                if best.map_or(true, |(len, _)| specificity >= len) {
                    best = Some((specificity, disk.available_space() / (1024 * 1024)));
                }
            }
        }

        best.map(|(_, mb)| mb).ok_or_else(|| {
            ScreenError::storage(format!(
                "no filesystem information for {}",
                self.dir.display()
            ))
        })
    }
}

#[async_trait]
impl RecordingStore for DiskRecordingStore {
    async fn ensure_capacity(&self) -> Result<()> {
        if self.min_free_mb == 0 {
            return Ok(());
        }

        let free = self.available_mb()?;
        if free < self.min_free_mb {
            return Err(ScreenError::storage(format!(
                "{} MB free, {} MB required",
                free, self.min_free_mb
            )));
        }

        debug!("Recording capacity ok: {} MB free", free);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir() -> PathBuf {
        std::env::temp_dir().join(format!("callscreen-rec-{}", std::process::id()))
    }

    #[tokio::test]
    async fn test_zero_threshold_disables_the_guard() {
        let store = DiskRecordingStore::new(dir(), 0).unwrap();
        assert!(store.ensure_capacity().await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_threshold_refuses() {
        // No filesystem has half of u64::MAX megabytes free; either the
        // probe finds the disk and refuses, or it cannot resolve one —
        // both must surface as a storage error, never a panic.
        let store = DiskRecordingStore::new(dir(), u64::MAX / 2).unwrap();
        let err = store.ensure_capacity().await.unwrap_err();
        assert!(matches!(err, ScreenError::Storage(_)));
    }

    #[test]
    fn test_creates_recordings_directory() {
        let path = dir().join("nested");
        let _store = DiskRecordingStore::new(&path, 0).unwrap();
        assert!(path.exists());
    }
}
