use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::foundation::error::{BurnoverError, BurnoverResult};
use crate::record::recorder::Recording;

/// A published export: where it lives on disk and how to present it.
#[derive(Clone, Debug)]
pub struct ArtifactHandle {
    path: PathBuf,
    mime: String,
    suggested_name: String,
    len: u64,
}

impl ArtifactHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Download-style file name: the source stem plus an `-overlay` suffix.
    pub fn suggested_name(&self) -> &str {
        &self.suggested_name
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy the artifact to `dest`. A directory gets the suggested file name
    /// appended; anything else is used as the target path verbatim.
    pub fn save_to(&self, dest: &Path) -> BurnoverResult<PathBuf> {
        let target = if dest.is_dir() {
            dest.join(&self.suggested_name)
        } else {
            dest.to_path_buf()
        };
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    BurnoverError::export(format!(
                        "failed to create output directory '{}': {e}",
                        parent.display()
                    ))
                })?;
            }
        }
        fs::copy(&self.path, &target).map_err(|e| {
            BurnoverError::export(format!(
                "failed to save export to '{}': {e}",
                target.display()
            ))
        })?;
        Ok(target)
    }
}

/// Holds the latest published export on disk, one at a time.
///
/// Publishing revokes the previous file first, so repeated exports never
/// accumulate stale artifacts. The backing directory lives under the system
/// temp dir and disappears with the store.
pub struct ArtifactStore {
    dir: PathBuf,
    current: Mutex<Option<PathBuf>>,
    seq: AtomicU64,
}

impl ArtifactStore {
    pub fn new() -> BurnoverResult<Self> {
        let dir = std::env::temp_dir().join(format!(
            "burnover_artifacts_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ));
        fs::create_dir_all(&dir).map_err(|e| {
            BurnoverError::export(format!(
                "failed to create artifact directory '{}': {e}",
                dir.display()
            ))
        })?;
        Ok(Self {
            dir,
            current: Mutex::new(None),
            seq: AtomicU64::new(0),
        })
    }

    /// Write `recording` to disk and return its handle, revoking whatever was
    /// published before.
    pub fn publish(
        &self,
        recording: &Recording,
        source_stem: Option<&str>,
    ) -> BurnoverResult<ArtifactHandle> {
        self.revoke();
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(format!("export-{seq}.{}", recording.extension));
        fs::write(&path, &recording.data).map_err(|e| {
            BurnoverError::export(format!(
                "failed to write export '{}': {e}",
                path.display()
            ))
        })?;
        *self.slot() = Some(path.clone());

        let stem = source_stem.unwrap_or("export");
        Ok(ArtifactHandle {
            path,
            mime: recording.mime.clone(),
            suggested_name: format!("{stem}-overlay.{}", recording.extension),
            len: recording.data.len() as u64,
        })
    }

    /// Delete the currently published export, if any. Safe to call twice.
    pub fn revoke(&self) {
        if let Some(prev) = self.slot().take() {
            let _ = fs::remove_file(prev);
        }
    }

    pub fn current_path(&self) -> Option<PathBuf> {
        self.slot().clone()
    }

    fn slot(&self) -> MutexGuard<'_, Option<PathBuf>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ArtifactStore {
    fn drop(&mut self) {
        self.revoke();
        let _ = fs::remove_dir_all(&self.dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording(data: &[u8]) -> Recording {
        Recording {
            data: data.to_vec(),
            mime: "video/mp4".to_string(),
            extension: "mp4".to_string(),
        }
    }

    #[test]
    fn publish_writes_and_names_the_artifact() {
        let store = ArtifactStore::new().unwrap();
        let handle = store.publish(&recording(b"abc"), Some("clip")).unwrap();

        assert_eq!(handle.suggested_name(), "clip-overlay.mp4");
        assert_eq!(handle.mime(), "video/mp4");
        assert_eq!(handle.len(), 3);
        assert_eq!(fs::read(handle.path()).unwrap(), b"abc");
    }

    #[test]
    fn missing_stem_falls_back_to_export() {
        let store = ArtifactStore::new().unwrap();
        let handle = store.publish(&recording(b"x"), None).unwrap();
        assert_eq!(handle.suggested_name(), "export-overlay.mp4");
    }

    #[test]
    fn republish_revokes_the_previous_file() {
        let store = ArtifactStore::new().unwrap();
        let first = store.publish(&recording(b"one"), None).unwrap();
        let second = store.publish(&recording(b"two"), None).unwrap();

        assert!(!first.path().exists());
        assert!(second.path().exists());
        assert_eq!(store.current_path().as_deref(), Some(second.path()));
    }

    #[test]
    fn revoke_is_idempotent() {
        let store = ArtifactStore::new().unwrap();
        let handle = store.publish(&recording(b"one"), None).unwrap();
        store.revoke();
        store.revoke();
        assert!(!handle.path().exists());
        assert!(store.current_path().is_none());
    }

    #[test]
    fn save_to_directory_uses_the_suggested_name() {
        let store = ArtifactStore::new().unwrap();
        let handle = store.publish(&recording(b"abc"), Some("clip")).unwrap();

        let out_dir = std::env::temp_dir().join(format!(
            "burnover_save_dir_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ));
        fs::create_dir_all(&out_dir).unwrap();

        let saved = handle.save_to(&out_dir).unwrap();
        assert_eq!(saved, out_dir.join("clip-overlay.mp4"));
        assert_eq!(fs::read(&saved).unwrap(), b"abc");

        let _ = fs::remove_dir_all(&out_dir);
    }

    #[test]
    fn save_to_file_path_is_verbatim() {
        let store = ArtifactStore::new().unwrap();
        let handle = store.publish(&recording(b"abc"), None).unwrap();

        let target = std::env::temp_dir().join(format!(
            "burnover_save_file_{}_{}.mp4",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ));
        let saved = handle.save_to(&target).unwrap();
        assert_eq!(saved, target);
        assert_eq!(fs::read(&target).unwrap(), b"abc");

        let _ = fs::remove_file(&target);
    }

    #[test]
    fn dropping_the_store_removes_its_directory() {
        let store = ArtifactStore::new().unwrap();
        let handle = store.publish(&recording(b"abc"), None).unwrap();
        let dir = handle.path().parent().unwrap().to_path_buf();
        assert!(dir.exists());

        drop(store);
        assert!(!dir.exists());
    }
}
