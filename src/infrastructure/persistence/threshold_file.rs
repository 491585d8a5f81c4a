use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::domain::entities::metric_tree::Snapshot;
use crate::domain::entities::threshold::{ThresholdConfig, ThresholdPatch};
use crate::domain::ports::store::{StoreError, ThresholdStore};

/// Threshold config kept as a JSON document on disk.
///
/// The file is re-read on every access so an operator can edit or delete it
/// while the daemon runs; deleting it triggers a fresh bootstrap on the next
/// tick. In-process readers and writers are serialized by an `RwLock`.
pub struct ThresholdFileStore {
    path: PathBuf,
    ratio_limit: f64,
    lock: RwLock<()>,
}

impl ThresholdFileStore {
    /// Open a store at `path` (tilde-expanded). The file is created lazily.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::WriteFailed` if the parent directory cannot be created.
    pub fn new(path: &str, ratio_limit: f64) -> Result<Self, StoreError> {
        let path = PathBuf::from(shellexpand::tilde(path).as_ref());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        }
        Ok(Self {
            path,
            ratio_limit,
            lock: RwLock::new(()),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Option<ThresholdConfig>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::ReadFailed(e.to_string())),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::ConfigCorrupt(e.to_string()))
    }

    /// Like `load`, but a corrupt document reads as absent.
    fn load_or_absent(&self) -> Result<Option<ThresholdConfig>, StoreError> {
        match self.load() {
            Err(StoreError::ConfigCorrupt(reason)) => {
                tracing::warn!(path = %self.path.display(), "Threshold config is corrupt, treating as absent: {reason}");
                Ok(None)
            }
            other => other,
        }
    }

    fn save(&self, config: &ThresholdConfig) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(config)
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| StoreError::WriteFailed(e.to_string()))
    }

    fn update<F>(&self, change: F) -> Result<usize, StoreError>
    where
        F: FnOnce(&mut ThresholdConfig) -> usize,
    {
        let _guard = self
            .lock
            .write()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        let mut config = self
            .load_or_absent()?
            .ok_or_else(|| StoreError::NotFound("threshold config".into()))?;
        let changed = change(&mut config);
        if changed > 0 {
            self.save(&config)?;
        }
        Ok(changed)
    }
}

impl ThresholdStore for ThresholdFileStore {
    fn bootstrap_if_absent(&self, shape: &Snapshot) -> Result<bool, StoreError> {
        let _guard = self
            .lock
            .write()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        if let Some(existing) = self.load_or_absent()? {
            let Some(reason) = existing.shape_mismatch(shape) else {
                return Ok(false);
            };
            tracing::warn!(
                path = %self.path.display(),
                "{}, rebuilding from defaults",
                StoreError::ConfigCorrupt(reason)
            );
        }
        self.save(&ThresholdConfig::from_shape(shape, self.ratio_limit))?;
        tracing::info!(path = %self.path.display(), "Threshold config created");
        Ok(true)
    }

    fn get(&self) -> Result<Option<ThresholdConfig>, StoreError> {
        let _guard = self
            .lock
            .read()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?;
        self.load_or_absent()
    }

    fn patch(&self, patch: &ThresholdPatch) -> Result<usize, StoreError> {
        self.update(|config| config.apply(patch))
    }

    fn extend_with_defaults(&self, shape: &Snapshot) -> Result<usize, StoreError> {
        let ratio_limit = self.ratio_limit;
        self.update(|config| config.extend_from(shape, ratio_limit))
    }
}
