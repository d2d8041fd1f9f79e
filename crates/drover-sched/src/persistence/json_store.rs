//! JSON file-based checkpoint storage.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::error::SchedResult;
use crate::persistence::{Checkpoint, CheckpointStore};

/// Stores one checkpoint as a pretty-printed JSON file.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a crash mid-write leaves the previous checkpoint intact.
pub struct JsonCheckpointStore {
    path: PathBuf,
}

impl JsonCheckpointStore {
    /// Create a store backed by the file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn read(&self) -> SchedResult<Option<Checkpoint>> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(Checkpoint::from_json(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl CheckpointStore for JsonCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> SchedResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let json = checkpoint.to_json()?;
        let temp = self.temp_path();
        fs::write(&temp, json).await?;
        fs::rename(&temp, &self.path).await?;
        tracing::debug!("Checkpoint for {} written to {:?}", checkpoint.job_name, self.path);
        Ok(())
    }

    async fn load(&self, job_name: Option<&str>) -> SchedResult<Option<Checkpoint>> {
        let checkpoint = self.read().await?;
        Ok(checkpoint.filter(|c| job_name.is_none_or(|name| c.job_name == name)))
    }

    async fn remove(&self, job_name: &str) -> SchedResult<bool> {
        match self.read().await? {
            Some(checkpoint) if checkpoint.job_name == job_name => {
                fs::remove_file(&self.path).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OrchestratorConfig, SlurmConfig};
    use crate::persistence::QueuedEntry;

    fn checkpoint(name: &str) -> Checkpoint {
        let config = OrchestratorConfig::with_slurm(SlurmConfig::named(name));
        let mut checkpoint = Checkpoint::from_config(&config, 2);
        checkpoint.queued_jobs.push(QueuedEntry {
            command: "echo hi".to_string(),
            output_files: Vec::new(),
        });
        checkpoint
    }

    #[tokio::test]
    async fn test_json_store_basic() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonCheckpointStore::new(tmp.path().join("state/run.json"));

        assert!(store.load(None).await.unwrap().is_none());

        let saved = checkpoint("sweep");
        store.save(&saved).await.unwrap();
        assert!(store.path().exists());
        assert!(!tmp.path().join("state/run.json.tmp").exists());

        let loaded = store.load(Some("sweep")).await.unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert!(store.load(Some("other")).await.unwrap().is_none());
        assert!(store.load(None).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_json_store_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonCheckpointStore::new(tmp.path().join("run.json"));
        store.save(&checkpoint("sweep")).await.unwrap();

        assert!(!store.remove("other").await.unwrap());
        assert!(store.remove("sweep").await.unwrap());
        assert!(!store.path().exists());
        assert!(!store.remove("sweep").await.unwrap());
    }
}
