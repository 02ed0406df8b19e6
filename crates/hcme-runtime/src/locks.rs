//! Advisory locks and project registry (spec §5/§6): a file-presence lock
//! per project, polled rather than blocked on, so a held lock short-circuits
//! straight to the LLM-guided code-search fallback.

use async_trait::async_trait;
use hcme_providers::{AdvisoryLock, BrainRegistry, Error, ProjectInfo, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct FileAdvisoryLock {
    path: PathBuf,
}

impl FileAdvisoryLock {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl AdvisoryLock for FileAdvisoryLock {
    fn is_locked(&self) -> bool {
        self.path.exists()
    }

    async fn wait_for_unlock(&self, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.is_locked() {
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::Timeout);
            }
            sleep(POLL_INTERVAL).await;
        }
        Ok(())
    }
}

/// One project's on-disk identity: its root path plus the lock files
/// guarding its ingestion and embedding passes.
#[derive(Debug, Clone)]
struct ProjectEntry {
    info: ProjectInfo,
    workspace_root: PathBuf,
}

/// A `BrainRegistry` backed by a workspace directory: one subdirectory per
/// project, each holding `ingestion.lock`/`embedding.lock` marker files.
pub struct FileBrainRegistry {
    projects: Vec<ProjectEntry>,
}

impl FileBrainRegistry {
    pub fn new(projects: Vec<(ProjectInfo, PathBuf)>) -> Self {
        Self {
            projects: projects
                .into_iter()
                .map(|(info, workspace_root)| ProjectEntry { info, workspace_root })
                .collect(),
        }
    }

    fn lock_path(workspace_root: &Path, name: &str) -> PathBuf {
        workspace_root.join(name)
    }
}

#[async_trait]
impl BrainRegistry for FileBrainRegistry {
    async fn list_projects(&self) -> Result<Vec<ProjectInfo>> {
        Ok(self.projects.iter().map(|p| p.info.clone()).collect())
    }

    async fn find_project_by_path(&self, path: &str) -> Result<Option<ProjectInfo>> {
        Ok(self.projects.iter().find(|p| p.info.path == path).map(|p| p.info.clone()))
    }

    fn get_ingestion_lock(&self) -> Box<dyn AdvisoryLock> {
        let root = self.projects.first().map(|p| p.workspace_root.clone()).unwrap_or_default();
        Box::new(FileAdvisoryLock::new(Self::lock_path(&root, "ingestion.lock")))
    }

    fn get_embedding_lock(&self) -> Box<dyn AdvisoryLock> {
        let root = self.projects.first().map(|p| p.workspace_root.clone()).unwrap_or_default();
        Box::new(FileAdvisoryLock::new(Self::lock_path(&root, "embedding.lock")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lock_is_unlocked_when_file_absent() {
        let dir = TempDir::new().unwrap();
        let lock = FileAdvisoryLock::new(dir.path().join("ingestion.lock"));
        assert!(!lock.is_locked());
    }

    #[test]
    fn lock_is_locked_when_file_present() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("ingestion.lock");
        std::fs::write(&lock_path, b"").unwrap();
        let lock = FileAdvisoryLock::new(lock_path);
        assert!(lock.is_locked());
    }

    #[tokio::test]
    async fn wait_for_unlock_times_out_when_still_locked() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("ingestion.lock");
        std::fs::write(&lock_path, b"").unwrap();
        let lock = FileAdvisoryLock::new(lock_path);
        let result = lock.wait_for_unlock(Duration::from_millis(50)).await;
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn registry_reports_registered_projects() {
        let dir = TempDir::new().unwrap();
        let info = ProjectInfo {
            id: "p1".to_string(),
            path: "/repo".to_string(),
            project_type: "rust".to_string(),
        };
        let registry = FileBrainRegistry::new(vec![(info.clone(), dir.path().to_path_buf())]);
        let projects = registry.list_projects().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, "p1");
        let found = registry.find_project_by_path("/repo").await.unwrap();
        assert!(found.is_some());
    }
}
