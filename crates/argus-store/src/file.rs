//! Directory-backed store.
//!
//! TOML files are rewritten whole through a temp file and rename, so a crash
//! never leaves a half-written catalog. Rewrites hold `store.write.lock`, so
//! two processes editing the same store do not lose each other's updates.
//! The execution log is append-only JSONL written with
//! `serde_jsonlines::append_json_lines`. Running workflows are claimed with
//! one lock file each under `running/`.

use std::fs;
use std::path::{Path, PathBuf};
use argus_core::{Catalog, SourceDescriptor, WorkflowDefinition, WorkflowExecution};
use serde::{Deserialize, Serialize};

use crate::lock::{self, LockState, WriteLockGuard};
use crate::{Claim, ConfigStore, StoreError};

const SOURCES_FILE: &str = "sources.toml";
const WORKFLOWS_FILE: &str = "workflows.toml";
const EXECUTIONS_FILE: &str = "executions.jsonl";
const WRITE_LOCK_FILE: &str = "store.write.lock";
const RUNNING_DIR: &str = "running";

#[derive(Debug, Default, Serialize, Deserialize)]
struct WorkflowsFile {
    #[serde(default, rename = "workflow")]
    workflows: Vec<WorkflowDefinition>,
}

/// Store rooted at a directory (by default `.argus/`).
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a store, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    fn write_lock(&self) -> Result<WriteLockGuard, StoreError> {
        WriteLockGuard::acquire(self.path(WRITE_LOCK_FILE))
    }

    /// Workflow ids are free text; encode them into a safe file name.
    fn claim_path(&self, workflow_id: &str) -> PathBuf {
        self.root
            .join(RUNNING_DIR)
            .join(format!("{}.lock", urlencoding::encode(workflow_id)))
    }

    fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    fn write_atomic(path: &Path, contents: &str) -> Result<(), StoreError> {
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, contents).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))
    }

    fn load_catalog(&self) -> Result<Catalog, StoreError> {
        let path = self.path(SOURCES_FILE);
        let Some(text) = Self::read_optional(&path)? else {
            return Ok(Catalog::default());
        };
        toml::from_str(&text).map_err(|e| StoreError::Parse {
            path,
            message: e.to_string(),
        })
    }

    fn save_catalog(&self, catalog: &Catalog) -> Result<(), StoreError> {
        let text = toml::to_string(catalog).map_err(|e| StoreError::Serialize {
            what: "catalog",
            message: e.to_string(),
        })?;
        Self::write_atomic(&self.path(SOURCES_FILE), &text)
    }

    fn load_workflows(&self) -> Result<WorkflowsFile, StoreError> {
        let path = self.path(WORKFLOWS_FILE);
        let Some(text) = Self::read_optional(&path)? else {
            return Ok(WorkflowsFile::default());
        };
        let file: WorkflowsFile = toml::from_str(&text).map_err(|e| StoreError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;
        for workflow in &file.workflows {
            workflow.validate()?;
        }
        Ok(file)
    }

    fn save_workflows(&self, file: &WorkflowsFile) -> Result<(), StoreError> {
        let text = toml::to_string(file).map_err(|e| StoreError::Serialize {
            what: "workflows",
            message: e.to_string(),
        })?;
        Self::write_atomic(&self.path(WORKFLOWS_FILE), &text)
    }
}

impl ConfigStore for FileStore {
    fn list_sources(&self) -> Result<Catalog, StoreError> {
        self.load_catalog()
    }

    fn upsert_source(&self, source: SourceDescriptor) -> Result<(), StoreError> {
        let _guard = self.write_lock()?;
        let mut catalog = self.load_catalog()?;
        let id = source.id.clone();
        catalog.upsert(source)?;
        self.save_catalog(&catalog)?;
        tracing::debug!(source = %id, "source saved");
        Ok(())
    }

    fn remove_source(&self, id: &str) -> Result<SourceDescriptor, StoreError> {
        let _guard = self.write_lock()?;
        let mut catalog = self.load_catalog()?;
        let removed = catalog.remove(id).map_err(|_| StoreError::NotFound {
            entity_type: "source",
            id: id.to_string(),
        })?;
        self.save_catalog(&catalog)?;
        tracing::debug!(source = %id, "source removed");
        Ok(removed)
    }

    fn list_workflows(&self) -> Result<Vec<WorkflowDefinition>, StoreError> {
        Ok(self.load_workflows()?.workflows)
    }

    fn upsert_workflow(&self, workflow: WorkflowDefinition) -> Result<(), StoreError> {
        workflow.validate()?;
        let _guard = self.write_lock()?;
        let mut file = self.load_workflows()?;
        match file.workflows.iter_mut().find(|w| w.id == workflow.id) {
            Some(existing) => *existing = workflow,
            None => file.workflows.push(workflow),
        }
        self.save_workflows(&file)
    }

    fn remove_workflow(&self, id: &str) -> Result<WorkflowDefinition, StoreError> {
        let _guard = self.write_lock()?;
        let mut file = self.load_workflows()?;
        let index = file
            .workflows
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| StoreError::NotFound {
                entity_type: "workflow",
                id: id.to_string(),
            })?;
        let removed = file.workflows.remove(index);
        self.save_workflows(&file)?;
        Ok(removed)
    }

    fn save_execution_log(&self, execution: &WorkflowExecution) -> Result<(), StoreError> {
        let path = self.path(EXECUTIONS_FILE);
        serde_jsonlines::append_json_lines(&path, [execution])
            .map_err(|e| StoreError::io(&path, e))?;
        tracing::debug!(
            execution = %execution.id,
            workflow = %execution.workflow_id,
            status = %execution.status,
            "execution logged"
        );
        Ok(())
    }

    fn list_executions(
        &self,
        workflow_id: Option<&str>,
    ) -> Result<Vec<WorkflowExecution>, StoreError> {
        let path = self.path(EXECUTIONS_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let executions: Vec<WorkflowExecution> = serde_jsonlines::json_lines(&path)
            .map_err(|e| StoreError::io(&path, e))?
            .collect::<Result<_, _>>()
            .map_err(|e| StoreError::Parse {
                path: path.clone(),
                message: e.to_string(),
            })?;
        Ok(executions
            .into_iter()
            .filter(|e| workflow_id.is_none_or(|id| e.workflow_id == id))
            .collect())
    }

    fn claim_workflow(&self, workflow_id: &str, execution_id: &str) -> Result<Claim, StoreError> {
        match lock::try_acquire(&self.claim_path(workflow_id), execution_id)? {
            LockState::Acquired => Ok(Claim::Acquired),
            LockState::HeldBy(holder) => Ok(Claim::HeldBy(holder.owner)),
        }
    }

    fn release_workflow(&self, workflow_id: &str, execution_id: &str) -> Result<(), StoreError> {
        lock::release(&self.claim_path(workflow_id), execution_id)
    }

    fn running_execution(&self, workflow_id: &str) -> Result<Option<String>, StoreError> {
        Ok(lock::read_holder(&self.claim_path(workflow_id))?.map(|holder| holder.owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin_catalog;

    #[test]
    fn missing_files_read_as_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join(".argus")).unwrap();
        assert!(store.list_sources().unwrap().is_empty());
        assert!(store.list_workflows().unwrap().is_empty());
        assert!(store.list_executions(None).unwrap().is_empty());
    }

    #[test]
    fn catalog_survives_a_toml_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let builtin = builtin_catalog().unwrap();
        for source in builtin.sources() {
            store.upsert_source(source.clone()).unwrap();
        }
        let reloaded = store.list_sources().unwrap();
        assert_eq!(reloaded, builtin);
    }

    #[test]
    fn claims_are_shared_between_store_handles() {
        let dir = tempfile::TempDir::new().unwrap();
        let first = FileStore::open(dir.path()).unwrap();
        let second = FileStore::open(dir.path()).unwrap();

        assert_eq!(
            first.claim_workflow("cases/nightly", "exe-0000000a").unwrap(),
            Claim::Acquired
        );
        assert_eq!(
            second.claim_workflow("cases/nightly", "exe-0000000b").unwrap(),
            Claim::HeldBy("exe-0000000a".to_string())
        );
        assert_eq!(
            second.running_execution("cases/nightly").unwrap().as_deref(),
            Some("exe-0000000a")
        );

        first.release_workflow("cases/nightly", "exe-0000000a").unwrap();
        assert!(second.running_execution("cases/nightly").unwrap().is_none());
        assert_eq!(
            second.claim_workflow("cases/nightly", "exe-0000000b").unwrap(),
            Claim::Acquired
        );
    }

    #[test]
    fn write_lock_is_not_left_behind() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let source = builtin_catalog().unwrap().sources()[0].clone();
        store.upsert_source(source).unwrap();
        assert!(!dir.path().join(WRITE_LOCK_FILE).exists());
    }

    #[test]
    fn corrupt_sources_file_is_a_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join(SOURCES_FILE), "[[source]]\nid = 3\n").unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.list_sources(),
            Err(StoreError::Parse { .. })
        ));
    }
}
