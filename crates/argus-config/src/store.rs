//! Configuration store location.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

fn default_root() -> String {
    ".argus".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Directory holding `sources.toml`, `workflows.toml` and `executions.jsonl`.
    /// Relative paths resolve against the project directory.
    #[serde(default = "default_root")]
    pub root: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

impl StoreConfig {
    pub fn resolve_root(&self, project_dir: &Path) -> PathBuf {
        let root = Path::new(&self.root);
        if root.is_absolute() {
            root.to_path_buf()
        } else {
            project_dir.join(root)
        }
    }
}
