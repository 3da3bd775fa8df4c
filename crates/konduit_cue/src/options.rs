//! Load configuration for the CUE engine.

use std::path::{Path, PathBuf};

/// Definition that scope data is injected under.
pub const DEFAULT_SCOPE_PATH: &str = "#Konduit";

/// Default CUE executable.
pub const DEFAULT_CUE_COMMAND: &str = "cue";

#[derive(Debug, Clone)]
pub struct CueOptions {
    /// Directory the engine runs in; input paths resolve against it.
    pub base_dir: Option<PathBuf>,
    /// Directory containing `cue.mod`, used when no base dir is set.
    pub module_root: Option<PathBuf>,
    /// Inline JSON/YAML or `@file` scope documents.
    pub scopes: Vec<String>,
    pub scope_path: String,
}

impl Default for CueOptions {
    fn default() -> Self {
        Self {
            base_dir: None,
            module_root: None,
            scopes: Vec::new(),
            scope_path: DEFAULT_SCOPE_PATH.to_string(),
        }
    }
}

impl CueOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn module_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.module_root = Some(dir.into());
        self
    }

    pub fn scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes.extend(scopes);
        self
    }

    pub fn scope_path(mut self, path: impl Into<String>) -> Self {
        self.scope_path = path.into();
        self
    }

    /// Directory the engine should run in, if not the current one.
    pub fn load_dir(&self) -> Option<&Path> {
        self.base_dir
            .as_deref()
            .or(self.module_root.as_deref())
            .filter(|dir| !dir.as_os_str().is_empty())
    }
}
