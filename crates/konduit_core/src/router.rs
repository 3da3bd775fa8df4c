//! Routing of input files between static use and evaluation.

use crate::error::{Category, CoreError, CoreResult};

/// Files of one category split by whether the engine evaluates them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Routed {
    pub static_files: Vec<String>,
    pub to_evaluate: Vec<String>,
}

impl Routed {
    /// Fail when both halves are in use.
    pub fn check_strict(&self, category: Category) -> CoreResult<()> {
        if !self.static_files.is_empty() && !self.to_evaluate.is_empty() {
            return Err(CoreError::StrictConflict { category });
        }
        Ok(())
    }
}

/// Partitions files by the evaluator's supported extension.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationRouter<'a> {
    extension: &'a str,
}

impl<'a> EvaluationRouter<'a> {
    pub fn new(extension: &'a str) -> Self {
        Self { extension }
    }

    /// Split `files`, keeping their relative order in both halves.
    pub fn partition(&self, files: &[String]) -> Routed {
        let mut routed = Routed::default();

        for file in files {
            if !self.extension.is_empty() && file_extension(file) == self.extension {
                routed.to_evaluate.push(file.clone());
            } else {
                routed.static_files.push(file.clone());
            }
        }

        routed
    }
}

/// Extension of the final path element, including the dot.
fn file_extension(path: &str) -> &str {
    let name_start = path.rfind(['/', '\\']).map_or(0, |i| i + 1);
    match path[name_start..].rfind('.') {
        Some(dot) => &path[name_start + dot..],
        None => "",
    }
}
