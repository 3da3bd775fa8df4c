//! The evaluation-engine capability.
//!
//! Everything that turns source documents into values or patch content
//! implements [`Evaluator`]. The instance only ever talks to the trait, so
//! tests substitute a mock and the CLI plugs in the CUE engine.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Failure reported by an evaluation engine.
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("no files to evaluate")]
    NoFiles,

    #[error(transparent)]
    Engine(Box<dyn std::error::Error + Send + Sync>),
}

impl EvaluationError {
    pub fn engine(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Engine(e.into())
    }
}

/// An engine that evaluates source files into a YAML document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// File extension (with leading dot) this engine evaluates.
    ///
    /// An empty extension means nothing is routed to the engine.
    fn supported_extension(&self) -> &'static str;

    /// Evaluate `files`, in order, into one document.
    async fn evaluate(&self, files: &[String]) -> Result<Vec<u8>, EvaluationError>;
}

/// Evaluator used when no engine is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvaluator;

impl NoopEvaluator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Evaluator for NoopEvaluator {
    fn supported_extension(&self) -> &'static str {
        ""
    }

    async fn evaluate(&self, _files: &[String]) -> Result<Vec<u8>, EvaluationError> {
        Ok(Vec::new())
    }
}

/// Source files of one category and the document they evaluated to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,

    /// Empty until the engine has run.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub result: String,
}

impl Evaluation {
    pub fn new(files: Vec<String>) -> Self {
        Self {
            files,
            result: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_evaluator() {
        let eval = NoopEvaluator::new();
        assert_eq!(eval.supported_extension(), "");
        assert!(eval.evaluate(&["values.cue".to_string()]).await.unwrap().is_empty());
    }

    #[test]
    fn test_evaluation_serialization_omits_empty_fields() {
        let empty = Evaluation::default();
        assert_eq!(serde_json::to_string(&empty).unwrap(), "{}");

        let evaluation = Evaluation {
            files: vec!["values.cue".to_string()],
            result: "key: value\n".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&evaluation).unwrap(),
            r#"{"files":["values.cue"],"result":"key: value\n"}"#
        );
    }
}
