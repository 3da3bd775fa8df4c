//! Integration tests for instance execution against the mock runner.

use std::sync::Arc;

use async_trait::async_trait;
use konduit_core::{
    CoreError, EvaluationError, Evaluator, Instance, InstanceConfig, NoopEvaluator, DEFAULT_HELM_COMMAND,
    VALUES_FILE,
};
use konduit_kustomize::KUSTOMIZATION_FILE;
use konduit_runner::{CancellationToken, MockResponse, MockRunner};
use pretty_assertions::assert_eq;

/// Evaluates `.cue` files to a fixed document, or fails.
struct FixedEvaluator(Result<&'static str, &'static str>);

#[async_trait]
impl Evaluator for FixedEvaluator {
    fn supported_extension(&self) -> &'static str {
        ".cue"
    }

    async fn evaluate(&self, _files: &[String]) -> Result<Vec<u8>, EvaluationError> {
        match self.0 {
            Ok(output) => Ok(output.as_bytes().to_vec()),
            Err(message) => Err(EvaluationError::engine(message)),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn instance(config: InstanceConfig, evaluator: impl Evaluator + 'static, runner: &MockRunner) -> Instance {
    Instance::new(config, Arc::new(evaluator), Arc::new(runner.clone())).unwrap()
}

/// Test the synthesized arguments reach the runner unchanged.
#[tokio::test]
async fn test_execute_passes_args_to_runner() {
    let dir = tempfile::tempdir().unwrap();
    let runner = MockRunner::new();
    let config = InstanceConfig::new(strings(&["template", "my-release", "-f", "values.yaml"])).work_dir(dir.path());

    instance(config, NoopEvaluator, &runner)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    let calls = runner.get_command_calls(DEFAULT_HELM_COMMAND);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].args, strings(&["template", "my-release", "--values", "values.yaml"]));
    assert!(calls[0].stdin.is_none());
    assert!(!calls[0].stdout_redirected);
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

/// Test evaluated values are persisted where the arguments point.
#[tokio::test]
async fn test_execute_writes_evaluated_values() {
    let dir = tempfile::tempdir().unwrap();
    let runner = MockRunner::new();
    let config = InstanceConfig::new(strings(&["template", "my-release"]))
        .values(strings(&["values.cue"]))
        .work_dir(dir.path());

    instance(config, FixedEvaluator(Ok("key: value\n")), &runner)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    let values_path = dir.path().join(VALUES_FILE);
    assert_eq!(std::fs::read_to_string(&values_path).unwrap(), "key: value\n");

    let calls = runner.get_calls();
    assert_eq!(
        calls[0].args[2..],
        ["--values".to_string(), values_path.to_string_lossy().into_owned()]
    );
}

/// Test evaluated and static patches are merged into the overlay spec.
#[tokio::test]
async fn test_execute_prepares_overlay_spec() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = tempfile::tempdir().unwrap();
    let static_patch = inputs.path().join("patches.yaml");
    std::fs::write(&static_patch, "namespace: apps\nnamePrefix: static-\n").unwrap();

    let runner = MockRunner::new();
    let config = InstanceConfig::new(strings(&["template", "my-release"]))
        .patches(vec!["patches.cue".to_string(), static_patch.to_string_lossy().into_owned()])
        .work_dir(dir.path());

    instance(config, FixedEvaluator(Ok("namePrefix: test-")), &runner)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    let spec: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(dir.path().join(KUSTOMIZATION_FILE)).unwrap()).unwrap();
    let expected: serde_yaml::Value = serde_yaml::from_str(
        "kind: Kustomization\n\
         apiVersion: kustomize.config.k8s.io/v1beta1\n\
         resources: [manifests.yaml]\n\
         namePrefix: static-\n\
         namespace: apps\n",
    )
    .unwrap();
    assert_eq!(spec, expected);

    let args = &runner.get_calls()[0].args;
    let dir_arg = dir.path().to_string_lossy().into_owned();
    assert_eq!(args[args.len() - 2..], ["--post-renderer-args".to_string(), dir_arg]);
}

/// Test a temporary working directory is created and removed.
#[tokio::test]
async fn test_execute_uses_temporary_work_dir() {
    let runner = MockRunner::new();
    let config = InstanceConfig::new(strings(&["template", "my-release"])).values(strings(&["values.cue"]));

    instance(config, FixedEvaluator(Ok("key: value\n")), &runner)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    let args = &runner.get_calls()[0].args;
    let values_path = std::path::Path::new(&args[3]);
    let work_dir = values_path.parent().unwrap();

    assert!(work_dir
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("konduit-"));
    assert!(!work_dir.exists());
}

/// Test failures carry their stage and stop before the runner.
#[tokio::test]
async fn test_execute_reports_evaluation_stage() {
    let dir = tempfile::tempdir().unwrap();
    let runner = MockRunner::new();
    let config = InstanceConfig::new(strings(&["template"]))
        .values(strings(&["invalid.cue"]))
        .work_dir(dir.path());

    let err = instance(config, FixedEvaluator(Err("incomplete value")), &runner)
        .execute(&CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "construct invocation: evaluate values: incomplete value"
    );
    assert!(matches!(err.root(), CoreError::Evaluation { .. }));
    assert_eq!(runner.call_count(), 0);
}

/// Test a pre-existing artifact is never overwritten.
#[tokio::test]
async fn test_execute_refuses_existing_values_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(VALUES_FILE), "stale: true\n").unwrap();
    let runner = MockRunner::new();
    let config = InstanceConfig::new(strings(&["template"]))
        .values(strings(&["values.cue"]))
        .work_dir(dir.path());

    let err = instance(config, FixedEvaluator(Ok("key: value\n")), &runner)
        .execute(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("write evaluated values: "));
    assert_eq!(runner.call_count(), 0);
}

/// Test a missing static patch fails overlay preparation.
#[tokio::test]
async fn test_execute_reports_missing_patch() {
    let dir = tempfile::tempdir().unwrap();
    let runner = MockRunner::new();
    let config = InstanceConfig::new(strings(&["template"]))
        .patches(strings(&["/nonexistent/patches.yaml"]))
        .work_dir(dir.path());

    let err = instance(config, NoopEvaluator, &runner)
        .execute(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("prepare overlay specification: read patch file"));
    assert!(matches!(err.root(), CoreError::ReadPatch { .. }));
}

/// Test a failing templating tool surfaces as the run stage.
#[tokio::test]
async fn test_execute_reports_runner_failure() {
    let dir = tempfile::tempdir().unwrap();
    let runner = MockRunner::new().respond(DEFAULT_HELM_COMMAND, MockResponse::failure(1));
    let config = InstanceConfig::new(strings(&["template"])).work_dir(dir.path());

    let err = instance(config, NoopEvaluator, &runner)
        .execute(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("run invocation: "));
    assert!(!err.is_cancelled());
}

/// Test cancellation is reported as such.
#[tokio::test]
async fn test_execute_reports_cancellation() {
    let dir = tempfile::tempdir().unwrap();
    let runner = MockRunner::new();
    let config = InstanceConfig::new(strings(&["template"]))
        .helm_command("/usr/local/bin/helm")
        .work_dir(dir.path());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = instance(config, NoopEvaluator, &runner)
        .execute(&cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(runner.get_calls()[0].command, "/usr/local/bin/helm");
}
