//! Kustomization document building and working-directory files.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tokio::io::AsyncRead;
use tracing::debug;

use crate::error::{KustomizeError, KustomizeResult};

/// Rendered manifests persisted from the filter's standard input.
pub const MANIFESTS_FILE: &str = "manifests.yaml";

/// Overlay specification consumed by `kustomize build`.
pub const KUSTOMIZATION_FILE: &str = "kustomization.yaml";

const KIND: &str = "Kustomization";
const API_VERSION: &str = "kustomize.config.k8s.io/v1beta1";

/// Top-level fields of a Kustomization.
const KNOWN_FIELDS: &[&str] = &[
    "apiVersion",
    "kind",
    "metadata",
    "openapi",
    "namePrefix",
    "nameSuffix",
    "namespace",
    "commonLabels",
    "labels",
    "commonAnnotations",
    "patches",
    "patchesStrategicMerge",
    "patchesJson6902",
    "images",
    "imageTags",
    "replacements",
    "replicas",
    "vars",
    "sortOptions",
    "resources",
    "components",
    "crds",
    "bases",
    "configMapGenerator",
    "secretGenerator",
    "helmGlobals",
    "helmCharts",
    "helmChartInflationGenerator",
    "generatorOptions",
    "configurations",
    "generators",
    "transformers",
    "validators",
    "buildMetadata",
    "inventory",
];

/// Expected value shape of a top-level field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    String,
    List,
    Map,
}

impl Shape {
    fn of(field: &str) -> Option<Self> {
        match field {
            "apiVersion" | "kind" | "namePrefix" | "nameSuffix" | "namespace" => Some(Self::String),
            "resources" | "components" | "crds" | "bases" | "patches" | "patchesStrategicMerge"
            | "patchesJson6902" | "images" | "replacements" | "replicas" | "vars"
            | "configMapGenerator" | "secretGenerator" | "helmCharts" | "configurations"
            | "generators" | "transformers" | "validators" | "buildMetadata" | "labels" => {
                Some(Self::List)
            }
            "metadata" | "commonLabels" | "commonAnnotations" | "generatorOptions" | "sortOptions" => {
                Some(Self::Map)
            }
            _ => None,
        }
    }

    /// Null decodes to the zero value, so it fits every shape.
    fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::String, Value::String(_)) => true,
            (Self::List, Value::Sequence(_)) => true,
            (Self::Map, Value::Mapping(_)) => true,
            _ => false,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::List => "a list",
            Self::Map => "a mapping",
        }
    }
}

/// A merged Kustomization document.
#[derive(Debug, Clone, PartialEq)]
pub struct Kustomization {
    document: Mapping,
}

impl Kustomization {
    /// Top-level field lookup.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.document.get(field)
    }

    /// Entries of the `resources` list.
    pub fn resources(&self) -> Vec<&str> {
        self.get("resources")
            .and_then(Value::as_sequence)
            .map(|seq| seq.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Field names in document order.
    pub fn fields(&self) -> Vec<&str> {
        self.document.keys().filter_map(Value::as_str).collect()
    }

    pub fn to_yaml(&self) -> KustomizeResult<String> {
        Ok(serde_yaml::to_string(&self.document)?)
    }
}

/// Builds the overlay specification and persists working-directory files.
pub struct OverlaySpecBuilder;

impl OverlaySpecBuilder {
    /// Merge patch documents into one Kustomization referencing the manifests.
    ///
    /// Top-level fields are last-write-wins across documents; empty
    /// documents contribute nothing. `kind` and `apiVersion` are filled in
    /// when no patch sets them, and the manifests file is appended to
    /// `resources`.
    pub fn merge<I, P>(patches: I) -> KustomizeResult<Kustomization>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        let mut merged = Mapping::new();

        for (index, patch) in patches.into_iter().enumerate() {
            let value: Value = serde_yaml::from_slice(patch.as_ref())
                .map_err(|source| KustomizeError::DecodePatch { index, source })?;

            let fields = match value {
                Value::Null => continue,
                Value::Mapping(fields) => fields,
                _ => {
                    return Err(KustomizeError::InvalidPatch {
                        index,
                        message: "expected a mapping".to_string(),
                    })
                }
            };

            for (key, value) in fields {
                let Some(name) = key.as_str() else {
                    return Err(KustomizeError::InvalidPatch {
                        index,
                        message: "field names must be strings".to_string(),
                    });
                };
                if !KNOWN_FIELDS.contains(&name) {
                    return Err(KustomizeError::UnknownField {
                        index,
                        field: name.to_string(),
                    });
                }
                if let Some(shape) = Shape::of(name) {
                    if !shape.accepts(&value) {
                        return Err(KustomizeError::InvalidPatch {
                            index,
                            message: format!("{} must be {}", name, shape.describe()),
                        });
                    }
                }
                merged.insert(key, value);
            }
        }

        let mut resources = match merged.shift_remove("resources") {
            Some(Value::Sequence(resources)) => resources,
            _ => Vec::new(),
        };
        resources.push(Value::from(MANIFESTS_FILE));

        let mut document = Mapping::new();
        document.insert(
            Value::from("kind"),
            merged.shift_remove("kind").unwrap_or_else(|| Value::from(KIND)),
        );
        document.insert(
            Value::from("apiVersion"),
            merged
                .shift_remove("apiVersion")
                .unwrap_or_else(|| Value::from(API_VERSION)),
        );
        document.insert(Value::from("resources"), Value::Sequence(resources));
        document.extend(merged);

        Ok(Kustomization { document })
    }

    /// Write the Kustomization into `dir`, failing if one already exists.
    pub fn write_spec(dir: &Path, kustomization: &Kustomization) -> KustomizeResult<PathBuf> {
        let path = dir.join(KUSTOMIZATION_FILE);
        debug!("Writing kustomization to {:?}", path);

        let content = kustomization.to_yaml()?;
        let mut file = create_exclusive(&path)?;
        file.write_all(content.as_bytes())?;
        Ok(path)
    }

    /// Persist the rendered manifests stream into `dir` verbatim, failing if
    /// the file already exists.
    pub async fn write_manifest<R>(dir: &Path, mut manifests: R) -> KustomizeResult<PathBuf>
    where
        R: AsyncRead + Unpin,
    {
        let path = dir.join(MANIFESTS_FILE);
        debug!("Writing manifests to {:?}", path);

        let file = create_exclusive(&path)?;
        let mut file = tokio::fs::File::from_std(file);
        tokio::io::copy(&mut manifests, &mut file).await?;
        tokio::io::AsyncWriteExt::flush(&mut file).await?;
        Ok(path)
    }
}

/// Open `path` for writing, refusing to touch an existing file.
pub fn create_exclusive(path: &Path) -> KustomizeResult<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => KustomizeError::FileExists(path.to_path_buf()),
            _ => KustomizeError::Io(e),
        })
}
