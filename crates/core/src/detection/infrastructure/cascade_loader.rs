use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::detection::domain::cascade_model::{
    CascadeModel, Child, Feature, InvalidCascade, Stage, TreeNode, WeakClassifier, WeightedRect,
};
use crate::detection::infrastructure::opencv_cascade_loader;
use crate::shared::constants::CASCADE_FORMAT_VERSION;
use crate::shared::settings::ConfigError;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read model {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model document is truncated")]
    Truncated,
    #[error("model document is malformed: {0}")]
    Malformed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("unsupported model format version {found} (expected {})", CASCADE_FORMAT_VERSION)]
    UnsupportedVersion { found: u32 },
    #[error("invalid cascade: {0}")]
    Invalid(#[from] InvalidCascade),
    #[error("cannot build detector: {0}")]
    Detector(#[source] ConfigError),
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        match e.classify() {
            serde_json::error::Category::Eof => LoadError::Truncated,
            _ => LoadError::Malformed(Box::new(e)),
        }
    }
}

#[derive(Deserialize)]
struct VersionHeader {
    format_version: u32,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CascadeDoc {
    #[allow(dead_code)]
    format_version: u32,
    name: String,
    window: WindowDoc,
    features: Vec<FeatureDoc>,
    stages: Vec<StageDoc>,
}

#[derive(Deserialize)]
struct WindowDoc {
    width: u32,
    height: u32,
}

#[derive(Deserialize)]
struct FeatureDoc {
    rects: Vec<RectDoc>,
}

#[derive(Deserialize)]
struct RectDoc {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    weight: i32,
}

#[derive(Deserialize)]
struct StageDoc {
    threshold: f64,
    classifiers: Vec<ClassifierDoc>,
}

#[derive(Deserialize)]
struct ClassifierDoc {
    nodes: Vec<NodeDoc>,
    leaves: Vec<f64>,
}

#[derive(Deserialize)]
struct NodeDoc {
    feature: usize,
    threshold: f64,
    left: ChildDoc,
    right: ChildDoc,
}

#[derive(Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum ChildDoc {
    Node(usize),
    Leaf(usize),
}

impl From<ChildDoc> for Child {
    fn from(c: ChildDoc) -> Self {
        match c {
            ChildDoc::Node(i) => Child::Node(i),
            ChildDoc::Leaf(i) => Child::Leaf(i),
        }
    }
}

/// Reads and validates a cascade document from disk.
pub fn load(path: &Path) -> Result<CascadeModel, LoadError> {
    let bytes = std::fs::read(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let model = load_from_bytes(&bytes)?;
    log::info!(
        "Loaded cascade model '{}' from {} ({} stages, {}x{} window)",
        model.name(),
        path.display(),
        model.stages().len(),
        model.window_width(),
        model.window_height()
    );
    Ok(model)
}

/// Parses and validates a cascade document held in memory. Documents whose
/// first significant byte is `<` are read as OpenCV Haar XML, anything else
/// as the native JSON format.
pub fn load_from_bytes(bytes: &[u8]) -> Result<CascadeModel, LoadError> {
    if is_xml(bytes) {
        opencv_cascade_loader::load_from_xml(bytes)
    } else {
        load_from_json(bytes)
    }
}

fn is_xml(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    bytes.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'<')
}

fn load_from_json(bytes: &[u8]) -> Result<CascadeModel, LoadError> {
    // The version is checked before the full parse so a future layout is
    // reported as unsupported rather than malformed.
    let header: VersionHeader = serde_json::from_slice(bytes)?;
    if header.format_version != CASCADE_FORMAT_VERSION {
        return Err(LoadError::UnsupportedVersion {
            found: header.format_version,
        });
    }

    let doc: CascadeDoc = serde_json::from_slice(bytes)?;
    let features = doc
        .features
        .into_iter()
        .map(|f| Feature {
            rects: f
                .rects
                .into_iter()
                .map(|r| WeightedRect {
                    x: r.x,
                    y: r.y,
                    width: r.width,
                    height: r.height,
                    weight: r.weight,
                })
                .collect(),
        })
        .collect();
    let stages = doc
        .stages
        .into_iter()
        .map(|s| Stage {
            threshold: s.threshold,
            classifiers: s
                .classifiers
                .into_iter()
                .map(|c| WeakClassifier {
                    nodes: c
                        .nodes
                        .into_iter()
                        .map(|n| TreeNode {
                            feature: n.feature,
                            threshold: n.threshold,
                            left: n.left.into(),
                            right: n.right.into(),
                        })
                        .collect(),
                    leaves: c.leaves,
                })
                .collect(),
        })
        .collect();

    Ok(CascadeModel::new(
        doc.name,
        doc.window.width,
        doc.window.height,
        features,
        stages,
    )?)
}
