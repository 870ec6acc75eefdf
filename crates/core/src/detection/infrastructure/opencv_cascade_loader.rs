use std::str::FromStr;

use roxmltree::{Document, Node};

use crate::detection::domain::cascade_model::{
    CascadeModel, Child, Feature, InvalidCascade, Stage, TreeNode, WeakClassifier, WeightedRect,
};
use crate::detection::infrastructure::cascade_loader::LoadError;

/// Parses an OpenCV Haar cascade stored as XML.
///
/// Both layouts OpenCV ships are understood: the legacy
/// `opencv-haar-classifier` layout (`<size>`, `<trees>`, features inline in
/// each node) and the `opencv-cascade-classifier` layout written by
/// `opencv_traincascade` (`<width>`/`<height>`, `<internalNodes>`, a shared
/// `<features>` table). Tilted features and fractional rectangle weights
/// have no counterpart in [`CascadeModel`] and are rejected as invalid.
pub fn load_from_xml(bytes: &[u8]) -> Result<CascadeModel, LoadError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let text = std::str::from_utf8(bytes).map_err(|e| LoadError::Malformed(Box::new(e)))?;
    // An XML declaration is only legal as the very first token.
    let doc = Document::parse(text.trim_start())?;

    let cascade = doc
        .root_element()
        .children()
        .find(Node::is_element)
        .ok_or_else(|| malformed("document holds no cascade element"))?;

    if child(cascade, "size").is_some() {
        parse_legacy(cascade)
    } else if child(cascade, "width").is_some() {
        parse_traincascade(cascade)
    } else {
        Err(malformed(format!(
            "<{}> is neither a legacy nor a traincascade Haar cascade",
            cascade.tag_name().name()
        )))
    }
}

impl From<roxmltree::Error> for LoadError {
    fn from(e: roxmltree::Error) -> Self {
        match e {
            roxmltree::Error::UnexpectedEndOfStream | roxmltree::Error::UnclosedRootNode => {
                LoadError::Truncated
            }
            other => LoadError::Malformed(Box::new(other)),
        }
    }
}

// ── Legacy layout ──────────────────────────────────────────────────

fn parse_legacy(cascade: Node) -> Result<CascadeModel, LoadError> {
    let size: Vec<u32> = numbers(require(cascade, "size")?)?;
    let [width, height] = size[..] else {
        return Err(malformed("<size> must hold exactly two numbers"));
    };

    let mut features = Vec::new();
    let mut stages = Vec::new();
    for stage in items(require(cascade, "stages")?) {
        let mut classifiers = Vec::new();
        for tree in items(require(stage, "trees")?) {
            let mut nodes = Vec::new();
            let mut leaves = Vec::new();
            for node in items(tree) {
                let feature = require(node, "feature")?;
                features.push(parse_feature(feature, features.len())?);
                nodes.push(TreeNode {
                    feature: features.len() - 1,
                    threshold: number(require(node, "threshold")?)?,
                    left: legacy_child(node, "left", &mut leaves)?,
                    right: legacy_child(node, "right", &mut leaves)?,
                });
            }
            classifiers.push(WeakClassifier { nodes, leaves });
        }
        stages.push(Stage {
            threshold: number(require(stage, "stage_threshold")?)?,
            classifiers,
        });
    }

    let name = cascade.tag_name().name();
    Ok(CascadeModel::new(name, width, height, features, stages)?)
}

/// A legacy node names each child either `<side>_node` (an index into the
/// tree) or `<side>_val` (a leaf value stored inline).
fn legacy_child(node: Node, side: &str, leaves: &mut Vec<f64>) -> Result<Child, LoadError> {
    if let Some(next) = child(node, &format!("{side}_node")) {
        return Ok(Child::Node(number(next)?));
    }
    let value = require(node, &format!("{side}_val"))?;
    leaves.push(number(value)?);
    Ok(Child::Leaf(leaves.len() - 1))
}

// ── Traincascade layout ────────────────────────────────────────────

fn parse_traincascade(cascade: Node) -> Result<CascadeModel, LoadError> {
    for (tag, expected) in [("featureType", "HAAR"), ("stageType", "BOOST")] {
        if let Some(n) = child(cascade, tag) {
            let found = text(n);
            if found.trim() != expected {
                return Err(invalid(format!("unsupported {tag} '{}'", found.trim())));
            }
        }
    }
    let width = number(require(cascade, "width")?)?;
    let height = number(require(cascade, "height")?)?;

    let features = items(require(cascade, "features")?)
        .enumerate()
        .map(|(fi, f)| parse_feature(f, fi))
        .collect::<Result<Vec<_>, _>>()?;

    let mut stages = Vec::new();
    for stage in items(require(cascade, "stages")?) {
        let classifiers = items(require(stage, "weakClassifiers")?)
            .map(parse_weak_classifier)
            .collect::<Result<Vec<_>, _>>()?;
        stages.push(Stage {
            threshold: number(require(stage, "stageThreshold")?)?,
            classifiers,
        });
    }

    Ok(CascadeModel::new("cascade", width, height, features, stages)?)
}

/// `<internalNodes>` packs each node as `left right feature threshold`.
/// A child greater than zero is a node index; otherwise it is a leaf
/// index, negated.
fn parse_weak_classifier(clf: Node) -> Result<WeakClassifier, LoadError> {
    let packed = text(require(clf, "internalNodes")?);
    let tokens: Vec<&str> = packed.split_whitespace().collect();
    if tokens.is_empty() || tokens.len() % 4 != 0 {
        return Err(malformed(format!(
            "<internalNodes> holds {} values, expected groups of four",
            tokens.len()
        )));
    }

    let nodes = tokens
        .chunks_exact(4)
        .map(|n| -> Result<TreeNode, LoadError> {
            Ok(TreeNode {
                left: packed_child(parse_token(n[0])?),
                right: packed_child(parse_token(n[1])?),
                feature: parse_token(n[2])?,
                threshold: parse_token(n[3])?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(WeakClassifier {
        nodes,
        leaves: numbers(require(clf, "leafValues")?)?,
    })
}

fn packed_child(value: i64) -> Child {
    if value > 0 {
        Child::Node(value as usize)
    } else {
        Child::Leaf(value.unsigned_abs() as usize)
    }
}

// ── Shared pieces ──────────────────────────────────────────────────

/// Each rectangle reads `x y width height weight`.
fn parse_feature(feature: Node, index: usize) -> Result<Feature, LoadError> {
    if let Some(tilted) = child(feature, "tilted") {
        if number::<i64>(tilted)? != 0 {
            return Err(invalid(format!(
                "feature {index} is tilted, which is not supported"
            )));
        }
    }

    let mut rects = Vec::new();
    for rect in items(require(feature, "rects")?) {
        let packed = text(rect);
        let tokens: Vec<&str> = packed.split_whitespace().collect();
        let [x, y, width, height, weight] = tokens[..] else {
            return Err(malformed(format!(
                "feature {index} rectangle holds {} values, expected five",
                tokens.len()
            )));
        };
        let weight: f64 = parse_token(weight)?;
        if weight.fract() != 0.0 || weight.abs() > i32::MAX as f64 {
            return Err(invalid(format!(
                "feature {index} has non-integer weight {weight}"
            )));
        }
        rects.push(WeightedRect {
            x: parse_token(x)?,
            y: parse_token(y)?,
            width: parse_token(width)?,
            height: parse_token(height)?,
            weight: weight as i32,
        });
    }
    Ok(Feature { rects })
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == tag)
}

fn require<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Result<Node<'a, 'input>, LoadError> {
    child(node, tag)
        .ok_or_else(|| malformed(format!("<{}> has no <{tag}>", node.tag_name().name())))
}

/// OpenCV stores sequences as anonymous `<_>` elements.
fn items<'a, 'input: 'a>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(|c| c.is_element() && c.tag_name().name() == "_")
}

/// All text directly under `node`, skipping interleaved comments.
fn text(node: Node) -> String {
    node.children()
        .filter(Node::is_text)
        .filter_map(|c| c.text())
        .collect::<Vec<_>>()
        .join(" ")
}

fn numbers<T: FromStr>(node: Node) -> Result<Vec<T>, LoadError> {
    text(node).split_whitespace().map(parse_token).collect()
}

fn number<T: FromStr>(node: Node) -> Result<T, LoadError> {
    let values = numbers(node)?;
    match <[T; 1]>::try_from(values) {
        Ok([value]) => Ok(value),
        Err(_) => Err(malformed(format!(
            "<{}> must hold a single number",
            node.tag_name().name()
        ))),
    }
}

fn parse_token<T: FromStr>(token: &str) -> Result<T, LoadError> {
    token
        .parse()
        .map_err(|_| malformed(format!("'{token}' is not a valid number here")))
}

fn malformed(reason: impl Into<String>) -> LoadError {
    LoadError::Malformed(reason.into().into())
}

fn invalid(reason: String) -> LoadError {
    LoadError::Invalid(InvalidCascade(reason))
}
