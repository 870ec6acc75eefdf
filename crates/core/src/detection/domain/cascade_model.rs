use ndarray::ArrayView2;
use thiserror::Error;

use crate::detection::domain::detection::DetectionWindow;
use crate::detection::domain::integral_image::IntegralImage;
use crate::shared::constants::MIN_WINDOW_STD_DEV;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct InvalidCascade(pub String);

/// One rectangle of a Haar-like feature, in base-window coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub weight: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    pub rects: Vec<WeightedRect>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Child {
    Node(usize),
    Leaf(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TreeNode {
    pub feature: usize,
    pub threshold: f64,
    pub left: Child,
    pub right: Child,
}

/// A small decision tree over feature responses. Node 0 is the root.
#[derive(Clone, Debug, PartialEq)]
pub struct WeakClassifier {
    pub nodes: Vec<TreeNode>,
    pub leaves: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stage {
    pub threshold: f64,
    pub classifiers: Vec<WeakClassifier>,
}

/// A trained multi-stage classifier. Immutable once built; share it via `Arc`.
#[derive(Clone, Debug, PartialEq)]
pub struct CascadeModel {
    name: String,
    window_width: u32,
    window_height: u32,
    features: Vec<Feature>,
    stages: Vec<Stage>,
}

impl CascadeModel {
    /// Builds a model, checking every structural invariant evaluation relies on.
    pub fn new(
        name: impl Into<String>,
        window_width: u32,
        window_height: u32,
        features: Vec<Feature>,
        stages: Vec<Stage>,
    ) -> Result<Self, InvalidCascade> {
        let model = Self {
            name: name.into(),
            window_width,
            window_height,
            features,
            stages,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn window_width(&self) -> u32 {
        self.window_width
    }

    pub fn window_height(&self) -> u32 {
        self.window_height
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Precomputes feature geometry for windows of the given size.
    pub fn at_scale(&self, win_w: u32, win_h: u32) -> ScaledCascade<'_> {
        let scale = win_w as f64 / self.window_width as f64;
        let features = self
            .features
            .iter()
            .map(|f| {
                f.rects
                    .iter()
                    .map(|r| ScaledRect::new(r, scale, win_w, win_h))
                    .collect()
            })
            .collect();
        ScaledCascade {
            model: self,
            win_w,
            win_h,
            features,
        }
    }

    /// Runs the cascade on one window. Pure: no state is touched, so this
    /// can be called from any number of threads on the same model.
    pub fn evaluate(&self, integral: &IntegralImage, window: &DetectionWindow) -> bool {
        if window.width == 0 || window.height == 0 {
            return false;
        }
        self.at_scale(window.width, window.height)
            .classify(integral, window.x, window.y)
    }

    /// Evaluates a standalone gray patch as a single window.
    pub fn evaluate_patch(&self, patch: ArrayView2<'_, u8>) -> bool {
        let (h, w) = patch.dim();
        if w == 0 || h == 0 {
            return false;
        }
        let integral = IntegralImage::new(patch);
        self.evaluate(&integral, &DetectionWindow::new(0, 0, w as u32, h as u32))
    }

    fn validate(&self) -> Result<(), InvalidCascade> {
        let fail = |msg: String| Err(InvalidCascade(msg));

        if self.window_width == 0 || self.window_height == 0 {
            return fail("window size must be positive".into());
        }
        if self.features.is_empty() {
            return fail("cascade has no features".into());
        }
        if self.stages.is_empty() {
            return fail("cascade has no stages".into());
        }

        for (fi, feature) in self.features.iter().enumerate() {
            if feature.rects.is_empty() {
                return fail(format!("feature {fi} has no rectangles"));
            }
            for r in &feature.rects {
                if r.width == 0 || r.height == 0 {
                    return fail(format!("feature {fi} has an empty rectangle"));
                }
                let right = r.x.checked_add(r.width);
                let bottom = r.y.checked_add(r.height);
                if right.map_or(true, |e| e > self.window_width)
                    || bottom.map_or(true, |e| e > self.window_height)
                {
                    return fail(format!("feature {fi} extends outside the base window"));
                }
            }
        }

        for (si, stage) in self.stages.iter().enumerate() {
            if !stage.threshold.is_finite() {
                return fail(format!("stage {si} threshold is not finite"));
            }
            if stage.classifiers.is_empty() {
                return fail(format!("stage {si} has no weak classifiers"));
            }
            for (ci, clf) in stage.classifiers.iter().enumerate() {
                self.validate_classifier(clf)
                    .map_err(|e| InvalidCascade(format!("stage {si} classifier {ci}: {e}")))?;
            }
        }
        Ok(())
    }

    fn validate_classifier(&self, clf: &WeakClassifier) -> Result<(), InvalidCascade> {
        if clf.nodes.is_empty() {
            return Err(InvalidCascade("no tree nodes".into()));
        }
        if clf.leaves.iter().any(|v| !v.is_finite()) {
            return Err(InvalidCascade("leaf value is not finite".into()));
        }
        for (ni, node) in clf.nodes.iter().enumerate() {
            if node.feature >= self.features.len() {
                return Err(InvalidCascade(format!(
                    "node {ni} references missing feature {}",
                    node.feature
                )));
            }
            if !node.threshold.is_finite() {
                return Err(InvalidCascade(format!("node {ni} threshold is not finite")));
            }
            for child in [node.left, node.right] {
                match child {
                    // Children must point forward so traversal always terminates.
                    Child::Node(c) if c <= ni || c >= clf.nodes.len() => {
                        return Err(InvalidCascade(format!(
                            "node {ni} has invalid child node {c}"
                        )));
                    }
                    Child::Leaf(l) if l >= clf.leaves.len() => {
                        return Err(InvalidCascade(format!("node {ni} has missing leaf {l}")));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

/// A feature rectangle mapped onto a concrete window size.
#[derive(Clone, Debug)]
struct ScaledRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    /// Weight times the rectangle's base area.
    weighted_area: i64,
}

impl ScaledRect {
    fn new(r: &WeightedRect, scale: f64, win_w: u32, win_h: u32) -> Self {
        let x = ((r.x as f64 * scale).round() as u32).min(win_w.saturating_sub(1));
        let y = ((r.y as f64 * scale).round() as u32).min(win_h.saturating_sub(1));
        let width = ((r.width as f64 * scale).round() as u32)
            .max(1)
            .min(win_w.saturating_sub(x));
        let height = ((r.height as f64 * scale).round() as u32)
            .max(1)
            .min(win_h.saturating_sub(y));
        Self {
            x,
            y,
            width,
            height,
            weighted_area: r.weight as i64 * r.width as i64 * r.height as i64,
        }
    }
}

/// A cascade bound to one window size: rectangles are scaled once per
/// rung of the scale ladder instead of once per window.
pub struct ScaledCascade<'a> {
    model: &'a CascadeModel,
    win_w: u32,
    win_h: u32,
    features: Vec<Vec<ScaledRect>>,
}

impl ScaledCascade<'_> {
    pub fn window_width(&self) -> u32 {
        self.win_w
    }

    pub fn window_height(&self) -> u32 {
        self.win_h
    }

    /// Classifies the window with its top-left corner at `(x, y)`.
    ///
    /// A feature's response is `sum(weight * base_area * scaled_mean) /
    /// (base_window_area * window_std_dev)`, which makes thresholds
    /// independent of window scale and lighting contrast. Stages run in
    /// order and the first one whose score falls below its threshold
    /// rejects the window.
    pub fn classify(&self, integral: &IntegralImage, x: u32, y: u32) -> bool {
        if self.win_w == 0 || self.win_h == 0 {
            return false;
        }
        let (_, std_dev) = integral.mean_std_dev(x, y, self.win_w, self.win_h);
        if std_dev < MIN_WINDOW_STD_DEV {
            return false;
        }
        let norm = (self.model.window_width as u64 * self.model.window_height as u64) as f64
            * std_dev;

        for stage in &self.model.stages {
            let mut score = 0.0;
            for clf in &stage.classifiers {
                score += self.eval_tree(clf, integral, x, y, norm);
            }
            if score < stage.threshold {
                return false;
            }
        }
        true
    }

    fn eval_tree(
        &self,
        clf: &WeakClassifier,
        integral: &IntegralImage,
        x: u32,
        y: u32,
        norm: f64,
    ) -> f64 {
        let mut idx = 0;
        loop {
            let node = &clf.nodes[idx];
            let response = self.response(node.feature, integral, x, y) / norm;
            let next = if response < node.threshold {
                node.left
            } else {
                node.right
            };
            match next {
                Child::Node(i) => idx = i,
                Child::Leaf(l) => return clf.leaves[l],
            }
        }
    }

    fn response(&self, feature: usize, integral: &IntegralImage, x: u32, y: u32) -> f64 {
        let mut acc = 0.0;
        for r in &self.features[feature] {
            let sum = integral.rect_sum(x + r.x, y + r.y, r.width, r.height);
            let area = r.width as u64 * r.height as u64;
            acc += (r.weighted_area as f64 * sum as f64) / area as f64;
        }
        acc
    }
}
