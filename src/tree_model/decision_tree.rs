use core::fmt;

use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use super::{
    impurity::Impurity,
    node::{check_examples, grow, Example, Node},
};
use crate::{
    error::NjangError,
    metrics::{coefficient_of_determination, Report, POSITIVE_THRESHOLD},
    traits::{ClassificationModel, RegressionModel, Scalar},
};

pub(crate) const DEFAULT_MIN_GAIN: f64 = 0.1;

/// Hyperparameters of a decision tree.
///
/// - **impurity**: label heterogeneity measure minimized by the splits, see
///   [`Impurity`].
/// - **min_gain**: a node is split only when the best split gains strictly
///   more than this value, otherwise it becomes a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeSettings<T> {
    pub impurity: Impurity,
    pub min_gain: T,
}

impl<T: Scalar> Default for DecisionTreeSettings<T> {
    fn default() -> Self {
        Self {
            impurity: Impurity::default(),
            min_gain: T::cast(DEFAULT_MIN_GAIN),
        }
    }
}

/// Binary decision tree grown greedily on real valued features.
///
/// Leaves hold the mean label of the training examples reaching them, which
/// is the probability of the positive class when labels are in `{0, 1}` and
/// a point estimate for regression.
///
/// Each call to [`DecisionTree::fit`] grows a brand new tree. Predictions only
/// read the fitted nodes.
/// ```
/// use ndarray::array;
/// use njang_trees::{DecisionTree, DecisionTreeSettings, Impurity};
/// let x = array![[1.], [2.], [3.], [4.]];
/// let y = array![0., 0., 1., 1.];
/// let mut tree = DecisionTree::new(DecisionTreeSettings {
///     impurity: Impurity::Gini,
///     min_gain: 0.1,
/// });
/// tree.fit(&x, &y).unwrap();
/// assert_eq!(tree.predict(&array![[1.5], [3.5]]).unwrap(), array![0., 1.]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TreeParts<T>")]
pub struct DecisionTree<T> {
    pub settings: DecisionTreeSettings<T>,
    n_features: usize,
    nodes: Vec<Node<T>>,
}

/// Unchecked content of a serialized tree.
#[derive(Deserialize)]
struct TreeParts<T> {
    settings: DecisionTreeSettings<T>,
    n_features: usize,
    nodes: Vec<Node<T>>,
}

impl<T> TryFrom<TreeParts<T>> for DecisionTree<T> {
    type Error = NjangError;
    fn try_from(parts: TreeParts<T>) -> Result<Self, Self::Error> {
        check_arena(&parts.nodes, parts.n_features)?;
        Ok(Self {
            settings: parts.settings,
            n_features: parts.n_features,
            nodes: parts.nodes,
        })
    }
}

/// Makes sure `nodes` describe a single tree rooted at index 0: children
/// come after their parent, are in bounds and have exactly one parent.
fn check_arena<T>(nodes: &[Node<T>], n_features: usize) -> Result<(), NjangError> {
    if nodes.is_empty() {
        return Ok(());
    }
    if n_features == 0 {
        return Err(NjangError::invalid("fitted tree without feature"));
    }
    let mut has_parent = vec![false; nodes.len()];
    for (index, node) in nodes.iter().enumerate() {
        if let Node::Branch {
            split, left, right, ..
        } = node
        {
            if split.dimension >= n_features {
                return Err(NjangError::invalid(format!(
                    "node {index} splits on dimension {} out of {n_features}",
                    split.dimension
                )));
            }
            for child in [*left, *right] {
                if child <= index || child >= nodes.len() || has_parent[child] {
                    return Err(NjangError::invalid(format!(
                        "node {index} has an invalid child {child}"
                    )));
                }
                has_parent[child] = true;
            }
        }
    }
    if has_parent.iter().skip(1).any(|linked| !linked) {
        return Err(NjangError::invalid("some nodes are detached from the root"));
    }
    Ok(())
}

impl<T: Scalar> DecisionTree<T> {
    pub fn new(settings: DecisionTreeSettings<T>) -> Self {
        Self {
            settings,
            n_features: 0,
            nodes: Vec::new(),
        }
    }

    /// Rebuilds a fitted tree from its nodes, the root being the first one.
    ///
    /// Fails when the nodes do not form a tree.
    pub fn from_nodes(
        settings: DecisionTreeSettings<T>,
        n_features: usize,
        nodes: Vec<Node<T>>,
    ) -> Result<Self, NjangError> {
        Self::try_from(TreeParts {
            settings,
            n_features,
            nodes,
        })
    }

    /// Nodes of the tree, empty before fitting.
    pub fn nodes(&self) -> &[Node<T>] {
        &self.nodes
    }

    /// Number of features seen during fit.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn is_fitted(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// Trains the tree on the rows of `x` labeled by `y`.
    pub fn fit(&mut self, x: &Array2<T>, y: &Array1<T>) -> Result<(), NjangError> {
        let mut examples = examples(x, y.view())?;
        self.fit_examples(&mut examples)
    }

    /// Trains the tree on `examples`, which get reordered in the process.
    ///
    /// The previous tree is kept if training fails.
    pub fn fit_examples(&mut self, examples: &mut [Example<'_, T>]) -> Result<(), NjangError> {
        let n_features = check_examples(examples)?;
        self.nodes = grow(examples, self.settings.impurity, self.settings.min_gain);
        self.n_features = n_features;
        debug!(
            "fitted tree on {} examples: {} nodes, depth {}",
            examples.len(),
            self.nodes.len(),
            self.depth()
        );
        Ok(())
    }

    /// Value of the leaf reached by each row of `x`.
    pub fn predict(&self, x: &Array2<T>) -> Result<Array1<T>, NjangError> {
        self.check_points(x.ncols())?;
        #[cfg(feature = "rayon")]
        let values: Vec<T> = {
            use rayon::prelude::*;
            (0..x.nrows())
                .into_par_iter()
                .map(|row| self.leaf_value(&x.row(row)))
                .collect()
        };
        #[cfg(not(feature = "rayon"))]
        let values: Vec<T> = x
            .axis_iter(Axis(0))
            .map(|point| self.leaf_value(&point))
            .collect();
        Ok(Array1::from_vec(values))
    }

    /// Value of the leaf reached by `point`.
    pub fn predict_point(&self, point: ArrayView1<T>) -> Result<T, NjangError> {
        self.check_points(point.len())?;
        Ok(self.leaf_value(&point))
    }

    fn check_points(&self, n_features: usize) -> Result<(), NjangError> {
        if !self.is_fitted() {
            return Err(NjangError::NotFitted {
                model: "DecisionTree",
            });
        }
        if n_features != self.n_features {
            return Err(NjangError::invalid(format!(
                "points have {n_features} features, the tree was fitted with {}",
                self.n_features
            )));
        }
        Ok(())
    }

    fn leaf_value(&self, point: &ArrayView1<T>) -> T {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { label } => return *label,
                Node::Branch {
                    split, left, right, ..
                } => {
                    index = if split.goes_left(point) { *left } else { *right };
                }
            }
        }
    }

    /// Length of the longest path from the root to a leaf, zero for a lone
    /// leaf or an unfitted tree.
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut depth = 0;
        let mut pending = vec![(0, 0)];
        while let Some((index, level)) = pending.pop() {
            depth = depth.max(level);
            if let Node::Branch { left, right, .. } = &self.nodes[index] {
                pending.push((*left, level + 1));
                pending.push((*right, level + 1));
            }
        }
        depth
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }
}

impl<T: Scalar> fmt::Display for DecisionTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "DecisionTree {{ impurity: {:?}, min_gain: {} }}",
            self.settings.impurity, self.settings.min_gain
        )?;
        if self.nodes.is_empty() {
            return writeln!(f, "  (not fitted)");
        }
        let mut pending = vec![(0, 1)];
        while let Some((index, level)) = pending.pop() {
            let indent = "  ".repeat(level);
            match &self.nodes[index] {
                Node::Leaf { label } => writeln!(f, "{indent}leaf: {label:.3}")?,
                Node::Branch {
                    split,
                    gain,
                    left,
                    right,
                } => {
                    writeln!(
                        f,
                        "{indent}x[{}] < {:.3} (gain: {:.3})",
                        split.dimension, split.threshold, gain
                    )?;
                    pending.push((*right, level + 1));
                    pending.push((*left, level + 1));
                }
            }
        }
        Ok(())
    }
}

/// Pairs the rows of `x` with `labels`.
pub(crate) fn examples<'a, T: Scalar>(
    x: &'a Array2<T>,
    labels: ArrayView1<T>,
) -> Result<Vec<Example<'a, T>>, NjangError> {
    if x.nrows() != labels.len() {
        return Err(NjangError::invalid(format!(
            "{} rows for {} labels",
            x.nrows(),
            labels.len()
        )));
    }
    Ok(x.axis_iter(Axis(0))
        .zip(labels.iter())
        .enumerate()
        .map(|(position, (features, label))| Example::new(features, *label, position))
        .collect())
}

/// Decision tree for binary classification, labels being `0` or `1`.
///
/// [`ClassificationModel::predict`] gives the probability of the positive
/// class, [`ClassificationModel::score`] thresholds it at `0.5`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeClassifier<T> {
    pub tree: DecisionTree<T>,
    #[serde(skip)]
    report: Option<Report<T>>,
}

impl<T: Scalar> TreeClassifier<T> {
    pub fn new(settings: DecisionTreeSettings<T>) -> Self {
        Self {
            tree: DecisionTree::new(settings),
            report: None,
        }
    }

    /// Contingency report of the predictions of `x` against `y`.
    pub fn evaluate(&self, x: &Array2<T>, y: &Array1<T>) -> Result<Report<T>, NjangError> {
        let predictions = self.tree.predict(x)?;
        Report::from_predictions(predictions.view(), y.view(), T::cast(POSITIVE_THRESHOLD))
    }
}

impl<T: Scalar> ClassificationModel for TreeClassifier<T> {
    type X = Array2<T>;
    type Y = Array1<T>;
    type FitResult = Result<(), NjangError>;
    type PredictResult = Result<Array1<T>, NjangError>;
    type ScoreResult = Result<T, NjangError>;
    type Report = Report<T>;
    fn fit(&mut self, x: &Self::X, y: &Self::Y) -> Self::FitResult {
        self.tree.fit(x, y)?;
        info!(
            "fitted tree classifier with {} leaves",
            self.tree.n_leaves()
        );
        Ok(())
    }
    fn predict(&self, x: &Self::X) -> Self::PredictResult {
        self.tree.predict(x)
    }
    fn score(&mut self, x: &Self::X, y: &Self::Y) -> Self::ScoreResult {
        let report = self.evaluate(x, y)?;
        self.report = Some(report);
        Ok(report.accuracy)
    }
    fn report(&self) -> Option<&Self::Report> {
        self.report.as_ref()
    }
}

/// Regression tree, splits minimize the variance of the labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeRegressor<T> {
    pub tree: DecisionTree<T>,
}

impl<T: Scalar> TreeRegressor<T> {
    pub fn new(min_gain: T) -> Self {
        Self {
            tree: DecisionTree::new(DecisionTreeSettings {
                impurity: Impurity::Mse,
                min_gain,
            }),
        }
    }
}

impl<T: Scalar> RegressionModel for TreeRegressor<T> {
    type X = Array2<T>;
    type Y = Array1<T>;
    type FitResult = Result<(), NjangError>;
    type PredictResult = Result<Array1<T>, NjangError>;
    type ScoreResult = Result<T, NjangError>;
    fn fit(&mut self, x: &Self::X, y: &Self::Y) -> Self::FitResult {
        self.tree.fit(x, y)?;
        info!("fitted tree regressor with {} leaves", self.tree.n_leaves());
        Ok(())
    }
    fn predict(&self, x: &Self::X) -> Self::PredictResult {
        self.tree.predict(x)
    }
    fn score(&self, x: &Self::X, y: &Self::Y) -> Self::ScoreResult {
        let predictions = self.tree.predict(x)?;
        coefficient_of_determination(predictions.view(), y.view())
    }
}
