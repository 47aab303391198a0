use core::cmp::Ordering;

use log::{debug, trace};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use super::impurity::{is_positive, proportion, Impurity};
use crate::{error::NjangError, traits::Scalar, utils::mean};

/// A training example: a row of features with its label.
///
/// `position` only serves as tie breaker when sorting examples with equal
/// feature values, which makes training reproducible.
#[derive(Debug, Clone)]
pub struct Example<'a, T> {
    pub features: ArrayView1<'a, T>,
    pub label: T,
    pub(crate) position: usize,
}

impl<'a, T> Example<'a, T> {
    pub fn new(features: ArrayView1<'a, T>, label: T, position: usize) -> Self {
        Self {
            features,
            label,
            position,
        }
    }
}

/// Decision rule of a branch: go left when `point[dimension] < threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitInfo<T> {
    pub dimension: usize,
    pub threshold: T,
}

impl<T: Scalar> SplitInfo<T> {
    pub fn goes_left(&self, point: &ArrayView1<T>) -> bool {
        point[self.dimension] < self.threshold
    }
}

/// Node of a fitted tree, stored in an arena where children are referred to
/// by their index.
///
/// A branch always owns exactly two children located after it in the arena,
/// a leaf never has children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node<T> {
    /// Mean label of the training examples that reached the node. For
    /// classification this is the probability of the positive class.
    Leaf { label: T },
    Branch {
        split: SplitInfo<T>,
        gain: T,
        left: usize,
        right: usize,
    },
}

impl<T> Node<T> {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }
}

/// Best split found at a node: examples sorted along `split.dimension` go
/// left up to `index` (excluded).
#[derive(Debug, Clone, Copy)]
struct Candidate<T> {
    gain: T,
    index: usize,
    split: SplitInfo<T>,
}

/// Checks that `examples` is not empty and that every example has the same
/// positive number of finite features. Returns that number.
pub(crate) fn check_examples<T: Scalar>(examples: &[Example<'_, T>]) -> Result<usize, NjangError> {
    let n_features = match examples.first() {
        Some(example) => example.features.len(),
        None => return Err(NjangError::invalid("no example to fit")),
    };
    if n_features == 0 {
        return Err(NjangError::invalid("examples have no feature"));
    }
    if let Some(example) = examples
        .iter()
        .find(|example| example.features.len() != n_features)
    {
        return Err(NjangError::invalid(format!(
            "example {} has {} features, expected {n_features}",
            example.position,
            example.features.len()
        )));
    }
    if let Some(example) = examples
        .iter()
        .find(|example| example.features.iter().any(|value| !value.is_finite()))
    {
        return Err(NjangError::invalid(format!(
            "example {} has a non finite feature",
            example.position
        )));
    }
    Ok(n_features)
}

/// Grows a tree from `examples` by greedy recursive partitioning and returns
/// its nodes, the root being the first one.
///
/// A node is split along the dimension and threshold maximizing
/// [`Impurity::gain`] as long as this gain exceeds `min_gain`. Pending nodes
/// are kept on an explicit stack so that deep trees do not exhaust the call
/// stack.
///
/// `examples` are expected to have passed [`check_examples`].
pub(crate) fn grow<T: Scalar>(
    examples: &mut [Example<'_, T>],
    impurity: Impurity,
    min_gain: T,
) -> Vec<Node<T>> {
    let mut nodes = vec![Node::Leaf { label: T::zero() }];
    let mut pending = vec![(0, examples)];
    while let Some((slot, examples)) = pending.pop() {
        match best_split(examples, impurity) {
            Some(candidate) if candidate.gain > min_gain => {
                debug!(
                    "splitting {} examples on dimension {} at {} (gain {})",
                    examples.len(),
                    candidate.split.dimension,
                    candidate.split.threshold,
                    candidate.gain
                );
                sort_along(examples, candidate.split.dimension);
                let (left_examples, right_examples) = examples.split_at_mut(candidate.index);
                let (left, right) = (nodes.len(), nodes.len() + 1);
                nodes.push(Node::Leaf { label: T::zero() });
                nodes.push(Node::Leaf { label: T::zero() });
                nodes[slot] = Node::Branch {
                    split: candidate.split,
                    gain: candidate.gain,
                    left,
                    right,
                };
                pending.push((right, right_examples));
                pending.push((left, left_examples));
            }
            _ => {
                let label = mean(examples.iter().map(|example| example.label));
                trace!("leaf with {} examples and label {label}", examples.len());
                nodes[slot] = Node::Leaf { label };
            }
        }
    }
    nodes
}

/// Scans every dimension and every split index of `examples` for the
/// largest positive gain. Ties keep the first candidate met.
fn best_split<T: Scalar>(examples: &mut [Example<'_, T>], impurity: Impurity) -> Option<Candidate<T>> {
    let n_examples = examples.len();
    let n_features = examples.first()?.features.len();
    let parent = impurity.evaluate(examples);
    let half = T::cast(0.5);
    let mut best: Option<Candidate<T>> = None;
    let mut best_gain = T::zero();
    // Regression labels are centred on their mean before being summed.
    let shift = mean(examples.iter().map(|example| example.label));
    let (total_sum, total_squares) =
        examples
            .iter()
            .fold((T::zero(), T::zero()), |(sum, squares), example| {
                let deviation = example.label - shift;
                (sum + deviation, squares + deviation * deviation)
            });
    for dimension in 0..n_features {
        sort_along(examples, dimension);
        let total_positives = examples.iter().filter(|example| is_positive(example.label)).count();
        let mut left_positives = 0;
        let (mut left_sum, mut left_squares) = (T::zero(), T::zero());
        for index in 1..n_examples {
            let previous = examples[index - 1].label;
            let (left, right) = match impurity {
                Impurity::Entropy | Impurity::Gini => {
                    if is_positive(previous) {
                        left_positives += 1;
                    }
                    (
                        impurity.of_proportion(proportion::<T>(left_positives, index)),
                        impurity.of_proportion(proportion::<T>(
                            total_positives - left_positives,
                            n_examples - index,
                        )),
                    )
                }
                Impurity::Mse => {
                    let deviation = previous - shift;
                    left_sum = left_sum + deviation;
                    left_squares = left_squares + deviation * deviation;
                    (
                        spread(left_sum, left_squares, index),
                        spread(
                            total_sum - left_sum,
                            total_squares - left_squares,
                            n_examples - index,
                        ),
                    )
                }
            };
            let gain = parent - half * (left + right);
            if gain > best_gain {
                best_gain = gain;
                let threshold = half
                    * (examples[index - 1].features[dimension] + examples[index].features[dimension]);
                best = Some(Candidate {
                    gain,
                    index,
                    split: SplitInfo {
                        dimension,
                        threshold,
                    },
                });
            }
        }
    }
    best
}

/// Population variance from the sum and the sum of squares of `count`
/// centred labels.
fn spread<T: Scalar>(sum: T, squares: T, count: usize) -> T {
    let size = T::cast(count as f64);
    let average = sum / size;
    (squares / size - average * average).max(T::zero())
}

fn sort_along<T: Scalar>(examples: &mut [Example<'_, T>], dimension: usize) {
    examples.sort_unstable_by(|a, b| {
        a.features[dimension]
            .partial_cmp(&b.features[dimension])
            .unwrap_or(Ordering::Equal)
            .then(a.position.cmp(&b.position))
    });
}
