use serde::{Deserialize, Serialize};

use super::node::Example;
use crate::{metrics::POSITIVE_THRESHOLD, traits::Scalar, utils::mean};

/// Below this distance from 0 or 1, a class probability is rounded for the
/// entropy so that the logarithm stays finite.
const ENTROPY_GUARD: f64 = 1e-4;

/// Measure of label heterogeneity of a set of examples, zero meaning pure.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impurity {
    /// Shannon entropy (natural logarithm) of the positive class proportion.
    #[default]
    Entropy,
    /// Gini index `2p(1 - p)` of the positive class proportion.
    Gini,
    /// Population variance of the labels, for regression.
    Mse,
}

impl Impurity {
    /// Impurity of `examples`, zero when there is none.
    pub fn evaluate<T: Scalar>(&self, examples: &[Example<'_, T>]) -> T {
        if examples.is_empty() {
            return T::zero();
        }
        match self {
            Self::Entropy | Self::Gini => {
                let positives = examples.iter().filter(|example| is_positive(example.label)).count();
                self.of_proportion(proportion(positives, examples.len()))
            }
            Self::Mse => variance(examples),
        }
    }

    /// Reduction of impurity obtained when splitting `examples` at index
    /// `split`.
    ///
    /// Both halves weigh one half whatever their sizes.
    pub fn gain<T: Scalar>(&self, examples: &[Example<'_, T>], split: usize) -> T {
        let (left, right) = examples.split_at(split);
        self.evaluate(examples) - T::cast(0.5) * (self.evaluate(left) + self.evaluate(right))
    }

    /// Classification impurity of a set holding a proportion `p` of positives.
    pub(crate) fn of_proportion<T: Scalar>(&self, p: T) -> T {
        match self {
            Self::Entropy => {
                let guard = T::cast(ENTROPY_GUARD);
                if (p - T::one()).abs() < guard || p < guard {
                    return T::zero();
                }
                -p * p.ln() - (T::one() - p) * (T::one() - p).ln()
            }
            Self::Gini => T::cast(2.) * p * (T::one() - p),
            Self::Mse => T::zero(),
        }
    }
}

pub(crate) fn is_positive<T: Scalar>(label: T) -> bool {
    label > T::cast(POSITIVE_THRESHOLD)
}

pub(crate) fn proportion<T: Scalar>(count: usize, total: usize) -> T {
    T::cast(count as f64) / T::cast(total as f64)
}

fn variance<T: Scalar>(examples: &[Example<'_, T>]) -> T {
    let label_mean = mean(examples.iter().map(|example| example.label));
    let squares = examples
        .iter()
        .map(|example| (example.label - label_mean) * (example.label - label_mean));
    mean(squares)
}
