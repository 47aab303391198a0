//! Ensembles of decision trees.
//!
//! Every ensemble is an ordered list of trees and a [`Combination`] strategy
//! merging their outputs:
//! - [`ForestClassifier`] averages trees fitted on shuffled subsets,
//! - [`AdaBoostClassifier`] weighs each tree by the log-odds of its accuracy,
//! - [`GradBoostRegressor`] adds up trees fitted on successive residuals.
mod adaboost;
mod forest;
mod gradient_boosting;

pub use adaboost::{AdaBoostClassifier, AdaBoostSettings, LogOdds};
pub use forest::{Averaging, ForestClassifier, ForestSettings};
pub use gradient_boosting::{GradBoostRegressor, GradientBoostingSettings, Residual};

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::{error::NjangError, traits::Scalar, tree_model::DecisionTree};

pub(crate) const DEFAULT_N_TREES: usize = 10;

/// How the outputs of the trees of an ensemble are merged.
pub trait Combination<T> {
    /// Checks that the strategy is consistent with an ensemble of `n_trees`
    /// trees.
    fn check(&self, _n_trees: usize) -> Result<(), NjangError> {
        Ok(())
    }
    /// Folds `output`, the predictions of the tree at position `index`, into
    /// `total`.
    fn accumulate(&self, index: usize, output: &Array1<T>, total: &mut Array1<T>);
    /// Turns the accumulated outputs of `n_trees` trees into predictions.
    fn finish(&self, _n_trees: usize, total: Array1<T>) -> Array1<T> {
        total
    }
}

/// Ordered trees and the strategy combining them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble<T, S> {
    trees: Vec<DecisionTree<T>>,
    strategy: S,
}

impl<T: Scalar, S: Combination<T>> TreeEnsemble<T, S> {
    pub(crate) fn new(trees: Vec<DecisionTree<T>>, strategy: S) -> Self {
        Self { trees, strategy }
    }

    pub fn trees(&self) -> &[DecisionTree<T>] {
        &self.trees
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty() && self.trees.iter().all(|tree| tree.is_fitted())
    }

    /// Checks that a fitted ensemble holds `n_trees` trees its strategy
    /// agrees with. An unfitted ensemble always passes.
    pub(crate) fn check_size(&self, n_trees: usize) -> Result<(), NjangError> {
        if self.trees.is_empty() {
            return Ok(());
        }
        if self.trees.len() != n_trees {
            return Err(NjangError::invalid(format!(
                "{} trees in an ensemble of {n_trees}",
                self.trees.len()
            )));
        }
        self.strategy.check(n_trees)
    }

    /// Combined predictions of the trees for the rows of `x`.
    pub fn predict(&self, x: &Array2<T>) -> Result<Array1<T>, NjangError> {
        if self.trees.is_empty() {
            return Err(NjangError::NotFitted {
                model: "TreeEnsemble",
            });
        }
        self.strategy.check(self.trees.len())?;
        let mut total = Array1::zeros(x.nrows());
        for (index, tree) in self.trees.iter().enumerate() {
            let output = tree.predict(x)?;
            self.strategy.accumulate(index, &output, &mut total);
        }
        Ok(self.strategy.finish(self.trees.len(), total))
    }
}

pub(crate) fn check_n_trees(n_trees: usize) -> Result<(), NjangError> {
    if n_trees == 0 {
        return Err(NjangError::invalid("an ensemble needs at least one tree"));
    }
    Ok(())
}
