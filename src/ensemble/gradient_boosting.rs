use log::{debug, info};
use ndarray::{Array1, Array2, Zip};
use serde::{Deserialize, Serialize};

use super::{check_n_trees, Combination, TreeEnsemble, DEFAULT_N_TREES};
use crate::{
    error::NjangError,
    metrics::coefficient_of_determination,
    traits::{RegressionModel, Scalar},
    tree_model::{examples, DecisionTree, DecisionTreeSettings, Impurity, DEFAULT_MIN_GAIN},
};

const DEFAULT_LEARNING_RATE: f64 = 0.1;

/// Hyperparameters of a [`GradBoostRegressor`].
///
/// - **n_trees**: number of regression trees.
/// - **min_gain**: minimum variance reduction of a split.
/// - **learning_rate**: weight of every tree but the first one in the
///   predictions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingSettings<T> {
    pub n_trees: usize,
    pub min_gain: T,
    pub learning_rate: T,
}

impl<T: Scalar> Default for GradientBoostingSettings<T> {
    fn default() -> Self {
        Self {
            n_trees: DEFAULT_N_TREES,
            min_gain: T::cast(DEFAULT_MIN_GAIN),
            learning_rate: T::cast(DEFAULT_LEARNING_RATE),
        }
    }
}

/// First tree as is, the following ones scaled by `learning_rate`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Residual<T> {
    pub learning_rate: T,
}

impl<T: Scalar> Combination<T> for Residual<T> {
    fn accumulate(&self, index: usize, output: &Array1<T>, total: &mut Array1<T>) {
        let weight = if index == 0 {
            T::one()
        } else {
            self.learning_rate
        };
        Zip::from(total)
            .and(output)
            .for_each(|sum, &value| *sum = *sum + weight * value);
    }
}

/// Gradient boosting of regression trees on the square loss.
///
/// The first tree is fitted on the labels, every following tree on what is
/// left unexplained by the trees before it.
/// ```
/// use ndarray::array;
/// use njang_trees::{GradBoostRegressor, GradientBoostingSettings, RegressionModel};
/// let x = array![[1.], [2.], [3.], [4.]];
/// let y = array![1., 1., 5., 5.];
/// let mut model = GradBoostRegressor::new(GradientBoostingSettings {
///     n_trees: 3,
///     min_gain: 0.1,
///     learning_rate: 0.5,
/// });
/// model.fit(&x, &y).unwrap();
/// assert_eq!(model.predict(&x).unwrap(), y);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "GradBoostParts<T>",
    bound(deserialize = "T: Scalar + Deserialize<'de>")
)]
pub struct GradBoostRegressor<T> {
    pub settings: GradientBoostingSettings<T>,
    ensemble: TreeEnsemble<T, Residual<T>>,
}

/// Unchecked content of a serialized gradient boosting regressor.
#[derive(Deserialize)]
struct GradBoostParts<T> {
    settings: GradientBoostingSettings<T>,
    ensemble: TreeEnsemble<T, Residual<T>>,
}

impl<T: Scalar> TryFrom<GradBoostParts<T>> for GradBoostRegressor<T> {
    type Error = NjangError;
    fn try_from(parts: GradBoostParts<T>) -> Result<Self, Self::Error> {
        parts.ensemble.check_size(parts.settings.n_trees)?;
        let learning_rate = parts.ensemble.strategy().learning_rate;
        if learning_rate != parts.settings.learning_rate {
            return Err(NjangError::invalid(format!(
                "trees combined with a learning rate of {learning_rate}, settings ask for {}",
                parts.settings.learning_rate
            )));
        }
        Ok(Self {
            settings: parts.settings,
            ensemble: parts.ensemble,
        })
    }
}

impl<T: Scalar> GradBoostRegressor<T> {
    pub fn new(settings: GradientBoostingSettings<T>) -> Self {
        Self {
            settings,
            ensemble: TreeEnsemble::new(
                Vec::new(),
                Residual {
                    learning_rate: settings.learning_rate,
                },
            ),
        }
    }

    pub fn ensemble(&self) -> &TreeEnsemble<T, Residual<T>> {
        &self.ensemble
    }
}

impl<T: Scalar> RegressionModel for GradBoostRegressor<T> {
    type X = Array2<T>;
    type Y = Array1<T>;
    type FitResult = Result<(), NjangError>;
    type PredictResult = Result<Array1<T>, NjangError>;
    type ScoreResult = Result<T, NjangError>;
    fn fit(&mut self, x: &Self::X, y: &Self::Y) -> Self::FitResult {
        check_n_trees(self.settings.n_trees)?;
        let tree_settings = DecisionTreeSettings {
            impurity: Impurity::Mse,
            min_gain: self.settings.min_gain,
        };
        let mut residuals = y.to_owned();
        let mut trees = Vec::with_capacity(self.settings.n_trees);
        for number in 0..self.settings.n_trees {
            let mut tree = DecisionTree::new(tree_settings);
            tree.fit_examples(&mut examples(x, residuals.view())?)?;
            let predictions = tree.predict(x)?;
            Zip::from(&mut residuals)
                .and(&predictions)
                .for_each(|residual, &prediction| *residual = *residual - prediction);
            debug!(
                "boosted regression tree {number} has {} leaves",
                tree.n_leaves()
            );
            trees.push(tree);
        }
        self.ensemble = TreeEnsemble::new(
            trees,
            Residual {
                learning_rate: self.settings.learning_rate,
            },
        );
        info!(
            "fitted gradient boosting regressor with {} trees",
            self.settings.n_trees
        );
        Ok(())
    }
    fn predict(&self, x: &Self::X) -> Self::PredictResult {
        self.ensemble.predict(x)
    }
    fn score(&self, x: &Self::X, y: &Self::Y) -> Self::ScoreResult {
        let predictions = self.ensemble.predict(x)?;
        coefficient_of_determination(predictions.view(), y.view())
    }
}
