use log::{debug, info};
use ndarray::{Array1, Array2, Zip};
use serde::{Deserialize, Serialize};

use super::{check_n_trees, Combination, TreeEnsemble, DEFAULT_N_TREES};
use crate::{
    error::NjangError,
    metrics::{Report, POSITIVE_THRESHOLD},
    traits::{ClassificationModel, Scalar},
    tree_model::{DecisionTree, DecisionTreeSettings, Impurity, DEFAULT_MIN_GAIN},
};

/// Training accuracies are clamped into `[MIN_ACCURACY, MAX_ACCURACY]` before
/// taking their log-odds.
const MIN_ACCURACY: f64 = 0.0001;
const MAX_ACCURACY: f64 = 0.9999;

/// Hyperparameters of an [`AdaBoostClassifier`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaBoostSettings<T> {
    pub n_trees: usize,
    pub impurity: Impurity,
    pub min_gain: T,
}

impl<T: Scalar> Default for AdaBoostSettings<T> {
    fn default() -> Self {
        Self {
            n_trees: DEFAULT_N_TREES,
            impurity: Impurity::default(),
            min_gain: T::cast(DEFAULT_MIN_GAIN),
        }
    }
}

/// Weighted vote: tree `i` contributes `coefficients[i] * (2p - 1)`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogOdds<T> {
    pub coefficients: Vec<T>,
}

impl<T: Scalar> Combination<T> for LogOdds<T> {
    fn check(&self, n_trees: usize) -> Result<(), NjangError> {
        if self.coefficients.len() != n_trees {
            return Err(NjangError::invalid(format!(
                "{} coefficients for {n_trees} trees",
                self.coefficients.len()
            )));
        }
        Ok(())
    }
    fn accumulate(&self, index: usize, output: &Array1<T>, total: &mut Array1<T>) {
        let coefficient = self.coefficients[index];
        let two = T::cast(2.);
        Zip::from(total).and(output).for_each(|sum, &probability| {
            *sum = *sum + coefficient * (two * probability - T::one())
        });
    }
}

/// Log-odds of a training accuracy, the accuracy being kept away from 0 and 1.
fn log_odds<T: Scalar>(accuracy: T) -> T {
    let low = T::cast(MIN_ACCURACY);
    let high = T::cast(MAX_ACCURACY);
    let accuracy = num_traits::clamp(accuracy, low, high);
    (accuracy / (T::one() - accuracy)).ln()
}

/// Boosted forest where each tree votes with the log-odds of its training
/// accuracy.
///
/// Every tree is fitted on the whole dataset. [`ClassificationModel::predict`]
/// returns the raw weighted vote, negative values standing for the negative
/// class; [`AdaBoostClassifier::decide`] gives the corresponding labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    try_from = "AdaBoostParts<T>",
    bound(deserialize = "T: Scalar + Deserialize<'de>")
)]
pub struct AdaBoostClassifier<T> {
    pub settings: AdaBoostSettings<T>,
    ensemble: TreeEnsemble<T, LogOdds<T>>,
    #[serde(skip)]
    report: Option<Report<T>>,
}

/// Unchecked content of a serialized AdaBoost classifier.
#[derive(Deserialize)]
struct AdaBoostParts<T> {
    settings: AdaBoostSettings<T>,
    ensemble: TreeEnsemble<T, LogOdds<T>>,
}

impl<T: Scalar> TryFrom<AdaBoostParts<T>> for AdaBoostClassifier<T> {
    type Error = NjangError;
    fn try_from(parts: AdaBoostParts<T>) -> Result<Self, Self::Error> {
        parts.ensemble.check_size(parts.settings.n_trees)?;
        Ok(Self {
            settings: parts.settings,
            ensemble: parts.ensemble,
            report: None,
        })
    }
}

impl<T: Scalar> AdaBoostClassifier<T> {
    pub fn new(settings: AdaBoostSettings<T>) -> Self {
        Self {
            settings,
            ensemble: TreeEnsemble::new(Vec::new(), LogOdds::default()),
            report: None,
        }
    }

    pub fn ensemble(&self) -> &TreeEnsemble<T, LogOdds<T>> {
        &self.ensemble
    }

    /// Log-odds coefficient of each tree, in the order of the trees.
    pub fn coefficients(&self) -> &[T] {
        &self.ensemble.strategy().coefficients
    }

    /// Predicted labels: `0` when the weighted vote is negative, `1`
    /// otherwise, a null vote included.
    pub fn decide(&self, x: &Array2<T>) -> Result<Array1<T>, NjangError> {
        Ok(self
            .ensemble
            .predict(x)?
            .mapv(|vote| if vote < T::zero() { T::zero() } else { T::one() }))
    }

    /// Contingency report of the decisions on `x` against `y`.
    pub fn evaluate(&self, x: &Array2<T>, y: &Array1<T>) -> Result<Report<T>, NjangError> {
        let decisions = self.decide(x)?;
        Report::from_predictions(decisions.view(), y.view(), T::cast(POSITIVE_THRESHOLD))
    }
}

impl<T: Scalar> ClassificationModel for AdaBoostClassifier<T> {
    type X = Array2<T>;
    type Y = Array1<T>;
    type FitResult = Result<(), NjangError>;
    type PredictResult = Result<Array1<T>, NjangError>;
    type ScoreResult = Result<T, NjangError>;
    type Report = Report<T>;
    fn fit(&mut self, x: &Self::X, y: &Self::Y) -> Self::FitResult {
        check_n_trees(self.settings.n_trees)?;
        let tree_settings = DecisionTreeSettings {
            impurity: self.settings.impurity,
            min_gain: self.settings.min_gain,
        };
        let mut trees = Vec::with_capacity(self.settings.n_trees);
        let mut coefficients = Vec::with_capacity(self.settings.n_trees);
        for number in 0..self.settings.n_trees {
            let mut tree = DecisionTree::new(tree_settings);
            tree.fit(x, y)?;
            let predictions = tree.predict(x)?;
            let accuracy = Report::from_predictions(
                predictions.view(),
                y.view(),
                T::cast(POSITIVE_THRESHOLD),
            )?
            .accuracy;
            let coefficient = log_odds(accuracy);
            debug!("boosted tree {number}: accuracy {accuracy}, coefficient {coefficient}");
            trees.push(tree);
            coefficients.push(coefficient);
        }
        self.ensemble = TreeEnsemble::new(trees, LogOdds { coefficients });
        info!("fitted AdaBoost classifier with {} trees", self.settings.n_trees);
        Ok(())
    }
    fn predict(&self, x: &Self::X) -> Self::PredictResult {
        self.ensemble.predict(x)
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
