use log::{debug, info};
use ndarray::{Array1, Array2, Zip};
use ndarray_rand::rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use super::{check_n_trees, Combination, TreeEnsemble, DEFAULT_N_TREES};
use crate::{
    error::NjangError,
    metrics::{Report, POSITIVE_THRESHOLD},
    traits::{ClassificationModel, Scalar},
    tree_model::{DecisionTree, DecisionTreeSettings, Example, Impurity, DEFAULT_MIN_GAIN},
};

const DEFAULT_STATE: u32 = 0;
/// Share of the dataset each tree of a forest is fitted on.
const SUBSET_RATIO: f64 = 0.9;

/// Hyperparameters of a [`ForestClassifier`].
///
/// - **n_trees**: number of trees in the forest.
/// - **impurity**, **min_gain**: settings shared by every tree, see
///   [`DecisionTreeSettings`].
/// - **random_state**: seed of the generator shuffling the dataset between
///   two trees when fitting with [`ClassificationModel::fit`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestSettings<T> {
    pub n_trees: usize,
    pub impurity: Impurity,
    pub min_gain: T,
    pub random_state: Option<u32>,
}

impl<T: Scalar> Default for ForestSettings<T> {
    fn default() -> Self {
        Self {
            n_trees: DEFAULT_N_TREES,
            impurity: Impurity::default(),
            min_gain: T::cast(DEFAULT_MIN_GAIN),
            random_state: None,
        }
    }
}

/// Plain average of the tree outputs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Averaging;

impl<T: Scalar> Combination<T> for Averaging {
    fn accumulate(&self, _index: usize, output: &Array1<T>, total: &mut Array1<T>) {
        Zip::from(total)
            .and(output)
            .for_each(|sum, &value| *sum = *sum + value);
    }
    fn finish(&self, n_trees: usize, total: Array1<T>) -> Array1<T> {
        let size = T::cast(n_trees as f64);
        total.mapv(|sum| sum / size)
    }
}

/// Averages classification trees, each one fitted on a different subset of
/// the dataset.
///
/// Each tree is fitted on the first 90% of the rows, the rows being shuffled
/// after each tree. The prediction is the mean of the tree outputs, that is
/// an estimate of the probability of the positive class.
/// ```
/// use ndarray::array;
/// use njang_trees::{ClassificationModel, ForestClassifier, ForestSettings};
/// let x = array![[1.], [2.], [3.], [4.], [5.], [6.], [7.], [8.], [9.], [10.]];
/// let y = array![0., 0., 0., 0., 0., 1., 1., 1., 1., 1.];
/// let mut forest = ForestClassifier::new(ForestSettings {
///     n_trees: 5,
///     random_state: Some(42),
///     ..Default::default()
/// });
/// forest.fit(&x, &y).unwrap();
/// let probabilities = forest.predict(&x).unwrap();
/// assert!(probabilities.iter().all(|p| (0. ..=1.).contains(p)));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    try_from = "ForestParts<T>",
    bound(deserialize = "T: Scalar + Deserialize<'de>")
)]
pub struct ForestClassifier<T> {
    pub settings: ForestSettings<T>,
    ensemble: TreeEnsemble<T, Averaging>,
    #[serde(skip)]
    report: Option<Report<T>>,
}

/// Unchecked content of a serialized forest.
#[derive(Deserialize)]
struct ForestParts<T> {
    settings: ForestSettings<T>,
    ensemble: TreeEnsemble<T, Averaging>,
}

impl<T: Scalar> TryFrom<ForestParts<T>> for ForestClassifier<T> {
    type Error = NjangError;
    fn try_from(parts: ForestParts<T>) -> Result<Self, Self::Error> {
        parts.ensemble.check_size(parts.settings.n_trees)?;
        Ok(Self {
            settings: parts.settings,
            ensemble: parts.ensemble,
            report: None,
        })
    }
}

impl<T: Scalar> ForestClassifier<T> {
    pub fn new(settings: ForestSettings<T>) -> Self {
        Self {
            settings,
            ensemble: TreeEnsemble::new(Vec::new(), Averaging),
            report: None,
        }
    }

    pub fn ensemble(&self) -> &TreeEnsemble<T, Averaging> {
        &self.ensemble
    }

    /// Fits the forest drawing the shuffles from `rng`.
    ///
    /// The rows of `x` are not modified, the forest shuffles its own
    /// permutation of the row indices.
    pub fn fit_with_rng<R>(&mut self, x: &Array2<T>, y: &Array1<T>, rng: &mut R) -> Result<(), NjangError>
    where
        R: Rng + ?Sized,
    {
        check_n_trees(self.settings.n_trees)?;
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(NjangError::invalid(format!(
                "{n_samples} rows for {} labels",
                y.len()
            )));
        }
        let subset_size = ((SUBSET_RATIO * n_samples as f64) as usize).max(1);
        let tree_settings = DecisionTreeSettings {
            impurity: self.settings.impurity,
            min_gain: self.settings.min_gain,
        };
        let mut order = (0..n_samples).collect::<Vec<_>>();
        let mut trees = Vec::with_capacity(self.settings.n_trees);
        for number in 0..self.settings.n_trees {
            let mut examples = order
                .iter()
                .take(subset_size)
                .enumerate()
                .map(|(position, &row)| Example::new(x.row(row), y[row], position))
                .collect::<Vec<_>>();
            let mut tree = DecisionTree::new(tree_settings);
            tree.fit_examples(&mut examples)?;
            debug!(
                "forest tree {number} fitted on {} examples with {} leaves",
                examples.len(),
                tree.n_leaves()
            );
            trees.push(tree);
            order.shuffle(rng);
        }
        self.ensemble = TreeEnsemble::new(trees, Averaging);
        info!("fitted forest of {} trees", self.settings.n_trees);
        Ok(())
    }

    /// Contingency report of the averaged predictions of `x` against `y`.
    pub fn evaluate(&self, x: &Array2<T>, y: &Array1<T>) -> Result<Report<T>, NjangError> {
        let predictions = self.ensemble.predict(x)?;
        Report::from_predictions(predictions.view(), y.view(), T::cast(POSITIVE_THRESHOLD))
    }
}

impl<T: Scalar> ClassificationModel for ForestClassifier<T> {
    type X = Array2<T>;
    type Y = Array1<T>;
    type FitResult = Result<(), NjangError>;
    type PredictResult = Result<Array1<T>, NjangError>;
    type ScoreResult = Result<T, NjangError>;
    type Report = Report<T>;
    fn fit(&mut self, x: &Self::X, y: &Self::Y) -> Self::FitResult {
        let random_state = self.settings.random_state.unwrap_or(DEFAULT_STATE);
        let mut rng = ChaCha20Rng::seed_from_u64(random_state as u64);
        self.fit_with_rng(x, y, &mut rng)
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
