//! Decision trees and ensembles of decision trees for binary classification
//! and regression.
//!
//! Models follow [`ClassificationModel`] or [`RegressionModel`], are generic
//! over `f32`/`f64` and can be saved with `serde`.
//! ```
//! use ndarray::array;
//! use njang_trees::{ClassificationModel, DecisionTreeSettings, Impurity, TreeClassifier};
//! let x = array![[0., 1.], [1., 1.], [2., 0.], [3., 0.]];
//! let y = array![0., 0., 1., 1.];
//! let mut model = TreeClassifier::new(DecisionTreeSettings {
//!     impurity: Impurity::Entropy,
//!     min_gain: 0.1,
//! });
//! model.fit(&x, &y).unwrap();
//! assert_eq!(model.score(&x, &y).unwrap(), 1.);
//! ```
mod ensemble;
mod error;
mod metrics;
mod traits;
mod tree_model;
mod utils;

pub use ensemble::{
    AdaBoostClassifier, AdaBoostSettings, Averaging, Combination, ForestClassifier,
    ForestSettings, GradBoostRegressor, GradientBoostingSettings, LogOdds, Residual, TreeEnsemble,
};
pub use error::NjangError;
pub use metrics::{coefficient_of_determination, Report};
pub use traits::{ClassificationModel, RegressionModel, Scalar};
pub use tree_model::{
    DecisionTree, DecisionTreeSettings, Example, Impurity, Node, SplitInfo, TreeClassifier,
    TreeRegressor,
};
pub use utils::rows_to_array;

/// Models and traits needed in most programs.
pub mod prelude {
    pub use crate::{
        AdaBoostClassifier, ClassificationModel, DecisionTree, ForestClassifier,
        GradBoostRegressor, RegressionModel, TreeClassifier, TreeRegressor,
    };
}
