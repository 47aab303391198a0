//! Decision trees grown by greedy recursive partitioning.
mod decision_tree;
mod impurity;
mod node;
#[cfg(test)]
mod unit_test;

pub(crate) use decision_tree::{examples, DEFAULT_MIN_GAIN};
pub use decision_tree::{DecisionTree, DecisionTreeSettings, TreeClassifier, TreeRegressor};
pub use impurity::Impurity;
pub use node::{Example, Node, SplitInfo};
