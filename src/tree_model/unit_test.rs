use super::*;
use crate::{
    error::NjangError,
    traits::{ClassificationModel, RegressionModel},
    utils::rows_to_array,
};
use ndarray::{array, Array1, Array2, Axis};

fn classification_dataset() -> (Array2<f64>, Array1<f64>) {
    let x = array![
        [7., 1.],
        [3., 2.],
        [2., 3.],
        [1., 5.],
        [2., 6.],
        [4., 7.],
        [1., 9.],
        [8., 10.],
        [6., 5.],
        [7., 8.],
        [8., 4.],
        [9., 6.]
    ];
    let y = array![0., 0., 0., 0., 0., 0., 1., 1., 1., 1., 1., 1.];
    (x, y)
}

fn regression_dataset() -> (Array2<f64>, Array1<f64>) {
    let x = array![[10.], [20.], [30.], [40.], [50.], [60.], [70.], [80.], [86.]];
    let y = array![7., 5., 7., 1., 2., 1., 5., 4., 3.6];
    (x, y)
}

fn examples_of<'a>(x: &'a Array2<f64>, y: &Array1<f64>) -> Vec<Example<'a, f64>> {
    examples(x, y.view()).unwrap()
}

#[test]
fn pure_sets_have_no_impurity() {
    let x = array![[1.], [2.], [3.]];
    for label in [0., 1.] {
        let y = Array1::from_elem(3, label);
        let examples = examples_of(&x, &y);
        assert_eq!(Impurity::Entropy.evaluate(&examples), 0.);
        assert_eq!(Impurity::Gini.evaluate(&examples), 0.);
    }
    let y = array![3.5, 3.5, 3.5];
    assert_eq!(Impurity::Mse.evaluate(&examples_of(&x, &y)), 0.);
}

#[test]
fn impurity_values() {
    let x = array![[1.], [2.], [3.], [4.]];
    let y = array![0., 1., 1., 1.];
    let examples = examples_of(&x, &y);
    let entropy = -(0.75f64 * 0.75f64.ln() + 0.25 * 0.25f64.ln());
    assert!((Impurity::Entropy.evaluate(&examples) - entropy).abs() < 1e-12);
    assert!((Impurity::Gini.evaluate(&examples) - 0.375).abs() < 1e-12);
    // Population variance of {0, 1, 1, 1}.
    assert!((Impurity::Mse.evaluate(&examples) - 0.1875).abs() < 1e-12);
}

#[test]
fn gain_weighs_both_halves_equally() {
    let x = array![[1.], [2.], [3.], [4.], [5.], [6.]];
    let y = array![0., 1., 0., 1., 1., 1.];
    let examples = examples_of(&x, &y);
    for impurity in [Impurity::Entropy, Impurity::Gini, Impurity::Mse] {
        for split in 1..examples.len() {
            let expected = impurity.evaluate(&examples)
                - 0.5
                    * (impurity.evaluate(&examples[..split])
                        + impurity.evaluate(&examples[split..]));
            assert_eq!(impurity.gain(&examples, split), expected);
        }
    }
}

#[test]
fn node_split() {
    let x = array![[18f64, 12000., 1.], [32., 30000., 0.], [21., 32000., 1.]];
    let y = array![0.91, 0.23, 0.12];
    let mut tree = DecisionTree::new(DecisionTreeSettings {
        impurity: Impurity::Gini,
        min_gain: 0.1,
    });
    tree.fit(&x, &y).unwrap();
    match tree.nodes()[0] {
        Node::Branch {
            split, left, right, ..
        } => {
            assert_eq!(split.dimension, 0);
            assert_eq!(split.threshold, 19.5);
            assert_eq!(tree.nodes()[left], Node::Leaf { label: 0.91 });
            match tree.nodes()[right] {
                Node::Leaf { label } => assert!((label - 0.175).abs() < 1e-12),
                ref node => panic!("expected a leaf, got {node:?}"),
            }
        }
        ref node => panic!("expected a branch, got {node:?}"),
    }
    assert_eq!(tree.depth(), 1);
    assert_eq!(tree.n_leaves(), 2);
}

#[test]
fn classifier_entropy() {
    let (x, y) = classification_dataset();
    let mut model = TreeClassifier::new(DecisionTreeSettings {
        impurity: Impurity::Entropy,
        min_gain: 0.1,
    });
    model.fit(&x, &y).unwrap();
    let accuracy = model.score(&x, &y).unwrap();
    assert!((accuracy - 11. / 12.).abs() < 1e-12);
    let f1 = model.report().unwrap().f_score(1.);
    assert!((f1 - 0.9230769).abs() < 1e-5);
}

#[test]
fn classifier_gini() {
    let (x, y) = classification_dataset();
    let mut model = TreeClassifier::new(DecisionTreeSettings {
        impurity: Impurity::Gini,
        min_gain: 0.1,
    });
    model.fit(&x, &y).unwrap();
    let report = model.evaluate(&x, &y).unwrap();
    assert!((report.f_score(1.) - 0.9230769).abs() < 1e-5);
    assert!(model.report().is_none());
    let predictions = model.predict(&x).unwrap();
    assert!(predictions.iter().all(|p| (0. ..=1.).contains(p)));
}

#[test]
fn regressor_mse() {
    let (x, y) = regression_dataset();
    let mut model = TreeRegressor::new(0.1);
    model.fit(&x, &y).unwrap();
    let r2 = model.score(&x, &y).unwrap();
    assert!((r2 - 0.9822822).abs() < 1e-5);
}

#[test]
fn regression_split_matches_gain() {
    let (x, y) = regression_dataset();
    let mut model = TreeRegressor::new(0.1);
    model.fit(&x, &y).unwrap();
    let examples = examples_of(&x, &y);
    let (index, expected) = (1..examples.len())
        .map(|split| (split, Impurity::Mse.gain(&examples, split)))
        .fold((0, f64::MIN), |best, candidate| {
            if candidate.1 > best.1 {
                candidate
            } else {
                best
            }
        });
    match model.tree.nodes()[0] {
        Node::Branch { split, gain, .. } => {
            assert!((gain - expected).abs() < 1e-12);
            assert_eq!(split.threshold, 0.5 * (x[[index - 1, 0]] + x[[index, 0]]));
        }
        ref node => panic!("expected a branch, got {node:?}"),
    }
}

#[test]
fn single_precision() {
    let x = array![[1f32], [2.], [3.], [4.]];
    let y = array![0f32, 0., 1., 1.];
    let mut model = TreeClassifier::new(DecisionTreeSettings::<f32>::default());
    model.fit(&x, &y).unwrap();
    assert_eq!(model.score(&x, &y).unwrap(), 1.);
}

#[test]
fn serialization_round_trip() {
    let (x, y) = classification_dataset();
    let mut model = TreeClassifier::new(DecisionTreeSettings {
        impurity: Impurity::Entropy,
        min_gain: 0.1,
    });
    model.fit(&x, &y).unwrap();
    model.score(&x, &y).unwrap();
    let json = serde_json::to_string(&model).unwrap();
    let loaded: TreeClassifier<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(loaded.tree, model.tree);
    assert!(loaded.report().is_none());

    let grid = Array2::from_shape_fn((100, 2), |(i, j)| {
        if j == 0 {
            (i % 10) as f64 + 0.25
        } else {
            (i / 10) as f64 + 0.75
        }
    });
    let expected = model.predict(&grid).unwrap();
    let got = loaded.predict(&grid).unwrap();
    for (a, b) in expected.iter().zip(got.iter()) {
        assert_eq!(a.to_bits(), b.to_bits());
    }

    let (x, y) = regression_dataset();
    let mut regressor = TreeRegressor::new(0.1);
    regressor.fit(&x, &y).unwrap();
    let json = serde_json::to_string(&regressor).unwrap();
    let loaded: TreeRegressor<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(loaded, regressor);
    assert_eq!(loaded.predict(&x).unwrap(), regressor.predict(&x).unwrap());
}

#[test]
fn rebuild_from_nodes() {
    let (x, y) = classification_dataset();
    let mut tree = DecisionTree::new(DecisionTreeSettings::default());
    tree.fit(&x, &y).unwrap();
    let rebuilt =
        DecisionTree::from_nodes(tree.settings, tree.n_features(), tree.nodes().to_vec()).unwrap();
    assert_eq!(rebuilt.predict(&x).unwrap(), tree.predict(&x).unwrap());
}

#[test]
fn malformed_trees_are_rejected() {
    let leaf = Node::Leaf { label: 0. };
    let split = SplitInfo {
        dimension: 0,
        threshold: 1.,
    };
    let settings = DecisionTreeSettings::default();
    // A child pointing back to its parent.
    let cycle = vec![
        Node::Branch {
            split,
            gain: 0.5,
            left: 1,
            right: 2,
        },
        Node::Branch {
            split,
            gain: 0.5,
            left: 0,
            right: 2,
        },
        leaf.clone(),
    ];
    assert!(DecisionTree::from_nodes(settings, 1, cycle).is_err());
    // A child shared by both branches.
    let shared = vec![
        Node::Branch {
            split,
            gain: 0.5,
            left: 1,
            right: 1,
        },
        leaf.clone(),
    ];
    assert!(DecisionTree::from_nodes(settings, 1, shared).is_err());
    // Out of the feature range.
    let dimension = vec![
        Node::Branch {
            split: SplitInfo {
                dimension: 3,
                threshold: 1.,
            },
            gain: 0.5,
            left: 1,
            right: 2,
        },
        leaf.clone(),
        leaf.clone(),
    ];
    assert!(DecisionTree::from_nodes(settings, 1, dimension).is_err());
    // A node nobody points to.
    let detached = vec![leaf.clone(), leaf];
    assert!(DecisionTree::from_nodes(settings, 1, detached).is_err());

    let json = r#"{"settings":{"impurity":"gini","min_gain":0.1},"n_features":1,
        "nodes":[{"branch":{"split":{"dimension":0,"threshold":1.0},"gain":0.5,"left":0,"right":1}},
        {"leaf":{"label":1.0}}]}"#;
    assert!(serde_json::from_str::<DecisionTree<f64>>(json).is_err());
}

#[test]
fn repeated_predictions_agree() {
    let (x, y) = regression_dataset();
    let mut model = TreeRegressor::new(0.1);
    model.fit(&x, &y).unwrap();
    let first = model.predict(&x).unwrap();
    for _ in 0..5 {
        assert_eq!(model.predict(&x).unwrap(), first);
    }
    for (point, expected) in x.axis_iter(Axis(0)).zip(first.iter()) {
        assert_eq!(model.tree.predict_point(point).unwrap(), *expected);
    }
}

#[test]
fn deep_tree_does_not_overflow() {
    let n = 200;
    let x = Array2::from_shape_fn((n, 1), |(i, _)| i as f64);
    let y = Array1::from_shape_fn(n, |i| (i % 2) as f64);
    let mut tree = DecisionTree::new(DecisionTreeSettings {
        impurity: Impurity::Entropy,
        min_gain: 0.,
    });
    tree.fit(&x, &y).unwrap();
    assert_eq!(tree.depth(), n - 1);
    assert_eq!(tree.predict(&x).unwrap(), y);
}

#[test]
fn invalid_inputs() {
    let mut tree = DecisionTree::<f64>::new(DecisionTreeSettings::default());
    let empty = Array2::<f64>::zeros((0, 2));
    assert!(matches!(
        tree.fit(&empty, &Array1::zeros(0)),
        Err(NjangError::InvalidInput(_))
    ));
    let featureless = Array2::<f64>::zeros((3, 0));
    assert!(matches!(
        tree.fit(&featureless, &Array1::zeros(3)),
        Err(NjangError::InvalidInput(_))
    ));
    let x = array![[1., 2.], [3., 4.]];
    assert!(matches!(
        tree.fit(&x, &array![1.]),
        Err(NjangError::InvalidInput(_))
    ));
    assert!(matches!(
        tree.fit(&array![[1., f64::NAN], [3., 4.]], &array![0., 1.]),
        Err(NjangError::InvalidInput(_))
    ));
    assert!(matches!(
        tree.predict(&x),
        Err(NjangError::NotFitted { .. })
    ));
    assert!(rows_to_array(&[vec![1., 2.], vec![3.]]).is_err());
    assert!(rows_to_array::<f64>(&[]).is_err());

    tree.fit(&x, &array![0., 1.]).unwrap();
    assert!(matches!(
        tree.predict(&array![[1., 2., 3.]]),
        Err(NjangError::InvalidInput(_))
    ));
    // A failed fit keeps the previous tree.
    let before = tree.clone();
    assert!(tree.fit(&empty, &Array1::zeros(0)).is_err());
    assert_eq!(tree, before);
}

#[test]
fn display_lists_every_node() {
    let (x, y) = classification_dataset();
    let mut tree = DecisionTree::new(DecisionTreeSettings::default());
    assert!(tree.to_string().contains("not fitted"));
    tree.fit(&x, &y).unwrap();
    let dump = tree.to_string();
    assert_eq!(dump.matches("leaf").count(), tree.n_leaves());
    assert_eq!(dump.lines().count(), tree.nodes().len() + 1);
}
