#![feature(test)]
extern crate ndarray;
extern crate ndarray_rand;
extern crate njang_trees;
extern crate rand_chacha;
extern crate test;

use ndarray::{Array1, Array2, Axis};
use ndarray_rand::{rand::SeedableRng, rand_distr::StandardNormal, RandomExt};
use njang_trees::{
    ClassificationModel, DecisionTreeSettings, ForestClassifier, ForestSettings,
    GradBoostRegressor, GradientBoostingSettings, Impurity, RegressionModel, TreeClassifier,
};
use rand_chacha::ChaCha20Rng;
use test::Bencher;

const N: usize = 1000;
const P: usize = 10;

fn dataset() -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha20Rng::seed_from_u64(0);
    let x = Array2::<f64>::random_using((N, P), StandardNormal, &mut rng);
    let y = x.map_axis(Axis(1), |row| if row[0] + row[1] > 0. { 1. } else { 0. });
    (x, y)
}

#[bench]
fn fit_tree_entropy_bench(bench: &mut Bencher) {
    let (x, y) = dataset();
    let mut model = TreeClassifier::new(DecisionTreeSettings {
        impurity: Impurity::Entropy,
        min_gain: 0.01,
    });
    bench.iter(|| {
        let _fitted = model.fit(&x, &y);
    });
}

#[bench]
fn fit_tree_gini_bench(bench: &mut Bencher) {
    let (x, y) = dataset();
    let mut model = TreeClassifier::new(DecisionTreeSettings {
        impurity: Impurity::Gini,
        min_gain: 0.01,
    });
    bench.iter(|| {
        let _fitted = model.fit(&x, &y);
    });
}

#[bench]
fn fit_forest_bench(bench: &mut Bencher) {
    let (x, y) = dataset();
    let mut model = ForestClassifier::new(ForestSettings {
        n_trees: 10,
        random_state: Some(0),
        ..Default::default()
    });
    bench.iter(|| {
        let _fitted = model.fit(&x, &y);
    });
}

#[bench]
fn predict_forest_bench(bench: &mut Bencher) {
    let (x, y) = dataset();
    let mut model = ForestClassifier::new(ForestSettings::default());
    let _fitted = model.fit(&x, &y);
    bench.iter(|| {
        let _predictions = model.predict(&x);
    });
}

#[bench]
fn fit_gradient_boosting_bench(bench: &mut Bencher) {
    let (x, _) = dataset();
    let y = x.map_axis(Axis(1), |row| row[0] * 2. - row[2]);
    let mut model = GradBoostRegressor::new(GradientBoostingSettings {
        n_trees: 5,
        min_gain: 0.05,
        learning_rate: 0.5,
    });
    bench.iter(|| {
        let _fitted = model.fit(&x, &y);
    });
}
