use core::fmt::{Debug, Display};
use core::iter::Sum;
use num_traits::{Float, FromPrimitive};

/// Implements classic steps of a regression model.
pub trait RegressionModel {
    type X;
    type Y;
    type FitResult;
    type PredictResult;
    type ScoreResult;
    /// Trains the model from scratch.
    fn fit(&mut self, x: &Self::X, y: &Self::Y) -> Self::FitResult;
    /// Predicts instances if possible.
    fn predict(&self, x: &Self::X) -> Self::PredictResult;
    /// Coefficient of determination of the predictions of `x` against `y`.
    fn score(&self, x: &Self::X, y: &Self::Y) -> Self::ScoreResult;
}

/// Implements classic steps of a binary classification model.
///
/// Labels are expected in `{0, 1}`, anything above `0.5` being the positive
/// class.
pub trait ClassificationModel {
    type X;
    type Y;
    type FitResult;
    type PredictResult;
    type ScoreResult;
    type Report;
    /// Trains the model from scratch.
    fn fit(&mut self, x: &Self::X, y: &Self::Y) -> Self::FitResult;
    /// Raw scores of the model, see each implementor for their range.
    fn predict(&self, x: &Self::X) -> Self::PredictResult;
    /// Accuracy of the model on `x` against `y`. The full contingency report
    /// is kept and can be read with [`ClassificationModel::report`].
    fn score(&mut self, x: &Self::X, y: &Self::Y) -> Self::ScoreResult;
    /// Report computed by the last call to [`ClassificationModel::score`].
    fn report(&self) -> Option<&Self::Report>;
}

/// Floating point numbers the models are able to work with.
pub trait Scalar:
    Float + FromPrimitive + Sum + Debug + Display + Default + Send + Sync + 'static
{
    /// Converts a `f64` constant into `Self`.
    fn cast(value: f64) -> Self;
}

macro_rules! impl_scalar {
    ($t:ty) => {
        impl Scalar for $t {
            fn cast(value: f64) -> Self {
                value as $t
            }
        }
    };
}
impl_scalar!(f32);
impl_scalar!(f64);
