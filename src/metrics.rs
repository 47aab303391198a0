//! Performance measures shared by the tree models.
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::{error::NjangError, traits::Scalar, utils::mean};

/// Above this value a label (or a probability) is considered positive.
pub(crate) const POSITIVE_THRESHOLD: f64 = 0.5;

/// Standard performance measures of a binary classifier.
///
/// Precision and recall are set to zero when there is no true positive, the
/// specificity is zero when there is no true negative.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Report<T> {
    pub accuracy: T,
    pub precision: T,
    pub recall: T,
    pub specificity: T,
}

impl<T: Scalar> Report<T> {
    /// Builds the contingency table of `predictions` against `labels`.
    ///
    /// A prediction is positive when it is strictly above `threshold`, a label
    /// when it is strictly above `0.5`. Fails when there is nothing to count.
    pub fn from_predictions(
        predictions: ArrayView1<T>,
        labels: ArrayView1<T>,
        threshold: T,
    ) -> Result<Self, NjangError> {
        check_lengths(predictions.len(), labels.len())?;
        if labels.is_empty() {
            return Err(NjangError::invalid("no example to score"));
        }
        let half = T::cast(POSITIVE_THRESHOLD);
        let (mut tp, mut tn, mut fp, mut fn_) = (T::zero(), T::zero(), T::zero(), T::zero());
        for (prediction, label) in predictions.iter().zip(labels.iter()) {
            match (*prediction > threshold, *label > half) {
                (true, true) => tp = tp + T::one(),
                (true, false) => fp = fp + T::one(),
                (false, true) => fn_ = fn_ + T::one(),
                (false, false) => tn = tn + T::one(),
            }
        }
        let (precision, recall) = if tp == T::zero() {
            (T::zero(), T::zero())
        } else {
            (tp / (tp + fp), tp / (tp + fn_))
        };
        let specificity = if tn == T::zero() {
            T::zero()
        } else {
            tn / (tn + fp)
        };
        Ok(Self {
            accuracy: (tp + tn) / (tp + tn + fp + fn_),
            precision,
            recall,
            specificity,
        })
    }

    /// F-beta score, `beta = 1` being the usual F1 score.
    ///
    /// Returns zero when precision and recall are both zero.
    /// ```
    /// use njang_trees::Report;
    /// let report: Report<f64> = Report { accuracy: 0.9, precision: 0.5, recall: 1.0, specificity: 0.8 };
    /// assert!((report.f_score(1.) - 2. / 3.).abs() < 1e-12);
    /// ```
    pub fn f_score(&self, beta: T) -> T {
        let beta2 = beta * beta;
        let denominator = beta2 * self.precision + self.recall;
        if denominator == T::zero() {
            return T::zero();
        }
        (T::one() + beta2) * self.precision * self.recall / denominator
    }
}

/// Coefficient of determination `1 - RSS/TSS` of `predictions` against
/// `labels`.
///
/// When the labels are constant (`TSS = 0`), the score is one for perfect
/// predictions and zero otherwise.
pub fn coefficient_of_determination<T: Scalar>(
    predictions: ArrayView1<T>,
    labels: ArrayView1<T>,
) -> Result<T, NjangError> {
    check_lengths(predictions.len(), labels.len())?;
    if labels.is_empty() {
        return Err(NjangError::invalid("no example to score"));
    }
    let label_mean = mean(labels.iter().copied());
    let (rss, tss) = predictions.iter().zip(labels.iter()).fold(
        (T::zero(), T::zero()),
        |(rss, tss), (prediction, label)| {
            (
                rss + (*prediction - *label) * (*prediction - *label),
                tss + (label_mean - *label) * (label_mean - *label),
            )
        },
    );
    if tss == T::zero() {
        return Ok(if rss == T::zero() { T::one() } else { T::zero() });
    }
    Ok(T::one() - rss / tss)
}

fn check_lengths(n_predictions: usize, n_labels: usize) -> Result<(), NjangError> {
    if n_predictions != n_labels {
        return Err(NjangError::invalid(format!(
            "{n_predictions} predictions for {n_labels} labels"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    #[test]
    fn report_counts() {
        let predictions = array![0.9f64, 0.8, 0.2, 0.1, 0.7];
        let labels = array![1., 0., 1., 0., 1.];
        let report = Report::from_predictions(predictions.view(), labels.view(), 0.5).unwrap();
        assert!((report.accuracy - 0.6).abs() < 1e-12);
        assert!((report.precision - 2. / 3.).abs() < 1e-12);
        assert!((report.recall - 2. / 3.).abs() < 1e-12);
        assert!((report.specificity - 0.5).abs() < 1e-12);
    }

    #[test]
    fn report_without_true_positive() {
        let predictions = array![0.1, 0.9];
        let labels = array![1., 0.];
        let report = Report::from_predictions(predictions.view(), labels.view(), 0.5).unwrap();
        assert_eq!(report.precision, 0.);
        assert_eq!(report.recall, 0.);
        assert_eq!(report.specificity, 0.);
        assert_eq!(report.f_score(1.), 0.);
    }

    #[test]
    fn f_beta_weights_recall() {
        let report: Report<f64> = Report {
            accuracy: 0.,
            precision: 0.5,
            recall: 1.,
            specificity: 0.,
        };
        // (1 + 4) * 0.5 * 1 / (4 * 0.5 + 1)
        assert!((report.f_score(2.) - 2.5 / 3.).abs() < 1e-12);
    }

    #[test]
    fn determination() {
        let labels = array![1., 2., 3.];
        let perfect = coefficient_of_determination(labels.view(), labels.view()).unwrap();
        assert_eq!(perfect, 1.);
        let constant = array![2., 2., 2.];
        let baseline = coefficient_of_determination(constant.view(), labels.view()).unwrap();
        assert_eq!(baseline, 0.);
        assert_eq!(
            coefficient_of_determination(labels.view(), constant.view()).unwrap(),
            0.
        );
    }

    #[test]
    fn mismatched_lengths() {
        let predictions = array![1., 2.];
        let labels = array![1.];
        assert!(coefficient_of_determination(predictions.view(), labels.view()).is_err());
        assert!(Report::from_predictions(predictions.view(), labels.view(), 0.5).is_err());
    }

    #[test]
    fn empty_scores() {
        let nothing = Array1::<f64>::zeros(0);
        assert!(matches!(
            Report::from_predictions(nothing.view(), nothing.view(), 0.5),
            Err(NjangError::InvalidInput(_))
        ));
        assert!(coefficient_of_determination(nothing.view(), nothing.view()).is_err());
    }
}
