use ndarray::Array2;

use crate::{error::NjangError, traits::Scalar};

/// Stacks `rows` into a matrix with one example per row.
///
/// Fails when there is no row, when rows have no feature or when a row does
/// not have the same number of features as the first one.
/// ```
/// use njang_trees::rows_to_array;
/// let x = rows_to_array(&[vec![1., 2.], vec![3., 4.]]).unwrap();
/// assert_eq!(x.dim(), (2, 2));
/// assert!(rows_to_array(&[vec![1., 2.], vec![3.]]).is_err());
/// ```
pub fn rows_to_array<T: Scalar>(rows: &[Vec<T>]) -> Result<Array2<T>, NjangError> {
    let n_features = match rows.first() {
        Some(row) => row.len(),
        None => return Err(NjangError::invalid("no example provided")),
    };
    if n_features == 0 {
        return Err(NjangError::invalid("examples have no feature"));
    }
    let mut flat = Vec::with_capacity(rows.len() * n_features);
    for (number, row) in rows.iter().enumerate() {
        if row.len() != n_features {
            return Err(NjangError::invalid(format!(
                "row {number} has {} features, expected {n_features}",
                row.len()
            )));
        }
        flat.extend_from_slice(row);
    }
    Array2::from_shape_vec((rows.len(), n_features), flat)
        .map_err(|error| NjangError::invalid(error.to_string()))
}

/// Arithmetic mean, zero for an empty iterator.
pub(crate) fn mean<T, I>(values: I) -> T
where
    T: Scalar,
    I: IntoIterator<Item = T>,
{
    let (sum, count) = values
        .into_iter()
        .fold((T::zero(), 0usize), |(sum, count), value| {
            (sum + value, count + 1)
        });
    if count == 0 {
        T::zero()
    } else {
        sum / T::cast(count as f64)
    }
}
