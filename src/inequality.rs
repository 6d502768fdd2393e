//! Gini and Theil inequality indices
//!
//! Both accept arrays of any dimension; values are flattened first.

use ndarray::{ArrayBase, Data, Dimension};

use crate::error::{LongevityError, Result};

/// Added to every value so that no element is exactly zero
const GINI_EPSILON: f64 = 1e-7;

/// Replaces exact zeros before taking logarithms
const THEIL_EPSILON: f64 = 1e-8;

fn flatten<S, D>(y: &ArrayBase<S, D>) -> Result<Vec<f64>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    if y.is_empty() {
        return Err(LongevityError::InvalidInput(
            "inequality index of an empty array".to_string(),
        ));
    }
    Ok(y.iter().copied().collect())
}

/// Gini coefficient
///
/// Negative inputs are shifted so the minimum is zero.
pub fn gini<S, D>(y: &ArrayBase<S, D>) -> Result<f64>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let mut values = flatten(y)?;

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    if min < 0.0 {
        for v in values.iter_mut() {
            *v -= min;
        }
    }
    for v in values.iter_mut() {
        *v += GINI_EPSILON;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let n = values.len() as f64;
    let weighted: f64 = values
        .iter()
        .enumerate()
        .map(|(i, v)| (2.0 * (i + 1) as f64 - n - 1.0) * v)
        .sum();
    let total: f64 = values.iter().sum();
    Ok(weighted / (n * total))
}

/// Theil T index
pub fn theil<S, D>(y: &ArrayBase<S, D>) -> Result<f64>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let values: Vec<f64> = flatten(y)?
        .into_iter()
        .map(|v| if v == 0.0 { THEIL_EPSILON } else { v })
        .collect();

    let n = values.len() as f64;
    let total: f64 = values.iter().sum();
    Ok(values
        .iter()
        .map(|v| {
            let share = v / total;
            share * (n * share).ln()
        })
        .sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1};
    use proptest::prelude::*;

    #[test]
    fn test_gini_of_constant_vector_is_zero() {
        assert_abs_diff_eq!(gini(&array![5.0, 5.0, 5.0, 5.0]).unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gini_of_maximally_unequal_vector() {
        // (n - 1) / n for one holder of everything
        let g = gini(&array![0.0, 0.0, 0.0, 10.0]).unwrap();
        assert_abs_diff_eq!(g, 0.75, epsilon = 1e-6);
    }

    #[test]
    fn test_gini_shifts_negative_values() {
        let shifted = gini(&array![-2.0, 0.0, 3.0]).unwrap();
        let positive = gini(&array![0.0, 2.0, 5.0]).unwrap();
        assert_abs_diff_eq!(shifted, positive, epsilon = 1e-12);
    }

    #[test]
    fn test_gini_flattens_matrices() {
        let matrix = array![[1.0, 4.0], [2.0, 3.0]];
        let vector = array![4.0, 3.0, 2.0, 1.0];
        assert_abs_diff_eq!(gini(&matrix).unwrap(), gini(&vector).unwrap(), epsilon = 1e-15);
    }

    #[test]
    fn test_theil_of_uniform_vector_is_zero() {
        assert_abs_diff_eq!(theil(&array![1.0, 1.0, 1.0, 1.0]).unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_theil_of_concentrated_vector_approaches_ln_n() {
        let t = theil(&array![0.0, 0.0, 0.0, 10.0]).unwrap();
        assert_abs_diff_eq!(t, 4.0_f64.ln(), epsilon = 1e-6);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let empty = Array1::<f64>::zeros(0);
        assert!(gini(&empty).is_err());
        assert!(theil(&empty).is_err());
    }

    /// Values with a transfer of `fraction` of half the gap from `y[rich]` to `y[poor]`
    fn transfer(values: &[f64], poor: usize, rich: usize, fraction: f64) -> Option<Array1<f64>> {
        let (poor, rich) = if values[poor] <= values[rich] { (poor, rich) } else { (rich, poor) };
        let gap = values[rich] - values[poor];
        if poor == rich || gap <= 1e-6 {
            return None;
        }
        let amount = fraction * gap / 2.0;
        let mut after = values.to_vec();
        after[poor] += amount;
        after[rich] -= amount;
        Some(Array1::from(after))
    }

    proptest! {
        #[test]
        fn prop_pigou_dalton_transfer_never_increases_gini(
            values in prop::collection::vec(0.0f64..1000.0, 2..30),
            i in any::<prop::sample::Index>(),
            j in any::<prop::sample::Index>(),
            fraction in 0.01f64..1.0,
        ) {
            let (a, b) = (i.index(values.len()), j.index(values.len()));
            if let Some(after) = transfer(&values, a, b, fraction) {
                let before = Array1::from(values.clone());
                prop_assert!(gini(&after).unwrap() <= gini(&before).unwrap() + 1e-12);
            }
        }

        #[test]
        fn prop_pigou_dalton_transfer_never_increases_theil(
            values in prop::collection::vec(0.5f64..1000.0, 2..30),
            i in any::<prop::sample::Index>(),
            j in any::<prop::sample::Index>(),
            fraction in 0.01f64..1.0,
        ) {
            let (a, b) = (i.index(values.len()), j.index(values.len()));
            if let Some(after) = transfer(&values, a, b, fraction) {
                let before = Array1::from(values.clone());
                prop_assert!(theil(&after).unwrap() <= theil(&before).unwrap() + 1e-12);
            }
        }
    }
}
