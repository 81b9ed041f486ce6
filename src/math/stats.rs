//! Sample statistics over parameter ensembles.

use nalgebra::DMatrix;

use crate::error::UqError;

/// Column-wise mean of `samples` (each sample has the same length).
pub fn mean(samples: &[Vec<f64>]) -> Result<Vec<f64>, UqError> {
    let dim = check_samples(samples, 1)?;
    let n = samples.len() as f64;
    let mut out = vec![0.0; dim];
    for s in samples {
        for (acc, v) in out.iter_mut().zip(s.iter()) {
            *acc += v;
        }
    }
    for v in &mut out {
        *v /= n;
    }
    Ok(out)
}

/// Unbiased (ddof = 1) sample covariance, shape `dim × dim`.
pub fn covariance(samples: &[Vec<f64>]) -> Result<DMatrix<f64>, UqError> {
    let dim = check_samples(samples, 2)?;
    let mu = mean(samples)?;
    let mut cov = DMatrix::<f64>::zeros(dim, dim);
    for s in samples {
        for i in 0..dim {
            let di = s[i] - mu[i];
            for j in i..dim {
                cov[(i, j)] += di * (s[j] - mu[j]);
            }
        }
    }
    let denom = samples.len() as f64 - 1.0;
    for i in 0..dim {
        for j in i..dim {
            let v = cov[(i, j)] / denom;
            cov[(i, j)] = v;
            cov[(j, i)] = v;
        }
    }
    Ok(cov)
}

/// Population (ddof = 0) variance of a scalar series.
pub fn variance(series: &[f64]) -> f64 {
    if series.is_empty() {
        return f64::NAN;
    }
    let n = series.len() as f64;
    let mu = series.iter().sum::<f64>() / n;
    series.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / n
}

/// Row-major nested vectors for JSON export.
pub fn matrix_rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    m.row_iter().map(|r| r.iter().copied().collect()).collect()
}

fn check_samples(samples: &[Vec<f64>], min_len: usize) -> Result<usize, UqError> {
    if samples.len() < min_len {
        return Err(UqError::dimension(format!(
            "Need at least {min_len} samples, got {}.",
            samples.len()
        )));
    }
    let dim = samples[0].len();
    if samples.iter().any(|s| s.len() != dim) {
        return Err(UqError::dimension("Samples have inconsistent lengths."));
    }
    Ok(dim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_covariance_of_small_ensemble() {
        let samples = vec![vec![1.0, 2.0], vec![3.0, 6.0], vec![5.0, 10.0]];
        let mu = mean(&samples).unwrap();
        assert_eq!(mu, vec![3.0, 6.0]);

        let cov = covariance(&samples).unwrap();
        assert!((cov[(0, 0)] - 4.0).abs() < 1e-12);
        assert!((cov[(0, 1)] - 8.0).abs() < 1e-12);
        assert!((cov[(1, 0)] - 8.0).abs() < 1e-12);
        assert!((cov[(1, 1)] - 16.0).abs() < 1e-12);
    }

    #[test]
    fn covariance_needs_two_samples() {
        assert!(covariance(&[vec![1.0]]).is_err());
        assert!(mean(&[]).is_err());
    }

    #[test]
    fn variance_is_population() {
        assert!((variance(&[1.0, 2.0, 3.0, 4.0]) - 1.25).abs() < 1e-12);
        assert!(variance(&[]).is_nan());
    }

    #[test]
    fn matrix_rows_are_row_major() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(matrix_rows(&m), vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }
}
