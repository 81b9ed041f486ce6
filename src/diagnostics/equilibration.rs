//! Marginal standard error rule (MSER) for burn-in detection.
//!
//! For truncation points `d = dmin, dmin + dstep, …` we compute the squared
//! standard error of the remaining series, `var(x[d..]) / len(x[d..])`. The
//! truncation with the smallest value marks the end of the transient.

use crate::error::UqError;
use crate::math::variance;

#[derive(Debug, Clone, PartialEq)]
pub struct Mser {
    /// Estimated equilibration index in the original series.
    pub dstar: usize,
    /// Squared standard errors, one per candidate truncation.
    pub se2: Vec<f64>,
}

/// MSER equilibration estimate.
///
/// `dmax = None` searches up to (but excluding) the last element.
/// The estimate is `min(dmin + (argmin + 1) · dstep, len)`.
pub fn mser(
    series: &[f64],
    dmin: usize,
    dstep: usize,
    dmax: Option<usize>,
) -> Result<Mser, UqError> {
    let len = series.len();
    if dstep == 0 {
        return Err(UqError::parameter("MSER step must be > 0."));
    }
    let end = dmax.unwrap_or(len.saturating_sub(1)).min(len);
    if dmin >= end {
        return Err(UqError::dimension(format!(
            "MSER search range is empty (dmin={dmin}, end={end}, len={len})."
        )));
    }

    let se2: Vec<f64> = (dmin..end)
        .step_by(dstep)
        .map(|d| {
            let tail = &series[d..];
            variance(tail) / tail.len() as f64
        })
        .collect();

    let argmin = se2
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |best, (i, &v)| if v < best.1 { (i, v) } else { best })
        .0;
    let dstar = (dmin + (argmin + 1) * dstep).min(len);
    Ok(Mser { dstar, se2 })
}
