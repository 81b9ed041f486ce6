//! Export MCMC chains (CSV) and run summaries (JSON).
//!
//! The chain CSV is long-format, one row per walker and step, so it loads
//! directly into a dataframe or spreadsheet.

use std::fs::File;
use std::path::Path;

use crate::domain::RunSummary;
use crate::error::UqError;
use crate::sampling::Chain;

/// Write `walker,step,log_prob,theta_0..theta_{N-1}` rows.
pub fn write_chain_csv(path: &Path, chain: &Chain) -> Result<(), UqError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| UqError::Io(format!("Failed to create chain CSV '{}': {e}", path.display())))?;

    let mut header = vec!["walker".to_string(), "step".to_string(), "log_prob".to_string()];
    header.extend((0..chain.n_dim()).map(|d| format!("theta_{d}")));
    writer
        .write_record(&header)
        .map_err(|e| UqError::Io(format!("Failed to write chain CSV header: {e}")))?;

    for (w, (samples, log_prob)) in chain.samples.iter().zip(chain.log_prob.iter()).enumerate() {
        for (step, (theta, lp)) in samples.iter().zip(log_prob.iter()).enumerate() {
            let mut row = Vec::with_capacity(3 + theta.len());
            row.push(w.to_string());
            row.push(step.to_string());
            row.push(format!("{lp:.10}"));
            row.extend(theta.iter().map(|v| format!("{v:.10}")));
            writer
                .write_record(&row)
                .map_err(|e| UqError::Io(format!("Failed to write chain CSV row: {e}")))?;
        }
    }

    writer
        .flush()
        .map_err(|e| UqError::Io(format!("Failed to flush chain CSV: {e}")))?;
    Ok(())
}

/// Write a run summary as pretty JSON.
pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<(), UqError> {
    let file = File::create(path).map_err(|e| {
        UqError::Io(format!("Failed to create summary JSON '{}': {e}", path.display()))
    })?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| UqError::Io(format!("Failed to write summary JSON: {e}")))
}

/// Read a run summary written by [`write_summary_json`].
pub fn read_summary_json(path: &Path) -> Result<RunSummary, UqError> {
    let file = File::open(path).map_err(|e| {
        UqError::Io(format!("Failed to open summary JSON '{}': {e}", path.display()))
    })?;
    serde_json::from_reader(file)
        .map_err(|e| UqError::Config(format!("Invalid summary JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use nalgebra::DMatrix;

    use super::*;
    use crate::domain::{FimSummary, FitSummary};
    use crate::math::{FimAnalysis, matrix_rows};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("uq_{}_{name}", std::process::id()))
    }

    #[test]
    fn chain_csv_has_one_row_per_walker_step() {
        let chain = Chain {
            samples: vec![
                vec![vec![1.0, 2.0], vec![1.5, 2.5]],
                vec![vec![0.0, 0.0], vec![0.1, 0.2]],
            ],
            log_prob: vec![vec![-1.0, -0.5], vec![-2.0, -1.5]],
            accepted: vec![1, 1],
        };
        let path = temp_path("chain.csv");
        write_chain_csv(&path, &chain).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["walker", "step", "log_prob", "theta_0", "theta_1"]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(&rows[3][0], "1");
        assert_eq!(&rows[3][1], "1");
        assert_eq!(rows[3][4].parse::<f64>().unwrap(), 0.2);
        let _ = std::fs::remove_file(&path);
    }

    fn fit_only_summary() -> RunSummary {
        RunSummary {
            tool: "uq".to_string(),
            generated_at: chrono::Utc::now(),
            model: "fractional".to_string(),
            n_params: 2,
            n_points: 3,
            fit: FitSummary {
                theta: vec![-2.763, -1.311],
                physical: vec![0.063, 0.27],
                cost: 0.663,
                iterations: 12,
                converged: true,
            },
            fim: None,
            monte_carlo: None,
            mcmc: None,
        }
    }

    #[test]
    fn summary_json_reloads() {
        let summary = fit_only_summary();
        let path = temp_path("summary.json");
        write_summary_json(&path, &summary).unwrap();
        let back = read_summary_json(&path).unwrap();
        assert_eq!(back.fit.theta, summary.fit.theta);
        assert!(back.fim.is_none());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn singular_fim_summary_reloads() {
        // A parameter the residuals never depend on: rank-deficient FIM.
        let jacobian = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 2.0, 0.0, 3.0, 0.0]);
        let fa = FimAnalysis::from_jacobian(&[0.0, 0.0], jacobian).unwrap();
        assert!(fa.condition_number.is_none());

        let mut summary = fit_only_summary();
        summary.fim = Some(FimSummary {
            fim: matrix_rows(&fa.fim),
            eigenvalues: fa.eigen.values.iter().copied().collect(),
            eigenvectors: matrix_rows(&fa.eigen.vectors.transpose()),
            covariance: fa.covariance.as_ref().map(matrix_rows),
            condition_number: fa.condition_number,
        });

        let path = temp_path("singular_summary.json");
        write_summary_json(&path, &summary).unwrap();
        let back = read_summary_json(&path).unwrap();
        let fim = back.fim.unwrap();
        assert!(fim.condition_number.is_none());
        assert!(fim.covariance.is_none());
        assert_eq!(fim.eigenvalues.len(), 2);
        let _ = std::fs::remove_file(&path);
    }
}
