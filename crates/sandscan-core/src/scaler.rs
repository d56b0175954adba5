use crate::error::ModelError;

/// Per-feature mean/variance standardization. Fitted on the training
/// partition only and persisted beside the classifier; inference reuses the
/// training-time parameters unchanged.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Result<StandardScaler, ModelError> {
        let first = rows.first().ok_or(ModelError::NoSamples)?;
        let width = first.len();
        for row in rows {
            if row.len() != width {
                return Err(ModelError::ShapeMismatch {
                    expected: width,
                    got: row.len(),
                });
            }
        }
        let count = rows.len() as f64;
        let mut means = vec![0.0; width];
        for row in rows {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value;
            }
        }
        for mean in &mut means {
            *mean /= count;
        }
        let mut stds = vec![0.0; width];
        for row in rows {
            for ((std, value), mean) in stds.iter_mut().zip(row).zip(&means) {
                let delta = value - mean;
                *std += delta * delta;
            }
        }
        for std in &mut stds {
            *std = (*std / count).sqrt();
            // zero-variance columns pass through unscaled
            if *std == 0.0 {
                *std = 1.0;
            }
        }
        Ok(StandardScaler { means, stds })
    }

    pub fn width(&self) -> usize {
        self.means.len()
    }

    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        if row.len() != self.width() {
            return Err(ModelError::ShapeMismatch {
                expected: self.width(),
                got: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(value, (mean, std))| (value - mean) / std)
            .collect())
    }

    pub fn transform_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ModelError> {
        rows.iter().map(|row| self.transform(row)).collect()
    }
}
