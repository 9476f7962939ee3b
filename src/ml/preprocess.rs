use serde::{Deserialize, Serialize};

/// Replaces NaN with the column median seen at fit time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedianImputer {
    pub medians: Vec<f64>,
}

impl MedianImputer {
    /// Columns with no observed value impute 0
    pub fn fit(rows: &[Vec<f64>], n_features: usize) -> Self {
        let medians = (0..n_features)
            .map(|j| {
                let mut observed: Vec<f64> = rows.iter().map(|r| r[j]).filter(|v| !v.is_nan()).collect();
                median(&mut observed).unwrap_or(0.0)
            })
            .collect();
        Self { medians }
    }

    pub fn transform(&self, rows: &mut [Vec<f64>]) {
        for row in rows.iter_mut() {
            for (value, median) in row.iter_mut().zip(&self.medians) {
                if value.is_nan() {
                    *value = *median;
                }
            }
        }
    }
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Divides each column by its population standard deviation. Columns are
/// not centered; a zero deviation scales by 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceScaler {
    pub scales: Vec<f64>,
}

impl VarianceScaler {
    pub fn fit(rows: &[Vec<f64>], n_features: usize) -> Self {
        let n = rows.len() as f64;
        let scales = (0..n_features)
            .map(|j| {
                if rows.is_empty() {
                    return 1.0;
                }
                let mean = rows.iter().map(|r| r[j]).sum::<f64>() / n;
                let variance = rows.iter().map(|r| (r[j] - mean).powi(2)).sum::<f64>() / n;
                let std = variance.sqrt();
                if std > 0.0 && std.is_finite() {
                    std
                } else {
                    1.0
                }
            })
            .collect();
        Self { scales }
    }

    pub fn transform(&self, rows: &mut [Vec<f64>]) {
        for row in rows.iter_mut() {
            for (value, scale) in row.iter_mut().zip(&self.scales) {
                *value /= scale;
            }
        }
    }
}
