use serde::Serialize;

use crate::data::format_optional;

/// Accumulates present values of one numeric column.
#[derive(Debug, Clone, Default)]
pub struct ColumnStats {
    values: Vec<f64>,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl ColumnStats {
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut stats = ColumnStats::default();
        for value in values {
            stats.add_value(value);
        }
        stats
    }

    pub fn from_optional(values: &[Option<f64>]) -> Self {
        Self::from_values(values.iter().flatten().copied())
    }

    pub fn add_value(&mut self, value: f64) {
        self.sum += value;
        self.min = Some(self.min.map_or(value, |current| current.min(value)));
        self.max = Some(self.max.map_or(value, |current| current.max(value)));
        self.values.push(value);
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.sum / self.values.len() as f64)
        }
    }

    pub fn median(&self) -> Option<f64> {
        self.quantile(0.5)
    }

    /// Sample standard deviation (n - 1); undefined below two values.
    pub fn std_dev(&self) -> Option<f64> {
        if self.values.len() < 2 {
            return None;
        }
        let mean = self.mean()?;
        let squared: f64 = self.values.iter().map(|v| (v - mean).powi(2)).sum();
        Some((squared / (self.values.len() as f64 - 1.0)).sqrt())
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn range(&self) -> Option<f64> {
        Some(self.max? - self.min?)
    }

    /// Quantile with linear interpolation between closest ranks.
    pub fn quantile(&self, q: f64) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);
        let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
        let lower = position.floor() as usize;
        let upper = position.ceil() as usize;
        let weight = position - lower as f64;
        Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
    }

    pub fn describe(&self) -> DescriptiveStats {
        DescriptiveStats {
            mean: self.mean(),
            median: self.median(),
            std: self.std_dev(),
            min: self.min(),
            max: self.max(),
        }
    }

    pub fn disparity(&self) -> DisparityStats {
        DisparityStats {
            base: self.describe(),
            range: self.range(),
        }
    }
}

/// `None` marks a statistic that is undefined for the sample size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DescriptiveStats {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl DescriptiveStats {
    pub fn render_row(&self, name: &str) -> Vec<String> {
        vec![
            name.to_string(),
            format_optional(self.mean),
            format_optional(self.median),
            format_optional(self.std),
            format_optional(self.min),
            format_optional(self.max),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisparityStats {
    #[serde(flatten)]
    pub base: DescriptiveStats,
    pub range: Option<f64>,
}

impl DisparityStats {
    pub fn render_row(&self, name: &str) -> Vec<String> {
        let mut row = self.base.render_row(name);
        row.push(format_optional(self.range));
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quartiles_use_linear_interpolation() {
        let stats = ColumnStats::from_values([10.0, 12.0, 11.0, 13.0, 100.0]);
        assert_eq!(stats.quantile(0.25), Some(11.0));
        assert_eq!(stats.quantile(0.75), Some(13.0));
        let even = ColumnStats::from_values([1.0, 2.0, 3.0, 4.0]);
        assert_eq!(even.quantile(0.25), Some(1.75));
        assert_eq!(even.median(), Some(2.5));
    }

    #[test]
    fn std_dev_is_sample_and_undefined_below_two_values() {
        let stats = ColumnStats::from_values([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let std = stats.std_dev().unwrap();
        assert!((std - 2.138089935299395).abs() < 1e-12);
        assert_eq!(ColumnStats::from_values([3.0]).std_dev(), None);
    }

    #[test]
    fn empty_column_has_undefined_statistics() {
        let stats = ColumnStats::from_optional(&[None, None]);
        assert_eq!(stats.count(), 0);
        let described = stats.describe();
        assert_eq!(described.mean, None);
        assert_eq!(described.median, None);
        assert_eq!(stats.range(), None);
    }

    #[test]
    fn disparity_serializes_flat_with_null_markers() {
        let stats = ColumnStats::from_values([5.0]).disparity();
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["mean"], 5.0);
        assert_eq!(json["range"], 0.0);
        assert!(json["std"].is_null());
    }
}
