//! Analysis settings with defaults and optional YAML overrides.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::clean::{DEFAULT_OUTLIER_THRESHOLD, ImputationStrategy, OutlierMethod};

pub const DEFAULT_LOW_ACCESS_THRESHOLD: f64 = 40.0;
pub const DEFAULT_GAP_THRESHOLD: f64 = 20.0;
pub const DEFAULT_ACCESS_COLUMN: &str = "internet access percentage";
pub const DEFAULT_RURAL_COLUMN: &str = "rural_internet_access";
pub const DEFAULT_URBAN_COLUMN: &str = "urban_internet_access";
pub const DEFAULT_REGION_COLUMN: &str = "region";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Access percentage below which a region counts as underserved.
    pub low_access_threshold: f64,
    /// Urban minus rural gap above which the divide is significant.
    pub rural_urban_gap_threshold: f64,
    #[serde(
        serialize_with = "serialize_display",
        deserialize_with = "deserialize_from_str"
    )]
    pub imputation_strategy: ImputationStrategy,
    #[serde(
        serialize_with = "serialize_display",
        deserialize_with = "deserialize_from_str"
    )]
    pub outlier_method: OutlierMethod,
    pub outlier_threshold: f64,
    pub access_column: String,
    pub rural_column: String,
    pub urban_column: String,
    pub region_column: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            low_access_threshold: DEFAULT_LOW_ACCESS_THRESHOLD,
            rural_urban_gap_threshold: DEFAULT_GAP_THRESHOLD,
            imputation_strategy: ImputationStrategy::default(),
            outlier_method: OutlierMethod::default(),
            outlier_threshold: DEFAULT_OUTLIER_THRESHOLD,
            access_column: DEFAULT_ACCESS_COLUMN.to_string(),
            rural_column: DEFAULT_RURAL_COLUMN.to_string(),
            urban_column: DEFAULT_URBAN_COLUMN.to_string(),
            region_column: DEFAULT_REGION_COLUMN.to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening settings file {path:?}"))?;
        let settings: Settings = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing settings from {path:?}"))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.low_access_threshold.is_finite(),
            "low_access_threshold must be a finite number"
        );
        ensure!(
            self.rural_urban_gap_threshold.is_finite(),
            "rural_urban_gap_threshold must be a finite number"
        );
        ensure!(
            self.outlier_threshold.is_finite() && self.outlier_threshold >= 0.0,
            "outlier_threshold must be a non-negative number"
        );
        Ok(())
    }
}

fn serialize_display<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: std::fmt::Display,
    S: Serializer,
{
    serializer.collect_str(value)
}

fn deserialize_from_str<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_keys_take_defaults() {
        let settings: Settings =
            serde_yaml::from_str("low_access_threshold: 55\nimputation_strategy: forward_fill\n")
                .unwrap();
        assert_eq!(settings.low_access_threshold, 55.0);
        assert_eq!(
            settings.imputation_strategy,
            ImputationStrategy::ForwardFill
        );
        assert_eq!(settings.rural_urban_gap_threshold, DEFAULT_GAP_THRESHOLD);
        assert_eq!(settings.outlier_threshold, 1.5);
        assert_eq!(settings.access_column, DEFAULT_ACCESS_COLUMN);
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let parsed = serde_yaml::from_str::<Settings>("imputation_strategy: guess\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn load_validates_thresholds() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "outlier_threshold: -1").unwrap();
        let err = Settings::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("outlier_threshold"));
    }

    #[test]
    fn round_trips_through_yaml() {
        let yaml = serde_yaml::to_string(&Settings::default()).unwrap();
        assert!(yaml.contains("imputation_strategy: interpolate"));
        let parsed: Settings = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, Settings::default());
    }
}
