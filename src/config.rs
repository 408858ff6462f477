use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cohort::QualificationThresholds;
use crate::error::ScorecardError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub thresholds: QualificationThresholds,
    pub change_threshold: f64,
    pub top_performers: usize,
    pub attention_limit: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            thresholds: QualificationThresholds::default(),
            change_threshold: 15.0,
            top_performers: 10,
            attention_limit: 10,
        }
    }
}

impl AnalyticsConfig {
    pub fn from_toml(text: &str) -> Result<Self, ScorecardError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: Option<&Path>) -> Result<Self, ScorecardError> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                let config = Self::from_toml(&text)?;
                debug!(path = %path.display(), ?config, "loaded analytics config");
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ScorecardError> {
        if !self.change_threshold.is_finite() || self.change_threshold < 0.0 {
            return Err(ScorecardError::InvalidConfig(format!(
                "change_threshold must be a non-negative number, got {}",
                self.change_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_keeps_defaults() {
        let config = AnalyticsConfig::from_toml("").unwrap();
        assert_eq!(config, AnalyticsConfig::default());
        assert_eq!(config.thresholds.min_first_quotes, 50);
        assert_eq!(config.thresholds.min_submitted, 10);
        assert_eq!(config.thresholds.min_weeks_active, 2);
    }

    #[test]
    fn partial_thresholds_merge_with_defaults() {
        let config = AnalyticsConfig::from_toml(
            r#"
            change_threshold = 12.5

            [thresholds]
            min_weeks_active = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.change_threshold, 12.5);
        assert_eq!(config.thresholds.min_weeks_active, 3);
        assert_eq!(config.thresholds.min_first_quotes, 50);
        assert_eq!(config.top_performers, 10);
    }

    #[test]
    fn negative_change_threshold_is_rejected() {
        let err = AnalyticsConfig::from_toml("change_threshold = -1.0").unwrap_err();
        assert!(matches!(err, ScorecardError::InvalidConfig(_)));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = AnalyticsConfig::from_toml("thresholds = 7").unwrap_err();
        assert!(matches!(err, ScorecardError::Config(_)));
    }

    #[test]
    fn missing_path_uses_defaults() {
        assert_eq!(AnalyticsConfig::load(None).unwrap(), AnalyticsConfig::default());
    }
}
