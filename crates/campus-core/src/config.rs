//! Workflow tunables.

use std::str::FromStr;

/// Fee charged per registered credit.
pub const DEFAULT_FEE_PER_CREDIT: u64 = 5000;
/// Credits assumed for a course missing from the catalogue.
pub const DEFAULT_COURSE_CREDITS: u32 = 3;
/// Default listing page size.
pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Settings shared by the workflow orchestrators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    pub fee_per_credit: u64,
    pub default_course_credits: u32,
    pub page_size: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            fee_per_credit: DEFAULT_FEE_PER_CREDIT,
            default_course_credits: DEFAULT_COURSE_CREDITS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl WorkflowConfig {
    /// Create from environment variables
    ///
    /// Reads (all optional):
    /// - CAMPUS_FEE_PER_CREDIT (default: 5000)
    /// - CAMPUS_DEFAULT_CREDITS (default: 3)
    /// - CAMPUS_PAGE_SIZE (default: 20)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            fee_per_credit: parse_var(&lookup, "CAMPUS_FEE_PER_CREDIT", defaults.fee_per_credit)?,
            default_course_credits: parse_var(
                &lookup,
                "CAMPUS_DEFAULT_CREDITS",
                defaults.default_course_credits,
            )?,
            page_size: parse_var(&lookup, "CAMPUS_PAGE_SIZE", defaults.page_size)?,
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = WorkflowConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, WorkflowConfig::default());
        assert_eq!(config.fee_per_credit, 5000);
        assert_eq!(config.default_course_credits, 3);
        assert_eq!(config.page_size, 20);
    }

    #[test]
    fn test_overrides() {
        let config = WorkflowConfig::from_lookup(|var| match var {
            "CAMPUS_FEE_PER_CREDIT" => Some("7500".into()),
            "CAMPUS_PAGE_SIZE" => Some(" 50 ".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.fee_per_credit, 7500);
        assert_eq!(config.default_course_credits, 3);
        assert_eq!(config.page_size, 50);
    }

    #[test]
    fn test_invalid_value() {
        let err = WorkflowConfig::from_lookup(|var| {
            (var == "CAMPUS_DEFAULT_CREDITS").then(|| "three".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("CAMPUS_DEFAULT_CREDITS"));
    }
}
