use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use thiserror::Error;

/// Which representation the resolver hands back to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnShape {
    /// Present the matched sub-profile as the caller-facing entity.
    Specialized,
    /// Always present the account row itself. The matched sub-profile
    /// stays reachable through the resolution accessors.
    Raw,
}

#[derive(Debug, Error)]
#[error("unrecognized return shape '{0}', expected 'specialized' or 'raw'")]
pub struct ParseReturnShapeError(String);

impl FromStr for ReturnShape {
    type Err = ParseReturnShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "specialized" | "wrapped" => Ok(ReturnShape::Specialized),
            "raw" => Ok(ReturnShape::Raw),
            other => Err(ParseReturnShapeError(other.to_string())),
        }
    }
}

/// Errors from profile configuration validation. All of these are raised
/// when the configuration is loaded, never during resolution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileConfigError {
    #[error("profile preference list is empty")]
    EmptyPreference,

    #[error("duplicate relation '{0}' in profile preference")]
    DuplicateRelation(String),

    #[error("preferred relation '{0}' is not declared by the resolver")]
    UnknownRelation(String),

    #[error("relation '{0}' declared more than once in the relation table")]
    DuplicateDeclaration(String),
}

/// Validated profile-resolution configuration: an ordered relation
/// preference plus the caller-facing return shape.
#[derive(Debug, Clone)]
pub struct ProfileConfig {
    preference: Vec<String>,
    shape: ReturnShape,
}

impl ProfileConfig {
    /// Validate and build a config. Empty or duplicated preference entries
    /// are rejected here with a descriptive error.
    pub fn new(
        preference: Vec<String>,
        shape: ReturnShape,
    ) -> Result<Self, ProfileConfigError> {
        if preference.is_empty() {
            return Err(ProfileConfigError::EmptyPreference);
        }

        let mut seen = HashSet::new();
        for name in &preference {
            if !seen.insert(name.as_str()) {
                return Err(ProfileConfigError::DuplicateRelation(name.clone()));
            }
        }

        Ok(Self { preference, shape })
    }

    /// Build from the process-wide settings block.
    pub fn from_settings(
        settings: &crate::config::ProfileSettings,
    ) -> Result<Self, ProfileConfigError> {
        Self::new(settings.preference.clone(), settings.shape)
    }

    /// Relation names in preference order.
    pub fn preference(&self) -> &[String] {
        &self.preference
    }

    pub fn shape(&self) -> ReturnShape {
        self.shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = ProfileConfig::new(
            vec!["admin".to_string(), "customer".to_string()],
            ReturnShape::Specialized,
        )
        .unwrap();

        assert_eq!(config.preference(), ["admin", "customer"]);
        assert_eq!(config.shape(), ReturnShape::Specialized);
    }

    #[test]
    fn test_empty_preference_rejected() {
        let err = ProfileConfig::new(vec![], ReturnShape::Raw).unwrap_err();
        assert_eq!(err, ProfileConfigError::EmptyPreference);
    }

    #[test]
    fn test_duplicate_preference_rejected() {
        let err = ProfileConfig::new(
            vec!["admin".to_string(), "admin".to_string()],
            ReturnShape::Specialized,
        )
        .unwrap_err();
        assert_eq!(err, ProfileConfigError::DuplicateRelation("admin".to_string()));
    }

    #[test]
    fn test_from_process_settings() {
        let settings = crate::config::ProfileSettings {
            preference: vec!["admin".to_string(), "customer".to_string()],
            shape: ReturnShape::Raw,
        };

        let config = ProfileConfig::from_settings(&settings).unwrap();
        assert_eq!(config.shape(), ReturnShape::Raw);
        assert_eq!(config.preference(), ["admin", "customer"]);
    }

    #[test]
    fn test_shape_parsing() {
        assert_eq!("raw".parse::<ReturnShape>().unwrap(), ReturnShape::Raw);
        assert_eq!("Specialized".parse::<ReturnShape>().unwrap(), ReturnShape::Specialized);
        assert_eq!("wrapped".parse::<ReturnShape>().unwrap(), ReturnShape::Specialized);
        assert!("proxy".parse::<ReturnShape>().is_err());
    }
}
