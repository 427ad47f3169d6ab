/// Configuration for edit sessions
use crate::error::{EditSessionError, Result};
use crate::models::{AttributeViewMode, ObjectId, ObjectType};
use serde::{Deserialize, Serialize};

pub const ENV_NEW_OBJECT_ID: &str = "OBJECTSHELF_NEW_OBJECT_ID";
pub const ENV_MAX_TAG_NAME_LENGTH: &str = "OBJECTSHELF_MAX_TAG_NAME_LENGTH";
pub const ENV_SUBOBJECT_VIEW_MODE: &str = "OBJECTSHELF_SUBOBJECT_VIEW_MODE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditSessionConfig {
    /// Id of the edit state of an object that is not saved yet
    pub new_object_id: ObjectId,

    /// Longer new tag names are rejected
    pub max_tag_name_length: usize,

    /// Attribute fields loaded for the subobjects of a composite
    pub subobject_view_mode: AttributeViewMode,

    /// Type of objects created from scratch
    pub default_object_type: ObjectType,
}

impl Default for EditSessionConfig {
    fn default() -> Self {
        Self {
            new_object_id: 0,
            max_tag_name_length: 255,
            subobject_view_mode: AttributeViewMode::Basic,
            default_object_type: ObjectType::Link,
        }
    }
}

impl EditSessionConfig {
    /// Defaults overridden by `OBJECTSHELF_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_NEW_OBJECT_ID) {
            config.new_object_id = value.trim().parse().map_err(|_| {
                EditSessionError::invalid_config(format!(
                    "{} must be an integer, got '{}'",
                    ENV_NEW_OBJECT_ID, value
                ))
            })?;
        }
        if let Some(value) = lookup(ENV_MAX_TAG_NAME_LENGTH) {
            config.max_tag_name_length = value.trim().parse().map_err(|_| {
                EditSessionError::invalid_config(format!(
                    "{} must be a positive integer, got '{}'",
                    ENV_MAX_TAG_NAME_LENGTH, value
                ))
            })?;
        }
        if let Some(value) = lookup(ENV_SUBOBJECT_VIEW_MODE) {
            config.subobject_view_mode = value
                .trim()
                .parse()
                .map_err(EditSessionError::invalid_config)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EditSessionError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_tag_name_length == 0 {
            return Err(EditSessionError::invalid_config(
                "max_tag_name_length must be greater than 0",
            ));
        }

        if self.new_object_id > 0 {
            return Err(EditSessionError::invalid_config(format!(
                "new_object_id must not be positive (got {}); positive ids belong to saved objects",
                self.new_object_id
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = EditSessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.new_object_id, 0);
        assert_eq!(config.subobject_view_mode, AttributeViewMode::Basic);
    }

    #[test]
    fn test_env_overrides() {
        let config = EditSessionConfig::from_lookup(lookup(&[
            (ENV_NEW_OBJECT_ID, "-100"),
            (ENV_MAX_TAG_NAME_LENGTH, "32"),
            (ENV_SUBOBJECT_VIEW_MODE, "full"),
        ]))
        .unwrap();

        assert_eq!(config.new_object_id, -100);
        assert_eq!(config.max_tag_name_length, 32);
        assert_eq!(config.subobject_view_mode, AttributeViewMode::Full);
    }

    #[test]
    fn test_invalid_env_values_are_rejected() {
        let result =
            EditSessionConfig::from_lookup(lookup(&[(ENV_MAX_TAG_NAME_LENGTH, "lots")]));
        assert!(matches!(result, Err(EditSessionError::InvalidConfig(_))));

        let result = EditSessionConfig::from_lookup(lookup(&[(ENV_NEW_OBJECT_ID, "5")]));
        assert!(matches!(result, Err(EditSessionError::InvalidConfig(_))));

        let result = EditSessionConfig::from_lookup(lookup(&[(ENV_SUBOBJECT_VIEW_MODE, "wide")]));
        assert!(matches!(result, Err(EditSessionError::InvalidConfig(_))));
    }

    #[test]
    fn test_from_json_str_fills_defaults() {
        let config =
            EditSessionConfig::from_json_str(r#"{"max_tag_name_length": 64, "default_object_type": "markdown"}"#)
                .unwrap();
        assert_eq!(config.max_tag_name_length, 64);
        assert_eq!(config.default_object_type, ObjectType::Markdown);
        assert_eq!(config.new_object_id, 0);

        assert!(EditSessionConfig::from_json_str(r#"{"max_tag_name_length": 0}"#).is_err());
    }
}
