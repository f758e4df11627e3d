use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_DEPTH_CEILING: usize = 5;

/// Environment variable that overrides [`TreeConfig::depth_ceiling`].
pub const DEPTH_CEILING_ENV: &str = "FOLDER_TREE_DEPTH_CEILING";

/// Tunables for drop classification and the depth ceiling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TreeConfig {
    /// Deepest level any folder may reach; roots are at depth 1.
    pub depth_ceiling: usize,
    /// Pointer offsets above `before_ratio * height` no longer count as `before`.
    pub before_ratio: f32,
    /// Pointer offsets below `after_ratio * height` do not yet count as `after`.
    pub after_ratio: f32,
    /// Where a demoted `inside` drop splits between `before` and `after`.
    pub demote_split_ratio: f32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            depth_ceiling: DEFAULT_DEPTH_CEILING,
            before_ratio: 0.2,
            after_ratio: 0.8,
            demote_split_ratio: 0.5,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config json")]
    Parse(#[from] serde_json::Error),
    #[error("FOLDER_TREE_DEPTH_CEILING={0:?} is not an integer")]
    InvalidDepthOverride(String),
    #[error("depth ceiling must be at least 1")]
    ZeroDepthCeiling,
    #[error(
        "ratios must satisfy 0 <= before ({before}) < after ({after}) <= 1 \
         and 0 <= split ({split}) <= 1"
    )]
    InvalidRatios {
        before: f32,
        after: f32,
        split: f32,
    },
}

impl TreeConfig {
    pub fn depth_ceiling(mut self, depth_ceiling: usize) -> Self {
        self.depth_ceiling = depth_ceiling;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)?.with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        let raw = std::env::var(DEPTH_CEILING_ENV).ok();
        self.with_depth_override(raw.as_deref())
    }

    fn with_depth_override(mut self, raw: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(raw) = raw {
            self.depth_ceiling = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidDepthOverride(raw.to_string()))?;
            tracing::debug!(
                depth_ceiling = self.depth_ceiling,
                "depth ceiling overridden from env"
            );
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.depth_ceiling == 0 {
            return Err(ConfigError::ZeroDepthCeiling);
        }

        let unit = 0.0..=1.0;
        let ratios_ok = unit.contains(&self.before_ratio)
            && unit.contains(&self.after_ratio)
            && unit.contains(&self.demote_split_ratio)
            && self.before_ratio < self.after_ratio;
        if !ratios_ok {
            return Err(ConfigError::InvalidRatios {
                before: self.before_ratio,
                after: self.after_ratio,
                split: self.demote_split_ratio,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = TreeConfig::from_json(r#"{ "depthCeiling": 3 }"#).unwrap();
        assert_eq!(config.depth_ceiling, 3);
        assert_eq!(config.before_ratio, 0.2);
        assert_eq!(config.after_ratio, 0.8);
        assert_eq!(TreeConfig::from_json("{}").unwrap(), TreeConfig::default());
    }

    #[test]
    fn rejects_inverted_ratios_and_zero_ceiling() {
        assert!(matches!(
            TreeConfig::from_json(r#"{ "beforeRatio": 0.9, "afterRatio": 0.1 }"#),
            Err(ConfigError::InvalidRatios { .. })
        ));
        assert!(matches!(
            TreeConfig::from_json(r#"{ "depthCeiling": 0 }"#),
            Err(ConfigError::ZeroDepthCeiling)
        ));
        assert!(matches!(
            TreeConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn depth_override_is_parsed_and_validated() {
        let config = TreeConfig::default().with_depth_override(Some(" 7 ")).unwrap();
        assert_eq!(config.depth_ceiling, 7);

        let unchanged = TreeConfig::default().with_depth_override(None).unwrap();
        assert_eq!(unchanged.depth_ceiling, DEFAULT_DEPTH_CEILING);

        assert!(matches!(
            TreeConfig::default().with_depth_override(Some("deep")),
            Err(ConfigError::InvalidDepthOverride(_))
        ));
        assert!(matches!(
            TreeConfig::default().with_depth_override(Some("0")),
            Err(ConfigError::ZeroDepthCeiling)
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = TreeConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
