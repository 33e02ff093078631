//! `getFeatureFlags()` with `enable(key, source)`, `disable(key, source)`,
//! `getFlagsByCategory`.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureFlag {
    pub key: String,
    pub category: FeatureFlagCategory,
    pub enabled: bool,
    pub last_changed_by: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureFlagCategory {
    Dashboard,
    Workers,
    Spline,
    Betting,
}

pub trait FeatureFlagRegistry: Send + Sync {
    fn get_feature_flags(&self) -> Vec<FeatureFlag>;
    fn enable(&self, key: &str, source: &str) -> Result<FeatureFlag>;
    fn disable(&self, key: &str, source: &str) -> Result<FeatureFlag>;
    fn get_flags_by_category(&self, category: FeatureFlagCategory) -> Vec<FeatureFlag>;
}

pub struct DefaultFeatureFlagRegistry {
    flags: Arc<DashMap<String, FeatureFlag>>,
}

impl DefaultFeatureFlagRegistry {
    #[must_use]
    pub fn new() -> Self {
        let flags = DashMap::new();
        for (key, category) in [
            ("dashboard.dark-mode", FeatureFlagCategory::Dashboard),
            ("workers.auto-scale", FeatureFlagCategory::Workers),
            ("spline.live-stream", FeatureFlagCategory::Spline),
            ("betting.glossary-suggestions", FeatureFlagCategory::Betting),
        ] {
            flags.insert(
                key.to_string(),
                FeatureFlag {
                    key: key.to_string(),
                    category,
                    enabled: true,
                    last_changed_by: None,
                },
            );
        }
        Self { flags: Arc::new(flags) }
    }

    fn set_enabled(&self, key: &str, source: &str, enabled: bool) -> Result<FeatureFlag> {
        let mut flag = self
            .flags
            .get_mut(key)
            .ok_or_else(|| Error::not_found(format!("feature flag `{key}` is not registered")))?;
        flag.enabled = enabled;
        flag.last_changed_by = Some(source.to_string());
        Ok(flag.clone())
    }
}

impl Default for DefaultFeatureFlagRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureFlagRegistry for DefaultFeatureFlagRegistry {
    fn get_feature_flags(&self) -> Vec<FeatureFlag> {
        let mut flags: Vec<FeatureFlag> = self.flags.iter().map(|f| f.value().clone()).collect();
        flags.sort_by(|a, b| a.key.cmp(&b.key));
        flags
    }

    fn enable(&self, key: &str, source: &str) -> Result<FeatureFlag> {
        self.set_enabled(key, source, true)
    }

    fn disable(&self, key: &str, source: &str) -> Result<FeatureFlag> {
        self.set_enabled(key, source, false)
    }

    fn get_flags_by_category(&self, category: FeatureFlagCategory) -> Vec<FeatureFlag> {
        self.flags
            .iter()
            .filter(|f| f.category == category)
            .map(|f| f.value().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_default_flags() {
        let registry = DefaultFeatureFlagRegistry::new();
        assert_eq!(registry.get_feature_flags().len(), 4);
    }

    #[test]
    fn disable_then_enable_records_source() {
        let registry = DefaultFeatureFlagRegistry::new();
        registry.disable("spline.live-stream", "ops-console").unwrap();
        let flag = registry.enable("spline.live-stream", "ops-console").unwrap();
        assert!(flag.enabled);
        assert_eq!(flag.last_changed_by.as_deref(), Some("ops-console"));
    }

    #[test]
    fn unknown_flag_is_not_found() {
        let registry = DefaultFeatureFlagRegistry::new();
        assert!(registry.enable("does.not.exist", "x").is_err());
    }

    #[test]
    fn filters_by_category() {
        let registry = DefaultFeatureFlagRegistry::new();
        let workers_flags = registry.get_flags_by_category(FeatureFlagCategory::Workers);
        assert_eq!(workers_flags.len(), 1);
        assert_eq!(workers_flags[0].key, "workers.auto-scale");
    }
}
