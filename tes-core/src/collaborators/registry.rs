//! Bookmaker registry: `getRegistry()`, `getById`, `updateFlag`,
//! `updateRollout`.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookmakerEntry {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub rollout_percent: u8,
}

pub trait Registry: Send + Sync {
    fn get_registry(&self) -> Vec<BookmakerEntry>;
    fn get_by_id(&self, id: &str) -> Option<BookmakerEntry>;
    fn update_flag(&self, id: &str, enabled: bool) -> Result<BookmakerEntry>;
    fn update_rollout(&self, id: &str, percent: u8) -> Result<BookmakerEntry>;
}

pub struct DefaultRegistry {
    entries: Arc<DashMap<String, BookmakerEntry>>,
}

impl DefaultRegistry {
    #[must_use]
    pub fn new() -> Self {
        let entries = DashMap::new();
        for (id, name) in [
            ("draftkings", "DraftKings"),
            ("fanduel", "FanDuel"),
            ("betmgm", "BetMGM"),
            ("caesars", "Caesars"),
        ] {
            entries.insert(
                id.to_string(),
                BookmakerEntry {
                    id: id.to_string(),
                    name: name.to_string(),
                    enabled: true,
                    rollout_percent: 100,
                },
            );
        }
        Self {
            entries: Arc::new(entries),
        }
    }
}

impl Default for DefaultRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry for DefaultRegistry {
    fn get_registry(&self) -> Vec<BookmakerEntry> {
        let mut entries: Vec<BookmakerEntry> = self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries
    }

    fn get_by_id(&self, id: &str) -> Option<BookmakerEntry> {
        self.entries.get(id).map(|e| e.value().clone())
    }

    fn update_flag(&self, id: &str, enabled: bool) -> Result<BookmakerEntry> {
        let mut entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("bookmaker `{id}` is not registered")))?;
        entry.enabled = enabled;
        Ok(entry.clone())
    }

    fn update_rollout(&self, id: &str, percent: u8) -> Result<BookmakerEntry> {
        if percent > 100 {
            return Err(Error::validation("rollout_percent", percent.to_string(), "0..=100"));
        }
        let mut entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("bookmaker `{id}` is not registered")))?;
        entry.rollout_percent = percent;
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_seeds_known_bookmakers() {
        let registry = DefaultRegistry::new();
        let all = registry.get_registry();
        assert!(all.iter().any(|e| e.id == "draftkings"));
    }

    #[test]
    fn get_by_id_misses_unknown() {
        let registry = DefaultRegistry::new();
        assert!(registry.get_by_id("unknown-book").is_none());
    }

    #[test]
    fn update_flag_persists() {
        let registry = DefaultRegistry::new();
        registry.update_flag("fanduel", false).unwrap();
        assert!(!registry.get_by_id("fanduel").unwrap().enabled);
    }

    #[test]
    fn update_rollout_rejects_out_of_range() {
        let registry = DefaultRegistry::new();
        assert!(registry.update_rollout("fanduel", 150).is_err());
    }

    #[test]
    fn update_rollout_on_unknown_id_is_not_found() {
        let registry = DefaultRegistry::new();
        assert!(registry.update_rollout("ghost-book", 50).is_err());
    }
}
