//! Entity version registry backing `GET /api/dev/versions` and
//! `POST /api/dev/bump-version`.
//!
//! Distinct from [`crate::versioning`]'s URL-path API versioning: this is a
//! registry of independently-versioned *entities* (crates, UI components,
//! config schemas) whose current version is read from a file at startup and
//! bumped in-process on request.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Crate,
    Component,
    Schema,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStrategy {
    /// Bumps alongside its parent whenever the parent bumps.
    Linked,
    /// Only bumps when targeted directly.
    Independent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionedEntity {
    pub id: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub current_version: String,
    pub update_strategy: UpdateStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_version_id: Option<String>,
    pub files: Vec<String>,
    pub display_in_ui: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BumpKind {
    Major,
    Minor,
    Patch,
}

#[derive(Debug, Clone, Serialize)]
pub struct BumpOutcome {
    pub entity_id: String,
    pub old_version: String,
    pub new_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BumpResult {
    pub affected: Vec<BumpOutcome>,
}

/// In-memory registry of versioned entities, seeded once at startup and
/// mutated in place by `bump_version`. A `RwLock` serializes writes the same
/// way the cache modules serialize per-key writes.
pub struct EntityVersionRegistry {
    entities: RwLock<Vec<VersionedEntity>>,
}

impl EntityVersionRegistry {
    #[must_use]
    pub fn new(entities: Vec<VersionedEntity>) -> Self {
        Self {
            entities: RwLock::new(entities),
        }
    }

    /// Seeds the registry with this service's own API version, the single
    /// entity any deployment of this binary actually needs to version.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(vec![VersionedEntity {
            id: "global:api-version".to_string(),
            display_name: "API".to_string(),
            entity_type: EntityType::Crate,
            current_version: env!("CARGO_PKG_VERSION").to_string(),
            update_strategy: UpdateStrategy::Independent,
            parent_version_id: None,
            files: vec!["Cargo.toml".to_string()],
            display_in_ui: true,
        }])
    }

    #[must_use]
    pub fn all(&self) -> Vec<VersionedEntity> {
        self.entities.read().expect("entity version registry lock poisoned").clone()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<VersionedEntity> {
        self.entities
            .read()
            .expect("entity version registry lock poisoned")
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    /// Bumps one entity if `entity` is given, else every `Independent` plus
    /// any `Linked` entity whose parent is among those bumped.
    pub fn bump(&self, kind: BumpKind, entity: Option<&str>) -> Result<BumpResult> {
        let mut entities = self.entities.write().expect("entity version registry lock poisoned");

        let targets: Vec<String> = match entity {
            Some(id) => {
                if !entities.iter().any(|e| e.id == id) {
                    return Err(Error::not_found(format!("entity `{id}` is not registered")));
                }
                vec![id.to_string()]
            }
            None => {
                let mut ids: Vec<String> = entities
                    .iter()
                    .filter(|e| e.update_strategy == UpdateStrategy::Independent)
                    .map(|e| e.id.clone())
                    .collect();
                let linked: Vec<String> = entities
                    .iter()
                    .filter(|e| {
                        e.update_strategy == UpdateStrategy::Linked
                            && e.parent_version_id
                                .as_ref()
                                .is_some_and(|parent| ids.contains(parent))
                    })
                    .map(|e| e.id.clone())
                    .collect();
                ids.extend(linked);
                ids
            }
        };

        let mut affected = Vec::new();
        for entity in entities.iter_mut() {
            if !targets.contains(&entity.id) {
                continue;
            }
            let old_version = entity.current_version.clone();
            let new_version = bump_semver(&old_version, kind);
            entity.current_version = new_version.clone();
            affected.push(BumpOutcome {
                entity_id: entity.id.clone(),
                old_version,
                new_version,
            });
        }

        Ok(BumpResult { affected })
    }
}

fn bump_semver(version: &str, kind: BumpKind) -> String {
    let mut parts: Vec<u64> = version.split('.').filter_map(|p| p.parse().ok()).collect();
    while parts.len() < 3 {
        parts.push(0);
    }
    match kind {
        BumpKind::Major => {
            parts[0] += 1;
            parts[1] = 0;
            parts[2] = 0;
        }
        BumpKind::Minor => {
            parts[1] += 1;
            parts[2] = 0;
        }
        BumpKind::Patch => {
            parts[2] += 1;
        }
    }
    format!("{}.{}.{}", parts[0], parts[1], parts[2])
}

/// Extracts a `version = "X.Y.Z"`-style assignment from file content. Used
/// at startup to resolve `currentVersion` for entities backed by a real
/// manifest file instead of a hardcoded default.
#[must_use]
pub fn extract_version_from_content(content: &str) -> Option<String> {
    for line in content.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("version") {
            let rest = rest.trim_start();
            if let Some(rest) = rest.strip_prefix('=') {
                let rest = rest.trim();
                let quoted = rest.strip_prefix('"').and_then(|s| s.split_once('"')).map(|(v, _)| v);
                if let Some(version) = quoted {
                    return Some(version.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_version_from_cargo_toml_style_content() {
        let content = "[package]\nname = \"tes-core\"\nversion = \"1.2.3\"\n";
        assert_eq!(extract_version_from_content(content), Some("1.2.3".to_string()));
    }

    #[test]
    fn missing_version_line_returns_none() {
        assert_eq!(extract_version_from_content("[package]\nname = \"x\"\n"), None);
    }

    #[test]
    fn patch_bump_increments_last_component() {
        assert_eq!(bump_semver("1.2.3", BumpKind::Patch), "1.2.4");
    }

    #[test]
    fn major_bump_resets_minor_and_patch() {
        assert_eq!(bump_semver("1.2.3", BumpKind::Major), "2.0.0");
    }

    #[test]
    fn targeted_bump_affects_only_named_entity() {
        let registry = EntityVersionRegistry::with_defaults();
        let result = registry.bump(BumpKind::Patch, Some("global:api-version")).unwrap();
        assert_eq!(result.affected.len(), 1);
    }

    #[test]
    fn bump_on_unknown_entity_is_not_found() {
        let registry = EntityVersionRegistry::with_defaults();
        assert!(registry.bump(BumpKind::Patch, Some("ghost")).is_err());
    }

    #[test]
    fn global_bump_affects_independent_and_linked_entities() {
        let registry = EntityVersionRegistry::new(vec![
            VersionedEntity {
                id: "parent".to_string(),
                display_name: "Parent".to_string(),
                entity_type: EntityType::Crate,
                current_version: "1.0.0".to_string(),
                update_strategy: UpdateStrategy::Independent,
                parent_version_id: None,
                files: vec![],
                display_in_ui: true,
            },
            VersionedEntity {
                id: "child".to_string(),
                display_name: "Child".to_string(),
                entity_type: EntityType::Component,
                current_version: "1.0.0".to_string(),
                update_strategy: UpdateStrategy::Linked,
                parent_version_id: Some("parent".to_string()),
                files: vec![],
                display_in_ui: true,
            },
        ]);
        let result = registry.bump(BumpKind::Minor, None).unwrap();
        assert_eq!(result.affected.len(), 2);
    }
}
