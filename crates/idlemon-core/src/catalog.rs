// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Static game content.
//!
//! The catalog is parsed once at startup from JSON embedded in the binary and
//! then shared read-only (`Arc<Catalog>`) with every component that needs it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::progression::ResourceKind;
use crate::quest::DAILY_QUEST_SIGN_IN;
use crate::reward::Reward;

const RESOURCES_JSON: &str = include_str!("../content/resources.json");
const UNIT_TYPES_JSON: &str = include_str!("../content/unit_types.json");
const UNIT_TEMPLATES_JSON: &str = include_str!("../content/unit_templates.json");
const DAILY_QUESTS_JSON: &str = include_str!("../content/daily_quests.json");

/// Display metadata for a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    /// Resource kind this entry describes.
    pub id: ResourceKind,
    /// Display name.
    pub name: String,
    /// Display description.
    pub description: String,
}

/// Elemental type of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitType {
    /// Type ID.
    pub id: u32,
    /// Display name.
    pub name: String,
}

/// Base stats for a summonable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTemplate {
    /// Template ID.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// [`UnitType`] ID.
    pub unit_type: u32,
    /// Base hit points.
    pub hp: u32,
    /// Base attack.
    pub atk: u32,
    /// Base defense.
    pub def: u32,
    /// Base speed.
    pub speed: u32,
}

/// Definition of a daily quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyQuest {
    /// Quest ID.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Display description.
    pub description: String,
    /// Progress count needed before the quest can be completed.
    pub required: u32,
    /// Reward granted on completion.
    pub reward: Reward,
}

/// Immutable lookup tables for game content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    /// Resource metadata by kind.
    pub resources: BTreeMap<ResourceKind, ResourceDefinition>,
    /// Unit types by ID.
    pub unit_types: BTreeMap<u32, UnitType>,
    /// Unit templates by ID.
    pub unit_templates: BTreeMap<u32, UnitTemplate>,
    /// Daily quests by ID.
    pub daily_quests: BTreeMap<u32, DailyQuest>,
}

impl Catalog {
    /// Load the content shipped with this build.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json(
            RESOURCES_JSON,
            UNIT_TYPES_JSON,
            UNIT_TEMPLATES_JSON,
            DAILY_QUESTS_JSON,
        )
    }

    /// Parse and cross-check catalog content.
    ///
    /// Every resource kind must be described, IDs must be unique, every
    /// template must reference a known unit type, at least one template must
    /// exist, and the sign-in daily quest must be defined.
    pub fn from_json(
        resources: &str,
        unit_types: &str,
        unit_templates: &str,
        daily_quests: &str,
    ) -> Result<Self, CatalogError> {
        let resources: Vec<ResourceDefinition> = parse("resources.json", resources)?;
        let unit_types: Vec<UnitType> = parse("unit_types.json", unit_types)?;
        let unit_templates: Vec<UnitTemplate> = parse("unit_templates.json", unit_templates)?;
        let daily_quests: Vec<DailyQuest> = parse("daily_quests.json", daily_quests)?;

        let resources = index("resources.json", resources, |r| r.id)?;
        for kind in ResourceKind::ALL {
            if !resources.contains_key(&kind) {
                return Err(CatalogError::Invalid(format!(
                    "resources.json does not define '{}'",
                    kind
                )));
            }
        }

        let unit_types = index("unit_types.json", unit_types, |t| t.id)?;
        let unit_templates = index("unit_templates.json", unit_templates, |t| t.id)?;
        if unit_templates.is_empty() {
            return Err(CatalogError::Invalid(
                "unit_templates.json must define at least one template".to_string(),
            ));
        }
        if let Some(template) = unit_templates
            .values()
            .find(|t| !unit_types.contains_key(&t.unit_type))
        {
            return Err(CatalogError::Invalid(format!(
                "unit template {} references unknown unit type {}",
                template.id, template.unit_type
            )));
        }

        let daily_quests = index("daily_quests.json", daily_quests, |q| q.id)?;
        if !daily_quests.contains_key(&DAILY_QUEST_SIGN_IN) {
            return Err(CatalogError::Invalid(format!(
                "daily_quests.json does not define the sign-in quest ({})",
                DAILY_QUEST_SIGN_IN
            )));
        }

        Ok(Self {
            resources,
            unit_types,
            unit_templates,
            daily_quests,
        })
    }

    /// Look up a daily quest.
    pub fn daily_quest(&self, id: u32) -> Option<&DailyQuest> {
        self.daily_quests.get(&id)
    }

    /// Look up a unit template.
    pub fn unit_template(&self, id: u32) -> Option<&UnitTemplate> {
        self.unit_templates.get(&id)
    }
}

fn parse<T: serde::de::DeserializeOwned>(
    file: &'static str,
    json: &str,
) -> Result<Vec<T>, CatalogError> {
    serde_json::from_str(json).map_err(|source| CatalogError::Parse { file, source })
}

fn index<K: Ord + Copy + std::fmt::Debug, T>(
    file: &'static str,
    entries: Vec<T>,
    key: impl Fn(&T) -> K,
) -> Result<BTreeMap<K, T>, CatalogError> {
    let mut map = BTreeMap::new();
    for entry in entries {
        let k = key(&entry);
        if map.insert(k, entry).is_some() {
            return Err(CatalogError::Invalid(format!(
                "{} contains duplicate id {:?}",
                file, k
            )));
        }
    }
    Ok(map)
}

/// Catalog loading errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// A content file is not valid JSON for its schema.
    #[error("failed to parse {file}: {source}")]
    Parse {
        /// The content file.
        file: &'static str,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// Content parsed but is inconsistent.
    #[error("invalid catalog: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_catalog_loads() {
        let catalog = Catalog::embedded().unwrap();

        assert_eq!(catalog.resources.len(), ResourceKind::ALL.len());
        assert_eq!(catalog.unit_types.len(), 6);
        assert!(!catalog.unit_templates.is_empty());

        let sign_in = catalog.daily_quest(DAILY_QUEST_SIGN_IN).unwrap();
        assert_eq!(sign_in.required, 1);
        assert!(matches!(
            sign_in.reward,
            Reward::Currency {
                resource: ResourceKind::Gems,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_resource_is_rejected() {
        let resources = r#"[{"id":"gold","name":"Gold","description":""}]"#;
        let err = Catalog::from_json(
            resources,
            UNIT_TYPES_JSON,
            UNIT_TEMPLATES_JSON,
            DAILY_QUESTS_JSON,
        )
        .unwrap_err();

        assert!(matches!(err, CatalogError::Invalid(_)));
        assert!(err.to_string().contains("gems"));
    }

    #[test]
    fn test_template_with_unknown_type_is_rejected() {
        let templates =
            r#"[{"id":0,"name":"Ghost","unit_type":42,"hp":1,"atk":1,"def":1,"speed":1}]"#;
        let err = Catalog::from_json(RESOURCES_JSON, UNIT_TYPES_JSON, templates, DAILY_QUESTS_JSON)
            .unwrap_err();

        assert!(err.to_string().contains("unknown unit type 42"));
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let types = r#"[{"id":0,"name":"Forest"},{"id":0,"name":"Abyss"}]"#;
        let err = Catalog::from_json(RESOURCES_JSON, types, UNIT_TEMPLATES_JSON, DAILY_QUESTS_JSON)
            .unwrap_err();

        assert!(err.to_string().contains("duplicate id"));
    }

    #[test]
    fn test_sign_in_quest_is_required() {
        let quests = r#"[{"id":7,"name":"Other","description":"","required":1,"reward":{"kind":"currency","resource":"gold","amount":1}}]"#;
        let err = Catalog::from_json(RESOURCES_JSON, UNIT_TYPES_JSON, UNIT_TEMPLATES_JSON, quests)
            .unwrap_err();

        assert!(err.to_string().contains("sign-in quest"));
    }

    #[test]
    fn test_malformed_json_names_the_file() {
        let err = Catalog::from_json(RESOURCES_JSON, "{", UNIT_TEMPLATES_JSON, DAILY_QUESTS_JSON)
            .unwrap_err();

        assert!(matches!(
            err,
            CatalogError::Parse {
                file: "unit_types.json",
                ..
            }
        ));
    }
}
