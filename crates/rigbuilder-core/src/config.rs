//! Configuration document: part metadata and mesh assignments
//!
//! `ConfigData` is the persisted JSON document
//! `{ "meshMap": { part: [mesh, ...] }, "partDetails": { part: {...} } }`.
//! Parsing validates the whole document before a value is produced, so a
//! `ConfigData` in hand always satisfies:
//! - every key is canonical (see [`PartKey`]) and unique after normalization
//! - every `meshMap` key has a `partDetails` entry
//! - every price is finite and non-negative
//! - every mesh is assigned to at most one part

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::part::{Cents, KeyError, MeshId, PartDetail, PartIcon, PartKey};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Missing required field `{0}`")]
    MissingField(&'static str),
    #[error("Invalid part key: {0}")]
    InvalidKey(#[from] KeyError),
    #[error("Part `{key}` appears more than once in `{field}` (after normalizing case)")]
    DuplicateKey { field: &'static str, key: PartKey },
    #[error("Mesh list for part `{part}` must be an array of strings")]
    InvalidMeshList { part: PartKey },
    #[error("Part `{part}` has meshes in `meshMap` but no entry in `partDetails`")]
    UnknownPart { part: PartKey },
    #[error("Invalid details for part `{part}`: {reason}")]
    InvalidPartDetail { part: PartKey, reason: String },
    #[error("Part `{part}` has an invalid price {price}")]
    InvalidPrice { part: PartKey, price: f64 },
    #[error("Mesh `{mesh}` is assigned to both `{first}` and `{second}`")]
    SharedMesh {
        mesh: MeshId,
        first: PartKey,
        second: PartKey,
    },
}

/// Validated configuration document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawConfigData")]
pub struct ConfigData {
    pub mesh_map: BTreeMap<PartKey, BTreeSet<MeshId>>,
    pub part_details: BTreeMap<PartKey, PartDetail>,
}

/// Unvalidated shape of the document, straight from JSON
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfigData {
    mesh_map: Option<Map<String, Value>>,
    part_details: Option<Map<String, Value>>,
}

impl TryFrom<RawConfigData> for ConfigData {
    type Error = ConfigError;

    fn try_from(raw: RawConfigData) -> Result<Self, Self::Error> {
        let raw_mesh_map = raw.mesh_map.ok_or(ConfigError::MissingField("meshMap"))?;
        let raw_details = raw
            .part_details
            .ok_or(ConfigError::MissingField("partDetails"))?;

        let mut part_details = BTreeMap::new();
        for (raw_key, value) in raw_details {
            let key = PartKey::parse(&raw_key)?;
            if part_details.contains_key(&key) {
                return Err(ConfigError::DuplicateKey {
                    field: "partDetails",
                    key,
                });
            }
            let detail: PartDetail =
                serde_json::from_value(value).map_err(|e| ConfigError::InvalidPartDetail {
                    part: key.clone(),
                    reason: e.to_string(),
                })?;
            if !detail.has_valid_price() {
                return Err(ConfigError::InvalidPrice {
                    part: key,
                    price: detail.price,
                });
            }
            part_details.insert(key, detail);
        }

        let mut mesh_map = BTreeMap::new();
        let mut owners: BTreeMap<MeshId, PartKey> = BTreeMap::new();
        for (raw_key, value) in raw_mesh_map {
            let key = PartKey::parse(&raw_key)?;
            if mesh_map.contains_key(&key) {
                return Err(ConfigError::DuplicateKey {
                    field: "meshMap",
                    key,
                });
            }
            if !part_details.contains_key(&key) {
                return Err(ConfigError::UnknownPart { part: key });
            }
            let Value::Array(items) = value else {
                return Err(ConfigError::InvalidMeshList { part: key });
            };

            let mut meshes = BTreeSet::new();
            for item in items {
                let Value::String(name) = item else {
                    return Err(ConfigError::InvalidMeshList { part: key });
                };
                let mesh = MeshId::from(name);
                if let Some(first) = owners.get(&mesh) {
                    if *first != key {
                        return Err(ConfigError::SharedMesh {
                            mesh,
                            first: first.clone(),
                            second: key,
                        });
                    }
                }
                owners.insert(mesh.clone(), key.clone());
                meshes.insert(mesh);
            }
            mesh_map.insert(key, meshes);
        }

        Ok(Self {
            mesh_map,
            part_details,
        })
    }
}

impl ConfigData {
    /// Parse and validate a JSON document
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfigData = serde_json::from_str(content)?;
        Self::try_from(raw)
    }

    /// Serialize to pretty-printed JSON (the format the admin editor shows)
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Built-in catalog used when storage holds no document yet
    pub fn builtin() -> Self {
        let parts = [
            (
                "monitor",
                PartDetail::new("27\" Gaming Monitor", 299.99, "1440p 165Hz Display")
                    .with_icon(PartIcon::Monitor),
            ),
            (
                "pc",
                PartDetail::new("Gaming Tower", 1499.99, "RTX 4070, i7, 32GB RAM")
                    .with_icon(PartIcon::Computer),
            ),
            (
                "keyboard",
                PartDetail::new("Mechanical Keyboard", 149.99, "RGB Mechanical Switches")
                    .with_icon(PartIcon::Keyboard),
            ),
            (
                "mouse",
                PartDetail::new("Gaming Mouse", 79.99, "16000 DPI Optical Sensor")
                    .with_icon(PartIcon::Mouse),
            ),
            (
                "speakers",
                PartDetail::new("2.1 Speaker System", 199.99, "THX Certified Audio")
                    .with_icon(PartIcon::Speaker),
            ),
            (
                "nonconfigurable",
                PartDetail::new("Non-Configurable Items", 0.0, "Items that are always visible")
                    .fixed(),
            ),
        ];

        let mut config = Self::default();
        for (key, detail) in parts {
            let key = PartKey::from_canonical(key);
            config.mesh_map.insert(key.clone(), BTreeSet::new());
            config.part_details.insert(key, detail);
        }
        config
    }

    pub fn detail(&self, key: &str) -> Option<&PartDetail> {
        self.part_details.get(key)
    }

    /// Meshes assigned to a part (empty if the part has no entry)
    pub fn meshes_of(&self, key: &str) -> impl Iterator<Item = &MeshId> {
        self.mesh_map.get(key).into_iter().flatten()
    }

    /// Part that currently owns a mesh, if any
    pub fn owner_of(&self, mesh: &str) -> Option<&PartKey> {
        self.mesh_map
            .iter()
            .find(|(_, meshes)| meshes.contains(mesh))
            .map(|(key, _)| key)
    }

    /// Keys of parts the shopper may toggle, in key order
    pub fn configurable_parts(&self) -> impl Iterator<Item = (&PartKey, &PartDetail)> {
        self.part_details
            .iter()
            .filter(|(_, detail)| detail.is_configurable)
    }

    /// Keys of parts that are always shown
    pub fn fixed_parts(&self) -> impl Iterator<Item = &PartKey> {
        self.part_details
            .iter()
            .filter(|(_, detail)| !detail.is_configurable)
            .map(|(key, _)| key)
    }

    pub fn is_configurable(&self, key: &str) -> bool {
        self.detail(key).is_some_and(|d| d.is_configurable)
    }

    /// Every mesh referenced by any part
    pub fn assigned_meshes(&self) -> BTreeSet<&MeshId> {
        self.mesh_map.values().flatten().collect()
    }

    /// Sum of the prices of the given parts; unknown keys contribute nothing
    pub fn total_for<'a>(&self, keys: impl IntoIterator<Item = &'a PartKey>) -> Cents {
        keys.into_iter()
            .filter_map(|key| self.part_details.get(key))
            .map(PartDetail::cents)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> PartKey {
        PartKey::parse(s).unwrap()
    }

    const SAMPLE: &str = r#"{
        "meshMap": {
            "Monitor": ["m1", "m2"],
            "keyboard": ["k1"]
        },
        "partDetails": {
            "Monitor": {
                "name": "27\" Gaming Monitor",
                "price": 299.99,
                "description": "QHD",
                "isConfigurable": true,
                "icon": "monitor"
            },
            "keyboard": {
                "name": "Mechanical Keyboard",
                "price": 149.99,
                "description": "RGB",
                "isConfigurable": false
            }
        }
    }"#;

    #[test]
    fn test_parse_normalizes_keys() {
        let config = ConfigData::from_json(SAMPLE).unwrap();
        assert!(config.mesh_map.contains_key("monitor"));
        assert!(config.part_details.contains_key("monitor"));
        assert_eq!(config.meshes_of("monitor").count(), 2);
        assert_eq!(config.owner_of("k1"), Some(&key("keyboard")));
        assert!(config.is_configurable("monitor"));
        assert!(!config.is_configurable("keyboard"));
        assert!(!config.is_configurable("speakers"));
    }

    #[test]
    fn test_round_trip() {
        let config = ConfigData::from_json(SAMPLE).unwrap();
        let json = config.to_json_pretty().unwrap();
        let reparsed = ConfigData::from_json(&json).unwrap();
        assert_eq!(config, reparsed);

        let builtin = ConfigData::builtin();
        let reparsed = ConfigData::from_json(&builtin.to_json_pretty().unwrap()).unwrap();
        assert_eq!(builtin, reparsed);
    }

    #[test]
    fn test_serializes_camel_case() {
        let config = ConfigData::from_json(SAMPLE).unwrap();
        let value: Value = serde_json::to_value(&config).unwrap();
        assert!(value.get("meshMap").is_some());
        assert_eq!(
            value["partDetails"]["keyboard"]["isConfigurable"],
            Value::Bool(false)
        );
        assert!(value["partDetails"]["keyboard"].get("icon").is_none());
    }

    #[test]
    fn test_missing_sections_rejected() {
        let err = ConfigData::from_json(r#"{"partDetails": {}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("meshMap")));

        let err = ConfigData::from_json(r#"{"meshMap": {}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("partDetails")));

        let err = ConfigData::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_orphan_mesh_map_key_rejected() {
        let json = r#"{
            "meshMap": {"monitor": ["m1"], "mouse": ["x"]},
            "partDetails": {"monitor": {"name": "M", "price": 1.0}}
        }"#;
        let err = ConfigData::from_json(json).unwrap_err();
        match err {
            ConfigError::UnknownPart { part } => assert_eq!(part.as_str(), "mouse"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_array_mesh_list_rejected() {
        let json = r#"{
            "meshMap": {"monitor": "m1"},
            "partDetails": {"monitor": {"name": "M", "price": 1.0}}
        }"#;
        let err = ConfigData::from_json(json).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMeshList { ref part } if part.as_str() == "monitor"));

        let json = r#"{
            "meshMap": {"monitor": ["m1", 7]},
            "partDetails": {"monitor": {"name": "M", "price": 1.0}}
        }"#;
        assert!(matches!(
            ConfigData::from_json(json),
            Err(ConfigError::InvalidMeshList { .. })
        ));
    }

    #[test]
    fn test_duplicate_after_normalization_rejected() {
        let json = r#"{
            "meshMap": {},
            "partDetails": {
                "Monitor": {"name": "A", "price": 1.0},
                "monitor": {"name": "B", "price": 2.0}
            }
        }"#;
        let err = ConfigData::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DuplicateKey { field: "partDetails", .. }
        ));
    }

    #[test]
    fn test_shared_mesh_rejected() {
        let json = r#"{
            "meshMap": {"monitor": ["m1"], "keyboard": ["m1"]},
            "partDetails": {
                "monitor": {"name": "M", "price": 1.0},
                "keyboard": {"name": "K", "price": 1.0}
            }
        }"#;
        let err = ConfigData::from_json(json).unwrap_err();
        match err {
            ConfigError::SharedMesh { mesh, first, second } => {
                assert_eq!(mesh.as_str(), "m1");
                let mut owners = [first.as_str(), second.as_str()];
                owners.sort();
                assert_eq!(owners, ["keyboard", "monitor"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_price_and_detail_rejected() {
        let json = r#"{
            "meshMap": {},
            "partDetails": {"monitor": {"name": "M", "price": -5}}
        }"#;
        assert!(matches!(
            ConfigData::from_json(json),
            Err(ConfigError::InvalidPrice { .. })
        ));

        let json = r#"{
            "meshMap": {},
            "partDetails": {"monitor": {"price": 5}}
        }"#;
        let err = ConfigData::from_json(json).unwrap_err();
        assert!(err.to_string().contains("monitor"));
    }

    #[test]
    fn test_detail_without_meshes_is_allowed() {
        let json = r#"{
            "meshMap": {},
            "partDetails": {"monitor": {"name": "M", "price": 1.0}}
        }"#;
        let config = ConfigData::from_json(json).unwrap();
        assert_eq!(config.meshes_of("monitor").count(), 0);
    }

    #[test]
    fn test_builtin_catalog() {
        let config = ConfigData::builtin();
        assert_eq!(config.configurable_parts().count(), 5);
        assert_eq!(
            config.fixed_parts().collect::<Vec<_>>(),
            vec![&key("nonconfigurable")]
        );
        assert!(config.assigned_meshes().is_empty());
    }

    #[test]
    fn test_total_for() {
        let config = ConfigData::from_json(SAMPLE).unwrap();
        let keys = [key("monitor"), key("keyboard"), key("unknown")];
        assert_eq!(config.total_for(&keys).to_string(), "449.98");
    }
}
