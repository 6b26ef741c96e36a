//! Part catalog editing
//!
//! Each operation works on a copy and hands back the edited configuration, so
//! a refused edit never leaves the caller's configuration half changed.

use std::collections::BTreeSet;
use thiserror::Error;

use crate::config::ConfigData;
use crate::part::{KeyError, PartDetail, PartKey};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PartError {
    #[error("Unknown part `{0}`")]
    UnknownPart(PartKey),
    #[error("Part `{0}` already exists")]
    PartExists(PartKey),
    #[error("Invalid part key: {0}")]
    InvalidKey(#[from] KeyError),
    #[error("Part `{part}` has an invalid price {price}")]
    InvalidPrice { part: PartKey, price: f64 },
    #[error("Part `{0}` needs a display name")]
    MissingName(PartKey),
}

fn check_detail(key: &PartKey, detail: &PartDetail) -> Result<(), PartError> {
    if detail.name.trim().is_empty() {
        return Err(PartError::MissingName(key.clone()));
    }
    if !detail.has_valid_price() {
        return Err(PartError::InvalidPrice {
            part: key.clone(),
            price: detail.price,
        });
    }
    Ok(())
}

impl ConfigData {
    /// Add a part with no meshes
    pub fn add_part(&self, key: &str, detail: PartDetail) -> Result<ConfigData, PartError> {
        let key = PartKey::parse(key)?;
        if self.part_details.contains_key(&key) {
            return Err(PartError::PartExists(key));
        }
        check_detail(&key, &detail)?;

        let mut next = self.clone();
        next.mesh_map.insert(key.clone(), BTreeSet::new());
        next.part_details.insert(key.clone(), detail);
        tracing::info!("Added part {}", key);
        Ok(next)
    }

    /// Replace the details of an existing part; its meshes are kept
    pub fn update_part(&self, key: &str, detail: PartDetail) -> Result<ConfigData, PartError> {
        let key = PartKey::parse(key)?;
        if !self.part_details.contains_key(&key) {
            return Err(PartError::UnknownPart(key));
        }
        check_detail(&key, &detail)?;

        let mut next = self.clone();
        next.part_details.insert(key.clone(), detail);
        tracing::debug!("Updated part {}", key);
        Ok(next)
    }

    /// Move a part and its meshes to a new key
    pub fn rename_part(&self, old: &str, new: &str) -> Result<ConfigData, PartError> {
        let old = PartKey::parse(old)?;
        let new = PartKey::parse(new)?;
        if !self.part_details.contains_key(&old) {
            return Err(PartError::UnknownPart(old));
        }
        if old == new {
            return Ok(self.clone());
        }
        if self.part_details.contains_key(&new) {
            return Err(PartError::PartExists(new));
        }

        let mut next = self.clone();
        if let Some(detail) = next.part_details.remove(&old) {
            next.part_details.insert(new.clone(), detail);
        }
        let meshes = next.mesh_map.remove(&old).unwrap_or_default();
        next.mesh_map.insert(new.clone(), meshes);
        tracing::info!("Renamed part {} to {}", old, new);
        Ok(next)
    }

    /// Delete a part; its meshes become unassigned
    pub fn remove_part(&self, key: &str) -> Result<ConfigData, PartError> {
        let key = PartKey::parse(key)?;
        if !self.part_details.contains_key(&key) {
            return Err(PartError::UnknownPart(key));
        }

        let mut next = self.clone();
        next.part_details.remove(&key);
        let released = next.mesh_map.remove(&key).map_or(0, |m| m.len());
        tracing::info!("Removed part {} ({} meshes released)", key, released);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::MeshId;

    fn sample_config() -> ConfigData {
        ConfigData::from_json(
            r#"{
                "meshMap": {"monitor": ["m1", "m2"], "mouse": ["u1"]},
                "partDetails": {
                    "monitor": {"name": "Monitor", "price": 299.99},
                    "mouse": {"name": "Mouse", "price": 79.99}
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_add_part_normalizes_and_creates_empty_mesh_list() {
        let config = sample_config();
        let next = config
            .add_part(" Chair ", PartDetail::new("Gaming Chair", 249.0, "Lumbar"))
            .unwrap();
        assert_eq!(next.detail("chair").unwrap().name, "Gaming Chair");
        assert_eq!(next.meshes_of("chair").count(), 0);
        assert!(next.mesh_map.contains_key("chair"));
        // original untouched
        assert!(config.detail("chair").is_none());
    }

    #[test]
    fn test_add_part_rejects_bad_input() {
        let config = sample_config();
        assert!(matches!(
            config.add_part("MONITOR", PartDetail::new("Dup", 1.0, "")),
            Err(PartError::PartExists(_))
        ));
        assert!(matches!(
            config.add_part("  ", PartDetail::new("Blank", 1.0, "")),
            Err(PartError::InvalidKey(_))
        ));
        assert!(matches!(
            config.add_part("desk", PartDetail::new("Desk", -3.0, "")),
            Err(PartError::InvalidPrice { .. })
        ));
        assert!(matches!(
            config.add_part("desk", PartDetail::new(" ", 3.0, "")),
            Err(PartError::MissingName(_))
        ));
    }

    #[test]
    fn test_update_part_keeps_meshes() {
        let config = sample_config();
        let next = config
            .update_part("monitor", PartDetail::new("Monitor", 349.0, "OLED").fixed())
            .unwrap();
        assert_eq!(next.meshes_of("monitor").count(), 2);
        assert!(!next.is_configurable("monitor"));
        assert!(config.update_part("desk", PartDetail::new("Desk", 1.0, "")).is_err());
    }

    #[test]
    fn test_rename_part_moves_both_entries() {
        let config = sample_config();
        let next = config.rename_part("monitor", "Display").unwrap();
        assert!(next.detail("monitor").is_none());
        assert!(!next.mesh_map.contains_key("monitor"));
        assert_eq!(next.owner_of("m1").map(|k| k.as_str()), Some("display"));

        assert!(matches!(
            config.rename_part("monitor", "mouse"),
            Err(PartError::PartExists(_))
        ));
        assert!(matches!(
            config.rename_part("desk", "table"),
            Err(PartError::UnknownPart(_))
        ));
        assert_eq!(config.rename_part("monitor", "Monitor").unwrap(), config);
    }

    #[test]
    fn test_remove_part_releases_meshes() {
        let config = sample_config();
        let next = config.remove_part("monitor").unwrap();
        assert!(next.detail("monitor").is_none());
        assert_eq!(next.owner_of("m1"), None);
        assert!(!next.assigned_meshes().contains(&MeshId::from("m2")));

        let json = next.to_json_pretty().unwrap();
        assert_eq!(ConfigData::from_json(&json).unwrap(), next);
    }
}
