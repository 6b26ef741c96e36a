//! Shopper selection state

use std::collections::BTreeSet;
use thiserror::Error;

use crate::config::ConfigData;
use crate::part::{Cents, MeshId, PartDetail, PartKey};
use crate::resolver;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("`{0}` is not a configurable part")]
    NotConfigurable(PartKey),
}

/// Which configurable parts the shopper wants included.
///
/// Each configurable part is either selected or not; a toggle flips exactly
/// one part. `known` remembers the configurable parts seen at the last sync,
/// so a reload can tell newly-added parts (selected by default) from parts the
/// shopper switched off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: BTreeSet<PartKey>,
    known: BTreeSet<PartKey>,
}

impl SelectionState {
    /// Initial state: every configurable part selected
    pub fn all_configurable(config: &ConfigData) -> Self {
        let keys: BTreeSet<PartKey> = config.configurable_parts().map(|(k, _)| k.clone()).collect();
        Self {
            selected: keys.clone(),
            known: keys,
        }
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.selected.contains(key)
    }

    pub fn selected(&self) -> &BTreeSet<PartKey> {
        &self.selected
    }

    /// Flip one part. Returns the new state of that part.
    pub fn toggle(&mut self, key: &PartKey, config: &ConfigData) -> Result<bool, SelectionError> {
        if !config.is_configurable(key.as_str()) {
            return Err(SelectionError::NotConfigurable(key.clone()));
        }
        if self.selected.remove(key) {
            tracing::debug!("Deselected part {}", key);
            Ok(false)
        } else {
            self.selected.insert(key.clone());
            tracing::debug!("Selected part {}", key);
            Ok(true)
        }
    }

    /// Bring the selection in line with a freshly loaded configuration.
    ///
    /// Parts that are gone or no longer configurable are dropped, parts that
    /// were not configurable before start out selected, and every other choice
    /// is kept.
    pub fn reconcile(&mut self, config: &ConfigData) {
        let current: BTreeSet<PartKey> =
            config.configurable_parts().map(|(k, _)| k.clone()).collect();

        self.selected.retain(|key| current.contains(key));
        for key in current.difference(&self.known) {
            self.selected.insert(key.clone());
        }
        self.known = current;
    }

    /// Selected parts with their details, in key order
    pub fn selected_parts<'a>(
        &'a self,
        config: &'a ConfigData,
    ) -> impl Iterator<Item = (&'a PartKey, &'a PartDetail)> {
        self.selected
            .iter()
            .filter_map(move |key| config.detail(key.as_str()).map(|d| (key, d)))
    }

    /// Running total of the selected parts
    pub fn total(&self, config: &ConfigData) -> Cents {
        config.total_for(&self.selected)
    }

    /// Meshes that should be visible for this selection
    pub fn visible_meshes(&self, config: &ConfigData) -> BTreeSet<MeshId> {
        resolver::visible_meshes(&self.selected, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::PartDetail;

    fn key(s: &str) -> PartKey {
        PartKey::parse(s).unwrap()
    }

    #[test]
    fn test_defaults_to_all_configurable() {
        let config = ConfigData::builtin();
        let selection = SelectionState::all_configurable(&config);
        assert_eq!(selection.selected().len(), 5);
        assert!(selection.is_selected("monitor"));
        assert!(!selection.is_selected("nonconfigurable"));
    }

    #[test]
    fn test_toggle_flips_one_part() {
        let config = ConfigData::builtin();
        let mut selection = SelectionState::all_configurable(&config);

        assert_eq!(selection.toggle(&key("mouse"), &config), Ok(false));
        assert!(!selection.is_selected("mouse"));
        assert_eq!(selection.selected().len(), 4);

        assert_eq!(selection.toggle(&key("mouse"), &config), Ok(true));
        assert_eq!(selection.selected().len(), 5);
    }

    #[test]
    fn test_toggle_refuses_fixed_and_unknown_parts() {
        let config = ConfigData::builtin();
        let mut selection = SelectionState::all_configurable(&config);
        let before = selection.clone();

        assert_eq!(
            selection.toggle(&key("nonconfigurable"), &config),
            Err(SelectionError::NotConfigurable(key("nonconfigurable")))
        );
        assert!(selection.toggle(&key("flux"), &config).is_err());
        assert_eq!(selection, before);
    }

    #[test]
    fn test_total_price() {
        let config = ConfigData::builtin();
        let mut selection = SelectionState::all_configurable(&config);
        for part in ["pc", "mouse", "speakers"] {
            selection.toggle(&key(part), &config).unwrap();
        }
        // monitor 299.99 + keyboard 149.99
        assert_eq!(selection.total(&config).to_string(), "449.98");
        let names: Vec<&str> = selection
            .selected_parts(&config)
            .map(|(_, d)| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["Mechanical Keyboard", "27\" Gaming Monitor"]);
    }

    #[test]
    fn test_total_saturates_for_huge_prices() {
        let mut config = ConfigData::builtin();
        for part in ["monitor", "pc"] {
            config.part_details.get_mut(part).unwrap().price = 1e17;
        }
        let selection = SelectionState::all_configurable(&config);
        assert_eq!(selection.total(&config), Cents(i64::MAX));
    }

    #[test]
    fn test_reconcile_keeps_choices_and_selects_new_parts() {
        let mut config = ConfigData::builtin();
        let mut selection = SelectionState::all_configurable(&config);
        selection.toggle(&key("mouse"), &config).unwrap();

        // Another tab adds a part, fixes the keyboard, and removes speakers
        config
            .part_details
            .insert(key("chair"), PartDetail::new("Chair", 89.0, ""));
        config
            .part_details
            .get_mut("keyboard")
            .unwrap()
            .is_configurable = false;
        config.part_details.remove("speakers");
        config.mesh_map.remove("speakers");

        selection.reconcile(&config);
        assert!(selection.is_selected("chair"));
        assert!(!selection.is_selected("mouse"));
        assert!(!selection.is_selected("keyboard"));
        assert!(!selection.is_selected("speakers"));
        assert!(selection.is_selected("monitor"));

        // A second reconcile with the same config changes nothing
        let snapshot = selection.clone();
        selection.reconcile(&config);
        assert_eq!(selection, snapshot);
    }
}
