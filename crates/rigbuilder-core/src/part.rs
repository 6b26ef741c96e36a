//! Part and mesh identifiers, part metadata, and price arithmetic

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Part key is empty (raw value {0:?})")]
    Empty(String),
}

/// Canonical identifier of a part: trimmed and lowercase.
///
/// Every key entering the system goes through [`PartKey::parse`], so lookups
/// never need to guess at casing ("Monitor" and "monitor" are the same part).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartKey(String);

impl PartKey {
    /// Normalize a raw key into its canonical form
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        let canonical = raw.trim().to_lowercase();
        if canonical.is_empty() {
            return Err(KeyError::Empty(raw.to_string()));
        }
        Ok(Self(canonical))
    }

    /// Wrap a key already known to be canonical
    pub(crate) fn from_canonical(key: &str) -> Self {
        debug_assert_eq!(key, key.trim().to_lowercase());
        Self(key.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PartKey {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PartKey> for String {
    fn from(key: PartKey) -> Self {
        key.0
    }
}

impl Borrow<str> for PartKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a drawable node in the loaded 3D asset. Matched exactly, case preserved.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeshId(String);

impl MeshId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MeshId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for MeshId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for MeshId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MeshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display metadata for one logical part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartDetail {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub description: String,
    /// Non-configurable parts are always visible and never offered as a toggle
    #[serde(default = "default_true")]
    pub is_configurable: bool,
    /// Key into the icon table; kept verbatim so unknown keys survive a round trip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

fn default_true() -> bool {
    true
}

impl PartDetail {
    pub fn new(name: impl Into<String>, price: f64, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            price,
            description: description.into(),
            is_configurable: true,
            icon: None,
        }
    }

    pub fn fixed(mut self) -> Self {
        self.is_configurable = false;
        self
    }

    pub fn with_icon(mut self, icon: PartIcon) -> Self {
        self.icon = Some(icon.key().to_string());
        self
    }

    /// Icon to display, falling back to the generic icon
    pub fn resolved_icon(&self) -> PartIcon {
        self.icon
            .as_deref()
            .map(PartIcon::from_key)
            .unwrap_or_default()
    }

    /// Price is finite and non-negative
    pub fn has_valid_price(&self) -> bool {
        self.price.is_finite() && self.price >= 0.0
    }

    pub fn cents(&self) -> Cents {
        Cents::from_price(self.price)
    }
}

/// Fixed icon lookup table for parts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PartIcon {
    Monitor,
    Computer,
    Keyboard,
    Mouse,
    Speaker,
    Cpu,
    Gpu,
    Memory,
    Storage,
    Power,
    Fan,
    Package,
    #[default]
    Generic,
}

impl PartIcon {
    pub const ALL: [PartIcon; 13] = [
        PartIcon::Monitor,
        PartIcon::Computer,
        PartIcon::Keyboard,
        PartIcon::Mouse,
        PartIcon::Speaker,
        PartIcon::Cpu,
        PartIcon::Gpu,
        PartIcon::Memory,
        PartIcon::Storage,
        PartIcon::Power,
        PartIcon::Fan,
        PartIcon::Package,
        PartIcon::Generic,
    ];

    /// Resolve an icon key; unknown keys map to [`PartIcon::Generic`]
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_lowercase().as_str() {
            "monitor" => Self::Monitor,
            "computer" | "pc" | "tower" => Self::Computer,
            "keyboard" => Self::Keyboard,
            "mouse" => Self::Mouse,
            "speaker" | "speakers" => Self::Speaker,
            "cpu" => Self::Cpu,
            "gpu" => Self::Gpu,
            "memory" | "ram" => Self::Memory,
            "storage" | "ssd" => Self::Storage,
            "power" | "psu" => Self::Power,
            "fan" => Self::Fan,
            "package" => Self::Package,
            _ => Self::Generic,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::Monitor => "monitor",
            Self::Computer => "computer",
            Self::Keyboard => "keyboard",
            Self::Mouse => "mouse",
            Self::Speaker => "speaker",
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
            Self::Memory => "memory",
            Self::Storage => "storage",
            Self::Power => "power",
            Self::Fan => "fan",
            Self::Package => "package",
            Self::Generic => "generic",
        }
    }

    /// Single glyph used by the egui panels
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Monitor => "🖵",
            Self::Computer => "🖥",
            Self::Keyboard => "⌨",
            Self::Mouse => "🖱",
            Self::Speaker => "🔊",
            Self::Cpu => "▣",
            Self::Gpu => "▤",
            Self::Memory => "▥",
            Self::Storage => "🖴",
            Self::Power => "⚡",
            Self::Fan => "✇",
            Self::Package => "📦",
            Self::Generic => "■",
        }
    }
}

/// Money amount in whole cents.
///
/// Prices are stored as decimal numbers in the JSON document; totals are
/// summed here so that 299.99 + 149.99 is exactly 449.98. Arithmetic
/// saturates at `i64::MAX` cents instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cents(pub i64);

impl Cents {
    pub fn from_price(price: f64) -> Self {
        Self((price * 100.0).round() as i64)
    }

    pub fn as_price(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl std::ops::Add for Cents {
    type Output = Cents;

    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0.saturating_add(rhs.0))
    }
}

impl std::iter::Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Self {
        iter.fold(Cents(0), |acc, c| acc + c)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_key_normalization() {
        assert_eq!(PartKey::parse("Monitor").unwrap().as_str(), "monitor");
        assert_eq!(PartKey::parse("  PC ").unwrap().as_str(), "pc");
        assert_eq!(PartKey::parse("   "), Err(KeyError::Empty("   ".to_string())));
    }

    #[test]
    fn test_part_key_deserializes_canonical() {
        let key: PartKey = serde_json::from_str("\"Keyboard\"").unwrap();
        assert_eq!(key.as_str(), "keyboard");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"keyboard\"");
        assert!(serde_json::from_str::<PartKey>("\"\"").is_err());
    }

    #[test]
    fn test_icon_fallback() {
        let mut detail = PartDetail::new("Widget", 1.0, "");
        assert_eq!(detail.resolved_icon(), PartIcon::Generic);

        detail.icon = Some("Monitor".to_string());
        assert_eq!(detail.resolved_icon(), PartIcon::Monitor);

        detail.icon = Some("flux-capacitor".to_string());
        assert_eq!(detail.resolved_icon(), PartIcon::Generic);

        for icon in PartIcon::ALL {
            assert_eq!(PartIcon::from_key(icon.key()), icon);
        }
    }

    #[test]
    fn test_cents_sum_and_display() {
        let total: Cents = [299.99, 149.99].iter().map(|p| Cents::from_price(*p)).sum();
        assert_eq!(total, Cents(44998));
        assert_eq!(total.to_string(), "449.98");
        assert_eq!(Cents(5).to_string(), "0.05");
        assert_eq!(Cents::from_price(0.1 + 0.2).to_string(), "0.30");
    }

    #[test]
    fn test_cents_saturate_on_huge_prices() {
        let total: Cents = [1e17, 1e17].iter().map(|p| Cents::from_price(*p)).sum();
        assert_eq!(total, Cents(i64::MAX));
        assert_eq!(Cents::from_price(1e300) + Cents(1), Cents(i64::MAX));
    }

    #[test]
    fn test_price_validity() {
        assert!(PartDetail::new("a", 0.0, "").has_valid_price());
        assert!(!PartDetail::new("a", -1.0, "").has_valid_price());
        assert!(!PartDetail::new("a", f64::NAN, "").has_valid_price());
    }
}
