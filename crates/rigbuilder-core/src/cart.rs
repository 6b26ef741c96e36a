//! Cart snapshot taken at "add to cart" time

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigData;
use crate::part::{Cents, PartKey};
use crate::selection::SelectionState;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    #[error("Screenshot is not an image data URI")]
    InvalidScreenshot,
    #[error("Nothing selected")]
    EmptySelection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: PartKey,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub description: String,
}

/// Frozen copy of a configuration. Not reconciled with later edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    /// `data:image/...` URI of the rendered canvas
    pub screenshot: String,
    pub components: Vec<CartItem>,
    pub total_price: f64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl CartSnapshot {
    /// Build a snapshot from the current selection and a captured image
    pub fn capture(
        screenshot: String,
        selection: &SelectionState,
        config: &ConfigData,
    ) -> Result<Self, CartError> {
        if !screenshot.starts_with("data:image/") {
            return Err(CartError::InvalidScreenshot);
        }
        let components: Vec<CartItem> = selection
            .selected_parts(config)
            .map(|(key, detail)| CartItem {
                id: key.clone(),
                name: detail.name.clone(),
                price: detail.price,
                description: detail.description.clone(),
            })
            .collect();
        if components.is_empty() {
            return Err(CartError::EmptySelection);
        }

        let total = selection.total(config);
        tracing::info!(
            "Captured cart snapshot with {} components, total {}",
            components.len(),
            total
        );
        Ok(Self {
            screenshot,
            components,
            total_price: total.as_price(),
            created_at: Utc::now(),
        })
    }

    /// Total recomputed in cents from the stored item prices
    pub fn total(&self) -> Cents {
        self.components
            .iter()
            .map(|item| Cents::from_price(item.price))
            .sum()
    }
}
