//! Id-keyed content tables consumed by the engine.

use crate::feats::FeatRegistry;
use crate::items::ItemTable;
use crate::loot::LootTables;
use crate::spells::SpellBook;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Spells, feats, items and loot tables.
///
/// Tables missing from a JSON pack default to empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Content {
    pub spells: SpellBook,
    pub feats: FeatRegistry,
    pub items: ItemTable,
    pub loot_tables: LootTables,
}

impl Content {
    /// The tables shipped with the engine.
    pub fn standard() -> Self {
        Self {
            spells: SpellBook::standard(),
            feats: FeatRegistry::standard(),
            items: ItemTable::standard(),
            loot_tables: LootTables::standard(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
