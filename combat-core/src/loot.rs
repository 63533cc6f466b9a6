//! Weighted loot tables rolled once per defeated enemy.

use crate::dice::DiceRoller;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One possible drop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootEntry {
    /// Item added to the player's inventory.
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub gold: u32,
    /// Display name for the log line.
    pub name: String,
    pub weight: u32,
}

impl LootEntry {
    pub fn gold(amount: u32, weight: u32) -> Self {
        Self {
            item_id: None,
            gold: amount,
            name: format!("{amount} gold"),
            weight,
        }
    }

    pub fn item(item_id: &str, name: &str, weight: u32) -> Self {
        Self {
            item_id: Some(item_id.to_string()),
            gold: 0,
            name: name.to_string(),
            weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootTable {
    pub id: String,
    pub entries: Vec<LootEntry>,
    /// Weight of dropping nothing.
    #[serde(default)]
    pub nothing_weight: u32,
}

impl LootTable {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            entries: Vec::new(),
            nothing_weight: 0,
        }
    }

    pub fn with_entry(mut self, entry: LootEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn with_nothing_weight(mut self, weight: u32) -> Self {
        self.nothing_weight = weight;
        self
    }

    fn total_weight(&self) -> u32 {
        self.entries.iter().map(|e| e.weight).sum::<u32>() + self.nothing_weight
    }
}

/// What a defeated enemy dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LootDrop {
    pub item_id: Option<String>,
    pub gold: u32,
    pub name: String,
}

impl fmt::Display for LootDrop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Roll `table` once. Draws a single `pick` over the total weight.
pub fn roll_loot(table: &LootTable, roller: &mut dyn DiceRoller) -> Option<LootDrop> {
    let total = table.total_weight();
    if total == 0 {
        return None;
    }
    let mut point = roller.pick(total as usize) as u32;
    for entry in &table.entries {
        if point < entry.weight {
            return Some(LootDrop {
                item_id: entry.item_id.clone(),
                gold: entry.gold,
                name: entry.name.clone(),
            });
        }
        point -= entry.weight;
    }
    None
}

/// Loot tables by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LootTables {
    tables: HashMap<String, LootTable>,
}

impl LootTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, table: LootTable) {
        self.tables.insert(table.id.clone(), table);
    }

    pub fn get(&self, id: &str) -> Option<&LootTable> {
        self.tables.get(id)
    }

    pub fn standard() -> Self {
        let mut tables = Self::new();
        for table in STANDARD_LOOT.iter() {
            tables.register(table.clone());
        }
        tables
    }
}

lazy_static::lazy_static! {
    pub static ref STANDARD_LOOT: Vec<LootTable> = vec![
        LootTable::new("goblin")
            .with_entry(LootEntry::gold(5, 4))
            .with_entry(LootEntry::item("healing_potion", "Potion of Healing", 2))
            .with_entry(LootEntry::item("dagger", "Dagger", 1))
            .with_nothing_weight(3),
        LootTable::new("bandit")
            .with_entry(LootEntry::gold(15, 5))
            .with_entry(LootEntry::item("smoke_bomb", "Smoke Bomb", 2))
            .with_entry(LootEntry::item("antidote", "Antidote", 1))
            .with_nothing_weight(2),
        LootTable::new("cultist")
            .with_entry(LootEntry::gold(10, 3))
            .with_entry(LootEntry::item("battle_tonic", "Battle Tonic", 2))
            .with_entry(LootEntry::item("fire_flask", "Alchemist's Fire", 2))
            .with_nothing_weight(1),
    ];
}
