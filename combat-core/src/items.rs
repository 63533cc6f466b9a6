//! Standard weapons and combat consumables.
//!
//! Weapons are looked up by id or name when assembling combatants. Consumables
//! are used in combat through `Action::UseItem` and resolved by [`use_item`].

use crate::combatant::{Combatant, Weapon, WeaponProperty};
use crate::conditions::{ConditionCategory, ConditionKind, ConditionList};
use crate::dice::{roll_with_fallback, DiceRoller};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Get a standard weapon by id or display name.
pub fn get_weapon(name: &str) -> Option<Weapon> {
    let name_lower = name.to_lowercase();
    WEAPONS
        .iter()
        .find(|w| w.id == name_lower || w.name.to_lowercase() == name_lower)
        .cloned()
}

/// What a consumable does when used in combat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemEffect {
    /// Heal the user.
    Heal { dice: String },
    /// Remove every debuff from the user.
    CureDebuffs,
    /// Damage the opponent; no attack roll.
    Damage { dice: String },
    /// Apply a buff condition to the user.
    ApplyBuff { condition: ConditionKind, duration: u32 },
    /// Leave the fight. The player wins the encounter.
    Escape,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemData {
    pub id: String,
    pub name: String,
    pub effect: ItemEffect,
    /// Value in gold pieces.
    #[serde(default)]
    pub value: u32,
}

impl ItemData {
    pub fn new(id: &str, name: &str, effect: ItemEffect, value: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            effect,
            value,
        }
    }
}

/// Item id to definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemTable {
    items: HashMap<String, ItemData>,
}

impl ItemTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, item: ItemData) {
        self.items.insert(item.id.clone(), item);
    }

    pub fn get(&self, id: &str) -> Option<&ItemData> {
        self.items.get(id)
    }

    pub fn standard() -> Self {
        let mut table = Self::new();
        for item in CONSUMABLES.iter() {
            table.register(item.clone());
        }
        table
    }
}

lazy_static::lazy_static! {
    /// Weapons available to combatants.
    pub static ref WEAPONS: Vec<Weapon> = vec![
        Weapon::new("club", "Club", "1d4").with_properties(vec![WeaponProperty::Light]),
        Weapon::new("dagger", "Dagger", "1d4")
            .with_properties(vec![WeaponProperty::Finesse, WeaponProperty::Light]),
        Weapon::new("handaxe", "Handaxe", "1d6").with_properties(vec![WeaponProperty::Light]),
        Weapon::new("mace", "Mace", "1d6"),
        Weapon::new("shortsword", "Shortsword", "1d6")
            .with_properties(vec![WeaponProperty::Finesse, WeaponProperty::Light]),
        Weapon::new("scimitar", "Scimitar", "1d6")
            .with_properties(vec![WeaponProperty::Finesse, WeaponProperty::Light]),
        Weapon::new("rapier", "Rapier", "1d8").with_properties(vec![WeaponProperty::Finesse]),
        Weapon::new("longsword", "Longsword", "1d8"),
        Weapon::new("battleaxe", "Battleaxe", "1d8"),
        Weapon::new("warhammer", "Warhammer", "1d8"),
        Weapon::new("greataxe", "Greataxe", "1d12")
            .with_properties(vec![WeaponProperty::Heavy, WeaponProperty::TwoHanded]),
        Weapon::new("greatsword", "Greatsword", "2d6")
            .with_properties(vec![WeaponProperty::Heavy, WeaponProperty::TwoHanded]),
    ];

    /// Consumables usable in combat.
    pub static ref CONSUMABLES: Vec<ItemData> = vec![
        ItemData::new("healing_potion", "Potion of Healing", ItemEffect::Heal {
            dice: "2d4+2".to_string(),
        }, 50),
        ItemData::new("greater_healing_potion", "Potion of Greater Healing", ItemEffect::Heal {
            dice: "4d4+4".to_string(),
        }, 150),
        ItemData::new("antidote", "Antidote", ItemEffect::CureDebuffs, 50),
        ItemData::new("fire_flask", "Alchemist's Fire", ItemEffect::Damage {
            dice: "2d6".to_string(),
        }, 50),
        ItemData::new("smoke_bomb", "Smoke Bomb", ItemEffect::Escape, 25),
        ItemData::new("battle_tonic", "Battle Tonic", ItemEffect::ApplyBuff {
            condition: ConditionKind::Blessed,
            duration: 3,
        }, 40),
    ];
}

/// The user, their opponent, and both condition lists.
pub struct ItemTargets<'a, U: Combatant + ?Sized, O: Combatant + ?Sized> {
    pub user: &'a mut U,
    pub user_conditions: &'a mut ConditionList,
    pub opponent: &'a mut O,
    pub turn: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemOutcome {
    pub escaped: bool,
    pub healed: i32,
    pub damage: i32,
    pub summary: String,
}

/// Resolve an item's effect. Removing it from the inventory is the caller's job.
pub fn use_item<U, O>(item: &ItemData, targets: ItemTargets<'_, U, O>, roller: &mut dyn DiceRoller) -> ItemOutcome
where
    U: Combatant + ?Sized,
    O: Combatant + ?Sized,
{
    let user = targets.user.name().to_string();
    match &item.effect {
        ItemEffect::Heal { dice } => {
            let roll = roll_with_fallback(roller, dice, "1d4");
            let healed = targets.user.heal(roll.total);
            ItemOutcome {
                healed,
                summary: format!("{user} drinks a {} and recovers {healed} HP.", item.name),
                ..ItemOutcome::default()
            }
        }
        ItemEffect::CureDebuffs => {
            let removed = targets.user_conditions.remove_category(ConditionCategory::Debuff);
            let summary = if removed.is_empty() {
                format!("{user} uses an {} but has nothing to cure.", item.name)
            } else {
                let names: Vec<_> = removed.iter().map(|c| c.kind.name()).collect();
                format!("{user} uses an {} and is cured of {}.", item.name, names.join(", "))
            };
            ItemOutcome {
                summary,
                ..ItemOutcome::default()
            }
        }
        ItemEffect::Damage { dice } => {
            let roll = roll_with_fallback(roller, dice, "1d4");
            let damage = targets.opponent.take_damage(roll.total.max(1));
            ItemOutcome {
                damage,
                summary: format!(
                    "{user} hurls {} at {} for {damage} damage.",
                    item.name,
                    targets.opponent.name()
                ),
                ..ItemOutcome::default()
            }
        }
        ItemEffect::ApplyBuff { condition, duration } => {
            targets.user_conditions.apply(*condition, targets.turn, *duration);
            ItemOutcome {
                summary: format!("{user} uses a {} and is {condition} for {duration} turns.", item.name),
                ..ItemOutcome::default()
            }
        }
        ItemEffect::Escape => ItemOutcome {
            escaped: true,
            summary: format!("{user} throws a {} and escapes the fight!", item.name),
            ..ItemOutcome::default()
        },
    }
}
