//! Combatant types: the shared stat block plus the player `Character` and
//! the enemy `Creature`.
//!
//! Both sides are assembled outside this crate (character creation, enemy
//! generation) and consumed here through the [`Combatant`] trait.

use crate::abilities::AbilityCharge;
use crate::quirks::Quirk;
use crate::taunts::TauntPool;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Ability Scores
// ============================================================================

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

/// Ability scores container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    pub strength: u8,
    pub dexterity: u8,
    pub constitution: u8,
    pub intelligence: u8,
    pub wisdom: u8,
    pub charisma: u8,
}

impl AbilityScores {
    pub fn new(str: u8, dex: u8, con: u8, int: u8, wis: u8, cha: u8) -> Self {
        Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: wis,
            charisma: cha,
        }
    }

    pub fn get(&self, ability: Ability) -> u8 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        // Floor division: 8-9 = -1, 10-11 = 0, 12-13 = +1
        (self.get(ability) as i32 - 10).div_euclid(2)
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::new(10, 10, 10, 10, 10, 10)
    }
}

/// d20 saving throw categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveKind {
    Fortitude,
    Reflex,
    Will,
}

impl SaveKind {
    pub fn name(&self) -> &'static str {
        match self {
            SaveKind::Fortitude => "Fortitude",
            SaveKind::Reflex => "Reflex",
            SaveKind::Will => "Will",
        }
    }
}

/// Saving throw bonuses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingThrows {
    pub fortitude: i32,
    pub reflex: i32,
    pub will: i32,
}

impl SavingThrows {
    pub fn new(fortitude: i32, reflex: i32, will: i32) -> Self {
        Self {
            fortitude,
            reflex,
            will,
        }
    }

    pub fn bonus(&self, kind: SaveKind) -> i32 {
        match kind {
            SaveKind::Fortitude => self.fortitude,
            SaveKind::Reflex => self.reflex,
            SaveKind::Will => self.will,
        }
    }
}

// ============================================================================
// Equipment
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponProperty {
    Finesse,
    Light,
    Heavy,
    TwoHanded,
}

/// An equipped weapon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    pub id: String,
    pub name: String,
    /// Damage formula, e.g. `1d8`.
    pub damage: String,
    #[serde(default)]
    pub properties: Vec<WeaponProperty>,
    /// Magical bonus added to attack and damage.
    #[serde(default)]
    pub enchantment: i32,
}

impl Weapon {
    pub fn new(id: impl Into<String>, name: impl Into<String>, damage: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            damage: damage.into(),
            properties: Vec::new(),
            enchantment: 0,
        }
    }

    pub fn with_properties(mut self, properties: Vec<WeaponProperty>) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_enchantment(mut self, enchantment: i32) -> Self {
        self.enchantment = enchantment;
        self
    }

    pub fn is_finesse(&self) -> bool {
        self.properties.contains(&WeaponProperty::Finesse)
    }
}

/// Worn armor or a carried shield; the bonus is already part of `ac`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmorPiece {
    pub name: String,
    pub ac_bonus: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub weapon: Option<Weapon>,
    pub armor: Option<ArmorPiece>,
    pub shield: Option<ArmorPiece>,
}

// ============================================================================
// Spell Slots
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInfo {
    pub current: u8,
    pub max: u8,
}

/// Spell slot tracking for levels 1 through 9.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellSlots {
    pub slots: [SlotInfo; 9],
}

impl SpellSlots {
    pub fn new() -> Self {
        Self {
            slots: [SlotInfo::default(); 9],
        }
    }

    /// Grant `count` slots of `level`, full.
    pub fn with_slots(mut self, level: u8, count: u8) -> Self {
        if let Some(slot) = self.slot_mut(level) {
            slot.current = count;
            slot.max = count;
        }
        self
    }

    fn slot_mut(&mut self, level: u8) -> Option<&mut SlotInfo> {
        if (1..=9).contains(&level) {
            Some(&mut self.slots[level as usize - 1])
        } else {
            None
        }
    }

    pub fn available(&self, level: u8) -> u8 {
        if (1..=9).contains(&level) {
            self.slots[level as usize - 1].current
        } else {
            0
        }
    }

    pub fn use_slot(&mut self, level: u8) -> bool {
        match self.slot_mut(level) {
            Some(slot) if slot.current > 0 => {
                slot.current -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn has_any_charged(&self) -> bool {
        self.slots.iter().any(|s| s.current > 0)
    }
}

impl Default for SpellSlots {
    fn default() -> Self {
        Self::new()
    }
}

/// Limited-use resources of a combatant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    #[serde(default)]
    pub abilities: Vec<AbilityCharge>,
    #[serde(default)]
    pub spell_slots: Option<SpellSlots>,
    /// Known spell ids, cantrips included.
    #[serde(default)]
    pub spells: Vec<String>,
}

impl Resources {
    /// True if a slot of `level` is charged. Cantrips (level 0) always are.
    pub fn has_slot(&self, level: u8) -> bool {
        level == 0
            || self
                .spell_slots
                .as_ref()
                .is_some_and(|slots| slots.available(level) > 0)
    }
}

// ============================================================================
// Combatants
// ============================================================================

/// Stat block shared by both sides of a duel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatStats {
    pub name: String,
    pub level: u8,
    pub hp: i32,
    pub max_hp: i32,
    pub ac: i32,
    pub base_attack_bonus: i32,
    pub ability_scores: AbilityScores,
    pub saves: SavingThrows,
    pub equipment: Equipment,
    pub resources: Resources,
    #[serde(default)]
    pub taunts: TauntPool,
}

impl CombatStats {
    pub fn new(name: impl Into<String>, max_hp: i32, ac: i32) -> Self {
        Self {
            name: name.into(),
            level: 1,
            hp: max_hp,
            max_hp,
            ac,
            base_attack_bonus: 0,
            ability_scores: AbilityScores::default(),
            saves: SavingThrows::default(),
            equipment: Equipment::default(),
            resources: Resources::default(),
            taunts: TauntPool::default(),
        }
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    pub fn with_hp(mut self, hp: i32) -> Self {
        self.hp = hp;
        self
    }

    pub fn with_base_attack_bonus(mut self, bab: i32) -> Self {
        self.base_attack_bonus = bab;
        self
    }

    pub fn with_ability_scores(mut self, scores: AbilityScores) -> Self {
        self.ability_scores = scores;
        self
    }

    pub fn with_saves(mut self, saves: SavingThrows) -> Self {
        self.saves = saves;
        self
    }

    pub fn with_weapon(mut self, weapon: Weapon) -> Self {
        self.equipment.weapon = Some(weapon);
        self
    }

    pub fn with_abilities(mut self, abilities: Vec<AbilityCharge>) -> Self {
        self.resources.abilities = abilities;
        self
    }

    pub fn with_spells(mut self, spells: Vec<String>, slots: SpellSlots) -> Self {
        self.resources.spells = spells;
        self.resources.spell_slots = Some(slots);
        self
    }

    pub fn with_taunts(mut self, taunts: TauntPool) -> Self {
        self.taunts = taunts;
        self
    }
}

/// Capability set shared by characters and creatures.
pub trait Combatant {
    fn stats(&self) -> &CombatStats;

    fn stats_mut(&mut self) -> &mut CombatStats;

    fn name(&self) -> &str {
        &self.stats().name
    }

    fn hp(&self) -> i32 {
        self.stats().hp
    }

    fn is_defeated(&self) -> bool {
        self.stats().hp <= 0
    }

    /// Apply damage and return the amount taken.
    fn take_damage(&mut self, amount: i32) -> i32 {
        let amount = amount.max(0);
        self.stats_mut().hp -= amount;
        amount
    }

    /// Heal up to max hp and return the amount actually restored.
    fn heal(&mut self, amount: i32) -> i32 {
        let stats = self.stats_mut();
        let old = stats.hp;
        stats.hp = (stats.hp + amount.max(0)).min(stats.max_hp);
        stats.hp - old
    }
}

/// An inventory stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory(Vec<InventoryItem>);

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: &str, quantity: u32) {
        match self.0.iter_mut().find(|i| i.id == id) {
            Some(stack) => stack.quantity += quantity,
            None => self.0.push(InventoryItem {
                id: id.to_string(),
                quantity,
            }),
        }
    }

    pub fn quantity(&self, id: &str) -> u32 {
        self.0.iter().find(|i| i.id == id).map_or(0, |i| i.quantity)
    }

    /// Remove one of `id`; false if none is carried.
    pub fn remove_one(&mut self, id: &str) -> bool {
        let Some(pos) = self.0.iter().position(|i| i.id == id && i.quantity > 0) else {
            return false;
        };
        self.0[pos].quantity -= 1;
        if self.0[pos].quantity == 0 {
            self.0.remove(pos);
        }
        true
    }
}

/// The player character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub stats: CombatStats,
    pub gold: u32,
    pub inventory: Inventory,
    #[serde(default)]
    pub feats: Vec<String>,
    #[serde(default)]
    pub quirk: Option<Quirk>,
}

impl Character {
    pub fn new(stats: CombatStats) -> Self {
        Self {
            stats,
            gold: 0,
            inventory: Inventory::new(),
            feats: Vec::new(),
            quirk: None,
        }
    }

    pub fn with_gold(mut self, gold: u32) -> Self {
        self.gold = gold;
        self
    }

    pub fn with_item(mut self, id: &str, quantity: u32) -> Self {
        self.inventory.add(id, quantity);
        self
    }

    pub fn with_feat(mut self, feat_id: impl Into<String>) -> Self {
        self.feats.push(feat_id.into());
        self
    }

    pub fn with_quirk(mut self, quirk: Quirk) -> Self {
        self.quirk = Some(quirk);
        self
    }
}

impl Combatant for Character {
    fn stats(&self) -> &CombatStats {
        &self.stats
    }

    fn stats_mut(&mut self) -> &mut CombatStats {
        &mut self.stats
    }
}

/// The enemy creature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creature {
    pub stats: CombatStats,
    #[serde(default)]
    pub loot_table: Option<String>,
}

impl Creature {
    pub fn new(stats: CombatStats) -> Self {
        Self {
            stats,
            loot_table: None,
        }
    }

    pub fn with_loot_table(mut self, table: impl Into<String>) -> Self {
        self.loot_table = Some(table.into());
        self
    }
}

impl Combatant for Creature {
    fn stats(&self) -> &CombatStats {
        &self.stats
    }

    fn stats_mut(&mut self) -> &mut CombatStats {
        &mut self.stats
    }
}
