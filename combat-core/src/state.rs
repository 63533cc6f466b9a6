//! Encounter state passed between rounds.

use crate::abilities::{refresh_abilities, RefreshClass};
use crate::combatant::{Character, Combatant, Creature};
use crate::conditions::ConditionList;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncounterId(pub Uuid);

impl EncounterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EncounterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EncounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Sides
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player,
    Enemy,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Player => Side::Enemy,
            Side::Enemy => Side::Player,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Player => write!(f, "player"),
            Side::Enemy => write!(f, "enemy"),
        }
    }
}

/// One value per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sided<T> {
    pub player: T,
    pub enemy: T,
}

impl<T> Sided<T> {
    pub fn new(player: T, enemy: T) -> Self {
        Self { player, enemy }
    }
}

impl<T> Index<Side> for Sided<T> {
    type Output = T;

    fn index(&self, side: Side) -> &T {
        match side {
            Side::Player => &self.player,
            Side::Enemy => &self.enemy,
        }
    }
}

impl<T> IndexMut<Side> for Sided<T> {
    fn index_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::Player => &mut self.player,
            Side::Enemy => &mut self.enemy,
        }
    }
}

// ============================================================================
// Log
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Player,
    Enemy,
    System,
}

impl From<Side> for Actor {
    fn from(side: Side) -> Self {
        match side {
            Side::Player => Actor::Player,
            Side::Enemy => Actor::Enemy,
        }
    }
}

/// One line of the narrative log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub turn: u32,
    pub actor: Actor,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taunt: Option<String>,
}

impl LogEntry {
    pub fn new(turn: u32, actor: Actor, message: impl Into<String>) -> Self {
        Self {
            turn,
            actor,
            message: message.into(),
            taunt: None,
        }
    }

    pub fn with_taunt(mut self, taunt: Option<String>) -> Self {
        self.taunt = taunt;
        self
    }
}

// ============================================================================
// Encounter configuration
// ============================================================================

/// Whether and at what cost the player may flee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetreatConfig {
    pub can_retreat: bool,
    #[serde(default)]
    pub gold_penalty: u32,
    #[serde(default)]
    pub hp_penalty: i32,
    #[serde(default)]
    pub narrative_flag: Option<String>,
    #[serde(default)]
    pub destination_node: Option<String>,
}

impl RetreatConfig {
    pub fn allowed() -> Self {
        Self {
            can_retreat: true,
            ..Self::default()
        }
    }

    pub fn with_gold_penalty(mut self, gold: u32) -> Self {
        self.gold_penalty = gold;
        self
    }

    pub fn with_hp_penalty(mut self, hp: i32) -> Self {
        self.hp_penalty = hp;
        self
    }

    pub fn with_narrative_flag(mut self, flag: impl Into<String>) -> Self {
        self.narrative_flag = Some(flag.into());
        self
    }

    pub fn with_destination(mut self, node: impl Into<String>) -> Self {
        self.destination_node = Some(node.into());
        self
    }
}

impl Default for RetreatConfig {
    fn default() -> Self {
        Self {
            can_retreat: false,
            gold_penalty: 0,
            hp_penalty: 0,
            narrative_flag: None,
            destination_node: None,
        }
    }
}

/// Test affordances. Ignored unless `EngineConfig::debug_overrides` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugFlags {
    /// Make the enemy cast a spell this round. Cleared after the round.
    pub force_enemy_spell: bool,
}

// ============================================================================
// Combat state
// ============================================================================

/// Everything needed to resolve the next round of a duel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatState {
    pub id: EncounterId,
    pub turn: u32,
    pub player: Character,
    pub enemy: Creature,
    pub log: Vec<LogEntry>,
    /// Set once, when either side is defeated or the player escapes.
    pub winner: Option<Side>,
    pub conditions: Sided<ConditionList>,
    /// Spending the next turn recovering a dropped weapon.
    pub recovering: Sided<bool>,
    pub quirk_fired: bool,
    /// Single-turn AC bonus, cleared at the start of its owner's turn.
    pub ac_overlay: Sided<i32>,
    pub enemy_auto_miss: bool,
    pub first_enemy_attack_seen: bool,
    pub retreat: RetreatConfig,
    #[serde(default)]
    pub debug: DebugFlags,
}

impl CombatState {
    /// Start an encounter. Per-encounter ability charges are restored.
    pub fn new(mut player: Character, mut enemy: Creature) -> Self {
        refresh_abilities(&mut player.stats.resources.abilities, RefreshClass::PerEncounter);
        refresh_abilities(&mut enemy.stats.resources.abilities, RefreshClass::PerEncounter);
        Self {
            id: EncounterId::new(),
            turn: 1,
            player,
            enemy,
            log: Vec::new(),
            winner: None,
            conditions: Sided::default(),
            recovering: Sided::default(),
            quirk_fired: false,
            ac_overlay: Sided::default(),
            enemy_auto_miss: false,
            first_enemy_attack_seen: false,
            retreat: RetreatConfig::default(),
            debug: DebugFlags::default(),
        }
    }

    pub fn with_retreat(mut self, retreat: RetreatConfig) -> Self {
        self.retreat = retreat;
        self
    }

    pub fn with_debug_flags(mut self, debug: DebugFlags) -> Self {
        self.debug = debug;
        self
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    pub fn combatant(&self, side: Side) -> &dyn Combatant {
        match side {
            Side::Player => &self.player,
            Side::Enemy => &self.enemy,
        }
    }

    pub fn combatant_mut(&mut self, side: Side) -> &mut dyn Combatant {
        match side {
            Side::Player => &mut self.player,
            Side::Enemy => &mut self.enemy,
        }
    }

    pub(crate) fn push_log(&mut self, actor: Actor, message: impl Into<String>) {
        self.log.push(LogEntry::new(self.turn, actor, message));
    }

    /// One-line status for the presentation layer.
    pub fn summary(&self) -> String {
        let side_line = |side: Side| {
            let c = self.combatant(side);
            let conditions: Vec<String> = self.conditions[side]
                .iter()
                .map(|cond| format!("{}({})", cond.kind, cond.turns_remaining))
                .collect();
            if conditions.is_empty() {
                format!("{} {}/{} HP", c.name(), c.hp(), c.stats().max_hp)
            } else {
                format!(
                    "{} {}/{} HP [{}]",
                    c.name(),
                    c.hp(),
                    c.stats().max_hp,
                    conditions.join(", ")
                )
            }
        };
        let status = match self.winner {
            Some(side) => format!(" | winner: {side}"),
            None => String::new(),
        };
        format!(
            "Turn {} | {} vs {}{status}",
            self.turn,
            side_line(Side::Player),
            side_line(Side::Enemy)
        )
    }
}
