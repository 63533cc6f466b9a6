//! Timed per-combatant conditions.
//!
//! A [`ConditionList`] holds at most one [`Condition`] per [`ConditionKind`].
//! The owner's list is decremented once at the start of each of the owner's
//! turns, then damage-over-turn is rolled, then the owner acts.

use crate::dice::{roll_with_fallback, DiceRoller};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a condition helps or hinders its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionCategory {
    Buff,
    Debuff,
}

/// Named conditions known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    Blessed,
    Fortified,
    Shielded,
    Empowered,
    Warded,
    Guarded,
    Poisoned,
    Burning,
    Stunned,
    Silenced,
    Weakened,
    Frightened,
    OffBalance,
}

impl ConditionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ConditionKind::Blessed => "Blessed",
            ConditionKind::Fortified => "Fortified",
            ConditionKind::Shielded => "Shielded",
            ConditionKind::Empowered => "Empowered",
            ConditionKind::Warded => "Warded",
            ConditionKind::Guarded => "Guarded",
            ConditionKind::Poisoned => "Poisoned",
            ConditionKind::Burning => "Burning",
            ConditionKind::Stunned => "Stunned",
            ConditionKind::Silenced => "Silenced",
            ConditionKind::Weakened => "Weakened",
            ConditionKind::Frightened => "Frightened",
            ConditionKind::OffBalance => "Off-Balance",
        }
    }

    pub fn category(&self) -> ConditionCategory {
        match self {
            ConditionKind::Blessed
            | ConditionKind::Fortified
            | ConditionKind::Shielded
            | ConditionKind::Empowered
            | ConditionKind::Warded
            | ConditionKind::Guarded => ConditionCategory::Buff,
            ConditionKind::Poisoned
            | ConditionKind::Burning
            | ConditionKind::Stunned
            | ConditionKind::Silenced
            | ConditionKind::Weakened
            | ConditionKind::Frightened
            | ConditionKind::OffBalance => ConditionCategory::Debuff,
        }
    }

    /// Default modifiers carried by this kind.
    pub fn default_modifiers(&self) -> ConditionModifiers {
        let base = ConditionModifiers::default();
        match self {
            ConditionKind::Blessed => ConditionModifiers {
                attack_bonus: 1,
                save_bonus: 1,
                ..base
            },
            ConditionKind::Fortified => ConditionModifiers {
                ac_bonus: 2,
                ..base
            },
            ConditionKind::Shielded => ConditionModifiers {
                ac_bonus: 4,
                ..base
            },
            ConditionKind::Empowered => ConditionModifiers {
                spell_attack_bonus: 2,
                spell_damage_bonus: 2,
                ..base
            },
            ConditionKind::Warded => ConditionModifiers {
                prevent_targeted_spells: true,
                ..base
            },
            ConditionKind::Guarded => ConditionModifiers {
                ac_bonus: 2,
                ..base
            },
            ConditionKind::Poisoned => ConditionModifiers {
                attack_bonus: -2,
                damage_per_turn: Some("1d4".to_string()),
                ..base
            },
            ConditionKind::Burning => ConditionModifiers {
                damage_per_turn: Some("1d6".to_string()),
                ..base
            },
            ConditionKind::Stunned => ConditionModifiers {
                prevent_actions: true,
                ..base
            },
            ConditionKind::Silenced => ConditionModifiers {
                prevent_spellcasting: true,
                ..base
            },
            ConditionKind::Weakened => ConditionModifiers {
                damage_bonus: -2,
                ..base
            },
            ConditionKind::Frightened => ConditionModifiers {
                attack_bonus: -2,
                save_bonus: -2,
                ..base
            },
            ConditionKind::OffBalance => ConditionModifiers {
                ac_bonus: -2,
                ..base
            },
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Mechanical effect of one condition, or the fold of a whole list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionModifiers {
    pub attack_bonus: i32,
    pub damage_bonus: i32,
    pub ac_bonus: i32,
    pub save_bonus: i32,
    pub spell_attack_bonus: i32,
    pub spell_damage_bonus: i32,
    pub prevent_actions: bool,
    pub prevent_spellcasting: bool,
    pub prevent_targeted_spells: bool,
    pub damage_per_turn: Option<String>,
}

impl ConditionModifiers {
    /// Fold `other` into `self`: numbers add, prevent flags OR, formulas join.
    pub fn combine(mut self, other: &ConditionModifiers) -> ConditionModifiers {
        self.attack_bonus += other.attack_bonus;
        self.damage_bonus += other.damage_bonus;
        self.ac_bonus += other.ac_bonus;
        self.save_bonus += other.save_bonus;
        self.spell_attack_bonus += other.spell_attack_bonus;
        self.spell_damage_bonus += other.spell_damage_bonus;
        self.prevent_actions |= other.prevent_actions;
        self.prevent_spellcasting |= other.prevent_spellcasting;
        self.prevent_targeted_spells |= other.prevent_targeted_spells;
        self.damage_per_turn = match (self.damage_per_turn.take(), &other.damage_per_turn) {
            (Some(a), Some(b)) => Some(format!("{a}+{b}")),
            (a, b) => a.or_else(|| b.clone()),
        };
        self
    }
}

/// A condition applied to a combatant with tracking info.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub kind: ConditionKind,
    pub category: ConditionCategory,
    pub modifiers: ConditionModifiers,
    pub turns_remaining: u32,
    pub applied_on_turn: u32,
    /// Set when applied outside the owner's own turn. The owner's next
    /// decrement clears it instead of ticking, so the full duration is
    /// felt on the owner's turns.
    #[serde(default)]
    pub fresh: bool,
}

impl Condition {
    /// A condition with the kind's default modifiers.
    pub fn new(kind: ConditionKind, applied_on_turn: u32, duration: u32) -> Self {
        Self {
            kind,
            category: kind.category(),
            modifiers: kind.default_modifiers(),
            turns_remaining: duration,
            applied_on_turn,
            fresh: false,
        }
    }

    /// Mark as applied outside the owner's turn.
    pub fn fresh(mut self) -> Self {
        self.fresh = true;
        self
    }

    /// Replace the default modifiers.
    pub fn with_modifiers(mut self, modifiers: ConditionModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// What `apply` did to the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Refreshed,
}

/// Rolled damage-over-turn for one owner turn.
#[derive(Debug, Clone, Default)]
pub struct ConditionDamage {
    pub total: i32,
    pub breakdown: Vec<(ConditionKind, i32)>,
}

/// The conditions on one combatant, at most one per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionList(Vec<Condition>);

impl ConditionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a condition with default modifiers, refreshing an existing one.
    pub fn apply(&mut self, kind: ConditionKind, applied_on_turn: u32, duration: u32) -> ApplyOutcome {
        self.apply_condition(Condition::new(kind, applied_on_turn, duration))
    }

    /// Apply a fully specified condition. Reapplication refreshes the
    /// duration of the existing entry and never adds a second one.
    pub fn apply_condition(&mut self, condition: Condition) -> ApplyOutcome {
        if let Some(existing) = self.0.iter_mut().find(|c| c.kind == condition.kind) {
            existing.turns_remaining = condition.turns_remaining;
            existing.applied_on_turn = condition.applied_on_turn;
            existing.fresh = condition.fresh;
            ApplyOutcome::Refreshed
        } else {
            self.0.push(condition);
            ApplyOutcome::Applied
        }
    }

    /// Tick every condition down by one owner turn and return the expired ones.
    /// Fresh conditions skip this tick.
    pub fn decrement(&mut self) -> Vec<Condition> {
        for condition in &mut self.0 {
            if std::mem::take(&mut condition.fresh) {
                continue;
            }
            condition.turns_remaining = condition.turns_remaining.saturating_sub(1);
        }
        let (expired, active): (Vec<_>, Vec<_>) =
            self.0.drain(..).partition(|c| c.turns_remaining == 0);
        self.0 = active;
        expired
    }

    /// Roll every damage-per-turn formula on the list.
    pub fn apply_damage(&self, roller: &mut dyn DiceRoller) -> ConditionDamage {
        let mut damage = ConditionDamage::default();
        for condition in &self.0 {
            if let Some(formula) = &condition.modifiers.damage_per_turn {
                let amount = roll_with_fallback(roller, formula, "1").total.max(0);
                damage.total += amount;
                damage.breakdown.push((condition.kind, amount));
            }
        }
        damage
    }

    /// Aggregate modifiers of every present condition.
    pub fn modifiers(&self) -> ConditionModifiers {
        self.0
            .iter()
            .fold(ConditionModifiers::default(), |acc, c| acc.combine(&c.modifiers))
    }

    /// Remove every condition of a category and return what was removed.
    pub fn remove_category(&mut self, category: ConditionCategory) -> Vec<Condition> {
        let (removed, kept): (Vec<_>, Vec<_>) =
            self.0.drain(..).partition(|c| c.category == category);
        self.0 = kept;
        removed
    }

    pub fn contains(&self, kind: ConditionKind) -> bool {
        self.0.iter().any(|c| c.kind == kind)
    }

    pub fn get(&self, kind: ConditionKind) -> Option<&Condition> {
        self.0.iter().find(|c| c.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
