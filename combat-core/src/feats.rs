//! Data-driven feat effects.
//!
//! A feat is an [`FeatEffect`] record in a [`FeatRegistry`]; one generic
//! applier interprets it. Adding a feat means adding data (in code or JSON),
//! not adding a code path.

use crate::abilities::{can_pay_ability_cost, consume_ability_use};
use crate::attack::AttackModifiers;
use crate::combatant::Combatant;
use crate::conditions::{Condition, ConditionKind, ConditionList, ConditionModifiers};
use crate::content::ContentError;
use crate::dice::{roll_with_fallback, DiceRoller};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed power-attack trade: -2 to hit, +4 damage.
pub const POWER_ATTACK: AttackModifiers = AttackModifiers {
    attack_bonus: -2,
    damage_bonus: 4,
};

/// How a feat is activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatUsage {
    /// Modifies an attack (`Action::Attack` with a feat variant).
    Attack,
    /// Used on its own (`Action::UseAbility`).
    Ability,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatTarget {
    User,
    Opponent,
}

/// A condition a feat applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatCondition {
    pub kind: ConditionKind,
    pub target: FeatTarget,
    pub duration: u32,
    /// Overrides the kind's default modifiers.
    #[serde(default)]
    pub modifiers: Option<ConditionModifiers>,
}

/// Everything a feat does, as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatEffect {
    pub id: String,
    pub name: String,
    pub usage: FeatUsage,
    #[serde(default)]
    pub attack_bonus: i32,
    #[serde(default)]
    pub damage_bonus: i32,
    /// Single-turn AC bonus for the user.
    #[serde(default)]
    pub ac_bonus: i32,
    #[serde(default)]
    pub heal: Option<String>,
    /// On attack feats, opponent conditions only land on a hit.
    #[serde(default)]
    pub conditions: Vec<FeatCondition>,
    /// Ability charges spent per use; 0 means free.
    #[serde(default)]
    pub cost: u32,
}

impl FeatEffect {
    pub fn attack_modifiers(&self) -> AttackModifiers {
        AttackModifiers {
            attack_bonus: self.attack_bonus,
            damage_bonus: self.damage_bonus,
        }
    }

    /// Whether `abilities` can pay for one use.
    pub fn is_affordable(&self, abilities: &[crate::abilities::AbilityCharge]) -> bool {
        self.cost == 0 || can_pay_ability_cost(abilities, &self.id, self.cost)
    }
}

/// Feat id to effect.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatRegistry {
    feats: HashMap<String, FeatEffect>,
}

impl FeatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, effect: FeatEffect) {
        self.feats.insert(effect.id.clone(), effect);
    }

    pub fn get(&self, id: &str) -> Option<&FeatEffect> {
        self.feats.get(id)
    }

    pub fn len(&self) -> usize {
        self.feats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feats.is_empty()
    }

    /// Load feats from a JSON array of effect records.
    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        let effects: Vec<FeatEffect> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for effect in effects {
            registry.register(effect);
        }
        Ok(registry)
    }

    /// The feats shipped with the engine.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for effect in STANDARD_FEATS.iter() {
            registry.register(effect.clone());
        }
        registry
    }
}

lazy_static::lazy_static! {
    /// Built-in feats.
    pub static ref STANDARD_FEATS: Vec<FeatEffect> = vec![
        FeatEffect {
            id: "cleave".to_string(),
            name: "Cleave".to_string(),
            usage: FeatUsage::Attack,
            attack_bonus: 0,
            damage_bonus: 3,
            ac_bonus: 0,
            heal: None,
            conditions: Vec::new(),
            cost: 1,
        },
        FeatEffect {
            id: "precise_strike".to_string(),
            name: "Precise Strike".to_string(),
            usage: FeatUsage::Attack,
            attack_bonus: 3,
            damage_bonus: 0,
            ac_bonus: 0,
            heal: None,
            conditions: Vec::new(),
            cost: 0,
        },
        FeatEffect {
            id: "crippling_strike".to_string(),
            name: "Crippling Strike".to_string(),
            usage: FeatUsage::Attack,
            attack_bonus: 0,
            damage_bonus: 1,
            ac_bonus: 0,
            heal: None,
            conditions: vec![FeatCondition {
                kind: ConditionKind::Weakened,
                target: FeatTarget::Opponent,
                duration: 2,
                modifiers: None,
            }],
            cost: 1,
        },
        FeatEffect {
            id: "battle_cry".to_string(),
            name: "Battle Cry".to_string(),
            usage: FeatUsage::Ability,
            attack_bonus: 0,
            damage_bonus: 0,
            ac_bonus: 0,
            heal: None,
            conditions: vec![
                FeatCondition {
                    kind: ConditionKind::Blessed,
                    target: FeatTarget::User,
                    duration: 3,
                    modifiers: None,
                },
                FeatCondition {
                    kind: ConditionKind::Frightened,
                    target: FeatTarget::Opponent,
                    duration: 2,
                    modifiers: None,
                },
            ],
            cost: 1,
        },
        FeatEffect {
            id: "iron_skin".to_string(),
            name: "Iron Skin".to_string(),
            usage: FeatUsage::Ability,
            attack_bonus: 0,
            damage_bonus: 0,
            ac_bonus: 3,
            heal: None,
            conditions: Vec::new(),
            cost: 1,
        },
        FeatEffect {
            id: "field_medic".to_string(),
            name: "Field Medic".to_string(),
            usage: FeatUsage::Ability,
            attack_bonus: 0,
            damage_bonus: 0,
            ac_bonus: 0,
            heal: Some("1d6+2".to_string()),
            conditions: Vec::new(),
            cost: 1,
        },
    ];
}

/// Mutable pieces of the encounter a feat may touch.
pub struct FeatTargets<'a, C: Combatant + ?Sized> {
    pub user: &'a mut C,
    pub user_conditions: &'a mut ConditionList,
    pub user_ac_overlay: &'a mut i32,
    pub opponent_conditions: &'a mut ConditionList,
    pub turn: u32,
}

/// What applying a feat did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatOutcome {
    pub healed: i32,
    pub ac_bonus: i32,
    pub conditions_applied: Vec<(ConditionKind, FeatTarget)>,
    pub summary: String,
}

/// Pay a feat's charge cost. False (and nothing spent) if unaffordable.
pub fn pay_feat_cost<C: Combatant + ?Sized>(effect: &FeatEffect, user: &mut C) -> bool {
    if !effect.is_affordable(&user.stats().resources.abilities) {
        return false;
    }
    for _ in 0..effect.cost {
        consume_ability_use(&mut user.stats_mut().resources.abilities, &effect.id);
    }
    true
}

/// Apply the non-attack parts of a feat: healing, AC overlay and conditions.
///
/// `landed` gates opponent-targeted conditions; ability feats pass `true`,
/// attack feats pass whether the attack hit.
pub fn apply_feat_effect<C: Combatant + ?Sized>(
    effect: &FeatEffect,
    targets: FeatTargets<'_, C>,
    landed: bool,
    roller: &mut dyn DiceRoller,
) -> FeatOutcome {
    let mut outcome = FeatOutcome::default();
    let mut parts = Vec::new();

    if let Some(formula) = &effect.heal {
        let roll = roll_with_fallback(roller, formula, "1d4");
        outcome.healed = targets.user.heal(roll.total);
        parts.push(format!("recovers {} HP", outcome.healed));
    }

    if effect.ac_bonus != 0 {
        *targets.user_ac_overlay += effect.ac_bonus;
        outcome.ac_bonus = effect.ac_bonus;
        parts.push(format!("gains {:+} AC until their next turn", effect.ac_bonus));
    }

    for feat_condition in &effect.conditions {
        if feat_condition.target == FeatTarget::Opponent && !landed {
            continue;
        }
        let mut condition = Condition::new(feat_condition.kind, targets.turn, feat_condition.duration);
        if let Some(modifiers) = &feat_condition.modifiers {
            condition = condition.with_modifiers(modifiers.clone());
        }
        let list = match feat_condition.target {
            FeatTarget::User => &mut *targets.user_conditions,
            FeatTarget::Opponent => {
                condition = condition.fresh();
                &mut *targets.opponent_conditions
            }
        };
        list.apply_condition(condition);
        outcome
            .conditions_applied
            .push((feat_condition.kind, feat_condition.target));
        let whom = match feat_condition.target {
            FeatTarget::User => "self",
            FeatTarget::Opponent => "opponent",
        };
        parts.push(format!(
            "applies {} to {whom} for {} turns",
            feat_condition.kind, feat_condition.duration
        ));
    }

    outcome.summary = if parts.is_empty() {
        format!("{} uses {}.", targets.user.name(), effect.name)
    } else {
        format!("{} uses {} and {}.", targets.user.name(), effect.name, parts.join(", "))
    };
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::{AbilityCharge, RefreshClass};
    use crate::combatant::{Character, CombatStats};
    use crate::testing::ScriptedRoller;

    fn user_with_charge(id: &str, uses: u32) -> Character {
        Character::new(CombatStats::new("Mira", 20, 14).with_hp(10).with_abilities(vec![
            AbilityCharge::new(id, id, RefreshClass::PerEncounter, 2).with_uses(uses),
        ]))
    }

    #[test]
    fn test_standard_registry_contents() {
        let registry = FeatRegistry::standard();
        assert_eq!(registry.len(), STANDARD_FEATS.len());
        assert_eq!(registry.get("cleave").unwrap().damage_bonus, 3);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_registry_from_json() {
        let json = r#"[
            {"id": "shield_bash", "name": "Shield Bash", "usage": "attack",
             "damage_bonus": 1,
             "conditions": [{"kind": "stunned", "target": "opponent", "duration": 1}],
             "cost": 1}
        ]"#;
        let registry = FeatRegistry::from_json(json).unwrap();
        let bash = registry.get("shield_bash").unwrap();
        assert_eq!(bash.usage, FeatUsage::Attack);
        assert_eq!(bash.conditions[0].kind, ConditionKind::Stunned);
        assert_eq!(bash.attack_bonus, 0);
    }

    #[test]
    fn test_registry_from_bad_json() {
        assert!(FeatRegistry::from_json("{not json").is_err());
    }

    #[test]
    fn test_pay_feat_cost() {
        let registry = FeatRegistry::standard();
        let cleave = registry.get("cleave").unwrap();
        let mut mira = user_with_charge("cleave", 1);
        assert!(pay_feat_cost(cleave, &mut mira));
        assert!(!pay_feat_cost(cleave, &mut mira));

        let precise = registry.get("precise_strike").unwrap();
        assert!(pay_feat_cost(precise, &mut mira));
    }

    #[test]
    fn test_apply_battle_cry() {
        let registry = FeatRegistry::standard();
        let cry = registry.get("battle_cry").unwrap();
        let mut mira = user_with_charge("battle_cry", 1);
        let mut mine = ConditionList::new();
        let mut theirs = ConditionList::new();
        let mut overlay = 0;
        let mut roller = ScriptedRoller::new(2);

        let outcome = apply_feat_effect(
            cry,
            FeatTargets {
                user: &mut mira,
                user_conditions: &mut mine,
                user_ac_overlay: &mut overlay,
                opponent_conditions: &mut theirs,
                turn: 2,
            },
            true,
            &mut roller,
        );
        assert!(mine.contains(ConditionKind::Blessed));
        assert!(theirs.contains(ConditionKind::Frightened));
        assert_eq!(outcome.conditions_applied.len(), 2);
    }

    #[test]
    fn test_opponent_conditions_need_a_hit() {
        let registry = FeatRegistry::standard();
        let crippling = registry.get("crippling_strike").unwrap();
        let mut mira = user_with_charge("crippling_strike", 1);
        let mut mine = ConditionList::new();
        let mut theirs = ConditionList::new();
        let mut overlay = 0;
        let mut roller = ScriptedRoller::new(2);

        apply_feat_effect(
            crippling,
            FeatTargets {
                user: &mut mira,
                user_conditions: &mut mine,
                user_ac_overlay: &mut overlay,
                opponent_conditions: &mut theirs,
                turn: 2,
            },
            false,
            &mut roller,
        );
        assert!(theirs.is_empty());
    }

    #[test]
    fn test_heal_and_overlay() {
        let registry = FeatRegistry::standard();
        let mut mira = user_with_charge("field_medic", 1);
        let mut mine = ConditionList::new();
        let mut theirs = ConditionList::new();
        let mut overlay = 0;
        let mut roller = ScriptedRoller::new(2).with_rolls([6]);

        let outcome = apply_feat_effect(
            registry.get("field_medic").unwrap(),
            FeatTargets {
                user: &mut mira,
                user_conditions: &mut mine,
                user_ac_overlay: &mut overlay,
                opponent_conditions: &mut theirs,
                turn: 1,
            },
            true,
            &mut roller,
        );
        assert_eq!(outcome.healed, 6);
        assert_eq!(mira.stats.hp, 16);

        let outcome = apply_feat_effect(
            registry.get("iron_skin").unwrap(),
            FeatTargets {
                user: &mut mira,
                user_conditions: &mut mine,
                user_ac_overlay: &mut overlay,
                opponent_conditions: &mut theirs,
                turn: 1,
            },
            true,
            &mut roller,
        );
        assert_eq!(outcome.ac_bonus, 3);
        assert_eq!(overlay, 3);
    }
}
