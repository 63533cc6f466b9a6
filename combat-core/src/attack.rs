//! Single weapon attack resolution.

use crate::combatant::{Ability, Combatant};
use crate::conditions::ConditionList;
use crate::criticals::{calculate_critical_damage, is_critical_fumble, is_critical_hit, roll_fumble_effect, FumbleEffect};
use crate::dice::{roll_with_fallback, DiceRoller};
use crate::taunts::{pick_taunt, TauntTrigger};
use serde::{Deserialize, Serialize};

/// Damage formula used when the attacker has no weapon.
pub const UNARMED_DAMAGE: &str = "1d3";

/// Flat attack and damage adjustments from a feat or variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackModifiers {
    pub attack_bonus: i32,
    pub damage_bonus: i32,
}

/// Per-attack inputs that are not part of either combatant.
pub struct AttackContext<'a> {
    pub roller: &'a mut dyn DiceRoller,
    /// Miss without drawing a roll.
    pub auto_miss: bool,
    /// Single-turn AC bonus currently held by the defender.
    pub defender_ac_overlay: i32,
    pub unarmed_damage: &'a str,
}

impl<'a> AttackContext<'a> {
    pub fn new(roller: &'a mut dyn DiceRoller) -> Self {
        Self {
            roller,
            auto_miss: false,
            defender_ac_overlay: 0,
            unarmed_damage: UNARMED_DAMAGE,
        }
    }

    pub fn with_auto_miss(mut self, auto_miss: bool) -> Self {
        self.auto_miss = auto_miss;
        self
    }

    pub fn with_defender_ac_overlay(mut self, overlay: i32) -> Self {
        self.defender_ac_overlay = overlay;
        self
    }

    pub fn with_unarmed_damage(mut self, formula: &'a str) -> Self {
        self.unarmed_damage = formula;
        self
    }
}

/// Result of one attack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttackResult {
    pub hit: bool,
    pub critical: bool,
    pub fumble: Option<FumbleEffect>,
    /// The natural d20, absent when no roll was drawn.
    pub natural: Option<u32>,
    pub total: i32,
    pub target_ac: i32,
    pub damage: i32,
    pub damage_formula: Option<String>,
    /// The attacker could not act.
    pub prevented: bool,
    pub auto_missed: bool,
    pub message: String,
    pub taunt: Option<String>,
}

/// STR, or DEX for a finesse weapon when DEX is better.
pub fn attack_ability<C: Combatant + ?Sized>(attacker: &C) -> Ability {
    let stats = attacker.stats();
    let finesse = stats.equipment.weapon.as_ref().is_some_and(|w| w.is_finesse());
    let scores = &stats.ability_scores;
    if finesse && scores.modifier(Ability::Dexterity) > scores.modifier(Ability::Strength) {
        Ability::Dexterity
    } else {
        Ability::Strength
    }
}

/// Resolve one attack of `attacker` against `defender`, applying damage.
///
/// Fumble side effects are only reported; the caller resolves them.
pub fn perform_attack<A, D>(
    attacker: &A,
    defender: &mut D,
    attacker_conditions: &ConditionList,
    defender_conditions: &ConditionList,
    modifiers: Option<&AttackModifiers>,
    ctx: &mut AttackContext<'_>,
) -> AttackResult
where
    A: Combatant + ?Sized,
    D: Combatant + ?Sized,
{
    let attacker_name = attacker.name().to_string();
    let defender_name = defender.name().to_string();
    let attacker_mods = attacker_conditions.modifiers();

    if attacker_mods.prevent_actions {
        return AttackResult {
            prevented: true,
            message: format!("{attacker_name} is unable to act!"),
            ..AttackResult::default()
        };
    }

    if ctx.auto_miss {
        return AttackResult {
            auto_missed: true,
            message: format!("{attacker_name}'s attack goes wide of {defender_name}!"),
            ..AttackResult::default()
        };
    }

    let stats = attacker.stats();
    let explicit = modifiers.copied().unwrap_or_default();
    let enchantment = stats.equipment.weapon.as_ref().map_or(0, |w| w.enchantment);
    let ability_mod = stats.ability_scores.modifier(attack_ability(attacker));

    let attack_bonus =
        stats.base_attack_bonus + ability_mod + explicit.attack_bonus + attacker_mods.attack_bonus + enchantment;
    let damage_bonus = ability_mod + explicit.damage_bonus + attacker_mods.damage_bonus + enchantment;

    let target_ac = defender.stats().ac + defender_conditions.modifiers().ac_bonus + ctx.defender_ac_overlay;

    let natural = ctx.roller.d20();
    let total = natural as i32 + attack_bonus;
    let critical = is_critical_hit(natural);

    let mut result = AttackResult {
        natural: Some(natural),
        total,
        target_ac,
        critical,
        ..AttackResult::default()
    };

    if is_critical_fumble(natural) {
        let effect = roll_fumble_effect(ctx.roller);
        tracing::debug!(attacker = %attacker_name, fumble = %effect, "critical fumble");
        result.fumble = Some(effect);
        result.message = format!(
            "{attacker_name} rolls a natural 1 against {defender_name}! {}",
            effect.describe(&attacker_name)
        );
        result.taunt = pick_taunt(&defender.stats().taunts, TauntTrigger::Dodged, ctx.roller);
        return result;
    }

    result.hit = critical || total >= target_ac;
    if !result.hit {
        result.message = format!("{attacker_name} misses {defender_name} ({total} vs AC {target_ac}).");
        result.taunt = pick_taunt(&defender.stats().taunts, TauntTrigger::Dodged, ctx.roller);
        return result;
    }

    let base = stats
        .equipment
        .weapon
        .as_ref()
        .map_or(ctx.unarmed_damage, |w| w.damage.as_str());
    let dice = if critical {
        calculate_critical_damage(base)
    } else {
        base.to_string()
    };
    let formula = match damage_bonus {
        0 => dice,
        b => format!("{dice}{b:+}"),
    };
    let roll = roll_with_fallback(ctx.roller, &formula, "1");
    let damage = roll.total.max(1);
    defender.take_damage(damage);

    result.damage = damage;
    result.damage_formula = Some(formula);
    result.message = if critical {
        format!("CRITICAL HIT! {attacker_name} strikes {defender_name} for {damage} damage!")
    } else {
        format!("{attacker_name} hits {defender_name} for {damage} damage ({total} vs AC {target_ac}).")
    };
    result.taunt = pick_taunt(&defender.stats().taunts, TauntTrigger::Struck, ctx.roller);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::{AbilityScores, CombatStats, Creature, Weapon, WeaponProperty};
    use crate::conditions::ConditionKind;
    use crate::testing::ScriptedRoller;

    fn duelist(str_score: u8, dex_score: u8, weapon: Weapon) -> Creature {
        Creature::new(
            CombatStats::new("Duelist", 12, 13)
                .with_base_attack_bonus(1)
                .with_ability_scores(AbilityScores::new(str_score, dex_score, 10, 10, 10, 10))
                .with_weapon(weapon),
        )
    }

    fn target(ac: i32) -> Creature {
        Creature::new(CombatStats::new("Target", 20, ac))
    }

    fn attack(attacker: &Creature, defender: &mut Creature, roller: &mut ScriptedRoller) -> AttackResult {
        let mut ctx = AttackContext::new(roller);
        perform_attack(
            attacker,
            defender,
            &ConditionList::new(),
            &ConditionList::new(),
            None,
            &mut ctx,
        )
    }

    #[test]
    fn test_finesse_uses_better_dex() {
        let rapier = Weapon::new("rapier", "Rapier", "1d6").with_properties(vec![WeaponProperty::Finesse]);
        assert_eq!(attack_ability(&duelist(10, 16, rapier.clone())), Ability::Dexterity);
        assert_eq!(attack_ability(&duelist(16, 12, rapier)), Ability::Strength);
        let axe = Weapon::new("axe", "Axe", "1d8");
        assert_eq!(attack_ability(&duelist(10, 16, axe)), Ability::Strength);
    }

    #[test]
    fn test_natural_20_hits_and_doubles_dice() {
        let attacker = duelist(16, 10, Weapon::new("sword", "Longsword", "1d8"));
        let mut defender = target(40);
        let mut roller = ScriptedRoller::new(2).with_rolls([20, 11]);

        let result = attack(&attacker, &mut defender, &mut roller);
        assert!(result.hit);
        assert!(result.critical);
        assert_eq!(result.damage_formula.as_deref(), Some("2d8+3"));
        assert_eq!(result.damage, 11);
        assert_eq!(defender.stats.hp, 9);
    }

    #[test]
    fn test_natural_1_fumbles() {
        let attacker = duelist(16, 10, Weapon::new("sword", "Longsword", "1d8"));
        let mut defender = target(1);
        let mut roller = ScriptedRoller::new(2).with_rolls([1, 3]);

        let result = attack(&attacker, &mut defender, &mut roller);
        assert!(!result.hit);
        assert_eq!(result.fumble, Some(FumbleEffect::OffBalance));
        assert_eq!(defender.stats.hp, 20);
    }

    #[test]
    fn test_hit_on_meeting_ac() {
        let attacker = duelist(16, 10, Weapon::new("sword", "Longsword", "1d8"));
        // 11 + 1 BAB + 3 STR = 15
        let mut roller = ScriptedRoller::new(2).with_rolls([11, 4]);
        let result = attack(&attacker, &mut target(15), &mut roller);
        assert!(result.hit);
        assert_eq!(result.total, 15);

        let mut roller = ScriptedRoller::new(2).with_rolls([10]);
        let result = attack(&attacker, &mut target(15), &mut roller);
        assert!(!result.hit);
        assert_eq!(result.damage, 0);
    }

    #[test]
    fn test_damage_is_at_least_one() {
        let attacker = duelist(6, 10, Weapon::new("club", "Club", "1d4"));
        let mut defender = target(5);
        let mut roller = ScriptedRoller::new(2).with_rolls([15, -3]);
        let result = attack(&attacker, &mut defender, &mut roller);
        assert_eq!(result.damage, 1);
        assert_eq!(defender.stats.hp, 19);
    }

    #[test]
    fn test_unarmed_formula() {
        let attacker = Creature::new(CombatStats::new("Brawler", 10, 10));
        let mut defender = target(5);
        let mut roller = ScriptedRoller::new(2).with_rolls([15]);
        let result = attack(&attacker, &mut defender, &mut roller);
        assert_eq!(result.damage_formula.as_deref(), Some("1d3"));
    }

    #[test]
    fn test_stunned_attacker_draws_nothing() {
        let attacker = duelist(16, 10, Weapon::new("sword", "Longsword", "1d8"));
        let mut defender = target(10);
        let mut stunned = ConditionList::new();
        stunned.apply(ConditionKind::Stunned, 1, 1);
        let mut roller = ScriptedRoller::new(2);

        let mut ctx = AttackContext::new(&mut roller);
        let result = perform_attack(&attacker, &mut defender, &stunned, &ConditionList::new(), None, &mut ctx);
        assert!(result.prevented);
        assert_eq!(result.natural, None);
        assert_eq!(roller.dice_drawn(), 0);
    }

    #[test]
    fn test_auto_miss_draws_nothing() {
        let attacker = duelist(16, 10, Weapon::new("sword", "Longsword", "1d8"));
        let mut defender = target(1);
        let mut roller = ScriptedRoller::new(2);

        let mut ctx = AttackContext::new(&mut roller).with_auto_miss(true);
        let result = perform_attack(&attacker, &mut defender, &ConditionList::new(), &ConditionList::new(), None, &mut ctx);
        assert!(result.auto_missed);
        assert!(!result.hit);
        assert_eq!(roller.dice_drawn(), 0);
    }

    #[test]
    fn test_modifiers_and_overlay_apply() {
        let attacker = duelist(10, 10, Weapon::new("sword", "Longsword", "1d8").with_enchantment(1));
        let mut defender = target(12);
        let mods = AttackModifiers {
            attack_bonus: -2,
            damage_bonus: 4,
        };
        // 12 + 1 BAB - 2 + 1 enchantment = 12 vs AC 12 + 1 overlay
        let mut roller = ScriptedRoller::new(2).with_rolls([12]);
        let mut ctx = AttackContext::new(&mut roller).with_defender_ac_overlay(1);
        let result = perform_attack(
            &attacker,
            &mut defender,
            &ConditionList::new(),
            &ConditionList::new(),
            Some(&mods),
            &mut ctx,
        );
        assert!(!result.hit);
        assert_eq!(result.target_ac, 13);
    }
}
