//! Enemy action selection.

use crate::combatant::Combatant;
use crate::dice::DiceRoller;
use crate::spells::{can_cast, SpellData, SpellKind};
use serde::{Deserialize, Serialize};

/// What the enemy does on its turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "spell_id", rename_all = "snake_case")]
pub enum EnemyAction {
    Attack,
    CastSpell(String),
}

/// Spells worth casting right now: affordable, and no heals at full health.
fn castable<'a, C: Combatant + ?Sized>(enemy: &C, spells: &[&'a SpellData]) -> Vec<&'a SpellData> {
    let wounded = enemy.hp() < enemy.stats().max_hp;
    spells
        .iter()
        .copied()
        .filter(|s| can_cast(enemy, s))
        .filter(|s| wounded || !matches!(s.kind, SpellKind::Heal { .. }))
        .collect()
}

/// Attack when nothing is castable; otherwise a coin flip between attacking
/// and casting. `force_spell_cast` skips the flip.
pub fn select_enemy_action<C: Combatant + ?Sized>(
    enemy: &C,
    available_spells: &[&SpellData],
    force_spell_cast: bool,
    roller: &mut dyn DiceRoller,
) -> EnemyAction {
    if castable(enemy, available_spells).is_empty() {
        return EnemyAction::Attack;
    }
    if !force_spell_cast && !roller.coin_flip() {
        return EnemyAction::Attack;
    }
    match select_spell(enemy, available_spells, roller) {
        Some(id) => EnemyAction::CastSpell(id),
        None => EnemyAction::Attack,
    }
}

/// Uniform pick among castable spells, falling back to the first known one.
pub fn select_spell<C: Combatant + ?Sized>(
    enemy: &C,
    available_spells: &[&SpellData],
    roller: &mut dyn DiceRoller,
) -> Option<String> {
    let options = castable(enemy, available_spells);
    if options.is_empty() {
        return available_spells.first().map(|s| s.id.clone());
    }
    options.get(roller.pick(options.len())).map(|s| s.id.clone())
}
