//! Spell definitions and slot-gated spell resolution.
//!
//! Cantrips (level 0) are always castable. Leveled spells need a charged slot
//! of their level; callers must only offer spells that pass
//! [`can_cast`], and [`cast_spell`] refuses with [`SpellError::NoSlot`]
//! otherwise.

use crate::combatant::{Ability, Combatant, SaveKind};
use crate::conditions::{Condition, ConditionKind, ConditionList};
use crate::criticals::{is_critical_fumble, is_critical_hit};
use crate::dice::{roll_with_fallback, DiceRoller};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpellError {
    #[error("No level {level} spell slot available for {spell}")]
    NoSlot { spell: String, level: u8 },
}

/// What a spell does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpellKind {
    /// Damage the target; `attack_roll` spells must beat the target's AC.
    Damage { dice: String, attack_roll: bool },
    /// Heal the caster.
    Heal { dice: String },
    /// Apply a condition to the caster.
    Buff { condition: ConditionKind, duration: u32 },
    /// Apply a condition to the target, optionally resisted by a save.
    Debuff {
        condition: ConditionKind,
        duration: u32,
        #[serde(default)]
        save: Option<SaveKind>,
    },
}

/// Complete spell definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellData {
    pub id: String,
    pub name: String,
    /// 0 for cantrips.
    pub level: u8,
    pub kind: SpellKind,
}

impl SpellData {
    pub fn new(id: &str, name: &str, level: u8, kind: SpellKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            level,
            kind,
        }
    }

    pub fn is_cantrip(&self) -> bool {
        self.level == 0
    }

    /// Whether the spell lands on the opponent rather than the caster.
    pub fn targets_opponent(&self) -> bool {
        matches!(self.kind, SpellKind::Damage { .. } | SpellKind::Debuff { .. })
    }
}

/// Spells by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpellBook {
    spells: HashMap<String, SpellData>,
}

impl SpellBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spell: SpellData) {
        self.spells.insert(spell.id.clone(), spell);
    }

    pub fn get(&self, id: &str) -> Option<&SpellData> {
        self.spells.get(id)
    }

    /// Resolve a list of ids, skipping unknown ones.
    pub fn resolve<'a>(&'a self, ids: &[String]) -> Vec<&'a SpellData> {
        ids.iter().filter_map(|id| self.get(id)).collect()
    }

    pub fn standard() -> Self {
        let mut book = Self::new();
        for spell in STANDARD_SPELLS.iter() {
            book.register(spell.clone());
        }
        book
    }
}

lazy_static::lazy_static! {
    /// Spells shipped with the engine.
    pub static ref STANDARD_SPELLS: Vec<SpellData> = vec![
        SpellData::new("fire_bolt", "Fire Bolt", 0, SpellKind::Damage {
            dice: "1d10".to_string(),
            attack_roll: true,
        }),
        SpellData::new("acid_splash", "Acid Splash", 0, SpellKind::Damage {
            dice: "1d6".to_string(),
            attack_roll: false,
        }),
        SpellData::new("poison_spray", "Poison Spray", 0, SpellKind::Debuff {
            condition: ConditionKind::Poisoned,
            duration: 2,
            save: Some(SaveKind::Fortitude),
        }),
        SpellData::new("magic_missile", "Magic Missile", 1, SpellKind::Damage {
            dice: "3d4+3".to_string(),
            attack_roll: false,
        }),
        SpellData::new("cure_wounds", "Cure Wounds", 1, SpellKind::Heal {
            dice: "1d8+3".to_string(),
        }),
        SpellData::new("bless", "Bless", 1, SpellKind::Buff {
            condition: ConditionKind::Blessed,
            duration: 3,
        }),
        SpellData::new("shield", "Shield", 1, SpellKind::Buff {
            condition: ConditionKind::Shielded,
            duration: 2,
        }),
        SpellData::new("spell_ward", "Spell Ward", 1, SpellKind::Buff {
            condition: ConditionKind::Warded,
            duration: 2,
        }),
        SpellData::new("arcane_focus", "Arcane Focus", 1, SpellKind::Buff {
            condition: ConditionKind::Empowered,
            duration: 3,
        }),
        SpellData::new("flame_lash", "Flame Lash", 1, SpellKind::Debuff {
            condition: ConditionKind::Burning,
            duration: 3,
            save: Some(SaveKind::Reflex),
        }),
        SpellData::new("scorching_ray", "Scorching Ray", 2, SpellKind::Damage {
            dice: "3d6".to_string(),
            attack_roll: true,
        }),
        SpellData::new("hold_person", "Hold Person", 2, SpellKind::Debuff {
            condition: ConditionKind::Stunned,
            duration: 1,
            save: Some(SaveKind::Will),
        }),
        SpellData::new("silence", "Silence", 2, SpellKind::Debuff {
            condition: ConditionKind::Silenced,
            duration: 2,
            save: None,
        }),
    ];
}

/// Cantrip, or a leveled spell with a charged slot of its level.
pub fn can_cast<C: Combatant + ?Sized>(caster: &C, spell: &SpellData) -> bool {
    caster.stats().resources.has_slot(spell.level)
}

/// Best of the mental ability modifiers.
fn casting_modifier<C: Combatant + ?Sized>(caster: &C) -> i32 {
    let scores = &caster.stats().ability_scores;
    [Ability::Intelligence, Ability::Wisdom, Ability::Charisma]
        .into_iter()
        .map(|a| scores.modifier(a))
        .max()
        .unwrap_or(0)
}

/// Save DC of the caster's spells: 10 + spell level + casting modifier.
pub fn spell_save_dc<C: Combatant + ?Sized>(caster: &C, spell: &SpellData) -> i32 {
    10 + spell.level as i32 + casting_modifier(&*caster)
}

/// Both sides of a cast.
pub struct SpellTargets<'a, A: Combatant + ?Sized, D: Combatant + ?Sized> {
    pub caster: &'a mut A,
    pub caster_conditions: &'a mut ConditionList,
    pub target: &'a mut D,
    pub target_conditions: &'a mut ConditionList,
    /// Single-turn AC bonus on the target.
    pub target_ac_overlay: i32,
    pub turn: u32,
}

/// Outcome of one cast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpellResult {
    pub success: bool,
    pub damage: Option<i32>,
    pub healing: Option<i32>,
    pub condition_applied: Option<ConditionKind>,
    pub output: String,
}

/// Cast `spell`, spending a slot for leveled spells.
///
/// A silenced caster keeps the slot. A target warded against targeted spells
/// is unaffected, but the slot is spent.
pub fn cast_spell<A, D>(
    targets: SpellTargets<'_, A, D>,
    spell: &SpellData,
    roller: &mut dyn DiceRoller,
) -> Result<SpellResult, SpellError>
where
    A: Combatant + ?Sized,
    D: Combatant + ?Sized,
{
    let SpellTargets {
        caster,
        caster_conditions,
        target,
        target_conditions,
        target_ac_overlay,
        turn,
    } = targets;

    if !can_cast(&*caster, spell) {
        return Err(SpellError::NoSlot {
            spell: spell.name.clone(),
            level: spell.level,
        });
    }

    let caster_name = caster.name().to_string();
    let caster_mods = caster_conditions.modifiers();
    if caster_mods.prevent_spellcasting {
        return Ok(SpellResult {
            output: format!("{caster_name} tries to cast {} but cannot speak the words!", spell.name),
            ..SpellResult::default()
        });
    }

    if !spell.is_cantrip() {
        if let Some(slots) = caster.stats_mut().resources.spell_slots.as_mut() {
            slots.use_slot(spell.level);
        }
    }

    let target_name = target.name().to_string();
    let target_mods = target_conditions.modifiers();
    if spell.targets_opponent() && target_mods.prevent_targeted_spells {
        return Ok(SpellResult {
            output: format!(
                "{caster_name} casts {} but it fizzles against {target_name}'s ward.",
                spell.name
            ),
            ..SpellResult::default()
        });
    }

    let result = match &spell.kind {
        SpellKind::Damage { dice, attack_roll } => {
            if *attack_roll {
                let natural = roller.d20();
                let total = natural as i32
                    + caster.stats().base_attack_bonus
                    + casting_modifier(&*caster)
                    + caster_mods.spell_attack_bonus;
                let ac = target.stats().ac + target_mods.ac_bonus + target_ac_overlay;
                let hit = is_critical_hit(natural) || (!is_critical_fumble(natural) && total >= ac);
                if !hit {
                    return Ok(SpellResult {
                        output: format!(
                            "{caster_name} casts {} at {target_name} but misses ({total} vs AC {ac}).",
                            spell.name
                        ),
                        ..SpellResult::default()
                    });
                }
            }
            let roll = roll_with_fallback(roller, dice, "1d4");
            let amount = (roll.total + caster_mods.spell_damage_bonus).max(1);
            target.take_damage(amount);
            SpellResult {
                success: true,
                damage: Some(amount),
                output: format!(
                    "{caster_name} casts {} at {target_name} for {amount} damage.",
                    spell.name
                ),
                ..SpellResult::default()
            }
        }
        SpellKind::Heal { dice } => {
            let roll = roll_with_fallback(roller, dice, "1d4");
            let healed = caster.heal(roll.total);
            SpellResult {
                success: true,
                healing: Some(healed),
                output: format!("{caster_name} casts {} and recovers {healed} HP.", spell.name),
                ..SpellResult::default()
            }
        }
        SpellKind::Buff {
            condition,
            duration,
        } => {
            caster_conditions.apply(*condition, turn, *duration);
            SpellResult {
                success: true,
                condition_applied: Some(*condition),
                output: format!(
                    "{caster_name} casts {} and is {condition} for {duration} turns.",
                    spell.name
                ),
                ..SpellResult::default()
            }
        }
        SpellKind::Debuff {
            condition,
            duration,
            save,
        } => {
            if let Some(save) = save {
                let dc = spell_save_dc(&*caster, spell);
                let natural = roller.d20();
                let total = natural as i32 + target.stats().saves.bonus(*save) + target_mods.save_bonus;
                if total >= dc {
                    return Ok(SpellResult {
                        output: format!(
                            "{target_name} resists {caster_name}'s {} ({} save {total} vs DC {dc}).",
                            spell.name,
                            save.name()
                        ),
                        ..SpellResult::default()
                    });
                }
            }
            target_conditions.apply_condition(Condition::new(*condition, turn, *duration).fresh());
            SpellResult {
                success: true,
                condition_applied: Some(*condition),
                output: format!(
                    "{caster_name} casts {} and {target_name} is {condition} for {duration} turns.",
                    spell.name
                ),
                ..SpellResult::default()
            }
        }
    };

    Ok(result)
}
