//! Round resolution.
//!
//! [`CombatEngine::resolve_round`] turns one player [`Action`] into the next
//! [`CombatState`]: the player's turn, the enemy's automatic response,
//! condition ticking, fumble fallout, defeat detection and the narrative log.
//! The input state is never modified; all work happens on a copy.

use crate::abilities::{use_builtin_ability, AbilityOutcome, BuiltinAbility};
use crate::attack::{perform_attack, AttackContext, AttackModifiers, AttackResult, UNARMED_DAMAGE};
use crate::combatant::Combatant;
use crate::conditions::{Condition, ConditionKind, ConditionList, ConditionModifiers};
use crate::content::Content;
use crate::criticals::FumbleEffect;
use crate::dice::{roll_with_fallback, DiceRoller};
use crate::enemy_ai::{select_enemy_action, EnemyAction};
use crate::feats::{apply_feat_effect, pay_feat_cost, FeatEffect, FeatTargets, FeatUsage, POWER_ATTACK};
use crate::items::{use_item, ItemTargets};
use crate::loot::roll_loot;
use crate::quirks::{QuirkEffect, QuirkTrigger};
use crate::spells::{can_cast, cast_spell, SpellError, SpellTargets};
use crate::state::{Actor, CombatState, LogEntry, Side};
use crate::taunts::{pick_taunt, TauntTrigger};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that refuse a round or a retreat. The state is left unchanged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CombatError {
    #[error("No level {level} spell slot available for {spell}")]
    NoSpellSlot { spell: String, level: u8 },

    #[error("Combat is already over")]
    CombatOver,

    #[error("Retreat not allowed")]
    RetreatNotAllowed,
}

impl From<SpellError> for CombatError {
    fn from(err: SpellError) -> Self {
        match err {
            SpellError::NoSlot { spell, level } => CombatError::NoSpellSlot { spell, level },
        }
    }
}

/// Attack variants the player may choose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackVariant {
    /// The fixed -2 attack / +4 damage trade.
    PowerAttack,
    /// An attack feat from the feat registry.
    Feat(String),
}

/// The player's choice for one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Attack {
        #[serde(default)]
        variant: Option<AttackVariant>,
    },
    UseAbility { ability_id: String },
    UseItem { item_id: String },
    CastSpell { spell_id: String },
}

impl Action {
    pub fn attack() -> Self {
        Action::Attack { variant: None }
    }

    pub fn power_attack() -> Self {
        Action::Attack {
            variant: Some(AttackVariant::PowerAttack),
        }
    }

    pub fn feat_attack(feat_id: impl Into<String>) -> Self {
        Action::Attack {
            variant: Some(AttackVariant::Feat(feat_id.into())),
        }
    }

    pub fn use_ability(ability_id: impl Into<String>) -> Self {
        Action::UseAbility {
            ability_id: ability_id.into(),
        }
    }

    pub fn use_item(item_id: impl Into<String>) -> Self {
        Action::UseItem {
            item_id: item_id.into(),
        }
    }

    pub fn cast_spell(spell_id: impl Into<String>) -> Self {
        Action::CastSpell {
            spell_id: spell_id.into(),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Honor `DebugFlags` on the combat state.
    pub debug_overrides: bool,
    /// Damage formula for attackers without a weapon.
    pub unarmed_damage: String,
    /// Keep only the newest entries of the narrative log.
    pub max_log_entries: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debug_overrides: false,
            unarmed_damage: UNARMED_DAMAGE.to_string(),
            max_log_entries: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debug_overrides(mut self, enabled: bool) -> Self {
        self.debug_overrides = enabled;
        self
    }

    pub fn with_unarmed_damage(mut self, formula: impl Into<String>) -> Self {
        self.unarmed_damage = formula.into();
        self
    }

    pub fn with_max_log_entries(mut self, max: usize) -> Self {
        self.max_log_entries = Some(max);
        self
    }
}

/// Resolves rounds against a set of content tables.
#[derive(Debug, Clone)]
pub struct CombatEngine {
    config: EngineConfig,
    content: Content,
}

impl Default for CombatEngine {
    fn default() -> Self {
        Self::new(Content::standard())
    }
}

impl CombatEngine {
    pub fn new(content: Content) -> Self {
        Self {
            config: EngineConfig::default(),
            content,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Resolve one round and return the resulting state.
    ///
    /// Refuses with [`CombatError::CombatOver`] once a winner is set, and with
    /// [`CombatError::NoSpellSlot`] when the player casts a known leveled
    /// spell without a charged slot.
    pub fn resolve_round(
        &self,
        state: &CombatState,
        action: &Action,
        roller: &mut dyn DiceRoller,
    ) -> Result<CombatState, CombatError> {
        if state.is_over() {
            return Err(CombatError::CombatOver);
        }
        if let Action::CastSpell { spell_id } = action {
            if let Some(spell) = self.content.spells.get(spell_id) {
                let known = state.player.stats.resources.spells.contains(spell_id);
                if known && !can_cast(&state.player, spell) {
                    return Err(CombatError::NoSpellSlot {
                        spell: spell.name.clone(),
                        level: spell.level,
                    });
                }
            }
        }

        tracing::debug!(encounter = %state.id, turn = state.turn, ?action, "resolving round");

        let mut next = state.clone();
        Round {
            engine: self,
            state: &mut next,
            roller,
        }
        .run(action)?;

        if let Some(max) = self.config.max_log_entries {
            let excess = next.log.len().saturating_sub(max);
            next.log.drain(..excess);
        }

        tracing::debug!(
            encounter = %next.id,
            turn = next.turn,
            winner = ?next.winner,
            "round resolved"
        );
        Ok(next)
    }
}

/// Both combatants seen from one side.
struct Parties<'s> {
    actor: &'s mut dyn Combatant,
    opponent: &'s mut dyn Combatant,
    actor_conditions: &'s mut ConditionList,
    opponent_conditions: &'s mut ConditionList,
    actor_overlay: &'s mut i32,
    opponent_overlay: &'s mut i32,
}

fn parties(state: &mut CombatState, side: Side) -> Parties<'_> {
    let CombatState {
        player,
        enemy,
        conditions,
        ac_overlay,
        ..
    } = state;
    let player: &mut dyn Combatant = player;
    let enemy: &mut dyn Combatant = enemy;
    match side {
        Side::Player => Parties {
            actor: player,
            opponent: enemy,
            actor_conditions: &mut conditions.player,
            opponent_conditions: &mut conditions.enemy,
            actor_overlay: &mut ac_overlay.player,
            opponent_overlay: &mut ac_overlay.enemy,
        },
        Side::Enemy => Parties {
            actor: enemy,
            opponent: player,
            actor_conditions: &mut conditions.enemy,
            opponent_conditions: &mut conditions.player,
            actor_overlay: &mut ac_overlay.enemy,
            opponent_overlay: &mut ac_overlay.player,
        },
    }
}

/// One in-progress round over a working copy of the state.
struct Round<'a> {
    engine: &'a CombatEngine,
    state: &'a mut CombatState,
    roller: &'a mut dyn DiceRoller,
}

impl<'a> Round<'a> {
    fn run(mut self, action: &Action) -> Result<(), CombatError> {
        // The overlay is always empty on turn 1, so clearing first keeps a
        // combat-start hidden bonus alive for the enemy's first turn.
        self.state.ac_overlay[Side::Player] = 0;

        if self.state.turn == 1 {
            self.combat_start();
        }

        self.start_of_turn(Side::Player);
        if self.state.turn == 1 && !self.state.player.is_defeated() {
            self.fire_quirk(QuirkTrigger::TurnOne);
        }

        if !self.state.player.is_defeated() {
            self.player_turn(action)?;
            if self.state.is_over() {
                return Ok(());
            }
        }

        if self.state.enemy.is_defeated() {
            self.defeat(Side::Enemy);
            return Ok(());
        }
        if self.state.player.is_defeated() {
            self.defeat(Side::Player);
            return Ok(());
        }

        self.state.ac_overlay[Side::Enemy] = 0;
        self.start_of_turn(Side::Enemy);
        if self.state.enemy.is_defeated() {
            self.defeat(Side::Enemy);
            return Ok(());
        }

        if let Some(effect) = self.enemy_turn() {
            self.resolve_fumble(Side::Enemy, effect);
        }

        if self.state.enemy.is_defeated() {
            self.defeat(Side::Enemy);
            return Ok(());
        }
        if self.state.player.is_defeated() {
            self.defeat(Side::Player);
            return Ok(());
        }

        self.state.turn += 1;
        self.state.debug.force_enemy_spell = false;
        Ok(())
    }

    fn log(&mut self, actor: Actor, message: impl Into<String>) {
        self.state.push_log(actor, message);
    }

    fn name(&self, side: Side) -> String {
        self.state.combatant(side).name().to_string()
    }

    fn combat_start(&mut self) {
        let enemy = self.name(Side::Enemy);
        if let Some(taunt) = pick_taunt(&self.state.enemy.stats.taunts, TauntTrigger::CombatStart, self.roller) {
            let entry = LogEntry::new(self.state.turn, Actor::Enemy, format!("{enemy} squares up for a fight."))
                .with_taunt(Some(taunt));
            self.state.log.push(entry);
        }
        self.fire_quirk(QuirkTrigger::CombatStart);
    }

    /// Tick the side's conditions and apply damage over turn.
    fn start_of_turn(&mut self, side: Side) {
        let name = self.name(side);
        let expired = self.state.conditions[side].decrement();
        for condition in expired {
            self.log(Actor::System, format!("{name}'s {} wears off.", condition.kind));
        }

        let damage = self.state.conditions[side].apply_damage(self.roller);
        if damage.total > 0 {
            let taken = self.state.combatant_mut(side).take_damage(damage.total);
            let sources: Vec<String> = damage
                .breakdown
                .iter()
                .map(|(kind, amount)| format!("{kind} {amount}"))
                .collect();
            tracing::debug!(side = %side, taken, "damage over turn");
            self.log(
                Actor::System,
                format!("{name} takes {taken} damage ({}).", sources.join(", ")),
            );
        }
    }

    /// Fire the player's quirk if it has this trigger and has not fired yet.
    ///
    /// Returns the heal amount to apply if the triggering attack hits.
    fn fire_quirk(&mut self, trigger: QuirkTrigger) -> Option<i32> {
        if self.state.quirk_fired {
            return None;
        }
        let quirk = match &self.state.player.quirk {
            Some(quirk) if quirk.trigger == trigger => quirk.clone(),
            _ => return None,
        };
        self.state.quirk_fired = true;
        tracing::debug!(quirk = %quirk.id, ?trigger, "quirk fired");

        let name = self.name(Side::Player);
        self.log(Actor::System, quirk.announcement(&name));

        let turn = self.state.turn;
        match quirk.effect {
            QuirkEffect::AcBonus { amount, duration } => {
                let mut guard = Condition::new(ConditionKind::Guarded, turn, duration).with_modifiers(
                    ConditionModifiers {
                        ac_bonus: amount,
                        ..ConditionModifiers::default()
                    },
                );
                // Combat start precedes the player's first tick.
                if trigger == QuirkTrigger::CombatStart {
                    guard = guard.fresh();
                }
                self.state.conditions[Side::Player].apply_condition(guard);
                None
            }
            QuirkEffect::Heal { amount } if trigger == QuirkTrigger::FirstAttack => Some(amount),
            QuirkEffect::Heal { amount } => {
                self.state.player.heal(amount);
                None
            }
            QuirkEffect::HiddenAcBonus { amount } => {
                self.state.ac_overlay[Side::Player] += amount;
                None
            }
            QuirkEffect::AutoMissNextAttack => {
                self.state.enemy_auto_miss = true;
                None
            }
        }
    }

    // ------------------------------------------------------------------------
    // Player turn
    // ------------------------------------------------------------------------

    fn player_turn(&mut self, action: &Action) -> Result<(), CombatError> {
        let name = self.name(Side::Player);
        if self.state.recovering[Side::Player] {
            self.state.recovering[Side::Player] = false;
            self.log(Actor::Player, format!("{name} spends the turn recovering their weapon."));
            return Ok(());
        }
        if self.state.conditions[Side::Player].modifiers().prevent_actions {
            self.log(Actor::Player, format!("{name} is unable to act!"));
            return Ok(());
        }

        match action {
            Action::Attack { variant } => self.player_attack(variant.as_ref()),
            Action::UseAbility { ability_id } => self.player_ability(ability_id),
            Action::UseItem { item_id } => self.player_item(item_id),
            Action::CastSpell { spell_id } => self.cast(Side::Player, spell_id)?,
        }
        Ok(())
    }

    fn player_attack(&mut self, variant: Option<&AttackVariant>) {
        let name = self.name(Side::Player);
        let result = match variant {
            None => self.attack(Side::Player, None),
            Some(AttackVariant::PowerAttack) => {
                self.log(Actor::Player, format!("{name} winds up a Power Attack!"));
                self.attack(Side::Player, Some(&POWER_ATTACK))
            }
            Some(AttackVariant::Feat(feat_id)) => match self.attack_feat(feat_id) {
                Some(effect) => {
                    let result = self.attack(Side::Player, Some(&effect.attack_modifiers()));
                    self.apply_feat(effect, result.hit);
                    result
                }
                None => self.attack(Side::Player, None),
            },
        };

        if let Some(effect) = result.fumble {
            self.resolve_fumble(Side::Player, effect);
        }
    }

    /// Validate and pay for an attack feat. `None` falls back to a plain attack.
    fn attack_feat(&mut self, feat_id: &str) -> Option<&'a FeatEffect> {
        let engine = self.engine;
        let name = self.name(Side::Player);
        let Some(effect) = engine.content.feats.get(feat_id) else {
            tracing::warn!(feat = %feat_id, "unknown feat");
            self.log(Actor::System, format!("Unknown feat '{feat_id}'."));
            return None;
        };
        if effect.usage != FeatUsage::Attack {
            self.log(Actor::System, format!("{} cannot be used with an attack.", effect.name));
            return None;
        }
        if !self.state.player.feats.iter().any(|f| f == feat_id) {
            self.log(Actor::System, format!("{name} does not know {}.", effect.name));
            return None;
        }
        if !pay_feat_cost(effect, &mut self.state.player) {
            self.log(Actor::System, AbilityOutcome::unavailable(&effect.name).summary);
            return None;
        }
        self.log(Actor::Player, format!("{name} uses {}!", effect.name));
        Some(effect)
    }

    fn apply_feat(&mut self, effect: &FeatEffect, landed: bool) {
        let turn = self.state.turn;
        let outcome = {
            let p = parties(self.state, Side::Player);
            apply_feat_effect(
                effect,
                FeatTargets {
                    user: p.actor,
                    user_conditions: p.actor_conditions,
                    user_ac_overlay: p.actor_overlay,
                    opponent_conditions: p.opponent_conditions,
                    turn,
                },
                landed,
                self.roller,
            )
        };
        if outcome.healed > 0 || outcome.ac_bonus != 0 || !outcome.conditions_applied.is_empty() {
            self.log(Actor::Player, outcome.summary);
        }
    }

    fn player_ability(&mut self, ability_id: &str) {
        let engine = self.engine;
        let name = self.name(Side::Player);
        let turn = self.state.turn;

        if let Some(builtin) = BuiltinAbility::from_id(ability_id) {
            let outcome = {
                let state = &mut *self.state;
                use_builtin_ability(
                    builtin,
                    &mut state.player,
                    &mut state.conditions.player,
                    turn,
                    self.roller,
                )
            };
            let actor = if outcome.used { Actor::Player } else { Actor::System };
            self.log(actor, outcome.summary);
            return;
        }

        match engine.content.feats.get(ability_id) {
            Some(effect) if effect.usage == FeatUsage::Ability => {
                if !self.state.player.feats.iter().any(|f| f == ability_id) {
                    self.log(Actor::System, format!("{name} does not know {}.", effect.name));
                } else if !pay_feat_cost(effect, &mut self.state.player) {
                    self.log(Actor::System, AbilityOutcome::unavailable(&effect.name).summary);
                } else {
                    let outcome = {
                        let p = parties(self.state, Side::Player);
                        apply_feat_effect(
                            effect,
                            FeatTargets {
                                user: p.actor,
                                user_conditions: p.actor_conditions,
                                user_ac_overlay: p.actor_overlay,
                                opponent_conditions: p.opponent_conditions,
                                turn,
                            },
                            true,
                            self.roller,
                        )
                    };
                    self.log(Actor::Player, outcome.summary);
                }
            }
            Some(effect) => {
                self.log(Actor::System, format!("{} must be used with an attack.", effect.name));
            }
            None => {
                tracing::warn!(ability = %ability_id, "unknown ability");
                self.log(Actor::System, format!("Unknown ability '{ability_id}'."));
            }
        }
    }

    fn player_item(&mut self, item_id: &str) {
        let engine = self.engine;
        let name = self.name(Side::Player);
        let Some(item) = engine.content.items.get(item_id) else {
            tracing::warn!(item = %item_id, "unknown item");
            self.log(Actor::System, format!("Unknown item '{item_id}'."));
            return;
        };
        if !self.state.player.inventory.remove_one(item_id) {
            self.log(Actor::System, format!("{name} has no {} left.", item.name));
            return;
        }

        let turn = self.state.turn;
        let outcome = {
            let state = &mut *self.state;
            use_item(
                item,
                ItemTargets {
                    user: &mut state.player,
                    user_conditions: &mut state.conditions.player,
                    opponent: &mut state.enemy,
                    turn,
                },
                self.roller,
            )
        };
        self.log(Actor::Player, outcome.summary);
        if outcome.escaped {
            self.state.winner = Some(Side::Player);
        }
    }

    // ------------------------------------------------------------------------
    // Shared by both sides
    // ------------------------------------------------------------------------

    /// Resolve an attack by `side` and log it. Enemy attacks consume the
    /// first-attack quirk and any pending auto-miss.
    fn attack(&mut self, side: Side, modifiers: Option<&AttackModifiers>) -> AttackResult {
        let mut heal_on_hit = None;
        let mut auto_miss = false;
        if side == Side::Enemy {
            if !self.state.first_enemy_attack_seen {
                self.state.first_enemy_attack_seen = true;
                heal_on_hit = self.fire_quirk(QuirkTrigger::FirstAttack);
            }
            auto_miss = std::mem::take(&mut self.state.enemy_auto_miss);
        }

        let engine = self.engine;
        let turn = self.state.turn;
        let result = {
            let p = parties(self.state, side);
            let mut ctx = AttackContext::new(self.roller)
                .with_auto_miss(auto_miss)
                .with_defender_ac_overlay(*p.opponent_overlay)
                .with_unarmed_damage(&engine.config.unarmed_damage);
            perform_attack(
                &*p.actor,
                &mut *p.opponent,
                p.actor_conditions,
                p.opponent_conditions,
                modifiers,
                &mut ctx,
            )
        };
        self.state
            .log
            .push(LogEntry::new(turn, side.into(), result.message.clone()).with_taunt(result.taunt.clone()));

        if result.hit {
            if let Some(amount) = heal_on_hit {
                let name = self.name(Side::Player);
                let healed = self.state.player.heal(amount);
                self.log(Actor::System, format!("{name} shrugs off the blow and recovers {healed} HP."));
            }
        }
        result
    }

    /// Cast a spell known to `side` at its opponent.
    fn cast(&mut self, side: Side, spell_id: &str) -> Result<(), CombatError> {
        let engine = self.engine;
        let name = self.name(side);
        let Some(spell) = engine.content.spells.get(spell_id) else {
            tracing::warn!(spell = %spell_id, "unknown spell");
            self.log(Actor::System, format!("Unknown spell '{spell_id}'."));
            return Ok(());
        };
        if !self.state.combatant(side).stats().resources.spells.iter().any(|s| s == spell_id) {
            self.log(Actor::System, format!("{name} does not know {}.", spell.name));
            return Ok(());
        }

        let turn = self.state.turn;
        let result = {
            let p = parties(self.state, side);
            cast_spell(
                SpellTargets {
                    caster: p.actor,
                    caster_conditions: p.actor_conditions,
                    target: p.opponent,
                    target_conditions: p.opponent_conditions,
                    target_ac_overlay: *p.opponent_overlay,
                    turn,
                },
                spell,
                self.roller,
            )?
        };
        self.log(side.into(), result.output);
        Ok(())
    }

    fn resolve_fumble(&mut self, side: Side, effect: FumbleEffect) {
        let name = self.name(side);
        let turn = self.state.turn;
        match effect {
            FumbleEffect::DropWeapon => {
                self.state.recovering[side] = true;
                self.log(
                    Actor::System,
                    format!("{name} will spend their next turn recovering their weapon."),
                );
            }
            FumbleEffect::HitSelf => {
                let roll = roll_with_fallback(self.roller, "1d4", "1");
                let taken = self.state.combatant_mut(side).take_damage(roll.total.max(1));
                self.log(Actor::System, format!("{name} takes {taken} damage from their own blow."));
            }
            FumbleEffect::OffBalance => {
                self.state.conditions[side].apply(ConditionKind::OffBalance, turn, 1);
                self.log(Actor::System, format!("{name} is off balance (-2 AC) until their next turn."));
            }
            FumbleEffect::Opening => {
                let opponent = self.name(side.opponent());
                self.log(Actor::System, format!("{opponent} seizes the opening for a free attack!"));
                let free = self.attack(side.opponent(), None);
                if free.fumble.is_some() {
                    self.log(Actor::System, format!("{opponent} squanders the opening."));
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Enemy turn
    // ------------------------------------------------------------------------

    /// Run the enemy's turn and return a fumble to resolve afterwards.
    fn enemy_turn(&mut self) -> Option<FumbleEffect> {
        let name = self.name(Side::Enemy);
        if self.state.recovering[Side::Enemy] {
            self.state.recovering[Side::Enemy] = false;
            self.log(Actor::Enemy, format!("{name} scrambles to recover their weapon."));
            return None;
        }
        if self.state.conditions[Side::Enemy].modifiers().prevent_actions {
            self.log(Actor::Enemy, format!("{name} is unable to act!"));
            return None;
        }

        let engine = self.engine;
        let spells = engine.content.spells.resolve(&self.state.enemy.stats.resources.spells);
        let force = engine.config.debug_overrides && self.state.debug.force_enemy_spell;
        match select_enemy_action(&self.state.enemy, &spells, force, self.roller) {
            EnemyAction::Attack => self.attack(Side::Enemy, None).fumble,
            EnemyAction::CastSpell(spell_id) => {
                if let Err(err) = self.cast(Side::Enemy, &spell_id) {
                    tracing::warn!(%err, "enemy spell refused");
                    self.log(Actor::System, format!("{name} fails to cast: {err}."));
                }
                None
            }
        }
    }

    fn defeat(&mut self, loser: Side) {
        let name = self.name(loser);
        tracing::debug!(encounter = %self.state.id, loser = %loser, "combatant defeated");
        match loser {
            Side::Enemy => {
                self.log(Actor::System, format!("{name} is defeated!"));
                self.award_loot();
            }
            Side::Player => {
                self.log(Actor::System, format!("{name} has been defeated!"));
            }
        }
        self.state.winner = Some(loser.opponent());
    }

    /// Roll the enemy's loot table once and log the result.
    fn award_loot(&mut self) {
        let engine = self.engine;
        let table_id = self.state.enemy.loot_table.clone();
        let table = table_id.as_deref().and_then(|id| {
            let table = engine.content.loot_tables.get(id);
            if table.is_none() {
                tracing::warn!(table = %id, "unknown loot table");
            }
            table
        });

        match table.and_then(|table| roll_loot(table, self.roller)) {
            Some(drop) => {
                let player = &mut self.state.player;
                player.gold += drop.gold;
                if let Some(item_id) = &drop.item_id {
                    player.inventory.add(item_id, 1);
                }
                let name = player.stats.name.clone();
                self.log(Actor::System, format!("{name} obtained {drop}."));
            }
            None => self.log(Actor::System, "No loot was found."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::{CombatStats, Character, Creature, SpellSlots};
    use crate::quirks::Quirk;
    use crate::state::DebugFlags;
    use crate::testing::{sample_fighter, sample_goblin, ScriptedRoller};

    fn engine() -> CombatEngine {
        CombatEngine::default()
    }

    #[test]
    fn test_finished_combat_is_refused() {
        let mut state = CombatState::new(sample_fighter(), sample_goblin());
        state.winner = Some(Side::Player);
        let mut roller = ScriptedRoller::new(1);
        assert_eq!(
            engine().resolve_round(&state, &Action::attack(), &mut roller),
            Err(CombatError::CombatOver)
        );
    }

    #[test]
    fn test_missing_slot_aborts_unchanged() {
        let player = Character::new(
            CombatStats::new("Elara", 14, 12).with_spells(vec!["magic_missile".into()], SpellSlots::new()),
        );
        let state = CombatState::new(player, sample_goblin());
        let mut roller = ScriptedRoller::new(1);
        let err = engine()
            .resolve_round(&state, &Action::cast_spell("magic_missile"), &mut roller)
            .unwrap_err();
        assert_eq!(
            err,
            CombatError::NoSpellSlot {
                spell: "Magic Missile".to_string(),
                level: 1
            }
        );
        assert_eq!(roller.dice_drawn(), 0);
    }

    #[test]
    fn test_unknown_ids_are_logged_no_ops() {
        let state = CombatState::new(sample_fighter(), sample_goblin());
        for action in [
            Action::use_item("moon_rock"),
            Action::use_ability("flight"),
            Action::cast_spell("wish"),
        ] {
            let mut roller = ScriptedRoller::new(3).with_rolls([2]);
            let next = engine().resolve_round(&state, &action, &mut roller).unwrap();
            assert_eq!(next.log[0].actor, Actor::System);
            assert!(next.log[0].message.starts_with("Unknown"));
            assert_eq!(next.enemy.stats.hp, state.enemy.stats.hp);
            assert_eq!(next.turn, 2);
        }
    }

    #[test]
    fn test_stunned_player_draws_nothing() {
        let mut state = CombatState::new(sample_fighter(), sample_goblin());
        state.conditions[Side::Player].apply(ConditionKind::Stunned, 1, 2);
        // Only the enemy's d20 is queued; a player draw would consume it.
        let mut roller = ScriptedRoller::new(3).with_rolls([2]);
        let next = engine().resolve_round(&state, &Action::attack(), &mut roller).unwrap();
        assert!(next.log[0].message.contains("unable to act"));
        assert_eq!(next.log[1].actor, Actor::Enemy);
        assert!(next.log[1].message.contains("misses"));
    }

    #[test]
    fn test_drop_weapon_costs_next_turn() {
        let state = CombatState::new(sample_fighter(), sample_goblin());
        // Player fumbles (d4 = 1, drop weapon); goblin misses.
        let mut roller = ScriptedRoller::new(3).with_rolls([1, 1, 2]);
        let next = engine().resolve_round(&state, &Action::attack(), &mut roller).unwrap();
        assert!(next.recovering[Side::Player]);

        let mut roller = ScriptedRoller::new(3).with_rolls([2]);
        let after = engine().resolve_round(&next, &Action::attack(), &mut roller).unwrap();
        assert!(!after.recovering[Side::Player]);
        let new_lines = &after.log[next.log.len()..];
        assert!(new_lines[0].message.contains("recovering their weapon"));
        assert_eq!(after.enemy.stats.hp, state.enemy.stats.hp);
    }

    #[test]
    fn test_opening_gives_enemy_free_attack() {
        let state = CombatState::new(sample_fighter(), sample_goblin());
        // Player fumbles into an opening; goblin's free attack misses, then its
        // scheduled attack misses.
        let mut roller = ScriptedRoller::new(3).with_rolls([1, 4, 2, 2]);
        let next = engine().resolve_round(&state, &Action::attack(), &mut roller).unwrap();
        let enemy_lines = next.log.iter().filter(|e| e.actor == Actor::Enemy).count();
        assert_eq!(enemy_lines, 2);
        assert!(next.log.iter().any(|e| e.message.contains("seizes the opening")));
    }

    #[test]
    fn test_auto_miss_quirk_draws_no_roll() {
        let player = sample_fighter().with_quirk(Quirk::new(
            "street_instincts",
            "Street Instincts",
            QuirkTrigger::FirstAttack,
            QuirkEffect::AutoMissNextAttack,
        ));
        let state = CombatState::new(player, sample_goblin());
        // Player misses with a 2; the goblin attack must not draw.
        let mut roller = ScriptedRoller::new(3).with_rolls([2]);
        let next = engine().resolve_round(&state, &Action::attack(), &mut roller).unwrap();
        assert_eq!(roller.dice_drawn(), 1);
        assert!(next.quirk_fired);
        assert!(!next.enemy_auto_miss);
        assert_eq!(next.player.stats.hp, state.player.stats.hp);
    }

    #[test]
    fn test_first_attack_heal_applies_on_hit() {
        let player = sample_fighter()
            .with_quirk(Quirk::new(
                "acolyte_prayer",
                "Acolyte's Prayer",
                QuirkTrigger::FirstAttack,
                QuirkEffect::Heal { amount: 3 },
            ));
        let mut state = CombatState::new(player, sample_goblin());
        state.player.stats.hp = 10;
        // Player misses; goblin hits with a 19 for 4.
        let mut roller = ScriptedRoller::new(3).with_rolls([2, 19, 4]);
        let next = engine().resolve_round(&state, &Action::attack(), &mut roller).unwrap();
        assert_eq!(next.player.stats.hp, 9);
    }

    #[test]
    fn test_combat_start_quirk_fires_once() {
        let player = sample_fighter().with_quirk(Quirk::new(
            "soldier_drill",
            "Soldier's Drill",
            QuirkTrigger::CombatStart,
            QuirkEffect::AcBonus { amount: 2, duration: 3 },
        ));
        let state = CombatState::new(player, sample_goblin());
        let mut roller = ScriptedRoller::new(3).with_rolls([2, 2, 2, 2]);
        let next = engine().resolve_round(&state, &Action::attack(), &mut roller).unwrap();
        let after = engine().resolve_round(&next, &Action::attack(), &mut roller).unwrap();
        let fired = after
            .log
            .iter()
            .filter(|e| e.message.contains("Soldier's Drill"))
            .count();
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_force_enemy_spell_requires_debug_overrides() {
        let goblin = Creature::new(
            CombatStats::new("Hexer", 12, 12)
                .with_spells(vec!["acid_splash".into()], SpellSlots::new()),
        );
        let state = CombatState::new(sample_fighter(), goblin).with_debug_flags(DebugFlags {
            force_enemy_spell: true,
        });

        // Player misses with 2; flip says attack; forced cast ignored.
        let mut roller = ScriptedRoller::new(3).with_rolls([2, 2]).with_flips([false]);
        let next = engine().resolve_round(&state, &Action::attack(), &mut roller).unwrap();
        assert!(next.log.iter().any(|e| e.actor == Actor::Enemy && e.message.contains("misses")));
        assert!(!next.debug.force_enemy_spell);

        let debug_engine = engine().with_config(EngineConfig::new().with_debug_overrides(true));
        let mut roller = ScriptedRoller::new(3).with_rolls([2, 3]).with_flips([false]);
        let next = debug_engine.resolve_round(&state, &Action::attack(), &mut roller).unwrap();
        assert!(next.log.iter().any(|e| e.message.contains("Acid Splash")));
        assert_eq!(roller.pending_flips(), 1);
    }

    #[test]
    fn test_power_attack_trade() {
        let state = CombatState::new(sample_fighter(), sample_goblin());
        // 15 + 1 BAB + 3 STR - 2 = 17 hits; 12 damage drops the goblin.
        let mut roller = ScriptedRoller::new(3).with_rolls([15, 12]);
        let next = engine().resolve_round(&state, &Action::power_attack(), &mut roller).unwrap();
        assert!(next.log[0].message.contains("Power Attack"));
        assert_eq!(next.winner, Some(Side::Player));
    }

    #[test]
    fn test_max_log_entries() {
        let state = CombatState::new(sample_fighter(), sample_goblin());
        let engine = engine().with_config(EngineConfig::new().with_max_log_entries(1));
        let mut roller = ScriptedRoller::new(3).with_rolls([2, 2]);
        let next = engine.resolve_round(&state, &Action::attack(), &mut roller).unwrap();
        assert_eq!(next.log.len(), 1);
        assert_eq!(next.log[0].actor, Actor::Enemy);
    }

    #[test]
    fn test_action_json() {
        let action: Action = serde_json::from_str(r#"{"type": "attack"}"#).unwrap();
        assert_eq!(action, Action::attack());
        let action: Action =
            serde_json::from_str(r#"{"type": "attack", "variant": {"feat": "cleave"}}"#).unwrap();
        assert_eq!(action, Action::feat_attack("cleave"));
        let action: Action = serde_json::from_str(r#"{"type": "use_item", "item_id": "antidote"}"#).unwrap();
        assert_eq!(action, Action::use_item("antidote"));
    }
}
