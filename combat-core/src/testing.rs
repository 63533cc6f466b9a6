//! Testing utilities for the combat engine.
//!
//! This module provides tools for deterministic tests:
//! - `ScriptedRoller` for queued dice, picks and coin flips
//! - `TestHarness` for driving an encounter round by round
//! - Sample combatants and assertion helpers

use crate::abilities::{AbilityCharge, RefreshClass};
use crate::combatant::{AbilityScores, Character, CombatStats, Creature};
use crate::conditions::ConditionKind;
use crate::dice::{DiceExpression, DiceRoller, RollResult};
use crate::engine::{Action, CombatEngine, CombatError};
use crate::items::get_weapon;
use crate::state::{CombatState, Side};
use crate::taunts::{TauntPool, TauntTrigger};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// A roller that replays queued values before falling back to a seeded RNG.
///
/// A queued roll replaces the natural value of the next `d20` or the total of
/// the next formula roll, whichever comes first.
pub struct ScriptedRoller {
    rng: StdRng,
    rolls: VecDeque<i32>,
    picks: VecDeque<usize>,
    flips: VecDeque<bool>,
    dice_drawn: usize,
}

impl ScriptedRoller {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            rolls: VecDeque::new(),
            picks: VecDeque::new(),
            flips: VecDeque::new(),
            dice_drawn: 0,
        }
    }

    pub fn with_rolls(mut self, rolls: impl IntoIterator<Item = i32>) -> Self {
        self.rolls.extend(rolls);
        self
    }

    pub fn with_picks(mut self, picks: impl IntoIterator<Item = usize>) -> Self {
        self.picks.extend(picks);
        self
    }

    pub fn with_flips(mut self, flips: impl IntoIterator<Item = bool>) -> Self {
        self.flips.extend(flips);
        self
    }

    /// Queue one more forced roll.
    pub fn force_next(&mut self, value: i32) {
        self.rolls.push_back(value);
    }

    /// Number of d20s and formulas drawn so far.
    pub fn dice_drawn(&self) -> usize {
        self.dice_drawn
    }

    pub fn pending_rolls(&self) -> usize {
        self.rolls.len()
    }

    pub fn pending_picks(&self) -> usize {
        self.picks.len()
    }

    pub fn pending_flips(&self) -> usize {
        self.flips.len()
    }
}

impl DiceRoller for ScriptedRoller {
    fn d20(&mut self) -> u32 {
        self.dice_drawn += 1;
        match self.rolls.pop_front() {
            Some(forced) => forced.clamp(1, 20) as u32,
            None => self.rng.gen_range(1..=20),
        }
    }

    fn roll(&mut self, expr: &DiceExpression) -> RollResult {
        self.dice_drawn += 1;
        match self.rolls.pop_front() {
            Some(forced) => RollResult::fixed(expr.clone(), forced),
            None => expr.roll_with_rng(&mut self.rng),
        }
    }

    fn pick(&mut self, len: usize) -> usize {
        match self.picks.pop_front() {
            Some(forced) => forced.min(len.saturating_sub(1)),
            None => self.rng.gen_range(0..len.max(1)),
        }
    }

    fn coin_flip(&mut self) -> bool {
        self.flips.pop_front().unwrap_or_else(|| self.rng.gen_bool(0.5))
    }
}

// ============================================================================
// Sample combatants
// ============================================================================

/// Level 1 fighter: 15 HP, AC 15, BAB +1, STR 16, longsword.
pub fn sample_fighter() -> Character {
    let mut stats = CombatStats::new("Roland", 15, 15)
        .with_base_attack_bonus(1)
        .with_ability_scores(AbilityScores::new(16, 12, 14, 10, 10, 8))
        .with_abilities(vec![
            AbilityCharge::new("second_wind", "Second Wind", RefreshClass::PerEncounter, 1),
            AbilityCharge::new("defensive_stance", "Defensive Stance", RefreshClass::Unlimited, 0),
        ]);
    stats.equipment.weapon = get_weapon("longsword");
    Character::new(stats).with_gold(20).with_item("healing_potion", 1)
}

/// Goblin: 10 HP, AC 15, BAB +1, DEX 14 with a scimitar.
pub fn sample_goblin() -> Creature {
    let mut stats = CombatStats::new("Goblin", 10, 15)
        .with_base_attack_bonus(1)
        .with_ability_scores(AbilityScores::new(8, 14, 10, 10, 8, 8))
        .with_taunts(
            TauntPool::new()
                .with_lines(TauntTrigger::Struck, ["Ow! You'll pay for that!"])
                .with_lines(TauntTrigger::Dodged, ["Too slow!", "Hah! Missed!"]),
        );
    stats.equipment.weapon = get_weapon("scimitar");
    Creature::new(stats).with_loot_table("goblin")
}

// ============================================================================
// Test harness
// ============================================================================

/// Drives one encounter with a scripted roller.
pub struct TestHarness {
    pub engine: CombatEngine,
    pub state: CombatState,
    pub roller: ScriptedRoller,
}

impl TestHarness {
    pub fn new(player: Character, enemy: Creature) -> Self {
        Self {
            engine: CombatEngine::default(),
            state: CombatState::new(player, enemy),
            roller: ScriptedRoller::new(42),
        }
    }

    pub fn with_engine(mut self, engine: CombatEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Queue forced rolls for the next rounds.
    pub fn queue_rolls(&mut self, rolls: impl IntoIterator<Item = i32>) {
        self.roller.rolls.extend(rolls);
    }

    /// Resolve one round, keeping the new state on success.
    pub fn act(&mut self, action: Action) -> Result<&CombatState, CombatError> {
        self.state = self.engine.resolve_round(&self.state, &action, &mut self.roller)?;
        Ok(&self.state)
    }

    pub fn player_hp(&self) -> (i32, i32) {
        (self.state.player.stats.hp, self.state.player.stats.max_hp)
    }

    pub fn log_messages(&self) -> Vec<&str> {
        self.state.log.iter().map(|e| e.message.as_str()).collect()
    }
}

// ============================================================================
// Assertion helpers
// ============================================================================

/// Assert player HP is at expected values.
#[track_caller]
pub fn assert_hp(harness: &TestHarness, current: i32, max: i32) {
    let (actual_current, actual_max) = harness.player_hp();
    assert_eq!(
        (actual_current, actual_max),
        (current, max),
        "Expected HP {current}/{max}, got {actual_current}/{actual_max}"
    );
}

/// Assert the encounter ended with `side` winning.
#[track_caller]
pub fn assert_winner(harness: &TestHarness, side: Side) {
    assert_eq!(
        harness.state.winner,
        Some(side),
        "Expected {side} to win, got {:?}",
        harness.state.winner
    );
}

/// Assert the encounter is still running.
#[track_caller]
pub fn assert_ongoing(harness: &TestHarness) {
    assert!(
        harness.state.winner.is_none(),
        "Expected combat to continue, but {:?} won",
        harness.state.winner
    );
}

/// Assert some log line contains `needle`.
#[track_caller]
pub fn assert_log_contains(harness: &TestHarness, needle: &str) {
    assert!(
        harness.state.log.iter().any(|e| e.message.contains(needle)),
        "Expected a log line containing '{needle}', got {:#?}",
        harness.log_messages()
    );
}

/// Assert `side` currently has a condition.
#[track_caller]
pub fn assert_condition(harness: &TestHarness, side: Side, kind: ConditionKind) {
    assert!(
        harness.state.conditions[side].contains(kind),
        "Expected {side} to be {kind}"
    );
}
