//! End-to-end round scenarios driven by scripted dice.

use combat_core::abilities::AbilityCharge;
use combat_core::abilities::RefreshClass;
use combat_core::combatant::SpellSlots;
use combat_core::conditions::ConditionKind;
use combat_core::quirks::{Quirk, QuirkEffect, QuirkTrigger};
use combat_core::taunts::{TauntPool, TauntTrigger};
use combat_core::testing::{
    assert_condition, assert_hp, assert_log_contains, assert_ongoing, assert_winner, sample_fighter,
    sample_goblin, ScriptedRoller, TestHarness,
};
use combat_core::{handle_retreat, Action, Actor, CombatEngine, CombatError, CombatState, RetreatConfig, Side};

fn engine() -> CombatEngine {
    CombatEngine::default()
}

#[test]
fn player_hit_leaves_enemy_standing_and_enemy_still_acts() {
    let state = CombatState::new(sample_fighter(), sample_goblin());
    // 16 + 1 BAB + 3 STR = 20 vs AC 15; 5 damage; goblin swings with a 2.
    let mut roller = ScriptedRoller::new(1).with_rolls([16, 5, 2]);

    let next = engine().resolve_round(&state, &Action::attack(), &mut roller).unwrap();

    assert_eq!(next.enemy.stats.hp, 5);
    assert_eq!(next.log[0].actor, Actor::Player);
    let enemy_line = next.log.iter().position(|e| e.actor == Actor::Enemy);
    assert!(enemy_line.is_some_and(|i| i > 0));
    assert_eq!(next.turn, 2);
    assert!(next.winner.is_none());
}

#[test]
fn killing_blow_skips_enemy_turn_and_rolls_loot() {
    let mut state = CombatState::new(sample_fighter(), sample_goblin());
    state.enemy.stats.hp = 3;
    let mut roller = ScriptedRoller::new(1).with_rolls([16, 8]);

    let next = engine().resolve_round(&state, &Action::attack(), &mut roller).unwrap();

    assert_eq!(next.winner, Some(Side::Player));
    assert_eq!(next.log.len(), 3);
    assert_eq!(next.log[0].actor, Actor::Player);
    assert_eq!(next.log[1].actor, Actor::System);
    assert!(next.log[1].message.contains("defeated"));
    assert_eq!(next.log[2].actor, Actor::System);
    assert!(next.log[2].message.contains("obtained") || next.log[2].message.contains("No loot"));
    assert!(next.log.iter().all(|e| e.actor != Actor::Enemy));
    assert_eq!(next.turn, 1);
}

#[test]
fn exhausted_self_heal_does_nothing_but_round_continues() {
    let mut state = CombatState::new(sample_fighter(), sample_goblin());
    state.player.stats.hp = 8;
    state.player.stats.resources.abilities[0].uses = 0;
    let mut roller = ScriptedRoller::new(1).with_rolls([2]);

    let next = engine()
        .resolve_round(&state, &Action::use_ability("second_wind"), &mut roller)
        .unwrap();

    assert_eq!(next.player.stats.hp, 8);
    assert_eq!(next.log[0].actor, Actor::System);
    assert!(next.log[0].message.contains("cannot be used"));
    assert!(next.log.iter().any(|e| e.actor == Actor::Enemy));
    assert_eq!(next.turn, 2);
}

#[test]
fn retreat_respects_configuration() {
    let state = CombatState::new(sample_fighter(), sample_goblin());
    let before = state.clone();
    assert_eq!(handle_retreat(&state), Err(CombatError::RetreatNotAllowed));
    assert_eq!(state, before);

    let mut state = state.with_retreat(
        RetreatConfig::allowed()
            .with_gold_penalty(5)
            .with_hp_penalty(4)
            .with_destination("village_gate"),
    );
    state.player.stats.hp = 3;
    let outcome = handle_retreat(&state).unwrap();
    assert_eq!(outcome.player.gold, 15);
    assert_eq!(outcome.player.stats.hp, 1);
    assert_eq!(outcome.destination_node.as_deref(), Some("village_gate"));
}

#[test]
fn resolve_round_never_mutates_input() {
    let state = CombatState::new(sample_fighter(), sample_goblin());
    let before = state.clone();
    let mut roller = ScriptedRoller::new(9);

    let next = engine().resolve_round(&state, &Action::attack(), &mut roller).unwrap();

    assert_eq!(state, before);
    assert!(state.log.is_empty());
    assert!(!next.log.is_empty());
}

#[test]
fn turn_one_quirk_never_fires_twice() {
    let player = sample_fighter().with_quirk(Quirk::new(
        "hunters_patience",
        "Hunter's Patience",
        QuirkTrigger::TurnOne,
        QuirkEffect::HiddenAcBonus { amount: 2 },
    ));
    let state = CombatState::new(player, sample_goblin());
    let mut roller = ScriptedRoller::new(4).with_rolls([2, 2, 2, 2]);

    let mut next = engine().resolve_round(&state, &Action::attack(), &mut roller).unwrap();
    assert!(next.quirk_fired);
    // Replay turn 1 with the fired flag carried over.
    next.turn = 1;
    let again = engine().resolve_round(&next, &Action::attack(), &mut roller).unwrap();

    let fired = again
        .log
        .iter()
        .filter(|e| e.message.contains("Hunter's Patience"))
        .count();
    assert_eq!(fired, 1);
}

#[test]
fn hidden_ac_bonus_covers_the_enemy_turn() {
    let player = sample_fighter().with_quirk(Quirk::new(
        "hunters_patience",
        "Hunter's Patience",
        QuirkTrigger::TurnOne,
        QuirkEffect::HiddenAcBonus { amount: 2 },
    ));
    let state = CombatState::new(player, sample_goblin());
    // Goblin rolls 13: 13 + 3 = 16 would hit AC 15 but not AC 17.
    let mut roller = ScriptedRoller::new(4).with_rolls([2, 13]);
    let next = engine().resolve_round(&state, &Action::attack(), &mut roller).unwrap();
    assert_eq!(next.player.stats.hp, 15);
    assert_eq!(next.ac_overlay[Side::Player], 2);
}

#[test]
fn combat_start_taunt_opens_the_log() {
    let mut goblin = sample_goblin();
    goblin.stats.taunts = TauntPool::new().with_lines(TauntTrigger::CombatStart, ["Fresh meat!"]);
    let state = CombatState::new(sample_fighter(), goblin);
    let mut roller = ScriptedRoller::new(4).with_rolls([2, 2]);

    let next = engine().resolve_round(&state, &Action::attack(), &mut roller).unwrap();
    assert_eq!(next.log[0].actor, Actor::Enemy);
    assert_eq!(next.log[0].taunt.as_deref(), Some("Fresh meat!"));

    let later = engine().resolve_round(&next, &Action::attack(), &mut roller).unwrap();
    let taunts = later.log.iter().filter(|e| e.taunt.as_deref() == Some("Fresh meat!")).count();
    assert_eq!(taunts, 1);
}

#[test]
fn damage_over_turn_can_finish_the_enemy() {
    let mut state = CombatState::new(sample_fighter(), sample_goblin());
    state.enemy.stats.hp = 2;
    state.conditions[Side::Enemy].apply(ConditionKind::Burning, 1, 3);
    // Player misses, burning deals 4.
    let mut roller = ScriptedRoller::new(4).with_rolls([2, 4]);

    let next = engine().resolve_round(&state, &Action::attack(), &mut roller).unwrap();
    assert_eq!(next.winner, Some(Side::Player));
    assert!(next.log.iter().all(|e| e.actor != Actor::Enemy));
    assert!(next.log.iter().any(|e| e.message.contains("Burning 4")));
}

#[test]
fn enemy_fumble_opening_lets_player_finish_it() {
    let mut state = CombatState::new(sample_fighter(), sample_goblin());
    state.enemy.stats.hp = 3;
    // Player misses; goblin rolls a 1 into an opening; free attack lands for 8.
    let mut roller = ScriptedRoller::new(4).with_rolls([2, 1, 4, 16, 8]);

    let next = engine().resolve_round(&state, &Action::attack(), &mut roller).unwrap();
    assert_eq!(next.winner, Some(Side::Player));
    assert!(next.log.iter().any(|e| e.message.contains("seizes the opening")));
    assert!(next.log.iter().any(|e| e.message.contains("is defeated")));
}

#[test]
fn feat_attack_spends_charge_and_applies_condition() {
    let mut player = sample_fighter().with_feat("crippling_strike");
    player.stats.resources.abilities.push(AbilityCharge::new(
        "crippling_strike",
        "Crippling Strike",
        RefreshClass::PerEncounter,
        1,
    ));
    let mut harness = TestHarness::new(player, sample_goblin());
    // Hit for 3, goblin misses.
    harness.queue_rolls([16, 3, 2]);
    harness.act(Action::feat_attack("crippling_strike")).unwrap();

    assert_condition(&harness, Side::Enemy, ConditionKind::Weakened);
    assert_log_contains(&harness, "Crippling Strike");
    let charge = harness
        .state
        .player
        .stats
        .resources
        .abilities
        .iter()
        .find(|a| a.id == "crippling_strike")
        .unwrap();
    assert_eq!(charge.uses, 0);

    // Second use has no charge left: a plain attack instead.
    harness.queue_rolls([2, 2]);
    harness.act(Action::feat_attack("crippling_strike")).unwrap();
    assert_log_contains(&harness, "cannot be used right now");
    assert_ongoing(&harness);
}

#[test]
fn potion_heals_and_is_consumed() {
    let mut harness = TestHarness::new(sample_fighter(), sample_goblin());
    harness.state.player.stats.hp = 5;
    harness.queue_rolls([6, 2]);
    harness.act(Action::use_item("healing_potion")).unwrap();
    assert_hp(&harness, 11, 15);
    assert_eq!(harness.state.player.inventory.quantity("healing_potion"), 0);

    harness.queue_rolls([2]);
    harness.act(Action::use_item("healing_potion")).unwrap();
    assert_log_contains(&harness, "has no Potion of Healing left");
    assert_hp(&harness, 11, 15);
}

#[test]
fn smoke_bomb_ends_the_fight() {
    let player = sample_fighter().with_item("smoke_bomb", 1);
    let mut harness = TestHarness::new(player, sample_goblin());
    harness.act(Action::use_item("smoke_bomb")).unwrap();
    assert_winner(&harness, Side::Player);
    assert!(harness.state.log.iter().all(|e| e.actor != Actor::Enemy));
    assert_eq!(
        harness.act(Action::attack()).unwrap_err(),
        CombatError::CombatOver
    );
}

#[test]
fn player_death_ends_the_round() {
    let mut harness = TestHarness::new(sample_fighter(), sample_goblin());
    harness.state.player.stats.hp = 2;
    // Player misses; goblin hits with a 19 for 5.
    harness.queue_rolls([2, 19, 5]);
    harness.act(Action::attack()).unwrap();
    assert_winner(&harness, Side::Enemy);
    assert_log_contains(&harness, "has been defeated");
}

#[test]
fn damage_over_turn_death_blocks_turn_one_quirk() {
    let mut player = sample_fighter().with_quirk(Quirk::new(
        "second_breath",
        "Second Breath",
        QuirkTrigger::TurnOne,
        QuirkEffect::Heal { amount: 5 },
    ));
    player.stats.hp = 2;
    let mut state = CombatState::new(player, sample_goblin());
    state.conditions[Side::Player].apply(ConditionKind::Burning, 1, 3);
    // Burning deals 4.
    let mut roller = ScriptedRoller::new(4).with_rolls([4, 16, 5, 2]);

    let next = engine().resolve_round(&state, &Action::attack(), &mut roller).unwrap();
    assert_eq!(next.winner, Some(Side::Enemy));
    assert!(next.player.stats.hp <= 0);
    assert!(!next.quirk_fired);
    assert!(next.log.iter().all(|e| !e.message.contains("restores")));
    assert!(next.log.iter().all(|e| e.actor != Actor::Player));
    assert!(next.log.iter().all(|e| e.actor != Actor::Enemy));
}

#[test]
fn held_enemy_loses_its_next_action() {
    let mut player = sample_fighter();
    player.stats = player
        .stats
        .with_spells(vec!["hold_person".into()], SpellSlots::new().with_slots(2, 1));
    let mut harness = TestHarness::new(player, sample_goblin());
    // Will save of 2 against DC 12.
    harness.queue_rolls([2]);
    harness.act(Action::cast_spell("hold_person")).unwrap();

    assert_condition(&harness, Side::Enemy, ConditionKind::Stunned);
    assert_log_contains(&harness, "Goblin is unable to act!");
    let goblin_lines: Vec<_> = harness.state.log.iter().filter(|e| e.actor == Actor::Enemy).collect();
    assert_eq!(goblin_lines.len(), 1);
    assert_hp(&harness, 15, 15);

    // The hold lapses before the goblin's next turn and it swings again.
    harness.queue_rolls([2, 2]);
    harness.act(Action::attack()).unwrap();
    assert!(!harness.state.conditions[Side::Enemy].contains(ConditionKind::Stunned));
    assert_log_contains(&harness, "Stunned wears off");
    assert!(harness
        .state
        .log
        .iter()
        .any(|e| e.turn == 2 && e.actor == Actor::Enemy && e.message.contains("misses")));
}

#[test]
fn combat_start_guard_covers_two_enemy_attacks() {
    let player = sample_fighter().with_quirk(Quirk::new(
        "shield_wall",
        "Shield Wall",
        QuirkTrigger::CombatStart,
        QuirkEffect::AcBonus { amount: 2, duration: 2 },
    ));
    let mut harness = TestHarness::new(player, sample_goblin());
    // Goblin rolls 12 + 3 = 15 each round.
    harness.queue_rolls([2, 12]);
    harness.act(Action::attack()).unwrap();
    assert_condition(&harness, Side::Player, ConditionKind::Guarded);
    assert_log_contains(&harness, "(15 vs AC 17)");

    harness.queue_rolls([2, 12]);
    harness.act(Action::attack()).unwrap();
    assert_condition(&harness, Side::Player, ConditionKind::Guarded);
    assert_hp(&harness, 15, 15);

    harness.queue_rolls([2, 12, 3]);
    harness.act(Action::attack()).unwrap();
    assert!(!harness.state.conditions[Side::Player].contains(ConditionKind::Guarded));
    assert_log_contains(&harness, "(15 vs AC 15)");
    assert_hp(&harness, 12, 15);
}

#[test]
fn self_inflicted_fumble_defeat_skips_enemy_turn() {
    let mut state = CombatState::new(sample_fighter(), sample_goblin());
    state.player.stats.hp = 1;
    // Natural 1, fumble table 2 (hit self), 1d4 for 3.
    let mut roller = ScriptedRoller::new(4).with_rolls([1, 2, 3]);

    let next = engine().resolve_round(&state, &Action::attack(), &mut roller).unwrap();
    assert_eq!(next.winner, Some(Side::Enemy));
    assert!(next.log.iter().any(|e| e.message.contains("from their own blow")));
    assert!(next.log.iter().any(|e| e.message.contains("has been defeated")));
    assert!(next.log.iter().all(|e| e.actor != Actor::Enemy));
    assert_eq!(next.turn, 1);
}

#[test]
fn off_balance_lowers_ac_for_one_enemy_attack() {
    let mut harness = TestHarness::new(sample_fighter(), sample_goblin());
    // Natural 1, fumble table 3 (off balance); goblin 10 + 3 = 13 hits AC 13 for 4.
    harness.queue_rolls([1, 3, 10, 4]);
    harness.act(Action::attack()).unwrap();
    assert_condition(&harness, Side::Player, ConditionKind::OffBalance);
    assert_log_contains(&harness, "(13 vs AC 13)");
    assert_hp(&harness, 11, 15);

    harness.queue_rolls([2, 2]);
    harness.act(Action::attack()).unwrap();
    assert!(!harness.state.conditions[Side::Player].contains(ConditionKind::OffBalance));
    assert_log_contains(&harness, "(5 vs AC 15)");
    assert_hp(&harness, 11, 15);
}

#[test]
fn double_defeat_goes_to_the_player() {
    let mut state = CombatState::new(sample_fighter(), sample_goblin());
    state.turn = 2;
    state.player.stats.hp = 0;
    state.enemy.stats.hp = 0;
    let mut roller = ScriptedRoller::new(4);

    let next = engine().resolve_round(&state, &Action::attack(), &mut roller).unwrap();
    assert_eq!(next.winner, Some(Side::Player));
    assert!(next.log.iter().any(|e| e.message == "Goblin is defeated!"));
    assert!(next.log.iter().all(|e| !e.message.contains("has been defeated")));
    assert!(next.log.iter().all(|e| e.actor != Actor::Player && e.actor != Actor::Enemy));
}
