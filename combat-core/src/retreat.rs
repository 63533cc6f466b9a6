//! Fleeing an encounter.

use crate::combatant::Character;
use crate::engine::CombatError;
use crate::state::CombatState;

/// Result of a successful retreat, routed to the narrative layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetreatOutcome {
    pub player: Character,
    pub narrative_flag: Option<String>,
    pub destination_node: Option<String>,
}

/// Leave the fight, paying the encounter's retreat penalties.
///
/// Gold never goes below zero and hp never below 1.
pub fn handle_retreat(state: &CombatState) -> Result<RetreatOutcome, CombatError> {
    let config = &state.retreat;
    if !config.can_retreat {
        return Err(CombatError::RetreatNotAllowed);
    }

    let mut player = state.player.clone();
    player.gold = player.gold.saturating_sub(config.gold_penalty);
    player.stats.hp = (player.stats.hp - config.hp_penalty.max(0)).max(1);

    tracing::debug!(
        encounter = %state.id,
        gold = player.gold,
        hp = player.stats.hp,
        "player retreated"
    );

    Ok(RetreatOutcome {
        player,
        narrative_flag: config.narrative_flag.clone(),
        destination_node: config.destination_node.clone(),
    })
}
