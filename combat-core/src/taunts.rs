//! Cosmetic taunt lines.
//!
//! Taunts are flavor only: picking one draws from the roller's `pick`, never
//! from a dice roll, and never changes a numeric outcome.

use crate::dice::DiceRoller;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Moments at which a combatant may say something.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TauntTrigger {
    /// Spoken by the enemy as the fight opens.
    CombatStart,
    /// Spoken by a defender that was just hit.
    Struck,
    /// Spoken by a defender that was just missed.
    Dodged,
}

/// Lines per trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TauntPool(HashMap<TauntTrigger, Vec<String>>);

impl TauntPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lines<I, S>(mut self, trigger: TauntTrigger, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .entry(trigger)
            .or_default()
            .extend(lines.into_iter().map(Into::into));
        self
    }

    pub fn lines(&self, trigger: TauntTrigger) -> &[String] {
        self.0.get(&trigger).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Pick a line uniformly; an absent or empty pool yields `None` without a draw.
pub fn pick_taunt(
    pool: &TauntPool,
    trigger: TauntTrigger,
    roller: &mut dyn DiceRoller,
) -> Option<String> {
    let lines = pool.lines(trigger);
    if lines.is_empty() {
        return None;
    }
    lines.get(roller.pick(lines.len())).cloned()
}
