//! One-shot character quirks.
//!
//! A quirk fires at most once per combat, tracked by `CombatState::quirk_fired`.
//! The engine decides when a trigger point is reached; this module only
//! describes quirks and their effects.

use serde::{Deserialize, Serialize};

/// When a quirk fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuirkTrigger {
    /// As the first round opens.
    CombatStart,
    /// At the start of the player's first turn.
    TurnOne,
    /// On the enemy's first attack against the player.
    FirstAttack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuirkEffect {
    /// A `Guarded` condition of the given strength.
    AcBonus { amount: i32, duration: u32 },
    /// A fixed heal. On `FirstAttack`, applied when that attack hits.
    Heal { amount: i32 },
    /// Unannounced single-turn AC bonus.
    HiddenAcBonus { amount: i32 },
    /// The next enemy attack misses outright.
    AutoMissNextAttack,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quirk {
    pub id: String,
    pub name: String,
    pub trigger: QuirkTrigger,
    pub effect: QuirkEffect,
}

impl Quirk {
    pub fn new(id: &str, name: &str, trigger: QuirkTrigger, effect: QuirkEffect) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            trigger,
            effect,
        }
    }

    /// Flavor line announcing the quirk.
    pub fn announcement(&self, owner: &str) -> String {
        match self.effect {
            QuirkEffect::AcBonus { amount, duration } => {
                format!("{owner}'s {} grants +{amount} AC for {duration} turns.", self.name)
            }
            QuirkEffect::Heal { amount } => format!("{owner}'s {} restores {amount} HP.", self.name),
            QuirkEffect::HiddenAcBonus { .. } => format!("{owner}'s {} kicks in.", self.name),
            QuirkEffect::AutoMissNextAttack => {
                format!("{owner}'s {} will throw off the next attack.", self.name)
            }
        }
    }
}

lazy_static::lazy_static! {
    /// Background quirks offered at character creation.
    pub static ref STANDARD_QUIRKS: Vec<Quirk> = vec![
        Quirk::new("soldier_drill", "Soldier's Drill", QuirkTrigger::CombatStart,
            QuirkEffect::AcBonus { amount: 2, duration: 2 }),
        Quirk::new("street_instincts", "Street Instincts", QuirkTrigger::FirstAttack,
            QuirkEffect::AutoMissNextAttack),
        Quirk::new("acolyte_prayer", "Acolyte's Prayer", QuirkTrigger::FirstAttack,
            QuirkEffect::Heal { amount: 3 }),
        Quirk::new("hunters_patience", "Hunter's Patience", QuirkTrigger::TurnOne,
            QuirkEffect::HiddenAcBonus { amount: 2 }),
    ];
}

/// Look up a standard quirk by id.
pub fn get_quirk(id: &str) -> Option<Quirk> {
    STANDARD_QUIRKS.iter().find(|q| q.id == id).cloned()
}
