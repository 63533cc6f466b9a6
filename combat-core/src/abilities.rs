//! Limited-use class abilities and charge tracking.
//!
//! Every ability a combatant can use lives in its `Resources::abilities`
//! list as an [`AbilityCharge`]. Built-in class abilities are resolved here;
//! feat-granted abilities share the same charges but resolve through
//! [`crate::feats::FeatRegistry`].

use crate::combatant::Combatant;
use crate::conditions::{ConditionKind, ConditionList};
use crate::dice::{roll_with_fallback, DiceRoller};
use serde::{Deserialize, Serialize};

/// When an ability's charges come back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshClass {
    PerEncounter,
    PerDay,
    Unlimited,
}

/// Charge tracking for one ability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityCharge {
    pub id: String,
    pub name: String,
    pub refresh: RefreshClass,
    pub uses: u32,
    pub max_uses: u32,
}

impl AbilityCharge {
    pub fn new(id: impl Into<String>, name: impl Into<String>, refresh: RefreshClass, max_uses: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            refresh,
            uses: max_uses,
            max_uses,
        }
    }

    pub fn with_uses(mut self, uses: u32) -> Self {
        self.uses = uses;
        self
    }

    fn has_uses(&self, cost: u32) -> bool {
        self.refresh == RefreshClass::Unlimited || self.uses >= cost
    }
}

/// False when the ability is absent or its uses are exhausted.
pub fn can_use_ability(abilities: &[AbilityCharge], id: &str) -> bool {
    can_pay_ability_cost(abilities, id, 1)
}

/// Like [`can_use_ability`] for abilities that cost more than one charge.
pub fn can_pay_ability_cost(abilities: &[AbilityCharge], id: &str, cost: u32) -> bool {
    abilities
        .iter()
        .find(|a| a.id == id)
        .is_some_and(|a| a.has_uses(cost.max(1)))
}

/// Spend one use. A no-op at zero or for unlimited abilities.
pub fn consume_ability_use(abilities: &mut [AbilityCharge], id: &str) {
    if let Some(ability) = abilities.iter_mut().find(|a| a.id == id) {
        if ability.refresh != RefreshClass::Unlimited {
            ability.uses = ability.uses.saturating_sub(1);
        }
    }
}

/// Restore every ability of the given refresh class to full.
pub fn refresh_abilities(abilities: &mut [AbilityCharge], refresh: RefreshClass) {
    for ability in abilities.iter_mut().filter(|a| a.refresh == refresh) {
        ability.uses = ability.max_uses;
    }
}

/// Class abilities with hardcoded effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinAbility {
    /// Heal 1d10 + level.
    SecondWind,
    /// Heal 2d4 + 2.
    LayOnHands,
    /// +2 AC `Fortified` condition for two turns.
    DefensiveStance,
}

pub const DEFENSIVE_STANCE_DURATION: u32 = 2;

impl BuiltinAbility {
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "second_wind" => Some(BuiltinAbility::SecondWind),
            "lay_on_hands" => Some(BuiltinAbility::LayOnHands),
            "defensive_stance" => Some(BuiltinAbility::DefensiveStance),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            BuiltinAbility::SecondWind => "second_wind",
            BuiltinAbility::LayOnHands => "lay_on_hands",
            BuiltinAbility::DefensiveStance => "defensive_stance",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BuiltinAbility::SecondWind => "Second Wind",
            BuiltinAbility::LayOnHands => "Lay on Hands",
            BuiltinAbility::DefensiveStance => "Defensive Stance",
        }
    }
}

/// What using an ability did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbilityOutcome {
    pub used: bool,
    pub healed: i32,
    pub condition_applied: Option<ConditionKind>,
    pub summary: String,
}

impl AbilityOutcome {
    pub fn unavailable(name: &str) -> Self {
        Self {
            summary: format!("{name} cannot be used right now."),
            ..Self::default()
        }
    }
}

/// Validate, resolve, and pay for a built-in class ability.
pub fn use_builtin_ability<C: Combatant + ?Sized>(
    ability: BuiltinAbility,
    user: &mut C,
    user_conditions: &mut ConditionList,
    turn: u32,
    roller: &mut dyn DiceRoller,
) -> AbilityOutcome {
    if !can_use_ability(&user.stats().resources.abilities, ability.id()) {
        return AbilityOutcome::unavailable(ability.name());
    }

    let name = user.name().to_string();
    let outcome = match ability {
        BuiltinAbility::SecondWind | BuiltinAbility::LayOnHands => {
            let formula = match ability {
                BuiltinAbility::SecondWind => format!("1d10+{}", user.stats().level),
                _ => "2d4+2".to_string(),
            };
            let roll = roll_with_fallback(roller, &formula, "1d4");
            let healed = user.heal(roll.total);
            AbilityOutcome {
                used: true,
                healed,
                condition_applied: None,
                summary: format!(
                    "{name} uses {} and recovers {healed} HP ({}).",
                    ability.name(),
                    roll
                ),
            }
        }
        BuiltinAbility::DefensiveStance => {
            user_conditions.apply(ConditionKind::Fortified, turn, DEFENSIVE_STANCE_DURATION);
            AbilityOutcome {
                used: true,
                healed: 0,
                condition_applied: Some(ConditionKind::Fortified),
                summary: format!(
                    "{name} takes a Defensive Stance (+2 AC for {DEFENSIVE_STANCE_DURATION} turns)."
                ),
            }
        }
    };

    consume_ability_use(&mut user.stats_mut().resources.abilities, ability.id());
    outcome
}
