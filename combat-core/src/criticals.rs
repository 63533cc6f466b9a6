//! Critical hits, critical fumbles and the fumble table.

use crate::dice::{DiceExpression, DiceRoller};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A natural 20 always hits and doubles the damage dice.
pub fn is_critical_hit(roll: u32) -> bool {
    roll == 20
}

/// A natural 1 always misses and triggers a fumble.
pub fn is_critical_fumble(roll: u32) -> bool {
    roll == 1
}

/// Double every dice term of a damage formula, leaving flat modifiers alone.
///
/// `1d8+3` becomes `2d8+3`; `1d8+1d6+3` becomes `2d8+2d6+3`. Terms that do
/// not parse as `NdM` are copied through unchanged.
pub fn calculate_critical_damage(formula: &str) -> String {
    let mut out = String::with_capacity(formula.len() + 2);
    let mut term = String::new();

    for ch in formula.chars().filter(|c| !c.is_whitespace()) {
        if ch == '+' || ch == '-' {
            out.push_str(&double_term(&term));
            out.push(ch);
            term.clear();
        } else {
            term.push(ch);
        }
    }
    out.push_str(&double_term(&term));
    out
}

fn double_term(term: &str) -> String {
    let Some(d_pos) = term.to_lowercase().find('d') else {
        return term.to_string();
    };
    let count_str = &term[..d_pos];
    let count: u32 = if count_str.is_empty() {
        1
    } else {
        match count_str.parse() {
            Ok(n) => n,
            Err(_) => return term.to_string(),
        }
    };
    match count.checked_mul(2) {
        Some(doubled) => format!("{doubled}{}", &term[d_pos..]),
        None => term.to_string(),
    }
}

/// Negative side effects of a natural 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FumbleEffect {
    /// The actor spends their next turn recovering the weapon.
    DropWeapon,
    /// The actor takes 1d4 damage immediately.
    HitSelf,
    /// -2 AC until the actor's next turn.
    OffBalance,
    /// The opponent gets an immediate free attack.
    Opening,
}

impl FumbleEffect {
    pub const ALL: [FumbleEffect; 4] = [
        FumbleEffect::DropWeapon,
        FumbleEffect::HitSelf,
        FumbleEffect::OffBalance,
        FumbleEffect::Opening,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FumbleEffect::DropWeapon => "drop_weapon",
            FumbleEffect::HitSelf => "hit_self",
            FumbleEffect::OffBalance => "off_balance",
            FumbleEffect::Opening => "opening",
        }
    }

    /// Narrative fragment, completed by the actor's name.
    pub fn describe(&self, actor: &str) -> String {
        match self {
            FumbleEffect::DropWeapon => format!("{actor} drops their weapon!"),
            FumbleEffect::HitSelf => format!("{actor} strikes themselves in the confusion!"),
            FumbleEffect::OffBalance => format!("{actor} stumbles and is thrown off balance!"),
            FumbleEffect::Opening => format!("{actor} leaves a wide opening!"),
        }
    }
}

impl fmt::Display for FumbleEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Map a 1d4 result onto the fumble table. Out-of-range rolls clamp to entry 1.
pub fn determine_fumble_effect(roll: i32) -> FumbleEffect {
    match roll {
        2 => FumbleEffect::HitSelf,
        3 => FumbleEffect::OffBalance,
        4 => FumbleEffect::Opening,
        _ => FumbleEffect::DropWeapon,
    }
}

/// Draw one 1d4 and look it up on the fumble table.
pub fn roll_fumble_effect(roller: &mut dyn DiceRoller) -> FumbleEffect {
    let d4 = DiceExpression::parse("1d4").map(|expr| roller.roll(&expr).total);
    determine_fumble_effect(d4.unwrap_or(1))
}
