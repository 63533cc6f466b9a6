//! Round-resolution engine for d20-style duels.
//!
//! This crate provides:
//! - Turn-based player vs. enemy combat resolved one round at a time
//! - Timed conditions, limited-use abilities, data-driven feats and spells
//! - Critical hits, fumbles, quirks, loot and taunts
//! - Injected randomness so every round can be replayed in tests
//!
//! # Quick Start
//!
//! ```ignore
//! use combat_core::{Action, CombatEngine, CombatState, RngRoller};
//! use combat_core::testing::{sample_fighter, sample_goblin};
//!
//! let engine = CombatEngine::default();
//! let mut roller = RngRoller::seeded(42);
//! let mut state = CombatState::new(sample_fighter(), sample_goblin());
//!
//! while state.winner.is_none() {
//!     state = engine.resolve_round(&state, &Action::attack(), &mut roller)?;
//!     println!("{}", state.summary());
//! }
//! ```

pub mod abilities;
pub mod attack;
pub mod combatant;
pub mod conditions;
pub mod content;
pub mod criticals;
pub mod dice;
pub mod enemy_ai;
pub mod engine;
pub mod feats;
pub mod headless;
pub mod items;
pub mod loot;
pub mod quirks;
pub mod retreat;
pub mod spells;
pub mod state;
pub mod taunts;
pub mod testing;

// Primary public API
pub use combatant::{Character, Combatant, CombatStats, Creature};
pub use conditions::{ConditionKind, ConditionList};
pub use content::{Content, ContentError};
pub use dice::{DiceRoller, RngRoller};
pub use engine::{Action, AttackVariant, CombatEngine, CombatError, EngineConfig};
pub use headless::{HeadlessConfig, HeadlessDuel};
pub use retreat::{handle_retreat, RetreatOutcome};
pub use state::{Actor, CombatState, LogEntry, RetreatConfig, Side};
pub use testing::{ScriptedRoller, TestHarness};
