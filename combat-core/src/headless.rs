//! Headless duel runner for programmatic use.
//!
//! Plays an encounter to completion with a simple built-in player policy.
//! It's designed for:
//! - Demos and soak tests of the round engine
//! - Balancing content tables against each other
//!
//! # Example
//!
//! ```ignore
//! use combat_core::headless::{HeadlessConfig, HeadlessDuel};
//! use combat_core::testing::{sample_fighter, sample_goblin};
//!
//! let config = HeadlessConfig::quick_start().with_seed(7);
//! let mut duel = HeadlessDuel::new(config, sample_fighter(), sample_goblin());
//! let report = duel.run()?;
//! println!("{:?} won after {} rounds", report.winner, report.rounds);
//! ```

use crate::abilities::can_use_ability;
use crate::combatant::{Character, Combatant, Creature};
use crate::content::Content;
use crate::dice::RngRoller;
use crate::engine::{Action, CombatEngine, CombatError, EngineConfig};
use crate::spells::{can_cast, SpellKind};
use crate::state::{CombatState, LogEntry, Side};
use rand::rngs::StdRng;

/// How the runner picks the player's action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerPolicy {
    /// Plain weapon attacks every round.
    AttackOnly,
    /// Heal when below half health, prefer damage spells, otherwise attack.
    Tactical,
}

/// Configuration for a headless duel.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Fixed seed for a reproducible duel; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Stop after this many rounds even without a winner.
    pub max_rounds: u32,
    pub policy: PlayerPolicy,
    pub engine: EngineConfig,
}

impl HeadlessConfig {
    /// Tactical play, 50 round cap, OS seed.
    pub fn quick_start() -> Self {
        Self {
            seed: None,
            max_rounds: 50,
            policy: PlayerPolicy::Tactical,
            engine: EngineConfig::default(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_policy(mut self, policy: PlayerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_engine_config(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self::quick_start()
    }
}

/// Summary of a finished duel.
#[derive(Debug, Clone)]
pub struct DuelReport {
    /// `None` if the round cap was reached first.
    pub winner: Option<Side>,
    pub rounds: u32,
    pub log: Vec<LogEntry>,
}

/// A duel driven by the built-in policy.
pub struct HeadlessDuel {
    engine: CombatEngine,
    state: CombatState,
    roller: RngRoller<StdRng>,
    config: HeadlessConfig,
    rounds: u32,
}

impl HeadlessDuel {
    pub fn new(config: HeadlessConfig, player: Character, enemy: Creature) -> Self {
        Self::with_content(config, Content::standard(), player, enemy)
    }

    pub fn with_content(config: HeadlessConfig, content: Content, player: Character, enemy: Creature) -> Self {
        let roller = match config.seed {
            Some(seed) => RngRoller::seeded(seed),
            None => RngRoller::from_entropy(),
        };
        Self {
            engine: CombatEngine::new(content).with_config(config.engine.clone()),
            state: CombatState::new(player, enemy),
            roller,
            config,
            rounds: 0,
        }
    }

    pub fn state(&self) -> &CombatState {
        &self.state
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Choose the player's next action under the configured policy.
    pub fn choose_action(&self) -> Action {
        match self.config.policy {
            PlayerPolicy::AttackOnly => Action::attack(),
            PlayerPolicy::Tactical => self.tactical_action(),
        }
    }

    fn tactical_action(&self) -> Action {
        let player = &self.state.player;
        let content = self.engine.content();

        if player.hp() * 2 < player.stats.max_hp {
            if can_use_ability(&player.stats.resources.abilities, "second_wind") {
                return Action::use_ability("second_wind");
            }
            if let Some(item) = ["greater_healing_potion", "healing_potion"]
                .into_iter()
                .find(|id| player.inventory.quantity(id) > 0)
            {
                return Action::use_item(item);
            }
        }

        let damage_spell = content
            .spells
            .resolve(&player.stats.resources.spells)
            .into_iter()
            .filter(|s| matches!(s.kind, SpellKind::Damage { .. }) && can_cast(player, s))
            .max_by_key(|s| s.level);
        match damage_spell {
            Some(spell) => Action::cast_spell(spell.id.clone()),
            None => Action::attack(),
        }
    }

    /// Resolve one round with the policy's action.
    pub fn step(&mut self) -> Result<&CombatState, CombatError> {
        let action = self.choose_action();
        self.state = self.engine.resolve_round(&self.state, &action, &mut self.roller)?;
        self.rounds += 1;
        Ok(&self.state)
    }

    /// Play until someone wins or the round cap is reached.
    pub fn run(&mut self) -> Result<DuelReport, CombatError> {
        while !self.state.is_over() && self.rounds < self.config.max_rounds {
            self.step()?;
            tracing::info!(round = self.rounds, status = %self.state.summary(), "round complete");
        }
        if !self.state.is_over() {
            tracing::warn!(max_rounds = self.config.max_rounds, "duel hit the round cap");
        }
        Ok(DuelReport {
            winner: self.state.winner,
            rounds: self.rounds,
            log: self.state.log.clone(),
        })
    }
}
