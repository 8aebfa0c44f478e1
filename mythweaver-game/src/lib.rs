//! Mythweaver Game Engine
//!
//! Platform-agnostic rules core for Mythweaver: weave scoring, card supply, combos,
//! crisis and era progression, and government drift. No UI or platform dependencies.

pub mod catalog;
pub mod combo;
pub mod config;
pub mod crisis;
pub mod government;
pub mod narration;
pub mod numbers;
pub mod rng;
pub mod scoring;
pub mod session;
pub mod supply;

// Re-export commonly used types
pub use catalog::{
    Card, Catalog, CatalogError, ComboFormula, ConditionTag, Consumable, ConsumableEffect, Decree,
    DecreeEffect, DecreePhase, Enhancement, EraSchedule, EventChoice, EventEffects, Intent,
    NarrativeEvent, Rarity, TargetAxis,
};
pub use combo::{apply_combo_bonus, find_matching_combo};
pub use config::{RulesConfig, RulesConfigError};
pub use crisis::{
    BossModifier, CRISES_PER_ERA, CrisisResolution, CrisisState, CrisisType, DefeatReason, Phase,
};
pub use government::{
    AffinityThresholds, CollapseCause, Government, GovernmentAffinities, NationState, NationStats,
    StatsDelta,
};
#[cfg(feature = "async")]
pub use narration::{AsyncNarrator, narrate_with_timeout};
pub use narration::{
    Narration, NarrationError, NarrationRequest, Narrator, fallback_narration, narrate_or_fallback,
};
pub use scoring::{ScoringBreakdown, ScoringInput, ScoringStep, compute_score};
pub use session::{EraOutcome, GameSession, GameState, WeaveOutcome};
pub use supply::{Discovery, SELECTION_CAP, Supply};

use thiserror::Error;

/// Trait for abstracting catalog and rules loading
/// Platform-specific implementations should provide this
pub trait CatalogLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the card catalog
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded or fails validation.
    fn load_catalog(&self) -> Result<Catalog, Self::Error>;

    /// Load the rules configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the rules cannot be loaded or fail validation.
    fn load_rules(&self) -> Result<RulesConfig, Self::Error>;
}

/// Trait for abstracting save/load operations
/// Platform-specific implementations should provide this
pub trait GameStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save game state
    ///
    /// # Errors
    ///
    /// Returns an error if the game state cannot be saved.
    fn save_game(&self, save_name: &str, game_state: &GameState) -> Result<(), Self::Error>;

    /// Load game state
    ///
    /// # Errors
    ///
    /// Returns an error if the game state cannot be loaded.
    fn load_game(&self, save_name: &str) -> Result<Option<GameState>, Self::Error>;

    /// Delete saved game
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error>;
}

#[derive(Debug, Error)]
pub enum EmbeddedDataError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Rules(#[from] RulesConfigError),
}

/// Loader for the data compiled into this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedLoader;

impl CatalogLoader for EmbeddedLoader {
    type Error = EmbeddedDataError;

    fn load_catalog(&self) -> Result<Catalog, Self::Error> {
        let catalog = Catalog::from_json(catalog::DEFAULT_CATALOG_DATA)?;
        catalog.ensure_eras(self.load_rules()?.final_era)?;
        Ok(catalog)
    }

    fn load_rules(&self) -> Result<RulesConfig, Self::Error> {
        Ok(RulesConfig::from_json(config::DEFAULT_RULES_DATA)?)
    }
}

/// Main game engine for managing game sessions
pub struct GameEngine<L, S>
where
    L: CatalogLoader,
    S: GameStorage,
{
    loader: L,
    storage: S,
}

impl<L, S> GameEngine<L, S>
where
    L: CatalogLoader,
    S: GameStorage,
{
    /// Create a new game engine with the provided loader and storage
    pub const fn new(loader: L, storage: S) -> Self {
        Self { loader, storage }
    }

    /// Start a new run with the specified seed.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog or rules cannot be loaded.
    pub fn create_session(&self, seed: u64) -> Result<GameSession, L::Error> {
        let catalog = self.loader.load_catalog()?;
        let rules = self.loader.load_rules()?;
        Ok(GameSession::new(seed, catalog, rules))
    }

    /// Save a game state
    ///
    /// # Errors
    ///
    /// Returns an error if the game state cannot be saved.
    pub fn save_game(&self, save_name: &str, game_state: &GameState) -> Result<(), S::Error> {
        self.storage.save_game(save_name, game_state)
    }

    /// Load a saved run and reattach it to freshly loaded catalog and rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the state, catalog or rules cannot be loaded.
    pub fn load_session(&self, save_name: &str) -> Result<Option<GameSession>, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
        S::Error: Into<anyhow::Error>,
    {
        let Some(state) = self.storage.load_game(save_name).map_err(Into::into)? else {
            return Ok(None);
        };
        let catalog = self.loader.load_catalog().map_err(Into::into)?;
        let rules = self.loader.load_rules().map_err(Into::into)?;
        Ok(Some(GameSession::from_state(state, catalog, rules)))
    }

    /// Delete a saved run
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    pub fn delete_save(&self, save_name: &str) -> Result<(), S::Error> {
        self.storage.delete_save(save_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::rc::Rc;

    #[derive(Clone, Copy, Default)]
    struct FixtureLoader;

    impl CatalogLoader for FixtureLoader {
        type Error = Infallible;

        fn load_catalog(&self) -> Result<Catalog, Self::Error> {
            Ok(Catalog::load_from_static())
        }

        fn load_rules(&self) -> Result<RulesConfig, Self::Error> {
            Ok(RulesConfig::default())
        }
    }

    #[derive(Clone, Default)]
    struct MemoryStorage {
        saves: Rc<RefCell<HashMap<String, String>>>,
    }

    #[derive(Debug, Error)]
    #[error(transparent)]
    struct StorageError(#[from] serde_json::Error);

    impl GameStorage for MemoryStorage {
        type Error = StorageError;

        fn save_game(&self, save_name: &str, game_state: &GameState) -> Result<(), Self::Error> {
            let json = serde_json::to_string(game_state)?;
            self.saves.borrow_mut().insert(save_name.to_string(), json);
            Ok(())
        }

        fn load_game(&self, save_name: &str) -> Result<Option<GameState>, Self::Error> {
            self.saves
                .borrow()
                .get(save_name)
                .map(|json| serde_json::from_str(json))
                .transpose()
                .map_err(StorageError)
        }

        fn delete_save(&self, save_name: &str) -> Result<(), Self::Error> {
            self.saves.borrow_mut().remove(save_name);
            Ok(())
        }
    }

    #[test]
    fn embedded_loader_reads_bundled_data() {
        let loader = EmbeddedLoader;
        let catalog = loader.load_catalog().unwrap();
        let rules = loader.load_rules().unwrap();
        assert!(catalog.ensure_eras(rules.final_era).is_ok());
        assert_eq!(rules, RulesConfig::default());
    }

    #[test]
    fn engine_saves_and_reloads_sessions() {
        let storage = MemoryStorage::default();
        let engine = GameEngine::new(FixtureLoader, storage.clone());
        let mut session = engine.create_session(11).unwrap();
        session.start_crisis();
        let first = session.state().supply.hand[0].id.clone();
        assert!(session.select(&first));

        engine.save_game("slot", session.state()).unwrap();
        let restored = engine.load_session("slot").unwrap().unwrap();
        assert_eq!(restored.state(), session.state());

        engine.delete_save("slot").unwrap();
        assert!(engine.load_session("slot").unwrap().is_none());
    }

    #[test]
    fn reloaded_session_continues_identically() {
        let engine = GameEngine::new(FixtureLoader, MemoryStorage::default());
        let mut live = engine.create_session(5).unwrap();
        live.start_crisis();
        engine.save_game("mid", live.state()).unwrap();
        let mut resumed = engine.load_session("mid").unwrap().unwrap();

        for session in [&mut live, &mut resumed] {
            let ids: Vec<String> = session.state().supply.hand[..2]
                .iter()
                .map(|c| c.id.clone())
                .collect();
            for id in &ids {
                session.select(id);
            }
            session.discard_selection();
        }
        assert_eq!(live.state(), resumed.state());
    }
}
