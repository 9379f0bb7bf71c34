//! D&D 5e character progression engine.
//!
//! This crate provides:
//! - Level-up planning for single and multiclass characters
//! - Per-step validation of player choices against the 5e rules
//! - Atomic commits of a finished level-up through a character store
//! - Derived statistics recomputed from primitive character state
//!
//! # Quick Start
//!
//! ```ignore
//! use dnd_progression::{
//!     EngineConfig, HitPointChoice, JsonFileStore, LevelUpWizard, StagedValue, StepId, StepKind,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::from_env()?;
//!     let store = JsonFileStore::new(&config.save_dir);
//!     let mut wizard = LevelUpWizard::new(store, config);
//!
//!     let session = wizard.start_session(character_id, 5).await?;
//!     println!("{} steps to go", session.plan().steps.len());
//!
//!     wizard.stage_choice(
//!         StepId::new(5, StepKind::HitPoints),
//!         StagedValue::HitPoints(HitPointChoice::Average),
//!     )?;
//!     // ... stage the remaining steps ...
//!
//!     let character = wizard.commit().await?;
//!     println!("{} is now level {}", character.name, character.level);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod character;
pub mod character_builder;
pub mod choices;
pub mod class_data;
pub mod commit;
pub mod config;
pub mod derived;
pub mod dice;
pub mod eligibility;
pub mod feats;
pub mod multiclass;
pub mod options;
pub mod planner;
pub mod progression;
pub mod session;
pub mod spells;
pub mod store;
pub mod testing;
pub mod validator;

// Primary public API
pub use catalog::{CatalogError, RulesSource, SpellFilter, StaticCatalog};
pub use character::{Ability, AbilityScores, Character, CharacterClass, CharacterId, Skill};
pub use character_builder::{recompute_derived, AbilityMethod, CharacterBuilder};
pub use choices::{AsiChoice, HitPointChoice, StagedValue, StepId, StepKind, StepOptions};
pub use commit::{CommitError, StateWrite, TransitionUpdate};
pub use config::{ConfigError, EngineConfig, HitPointPolicy};
pub use multiclass::{LeaveClassPolicy, PrerequisiteError};
pub use planner::{Plan, PlanMode, PlannedStep, StepRequirement};
pub use session::{LevelUpSession, LevelUpWizard, SessionError};
pub use store::{CharacterStore, JsonFileStore, MemoryStore, StoreError};
pub use validator::ValidationError;
