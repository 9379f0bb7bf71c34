//! Level-up sessions - the public API for character progression.
//!
//! [`LevelUpSession`] is an immutable value: staging a choice, advancing or
//! retreating returns a new session and leaves the old one untouched, so a
//! rejected operation never loses work. [`LevelUpWizard`] wraps one session
//! with the character store and rules catalog it talks to.

use crate::catalog::{RulesSource, StaticCatalog};
use crate::character::{Character, CharacterClass, CharacterId, MAX_CHARACTER_LEVEL};
use crate::choices::{HitPointChoice, StagedValue, StepId, StepKind, StepOptions};
use crate::commit::{self, CommitError};
use crate::config::{EngineConfig, HitPointPolicy};
use crate::multiclass::{check_class_switch, LeaveClassCheck, PrerequisiteError};
use crate::planner::{self, Plan, PlanMode, PlanOptions, PlannedStep, StepRequirement};
use crate::store::{CharacterStore, StoreError};
use crate::validator::{self, ValidationContext, ValidationError};
use rand::Rng;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Cannot progress to level {target}: {reason}")]
    InvalidTarget { target: u8, reason: String },

    #[error("Character has no class to advance")]
    NoClass,

    #[error("Step {0} is not part of this plan")]
    UnknownStep(StepId),

    #[error("No progression session is active")]
    NoSession,

    #[error("Already at the first step")]
    AtFirstStep,

    #[error("Already at the last step")]
    AtLastStep,

    #[error("Invalid choice: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Prerequisite(#[from] PrerequisiteError),

    #[error("Commit failed: {0}")]
    Commit(#[from] CommitError),

    #[error("Character store error: {0}")]
    Store(#[from] StoreError),
}

impl SessionError {
    /// Whether repeating the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::Commit(err) => err.is_retryable(),
            SessionError::Store(err) => err.is_retryable(),
            _ => false,
        }
    }
}

// ============================================================================
// LevelUpSession
// ============================================================================

/// One in-progress level transition.
#[derive(Debug, Clone)]
pub struct LevelUpSession {
    snapshot: Character,
    from_level: u8,
    to_level: u8,
    mode: PlanMode,
    plan_options: PlanOptions,
    config: EngineConfig,
    plan: Plan,
    cursor: usize,
    staged: BTreeMap<StepId, StagedValue>,
    options: BTreeMap<StepId, StepOptions>,
}

impl LevelUpSession {
    /// Gain levels from the character's current level up to `to`.
    pub fn level_up(character: Character, to: u8, config: EngineConfig) -> Result<Self, SessionError> {
        if to <= character.level {
            return Err(SessionError::InvalidTarget {
                target: to,
                reason: format!("character is already level {}", character.level),
            });
        }
        let from = character.level;
        Self::new(character, from, to, PlanMode::LevelUp, config)
    }

    /// Finish creating a freshly built character at a level above its
    /// current one. The starting level only contributes feature choices.
    pub fn creation(character: Character, to: u8, config: EngineConfig) -> Result<Self, SessionError> {
        if character.level == 0 {
            return Err(SessionError::NoClass);
        }
        if to < character.level {
            return Err(SessionError::InvalidTarget {
                target: to,
                reason: format!("character is already level {}", character.level),
            });
        }
        let from = character.level;
        Self::new(character, from, to, PlanMode::Creation, config)
    }

    fn new(
        character: Character,
        from: u8,
        to: u8,
        mode: PlanMode,
        config: EngineConfig,
    ) -> Result<Self, SessionError> {
        if to > MAX_CHARACTER_LEVEL {
            return Err(SessionError::InvalidTarget {
                target: to,
                reason: format!("the highest level is {MAX_CHARACTER_LEVEL}"),
            });
        }
        if character.classes.is_empty() {
            return Err(SessionError::NoClass);
        }
        let plan_options = PlanOptions {
            offer_multiclass: config.offer_multiclass,
            default_class: None,
        };
        let staged = BTreeMap::new();
        let plan = planner::plan(&character, from, to, mode, &staged, &plan_options);
        Ok(Self {
            snapshot: character,
            from_level: from,
            to_level: to,
            mode,
            plan_options,
            config,
            plan,
            cursor: 0,
            staged,
            options: BTreeMap::new(),
        })
    }

    pub fn character_id(&self) -> CharacterId {
        self.snapshot.id
    }

    /// The character as loaded when the session started.
    pub fn snapshot(&self) -> &Character {
        &self.snapshot
    }

    pub fn from_level(&self) -> u8 {
        self.from_level
    }

    pub fn to_level(&self) -> u8 {
        self.to_level
    }

    pub fn mode(&self) -> PlanMode {
        self.mode
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn steps(&self) -> Vec<StepId> {
        self.plan.ids()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_step(&self) -> Option<&PlannedStep> {
        self.plan.steps.get(self.cursor)
    }

    /// The class advanced by the first level of the plan.
    pub fn class_to_level(&self) -> Option<CharacterClass> {
        self.plan
            .classes_leveled()
            .first()
            .map(|(_, class)| *class)
    }

    pub fn staged(&self, id: StepId) -> Option<&StagedValue> {
        self.staged.get(&id)
    }

    pub fn staged_values(&self) -> &BTreeMap<StepId, StagedValue> {
        &self.staged
    }

    pub fn step_options(&self, id: StepId) -> Option<&StepOptions> {
        self.options.get(&id)
    }

    /// Validate the step at `index` against its staged value.
    pub fn validate_index(&self, index: usize) -> Result<(), ValidationError> {
        let Some(step) = self.plan.steps.get(index) else {
            return Ok(());
        };
        let id = step.id();
        validator::validate_step(&ValidationContext {
            step,
            staged: self.staged.get(&id),
            options: self.options.get(&id),
            config: &self.config,
        })
    }

    /// Validation of the current step.
    pub fn validation(&self) -> Result<(), ValidationError> {
        self.validate_index(self.cursor)
    }

    pub fn can_advance(&self) -> bool {
        self.validation().is_ok()
    }

    /// Every step of the plan validates.
    pub fn is_complete(&self) -> bool {
        (0..self.plan.steps.len()).all(|i| self.validate_index(i).is_ok())
    }

    // ------------------------------------------------------------------
    // Reducers
    // ------------------------------------------------------------------

    /// Stage `value` for step `id` and replan.
    ///
    /// The value is only checked for shape here; completeness and legality
    /// are judged by [`validation`](Self::validation). A new class is the
    /// exception: multiclass prerequisites are checked immediately so the
    /// caller learns which ability score is short.
    pub fn stage(&self, id: StepId, value: StagedValue) -> Result<Self, SessionError> {
        let step = self.plan.step(id).ok_or(SessionError::UnknownStep(id))?;
        if value.kind() != id.kind {
            return Err(ValidationError::WrongKind {
                expected: id.kind,
                found: value.kind(),
            }
            .into());
        }
        if let (StepRequirement::ClassSelect { default }, StagedValue::Class(class)) =
            (&step.requirement, &value)
        {
            let check = check_class_switch(
                &step.held_before,
                *default,
                *class,
                self.config.leave_class_policy,
            )?;
            if let LeaveClassCheck::Warning(message) = check {
                warn!(character_id = %self.snapshot.id, %message, "Multiclass prerequisite not met");
            }
        }
        let mut staged = self.staged.clone();
        staged.insert(id, value);
        Ok(self.replanned(staged))
    }

    /// Remove the value staged for `id`, if any.
    pub fn unstage(&self, id: StepId) -> Self {
        let mut staged = self.staged.clone();
        staged.remove(&id);
        self.replanned(staged)
    }

    /// Attach options loaded from the rules catalog to step `id`.
    pub fn with_options(&self, id: StepId, options: StepOptions) -> Result<Self, SessionError> {
        if self.plan.step(id).is_none() {
            return Err(SessionError::UnknownStep(id));
        }
        let mut next = self.clone();
        next.options.insert(id, options);
        Ok(next)
    }

    /// Move to the next step if the current one validates.
    pub fn advance(&self) -> Result<Self, SessionError> {
        self.validation()?;
        if self.cursor + 1 >= self.plan.steps.len() {
            return Err(SessionError::AtLastStep);
        }
        let mut next = self.clone();
        next.cursor += 1;
        Ok(next)
    }

    /// Move to the previous step. Staged values are kept.
    pub fn retreat(&self) -> Result<Self, SessionError> {
        if self.cursor == 0 {
            return Err(SessionError::AtFirstStep);
        }
        let mut next = self.clone();
        next.cursor -= 1;
        Ok(next)
    }

    /// Rebuild the plan for `staged`, dropping values whose step no longer
    /// exists until the plan is stable.
    fn replanned(&self, mut staged: BTreeMap<StepId, StagedValue>) -> Self {
        let plan = loop {
            let plan = planner::plan(
                &self.snapshot,
                self.from_level,
                self.to_level,
                self.mode,
                &staged,
                &self.plan_options,
            );
            let before = staged.len();
            staged.retain(|id, _| plan.position(*id).is_some());
            if staged.len() == before {
                break plan;
            }
        };

        // Loaded options stay valid only while their step is unchanged.
        let options = self
            .options
            .iter()
            .filter(|(id, _)| match (self.plan.step(**id), plan.step(**id)) {
                (Some(old), Some(new)) => old == new,
                _ => false,
            })
            .map(|(id, options)| (*id, options.clone()))
            .collect();

        let cursor = self
            .current_step()
            .and_then(|step| plan.position(step.id()))
            .unwrap_or_else(|| self.cursor.min(plan.steps.len().saturating_sub(1)));

        Self {
            snapshot: self.snapshot.clone(),
            from_level: self.from_level,
            to_level: self.to_level,
            mode: self.mode,
            plan_options: self.plan_options.clone(),
            config: self.config.clone(),
            plan,
            cursor,
            staged,
            options,
        }
    }
}

// ============================================================================
// LevelUpWizard
// ============================================================================

/// Drives one level-up session against a character store and a rules
/// catalog.
pub struct LevelUpWizard<S, R = StaticCatalog> {
    store: S,
    catalog: R,
    config: EngineConfig,
    session: Option<LevelUpSession>,
}

impl<S: CharacterStore> LevelUpWizard<S, StaticCatalog> {
    /// Create a wizard using the compiled-in rules.
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self::with_catalog(store, StaticCatalog, config)
    }
}

impl<S: CharacterStore, R: RulesSource> LevelUpWizard<S, R> {
    pub fn with_catalog(store: S, catalog: R, config: EngineConfig) -> Self {
        Self {
            store,
            catalog,
            config,
            session: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&LevelUpSession> {
        self.session.as_ref()
    }

    fn active(&self) -> Result<&LevelUpSession, SessionError> {
        self.session.as_ref().ok_or(SessionError::NoSession)
    }

    /// Load a character and plan its progression to `target_level`.
    /// Replaces any session already in progress.
    pub async fn start_session(
        &mut self,
        id: CharacterId,
        target_level: u8,
    ) -> Result<&LevelUpSession, SessionError> {
        let character = self.store.load_character(id).await?;
        let session = LevelUpSession::level_up(character, target_level, self.config.clone())?;
        let session = self.check_class_rules(session).await;
        info!(
            character_id = %id,
            from = session.from_level(),
            to = target_level,
            steps = session.plan().steps.len(),
            "Started level-up session"
        );
        Ok(&*self.session.insert(session))
    }

    /// Plan the remaining choices for a character created at level 1 and
    /// built up to `target_level`.
    pub async fn start_creation(
        &mut self,
        id: CharacterId,
        target_level: u8,
    ) -> Result<&LevelUpSession, SessionError> {
        let character = self.store.load_character(id).await?;
        let session = LevelUpSession::creation(character, target_level, self.config.clone())?;
        let session = self.check_class_rules(session).await;
        info!(
            character_id = %id,
            to = target_level,
            steps = session.plan().steps.len(),
            "Started creation session"
        );
        Ok(&*self.session.insert(session))
    }

    /// Look up the rules of every level block in the catalog. A block whose
    /// class has no rules, or whose feature choices cannot be listed, has
    /// every step marked [`StepOptions::Unavailable`].
    async fn check_class_rules(&self, mut session: LevelUpSession) -> LevelUpSession {
        for (level, class) in session.plan().classes_leveled() {
            let Some(first) = session.plan().steps.iter().find(|s| s.level == level) else {
                continue;
            };
            let class_level = first.class_level;
            let subclass = first.held_before.subclass(class).map(str::to_string);
            let lookup = match self.catalog.class_rules(class).await {
                Ok(_) => self
                    .catalog
                    .feature_choices_at(class, class_level, subclass.as_deref())
                    .await
                    .map(|choices| choices.len()),
                Err(err) => Err(err),
            };
            match lookup {
                Ok(choices) => {
                    debug!(%class, class_level, choices, "Class rules loaded");
                }
                Err(err) => {
                    warn!(%class, class_level, error = %err, "Rules catalog lookup failed");
                    let affected: Vec<StepId> = session
                        .plan()
                        .steps
                        .iter()
                        .filter(|s| s.level == level && s.kind() != StepKind::Review)
                        .map(PlannedStep::id)
                        .collect();
                    for id in affected {
                        if let Ok(next) =
                            session.with_options(id, StepOptions::Unavailable(err.to_string()))
                        {
                            session = next;
                        }
                    }
                }
            }
        }
        session
    }

    pub fn stage_choice(&mut self, id: StepId, value: StagedValue) -> Result<(), SessionError> {
        let next = self.active()?.stage(id, value)?;
        debug!(step = %id, steps = next.plan().steps.len(), "Staged choice");
        self.session = Some(next);
        Ok(())
    }

    pub fn unstage_choice(&mut self, id: StepId) -> Result<(), SessionError> {
        let next = self.active()?.unstage(id);
        self.session = Some(next);
        Ok(())
    }

    pub fn can_advance(&self) -> bool {
        self.session.as_ref().is_some_and(LevelUpSession::can_advance)
    }

    /// Why the current step cannot be left yet, if it cannot.
    pub fn validation(&self) -> Result<(), SessionError> {
        Ok(self.active()?.validation()?)
    }

    pub fn advance(&mut self) -> Result<(), SessionError> {
        let next = self.active()?.advance()?;
        debug!(step = ?next.current_step().map(PlannedStep::id), "Advanced");
        self.session = Some(next);
        Ok(())
    }

    pub fn retreat(&mut self) -> Result<(), SessionError> {
        let next = self.active()?.retreat()?;
        debug!(step = ?next.current_step().map(PlannedStep::id), "Retreated");
        self.session = Some(next);
        Ok(())
    }

    pub fn current_step(&self) -> Option<&PlannedStep> {
        self.session.as_ref().and_then(LevelUpSession::current_step)
    }

    /// Options for a selection step, loaded from the rules catalog on first
    /// use and cached on the session. `None` for steps whose options are
    /// fixed by the rules (pact boons, fighting styles, ...).
    ///
    /// A catalog failure is recorded as [`StepOptions::Unavailable`]; the
    /// step then cannot be completed but the session carries on.
    pub async fn options(&mut self, id: StepId) -> Result<Option<StepOptions>, SessionError> {
        let session = self.active()?;
        if let Some(cached) = session.step_options(id) {
            return Ok(Some(cached.clone()));
        }
        let step = session.plan().step(id).ok_or(SessionError::UnknownStep(id))?;

        let loaded = if let Some(filter) = validator::spell_filter(step) {
            self.catalog
                .list_spells(&filter)
                .await
                .map(|spells| StepOptions::Spells(spells.into_iter().map(|s| s.name).collect()))
        } else if step.kind() == StepKind::AbilityScoreImprovement {
            self.catalog
                .list_feats(&validator::feat_filter(&step.held_before))
                .await
                .map(StepOptions::Feats)
        } else {
            return Ok(None);
        };

        let options = match loaded {
            Ok(StepOptions::Spells(names)) if names.is_empty() => {
                StepOptions::Unavailable(format!("no spells to choose from for {id}"))
            }
            Ok(options) => options,
            Err(err) => {
                warn!(step = %id, error = %err, "Rules catalog lookup failed");
                StepOptions::Unavailable(err.to_string())
            }
        };
        let next = session.with_options(id, options.clone())?;
        self.session = Some(next);
        Ok(Some(options))
    }

    /// Roll the hit die for step `id` and stage the result.
    pub fn roll_hit_points(&mut self, id: StepId) -> Result<u8, SessionError> {
        self.roll_hit_points_with(id, &mut rand::thread_rng())
    }

    /// [`roll_hit_points`](Self::roll_hit_points) with a supplied generator.
    pub fn roll_hit_points_with<G: Rng>(&mut self, id: StepId, rng: &mut G) -> Result<u8, SessionError> {
        let session = self.active()?;
        let step = session.plan().step(id).ok_or(SessionError::UnknownStep(id))?;
        let StepRequirement::HitPoints { die } = step.requirement else {
            return Err(SessionError::UnknownStep(id));
        };
        if self.config.hp_policy == HitPointPolicy::AverageOnly {
            return Err(ValidationError::AverageOnly.into());
        }
        let value = die.roll_with_rng(rng);
        debug!(step = %id, die = %die, value, "Rolled hit points");
        self.stage_choice(id, StagedValue::HitPoints(HitPointChoice::Rolled(value)))?;
        Ok(value)
    }

    /// Validate every step, then write the transition through the store.
    ///
    /// On success the session ends and the stored character is returned.
    /// On failure the session is kept as it was, so the same choices can be
    /// committed again.
    pub async fn commit(&mut self) -> Result<Character, SessionError> {
        let session = self.active()?;
        let id = session.character_id();
        let update = commit::prepare(session)?;
        match self.store.commit_transition(&update).await {
            Ok(character) => {
                info!(
                    character_id = %id,
                    level = character.level,
                    hp_gained = update.history.hp_gained,
                    "Committed level-up"
                );
                self.session = None;
                Ok(character)
            }
            Err(err) => {
                let err = CommitError::from(err);
                warn!(
                    character_id = %id,
                    retryable = err.is_retryable(),
                    error = %err,
                    "Commit failed, session kept"
                );
                Err(err.into())
            }
        }
    }

    /// Discard the session. Nothing was written, so this is always safe.
    pub fn cancel(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                debug!(character_id = %session.character_id(), "Cancelled session");
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::choices::AsiChoice;
    use crate::character::Ability;
    use crate::store::MemoryStore;
    use crate::multiclass::LeaveClassPolicy;
    use crate::testing::{sample_character, sample_multiclass};

    fn wizard_session() -> LevelUpSession {
        LevelUpSession::level_up(
            sample_character(CharacterClass::Wizard, 4),
            5,
            EngineConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_bad_targets() {
        let wizard = sample_character(CharacterClass::Wizard, 4);
        assert!(matches!(
            LevelUpSession::level_up(wizard.clone(), 4, EngineConfig::default()),
            Err(SessionError::InvalidTarget { target: 4, .. })
        ));
        assert!(matches!(
            LevelUpSession::level_up(wizard, 21, EngineConfig::default()),
            Err(SessionError::InvalidTarget { target: 21, .. })
        ));
        let mut classless = Character::new("Nobody");
        classless.level = 1;
        assert!(matches!(
            LevelUpSession::level_up(classless, 2, EngineConfig::default()),
            Err(SessionError::NoClass)
        ));
    }

    #[test]
    fn test_advance_blocks_until_valid() {
        let session = wizard_session();
        assert_eq!(session.class_to_level(), Some(CharacterClass::Wizard));
        assert_eq!(session.current_step().map(PlannedStep::kind), Some(StepKind::HitPoints));
        assert!(!session.can_advance());
        assert!(matches!(
            session.advance(),
            Err(SessionError::Validation(ValidationError::Missing(StepKind::HitPoints)))
        ));
        assert_eq!(session.cursor(), 0);

        let session = session
            .stage(
                StepId::new(5, StepKind::HitPoints),
                StagedValue::HitPoints(HitPointChoice::Average),
            )
            .unwrap()
            .advance()
            .unwrap();
        assert_eq!(session.current_step().map(PlannedStep::kind), Some(StepKind::Spells));

        let back = session.retreat().unwrap();
        assert_eq!(back.cursor(), 0);
        assert!(back.staged(StepId::new(5, StepKind::HitPoints)).is_some());
        assert!(matches!(back.retreat(), Err(SessionError::AtFirstStep)));
    }

    #[test]
    fn test_stage_checks_step_and_kind() {
        let session = wizard_session();
        assert!(matches!(
            session.stage(
                StepId::new(5, StepKind::PactBoon),
                StagedValue::PactBoon(crate::options::PactBoon::Tome)
            ),
            Err(SessionError::UnknownStep(_))
        ));
        assert!(matches!(
            session.stage(
                StepId::new(5, StepKind::HitPoints),
                StagedValue::Spells(Vec::new())
            ),
            Err(SessionError::Validation(ValidationError::WrongKind { .. }))
        ));
    }

    #[test]
    fn test_restaging_subclass_drops_stale_choices() {
        let fighter = sample_character(CharacterClass::Fighter, 2);
        let session = LevelUpSession::level_up(fighter, 3, EngineConfig::default())
            .unwrap()
            .stage(
                StepId::new(3, StepKind::Subclass),
                StagedValue::Subclass("Eldritch Knight".into()),
            )
            .unwrap()
            .stage(
                StepId::new(3, StepKind::Cantrips),
                StagedValue::Cantrips(vec!["Fire Bolt".into(), "Light".into()]),
            )
            .unwrap();
        assert!(session.staged(StepId::new(3, StepKind::Cantrips)).is_some());

        let session = session
            .stage(
                StepId::new(3, StepKind::Subclass),
                StagedValue::Subclass("Champion".into()),
            )
            .unwrap();
        assert!(session.plan().step(StepId::new(3, StepKind::Cantrips)).is_none());
        assert!(session.staged(StepId::new(3, StepKind::Cantrips)).is_none());
    }

    #[test]
    fn test_new_class_prerequisites_checked_on_stage() {
        let character = sample_multiclass();
        let next = character.level + 1;
        let session = LevelUpSession::level_up(character, next, EngineConfig::default()).unwrap();
        let err = session
            .stage(
                StepId::new(next, StepKind::ClassSelect),
                StagedValue::Class(CharacterClass::Monk),
            )
            .unwrap_err();
        assert!(err.to_string().contains("DEX 13 and WIS 13"), "{err}");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_leave_class_policy_on_stage() {
        let mut character = sample_multiclass();
        character.ability_scores.strength = 10;
        character.ability_scores.dexterity = 10;
        let next = character.level + 1;
        let class_select = StepId::new(next, StepKind::ClassSelect);

        let session =
            LevelUpSession::level_up(character.clone(), next, EngineConfig::default()).unwrap();
        assert!(matches!(
            session.stage(class_select, StagedValue::Class(CharacterClass::Wizard)),
            Err(SessionError::Prerequisite(PrerequisiteError::CannotLeave {
                class: CharacterClass::Fighter,
                ..
            }))
        ));
        assert!(session
            .stage(class_select, StagedValue::Class(CharacterClass::Fighter))
            .is_ok());

        let warn = EngineConfig::default().with_leave_class_policy(LeaveClassPolicy::Warn);
        let session = LevelUpSession::level_up(character, next, warn)
            .unwrap()
            .stage(class_select, StagedValue::Class(CharacterClass::Wizard))
            .unwrap();
        assert_eq!(session.class_to_level(), Some(CharacterClass::Wizard));
        assert!(session.can_advance());
    }

    #[test]
    fn test_stale_options_are_dropped() {
        let fighter = sample_character(CharacterClass::Fighter, 3);
        let asi = StepId::new(4, StepKind::AbilityScoreImprovement);
        let session = LevelUpSession::level_up(fighter, 5, EngineConfig::default())
            .unwrap()
            .with_options(StepId::new(5, StepKind::HitPoints), StepOptions::Spells(Vec::new()))
            .unwrap()
            .stage(
                asi,
                StagedValue::AbilityScoreImprovement(AsiChoice::plus_two(Ability::Strength)),
            )
            .unwrap();
        // The level-5 step now sees the raised score.
        assert!(session.step_options(StepId::new(5, StepKind::HitPoints)).is_none());
    }

    #[tokio::test]
    async fn test_wizard_loads_and_caches_options() {
        let wizard = sample_character(CharacterClass::Wizard, 4);
        let id = wizard.id;
        let mut levels = LevelUpWizard::new(MemoryStore::with_character(wizard).await, EngineConfig::default());
        assert!(matches!(levels.validation(), Err(SessionError::NoSession)));

        levels.start_session(id, 5).await.unwrap();
        let spells = StepId::new(5, StepKind::Spells);
        let Some(StepOptions::Spells(names)) = levels.options(spells).await.unwrap() else {
            panic!("expected spell options");
        };
        assert!(names.iter().any(|n| n == "Fireball"));
        assert!(!names.iter().any(|n| n == "Cone of Cold"));
        assert!(levels.session().unwrap().step_options(spells).is_some());
        assert_eq!(levels.options(StepId::new(5, StepKind::HitPoints)).await.unwrap(), None);

        assert!(levels.cancel());
        assert!(!levels.cancel());
    }

    #[tokio::test]
    async fn test_roll_hit_points_stages_a_valid_roll() {
        use rand::SeedableRng;
        let wizard = sample_character(CharacterClass::Wizard, 4);
        let id = wizard.id;
        let mut levels = LevelUpWizard::new(MemoryStore::with_character(wizard).await, EngineConfig::default());
        levels.start_session(id, 5).await.unwrap();
        let hp = StepId::new(5, StepKind::HitPoints);
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let value = levels.roll_hit_points_with(hp, &mut rng).unwrap();
        assert!((1..=6).contains(&value));
        assert!(levels.can_advance());
        assert!(matches!(
            levels.roll_hit_points(StepId::new(5, StepKind::Spells)),
            Err(SessionError::UnknownStep(_))
        ));
    }
}
