//! Choice validation.
//!
//! [`validate_step`] decides whether the value staged for one planned step
//! is complete and legal. It never panics and never touches I/O; a failure
//! only keeps the session on the same step.

use crate::catalog::SpellFilter;
use crate::character::{Ability, ProficiencyLevel, Skill, MAX_ABILITY_SCORE};
use crate::choices::{feat_ability, AsiChoice, HeldChoices, HitPointChoice, StagedValue, StepKind, StepOptions};
use crate::config::{EngineConfig, HitPointPolicy};
use crate::dice::DieType;
use crate::eligibility::caster_progression;
use crate::feats::{find_feat, FeatFilter};
use crate::multiclass::{check_class_switch, PrerequisiteError};
use crate::options::{find_invocation, find_subclass, subclasses_for, ELDRITCH_BLAST};
use crate::planner::{PlannedStep, StepRequirement};
use crate::progression::CasterProgression;
use crate::spells::{get_spell, SpellClass};
use std::collections::HashSet;
use thiserror::Error;

/// Why a staged value cannot be accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Nothing staged for {0}")]
    Missing(StepKind),

    #[error("Expected a {expected} value, got {found}")]
    WrongKind { expected: StepKind, found: StepKind },

    #[error("Choose exactly {expected}, {found} chosen")]
    WrongCount { expected: u8, found: usize },

    #[error("{0} was chosen more than once")]
    Duplicate(String),

    #[error("{0} is already known")]
    AlreadyHeld(String),

    #[error("{0} is not an available option")]
    NotAvailable(String),

    #[error("{value} is not a valid {die} result")]
    InvalidRoll { value: u8, die: DieType },

    #[error("Only the average hit point value is allowed")]
    AverageOnly,

    #[error("Invalid ability increase: {0}")]
    InvalidIncrease(String),

    #[error("{} would rise to {score}, above the maximum of {}", .ability.name(), MAX_ABILITY_SCORE)]
    ExceedsMaximum { ability: Ability, score: u8 },

    #[error("Not proficient in {}", .0.name())]
    NotProficient(Skill),

    #[error("Already has expertise in {}", .0.name())]
    AlreadyExpert(Skill),

    #[error("At most {allowed} replacement(s) allowed, {found} given")]
    TooManyReplacements { allowed: u8, found: usize },

    #[error("{name} requires {requirement}")]
    UnmetRequirement { name: String, requirement: String },

    #[error(transparent)]
    Prerequisite(#[from] PrerequisiteError),

    #[error("No options available: {0}")]
    NoOptions(String),
}

/// Everything one validation looks at.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub step: &'a PlannedStep,
    pub staged: Option<&'a StagedValue>,
    /// Options loaded from the rules catalog, when the session has them.
    pub options: Option<&'a StepOptions>,
    pub config: &'a EngineConfig,
}

pub fn can_advance(ctx: &ValidationContext) -> bool {
    validate_step(ctx).is_ok()
}

pub fn validate_step(ctx: &ValidationContext) -> Result<(), ValidationError> {
    let step = ctx.step;
    let kind = step.kind();
    if let Some(StepOptions::Unavailable(reason)) = ctx.options {
        return Err(ValidationError::NoOptions(reason.clone()));
    }

    let value = match ctx.staged {
        Some(value) if value.kind() != kind => {
            return Err(ValidationError::WrongKind {
                expected: kind,
                found: value.kind(),
            })
        }
        Some(value) => value,
        None => {
            return match &step.requirement {
                // The planner falls back to the default class.
                StepRequirement::ClassSelect { .. } => Ok(()),
                StepRequirement::Invocations { count: 0, .. } => Ok(()),
                StepRequirement::Features { .. } | StepRequirement::Review => Ok(()),
                _ => Err(ValidationError::Missing(kind)),
            }
        }
    };
    let held = &step.held_before;

    match (&step.requirement, value) {
        (StepRequirement::ClassSelect { default }, StagedValue::Class(class)) => {
            check_class_switch(held, *default, *class, ctx.config.leave_class_policy)?;
            Ok(())
        }

        (StepRequirement::MulticlassSkills { count, options }, StagedValue::MulticlassSkills(skills)) => {
            expect_count(*count, skills.len())?;
            no_duplicates(skills.iter().map(|s| s.name()))?;
            for skill in skills {
                if !options.contains(skill) {
                    return Err(ValidationError::NotAvailable(skill.name().to_string()));
                }
                if held.skill_level(*skill) != ProficiencyLevel::None {
                    return Err(ValidationError::AlreadyHeld(skill.name().to_string()));
                }
            }
            Ok(())
        }

        (StepRequirement::HitPoints { die }, StagedValue::HitPoints(choice)) => match choice {
            HitPointChoice::Average => Ok(()),
            HitPointChoice::Rolled(_) if ctx.config.hp_policy == HitPointPolicy::AverageOnly => {
                Err(ValidationError::AverageOnly)
            }
            HitPointChoice::Rolled(value) if die.is_face(*value) => Ok(()),
            HitPointChoice::Rolled(value) => Err(ValidationError::InvalidRoll {
                value: *value,
                die: *die,
            }),
        },

        (StepRequirement::Subclass, StagedValue::Subclass(name)) => {
            if subclasses_for(step.class).next().is_none() {
                return Err(ValidationError::NoOptions(format!(
                    "no subclasses for {}",
                    step.class
                )));
            }
            find_subclass(step.class, name)
                .map(|_| ())
                .ok_or_else(|| ValidationError::NotAvailable(name.clone()))
        }

        (StepRequirement::PactBoon, StagedValue::PactBoon(boon)) => {
            if held.pact_boon == Some(*boon) {
                return Err(ValidationError::AlreadyHeld(boon.name().to_string()));
            }
            Ok(())
        }

        (
            StepRequirement::Invocations {
                count,
                replace_count,
            },
            StagedValue::Invocations { learned, replaced },
        ) => validate_invocations(step, held, *count, *replace_count, learned, replaced),

        (StepRequirement::Cantrips { count, list }, StagedValue::Cantrips(names)) => {
            expect_count(*count, names.len())?;
            validate_spells(names, held, ctx.options, &SpellFilter::cantrips(*list))
        }

        (
            StepRequirement::Spells {
                count,
                list,
                max_spell_level,
            },
            StagedValue::Spells(names),
        ) => {
            expect_count(*count, names.len())?;
            validate_spells(
                names,
                held,
                ctx.options,
                &SpellFilter::leveled(*list, *max_spell_level),
            )
        }

        (StepRequirement::MysticArcanum { spell_level }, StagedValue::MysticArcanum(name)) => {
            if held.mystic_arcanum.contains_key(spell_level) {
                return Err(ValidationError::AlreadyHeld(format!(
                    "a level {spell_level} mystic arcanum"
                )));
            }
            validate_spells(
                std::slice::from_ref(name),
                held,
                ctx.options,
                &arcanum_filter(*spell_level),
            )
        }

        (
            StepRequirement::MagicalSecrets {
                count,
                max_spell_level,
            },
            StagedValue::MagicalSecrets(names),
        ) => {
            expect_count(*count, names.len())?;
            validate_spells(names, held, ctx.options, &secrets_filter(*max_spell_level))
        }

        (StepRequirement::Metamagic { count }, StagedValue::Metamagic(chosen)) => {
            expect_count(*count, chosen.len())?;
            no_duplicates(chosen.iter().map(|m| m.name()))?;
            match chosen.iter().find(|m| held.metamagic.contains(m)) {
                Some(m) => Err(ValidationError::AlreadyHeld(m.name().to_string())),
                None => Ok(()),
            }
        }

        (StepRequirement::FightingStyle, StagedValue::FightingStyle(style)) => {
            if held.fighting_styles.contains(style) {
                return Err(ValidationError::AlreadyHeld(style.name().to_string()));
            }
            if !style.available_to(step.class) {
                return Err(ValidationError::NotAvailable(style.name().to_string()));
            }
            Ok(())
        }

        (StepRequirement::Expertise { count }, StagedValue::Expertise(skills)) => {
            expect_count(*count, skills.len())?;
            no_duplicates(skills.iter().map(|s| s.name()))?;
            for skill in skills {
                match held.skill_level(*skill) {
                    ProficiencyLevel::None => return Err(ValidationError::NotProficient(*skill)),
                    ProficiencyLevel::Expertise => return Err(ValidationError::AlreadyExpert(*skill)),
                    ProficiencyLevel::Proficient => {}
                }
            }
            Ok(())
        }

        (StepRequirement::FavoredEnemy, StagedValue::FavoredEnemy(enemy)) => {
            if held.favored_enemies.contains(enemy) {
                return Err(ValidationError::AlreadyHeld(enemy.name().to_string()));
            }
            Ok(())
        }

        (StepRequirement::FavoredTerrain, StagedValue::FavoredTerrain(terrain)) => {
            if held.favored_terrains.contains(terrain) {
                return Err(ValidationError::AlreadyHeld(terrain.name().to_string()));
            }
            Ok(())
        }

        (StepRequirement::AbilityScoreImprovement, StagedValue::AbilityScoreImprovement(choice)) => {
            validate_asi(held, ctx.options, choice)
        }

        (StepRequirement::Features { .. } | StepRequirement::Review, _) => Ok(()),

        (_, other) => Err(ValidationError::WrongKind {
            expected: kind,
            found: other.kind(),
        }),
    }
}

// ============================================================================
// Option queries
// ============================================================================

fn arcanum_filter(spell_level: u8) -> SpellFilter {
    SpellFilter {
        lists: vec![SpellClass::Warlock],
        min_level: spell_level,
        max_level: spell_level,
        exclude: Vec::new(),
    }
}

fn secrets_filter(max_spell_level: u8) -> SpellFilter {
    SpellFilter {
        lists: Vec::new(),
        min_level: 0,
        max_level: max_spell_level,
        exclude: Vec::new(),
    }
}

/// The spell query a step offers options from, excluding spells already
/// known. `None` for steps that do not pick spells.
pub fn spell_filter(step: &PlannedStep) -> Option<SpellFilter> {
    let filter = match &step.requirement {
        StepRequirement::Cantrips { list, .. } => SpellFilter::cantrips(*list),
        StepRequirement::Spells {
            list,
            max_spell_level,
            ..
        } => SpellFilter::leveled(*list, *max_spell_level),
        StepRequirement::MysticArcanum { spell_level } => arcanum_filter(*spell_level),
        StepRequirement::MagicalSecrets {
            max_spell_level, ..
        } => secrets_filter(*max_spell_level),
        _ => return None,
    };
    Some(filter.with_exclude(step.held_before.known_spell_names()))
}

/// The feat query for an ASI step.
pub fn feat_filter(held: &HeldChoices) -> FeatFilter {
    let spellcaster = held.class_levels.iter().any(|(class, level)| {
        *level > 0
            && caster_progression(
                *class,
                held.subclass(*class).and_then(|name| find_subclass(*class, name)),
            ) != CasterProgression::None
    });
    FeatFilter {
        ability_scores: held.ability_scores.clone(),
        spellcaster,
        proficiencies: held.other_proficiencies.clone(),
        held: held.feats.clone(),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn expect_count(expected: u8, found: usize) -> Result<(), ValidationError> {
    if found == expected as usize {
        Ok(())
    } else {
        Err(ValidationError::WrongCount { expected, found })
    }
}

fn no_duplicates<'a>(names: impl Iterator<Item = &'a str>) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.to_ascii_lowercase()) {
            return Err(ValidationError::Duplicate(name.to_string()));
        }
    }
    Ok(())
}

fn validate_spells(
    names: &[String],
    held: &HeldChoices,
    options: Option<&StepOptions>,
    filter: &SpellFilter,
) -> Result<(), ValidationError> {
    no_duplicates(names.iter().map(String::as_str))?;
    for name in names {
        if held.knows_spell(name) {
            return Err(ValidationError::AlreadyHeld(name.clone()));
        }
        let available = match options {
            Some(StepOptions::Spells(offered)) => offered.iter().any(|o| o.eq_ignore_ascii_case(name)),
            _ => get_spell(name).is_some_and(|spell| filter.matches(spell)),
        };
        if !available {
            return Err(ValidationError::NotAvailable(name.clone()));
        }
    }
    Ok(())
}

fn validate_invocations(
    step: &PlannedStep,
    held: &HeldChoices,
    count: u8,
    replace_count: u8,
    learned: &[String],
    replaced: &[(String, String)],
) -> Result<(), ValidationError> {
    expect_count(count, learned.len())?;
    if replaced.len() > replace_count as usize {
        return Err(ValidationError::TooManyReplacements {
            allowed: replace_count,
            found: replaced.len(),
        });
    }
    no_duplicates(replaced.iter().map(|(old, _)| old.as_str()))?;
    for (old, _) in replaced {
        if !held.has_invocation(old) {
            return Err(ValidationError::NotAvailable(old.clone()));
        }
    }

    let incoming = || learned.iter().chain(replaced.iter().map(|(_, new)| new));
    no_duplicates(incoming().map(String::as_str))?;
    for name in incoming() {
        let invocation =
            find_invocation(name).ok_or_else(|| ValidationError::NotAvailable(name.clone()))?;
        if held.has_invocation(name) {
            return Err(ValidationError::AlreadyHeld(name.clone()));
        }
        if step.class_level < invocation.min_level {
            return Err(ValidationError::UnmetRequirement {
                name: name.clone(),
                requirement: format!("warlock level {}", invocation.min_level),
            });
        }
        if let Some(pact) = invocation.requires_pact {
            if held.pact_boon != Some(pact) {
                return Err(ValidationError::UnmetRequirement {
                    name: name.clone(),
                    requirement: pact.name().to_string(),
                });
            }
        }
        if invocation.requires_eldritch_blast && !held.knows_spell(ELDRITCH_BLAST) {
            return Err(ValidationError::UnmetRequirement {
                name: name.clone(),
                requirement: format!("the {ELDRITCH_BLAST} cantrip"),
            });
        }
    }
    Ok(())
}

fn validate_asi(
    held: &HeldChoices,
    options: Option<&StepOptions>,
    choice: &AsiChoice,
) -> Result<(), ValidationError> {
    match choice {
        AsiChoice::Increases(increases) => {
            let total: u32 = increases.values().map(|v| u32::from(*v)).sum();
            if total != 2 {
                return Err(ValidationError::InvalidIncrease(format!(
                    "increases must total 2, not {total}"
                )));
            }
            for (ability, amount) in increases {
                if *amount == 0 {
                    return Err(ValidationError::InvalidIncrease(format!(
                        "{} is listed with no increase",
                        ability.name()
                    )));
                }
                let score = held.ability_scores.get(*ability) + amount;
                if score > MAX_ABILITY_SCORE {
                    return Err(ValidationError::ExceedsMaximum {
                        ability: *ability,
                        score,
                    });
                }
            }
            Ok(())
        }
        AsiChoice::Feat { name, ability } => {
            let feat = find_feat(name).ok_or_else(|| ValidationError::NotAvailable(name.clone()))?;
            if held.has_feat(name) {
                return Err(ValidationError::AlreadyHeld(name.clone()));
            }
            match options {
                Some(StepOptions::Feats(offered)) => {
                    if !offered.iter().any(|f| f.name == feat.name) {
                        return Err(ValidationError::NotAvailable(name.clone()));
                    }
                }
                _ => {
                    let unmet = feat.unmet_prerequisites(&feat_filter(held));
                    if !unmet.is_empty() {
                        return Err(ValidationError::UnmetRequirement {
                            name: feat.name.to_string(),
                            requirement: unmet.join(", "),
                        });
                    }
                }
            }
            if feat.requires_ability_choice() && feat_ability(feat, *ability).is_none() {
                return Err(ValidationError::InvalidIncrease(format!(
                    "choose which ability {} increases",
                    feat.name
                )));
            }
            if let Some(raised) = feat_ability(feat, *ability) {
                let score = held.ability_scores.get(raised) + 1;
                if score > MAX_ABILITY_SCORE {
                    return Err(ValidationError::ExceedsMaximum {
                        ability: raised,
                        score,
                    });
                }
                if feat.grants_saving_throw && held.saving_throws.contains(&raised) {
                    return Err(ValidationError::AlreadyHeld(format!(
                        "{} saving throws",
                        raised.name()
                    )));
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::CharacterClass;
    use crate::choices::StepId;
    use crate::multiclass::LeaveClassPolicy;
    use crate::options::{FightingStyle, Metamagic, PactBoon};
    use crate::planner::{plan, PlanMode, PlanOptions};
    use crate::testing::sample_character;
    use std::collections::BTreeMap;

    fn step_for(class: CharacterClass, from: u8, kind: StepKind) -> PlannedStep {
        let character = sample_character(class, from);
        let plan = plan(
            &character,
            from,
            from + 1,
            PlanMode::LevelUp,
            &BTreeMap::new(),
            &PlanOptions::default(),
        );
        plan.step(StepId::new(from + 1, kind))
            .cloned()
            .unwrap_or_else(|| panic!("{class} {from}->{} has no {kind} step", from + 1))
    }

    fn check(step: &PlannedStep, value: StagedValue) -> Result<(), ValidationError> {
        let config = EngineConfig::default();
        validate_step(&ValidationContext {
            step,
            staged: Some(&value),
            options: None,
            config: &config,
        })
    }

    #[test]
    fn test_switching_away_from_primary_applies_leave_policy() {
        let mut character = crate::testing::sample_multiclass();
        character.ability_scores.strength = 10;
        character.ability_scores.dexterity = 10;
        let plan = plan(
            &character,
            character.level,
            character.level + 1,
            PlanMode::LevelUp,
            &BTreeMap::new(),
            &PlanOptions::default(),
        );
        let step = plan.steps[0].clone();
        assert_eq!(
            step.requirement,
            StepRequirement::ClassSelect { default: CharacterClass::Fighter }
        );
        let wizard = StagedValue::Class(CharacterClass::Wizard);
        assert!(matches!(
            check(&step, wizard.clone()),
            Err(ValidationError::Prerequisite(PrerequisiteError::CannotLeave {
                class: CharacterClass::Fighter,
                ..
            }))
        ));
        assert!(check(&step, StagedValue::Class(CharacterClass::Fighter)).is_ok());

        let warn = EngineConfig::default().with_leave_class_policy(LeaveClassPolicy::Warn);
        let ctx = ValidationContext {
            step: &step,
            staged: Some(&wizard),
            options: None,
            config: &warn,
        };
        assert!(validate_step(&ctx).is_ok());
    }

    #[test]
    fn test_missing_value_blocks() {
        let step = step_for(CharacterClass::Warlock, 2, StepKind::PactBoon);
        let config = EngineConfig::default();
        let ctx = ValidationContext {
            step: &step,
            staged: None,
            options: None,
            config: &config,
        };
        assert_eq!(validate_step(&ctx), Err(ValidationError::Missing(StepKind::PactBoon)));
        assert!(!can_advance(&ctx));
        assert!(check(&step, StagedValue::PactBoon(PactBoon::Tome)).is_ok());
    }

    #[test]
    fn test_wrong_kind() {
        let step = step_for(CharacterClass::Warlock, 2, StepKind::PactBoon);
        assert_eq!(
            check(&step, StagedValue::Subclass("The Fiend".into())),
            Err(ValidationError::WrongKind {
                expected: StepKind::PactBoon,
                found: StepKind::Subclass,
            })
        );
    }

    #[test]
    fn test_hit_points() {
        let step = step_for(CharacterClass::Wizard, 4, StepKind::HitPoints);
        assert!(check(&step, StagedValue::HitPoints(HitPointChoice::Average)).is_ok());
        assert!(check(&step, StagedValue::HitPoints(HitPointChoice::Rolled(6))).is_ok());
        assert_eq!(
            check(&step, StagedValue::HitPoints(HitPointChoice::Rolled(7))),
            Err(ValidationError::InvalidRoll { value: 7, die: DieType::D6 })
        );
        let config = EngineConfig::default().with_hp_policy(HitPointPolicy::AverageOnly);
        let rolled = StagedValue::HitPoints(HitPointChoice::Rolled(3));
        let ctx = ValidationContext {
            step: &step,
            staged: Some(&rolled),
            options: None,
            config: &config,
        };
        assert_eq!(validate_step(&ctx), Err(ValidationError::AverageOnly));
    }

    #[test]
    fn test_spell_count_must_be_exact() {
        let step = step_for(CharacterClass::Wizard, 4, StepKind::Spells);
        assert_eq!(
            check(&step, StagedValue::Spells(vec!["Fireball".into()])),
            Err(ValidationError::WrongCount { expected: 2, found: 1 })
        );
        assert!(check(
            &step,
            StagedValue::Spells(vec!["Fireball".into(), "Counterspell".into()])
        )
        .is_ok());
        assert_eq!(
            check(
                &step,
                StagedValue::Spells(vec!["Fireball".into(), "fireball".into()])
            ),
            Err(ValidationError::Duplicate("fireball".into()))
        );
        assert_eq!(
            check(
                &step,
                StagedValue::Spells(vec!["Fireball".into(), "Cure Wounds".into()])
            ),
            Err(ValidationError::NotAvailable("Cure Wounds".into()))
        );
        // Above the castable spell level.
        assert_eq!(
            check(
                &step,
                StagedValue::Spells(vec!["Fireball".into(), "Cone of Cold".into()])
            ),
            Err(ValidationError::NotAvailable("Cone of Cold".into()))
        );
    }

    #[test]
    fn test_loaded_options_take_precedence() {
        let step = step_for(CharacterClass::Wizard, 4, StepKind::Spells);
        let config = EngineConfig::default();
        let value = StagedValue::Spells(vec!["Fireball".into(), "Fly".into()]);
        let offered = StepOptions::Spells(vec!["Fireball".into()]);
        let ctx = ValidationContext {
            step: &step,
            staged: Some(&value),
            options: Some(&offered),
            config: &config,
        };
        assert_eq!(validate_step(&ctx), Err(ValidationError::NotAvailable("Fly".into())));

        let unavailable = StepOptions::Unavailable("catalog offline".into());
        let ctx = ValidationContext {
            options: Some(&unavailable),
            ..ctx
        };
        assert_eq!(
            validate_step(&ctx),
            Err(ValidationError::NoOptions("catalog offline".into()))
        );
    }

    #[test]
    fn test_asi_rules() {
        let step = step_for(CharacterClass::Fighter, 3, StepKind::AbilityScoreImprovement);
        assert!(check(
            &step,
            StagedValue::AbilityScoreImprovement(AsiChoice::plus_one_each(
                Ability::Strength,
                Ability::Constitution
            ))
        )
        .is_ok());
        let three = AsiChoice::Increases(BTreeMap::from([(Ability::Strength, 2), (Ability::Dexterity, 1)]));
        assert!(matches!(
            check(&step, StagedValue::AbilityScoreImprovement(three)),
            Err(ValidationError::InvalidIncrease(_))
        ));
    }

    #[test]
    fn test_asi_cannot_exceed_twenty() {
        let mut fighter = sample_character(CharacterClass::Fighter, 3);
        fighter.ability_scores.strength = 19;
        let plan = plan(&fighter, 3, 4, PlanMode::LevelUp, &BTreeMap::new(), &PlanOptions::default());
        let step = plan.step(StepId::new(4, StepKind::AbilityScoreImprovement)).unwrap();
        assert_eq!(
            check(step, StagedValue::AbilityScoreImprovement(AsiChoice::plus_two(Ability::Strength))),
            Err(ValidationError::ExceedsMaximum { ability: Ability::Strength, score: 21 })
        );
        assert!(check(
            step,
            StagedValue::AbilityScoreImprovement(AsiChoice::plus_one_each(
                Ability::Strength,
                Ability::Dexterity
            ))
        )
        .is_ok());
    }

    #[test]
    fn test_feat_choice() {
        let step = step_for(CharacterClass::Fighter, 3, StepKind::AbilityScoreImprovement);
        assert!(check(&step, StagedValue::AbilityScoreImprovement(AsiChoice::feat("Alert"))).is_ok());
        assert!(matches!(
            check(&step, StagedValue::AbilityScoreImprovement(AsiChoice::feat("Resilient"))),
            Err(ValidationError::InvalidIncrease(_))
        ));
        assert!(check(
            &step,
            StagedValue::AbilityScoreImprovement(AsiChoice::Feat {
                name: "Resilient".into(),
                ability: Some(Ability::Wisdom),
            })
        )
        .is_ok());
        assert!(matches!(
            check(&step, StagedValue::AbilityScoreImprovement(AsiChoice::feat("War Caster"))),
            Err(ValidationError::UnmetRequirement { .. })
        ));
    }

    #[test]
    fn test_feat_increase_respects_held_state() {
        let mut step = step_for(CharacterClass::Fighter, 3, StepKind::AbilityScoreImprovement);
        let feat = |name: &str, ability| {
            StagedValue::AbilityScoreImprovement(AsiChoice::Feat {
                name: name.into(),
                ability: Some(ability),
            })
        };
        assert_eq!(
            check(&step, feat("Resilient", Ability::Strength)),
            Err(ValidationError::AlreadyHeld("Strength saving throws".into()))
        );

        step.held_before.ability_scores.strength = 20;
        assert_eq!(
            check(&step, feat("Weapon Master", Ability::Strength)),
            Err(ValidationError::ExceedsMaximum {
                ability: Ability::Strength,
                score: 21,
            })
        );
        assert!(check(&step, feat("Weapon Master", Ability::Dexterity)).is_ok());
    }

    #[test]
    fn test_expertise_requires_proficiency() {
        let step = step_for(CharacterClass::Rogue, 5, StepKind::Expertise);
        let proficient: Vec<Skill> = step
            .held_before
            .skills
            .iter()
            .filter(|(_, level)| **level == ProficiencyLevel::Proficient)
            .map(|(skill, _)| *skill)
            .collect();
        assert!(proficient.len() >= 2, "fixture rogue needs spare proficiencies");
        assert!(check(&step, StagedValue::Expertise(proficient[..2].to_vec())).is_ok());

        let untrained = Skill::all()
            .iter()
            .copied()
            .find(|s| step.held_before.skill_level(*s) == ProficiencyLevel::None)
            .unwrap();
        assert_eq!(
            check(&step, StagedValue::Expertise(vec![proficient[0], untrained])),
            Err(ValidationError::NotProficient(untrained))
        );
        let expert = step
            .held_before
            .skills
            .iter()
            .find(|(_, level)| **level == ProficiencyLevel::Expertise)
            .map(|(skill, _)| *skill)
            .unwrap();
        assert_eq!(
            check(&step, StagedValue::Expertise(vec![proficient[0], expert])),
            Err(ValidationError::AlreadyExpert(expert))
        );
    }

    #[test]
    fn test_fighting_style_unique_and_class_bound() {
        let step = step_for(CharacterClass::Paladin, 1, StepKind::FightingStyle);
        assert!(check(&step, StagedValue::FightingStyle(FightingStyle::Defense)).is_ok());
        assert_eq!(
            check(&step, StagedValue::FightingStyle(FightingStyle::Archery)),
            Err(ValidationError::NotAvailable("Archery".into()))
        );
    }

    #[test]
    fn test_metamagic() {
        let step = step_for(CharacterClass::Sorcerer, 2, StepKind::Metamagic);
        assert!(check(
            &step,
            StagedValue::Metamagic(vec![Metamagic::Quickened, Metamagic::Twinned])
        )
        .is_ok());
        assert!(matches!(
            check(
                &step,
                StagedValue::Metamagic(vec![Metamagic::Quickened, Metamagic::Quickened])
            ),
            Err(ValidationError::Duplicate(_))
        ));
    }

    #[test]
    fn test_invocation_prerequisites() {
        let step = step_for(CharacterClass::Warlock, 4, StepKind::Invocations);
        assert_eq!(
            step.requirement,
            StepRequirement::Invocations { count: 1, replace_count: 1 }
        );
        assert!(check(
            &step,
            StagedValue::Invocations {
                learned: vec!["Mire the Mind".into()],
                replaced: vec![],
            }
        )
        .is_ok());
        assert!(matches!(
            check(
                &step,
                StagedValue::Invocations {
                    learned: vec!["Witch Sight".into()],
                    replaced: vec![],
                }
            ),
            Err(ValidationError::UnmetRequirement { .. })
        ));
        assert!(matches!(
            check(
                &step,
                StagedValue::Invocations {
                    learned: vec!["Thirsting Blade".into()],
                    replaced: vec![],
                }
            ),
            Err(ValidationError::UnmetRequirement { .. })
        ));
        let held = step.held_before.invocations[0].clone();
        assert_eq!(
            check(
                &step,
                StagedValue::Invocations {
                    learned: vec!["Devil's Sight".into()],
                    replaced: vec![(held.clone(), "Misty Visions".into()), (held, "Beast Speech".into())],
                }
            ),
            Err(ValidationError::TooManyReplacements { allowed: 1, found: 2 })
        );
    }

    #[test]
    fn test_subclass_must_exist() {
        let step = step_for(CharacterClass::Fighter, 2, StepKind::Subclass);
        assert!(check(&step, StagedValue::Subclass("Champion".into())).is_ok());
        assert_eq!(
            check(&step, StagedValue::Subclass("Way of the Open Hand".into())),
            Err(ValidationError::NotAvailable("Way of the Open Hand".into()))
        );
    }
}
