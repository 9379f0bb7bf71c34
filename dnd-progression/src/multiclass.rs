//! Multiclass eligibility: adding a class, leaving one, and what a new class
//! grants.

use crate::character::{AbilityScores, Character, CharacterClass, MAX_CHARACTER_LEVEL};
use crate::choices::HeldChoices;
use crate::class_data::MulticlassGrants;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A user-correctable multiclass rejection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrerequisiteError {
    #[error("{0} is already one of this character's classes")]
    AlreadyHeld(CharacterClass),

    #[error("Character is already level {}", MAX_CHARACTER_LEVEL)]
    LevelCap,

    #[error("Multiclassing into {class} requires {requirement}")]
    AbilityScores {
        class: CharacterClass,
        requirement: String,
    },

    #[error("Cannot stop advancing {class} without {requirement}")]
    CannotLeave {
        class: CharacterClass,
        requirement: String,
    },
}

/// How to treat a character leaving a class whose own multiclass
/// prerequisites they no longer meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LeaveClassPolicy {
    /// Reject the new class.
    #[default]
    Enforce,
    /// Allow it, reporting a warning.
    Warn,
    /// Skip the check.
    Allow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveClassCheck {
    Allowed,
    Warning(String),
}

/// Check whether `character` may take a first level in `candidate`.
pub fn can_add_class(
    character: &Character,
    candidate: CharacterClass,
    scores: &AbilityScores,
) -> Result<(), PrerequisiteError> {
    check_add_class(&HeldChoices::from_character(character), candidate, scores)
}

/// [`can_add_class`] against a held state part-way through a plan.
pub fn check_add_class(
    held: &HeldChoices,
    candidate: CharacterClass,
    scores: &AbilityScores,
) -> Result<(), PrerequisiteError> {
    if held.class_level(candidate) > 0 {
        return Err(PrerequisiteError::AlreadyHeld(candidate));
    }
    if held.total_level() >= MAX_CHARACTER_LEVEL {
        return Err(PrerequisiteError::LevelCap);
    }
    let requirement = candidate.rules().multiclass_requirement;
    if !requirement.is_met(scores) {
        return Err(PrerequisiteError::AbilityScores {
            class: candidate,
            requirement: requirement.describe(),
        });
    }
    Ok(())
}

/// Check whether the character may branch away from `current`, given the
/// prerequisites of `current` itself.
pub fn can_leave_class(
    current: CharacterClass,
    scores: &AbilityScores,
    policy: LeaveClassPolicy,
) -> Result<LeaveClassCheck, PrerequisiteError> {
    let requirement = current.rules().multiclass_requirement;
    if policy == LeaveClassPolicy::Allow || requirement.is_met(scores) {
        return Ok(LeaveClassCheck::Allowed);
    }
    match policy {
        LeaveClassPolicy::Warn => Ok(LeaveClassCheck::Warning(format!(
            "{current} normally requires {} to multiclass",
            requirement.describe()
        ))),
        _ => Err(PrerequisiteError::CannotLeave {
            class: current,
            requirement: requirement.describe(),
        }),
    }
}

/// Check a class-select choice. A class not yet held must meet its
/// prerequisites, and moving away from `default` must pass the leave-class
/// policy for `default`.
pub fn check_class_switch(
    held: &HeldChoices,
    default: CharacterClass,
    chosen: CharacterClass,
    policy: LeaveClassPolicy,
) -> Result<LeaveClassCheck, PrerequisiteError> {
    if held.class_level(chosen) == 0 {
        check_add_class(held, chosen, &held.ability_scores)?;
    }
    if chosen == default {
        return Ok(LeaveClassCheck::Allowed);
    }
    can_leave_class(default, &held.ability_scores, policy)
}

/// Proficiencies and skill picks granted by a first level in `class` taken
/// as a secondary class.
pub fn multiclass_grants(class: CharacterClass) -> MulticlassGrants {
    class.rules().multiclass_grants
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::ClassEntry;

    fn wizard(level: u8) -> Character {
        let mut character = Character::new("Mage");
        character.level = level;
        character.classes = vec![ClassEntry::new(CharacterClass::Wizard, level, true)];
        character.ability_scores = AbilityScores::new(10, 10, 12, 16, 12, 10);
        character
    }

    #[test]
    fn test_fighter_requires_str_or_dex() {
        let character = wizard(3);
        let err = can_add_class(&character, CharacterClass::Fighter, &character.ability_scores)
            .unwrap_err();
        assert!(err.to_string().contains("STR 13 or DEX 13"));

        let dexterous = AbilityScores::new(10, 13, 12, 16, 12, 10);
        assert!(can_add_class(&character, CharacterClass::Fighter, &dexterous).is_ok());
    }

    #[test]
    fn test_conjunctive_requirement() {
        let character = wizard(3);
        let scores = AbilityScores::new(10, 14, 12, 16, 12, 10);
        let err = can_add_class(&character, CharacterClass::Monk, &scores).unwrap_err();
        assert_eq!(
            err,
            PrerequisiteError::AbilityScores {
                class: CharacterClass::Monk,
                requirement: "DEX 13 and WIS 13".to_string(),
            }
        );
    }

    #[test]
    fn test_already_held_and_level_cap() {
        let character = wizard(3);
        assert_eq!(
            can_add_class(&character, CharacterClass::Wizard, &character.ability_scores),
            Err(PrerequisiteError::AlreadyHeld(CharacterClass::Wizard))
        );
        let capped = wizard(20);
        let scores = AbilityScores::new(16, 16, 16, 16, 16, 16);
        assert_eq!(
            can_add_class(&capped, CharacterClass::Fighter, &scores),
            Err(PrerequisiteError::LevelCap)
        );
    }

    #[test]
    fn test_class_switch_checks_the_class_left() {
        let mut held = HeldChoices::from_character(&wizard(3));
        held.class_levels.insert(CharacterClass::Fighter, 2);
        held.ability_scores = AbilityScores::new(14, 10, 12, 10, 12, 10);
        let policy = LeaveClassPolicy::Enforce;
        // Staying in the default class never trips the leave check.
        assert_eq!(
            check_class_switch(&held, CharacterClass::Wizard, CharacterClass::Wizard, policy),
            Ok(LeaveClassCheck::Allowed)
        );
        assert_eq!(
            check_class_switch(&held, CharacterClass::Wizard, CharacterClass::Fighter, policy),
            Err(PrerequisiteError::CannotLeave {
                class: CharacterClass::Wizard,
                requirement: "INT 13".to_string(),
            })
        );
        assert!(check_class_switch(
            &held,
            CharacterClass::Fighter,
            CharacterClass::Wizard,
            policy
        )
        .is_ok());
    }

    #[test]
    fn test_leave_class_policies() {
        let weak = AbilityScores::new(10, 10, 10, 10, 10, 10);
        assert!(matches!(
            can_leave_class(CharacterClass::Wizard, &weak, LeaveClassPolicy::Enforce),
            Err(PrerequisiteError::CannotLeave { .. })
        ));
        assert!(matches!(
            can_leave_class(CharacterClass::Wizard, &weak, LeaveClassPolicy::Warn),
            Ok(LeaveClassCheck::Warning(_))
        ));
        assert_eq!(
            can_leave_class(CharacterClass::Wizard, &weak, LeaveClassPolicy::Allow),
            Ok(LeaveClassCheck::Allowed)
        );
        let smart = AbilityScores::new(10, 10, 10, 13, 10, 10);
        assert_eq!(
            can_leave_class(CharacterClass::Wizard, &smart, LeaveClassPolicy::Enforce),
            Ok(LeaveClassCheck::Allowed)
        );
    }

    #[test]
    fn test_grants() {
        assert_eq!(multiclass_grants(CharacterClass::Rogue).skill_picks, 1);
        assert!(multiclass_grants(CharacterClass::Bard).any_skill);
        assert_eq!(multiclass_grants(CharacterClass::Wizard).skill_picks, 0);
    }
}
