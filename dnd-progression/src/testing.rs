//! Testing utilities for progression.
//!
//! This module provides tools for unit and integration testing:
//! - `sample_character` and `sample_multiclass` fixtures with every choice
//!   made for their level
//! - `FlakyStore` for exercising commit failures
//! - `PartialCatalog` for exercising missing class rules
//! - Assertion helpers for verifying character state

use crate::catalog::{CatalogError, RulesSource, SpellFilter, StaticCatalog};
use crate::character::{
    Ability, AbilityScores, Character, CharacterClass, CharacterId, ClassEntry, ClassSpellcasting,
    HitDieRoll, ProficiencyLevel,
};
use crate::character_builder::{recompute_derived, CharacterBuilder};
use crate::class_data::{ClassRules, FeatureChoiceSpec};
use crate::commit::TransitionUpdate;
use crate::eligibility::{cantrip_gain, max_spell_level, spells_known_gain};
use crate::feats::{FeatData, FeatFilter};
use crate::options::{subclasses_for, FavoredEnemy, FavoredTerrain, FightingStyle, Metamagic, PactBoon, Subclass};
use crate::progression::invocations_known;
use crate::spells::{spells_for_class, SpellClass, SpellData};
use crate::store::{CharacterStore, StoreError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Invocations a sample warlock learns, in order. None has a pact or level
/// prerequisite; the first needs Eldritch Blast.
const SAMPLE_INVOCATIONS: [&str; 8] = [
    "Agonizing Blast",
    "Armor of Shadows",
    "Eldritch Sight",
    "Mask of Many Faces",
    "Eyes of the Rune Keeper",
    "Fiendish Vigor",
    "Gaze of Two Minds",
    "Thief of Five Fates",
];

/// Ability scores for a sample character: 15 in the primary ability, 14 in
/// the secondary, CON 13 and 10 elsewhere.
pub fn sample_scores(class: CharacterClass) -> AbilityScores {
    use Ability::*;
    let (primary, secondary) = match class {
        CharacterClass::Barbarian => (Strength, Dexterity),
        CharacterClass::Bard => (Charisma, Dexterity),
        CharacterClass::Cleric => (Wisdom, Strength),
        CharacterClass::Druid => (Wisdom, Intelligence),
        CharacterClass::Fighter => (Strength, Dexterity),
        CharacterClass::Monk => (Dexterity, Wisdom),
        CharacterClass::Paladin => (Strength, Charisma),
        CharacterClass::Ranger => (Dexterity, Wisdom),
        CharacterClass::Rogue => (Dexterity, Intelligence),
        CharacterClass::Sorcerer => (Charisma, Dexterity),
        CharacterClass::Warlock => (Charisma, Dexterity),
        CharacterClass::Wizard => (Intelligence, Dexterity),
    };
    let mut scores = AbilityScores::new(10, 10, 13, 10, 10, 10);
    scores.set(primary, 15);
    scores.set(secondary, 14);
    scores
}

/// A single-classed character at `level` with every choice already made.
///
/// Hit dice are the maximum at first level and the fixed average after.
/// Skills, subclass, spells and class options are the first legal entries
/// of each catalog, so the fixture is deterministic.
pub fn sample_character(class: CharacterClass, level: u8) -> Character {
    let rules = class.rules();
    let subclass = (level >= rules.subclass_level)
        .then(|| subclasses_for(class).next())
        .flatten();
    let (cantrips, spells) = sample_spells(class, subclass, level);

    let mut builder = CharacterBuilder::new()
        .name(format!("Sample {class}"))
        .class(class)
        .level(level)
        .ability_scores(sample_scores(class))
        .skills(rules.skill_options[..rules.skill_count].to_vec())
        .cantrips(cantrips)
        .spells(spells);
    if let Some(subclass) = subclass {
        builder = builder.subclass(subclass.name);
    }
    let mut character = match builder.build() {
        Ok(character) => character,
        Err(err) => panic!("sample {class} {level} failed to build: {err}"),
    };

    apply_class_choices(&mut character, class, level);
    recompute_derived(&mut character);
    character
}

/// Fighter 3 (Champion) / Wizard 2 (School of Evocation), fighter primary.
pub fn sample_multiclass() -> Character {
    let mut character = sample_character(CharacterClass::Fighter, 3);
    character.name = "Sample Spellblade".to_string();
    character.ability_scores.intelligence = 14;

    let mut wizard = ClassEntry::new(CharacterClass::Wizard, 2, false);
    wizard.subclass = Some("School of Evocation".to_string());
    character.classes.push(wizard);

    let die = CharacterClass::Wizard.rules().hit_die;
    for _ in 0..2 {
        character.hit_die_rolls.push(HitDieRoll {
            class: CharacterClass::Wizard,
            die,
            value: die.fixed_average(),
        });
    }

    let cantrips = sorted_spells(SpellClass::Wizard, 0..=0)
        .into_iter()
        .take(3)
        .map(|s| s.name.clone())
        .collect();
    let spells = sorted_spells(SpellClass::Wizard, 1..=1)
        .into_iter()
        .take(8)
        .map(|s| s.name.clone())
        .collect();
    character.spellcasting.insert(
        CharacterClass::Wizard,
        ClassSpellcasting {
            cantrips_known: cantrips,
            spells_known: spells,
            ..ClassSpellcasting::default()
        },
    );

    recompute_derived(&mut character);
    character
}

fn sorted_spells(list: SpellClass, levels: std::ops::RangeInclusive<u8>) -> Vec<&'static SpellData> {
    let mut spells: Vec<&'static SpellData> = spells_for_class(list)
        .filter(|s| levels.contains(&s.level))
        .collect();
    spells.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.name.cmp(&b.name)));
    spells
}

fn sample_spells(
    class: CharacterClass,
    subclass: Option<&'static Subclass>,
    level: u8,
) -> (Vec<String>, Vec<String>) {
    let third_caster = subclass.is_some_and(|s| s.third_caster);
    let Some(list) = SpellClass::for_class(class, third_caster) else {
        return (Vec::new(), Vec::new());
    };

    let mut cantrips = sorted_spells(list, 0..=0);
    cantrips.sort_by_key(|s| s.name != "Eldritch Blast");
    let cantrips = cantrips
        .into_iter()
        .take(cantrip_gain(class, subclass, 0, level) as usize)
        .map(|s| s.name.clone())
        .collect();

    let max_level = max_spell_level(class, subclass, level);
    let spells = if max_level == 0 {
        Vec::new()
    } else {
        sorted_spells(list, 1..=max_level)
            .into_iter()
            .take(spells_known_gain(class, subclass, 0, level) as usize)
            .map(|s| s.name.clone())
            .collect()
    };
    (cantrips, spells)
}

fn apply_class_choices(character: &mut Character, class: CharacterClass, level: u8) {
    match class {
        CharacterClass::Bard => {
            let experts = match level {
                0..=2 => 0,
                3..=9 => 2,
                _ => 3,
            };
            grant_expertise(character, experts);
        }
        CharacterClass::Fighter => {
            character.fighting_styles.push(FightingStyle::Defense);
            if level >= 10 {
                character.fighting_styles.push(FightingStyle::Dueling);
            }
        }
        CharacterClass::Paladin if level >= 2 => {
            character.fighting_styles.push(FightingStyle::Defense);
        }
        CharacterClass::Ranger => {
            if level >= 2 {
                character.fighting_styles.push(FightingStyle::Archery);
            }
            let enemies = [1, 6, 14].iter().filter(|l| level >= **l).count();
            let terrains = [1, 6, 10].iter().filter(|l| level >= **l).count();
            character.favored_enemies = FavoredEnemy::all()[..enemies].to_vec();
            character.favored_terrains = FavoredTerrain::all()[..terrains].to_vec();
        }
        CharacterClass::Rogue => {
            grant_expertise(character, if level >= 6 { 4 } else { 2 });
        }
        CharacterClass::Sorcerer => {
            let count = [3, 3, 10, 17].iter().filter(|l| level >= **l).count();
            character.metamagic = [
                Metamagic::Quickened,
                Metamagic::Twinned,
                Metamagic::Subtle,
                Metamagic::Careful,
            ][..count]
                .to_vec();
        }
        CharacterClass::Warlock => {
            if level >= 3 {
                character.pact_boon = Some(PactBoon::Tome);
            }
            character.invocations = SAMPLE_INVOCATIONS[..invocations_known(level) as usize]
                .iter()
                .map(|name| name.to_string())
                .collect();
            for (class_level, spell_level) in [(11, 6), (13, 7), (15, 8), (17, 9)] {
                if level >= class_level {
                    if let Some(spell) = sorted_spells(SpellClass::Warlock, spell_level..=spell_level).first() {
                        character.mystic_arcanum.insert(spell_level, spell.name.clone());
                    }
                }
            }
        }
        _ => {}
    }
}

/// Raise the first `count` class skills to expertise.
fn grant_expertise(character: &mut Character, count: usize) {
    let rules = character
        .primary_class()
        .unwrap_or(CharacterClass::Rogue)
        .rules();
    for skill in rules.skill_options[..rules.skill_count].iter().take(count) {
        character
            .skill_proficiencies
            .insert(*skill, ProficiencyLevel::Expertise);
    }
}

// ============================================================================
// Stores
// ============================================================================

/// A store whose commits fail a set number of times before reaching the
/// wrapped store.
pub struct FlakyStore<S> {
    inner: S,
    failures: AtomicUsize,
}

impl<S: CharacterStore> FlakyStore<S> {
    /// Fail the next `failures` commits.
    pub fn new(inner: S, failures: usize) -> Self {
        Self {
            inner,
            failures: AtomicUsize::new(failures),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Commits still set to fail.
    pub fn remaining_failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: CharacterStore> CharacterStore for FlakyStore<S> {
    async fn load_character(&self, id: CharacterId) -> Result<Character, StoreError> {
        self.inner.load_character(id).await
    }

    async fn save_character(&self, character: &Character) -> Result<(), StoreError> {
        self.inner.save_character(character).await
    }

    async fn commit_transition(&self, update: &TransitionUpdate) -> Result<Character, StoreError> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Unavailable("injected commit failure".to_string()));
        }
        self.inner.commit_transition(update).await
    }
}

// ============================================================================
// Catalogs
// ============================================================================

/// The compiled-in rules with some classes missing.
#[derive(Debug, Clone, Default)]
pub struct PartialCatalog {
    missing: Vec<CharacterClass>,
}

impl PartialCatalog {
    pub fn without(missing: Vec<CharacterClass>) -> Self {
        Self { missing }
    }

    fn check(&self, class: CharacterClass) -> Result<(), CatalogError> {
        if self.missing.contains(&class) {
            return Err(CatalogError::NoRules(class.name().to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RulesSource for PartialCatalog {
    async fn class_rules(&self, class: CharacterClass) -> Result<ClassRules, CatalogError> {
        self.check(class)?;
        StaticCatalog.class_rules(class).await
    }

    async fn feature_choices_at(
        &self,
        class: CharacterClass,
        level: u8,
        subclass: Option<&str>,
    ) -> Result<Vec<FeatureChoiceSpec>, CatalogError> {
        self.check(class)?;
        StaticCatalog.feature_choices_at(class, level, subclass).await
    }

    async fn list_spells(&self, filter: &SpellFilter) -> Result<Vec<SpellData>, CatalogError> {
        StaticCatalog.list_spells(filter).await
    }

    async fn list_feats(&self, filter: &FeatFilter) -> Result<Vec<FeatData>, CatalogError> {
        StaticCatalog.list_feats(filter).await
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the character's total level and class levels agree.
#[track_caller]
pub fn assert_level(character: &Character, level: u8) {
    assert_eq!(character.level, level, "Expected level {level}, got {}", character.level);
    assert_eq!(
        character.total_class_levels(),
        level,
        "Class levels sum to {}, expected {level}",
        character.total_class_levels()
    );
}

/// Assert a class is held at a level.
#[track_caller]
pub fn assert_class_level(character: &Character, class: CharacterClass, level: u8) {
    assert_eq!(
        character.class_level(class),
        level,
        "Expected {class} {level}, got {}",
        character.class_level(class)
    );
}

/// Assert the character's hit points.
#[track_caller]
pub fn assert_hp(character: &Character, current: i32, max: i32) {
    let hp = &character.hit_points;
    assert_eq!(
        (hp.current, hp.maximum),
        (current, max),
        "Expected HP {current}/{max}, got {}/{}",
        hp.current,
        hp.maximum
    );
}

/// Assert every derived field matches a fresh recomputation.
#[track_caller]
pub fn assert_derived_consistent(character: &Character) {
    let mut recomputed = character.clone();
    recompute_derived(&mut recomputed);
    assert_eq!(
        &recomputed, character,
        "Derived stats of {} are stale",
        character.name
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_samples_are_consistent() {
        for class in CharacterClass::all() {
            for level in [1, 4, 11, 20] {
                let character = sample_character(*class, level);
                assert_level(&character, level);
                assert_derived_consistent(&character);
            }
        }
    }

    #[test]
    fn test_sample_wizard() {
        let wizard = sample_character(CharacterClass::Wizard, 4);
        assert_hp(&wizard, 22, 22);
        let spells = &wizard.spellcasting[&CharacterClass::Wizard];
        assert_eq!(spells.cantrips_known.len(), 4);
        assert_eq!(spells.spells_known.len(), 12);
        assert!(!spells.spells_known.iter().any(|s| s == "Fireball"));
    }

    #[test]
    fn test_sample_warlock() {
        let warlock = sample_character(CharacterClass::Warlock, 17);
        assert_eq!(warlock.pact_boon, Some(PactBoon::Tome));
        assert_eq!(warlock.invocations.len(), 7);
        assert_eq!(warlock.mystic_arcanum.len(), 4);
        assert_eq!(
            warlock.spellcasting[&CharacterClass::Warlock].cantrips_known[0],
            "Eldritch Blast"
        );
    }

    #[test]
    fn test_sample_multiclass() {
        let character = sample_multiclass();
        assert_level(&character, 5);
        assert_class_level(&character, CharacterClass::Fighter, 3);
        assert_class_level(&character, CharacterClass::Wizard, 2);
        assert_eq!(character.primary_class(), Some(CharacterClass::Fighter));
        assert_derived_consistent(&character);
    }

    #[tokio::test]
    async fn test_flaky_store_fails_then_recovers() {
        let fighter = sample_character(CharacterClass::Fighter, 1);
        let store = FlakyStore::new(MemoryStore::with_character(fighter.clone()).await, 1);
        let update = TransitionUpdate {
            character_id: fighter.id,
            writes: Vec::new(),
            history: crate::character::LevelHistoryRecord {
                previous_level: 1,
                new_level: 1,
                hp_gained: 0,
                choices_made: Default::default(),
                features_gained: Vec::new(),
                recorded_at: String::new(),
            },
        };
        let err = store.commit_transition(&update).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.remaining_failures(), 0);
        assert!(store.commit_transition(&update).await.is_ok());
    }
}
