//! Eligibility predicates: what a level transition requires.
//!
//! Every function here is pure and total. Levels are class levels; a
//! transition from `level_from` to `level_to` is usually one level but the
//! tables are cumulative so any range works.

use crate::character::CharacterClass;
use crate::class_data::{mystic_arcanum_level, FeatureChoiceSpec};
use crate::options::Subclass;
use crate::progression::{self, CasterProgression};

fn third_caster(subclass: Option<&Subclass>) -> bool {
    subclass.is_some_and(|s| s.third_caster)
}

/// Cantrips a third-caster subclass of `class` grants at level 3.
fn third_caster_cantrip_base(class: CharacterClass) -> u8 {
    match class {
        CharacterClass::Rogue => 3,
        _ => 2,
    }
}

/// New cantrips learned between two class levels.
///
/// For third-caster subclasses the count comes from the subclass table,
/// which starts at level 3. Pass `level_from = 0` when the subclass was
/// picked during this transition so its starting cantrips are counted.
pub fn cantrip_gain(
    class: CharacterClass,
    subclass: Option<&Subclass>,
    level_from: u8,
    level_to: u8,
) -> u8 {
    if third_caster(subclass) {
        let base = third_caster_cantrip_base(class);
        return progression::third_caster_cantrips_known(base, level_to)
            .saturating_sub(progression::third_caster_cantrips_known(base, level_from));
    }
    progression::cantrips_known(class, level_to)
        .saturating_sub(progression::cantrips_known(class, level_from))
}

/// New spells known (or spellbook spells) between two class levels.
///
/// Same third-caster convention as [`cantrip_gain`].
pub fn spells_known_gain(
    class: CharacterClass,
    subclass: Option<&Subclass>,
    level_from: u8,
    level_to: u8,
) -> u8 {
    if third_caster(subclass) {
        return progression::third_caster_spells_known(level_to)
            .saturating_sub(progression::third_caster_spells_known(level_from));
    }
    progression::spells_known(class, level_to)
        .saturating_sub(progression::spells_known(class, level_from))
}

pub fn is_asi_level(class: CharacterClass, level: u8) -> bool {
    class.rules().is_asi_level(level)
}

/// `knownAt(level_to) - knownAt(level_from)` from the invocations table.
pub fn invocations_to_gain(level_from: u8, level_to: u8) -> u8 {
    progression::invocations_known(level_to).saturating_sub(progression::invocations_known(level_from))
}

pub fn needs_mystic_arcanum(class: CharacterClass, level: u8) -> bool {
    class == CharacterClass::Warlock && mystic_arcanum_level(level).is_some()
}

/// Spell level of the arcanum learned at warlock `level`.
pub fn mystic_arcanum_spell_level(level: u8) -> Option<u8> {
    mystic_arcanum_level(level)
}

pub fn needs_subclass(class: CharacterClass, level: u8, has_subclass: bool) -> bool {
    !has_subclass && level >= class.rules().subclass_level
}

pub fn needs_pact_boon(class: CharacterClass, level: u8, has_boon: bool) -> bool {
    !has_boon
        && class
            .rules()
            .choices
            .iter()
            .any(|(at, c)| *c == FeatureChoiceSpec::PactBoon && level >= *at)
}

/// How a class (with its subclass) gains spell slots.
pub fn caster_progression(class: CharacterClass, subclass: Option<&Subclass>) -> CasterProgression {
    if third_caster(subclass) {
        CasterProgression::Third
    } else {
        class.rules().caster
    }
}

/// Highest spell level `class` can learn at `class_level`, judged by the
/// class's own progression as if single-classed.
pub fn max_spell_level(class: CharacterClass, subclass: Option<&Subclass>, class_level: u8) -> u8 {
    match caster_progression(class, subclass) {
        CasterProgression::Pact => progression::pact_slots(class_level)
            .map(|(_, slot_level)| slot_level)
            .unwrap_or(0),
        slots_from => {
            progression::highest_slot_level(&progression::single_class_slots(slots_from, class_level))
        }
    }
}

/// Sum of the counts of every `kind` choice triggered at `level`.
pub fn choice_count(
    class: CharacterClass,
    subclass: Option<&Subclass>,
    level: u8,
    matches: fn(&FeatureChoiceSpec) -> bool,
) -> u8 {
    class
        .rules()
        .feature_choices_at(level, subclass)
        .iter()
        .filter(|c| matches(c))
        .map(|c| c.count())
        .sum()
}

/// Spells learned through Magical Secrets at `level`.
pub fn magical_secrets_count(class: CharacterClass, subclass: Option<&Subclass>, level: u8) -> u8 {
    choice_count(class, subclass, level, |c| {
        matches!(c, FeatureChoiceSpec::MagicalSecrets { .. })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::find_subclass;

    #[test]
    fn test_cantrip_gain() {
        assert_eq!(cantrip_gain(CharacterClass::Wizard, None, 3, 4), 1);
        assert_eq!(cantrip_gain(CharacterClass::Wizard, None, 4, 5), 0);
        assert_eq!(cantrip_gain(CharacterClass::Wizard, None, 0, 1), 3);
        assert_eq!(cantrip_gain(CharacterClass::Sorcerer, None, 9, 10), 1);
        assert_eq!(cantrip_gain(CharacterClass::Fighter, None, 2, 3), 0);
        assert_eq!(cantrip_gain(CharacterClass::Paladin, None, 1, 2), 0);
    }

    #[test]
    fn test_third_caster_gain_starts_at_three() {
        let ek = find_subclass(CharacterClass::Fighter, "Eldritch Knight");
        assert_eq!(cantrip_gain(CharacterClass::Fighter, ek, 2, 3), 2);
        assert_eq!(cantrip_gain(CharacterClass::Fighter, ek, 3, 4), 0);
        assert_eq!(cantrip_gain(CharacterClass::Fighter, ek, 9, 10), 1);
        assert_eq!(spells_known_gain(CharacterClass::Fighter, ek, 2, 3), 3);
        assert_eq!(spells_known_gain(CharacterClass::Fighter, ek, 3, 4), 1);

        let at = find_subclass(CharacterClass::Rogue, "Arcane Trickster");
        assert_eq!(cantrip_gain(CharacterClass::Rogue, at, 2, 3), 3);
        // Picked late: everything up to the new level is learned at once.
        assert_eq!(cantrip_gain(CharacterClass::Rogue, at, 0, 5), 3);
    }

    #[test]
    fn test_spells_known_gain() {
        assert_eq!(spells_known_gain(CharacterClass::Bard, None, 9, 10), 2);
        assert_eq!(spells_known_gain(CharacterClass::Wizard, None, 4, 5), 2);
        assert_eq!(spells_known_gain(CharacterClass::Ranger, None, 1, 2), 2);
        assert_eq!(spells_known_gain(CharacterClass::Cleric, None, 4, 5), 0);
        assert_eq!(spells_known_gain(CharacterClass::Sorcerer, None, 11, 12), 0);
    }

    #[test]
    fn test_invocations_to_gain() {
        assert_eq!(invocations_to_gain(1, 2), 2);
        assert_eq!(invocations_to_gain(2, 3), 0);
        assert_eq!(invocations_to_gain(4, 5), 1);
        assert_eq!(invocations_to_gain(1, 20), 8);
    }

    #[test]
    fn test_mystic_arcanum_levels() {
        let levels: Vec<u8> = (1..=20)
            .filter(|l| needs_mystic_arcanum(CharacterClass::Warlock, *l))
            .collect();
        assert_eq!(levels, vec![11, 13, 15, 17]);
        let spell_levels: Vec<u8> = levels
            .iter()
            .filter_map(|l| mystic_arcanum_spell_level(*l))
            .collect();
        assert_eq!(spell_levels, vec![6, 7, 8, 9]);
        assert!(!needs_mystic_arcanum(CharacterClass::Wizard, 11));
    }

    #[test]
    fn test_needs_subclass() {
        assert!(needs_subclass(CharacterClass::Cleric, 1, false));
        assert!(!needs_subclass(CharacterClass::Wizard, 1, false));
        assert!(needs_subclass(CharacterClass::Wizard, 2, false));
        assert!(needs_subclass(CharacterClass::Fighter, 5, false));
        assert!(!needs_subclass(CharacterClass::Fighter, 5, true));
    }

    #[test]
    fn test_needs_pact_boon() {
        assert!(!needs_pact_boon(CharacterClass::Warlock, 2, false));
        assert!(needs_pact_boon(CharacterClass::Warlock, 3, false));
        assert!(!needs_pact_boon(CharacterClass::Warlock, 3, true));
        assert!(!needs_pact_boon(CharacterClass::Sorcerer, 3, false));
    }

    #[test]
    fn test_max_spell_level() {
        assert_eq!(max_spell_level(CharacterClass::Wizard, None, 5), 3);
        assert_eq!(max_spell_level(CharacterClass::Paladin, None, 5), 2);
        assert_eq!(max_spell_level(CharacterClass::Ranger, None, 1), 0);
        assert_eq!(max_spell_level(CharacterClass::Warlock, None, 9), 5);
        assert_eq!(max_spell_level(CharacterClass::Warlock, None, 20), 5);
        let ek = find_subclass(CharacterClass::Fighter, "Eldritch Knight");
        assert_eq!(max_spell_level(CharacterClass::Fighter, ek, 7), 2);
        assert_eq!(max_spell_level(CharacterClass::Fighter, None, 7), 0);
    }

    #[test]
    fn test_magical_secrets() {
        assert_eq!(magical_secrets_count(CharacterClass::Bard, None, 10), 2);
        assert_eq!(magical_secrets_count(CharacterClass::Bard, None, 6), 0);
        let lore = find_subclass(CharacterClass::Bard, "College of Lore");
        assert_eq!(magical_secrets_count(CharacterClass::Bard, lore, 6), 2);
    }

    #[test]
    fn test_asi_levels() {
        for class in CharacterClass::all() {
            for level in [4, 8, 12, 16, 19] {
                assert!(is_asi_level(*class, level), "{class} at {level}");
            }
            assert!(!is_asi_level(*class, 5));
        }
    }
}
