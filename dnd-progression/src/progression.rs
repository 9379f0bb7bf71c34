//! Level-indexed progression tables.
//!
//! All tables are indexed by class level (1-20). Lookups outside that range
//! return the "nothing known yet" value so predicates stay total.

use crate::character::CharacterClass;
use serde::{Deserialize, Serialize};

/// How a class (or subclass) gains spell slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CasterProgression {
    None,
    Full,
    Half,
    Third,
    Pact,
}

/// Spell slots per spell level for a full caster of each level.
const FULL_CASTER_SLOTS: [[u8; 9]; 20] = [
    [2, 0, 0, 0, 0, 0, 0, 0, 0],
    [3, 0, 0, 0, 0, 0, 0, 0, 0],
    [4, 2, 0, 0, 0, 0, 0, 0, 0],
    [4, 3, 0, 0, 0, 0, 0, 0, 0],
    [4, 3, 2, 0, 0, 0, 0, 0, 0],
    [4, 3, 3, 0, 0, 0, 0, 0, 0],
    [4, 3, 3, 1, 0, 0, 0, 0, 0],
    [4, 3, 3, 2, 0, 0, 0, 0, 0],
    [4, 3, 3, 3, 1, 0, 0, 0, 0],
    [4, 3, 3, 3, 2, 0, 0, 0, 0],
    [4, 3, 3, 3, 2, 1, 0, 0, 0],
    [4, 3, 3, 3, 2, 1, 0, 0, 0],
    [4, 3, 3, 3, 2, 1, 1, 0, 0],
    [4, 3, 3, 3, 2, 1, 1, 0, 0],
    [4, 3, 3, 3, 2, 1, 1, 1, 0],
    [4, 3, 3, 3, 2, 1, 1, 1, 0],
    [4, 3, 3, 3, 2, 1, 1, 1, 1],
    [4, 3, 3, 3, 3, 1, 1, 1, 1],
    [4, 3, 3, 3, 3, 2, 1, 1, 1],
    [4, 3, 3, 3, 3, 2, 2, 1, 1],
];

const BARD_SPELLS_KNOWN: [u8; 20] = [
    4, 5, 6, 7, 8, 9, 10, 11, 12, 14, 15, 15, 16, 18, 19, 19, 20, 22, 22, 22,
];
const SORCERER_SPELLS_KNOWN: [u8; 20] = [
    2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 12, 13, 13, 14, 14, 15, 15, 15, 15,
];
const WARLOCK_SPELLS_KNOWN: [u8; 20] = [
    2, 3, 4, 5, 6, 7, 8, 9, 10, 10, 11, 11, 12, 12, 13, 13, 14, 14, 15, 15,
];
const RANGER_SPELLS_KNOWN: [u8; 20] = [
    0, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11,
];
/// Eldritch Knight and Arcane Trickster, starting at class level 3.
const THIRD_CASTER_SPELLS_KNOWN: [u8; 20] = [
    0, 0, 3, 4, 4, 4, 5, 6, 6, 7, 8, 8, 9, 10, 10, 11, 11, 11, 12, 13,
];

const INVOCATIONS_KNOWN: [u8; 20] = [
    0, 2, 2, 2, 3, 3, 4, 4, 5, 5, 5, 6, 6, 6, 7, 7, 7, 8, 8, 8,
];

fn lookup(table: &[u8; 20], level: u8) -> u8 {
    if (1..=20).contains(&level) {
        table[level as usize - 1]
    } else {
        0
    }
}

/// Cantrips known by a natively casting class at `level`.
pub fn cantrips_known(class: CharacterClass, level: u8) -> u8 {
    if level == 0 {
        return 0;
    }
    let (base, tier_two, tier_three) = match class {
        CharacterClass::Bard | CharacterClass::Druid | CharacterClass::Warlock => (2, 3, 4),
        CharacterClass::Cleric | CharacterClass::Wizard => (3, 4, 5),
        CharacterClass::Sorcerer => (4, 5, 6),
        _ => return 0,
    };
    match level {
        1..=3 => base,
        4..=9 => tier_two,
        _ => tier_three,
    }
}

/// Cantrips known by a third-caster subclass at `level`.
///
/// `base` is the number granted at level 3 (2 for Eldritch Knight, 3 for
/// Arcane Trickster); one more is learned at level 10.
pub fn third_caster_cantrips_known(base: u8, level: u8) -> u8 {
    match level {
        0..=2 => 0,
        3..=9 => base,
        _ => base + 1,
    }
}

/// Spells known (or written into the spellbook) at `level`.
///
/// Prepared casters without a spellbook return 0.
pub fn spells_known(class: CharacterClass, level: u8) -> u8 {
    match class {
        CharacterClass::Bard => lookup(&BARD_SPELLS_KNOWN, level),
        CharacterClass::Sorcerer => lookup(&SORCERER_SPELLS_KNOWN, level),
        CharacterClass::Warlock => lookup(&WARLOCK_SPELLS_KNOWN, level),
        CharacterClass::Ranger => lookup(&RANGER_SPELLS_KNOWN, level),
        CharacterClass::Wizard if level >= 1 => 6 + 2 * (level.min(20) - 1),
        _ => 0,
    }
}

pub fn third_caster_spells_known(level: u8) -> u8 {
    lookup(&THIRD_CASTER_SPELLS_KNOWN, level)
}

/// Eldritch invocations known at warlock `level`.
pub fn invocations_known(level: u8) -> u8 {
    lookup(&INVOCATIONS_KNOWN, level)
}

/// Slots of a full caster whose (multiclass) caster level is `level`.
pub fn full_caster_slots(level: u8) -> [u8; 9] {
    if (1..=20).contains(&level) {
        FULL_CASTER_SLOTS[level as usize - 1]
    } else {
        [0; 9]
    }
}

/// Slots for a single slot-granting class at `class_level`.
///
/// Half and third casters use the full-caster table at their level divided
/// by 2 or 3, rounded up, once spellcasting begins.
pub fn single_class_slots(progression: CasterProgression, class_level: u8) -> [u8; 9] {
    match progression {
        CasterProgression::Full => full_caster_slots(class_level),
        CasterProgression::Half if class_level >= 2 => full_caster_slots(class_level.div_ceil(2)),
        CasterProgression::Third if class_level >= 3 => full_caster_slots(class_level.div_ceil(3)),
        _ => [0; 9],
    }
}

/// Multiclass spellcaster level: full levels plus half of half-caster levels
/// plus a third of third-caster levels, each rounded down.
pub fn multiclass_caster_level(entries: &[(CasterProgression, u8)]) -> u8 {
    entries
        .iter()
        .map(|(progression, level)| match progression {
            CasterProgression::Full => *level,
            CasterProgression::Half => level / 2,
            CasterProgression::Third => level / 3,
            CasterProgression::Pact | CasterProgression::None => 0,
        })
        .sum()
}

/// Pact Magic slot count and slot level at warlock `level`.
pub fn pact_slots(level: u8) -> Option<(u8, u8)> {
    let count = match level {
        0 => return None,
        1 => 1,
        2..=10 => 2,
        11..=16 => 3,
        _ => 4,
    };
    let slot_level = match level {
        1..=2 => 1,
        3..=4 => 2,
        5..=6 => 3,
        7..=8 => 4,
        _ => 5,
    };
    Some((count, slot_level))
}

/// Highest spell level with at least one slot in `slots`.
pub fn highest_slot_level(slots: &[u8; 9]) -> u8 {
    slots
        .iter()
        .rposition(|count| *count > 0)
        .map(|i| i as u8 + 1)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_caster_slots() {
        assert_eq!(single_class_slots(CasterProgression::Half, 1), [0; 9]);
        assert_eq!(single_class_slots(CasterProgression::Half, 2)[0], 2);
        assert_eq!(single_class_slots(CasterProgression::Half, 3)[0], 3);
        assert_eq!(
            single_class_slots(CasterProgression::Half, 5),
            [4, 2, 0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(
            single_class_slots(CasterProgression::Half, 20),
            [4, 3, 3, 3, 2, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_third_caster_slots() {
        assert_eq!(single_class_slots(CasterProgression::Third, 2), [0; 9]);
        assert_eq!(single_class_slots(CasterProgression::Third, 3)[0], 2);
        assert_eq!(
            single_class_slots(CasterProgression::Third, 7),
            [4, 2, 0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(
            single_class_slots(CasterProgression::Third, 20),
            [4, 3, 3, 1, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_multiclass_caster_level() {
        let level = multiclass_caster_level(&[
            (CasterProgression::Full, 3),
            (CasterProgression::Half, 5),
            (CasterProgression::Third, 4),
            (CasterProgression::Pact, 2),
        ]);
        assert_eq!(level, 3 + 2 + 1);
    }

    #[test]
    fn test_pact_slots() {
        assert_eq!(pact_slots(0), None);
        assert_eq!(pact_slots(1), Some((1, 1)));
        assert_eq!(pact_slots(5), Some((2, 3)));
        assert_eq!(pact_slots(11), Some((3, 5)));
        assert_eq!(pact_slots(20), Some((4, 5)));
    }

    #[test]
    fn test_known_tables_are_monotonic() {
        for class in CharacterClass::all() {
            for level in 1..20 {
                assert!(spells_known(*class, level) <= spells_known(*class, level + 1));
                assert!(cantrips_known(*class, level) <= cantrips_known(*class, level + 1));
            }
        }
        for level in 1..20 {
            assert!(invocations_known(level) <= invocations_known(level + 1));
            assert!(third_caster_spells_known(level) <= third_caster_spells_known(level + 1));
        }
    }

    #[test]
    fn test_wizard_spellbook() {
        assert_eq!(spells_known(CharacterClass::Wizard, 1), 6);
        assert_eq!(spells_known(CharacterClass::Wizard, 5), 14);
        assert_eq!(spells_known(CharacterClass::Wizard, 0), 0);
    }

    #[test]
    fn test_highest_slot_level() {
        assert_eq!(highest_slot_level(&full_caster_slots(1)), 1);
        assert_eq!(highest_slot_level(&full_caster_slots(5)), 3);
        assert_eq!(highest_slot_level(&full_caster_slots(17)), 9);
        assert_eq!(highest_slot_level(&[0; 9]), 0);
    }
}
