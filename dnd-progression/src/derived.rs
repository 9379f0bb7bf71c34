//! Derived statistics.
//!
//! Everything here is recomputed from primitive inputs (ability scores,
//! level, proficiencies, recorded hit-die results) and never patched
//! incrementally.

use crate::character::{
    ability_modifier, Ability, AbilityScores, CharacterClass, HitDieRoll, PactSlots,
    ProficiencyLevel, ResourcePool, Skill,
};
use crate::choices::{HeldChoices, HitPointChoice};
use crate::dice::DieType;
use crate::eligibility::caster_progression;
use crate::options::{find_subclass, Subclass};
use crate::progression::{self, CasterProgression};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Statistics computed from ability scores, level and proficiencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedStats {
    pub proficiency_bonus: i8,
    pub ability_modifiers: BTreeMap<Ability, i8>,
    pub saving_throws: BTreeMap<Ability, i8>,
    pub passive_perception: i8,
    pub spell_save_dc: Option<u8>,
    pub spell_attack_bonus: Option<i8>,
}

/// `floor((level - 1) / 4) + 2`, clamped to levels 1-20.
pub fn proficiency_bonus(level: u8) -> i8 {
    let level = level.clamp(1, 20);
    ((level - 1) / 4) as i8 + 2
}

pub fn spell_save_dc(scores: &AbilityScores, proficiency_bonus: i8, ability: Ability) -> u8 {
    (8 + proficiency_bonus + scores.modifier(ability)).max(0) as u8
}

pub fn spell_attack_bonus(scores: &AbilityScores, proficiency_bonus: i8, ability: Ability) -> i8 {
    proficiency_bonus + scores.modifier(ability)
}

/// The ability a class casts with. Third-caster subclasses use Intelligence.
pub fn spellcasting_ability(class: CharacterClass, subclass: Option<&Subclass>) -> Option<Ability> {
    class
        .rules()
        .spellcasting_ability
        .or_else(|| subclass.filter(|s| s.third_caster).map(|_| Ability::Intelligence))
}

pub fn derive_stats(
    scores: &AbilityScores,
    level: u8,
    saving_throw_proficiencies: &HashSet<Ability>,
    skill_proficiencies: &HashMap<Skill, ProficiencyLevel>,
    spell_ability: Option<Ability>,
) -> DerivedStats {
    let proficiency_bonus = proficiency_bonus(level);
    let ability_modifiers = Ability::all()
        .into_iter()
        .map(|a| (a, scores.modifier(a)))
        .collect();
    let saving_throws = Ability::all()
        .into_iter()
        .map(|a| {
            let bonus = if saving_throw_proficiencies.contains(&a) {
                proficiency_bonus
            } else {
                0
            };
            (a, scores.modifier(a) + bonus)
        })
        .collect();
    let perception = skill_proficiencies
        .get(&Skill::Perception)
        .copied()
        .unwrap_or_default();
    let passive_perception =
        10 + scores.modifier(Ability::Wisdom) + perception.bonus(proficiency_bonus);

    DerivedStats {
        proficiency_bonus,
        ability_modifiers,
        saving_throws,
        passive_perception,
        spell_save_dc: spell_ability.map(|a| spell_save_dc(scores, proficiency_bonus, a)),
        spell_attack_bonus: spell_ability.map(|a| spell_attack_bonus(scores, proficiency_bonus, a)),
    }
}

// ============================================================================
// Hit points
// ============================================================================

/// The hit-die value a choice stands for.
pub fn hit_die_value(choice: HitPointChoice, die: DieType) -> u8 {
    match choice {
        HitPointChoice::Rolled(value) => value,
        HitPointChoice::Average => die.fixed_average(),
    }
}

/// `max(1, roll + CON modifier)`.
pub fn hit_points_gained(roll: u8, con_modifier: i8) -> i32 {
    (roll as i32 + con_modifier as i32).max(1)
}

/// Maximum hit points from every recorded hit-die result.
pub fn max_hit_points(rolls: &[HitDieRoll], con_modifier: i8) -> i32 {
    rolls
        .iter()
        .map(|r| hit_points_gained(r.value, con_modifier))
        .sum()
}

/// Maximum hit points carried forward from a stored maximum whose per-level
/// results were never recorded. A CON modifier change applies to every level
/// already held, and each of those levels keeps at least 1 hit point.
pub fn carried_max_hit_points(
    previous_maximum: i32,
    levels_held: u8,
    old_con_modifier: i8,
    new_con_modifier: i8,
    new_rolls: &[HitDieRoll],
) -> i32 {
    let delta = (new_con_modifier as i32 - old_con_modifier as i32) * levels_held as i32;
    (previous_maximum + delta).max(levels_held as i32) + max_hit_points(new_rolls, new_con_modifier)
}

/// Hit points for one level at a given Constitution score.
pub fn level_hit_points(roll: u8, constitution: u8) -> i32 {
    hit_points_gained(roll, ability_modifier(constitution))
}

// ============================================================================
// Spell slots
// ============================================================================

/// `(progression, class level)` for every class held.
pub fn caster_entries(held: &HeldChoices) -> Vec<(CasterProgression, u8)> {
    held.class_levels
        .iter()
        .filter(|(_, level)| **level > 0)
        .map(|(class, level)| {
            let subclass = held.subclass(*class).and_then(|name| find_subclass(*class, name));
            (caster_progression(*class, subclass), *level)
        })
        .collect()
}

/// Spell slot maxima for levels 1-9. Pact magic is tracked separately.
///
/// One slot-granting class uses its own table; more than one uses the
/// multiclass caster level on the full-caster table.
pub fn spell_slot_maxima(entries: &[(CasterProgression, u8)]) -> [u8; 9] {
    let granting: Vec<(CasterProgression, u8)> = entries
        .iter()
        .copied()
        .filter(|(p, level)| progression::single_class_slots(*p, *level) != [0; 9])
        .collect();
    match granting.as_slice() {
        [] => [0; 9],
        [(p, level)] => progression::single_class_slots(*p, *level),
        many => progression::full_caster_slots(progression::multiclass_caster_level(many)),
    }
}

/// Pact slots at warlock `level`, keeping `used` from `previous`.
pub fn pact_slot_maxima(level: u8, previous: Option<&PactSlots>) -> Option<PactSlots> {
    progression::pact_slots(level).map(|(count, slot_level)| PactSlots {
        count,
        slot_level,
        used: previous.map(|p| p.used.min(count)).unwrap_or(0),
    })
}

// ============================================================================
// Resources
// ============================================================================

/// Resource pools for every class held. Gains in maximum are added to the
/// current value; new pools start full. Pools with a zero maximum are left
/// out.
pub fn resource_maxima(
    class_levels: &BTreeMap<CharacterClass, u8>,
    scores: &AbilityScores,
    previous: &[ResourcePool],
) -> Vec<ResourcePool> {
    let mut pools = Vec::new();
    for (class, level) in class_levels {
        for spec in class.rules().resources {
            let modifier = spec.ability.map(|a| scores.modifier(a)).unwrap_or(0);
            let maximum = spec.maximum(*level, modifier);
            if maximum == 0 {
                continue;
            }
            let current = match previous.iter().find(|p| p.key == spec.key) {
                Some(old) => (old.current + maximum.saturating_sub(old.maximum)).min(maximum),
                None => maximum,
            };
            pools.push(ResourcePool {
                key: spec.key.to_string(),
                name: spec.name.to_string(),
                current,
                maximum,
                recharge: spec.recharge_at(*level),
            });
        }
    }
    pools
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::RechargeType;

    #[test]
    fn test_proficiency_progression() {
        let expected = [2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 6, 6, 6, 6];
        for (i, pb) in expected.iter().enumerate() {
            assert_eq!(proficiency_bonus(i as u8 + 1), *pb);
        }
    }

    #[test]
    fn test_derive_stats() {
        let scores = AbilityScores::new(8, 14, 12, 16, 13, 10);
        let saves = HashSet::from([Ability::Intelligence, Ability::Wisdom]);
        let skills = HashMap::from([(Skill::Perception, ProficiencyLevel::Expertise)]);
        let stats = derive_stats(&scores, 5, &saves, &skills, Some(Ability::Intelligence));
        assert_eq!(stats.proficiency_bonus, 3);
        assert_eq!(stats.saving_throws[&Ability::Intelligence], 6);
        assert_eq!(stats.saving_throws[&Ability::Strength], -1);
        assert_eq!(stats.passive_perception, 10 + 1 + 6);
        assert_eq!(stats.spell_save_dc, Some(14));
        assert_eq!(stats.spell_attack_bonus, Some(6));
        assert_eq!(
            stats,
            derive_stats(&scores, 5, &saves, &skills, Some(Ability::Intelligence))
        );
    }

    #[test]
    fn test_no_spell_ability() {
        let stats = derive_stats(
            &AbilityScores::default(),
            1,
            &HashSet::new(),
            &HashMap::new(),
            None,
        );
        assert_eq!(stats.passive_perception, 10);
        assert_eq!(stats.spell_save_dc, None);
    }

    #[test]
    fn test_hit_points_gained() {
        assert_eq!(hit_points_gained(DieType::D6.fixed_average(), 1), 5);
        assert_eq!(hit_points_gained(1, -3), 1);
        assert_eq!(hit_die_value(HitPointChoice::Average, DieType::D10), 6);
        assert_eq!(hit_die_value(HitPointChoice::Rolled(3), DieType::D10), 3);
    }

    #[test]
    fn test_max_hit_points_recomputes_with_con() {
        let rolls = vec![
            HitDieRoll { class: CharacterClass::Wizard, die: DieType::D6, value: 6 },
            HitDieRoll { class: CharacterClass::Wizard, die: DieType::D6, value: 4 },
            HitDieRoll { class: CharacterClass::Wizard, die: DieType::D6, value: 1 },
        ];
        assert_eq!(max_hit_points(&rolls, 0), 11);
        assert_eq!(max_hit_points(&rolls, 1), 14);
        assert_eq!(max_hit_points(&rolls, -2), 4 + 2 + 1);
    }

    #[test]
    fn test_carried_max_hit_points() {
        let new_roll = [HitDieRoll { class: CharacterClass::Fighter, die: DieType::D10, value: 6 }];
        assert_eq!(carried_max_hit_points(32, 4, 1, 1, &new_roll), 39);
        // +1 CON modifier backfills the four levels already held.
        assert_eq!(carried_max_hit_points(32, 4, 1, 2, &new_roll), 32 + 4 + 8);
        assert_eq!(carried_max_hit_points(3, 4, 0, -3, &[]), 4);
    }

    #[test]
    fn test_spell_slots_single_and_multiclass() {
        assert_eq!(
            spell_slot_maxima(&[(CasterProgression::Full, 5)]),
            [4, 3, 2, 0, 0, 0, 0, 0, 0]
        );
        // A lone paladin 5 uses its own table.
        assert_eq!(
            spell_slot_maxima(&[(CasterProgression::Half, 5)]),
            [4, 2, 0, 0, 0, 0, 0, 0, 0]
        );
        // Wizard 3 / Paladin 4: caster level 3 + 2 = 5.
        assert_eq!(
            spell_slot_maxima(&[(CasterProgression::Full, 3), (CasterProgression::Half, 4)]),
            [4, 3, 2, 0, 0, 0, 0, 0, 0]
        );
        // Paladin 1 has no spellcasting yet, so the wizard table applies alone.
        assert_eq!(
            spell_slot_maxima(&[(CasterProgression::Full, 3), (CasterProgression::Half, 1)]),
            [4, 2, 0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(
            spell_slot_maxima(&[(CasterProgression::Pact, 5), (CasterProgression::None, 3)]),
            [0; 9]
        );
    }

    #[test]
    fn test_pact_slots_keep_used() {
        let previous = PactSlots { count: 2, slot_level: 2, used: 2 };
        let slots = pact_slot_maxima(5, Some(&previous)).unwrap();
        assert_eq!((slots.count, slots.slot_level, slots.used), (2, 3, 2));
        assert!(pact_slot_maxima(0, None).is_none());
    }

    #[test]
    fn test_resource_maxima() {
        let scores = AbilityScores::new(10, 10, 10, 10, 10, 16);
        let levels = BTreeMap::from([(CharacterClass::Bard, 5)]);
        let pools = resource_maxima(&levels, &scores, &[]);
        let inspiration = pools
            .iter()
            .find(|p| p.key == "bardic_inspiration")
            .expect("bards have inspiration");
        assert_eq!(inspiration.maximum, 3);
        assert_eq!(inspiration.current, 3);
        assert_eq!(inspiration.recharge, RechargeType::ShortRest);

        let spent = vec![ResourcePool { current: 0, maximum: 2, ..inspiration.clone() }];
        let pools = resource_maxima(&levels, &scores, &spent);
        let inspiration = pools.iter().find(|p| p.key == "bardic_inspiration").unwrap();
        assert_eq!(inspiration.current, 1);
    }

    #[test]
    fn test_zero_resources_are_omitted() {
        let levels = BTreeMap::from([(CharacterClass::Monk, 1)]);
        let pools = resource_maxima(&levels, &AbilityScores::default(), &[]);
        assert!(pools.iter().all(|p| p.key != "ki"));
    }
}
