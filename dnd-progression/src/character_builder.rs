//! Character builder for new D&D 5e characters.
//!
//! Produces a stored-ready [`Character`] at its starting level with class
//! proficiencies, recorded hit dice and every derived statistic filled in.
//! Choices beyond the starting level are made through a creation session.

use crate::character::{
    Ability, AbilityScores, Character, CharacterClass, ClassEntry, ClassSpellcasting, Feature,
    HitDieRoll, HitPoints, ProficiencyLevel, Skill, SpellSlots, MAX_CHARACTER_LEVEL,
};
use crate::choices::HeldChoices;
use crate::derived::{self, caster_entries, spellcasting_ability};
use crate::eligibility::{cantrip_gain, spells_known_gain};
use crate::options::{find_subclass, Subclass};
use crate::spells::{get_spell, SpellClass};
use std::collections::{HashMap, HashSet};

/// Method for determining ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbilityMethod {
    /// Standard array: 15, 14, 13, 12, 10, 8
    #[default]
    StandardArray,
    /// Point buy: 27 points, scores 8-15
    PointBuy,
    /// Roll 4d6, drop lowest, 6 times
    Rolled,
}

/// Standard array values.
pub const STANDARD_ARRAY: [u8; 6] = [15, 14, 13, 12, 10, 8];

/// Point buy costs for each score value.
pub fn point_buy_cost(score: u8) -> Option<u8> {
    match score {
        8 => Some(0),
        9 => Some(1),
        10 => Some(2),
        11 => Some(3),
        12 => Some(4),
        13 => Some(5),
        14 => Some(7),
        15 => Some(9),
        _ => None,
    }
}

/// Total points available for point buy.
pub const POINT_BUY_TOTAL: u8 = 27;

/// Builder for new characters.
#[derive(Debug, Clone)]
pub struct CharacterBuilder {
    name: Option<String>,
    class: Option<CharacterClass>,
    level: u8,
    subclass: Option<String>,
    ability_scores: Option<AbilityScores>,
    ability_method: AbilityMethod,
    selected_skills: Vec<Skill>,
    cantrips: Vec<String>,
    spells: Vec<String>,
}

impl Default for CharacterBuilder {
    fn default() -> Self {
        Self {
            name: None,
            class: None,
            level: 1,
            subclass: None,
            ability_scores: None,
            ability_method: AbilityMethod::default(),
            selected_skills: Vec::new(),
            cantrips: Vec::new(),
            spells: Vec::new(),
        }
    }
}

/// Error from character building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuilderError {
    MissingName,
    MissingClass,
    MissingAbilityScores,
    InvalidSkillCount { expected: usize, got: usize },
    SkillNotAvailable(Skill),
    InvalidLevel(u8),
    InvalidPointBuy { spent: u32 },
    UnknownSubclass(String),
    SubclassTooEarly { subclass: String, level: u8 },
    UnknownSpell(String),
    InvalidCantripCount { expected: usize, got: usize },
    InvalidSpellCount { expected: usize, got: usize },
}

impl std::fmt::Display for BuilderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuilderError::MissingName => write!(f, "Character name is required"),
            BuilderError::MissingClass => write!(f, "Class selection is required"),
            BuilderError::MissingAbilityScores => write!(f, "Ability scores are required"),
            BuilderError::InvalidSkillCount { expected, got } => {
                write!(f, "Expected {expected} skills, got {got}")
            }
            BuilderError::SkillNotAvailable(skill) => {
                write!(f, "Skill {} is not available for this class", skill.name())
            }
            BuilderError::InvalidLevel(level) => {
                write!(f, "Starting level must be 1-{MAX_CHARACTER_LEVEL}, got {level}")
            }
            BuilderError::InvalidPointBuy { spent } => write!(
                f,
                "Point buy scores must be 8-15 and cost at most {POINT_BUY_TOTAL} points, spent {spent}"
            ),
            BuilderError::UnknownSubclass(name) => {
                write!(f, "{name} is not a subclass of this class")
            }
            BuilderError::SubclassTooEarly { subclass, level } => {
                write!(f, "{subclass} cannot be chosen before class level {level}")
            }
            BuilderError::UnknownSpell(name) => {
                write!(f, "{name} is not on this class's spell list")
            }
            BuilderError::InvalidCantripCount { expected, got } => {
                write!(f, "Expected {expected} cantrips, got {got}")
            }
            BuilderError::InvalidSpellCount { expected, got } => {
                write!(f, "Expected {expected} spells, got {got}")
            }
        }
    }
}

impl std::error::Error for BuilderError {}

impl CharacterBuilder {
    /// Create a new character builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the character's name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the character's class.
    pub fn class(mut self, class: CharacterClass) -> Self {
        self.class = Some(class);
        self
    }

    /// Set the starting level. Defaults to 1.
    pub fn level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    pub fn subclass(mut self, subclass: impl Into<String>) -> Self {
        self.subclass = Some(subclass.into());
        self
    }

    /// Set the ability score method.
    pub fn ability_method(mut self, method: AbilityMethod) -> Self {
        self.ability_method = method;
        self
    }

    /// Set the ability scores directly.
    pub fn ability_scores(mut self, scores: AbilityScores) -> Self {
        self.ability_scores = Some(scores);
        self
    }

    /// Set ability scores from standard array assignment.
    ///
    /// `assignment` maps each standard array value (15, 14, 13, 12, 10, 8) to an ability.
    pub fn standard_array(mut self, assignment: [(u8, Ability); 6]) -> Self {
        let mut scores = AbilityScores::default();
        for (value, ability) in assignment {
            scores.set(ability, value);
        }
        self.ability_scores = Some(scores);
        self.ability_method = AbilityMethod::StandardArray;
        self
    }

    /// Set ability scores from point buy values.
    pub fn point_buy(mut self, scores: AbilityScores) -> Self {
        self.ability_scores = Some(scores);
        self.ability_method = AbilityMethod::PointBuy;
        self
    }

    /// Set ability scores from rolled values.
    pub fn rolled(mut self, scores: AbilityScores) -> Self {
        self.ability_scores = Some(scores);
        self.ability_method = AbilityMethod::Rolled;
        self
    }

    /// Set the skills selected from class options.
    pub fn skills(mut self, skills: Vec<Skill>) -> Self {
        self.selected_skills = skills;
        self
    }

    pub fn cantrips(mut self, cantrips: Vec<String>) -> Self {
        self.cantrips = cantrips;
        self
    }

    pub fn spells(mut self, spells: Vec<String>) -> Self {
        self.spells = spells;
        self
    }

    /// Build the character, returning an error if any required field is missing.
    pub fn build(self) -> Result<Character, BuilderError> {
        let name = self.name.ok_or(BuilderError::MissingName)?;
        let class = self.class.ok_or(BuilderError::MissingClass)?;
        let ability_scores = self
            .ability_scores
            .ok_or(BuilderError::MissingAbilityScores)?;
        let level = self.level;
        if level == 0 || level > MAX_CHARACTER_LEVEL {
            return Err(BuilderError::InvalidLevel(level));
        }
        if self.ability_method == AbilityMethod::PointBuy {
            check_point_buy(&ability_scores)?;
        }

        let rules = class.rules();

        // Validate skill count
        if self.selected_skills.len() != rules.skill_count {
            return Err(BuilderError::InvalidSkillCount {
                expected: rules.skill_count,
                got: self.selected_skills.len(),
            });
        }

        // Validate skill availability
        for skill in &self.selected_skills {
            if !rules.skill_options.contains(skill) {
                return Err(BuilderError::SkillNotAvailable(*skill));
            }
        }

        let subclass: Option<&'static Subclass> = match &self.subclass {
            Some(name) => {
                let subclass = find_subclass(class, name)
                    .ok_or_else(|| BuilderError::UnknownSubclass(name.clone()))?;
                if level < rules.subclass_level {
                    return Err(BuilderError::SubclassTooEarly {
                        subclass: subclass.name.to_string(),
                        level: rules.subclass_level,
                    });
                }
                Some(subclass)
            }
            None => None,
        };

        let third_caster = subclass.is_some_and(|s| s.third_caster);
        if let Some(unknown) = self
            .cantrips
            .iter()
            .chain(&self.spells)
            .find(|name| !on_class_list(class, third_caster, name))
        {
            return Err(BuilderError::UnknownSpell(unknown.clone()));
        }
        let expected = cantrip_gain(class, subclass, 0, level) as usize;
        if self.cantrips.len() != expected {
            return Err(BuilderError::InvalidCantripCount {
                expected,
                got: self.cantrips.len(),
            });
        }
        let expected = spells_known_gain(class, subclass, 0, level) as usize;
        if self.spells.len() != expected {
            return Err(BuilderError::InvalidSpellCount {
                expected,
                got: self.spells.len(),
            });
        }

        let mut character = Character::new(name);
        character.ability_scores = ability_scores;
        character.level = level;

        let mut entry = ClassEntry::new(class, level, true);
        entry.subclass = subclass.map(|s| s.name.to_string());
        character.classes = vec![entry];

        // First level takes the full die, later levels the fixed average.
        character.hit_die_rolls = (1..=level)
            .map(|l| HitDieRoll {
                class,
                die: rules.hit_die,
                value: if l == 1 {
                    rules.hit_die.sides()
                } else {
                    rules.hit_die.fixed_average()
                },
            })
            .collect();

        character.saving_throw_proficiencies = rules.saving_throws.into_iter().collect::<HashSet<_>>();
        character.skill_proficiencies = self
            .selected_skills
            .iter()
            .map(|skill| (*skill, ProficiencyLevel::Proficient))
            .collect::<HashMap<_, _>>();
        character.other_proficiencies = rules.proficiencies.iter().map(|p| p.to_string()).collect();

        character.features = (1..=level)
            .flat_map(|l| {
                rules.features_at(l, subclass).into_iter().map(move |name| Feature {
                    name: name.to_string(),
                    source: class.name().to_string(),
                    level: l,
                })
            })
            .collect();

        if spellcasting_ability(class, subclass).is_some()
            || !self.cantrips.is_empty()
            || !self.spells.is_empty()
        {
            character.spellcasting.insert(
                class,
                ClassSpellcasting {
                    cantrips_known: self.cantrips,
                    spells_known: self.spells,
                    ..ClassSpellcasting::default()
                },
            );
        }

        recompute_derived(&mut character);
        Ok(character)
    }
}

fn check_point_buy(scores: &AbilityScores) -> Result<(), BuilderError> {
    let mut spent = 0u32;
    let mut valid = true;
    for ability in Ability::all() {
        match point_buy_cost(scores.get(ability)) {
            Some(cost) => spent += cost as u32,
            None => valid = false,
        }
    }
    if !valid || spent > POINT_BUY_TOTAL as u32 {
        return Err(BuilderError::InvalidPointBuy { spent });
    }
    Ok(())
}

fn on_class_list(class: CharacterClass, third_caster: bool, name: &str) -> bool {
    let Some(list) = SpellClass::for_class(class, third_caster) else {
        return false;
    };
    get_spell(name).is_some_and(|spell| spell.on_list(list))
}

/// Recompute every derived field of `character` from its primitive state:
/// recorded hit dice, ability scores, class levels and proficiencies.
///
/// Current hit points move with the maximum; used slots and spent resources
/// are kept.
pub fn recompute_derived(character: &mut Character) {
    character.level = character.total_class_levels();

    // Without a full roll history the stored maximum stands.
    let con_mod = character.ability_scores.modifier(Ability::Constitution);
    let maximum = if character.hit_die_rolls.len() == character.level as usize {
        derived::max_hit_points(&character.hit_die_rolls, con_mod)
    } else {
        character.hit_points.maximum
    };
    if character.hit_points.maximum == 0 {
        character.hit_points = HitPoints::new(maximum);
    } else {
        character.hit_points.set_maximum(maximum);
    }

    let stats = derived::derive_stats(
        &character.ability_scores,
        character.level,
        &character.saving_throw_proficiencies,
        &character.skill_proficiencies,
        None,
    );
    character.proficiency_bonus = stats.proficiency_bonus;
    character.saving_throws = stats.saving_throws;
    character.passive_perception = stats.passive_perception;

    let subclasses: HashMap<CharacterClass, Option<&'static Subclass>> = character
        .classes
        .iter()
        .map(|c| {
            let subclass = c.subclass.as_deref().and_then(|name| find_subclass(c.class, name));
            (c.class, subclass)
        })
        .collect();
    let scores = &character.ability_scores;
    for (class, spellcasting) in character.spellcasting.iter_mut() {
        let ability = spellcasting_ability(*class, subclasses.get(class).copied().flatten());
        spellcasting.ability = ability;
        spellcasting.spell_save_dc =
            ability.map(|a| derived::spell_save_dc(scores, stats.proficiency_bonus, a));
        spellcasting.spell_attack_bonus =
            ability.map(|a| derived::spell_attack_bonus(scores, stats.proficiency_bonus, a));
    }

    let held = HeldChoices::from_character(character);
    character.spell_slots = SpellSlots::from_maxima(
        derived::spell_slot_maxima(&caster_entries(&held)),
        &character.spell_slots,
    );
    character.pact_slots = derived::pact_slot_maxima(
        held.class_level(CharacterClass::Warlock),
        character.pact_slots.as_ref(),
    );
    character.resources = derived::resource_maxima(
        &held.class_levels,
        &character.ability_scores,
        &character.resources,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fighter_builder() -> CharacterBuilder {
        CharacterBuilder::new()
            .name("Test Fighter")
            .class(CharacterClass::Fighter)
            .standard_array([
                (15, Ability::Strength),
                (14, Ability::Constitution),
                (13, Ability::Dexterity),
                (12, Ability::Wisdom),
                (10, Ability::Intelligence),
                (8, Ability::Charisma),
            ])
            .skills(vec![Skill::Athletics, Skill::Perception])
    }

    #[test]
    fn test_standard_array() {
        let character = fighter_builder().build().unwrap();

        assert_eq!(character.name, "Test Fighter");
        assert_eq!(character.level, 1);
        assert_eq!(character.ability_scores.strength, 15);
        assert_eq!(character.ability_scores.charisma, 8);
        // d10 + CON 14
        assert_eq!(character.hit_points.maximum, 12);
        assert_eq!(character.hit_points.current, 12);
        assert_eq!(character.proficiency_bonus, 2);
        // 10 + WIS 12 + proficient
        assert_eq!(character.passive_perception, 13);
        assert!(character
            .saving_throw_proficiencies
            .contains(&Ability::Strength));
        assert_eq!(character.saving_throws[&Ability::Strength], 4);
        assert!(character.features.iter().any(|f| f.name == "Second Wind"));
        assert!(character.spellcasting.is_empty());
    }

    #[test]
    fn test_missing_fields() {
        let result = CharacterBuilder::new().build();
        assert_eq!(result.unwrap_err(), BuilderError::MissingName);

        let result = CharacterBuilder::new().name("Test").build();
        assert_eq!(result.unwrap_err(), BuilderError::MissingClass);
    }

    #[test]
    fn test_invalid_skills() {
        let result = fighter_builder().skills(vec![Skill::Athletics]).build();
        assert!(matches!(
            result,
            Err(BuilderError::InvalidSkillCount { expected: 2, got: 1 })
        ));

        let result = fighter_builder()
            .skills(vec![Skill::Athletics, Skill::Arcana])
            .build();
        assert_eq!(result.unwrap_err(), BuilderError::SkillNotAvailable(Skill::Arcana));
    }

    #[test]
    fn test_point_buy_budget() {
        let over = AbilityScores::new(15, 15, 15, 15, 8, 8);
        let result = fighter_builder().point_buy(over).build();
        assert!(matches!(result, Err(BuilderError::InvalidPointBuy { spent: 36 })));

        let legal = AbilityScores::new(15, 14, 13, 12, 10, 8);
        assert!(fighter_builder().point_buy(legal).build().is_ok());
    }

    #[test]
    fn test_higher_starting_level() {
        let character = fighter_builder()
            .level(3)
            .subclass("Champion")
            .build()
            .unwrap();
        assert_eq!(character.level, 3);
        assert_eq!(character.hit_die_rolls.len(), 3);
        // 10 + 6 + 6, +2 CON per level
        assert_eq!(character.hit_points.maximum, 28);
        assert_eq!(character.classes[0].subclass.as_deref(), Some("Champion"));

        let early = fighter_builder().subclass("Champion").build();
        assert!(matches!(early, Err(BuilderError::SubclassTooEarly { level: 3, .. })));
        let unknown = fighter_builder().level(3).subclass("Moon").build();
        assert_eq!(unknown.unwrap_err(), BuilderError::UnknownSubclass("Moon".into()));
        assert_eq!(fighter_builder().level(21).build().unwrap_err(), BuilderError::InvalidLevel(21));
    }

    #[test]
    fn test_wizard_spellcasting() {
        let wizard = CharacterBuilder::new()
            .name("Mage")
            .class(CharacterClass::Wizard)
            .ability_scores(AbilityScores::new(8, 14, 13, 15, 12, 10))
            .skills(vec![Skill::Arcana, Skill::History])
            .cantrips(vec!["Fire Bolt".into(), "Light".into(), "Mage Hand".into()])
            .spells(wizard_spellbook())
            .build()
            .unwrap();
        let spellcasting = &wizard.spellcasting[&CharacterClass::Wizard];
        assert_eq!(spellcasting.ability, Some(Ability::Intelligence));
        assert_eq!(spellcasting.spell_save_dc, Some(12));
        assert_eq!(spellcasting.spell_attack_bonus, Some(4));
        assert_eq!(wizard.spell_slots.slots[0].total, 2);

        let wrong = CharacterBuilder::new()
            .name("Mage")
            .class(CharacterClass::Wizard)
            .ability_scores(AbilityScores::new(8, 14, 13, 15, 12, 10))
            .skills(vec![Skill::Arcana, Skill::History])
            .cantrips(vec!["Sacred Flame".into()])
            .build();
        assert_eq!(wrong.unwrap_err(), BuilderError::UnknownSpell("Sacred Flame".into()));
    }

    fn wizard_spellbook() -> Vec<String> {
        ["Burning Hands", "Feather Fall", "Mage Armor", "Magic Missile", "Shield", "Sleep"]
            .map(String::from)
            .to_vec()
    }

    #[test]
    fn test_starting_spells_must_fill_the_class_allotment() {
        let mage = || {
            CharacterBuilder::new()
                .name("Mage")
                .class(CharacterClass::Wizard)
                .ability_scores(AbilityScores::new(8, 14, 13, 15, 12, 10))
                .skills(vec![Skill::Arcana, Skill::History])
        };
        assert_eq!(
            mage().build().unwrap_err(),
            BuilderError::InvalidCantripCount { expected: 3, got: 0 }
        );
        let cantrips = vec!["Fire Bolt".into(), "Light".into(), "Mage Hand".into()];
        assert_eq!(
            mage()
                .cantrips(cantrips.clone())
                .spells(vec!["Magic Missile".into(), "Shield".into()])
                .build()
                .unwrap_err(),
            BuilderError::InvalidSpellCount { expected: 6, got: 2 }
        );
        let wizard = mage().cantrips(cantrips).spells(wizard_spellbook()).build().unwrap();
        assert_eq!(wizard.spellcasting[&CharacterClass::Wizard].spells_known.len(), 6);

        let spells = fighter_builder().spells(vec!["Shield".into()]).build();
        assert!(matches!(spells, Err(BuilderError::UnknownSpell(_))));
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut character = fighter_builder().level(5).build().unwrap();
        let before = character.clone();
        recompute_derived(&mut character);
        assert_eq!(character, before);
        assert_eq!(character.proficiency_bonus, 3);
    }

    #[test]
    fn test_ability_methods() {
        assert_eq!(AbilityMethod::default(), AbilityMethod::StandardArray);
        assert_eq!(STANDARD_ARRAY.iter().map(|s| *s as u32).sum::<u32>(), 72);
        assert_eq!(point_buy_cost(16), None);
    }
}
