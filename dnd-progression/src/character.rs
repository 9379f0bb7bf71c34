//! Persisted character state.
//!
//! Contains the ability/skill vocabulary, class entries, spell slots,
//! resources and the level history that the progression engine reads from
//! and writes back to the character store.

use crate::dice::DieType;
use crate::options::{FavoredEnemy, FavoredTerrain, FightingStyle, Metamagic, PactBoon};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Highest level a character (sum of all class levels) can reach.
pub const MAX_CHARACTER_LEVEL: u8 = 20;

/// Highest value an ability score can be raised to by level-up choices.
pub const MAX_ABILITY_SCORE: u8 = 20;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacterId(pub Uuid);

impl CharacterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CharacterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Ability Scores
// ============================================================================

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Ability::Strength => "Strength",
            Ability::Dexterity => "Dexterity",
            Ability::Constitution => "Constitution",
            Ability::Intelligence => "Intelligence",
            Ability::Wisdom => "Wisdom",
            Ability::Charisma => "Charisma",
        }
    }

    pub fn all() -> [Ability; 6] {
        [
            Ability::Strength,
            Ability::Dexterity,
            Ability::Constitution,
            Ability::Intelligence,
            Ability::Wisdom,
            Ability::Charisma,
        ]
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

/// Ability scores container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    pub strength: u8,
    pub dexterity: u8,
    pub constitution: u8,
    pub intelligence: u8,
    pub wisdom: u8,
    pub charisma: u8,
}

impl AbilityScores {
    pub fn new(str: u8, dex: u8, con: u8, int: u8, wis: u8, cha: u8) -> Self {
        Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: wis,
            charisma: cha,
        }
    }

    pub fn get(&self, ability: Ability) -> u8 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    pub fn set(&mut self, ability: Ability, value: u8) {
        match ability {
            Ability::Strength => self.strength = value,
            Ability::Dexterity => self.dexterity = value,
            Ability::Constitution => self.constitution = value,
            Ability::Intelligence => self.intelligence = value,
            Ability::Wisdom => self.wisdom = value,
            Ability::Charisma => self.charisma = value,
        }
    }

    /// Raise a score, never past [`MAX_ABILITY_SCORE`].
    pub fn increase(&mut self, ability: Ability, amount: u8) {
        let raised = self.get(ability).saturating_add(amount).min(MAX_ABILITY_SCORE);
        self.set(ability, raised);
    }

    pub fn modifier(&self, ability: Ability) -> i8 {
        ability_modifier(self.get(ability))
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::new(10, 10, 10, 10, 10, 10)
    }
}

/// `floor((score - 10) / 2)`; scores 8-9 give -1, 10-11 give 0.
pub fn ability_modifier(score: u8) -> i8 {
    (score as i8 - 10).div_euclid(2)
}

// ============================================================================
// Skills
// ============================================================================

/// D&D 5e skills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Skill {
    Athletics,
    Acrobatics,
    SleightOfHand,
    Stealth,
    Arcana,
    History,
    Investigation,
    Nature,
    Religion,
    AnimalHandling,
    Insight,
    Medicine,
    Perception,
    Survival,
    Deception,
    Intimidation,
    Performance,
    Persuasion,
}

impl Skill {
    pub fn ability(&self) -> Ability {
        match self {
            Skill::Athletics => Ability::Strength,
            Skill::Acrobatics | Skill::SleightOfHand | Skill::Stealth => Ability::Dexterity,
            Skill::Arcana
            | Skill::History
            | Skill::Investigation
            | Skill::Nature
            | Skill::Religion => Ability::Intelligence,
            Skill::AnimalHandling
            | Skill::Insight
            | Skill::Medicine
            | Skill::Perception
            | Skill::Survival => Ability::Wisdom,
            Skill::Deception | Skill::Intimidation | Skill::Performance | Skill::Persuasion => {
                Ability::Charisma
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Skill::Athletics => "Athletics",
            Skill::Acrobatics => "Acrobatics",
            Skill::SleightOfHand => "Sleight of Hand",
            Skill::Stealth => "Stealth",
            Skill::Arcana => "Arcana",
            Skill::History => "History",
            Skill::Investigation => "Investigation",
            Skill::Nature => "Nature",
            Skill::Religion => "Religion",
            Skill::AnimalHandling => "Animal Handling",
            Skill::Insight => "Insight",
            Skill::Medicine => "Medicine",
            Skill::Perception => "Perception",
            Skill::Survival => "Survival",
            Skill::Deception => "Deception",
            Skill::Intimidation => "Intimidation",
            Skill::Performance => "Performance",
            Skill::Persuasion => "Persuasion",
        }
    }

    pub fn all() -> &'static [Skill] {
        &[
            Skill::Athletics,
            Skill::Acrobatics,
            Skill::SleightOfHand,
            Skill::Stealth,
            Skill::Arcana,
            Skill::History,
            Skill::Investigation,
            Skill::Nature,
            Skill::Religion,
            Skill::AnimalHandling,
            Skill::Insight,
            Skill::Medicine,
            Skill::Perception,
            Skill::Survival,
            Skill::Deception,
            Skill::Intimidation,
            Skill::Performance,
            Skill::Persuasion,
        ]
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Proficiency level for skills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProficiencyLevel {
    #[default]
    None,
    Proficient,
    Expertise,
}

impl ProficiencyLevel {
    pub fn bonus(&self, proficiency_bonus: i8) -> i8 {
        match self {
            ProficiencyLevel::None => 0,
            ProficiencyLevel::Proficient => proficiency_bonus,
            ProficiencyLevel::Expertise => proficiency_bonus * 2,
        }
    }
}

// ============================================================================
// Classes
// ============================================================================

/// D&D character classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CharacterClass {
    Barbarian,
    Bard,
    Cleric,
    Druid,
    Fighter,
    Monk,
    Paladin,
    Ranger,
    Rogue,
    Sorcerer,
    Warlock,
    Wizard,
}

impl CharacterClass {
    pub fn name(&self) -> &'static str {
        match self {
            CharacterClass::Barbarian => "Barbarian",
            CharacterClass::Bard => "Bard",
            CharacterClass::Cleric => "Cleric",
            CharacterClass::Druid => "Druid",
            CharacterClass::Fighter => "Fighter",
            CharacterClass::Monk => "Monk",
            CharacterClass::Paladin => "Paladin",
            CharacterClass::Ranger => "Ranger",
            CharacterClass::Rogue => "Rogue",
            CharacterClass::Sorcerer => "Sorcerer",
            CharacterClass::Warlock => "Warlock",
            CharacterClass::Wizard => "Wizard",
        }
    }

    /// Get all character classes.
    pub fn all() -> &'static [CharacterClass] {
        &[
            CharacterClass::Barbarian,
            CharacterClass::Bard,
            CharacterClass::Cleric,
            CharacterClass::Druid,
            CharacterClass::Fighter,
            CharacterClass::Monk,
            CharacterClass::Paladin,
            CharacterClass::Ranger,
            CharacterClass::Rogue,
            CharacterClass::Sorcerer,
            CharacterClass::Warlock,
            CharacterClass::Wizard,
        ]
    }
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CharacterClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CharacterClass::all()
            .iter()
            .copied()
            .find(|class| class.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown class: {s}"))
    }
}

/// One class a character holds levels in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntry {
    pub class: CharacterClass,
    pub level: u8,
    pub is_primary: bool,
    pub subclass: Option<String>,
}

impl ClassEntry {
    pub fn new(class: CharacterClass, level: u8, is_primary: bool) -> Self {
        Self {
            class,
            level,
            is_primary,
            subclass: None,
        }
    }
}

// ============================================================================
// Hit Points
// ============================================================================

/// Hit points tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitPoints {
    pub current: i32,
    pub maximum: i32,
    pub temporary: i32,
}

impl HitPoints {
    pub fn new(maximum: i32) -> Self {
        Self {
            current: maximum,
            maximum,
            temporary: 0,
        }
    }

    /// Change the maximum, moving current by the same delta.
    pub fn set_maximum(&mut self, maximum: i32) {
        let delta = maximum - self.maximum;
        self.maximum = maximum;
        self.current = (self.current + delta).clamp(0, maximum);
    }
}

/// The hit-die result recorded for one character level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitDieRoll {
    pub class: CharacterClass,
    pub die: DieType,
    pub value: u8,
}

// ============================================================================
// Features and Resources
// ============================================================================

/// Class feature granted at a level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub source: String,
    pub level: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RechargeType {
    ShortRest,
    LongRest,
}

/// A limited-use class resource (rage, ki, sorcery points, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    pub key: String,
    pub name: String,
    pub current: u32,
    pub maximum: u32,
    pub recharge: RechargeType,
}

// ============================================================================
// Spellcasting
// ============================================================================

/// Spells one class has learned.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassSpellcasting {
    pub ability: Option<Ability>,
    pub cantrips_known: Vec<String>,
    pub spells_known: Vec<String>,
    pub spell_save_dc: Option<u8>,
    pub spell_attack_bonus: Option<i8>,
}

/// Spell slot tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellSlots {
    pub slots: [SlotInfo; 9],
}

impl SpellSlots {
    pub fn new() -> Self {
        Self {
            slots: [SlotInfo::default(); 9],
        }
    }

    /// Build from per-level maxima, keeping `used` counts from `previous`.
    pub fn from_maxima(maxima: [u8; 9], previous: &SpellSlots) -> Self {
        let mut slots = SpellSlots::new();
        for (i, total) in maxima.into_iter().enumerate() {
            slots.slots[i] = SlotInfo {
                total,
                used: previous.slots[i].used.min(total),
            };
        }
        slots
    }

    pub fn maxima(&self) -> [u8; 9] {
        std::array::from_fn(|i| self.slots[i].total)
    }

    pub fn total(&self, level: u8) -> u8 {
        if (1..=9).contains(&level) {
            self.slots[level as usize - 1].total
        } else {
            0
        }
    }
}

impl Default for SpellSlots {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlotInfo {
    pub total: u8,
    pub used: u8,
}

impl SlotInfo {
    pub fn available(&self) -> u8 {
        self.total.saturating_sub(self.used)
    }
}

/// Pact Magic slots: all of one level, recovered on a short rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PactSlots {
    pub count: u8,
    pub slot_level: u8,
    pub used: u8,
}

// ============================================================================
// Level History
// ============================================================================

/// Every choice made during one progression session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChoicesMade {
    pub classes_leveled: Vec<CharacterClass>,
    pub hit_die_rolls: Vec<u8>,
    pub ability_increases: BTreeMap<Ability, u8>,
    pub feats: Vec<String>,
    pub spells: Vec<String>,
    pub cantrips: Vec<String>,
    pub fighting_styles: Vec<FightingStyle>,
    pub expertise: Vec<Skill>,
    pub skills: Vec<Skill>,
    pub metamagic: Vec<Metamagic>,
    pub pact_boon: Option<PactBoon>,
    pub invocations_gained: Vec<String>,
    pub invocations_removed: Vec<String>,
    pub magical_secrets: Vec<String>,
    pub favored_enemies: Vec<FavoredEnemy>,
    pub favored_terrains: Vec<FavoredTerrain>,
    pub subclasses: Vec<String>,
    pub mystic_arcanum: Vec<String>,
}

/// Immutable record of one committed transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelHistoryRecord {
    pub previous_level: u8,
    pub new_level: u8,
    pub hp_gained: i32,
    pub choices_made: ChoicesMade,
    pub features_gained: Vec<String>,
    pub recorded_at: String,
}

// ============================================================================
// Character
// ============================================================================

/// The durable character aggregate owned by the character store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    /// Bumped by the store on every committed transition.
    pub revision: u64,

    // Core stats
    pub level: u8,
    pub ability_scores: AbilityScores,
    pub proficiency_bonus: i8,

    // Health
    pub hit_points: HitPoints,
    pub hit_die_rolls: Vec<HitDieRoll>,

    // Classes
    pub classes: Vec<ClassEntry>,
    pub features: Vec<Feature>,
    pub resources: Vec<ResourcePool>,
    pub feats: Vec<String>,

    // Proficiencies
    pub skill_proficiencies: HashMap<Skill, ProficiencyLevel>,
    pub saving_throw_proficiencies: HashSet<Ability>,
    pub saving_throws: BTreeMap<Ability, i8>,
    pub other_proficiencies: Vec<String>,
    pub passive_perception: i8,

    // Spellcasting
    pub spellcasting: BTreeMap<CharacterClass, ClassSpellcasting>,
    pub spell_slots: SpellSlots,
    pub pact_slots: Option<PactSlots>,
    pub mystic_arcanum: BTreeMap<u8, String>,

    // Class-specific choices
    pub pact_boon: Option<PactBoon>,
    pub invocations: Vec<String>,
    pub metamagic: Vec<Metamagic>,
    pub fighting_styles: Vec<FightingStyle>,
    pub favored_enemies: Vec<FavoredEnemy>,
    pub favored_terrains: Vec<FavoredTerrain>,

    pub level_history: Vec<LevelHistoryRecord>,
}

impl Character {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
            revision: 0,
            level: 0,
            ability_scores: AbilityScores::default(),
            proficiency_bonus: 2,
            hit_points: HitPoints::new(0),
            hit_die_rolls: Vec::new(),
            classes: Vec::new(),
            features: Vec::new(),
            resources: Vec::new(),
            feats: Vec::new(),
            skill_proficiencies: HashMap::new(),
            saving_throw_proficiencies: HashSet::new(),
            saving_throws: BTreeMap::new(),
            other_proficiencies: Vec::new(),
            passive_perception: 10,
            spellcasting: BTreeMap::new(),
            spell_slots: SpellSlots::new(),
            pact_slots: None,
            mystic_arcanum: BTreeMap::new(),
            pact_boon: None,
            invocations: Vec::new(),
            metamagic: Vec::new(),
            fighting_styles: Vec::new(),
            favored_enemies: Vec::new(),
            favored_terrains: Vec::new(),
            level_history: Vec::new(),
        }
    }

    /// Sum of all class levels.
    pub fn total_class_levels(&self) -> u8 {
        self.classes.iter().map(|c| c.level).sum()
    }

    pub fn primary_class(&self) -> Option<CharacterClass> {
        self.classes
            .iter()
            .find(|c| c.is_primary)
            .or_else(|| self.classes.first())
            .map(|c| c.class)
    }

    pub fn class_entry(&self, class: CharacterClass) -> Option<&ClassEntry> {
        self.classes.iter().find(|c| c.class == class)
    }

    pub fn class_level(&self, class: CharacterClass) -> u8 {
        self.class_entry(class).map(|c| c.level).unwrap_or(0)
    }

    pub fn is_multiclassed(&self) -> bool {
        self.classes.len() > 1
    }

    pub fn skill_level(&self, skill: Skill) -> ProficiencyLevel {
        self.skill_proficiencies
            .get(&skill)
            .copied()
            .unwrap_or_default()
    }

    pub fn resource(&self, key: &str) -> Option<&ResourcePool> {
        self.resources.iter().find(|r| r.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ability_modifier_floors() {
        assert_eq!(ability_modifier(1), -5);
        assert_eq!(ability_modifier(8), -1);
        assert_eq!(ability_modifier(9), -1);
        assert_eq!(ability_modifier(10), 0);
        assert_eq!(ability_modifier(13), 1);
        assert_eq!(ability_modifier(20), 5);
    }

    #[test]
    fn test_increase_caps_at_twenty() {
        let mut scores = AbilityScores::new(19, 10, 10, 10, 10, 10);
        scores.increase(Ability::Strength, 2);
        assert_eq!(scores.strength, 20);
    }

    #[test]
    fn test_class_from_str() {
        assert_eq!("wizard".parse::<CharacterClass>(), Ok(CharacterClass::Wizard));
        assert_eq!(" Fighter ".parse::<CharacterClass>(), Ok(CharacterClass::Fighter));
        assert!("artificer".parse::<CharacterClass>().is_err());
    }

    #[test]
    fn test_set_maximum_moves_current() {
        let mut hp = HitPoints::new(20);
        hp.current = 12;
        hp.set_maximum(25);
        assert_eq!(hp.maximum, 25);
        assert_eq!(hp.current, 17);
    }

    #[test]
    fn test_spell_slots_keep_used() {
        let mut previous = SpellSlots::new();
        previous.slots[0] = SlotInfo { total: 3, used: 2 };
        let slots = SpellSlots::from_maxima([4, 2, 0, 0, 0, 0, 0, 0, 0], &previous);
        assert_eq!(slots.slots[0].total, 4);
        assert_eq!(slots.slots[0].used, 2);
        assert_eq!(slots.slots[0].available(), 2);
        assert_eq!(slots.total(2), 2);
        assert_eq!(slots.total(10), 0);
    }

    #[test]
    fn test_primary_class_falls_back_to_first() {
        let mut character = Character::new("Test");
        character.classes = vec![ClassEntry::new(CharacterClass::Rogue, 2, false)];
        assert_eq!(character.primary_class(), Some(CharacterClass::Rogue));
        assert_eq!(character.class_level(CharacterClass::Rogue), 2);
        assert_eq!(character.class_level(CharacterClass::Wizard), 0);
    }
}
