//! D&D 5e class rules for level progression.
//!
//! Contains hit dice, saving throws, spellcasting type, subclass unlock
//! levels, ASI levels, per-level features and feature-choice triggers,
//! resource formulas and multiclass rules for all 12 PHB classes.

use crate::character::{Ability, AbilityScores, CharacterClass, RechargeType, Skill};
use crate::dice::DieType;
use crate::eligibility::invocations_to_gain;
use crate::options::Subclass;
use crate::progression::{self, CasterProgression};
use serde::{Deserialize, Serialize};

/// Sentinel maximum for resources with unlimited uses (rage at level 20).
pub const UNLIMITED: u32 = 99;

/// How a class learns spells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpellcastingType {
    None,
    /// Learns a fixed number of spells from a table.
    Known,
    /// Prepares from the whole class list each day.
    Prepared,
    Pact,
    /// Spellcasting granted by a subclass.
    ThirdCaster,
}

/// A decision a class feature asks the player to make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureChoiceSpec {
    Subclass,
    FightingStyle { count: u8 },
    Expertise { count: u8 },
    Metamagic { count: u8 },
    PactBoon,
    /// `replace_count` existing invocations may be swapped in addition to
    /// the `count` new ones.
    Invocation { count: u8, replace_count: u8 },
    MagicalSecrets { count: u8 },
    FavoredEnemy { count: u8 },
    FavoredTerrain { count: u8 },
    MysticArcanum { spell_level: u8 },
}

impl FeatureChoiceSpec {
    /// Number of selections the choice requires.
    pub fn count(&self) -> u8 {
        match self {
            FeatureChoiceSpec::Subclass
            | FeatureChoiceSpec::PactBoon
            | FeatureChoiceSpec::MysticArcanum { .. } => 1,
            FeatureChoiceSpec::FightingStyle { count }
            | FeatureChoiceSpec::Expertise { count }
            | FeatureChoiceSpec::Metamagic { count }
            | FeatureChoiceSpec::Invocation { count, .. }
            | FeatureChoiceSpec::MagicalSecrets { count }
            | FeatureChoiceSpec::FavoredEnemy { count }
            | FeatureChoiceSpec::FavoredTerrain { count } => *count,
        }
    }
}

/// A limited-use resource and how its maximum scales.
#[derive(Debug, Clone, Copy)]
pub struct ResourceSpec {
    pub key: &'static str,
    pub name: &'static str,
    /// Ability whose modifier feeds the formula, if any.
    pub ability: Option<Ability>,
    /// `(class level, ability modifier) -> maximum`. Zero means not yet gained.
    pub formula: fn(u8, i8) -> u32,
    pub recharge: RechargeType,
    /// Class level from which the resource recharges on a short rest instead.
    pub short_rest_from: Option<u8>,
}

impl ResourceSpec {
    pub fn maximum(&self, level: u8, ability_mod: i8) -> u32 {
        (self.formula)(level, ability_mod)
    }

    pub fn recharge_at(&self, level: u8) -> RechargeType {
        match self.short_rest_from {
            Some(from) if level >= from => RechargeType::ShortRest,
            _ => self.recharge,
        }
    }
}

/// Ability thresholds for multiclassing into or out of a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MulticlassRequirement {
    /// Every listed threshold must be met.
    All(&'static [(Ability, u8)]),
    /// At least one listed threshold must be met.
    Any(&'static [(Ability, u8)]),
}

impl MulticlassRequirement {
    pub fn is_met(&self, scores: &AbilityScores) -> bool {
        match self {
            MulticlassRequirement::All(reqs) => {
                reqs.iter().all(|(ability, min)| scores.get(*ability) >= *min)
            }
            MulticlassRequirement::Any(reqs) => {
                reqs.iter().any(|(ability, min)| scores.get(*ability) >= *min)
            }
        }
    }

    /// Human readable form, e.g. "STR 13 or DEX 13".
    pub fn describe(&self) -> String {
        let (reqs, joiner) = match self {
            MulticlassRequirement::All(reqs) => (reqs, " and "),
            MulticlassRequirement::Any(reqs) => (reqs, " or "),
        };
        reqs.iter()
            .map(|(ability, min)| format!("{} {}", ability.abbreviation(), min))
            .collect::<Vec<_>>()
            .join(joiner)
    }
}

/// What a character gains when taking a first level in this class as a
/// secondary class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MulticlassGrants {
    pub proficiencies: &'static [&'static str],
    pub skill_picks: u8,
    /// Skill picks may come from any skill rather than the class list.
    pub any_skill: bool,
}

/// Class-specific progression rules.
#[derive(Debug, Clone, Copy)]
pub struct ClassRules {
    pub class: CharacterClass,
    pub hit_die: DieType,
    /// Saving throw proficiencies granted by the class.
    pub saving_throws: [Ability; 2],
    pub spellcasting: SpellcastingType,
    pub caster: CasterProgression,
    pub spellcasting_ability: Option<Ability>,
    pub subclass_level: u8,
    pub asi_levels: &'static [u8],
    /// Number of skills to choose at level 1.
    pub skill_count: usize,
    /// Skills available to choose from.
    pub skill_options: &'static [Skill],
    /// Armor, weapon and tool proficiencies at level 1.
    pub proficiencies: &'static [&'static str],
    pub features: &'static [(u8, &'static str)],
    /// Static feature-choice triggers. Invocations and mystic arcanum are
    /// derived from the progression tables in [`ClassRules::feature_choices_at`].
    pub choices: &'static [(u8, FeatureChoiceSpec)],
    pub resources: &'static [ResourceSpec],
    pub multiclass_requirement: MulticlassRequirement,
    pub multiclass_grants: MulticlassGrants,
}

impl ClassRules {
    pub fn is_asi_level(&self, level: u8) -> bool {
        self.asi_levels.contains(&level)
    }

    /// Every feature choice triggered on reaching class `level`, including the
    /// subclass pick and choices granted by `subclass`.
    pub fn feature_choices_at(&self, level: u8, subclass: Option<&Subclass>) -> Vec<FeatureChoiceSpec> {
        let mut choices = Vec::new();
        if level == self.subclass_level {
            choices.push(FeatureChoiceSpec::Subclass);
        }
        choices.extend(
            self.choices
                .iter()
                .filter(|(at, _)| *at == level)
                .map(|(_, choice)| *choice),
        );
        if self.class == CharacterClass::Warlock {
            let before = progression::invocations_known(level.saturating_sub(1));
            let gain = invocations_to_gain(level.saturating_sub(1), level);
            let replace_count = u8::from(before > 0);
            if gain > 0 || replace_count > 0 {
                choices.push(FeatureChoiceSpec::Invocation {
                    count: gain,
                    replace_count,
                });
            }
            if let Some(spell_level) = mystic_arcanum_level(level) {
                choices.push(FeatureChoiceSpec::MysticArcanum { spell_level });
            }
        }
        if let Some(subclass) = subclass {
            choices.extend(
                subclass
                    .choices
                    .iter()
                    .filter(|(at, _)| *at == level)
                    .map(|(_, choice)| *choice),
            );
        }
        choices
    }

    /// Feature names granted on reaching class `level`.
    pub fn features_at(&self, level: u8, subclass: Option<&Subclass>) -> Vec<&'static str> {
        let class_features = self.features.iter().filter(|(at, _)| *at == level);
        let subclass_features = subclass
            .into_iter()
            .flat_map(|s| s.features.iter())
            .filter(|(at, _)| *at == level);
        class_features
            .chain(subclass_features)
            .map(|(_, name)| *name)
            .collect()
    }
}

/// Spell level of the mystic arcanum learned at warlock `level`.
pub fn mystic_arcanum_level(level: u8) -> Option<u8> {
    match level {
        11 => Some(6),
        13 => Some(7),
        15 => Some(8),
        17 => Some(9),
        _ => None,
    }
}

// ============================================================================
// Resource formulas
// ============================================================================

fn rage_uses(level: u8, _: i8) -> u32 {
    match level {
        0 => 0,
        1..=2 => 2,
        3..=5 => 3,
        6..=11 => 4,
        12..=16 => 5,
        17..=19 => 6,
        _ => UNLIMITED,
    }
}

fn at_least_one_modifier(level: u8, modifier: i8) -> u32 {
    if level == 0 {
        0
    } else {
        modifier.max(1) as u32
    }
}

fn cleric_channel_divinity(level: u8, _: i8) -> u32 {
    match level {
        0..=1 => 0,
        2..=5 => 1,
        6..=17 => 2,
        _ => 3,
    }
}

fn oath_channel_divinity(level: u8, _: i8) -> u32 {
    u32::from(level >= 3)
}

fn wild_shape_uses(level: u8, _: i8) -> u32 {
    if level >= 2 {
        2
    } else {
        0
    }
}

fn one_use(level: u8, _: i8) -> u32 {
    u32::from(level >= 1)
}

fn action_surge_uses(level: u8, _: i8) -> u32 {
    match level {
        0..=1 => 0,
        2..=16 => 1,
        _ => 2,
    }
}

fn indomitable_uses(level: u8, _: i8) -> u32 {
    match level {
        0..=8 => 0,
        9..=12 => 1,
        13..=16 => 2,
        _ => 3,
    }
}

/// Ki and sorcery points: one per class level from level 2.
fn points_per_level(level: u8, _: i8) -> u32 {
    if level >= 2 {
        u32::from(level)
    } else {
        0
    }
}

fn lay_on_hands_pool(level: u8, _: i8) -> u32 {
    5 * u32::from(level)
}

fn divine_sense_uses(level: u8, modifier: i8) -> u32 {
    if level == 0 {
        0
    } else {
        (1 + modifier).max(1) as u32
    }
}

fn stroke_of_luck_uses(level: u8, _: i8) -> u32 {
    u32::from(level >= 20)
}

// ============================================================================
// Class table
// ============================================================================

const STR_13: &[(Ability, u8)] = &[(Ability::Strength, 13)];
const DEX_13: &[(Ability, u8)] = &[(Ability::Dexterity, 13)];
const WIS_13: &[(Ability, u8)] = &[(Ability::Wisdom, 13)];
const INT_13: &[(Ability, u8)] = &[(Ability::Intelligence, 13)];
const CHA_13: &[(Ability, u8)] = &[(Ability::Charisma, 13)];

const STANDARD_ASI: &[u8] = &[4, 8, 12, 16, 19];

const MARTIAL: &[&str] = &[
    "Light armor",
    "Medium armor",
    "Shields",
    "Simple weapons",
    "Martial weapons",
];

impl CharacterClass {
    /// Get the progression rules for this class.
    pub fn rules(&self) -> ClassRules {
        match self {
            CharacterClass::Barbarian => ClassRules {
                class: *self,
                hit_die: DieType::D12,
                saving_throws: [Ability::Strength, Ability::Constitution],
                spellcasting: SpellcastingType::None,
                caster: CasterProgression::None,
                spellcasting_ability: None,
                subclass_level: 3,
                asi_levels: STANDARD_ASI,
                skill_count: 2,
                skill_options: &[
                    Skill::AnimalHandling,
                    Skill::Athletics,
                    Skill::Intimidation,
                    Skill::Nature,
                    Skill::Perception,
                    Skill::Survival,
                ],
                proficiencies: MARTIAL,
                features: &[
                    (1, "Rage"),
                    (1, "Unarmored Defense"),
                    (2, "Reckless Attack"),
                    (2, "Danger Sense"),
                    (3, "Primal Path"),
                    (5, "Extra Attack"),
                    (5, "Fast Movement"),
                    (7, "Feral Instinct"),
                    (9, "Brutal Critical (1 die)"),
                    (11, "Relentless Rage"),
                    (13, "Brutal Critical (2 dice)"),
                    (15, "Persistent Rage"),
                    (17, "Brutal Critical (3 dice)"),
                    (18, "Indomitable Might"),
                    (20, "Primal Champion"),
                ],
                choices: &[],
                resources: &[ResourceSpec {
                    key: "rage",
                    name: "Rage",
                    ability: None,
                    formula: rage_uses,
                    recharge: RechargeType::LongRest,
                    short_rest_from: None,
                }],
                multiclass_requirement: MulticlassRequirement::All(STR_13),
                multiclass_grants: MulticlassGrants {
                    proficiencies: &["Shields", "Simple weapons", "Martial weapons"],
                    skill_picks: 0,
                    any_skill: false,
                },
            },
            CharacterClass::Bard => ClassRules {
                class: *self,
                hit_die: DieType::D8,
                saving_throws: [Ability::Dexterity, Ability::Charisma],
                spellcasting: SpellcastingType::Known,
                caster: CasterProgression::Full,
                spellcasting_ability: Some(Ability::Charisma),
                subclass_level: 3,
                asi_levels: STANDARD_ASI,
                skill_count: 3,
                skill_options: Skill::all(),
                proficiencies: &[
                    "Light armor",
                    "Simple weapons",
                    "Hand crossbows",
                    "Longswords",
                    "Rapiers",
                    "Shortswords",
                    "Three musical instruments",
                ],
                features: &[
                    (1, "Spellcasting"),
                    (1, "Bardic Inspiration (d6)"),
                    (2, "Jack of All Trades"),
                    (2, "Song of Rest (d6)"),
                    (3, "Bard College"),
                    (3, "Expertise"),
                    (5, "Bardic Inspiration (d8)"),
                    (5, "Font of Inspiration"),
                    (6, "Countercharm"),
                    (9, "Song of Rest (d8)"),
                    (10, "Bardic Inspiration (d10)"),
                    (10, "Expertise"),
                    (10, "Magical Secrets"),
                    (13, "Song of Rest (d10)"),
                    (14, "Magical Secrets"),
                    (15, "Bardic Inspiration (d12)"),
                    (17, "Song of Rest (d12)"),
                    (18, "Magical Secrets"),
                    (20, "Superior Inspiration"),
                ],
                choices: &[
                    (3, FeatureChoiceSpec::Expertise { count: 2 }),
                    (10, FeatureChoiceSpec::Expertise { count: 2 }),
                    (10, FeatureChoiceSpec::MagicalSecrets { count: 2 }),
                    (14, FeatureChoiceSpec::MagicalSecrets { count: 2 }),
                    (18, FeatureChoiceSpec::MagicalSecrets { count: 2 }),
                ],
                resources: &[ResourceSpec {
                    key: "bardic_inspiration",
                    name: "Bardic Inspiration",
                    ability: Some(Ability::Charisma),
                    formula: at_least_one_modifier,
                    recharge: RechargeType::LongRest,
                    short_rest_from: Some(5),
                }],
                multiclass_requirement: MulticlassRequirement::All(CHA_13),
                multiclass_grants: MulticlassGrants {
                    proficiencies: &["Light armor", "One musical instrument"],
                    skill_picks: 1,
                    any_skill: true,
                },
            },
            CharacterClass::Cleric => ClassRules {
                class: *self,
                hit_die: DieType::D8,
                saving_throws: [Ability::Wisdom, Ability::Charisma],
                spellcasting: SpellcastingType::Prepared,
                caster: CasterProgression::Full,
                spellcasting_ability: Some(Ability::Wisdom),
                subclass_level: 1,
                asi_levels: STANDARD_ASI,
                skill_count: 2,
                skill_options: &[
                    Skill::History,
                    Skill::Insight,
                    Skill::Medicine,
                    Skill::Persuasion,
                    Skill::Religion,
                ],
                proficiencies: &["Light armor", "Medium armor", "Shields", "Simple weapons"],
                features: &[
                    (1, "Spellcasting"),
                    (1, "Divine Domain"),
                    (2, "Channel Divinity (1/rest)"),
                    (5, "Destroy Undead (CR 1/2)"),
                    (6, "Channel Divinity (2/rest)"),
                    (8, "Destroy Undead (CR 1)"),
                    (10, "Divine Intervention"),
                    (11, "Destroy Undead (CR 2)"),
                    (14, "Destroy Undead (CR 3)"),
                    (17, "Destroy Undead (CR 4)"),
                    (18, "Channel Divinity (3/rest)"),
                    (20, "Divine Intervention Improvement"),
                ],
                choices: &[],
                resources: &[ResourceSpec {
                    key: "channel_divinity",
                    name: "Channel Divinity",
                    ability: None,
                    formula: cleric_channel_divinity,
                    recharge: RechargeType::ShortRest,
                    short_rest_from: None,
                }],
                multiclass_requirement: MulticlassRequirement::All(WIS_13),
                multiclass_grants: MulticlassGrants {
                    proficiencies: &["Light armor", "Medium armor", "Shields"],
                    skill_picks: 0,
                    any_skill: false,
                },
            },
            CharacterClass::Druid => ClassRules {
                class: *self,
                hit_die: DieType::D8,
                saving_throws: [Ability::Intelligence, Ability::Wisdom],
                spellcasting: SpellcastingType::Prepared,
                caster: CasterProgression::Full,
                spellcasting_ability: Some(Ability::Wisdom),
                subclass_level: 2,
                asi_levels: STANDARD_ASI,
                skill_count: 2,
                skill_options: &[
                    Skill::Arcana,
                    Skill::AnimalHandling,
                    Skill::Insight,
                    Skill::Medicine,
                    Skill::Nature,
                    Skill::Perception,
                    Skill::Religion,
                    Skill::Survival,
                ],
                proficiencies: &[
                    "Light armor",
                    "Medium armor",
                    "Shields",
                    "Clubs",
                    "Daggers",
                    "Darts",
                    "Javelins",
                    "Maces",
                    "Quarterstaffs",
                    "Scimitars",
                    "Sickles",
                    "Slings",
                    "Spears",
                    "Herbalism kit",
                ],
                features: &[
                    (1, "Druidic"),
                    (1, "Spellcasting"),
                    (2, "Wild Shape"),
                    (2, "Druid Circle"),
                    (4, "Wild Shape Improvement"),
                    (8, "Wild Shape Improvement"),
                    (18, "Timeless Body"),
                    (18, "Beast Spells"),
                    (20, "Archdruid"),
                ],
                choices: &[],
                resources: &[ResourceSpec {
                    key: "wild_shape",
                    name: "Wild Shape",
                    ability: None,
                    formula: wild_shape_uses,
                    recharge: RechargeType::ShortRest,
                    short_rest_from: None,
                }],
                multiclass_requirement: MulticlassRequirement::All(WIS_13),
                multiclass_grants: MulticlassGrants {
                    proficiencies: &["Light armor", "Medium armor", "Shields"],
                    skill_picks: 0,
                    any_skill: false,
                },
            },
            CharacterClass::Fighter => ClassRules {
                class: *self,
                hit_die: DieType::D10,
                saving_throws: [Ability::Strength, Ability::Constitution],
                spellcasting: SpellcastingType::None,
                caster: CasterProgression::None,
                spellcasting_ability: None,
                subclass_level: 3,
                asi_levels: &[4, 6, 8, 12, 14, 16, 19],
                skill_count: 2,
                skill_options: &[
                    Skill::Acrobatics,
                    Skill::AnimalHandling,
                    Skill::Athletics,
                    Skill::History,
                    Skill::Insight,
                    Skill::Intimidation,
                    Skill::Perception,
                    Skill::Survival,
                ],
                proficiencies: &["All armor", "Shields", "Simple weapons", "Martial weapons"],
                features: &[
                    (1, "Fighting Style"),
                    (1, "Second Wind"),
                    (2, "Action Surge (one use)"),
                    (3, "Martial Archetype"),
                    (5, "Extra Attack"),
                    (9, "Indomitable (one use)"),
                    (11, "Extra Attack (2)"),
                    (13, "Indomitable (two uses)"),
                    (17, "Action Surge (two uses)"),
                    (17, "Indomitable (three uses)"),
                    (20, "Extra Attack (3)"),
                ],
                choices: &[(1, FeatureChoiceSpec::FightingStyle { count: 1 })],
                resources: &[
                    ResourceSpec {
                        key: "second_wind",
                        name: "Second Wind",
                        ability: None,
                        formula: one_use,
                        recharge: RechargeType::ShortRest,
                        short_rest_from: None,
                    },
                    ResourceSpec {
                        key: "action_surge",
                        name: "Action Surge",
                        ability: None,
                        formula: action_surge_uses,
                        recharge: RechargeType::ShortRest,
                        short_rest_from: None,
                    },
                    ResourceSpec {
                        key: "indomitable",
                        name: "Indomitable",
                        ability: None,
                        formula: indomitable_uses,
                        recharge: RechargeType::LongRest,
                        short_rest_from: None,
                    },
                ],
                multiclass_requirement: MulticlassRequirement::Any(&[
                    (Ability::Strength, 13),
                    (Ability::Dexterity, 13),
                ]),
                multiclass_grants: MulticlassGrants {
                    proficiencies: MARTIAL,
                    skill_picks: 0,
                    any_skill: false,
                },
            },
            CharacterClass::Monk => ClassRules {
                class: *self,
                hit_die: DieType::D8,
                saving_throws: [Ability::Strength, Ability::Dexterity],
                spellcasting: SpellcastingType::None,
                caster: CasterProgression::None,
                spellcasting_ability: None,
                subclass_level: 3,
                asi_levels: STANDARD_ASI,
                skill_count: 2,
                skill_options: &[
                    Skill::Acrobatics,
                    Skill::Athletics,
                    Skill::History,
                    Skill::Insight,
                    Skill::Religion,
                    Skill::Stealth,
                ],
                proficiencies: &["Simple weapons", "Shortswords"],
                features: &[
                    (1, "Unarmored Defense"),
                    (1, "Martial Arts"),
                    (2, "Ki"),
                    (2, "Unarmored Movement"),
                    (3, "Monastic Tradition"),
                    (3, "Deflect Missiles"),
                    (4, "Slow Fall"),
                    (5, "Extra Attack"),
                    (5, "Stunning Strike"),
                    (6, "Ki-Empowered Strikes"),
                    (7, "Evasion"),
                    (7, "Stillness of Mind"),
                    (10, "Purity of Body"),
                    (13, "Tongue of the Sun and Moon"),
                    (14, "Diamond Soul"),
                    (15, "Timeless Body"),
                    (18, "Empty Body"),
                    (20, "Perfect Self"),
                ],
                choices: &[],
                resources: &[ResourceSpec {
                    key: "ki",
                    name: "Ki Points",
                    ability: None,
                    formula: points_per_level,
                    recharge: RechargeType::ShortRest,
                    short_rest_from: None,
                }],
                multiclass_requirement: MulticlassRequirement::All(&[
                    (Ability::Dexterity, 13),
                    (Ability::Wisdom, 13),
                ]),
                multiclass_grants: MulticlassGrants {
                    proficiencies: &["Simple weapons", "Shortswords"],
                    skill_picks: 0,
                    any_skill: false,
                },
            },
            CharacterClass::Paladin => ClassRules {
                class: *self,
                hit_die: DieType::D10,
                saving_throws: [Ability::Wisdom, Ability::Charisma],
                spellcasting: SpellcastingType::Prepared,
                caster: CasterProgression::Half,
                spellcasting_ability: Some(Ability::Charisma),
                subclass_level: 3,
                asi_levels: STANDARD_ASI,
                skill_count: 2,
                skill_options: &[
                    Skill::Athletics,
                    Skill::Insight,
                    Skill::Intimidation,
                    Skill::Medicine,
                    Skill::Persuasion,
                    Skill::Religion,
                ],
                proficiencies: &["All armor", "Shields", "Simple weapons", "Martial weapons"],
                features: &[
                    (1, "Divine Sense"),
                    (1, "Lay on Hands"),
                    (2, "Fighting Style"),
                    (2, "Spellcasting"),
                    (2, "Divine Smite"),
                    (3, "Divine Health"),
                    (3, "Sacred Oath"),
                    (5, "Extra Attack"),
                    (6, "Aura of Protection"),
                    (10, "Aura of Courage"),
                    (11, "Improved Divine Smite"),
                    (14, "Cleansing Touch"),
                    (18, "Aura Improvements"),
                ],
                choices: &[(2, FeatureChoiceSpec::FightingStyle { count: 1 })],
                resources: &[
                    ResourceSpec {
                        key: "lay_on_hands",
                        name: "Lay on Hands",
                        ability: None,
                        formula: lay_on_hands_pool,
                        recharge: RechargeType::LongRest,
                        short_rest_from: None,
                    },
                    ResourceSpec {
                        key: "divine_sense",
                        name: "Divine Sense",
                        ability: Some(Ability::Charisma),
                        formula: divine_sense_uses,
                        recharge: RechargeType::LongRest,
                        short_rest_from: None,
                    },
                    ResourceSpec {
                        key: "channel_divinity_oath",
                        name: "Channel Divinity",
                        ability: None,
                        formula: oath_channel_divinity,
                        recharge: RechargeType::ShortRest,
                        short_rest_from: None,
                    },
                ],
                multiclass_requirement: MulticlassRequirement::All(&[
                    (Ability::Strength, 13),
                    (Ability::Charisma, 13),
                ]),
                multiclass_grants: MulticlassGrants {
                    proficiencies: MARTIAL,
                    skill_picks: 0,
                    any_skill: false,
                },
            },
            CharacterClass::Ranger => ClassRules {
                class: *self,
                hit_die: DieType::D10,
                saving_throws: [Ability::Strength, Ability::Dexterity],
                spellcasting: SpellcastingType::Known,
                caster: CasterProgression::Half,
                spellcasting_ability: Some(Ability::Wisdom),
                subclass_level: 3,
                asi_levels: STANDARD_ASI,
                skill_count: 3,
                skill_options: &[
                    Skill::AnimalHandling,
                    Skill::Athletics,
                    Skill::Insight,
                    Skill::Investigation,
                    Skill::Nature,
                    Skill::Perception,
                    Skill::Stealth,
                    Skill::Survival,
                ],
                proficiencies: MARTIAL,
                features: &[
                    (1, "Favored Enemy"),
                    (1, "Natural Explorer"),
                    (2, "Fighting Style"),
                    (2, "Spellcasting"),
                    (3, "Ranger Archetype"),
                    (3, "Primeval Awareness"),
                    (5, "Extra Attack"),
                    (6, "Favored Enemy and Natural Explorer Improvements"),
                    (8, "Land's Stride"),
                    (10, "Natural Explorer Improvement"),
                    (10, "Hide in Plain Sight"),
                    (14, "Favored Enemy Improvement"),
                    (14, "Vanish"),
                    (18, "Feral Senses"),
                    (20, "Foe Slayer"),
                ],
                choices: &[
                    (1, FeatureChoiceSpec::FavoredEnemy { count: 1 }),
                    (1, FeatureChoiceSpec::FavoredTerrain { count: 1 }),
                    (2, FeatureChoiceSpec::FightingStyle { count: 1 }),
                    (6, FeatureChoiceSpec::FavoredEnemy { count: 1 }),
                    (6, FeatureChoiceSpec::FavoredTerrain { count: 1 }),
                    (10, FeatureChoiceSpec::FavoredTerrain { count: 1 }),
                    (14, FeatureChoiceSpec::FavoredEnemy { count: 1 }),
                ],
                resources: &[],
                multiclass_requirement: MulticlassRequirement::All(&[
                    (Ability::Dexterity, 13),
                    (Ability::Wisdom, 13),
                ]),
                multiclass_grants: MulticlassGrants {
                    proficiencies: MARTIAL,
                    skill_picks: 1,
                    any_skill: false,
                },
            },
            CharacterClass::Rogue => ClassRules {
                class: *self,
                hit_die: DieType::D8,
                saving_throws: [Ability::Dexterity, Ability::Intelligence],
                spellcasting: SpellcastingType::None,
                caster: CasterProgression::None,
                spellcasting_ability: None,
                subclass_level: 3,
                asi_levels: &[4, 8, 10, 12, 16, 19],
                skill_count: 4,
                skill_options: &[
                    Skill::Acrobatics,
                    Skill::Athletics,
                    Skill::Deception,
                    Skill::Insight,
                    Skill::Intimidation,
                    Skill::Investigation,
                    Skill::Perception,
                    Skill::Performance,
                    Skill::Persuasion,
                    Skill::SleightOfHand,
                    Skill::Stealth,
                ],
                proficiencies: &[
                    "Light armor",
                    "Simple weapons",
                    "Hand crossbows",
                    "Longswords",
                    "Rapiers",
                    "Shortswords",
                    "Thieves' tools",
                ],
                features: &[
                    (1, "Expertise"),
                    (1, "Sneak Attack"),
                    (1, "Thieves' Cant"),
                    (2, "Cunning Action"),
                    (3, "Roguish Archetype"),
                    (5, "Uncanny Dodge"),
                    (6, "Expertise"),
                    (7, "Evasion"),
                    (11, "Reliable Talent"),
                    (14, "Blindsense"),
                    (15, "Slippery Mind"),
                    (18, "Elusive"),
                    (20, "Stroke of Luck"),
                ],
                choices: &[
                    (1, FeatureChoiceSpec::Expertise { count: 2 }),
                    (6, FeatureChoiceSpec::Expertise { count: 2 }),
                ],
                resources: &[ResourceSpec {
                    key: "stroke_of_luck",
                    name: "Stroke of Luck",
                    ability: None,
                    formula: stroke_of_luck_uses,
                    recharge: RechargeType::ShortRest,
                    short_rest_from: None,
                }],
                multiclass_requirement: MulticlassRequirement::All(DEX_13),
                multiclass_grants: MulticlassGrants {
                    proficiencies: &["Light armor", "Thieves' tools"],
                    skill_picks: 1,
                    any_skill: false,
                },
            },
            CharacterClass::Sorcerer => ClassRules {
                class: *self,
                hit_die: DieType::D6,
                saving_throws: [Ability::Constitution, Ability::Charisma],
                spellcasting: SpellcastingType::Known,
                caster: CasterProgression::Full,
                spellcasting_ability: Some(Ability::Charisma),
                subclass_level: 1,
                asi_levels: STANDARD_ASI,
                skill_count: 2,
                skill_options: &[
                    Skill::Arcana,
                    Skill::Deception,
                    Skill::Insight,
                    Skill::Intimidation,
                    Skill::Persuasion,
                    Skill::Religion,
                ],
                proficiencies: &["Daggers", "Darts", "Slings", "Quarterstaffs", "Light crossbows"],
                features: &[
                    (1, "Spellcasting"),
                    (1, "Sorcerous Origin"),
                    (2, "Font of Magic"),
                    (3, "Metamagic"),
                    (10, "Metamagic"),
                    (17, "Metamagic"),
                    (20, "Sorcerous Restoration"),
                ],
                choices: &[
                    (3, FeatureChoiceSpec::Metamagic { count: 2 }),
                    (10, FeatureChoiceSpec::Metamagic { count: 1 }),
                    (17, FeatureChoiceSpec::Metamagic { count: 1 }),
                ],
                resources: &[ResourceSpec {
                    key: "sorcery_points",
                    name: "Sorcery Points",
                    ability: None,
                    formula: points_per_level,
                    recharge: RechargeType::LongRest,
                    short_rest_from: None,
                }],
                multiclass_requirement: MulticlassRequirement::All(CHA_13),
                multiclass_grants: MulticlassGrants {
                    proficiencies: &[],
                    skill_picks: 0,
                    any_skill: false,
                },
            },
            CharacterClass::Warlock => ClassRules {
                class: *self,
                hit_die: DieType::D8,
                saving_throws: [Ability::Wisdom, Ability::Charisma],
                spellcasting: SpellcastingType::Pact,
                caster: CasterProgression::Pact,
                spellcasting_ability: Some(Ability::Charisma),
                subclass_level: 1,
                asi_levels: STANDARD_ASI,
                skill_count: 2,
                skill_options: &[
                    Skill::Arcana,
                    Skill::Deception,
                    Skill::History,
                    Skill::Intimidation,
                    Skill::Investigation,
                    Skill::Nature,
                    Skill::Religion,
                ],
                proficiencies: &["Light armor", "Simple weapons"],
                features: &[
                    (1, "Otherworldly Patron"),
                    (1, "Pact Magic"),
                    (2, "Eldritch Invocations"),
                    (3, "Pact Boon"),
                    (11, "Mystic Arcanum (6th level)"),
                    (13, "Mystic Arcanum (7th level)"),
                    (15, "Mystic Arcanum (8th level)"),
                    (17, "Mystic Arcanum (9th level)"),
                    (20, "Eldritch Master"),
                ],
                choices: &[(3, FeatureChoiceSpec::PactBoon)],
                resources: &[],
                multiclass_requirement: MulticlassRequirement::All(CHA_13),
                multiclass_grants: MulticlassGrants {
                    proficiencies: &["Light armor", "Simple weapons"],
                    skill_picks: 0,
                    any_skill: false,
                },
            },
            CharacterClass::Wizard => ClassRules {
                class: *self,
                hit_die: DieType::D6,
                saving_throws: [Ability::Intelligence, Ability::Wisdom],
                spellcasting: SpellcastingType::Prepared,
                caster: CasterProgression::Full,
                spellcasting_ability: Some(Ability::Intelligence),
                subclass_level: 2,
                asi_levels: STANDARD_ASI,
                skill_count: 2,
                skill_options: &[
                    Skill::Arcana,
                    Skill::History,
                    Skill::Insight,
                    Skill::Investigation,
                    Skill::Medicine,
                    Skill::Religion,
                ],
                proficiencies: &["Daggers", "Darts", "Slings", "Quarterstaffs", "Light crossbows"],
                features: &[
                    (1, "Spellcasting"),
                    (1, "Arcane Recovery"),
                    (2, "Arcane Tradition"),
                    (18, "Spell Mastery"),
                    (20, "Signature Spells"),
                ],
                choices: &[],
                resources: &[ResourceSpec {
                    key: "arcane_recovery",
                    name: "Arcane Recovery",
                    ability: None,
                    formula: one_use,
                    recharge: RechargeType::LongRest,
                    short_rest_from: None,
                }],
                multiclass_requirement: MulticlassRequirement::All(INT_13),
                multiclass_grants: MulticlassGrants {
                    proficiencies: &[],
                    skill_picks: 0,
                    any_skill: false,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::find_subclass;

    #[test]
    fn test_all_classes_have_rules() {
        for class in CharacterClass::all() {
            let rules = class.rules();
            assert_eq!(rules.class, *class);
            assert!(rules.skill_count > 0);
            assert!(!rules.skill_options.is_empty());
            assert!((1..=3).contains(&rules.subclass_level));
            assert!(rules.asi_levels.contains(&19));
            assert!(!rules.features_at(1, None).is_empty(), "{class} has no level 1 features");
        }
    }

    #[test]
    fn test_hit_dice() {
        assert_eq!(CharacterClass::Barbarian.rules().hit_die, DieType::D12);
        assert_eq!(CharacterClass::Fighter.rules().hit_die, DieType::D10);
        assert_eq!(CharacterClass::Rogue.rules().hit_die, DieType::D8);
        assert_eq!(CharacterClass::Wizard.rules().hit_die, DieType::D6);
    }

    #[test]
    fn test_extra_asi_levels() {
        let fighter = CharacterClass::Fighter.rules();
        assert!(fighter.is_asi_level(6));
        assert!(fighter.is_asi_level(14));
        let rogue = CharacterClass::Rogue.rules();
        assert!(rogue.is_asi_level(10));
        assert!(!rogue.is_asi_level(6));
        assert!(!CharacterClass::Wizard.rules().is_asi_level(6));
    }

    #[test]
    fn test_fighter_requirement_is_disjunctive() {
        let req = CharacterClass::Fighter.rules().multiclass_requirement;
        assert_eq!(req.describe(), "STR 13 or DEX 13");
        assert!(req.is_met(&AbilityScores::new(10, 14, 10, 10, 10, 10)));
        assert!(!req.is_met(&AbilityScores::new(10, 10, 10, 10, 10, 10)));
    }

    #[test]
    fn test_monk_requirement_is_conjunctive() {
        let req = CharacterClass::Monk.rules().multiclass_requirement;
        assert_eq!(req.describe(), "DEX 13 and WIS 13");
        assert!(!req.is_met(&AbilityScores::new(10, 14, 10, 10, 12, 10)));
    }

    #[test]
    fn test_warlock_choices() {
        let rules = CharacterClass::Warlock.rules();
        assert!(rules.feature_choices_at(1, None).contains(&FeatureChoiceSpec::Subclass));
        assert!(rules
            .feature_choices_at(2, None)
            .contains(&FeatureChoiceSpec::Invocation { count: 2, replace_count: 0 }));
        let level_3 = rules.feature_choices_at(3, None);
        assert!(level_3.contains(&FeatureChoiceSpec::PactBoon));
        assert!(level_3.contains(&FeatureChoiceSpec::Invocation { count: 0, replace_count: 1 }));
        for level in [5, 7, 9, 12, 15, 18] {
            let gain = crate::eligibility::invocations_to_gain(level - 1, level);
            assert_eq!(gain, 1);
            assert!(rules
                .feature_choices_at(level, None)
                .contains(&FeatureChoiceSpec::Invocation { count: gain, replace_count: 1 }));
        }
        assert!(rules
            .feature_choices_at(11, None)
            .contains(&FeatureChoiceSpec::MysticArcanum { spell_level: 6 }));
        assert!(!rules
            .feature_choices_at(12, None)
            .iter()
            .any(|c| matches!(c, FeatureChoiceSpec::MysticArcanum { .. })));
    }

    #[test]
    fn test_subclass_choices_are_included() {
        let champion = find_subclass(CharacterClass::Fighter, "Champion");
        let choices = CharacterClass::Fighter.rules().feature_choices_at(10, champion);
        assert_eq!(choices, vec![FeatureChoiceSpec::FightingStyle { count: 1 }]);

        let lore = find_subclass(CharacterClass::Bard, "College of Lore");
        let choices = CharacterClass::Bard.rules().feature_choices_at(6, lore);
        assert_eq!(choices, vec![FeatureChoiceSpec::MagicalSecrets { count: 2 }]);
    }

    #[test]
    fn test_resource_formulas() {
        let rage = CharacterClass::Barbarian.rules().resources[0];
        assert_eq!(rage.maximum(1, 0), 2);
        assert_eq!(rage.maximum(6, 0), 4);
        assert_eq!(rage.maximum(20, 0), UNLIMITED);

        let inspiration = CharacterClass::Bard.rules().resources[0];
        assert_eq!(inspiration.maximum(1, -1), 1);
        assert_eq!(inspiration.maximum(1, 3), 3);
        assert_eq!(inspiration.recharge_at(4), RechargeType::LongRest);
        assert_eq!(inspiration.recharge_at(5), RechargeType::ShortRest);

        let ki = CharacterClass::Monk.rules().resources[0];
        assert_eq!(ki.maximum(1, 0), 0);
        assert_eq!(ki.maximum(7, 0), 7);

        let paladin = CharacterClass::Paladin.rules();
        assert_eq!(paladin.resources[0].maximum(4, 0), 20);
        assert_eq!(paladin.resources[1].maximum(1, 2), 3);
    }

    #[test]
    fn test_multiclass_skill_grants() {
        assert_eq!(CharacterClass::Bard.rules().multiclass_grants.skill_picks, 1);
        assert!(CharacterClass::Bard.rules().multiclass_grants.any_skill);
        assert_eq!(CharacterClass::Ranger.rules().multiclass_grants.skill_picks, 1);
        assert_eq!(CharacterClass::Rogue.rules().multiclass_grants.skill_picks, 1);
        assert_eq!(CharacterClass::Wizard.rules().multiclass_grants.skill_picks, 0);
    }
}
