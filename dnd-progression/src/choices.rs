//! Step identifiers, staged values and the running "already held" state.
//!
//! A level-up is a sequence of steps. Each step is identified by the
//! character level it belongs to and its [`StepKind`]; the player stages one
//! [`StagedValue`] per step. [`HeldChoices`] is the fold of the character
//! snapshot plus every staged value in plan order, and is what the planner,
//! validator and commit engine consult for "does the character already have
//! this".

use crate::character::{
    Ability, AbilityScores, Character, CharacterClass, ProficiencyLevel, Skill,
};
use crate::feats::{find_feat, FeatData};
use crate::options::{FavoredEnemy, FavoredTerrain, FightingStyle, Metamagic, PactBoon};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

// ============================================================================
// Steps
// ============================================================================

/// Kinds of step, declared in the order they appear within one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StepKind {
    ClassSelect,
    MulticlassSkills,
    HitPoints,
    Subclass,
    PactBoon,
    Invocations,
    Cantrips,
    Spells,
    MysticArcanum,
    MagicalSecrets,
    Metamagic,
    FightingStyle,
    Expertise,
    FavoredEnemy,
    FavoredTerrain,
    AbilityScoreImprovement,
    Features,
    Review,
}

impl StepKind {
    pub fn name(&self) -> &'static str {
        match self {
            StepKind::ClassSelect => "class-select",
            StepKind::MulticlassSkills => "multiclass-skills",
            StepKind::HitPoints => "hp-roll",
            StepKind::Subclass => "subclass",
            StepKind::PactBoon => "pact-boon",
            StepKind::Invocations => "invocations",
            StepKind::Cantrips => "cantrips",
            StepKind::Spells => "spells",
            StepKind::MysticArcanum => "mystic-arcanum",
            StepKind::MagicalSecrets => "magical-secrets",
            StepKind::Metamagic => "metamagic",
            StepKind::FightingStyle => "fighting-style",
            StepKind::Expertise => "expertise",
            StepKind::FavoredEnemy => "favored-enemy",
            StepKind::FavoredTerrain => "favored-terrain",
            StepKind::AbilityScoreImprovement => "asi",
            StepKind::Features => "features",
            StepKind::Review => "review",
        }
    }

    /// Steps that record a class feature choice rather than a core level-up
    /// decision. Only these appear in the level-1 block of a creation plan.
    pub fn is_feature_choice(&self) -> bool {
        matches!(
            self,
            StepKind::PactBoon
                | StepKind::Invocations
                | StepKind::MagicalSecrets
                | StepKind::Metamagic
                | StepKind::FightingStyle
                | StepKind::Expertise
                | StepKind::FavoredEnemy
                | StepKind::FavoredTerrain
        )
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A step in a progression plan: the character level it belongs to and its
/// kind. Ordering matches plan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StepId {
    pub level: u8,
    pub kind: StepKind,
}

impl StepId {
    pub fn new(level: u8, kind: StepKind) -> Self {
        Self { level, kind }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind, self.level)
    }
}

// ============================================================================
// Staged values
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitPointChoice {
    /// A die result, 1..=hit die.
    Rolled(u8),
    /// The fixed value `hit die / 2 + 1`.
    Average,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AsiChoice {
    /// Ability increases, summing to exactly 2.
    Increases(BTreeMap<Ability, u8>),
    /// A feat instead of increases. `ability` picks where a half feat's +1 goes.
    Feat {
        name: String,
        ability: Option<Ability>,
    },
}

impl AsiChoice {
    pub fn plus_two(ability: Ability) -> Self {
        AsiChoice::Increases(BTreeMap::from([(ability, 2)]))
    }

    pub fn plus_one_each(first: Ability, second: Ability) -> Self {
        AsiChoice::Increases(BTreeMap::from([(first, 1), (second, 1)]))
    }

    pub fn feat(name: impl Into<String>) -> Self {
        AsiChoice::Feat {
            name: name.into(),
            ability: None,
        }
    }
}

/// The value staged for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StagedValue {
    Class(CharacterClass),
    MulticlassSkills(Vec<Skill>),
    HitPoints(HitPointChoice),
    Subclass(String),
    PactBoon(PactBoon),
    /// New invocations plus `(old, new)` swaps.
    Invocations {
        learned: Vec<String>,
        replaced: Vec<(String, String)>,
    },
    Cantrips(Vec<String>),
    Spells(Vec<String>),
    MysticArcanum(String),
    MagicalSecrets(Vec<String>),
    Metamagic(Vec<Metamagic>),
    FightingStyle(FightingStyle),
    Expertise(Vec<Skill>),
    FavoredEnemy(FavoredEnemy),
    FavoredTerrain(FavoredTerrain),
    AbilityScoreImprovement(AsiChoice),
}

impl StagedValue {
    pub fn kind(&self) -> StepKind {
        match self {
            StagedValue::Class(_) => StepKind::ClassSelect,
            StagedValue::MulticlassSkills(_) => StepKind::MulticlassSkills,
            StagedValue::HitPoints(_) => StepKind::HitPoints,
            StagedValue::Subclass(_) => StepKind::Subclass,
            StagedValue::PactBoon(_) => StepKind::PactBoon,
            StagedValue::Invocations { .. } => StepKind::Invocations,
            StagedValue::Cantrips(_) => StepKind::Cantrips,
            StagedValue::Spells(_) => StepKind::Spells,
            StagedValue::MysticArcanum(_) => StepKind::MysticArcanum,
            StagedValue::MagicalSecrets(_) => StepKind::MagicalSecrets,
            StagedValue::Metamagic(_) => StepKind::Metamagic,
            StagedValue::FightingStyle(_) => StepKind::FightingStyle,
            StagedValue::Expertise(_) => StepKind::Expertise,
            StagedValue::FavoredEnemy(_) => StepKind::FavoredEnemy,
            StagedValue::FavoredTerrain(_) => StepKind::FavoredTerrain,
            StagedValue::AbilityScoreImprovement(_) => StepKind::AbilityScoreImprovement,
        }
    }
}

/// Options loaded from the rules catalog for a selection step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOptions {
    Spells(Vec<String>),
    Feats(Vec<FeatData>),
    /// The catalog could not supply options; the step cannot be completed.
    Unavailable(String),
}

// ============================================================================
// Held choices
// ============================================================================

/// Everything the character holds at some point in a plan.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeldChoices {
    pub ability_scores: AbilityScores,
    pub class_levels: BTreeMap<CharacterClass, u8>,
    pub subclasses: BTreeMap<CharacterClass, String>,
    pub skills: HashMap<Skill, ProficiencyLevel>,
    pub saving_throws: HashSet<Ability>,
    pub other_proficiencies: Vec<String>,
    pub pact_boon: Option<PactBoon>,
    pub invocations: Vec<String>,
    pub metamagic: Vec<Metamagic>,
    pub fighting_styles: Vec<FightingStyle>,
    pub favored_enemies: Vec<FavoredEnemy>,
    pub favored_terrains: Vec<FavoredTerrain>,
    pub cantrips: BTreeMap<CharacterClass, Vec<String>>,
    pub spells: BTreeMap<CharacterClass, Vec<String>>,
    pub mystic_arcanum: BTreeMap<u8, String>,
    pub feats: Vec<String>,
}

impl HeldChoices {
    pub fn from_character(character: &Character) -> Self {
        Self {
            ability_scores: character.ability_scores.clone(),
            class_levels: character
                .classes
                .iter()
                .map(|c| (c.class, c.level))
                .collect(),
            subclasses: character
                .classes
                .iter()
                .filter_map(|c| c.subclass.clone().map(|s| (c.class, s)))
                .collect(),
            skills: character.skill_proficiencies.clone(),
            saving_throws: character.saving_throw_proficiencies.clone(),
            other_proficiencies: character.other_proficiencies.clone(),
            pact_boon: character.pact_boon,
            invocations: character.invocations.clone(),
            metamagic: character.metamagic.clone(),
            fighting_styles: character.fighting_styles.clone(),
            favored_enemies: character.favored_enemies.clone(),
            favored_terrains: character.favored_terrains.clone(),
            cantrips: character
                .spellcasting
                .iter()
                .map(|(class, sc)| (*class, sc.cantrips_known.clone()))
                .collect(),
            spells: character
                .spellcasting
                .iter()
                .map(|(class, sc)| (*class, sc.spells_known.clone()))
                .collect(),
            mystic_arcanum: character.mystic_arcanum.clone(),
            feats: character.feats.clone(),
        }
    }

    pub fn total_level(&self) -> u8 {
        self.class_levels.values().sum()
    }

    pub fn class_level(&self, class: CharacterClass) -> u8 {
        self.class_levels.get(&class).copied().unwrap_or(0)
    }

    pub fn subclass(&self, class: CharacterClass) -> Option<&str> {
        self.subclasses.get(&class).map(String::as_str)
    }

    pub fn is_multiclassed(&self) -> bool {
        self.class_levels.values().filter(|l| **l > 0).count() > 1
    }

    pub fn skill_level(&self, skill: Skill) -> ProficiencyLevel {
        self.skills.get(&skill).copied().unwrap_or_default()
    }

    pub fn has_invocation(&self, name: &str) -> bool {
        self.invocations.iter().any(|i| i.eq_ignore_ascii_case(name))
    }

    pub fn has_feat(&self, name: &str) -> bool {
        self.feats.iter().any(|f| f.eq_ignore_ascii_case(name))
    }

    /// Whether any class already knows `spell` as a cantrip, known spell or
    /// mystic arcanum.
    pub fn knows_spell(&self, spell: &str) -> bool {
        self.cantrips
            .values()
            .chain(self.spells.values())
            .flatten()
            .chain(self.mystic_arcanum.values())
            .any(|s| s.eq_ignore_ascii_case(spell))
    }

    /// All spell and cantrip names, for excluding from option lists.
    pub fn known_spell_names(&self) -> Vec<String> {
        self.cantrips
            .values()
            .chain(self.spells.values())
            .flatten()
            .chain(self.mystic_arcanum.values())
            .cloned()
            .collect()
    }

    /// Gain one level in `class`.
    pub fn advance_class(&mut self, class: CharacterClass) {
        *self.class_levels.entry(class).or_insert(0) += 1;
    }

    /// Fold one staged value into the held state. `class` is the class
    /// being advanced in the value's level block; `arcanum_level` is the
    /// spell level of a mystic arcanum step.
    pub fn apply(&mut self, class: CharacterClass, arcanum_level: Option<u8>, value: &StagedValue) {
        match value {
            // Class levels are advanced by the planner when a level block opens.
            StagedValue::Class(_) | StagedValue::HitPoints(_) => {}
            StagedValue::MulticlassSkills(skills) => {
                for skill in skills {
                    self.skills.entry(*skill).or_insert(ProficiencyLevel::Proficient);
                }
            }
            StagedValue::Subclass(name) => {
                self.subclasses.insert(class, name.clone());
            }
            StagedValue::PactBoon(boon) => self.pact_boon = Some(*boon),
            StagedValue::Invocations { learned, replaced } => {
                for (old, new) in replaced {
                    self.invocations.retain(|i| !i.eq_ignore_ascii_case(old));
                    self.invocations.push(new.clone());
                }
                self.invocations.extend(learned.iter().cloned());
            }
            StagedValue::Cantrips(names) => {
                self.cantrips.entry(class).or_default().extend(names.iter().cloned());
            }
            StagedValue::Spells(names) | StagedValue::MagicalSecrets(names) => {
                self.spells.entry(class).or_default().extend(names.iter().cloned());
            }
            StagedValue::MysticArcanum(name) => {
                if let Some(level) = arcanum_level {
                    self.mystic_arcanum.insert(level, name.clone());
                }
            }
            StagedValue::Metamagic(options) => self.metamagic.extend(options.iter().copied()),
            StagedValue::FightingStyle(style) => self.fighting_styles.push(*style),
            StagedValue::Expertise(skills) => {
                for skill in skills {
                    self.skills.insert(*skill, ProficiencyLevel::Expertise);
                }
            }
            StagedValue::FavoredEnemy(enemy) => self.favored_enemies.push(*enemy),
            StagedValue::FavoredTerrain(terrain) => self.favored_terrains.push(*terrain),
            StagedValue::AbilityScoreImprovement(AsiChoice::Increases(increases)) => {
                for (ability, amount) in increases {
                    self.ability_scores.increase(*ability, *amount);
                }
            }
            StagedValue::AbilityScoreImprovement(AsiChoice::Feat { name, ability }) => {
                self.feats.push(name.clone());
                if let Some(feat) = find_feat(name) {
                    if let Some(raised) = feat_ability(feat, *ability) {
                        self.ability_scores.increase(raised, 1);
                        if feat.grants_saving_throw {
                            self.saving_throws.insert(raised);
                        }
                    }
                }
            }
        }
    }
}

/// The ability a feat's +1 goes to: the only option, or the player's pick.
pub fn feat_ability(feat: &FeatData, chosen: Option<Ability>) -> Option<Ability> {
    match feat.ability_options {
        [] => None,
        [only] => Some(*only),
        options => chosen.filter(|a| options.contains(a)),
    }
}
