//! Feats offered in place of an Ability Score Improvement.

use crate::character::{Ability, AbilityScores};

/// A requirement a character must meet to take a feat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatPrerequisite {
    /// Minimum ability score.
    MinAbility { ability: Ability, score: u8 },
    /// Any one of the listed minimum scores.
    AnyAbility(&'static [(Ability, u8)]),
    /// The ability to cast at least one spell.
    Spellcaster,
    /// An armor proficiency such as "Medium armor".
    ArmorProficiency(&'static str),
}

impl FeatPrerequisite {
    pub fn describe(&self) -> String {
        match self {
            FeatPrerequisite::MinAbility { ability, score } => {
                format!("{} {}", ability.abbreviation(), score)
            }
            FeatPrerequisite::AnyAbility(options) => options
                .iter()
                .map(|(ability, score)| format!("{} {}", ability.abbreviation(), score))
                .collect::<Vec<_>>()
                .join(" or "),
            FeatPrerequisite::Spellcaster => "the ability to cast at least one spell".to_string(),
            FeatPrerequisite::ArmorProficiency(armor) => {
                format!("proficiency with {}", armor.to_lowercase())
            }
        }
    }

    fn is_met(&self, filter: &FeatFilter) -> bool {
        match self {
            FeatPrerequisite::MinAbility { ability, score } => {
                filter.ability_scores.get(*ability) >= *score
            }
            FeatPrerequisite::AnyAbility(options) => options
                .iter()
                .any(|(ability, score)| filter.ability_scores.get(*ability) >= *score),
            FeatPrerequisite::Spellcaster => filter.spellcaster,
            FeatPrerequisite::ArmorProficiency(armor) => filter
                .proficiencies
                .iter()
                .any(|p| p.eq_ignore_ascii_case(armor) || p.eq_ignore_ascii_case("All armor")),
        }
    }
}

/// A feat and the ability increase it may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatData {
    pub name: &'static str,
    pub prerequisites: &'static [FeatPrerequisite],
    /// Abilities the feat's +1 increase may go to; empty for feats without one.
    pub ability_options: &'static [Ability],
    /// Also grants proficiency in saving throws of the chosen ability.
    pub grants_saving_throw: bool,
}

impl FeatData {
    /// The feat asks the player to pick the ability it raises.
    pub fn requires_ability_choice(&self) -> bool {
        self.ability_options.len() > 1
    }

    /// Prerequisites the character described by `filter` does not meet.
    pub fn unmet_prerequisites(&self, filter: &FeatFilter) -> Vec<String> {
        self.prerequisites
            .iter()
            .filter(|p| !p.is_met(filter))
            .map(|p| p.describe())
            .collect()
    }
}

/// What the feat list is filtered against.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeatFilter {
    pub ability_scores: AbilityScores,
    pub spellcaster: bool,
    pub proficiencies: Vec<String>,
    /// Feats already taken are not offered again.
    pub held: Vec<String>,
}

impl FeatFilter {
    pub fn allows(&self, feat: &FeatData) -> bool {
        !self.held.iter().any(|h| h.eq_ignore_ascii_case(feat.name))
            && feat.unmet_prerequisites(self).is_empty()
    }
}

const fn feat(name: &'static str) -> FeatData {
    FeatData {
        name,
        prerequisites: &[],
        ability_options: &[],
        grants_saving_throw: false,
    }
}

const fn half_feat(name: &'static str, ability_options: &'static [Ability]) -> FeatData {
    FeatData {
        ability_options,
        ..feat(name)
    }
}

const fn gated(name: &'static str, prerequisites: &'static [FeatPrerequisite]) -> FeatData {
    FeatData {
        prerequisites,
        ..feat(name)
    }
}

use Ability::{Charisma, Constitution, Dexterity, Intelligence, Strength, Wisdom};

static FEATS: &[FeatData] = &[
    half_feat("Actor", &[Charisma]),
    feat("Alert"),
    half_feat("Athlete", &[Strength, Dexterity]),
    feat("Charger"),
    feat("Crossbow Expert"),
    gated(
        "Defensive Duelist",
        &[FeatPrerequisite::MinAbility { ability: Dexterity, score: 13 }],
    ),
    feat("Dual Wielder"),
    feat("Dungeon Delver"),
    half_feat("Durable", &[Constitution]),
    gated("Elemental Adept", &[FeatPrerequisite::Spellcaster]),
    gated(
        "Grappler",
        &[FeatPrerequisite::MinAbility { ability: Strength, score: 13 }],
    ),
    feat("Great Weapon Master"),
    feat("Healer"),
    FeatData {
        prerequisites: &[FeatPrerequisite::ArmorProficiency("Medium armor")],
        ..half_feat("Heavily Armored", &[Strength])
    },
    FeatData {
        prerequisites: &[FeatPrerequisite::ArmorProficiency("Heavy armor")],
        ..half_feat("Heavy Armor Master", &[Strength])
    },
    gated(
        "Inspiring Leader",
        &[FeatPrerequisite::MinAbility { ability: Charisma, score: 13 }],
    ),
    half_feat("Keen Mind", &[Intelligence]),
    half_feat("Lightly Armored", &[Strength, Dexterity]),
    half_feat("Linguist", &[Intelligence]),
    feat("Lucky"),
    feat("Mage Slayer"),
    feat("Magic Initiate"),
    feat("Martial Adept"),
    gated(
        "Medium Armor Master",
        &[FeatPrerequisite::ArmorProficiency("Medium armor")],
    ),
    feat("Mobile"),
    FeatData {
        prerequisites: &[FeatPrerequisite::ArmorProficiency("Light armor")],
        ..half_feat("Moderately Armored", &[Strength, Dexterity])
    },
    feat("Mounted Combatant"),
    half_feat("Observant", &[Intelligence, Wisdom]),
    feat("Polearm Master"),
    FeatData {
        grants_saving_throw: true,
        ..half_feat(
            "Resilient",
            &[Strength, Dexterity, Constitution, Intelligence, Wisdom, Charisma],
        )
    },
    gated(
        "Ritual Caster",
        &[FeatPrerequisite::AnyAbility(&[(Intelligence, 13), (Wisdom, 13)])],
    ),
    feat("Savage Attacker"),
    feat("Sentinel"),
    feat("Sharpshooter"),
    feat("Shield Master"),
    feat("Skilled"),
    gated(
        "Skulker",
        &[FeatPrerequisite::MinAbility { ability: Dexterity, score: 13 }],
    ),
    gated("Spell Sniper", &[FeatPrerequisite::Spellcaster]),
    half_feat("Tavern Brawler", &[Strength, Constitution]),
    feat("Tough"),
    gated("War Caster", &[FeatPrerequisite::Spellcaster]),
    half_feat("Weapon Master", &[Strength, Dexterity]),
];

pub fn all_feats() -> &'static [FeatData] {
    FEATS
}

/// Look up a feat by name (case-insensitive).
pub fn find_feat(name: &str) -> Option<&'static FeatData> {
    FEATS.iter().find(|f| f.name.eq_ignore_ascii_case(name.trim()))
}

/// Feats the character described by `filter` may take, in catalog order.
pub fn eligible_feats(filter: &FeatFilter) -> Vec<FeatData> {
    FEATS.iter().filter(|f| filter.allows(f)).copied().collect()
}
