//! Catalogs of class-specific option choices.
//!
//! Pact boons, eldritch invocations, metamagic, fighting styles, favored
//! enemies and terrains, and the subclasses each class can pick from.

use crate::character::CharacterClass;
use crate::class_data::FeatureChoiceSpec;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Pact Boons
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PactBoon {
    Chain,
    Blade,
    Tome,
}

impl PactBoon {
    pub fn name(&self) -> &'static str {
        match self {
            PactBoon::Chain => "Pact of the Chain",
            PactBoon::Blade => "Pact of the Blade",
            PactBoon::Tome => "Pact of the Tome",
        }
    }

    pub fn all() -> &'static [PactBoon] {
        &[PactBoon::Chain, PactBoon::Blade, PactBoon::Tome]
    }
}

impl fmt::Display for PactBoon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Eldritch Invocations
// ============================================================================

/// An eldritch invocation and its prerequisites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation {
    pub name: &'static str,
    /// Minimum warlock level.
    pub min_level: u8,
    pub requires_pact: Option<PactBoon>,
    pub requires_eldritch_blast: bool,
}

const fn invocation(name: &'static str, min_level: u8) -> Invocation {
    Invocation {
        name,
        min_level,
        requires_pact: None,
        requires_eldritch_blast: false,
    }
}

const fn pact_invocation(name: &'static str, min_level: u8, pact: PactBoon) -> Invocation {
    Invocation {
        name,
        min_level,
        requires_pact: Some(pact),
        requires_eldritch_blast: false,
    }
}

const fn blast_invocation(name: &'static str) -> Invocation {
    Invocation {
        name,
        min_level: 1,
        requires_pact: None,
        requires_eldritch_blast: true,
    }
}

pub const ELDRITCH_BLAST: &str = "Eldritch Blast";

static INVOCATIONS: &[Invocation] = &[
    blast_invocation("Agonizing Blast"),
    invocation("Armor of Shadows", 1),
    invocation("Beast Speech", 1),
    invocation("Beguiling Influence", 1),
    pact_invocation("Book of Ancient Secrets", 1, PactBoon::Tome),
    invocation("Devil's Sight", 1),
    invocation("Eldritch Sight", 1),
    blast_invocation("Eldritch Spear"),
    invocation("Eyes of the Rune Keeper", 1),
    invocation("Fiendish Vigor", 1),
    invocation("Gaze of Two Minds", 1),
    invocation("Mask of Many Faces", 1),
    invocation("Misty Visions", 1),
    blast_invocation("Repelling Blast"),
    invocation("Thief of Five Fates", 1),
    pact_invocation("Voice of the Chain Master", 1, PactBoon::Chain),
    invocation("Mire the Mind", 5),
    invocation("One with Shadows", 5),
    invocation("Sign of Ill Omen", 5),
    pact_invocation("Thirsting Blade", 5, PactBoon::Blade),
    invocation("Bewitching Whispers", 7),
    invocation("Dreadful Word", 7),
    invocation("Sculptor of Flesh", 7),
    invocation("Ascendant Step", 9),
    invocation("Minions of Chaos", 9),
    invocation("Otherworldly Leap", 9),
    invocation("Whispers of the Grave", 9),
    pact_invocation("Lifedrinker", 12, PactBoon::Blade),
    pact_invocation("Chains of Carceri", 15, PactBoon::Chain),
    invocation("Master of Myriad Forms", 15),
    invocation("Visions of Distant Realms", 15),
    invocation("Witch Sight", 15),
];

pub fn all_invocations() -> &'static [Invocation] {
    INVOCATIONS
}

pub fn find_invocation(name: &str) -> Option<&'static Invocation> {
    INVOCATIONS.iter().find(|i| i.name.eq_ignore_ascii_case(name))
}

// ============================================================================
// Metamagic
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metamagic {
    Careful,
    Distant,
    Empowered,
    Extended,
    Heightened,
    Quickened,
    Subtle,
    Twinned,
}

impl Metamagic {
    pub fn name(&self) -> &'static str {
        match self {
            Metamagic::Careful => "Careful Spell",
            Metamagic::Distant => "Distant Spell",
            Metamagic::Empowered => "Empowered Spell",
            Metamagic::Extended => "Extended Spell",
            Metamagic::Heightened => "Heightened Spell",
            Metamagic::Quickened => "Quickened Spell",
            Metamagic::Subtle => "Subtle Spell",
            Metamagic::Twinned => "Twinned Spell",
        }
    }

    pub fn all() -> &'static [Metamagic] {
        &[
            Metamagic::Careful,
            Metamagic::Distant,
            Metamagic::Empowered,
            Metamagic::Extended,
            Metamagic::Heightened,
            Metamagic::Quickened,
            Metamagic::Subtle,
            Metamagic::Twinned,
        ]
    }
}

impl fmt::Display for Metamagic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Fighting Styles
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FightingStyle {
    Archery,
    Defense,
    Dueling,
    GreatWeaponFighting,
    Protection,
    TwoWeaponFighting,
}

impl FightingStyle {
    pub fn name(&self) -> &'static str {
        match self {
            FightingStyle::Archery => "Archery",
            FightingStyle::Defense => "Defense",
            FightingStyle::Dueling => "Dueling",
            FightingStyle::GreatWeaponFighting => "Great Weapon Fighting",
            FightingStyle::Protection => "Protection",
            FightingStyle::TwoWeaponFighting => "Two-Weapon Fighting",
        }
    }

    pub fn all() -> &'static [FightingStyle] {
        &[
            FightingStyle::Archery,
            FightingStyle::Defense,
            FightingStyle::Dueling,
            FightingStyle::GreatWeaponFighting,
            FightingStyle::Protection,
            FightingStyle::TwoWeaponFighting,
        ]
    }

    /// Whether `class` may learn this style.
    pub fn available_to(&self, class: CharacterClass) -> bool {
        match class {
            CharacterClass::Fighter => true,
            CharacterClass::Paladin => !matches!(
                self,
                FightingStyle::Archery | FightingStyle::TwoWeaponFighting
            ),
            CharacterClass::Ranger => !matches!(
                self,
                FightingStyle::GreatWeaponFighting | FightingStyle::Protection
            ),
            _ => false,
        }
    }
}

impl fmt::Display for FightingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Favored Enemies and Terrains
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FavoredEnemy {
    Aberrations,
    Beasts,
    Celestials,
    Constructs,
    Dragons,
    Elementals,
    Fey,
    Fiends,
    Giants,
    Monstrosities,
    Oozes,
    Plants,
    Undead,
    Humanoids,
}

impl FavoredEnemy {
    pub fn name(&self) -> &'static str {
        match self {
            FavoredEnemy::Aberrations => "Aberrations",
            FavoredEnemy::Beasts => "Beasts",
            FavoredEnemy::Celestials => "Celestials",
            FavoredEnemy::Constructs => "Constructs",
            FavoredEnemy::Dragons => "Dragons",
            FavoredEnemy::Elementals => "Elementals",
            FavoredEnemy::Fey => "Fey",
            FavoredEnemy::Fiends => "Fiends",
            FavoredEnemy::Giants => "Giants",
            FavoredEnemy::Monstrosities => "Monstrosities",
            FavoredEnemy::Oozes => "Oozes",
            FavoredEnemy::Plants => "Plants",
            FavoredEnemy::Undead => "Undead",
            FavoredEnemy::Humanoids => "Humanoids (two races)",
        }
    }

    pub fn all() -> &'static [FavoredEnemy] {
        &[
            FavoredEnemy::Aberrations,
            FavoredEnemy::Beasts,
            FavoredEnemy::Celestials,
            FavoredEnemy::Constructs,
            FavoredEnemy::Dragons,
            FavoredEnemy::Elementals,
            FavoredEnemy::Fey,
            FavoredEnemy::Fiends,
            FavoredEnemy::Giants,
            FavoredEnemy::Monstrosities,
            FavoredEnemy::Oozes,
            FavoredEnemy::Plants,
            FavoredEnemy::Undead,
            FavoredEnemy::Humanoids,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FavoredTerrain {
    Arctic,
    Coast,
    Desert,
    Forest,
    Grassland,
    Mountain,
    Swamp,
    Underdark,
}

impl FavoredTerrain {
    pub fn name(&self) -> &'static str {
        match self {
            FavoredTerrain::Arctic => "Arctic",
            FavoredTerrain::Coast => "Coast",
            FavoredTerrain::Desert => "Desert",
            FavoredTerrain::Forest => "Forest",
            FavoredTerrain::Grassland => "Grassland",
            FavoredTerrain::Mountain => "Mountain",
            FavoredTerrain::Swamp => "Swamp",
            FavoredTerrain::Underdark => "Underdark",
        }
    }

    pub fn all() -> &'static [FavoredTerrain] {
        &[
            FavoredTerrain::Arctic,
            FavoredTerrain::Coast,
            FavoredTerrain::Desert,
            FavoredTerrain::Forest,
            FavoredTerrain::Grassland,
            FavoredTerrain::Mountain,
            FavoredTerrain::Swamp,
            FavoredTerrain::Underdark,
        ]
    }
}

// ============================================================================
// Subclasses
// ============================================================================

/// A subclass and what it adds to its class.
#[derive(Debug, Clone, Copy)]
pub struct Subclass {
    pub class: CharacterClass,
    pub name: &'static str,
    /// Grants third-caster spellcasting from the wizard list.
    pub third_caster: bool,
    pub features: &'static [(u8, &'static str)],
    pub choices: &'static [(u8, FeatureChoiceSpec)],
}

const fn subclass(
    class: CharacterClass,
    name: &'static str,
    features: &'static [(u8, &'static str)],
) -> Subclass {
    Subclass {
        class,
        name,
        third_caster: false,
        features,
        choices: &[],
    }
}

static SUBCLASSES: &[Subclass] = &[
    subclass(
        CharacterClass::Barbarian,
        "Path of the Berserker",
        &[(3, "Frenzy"), (6, "Mindless Rage"), (10, "Intimidating Presence"), (14, "Retaliation")],
    ),
    subclass(
        CharacterClass::Barbarian,
        "Path of the Totem Warrior",
        &[(3, "Totem Spirit"), (6, "Aspect of the Beast"), (10, "Spirit Walker"), (14, "Totemic Attunement")],
    ),
    Subclass {
        class: CharacterClass::Bard,
        name: "College of Lore",
        third_caster: false,
        features: &[(3, "Cutting Words"), (6, "Additional Magical Secrets"), (14, "Peerless Skill")],
        choices: &[(6, FeatureChoiceSpec::MagicalSecrets { count: 2 })],
    },
    subclass(
        CharacterClass::Bard,
        "College of Valor",
        &[(3, "Combat Inspiration"), (6, "Extra Attack"), (14, "Battle Magic")],
    ),
    subclass(
        CharacterClass::Cleric,
        "Life Domain",
        &[(1, "Disciple of Life"), (2, "Channel Divinity: Preserve Life"), (6, "Blessed Healer"), (8, "Divine Strike"), (17, "Supreme Healing")],
    ),
    subclass(
        CharacterClass::Cleric,
        "Light Domain",
        &[(1, "Warding Flare"), (2, "Channel Divinity: Radiance of the Dawn"), (6, "Improved Flare"), (8, "Potent Spellcasting"), (17, "Corona of Light")],
    ),
    subclass(
        CharacterClass::Cleric,
        "War Domain",
        &[(1, "War Priest"), (2, "Channel Divinity: Guided Strike"), (6, "War God's Blessing"), (8, "Divine Strike"), (17, "Avatar of Battle")],
    ),
    subclass(
        CharacterClass::Druid,
        "Circle of the Land",
        &[(2, "Natural Recovery"), (6, "Land's Stride"), (10, "Nature's Ward"), (14, "Nature's Sanctuary")],
    ),
    subclass(
        CharacterClass::Druid,
        "Circle of the Moon",
        &[(2, "Combat Wild Shape"), (6, "Primal Strike"), (10, "Elemental Wild Shape"), (14, "Thousand Forms")],
    ),
    Subclass {
        class: CharacterClass::Fighter,
        name: "Champion",
        third_caster: false,
        features: &[(3, "Improved Critical"), (7, "Remarkable Athlete"), (10, "Additional Fighting Style"), (15, "Superior Critical"), (18, "Survivor")],
        choices: &[(10, FeatureChoiceSpec::FightingStyle { count: 1 })],
    },
    subclass(
        CharacterClass::Fighter,
        "Battle Master",
        &[(3, "Combat Superiority"), (7, "Know Your Enemy"), (10, "Improved Combat Superiority"), (15, "Relentless"), (18, "Improved Combat Superiority")],
    ),
    Subclass {
        class: CharacterClass::Fighter,
        name: "Eldritch Knight",
        third_caster: true,
        features: &[(3, "Spellcasting"), (3, "Weapon Bond"), (7, "War Magic"), (10, "Eldritch Strike"), (15, "Arcane Charge"), (18, "Improved War Magic")],
        choices: &[],
    },
    subclass(
        CharacterClass::Monk,
        "Way of the Open Hand",
        &[(3, "Open Hand Technique"), (6, "Wholeness of Body"), (11, "Tranquility"), (17, "Quivering Palm")],
    ),
    subclass(
        CharacterClass::Monk,
        "Way of Shadow",
        &[(3, "Shadow Arts"), (6, "Shadow Step"), (11, "Cloak of Shadows"), (17, "Opportunist")],
    ),
    subclass(
        CharacterClass::Paladin,
        "Oath of Devotion",
        &[(3, "Sacred Weapon"), (7, "Aura of Devotion"), (15, "Purity of Spirit"), (20, "Holy Nimbus")],
    ),
    subclass(
        CharacterClass::Paladin,
        "Oath of Vengeance",
        &[(3, "Vow of Enmity"), (7, "Relentless Avenger"), (15, "Soul of Vengeance"), (20, "Avenging Angel")],
    ),
    subclass(
        CharacterClass::Ranger,
        "Hunter",
        &[(3, "Hunter's Prey"), (7, "Defensive Tactics"), (11, "Multiattack"), (15, "Superior Hunter's Defense")],
    ),
    subclass(
        CharacterClass::Ranger,
        "Beast Master",
        &[(3, "Ranger's Companion"), (7, "Exceptional Training"), (11, "Bestial Fury"), (15, "Share Spells")],
    ),
    subclass(
        CharacterClass::Rogue,
        "Thief",
        &[(3, "Fast Hands"), (3, "Second-Story Work"), (9, "Supreme Sneak"), (13, "Use Magic Device"), (17, "Thief's Reflexes")],
    ),
    subclass(
        CharacterClass::Rogue,
        "Assassin",
        &[(3, "Assassinate"), (9, "Infiltration Expertise"), (13, "Impostor"), (17, "Death Strike")],
    ),
    Subclass {
        class: CharacterClass::Rogue,
        name: "Arcane Trickster",
        third_caster: true,
        features: &[(3, "Spellcasting"), (3, "Mage Hand Legerdemain"), (9, "Magical Ambush"), (13, "Versatile Trickster"), (17, "Spell Thief")],
        choices: &[],
    },
    subclass(
        CharacterClass::Sorcerer,
        "Draconic Bloodline",
        &[(1, "Draconic Resilience"), (6, "Elemental Affinity"), (14, "Dragon Wings"), (18, "Draconic Presence")],
    ),
    subclass(
        CharacterClass::Sorcerer,
        "Wild Magic",
        &[(1, "Wild Magic Surge"), (6, "Bend Luck"), (14, "Controlled Chaos"), (18, "Spell Bombardment")],
    ),
    subclass(
        CharacterClass::Warlock,
        "The Fiend",
        &[(1, "Dark One's Blessing"), (6, "Dark One's Own Luck"), (10, "Fiendish Resilience"), (14, "Hurl Through Hell")],
    ),
    subclass(
        CharacterClass::Warlock,
        "The Archfey",
        &[(1, "Fey Presence"), (6, "Misty Escape"), (10, "Beguiling Defenses"), (14, "Dark Delirium")],
    ),
    subclass(
        CharacterClass::Warlock,
        "The Great Old One",
        &[(1, "Awakened Mind"), (6, "Entropic Ward"), (10, "Thought Shield"), (14, "Create Thrall")],
    ),
    subclass(
        CharacterClass::Wizard,
        "School of Evocation",
        &[(2, "Sculpt Spells"), (6, "Potent Cantrip"), (10, "Empowered Evocation"), (14, "Overchannel")],
    ),
    subclass(
        CharacterClass::Wizard,
        "School of Abjuration",
        &[(2, "Arcane Ward"), (6, "Projected Ward"), (10, "Improved Abjuration"), (14, "Spell Resistance")],
    ),
    subclass(
        CharacterClass::Wizard,
        "School of Divination",
        &[(2, "Portent"), (6, "Expert Divination"), (10, "The Third Eye"), (14, "Greater Portent")],
    ),
];

/// Subclasses available to `class`.
pub fn subclasses_for(class: CharacterClass) -> impl Iterator<Item = &'static Subclass> {
    SUBCLASSES.iter().filter(move |s| s.class == class)
}

/// Look up a subclass of `class` by name (case-insensitive).
pub fn find_subclass(class: CharacterClass, name: &str) -> Option<&'static Subclass> {
    subclasses_for(class).find(|s| s.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_class_has_subclasses() {
        for class in CharacterClass::all() {
            assert!(
                subclasses_for(*class).count() >= 2,
                "{class} needs at least two subclasses"
            );
        }
    }

    #[test]
    fn test_third_casters() {
        let third: Vec<_> = SUBCLASSES.iter().filter(|s| s.third_caster).map(|s| s.name).collect();
        assert_eq!(third, vec!["Eldritch Knight", "Arcane Trickster"]);
    }

    #[test]
    fn test_invocation_names_unique() {
        for (i, a) in INVOCATIONS.iter().enumerate() {
            for b in &INVOCATIONS[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn test_find_invocation() {
        let blade = find_invocation("thirsting blade").expect("known invocation");
        assert_eq!(blade.min_level, 5);
        assert_eq!(blade.requires_pact, Some(PactBoon::Blade));
        assert!(find_invocation("Agonizing Blast").unwrap().requires_eldritch_blast);
        assert!(find_invocation("Unknown Thing").is_none());
    }

    #[test]
    fn test_fighting_style_restrictions() {
        assert!(FightingStyle::Archery.available_to(CharacterClass::Ranger));
        assert!(!FightingStyle::Archery.available_to(CharacterClass::Paladin));
        assert!(!FightingStyle::Protection.available_to(CharacterClass::Ranger));
        assert!(!FightingStyle::Defense.available_to(CharacterClass::Wizard));
    }
}
