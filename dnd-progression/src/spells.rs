//! Spell list used by the cantrip, spell, magical secrets and mystic arcanum
//! selection steps.
//!
//! Only the data those steps filter on is kept: level, school, ritual and
//! concentration tags, and the class lists a spell belongs to.

use crate::character::CharacterClass;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Schools of magic in D&D.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpellSchool {
    Abjuration,
    Conjuration,
    Divination,
    Enchantment,
    Evocation,
    Illusion,
    Necromancy,
    Transmutation,
}

impl SpellSchool {
    pub fn name(&self) -> &'static str {
        match self {
            SpellSchool::Abjuration => "Abjuration",
            SpellSchool::Conjuration => "Conjuration",
            SpellSchool::Divination => "Divination",
            SpellSchool::Enchantment => "Enchantment",
            SpellSchool::Evocation => "Evocation",
            SpellSchool::Illusion => "Illusion",
            SpellSchool::Necromancy => "Necromancy",
            SpellSchool::Transmutation => "Transmutation",
        }
    }
}

/// Class spell lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpellClass {
    Bard,
    Cleric,
    Druid,
    Paladin,
    Ranger,
    Sorcerer,
    Warlock,
    Wizard,
}

impl SpellClass {
    /// The list a class learns from. Third-caster subclasses of martial
    /// classes learn from the wizard list.
    pub fn for_class(class: CharacterClass, third_caster: bool) -> Option<SpellClass> {
        match class {
            CharacterClass::Bard => Some(SpellClass::Bard),
            CharacterClass::Cleric => Some(SpellClass::Cleric),
            CharacterClass::Druid => Some(SpellClass::Druid),
            CharacterClass::Paladin => Some(SpellClass::Paladin),
            CharacterClass::Ranger => Some(SpellClass::Ranger),
            CharacterClass::Sorcerer => Some(SpellClass::Sorcerer),
            CharacterClass::Warlock => Some(SpellClass::Warlock),
            CharacterClass::Wizard => Some(SpellClass::Wizard),
            CharacterClass::Fighter | CharacterClass::Rogue if third_caster => {
                Some(SpellClass::Wizard)
            }
            _ => None,
        }
    }
}

/// Spell definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellData {
    pub name: String,
    /// 0 for cantrips.
    pub level: u8,
    pub school: SpellSchool,
    pub concentration: bool,
    pub ritual: bool,
    pub classes: Vec<SpellClass>,
}

impl SpellData {
    pub fn is_cantrip(&self) -> bool {
        self.level == 0
    }

    pub fn on_list(&self, list: SpellClass) -> bool {
        self.classes.contains(&list)
    }
}

// ============================================================================
// Spell Database
// ============================================================================

/// Global spell database keyed by lowercase name.
static SPELL_DATABASE: LazyLock<HashMap<String, SpellData>> = LazyLock::new(build_spell_database);

/// Look up a spell by name (case-insensitive).
pub fn get_spell(name: &str) -> Option<&'static SpellData> {
    SPELL_DATABASE.get(&name.to_lowercase())
}

pub fn all_spells() -> impl Iterator<Item = &'static SpellData> {
    SPELL_DATABASE.values()
}

pub fn spells_by_level(level: u8) -> impl Iterator<Item = &'static SpellData> {
    SPELL_DATABASE.values().filter(move |s| s.level == level)
}

pub fn spells_for_class(class: SpellClass) -> impl Iterator<Item = &'static SpellData> {
    SPELL_DATABASE.values().filter(move |s| s.on_list(class))
}

struct Entry {
    name: &'static str,
    level: u8,
    school: SpellSchool,
    classes: &'static [SpellClass],
    concentration: bool,
    ritual: bool,
}

const fn entry(
    name: &'static str,
    level: u8,
    school: SpellSchool,
    classes: &'static [SpellClass],
) -> Entry {
    Entry {
        name,
        level,
        school,
        classes,
        concentration: false,
        ritual: false,
    }
}

const fn conc(
    name: &'static str,
    level: u8,
    school: SpellSchool,
    classes: &'static [SpellClass],
) -> Entry {
    Entry {
        concentration: true,
        ..entry(name, level, school, classes)
    }
}

const fn ritual(
    name: &'static str,
    level: u8,
    school: SpellSchool,
    classes: &'static [SpellClass],
) -> Entry {
    Entry {
        ritual: true,
        ..entry(name, level, school, classes)
    }
}

use SpellClass::{
    Bard as B, Cleric as C, Druid as D, Paladin as P, Ranger as R, Sorcerer as S,
    Warlock as K, Wizard as W,
};
use SpellSchool::{
    Abjuration as Abj, Conjuration as Conj, Divination as Div, Enchantment as Ench,
    Evocation as Evoc, Illusion as Illus, Necromancy as Necro, Transmutation as Trans,
};

static SPELL_LIST: &[Entry] = &[
    // Cantrips
    entry("Acid Splash", 0, Conj, &[S, W]),
    entry("Blade Ward", 0, Abj, &[B, S, K, W]),
    entry("Chill Touch", 0, Necro, &[S, K, W]),
    conc("Dancing Lights", 0, Evoc, &[B, S, W]),
    entry("Druidcraft", 0, Trans, &[D]),
    entry("Eldritch Blast", 0, Evoc, &[K]),
    entry("Fire Bolt", 0, Evoc, &[S, W]),
    conc("Friends", 0, Ench, &[B, S, K, W]),
    conc("Guidance", 0, Div, &[C, D]),
    entry("Light", 0, Evoc, &[B, C, S, W]),
    entry("Mage Hand", 0, Conj, &[B, S, K, W]),
    entry("Mending", 0, Trans, &[B, C, D, S, W]),
    entry("Message", 0, Trans, &[B, S, W]),
    entry("Minor Illusion", 0, Illus, &[B, S, K, W]),
    entry("Poison Spray", 0, Conj, &[D, S, K, W]),
    entry("Prestidigitation", 0, Trans, &[B, S, K, W]),
    entry("Produce Flame", 0, Conj, &[D]),
    entry("Ray of Frost", 0, Evoc, &[S, W]),
    conc("Resistance", 0, Abj, &[C, D]),
    entry("Sacred Flame", 0, Evoc, &[C]),
    entry("Shillelagh", 0, Trans, &[D]),
    entry("Shocking Grasp", 0, Evoc, &[S, W]),
    entry("Spare the Dying", 0, Necro, &[C]),
    entry("Thaumaturgy", 0, Trans, &[C]),
    entry("Thorn Whip", 0, Trans, &[D]),
    conc("True Strike", 0, Div, &[B, S, K, W]),
    entry("Vicious Mockery", 0, Ench, &[B]),
    // 1st level
    ritual("Alarm", 1, Abj, &[R, W]),
    entry("Armor of Agathys", 1, Abj, &[K]),
    entry("Arms of Hadar", 1, Conj, &[K]),
    conc("Bane", 1, Ench, &[B, C]),
    conc("Bless", 1, Ench, &[C, P]),
    entry("Burning Hands", 1, Evoc, &[S, W]),
    entry("Charm Person", 1, Ench, &[B, D, S, K, W]),
    entry("Command", 1, Ench, &[C, P]),
    ritual("Comprehend Languages", 1, Div, &[B, S, K, W]),
    entry("Cure Wounds", 1, Evoc, &[B, C, D, P, R]),
    Entry {
        concentration: true,
        ..ritual("Detect Magic", 1, Div, &[B, C, D, P, R, S, W])
    },
    entry("Disguise Self", 1, Illus, &[B, S, W]),
    entry("Dissonant Whispers", 1, Ench, &[B]),
    conc("Divine Favor", 1, Evoc, &[P]),
    conc("Ensnaring Strike", 1, Conj, &[R]),
    conc("Entangle", 1, Conj, &[D]),
    conc("Faerie Fire", 1, Evoc, &[B, D]),
    entry("False Life", 1, Necro, &[S, W]),
    entry("Feather Fall", 1, Trans, &[B, S, W]),
    ritual("Find Familiar", 1, Conj, &[W]),
    conc("Fog Cloud", 1, Conj, &[D, R, S, W]),
    entry("Goodberry", 1, Trans, &[D, R]),
    entry("Guiding Bolt", 1, Evoc, &[C]),
    conc("Hail of Thorns", 1, Conj, &[R]),
    entry("Healing Word", 1, Evoc, &[B, C, D]),
    entry("Hellish Rebuke", 1, Evoc, &[K]),
    conc("Heroism", 1, Ench, &[B, P]),
    conc("Hex", 1, Ench, &[K]),
    conc("Hunter's Mark", 1, Div, &[R]),
    ritual("Identify", 1, Div, &[B, W]),
    entry("Inflict Wounds", 1, Necro, &[C]),
    entry("Longstrider", 1, Trans, &[B, D, R, W]),
    entry("Mage Armor", 1, Abj, &[S, W]),
    entry("Magic Missile", 1, Evoc, &[S, W]),
    conc("Protection from Evil and Good", 1, Abj, &[C, P, K, W]),
    entry("Shield", 1, Abj, &[S, W]),
    conc("Shield of Faith", 1, Abj, &[C, P]),
    conc("Silent Image", 1, Illus, &[B, S, W]),
    entry("Sleep", 1, Ench, &[B, S, W]),
    ritual("Speak with Animals", 1, Div, &[B, D, R]),
    conc("Tasha's Hideous Laughter", 1, Ench, &[B, W]),
    entry("Thunderwave", 1, Evoc, &[B, D, S, W]),
    conc("Witch Bolt", 1, Evoc, &[S, K, W]),
    // 2nd level
    entry("Aid", 2, Abj, &[C, P]),
    entry("Blindness/Deafness", 2, Necro, &[B, C, S, W]),
    conc("Blur", 2, Illus, &[S, W]),
    conc("Branding Smite", 2, Evoc, &[P]),
    entry("Cordon of Arrows", 2, Trans, &[R]),
    conc("Darkness", 2, Evoc, &[S, K, W]),
    entry("Darkvision", 2, Trans, &[D, R, S, W]),
    conc("Enhance Ability", 2, Trans, &[B, C, D, S]),
    entry("Find Steed", 2, Conj, &[P]),
    conc("Flaming Sphere", 2, Conj, &[D, W]),
    conc("Heat Metal", 2, Trans, &[B, D]),
    conc("Hold Person", 2, Ench, &[B, C, D, S, K, W]),
    conc("Invisibility", 2, Illus, &[B, S, K, W]),
    entry("Lesser Restoration", 2, Abj, &[B, C, D, P, R]),
    entry("Misty Step", 2, Conj, &[S, K, W]),
    conc("Moonbeam", 2, Evoc, &[D]),
    conc("Pass without Trace", 2, Abj, &[D, R]),
    entry("Prayer of Healing", 2, Evoc, &[C]),
    entry("Scorching Ray", 2, Evoc, &[S, W]),
    entry("Shatter", 2, Evoc, &[B, S, K, W]),
    Entry {
        concentration: true,
        ..ritual("Silence", 2, Illus, &[B, C, R])
    },
    conc("Spider Climb", 2, Trans, &[S, K, W]),
    conc("Spike Growth", 2, Trans, &[D, R]),
    entry("Spiritual Weapon", 2, Evoc, &[C]),
    conc("Suggestion", 2, Ench, &[B, S, K, W]),
    // 3rd level
    conc("Call Lightning", 3, Conj, &[D]),
    conc("Clairvoyance", 3, Div, &[B, C, S, W]),
    conc("Conjure Animals", 3, Conj, &[D, R]),
    entry("Counterspell", 3, Abj, &[S, K, W]),
    conc("Crusader's Mantle", 3, Evoc, &[P]),
    entry("Dispel Magic", 3, Abj, &[B, C, D, P, S, K, W]),
    conc("Fear", 3, Illus, &[B, S, K, W]),
    entry("Fireball", 3, Evoc, &[S, W]),
    conc("Fly", 3, Trans, &[S, K, W]),
    conc("Haste", 3, Trans, &[S, W]),
    conc("Hunger of Hadar", 3, Conj, &[K]),
    conc("Hypnotic Pattern", 3, Illus, &[B, S, K, W]),
    entry("Lightning Arrow", 3, Trans, &[R]),
    entry("Lightning Bolt", 3, Evoc, &[S, W]),
    entry("Mass Healing Word", 3, Evoc, &[C]),
    entry("Plant Growth", 3, Trans, &[B, D, R]),
    entry("Revivify", 3, Necro, &[C, P]),
    entry("Sending", 3, Evoc, &[B, C, W]),
    conc("Sleet Storm", 3, Conj, &[D, S, W]),
    entry("Speak with Dead", 3, Necro, &[B, C]),
    conc("Spirit Guardians", 3, Conj, &[C]),
    conc("Vampiric Touch", 3, Necro, &[K, W]),
    ritual("Water Walk", 3, Trans, &[C, D, R, S]),
    // 4th level
    conc("Banishment", 4, Abj, &[C, P, S, K, W]),
    entry("Blight", 4, Necro, &[D, S, K, W]),
    conc("Compulsion", 4, Ench, &[B]),
    conc("Conjure Woodland Beings", 4, Conj, &[D, R]),
    entry("Death Ward", 4, Abj, &[C, P]),
    entry("Dimension Door", 4, Conj, &[B, S, K, W]),
    entry("Freedom of Movement", 4, Abj, &[B, C, D, R]),
    conc("Grasping Vine", 4, Conj, &[D, R]),
    conc("Greater Invisibility", 4, Illus, &[B, S, W]),
    entry("Guardian of Faith", 4, Conj, &[C]),
    entry("Ice Storm", 4, Evoc, &[D, S, W]),
    conc("Locate Creature", 4, Div, &[B, C, D, P, R, W]),
    conc("Polymorph", 4, Trans, &[B, D, S, W]),
    conc("Staggering Smite", 4, Ench, &[P]),
    conc("Stoneskin", 4, Abj, &[D, R, S, W]),
    conc("Wall of Fire", 4, Evoc, &[D, S, W]),
    // 5th level
    conc("Animate Objects", 5, Trans, &[B, S, W]),
    conc("Banishing Smite", 5, Abj, &[P]),
    entry("Cone of Cold", 5, Evoc, &[S, W]),
    ritual("Contact Other Plane", 5, Div, &[K, W]),
    entry("Destructive Wave", 5, Evoc, &[P]),
    conc("Dominate Person", 5, Ench, &[B, S, W]),
    entry("Flame Strike", 5, Evoc, &[C]),
    entry("Greater Restoration", 5, Abj, &[B, C, D]),
    conc("Hold Monster", 5, Ench, &[B, S, K, W]),
    conc("Insect Plague", 5, Conj, &[C, D, S]),
    entry("Mass Cure Wounds", 5, Evoc, &[B, C, D]),
    entry("Raise Dead", 5, Necro, &[B, C, P]),
    conc("Scrying", 5, Div, &[B, C, D, K, W]),
    conc("Swift Quiver", 5, Trans, &[R]),
    conc("Telekinesis", 5, Trans, &[S, W]),
    conc("Tree Stride", 5, Conj, &[D, R]),
    conc("Wall of Force", 5, Evoc, &[W]),
    // 6th level
    conc("Arcane Gate", 6, Conj, &[S, K, W]),
    entry("Chain Lightning", 6, Evoc, &[S, W]),
    entry("Circle of Death", 6, Necro, &[S, K, W]),
    entry("Disintegrate", 6, Trans, &[S, W]),
    conc("Eyebite", 6, Necro, &[B, S, K, W]),
    conc("Globe of Invulnerability", 6, Abj, &[S, W]),
    entry("Harm", 6, Necro, &[C]),
    entry("Heal", 6, Evoc, &[C, D]),
    entry("Mass Suggestion", 6, Ench, &[B, S, K, W]),
    conc("Otto's Irresistible Dance", 6, Ench, &[B, W]),
    conc("Sunbeam", 6, Evoc, &[D, S, W]),
    entry("True Seeing", 6, Div, &[B, C, S, K, W]),
    // 7th level
    conc("Delayed Blast Fireball", 7, Evoc, &[S, W]),
    entry("Etherealness", 7, Trans, &[B, C, S, K, W]),
    entry("Finger of Death", 7, Necro, &[S, K, W]),
    entry("Fire Storm", 7, Evoc, &[C, D, S]),
    entry("Forcecage", 7, Evoc, &[B, K, W]),
    entry("Plane Shift", 7, Conj, &[C, D, S, K, W]),
    entry("Regenerate", 7, Trans, &[B, C, D]),
    entry("Resurrection", 7, Necro, &[B, C]),
    entry("Teleport", 7, Conj, &[B, S, W]),
    // 8th level
    conc("Antimagic Field", 8, Abj, &[C, W]),
    entry("Demiplane", 8, Conj, &[K, W]),
    conc("Dominate Monster", 8, Ench, &[B, S, K, W]),
    conc("Earthquake", 8, Evoc, &[C, D, S]),
    entry("Feeblemind", 8, Ench, &[B, D, K, W]),
    entry("Glibness", 8, Trans, &[B, K]),
    conc("Holy Aura", 8, Abj, &[C]),
    entry("Power Word Stun", 8, Ench, &[B, S, K, W]),
    entry("Sunburst", 8, Evoc, &[D, S, W]),
    // 9th level
    entry("Astral Projection", 9, Necro, &[C, K, W]),
    entry("Foresight", 9, Div, &[B, D, K, W]),
    conc("Gate", 9, Conj, &[C, S, W]),
    entry("Mass Heal", 9, Evoc, &[C]),
    entry("Meteor Swarm", 9, Evoc, &[S, W]),
    entry("Power Word Kill", 9, Ench, &[B, S, K, W]),
    conc("Shapechange", 9, Trans, &[D, W]),
    conc("Storm of Vengeance", 9, Conj, &[D]),
    entry("Time Stop", 9, Trans, &[S, W]),
    conc("True Polymorph", 9, Trans, &[B, K, W]),
    entry("True Resurrection", 9, Necro, &[C, D]),
    entry("Wish", 9, Conj, &[S, W]),
];

fn build_spell_database() -> HashMap<String, SpellData> {
    SPELL_LIST
        .iter()
        .map(|e| {
            let spell = SpellData {
                name: e.name.to_string(),
                level: e.level,
                school: e.school,
                concentration: e.concentration,
                ritual: e.ritual,
                classes: e.classes.to_vec(),
            };
            (e.name.to_lowercase(), spell)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression;

    #[test]
    fn test_get_spell() {
        let fireball = get_spell("fireball").expect("Fireball should exist");
        assert_eq!(fireball.name, "Fireball");
        assert_eq!(fireball.level, 3);
        assert_eq!(fireball.school, SpellSchool::Evocation);
    }

    #[test]
    fn test_case_insensitive_lookup() {
        assert!(get_spell("FIREBALL").is_some());
        assert!(get_spell("Fireball").is_some());
        assert!(get_spell("fireball").is_some());
    }

    #[test]
    fn test_names_unique() {
        assert_eq!(SPELL_DATABASE.len(), SPELL_LIST.len());
    }

    #[test]
    fn test_spell_classes() {
        let cure_wounds = get_spell("cure wounds").expect("Cure Wounds should exist");
        assert!(cure_wounds.on_list(SpellClass::Cleric));
        assert!(cure_wounds.on_list(SpellClass::Druid));
        assert!(!cure_wounds.on_list(SpellClass::Wizard));

        let detect = get_spell("detect magic").expect("Detect Magic should exist");
        assert!(detect.ritual && detect.concentration);
    }

    #[test]
    fn test_enough_cantrips_for_every_caster() {
        for class in CharacterClass::all() {
            let Some(list) = SpellClass::for_class(*class, false) else {
                continue;
            };
            let available = spells_for_class(list).filter(|s| s.is_cantrip()).count();
            assert!(
                available >= progression::cantrips_known(*class, 20) as usize,
                "{class} cannot fill its cantrips"
            );
        }
    }

    #[test]
    fn test_warlock_has_arcanum_options() {
        for level in 6..=9 {
            assert!(spells_for_class(SpellClass::Warlock).any(|s| s.level == level));
        }
    }

    #[test]
    fn test_third_casters_use_wizard_list() {
        assert_eq!(
            SpellClass::for_class(CharacterClass::Fighter, true),
            Some(SpellClass::Wizard)
        );
        assert_eq!(SpellClass::for_class(CharacterClass::Fighter, false), None);
        assert_eq!(SpellClass::for_class(CharacterClass::Monk, true), None);
    }
}
