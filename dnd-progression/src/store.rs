//! Character store.
//!
//! Stores apply a [`TransitionUpdate`] all-or-nothing: the writes are
//! applied to a copy of the stored character, and the copy replaces the
//! stored value only if every write succeeds.

use crate::character::{
    Ability, Character, CharacterId, ClassEntry, HitPoints, MAX_CHARACTER_LEVEL,
};
use crate::commit::{StateWrite, TransitionUpdate};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Errors from character store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Character {0} not found")]
    NotFound(CharacterId),

    #[error("Update for {update} does not match character {stored}")]
    WrongCharacter {
        update: CharacterId,
        stored: CharacterId,
    },

    #[error("Invalid write: {0}")]
    InvalidWrite(String),

    #[error("Character store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Transient failures worth retrying with the same update.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Io(_) | StoreError::Unavailable(_))
    }
}

/// Persistent home of characters.
#[async_trait]
pub trait CharacterStore: Send + Sync {
    async fn load_character(&self, id: CharacterId) -> Result<Character, StoreError>;

    /// Insert or overwrite a character as-is.
    async fn save_character(&self, character: &Character) -> Result<(), StoreError>;

    /// Apply `update` and its history record atomically, returning the
    /// stored result.
    async fn commit_transition(&self, update: &TransitionUpdate) -> Result<Character, StoreError>;
}

// ============================================================================
// Applying writes
// ============================================================================

/// Apply `writes` to a copy of `character`.
pub fn apply_writes(character: &Character, writes: &[StateWrite]) -> Result<Character, StoreError> {
    let mut next = character.clone();
    for write in writes {
        apply_write(&mut next, write)?;
    }
    let class_total = next.total_class_levels();
    if class_total != next.level {
        return Err(StoreError::InvalidWrite(format!(
            "class levels sum to {class_total} but level is {}",
            next.level
        )));
    }
    let con_before = character.ability_scores.modifier(Ability::Constitution);
    let con_after = next.ability_scores.modifier(Ability::Constitution);
    if next.hit_points.maximum < character.hit_points.maximum && con_after >= con_before {
        return Err(StoreError::InvalidWrite(format!(
            "maximum hit points would drop from {} to {}",
            character.hit_points.maximum, next.hit_points.maximum
        )));
    }
    Ok(next)
}

/// Apply a whole transition: writes, history record and revision bump.
pub fn apply_update(character: &Character, update: &TransitionUpdate) -> Result<Character, StoreError> {
    if update.character_id != character.id {
        return Err(StoreError::WrongCharacter {
            update: update.character_id,
            stored: character.id,
        });
    }
    let mut next = apply_writes(character, &update.writes)?;
    next.level_history.push(update.history.clone());
    next.revision += 1;
    Ok(next)
}

fn apply_write(character: &mut Character, write: &StateWrite) -> Result<(), StoreError> {
    match write {
        StateWrite::SetLevel(level) => {
            if *level == 0 || *level > MAX_CHARACTER_LEVEL {
                return Err(StoreError::InvalidWrite(format!("level {level} is out of range")));
            }
            character.level = *level;
        }
        StateWrite::SetClassLevel { class, level } => {
            let entry = character
                .classes
                .iter_mut()
                .find(|e| e.class == *class)
                .ok_or_else(|| StoreError::InvalidWrite(format!("{class} is not held")))?;
            if *level < entry.level {
                return Err(StoreError::InvalidWrite(format!(
                    "{class} would drop from level {} to {level}",
                    entry.level
                )));
            }
            entry.level = *level;
        }
        StateWrite::AddClass {
            class,
            level,
            is_primary,
        } => {
            if character.class_entry(*class).is_some() {
                return Err(StoreError::InvalidWrite(format!("{class} is already held")));
            }
            character.classes.push(ClassEntry::new(*class, *level, *is_primary));
        }
        StateWrite::SetSubclass { class, subclass } => {
            let entry = character
                .classes
                .iter_mut()
                .find(|e| e.class == *class)
                .ok_or_else(|| StoreError::InvalidWrite(format!("{class} is not held")))?;
            entry.subclass = Some(subclass.clone());
        }
        StateWrite::SetAbilityScores(scores) => character.ability_scores = scores.clone(),
        StateWrite::RecordHitDie(roll) => character.hit_die_rolls.push(*roll),
        StateWrite::SetHitPoints { maximum } => {
            if character.hit_points.maximum == 0 {
                character.hit_points = HitPoints::new(*maximum);
            } else {
                character.hit_points.set_maximum(*maximum);
            }
        }
        StateWrite::SetProficiencyBonus(bonus) => character.proficiency_bonus = *bonus,
        StateWrite::SetSkillProficiency { skill, level } => {
            character.skill_proficiencies.insert(*skill, *level);
        }
        StateWrite::AddSavingThrowProficiency(ability) => {
            character.saving_throw_proficiencies.insert(*ability);
        }
        StateWrite::SetSavingThrows(saves) => character.saving_throws = saves.clone(),
        StateWrite::SetPassivePerception(value) => character.passive_perception = *value,
        StateWrite::AddProficiencies(proficiencies) => {
            for proficiency in proficiencies {
                if !character.other_proficiencies.contains(proficiency) {
                    character.other_proficiencies.push(proficiency.clone());
                }
            }
        }
        StateWrite::SetSpellcasting {
            class,
            spellcasting,
        } => {
            character.spellcasting.insert(*class, spellcasting.clone());
        }
        StateWrite::SetSpellSlots(maxima) => {
            character.spell_slots =
                crate::character::SpellSlots::from_maxima(*maxima, &character.spell_slots);
        }
        StateWrite::SetPactSlots(slots) => character.pact_slots = *slots,
        StateWrite::SetMysticArcanum { spell_level, spell } => {
            match character.mystic_arcanum.get(spell_level) {
                Some(existing) if existing != spell => {
                    return Err(StoreError::InvalidWrite(format!(
                        "a level {spell_level} mystic arcanum ({existing}) is already held"
                    )))
                }
                _ => {
                    character.mystic_arcanum.insert(*spell_level, spell.clone());
                }
            }
        }
        StateWrite::SetPactBoon(boon) => character.pact_boon = Some(*boon),
        StateWrite::SetInvocations(invocations) => character.invocations = invocations.clone(),
        StateWrite::SetMetamagic(options) => character.metamagic = options.clone(),
        StateWrite::SetFightingStyles(styles) => character.fighting_styles = styles.clone(),
        StateWrite::SetFavoredEnemies(enemies) => character.favored_enemies = enemies.clone(),
        StateWrite::SetFavoredTerrains(terrains) => character.favored_terrains = terrains.clone(),
        StateWrite::AddFeat(feat) => character.feats.push(feat.clone()),
        StateWrite::GrantFeatures(features) => character.features.extend(features.iter().cloned()),
        StateWrite::SetResources(pools) => character.resources = pools.clone(),
    }
    Ok(())
}

// ============================================================================
// In-memory store
// ============================================================================

/// A store holding characters in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    characters: Mutex<HashMap<CharacterId, Character>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_character(character: Character) -> Self {
        let store = Self::new();
        store.characters.lock().await.insert(character.id, character);
        store
    }
}

#[async_trait]
impl CharacterStore for MemoryStore {
    async fn load_character(&self, id: CharacterId) -> Result<Character, StoreError> {
        self.characters
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn save_character(&self, character: &Character) -> Result<(), StoreError> {
        self.characters
            .lock()
            .await
            .insert(character.id, character.clone());
        Ok(())
    }

    async fn commit_transition(&self, update: &TransitionUpdate) -> Result<Character, StoreError> {
        let mut characters = self.characters.lock().await;
        let current = characters
            .get(&update.character_id)
            .ok_or(StoreError::NotFound(update.character_id))?;
        let next = apply_update(current, update)?;
        characters.insert(next.id, next.clone());
        debug!(
            character_id = %next.id,
            level = next.level,
            revision = next.revision,
            "Committed transition"
        );
        Ok(next)
    }
}

// ============================================================================
// JSON file store
// ============================================================================

/// Current character file version.
pub const SAVE_VERSION: u32 = 1;

/// A saved character file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedCharacter {
    /// Save format version for compatibility checking.
    pub version: u32,

    /// When the file was written.
    pub saved_at: String,

    pub character: Character,
}

impl SavedCharacter {
    pub fn new(character: Character) -> Self {
        Self {
            version: SAVE_VERSION,
            saved_at: chrono::Utc::now().to_rfc3339(),
            character,
        }
    }

    /// Write to `path` through a temporary file so readers never see a
    /// half-written character.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        let temp = path.with_extension("json.tmp");
        fs::write(&temp, content).await?;
        if let Err(err) = fs::rename(&temp, path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(err.into());
        }
        Ok(())
    }

    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path).await?;
        let saved: Self = serde_json::from_str(&content)?;

        if saved.version != SAVE_VERSION {
            return Err(StoreError::VersionMismatch {
                expected: SAVE_VERSION,
                found: saved.version,
            });
        }

        Ok(saved)
    }
}

/// One versioned JSON file per character under a directory.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    /// Serializes read-modify-write commits.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: CharacterId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn write(&self, character: &Character) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(character.id);
        SavedCharacter::new(character.clone()).save_json(&path).await?;
        debug!(character_id = %character.id, path = %path.display(), "Saved character");
        Ok(())
    }

    async fn read(&self, id: CharacterId) -> Result<Character, StoreError> {
        let path = self.path_for(id);
        if !fs::try_exists(&path).await? {
            return Err(StoreError::NotFound(id));
        }
        Ok(SavedCharacter::load_json(&path).await?.character)
    }
}

#[async_trait]
impl CharacterStore for JsonFileStore {
    async fn load_character(&self, id: CharacterId) -> Result<Character, StoreError> {
        self.read(id).await
    }

    async fn save_character(&self, character: &Character) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.write(character).await
    }

    async fn commit_transition(&self, update: &TransitionUpdate) -> Result<Character, StoreError> {
        let _guard = self.write_lock.lock().await;
        let current = self.read(update.character_id).await?;
        let next = apply_update(&current, update)?;
        if let Err(err) = self.write(&next).await {
            warn!(character_id = %update.character_id, error = %err, "Character file write failed");
            return Err(err);
        }
        Ok(next)
    }
}
