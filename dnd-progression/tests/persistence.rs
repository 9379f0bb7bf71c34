//! Persistence tests for the JSON file store.

use dnd_progression::character::CharacterClass;
use dnd_progression::choices::{HitPointChoice, StagedValue, StepId, StepKind};
use dnd_progression::config::EngineConfig;
use dnd_progression::session::LevelUpWizard;
use dnd_progression::store::{CharacterStore, JsonFileStore, SavedCharacter, StoreError, SAVE_VERSION};
use dnd_progression::testing::{assert_derived_consistent, assert_level, sample_character, sample_multiclass};
use tempfile::TempDir;

#[tokio::test]
async fn test_level_up_survives_reload() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config = EngineConfig::default().with_save_dir(temp_dir.path().join("heroes"));

    let fighter = sample_character(CharacterClass::Fighter, 1);
    let id = fighter.id;
    let store = JsonFileStore::new(&config.save_dir);
    store.save_character(&fighter).await.unwrap();
    assert!(store.path_for(id).exists(), "Save file should exist after saving");

    let mut wizard = LevelUpWizard::new(store, config.clone());
    wizard.start_session(id, 2).await.unwrap();
    wizard
        .stage_choice(
            StepId::new(2, StepKind::HitPoints),
            StagedValue::HitPoints(HitPointChoice::Rolled(7)),
        )
        .unwrap();
    let committed = wizard.commit().await.unwrap();

    let reopened = JsonFileStore::new(&config.save_dir);
    let loaded = reopened.load_character(id).await.unwrap();
    assert_eq!(loaded, committed);
    assert_level(&loaded, 2);
    assert_eq!(loaded.hit_die_rolls.last().map(|r| r.value), Some(7));
    assert_eq!(loaded.level_history.len(), 1);
    assert_eq!(loaded.level_history[0].choices_made.hit_die_rolls, vec![7]);
    assert_derived_consistent(&loaded);
}

#[tokio::test]
async fn test_save_file_is_versioned() {
    let temp_dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(temp_dir.path());
    let character = sample_multiclass();
    store.save_character(&character).await.unwrap();

    let content = tokio::fs::read_to_string(store.path_for(character.id)).await.unwrap();
    let json: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(json["version"], SAVE_VERSION);
    assert_eq!(json["character"]["name"], "Sample Spellblade");

    let saved = SavedCharacter::load_json(store.path_for(character.id)).await.unwrap();
    assert_eq!(saved.character, character);
}

#[tokio::test]
async fn test_missing_and_corrupt_files() {
    let temp_dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(temp_dir.path());
    let character = sample_character(CharacterClass::Druid, 2);
    assert!(matches!(
        store.load_character(character.id).await,
        Err(StoreError::NotFound(_))
    ));

    tokio::fs::write(store.path_for(character.id), "{ not json").await.unwrap();
    let err = store.load_character(character.id).await.unwrap_err();
    assert!(matches!(err, StoreError::Json(_)));
    assert!(!err.is_retryable());
}
