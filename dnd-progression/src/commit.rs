//! Commit engine.
//!
//! A finished session is reduced to one [`TransitionUpdate`]: an ordered
//! batch of [`StateWrite`]s plus the level-history record. The batch is a
//! description only; the character store applies it to a copy of the stored
//! character and swaps the copy in as a whole.

use crate::character::{
    Ability, AbilityScores, Character, CharacterClass, CharacterId, ChoicesMade,
    ClassSpellcasting, Feature, HitDieRoll, LevelHistoryRecord, PactSlots, ProficiencyLevel,
    ResourcePool, Skill,
};
use crate::choices::{feat_ability, AsiChoice, StagedValue, StepId};
use crate::derived::{self, caster_entries, spellcasting_ability};
use crate::feats::find_feat;
use crate::multiclass::multiclass_grants;
use crate::options::{
    find_subclass, FavoredEnemy, FavoredTerrain, FightingStyle, Metamagic, PactBoon,
};
use crate::planner::{Plan, StepRequirement};
use crate::session::LevelUpSession;
use crate::store::StoreError;
use crate::validator::ValidationError;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::warn;

/// One field update on the persisted character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateWrite {
    SetLevel(u8),
    SetClassLevel {
        class: CharacterClass,
        level: u8,
    },
    AddClass {
        class: CharacterClass,
        level: u8,
        is_primary: bool,
    },
    SetSubclass {
        class: CharacterClass,
        subclass: String,
    },
    SetAbilityScores(AbilityScores),
    RecordHitDie(HitDieRoll),
    SetHitPoints {
        maximum: i32,
    },
    SetProficiencyBonus(i8),
    SetSkillProficiency {
        skill: Skill,
        level: ProficiencyLevel,
    },
    AddSavingThrowProficiency(Ability),
    SetSavingThrows(BTreeMap<Ability, i8>),
    SetPassivePerception(i8),
    AddProficiencies(Vec<String>),
    SetSpellcasting {
        class: CharacterClass,
        spellcasting: ClassSpellcasting,
    },
    SetSpellSlots([u8; 9]),
    SetPactSlots(Option<PactSlots>),
    SetMysticArcanum {
        spell_level: u8,
        spell: String,
    },
    SetPactBoon(PactBoon),
    SetInvocations(Vec<String>),
    SetMetamagic(Vec<Metamagic>),
    SetFightingStyles(Vec<FightingStyle>),
    SetFavoredEnemies(Vec<FavoredEnemy>),
    SetFavoredTerrains(Vec<FavoredTerrain>),
    AddFeat(String),
    GrantFeatures(Vec<Feature>),
    SetResources(Vec<ResourcePool>),
}

/// Everything one committed transition changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionUpdate {
    pub character_id: CharacterId,
    pub writes: Vec<StateWrite>,
    pub history: LevelHistoryRecord,
}

impl TransitionUpdate {
    pub fn new_level(&self) -> u8 {
        self.history.new_level
    }
}

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("Step {step} is incomplete: {reason}")]
    Incomplete {
        step: StepId,
        reason: ValidationError,
    },

    #[error("Character store error: {0}")]
    Store(#[from] StoreError),
}

impl CommitError {
    /// Store failures leave the character untouched and may be retried with
    /// the same session.
    pub fn is_retryable(&self) -> bool {
        match self {
            CommitError::Incomplete { .. } => false,
            CommitError::Store(err) => err.is_retryable(),
        }
    }
}

/// Validate every step of `session` and reduce it to a [`TransitionUpdate`].
pub fn prepare(session: &LevelUpSession) -> Result<TransitionUpdate, CommitError> {
    for (index, step) in session.plan().steps.iter().enumerate() {
        session
            .validate_index(index)
            .map_err(|reason| CommitError::Incomplete {
                step: step.id(),
                reason,
            })?;
    }
    Ok(reduce(
        session.snapshot(),
        session.plan(),
        session.staged_values(),
    ))
}

/// Reduce a validated plan and its staged values to writes and history.
pub fn reduce(
    snapshot: &Character,
    plan: &Plan,
    staged: &BTreeMap<StepId, StagedValue>,
) -> TransitionUpdate {
    let held = &plan.result;
    let mut writes = Vec::new();
    let mut choices = ChoicesMade {
        classes_leveled: plan.classes_leveled().into_iter().map(|(_, c)| c).collect(),
        ..Default::default()
    };
    let mut rolls = Vec::new();
    let mut features = Vec::new();

    for step in &plan.steps {
        match (&step.requirement, staged.get(&step.id())) {
            (StepRequirement::HitPoints { die }, Some(StagedValue::HitPoints(choice))) => {
                let value = derived::hit_die_value(*choice, *die);
                rolls.push(HitDieRoll {
                    class: step.class,
                    die: *die,
                    value,
                });
                choices.hit_die_rolls.push(value);
            }
            (StepRequirement::Features { names }, _) => {
                features.extend(names.iter().map(|name| Feature {
                    name: name.clone(),
                    source: step.class.name().to_string(),
                    level: step.class_level,
                }));
            }
            (_, Some(value)) => record_choice(&mut choices, value),
            _ => {}
        }
    }

    // Classes and levels
    let new_level = held.total_level();
    writes.push(StateWrite::SetLevel(new_level));
    let mut new_classes = Vec::new();
    for (class, level) in &held.class_levels {
        match snapshot.class_level(*class) {
            0 => {
                new_classes.push(*class);
                writes.push(StateWrite::AddClass {
                    class: *class,
                    level: *level,
                    is_primary: snapshot.classes.is_empty(),
                });
            }
            old if old != *level => writes.push(StateWrite::SetClassLevel {
                class: *class,
                level: *level,
            }),
            _ => {}
        }
    }
    for (class, subclass) in &held.subclasses {
        let current = snapshot.class_entry(*class).and_then(|e| e.subclass.as_deref());
        if current != Some(subclass.as_str()) {
            writes.push(StateWrite::SetSubclass {
                class: *class,
                subclass: subclass.clone(),
            });
        }
    }

    // Ability scores and hit points
    let scores = &held.ability_scores;
    if *scores != snapshot.ability_scores {
        writes.push(StateWrite::SetAbilityScores(scores.clone()));
    }
    let con_modifier = scores.modifier(Ability::Constitution);
    let maximum = if snapshot.hit_die_rolls.len() == snapshot.level as usize {
        let all_rolls: Vec<HitDieRoll> =
            snapshot.hit_die_rolls.iter().chain(&rolls).copied().collect();
        derived::max_hit_points(&all_rolls, con_modifier)
    } else {
        warn!(
            character_id = %snapshot.id,
            recorded = snapshot.hit_die_rolls.len(),
            level = snapshot.level,
            "Hit-die history incomplete, carrying stored maximum forward"
        );
        derived::carried_max_hit_points(
            snapshot.hit_points.maximum,
            snapshot.level,
            snapshot.ability_scores.modifier(Ability::Constitution),
            con_modifier,
            &rolls,
        )
    };
    writes.extend(rolls.into_iter().map(StateWrite::RecordHitDie));
    writes.push(StateWrite::SetHitPoints { maximum });

    // Proficiencies and derived numbers
    let stats = derived::derive_stats(scores, new_level, &held.saving_throws, &held.skills, None);
    writes.push(StateWrite::SetProficiencyBonus(stats.proficiency_bonus));
    let skills: BTreeMap<Skill, ProficiencyLevel> =
        held.skills.iter().map(|(s, l)| (*s, *l)).collect();
    for (skill, level) in skills {
        if snapshot.skill_level(skill) != level {
            writes.push(StateWrite::SetSkillProficiency { skill, level });
        }
    }
    for ability in Ability::all() {
        if held.saving_throws.contains(&ability)
            && !snapshot.saving_throw_proficiencies.contains(&ability)
        {
            writes.push(StateWrite::AddSavingThrowProficiency(ability));
        }
    }
    writes.push(StateWrite::SetSavingThrows(stats.saving_throws));
    writes.push(StateWrite::SetPassivePerception(stats.passive_perception));
    if !snapshot.classes.is_empty() {
        let granted: Vec<String> = new_classes
            .iter()
            .flat_map(|class| multiclass_grants(*class).proficiencies.iter())
            .filter(|p| !snapshot.other_proficiencies.iter().any(|h| h.eq_ignore_ascii_case(p)))
            .map(|p| p.to_string())
            .collect();
        if !granted.is_empty() {
            writes.push(StateWrite::AddProficiencies(granted));
        }
    }

    // Spellcasting
    for class in held.class_levels.keys() {
        let subclass = held.subclass(*class).and_then(|name| find_subclass(*class, name));
        let ability = spellcasting_ability(*class, subclass);
        let cantrips = held.cantrips.get(class).cloned().unwrap_or_default();
        let spells = held.spells.get(class).cloned().unwrap_or_default();
        if ability.is_none() && cantrips.is_empty() && spells.is_empty() {
            continue;
        }
        let spellcasting = ClassSpellcasting {
            ability,
            cantrips_known: cantrips,
            spells_known: spells,
            spell_save_dc: ability.map(|a| derived::spell_save_dc(scores, stats.proficiency_bonus, a)),
            spell_attack_bonus: ability
                .map(|a| derived::spell_attack_bonus(scores, stats.proficiency_bonus, a)),
        };
        if snapshot.spellcasting.get(class) != Some(&spellcasting) {
            writes.push(StateWrite::SetSpellcasting {
                class: *class,
                spellcasting,
            });
        }
    }
    writes.push(StateWrite::SetSpellSlots(derived::spell_slot_maxima(&caster_entries(held))));
    writes.push(StateWrite::SetPactSlots(derived::pact_slot_maxima(
        held.class_level(CharacterClass::Warlock),
        snapshot.pact_slots.as_ref(),
    )));
    for (spell_level, spell) in &held.mystic_arcanum {
        if !snapshot.mystic_arcanum.contains_key(spell_level) {
            writes.push(StateWrite::SetMysticArcanum {
                spell_level: *spell_level,
                spell: spell.clone(),
            });
        }
    }

    // Class feature choices
    if let Some(boon) = held.pact_boon.filter(|b| snapshot.pact_boon != Some(*b)) {
        writes.push(StateWrite::SetPactBoon(boon));
    }
    if held.invocations != snapshot.invocations {
        writes.push(StateWrite::SetInvocations(held.invocations.clone()));
    }
    if held.metamagic != snapshot.metamagic {
        writes.push(StateWrite::SetMetamagic(held.metamagic.clone()));
    }
    if held.fighting_styles != snapshot.fighting_styles {
        writes.push(StateWrite::SetFightingStyles(held.fighting_styles.clone()));
    }
    if held.favored_enemies != snapshot.favored_enemies {
        writes.push(StateWrite::SetFavoredEnemies(held.favored_enemies.clone()));
    }
    if held.favored_terrains != snapshot.favored_terrains {
        writes.push(StateWrite::SetFavoredTerrains(held.favored_terrains.clone()));
    }
    let existing: BTreeSet<String> = snapshot.feats.iter().map(|f| f.to_lowercase()).collect();
    for feat in &held.feats {
        if !existing.contains(&feat.to_lowercase()) {
            writes.push(StateWrite::AddFeat(feat.clone()));
        }
    }

    let features_gained = features.iter().map(|f| f.name.clone()).collect();
    if !features.is_empty() {
        writes.push(StateWrite::GrantFeatures(features));
    }
    writes.push(StateWrite::SetResources(derived::resource_maxima(
        &held.class_levels,
        scores,
        &snapshot.resources,
    )));

    TransitionUpdate {
        character_id: snapshot.id,
        writes,
        history: LevelHistoryRecord {
            previous_level: snapshot.level,
            new_level,
            hp_gained: maximum - snapshot.hit_points.maximum,
            choices_made: choices,
            features_gained,
            recorded_at: chrono::Utc::now().to_rfc3339(),
        },
    }
}

fn record_choice(choices: &mut ChoicesMade, value: &StagedValue) {
    match value {
        StagedValue::Class(_) | StagedValue::HitPoints(_) => {}
        StagedValue::MulticlassSkills(skills) => choices.skills.extend(skills.iter().copied()),
        StagedValue::Subclass(name) => choices.subclasses.push(name.clone()),
        StagedValue::PactBoon(boon) => choices.pact_boon = Some(*boon),
        StagedValue::Invocations { learned, replaced } => {
            choices.invocations_gained.extend(learned.iter().cloned());
            for (old, new) in replaced {
                choices.invocations_removed.push(old.clone());
                choices.invocations_gained.push(new.clone());
            }
        }
        StagedValue::Cantrips(names) => choices.cantrips.extend(names.iter().cloned()),
        StagedValue::Spells(names) => choices.spells.extend(names.iter().cloned()),
        StagedValue::MysticArcanum(name) => choices.mystic_arcanum.push(name.clone()),
        StagedValue::MagicalSecrets(names) => choices.magical_secrets.extend(names.iter().cloned()),
        StagedValue::Metamagic(options) => choices.metamagic.extend(options.iter().copied()),
        StagedValue::FightingStyle(style) => choices.fighting_styles.push(*style),
        StagedValue::Expertise(skills) => choices.expertise.extend(skills.iter().copied()),
        StagedValue::FavoredEnemy(enemy) => choices.favored_enemies.push(*enemy),
        StagedValue::FavoredTerrain(terrain) => choices.favored_terrains.push(*terrain),
        StagedValue::AbilityScoreImprovement(AsiChoice::Increases(increases)) => {
            for (ability, amount) in increases {
                *choices.ability_increases.entry(*ability).or_insert(0) += amount;
            }
        }
        StagedValue::AbilityScoreImprovement(AsiChoice::Feat { name, ability }) => {
            choices.feats.push(name.clone());
            if let Some(raised) = find_feat(name).and_then(|feat| feat_ability(feat, *ability)) {
                *choices.ability_increases.entry(raised).or_insert(0) += 1;
            }
        }
    }
}
