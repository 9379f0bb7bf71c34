//! Step planner.
//!
//! A plan is a pure function of the character snapshot, the level range and
//! the values staged so far. Each level block runs the same declared list of
//! `(StepKind, rule)` pairs in order; after a step is emitted its staged
//! value (if any) is folded into the running [`HeldChoices`] so later rules
//! in the same block see it (a subclass picked at level 3 decides whether
//! that level also learns cantrips).

use crate::character::{Character, CharacterClass, Skill};
use crate::choices::{HeldChoices, StagedValue, StepId, StepKind};
use crate::class_data::{ClassRules, FeatureChoiceSpec};
use crate::dice::DieType;
use crate::eligibility;
use crate::options::{find_subclass, Subclass};
use crate::spells::SpellClass;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlanMode {
    /// Gain levels `from + 1 ..= to`.
    #[default]
    LevelUp,
    /// Finish creating a character built at `from` (normally level 1) up to
    /// `to`. The first block only carries feature choices.
    Creation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanOptions {
    /// Offer class-select even to single-classed characters.
    pub offer_multiclass: bool,
    /// Class advanced when no class-select value is staged. Defaults to the
    /// primary class.
    pub default_class: Option<CharacterClass>,
}

/// What a step asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepRequirement {
    /// `default` is the class advanced when nothing else is chosen.
    ClassSelect { default: CharacterClass },
    MulticlassSkills { count: u8, options: Vec<Skill> },
    HitPoints { die: DieType },
    Subclass,
    PactBoon,
    Invocations { count: u8, replace_count: u8 },
    Cantrips { count: u8, list: SpellClass },
    Spells { count: u8, list: SpellClass, max_spell_level: u8 },
    MysticArcanum { spell_level: u8 },
    MagicalSecrets { count: u8, max_spell_level: u8 },
    Metamagic { count: u8 },
    FightingStyle,
    Expertise { count: u8 },
    FavoredEnemy,
    FavoredTerrain,
    AbilityScoreImprovement,
    Features { names: Vec<String> },
    Review,
}

impl StepRequirement {
    pub fn kind(&self) -> StepKind {
        match self {
            StepRequirement::ClassSelect { .. } => StepKind::ClassSelect,
            StepRequirement::MulticlassSkills { .. } => StepKind::MulticlassSkills,
            StepRequirement::HitPoints { .. } => StepKind::HitPoints,
            StepRequirement::Subclass => StepKind::Subclass,
            StepRequirement::PactBoon => StepKind::PactBoon,
            StepRequirement::Invocations { .. } => StepKind::Invocations,
            StepRequirement::Cantrips { .. } => StepKind::Cantrips,
            StepRequirement::Spells { .. } => StepKind::Spells,
            StepRequirement::MysticArcanum { .. } => StepKind::MysticArcanum,
            StepRequirement::MagicalSecrets { .. } => StepKind::MagicalSecrets,
            StepRequirement::Metamagic { .. } => StepKind::Metamagic,
            StepRequirement::FightingStyle => StepKind::FightingStyle,
            StepRequirement::Expertise { .. } => StepKind::Expertise,
            StepRequirement::FavoredEnemy => StepKind::FavoredEnemy,
            StepRequirement::FavoredTerrain => StepKind::FavoredTerrain,
            StepRequirement::AbilityScoreImprovement => StepKind::AbilityScoreImprovement,
            StepRequirement::Features { .. } => StepKind::Features,
            StepRequirement::Review => StepKind::Review,
        }
    }

    /// Spell level recorded by a mystic arcanum step.
    pub fn arcanum_level(&self) -> Option<u8> {
        match self {
            StepRequirement::MysticArcanum { spell_level } => Some(*spell_level),
            _ => None,
        }
    }
}

/// One step of a plan with everything needed to validate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    /// Character level of the block this step belongs to.
    pub level: u8,
    /// Class advanced in this block.
    pub class: CharacterClass,
    /// Level in `class` reached in this block.
    pub class_level: u8,
    pub requirement: StepRequirement,
    /// Held state before this step's value is applied.
    pub held_before: HeldChoices,
}

impl PlannedStep {
    pub fn id(&self) -> StepId {
        StepId::new(self.level, self.requirement.kind())
    }

    pub fn kind(&self) -> StepKind {
        self.requirement.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub steps: Vec<PlannedStep>,
    /// Held state after every staged value has been applied.
    pub result: HeldChoices,
}

impl Plan {
    pub fn ids(&self) -> Vec<StepId> {
        self.steps.iter().map(PlannedStep::id).collect()
    }

    pub fn position(&self, id: StepId) -> Option<usize> {
        self.steps.iter().position(|s| s.id() == id)
    }

    pub fn step(&self, id: StepId) -> Option<&PlannedStep> {
        self.steps.iter().find(|s| s.id() == id)
    }

    /// Classes advanced, one entry per level block, in order.
    pub fn classes_leveled(&self) -> Vec<(u8, CharacterClass)> {
        let mut blocks: Vec<(u8, CharacterClass)> = Vec::new();
        for step in &self.steps {
            if step.kind() != StepKind::Review && blocks.last().map(|(l, _)| *l) != Some(step.level) {
                blocks.push((step.level, step.class));
            }
        }
        blocks
    }
}

// ============================================================================
// Level rules
// ============================================================================

/// What the rules of one level block see.
struct LevelContext<'a> {
    level: u8,
    class: CharacterClass,
    class_level: u8,
    rules: ClassRules,
    subclass: Option<&'static Subclass>,
    /// The subclass was chosen in this block.
    subclass_is_new: bool,
    is_new_class: bool,
    held: &'a HeldChoices,
}

impl LevelContext<'_> {
    fn choices(&self) -> Vec<FeatureChoiceSpec> {
        self.rules.feature_choices_at(self.class_level, self.subclass)
    }

    fn count_of(&self, matches: fn(&FeatureChoiceSpec) -> bool) -> u8 {
        eligibility::choice_count(self.class, self.subclass, self.class_level, matches)
    }

    fn spell_list(&self) -> Option<SpellClass> {
        SpellClass::for_class(self.class, self.subclass.is_some_and(|s| s.third_caster))
    }

    /// Class level spellcasting tables count from. A third-caster subclass
    /// chosen in this block learns its whole allotment at once.
    fn casting_from(&self) -> u8 {
        if self.subclass_is_new && self.subclass.is_some_and(|s| s.third_caster) {
            0
        } else {
            self.class_level - 1
        }
    }
}

type LevelRule = fn(&LevelContext) -> Option<StepRequirement>;

/// Rules evaluated for every level block, in plan order. Class-select is
/// handled before these because it decides which class the block advances.
const LEVEL_RULES: &[(StepKind, LevelRule)] = &[
    (StepKind::MulticlassSkills, multiclass_skills),
    (StepKind::HitPoints, hit_points),
    (StepKind::Subclass, subclass),
    (StepKind::PactBoon, pact_boon),
    (StepKind::Invocations, invocations),
    (StepKind::Cantrips, cantrips),
    (StepKind::Spells, spells),
    (StepKind::MysticArcanum, mystic_arcanum),
    (StepKind::MagicalSecrets, magical_secrets),
    (StepKind::Metamagic, metamagic),
    (StepKind::FightingStyle, fighting_style),
    (StepKind::Expertise, expertise),
    (StepKind::FavoredEnemy, favored_enemy),
    (StepKind::FavoredTerrain, favored_terrain),
    (StepKind::AbilityScoreImprovement, ability_score_improvement),
    (StepKind::Features, features),
];

fn multiclass_skills(ctx: &LevelContext) -> Option<StepRequirement> {
    let grants = ctx.rules.multiclass_grants;
    if !ctx.is_new_class || grants.skill_picks == 0 {
        return None;
    }
    let options = if grants.any_skill {
        Skill::all().to_vec()
    } else {
        ctx.rules.skill_options.to_vec()
    };
    Some(StepRequirement::MulticlassSkills {
        count: grants.skill_picks,
        options,
    })
}

fn hit_points(ctx: &LevelContext) -> Option<StepRequirement> {
    (ctx.level >= 2).then_some(StepRequirement::HitPoints {
        die: ctx.rules.hit_die,
    })
}

fn subclass(ctx: &LevelContext) -> Option<StepRequirement> {
    let has_subclass = ctx.held.subclass(ctx.class).is_some();
    eligibility::needs_subclass(ctx.class, ctx.class_level, has_subclass)
        .then_some(StepRequirement::Subclass)
}

fn pact_boon(ctx: &LevelContext) -> Option<StepRequirement> {
    eligibility::needs_pact_boon(ctx.class, ctx.class_level, ctx.held.pact_boon.is_some())
        .then_some(StepRequirement::PactBoon)
}

fn invocations(ctx: &LevelContext) -> Option<StepRequirement> {
    ctx.choices().into_iter().find_map(|choice| match choice {
        FeatureChoiceSpec::Invocation {
            count,
            replace_count,
        } => {
            let replace_count = if ctx.held.invocations.is_empty() {
                0
            } else {
                replace_count
            };
            (count > 0 || replace_count > 0).then_some(StepRequirement::Invocations {
                count,
                replace_count,
            })
        }
        _ => None,
    })
}

fn cantrips(ctx: &LevelContext) -> Option<StepRequirement> {
    let list = ctx.spell_list()?;
    let count = eligibility::cantrip_gain(ctx.class, ctx.subclass, ctx.casting_from(), ctx.class_level);
    (count > 0).then_some(StepRequirement::Cantrips { count, list })
}

fn spells(ctx: &LevelContext) -> Option<StepRequirement> {
    let list = ctx.spell_list()?;
    let gain = eligibility::spells_known_gain(ctx.class, ctx.subclass, ctx.casting_from(), ctx.class_level);
    // The class's own Magical Secrets are part of its known-spell total.
    let secrets = eligibility::magical_secrets_count(ctx.class, None, ctx.class_level);
    let count = gain.saturating_sub(secrets);
    (count > 0).then_some(StepRequirement::Spells {
        count,
        list,
        max_spell_level: eligibility::max_spell_level(ctx.class, ctx.subclass, ctx.class_level),
    })
}

fn mystic_arcanum(ctx: &LevelContext) -> Option<StepRequirement> {
    if !eligibility::needs_mystic_arcanum(ctx.class, ctx.class_level) {
        return None;
    }
    let spell_level = eligibility::mystic_arcanum_spell_level(ctx.class_level)?;
    (!ctx.held.mystic_arcanum.contains_key(&spell_level))
        .then_some(StepRequirement::MysticArcanum { spell_level })
}

fn magical_secrets(ctx: &LevelContext) -> Option<StepRequirement> {
    let count = eligibility::magical_secrets_count(ctx.class, ctx.subclass, ctx.class_level);
    (count > 0).then_some(StepRequirement::MagicalSecrets {
        count,
        max_spell_level: eligibility::max_spell_level(ctx.class, ctx.subclass, ctx.class_level),
    })
}

fn metamagic(ctx: &LevelContext) -> Option<StepRequirement> {
    let count = ctx.count_of(|c| matches!(c, FeatureChoiceSpec::Metamagic { .. }));
    (count > 0).then_some(StepRequirement::Metamagic { count })
}

fn fighting_style(ctx: &LevelContext) -> Option<StepRequirement> {
    let count = ctx.count_of(|c| matches!(c, FeatureChoiceSpec::FightingStyle { .. }));
    (count > 0).then_some(StepRequirement::FightingStyle)
}

fn expertise(ctx: &LevelContext) -> Option<StepRequirement> {
    let count = ctx.count_of(|c| matches!(c, FeatureChoiceSpec::Expertise { .. }));
    (count > 0).then_some(StepRequirement::Expertise { count })
}

fn favored_enemy(ctx: &LevelContext) -> Option<StepRequirement> {
    let count = ctx.count_of(|c| matches!(c, FeatureChoiceSpec::FavoredEnemy { .. }));
    (count > 0).then_some(StepRequirement::FavoredEnemy)
}

fn favored_terrain(ctx: &LevelContext) -> Option<StepRequirement> {
    let count = ctx.count_of(|c| matches!(c, FeatureChoiceSpec::FavoredTerrain { .. }));
    (count > 0).then_some(StepRequirement::FavoredTerrain)
}

fn ability_score_improvement(ctx: &LevelContext) -> Option<StepRequirement> {
    eligibility::is_asi_level(ctx.class, ctx.class_level)
        .then_some(StepRequirement::AbilityScoreImprovement)
}

fn features(ctx: &LevelContext) -> Option<StepRequirement> {
    let names: Vec<String> = ctx
        .rules
        .features_at(ctx.class_level, ctx.subclass)
        .into_iter()
        .map(str::to_string)
        .collect();
    (!names.is_empty()).then_some(StepRequirement::Features { names })
}

// ============================================================================
// Planning
// ============================================================================

/// Plan every step from `from` to `to` for `snapshot`.
pub fn plan(
    snapshot: &Character,
    from: u8,
    to: u8,
    mode: PlanMode,
    staged: &BTreeMap<StepId, StagedValue>,
    options: &PlanOptions,
) -> Plan {
    let mut held = HeldChoices::from_character(snapshot);
    let mut steps = Vec::new();
    let default_class = options
        .default_class
        .or_else(|| snapshot.primary_class())
        .unwrap_or(CharacterClass::Fighter);

    let first_block = match mode {
        PlanMode::LevelUp => from.saturating_add(1),
        PlanMode::Creation => from,
    };
    let mut last_class = default_class;
    for level in first_block..=to {
        let creation_base = mode == PlanMode::Creation && level == from;
        last_class = plan_level(
            level,
            mode,
            creation_base,
            default_class,
            &mut held,
            staged,
            options,
            &mut steps,
        );
    }

    let review_level = to.max(from);
    steps.push(PlannedStep {
        level: review_level,
        class: last_class,
        class_level: held.class_level(last_class),
        requirement: StepRequirement::Review,
        held_before: held.clone(),
    });
    Plan {
        steps,
        result: held,
    }
}

/// Step ids only; see [`plan`].
pub fn plan_steps(
    snapshot: &Character,
    from: u8,
    to: u8,
    mode: PlanMode,
    staged: &BTreeMap<StepId, StagedValue>,
    options: &PlanOptions,
) -> Vec<StepId> {
    plan(snapshot, from, to, mode, staged, options).ids()
}

#[allow(clippy::too_many_arguments)]
fn plan_level(
    level: u8,
    mode: PlanMode,
    creation_base: bool,
    default_class: CharacterClass,
    held: &mut HeldChoices,
    staged: &BTreeMap<StepId, StagedValue>,
    options: &PlanOptions,
    steps: &mut Vec<PlannedStep>,
) -> CharacterClass {
    let mut class = default_class;
    if mode == PlanMode::LevelUp && (held.is_multiclassed() || options.offer_multiclass) {
        let id = StepId::new(level, StepKind::ClassSelect);
        steps.push(PlannedStep {
            level,
            class,
            class_level: held.class_level(class) + 1,
            requirement: StepRequirement::ClassSelect { default: class },
            held_before: held.clone(),
        });
        if let Some(StagedValue::Class(chosen)) = staged.get(&id) {
            class = *chosen;
            if let Some(step) = steps.last_mut() {
                step.class = class;
                step.class_level = held.class_level(class) + 1;
            }
        }
    }

    let is_new_class = held.class_level(class) == 0;
    if !creation_base {
        held.advance_class(class);
    }
    let class_level = held.class_level(class);
    let rules = class.rules();
    let subclass_at_open = held.subclass(class).is_some();

    for (kind, rule) in LEVEL_RULES {
        if creation_base && !kind.is_feature_choice() {
            continue;
        }
        let subclass = held.subclass(class).and_then(|name| find_subclass(class, name));
        let ctx = LevelContext {
            level,
            class,
            class_level,
            rules,
            subclass,
            subclass_is_new: !subclass_at_open && subclass.is_some(),
            is_new_class,
            held,
        };
        let Some(requirement) = rule(&ctx) else {
            continue;
        };
        let id = StepId::new(level, *kind);
        let arcanum_level = requirement.arcanum_level();
        steps.push(PlannedStep {
            level,
            class,
            class_level,
            requirement,
            held_before: held.clone(),
        });
        if let Some(value) = staged.get(&id).filter(|v| v.kind() == *kind) {
            held.apply(class, arcanum_level, value);
        }
    }
    class
}
