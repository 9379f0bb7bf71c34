//! Rules catalog source.
//!
//! The planner and validator read class rules synchronously through
//! [`CharacterClass::rules`]. Option lists that may live in an external
//! database (spells, feats) are fetched through [`RulesSource`] so the
//! session can load them asynchronously and cache them per step.

use crate::character::CharacterClass;
use crate::class_data::{ClassRules, FeatureChoiceSpec};
use crate::feats::{self, FeatData, FeatFilter};
use crate::options::find_subclass;
use crate::spells::{self, SpellClass, SpellData};
use async_trait::async_trait;
use thiserror::Error;

/// Errors from rules catalog lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("No rules available for class {0}")]
    NoRules(String),

    #[error("Unknown subclass {name} for {class}")]
    UnknownSubclass { class: String, name: String },

    #[error("Rules catalog unavailable: {0}")]
    Unavailable(String),
}

/// Which spells a selection step may offer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpellFilter {
    /// Class lists to draw from; empty means every list.
    pub lists: Vec<SpellClass>,
    pub min_level: u8,
    pub max_level: u8,
    /// Spell names already held (case-insensitive).
    pub exclude: Vec<String>,
}

impl SpellFilter {
    pub fn cantrips(list: SpellClass) -> Self {
        Self {
            lists: vec![list],
            min_level: 0,
            max_level: 0,
            exclude: Vec::new(),
        }
    }

    /// Leveled spells from `list` up to `max_level`.
    pub fn leveled(list: SpellClass, max_level: u8) -> Self {
        Self {
            lists: vec![list],
            min_level: 1,
            max_level,
            exclude: Vec::new(),
        }
    }

    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn matches(&self, spell: &SpellData) -> bool {
        (self.min_level..=self.max_level).contains(&spell.level)
            && (self.lists.is_empty() || self.lists.iter().any(|l| spell.on_list(*l)))
            && !self.exclude.iter().any(|e| e.eq_ignore_ascii_case(&spell.name))
    }
}

/// Source of rules content the engine queries.
#[async_trait]
pub trait RulesSource: Send + Sync {
    async fn class_rules(&self, class: CharacterClass) -> Result<ClassRules, CatalogError>;

    async fn feature_choices_at(
        &self,
        class: CharacterClass,
        level: u8,
        subclass: Option<&str>,
    ) -> Result<Vec<FeatureChoiceSpec>, CatalogError>;

    /// Spells matching `filter`, ordered by level then name.
    async fn list_spells(&self, filter: &SpellFilter) -> Result<Vec<SpellData>, CatalogError>;

    async fn list_feats(&self, filter: &FeatFilter) -> Result<Vec<FeatData>, CatalogError>;
}

/// The compiled-in PHB rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticCatalog;

#[async_trait]
impl RulesSource for StaticCatalog {
    async fn class_rules(&self, class: CharacterClass) -> Result<ClassRules, CatalogError> {
        Ok(class.rules())
    }

    async fn feature_choices_at(
        &self,
        class: CharacterClass,
        level: u8,
        subclass: Option<&str>,
    ) -> Result<Vec<FeatureChoiceSpec>, CatalogError> {
        let subclass = match subclass {
            Some(name) => Some(find_subclass(class, name).ok_or_else(|| {
                CatalogError::UnknownSubclass {
                    class: class.name().to_string(),
                    name: name.to_string(),
                }
            })?),
            None => None,
        };
        Ok(class.rules().feature_choices_at(level, subclass))
    }

    async fn list_spells(&self, filter: &SpellFilter) -> Result<Vec<SpellData>, CatalogError> {
        let mut matching: Vec<SpellData> = spells::all_spells()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.name.cmp(&b.name)));
        Ok(matching)
    }

    async fn list_feats(&self, filter: &FeatFilter) -> Result<Vec<FeatData>, CatalogError> {
        Ok(feats::eligible_feats(filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_spells_sorted_and_filtered() {
        let filter = SpellFilter::leveled(SpellClass::Wizard, 2)
            .with_exclude(vec!["magic missile".to_string()]);
        let spells = StaticCatalog.list_spells(&filter).await.expect("static catalog");
        assert!(!spells.is_empty());
        assert!(spells.iter().all(|s| (1..=2).contains(&s.level)));
        assert!(spells.iter().all(|s| s.on_list(SpellClass::Wizard)));
        assert!(!spells.iter().any(|s| s.name == "Magic Missile"));
        assert!(spells.windows(2).all(|w| (w[0].level, &w[0].name) <= (w[1].level, &w[1].name)));
    }

    #[tokio::test]
    async fn test_any_list_filter() {
        let filter = SpellFilter {
            lists: Vec::new(),
            min_level: 5,
            max_level: 5,
            exclude: Vec::new(),
        };
        let spells = StaticCatalog.list_spells(&filter).await.unwrap();
        assert!(spells.iter().any(|s| s.name == "Flame Strike"));
        assert!(spells.iter().any(|s| s.name == "Cone of Cold"));
    }

    #[tokio::test]
    async fn test_unknown_subclass() {
        let result = StaticCatalog
            .feature_choices_at(CharacterClass::Fighter, 10, Some("Rune Knight"))
            .await;
        assert!(matches!(result, Err(CatalogError::UnknownSubclass { .. })));

        let choices = StaticCatalog
            .feature_choices_at(CharacterClass::Fighter, 10, Some("champion"))
            .await
            .unwrap();
        assert_eq!(choices, vec![FeatureChoiceSpec::FightingStyle { count: 1 }]);
    }
}
