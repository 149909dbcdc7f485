use crate::doc_context::ScoringContext;
use crate::error::ScoreError;
use crate::rules::{
    ColorHarmonyRule, CssPresenceRule, DivDensityRule, DoctypeRule, FixedUnitsRule,
    FormAccessibilityRule, HeadingHierarchyRule, HeadingPresenceRule, ResponsiveUnitsRule,
    RootLangRule, RubricRule, SemanticCoverageRule, ViewportMetaRule,
};
use crate::types::{RuleId, RuleResult};
use htmlscore_rubric_contract::{
    CURRENT_RUBRIC_ID, LEGACY_RUBRIC_ID, RuleParams, rubric_fingerprint_sha256, rubric_rule_ids,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RubricVersion {
    #[default]
    Current,
    /// First-generation rubric: no color or CSS-presence rules, semantic
    /// coverage by element count.
    Legacy,
}

impl RubricVersion {
    pub fn id(self) -> &'static str {
        match self {
            RubricVersion::Current => CURRENT_RUBRIC_ID,
            RubricVersion::Legacy => LEGACY_RUBRIC_ID,
        }
    }

    pub fn parse(raw: &str) -> Option<RubricVersion> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "current" | "v2" | CURRENT_RUBRIC_ID => Some(RubricVersion::Current),
            "legacy" | "v1" | LEGACY_RUBRIC_ID => Some(RubricVersion::Legacy),
            _ => None,
        }
    }

    fn default_rule(self, id: RuleId) -> Box<dyn RubricRule> {
        match id {
            RuleId::Doctype => Box::new(DoctypeRule::default()),
            RuleId::RootLang => Box::new(RootLangRule::default()),
            RuleId::ViewportMeta => Box::new(ViewportMetaRule::default()),
            RuleId::HeadingPresence => Box::new(HeadingPresenceRule::default()),
            RuleId::HeadingHierarchy => Box::new(HeadingHierarchyRule::default()),
            RuleId::SemanticCoverage => match self {
                RubricVersion::Current => Box::new(SemanticCoverageRule::default()),
                RubricVersion::Legacy => Box::new(SemanticCoverageRule::element_count()),
            },
            RuleId::DivDensity => Box::new(DivDensityRule::default()),
            RuleId::FormAccessibility => Box::new(FormAccessibilityRule::default()),
            RuleId::FixedUnits => Box::new(FixedUnitsRule::default()),
            RuleId::ResponsiveUnits => Box::new(ResponsiveUnitsRule::default()),
            RuleId::ColorHarmony => Box::new(ColorHarmonyRule::default()),
            RuleId::CssPresence => Box::new(CssPresenceRule::default()),
        }
    }
}

/// Ordered set of rules. At most one rule per `RuleId`; iteration is always
/// in canonical evaluation order.
pub struct Rubric {
    id: String,
    rules: Vec<Box<dyn RubricRule>>,
}

impl Rubric {
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rules: Vec::new(),
        }
    }

    pub fn for_version(version: RubricVersion) -> Self {
        let mut rubric = Rubric::empty(version.id());
        let ids = rubric_rule_ids(version.id()).unwrap_or(&[]);
        for id in ids.iter().filter_map(|raw| RuleId::parse(raw)) {
            rubric.insert(version.default_rule(id));
        }
        rubric
    }

    pub fn current() -> Self {
        Rubric::for_version(RubricVersion::Current)
    }

    pub fn legacy() -> Self {
        Rubric::for_version(RubricVersion::Legacy)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Register `rule`, replacing any rule with the same id.
    pub fn insert(&mut self, rule: Box<dyn RubricRule>) {
        let id = rule.id();
        if let Some(slot) = self.rules.iter_mut().find(|r| r.id() == id) {
            *slot = rule;
            return;
        }
        let at = self
            .rules
            .iter()
            .position(|r| r.id().order() > id.order())
            .unwrap_or(self.rules.len());
        self.rules.insert(at, rule);
    }

    pub fn with_rule(mut self, rule: impl RubricRule + 'static) -> Self {
        self.insert(Box::new(rule));
        self
    }

    pub fn remove(&mut self, id: RuleId) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.id() != id);
        self.rules.len() != before
    }

    pub fn without(mut self, id: RuleId) -> Self {
        self.remove(id);
        self
    }

    pub fn rule_ids(&self) -> Vec<RuleId> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn validate(&self) -> Result<(), ScoreError> {
        for rule in &self.rules {
            rule.validate().map_err(ScoreError::InvalidConfiguration)?;
        }
        Ok(())
    }

    pub fn fingerprint(&self) -> String {
        let params: Vec<RuleParams> = self
            .rules
            .iter()
            .map(|rule| {
                rule.params()
                    .into_iter()
                    .fold(RuleParams::new(rule.id().as_str()), |acc, (name, value)| {
                        acc.with(name, value)
                    })
            })
            .collect();
        rubric_fingerprint_sha256(&self.id, &params)
    }

    pub fn evaluate(&self, ctx: &ScoringContext<'_>) -> Vec<RuleResult> {
        self.rules.iter().map(|rule| rule.evaluate(ctx)).collect()
    }
}

impl Default for Rubric {
    fn default() -> Self {
        Rubric::current()
    }
}

impl std::fmt::Debug for Rubric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rubric")
            .field("id", &self.id)
            .field("rules", &self.rule_ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_rubric_registers_all_rules_in_order() {
        assert_eq!(Rubric::current().rule_ids(), RuleId::ALL.to_vec());
    }

    #[test]
    fn legacy_rubric_drops_style_rules() {
        let ids = Rubric::legacy().rule_ids();
        assert_eq!(ids.len(), 10);
        assert!(!ids.contains(&RuleId::ColorHarmony));
        assert!(!ids.contains(&RuleId::CssPresence));
    }

    #[test]
    fn insertion_keeps_canonical_order() {
        let rubric = Rubric::empty("custom")
            .with_rule(CssPresenceRule::default())
            .with_rule(DoctypeRule::default())
            .with_rule(FixedUnitsRule::default())
            .with_rule(ViewportMetaRule::default());
        assert_eq!(
            rubric.rule_ids(),
            vec![
                RuleId::Doctype,
                RuleId::ViewportMeta,
                RuleId::FixedUnits,
                RuleId::CssPresence
            ]
        );
    }

    #[test]
    fn replacing_a_rule_changes_fingerprint_not_order() {
        let base = Rubric::current();
        let tweaked = Rubric::current().with_rule(DoctypeRule { penalty: 15.0 });
        assert_eq!(base.rule_ids(), tweaked.rule_ids());
        assert_ne!(base.fingerprint(), tweaked.fingerprint());
        assert_eq!(base.fingerprint(), Rubric::current().fingerprint());
    }

    #[test]
    fn removal_and_validation() {
        let mut rubric = Rubric::current();
        assert!(rubric.remove(RuleId::ColorHarmony));
        assert!(!rubric.remove(RuleId::ColorHarmony));
        assert_eq!(rubric.len(), 11);
        assert!(rubric.validate().is_ok());

        let broken = rubric.with_rule(ResponsiveUnitsRule {
            per_unit_bonus: 0.5,
            cap: f64::INFINITY,
        });
        assert!(matches!(
            broken.validate(),
            Err(ScoreError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn version_names_parse() {
        assert_eq!(RubricVersion::parse("Legacy"), Some(RubricVersion::Legacy));
        assert_eq!(RubricVersion::parse(" current "), Some(RubricVersion::Current));
        assert_eq!(RubricVersion::parse(CURRENT_RUBRIC_ID), Some(RubricVersion::Current));
        assert_eq!(RubricVersion::parse("v3"), None);
    }
}
