use crate::color::assess_harmony;
use crate::doc_context::ScoringContext;
use crate::patterns::{
    HEADING_TAGS, color_samples, count_fixed_lengths, count_px, form_inputs,
    inline_styles, responsive_units_present, semantic_element_count, semantic_tags_used,
    style_blocks,
};
use crate::types::{RuleId, RuleResult};

/// One named heuristic contributing a signed delta to the base score.
///
/// Rules must not depend on each other's results. Penalties and bonuses are
/// configured as non-negative magnitudes; the rule applies the sign.
pub trait RubricRule: Send + Sync {
    fn id(&self) -> RuleId;

    fn evaluate(&self, ctx: &ScoringContext<'_>) -> RuleResult;

    /// Named numeric parameters, fed into the rubric fingerprint.
    fn params(&self) -> Vec<(&'static str, f64)>;

    fn validate(&self) -> Result<(), String> {
        for (name, value) in self.params() {
            if !value.is_finite() {
                return Err(format!("{}.{} must be finite", self.id(), name));
            }
            if value < 0.0 {
                return Err(format!("{}.{} must be >= 0", self.id(), name));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoctypeRule {
    pub penalty: f64,
}

impl Default for DoctypeRule {
    fn default() -> Self {
        Self { penalty: 20.0 }
    }
}

impl RubricRule for DoctypeRule {
    fn id(&self) -> RuleId {
        RuleId::Doctype
    }

    fn evaluate(&self, ctx: &ScoringContext<'_>) -> RuleResult {
        let head = ctx.text.trim_start_matches('\u{feff}').trim_start();
        let declared = head
            .get(..9)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("<!doctype"));
        if declared {
            RuleResult::neutral(self.id())
        } else {
            RuleResult::new(self.id(), -self.penalty, "missing <!DOCTYPE> declaration")
        }
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        vec![("penalty", self.penalty)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootLangRule {
    pub penalty: f64,
}

impl Default for RootLangRule {
    fn default() -> Self {
        Self { penalty: 10.0 }
    }
}

impl RubricRule for RootLangRule {
    fn id(&self) -> RuleId {
        RuleId::RootLang
    }

    fn evaluate(&self, ctx: &ScoringContext<'_>) -> RuleResult {
        match ctx.tree.find_first("html") {
            Some(html) if html.has_value("lang") => RuleResult::neutral(self.id()),
            Some(_) => RuleResult::new(self.id(), -self.penalty, "<html> has no lang attribute"),
            None => RuleResult::new(self.id(), -self.penalty, "no <html> element"),
        }
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        vec![("penalty", self.penalty)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMetaRule {
    pub penalty: f64,
}

impl Default for ViewportMetaRule {
    fn default() -> Self {
        Self { penalty: 10.0 }
    }
}

impl RubricRule for ViewportMetaRule {
    fn id(&self) -> RuleId {
        RuleId::ViewportMeta
    }

    fn evaluate(&self, ctx: &ScoringContext<'_>) -> RuleResult {
        let viewport = ctx
            .tree
            .find_with_attr("meta", "name", |name| name.trim().eq_ignore_ascii_case("viewport"));
        if viewport.is_some() {
            RuleResult::neutral(self.id())
        } else {
            RuleResult::new(self.id(), -self.penalty, "no <meta name=\"viewport\">")
        }
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        vec![("penalty", self.penalty)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingPresenceRule {
    pub penalty: f64,
}

impl Default for HeadingPresenceRule {
    fn default() -> Self {
        Self { penalty: 8.0 }
    }
}

impl RubricRule for HeadingPresenceRule {
    fn id(&self) -> RuleId {
        RuleId::HeadingPresence
    }

    fn evaluate(&self, ctx: &ScoringContext<'_>) -> RuleResult {
        if ctx.tree.exists(&HEADING_TAGS) {
            RuleResult::neutral(self.id())
        } else {
            RuleResult::new(self.id(), -self.penalty, "no h1/h2/h3 headings")
        }
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        vec![("penalty", self.penalty)]
    }
}

/// Only assessed when some h1-h3 heading exists; otherwise heading presence
/// already carries the penalty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingHierarchyRule {
    pub penalty: f64,
}

impl Default for HeadingHierarchyRule {
    fn default() -> Self {
        Self { penalty: 5.0 }
    }
}

impl RubricRule for HeadingHierarchyRule {
    fn id(&self) -> RuleId {
        RuleId::HeadingHierarchy
    }

    fn evaluate(&self, ctx: &ScoringContext<'_>) -> RuleResult {
        if !ctx.tree.exists(&HEADING_TAGS) {
            return RuleResult::neutral(self.id()).with_reason("no headings to assess");
        }
        if ctx.tree.find_first("h1").is_some() {
            RuleResult::neutral(self.id())
        } else {
            RuleResult::new(self.id(), -self.penalty, "headings present but no <h1>")
        }
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        vec![("penalty", self.penalty)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SemanticScoring {
    /// Distinct landmark tags: >=4 bonus, 3 neutral, 2 mild penalty, <=1 penalty.
    Graded {
        rich_bonus: f64,
        pair_penalty: f64,
        sparse_penalty: f64,
    },
    /// Landmark elements (repeats included): fewer than `min_elements` penalized.
    ElementCount { min_elements: usize, penalty: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SemanticCoverageRule {
    pub scoring: SemanticScoring,
}

impl Default for SemanticCoverageRule {
    fn default() -> Self {
        Self {
            scoring: SemanticScoring::Graded {
                rich_bonus: 2.0,
                pair_penalty: 2.0,
                sparse_penalty: 5.0,
            },
        }
    }
}

impl SemanticCoverageRule {
    pub fn element_count() -> Self {
        Self {
            scoring: SemanticScoring::ElementCount {
                min_elements: 2,
                penalty: 5.0,
            },
        }
    }
}

impl RubricRule for SemanticCoverageRule {
    fn id(&self) -> RuleId {
        RuleId::SemanticCoverage
    }

    fn evaluate(&self, ctx: &ScoringContext<'_>) -> RuleResult {
        match self.scoring {
            SemanticScoring::Graded {
                rich_bonus,
                pair_penalty,
                sparse_penalty,
            } => {
                let used = semantic_tags_used(&ctx.tree);
                let count = used.len();
                let listing = used.into_iter().collect::<Vec<_>>().join(",");
                let delta = match count {
                    0 | 1 => -sparse_penalty,
                    2 => -pair_penalty,
                    3 => 0.0,
                    _ => rich_bonus,
                };
                RuleResult::new(
                    self.id(),
                    delta,
                    format!("{count} distinct landmark tag(s) [{listing}]"),
                )
            }
            SemanticScoring::ElementCount {
                min_elements,
                penalty,
            } => {
                let count = semantic_element_count(&ctx.tree);
                if count < min_elements {
                    RuleResult::new(
                        self.id(),
                        -penalty,
                        format!("{count} landmark element(s), expected at least {min_elements}"),
                    )
                } else {
                    RuleResult::neutral(self.id())
                }
            }
        }
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        match self.scoring {
            SemanticScoring::Graded {
                rich_bonus,
                pair_penalty,
                sparse_penalty,
            } => vec![
                ("rich_bonus", rich_bonus),
                ("pair_penalty", pair_penalty),
                ("sparse_penalty", sparse_penalty),
            ],
            SemanticScoring::ElementCount {
                min_elements,
                penalty,
            } => vec![("min_elements", min_elements as f64), ("penalty", penalty)],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivDensityRule {
    pub max_ratio: f64,
    pub penalty: f64,
}

impl Default for DivDensityRule {
    fn default() -> Self {
        Self {
            max_ratio: 0.7,
            penalty: 5.0,
        }
    }
}

impl RubricRule for DivDensityRule {
    fn id(&self) -> RuleId {
        RuleId::DivDensity
    }

    // The total includes the html/head/body the parser always supplies.
    fn evaluate(&self, ctx: &ScoringContext<'_>) -> RuleResult {
        let total = ctx.tree.element_count();
        if total == 0 {
            return RuleResult::neutral(self.id());
        }
        let divs = ctx.tree.count("div");
        let ratio = divs as f64 / total as f64;
        if ratio > self.max_ratio {
            RuleResult::new(
                self.id(),
                -self.penalty,
                format!("{divs} of {total} elements are <div> ({ratio:.2})"),
            )
        } else {
            RuleResult::neutral(self.id())
        }
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        vec![("max_ratio", self.max_ratio), ("penalty", self.penalty)]
    }

    fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.max_ratio) {
            return Err(format!("{}.max_ratio must be within [0, 1]", self.id()));
        }
        if !self.penalty.is_finite() || self.penalty < 0.0 {
            return Err(format!("{}.penalty must be finite and >= 0", self.id()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormAccessibilityRule {
    pub per_input_penalty: f64,
}

impl Default for FormAccessibilityRule {
    fn default() -> Self {
        Self {
            per_input_penalty: 1.0,
        }
    }
}

impl RubricRule for FormAccessibilityRule {
    fn id(&self) -> RuleId {
        RuleId::FormAccessibility
    }

    fn evaluate(&self, ctx: &ScoringContext<'_>) -> RuleResult {
        let inputs = form_inputs(&ctx.tree);
        if inputs.missing_id == 0 {
            return RuleResult::neutral(self.id());
        }
        RuleResult::new(
            self.id(),
            -(inputs.missing_id as f64) * self.per_input_penalty,
            format!(
                "{} of {} form input(s) lack an id",
                inputs.missing_id, inputs.total
            ),
        )
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        vec![("per_input_penalty", self.per_input_penalty)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedUnitsRule {
    pub inline_scale: f64,
    pub block_scale: f64,
    pub cap: f64,
}

impl Default for FixedUnitsRule {
    fn default() -> Self {
        Self {
            inline_scale: 1.5,
            block_scale: 1.0,
            cap: 10.0,
        }
    }
}

impl RubricRule for FixedUnitsRule {
    fn id(&self) -> RuleId {
        RuleId::FixedUnits
    }

    fn evaluate(&self, ctx: &ScoringContext<'_>) -> RuleResult {
        let inline: usize = inline_styles(&ctx.tree)
            .iter()
            .map(|style| count_fixed_lengths(style))
            .sum();
        let block: usize = style_blocks(&ctx.tree)
            .iter()
            .map(|text| count_px(text))
            .sum();
        if inline == 0 && block == 0 {
            return RuleResult::neutral(self.id());
        }
        let raw = inline as f64 * self.inline_scale + block as f64 * self.block_scale;
        let penalty = raw.min(self.cap);
        RuleResult::new(
            self.id(),
            -penalty,
            format!("{inline} inline fixed length(s), {block} px in <style> (raw {raw:.1})"),
        )
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("inline_scale", self.inline_scale),
            ("block_scale", self.block_scale),
            ("cap", self.cap),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponsiveUnitsRule {
    pub per_unit_bonus: f64,
    pub cap: f64,
}

impl Default for ResponsiveUnitsRule {
    fn default() -> Self {
        Self {
            per_unit_bonus: 0.5,
            cap: 2.5,
        }
    }
}

impl RubricRule for ResponsiveUnitsRule {
    fn id(&self) -> RuleId {
        RuleId::ResponsiveUnits
    }

    fn evaluate(&self, ctx: &ScoringContext<'_>) -> RuleResult {
        let present = responsive_units_present(&ctx.lower);
        if present.is_empty() {
            return RuleResult::neutral(self.id());
        }
        let bonus = (present.len() as f64 * self.per_unit_bonus).min(self.cap);
        RuleResult::new(
            self.id(),
            bonus,
            format!("responsive unit(s) present: {}", present.join(" ")),
        )
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        vec![("per_unit_bonus", self.per_unit_bonus), ("cap", self.cap)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorHarmonyRule {
    pub clash_penalty: f64,
    pub good_bonus: f64,
    pub ideal_bonus: f64,
}

impl Default for ColorHarmonyRule {
    fn default() -> Self {
        Self {
            clash_penalty: 5.0,
            good_bonus: 1.5,
            ideal_bonus: 3.0,
        }
    }
}

impl ColorHarmonyRule {
    pub fn delta_for(&self, harmony: f64) -> f64 {
        if harmony < 0.4 {
            -self.clash_penalty
        } else if harmony > 0.8 {
            self.ideal_bonus
        } else if harmony > 0.6 {
            self.good_bonus
        } else {
            0.0
        }
    }
}

impl RubricRule for ColorHarmonyRule {
    fn id(&self) -> RuleId {
        RuleId::ColorHarmony
    }

    fn evaluate(&self, ctx: &ScoringContext<'_>) -> RuleResult {
        let samples = color_samples(&ctx.tree);
        let assessment = assess_harmony(&samples);
        let Some(distance) = assessment.mean_distance else {
            return RuleResult::neutral(self.id()).with_reason(format!(
                "{} decodable color(s), harmony neutral ({} discarded)",
                assessment.decoded, assessment.discarded
            ));
        };
        RuleResult::new(
            self.id(),
            self.delta_for(assessment.harmony),
            format!(
                "{} color(s), mean hue distance {:.3}, harmony {:.1} ({} discarded)",
                assessment.decoded, distance, assessment.harmony, assessment.discarded
            ),
        )
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("clash_penalty", self.clash_penalty),
            ("good_bonus", self.good_bonus),
            ("ideal_bonus", self.ideal_bonus),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CssPresenceRule {
    pub missing_style_block: f64,
    pub missing_inline_style: f64,
    pub missing_class: f64,
}

impl Default for CssPresenceRule {
    fn default() -> Self {
        Self {
            missing_style_block: 5.0,
            missing_inline_style: 5.0,
            missing_class: 3.0,
        }
    }
}

impl RubricRule for CssPresenceRule {
    fn id(&self) -> RuleId {
        RuleId::CssPresence
    }

    fn evaluate(&self, ctx: &ScoringContext<'_>) -> RuleResult {
        let mut delta = 0.0;
        let mut missing = Vec::new();
        if !ctx.tree.exists(&["style"]) {
            delta -= self.missing_style_block;
            missing.push("<style> block");
        }
        if !ctx.tree.any_has_attr("style") {
            delta -= self.missing_inline_style;
            missing.push("inline style");
        }
        if !ctx.tree.any_has_attr("class") {
            delta -= self.missing_class;
            missing.push("class attribute");
        }
        if missing.is_empty() {
            RuleResult::neutral(self.id())
        } else {
            RuleResult::new(self.id(), delta, format!("missing: {}", missing.join(", ")))
        }
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("missing_style_block", self.missing_style_block),
            ("missing_inline_style", self.missing_inline_style),
            ("missing_class", self.missing_class),
        ]
    }
}
