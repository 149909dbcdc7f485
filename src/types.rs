pub const BASE_SCORE: f64 = 100.0;
pub const MAX_SCORE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleId {
    Doctype,
    RootLang,
    ViewportMeta,
    HeadingPresence,
    HeadingHierarchy,
    SemanticCoverage,
    DivDensity,
    FormAccessibility,
    FixedUnits,
    ResponsiveUnits,
    ColorHarmony,
    CssPresence,
}

impl RuleId {
    /// Every rule in evaluation order.
    pub const ALL: [RuleId; 12] = [
        RuleId::Doctype,
        RuleId::RootLang,
        RuleId::ViewportMeta,
        RuleId::HeadingPresence,
        RuleId::HeadingHierarchy,
        RuleId::SemanticCoverage,
        RuleId::DivDensity,
        RuleId::FormAccessibility,
        RuleId::FixedUnits,
        RuleId::ResponsiveUnits,
        RuleId::ColorHarmony,
        RuleId::CssPresence,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RuleId::Doctype => "doctype",
            RuleId::RootLang => "root-lang",
            RuleId::ViewportMeta => "viewport-meta",
            RuleId::HeadingPresence => "heading-presence",
            RuleId::HeadingHierarchy => "heading-hierarchy",
            RuleId::SemanticCoverage => "semantic-coverage",
            RuleId::DivDensity => "div-density",
            RuleId::FormAccessibility => "form-accessibility",
            RuleId::FixedUnits => "fixed-units",
            RuleId::ResponsiveUnits => "responsive-units",
            RuleId::ColorHarmony => "color-harmony",
            RuleId::CssPresence => "css-presence",
        }
    }

    pub fn parse(raw: &str) -> Option<RuleId> {
        let raw = raw.trim();
        RuleId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str().eq_ignore_ascii_case(raw))
    }

    pub fn order(self) -> usize {
        htmlscore_rubric_contract::canonical_order(self.as_str()).unwrap_or(usize::MAX)
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleResult {
    pub rule: RuleId,
    pub delta: f64,
    pub reason: Option<String>,
}

impl RuleResult {
    pub fn neutral(rule: RuleId) -> Self {
        Self {
            rule,
            delta: 0.0,
            reason: None,
        }
    }

    pub fn new(rule: RuleId, delta: f64, reason: impl Into<String>) -> Self {
        Self {
            rule,
            delta,
            reason: Some(reason.into()),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    Scored,
    GateRejected,
    ParseFailed(String),
}

impl ScoreOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreOutcome::Scored => "scored",
            ScoreOutcome::GateRejected => "gate_rejected",
            ScoreOutcome::ParseFailed(_) => "parse_failed",
        }
    }
}

/// Full record of one scoring call. `raw` is the unclamped sum; `clamped`
/// lies in [0, 100] and `normalized` in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub outcome: ScoreOutcome,
    pub results: Vec<RuleResult>,
    pub base: f64,
    pub raw: f64,
    pub clamped: f64,
    pub normalized: f64,
}

impl ScoreBreakdown {
    pub(crate) fn rejected(outcome: ScoreOutcome) -> Self {
        Self {
            outcome,
            results: Vec::new(),
            base: BASE_SCORE,
            raw: 0.0,
            clamped: 0.0,
            normalized: 0.0,
        }
    }

    pub(crate) fn from_results(results: Vec<RuleResult>) -> Self {
        let raw = BASE_SCORE + results.iter().map(|r| r.delta).sum::<f64>();
        let clamped = if raw.is_finite() {
            raw.clamp(0.0, MAX_SCORE)
        } else {
            0.0
        };
        Self {
            outcome: ScoreOutcome::Scored,
            results,
            base: BASE_SCORE,
            raw,
            clamped,
            normalized: clamped / MAX_SCORE,
        }
    }

    pub fn score(&self) -> f64 {
        self.normalized
    }

    pub fn is_scored(&self) -> bool {
        self.outcome == ScoreOutcome::Scored
    }

    pub fn result(&self, rule: RuleId) -> Option<&RuleResult> {
        self.results.iter().find(|r| r.rule == rule)
    }

    pub fn delta(&self, rule: RuleId) -> Option<f64> {
        self.result(rule).map(|r| r.delta)
    }

    pub fn total_delta(&self) -> f64 {
        self.results.iter().map(|r| r.delta).sum()
    }
}

/// Caller-side document: raw HTML plus an optional label (e.g. a filename).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub label: Option<String>,
    pub text: String,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            label: None,
            text: text.into(),
        }
    }

    pub fn labeled(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            text: text.into(),
        }
    }

    pub fn passes_gate(&self) -> bool {
        passes_gate(&self.text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub label: Option<String>,
    pub breakdown: ScoreBreakdown,
}

/// Cheap well-formedness gate: both `<html` and `<body` must appear.
pub fn passes_gate(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.contains("<html") && lower.contains("<body")
}

pub fn report_line(label: &str, breakdown: &ScoreBreakdown) -> String {
    format!("{}: {:.2} / 100", label, breakdown.normalized * 100.0)
}
