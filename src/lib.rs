pub mod color;
mod debug;
mod doc_context;
mod error;
mod html;
mod metrics;
pub mod patterns;
mod perf;
#[cfg(feature = "python")]
mod python;
mod rubric;
mod rules;
mod types;

pub use debug::DebugLogger;
pub use doc_context::ScoringContext;
pub use error::ScoreError;
pub use html::{Element, ParsedTree};
pub use metrics::{BatchMetrics, RuleMetrics};
pub use perf::PerfLogger;
pub use rubric::{Rubric, RubricVersion};
pub use rules::{
    ColorHarmonyRule, CssPresenceRule, DivDensityRule, DoctypeRule, FixedUnitsRule,
    FormAccessibilityRule, HeadingHierarchyRule, HeadingPresenceRule, ResponsiveUnitsRule,
    RootLangRule, RubricRule, SemanticCoverageRule, SemanticScoring, ViewportMetaRule,
};
pub use types::{
    BASE_SCORE, Document, MAX_SCORE, RuleId, RuleResult, ScoreBreakdown, ScoreOutcome,
    ScoredDocument, passes_gate, report_line,
};

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

/// Scores HTML documents against a configured rubric.
///
/// Scoring never fails: gate and parse failures resolve to a 0.0 breakdown.
/// A `Scorer` is `Send + Sync` and may be shared across worker threads.
pub struct Scorer {
    rubric: Rubric,
    max_input_bytes: Option<usize>,
    debug: Option<Arc<DebugLogger>>,
    perf: Option<Arc<PerfLogger>>,
}

pub struct ScorerBuilder {
    rubric: Rubric,
    max_input_bytes: Option<usize>,
    debug_path: Option<PathBuf>,
    perf_enabled: bool,
    perf_path: Option<PathBuf>,
}

impl Scorer {
    /// Default rubric, no size limit, no logging.
    pub fn new() -> Self {
        Self {
            rubric: Rubric::current(),
            max_input_bytes: None,
            debug: None,
            perf: None,
        }
    }

    pub fn builder() -> ScorerBuilder {
        ScorerBuilder::new()
    }

    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    pub fn rubric_id(&self) -> &str {
        self.rubric.id()
    }

    pub fn rubric_fingerprint(&self) -> String {
        self.rubric.fingerprint()
    }

    pub fn score(&self, text: &str) -> ScoreBreakdown {
        self.score_at(0, text)
    }

    /// Normalized score in [0, 1].
    pub fn score_html(&self, text: &str) -> f64 {
        self.score(text).normalized
    }

    /// Scores one document; `doc_id` only labels log lines.
    pub fn score_at(&self, doc_id: usize, text: &str) -> ScoreBreakdown {
        let breakdown = self.evaluate(doc_id, text);
        if let Some(logger) = self.debug.as_deref() {
            logger.record_document(doc_id, &breakdown);
        }
        breakdown
    }

    fn evaluate(&self, doc_id: usize, text: &str) -> ScoreBreakdown {
        if !passes_gate(text) {
            return ScoreBreakdown::rejected(ScoreOutcome::GateRejected);
        }

        let tree = match self.timed("score.parse", doc_id, || self.parse(text)) {
            Ok(tree) => tree,
            Err(err) => {
                return ScoreBreakdown::rejected(ScoreOutcome::ParseFailed(err.to_string()));
            }
        };
        let element_count = tree.element_count();

        let ctx = ScoringContext::new(doc_id, text, tree);
        let results = self.timed("score.rules", doc_id, || self.rubric.evaluate(&ctx));

        if let Some(perf) = self.perf.as_deref() {
            perf.log_counts(
                "score.doc",
                Some(doc_id),
                &[
                    ("elements", element_count as u64),
                    ("rules", results.len() as u64),
                ],
            );
        }

        ScoreBreakdown::from_results(results)
    }

    fn timed<T>(&self, span: &str, doc_id: usize, f: impl FnOnce() -> T) -> T {
        match self.perf.as_deref() {
            Some(perf) => perf.time(span, Some(doc_id), f),
            None => f(),
        }
    }

    fn parse(&self, text: &str) -> Result<ParsedTree, ScoreError> {
        match self.max_input_bytes {
            Some(max) if text.len() > max => Err(ScoreError::InputTooLarge {
                len: text.len(),
                max,
            }),
            _ => ParsedTree::parse(text),
        }
    }

    /// Scores documents in parallel; output is aligned with input order.
    pub fn score_batch<S: AsRef<str> + Sync>(&self, texts: &[S]) -> Vec<ScoreBreakdown> {
        use rayon::prelude::*;

        texts
            .par_iter()
            .enumerate()
            .map(|(idx, text)| self.score_at(idx, text.as_ref()))
            .collect()
    }

    pub fn score_documents(&self, documents: &[Document]) -> Vec<ScoredDocument> {
        use rayon::prelude::*;

        documents
            .par_iter()
            .enumerate()
            .map(|(idx, doc)| ScoredDocument {
                label: doc.label.clone(),
                breakdown: self.score_at(idx, &doc.text),
            })
            .collect()
    }

    /// Writes the debug counter summary and flushes both log sinks.
    pub fn flush_logs(&self) {
        if let Some(logger) = self.debug.as_deref() {
            logger.emit_summary(self.rubric.id());
            logger.flush();
        }
        if let Some(perf) = self.perf.as_deref() {
            perf.flush();
        }
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScorerBuilder {
    pub fn new() -> Self {
        Self {
            rubric: Rubric::current(),
            max_input_bytes: None,
            debug_path: None,
            perf_enabled: false,
            perf_path: None,
        }
    }

    pub fn rubric(mut self, rubric: Rubric) -> Self {
        self.rubric = rubric;
        self
    }

    pub fn rubric_version(mut self, version: RubricVersion) -> Self {
        self.rubric = Rubric::for_version(version);
        self
    }

    pub fn disable_rule(mut self, id: RuleId) -> Self {
        self.rubric.remove(id);
        self
    }

    /// Registers `rule`, replacing the rule with the same id.
    pub fn rule(mut self, rule: impl RubricRule + 'static) -> Self {
        self.rubric.insert(Box::new(rule));
        self
    }

    // Oversized documents score 0.0 as a parse failure.
    pub fn max_input_bytes(mut self, max: usize) -> Self {
        self.max_input_bytes = Some(max);
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn perf_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.perf_enabled = true;
        self.perf_path = Some(path.into());
        self
    }

    // Uses htmlscore_perf.log when enabled without a path.
    pub fn perf(mut self, enabled: bool) -> Self {
        self.perf_enabled = enabled;
        self
    }

    pub fn build(self) -> Result<Scorer, ScoreError> {
        if self.max_input_bytes == Some(0) {
            return Err(ScoreError::InvalidConfiguration(
                "max_input_bytes must be > 0".to_string(),
            ));
        }
        self.rubric.validate()?;
        let debug = match self.debug_path {
            Some(path) => Some(Arc::new(DebugLogger::new(path)?)),
            None => None,
        };
        let perf = if self.perf_enabled {
            let path = self
                .perf_path
                .unwrap_or_else(|| PathBuf::from("htmlscore_perf.log"));
            Some(Arc::new(PerfLogger::new(path)?))
        } else {
            None
        };
        Ok(Scorer {
            rubric: self.rubric,
            max_input_bytes: self.max_input_bytes,
            debug,
            perf,
        })
    }
}

impl Default for ScorerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT_SCORER: OnceLock<Scorer> = OnceLock::new();

fn default_scorer() -> &'static Scorer {
    DEFAULT_SCORER.get_or_init(Scorer::new)
}

pub fn score(text: &str) -> ScoreBreakdown {
    default_scorer().score(text)
}

pub fn score_html(text: &str) -> f64 {
    default_scorer().score_html(text)
}

pub fn score_batch<S: AsRef<str> + Sync>(texts: &[S]) -> Vec<ScoreBreakdown> {
    default_scorer().score_batch(texts)
}
