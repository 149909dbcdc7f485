use crate::types::{RuleId, ScoreBreakdown, ScoreOutcome};

/// How often one rule moved the score across a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleMetrics {
    pub rule: RuleId,
    pub fired: usize,
    pub total_delta: f64,
}

/// Aggregate view of a scored batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchMetrics {
    pub documents: usize,
    pub scored: usize,
    pub gate_rejected: usize,
    pub parse_failed: usize,
    pub mean_normalized: f64,
    pub min_normalized: f64,
    pub max_normalized: f64,
    pub rules: Vec<RuleMetrics>,
}

impl BatchMetrics {
    pub fn from_breakdowns<'a>(items: impl IntoIterator<Item = &'a ScoreBreakdown>) -> Self {
        let mut out = BatchMetrics::default();
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut rules: Vec<RuleMetrics> = Vec::new();

        for breakdown in items {
            out.documents += 1;
            match breakdown.outcome {
                ScoreOutcome::Scored => out.scored += 1,
                ScoreOutcome::GateRejected => out.gate_rejected += 1,
                ScoreOutcome::ParseFailed(_) => out.parse_failed += 1,
            }
            sum += breakdown.normalized;
            min = min.min(breakdown.normalized);
            max = max.max(breakdown.normalized);

            for result in &breakdown.results {
                let slot = match rules.iter_mut().position(|m| m.rule == result.rule) {
                    Some(idx) => &mut rules[idx],
                    None => {
                        rules.push(RuleMetrics {
                            rule: result.rule,
                            fired: 0,
                            total_delta: 0.0,
                        });
                        let last = rules.len() - 1;
                        &mut rules[last]
                    }
                };
                if result.delta != 0.0 {
                    slot.fired += 1;
                    slot.total_delta += result.delta;
                }
            }
        }

        if out.documents > 0 {
            out.mean_normalized = sum / out.documents as f64;
            out.min_normalized = min;
            out.max_normalized = max;
        }
        rules.sort_by_key(|m| m.rule.order());
        out.rules = rules;
        out
    }

    pub fn rule(&self, rule: RuleId) -> Option<&RuleMetrics> {
        self.rules.iter().find(|m| m.rule == rule)
    }
}
