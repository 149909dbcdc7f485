use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::types::{ScoreBreakdown, ScoreOutcome};

/// JSONL sink for per-document score records. Cloning shares the sink.
#[derive(Clone)]
pub struct DebugLogger {
    inner: Arc<Mutex<DebugState>>,
}

struct DebugState {
    writer: BufWriter<File>,
    counters: HashMap<String, u64>,
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(DebugState {
                writer: BufWriter::new(file),
                counters: HashMap::new(),
            })),
        })
    }

    /// Writes one `score.document` line and bumps the outcome and
    /// per-rule counters.
    pub fn record_document(&self, doc_id: usize, breakdown: &ScoreBreakdown) {
        let mut rules = String::from("[");
        for (idx, result) in breakdown.results.iter().enumerate() {
            if idx > 0 {
                rules.push(',');
            }
            let reason = result
                .reason
                .as_deref()
                .map(|r| format!("\"{}\"", json_escape(r)))
                .unwrap_or_else(|| "null".to_string());
            rules.push_str(&format!(
                "{{\"id\":\"{}\",\"delta\":{},\"reason\":{}}}",
                result.rule.as_str(),
                json_number(result.delta),
                reason
            ));
        }
        rules.push(']');

        let detail = match &breakdown.outcome {
            ScoreOutcome::ParseFailed(msg) => format!("\"{}\"", json_escape(msg)),
            _ => "null".to_string(),
        };
        let json = format!(
            "{{\"type\":\"score.document\",\"doc_id\":{},\"outcome\":\"{}\",\"detail\":{},\"raw\":{},\"clamped\":{},\"normalized\":{},\"rules\":{}}}",
            doc_id,
            breakdown.outcome.as_str(),
            detail,
            json_number(breakdown.raw),
            json_number(breakdown.clamped),
            json_number(breakdown.normalized),
            rules
        );

        if let Ok(mut state) = self.inner.lock() {
            let _ = writeln!(state.writer, "{json}");
            bump(&mut state.counters, &format!("outcome.{}", breakdown.outcome.as_str()));
            for result in &breakdown.results {
                if result.delta != 0.0 {
                    bump(&mut state.counters, &format!("rule.{}.fired", result.rule));
                }
            }
        }
    }

    pub fn emit_summary(&self, context: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let mut counters: Vec<(String, u64)> = state.counters.drain().collect();
            counters.sort_by(|a, b| a.0.cmp(&b.0));
            let mut counts_json = String::from("{");
            for (idx, (key, value)) in counters.iter().enumerate() {
                if idx > 0 {
                    counts_json.push(',');
                }
                counts_json.push_str(&format!("\"{}\":{}", json_escape(key), value));
            }
            counts_json.push('}');
            let json = format!(
                "{{\"type\":\"debug.summary\",\"context\":\"{}\",\"counts\":{}}}",
                json_escape(context),
                counts_json
            );
            let _ = writeln!(state.writer, "{json}");
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

fn bump(counters: &mut HashMap<String, u64>, key: &str) {
    let entry = counters.entry(key.to_string()).or_insert(0);
    *entry = entry.saturating_add(1);
}

fn json_number(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.4}")
    } else {
        "null".to_string()
    }
}

pub(crate) fn json_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RuleId, RuleResult};

    #[test]
    fn escapes_quotes_and_control_chars() {
        assert_eq!(json_escape("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
        assert_eq!(json_escape("\u{1}"), "\\u0001");
    }

    #[test]
    fn records_documents_and_summarizes_counters() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("score_debug.jsonl");
        let logger = DebugLogger::new(&path).expect("logger");

        let scored = ScoreBreakdown::from_results(vec![
            RuleResult::new(RuleId::Doctype, -20.0, "missing \"doctype\""),
            RuleResult::neutral(RuleId::RootLang),
        ]);
        logger.record_document(0, &scored);
        logger.record_document(1, &ScoreBreakdown::rejected(ScoreOutcome::GateRejected));
        logger.emit_summary("batch");
        logger.flush();

        let contents = std::fs::read_to_string(&path).expect("read log");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("{\"type\":\"score.document\",\"doc_id\":0"));
        assert!(lines[0].contains("\"outcome\":\"scored\""));
        assert!(lines[0].contains("\"id\":\"doctype\",\"delta\":-20.0000"));
        assert!(lines[0].contains("missing \\\"doctype\\\""));
        assert!(lines[1].contains("\"outcome\":\"gate_rejected\""));
        assert!(lines[1].contains("\"rules\":[]"));
        assert!(lines[2].contains("\"type\":\"debug.summary\""));
        assert!(lines[2].contains("\"outcome.gate_rejected\":1"));
        assert!(lines[2].contains("\"outcome.scored\":1"));
        assert!(lines[2].contains("\"rule.doctype.fired\":1"));
        assert!(!lines[2].contains("root-lang"));
    }
}
