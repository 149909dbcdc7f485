use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::debug::json_escape;

const HOT_LIMIT: usize = 100;

/// JSONL timing sink. When the last clone drops, a `<stem>_hot.log` ranking
/// the slowest spans and largest counters is written beside the log.
#[derive(Clone)]
pub struct PerfLogger {
    inner: Arc<Mutex<PerfState>>,
}

struct PerfState {
    writer: BufWriter<File>,
    path: PathBuf,
    spans: HashMap<String, SpanTotal>,
    counts: HashMap<String, u64>,
}

#[derive(Default)]
struct SpanTotal {
    ms: f64,
    count: u64,
    max_ms: f64,
}

impl PerfLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(PerfState {
                writer: BufWriter::new(file),
                path,
                spans: HashMap::new(),
                counts: HashMap::new(),
            })),
        })
    }

    /// Runs `f` and logs its wall time as span `name`.
    pub fn time<T>(&self, name: &str, doc_id: Option<usize>, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let out = f();
        self.log_span_ms(name, doc_id, started.elapsed().as_secs_f64() * 1000.0);
        out
    }

    pub fn log_span_ms(&self, name: &str, doc_id: Option<usize>, ms: f64) {
        let json = format!(
            "{{\"type\":\"perf.span\",\"name\":\"{}\",\"doc_id\":{},\"unit\":\"ms\",\"ms\":{:.3}}}",
            json_escape(name),
            doc_field(doc_id),
            ms
        );
        if let Ok(mut state) = self.inner.lock() {
            let total = state.spans.entry(name.to_string()).or_default();
            total.ms += ms;
            total.count = total.count.saturating_add(1);
            total.max_ms = total.max_ms.max(ms);
            let _ = writeln!(state.writer, "{json}");
        }
    }

    pub fn log_counts(&self, name: &str, doc_id: Option<usize>, counts: &[(&str, u64)]) {
        let fields: Vec<String> = counts
            .iter()
            .map(|(key, value)| format!("\"{}\":{}", json_escape(key), value))
            .collect();
        let json = format!(
            "{{\"type\":\"perf.counts\",\"name\":\"{}\",\"doc_id\":{},\"counts\":{{{}}}}}",
            json_escape(name),
            doc_field(doc_id),
            fields.join(",")
        );
        if let Ok(mut state) = self.inner.lock() {
            for (key, value) in counts {
                let entry = state.counts.entry(format!("{name}.{key}")).or_insert(0);
                *entry = entry.saturating_add(*value);
            }
            let _ = writeln!(state.writer, "{json}");
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

fn doc_field(doc_id: Option<usize>) -> String {
    doc_id
        .map(|v| v.to_string())
        .unwrap_or_else(|| "null".to_string())
}

impl Drop for PerfState {
    fn drop(&mut self) {
        let _ = self.writer.flush();
        let Ok(file) = File::create(hot_path_for(&self.path)) else {
            return;
        };
        let mut writer = BufWriter::new(file);

        let mut spans: Vec<(&String, &SpanTotal)> = self.spans.iter().collect();
        spans.sort_by(|a, b| b.1.ms.total_cmp(&a.1.ms).then_with(|| a.0.cmp(b.0)));
        for (rank, (name, total)) in spans.into_iter().take(HOT_LIMIT).enumerate() {
            let avg = if total.count == 0 {
                0.0
            } else {
                total.ms / total.count as f64
            };
            let _ = writeln!(
                writer,
                "{{\"type\":\"perf.hot.span\",\"rank\":{},\"name\":\"{}\",\"unit\":\"ms\",\"ms\":{:.3},\"count\":{},\"avg_ms\":{:.3},\"max_ms\":{:.3}}}",
                rank + 1,
                json_escape(name),
                total.ms,
                total.count,
                avg,
                total.max_ms
            );
        }

        let mut counts: Vec<(&String, &u64)> = self.counts.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (rank, (name, value)) in counts.into_iter().take(HOT_LIMIT).enumerate() {
            let _ = writeln!(
                writer,
                "{{\"type\":\"perf.hot.count\",\"rank\":{},\"name\":\"{}\",\"value\":{}}}",
                rank + 1,
                json_escape(name),
                value
            );
        }
        let _ = writer.flush();
    }
}

fn hot_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("htmlscore_perf.log");
    let stem = file_name
        .rsplit_once('.')
        .map(|(s, _)| s)
        .unwrap_or(file_name);
    path.with_file_name(format!("{stem}_hot.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hot_log_sits_beside_the_span_log() {
        assert_eq!(
            hot_path_for(Path::new("/tmp/run/score_perf.jsonl")),
            PathBuf::from("/tmp/run/score_perf_hot.log")
        );
        assert_eq!(hot_path_for(Path::new("perf")), PathBuf::from("perf_hot.log"));
    }

    #[test]
    fn timed_closure_returns_its_value() {
        let dir = tempfile::tempdir().expect("tempdir");
        let logger = PerfLogger::new(dir.path().join("p.log")).expect("logger");
        assert_eq!(logger.time("score.rules", Some(3), || 41 + 1), 42);
        logger.flush();
        let contents = std::fs::read_to_string(dir.path().join("p.log")).expect("read");
        assert!(contents.contains("\"name\":\"score.rules\",\"doc_id\":3"));
    }

    #[test]
    fn spans_and_counts_are_logged_and_ranked_on_drop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("score_perf.log");
        {
            let logger = PerfLogger::new(&path).expect("logger");
            logger.log_span_ms("score.parse", Some(0), 1.5);
            logger.log_span_ms("score.rules", Some(0), 4.0);
            logger.log_span_ms("score.rules", Some(1), 2.0);
            logger.log_counts("score.doc", None, &[("elements", 12), ("rules", 12)]);
            logger.flush();

            let contents = std::fs::read_to_string(&path).expect("read log");
            assert_eq!(contents.lines().count(), 4);
            assert!(contents.contains(
                "{\"type\":\"perf.span\",\"name\":\"score.parse\",\"doc_id\":0,\"unit\":\"ms\",\"ms\":1.500}"
            ));
            assert!(contents.contains("\"doc_id\":null,\"counts\":{\"elements\":12,\"rules\":12}"));
        }

        let hot = std::fs::read_to_string(dir.path().join("score_perf_hot.log")).expect("hot log");
        let first = hot.lines().next().expect("ranked span");
        assert!(first.contains("\"rank\":1,\"name\":\"score.rules\""));
        assert!(first.contains("\"count\":2,\"avg_ms\":3.000,\"max_ms\":4.000"));
        assert!(hot.contains("\"name\":\"score.doc.elements\",\"value\":12"));
    }
}
