#![allow(unsafe_op_in_unsafe_fn)]

use crate::{RubricVersion, ScoreBreakdown, ScoreError, ScoreOutcome, Scorer};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList, PyModule};

#[pyclass(name = "Scorer")]
struct PyScorer {
    scorer: Scorer,
}

#[pymethods]
impl PyScorer {
    #[new]
    #[pyo3(signature = (rubric="current", max_input_bytes=None, debug_log=None, perf_log=None))]
    fn new(
        rubric: &str,
        max_input_bytes: Option<usize>,
        debug_log: Option<String>,
        perf_log: Option<String>,
    ) -> PyResult<Self> {
        let version = RubricVersion::parse(rubric)
            .ok_or_else(|| PyValueError::new_err(format!("unknown rubric: {rubric}")))?;
        let mut builder = Scorer::builder().rubric_version(version);
        if let Some(max) = max_input_bytes {
            builder = builder.max_input_bytes(max);
        }
        if let Some(path) = debug_log {
            builder = builder.debug_log(path);
        }
        if let Some(path) = perf_log {
            builder = builder.perf_log(path);
        }
        let scorer = builder.build().map_err(to_py_err)?;
        Ok(Self { scorer })
    }

    fn score(&self, py: Python<'_>, html: &str) -> f64 {
        py.allow_threads(|| self.scorer.score_html(html))
    }

    fn breakdown(&self, py: Python<'_>, html: &str) -> PyResult<PyObject> {
        let breakdown = py.allow_threads(|| self.scorer.score(html));
        breakdown_to_py(py, &breakdown)
    }

    fn score_batch(&self, py: Python<'_>, html_list: Vec<String>) -> Vec<f64> {
        py.allow_threads(|| {
            self.scorer
                .score_batch(&html_list)
                .into_iter()
                .map(|b| b.normalized)
                .collect()
        })
    }

    fn fingerprint(&self) -> String {
        self.scorer.rubric_fingerprint()
    }

    #[getter]
    fn rubric_id(&self) -> String {
        self.scorer.rubric_id().to_string()
    }

    fn flush_logs(&self) {
        self.scorer.flush_logs();
    }
}

#[pyfunction]
fn score_html(py: Python<'_>, html: &str) -> f64 {
    py.allow_threads(|| crate::score_html(html))
}

#[pyfunction]
fn score_breakdown(py: Python<'_>, html: &str) -> PyResult<PyObject> {
    let breakdown = py.allow_threads(|| crate::score(html));
    breakdown_to_py(py, &breakdown)
}

/// Reward hook for chat-style completions: one float per completion, taken
/// from the first message's `content`. Missing content rewards 0.0.
#[pyfunction]
fn html_structure_reward(py: Python<'_>, completions: Vec<Vec<Bound<'_, PyDict>>>) -> Vec<f64> {
    let contents: Vec<Option<String>> = completions
        .iter()
        .map(|messages| {
            let first = messages.first()?;
            let content = first.get_item("content").ok()??;
            content.extract::<String>().ok()
        })
        .collect();
    py.allow_threads(|| {
        use rayon::prelude::*;

        contents
            .par_iter()
            .map(|content| content.as_deref().map(crate::score_html).unwrap_or(0.0))
            .collect()
    })
}

fn breakdown_to_py(py: Python<'_>, breakdown: &ScoreBreakdown) -> PyResult<PyObject> {
    let out = PyDict::new_bound(py);
    out.set_item("outcome", breakdown.outcome.as_str())?;
    if let ScoreOutcome::ParseFailed(reason) = &breakdown.outcome {
        out.set_item("detail", reason.as_str())?;
    }
    out.set_item("base", breakdown.base)?;
    out.set_item("raw", breakdown.raw)?;
    out.set_item("clamped", breakdown.clamped)?;
    out.set_item("normalized", breakdown.normalized)?;

    let rules = PyList::empty_bound(py);
    for result in &breakdown.results {
        let d = PyDict::new_bound(py);
        d.set_item("id", result.rule.as_str())?;
        d.set_item("delta", result.delta)?;
        d.set_item("reason", result.reason.as_deref())?;
        rules.append(d)?;
    }
    out.set_item("rules", rules)?;
    Ok(out.to_object(py))
}

#[pymodule]
fn _htmlscore(_py: Python<'_>, module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PyScorer>()?;
    module.add_function(wrap_pyfunction!(score_html, module)?)?;
    module.add_function(wrap_pyfunction!(score_breakdown, module)?)?;
    module.add_function(wrap_pyfunction!(html_structure_reward, module)?)?;
    module.add("CURRENT_RUBRIC", RubricVersion::Current.id())?;
    module.add("LEGACY_RUBRIC", RubricVersion::Legacy.id())?;
    Ok(())
}

fn to_py_err(err: ScoreError) -> PyErr {
    PyValueError::new_err(err.to_string())
}
