use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

pub const CONTRACT_ID: &str = "htmlscore.rubric_contract";
pub const CONTRACT_VERSION: &str = "2";

pub const CURRENT_RUBRIC_ID: &str = "htmlscore.rubric.current";
pub const LEGACY_RUBRIC_ID: &str = "htmlscore.rubric.legacy";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleCategoryDef {
    pub id: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleDef {
    pub id: &'static str,
    pub title: &'static str,
    pub category: &'static str,
    pub order: usize,
    pub signal: &'static str,
}

pub const RULE_CATEGORIES: [RuleCategoryDef; 4] = [
    RuleCategoryDef {
        id: "document-structure",
        name: "Document Structure",
    },
    RuleCategoryDef {
        id: "semantic-markup",
        name: "Semantic Markup",
    },
    RuleCategoryDef {
        id: "responsive-design",
        name: "Responsive Design",
    },
    RuleCategoryDef {
        id: "visual-style",
        name: "Visual Style",
    },
];

// Evaluation order is the array order; `order` is kept explicit so consumers
// that only hold an id can still sort without scanning.
pub const RULE_CATALOGUE: [RuleDef; 12] = [
    RuleDef { id: "doctype", title: "Doctype declaration", category: "document-structure", order: 0, signal: "penalty" },
    RuleDef { id: "root-lang", title: "Root language attribute", category: "document-structure", order: 1, signal: "penalty" },
    RuleDef { id: "viewport-meta", title: "Viewport meta element", category: "responsive-design", order: 2, signal: "penalty" },
    RuleDef { id: "heading-presence", title: "Heading presence", category: "semantic-markup", order: 3, signal: "penalty" },
    RuleDef { id: "heading-hierarchy", title: "Heading hierarchy", category: "semantic-markup", order: 4, signal: "penalty" },
    RuleDef { id: "semantic-coverage", title: "Semantic landmark coverage", category: "semantic-markup", order: 5, signal: "graded" },
    RuleDef { id: "div-density", title: "Div density", category: "semantic-markup", order: 6, signal: "penalty" },
    RuleDef { id: "form-accessibility", title: "Form input accessibility", category: "semantic-markup", order: 7, signal: "penalty" },
    RuleDef { id: "fixed-units", title: "Fixed length units", category: "responsive-design", order: 8, signal: "penalty" },
    RuleDef { id: "responsive-units", title: "Responsive length units", category: "responsive-design", order: 9, signal: "bonus" },
    RuleDef { id: "color-harmony", title: "Color harmony", category: "visual-style", order: 10, signal: "graded" },
    RuleDef { id: "css-presence", title: "CSS presence", category: "visual-style", order: 11, signal: "penalty" },
];

pub const CURRENT_RULE_IDS: [&str; 12] = [
    "doctype",
    "root-lang",
    "viewport-meta",
    "heading-presence",
    "heading-hierarchy",
    "semantic-coverage",
    "div-density",
    "form-accessibility",
    "fixed-units",
    "responsive-units",
    "color-harmony",
    "css-presence",
];

pub const LEGACY_RULE_IDS: [&str; 10] = [
    "doctype",
    "root-lang",
    "viewport-meta",
    "heading-presence",
    "heading-hierarchy",
    "semantic-coverage",
    "div-density",
    "form-accessibility",
    "fixed-units",
    "responsive-units",
];

/// Parameters of one configured rule, as fed into the rubric fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleParams {
    pub rule_id: String,
    pub params: Vec<(String, f64)>,
}

impl RuleParams {
    pub fn new(rule_id: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            params: Vec::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.params.push((name.into(), value));
        self
    }
}

pub fn rule_def(id: &str) -> Option<&'static RuleDef> {
    RULE_CATALOGUE.iter().find(|def| def.id == id)
}

pub fn category_def(id: &str) -> Option<&'static RuleCategoryDef> {
    RULE_CATEGORIES.iter().find(|def| def.id == id)
}

pub fn canonical_order(id: &str) -> Option<usize> {
    rule_def(id).map(|def| def.order)
}

pub fn rubric_rule_ids(rubric_id: &str) -> Option<&'static [&'static str]> {
    match rubric_id {
        CURRENT_RUBRIC_ID => Some(&CURRENT_RULE_IDS),
        LEGACY_RUBRIC_ID => Some(&LEGACY_RULE_IDS),
        _ => None,
    }
}

fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn catalogue_value() -> Value {
    let rules = RULE_CATALOGUE
        .iter()
        .map(|def| {
            let mut entry = Map::new();
            entry.insert("id".to_string(), Value::from(def.id));
            entry.insert("category".to_string(), Value::from(def.category));
            entry.insert("order".to_string(), Value::from(def.order));
            entry.insert("signal".to_string(), Value::from(def.signal));
            Value::Object(entry)
        })
        .collect::<Vec<_>>();
    let mut root = Map::new();
    root.insert("contract".to_string(), Value::from(CONTRACT_ID));
    root.insert("version".to_string(), Value::from(CONTRACT_VERSION));
    root.insert("rules".to_string(), Value::Array(rules));
    Value::Object(root)
}

static CATALOGUE_FINGERPRINT: OnceLock<String> = OnceLock::new();

pub fn catalogue_fingerprint_sha256() -> String {
    CATALOGUE_FINGERPRINT
        .get_or_init(|| hex_sha256(catalogue_value().to_string().as_bytes()))
        .clone()
}

/// Canonical JSON for a configured rubric. Object keys serialize sorted, rule
/// order is preserved, and non-finite parameters serialize as null.
pub fn rubric_canonical_json(rubric_id: &str, rules: &[RuleParams]) -> String {
    let rules = rules
        .iter()
        .map(|rule| {
            let mut params = Map::new();
            for (name, value) in &rule.params {
                let value = serde_json::Number::from_f64(*value)
                    .map(Value::Number)
                    .unwrap_or(Value::Null);
                params.insert(name.clone(), value);
            }
            let mut entry = Map::new();
            entry.insert("id".to_string(), Value::from(rule.rule_id.as_str()));
            entry.insert("params".to_string(), Value::Object(params));
            Value::Object(entry)
        })
        .collect::<Vec<_>>();
    let mut root = Map::new();
    root.insert("contract".to_string(), Value::from(CONTRACT_ID));
    root.insert("contract_version".to_string(), Value::from(CONTRACT_VERSION));
    root.insert("rubric".to_string(), Value::from(rubric_id));
    root.insert("rules".to_string(), Value::Array(rules));
    Value::Object(root).to_string()
}

pub fn rubric_fingerprint_sha256(rubric_id: &str, rules: &[RuleParams]) -> String {
    let payload = format!(
        "{}\n{}",
        catalogue_fingerprint_sha256(),
        rubric_canonical_json(rubric_id, rules)
    );
    hex_sha256(payload.as_bytes())
}
