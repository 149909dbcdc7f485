use crate::color::ColorSample;
use crate::html::ParsedTree;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

pub const SEMANTIC_LANDMARKS: [&str; 7] = [
    "header", "nav", "main", "section", "article", "aside", "footer",
];

pub const RESPONSIVE_UNITS: [&str; 5] = ["%", "vw", "vh", "em", "rem"];

pub const HEADING_TAGS: [&str; 3] = ["h1", "h2", "h3"];

static FIXED_LENGTH: OnceLock<Regex> = OnceLock::new();
static COLOR_DECLARATION: OnceLock<Regex> = OnceLock::new();

fn fixed_length_regex() -> &'static Regex {
    FIXED_LENGTH.get_or_init(|| {
        Regex::new(r"\d+(?:px|pt|cm|mm)").expect("fixed length pattern is valid")
    })
}

// The leading separator keeps `border-color` from also matching as `color`.
fn color_declaration_regex() -> &'static Regex {
    COLOR_DECLARATION.get_or_init(|| {
        Regex::new(r"(?:^|[;\s])(background-color|border-color|color)\s*:\s*([^;]+)")
            .expect("color declaration pattern is valid")
    })
}

/// Raw values of every `style="..."` attribute, in document order.
pub fn inline_styles(tree: &ParsedTree) -> Vec<String> {
    tree.elements().filter_map(|el| el.attr("style")).collect()
}

/// Text of every `<style>` element.
pub fn style_blocks(tree: &ParsedTree) -> Vec<String> {
    tree.find_all(&["style"])
        .into_iter()
        .map(|el| el.text())
        .collect()
}

/// Numeric px/pt/cm/mm lengths in one inline declaration list.
pub fn count_fixed_lengths(style: &str) -> usize {
    let lower = style.to_ascii_lowercase();
    fixed_length_regex().find_iter(&lower).count()
}

pub fn count_px(text: &str) -> usize {
    text.matches("px").count()
}

pub fn responsive_units_present(lower_text: &str) -> Vec<&'static str> {
    RESPONSIVE_UNITS
        .iter()
        .copied()
        .filter(|unit| lower_text.contains(unit))
        .collect()
}

/// Values of `background-color`, `color` and `border-color` declarations,
/// lower-cased with any `!important` removed.
pub fn color_tokens(style: &str) -> Vec<String> {
    let lower = style.to_ascii_lowercase();
    color_declaration_regex()
        .captures_iter(&lower)
        .filter_map(|caps| caps.get(2))
        .map(|value| {
            value
                .as_str()
                .trim()
                .trim_end_matches("!important")
                .trim()
                .to_string()
        })
        .filter(|value| !value.is_empty())
        .collect()
}

/// Declared width and height in CSS px, when absolute.
pub fn inline_dimensions(style: &str) -> (Option<f64>, Option<f64>) {
    let style_attr = match lightningcss::stylesheet::StyleAttribute::parse(
        style,
        lightningcss::stylesheet::ParserOptions::default(),
    ) {
        Ok(value) => value,
        Err(_) => return (None, None),
    };
    let mut width = None;
    let mut height = None;
    let declarations = style_attr
        .declarations
        .declarations
        .iter()
        .chain(style_attr.declarations.important_declarations.iter());
    for prop in declarations {
        match prop {
            lightningcss::properties::Property::Width(size) => {
                width = size_to_px(size);
            }
            lightningcss::properties::Property::Height(size) => {
                height = size_to_px(size);
            }
            _ => {}
        }
    }
    (width, height)
}

fn size_to_px(size: &lightningcss::properties::size::Size) -> Option<f64> {
    match size {
        lightningcss::properties::size::Size::LengthPercentage(value) => match value {
            lightningcss::values::length::LengthPercentage::Dimension(length) => {
                length.to_px().map(|px| px as f64)
            }
            _ => None,
        },
        _ => None,
    }
}

/// Declared area of an element, or 1 when it cannot be estimated.
pub fn visual_weight(style: &str) -> f64 {
    match inline_dimensions(style) {
        (Some(w), Some(h)) if w * h > 0.0 && (w * h).is_finite() => w * h,
        _ => 1.0,
    }
}

/// One sample per color declaration in inline styles, weighted by the
/// declaring element's area. Undecodable tokens are kept with `hue: None`.
pub fn color_samples(tree: &ParsedTree) -> Vec<ColorSample> {
    let mut samples = Vec::new();
    for style in inline_styles(tree) {
        let tokens = color_tokens(&style);
        if tokens.is_empty() {
            continue;
        }
        let weight = visual_weight(&style);
        for token in tokens {
            samples.push(ColorSample::from_token(&token, weight));
        }
    }
    samples
}

pub fn semantic_tags_used(tree: &ParsedTree) -> BTreeSet<&'static str> {
    tree.elements()
        .filter_map(|el| {
            SEMANTIC_LANDMARKS
                .iter()
                .copied()
                .find(|landmark| el.is(landmark))
        })
        .collect()
}

pub fn semantic_element_count(tree: &ParsedTree) -> usize {
    tree.find_all(&SEMANTIC_LANDMARKS).len()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormInputs {
    pub total: usize,
    pub missing_id: usize,
}

/// `<input>` elements inside a `<form>`; an id counts only when non-blank.
///
/// Nesting is taken from the parsed tree. A `<form>` opened directly inside
/// `<table>` is left empty by the HTML parser and its inputs are hoisted out,
/// so they are not counted.
pub fn form_inputs(tree: &ParsedTree) -> FormInputs {
    let mut out = FormInputs::default();
    for input in tree.find_all(&["input"]) {
        if !input.has_ancestor("form") {
            continue;
        }
        out.total += 1;
        if !input.has_value("id") {
            out.missing_id += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-6
    }

    #[test]
    fn fixed_lengths_count_every_numeric_unit() {
        assert_eq!(count_fixed_lengths("width: 100px; height: 2PT; margin: 1cm 3mm"), 4);
        assert_eq!(count_fixed_lengths("width: 50%; font-size: 1.2rem"), 0);
        // A bare unit with no number is not a length.
        assert_eq!(count_fixed_lengths("content: 'px'"), 0);
    }

    #[test]
    fn px_counting_is_plain_substring() {
        assert_eq!(count_px("a { margin: 4px 2px } b { padding: 0 }"), 2);
        assert_eq!(count_px(""), 0);
    }

    #[test]
    fn responsive_units_report_presence_only() {
        assert_eq!(responsive_units_present("width:%;%;%;%"), vec!["%"]);
        assert_eq!(
            responsive_units_present("width: 100vw; height: 50vh"),
            vec!["vw", "vh"]
        );
        // `rem` necessarily also contains `em`.
        assert_eq!(responsive_units_present("1rem"), vec!["em", "rem"]);
    }

    #[test]
    fn color_tokens_only_from_named_properties() {
        let tokens = color_tokens(
            "Background-Color: #FFF; border-color: rgb(1, 2, 3) !important; color:#000; outline-color: #123; fill: red",
        );
        assert_eq!(tokens, vec!["#fff", "rgb(1, 2, 3)", "#000"]);
    }

    #[test]
    fn border_color_is_not_double_counted() {
        assert_eq!(color_tokens("border-color: #abc"), vec!["#abc"]);
    }

    #[test]
    fn inline_dimensions_use_absolute_lengths() {
        let (w, h) = inline_dimensions("width: 200px; height: 50px; color: red");
        assert!(approx_eq(w.expect("width"), 200.0));
        assert!(approx_eq(h.expect("height"), 50.0));

        let (w, h) = inline_dimensions("width: 50%; height: auto");
        assert!(w.is_none() && h.is_none());
    }

    #[test]
    fn visual_weight_defaults_to_one() {
        assert!(approx_eq(visual_weight("width: 10px; height: 20px"), 200.0));
        assert_eq!(visual_weight("width: 10px"), 1.0);
        assert_eq!(visual_weight("width: 0px; height: 20px"), 1.0);
        assert_eq!(visual_weight(":::not css"), 1.0);
    }

    #[test]
    fn color_samples_weight_by_declaring_element() {
        let tree = ParsedTree::parse(
            r##"
            <html><body>
              <div style="background-color: #ff0000; width: 10px; height: 10px">a</div>
              <p style="color: tomato">b</p>
              <span style="margin: 0">c</span>
            </body></html>
            "##,
        )
        .expect("parse");
        let samples = color_samples(&tree);
        assert_eq!(samples.len(), 2);
        assert!(approx_eq(samples[0].weight, 100.0));
        assert!(samples[0].is_decoded());
        assert_eq!(samples[1].weight, 1.0);
        assert!(!samples[1].is_decoded());
    }

    #[test]
    fn semantic_tags_are_distinct() {
        let tree = ParsedTree::parse(
            r##"<html><body><section></section><section></section><nav></nav></body></html>"##,
        )
        .expect("parse");
        let used = semantic_tags_used(&tree);
        assert_eq!(used.into_iter().collect::<Vec<_>>(), vec!["nav", "section"]);
        assert_eq!(semantic_element_count(&tree), 3);
    }

    #[test]
    fn form_directly_in_table_loses_its_inputs() {
        let tree = ParsedTree::parse(
            r##"<html><body><table><form><tr><td><input><input></td></tr></form></table></body></html>"##,
        )
        .expect("parse");
        assert_eq!(tree.count("input"), 2);
        assert_eq!(form_inputs(&tree), FormInputs::default());
    }

    #[test]
    fn only_inputs_inside_forms_are_counted() {
        let tree = ParsedTree::parse(
            r##"
            <html><body>
              <form>
                <input id="a"><input><input id="  ">
              </form>
              <input>
            </body></html>
            "##,
        )
        .expect("parse");
        assert_eq!(
            form_inputs(&tree),
            FormInputs {
                total: 3,
                missing_id: 2
            }
        );
    }
}
