use crate::error::ScoreError;
use kuchiki::NodeRef;
use kuchiki::traits::TendrilSink;

/// Read-only view over a parsed document. Lives for one scoring call.
pub struct ParsedTree {
    document: NodeRef,
    element_count: usize,
}

/// One element of a `ParsedTree`.
#[derive(Clone)]
pub struct Element {
    node: NodeRef,
}

impl ParsedTree {
    /// Parses `text` tolerantly. The parser always supplies `html`, `head`
    /// and `body`, so the no-element error only guards trees built by a
    /// different parser; for real input this never fails.
    pub fn parse(text: &str) -> Result<Self, ScoreError> {
        let document = kuchiki::parse_html().one(text);
        let element_count = document
            .descendants()
            .filter(|node| node.as_element().is_some())
            .count();
        if element_count == 0 {
            return Err(ScoreError::Parse("document has no element root".to_string()));
        }
        Ok(Self {
            document,
            element_count,
        })
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }

    pub fn elements(&self) -> impl Iterator<Item = Element> + '_ {
        self.document
            .descendants()
            .filter(|node| node.as_element().is_some())
            .map(|node| Element { node })
    }

    pub fn find_first(&self, tag: &str) -> Option<Element> {
        self.elements().find(|el| el.is(tag))
    }

    pub fn find_all(&self, tags: &[&str]) -> Vec<Element> {
        self.elements().filter(|el| el.is_any(tags)).collect()
    }

    pub fn count(&self, tag: &str) -> usize {
        self.elements().filter(|el| el.is(tag)).count()
    }

    pub fn exists(&self, tags: &[&str]) -> bool {
        self.elements().any(|el| el.is_any(tags))
    }

    /// First `tag` element whose `attr` value satisfies `predicate`.
    pub fn find_with_attr(
        &self,
        tag: &str,
        attr: &str,
        predicate: impl Fn(&str) -> bool,
    ) -> Option<Element> {
        self.elements()
            .find(|el| el.is(tag) && el.attr(attr).is_some_and(|value| predicate(value.as_str())))
    }

    pub fn any_has_attr(&self, attr: &str) -> bool {
        self.elements().any(|el| el.has_attr(attr))
    }
}

impl Element {
    pub fn tag(&self) -> String {
        self.node
            .as_element()
            .map(|el| el.name.local.as_ref().to_ascii_lowercase())
            .unwrap_or_default()
    }

    pub fn is(&self, tag: &str) -> bool {
        self.node
            .as_element()
            .is_some_and(|el| el.name.local.as_ref().eq_ignore_ascii_case(tag))
    }

    pub fn is_any(&self, tags: &[&str]) -> bool {
        tags.iter().any(|tag| self.is(tag))
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        let element = self.node.as_element()?;
        let attrs = element.attributes.borrow();
        attrs.get(name).map(|value| value.to_string())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.node
            .as_element()
            .is_some_and(|el| el.attributes.borrow().contains(name))
    }

    /// Attribute present with a non-blank value.
    pub fn has_value(&self, name: &str) -> bool {
        self.attr(name).is_some_and(|value| !value.trim().is_empty())
    }

    pub fn text(&self) -> String {
        self.node.text_contents()
    }

    pub fn has_ancestor(&self, tag: &str) -> bool {
        self.node.ancestors().any(|ancestor| {
            ancestor
                .as_element()
                .is_some_and(|el| el.name.local.as_ref().eq_ignore_ascii_case(tag))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerates_unclosed_tags_and_missing_quotes() {
        let tree = ParsedTree::parse(
            r##"<html lang=en><body><div class=card><p>one<p>two<ul><li>a<li>b</body>"##,
        )
        .expect("tolerant parse");
        assert_eq!(tree.count("p"), 2);
        assert_eq!(tree.count("li"), 2);
        let div = tree.find_first("div").expect("div");
        assert_eq!(div.attr("class").as_deref(), Some("card"));
        let html = tree.find_first("html").expect("html");
        assert!(html.has_value("lang"));
    }

    #[test]
    fn parser_synthesizes_document_skeleton() {
        let tree = ParsedTree::parse("<html><body><p>x</p></body></html>").expect("parse");
        // html, head, body, p
        assert_eq!(tree.element_count(), 4);
        assert!(tree.exists(&["head"]));
    }

    #[test]
    fn parse_never_fails_on_text_input() {
        for text in ["", "plain words", "<<<>>>", "\u{0}"] {
            let tree = ParsedTree::parse(text).expect("synthesized skeleton");
            assert!(tree.element_count() >= 3, "{text:?}");
        }
    }

    #[test]
    fn attribute_predicate_lookup() {
        let tree = ParsedTree::parse(
            r##"
            <html>
              <head>
                <meta charset="utf-8">
                <meta name="viewport" content="width=device-width">
              </head>
              <body></body>
            </html>
            "##,
        )
        .expect("parse");
        let viewport = tree
            .find_with_attr("meta", "name", |v| v == "viewport")
            .expect("viewport meta");
        assert_eq!(viewport.attr("content").as_deref(), Some("width=device-width"));
        assert!(tree.find_with_attr("meta", "name", |v| v == "robots").is_none());
    }

    #[test]
    fn ancestry_and_text() {
        let tree = ParsedTree::parse(
            r##"<html><body><form><label>Name <input name="n"></label></form><input id="loose"></body></html>"##,
        )
        .expect("parse");
        let inputs = tree.find_all(&["input"]);
        assert_eq!(inputs.len(), 2);
        assert!(inputs[0].has_ancestor("form"));
        assert!(!inputs[1].has_ancestor("form"));
        let label = tree.find_first("label").expect("label");
        assert_eq!(label.text().trim(), "Name");
        assert_eq!(label.tag(), "label");
    }
}
