use crate::html::ParsedTree;

/// Everything a rule may look at for one document.
pub struct ScoringContext<'a> {
    pub doc_id: usize,
    pub text: &'a str,
    pub lower: String,
    pub tree: ParsedTree,
}

impl<'a> ScoringContext<'a> {
    pub fn new(doc_id: usize, text: &'a str, tree: ParsedTree) -> Self {
        Self {
            doc_id,
            text,
            lower: text.to_lowercase(),
            tree,
        }
    }
}
