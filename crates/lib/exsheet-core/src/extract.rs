use std::sync::LazyLock;

use regex::Regex;

use crate::models::ExplanationFragment;

/// Label, shortest interior run, nearest closing paragraph tag.
static EXPLANATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)Explanation:.*?</p>").expect("explanation pattern compiles"));

/// Scanner for labeled explanation blocks in converted markup.
pub struct ExplanationExtractor;

impl ExplanationExtractor {
    /// Collects every labeled explanation block, in document order.
    ///
    /// The `Explanation:` label is matched literally and case-sensitively.
    /// The interior match is non-greedy and spans line breaks: a block ends
    /// at the nearest `</p>` after its label, so an explanation containing
    /// nested paragraph markup is truncated at the first inner closing tag.
    /// This truncation is a known limitation kept for compatibility with
    /// documents produced against the existing behavior.
    ///
    /// Matches never overlap; scanning resumes after each match end. A label
    /// with no later `</p>` anywhere in the document yields no fragment, and
    /// a document without labels yields an empty sequence.
    #[must_use]
    pub fn extract(markup: &str) -> Vec<ExplanationFragment> {
        EXPLANATION_RE
            .find_iter(markup)
            .map(|found| ExplanationFragment::new(found.as_str()))
            .collect()
    }
}
