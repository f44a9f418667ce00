use serde::{Deserialize, Serialize};

/// Sheet name carried by every tabular document the row projector builds.
pub const SHEET_EXPLANATIONS: &str = "Explanations";

/// One matched explanation span.
///
/// Holds the raw markup between a recognized label and its closing paragraph
/// boundary, inclusive of both. Inner tags are kept verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExplanationFragment {
    pub markup: String,
}

impl ExplanationFragment {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.markup
    }
}

/// A single-cell spreadsheet row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SheetRow {
    pub cell: String,
}

/// In-memory row structure handed to a workbook encoder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TabularDocument {
    pub sheet_name: String,
    pub rows: Vec<SheetRow>,
}

impl TabularDocument {
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
