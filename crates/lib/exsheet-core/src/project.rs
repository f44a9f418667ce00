use crate::models::{ExplanationFragment, SHEET_EXPLANATIONS, SheetRow, TabularDocument};

/// Maps an ordered fragment sequence onto single-column sheet rows.
pub struct RowProjector;

impl RowProjector {
    /// Builds the tabular document for a fragment sequence.
    ///
    /// One row per fragment, in input order, each row's sole cell holding the
    /// fragment markup verbatim. The document carries the `Explanations`
    /// sheet name.
    #[must_use]
    pub fn project(fragments: Vec<ExplanationFragment>) -> TabularDocument {
        let rows = fragments
            .into_iter()
            .map(|fragment| SheetRow {
                cell: fragment.markup,
            })
            .collect();

        TabularDocument {
            sheet_name: SHEET_EXPLANATIONS.to_string(),
            rows,
        }
    }
}
