//! Extraction core for exsheet.
//!
//! This crate owns the explanation data model, the label scanner that pulls
//! explanation blocks out of converted markup, the projector that maps them
//! onto spreadsheet rows, and the pipeline seams the service layer plugs its
//! conversion and encoding collaborators into.

pub mod extract;
pub mod models;
pub mod pipeline;
pub mod project;

pub use extract::ExplanationExtractor;
pub use models::{ExplanationFragment, SHEET_EXPLANATIONS, SheetRow, TabularDocument};
pub use pipeline::{
    ConvertError,
    EncodeError,
    ExtractionPipeline,
    MarkupSource,
    PipelineError,
    PipelineOutput,
    WorkbookEncoder,
};
pub use project::RowProjector;
