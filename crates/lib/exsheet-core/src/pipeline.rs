use std::{error::Error, fmt, path::Path};

use tracing::debug;

use crate::extract::ExplanationExtractor;
use crate::models::TabularDocument;
use crate::project::RowProjector;

/// Failure from the inbound markup collaborator.
#[derive(Debug)]
pub struct ConvertError {
    message: String,
}

impl ConvertError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "document conversion failed: {}", self.message)
    }
}

impl Error for ConvertError {}

/// Failure from the outbound workbook collaborator.
#[derive(Debug)]
pub struct EncodeError {
    message: String,
}

impl EncodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "workbook encoding failed: {}", self.message)
    }
}

impl Error for EncodeError {}

/// Error type for a full pipeline run.
#[derive(Debug)]
pub enum PipelineError {
    Convert(ConvertError),
    Encode(EncodeError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Convert(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PipelineError {}

impl From<ConvertError> for PipelineError {
    fn from(err: ConvertError) -> Self {
        Self::Convert(err)
    }
}

impl From<EncodeError> for PipelineError {
    fn from(err: EncodeError) -> Self {
        Self::Encode(err)
    }
}

/// Inbound collaborator: turns an uploaded document file into converted
/// markup.
pub trait MarkupSource {
    /// # Errors
    /// Returns `ConvertError` when the file cannot be converted.
    fn markup_from_file(&self, path: &Path) -> Result<String, ConvertError>;
}

/// Outbound collaborator: serializes a tabular document into workbook bytes.
pub trait WorkbookEncoder {
    /// # Errors
    /// Returns `EncodeError` when the document cannot be serialized.
    fn encode(&self, document: &TabularDocument) -> Result<Vec<u8>, EncodeError>;
}

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub workbook: Vec<u8>,
    pub fragment_count: usize,
}

/// Chains conversion, extraction, projection, and encoding for one request.
///
/// Holds no mutable state; a single instance is shared across requests.
pub struct ExtractionPipeline<S, E> {
    source: S,
    encoder: E,
}

impl<S, E> ExtractionPipeline<S, E>
where
    S: MarkupSource,
    E: WorkbookEncoder,
{
    pub const fn new(source: S, encoder: E) -> Self {
        Self { source, encoder }
    }

    /// Runs the document-to-workbook flow for one uploaded file.
    ///
    /// # Errors
    /// Returns `PipelineError` when either collaborator fails. Extraction and
    /// projection are total; a document without labels still produces a
    /// workbook, with zero rows.
    pub fn run_file(&self, path: &Path) -> Result<PipelineOutput, PipelineError> {
        let markup = self.source.markup_from_file(path)?;
        self.run_markup(&markup)
    }

    /// Runs extraction onward over already-converted markup.
    ///
    /// # Errors
    /// Returns `PipelineError::Encode` when the workbook collaborator fails.
    pub fn run_markup(&self, markup: &str) -> Result<PipelineOutput, PipelineError> {
        let fragments = ExplanationExtractor::extract(markup);
        let fragment_count = fragments.len();
        debug!(fragment_count, "extracted explanation blocks");

        let document = RowProjector::project(fragments);
        let workbook = self.encoder.encode(&document)?;

        Ok(PipelineOutput {
            workbook,
            fragment_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct FixedSource(Result<String, String>);

    impl MarkupSource for FixedSource {
        fn markup_from_file(&self, _path: &Path) -> Result<String, ConvertError> {
            self.0.clone().map_err(ConvertError::new)
        }
    }

    struct RecordingEncoder {
        seen: Mutex<Option<TabularDocument>>,
        fail: bool,
    }

    impl RecordingEncoder {
        fn new(fail: bool) -> Self {
            Self {
                seen: Mutex::new(None),
                fail,
            }
        }
    }

    impl WorkbookEncoder for RecordingEncoder {
        fn encode(&self, document: &TabularDocument) -> Result<Vec<u8>, EncodeError> {
            *self.seen.lock().expect("encoder mutex poisoned") = Some(document.clone());
            if self.fail {
                Err(EncodeError::new("row limit exceeded"))
            } else {
                Ok(b"workbook".to_vec())
            }
        }
    }

    #[test]
    fn runs_markup_through_both_components() {
        let source = FixedSource(Ok(
            "<p>Explanation: one</p><p>noise</p><p>Explanation: two</p>".to_string(),
        ));
        let pipeline = ExtractionPipeline::new(source, RecordingEncoder::new(false));

        let output = pipeline
            .run_file(Path::new("upload.docx"))
            .expect("pipeline should succeed");

        assert_eq!(output.fragment_count, 2);
        assert_eq!(output.workbook, b"workbook");

        let document = pipeline
            .encoder
            .seen
            .lock()
            .expect("encoder mutex poisoned")
            .clone()
            .expect("encoder should have been called");
        assert_eq!(document.row_count(), 2);
        assert_eq!(document.rows[0].cell, "Explanation: one</p>");
        assert_eq!(document.rows[1].cell, "Explanation: two</p>");
    }

    #[test]
    fn empty_markup_still_encodes_an_empty_document() {
        let source = FixedSource(Ok("<p>no labels</p>".to_string()));
        let pipeline = ExtractionPipeline::new(source, RecordingEncoder::new(false));

        let output = pipeline
            .run_file(Path::new("upload.docx"))
            .expect("pipeline should succeed");

        assert_eq!(output.fragment_count, 0);
        let document = pipeline
            .encoder
            .seen
            .lock()
            .expect("encoder mutex poisoned")
            .clone()
            .expect("encoder should have been called");
        assert!(document.is_empty());
    }

    #[test]
    fn conversion_failure_aborts_before_encoding() {
        let source = FixedSource(Err("corrupt container".to_string()));
        let pipeline = ExtractionPipeline::new(source, RecordingEncoder::new(false));

        let err = pipeline
            .run_file(Path::new("upload.docx"))
            .expect_err("pipeline should fail");

        assert!(matches!(err, PipelineError::Convert(_)));
        assert!(
            pipeline
                .encoder
                .seen
                .lock()
                .expect("encoder mutex poisoned")
                .is_none(),
            "encoder must not run after a conversion failure"
        );
    }

    #[test]
    fn encoding_failure_surfaces_as_encode_error() {
        let source = FixedSource(Ok("<p>Explanation: x</p>".to_string()));
        let pipeline = ExtractionPipeline::new(source, RecordingEncoder::new(true));

        let err = pipeline
            .run_file(Path::new("upload.docx"))
            .expect_err("pipeline should fail");

        assert!(matches!(err, PipelineError::Encode(_)));
        assert!(err.to_string().contains("row limit exceeded"));
    }
}
