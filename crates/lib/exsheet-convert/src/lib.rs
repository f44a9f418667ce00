//! Word-to-markup conversion for exsheet.
//!
//! Reads the `word/document.xml` part out of a `.docx` container and renders
//! the WordprocessingML tree into the HTML-like markup stream the extraction
//! core scans. Paragraphs become `<p>` blocks, run formatting becomes
//! `<b>`/`<i>`/`<u>` wrappers, and tables keep their row/cell structure.

use std::{error::Error, fmt, fs::File, io::Read, path::Path};

use exsheet_core::{ConvertError, MarkupSource};
use roxmltree::{Document, Node};
use tracing::debug;
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";

/// Error type for Word conversion failures.
#[derive(Debug)]
pub struct DocxConvertError {
    message: String,
}

impl DocxConvertError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for DocxConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "docx conversion error: {}", self.message)
    }
}

impl Error for DocxConvertError {}

impl From<roxmltree::Error> for DocxConvertError {
    fn from(err: roxmltree::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<zip::result::ZipError> for DocxConvertError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<std::io::Error> for DocxConvertError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<tokio::task::JoinError> for DocxConvertError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::new(err.to_string())
    }
}

/// Converter from Word documents to HTML-like markup.
pub struct DocxMarkupConverter;

impl DocxMarkupConverter {
    /// Converts a `.docx` file into markup.
    ///
    /// # Errors
    /// Returns `DocxConvertError` if the container cannot be opened, lacks a
    /// `word/document.xml` part, or carries malformed XML.
    pub fn convert_file(path: impl AsRef<Path>) -> Result<String, DocxConvertError> {
        let xml = read_document_part(path.as_ref())?;
        Self::convert_xml(&xml)
    }

    /// Converts the `word/document.xml` payload of a Word file.
    ///
    /// # Errors
    /// Returns `DocxConvertError` if the XML is malformed or has no `body`.
    pub fn convert_xml(xml: &str) -> Result<String, DocxConvertError> {
        let doc = Document::parse(xml)?;
        let body = doc
            .descendants()
            .find(|node| node.has_tag_name("body"))
            .ok_or_else(|| DocxConvertError::new("document has no body element"))?;

        let mut markup = String::new();
        render_blocks(body, &mut markup);
        debug!(markup_len = markup.len(), "converted document part");
        Ok(markup)
    }

    /// Converts a file asynchronously using a blocking task.
    ///
    /// # Errors
    /// Returns `DocxConvertError` if conversion fails or the task panics.
    pub async fn convert_file_async(path: impl AsRef<Path>) -> Result<String, DocxConvertError> {
        let path = path.as_ref().to_path_buf();
        tokio::task::spawn_blocking(move || Self::convert_file(path)).await?
    }
}

impl MarkupSource for DocxMarkupConverter {
    fn markup_from_file(&self, path: &Path) -> Result<String, ConvertError> {
        Self::convert_file(path).map_err(|err| ConvertError::new(err.to_string()))
    }
}

fn read_document_part(path: &Path) -> Result<String, DocxConvertError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut entry = archive
        .by_name(DOCUMENT_PART)
        .map_err(|_| DocxConvertError::new(format!("missing {DOCUMENT_PART} entry")))?;

    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(xml)
}

fn render_blocks(parent: Node<'_, '_>, out: &mut String) {
    for child in parent.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "p" => render_paragraph(child, out),
            "tbl" => render_table(child, out),
            "pPr" | "sectPr" => {}
            _ => render_blocks(child, out),
        }
    }
}

fn render_paragraph(node: Node<'_, '_>, out: &mut String) {
    out.push_str("<p>");
    render_inline(node, out);
    out.push_str("</p>");
}

fn render_inline(node: Node<'_, '_>, out: &mut String) {
    for child in node.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "r" => render_run(child, out),
            "pPr" | "rPr" => {}
            _ => render_inline(child, out),
        }
    }
}

fn render_run(run: Node<'_, '_>, out: &mut String) {
    let mut text = String::new();
    for child in run.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "t" => push_escaped(child.text().unwrap_or(""), &mut text),
            "br" => text.push_str("<br/>"),
            "tab" => text.push(' '),
            _ => {}
        }
    }
    if text.is_empty() {
        return;
    }

    let properties = run
        .children()
        .filter(Node::is_element)
        .find(|node| node.has_tag_name("rPr"));
    let bold = properties.is_some_and(|rpr| flag_enabled(rpr, "b"));
    let italic = properties.is_some_and(|rpr| flag_enabled(rpr, "i"));
    let underline = properties.is_some_and(|rpr| flag_enabled(rpr, "u"));

    if bold {
        out.push_str("<b>");
    }
    if italic {
        out.push_str("<i>");
    }
    if underline {
        out.push_str("<u>");
    }
    out.push_str(&text);
    if underline {
        out.push_str("</u>");
    }
    if italic {
        out.push_str("</i>");
    }
    if bold {
        out.push_str("</b>");
    }
}

fn render_table(node: Node<'_, '_>, out: &mut String) {
    out.push_str("<table>");
    for row in node
        .children()
        .filter(|child| child.has_tag_name("tr"))
    {
        out.push_str("<tr>");
        for cell in row.children().filter(|child| child.has_tag_name("tc")) {
            out.push_str("<td>");
            render_blocks(cell, out);
            out.push_str("</td>");
        }
        out.push_str("</tr>");
    }
    out.push_str("</table>");
}

// Run toggle properties may carry an explicit off value, e.g. <w:b w:val="0"/>.
fn flag_enabled(properties: Node<'_, '_>, name: &str) -> bool {
    let Some(flag) = properties
        .children()
        .filter(Node::is_element)
        .find(|node| node.tag_name().name() == name)
    else {
        return false;
    };
    let value = flag
        .attributes()
        .find(|attribute| attribute.name() == "val")
        .map(|attribute| attribute.value());
    !matches!(value, Some("false" | "0" | "none"))
}

fn push_escaped(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use super::*;

    const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    fn wrap_body(body: &str) -> String {
        format!(r#"<w:document xmlns:w="{W_NS}"><w:body>{body}</w:body></w:document>"#)
    }

    #[test]
    fn wraps_paragraph_text() {
        let xml = wrap_body("<w:p><w:r><w:t>Hello there</w:t></w:r></w:p>");

        let markup = DocxMarkupConverter::convert_xml(&xml).expect("conversion should succeed");

        assert_eq!(markup, "<p>Hello there</p>");
    }

    #[test]
    fn renders_empty_paragraphs() {
        let xml = wrap_body("<w:p/><w:p><w:r><w:t>next</w:t></w:r></w:p>");

        let markup = DocxMarkupConverter::convert_xml(&xml).expect("conversion should succeed");

        assert_eq!(markup, "<p></p><p>next</p>");
    }

    #[test]
    fn escapes_markup_characters() {
        let xml = wrap_body("<w:p><w:r><w:t>a &lt; b &amp; \"c\"</w:t></w:r></w:p>");

        let markup = DocxMarkupConverter::convert_xml(&xml).expect("conversion should succeed");

        assert_eq!(markup, "<p>a &lt; b &amp; &quot;c&quot;</p>");
    }

    #[test]
    fn wraps_formatted_runs() {
        let xml = wrap_body(
            "<w:p>\
             <w:r><w:rPr><w:b/></w:rPr><w:t>bold</w:t></w:r>\
             <w:r><w:rPr><w:i/><w:u w:val=\"single\"/></w:rPr><w:t>both</w:t></w:r>\
             </w:p>",
        );

        let markup = DocxMarkupConverter::convert_xml(&xml).expect("conversion should succeed");

        assert_eq!(markup, "<p><b>bold</b><i><u>both</u></i></p>");
    }

    #[test]
    fn honors_explicit_toggle_off() {
        let xml = wrap_body(
            "<w:p><w:r><w:rPr><w:b w:val=\"0\"/></w:rPr><w:t>plain</w:t></w:r></w:p>",
        );

        let markup = DocxMarkupConverter::convert_xml(&xml).expect("conversion should succeed");

        assert_eq!(markup, "<p>plain</p>");
    }

    #[test]
    fn renders_breaks_and_tabs() {
        let xml = wrap_body(
            "<w:p><w:r><w:t>one</w:t><w:br/><w:t>two</w:t><w:tab/><w:t>three</w:t></w:r></w:p>",
        );

        let markup = DocxMarkupConverter::convert_xml(&xml).expect("conversion should succeed");

        assert_eq!(markup, "<p>one<br/>two three</p>");
    }

    #[test]
    fn renders_tables_with_cell_paragraphs() {
        let xml = wrap_body(
            "<w:tbl><w:tr>\
             <w:tc><w:p><w:r><w:t>A</w:t></w:r></w:p></w:tc>\
             <w:tc><w:p><w:r><w:t>B</w:t></w:r></w:p></w:tc>\
             </w:tr></w:tbl>",
        );

        let markup = DocxMarkupConverter::convert_xml(&xml).expect("conversion should succeed");

        assert_eq!(
            markup,
            "<table><tr><td><p>A</p></td><td><p>B</p></td></tr></table>"
        );
    }

    #[test]
    fn descends_through_hyperlinks() {
        let xml = wrap_body(
            "<w:p><w:hyperlink><w:r><w:t>linked text</w:t></w:r></w:hyperlink></w:p>",
        );

        let markup = DocxMarkupConverter::convert_xml(&xml).expect("conversion should succeed");

        assert_eq!(markup, "<p>linked text</p>");
    }

    #[test]
    fn rejects_documents_without_a_body() {
        let xml = format!(r#"<w:document xmlns:w="{W_NS}"/>"#);

        let err = DocxMarkupConverter::convert_xml(&xml).expect_err("conversion should fail");

        assert!(err.to_string().contains("no body"));
    }

    #[test]
    fn converts_a_full_container() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("upload.docx");

        let document = wrap_body(
            "<w:p><w:r><w:t>Explanation: stored in a real container</w:t></w:r></w:p>",
        );
        let file = File::create(&path).expect("container file should be created");
        let mut writer = ZipWriter::new(file);
        writer
            .start_file(DOCUMENT_PART, SimpleFileOptions::default())
            .expect("entry should start");
        writer
            .write_all(document.as_bytes())
            .expect("entry should be written");
        writer.finish().expect("container should be finished");

        let markup = DocxMarkupConverter::convert_file(&path).expect("conversion should succeed");

        assert_eq!(markup, "<p>Explanation: stored in a real container</p>");
    }

    #[test]
    fn rejects_containers_without_document_part() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("empty.docx");

        let file = File::create(&path).expect("container file should be created");
        let mut writer = ZipWriter::new(file);
        writer
            .start_file("word/styles.xml", SimpleFileOptions::default())
            .expect("entry should start");
        writer.write_all(b"<w/>").expect("entry should be written");
        writer.finish().expect("container should be finished");

        let err = DocxMarkupConverter::convert_file(&path).expect_err("conversion should fail");

        assert!(err.to_string().contains(DOCUMENT_PART));
    }
}
