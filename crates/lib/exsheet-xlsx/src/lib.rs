//! Workbook encoding for exsheet.
//!
//! Serializes a tabular document into a minimal SpreadsheetML workbook: the
//! standard container parts plus one worksheet whose cells are inline
//! strings, one per row in column A. Cell text is written verbatim (markup
//! included) with XML escaping applied by the event writer.

use std::{error::Error, fmt, io::Cursor, io::Write};

use exsheet_core::{EncodeError, TabularDocument, WorkbookEncoder};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// SpreadsheetML worksheet row cap.
pub const XLSX_MAX_ROWS: usize = 1_048_576;

const SPREADSHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
    r#"</Types>"#,
);

const ROOT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    r#"</Relationships>"#,
);

const WORKBOOK_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>"#,
    r#"</Relationships>"#,
);

/// Error type for workbook encoding failures.
#[derive(Debug)]
pub enum XlsxError {
    RowLimitExceeded { rows: usize, max: usize },
    Write(String),
}

impl fmt::Display for XlsxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RowLimitExceeded { rows, max } => {
                write!(f, "worksheet row limit exceeded: {rows} rows (max {max})")
            }
            Self::Write(message) => write!(f, "workbook write error: {message}"),
        }
    }
}

impl Error for XlsxError {}

/// Encoder from tabular documents to `.xlsx` bytes.
pub struct XlsxEncoder;

impl XlsxEncoder {
    /// Serializes the document into workbook bytes.
    ///
    /// # Errors
    /// Returns `XlsxError::RowLimitExceeded` when the document holds more
    /// rows than a worksheet allows, or `XlsxError::Write` when the container
    /// cannot be assembled.
    pub fn encode_document(document: &TabularDocument) -> Result<Vec<u8>, XlsxError> {
        if document.row_count() > XLSX_MAX_ROWS {
            return Err(XlsxError::RowLimitExceeded {
                rows: document.row_count(),
                max: XLSX_MAX_ROWS,
            });
        }

        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut archive = ZipWriter::new(Cursor::new(Vec::new()));

        write_part(&mut archive, options, "[Content_Types].xml", CONTENT_TYPES.as_bytes())?;
        write_part(&mut archive, options, "_rels/.rels", ROOT_RELS.as_bytes())?;
        write_part(
            &mut archive,
            options,
            "xl/workbook.xml",
            &workbook_xml(&document.sheet_name)?,
        )?;
        write_part(
            &mut archive,
            options,
            "xl/_rels/workbook.xml.rels",
            WORKBOOK_RELS.as_bytes(),
        )?;
        write_part(
            &mut archive,
            options,
            "xl/worksheets/sheet1.xml",
            &sheet_xml(document)?,
        )?;

        let cursor = archive.finish().map_err(write_error)?;
        Ok(cursor.into_inner())
    }
}

impl WorkbookEncoder for XlsxEncoder {
    fn encode(&self, document: &TabularDocument) -> Result<Vec<u8>, EncodeError> {
        Self::encode_document(document).map_err(|err| EncodeError::new(err.to_string()))
    }
}

fn write_part(
    archive: &mut ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    name: &str,
    payload: &[u8],
) -> Result<(), XlsxError> {
    archive.start_file(name, options).map_err(write_error)?;
    archive.write_all(payload).map_err(write_error)?;
    Ok(())
}

fn workbook_xml(sheet_name: &str) -> Result<Vec<u8>, XlsxError> {
    let mut writer = Writer::new(Vec::new());

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(write_error)?;

    let mut workbook = BytesStart::new("workbook");
    workbook.push_attribute(("xmlns", SPREADSHEET_NS));
    workbook.push_attribute(("xmlns:r", RELATIONSHIPS_NS));
    writer
        .write_event(Event::Start(workbook))
        .map_err(write_error)?;
    writer
        .write_event(Event::Start(BytesStart::new("sheets")))
        .map_err(write_error)?;

    let mut sheet = BytesStart::new("sheet");
    sheet.push_attribute(("name", sheet_name));
    sheet.push_attribute(("sheetId", "1"));
    sheet.push_attribute(("r:id", "rId1"));
    writer
        .write_event(Event::Empty(sheet))
        .map_err(write_error)?;

    writer
        .write_event(Event::End(BytesEnd::new("sheets")))
        .map_err(write_error)?;
    writer
        .write_event(Event::End(BytesEnd::new("workbook")))
        .map_err(write_error)?;

    Ok(writer.into_inner())
}

fn sheet_xml(document: &TabularDocument) -> Result<Vec<u8>, XlsxError> {
    let mut writer = Writer::new(Vec::new());

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(write_error)?;

    let mut worksheet = BytesStart::new("worksheet");
    worksheet.push_attribute(("xmlns", SPREADSHEET_NS));
    writer
        .write_event(Event::Start(worksheet))
        .map_err(write_error)?;
    writer
        .write_event(Event::Start(BytesStart::new("sheetData")))
        .map_err(write_error)?;

    for (index, row) in document.rows.iter().enumerate() {
        let reference = index + 1;

        let mut row_element = BytesStart::new("row");
        row_element.push_attribute(("r", reference.to_string().as_str()));
        writer
            .write_event(Event::Start(row_element))
            .map_err(write_error)?;

        let mut cell = BytesStart::new("c");
        cell.push_attribute(("r", format!("A{reference}").as_str()));
        cell.push_attribute(("t", "inlineStr"));
        writer
            .write_event(Event::Start(cell))
            .map_err(write_error)?;
        writer
            .write_event(Event::Start(BytesStart::new("is")))
            .map_err(write_error)?;

        // Fragment markup often carries leading/trailing whitespace worth keeping.
        let mut text = BytesStart::new("t");
        text.push_attribute(("xml:space", "preserve"));
        writer
            .write_event(Event::Start(text))
            .map_err(write_error)?;
        writer
            .write_event(Event::Text(BytesText::new(&row.cell)))
            .map_err(write_error)?;
        writer
            .write_event(Event::End(BytesEnd::new("t")))
            .map_err(write_error)?;

        writer
            .write_event(Event::End(BytesEnd::new("is")))
            .map_err(write_error)?;
        writer
            .write_event(Event::End(BytesEnd::new("c")))
            .map_err(write_error)?;
        writer
            .write_event(Event::End(BytesEnd::new("row")))
            .map_err(write_error)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("sheetData")))
        .map_err(write_error)?;
    writer
        .write_event(Event::End(BytesEnd::new("worksheet")))
        .map_err(write_error)?;

    Ok(writer.into_inner())
}

fn write_error(err: impl fmt::Display) -> XlsxError {
    XlsxError::Write(err.to_string())
}
