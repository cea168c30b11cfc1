use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};

use super::errors::CoreError;
use super::models::{Document, ExtractedText, MediaType};
use super::pdf::PdfTextExtractor;

pub struct ResumeTextExtractor {
    pdf_text_extractor: PdfTextExtractor,
}

impl ResumeTextExtractor {
    pub fn new(pdf_text_extractor: PdfTextExtractor) -> Self {
        Self { pdf_text_extractor }
    }

    /// Converts an uploaded document into trimmed plain text.
    pub fn extract(&self, document: Document) -> Result<ExtractedText, CoreError> {
        let Some(media_type) = MediaType::from_declared(&document.declared_type) else {
            warn!(declared = %document.declared_type, "rejecting unsupported document type");
            return Err(CoreError::UnsupportedFormat(document.declared_type));
        };

        let text = match media_type {
            MediaType::Pdf => self.pdf_text_extractor.extract_text(&document.data)?,
            MediaType::Docx => extract_docx_text(&document.data)?,
            MediaType::PlainText => decode_plain_text(document.data)?,
        };

        let text = text.trim().to_string();
        debug!(%media_type, chars = text.chars().count(), "extracted resume text");
        Ok(ExtractedText::new(text))
    }
}

impl Default for ResumeTextExtractor {
    fn default() -> Self {
        Self::new(PdfTextExtractor::new())
    }
}

fn decode_plain_text(data: Vec<u8>) -> Result<String, CoreError> {
    String::from_utf8(data).map_err(|err| {
        let e = err.utf8_error();
        CoreError::EncodingError(format!("invalid byte sequence at offset {}", e.valid_up_to()))
    })
}

fn extract_docx_text(data: &[u8]) -> Result<String, CoreError> {
    let cursor = Cursor::new(data);
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|err| CoreError::CorruptDocument(format!("not a DOCX container: {err}")))?;

    let mut document_file = archive
        .by_name("word/document.xml")
        .map_err(|err| CoreError::CorruptDocument(format!("missing word/document.xml: {err}")))?;
    let mut xml = String::new();
    document_file
        .read_to_string(&mut xml)
        .map_err(|err| CoreError::CorruptDocument(format!("unreadable document body: {err}")))?;

    read_paragraphs(&xml)
        .map(|paragraphs| paragraphs.join("\n"))
        .map_err(|err| CoreError::CorruptDocument(format!("malformed document XML: {err}")))
}

/// Paragraph texts in document order. Tabs and breaks inside a paragraph
/// become a tab and a space respectively.
fn read_paragraphs(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);

    let mut buf = Vec::new();
    let mut current = String::new();
    let mut paragraphs = Vec::new();
    let mut in_paragraph = false;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => {
                    in_paragraph = true;
                    current.clear();
                }
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(String::new()),
                b"w:tab" if in_paragraph => current.push('\t'),
                b"w:br" if in_paragraph => current.push(' '),
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:p" => {
                    paragraphs.push(current.trim_end().to_string());
                    current.clear();
                    in_paragraph = false;
                }
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Text(e) => {
                if in_paragraph && in_text {
                    current.push_str(&e.xml_content()?);
                }
            }
            Event::GeneralRef(e) => {
                if in_paragraph && in_text {
                    if let Some(ch) = e.resolve_char_ref()? {
                        current.push(ch);
                    } else {
                        let name = e.decode()?;
                        current.push_str(match name.as_ref() {
                            "amp" => "&",
                            "lt" => "<",
                            "gt" => ">",
                            "quot" => "\"",
                            "apos" => "'",
                            _ => "",
                        });
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }

        buf.clear();
    }

    Ok(paragraphs)
}
