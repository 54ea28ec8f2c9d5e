// src/services/text_extractor.rs
//! Plain-text extraction from stored resume files (PDF, DOC, DOCX)

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum TextExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Error extracting text: {0}")]
    ExtractionFailure(String),
}

/// Extract text from `file_path`, dispatching on the declared extension
///
/// Returns `Ok("")` for documents that contain no text; deciding whether
/// that is acceptable is left to the caller.
pub async fn extract(file_path: &Path, declared_extension: &str) -> Result<String, TextExtractionError> {
    let extension = declared_extension.trim().trim_start_matches('.').to_lowercase();
    if !matches!(extension.as_str(), "pdf" | "doc" | "docx") {
        return Err(TextExtractionError::UnsupportedFormat(extension));
    }

    let bytes = tokio::fs::read(file_path).await.map_err(|e| {
        TextExtractionError::ExtractionFailure(format!("{}: {}", file_path.display(), e))
    })?;

    // Both parsers are CPU-bound
    tokio::task::spawn_blocking(move || extract_from_bytes(&bytes, &extension))
        .await
        .map_err(|e| TextExtractionError::ExtractionFailure(format!("extraction task failed: {}", e)))?
}

/// Extension of a stored path, lower-cased, or empty
pub fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

pub fn extract_from_bytes(bytes: &[u8], extension: &str) -> Result<String, TextExtractionError> {
    match extension {
        "pdf" => extract_pdf_text(bytes),
        "doc" | "docx" => extract_docx_text(bytes),
        other => Err(TextExtractionError::UnsupportedFormat(other.to_string())),
    }
}

fn extract_pdf_text(bytes: &[u8]) -> Result<String, TextExtractionError> {
    // pdf-extract panics on some malformed inputs instead of returning an error
    let text = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| TextExtractionError::ExtractionFailure("PDF parser panicked".to_string()))?
        .map_err(|e| TextExtractionError::ExtractionFailure(format!("PDF extraction error: {}", e)))?;

    // Page breaks come through as form feeds
    Ok(text.replace('\u{c}', "\n").trim().to_string())
}

fn extract_docx_text(bytes: &[u8]) -> Result<String, TextExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
        TextExtractionError::ExtractionFailure(format!("Failed to open DOCX: {}", e))
    })?;

    let mut document_xml = archive.by_name("word/document.xml").map_err(|e| {
        TextExtractionError::ExtractionFailure(format!("Failed to find document.xml: {}", e))
    })?;

    let mut xml = String::new();
    document_xml.read_to_string(&mut xml).map_err(|e| {
        TextExtractionError::ExtractionFailure(format!("Failed to read document.xml: {}", e))
    })?;

    let paragraphs = parse_docx_paragraphs(&xml)?;
    Ok(paragraphs.join("\n").trim().to_string())
}

/// One entry per `w:p`, text runs concatenated in document order
fn parse_docx_paragraphs(xml: &str) -> Result<Vec<String>, TextExtractionError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_paragraph = false;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => {
                    in_paragraph = true;
                    current.clear();
                }
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) if in_paragraph => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"p" => {
                    paragraphs.push(std::mem::take(&mut current));
                    in_paragraph = false;
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                let decoded = e.unescape().map_err(|err| {
                    TextExtractionError::ExtractionFailure(format!("XML parsing error: {}", err))
                })?;
                current.push_str(&decoded);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TextExtractionError::ExtractionFailure(format!(
                    "XML parsing error: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// Builds minimal DOCX packages for tests
#[cfg(test)]
pub mod fixtures {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    pub fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>", p))
            .collect();
        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{}</w:body></w:document>",
            body
        );

        let mut buffer = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            writer
                .start_file("word/document.xml", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }
}
