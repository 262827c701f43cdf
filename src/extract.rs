//! Best-effort plain-text extraction for uploaded documents.
//!
//! The format is chosen from the file extension. Every per-format failure
//! degrades to a lossy UTF-8 decode of the raw bytes instead of aborting —
//! extraction is never a hard failure point; only an unreadable file is.
//! Callers can distinguish clean extraction from the fallback via
//! [`ExtractionOutcome`].

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb
/// protection for DOCX archives).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Document format inferred from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Image,
    PlainText,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => DocumentFormat::Pdf,
            "docx" | "doc" => DocumentFormat::Docx,
            "png" | "jpg" | "jpeg" => DocumentFormat::Image,
            _ => DocumentFormat::PlainText,
        }
    }

    /// Best-effort MIME type for the format, used as document metadata.
    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "application/pdf",
            DocumentFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentFormat::Image => "image/*",
            DocumentFormat::PlainText => "text/plain",
        }
    }
}

/// Whether the format-specific extractor succeeded or the raw-text
/// fallback was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Native,
    Fallback,
}

/// Extracted text plus how it was obtained.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub text: String,
    pub format: DocumentFormat,
    pub outcome: ExtractionOutcome,
}

/// Per-format extraction error. Internal — callers of [`extract_text`]
/// only ever see the fallback, not these.
#[derive(Debug)]
enum ExtractError {
    Pdf(String),
    Ooxml(String),
    Ocr(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Ooxml(e) => write!(f, "OOXML extraction failed: {}", e),
            ExtractError::Ocr(e) => write!(f, "OCR extraction failed: {}", e),
        }
    }
}

/// Extract plain text from a file, degrading to a lossy raw decode on any
/// format-specific failure. Only failing to read the file itself is a hard
/// error.
pub fn extract_text(path: &Path) -> Result<Extraction> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read uploaded file: {}", path.display()))?;
    let format = DocumentFormat::from_path(path);

    let native = match format {
        DocumentFormat::Pdf => extract_pdf(&bytes),
        DocumentFormat::Docx => extract_docx(&bytes),
        DocumentFormat::Image => extract_image(path),
        DocumentFormat::PlainText => Ok(lossy_decode(&bytes)),
    };

    match native {
        Ok(text) => Ok(Extraction {
            text,
            format,
            outcome: ExtractionOutcome::Native,
        }),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "extraction failed, using raw-text fallback");
            Ok(Extraction {
                text: lossy_decode(&bytes),
                format,
                outcome: ExtractionOutcome::Fallback,
            })
        }
    }
}

/// Decode bytes as UTF-8, replacing undecodable sequences.
fn lossy_decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;

    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Ooxml(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }

    extract_paragraph_text(&doc_xml)
}

/// Collect `w:t` runs in document order, emitting a newline at each
/// paragraph (`w:p`) boundary.
fn extract_paragraph_text(xml: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        out.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"p" && !out.ends_with('\n') && !out.is_empty() {
                    out.push('\n');
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out.trim_end().to_string())
}

#[cfg(feature = "ocr")]
fn extract_image(path: &Path) -> Result<String, ExtractError> {
    let mut ocr = leptess::LepTess::new(None, "eng").map_err(|e| ExtractError::Ocr(e.to_string()))?;
    ocr.set_image(path)
        .map_err(|e| ExtractError::Ocr(e.to_string()))?;
    ocr.get_utf8_text().map_err(|e| ExtractError::Ocr(e.to_string()))
}

#[cfg(not(feature = "ocr"))]
fn extract_image(_path: &Path) -> Result<String, ExtractError> {
    Err(ExtractError::Ocr(
        "OCR support not compiled in (enable the `ocr` feature)".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn format_is_inferred_from_extension() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("a/report.PDF")),
            DocumentFormat::Pdf
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("notes.docx")),
            DocumentFormat::Docx
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("scan.jpeg")),
            DocumentFormat::Image
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("README")),
            DocumentFormat::PlainText
        );
    }

    #[test]
    fn plain_text_replaces_undecodable_bytes() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("raw.txt");
        std::fs::write(&path, b"hello \xff\xfe world").unwrap();

        let extraction = extract_text(&path).unwrap();
        assert_eq!(extraction.outcome, ExtractionOutcome::Native);
        assert!(extraction.text.starts_with("hello "));
        assert!(extraction.text.ends_with(" world"));
        assert!(extraction.text.contains('\u{FFFD}'));
    }

    #[test]
    fn invalid_pdf_falls_back_to_raw_decode() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf at all").unwrap();

        let extraction = extract_text(&path).unwrap();
        assert_eq!(extraction.format, DocumentFormat::Pdf);
        assert_eq!(extraction.outcome, ExtractionOutcome::Fallback);
        assert_eq!(extraction.text, "not a pdf at all");
    }

    #[test]
    fn docx_paragraphs_are_concatenated_in_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("doc.docx");

        let document_xml = r#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>First paragraph.</w:t></w:r></w:p>
    <w:p><w:r><w:t>Second paragraph.</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

        let file = std::fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file(
                "word/document.xml",
                zip::write::SimpleFileOptions::default(),
            )
            .unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        writer.finish().unwrap();

        let extraction = extract_text(&path).unwrap();
        assert_eq!(extraction.outcome, ExtractionOutcome::Native);
        assert_eq!(extraction.text, "First paragraph.\nSecond paragraph.");
    }

    #[test]
    fn invalid_zip_falls_back_for_docx() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, "just some words").unwrap();

        let extraction = extract_text(&path).unwrap();
        assert_eq!(extraction.outcome, ExtractionOutcome::Fallback);
        assert_eq!(extraction.text, "just some words");
    }

    #[cfg(not(feature = "ocr"))]
    #[test]
    fn image_without_ocr_falls_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, b"fake image bytes").unwrap();

        let extraction = extract_text(&path).unwrap();
        assert_eq!(extraction.format, DocumentFormat::Image);
        assert_eq!(extraction.outcome, ExtractionOutcome::Fallback);
    }

    #[test]
    fn missing_file_is_a_hard_error() {
        assert!(extract_text(Path::new("/nonexistent/file.txt")).is_err());
    }
}
