// File Parsing Service
// Extracts plain text from .txt, .pdf and .docx uploads

use docx_rs::{DocumentChild, ParagraphChild, RunChild};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use tracing::{debug, info};

use super::calibration::InputLimits;
use super::errors::AnalysisError;
use super::text_processor::clean_extracted_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Txt,
    Pdf,
    Docx,
}

impl FileFormat {
    pub fn from_filename(filename: &str) -> Result<Self, AnalysisError> {
        let extension = Path::new(filename)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "txt" => Ok(Self::Txt),
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            _ => Err(AnalysisError::UnsupportedFileFormat { extension }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }
}

/// Extract and clean the text of an uploaded file.
pub fn extract_text(filename: &str, bytes: &[u8], limits: &InputLimits) -> Result<String, AnalysisError> {
    if bytes.len() > limits.max_file_bytes {
        return Err(AnalysisError::FileTooLarge {
            size: bytes.len(),
            max: limits.max_file_bytes,
        });
    }

    let format = FileFormat::from_filename(filename)?;
    info!("[EXTRACT] {} ({} bytes) as {}", filename, bytes.len(), format.as_str());

    let raw = match format {
        FileFormat::Txt => decode_text(bytes),
        FileFormat::Pdf => extract_pdf(bytes)?,
        FileFormat::Docx => extract_docx(bytes)?,
    };

    let text = clean_extracted_text(&raw);
    let chars = text.chars().count();
    debug!("[EXTRACT] {} chars after cleanup", chars);

    if chars < limits.min_chars {
        return Err(AnalysisError::InputTooShort {
            chars,
            min: limits.min_chars,
        });
    }

    Ok(text)
}

/// UTF-8 (BOM tolerated), falling back to ISO-8859-2.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            debug!("[EXTRACT] Not UTF-8, decoding as ISO-8859-2");
            decode_latin2(bytes)
        }
    }
}

pub fn decode_latin2(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b < 0xA0 {
                b as char
            } else {
                LATIN2_HIGH[(b - 0xA0) as usize]
            }
        })
        .collect()
}

fn extract_pdf(bytes: &[u8]) -> Result<String, AnalysisError> {
    // pdf-extract panics on some malformed inputs
    let result = catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)));
    match result {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(AnalysisError::ExtractionFailed {
            format: "pdf",
            message: e.to_string(),
        }),
        Err(_) => Err(AnalysisError::ExtractionFailed {
            format: "pdf",
            message: "malformed PDF".to_string(),
        }),
    }
}

fn extract_docx(bytes: &[u8]) -> Result<String, AnalysisError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| AnalysisError::ExtractionFailed {
        format: "docx",
        message: e.to_string(),
    })?;

    let mut paragraphs = Vec::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            let mut text = String::new();
            for p_child in &paragraph.children {
                if let ParagraphChild::Run(run) = p_child {
                    for r_child in &run.children {
                        match r_child {
                            RunChild::Text(t) => text.push_str(&t.text),
                            RunChild::Tab(_) => text.push('\t'),
                            RunChild::Break(_) => text.push('\n'),
                            _ => {}
                        }
                    }
                }
            }
            if !text.trim().is_empty() {
                paragraphs.push(text);
            }
        }
    }

    Ok(paragraphs.join("\n\n"))
}

// ISO-8859-2 code points for bytes 0xA0..=0xFF
const LATIN2_HIGH: [char; 96] = [
    '\u{00A0}', '\u{0104}', '\u{02D8}', '\u{0141}', '\u{00A4}', '\u{013D}', '\u{015A}', '\u{00A7}',
    '\u{00A8}', '\u{0160}', '\u{015E}', '\u{0164}', '\u{0179}', '\u{00AD}', '\u{017D}', '\u{017B}',
    '\u{00B0}', '\u{0105}', '\u{02DB}', '\u{0142}', '\u{00B4}', '\u{013E}', '\u{015B}', '\u{02C7}',
    '\u{00B8}', '\u{0161}', '\u{015F}', '\u{0165}', '\u{017A}', '\u{02DD}', '\u{017E}', '\u{017C}',
    '\u{0154}', '\u{00C1}', '\u{00C2}', '\u{0102}', '\u{00C4}', '\u{0139}', '\u{0106}', '\u{00C7}',
    '\u{010C}', '\u{00C9}', '\u{0118}', '\u{00CB}', '\u{011A}', '\u{00CD}', '\u{00CE}', '\u{010E}',
    '\u{0110}', '\u{0143}', '\u{0147}', '\u{00D3}', '\u{00D4}', '\u{0150}', '\u{00D6}', '\u{00D7}',
    '\u{0158}', '\u{016E}', '\u{00DA}', '\u{0170}', '\u{00DC}', '\u{00DD}', '\u{0162}', '\u{00DF}',
    '\u{0155}', '\u{00E1}', '\u{00E2}', '\u{0103}', '\u{00E4}', '\u{013A}', '\u{0107}', '\u{00E7}',
    '\u{010D}', '\u{00E9}', '\u{0119}', '\u{00EB}', '\u{011B}', '\u{00ED}', '\u{00EE}', '\u{010F}',
    '\u{0111}', '\u{0144}', '\u{0148}', '\u{00F3}', '\u{00F4}', '\u{0151}', '\u{00F6}', '\u{00F7}',
    '\u{0159}', '\u{016F}', '\u{00FA}', '\u{0171}', '\u{00FC}', '\u{00FD}', '\u{0163}', '\u{02D9}',
];

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Paragraph, Run};

    const LONG_TEXT: &str = "To jest wystarczająco długi tekst, aby przejść minimalną kontrolę długości wejścia.";

    #[test]
    fn test_txt_utf8() {
        let text = extract_text("notes.txt", LONG_TEXT.as_bytes(), &InputLimits::default()).unwrap();
        assert_eq!(text, LONG_TEXT);
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        assert_eq!(FileFormat::from_filename("A.TXT").unwrap(), FileFormat::Txt);
        assert_eq!(FileFormat::from_filename("b.Docx").unwrap(), FileFormat::Docx);
    }

    #[test]
    fn test_unsupported_format() {
        let result = extract_text("image.png", b"data", &InputLimits::default());
        assert!(matches!(
            result,
            Err(AnalysisError::UnsupportedFileFormat { extension }) if extension == "png"
        ));
        assert!(FileFormat::from_filename("README").is_err());
    }

    #[test]
    fn test_file_too_large() {
        let limits = InputLimits {
            max_file_bytes: 10,
            ..InputLimits::default()
        };
        let result = extract_text("big.txt", &[b'a'; 11], &limits);
        assert!(matches!(result, Err(AnalysisError::FileTooLarge { size: 11, max: 10 })));
    }

    #[test]
    fn test_latin2_fallback() {
        // "Zażółć" in ISO-8859-2
        let bytes = b"Za\xBF\xF3\xB3\xE6";
        assert_eq!(decode_text(bytes), "Zażółć");
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        assert_eq!(decode_text(b"\xEF\xBB\xBFabc"), "abc");
    }

    #[test]
    fn test_short_extracted_text_is_rejected() {
        let result = extract_text("short.txt", b"tiny", &InputLimits::default());
        assert!(matches!(result, Err(AnalysisError::InputTooShort { chars: 4, .. })));
    }

    #[test]
    fn test_garbage_pdf_fails_cleanly() {
        let result = extract_text("broken.pdf", b"not a pdf at all", &InputLimits::default());
        assert!(matches!(
            result,
            Err(AnalysisError::ExtractionFailed { format: "pdf", .. })
        ));
    }

    #[test]
    fn test_docx_paragraphs_are_joined() {
        let mut buf = std::io::Cursor::new(Vec::new());
        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Pierwszy akapit tekstu testowego.")))
            .add_paragraph(Paragraph::new())
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Drugi akapit, również dość długi.")))
            .build()
            .pack(&mut buf)
            .unwrap();

        let text = extract_text("doc.docx", buf.get_ref(), &InputLimits::default()).unwrap();
        assert_eq!(
            text,
            "Pierwszy akapit tekstu testowego.\n\nDrugi akapit, również dość długi."
        );
    }
}
