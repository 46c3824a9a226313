//! Concrete decoders behind the Text Extractor.
//!
//! - `StrictLopdfDecoder`: lopdf's own per-page text extraction, which resolves fonts
//!   and fails a page on broken font descriptors.
//! - `LenientLopdfDecoder`: walks each page's content stream and collects the operands
//!   of text-showing operators without consulting fonts.
//! - `PdfExtractDecoder`: the pdf-extract crate, a separate implementation used as the
//!   last resort. It can panic on malformed input, so panics are contained.

use std::panic::{self, AssertUnwindSafe};

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object};

use super::{DocumentError, PageText, PdfDecoder};

/// TJ kerning (thousandths of an em) wider than this is treated as a word gap.
const TJ_SPACE_THRESHOLD: f64 = 200.0;

pub struct StrictLopdfDecoder;

impl PdfDecoder for StrictLopdfDecoder {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn decode(&self, pdf: &[u8]) -> Result<Vec<PageText>, DocumentError> {
        let doc = load(pdf)?;
        Ok(doc
            .get_pages()
            .into_keys()
            .map(|page_num| doc.extract_text(&[page_num]).map_err(|e| e.to_string()))
            .collect())
    }
}

pub struct LenientLopdfDecoder;

impl PdfDecoder for LenientLopdfDecoder {
    fn name(&self) -> &'static str {
        "lopdf (lenient)"
    }

    fn decode(&self, pdf: &[u8]) -> Result<Vec<PageText>, DocumentError> {
        let doc = load(pdf)?;
        Ok(doc
            .get_pages()
            .into_values()
            .map(|page_id| -> PageText {
                let raw = doc.get_page_content(page_id).map_err(|e| e.to_string())?;
                let content = Content::decode(&raw).map_err(|e| e.to_string())?;
                Ok(text_from_operations(&content.operations))
            })
            .collect())
    }
}

pub struct PdfExtractDecoder;

impl PdfDecoder for PdfExtractDecoder {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn decode(&self, pdf: &[u8]) -> Result<Vec<PageText>, DocumentError> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(pdf)
        }));
        match outcome {
            Ok(Ok(pages)) => Ok(pages.into_iter().map(Ok).collect()),
            Ok(Err(e)) => Err(classify(e.to_string())),
            Err(_) => Err(DocumentError::Malformed(
                "pdf-extract panicked while decoding".to_string(),
            )),
        }
    }
}

fn load(pdf: &[u8]) -> Result<Document, DocumentError> {
    Document::load_mem(pdf).map_err(|e| classify(e.to_string()))
}

fn classify(message: String) -> DocumentError {
    let lower = message.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") || lower.contains("decrypt") {
        DocumentError::Encrypted
    } else {
        DocumentError::Malformed(message)
    }
}

/// Collects the strings shown by `Tj`, `TJ`, `'` and `"`, breaking lines on text
/// positioning and at the end of each text object.
pub fn text_from_operations(operations: &[Operation]) -> String {
    let mut out = String::new();
    for op in operations {
        match op.operator.as_str() {
            "Tj" => push_strings(&mut out, &op.operands),
            "'" | "\"" => {
                new_line(&mut out);
                push_strings(&mut out, &op.operands);
            }
            "TJ" => {
                for operand in &op.operands {
                    let Object::Array(items) = operand else {
                        continue;
                    };
                    for item in items {
                        match item {
                            Object::String(bytes, _) => out.push_str(&decode_string(bytes)),
                            Object::Integer(n) if (*n as f64) < -TJ_SPACE_THRESHOLD => space(&mut out),
                            Object::Real(r) if (*r as f64) < -TJ_SPACE_THRESHOLD => space(&mut out),
                            _ => {}
                        }
                    }
                }
            }
            "T*" | "ET" => new_line(&mut out),
            "Td" | "TD" => {
                let moves_down = op
                    .operands
                    .get(1)
                    .and_then(number)
                    .is_some_and(|ty| ty != 0.0);
                if moves_down {
                    new_line(&mut out);
                } else {
                    space(&mut out);
                }
            }
            _ => {}
        }
    }
    out.lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_strings(out: &mut String, operands: &[Object]) {
    for operand in operands {
        if let Object::String(bytes, _) = operand {
            out.push_str(&decode_string(bytes));
        }
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(n) => Some(*n as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn new_line(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn space(out: &mut String) {
    if !out.is_empty() && !out.ends_with(|c: char| c == ' ' || c == '\n') {
        out.push(' ');
    }
}

/// UTF-16BE when the string carries a BOM, PDFDocEncoding (read as Latin-1) otherwise.
fn decode_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes
            .iter()
            .map(|&b| char::from(b))
            .filter(|c| !c.is_control() || c.is_whitespace())
            .collect(),
    }
}
