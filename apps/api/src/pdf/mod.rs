//! Text Extractor: PDF bytes to one text string, with layered fallback.
//!
//! Order of attempts:
//! 1. standard decoder over every page; accepted as-is when page one has text
//! 2. lenient decoder over every page when page one is empty or errored
//! 3. alternate decoder for page one when it is still unreadable; its other pages
//!    replace earlier ones where it found text
//!
//! An encrypted verdict from a fallback decoder does not discard page text that an
//! earlier decoder already produced.
//!
//! Later pages that fail are skipped with a warning. Page one carries the name and
//! contact details, so when no decoder can read it extraction fails.

use thiserror::Error;
use tracing::{error, info, warn};

pub mod decoders;

use decoders::{LenientLopdfDecoder, PdfExtractDecoder, StrictLopdfDecoder};

/// Classified failure surfaced to callers. Messages are user-facing.
#[derive(Debug, Error)]
pub enum TextExtractionError {
    #[error("The PDF file is password-protected. Please remove the password and try again.")]
    PasswordProtected,

    #[error(
        "Failed to extract text from PDF: {0}. The PDF may be corrupted or in an unsupported \
         format. Please try with a different PDF file."
    )]
    CorruptedOrUnsupported(String),

    #[error(
        "No text could be extracted from the PDF ({0}). The PDF may be corrupted, \
         password-protected, or contain only images."
    )]
    NoExtractableText(String),
}

impl TextExtractionError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PasswordProtected => "password-protected",
            Self::CorruptedOrUnsupported(_) => "corrupted-or-unsupported",
            Self::NoExtractableText(_) => "no-extractable-text",
        }
    }
}

/// Whole-document failure reported by a single decoder.
#[derive(Debug, Clone, Error)]
pub enum DocumentError {
    #[error("document is encrypted")]
    Encrypted,

    #[error("{0}")]
    Malformed(String),
}

/// Outcome for one page: its text, or the decoder's error message.
pub type PageText = Result<String, String>;

/// One way of turning PDF bytes into per-page text, in page order.
pub trait PdfDecoder: Send + Sync {
    fn name(&self) -> &'static str;

    fn decode(&self, pdf: &[u8]) -> Result<Vec<PageText>, DocumentError>;
}

pub struct TextExtractor {
    standard: Box<dyn PdfDecoder>,
    lenient: Box<dyn PdfDecoder>,
    alternate: Option<Box<dyn PdfDecoder>>,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new(
            Box::new(StrictLopdfDecoder),
            Box::new(LenientLopdfDecoder),
            Some(Box::new(PdfExtractDecoder)),
        )
    }
}

impl TextExtractor {
    pub fn new(
        standard: Box<dyn PdfDecoder>,
        lenient: Box<dyn PdfDecoder>,
        alternate: Option<Box<dyn PdfDecoder>>,
    ) -> Self {
        Self {
            standard,
            lenient,
            alternate,
        }
    }

    /// Extracts the text of every readable page, joined by newlines in page order.
    pub fn extract(&self, pdf: &[u8]) -> Result<String, TextExtractionError> {
        let mut attempted = 0;
        let mut load_failures = Vec::new();

        let mut pages =
            self.run(self.standard.as_ref(), pdf, false, &mut attempted, &mut load_failures)?;

        let retry_reason = match pages.as_deref().map(|p| p.first()) {
            None => Some("document could not be opened".to_string()),
            Some(None) => Some("document has no pages".to_string()),
            Some(Some(Ok(text))) if text.trim().is_empty() => Some("first page is empty".to_string()),
            Some(Some(Err(e))) => Some(format!("first page failed: {e}")),
            Some(Some(Ok(_))) => None,
        };

        if let Some(reason) = retry_reason {
            warn!(
                "{} decoding unusable ({reason}), retrying whole document with {}",
                self.standard.name(),
                self.lenient.name()
            );
            let has_text = pages.as_deref().map_or(false, has_page_text);
            if let Some(lenient_pages) =
                self.run(self.lenient.as_ref(), pdf, has_text, &mut attempted, &mut load_failures)?
            {
                pages = Some(lenient_pages);
            }
        }

        let mut texts = collect_pages(pages.unwrap_or_default());

        if texts.first().map_or(true, Option::is_none) {
            self.recover_first_page(pdf, &mut texts, &mut attempted, &mut load_failures)?;
        }

        if texts.iter().all(Option::is_none) {
            if attempted > 0 && load_failures.len() == attempted {
                error!("No decoder could open the PDF: {}", load_failures.join("; "));
                return Err(TextExtractionError::CorruptedOrUnsupported(
                    load_failures.join("; "),
                ));
            }
            return Err(TextExtractionError::NoExtractableText(
                "no page yielded text".to_string(),
            ));
        }

        if texts.first().map_or(true, Option::is_none) {
            error!("First page could not be read by any decoder");
            return Err(TextExtractionError::NoExtractableText(
                "the first page could not be read".to_string(),
            ));
        }

        let page_count = texts.iter().filter(|t| t.is_some()).count();
        let full_text = texts.into_iter().flatten().collect::<Vec<_>>().join("\n");
        info!(
            "Extracted {page_count} pages, {} characters",
            full_text.chars().count()
        );
        Ok(full_text)
    }

    /// Runs one decoder. Encryption ends extraction unless an earlier decoder already
    /// produced page text, in which case the pages in hand are kept. Other document
    /// errors are recorded and yield `None` so the next decoder can try.
    fn run(
        &self,
        decoder: &dyn PdfDecoder,
        pdf: &[u8],
        has_text: bool,
        attempted: &mut usize,
        load_failures: &mut Vec<String>,
    ) -> Result<Option<Vec<PageText>>, TextExtractionError> {
        *attempted += 1;
        match decoder.decode(pdf) {
            Ok(pages) => Ok(Some(pages)),
            Err(DocumentError::Encrypted) if has_text => {
                warn!(
                    "{} reported the PDF as encrypted; keeping pages already extracted",
                    decoder.name()
                );
                Ok(None)
            }
            Err(DocumentError::Encrypted) => Err(TextExtractionError::PasswordProtected),
            Err(DocumentError::Malformed(msg)) => {
                warn!("{} could not open the PDF: {msg}", decoder.name());
                load_failures.push(format!("{}: {msg}", decoder.name()));
                Ok(None)
            }
        }
    }

    fn recover_first_page(
        &self,
        pdf: &[u8],
        texts: &mut Vec<Option<String>>,
        attempted: &mut usize,
        load_failures: &mut Vec<String>,
    ) -> Result<(), TextExtractionError> {
        let Some(alternate) = self.alternate.as_deref() else {
            error!("First page unreadable and no alternate decoder is configured");
            return Ok(());
        };

        warn!("Attempting first page with {} fallback", alternate.name());
        let has_text = texts.iter().any(Option::is_some);
        let Some(alt_pages) = self.run(alternate, pdf, has_text, attempted, load_failures)? else {
            return Ok(());
        };

        let alt_texts = collect_pages(alt_pages);
        if alt_texts.first().map_or(true, Option::is_none) {
            error!("{} fallback found no text on the first page", alternate.name());
            return Ok(());
        }

        if texts.len() < alt_texts.len() {
            texts.resize(alt_texts.len(), None);
        }
        for (i, text) in alt_texts.into_iter().enumerate() {
            if text.is_some() {
                texts[i] = text;
            }
        }
        info!("First page extracted using {} fallback", alternate.name());
        Ok(())
    }
}

fn has_page_text(pages: &[PageText]) -> bool {
    pages
        .iter()
        .any(|page| matches!(page, Ok(text) if !text.trim().is_empty()))
}

/// Keeps non-blank page text. Failed later pages are logged and skipped.
fn collect_pages(pages: Vec<PageText>) -> Vec<Option<String>> {
    pages
        .into_iter()
        .enumerate()
        .map(|(i, page)| match page {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                if i > 0 {
                    warn!("Error extracting page {}: {e}. Skipping this page.", i + 1);
                }
                None
            }
        })
        .collect()
}
