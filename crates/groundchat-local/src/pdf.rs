use groundchat_core::{Error, Result};

/// A paginated document whose pages can be read one at a time.
///
/// `page_text` returns `None` for a page that yields no text (or fails to decode);
/// such a page contributes nothing to the concatenation.
pub trait PagedDocument {
    fn page_count(&self) -> usize;
    fn page_text(&self, index: usize) -> Option<String>;
}

/// Concatenate all page texts in ascending page order, no separator.
pub fn concat_pages(doc: &impl PagedDocument) -> String {
    let mut out = String::new();
    for i in 0..doc.page_count() {
        if let Some(t) = doc.page_text(i) {
            out.push_str(&t);
        }
    }
    out
}

/// Best-effort sniff for PDF bytes (magic header).
pub fn bytes_look_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}

/// A parsed PDF backed by `lopdf`.
pub struct LopdfDocument {
    doc: lopdf::Document,
    page_numbers: Vec<u32>,
}

impl LopdfDocument {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let doc = lopdf::Document::load_mem(bytes).map_err(|e| Error::Pdf(e.to_string()))?;
        // A stream without a catalog is not a document, even if some objects parsed.
        doc.catalog().map_err(|e| Error::Pdf(e.to_string()))?;
        // BTreeMap keys: already ascending page numbers.
        let page_numbers = doc.get_pages().keys().copied().collect();
        Ok(Self { doc, page_numbers })
    }
}

impl PagedDocument for LopdfDocument {
    fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    fn page_text(&self, index: usize) -> Option<String> {
        let n = *self.page_numbers.get(index)?;
        match self.doc.extract_text(&[n]) {
            // lopdf terminates every text line; the page boundary itself adds nothing.
            Ok(t) => {
                let t = t.trim_end_matches(['\r', '\n']);
                (!t.is_empty()).then(|| t.to_string())
            }
            Err(e) => {
                tracing::debug!(page = n, error = %e, "pdf page yielded no text");
                None
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Only a stream that cannot be parsed as a document at all is an error.
    pub fn extract(&self, bytes: &[u8]) -> Result<String> {
        if !bytes_look_like_pdf(bytes) {
            return Err(Error::Pdf("not a PDF (missing %PDF- header)".to_string()));
        }
        let doc = LopdfDocument::parse(bytes)?;
        let text = concat_pages(&doc);
        tracing::debug!(
            pages = doc.page_count(),
            chars = text.chars().count(),
            "pdf extracted"
        );
        Ok(text)
    }
}
