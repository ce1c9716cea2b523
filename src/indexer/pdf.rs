//! PDF text extraction via `lopdf`.
//!
//! Compiled only with the `pdf` feature; without it the loader records PDFs
//! as skipped.
use std::path::Path;

use lopdf::Document;

/// Extract the text of every page, each followed by a newline.
pub fn extract_text(path: &Path) -> Result<String, lopdf::Error> {
    let doc = Document::load(path)?;
    let mut text = String::new();

    for page_number in doc.get_pages().keys() {
        let page_text = doc.extract_text(&[*page_number])?;
        text.push_str(&page_text);
        text.push('\n');
    }

    Ok(text)
}
