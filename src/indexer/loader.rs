use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{RagError, Result};
use crate::index::models::SourceDocument;

/// Extensions read as UTF-8 text, in scan order.
const TEXT_EXTENSIONS: &[&str] = &["txt", "md"];

/// A file that was found but not turned into a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub name: String,
    pub reason: String,
}

/// Outcome of scanning a corpus directory.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<SourceDocument>,
    pub skipped: Vec<SkippedFile>,
}

impl LoadReport {
    fn skip(&mut self, name: String, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(file = %name, %reason, "skipping corpus file");
        self.skipped.push(SkippedFile { name, reason });
    }
}

/// Whether this build can read PDF files.
#[must_use]
pub fn pdf_support_enabled() -> bool {
    cfg!(feature = "pdf")
}

/// Load every `.txt`, `.md` and `.pdf` file directly inside `dir`.
///
/// Per-file failures are recorded in [`LoadReport::skipped`] and never abort
/// the batch. An existing directory with no eligible files yields an empty
/// report.
pub fn load_documents(dir: &Path) -> Result<LoadReport> {
    if !dir.is_dir() {
        return Err(RagError::NotFound(format!(
            "directory {} does not exist",
            dir.display()
        )));
    }

    let mut report = LoadReport::default();

    for ext in TEXT_EXTENSIONS {
        for path in files_with_extension(dir, ext)? {
            let name = display_name(&path);
            match fs::read(&path) {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => report.documents.push(SourceDocument::new(text, name)),
                    Err(e) => report.skip(name, format!("invalid UTF-8: {e}")),
                },
                Err(e) => report.skip(name, format!("read failed: {e}")),
            }
        }
    }

    for path in files_with_extension(dir, "pdf")? {
        load_pdf(&path, &mut report);
    }

    info!(
        dir = %dir.display(),
        documents = report.documents.len(),
        skipped = report.skipped.len(),
        "corpus loaded"
    );

    Ok(report)
}

#[cfg(feature = "pdf")]
fn load_pdf(path: &Path, report: &mut LoadReport) {
    let name = display_name(path);
    match super::pdf::extract_text(path) {
        Ok(text) if text.trim().is_empty() => report.skip(name, "no extractable text"),
        Ok(text) => report.documents.push(SourceDocument::new(text, name)),
        Err(e) => report.skip(name, format!("PDF extraction failed: {e}")),
    }
}

#[cfg(not(feature = "pdf"))]
fn load_pdf(path: &Path, report: &mut LoadReport) {
    let name = display_name(path);
    debug!(file = %name, "PDF support not compiled in");
    report.skipped.push(SkippedFile {
        name,
        reason: "PDF support not enabled".to_string(),
    });
}

/// Regular files directly in `dir` with the given extension, sorted by path.
fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = format!("{base}/*.{ext}");
    let matches = glob::glob(&pattern)
        .map_err(|e| RagError::Configuration(format!("invalid corpus path pattern: {e}")))?;

    let mut files = Vec::new();
    for entry in matches {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => debug!("unreadable glob entry: {e}"),
        }
    }
    Ok(files)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
