use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::SourceText;

/// Text of every page of a PDF, normalized. `None` if any page fails.
pub fn extract_document_text(path: &Path) -> Option<SourceText> {
    debug!("Reading document: {}", path.display());
    let expected = match pdf_extract::Document::load(path) {
        Ok(doc) => doc.get_pages().len(),
        Err(e) => {
            warn!("Could not read document {}: {e}", path.display());
            return None;
        }
    };
    match pdf_extract::extract_text_by_pages(path) {
        Ok(pages) => {
            debug!("Extracted {} of {expected} pages from {}", pages.len(), path.display());
            join_pages(&pages, expected)
        }
        Err(e) => {
            warn!("Could not read document {}: {e}", path.display());
            None
        }
    }
}

// Extraction stops quietly at the first bad page; a short page list means failure.
fn join_pages(pages: &[String], expected: usize) -> Option<SourceText> {
    if pages.len() != expected {
        warn!("Document text stopped after {} of {expected} pages", pages.len());
        return None;
    }
    SourceText::new(&pages.join("\n"))
}

/// Run extraction off the async runtime; a parser panic counts as unreadable.
pub async fn extract_document_text_blocking(path: PathBuf) -> Option<SourceText> {
    match tokio::task::spawn_blocking(move || extract_document_text(&path)).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Document extraction aborted: {e}");
            None
        }
    }
}

/// Persist an uploaded document to a scratch file, extract it, and remove the file.
pub async fn extract_upload(bytes: &[u8], scratch_dir: &Path) -> std::io::Result<Option<SourceText>> {
    std::fs::create_dir_all(scratch_dir)?;
    // Deleted when dropped, whichever way this function exits.
    let mut upload = tempfile::Builder::new()
        .prefix("studyx-upload-")
        .suffix(".pdf")
        .tempfile_in(scratch_dir)?;
    upload.write_all(bytes)?;
    upload.flush()?;

    Ok(extract_document_text_blocking(upload.path().to_path_buf()).await)
}
