//! Export renderers: Markdown passthrough, PDF, and EPUB.
//!
//! Every renderer consumes the assembled content blob and always produces
//! artifact bytes. Internal failures degrade instead of propagating: the PDF
//! renderer falls back to the styled HTML document, and as a last resort a
//! renderer yields a human-readable error message as the artifact content.
//! Storage and record-keeping for the produced bytes belong to the pipeline,
//! not to this crate.

pub mod chapters;
pub mod html;
mod epub;
mod pdf;

use tracing::warn;

use wikiport_shared::{FileFormat, JobId};

pub use chapters::{Chapter, slugify, split_chapters};

/// Filename for a repository's export in the given format
/// (e.g. `widgets_wiki.pdf`).
pub fn export_filename(repo_name: &str, format: FileFormat) -> String {
    format!("{repo_name}_wiki.{}", format.extension())
}

/// Markdown export: the blob bytes, verbatim.
pub fn markdown(blob: &str) -> Vec<u8> {
    blob.as_bytes().to_vec()
}

/// PDF export.
///
/// Tries a direct markdown → PDF rendering; if that fails, stores the styled
/// HTML document under the `.pdf` name — degraded, but still viewable.
pub fn pdf(repo_name: &str, blob: &str) -> Vec<u8> {
    match pdf::build(repo_name, blob) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(repo = repo_name, error = %e, "PDF rendering failed, storing styled HTML");
            html::styled_document(repo_name, blob).into_bytes()
        }
    }
}

/// EPUB export.
///
/// On container assembly failure the artifact is an error-message text file
/// under the `.epub` name.
pub fn epub(repo_name: &str, job_id: JobId, blob: &str) -> Vec<u8> {
    match epub::build(repo_name, job_id, blob) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(repo = repo_name, error = %e, "EPUB rendering failed, storing error artifact");
            format!("EPUB generation failed: {e}").into_bytes()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_filenames() {
        assert_eq!(export_filename("widgets", FileFormat::Markdown), "widgets_wiki.md");
        assert_eq!(export_filename("widgets", FileFormat::Pdf), "widgets_wiki.pdf");
        assert_eq!(export_filename("widgets", FileFormat::Epub), "widgets_wiki.epub");
    }

    #[test]
    fn markdown_is_verbatim() {
        let blob = "# Home\n\ncontent\n";
        assert_eq!(markdown(blob), blob.as_bytes());
    }

    #[test]
    fn pdf_renders_or_degrades_to_html() {
        let bytes = pdf("widgets", "# Home\n\ncontent\n");
        assert!(bytes.starts_with(b"%PDF"));

        // An empty blob cannot be laid out; the styled HTML fallback kicks in.
        let degraded = pdf("widgets", "");
        assert!(degraded.starts_with(b"<!DOCTYPE html>"));
    }

    #[test]
    fn epub_is_a_zip_container() {
        let bytes = epub("widgets", JobId::new(), "# Home\n\ncontent\n");
        // Zip local file header magic.
        assert!(bytes.starts_with(b"PK"));
    }
}
