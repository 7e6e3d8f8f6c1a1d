//! EPUB 3 rendering for the export pipeline.
//!
//! The content blob is split into chapters on level-1 headings, each chapter
//! is markdown-rendered into a minimal XHTML shell, and the package (stored
//! `mimetype`, `META-INF/container.xml`, `OEBPS/content.opf`, `OEBPS/nav.xhtml`,
//! chapter files) is assembled into a single zip container.

use std::io::{Cursor, Write};

use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use wikiport_shared::{JobId, Result, WikiportError};

use crate::chapters::{Chapter, split_chapters};
use crate::html;

/// Build EPUB bytes for a repository's content blob.
pub(crate) fn build(repo_name: &str, job_id: JobId, blob: &str) -> Result<Vec<u8>> {
    let chapters = split_chapters(repo_name, blob);
    let files: Vec<(String, String)> = chapters
        .iter()
        .enumerate()
        .map(|(i, chapter)| {
            (
                format!("chapter_{:03}_{}.xhtml", i + 1, chapter.slug),
                chapter_xhtml(chapter),
            )
        })
        .collect();

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    // The mimetype entry must come first and must not be compressed.
    zip.start_file("mimetype", stored).map_err(zip_err)?;
    zip.write_all(b"application/epub+zip")
        .map_err(|e| WikiportError::Render(format!("epub write failed: {e}")))?;

    let entries: Vec<(String, String)> = std::iter::once((
        "META-INF/container.xml".to_string(),
        CONTAINER_XML.to_string(),
    ))
    .chain(std::iter::once((
        "OEBPS/content.opf".to_string(),
        package_document(repo_name, job_id, &chapters, &files),
    )))
    .chain(std::iter::once((
        "OEBPS/nav.xhtml".to_string(),
        nav_document(repo_name, &chapters, &files),
    )))
    .chain(
        files
            .iter()
            .map(|(name, content)| (format!("OEBPS/{name}"), content.clone())),
    )
    .collect();

    for (name, content) in entries {
        zip.start_file(&name, deflated).map_err(zip_err)?;
        zip.write_all(content.as_bytes())
            .map_err(|e| WikiportError::Render(format!("epub write failed for {name}: {e}")))?;
    }

    let cursor = zip.finish().map_err(zip_err)?;
    Ok(cursor.into_inner())
}

fn zip_err(e: zip::result::ZipError) -> WikiportError {
    WikiportError::Render(format!("epub container error: {e}"))
}

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

/// Render one chapter into a minimal XHTML shell.
fn chapter_xhtml(chapter: &Chapter) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <!DOCTYPE html>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\">\n\
         <head><title>{title}</title></head>\n\
         <body>\n<h1>{title}</h1>\n{body}\n</body>\n\
         </html>\n",
        title = html::escape(&chapter.title),
        body = html::markdown_to_html(&chapter.body),
    )
}

/// Build the OPF package document: metadata, manifest, and spine in
/// chapter order.
fn package_document(
    repo_name: &str,
    job_id: JobId,
    chapters: &[Chapter],
    files: &[(String, String)],
) -> String {
    let modified = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");

    let mut manifest = String::from(
        "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
    );
    let mut spine = String::new();
    for (i, (file, _)) in files.iter().enumerate() {
        manifest.push_str(&format!(
            "    <item id=\"c{i}\" href=\"{file}\" media-type=\"application/xhtml+xml\"/>\n"
        ));
        spine.push_str(&format!("    <itemref idref=\"c{i}\"/>\n"));
    }

    debug_assert_eq!(chapters.len(), files.len());
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <package xmlns=\"http://www.idpf.org/2007/opf\" version=\"3.0\" unique-identifier=\"pub-id\">\n\
         <metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\n\
         \x20   <dc:identifier id=\"pub-id\">gh-wiki-{job_id}</dc:identifier>\n\
         \x20   <dc:title>{title} Wiki</dc:title>\n\
         \x20   <dc:language>en</dc:language>\n\
         \x20   <meta property=\"dcterms:modified\">{modified}</meta>\n\
         </metadata>\n\
         <manifest>\n{manifest}</manifest>\n\
         <spine>\n{spine}</spine>\n\
         </package>\n",
        title = html::escape(repo_name),
    )
}

/// Build the EPUB 3 navigation document in chapter order.
fn nav_document(repo_name: &str, chapters: &[Chapter], files: &[(String, String)]) -> String {
    let mut items = String::new();
    for (chapter, (file, _)) in chapters.iter().zip(files) {
        items.push_str(&format!(
            "      <li><a href=\"{file}\">{}</a></li>\n",
            html::escape(&chapter.title)
        ));
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <!DOCTYPE html>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\">\n\
         <head><title>{title} Wiki</title></head>\n\
         <body>\n\
         \x20 <nav epub:type=\"toc\">\n\
         \x20   <h1>Contents</h1>\n\
         \x20   <ol>\n{items}    </ol>\n\
         \x20 </nav>\n\
         </body>\n\
         </html>\n",
        title = html::escape(repo_name),
    )
}
