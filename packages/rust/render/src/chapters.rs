//! Chapter splitting for the EPUB renderer.
//!
//! Level-1 markdown headings (`# Title`) are chapter boundaries. Content
//! before the first heading becomes an "Introduction" chapter; a blob with
//! no headings at all becomes a single chapter named after the repository.

/// One chapter of the assembled content blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    /// Chapter title (heading text, "Introduction", or the repository name).
    pub title: String,
    /// Filesystem-safe slug derived from the title.
    pub slug: String,
    /// Chapter body markdown, without the heading line itself.
    pub body: String,
}

/// Split a content blob into chapters on level-1 headings.
///
/// Headings inside fenced code blocks are not boundaries. With zero
/// headings the whole blob is one chapter titled `repo_name`.
pub fn split_chapters(repo_name: &str, blob: &str) -> Vec<Chapter> {
    // First section is whatever precedes the first heading.
    let mut sections: Vec<(Option<String>, String)> = vec![(None, String::new())];
    let mut in_fence = false;

    for line in blob.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
        }

        if !in_fence && is_level1_heading(line) {
            sections.push((Some(line[2..].trim().to_string()), String::new()));
        } else {
            let (_, body) = sections.last_mut().expect("sections is never empty");
            body.push_str(line);
            body.push('\n');
        }
    }

    if sections.iter().all(|(title, _)| title.is_none()) {
        return vec![Chapter {
            title: repo_name.to_string(),
            slug: slugify(repo_name),
            body: blob.to_string(),
        }];
    }

    let mut chapters = Vec::new();
    for (title, body) in sections {
        match title {
            Some(title) => {
                let slug = slugify(&title);
                chapters.push(Chapter { title, slug, body });
            }
            // Non-empty leading content becomes an Introduction chapter.
            None if !body.trim().is_empty() => chapters.push(Chapter {
                title: "Introduction".to_string(),
                slug: "introduction".to_string(),
                body,
            }),
            None => {}
        }
    }
    chapters
}

/// Whether a line is a level-1 heading (`# Title`, not `##`).
fn is_level1_heading(line: &str) -> bool {
    line.starts_with("# ") && !line.starts_with("## ")
}

/// Derive a filesystem-safe slug: lowercase, non-word characters replaced
/// with underscores.
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}
