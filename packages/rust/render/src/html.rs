//! Markdown → HTML conversion and the styled export document shell.

use pulldown_cmark::{Options, Parser, html};

/// Fixed stylesheet applied to the styled HTML document (and thereby to the
/// PDF fallback artifact).
const STYLESHEET: &str = r#"body {
    font-family: Arial, sans-serif;
    margin: 50px;
    line-height: 1.5;
}
h1, h2, h3, h4, h5, h6 { color: #333; margin-top: 20px; }
h1 { border-bottom: 1px solid #eee; padding-bottom: 10px; }
code { background: #f4f4f4; padding: 2px 5px; border-radius: 3px; }
pre { background: #f4f4f4; padding: 10px; border-radius: 5px; overflow-x: auto; }
blockquote { border-left: 3px solid #ddd; margin-left: 0; padding-left: 15px; color: #777; }
img { max-width: 100%; }
hr { border: 0; border-top: 1px solid #eee; margin: 30px 0; }"#;

/// Convert markdown to an HTML fragment.
///
/// Tables and strikethrough are enabled; everything else is CommonMark.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut out, parser);
    out
}

/// Wrap markdown content in a complete styled HTML document.
pub fn styled_document(title: &str, markdown: &str) -> String {
    let body = markdown_to_html(markdown);
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <meta charset=\"UTF-8\">\n\
         <title>{} Wiki</title>\n\
         <style>\n{STYLESHEET}\n</style>\n\
         </head>\n\
         <body>\n{body}\n</body>\n\
         </html>\n",
        escape(title)
    )
}

/// Escape text for embedding in HTML/XML markup.
pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
