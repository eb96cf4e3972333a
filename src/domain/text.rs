//! Plain-text extraction from post HTML.

use std::sync::LazyLock;

use ammonia::Builder as AmmoniaBuilder;
use regex::Regex;

static BLOCK_BREAK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</p>|</li>|</blockquote>").ok());

/// Strip markup from `html`, keeping line structure so words in adjacent paragraphs never merge.
pub fn html_to_plaintext(html: &str) -> String {
    if !html.contains('<') && !html.contains('&') {
        return html.trim().to_string();
    }

    let spaced = match BLOCK_BREAK.as_ref() {
        Some(pattern) => pattern.replace_all(html, "$0\n").into_owned(),
        None => html.to_string(),
    };

    let stripped = AmmoniaBuilder::empty().clean(&spaced).to_string();
    unescape_entities(&stripped).trim().to_string()
}

fn unescape_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(html_to_plaintext("  hello world "), "hello world");
    }

    #[test]
    fn paragraphs_do_not_merge() {
        let text = html_to_plaintext("<p>first</p><p>second</p>");
        assert!(text.contains("first\n"));
        assert!(text.ends_with("second"));
    }

    #[test]
    fn entities_are_decoded() {
        assert_eq!(
            html_to_plaintext("<p>fish &amp; chips &lt;3</p>"),
            "fish & chips <3"
        );
    }

    #[test]
    fn links_keep_their_text() {
        let text = html_to_plaintext(r#"<p>see <a href="https://example.org">the docs</a></p>"#);
        assert_eq!(text, "see the docs");
    }
}
