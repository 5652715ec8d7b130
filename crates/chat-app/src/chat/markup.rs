//! Message text to display markup.
//!
//! The pipeline order is fixed: escape everything, then re-enable a small set of
//! escaped tags, then linkify. Re-enabling before escaping would let arbitrary
//! markup through, and linkifying before the allow-list would wrap anchors
//! around escaped tag text.

use std::sync::LazyLock;

use chatbot_backend::BackendFlavor;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupPolicy {
    /// Escape, re-enable `br`/`strong`/`em`/`ul`/`li`, then linkify URLs.
    Rich,
    /// Escape only.
    Plain,
}

impl MarkupPolicy {
    pub fn for_flavor(flavor: BackendFlavor) -> Self {
        match flavor {
            BackendFlavor::Django => Self::Rich,
            BackendFlavor::Flask => Self::Plain,
        }
    }

    pub fn render(self, text: &str) -> String {
        let escaped = escape_html(text);
        match self {
            Self::Plain => escaped,
            Self::Rich => linkify(&allow_basic_tags(&escaped)),
        }
    }
}

static ALLOWED_TAGS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)&lt;br\s*/?&gt;", "<br>"),
        (r"(?i)&lt;strong&gt;(.*?)&lt;/strong&gt;", "<strong>${1}</strong>"),
        (r"(?i)&lt;em&gt;(.*?)&lt;/em&gt;", "<em>${1}</em>"),
        (r"(?i)&lt;ul&gt;", "<ul>"),
        (r"(?i)&lt;/ul&gt;", "</ul>"),
        (r"(?i)&lt;li&gt;", "<li>"),
        (r"(?i)&lt;/li&gt;", "</li>"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("allow-list patterns are valid"),
            replacement,
        )
    })
    .collect()
});

// A URL may carry `&amp;` but stops at any other entity, so it never runs into an
// escaped or re-enabled tag.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://(?:[^\s<>"'&]|&amp;)+"#).expect("url pattern is valid")
});

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for character in text.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(character),
        }
    }

    escaped
}

/// Re-enables the allow-listed tags. Input must already be escaped.
pub fn allow_basic_tags(escaped: &str) -> String {
    ALLOWED_TAGS
        .iter()
        .fold(escaped.to_string(), |text, (pattern, replacement)| {
            pattern.replace_all(&text, *replacement).into_owned()
        })
}

/// Wraps bare `http(s)://` URLs in anchors. Input must already be sanitized.
pub fn linkify(text: &str) -> String {
    URL_PATTERN
        .replace_all(
            text,
            r#"<a href="${0}" target="_blank" rel="noopener">${0}</a>"#,
        )
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_tags_never_survive() {
        let rendered = MarkupPolicy::Rich.render("<script>x</script>");
        assert_eq!(rendered, "&lt;script&gt;x&lt;/script&gt;");
        assert!(!rendered.contains('<'));
    }

    #[test]
    fn strong_wraps_a_clickable_url() {
        let rendered = MarkupPolicy::Rich.render("visit <strong>https://a.b</strong>");
        assert_eq!(
            rendered,
            r#"visit <strong><a href="https://a.b" target="_blank" rel="noopener">https://a.b</a></strong>"#
        );
        assert!(!rendered.contains("&lt;"));
    }

    #[test]
    fn allow_listed_tags_are_case_insensitive() {
        let rendered = MarkupPolicy::Rich.render("a<BR>b<br/><EM>c</EM><ul><li>d</li></ul>");
        assert_eq!(rendered, "a<br>b<br><em>c</em><ul><li>d</li></ul>");
    }

    #[test]
    fn attributes_keep_tags_escaped() {
        let rendered = MarkupPolicy::Rich.render(r#"<strong onclick="steal()">hi</strong>"#);
        assert!(!rendered.contains("<strong"));
        assert!(rendered.contains("&lt;strong onclick=&quot;steal()&quot;&gt;"));
    }

    #[test]
    fn unpaired_strong_stays_escaped() {
        let rendered = MarkupPolicy::Rich.render("<strong>open");
        assert_eq!(rendered, "&lt;strong&gt;open");
    }

    #[test]
    fn quotes_cannot_break_out_of_href() {
        let rendered = MarkupPolicy::Rich.render(r#"https://a.b/"onmouseover="alert(1)"#);
        assert_eq!(
            rendered,
            r#"<a href="https://a.b/" target="_blank" rel="noopener">https://a.b/</a>&quot;onmouseover=&quot;alert(1)"#
        );
    }

    #[test]
    fn query_ampersands_stay_inside_the_link() {
        let rendered = MarkupPolicy::Rich.render("see https://x.io/?a=1&b=2 now");
        assert_eq!(
            rendered,
            r#"see <a href="https://x.io/?a=1&amp;b=2" target="_blank" rel="noopener">https://x.io/?a=1&amp;b=2</a> now"#
        );
    }

    #[test]
    fn escaped_tag_after_url_is_not_swallowed() {
        let rendered = MarkupPolicy::Rich.render("https://a.b<img src=x>");
        assert!(rendered.starts_with(r#"<a href="https://a.b" "#));
        assert!(rendered.ends_with("&lt;img src=x&gt;"));
    }

    #[test]
    fn plain_policy_only_escapes() {
        let rendered = MarkupPolicy::Plain.render("<b>https://a.b</b> & more");
        assert_eq!(rendered, "&lt;b&gt;https://a.b&lt;/b&gt; &amp; more");
    }
}
