//! Diagram placeholders in built HTML pages.
//!
//! A placeholder is a `<pre>` element, or a `<div>` with text-only content,
//! whose class list contains the diagram class. Rendering replaces it with a
//! hidden `<pre>` that keeps the source and a content hash, followed by a
//! `<figure>` holding the SVG. A later pass finds the hidden `<pre>` again,
//! so the source survives any number of theme changes.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

/// `<pre>` with any content or `<div>` with text-only content.
static ELEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<pre(\s[^>]*)?>(.*?)</pre>|<div(\s[^>]*)?>([^<]*)</div>")
        .expect("valid regex")
});

/// Previously rendered figure directly following a placeholder.
static FIGURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)\A\s*<figure class="diagram-rendered"[^>]*>.*?</figure>"#)
        .expect("valid regex")
});

static CLASS_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bclass\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

static HASH_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bdata-diagram-hash="([0-9a-f]*)""#).expect("valid regex"));

/// Class marking the rendered figure.
const FIGURE_CLASS: &str = "diagram-rendered";

/// A diagram placeholder found in a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Placeholder {
    /// Byte range in the page, including any previously rendered figure.
    pub range: Range<usize>,
    /// Value of the element's class attribute.
    pub class_attr: String,
    /// Diagram source with HTML entities decoded.
    pub source: String,
    /// Hash recorded by a previous render, if any.
    pub hash: Option<String>,
}

impl Placeholder {
    /// Whether the page already holds the render identified by `hash`.
    pub fn is_current(&self, hash: &str) -> bool {
        self.hash.as_deref() == Some(hash)
    }
}

/// Find placeholders whose class list contains `class`.
///
/// Matches inside a previously rendered figure belong to the SVG and are
/// skipped, so the returned ranges never overlap.
pub(crate) fn find_placeholders(html: &str, class: &str) -> Vec<Placeholder> {
    let mut found = Vec::new();
    let mut covered = 0;

    for caps in ELEMENT_RE.captures_iter(html) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() < covered {
            continue;
        }
        let attrs = caps.get(1).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
        let body = caps.get(2).or_else(|| caps.get(4)).map_or("", |m| m.as_str());

        let Some(class_attr) = class_attr(attrs) else {
            continue;
        };
        if !class_attr.split_ascii_whitespace().any(|c| c == class) {
            continue;
        }

        let hash = HASH_ATTR_RE
            .captures(attrs)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_owned());
        let mut end = whole.end();
        if hash.is_some()
            && let Some(figure) = FIGURE_RE.find(&html[end..])
        {
            end += figure.end();
        }
        covered = end;

        found.push(Placeholder {
            range: whole.start()..end,
            class_attr: class_attr.to_owned(),
            source: unescape(body.trim()),
            hash,
        });
    }

    found
}

fn class_attr(attrs: &str) -> Option<&str> {
    let caps = CLASS_ATTR_RE.captures(attrs)?;
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str())
}

/// Content hash of a diagram rendered with `options_json`.
pub(crate) fn diagram_hash(options_json: &str, source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(options_json.as_bytes());
    hasher.update(b":");
    hasher.update(source.as_bytes());
    hex::encode(hasher.finalize())
}

/// Markup replacing a placeholder once its diagram is rendered.
pub(crate) fn rendered_markup(
    placeholder: &Placeholder,
    hash: &str,
    theme: &str,
    svg: &str,
) -> String {
    format!(
        r#"<pre class="{class}" data-diagram-hash="{hash}" hidden>{source}</pre><figure class="{FIGURE_CLASS}" data-theme="{theme}">{svg}</figure>"#,
        class = escape(&placeholder.class_attr),
        source = escape(&placeholder.source),
        svg = svg.trim(),
    )
}

/// Apply `(range, markup)` replacements.
///
/// A replacement overlapping an earlier one is dropped.
pub(crate) fn splice(html: &str, mut replacements: Vec<(Range<usize>, String)>) -> String {
    replacements.sort_by_key(|(range, _)| range.start);

    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;
    for (range, markup) in replacements {
        if range.start < cursor {
            tracing::warn!(
                start = range.start,
                end = range.end,
                "Skipping overlapping replacement"
            );
            continue;
        }
        out.push_str(&html[cursor..range.start]);
        out.push_str(&markup);
        cursor = range.end;
    }
    out.push_str(&html[cursor..]);
    out
}

/// Escape text for element content or a double-quoted attribute.
pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decode the entities [`escape`] produces, plus `&#x27;`.
pub(crate) fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_owned();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}
