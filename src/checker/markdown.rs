// src/checker/markdown.rs
// =============================================================================
// This module extracts links from Markdown text.
//
// Only inline links of the form [label](http://...) or [label](https://...)
// are recognised. Auto-links (<https://...>), bare URLs and reference-style
// links ([label][ref]) are deliberately ignored.
//
// Known boundary: the URL part may not contain '(' or ')'. A link such as
// [wiki](https://en.wikipedia.org/wiki/Rust_(programming_language)) does not
// match at all, because the closing paren must follow the URL directly and the
// URL itself stops at the first paren. Handling nested parens would change the
// output for existing documents, so it is left alone.
//
// Rust concepts:
// - OnceLock: compile the regex once, on first use, and share it afterwards
// - Iterators: captures_iter walks the text left to right
// =============================================================================

use std::sync::OnceLock;

use regex::Regex;

// The label is one or more characters that are not square brackets; the
// destination is http(s):// followed by anything except parentheses.
const INLINE_LINK_PATTERN: &str = r"\[[^\]\[]+\]\((https?://[^()]+)\)";

fn inline_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(INLINE_LINK_PATTERN).expect("inline link pattern is valid"))
}

// Extracts all HTTP/HTTPS inline links from Markdown text
//
// Links come back in order of appearance. Duplicates are kept: every
// occurrence gets its own probe and its own report line.
//
// Example input:
//   "Check out [Rust](https://www.rust-lang.org)!"
//
// Example output:
//   vec!["https://www.rust-lang.org"]
pub fn extract_markdown_links(markdown: &str) -> Vec<String> {
    inline_link_regex()
        .captures_iter(markdown)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}
