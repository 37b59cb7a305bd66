//! Output filters (spec §4.8, §9).
//!
//! `apply_filter` in the original `libliquify` is a stub for almost
//! every filter name — it only ever emits a `{ filter: name [buf] }`
//! diagnostic marker (see `libliquify/apply.c`). The spec (§9) keeps
//! only the filters that source actually produces usable output for:
//! `escape`, `downcase`, `upcase`. Anything else is out of scope and
//! left as that same diagnostic marker so unknown-filter templates
//! remain inspectable rather than silently losing content.

/// HTML-escapes `&`, `<`, `>`, `"`, `'`.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
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

pub fn downcase(input: &str) -> String {
    input.to_lowercase()
}

pub fn upcase(input: &str) -> String {
    input.to_uppercase()
}

/// Applies a named filter to `input`. Unrecognised filters reproduce
/// the source's diagnostic-marker behaviour rather than passing the
/// buffer through unchanged, since out-of-scope filters were never
/// "no-ops" in the original — they visibly marked themselves as unapplied.
pub fn apply(name: &str, input: &str) -> String {
    match name {
        "escape" => escape(input),
        "downcase" => downcase(input),
        "upcase" => upcase(input),
        other => format!("{{ filter: {other} [{input}] }}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_covers_the_five_entities() {
        assert_eq!(escape("<a href=\"x\">'&'</a>"), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn unknown_filter_is_a_diagnostic_marker() {
        assert_eq!(apply("truncate", "hello"), "{ filter: truncate [hello] }");
    }
}
