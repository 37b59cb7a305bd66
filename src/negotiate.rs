//! HTTP content negotiation (spec §4.1, C1).
//!
//! Faithfully ports `libnegotiate/negotiate.c`'s fixed-point `q` parsing
//! and two-level (media-type) wildcard scoring, rather than parsing `q`
//! as a float — the source's `neg_parse_q_` only ever reads up to three
//! decimal digits and the spec (§9) requires that this be preserved
//! exactly.

use std::collections::HashMap;

/// One registered offer: a name (a full media type for two-level
/// negotiation, or a bare token such as a language tag for single-level)
/// and its server-side preference weight.
#[derive(Debug, Clone)]
struct Entry {
    name: String,
    qs: f64,
    q: f64,
    qp: f64,
    qw: f64,
}

/// A negotiator over either single-level (language, charset) or
/// two-level (media type) offers. Registration order is preserved so
/// that ties are broken in favour of the earliest-registered offer, as
/// in the source's `neg_check_match_`.
#[derive(Debug, Clone, Default)]
pub struct Negotiator {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl Negotiator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or re-registers, replacing `qs`) an offer. `qs` is
    /// clamped to `[0, 1]`, as `neg_add` does.
    pub fn add(&mut self, name: &str, qs: f64) {
        let qs = qs.clamp(0.0, 1.0);
        let key = name.to_ascii_lowercase();
        if let Some(&idx) = self.index.get(&key) {
            self.entries[idx].qs = qs;
            return;
        }
        self.index.insert(key, self.entries.len());
        self.entries.push(Entry {
            name: name.to_string(),
            qs,
            q: 0.0,
            qp: 0.0,
            qw: 0.0,
        });
    }

    /// Single-level negotiation (language/charset-style): only exact
    /// match and a bare `*` wildcard are recognised.
    pub fn negotiate(&mut self, accept: &str) -> Option<&str> {
        self.reset_scores();
        for token in Self::tokens(accept) {
            let (value, client_q) = Self::split_q(token);
            for e in &mut self.entries {
                if value == "*" {
                    e.qw = e.qw.max(e.qs * client_q);
                } else if value.eq_ignore_ascii_case(&e.name) {
                    e.q = e.q.max(e.qs * client_q);
                }
            }
        }
        Self::best(&self.entries)
    }

    /// Two-level (media-type) negotiation: exact match, `primary/*`
    /// prefix wildcard, and full `*/*` wildcard.
    pub fn negotiate_type(&mut self, accept: &str) -> Option<&str> {
        self.reset_scores();
        for token in Self::tokens(accept) {
            let (value, client_q) = Self::split_q(token);
            for e in &mut self.entries {
                if value.eq_ignore_ascii_case("*/*") {
                    e.qw = e.qw.max(e.qs * client_q);
                } else if value.eq_ignore_ascii_case(&e.name) {
                    e.q = e.q.max(e.qs * client_q);
                } else if let Some(primary) = value.strip_suffix("/*") {
                    if let Some(entry_primary) = e.name.split('/').next() {
                        if primary.eq_ignore_ascii_case(entry_primary) {
                            e.qp = e.qp.max(e.qs * client_q);
                        }
                    }
                }
            }
        }
        Self::best(&self.entries)
    }

    fn reset_scores(&mut self) {
        for e in &mut self.entries {
            e.q = 0.0;
            e.qp = 0.0;
            e.qw = 0.0;
        }
    }

    fn best(entries: &[Entry]) -> Option<&str> {
        let mut winner: Option<&Entry> = None;
        let mut best_score = 0.0f64;
        for e in entries {
            let score = e.q.max(e.qp).max(e.qw);
            if score <= 0.0 {
                continue;
            }
            // q > qp > qw precedence when scores tie numerically: check
            // in that order and only replace a current winner on a
            // strictly greater score, matching `neg_check_match_`'s
            // `>` (not `>=`) comparisons, so the first-registered entry
            // at a given score keeps the win.
            if winner.is_none() || score > best_score {
                winner = Some(e);
                best_score = score;
            } else if (score - best_score).abs() < f64::EPSILON {
                if let Some(w) = winner {
                    if e.q > w.q || (e.q == w.q && e.qp > w.qp) {
                        winner = Some(e);
                    }
                }
            }
        }
        winner.map(|e| e.name.as_str())
    }

    /// Splits an accept-header on commas, trimming whitespace and
    /// skipping empty tokens, exactly as `neg_negotiate_next_` does.
    fn tokens(accept: &str) -> impl Iterator<Item = &str> {
        accept
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Splits a single accept-header token into its bare value and
    /// parsed `q`, scanning for a `;q=` parameter the way the source's
    /// manual character scan does (ignoring any other `;`-parameters).
    fn split_q(token: &str) -> (&str, f64) {
        let mut parts = token.splitn(2, ';');
        let value = parts.next().unwrap_or("").trim();
        let rest = parts.next().unwrap_or("");
        for param in rest.split(';') {
            let param = param.trim();
            if let Some(qval) = param.strip_prefix("q=").or_else(|| param.strip_prefix("Q=")) {
                return (value, parse_q(qval));
            }
        }
        (value, 1.0)
    }
}

/// Fixed-point `q` parser, ported from `neg_parse_q_`: defaults to `1`;
/// a leading `0` sets `q` to `0` and is consumed; if no `.` follows,
/// returns as-is (so `"1"` stays `1`, `"0"` becomes `0`); otherwise reads
/// up to three decimal digits weighted ×100/×10/×1 and divides by 1000.
fn parse_q(input: &str) -> f64 {
    let bytes = input.as_bytes();
    let mut i = 0;
    let mut q: i64 = 1000;
    if i < bytes.len() && bytes[i] == b'0' {
        q = 0;
        i += 1;
    }
    if i >= bytes.len() || bytes[i] != b'.' {
        return (q as f64) / 1000.0;
    }
    i += 1;
    q = 0;
    let weights = [100i64, 10, 1];
    for &w in &weights {
        if i < bytes.len() && bytes[i].is_ascii_digit() {
            q += (bytes[i] - b'0') as i64 * w;
            i += 1;
        }
    }
    (q as f64) / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_q_matches_source_fixed_point() {
        assert_eq!(parse_q("1"), 1.0);
        assert_eq!(parse_q("0"), 0.0);
        assert_eq!(parse_q("0.5"), 0.5);
        assert_eq!(parse_q("0.753"), 0.753);
        assert_eq!(parse_q("0.7539"), 0.753); // only 3 digits read
    }

    #[test]
    fn totality_any_qs_positive_matches_star_star() {
        let mut neg = Negotiator::new();
        neg.add("text/turtle", 0.9);
        neg.add("application/ld+json", 1.0);
        assert!(neg.negotiate_type("*/*").is_some());
    }

    #[test]
    fn exact_beats_prefix_beats_wildcard() {
        let mut neg = Negotiator::new();
        neg.add("text/turtle", 1.0);
        neg.add("text/html", 1.0);
        let best = neg
            .negotiate_type("text/*, text/turtle, */*")
            .map(String::from);
        assert_eq!(best.as_deref(), Some("text/turtle"));
    }

    #[test]
    fn duplicate_registration_overwrites_qs() {
        let mut neg = Negotiator::new();
        neg.add("text/turtle", 0.1);
        neg.add("text/turtle", 0.9);
        let best = neg.negotiate_type("text/turtle;q=1").map(String::from);
        assert_eq!(best.as_deref(), Some("text/turtle"));
    }

    #[test]
    fn no_match_returns_none() {
        let mut neg = Negotiator::new();
        neg.add("text/turtle", 1.0);
        assert!(neg.negotiate_type("application/json").is_none());
    }
}
