//! Canonical URI Builder (spec §4.2, C2), ported from `libquilt/canon.c`.

use bitflags::bitflags;

bitflags! {
    /// Serialisation projection flags (spec §3, §4.2).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Projection: u32 {
        const ABSOLUTE     = 0b0000_0000_0001;
        const NOABSOLUTE   = 0b0000_0000_0010;
        const NOPATH       = 0b0000_0000_0100;
        const NAME         = 0b0000_0000_1000;
        const NOEXT        = 0b0000_0001_0000;
        const FORCEEXT     = 0b0000_0010_0000;
        const NOPARAMS     = 0b0000_0100_0000;
        const FRAGMENT     = 0b0000_1000_0000;
        const USERSUPPLIED = 0b0001_0000_0000;
    }
}

/// Named shorthand combinations used throughout the engines/serialisers,
/// matching the projections spec §4.9/§4.10 refer to by name.
impl Projection {
    pub const CONCRETE: Self = Self::ABSOLUTE;
    pub const SUBJECT: Self = Self::from_bits_truncate(Self::ABSOLUTE.bits() | Self::NOEXT.bits());
    pub const ABSTRACT: Self =
        Self::from_bits_truncate(Self::NOABSOLUTE.bits() | Self::NOEXT.bits());
    pub const REQUEST: Self = Self::from_bits_truncate(Self::USERSUPPLIED.bits());
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Param {
    name: String,
    value: String,
}

/// A canonical URI under construction (spec §3, "Canonical URI").
#[derive(Debug, Clone, Default)]
pub struct Canon {
    base: String,
    path: Vec<String>,
    name: Option<String>,
    ext: Option<String>,
    explicit_ext: Option<String>,
    fragment: Option<String>,
    params: Vec<Param>,
    user_path: Option<String>,
    user_query: Option<String>,
}

impl Canon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base (scheme+authority), stripping any trailing
    /// `?query`/`#fragment` and trailing slashes, as `quilt_canon_set_base`
    /// does.
    pub fn set_base(&mut self, base: &str) {
        let mut b = base;
        if let Some(idx) = b.find(['?', '#']) {
            b = &b[..idx];
        }
        self.base = b.trim_end_matches('/').to_string();
    }

    pub fn reset_path(&mut self) {
        self.path.clear();
    }

    /// Appends a path segment, stripping leading/trailing slashes, as
    /// `quilt_canon_add_path` does; segments are joined with `/` when
    /// serialised.
    pub fn add_path(&mut self, segment: &str) {
        let trimmed = segment.trim_matches('/');
        if !trimmed.is_empty() {
            self.path.push(trimmed.to_string());
        }
    }

    pub fn set_name(&mut self, name: Option<&str>) {
        self.name = name.map(str::to_string);
    }

    pub fn set_ext(&mut self, ext: Option<&str>) {
        self.ext = ext
            .map(|e| e.trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty());
    }

    pub fn set_explicit_ext(&mut self, ext: Option<&str>) {
        self.explicit_ext = ext
            .map(|e| e.trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty());
    }

    pub fn set_fragment(&mut self, fragment: Option<&str>) {
        self.fragment = fragment
            .map(|f| f.trim_start_matches('#').to_string())
            .filter(|f| !f.is_empty());
    }

    pub fn set_user_path(&mut self, path: &str) {
        let stripped = path.trim_start_matches('/');
        let truncated = stripped.split('?').next().unwrap_or(stripped);
        self.user_path = Some(truncated.to_string());
    }

    pub fn set_user_query(&mut self, query: &str) {
        self.user_query = Some(query.trim_start_matches('?').to_string());
    }

    pub fn reset_params(&mut self) {
        self.params.clear();
    }

    /// Deletes every existing entry for `name`, then adds every value in
    /// `values`, url-encoding each (`quilt_canon_set_param_multi`).
    pub fn set_param_multi(&mut self, name: &str, values: &[&str]) {
        self.delete_param(name);
        for v in values {
            self.add_param(name, v);
        }
    }

    /// Replaces all values for `name` with a single `value`, or deletes
    /// every entry for `name` if `value` is `None` (spec §4.2).
    pub fn set_param(&mut self, name: &str, value: Option<&str>) {
        self.delete_param(name);
        if let Some(v) = value {
            self.add_param(name, v);
        }
    }

    /// Adds a parameter without removing existing entries for the same
    /// name, url-encoding the value and re-sorting (name, value).
    pub fn add_param(&mut self, name: &str, value: &str) {
        self.params.push(Param {
            name: name.to_string(),
            value: urlencode_maybe(value),
        });
        self.params.sort();
    }

    fn delete_param(&mut self, name: &str) {
        self.params.retain(|p| p.name != name);
    }

    /// Serialises under the given projection, following
    /// `quilt_canon_str`'s precedence rules (spec §4.2).
    pub fn to_string_with(&self, proj: Projection) -> String {
        let mut out = String::new();

        if !proj.contains(Projection::NOABSOLUTE) {
            out.push_str(&self.base);
        }

        if proj.contains(Projection::USERSUPPLIED) && self.user_path.is_some() {
            out.push('/');
            out.push_str(self.user_path.as_deref().unwrap_or(""));
        } else if !proj.contains(Projection::NOPATH) {
            out.push('/');
            out.push_str(&self.path.join("/"));

            let force_ext = proj.contains(Projection::FORCEEXT);
            let no_ext = proj.contains(Projection::NOEXT) && !force_ext;
            let want_name = proj.contains(Projection::NAME)
                || (!no_ext && (self.explicit_ext.is_some() || (force_ext && self.ext.is_some())));

            if want_name {
                if let Some(name) = &self.name {
                    if !self.path.is_empty() {
                        out.push('/');
                    }
                    out.push_str(name);
                }
            }

            if !no_ext {
                let ext = if force_ext {
                    self.ext.as_deref().or(self.explicit_ext.as_deref())
                } else {
                    self.explicit_ext.as_deref().or(self.ext.as_deref())
                };
                if let Some(ext) = ext {
                    out.push('.');
                    out.push_str(ext);
                }
            }
        }

        let query = if proj.contains(Projection::USERSUPPLIED) {
            self.user_query.clone()
        } else if proj.contains(Projection::NOPARAMS) || self.params.is_empty() {
            None
        } else {
            Some(
                self.params
                    .iter()
                    .map(|p| format!("{}={}", p.name, p.value))
                    .collect::<Vec<_>>()
                    .join("&"),
            )
        };
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            out.push('?');
            out.push_str(&q);
        }

        if proj.contains(Projection::FRAGMENT) {
            if let Some(frag) = &self.fragment {
                out.push('#');
                out.push_str(frag);
            }
        }

        out
    }
}

/// Selective percent-encoding for parameter values (spec §4.2): space
/// becomes `+`; `&`, `#`, space, and any non-printable or >127 byte are
/// always `%XX`-encoded; a `%` already followed by two hex digits passes
/// through unchanged (preserving values a client has already encoded).
/// Ported from `quilt_canon_urlencode_maybe_`.
fn urlencode_maybe(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let ch = bytes[i];
        if ch == b' ' {
            out.push('+');
            i += 1;
            continue;
        }
        if ch == b'%' && i + 2 < bytes.len() && is_hex(bytes[i + 1]) && is_hex(bytes[i + 2]) {
            out.push('%');
            out.push(bytes[i + 1] as char);
            out.push(bytes[i + 2] as char);
            i += 3;
            continue;
        }
        if ch == b'&' || ch == b'#' || ch == b'=' || !(0x20..0x7f).contains(&ch) {
            out.push_str(&format!("%{ch:02X}"));
            i += 1;
            continue;
        }
        out.push(ch as char);
        i += 1;
    }
    out
}

fn is_hex(b: u8) -> bool {
    b.is_ascii_hexdigit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn built() -> Canon {
        let mut c = Canon::new();
        c.set_base("http://example.org/");
        c.add_path("thing");
        c.set_ext(Some("ttl"));
        c
    }

    #[test]
    fn canonical_ordering_is_param_order_independent() {
        let mut a = built();
        a.add_param("bar", "1");
        a.add_param("foo", "2");

        let mut b = built();
        b.add_param("foo", "2");
        b.add_param("bar", "1");

        assert_eq!(
            a.to_string_with(Projection::ABSOLUTE),
            b.to_string_with(Projection::ABSOLUTE)
        );
        assert_eq!(
            a.to_string_with(Projection::ABSOLUTE),
            "http://example.org/thing.ttl?bar=1&foo=2"
        );
    }

    #[test]
    fn noext_suppresses_extension() {
        let c = built();
        assert_eq!(
            c.to_string_with(Projection::ABSOLUTE | Projection::NOEXT),
            "http://example.org/thing"
        );
    }

    #[test]
    fn forceext_overrides_noext() {
        let c = built();
        assert_eq!(
            c.to_string_with(Projection::ABSOLUTE | Projection::NOEXT | Projection::FORCEEXT),
            "http://example.org/thing.ttl"
        );
    }

    #[test]
    fn urlencode_preserves_existing_percent_encoding() {
        assert_eq!(urlencode_maybe("a%20b"), "a%20b");
        assert_eq!(urlencode_maybe("a b"), "a+b");
        assert_eq!(urlencode_maybe("a&b#c=d"), "a%26b%23c%3Dd");
    }

    #[test]
    fn set_param_none_deletes_all() {
        let mut c = built();
        c.add_param("foo", "1");
        c.add_param("foo", "2");
        c.set_param("foo", None);
        assert_eq!(c.to_string_with(Projection::ABSOLUTE), "http://example.org/thing.ttl");
    }

    #[test]
    fn forceext_with_name_and_no_explicit_ext_still_emits_the_name() {
        let mut c = Canon::new();
        c.set_base("http://example.org/");
        c.set_ext(Some("ttl"));
        c.set_name(Some("index"));
        assert_eq!(
            c.to_string_with(Projection::ABSOLUTE | Projection::FORCEEXT),
            "http://example.org/index.ttl"
        );
    }

    #[test]
    fn forceext_falls_back_to_explicit_ext_when_negotiated_ext_is_absent() {
        let mut c = Canon::new();
        c.set_base("http://example.org/");
        c.add_path("thing");
        c.set_explicit_ext(Some("ttl"));
        assert_eq!(
            c.to_string_with(Projection::ABSOLUTE | Projection::FORCEEXT),
            "http://example.org/thing.ttl"
        );
    }
}
