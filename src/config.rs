//! Configuration model and a minimal INI-subset loader.
//!
//! Configuration-file loading is named as an external-collaborator
//! concern (spec §1), but the key table (spec §6) is load-bearing for
//! every other component, so the shape lives here. The parser itself is
//! intentionally small: none of the example repos pull in a crates.io
//! INI crate, so this is hand-rolled rather than borrowed, following the
//! section/key defaults set by `quilt_config_defaults` in the original
//! `config.c`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{QuiltError, Result};

/// An ordered multimap: `section -> key -> [values]`, preserving the
/// order values were encountered so that `namespaces:*`-style tables
/// stay stable.
#[derive(Debug, Clone, Default)]
pub struct Config {
    sections: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl Config {
    /// Builds the default configuration, matching `config_set_default`
    /// calls in `quilt_config_defaults` exactly.
    pub fn defaults() -> Self {
        let mut cfg = Config::default();
        cfg.set("log", "level", "notice");
        cfg.set("log", "facility", "daemon");
        cfg.set("log", "syslog", "1");
        cfg.set("log", "stderr", "0");
        cfg.set("sparql", "query", "http://localhost/sparql/");
        cfg.set("fastcgi", "socket", "/tmp/quilt.sock");
        cfg.set("quilt", "base", "http://www.example.com/");
        cfg
    }

    /// Loads a config file on top of [`Config::defaults`], following
    /// `[section]` headers, `key = value` (or `key=value`) lines,
    /// `;`/`#` full-line comments, and blank lines. Repeated keys
    /// accumulate rather than overwrite, so `namespaces:foo=...` can be
    /// declared more than once per section... but the common form used
    /// throughout (`namespaces:foo = http://...`) encodes the sub-key in
    /// the key name itself, matching §6's `section:key=value` notation.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| QuiltError::internal(format!("reading {}: {e}", path.display())))?;
        let mut cfg = Config::defaults();
        let mut section = String::from("global");
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                section = name.trim().to_string();
                continue;
            }
            let Some(eq) = line.find('=') else {
                return Err(QuiltError::internal(format!(
                    "{}:{}: expected 'key = value'",
                    path.display(),
                    lineno + 1
                )));
            };
            let key = line[..eq].trim().to_string();
            let value = line[eq + 1..].trim().to_string();
            cfg.push(&section, &key, value);
        }
        Ok(cfg)
    }

    /// Replaces all values for `section:key` with a single value.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), vec![value.into()]);
    }

    /// Appends a value for `section:key`, preserving any already present.
    pub fn push(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .entry(key.to_string())
            .or_default()
            .push(value.into());
    }

    /// The first (or only) value for `section:key`.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)?
            .get(key)?
            .first()
            .map(String::as_str)
    }

    pub fn get_or(&self, section: &str, key: &str, default: &'static str) -> String {
        self.get(section, key).unwrap_or(default).to_string()
    }

    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        match self.get(section, key) {
            Some(v) => matches!(v, "1" | "true" | "yes" | "on"),
            None => default,
        }
    }

    /// All values registered for `section:key`, in declaration order.
    pub fn get_all(&self, section: &str, key: &str) -> &[String] {
        self.sections
            .get(section)
            .and_then(|s| s.get(key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every key in a section as `(key, value)` pairs, first value only —
    /// used for `namespaces`, `jsonld:aliases`, etc. where each key is a
    /// distinct prefix/alias.
    pub fn section_entries(&self, section: &str) -> Vec<(String, String)> {
        let Some(keys) = self.sections.get(section) else {
            return Vec::new();
        };
        keys.iter()
            .filter_map(|(k, v)| v.first().map(|first| (k.clone(), first.clone())))
            .collect()
    }

    pub fn required(&self, section: &str, key: &str) -> Result<&str> {
        self.get(section, key)
            .ok_or_else(|| QuiltError::ConfigMissing(format!("{section}:{key}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_source() {
        let cfg = Config::defaults();
        assert_eq!(cfg.get("log", "level"), Some("notice"));
        assert_eq!(cfg.get("quilt", "base"), Some("http://www.example.com/"));
        assert_eq!(cfg.get("fastcgi", "socket"), Some("/tmp/quilt.sock"));
    }

    #[test]
    fn section_entries_preserve_namespace_table() {
        let mut cfg = Config::default();
        cfg.set("namespaces", "foaf", "http://xmlns.com/foaf/0.1/");
        cfg.set("namespaces", "dct", "http://purl.org/dc/terms/");
        let mut entries = cfg.section_entries("namespaces");
        entries.sort();
        assert_eq!(
            entries,
            vec![
                ("dct".to_string(), "http://purl.org/dc/terms/".to_string()),
                ("foaf".to_string(), "http://xmlns.com/foaf/0.1/".to_string()),
            ]
        );
    }
}
