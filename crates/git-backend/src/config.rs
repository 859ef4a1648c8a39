//! The config service: an INI-ish parser/serializer plus the four-scope
//! (system, global, local, worktree) merge-read semantics described in the
//! data model.
//!
//! This is deliberately independent of [`crate::fs_backend`] — it operates on
//! in-memory text, so any [`crate::GitBackend`] implementation (filesystem,
//! in-memory, ...) can hand it the bytes it already has for each scope.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::repo::ConfigScope;

/// A single parsed `key = value` pair, scoped to a section/subsection.
#[derive(Clone, Debug, PartialEq, Eq)]
struct RawEntry {
    section: String,
    subsection: Option<String>,
    key: String,
    value: String,
}

/// One scope's worth of parsed config entries, in file order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigFile {
    entries: Vec<RawEntry>,
}

impl ConfigFile {
    /// Parse INI-ish config text: `[section]`, `[section "subsection"]`
    /// headers, `key = value` or bare `key` (boolean `true`) lines, `#`/`;`
    /// comments, blank lines ignored.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut entries = Vec::new();
        let mut section = String::new();
        let mut subsection: Option<String> = None;

        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(header) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                let header = header.trim();
                if let Some(quote_start) = header.find('"') {
                    section = header[..quote_start].trim().to_lowercase();
                    let rest = &header[quote_start + 1..];
                    let sub = rest.strip_suffix('"').unwrap_or(rest);
                    subsection = Some(sub.to_owned());
                } else {
                    section = header.to_lowercase();
                    subsection = None;
                }
                continue;
            }
            let (key, value) = match line.split_once('=') {
                Some((k, v)) => (k.trim().to_lowercase(), unquote(v.trim())),
                None => (line.to_lowercase(), "true".to_owned()),
            };
            entries.push(RawEntry {
                section: section.clone(),
                subsection: subsection.clone(),
                key,
                value,
            });
        }

        Self { entries }
    }

    /// Serialize back to INI-ish text, grouping by section/subsection in
    /// first-seen order.
    #[must_use]
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        let mut current: Option<(String, Option<String>)> = None;
        for e in &self.entries {
            let header = (e.section.clone(), e.subsection.clone());
            if current.as_ref() != Some(&header) {
                if let Some(sub) = &e.subsection {
                    let _ = writeln!(out, "[{} \"{sub}\"]", e.section);
                } else {
                    let _ = writeln!(out, "[{}]", e.section);
                }
                current = Some(header);
            }
            let _ = writeln!(out, "\t{} = {}", e.key, e.value);
        }
        out
    }

    pub(crate) fn get_path(&self, section: &str, subsection: Option<&str>, key: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| {
                e.section.eq_ignore_ascii_case(section)
                    && e.subsection.as_deref() == subsection
                    && e.key.eq_ignore_ascii_case(key)
            })
            .map(|e| e.value.as_str())
            .collect()
    }

    pub(crate) fn subsections(&self, section: &str) -> Vec<String> {
        let mut seen = BTreeMap::new();
        for e in &self.entries {
            if e.section.eq_ignore_ascii_case(section) {
                if let Some(sub) = &e.subsection {
                    seen.insert(sub.clone(), ());
                }
            }
        }
        seen.into_keys().collect()
    }

    fn sections(&self) -> Vec<String> {
        let mut seen = BTreeMap::new();
        for e in &self.entries {
            seen.insert(e.section.clone(), ());
        }
        seen.into_keys().collect()
    }

    fn set(&mut self, section: &str, subsection: Option<&str>, key: &str, value: &str, append: bool) {
        if !append {
            self.entries.retain(|e| {
                !(e.section.eq_ignore_ascii_case(section)
                    && e.subsection.as_deref() == subsection
                    && e.key.eq_ignore_ascii_case(key))
            });
        }
        self.entries.push(RawEntry {
            section: section.to_lowercase(),
            subsection: subsection.map(str::to_owned),
            key: key.to_lowercase(),
            value: value.to_owned(),
        });
    }
}

fn unquote(v: &str) -> String {
    if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
        v[1..v.len() - 1].replace("\\\"", "\"")
    } else {
        v.to_owned()
    }
}

/// The four config scopes, held as parsed [`ConfigFile`]s, merged per the
/// data model's precedence: system < global < local < worktree.
#[derive(Clone, Debug, Default)]
pub struct ConfigService {
    system: ConfigFile,
    global: ConfigFile,
    local: ConfigFile,
    worktree: ConfigFile,
}

impl ConfigService {
    /// Build a service from already-read scope text (missing scopes pass `""`).
    #[must_use]
    pub fn from_scopes(system: &str, global: &str, local: &str, worktree: &str) -> Self {
        Self {
            system: ConfigFile::parse(system),
            global: ConfigFile::parse(global),
            local: ConfigFile::parse(local),
            worktree: ConfigFile::parse(worktree),
        }
    }

    fn file(&self, scope: ConfigScope) -> &ConfigFile {
        match scope {
            ConfigScope::System => &self.system,
            ConfigScope::Global => &self.global,
            ConfigScope::Local => &self.local,
            ConfigScope::Worktree => &self.worktree,
        }
    }

    fn file_mut(&mut self, scope: ConfigScope) -> &mut ConfigFile {
        match scope {
            ConfigScope::System => &mut self.system,
            ConfigScope::Global => &mut self.global,
            ConfigScope::Local => &mut self.local,
            ConfigScope::Worktree => &mut self.worktree,
        }
    }

    /// The highest-precedence value for a dotted path, or `None` if unset in
    /// every scope.
    #[must_use]
    pub fn get(&self, path: &crate::repo::ConfigPath) -> Option<String> {
        for scope in [
            ConfigScope::Worktree,
            ConfigScope::Local,
            ConfigScope::Global,
            ConfigScope::System,
        ] {
            let vals = self
                .file(scope)
                .get_path(&path.section, path.subsection.as_deref(), &path.key);
            if let Some(v) = vals.last() {
                return Some((*v).to_owned());
            }
        }
        None
    }

    /// All values across local then worktree scope, preserving insertion
    /// order within each (the data model's `getAll` semantics).
    #[must_use]
    pub fn get_all(&self, path: &crate::repo::ConfigPath) -> Vec<String> {
        let mut out = Vec::new();
        for scope in [ConfigScope::Local, ConfigScope::Worktree] {
            out.extend(
                self.file(scope)
                    .get_path(&path.section, path.subsection.as_deref(), &path.key)
                    .into_iter()
                    .map(str::to_owned),
            );
        }
        out
    }

    /// The union of subsection names for a section across all four scopes.
    #[must_use]
    pub fn subsections(&self, section: &str) -> Vec<String> {
        let mut all: BTreeMap<String, ()> = BTreeMap::new();
        for scope in [
            ConfigScope::System,
            ConfigScope::Global,
            ConfigScope::Local,
            ConfigScope::Worktree,
        ] {
            for s in self.file(scope).subsections(section) {
                all.insert(s, ());
            }
        }
        all.into_keys().collect()
    }

    /// The union of section names across all four scopes.
    #[must_use]
    pub fn sections(&self) -> Vec<String> {
        let mut all: BTreeMap<String, ()> = BTreeMap::new();
        for scope in [
            ConfigScope::System,
            ConfigScope::Global,
            ConfigScope::Local,
            ConfigScope::Worktree,
        ] {
            for s in self.file(scope).sections() {
                all.insert(s, ());
            }
        }
        all.into_keys().collect()
    }

    /// Set a value in the given scope's in-memory file; callers are
    /// responsible for persisting `serialize_scope` back through the backend.
    pub fn set(
        &mut self,
        path: &crate::repo::ConfigPath,
        value: &str,
        scope: ConfigScope,
        append: bool,
    ) {
        self.file_mut(scope).set(
            &path.section,
            path.subsection.as_deref(),
            &path.key,
            value,
            append,
        );
    }

    /// Serialize a single scope back to file text, for the backend to write.
    #[must_use]
    pub fn serialize_scope(&self, scope: ConfigScope) -> String {
        self.file(scope).serialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::ConfigPath;

    #[test]
    fn parses_sections_and_subsections() {
        let text = "[core]\n\tbare = false\n[remote \"origin\"]\n\turl = https://example.com/repo.git\n";
        let f = ConfigFile::parse(text);
        assert_eq!(f.get_path("core", None, "bare"), vec!["false"]);
        assert_eq!(
            f.get_path("remote", Some("origin"), "url"),
            vec!["https://example.com/repo.git"]
        );
    }

    #[test]
    fn bare_key_is_boolean_true() {
        let f = ConfigFile::parse("[core]\n\tbare\n");
        assert_eq!(f.get_path("core", None, "bare"), vec!["true"]);
    }

    #[test]
    fn scope_precedence_local_over_global() {
        let svc = ConfigService::from_scopes("", "[user]\n\tname = Global\n", "[user]\n\tname = Local\n", "");
        let path = ConfigPath::parse("user.name");
        assert_eq!(svc.get(&path), Some("Local".to_owned()));
    }

    #[test]
    fn get_all_concatenates_local_then_worktree() {
        let svc = ConfigService::from_scopes(
            "",
            "",
            "[remote \"origin\"]\n\tfetch = +refs/heads/a:refs/remotes/origin/a\n",
            "[remote \"origin\"]\n\tfetch = +refs/heads/b:refs/remotes/origin/b\n",
        );
        let path = ConfigPath::parse("remote.origin.fetch");
        assert_eq!(
            svc.get_all(&path),
            vec![
                "+refs/heads/a:refs/remotes/origin/a".to_owned(),
                "+refs/heads/b:refs/remotes/origin/b".to_owned(),
            ]
        );
    }

    #[test]
    fn subsections_is_set_union() {
        let svc = ConfigService::from_scopes(
            "",
            "",
            "[remote \"origin\"]\n\turl = a\n",
            "[remote \"upstream\"]\n\turl = b\n",
        );
        let mut subs = svc.subsections("remote");
        subs.sort();
        assert_eq!(subs, vec!["origin".to_owned(), "upstream".to_owned()]);
    }

    #[test]
    fn round_trip_serialize() {
        let mut svc = ConfigService::default();
        svc.set(&ConfigPath::parse("core.bare"), "false", ConfigScope::Local, false);
        let text = svc.serialize_scope(ConfigScope::Local);
        let reparsed = ConfigFile::parse(&text);
        assert_eq!(reparsed.get_path("core", None, "bare"), vec!["false"]);
    }
}
