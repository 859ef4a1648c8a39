//! The sparse-checkout matcher: cone-mode and non-cone-mode pattern
//! semantics, reused by both the analyzer's tree walk and the worker pool's
//! discovery phase.
//!
//! Pure and allocation-light: [`sparse_match`] takes its patterns as an
//! already-parsed slice, does one pass over them, and allocates nothing
//! beyond what the caller already owns.

/// A single parsed line from `info/sparse-checkout`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    /// `true` if the line started with `!` (an exclusion).
    pub negated: bool,
    /// The pattern text with the `!` and any trailing `/` stripped.
    pub text: String,
    /// `true` if the original line ended in `/` (directory-only pattern).
    pub dir_only: bool,
}

/// Parse `info/sparse-checkout` file contents: one pattern per line, blank
/// lines and `#`-comments dropped.
#[must_use]
pub fn parse_sparse_file(text: &str) -> Vec<Pattern> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let negated = line.starts_with('!');
            let body = line.strip_prefix('!').unwrap_or(line);
            let dir_only = body.ends_with('/') && body.len() > 1;
            let text = body.trim_end_matches('/').to_owned();
            Pattern {
                negated,
                text,
                dir_only,
            }
        })
        .collect()
}

/// Decide whether `path` (forward-slash separated, repo-root-relative, no
/// leading slash) is included under `patterns` in the given mode.
///
/// Deterministic: identical `(path, patterns, cone_mode)` always yields the
/// same result. `sparse_match(p, &[], _) == true` for every `p` — an empty
/// pattern set includes everything.
#[must_use]
pub fn sparse_match(path: &str, patterns: &[Pattern], cone_mode: bool) -> bool {
    if patterns.is_empty() {
        return true;
    }
    if cone_mode {
        cone_match(path, patterns)
    } else {
        non_cone_match(path, patterns)
    }
}

/// `true` if a directory at `path` might still contain included files,
/// i.e. the tree walk should descend into it. This is the cone-mode
/// optimization named in the analyze algorithm: directories that cannot be
/// inside, or an ancestor of, any inclusion pattern are pruned outright.
///
/// In non-cone mode every directory is a descend candidate (gitignore
/// patterns can match arbitrarily deep basenames), so this always returns
/// `true`.
#[must_use]
pub fn should_descend(dir_path: &str, patterns: &[Pattern], cone_mode: bool) -> bool {
    if patterns.is_empty() || !cone_mode {
        return true;
    }
    patterns
        .iter()
        .filter(|p| !p.negated)
        .any(|p| cone_dir_relation(dir_path, &p.text).is_some())
}

/// Cone-mode relation between a candidate path (file OR directory) and an
/// inclusion pattern's normalized directory prefix (no trailing slash).
///
/// Returns `Some(true)` if `path` is included by `q` directly (cases i/ii of
/// §4.4), `Some(false)` if `path` is merely an ancestor of `q` (case iii,
/// descend-only, not itself included), `None` if unrelated.
fn cone_dir_relation(path: &str, q: &str) -> Option<bool> {
    if path == q {
        return Some(true);
    }
    if let Some(rest) = path.strip_prefix(q) {
        if rest.starts_with('/') {
            return Some(true);
        }
    }
    if let Some(rest) = q.strip_prefix(path) {
        if rest.starts_with('/') || path.is_empty() {
            return Some(false);
        }
    }
    None
}

fn cone_match(path: &str, patterns: &[Pattern]) -> bool {
    let root_wildcard = patterns
        .iter()
        .any(|p| !p.negated && (p.text == "*" || p.text.is_empty()));

    let included = if !path.contains('/') {
        // Root-level entries are excluded unless `/` or `*` is an inclusion
        // pattern (§4.4 "Root-level non-directory entries are excluded
        // unless `/*` or `*` appears as an inclusion").
        root_wildcard
    } else {
        patterns
            .iter()
            .filter(|p| !p.negated)
            .any(|p| cone_dir_relation(path, &p.text) == Some(true))
    };
    if !included {
        return false;
    }
    !patterns
        .iter()
        .filter(|p| p.negated)
        .any(|p| cone_dir_relation(path, &p.text) == Some(true))
}

fn non_cone_match(path: &str, patterns: &[Pattern]) -> bool {
    let inclusions: Vec<&Pattern> = patterns.iter().filter(|p| !p.negated).collect();
    let exclusions: Vec<&Pattern> = patterns.iter().filter(|p| p.negated).collect();

    // Top-level files are always included absent an explicit negative
    // pattern naming them (native-Git convention, §4.4).
    let is_root_level = !path.contains('/');
    let matched_inclusion =
        is_root_level || inclusions.iter().any(|p| gitignore_match(&p.text, path));
    let matched_exclusion = exclusions.iter().any(|p| gitignore_match(&p.text, path));

    matched_inclusion && !matched_exclusion
}

/// A small gitignore-style glob matcher: `*` matches any run of characters
/// within one path segment, `**` matches across segments, `?` matches one
/// character, a leading `/` anchors to the path root, unanchored patterns
/// match if any path segment suffix matches.
fn gitignore_match(pattern: &str, path: &str) -> bool {
    let anchored = pattern.starts_with('/') || pattern.contains('/');
    let pattern = pattern.strip_prefix('/').unwrap_or(pattern);

    if anchored {
        glob_match(pattern, path)
    } else {
        // Unanchored: the pattern may match at any path-segment boundary,
        // i.e. against any suffix of the path that starts at a `/` or the
        // start of the string.
        let mut start = 0;
        loop {
            if glob_match(pattern, &path[start..]) {
                return true;
            }
            match path[start..].find('/') {
                Some(offset) => start += offset + 1,
                None => return false,
            }
        }
    }
}

/// Glob match supporting `*`, `**`, `?`, treating `/` as a segment boundary
/// that `*` (but not `**`) cannot cross.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    glob_match_rec(&p, &t)
}

fn glob_match_rec(p: &[char], t: &[char]) -> bool {
    match p.first() {
        None => t.is_empty(),
        Some('*') => {
            if p.get(1) == Some(&'*') {
                let rest = &p[2..];
                let rest = if rest.first() == Some(&'/') { &rest[1..] } else { rest };
                (0..=t.len()).any(|i| glob_match_rec(rest, &t[i..]))
            } else {
                let rest = &p[1..];
                (0..=t.len())
                    .take_while(|&i| i == 0 || t[i - 1] != '/')
                    .any(|i| glob_match_rec(rest, &t[i..]))
            }
        }
        Some('?') => !t.is_empty() && t[0] != '/' && glob_match_rec(&p[1..], &t[1..]),
        Some(c) => !t.is_empty() && t[0] == *c && glob_match_rec(&p[1..], &t[1..]),
    }
}
