//! Exclusion rules
//!
//! Rules come from up to two ignore files at the sync root: `.gitignore`
//! (version-control rules) and `.projsyncignore` (tool rules). Each file is
//! parsed into a [`PatternList`] with gitignore-style semantics:
//!
//! - blank lines and `#` comments are skipped
//! - `!pattern` re-includes a path matched earlier in the same file
//! - a leading `/` or an inner `/` anchors the pattern to the root
//! - a pattern without `/` matches a file or directory name at any depth
//! - a trailing `/` only matches directories
//! - `*` and `?` never cross `/`; `**` spans directories
//!
//! Once a directory is excluded nothing beneath it can be re-included.
//! Across the two files a path is excluded if either file excludes it.

use std::io::ErrorKind;
use std::path::Path;

use glob::{MatchOptions, Pattern};
use tracing::{debug, warn};

use projsync_core::domain::newtypes::RelativePath;

/// Version-control ignore file
pub const VCS_IGNORE_FILE: &str = ".gitignore";

/// Tool-specific ignore file
pub const TOOL_IGNORE_FILE: &str = ".projsyncignore";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
struct Rule {
    pattern: Pattern,
    negated: bool,
    dir_only: bool,
    anchored: bool,
}

impl Rule {
    fn parse(line: &str) -> Option<Result<Self, glob::PatternError>> {
        let mut text = trim_trailing_spaces(line);
        if text.is_empty() || text.starts_with('#') {
            return None;
        }

        let negated = text.starts_with('!');
        if negated {
            text = &text[1..];
        } else if text.starts_with("\\!") || text.starts_with("\\#") {
            text = &text[1..];
        }

        let dir_only = text.ends_with('/');
        let text = text.trim_end_matches('/');
        let anchored = text.contains('/');
        let text = text.trim_start_matches('/');
        if text.is_empty() {
            return None;
        }

        Some(Pattern::new(text).map(|pattern| Self {
            pattern,
            negated,
            dir_only,
            anchored,
        }))
    }

    /// Tests the rule against one path prefix
    fn matches(&self, prefix: &str, name: &str, is_dir: bool) -> bool {
        if self.dir_only && !is_dir {
            return false;
        }
        let subject = if self.anchored { prefix } else { name };
        self.pattern.matches_with(subject, MATCH_OPTIONS)
    }
}

/// Strips trailing spaces unless escaped with a backslash
fn trim_trailing_spaces(line: &str) -> &str {
    let line = line.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim_end_matches(' ');
    if trimmed.ends_with('\\') && trimmed.len() < line.len() {
        &line[..trimmed.len() + 1]
    } else {
        trimmed
    }
}

/// Ordered rules from one source; the last matching rule decides
#[derive(Debug, Clone, Default)]
pub struct PatternList {
    rules: Vec<Rule>,
}

impl PatternList {
    /// Parses ignore-file contents, skipping invalid patterns with a warning
    pub fn parse(source: &str, contents: &str) -> Self {
        let mut rules = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            match Rule::parse(line) {
                Some(Ok(rule)) => rules.push(rule),
                Some(Err(err)) => {
                    warn!(source, line = index + 1, %err, "Skipping invalid ignore pattern");
                }
                None => {}
            }
        }
        Self { rules }
    }

    /// Builds a list from individual patterns, failing on the first invalid one
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, glob::PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Vec::new();
        for pattern in patterns {
            if let Some(rule) = Rule::parse(pattern.as_ref()) {
                rules.push(rule?);
            }
        }
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Verdict of the last rule matching exactly this prefix, if any
    fn verdict(&self, prefix: &str, name: &str, is_dir: bool) -> Option<bool> {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.matches(prefix, name, is_dir))
            .map(|rule| !rule.negated)
    }

    /// Returns true if `path` (or one of its ancestor directories) is matched
    pub fn matches(&self, path: &RelativePath, is_dir: bool) -> bool {
        let full = path.as_str();
        let segments: Vec<&str> = full.split('/').collect();
        let mut end = 0;

        for (index, name) in segments.iter().enumerate() {
            end += name.len() + usize::from(index > 0);
            let prefix = &full[..end];
            let last = index + 1 == segments.len();
            let prefix_is_dir = !last || is_dir;

            let verdict = self.verdict(prefix, name, prefix_is_dir);
            if last {
                return verdict.unwrap_or(false);
            }
            if verdict == Some(true) {
                return true;
            }
        }
        false
    }
}

/// Rules from every ignore source at a root
#[derive(Debug, Clone, Default)]
pub struct ExclusionRuleSet {
    sources: Vec<(String, PatternList)>,
}

impl ExclusionRuleSet {
    /// A rule set that excludes nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads `.gitignore` and `.projsyncignore` from `root`
    ///
    /// A missing file contributes no rules. An unreadable file is logged and
    /// treated as missing.
    pub fn load(root: &Path) -> Self {
        let mut set = Self::empty();
        for name in [VCS_IGNORE_FILE, TOOL_IGNORE_FILE] {
            match std::fs::read_to_string(root.join(name)) {
                Ok(contents) => {
                    let list = PatternList::parse(name, &contents);
                    debug!(source = name, rules = list.len(), "Loaded ignore rules");
                    set.sources.push((name.to_string(), list));
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => {
                    warn!(source = name, %err, "Could not read ignore file, ignoring it");
                }
            }
        }
        set
    }

    /// Adds rules parsed from `contents` as an independent source
    pub fn add_source(&mut self, name: impl Into<String>, contents: &str) {
        let name = name.into();
        let list = PatternList::parse(&name, contents);
        self.sources.push((name, list));
    }

    /// Returns true if any source excludes `path`
    pub fn is_excluded(&self, path: &RelativePath, is_dir: bool) -> bool {
        self.sources
            .iter()
            .any(|(_, list)| list.matches(path, is_dir))
    }

    /// Names of the loaded sources, in load order
    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|(name, _)| name.as_str())
    }
}
