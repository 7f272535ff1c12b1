//! File pattern matching
//!
//! One matcher serves check file patterns, plugin manifest patterns and the
//! global exclude list. Three pattern shapes are understood:
//!
//! - `vendor/` (trailing slash): directory prefix, also matched below any parent
//! - `*.go`, `cmd/**/main.go`, `[ab].txt`: globs, tried on the full path and on the file name
//! - anything else: exact path or substring

use globset::{GlobBuilder, GlobMatcher};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
#[error("invalid file pattern '{pattern}': {source}")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: globset::Error,
}

#[derive(Debug, Clone)]
enum Rule {
    Directory(String),
    Glob(GlobMatcher),
    Literal(String),
}

/// Compiled set of file patterns. An empty filter matches every file.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    rules: Vec<Rule>,
}

impl FileFilter {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PatternError> {
        let rules = patterns
            .iter()
            .map(|p| compile(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn is_match(&self, file: &str) -> bool {
        if self.rules.is_empty() {
            return true;
        }
        self.rules.iter().any(|rule| rule_matches(rule, file))
    }

    /// Files matching at least one pattern, in input order.
    pub fn filter(&self, files: &[String]) -> Vec<String> {
        files.iter().filter(|f| self.is_match(f)).cloned().collect()
    }

    /// Files matching none of the patterns. An empty filter excludes nothing.
    pub fn exclude(&self, files: &[String]) -> Vec<String> {
        if self.rules.is_empty() {
            return files.to_vec();
        }
        files.iter().filter(|f| !self.is_match(f)).cloned().collect()
    }
}

/// Check if a string contains glob pattern characters
pub fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?') || pattern.contains('[')
}

fn compile(pattern: &str) -> Result<Rule, PatternError> {
    if pattern.ends_with('/') {
        return Ok(Rule::Directory(pattern.to_string()));
    }
    if is_glob_pattern(pattern) {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(false)
            .build()
            .map_err(|source| PatternError {
                pattern: pattern.to_string(),
                source,
            })?;
        return Ok(Rule::Glob(glob.compile_matcher()));
    }
    Ok(Rule::Literal(pattern.to_string()))
}

fn rule_matches(rule: &Rule, file: &str) -> bool {
    match rule {
        Rule::Directory(dir) => file.starts_with(dir.as_str()) || file.contains(&format!("/{dir}")),
        Rule::Glob(matcher) => {
            matcher.is_match(file)
                || Path::new(file)
                    .file_name()
                    .is_some_and(|name| matcher.is_match(name))
        }
        Rule::Literal(literal) => file == literal || file.contains(literal.as_str()),
    }
}
