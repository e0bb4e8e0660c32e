use anyhow::Result;
use regex::{Regex, RegexBuilder};
use std::fmt;

/// Single wildcard token; everything else in a pattern is literal text
pub const WILDCARD: char = '*';

/// A restricted glob compiled once into an anchored, case-insensitive matcher.
///
/// `*` matches any run of characters (possibly empty). Every other character,
/// regex metacharacters included, matches itself.
#[derive(Clone)]
pub struct FilePattern {
    source: String,
    matcher: Regex,
}

impl FilePattern {
    pub fn compile(pattern: &str) -> Result<Self> {
        let body = pattern
            .split(WILDCARD)
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        let matcher = RegexBuilder::new(&format!("^(?s:{body})$"))
            .case_insensitive(true)
            .build()?;

        Ok(Self {
            source: pattern.to_string(),
            matcher,
        })
    }

    /// True when the whole file name matches
    pub fn matches(&self, file_name: &str) -> bool {
        self.matcher.is_match(file_name)
    }
}

impl fmt::Debug for FilePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FilePattern").field(&self.source).finish()
    }
}
