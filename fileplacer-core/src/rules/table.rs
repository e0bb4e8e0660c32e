use super::pattern::FilePattern;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// A single routing rule: files matching `pattern` go to `destination`
#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: FilePattern,
    /// Sub-path below `<destination_base>/<category>`
    pub destination: String,
}

impl Rule {
    pub fn new(pattern: &str, destination: &str) -> Result<Self> {
        Ok(Self {
            pattern: FilePattern::compile(pattern)?,
            destination: destination.to_string(),
        })
    }
}

/// Where a file name was routed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination<'a> {
    pub category: &'a str,
    pub subpath: &'a str,
}

impl Destination<'_> {
    /// `<base>/<category>/<subpath>`; both separator styles split the
    /// subpath, empty and `.` segments are dropped
    pub fn folder_under(&self, base: &Path) -> PathBuf {
        let mut folder = base.join(self.category);
        for segment in self
            .subpath
            .split(['/', '\\'])
            .filter(|s| !s.is_empty() && *s != ".")
        {
            folder.push(segment);
        }
        folder
    }
}

/// Ordered category → rules mapping, built once per run.
///
/// Lookup is strictly first-match-wins: categories in load order, then rules
/// in row order.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    categories: Vec<(String, Vec<Rule>)>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a category. Names are lower-cased; a category without rules is
    /// dropped, and a repeated name replaces the earlier rules in place.
    pub fn insert_category(&mut self, name: &str, rules: Vec<Rule>) {
        if rules.is_empty() {
            return;
        }
        let name = name.to_lowercase();
        match self.categories.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = rules,
            None => self.categories.push((name, rules)),
        }
    }

    pub fn find_destination(&self, file_name: &str) -> Option<Destination<'_>> {
        self.categories.iter().find_map(|(category, rules)| {
            rules
                .iter()
                .find(|rule| rule.pattern.matches(file_name))
                .map(|rule| Destination {
                    category,
                    subpath: &rule.destination,
                })
        })
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn rule_count(&self) -> usize {
        self.categories.iter().map(|(_, rules)| rules.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(pairs: &[(&str, &str)]) -> Vec<Rule> {
        pairs.iter().map(|(p, d)| Rule::new(p, d).unwrap()).collect()
    }

    #[test]
    fn test_first_category_wins() {
        let mut table = RuleTable::new();
        table.insert_category("Finance", rules(&[("invoice.*.pdf", "Docs/Invoices")]));
        table.insert_category("Archive", rules(&[("*.pdf", "Pdf")]));

        let found = table.find_destination("invoice.2024.pdf").unwrap();
        assert_eq!(found.category, "finance");
        assert_eq!(found.subpath, "Docs/Invoices");

        let fallback = table.find_destination("notes.pdf").unwrap();
        assert_eq!(fallback.category, "archive");
    }

    #[test]
    fn test_rule_order_within_category() {
        let mut table = RuleTable::new();
        table.insert_category(
            "models",
            rules(&[("*.ifc", "BIM/Models"), ("building.*.ifc", "BIM/Buildings")]),
        );
        let found = table.find_destination("building.a.ifc").unwrap();
        assert_eq!(found.subpath, "BIM/Models");
    }

    #[test]
    fn test_no_match() {
        let mut table = RuleTable::new();
        table.insert_category("docs", rules(&[("*.pdf", "Pdf")]));
        assert!(table.find_destination("photo.jpg").is_none());
    }

    #[test]
    fn test_empty_category_is_dropped() {
        let mut table = RuleTable::new();
        table.insert_category("empty", Vec::new());
        assert!(table.is_empty());
    }

    #[test]
    fn test_duplicate_category_keeps_position() {
        let mut table = RuleTable::new();
        table.insert_category("Docs", rules(&[("*.txt", "Old")]));
        table.insert_category("other", rules(&[("*.txt", "Other")]));
        table.insert_category("DOCS", rules(&[("*.txt", "New")]));

        assert_eq!(table.category_count(), 2);
        let found = table.find_destination("a.txt").unwrap();
        assert_eq!(found.category, "docs");
        assert_eq!(found.subpath, "New");
    }

    #[test]
    fn test_folder_under_normalizes_subpath() {
        let dest = Destination {
            category: "finance",
            subpath: "/Docs\\Invoices//2024/",
        };
        assert_eq!(
            dest.folder_under(Path::new("/out")),
            Path::new("/out/finance/Docs/Invoices/2024")
        );
    }
}
