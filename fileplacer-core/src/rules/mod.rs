// Rules module - routing of file names to destination folders
// - pattern.rs: restricted glob compiled to an anchored matcher
// - table.rs: ordered category table and first-match lookup
// - document.rs: rule workbook loading and template synthesis

pub mod document;
pub mod pattern;
pub mod table;

pub use document::{load_rule_table, write_template};
pub use pattern::FilePattern;
pub use table::{Destination, Rule, RuleTable};
