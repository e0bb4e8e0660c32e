// Fileplacer Core Library
//
// Rule-driven placement of files from a drop folder into a destination tree,
// with structural metadata reports for building model files.
// Main interface is `Organizer::run`.

pub mod types;
pub mod error;
pub mod config;
pub mod rules;
pub mod versioning;
pub mod models;
pub mod extractor;
pub mod report;
pub mod processor;

// Re-export main types and functions for easy use
pub use types::*;
pub use error::OrganizerError;
pub use config::{LoadedConfig, OrganizerConfig, Toggle};
pub use rules::{load_rule_table, write_template, RuleTable};
pub use models::{ModelParser, ParserBackend, UnavailableParser};
pub use extractor::MetadataExtractor;
pub use report::ReportWriter;
pub use processor::Organizer;

// Re-export backends for direct use
#[cfg(feature = "step-backend")]
pub use models::StepModelParser;
