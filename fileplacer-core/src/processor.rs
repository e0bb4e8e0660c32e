use crate::config::OrganizerConfig;
use crate::error::OrganizerError;
use crate::extractor::MetadataExtractor;
use crate::report::ReportWriter;
use crate::rules::{load_rule_table, write_template, RuleTable};
use crate::types::*;
use crate::versioning::{split_os_file_name, VersionAllocator};
use anyhow::{Context, Result};
use filetime::FileTime;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// True for names the scan ignores: dotfiles and `~` lock/backup files
pub fn is_hidden_name(file_name: &str) -> bool {
    file_name.starts_with('.') || file_name.starts_with('~')
}

/// Runs one classification-and-placement pass over the source folder.
///
/// The set of already-moved sources lives here and is reset at the start
/// of every `run`.
pub struct Organizer {
    config: OrganizerConfig,
    extractor: MetadataExtractor,
    report_writer: ReportWriter,
    allocator: VersionAllocator,
    rules: RuleTable,
    processed: HashSet<PathBuf>,
}

impl Organizer {
    pub fn new(config: OrganizerConfig, extractor: MetadataExtractor) -> Self {
        Self {
            config,
            extractor,
            report_writer: ReportWriter::new(),
            allocator: VersionAllocator::new(),
            rules: RuleTable::new(),
            processed: HashSet::new(),
        }
    }

    /// Replace the rule table without reading the rule document
    pub fn set_rules(&mut self, rules: RuleTable) {
        self.rules = rules;
    }

    pub fn parser_name(&self) -> &str {
        self.extractor.parser_name()
    }

    /// Extraction is enabled in config and a parser is present
    pub fn analysis_active(&self) -> bool {
        self.config.analysis_enabled() && self.extractor.is_available()
    }

    pub fn run(&mut self) -> Result<RunReport, OrganizerError> {
        self.processed.clear();

        let rule_path = self.config.paths.rule_document.clone();
        if !rule_path.exists() {
            write_template(&rule_path).map_err(|source| OrganizerError::RuleDocument {
                path: rule_path.clone(),
                source,
            })?;
            println!("✓ Template created: {}", rule_path.display());
            return Ok(RunReport::TemplateCreated(rule_path));
        }

        self.rules = load_rule_table(&rule_path).map_err(|source| OrganizerError::RuleDocument {
            path: rule_path.clone(),
            source,
        })?;
        println!(
            "✓ Rules loaded: {} categories, {} rules",
            self.rules.category_count(),
            self.rules.rule_count()
        );
        if self.rules.is_empty() {
            return Err(OrganizerError::NoRules(rule_path));
        }

        let source = self.config.paths.source_folder.clone();
        if !source.is_dir() {
            return Err(OrganizerError::SourceMissing(source));
        }

        let files = candidate_files(&source);
        println!("📂 {} file(s) found\n", files.len());

        let mut summary = RunSummary::new(source);
        for file in &files {
            let outcome = self.process_file(file);
            summary.record(&outcome);
        }

        Ok(RunReport::Completed(summary))
    }

    /// Route, optionally analyze, and move one file
    pub fn process_file(&mut self, path: &Path) -> FileOutcome {
        let id = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        if self.processed.contains(&id) {
            tracing::debug!("{} already placed in this run", id.display());
            return FileOutcome::SkippedAlreadyProcessed;
        }

        let os_name = path.file_name().unwrap_or_default();
        let file_name = os_name.to_string_lossy().into_owned();
        println!("📄 {}", file_name);

        let Some(destination) = self.rules.find_destination(&file_name) else {
            println!("  ⚠ No matching rule");
            return FileOutcome::SkippedNoRule;
        };
        let folder = destination.folder_under(&self.config.paths.destination_base);

        if let Err(e) = fs::create_dir_all(&folder) {
            println!("  ✗ Error: cannot create {}: {}", folder.display(), e);
            return FileOutcome::Failed {
                reason: format!("cannot create {}: {}", folder.display(), e),
            };
        }

        // The lossy name routes the file; the original bytes name the target
        let (base_name, extension) = split_os_file_name(os_name);
        let is_model = extension.to_str().is_some_and(is_model_extension);
        let report = if is_model && self.analysis_active() {
            self.analyze(path)
        } else {
            None
        };

        let target = self.allocator.allocate(&folder, base_name, extension);
        match move_file(path, &target) {
            Ok(()) => {
                self.processed.insert(id);
                println!(
                    "  ✓ → {}",
                    target
                        .file_name()
                        .map(|n| n.to_string_lossy())
                        .unwrap_or_default()
                );
                FileOutcome::Placed { target, report }
            }
            Err(e) => {
                println!("  ✗ Error: {:#}", e);
                FileOutcome::Failed {
                    reason: format!("{:#}", e),
                }
            }
        }
    }

    /// Extract and report; failures are printed and never stop placement
    fn analyze(&self, path: &Path) -> Option<PathBuf> {
        println!("  📊 Analyzing model...");
        let records = match self.extractor.extract(path) {
            Ok(Some(records)) => records,
            Ok(None) => {
                println!("  ℹ No structural elements, no report");
                return None;
            }
            Err(e) => {
                println!("  ✗ Model analysis failed: {:#}", e);
                tracing::warn!("analysis of {} failed: {:#}", path.display(), e);
                return None;
            }
        };

        match self
            .report_writer
            .write(&records, path, &self.config.paths.report_folder)
        {
            Ok(report) => {
                println!("  ✓ Analysis exported: {} elements", records.len());
                Some(report)
            }
            Err(e) => {
                println!("  ✗ Report failed: {:#}", e);
                tracing::warn!("report for {} failed: {:#}", path.display(), e);
                None
            }
        }
    }
}

fn is_model_extension(extension: &str) -> bool {
    extension
        .strip_prefix('.')
        .is_some_and(|ext| ext.eq_ignore_ascii_case(MODEL_EXTENSION))
}

/// Regular, non-hidden files directly inside `source`, sorted by name
pub fn candidate_files(source: &Path) -> Vec<PathBuf> {
    WalkDir::new(source)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| !is_hidden_name(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.into_path())
        .collect()
}

/// Copy with timestamps, then delete the original.
///
/// If the delete fails the copy stays at `target`; it is not rolled back.
fn move_file(source: &Path, target: &Path) -> Result<()> {
    fs::copy(source, target)
        .with_context(|| format!("copy to {} failed", target.display()))?;

    let metadata = fs::metadata(source)?;
    filetime::set_file_times(
        target,
        FileTime::from_last_access_time(&metadata),
        FileTime::from_last_modification_time(&metadata),
    )
    .with_context(|| format!("cannot set times on {}", target.display()))?;

    fs::remove_file(source).with_context(|| {
        format!(
            "cannot remove original (copy left at {})",
            target.display()
        )
    })?;
    Ok(())
}
