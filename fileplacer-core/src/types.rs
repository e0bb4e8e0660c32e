use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// File extension (without the dot) of the model format we analyze
pub const MODEL_EXTENSION: &str = "ifc";

/// Placeholder used when an element carries no GlobalId
pub const MISSING_GLOBAL_ID: &str = "N/A";

/// Placeholder used when an element has no name, or an empty one
pub const UNNAMED_ELEMENT: &str = "Sans nom";

// ===== MODEL METADATA TYPES =====

/// The structural element types we extract, in extraction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuralType {
    Wall,
    Slab,
    Beam,
    Column,
    Window,
    Door,
}

impl StructuralType {
    pub const ALL: [StructuralType; 6] = [
        StructuralType::Wall,
        StructuralType::Slab,
        StructuralType::Beam,
        StructuralType::Column,
        StructuralType::Window,
        StructuralType::Door,
    ];

    /// Schema entity name, e.g. `IfcWall`
    pub fn entity_name(&self) -> &'static str {
        match self {
            StructuralType::Wall => "IfcWall",
            StructuralType::Slab => "IfcSlab",
            StructuralType::Beam => "IfcBeam",
            StructuralType::Column => "IfcColumn",
            StructuralType::Window => "IfcWindow",
            StructuralType::Door => "IfcDoor",
        }
    }
}

impl fmt::Display for StructuralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entity_name())
    }
}

/// Whitelisted dimensional property keys copied into element records
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    Width,
    Height,
    Length,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Width, Dimension::Height, Dimension::Length];

    /// Property name as it appears inside a property group
    pub fn key(&self) -> &'static str {
        match self {
            Dimension::Width => "Width",
            Dimension::Height => "Height",
            Dimension::Length => "Length",
        }
    }
}

/// One row of extracted structural metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ElementRecord {
    pub type_name: String,
    pub global_id: String,
    pub name: String,
    /// Only whitelisted dimensions, rounded to 3 decimals
    pub properties: BTreeMap<Dimension, f64>,
}

impl ElementRecord {
    pub fn dimension(&self, dimension: Dimension) -> Option<f64> {
        self.properties.get(&dimension).copied()
    }
}

/// Outcome of reading one element's property groups.
///
/// A failed read never escapes the element it belongs to: the record is
/// still produced, just without dimensions.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementProperties {
    Read(BTreeMap<Dimension, f64>),
    Unreadable(String),
}

impl ElementProperties {
    pub fn into_map(self) -> BTreeMap<Dimension, f64> {
        match self {
            ElementProperties::Read(map) => map,
            ElementProperties::Unreadable(_) => BTreeMap::new(),
        }
    }
}

// ===== PLACEMENT TYPES =====

/// Terminal state of a single candidate file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Moved to `target`; `report` is set when an analysis report was written
    Placed {
        target: PathBuf,
        report: Option<PathBuf>,
    },
    SkippedNoRule,
    SkippedAlreadyProcessed,
    /// Original left in place
    Failed { reason: String },
}

impl FileOutcome {
    pub fn is_placed(&self) -> bool {
        matches!(self, FileOutcome::Placed { .. })
    }
}

/// Aggregated result of one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub source_folder: PathBuf,
    pub total: usize,
    pub placed: usize,
    pub skipped_no_rule: usize,
    pub skipped_already_processed: usize,
    pub failed: usize,
    pub reports: Vec<PathBuf>,
}

impl RunSummary {
    pub fn new(source_folder: PathBuf) -> Self {
        Self {
            source_folder,
            ..Default::default()
        }
    }

    pub fn record(&mut self, outcome: &FileOutcome) {
        self.total += 1;
        match outcome {
            FileOutcome::Placed { report, .. } => {
                self.placed += 1;
                if let Some(report) = report {
                    self.reports.push(report.clone());
                }
            }
            FileOutcome::SkippedNoRule => self.skipped_no_rule += 1,
            FileOutcome::SkippedAlreadyProcessed => self.skipped_already_processed += 1,
            FileOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// How a run ended when it did not abort
#[derive(Debug, Clone)]
pub enum RunReport {
    /// Every candidate was processed
    Completed(RunSummary),
    /// No rule document existed; a template was written there instead
    TemplateCreated(PathBuf),
}
