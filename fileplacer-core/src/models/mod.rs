//! Model-file parsers
//!
//! This module is the boundary between file placement and the engineering
//! model format. The extractor only ever sees the traits defined here:
//!
//! ```text
//! model file (.ifc)
//!     ↓
//! [ModelParser backend]
//!     ↓
//! ModelFile: typed elements + named property groups
//!     ↓
//! [MetadataExtractor]
//! ```
//!
//! ## Available backends
//!
//! - `StepModelParser` - ISO 10303-21 clear-text reader (feature `step-backend`)
//! - `UnavailableParser` - stand-in used when no reader is compiled in

pub mod unavailable;

#[cfg(feature = "step-backend")]
pub mod step;

use crate::types::StructuralType;
use anyhow::Result;
use std::path::Path;

pub use unavailable::UnavailableParser;

#[cfg(feature = "step-backend")]
pub use step::StepModelParser;

/// Instance number of an entity inside a model file
pub type EntityId = u64;

/// One typed element as exposed by a parser
#[derive(Debug, Clone, PartialEq)]
pub struct ModelElement {
    pub id: EntityId,
    /// Actual entity type, e.g. `IfcWallStandardCase` for a wall query
    pub type_name: String,
    pub global_id: Option<String>,
    pub name: Option<String>,
}

/// Value of a single named property
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
}

/// Named bundle of properties attached to an element
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyGroup {
    pub name: String,
    pub properties: Vec<(String, PropertyValue)>,
}

impl PropertyGroup {
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

/// Parser collaborator: opens model files
pub trait ModelParser {
    /// Backend identifier for logging
    fn name(&self) -> &str;

    /// False when no real parser is present; extraction is then skipped
    fn is_available(&self) -> bool;

    fn open(&self, path: &Path) -> Result<Box<dyn ModelFile>>;
}

/// A parsed model file
pub trait ModelFile {
    /// All elements of the given type, subtypes included, in file order
    fn elements_of_type(&self, element_type: StructuralType) -> Vec<ModelElement>;

    /// Every property group attached to the element.
    ///
    /// Type-level groups come before occurrence-level ones so that later
    /// groups can override earlier values.
    fn property_groups(&self, element: &ModelElement) -> Result<Vec<PropertyGroup>>;
}

/// Backend enum for runtime parser selection
pub enum ParserBackend {
    #[cfg(feature = "step-backend")]
    Step(StepModelParser),
    Unavailable(UnavailableParser),
}

impl ParserBackend {
    /// The best parser compiled into this build
    pub fn detect() -> Self {
        #[cfg(feature = "step-backend")]
        {
            ParserBackend::Step(StepModelParser::new())
        }
        #[cfg(not(feature = "step-backend"))]
        {
            ParserBackend::Unavailable(UnavailableParser)
        }
    }
}

impl ModelParser for ParserBackend {
    fn name(&self) -> &str {
        match self {
            #[cfg(feature = "step-backend")]
            ParserBackend::Step(parser) => parser.name(),
            ParserBackend::Unavailable(parser) => parser.name(),
        }
    }

    fn is_available(&self) -> bool {
        match self {
            #[cfg(feature = "step-backend")]
            ParserBackend::Step(parser) => parser.is_available(),
            ParserBackend::Unavailable(parser) => parser.is_available(),
        }
    }

    fn open(&self, path: &Path) -> Result<Box<dyn ModelFile>> {
        match self {
            #[cfg(feature = "step-backend")]
            ParserBackend::Step(parser) => parser.open(path),
            ParserBackend::Unavailable(parser) => parser.open(path),
        }
    }
}
