use super::{ModelFile, ModelParser};
use anyhow::{anyhow, Result};
use std::path::Path;

/// Stand-in for builds or environments without a model reader
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableParser;

impl ModelParser for UnavailableParser {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn open(&self, path: &Path) -> Result<Box<dyn ModelFile>> {
        Err(anyhow!(
            "No model parser compiled in, cannot open {}",
            path.display()
        ))
    }
}
