//! Model analysis reports
//!
//! One workbook per analyzed model file:
//! - "Model Analysis": one row per element (Type, GlobalId, Name, Width, Height, Length)
//! - "Summary": source file name, generation time, element count
//!
//! File names carry a second-precision timestamp. Two models with the same
//! stem reported within one second get `_v2`, `_v3`, ... like placed files.

use crate::types::{Dimension, ElementRecord};
use crate::versioning::VersionAllocator;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use rust_xlsxwriter::{Color, Format, Workbook};
use std::fs;
use std::path::{Path, PathBuf};

pub const DETAIL_SHEET: &str = "Model Analysis";
pub const SUMMARY_SHEET: &str = "Summary";
pub const COLUMNS: [&str; 6] = ["Type", "GlobalId", "Name", "Width", "Height", "Length"];

const HEADER_FILL: u32 = 0x4472C4;
const REPORT_EXTENSION: &str = ".xlsx";

#[derive(Debug, Clone, Default)]
pub struct ReportWriter;

impl ReportWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write a report for `source` into `output_folder`, stamped with the current time
    pub fn write(
        &self,
        records: &[ElementRecord],
        source: &Path,
        output_folder: &Path,
    ) -> Result<PathBuf> {
        self.write_at(records, source, output_folder, Local::now())
    }

    pub fn write_at(
        &self,
        records: &[ElementRecord],
        source: &Path,
        output_folder: &Path,
        generated: DateTime<Local>,
    ) -> Result<PathBuf> {
        if records.is_empty() {
            bail!("Refusing to write an empty report for {}", source.display());
        }

        fs::create_dir_all(output_folder).with_context(|| {
            format!("Failed to create report folder {}", output_folder.display())
        })?;

        let path = VersionAllocator::new().allocate(
            output_folder,
            report_base_name(source, &generated),
            REPORT_EXTENSION,
        );
        let source_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut workbook = Workbook::new();
        let header = Format::new()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(HEADER_FILL));

        let detail = workbook.add_worksheet();
        detail.set_name(DETAIL_SHEET)?;
        for (col, title) in COLUMNS.iter().enumerate() {
            detail.write_string_with_format(0, col as u16, *title, &header)?;
        }
        for (i, record) in records.iter().enumerate() {
            let row = i as u32 + 1;
            detail.write_string(row, 0, &record.type_name)?;
            detail.write_string(row, 1, &record.global_id)?;
            detail.write_string(row, 2, &record.name)?;
            for (offset, dimension) in Dimension::ALL.iter().enumerate() {
                if let Some(value) = record.dimension(*dimension) {
                    detail.write_number(row, 3 + offset as u16, value)?;
                }
            }
        }
        detail.set_column_width(1, 24)?;
        detail.set_column_width(2, 28)?;

        let summary = workbook.add_worksheet();
        summary.set_name(SUMMARY_SHEET)?;
        summary.write_string(0, 0, "Source file:")?;
        summary.write_string(0, 1, source_name)?;
        summary.write_string(1, 0, "Generated:")?;
        summary.write_string(1, 1, generated.format("%Y-%m-%d %H:%M:%S").to_string())?;
        summary.write_string(2, 0, "Elements:")?;
        summary.write_number(2, 1, records.len() as f64)?;

        workbook
            .save(&path)
            .with_context(|| format!("Failed to save report {}", path.display()))?;

        tracing::debug!("report with {} rows written to {}", records.len(), path.display());
        Ok(path)
    }
}

/// `{base}_analysis_{YYYYMMDD_HHMMSS}`, extension not included
pub fn report_base_name(source: &Path, generated: &DateTime<Local>) -> String {
    let base = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());
    format!("{}_analysis_{}", base, generated.format("%Y%m%d_%H%M%S"))
}
