//! Rule workbook I/O
//!
//! Each sheet is a category. Row 1 is a header; every following row holds
//! `(pattern, destination sub-path)` in columns A and B.

use super::table::{Rule, RuleTable};
use anyhow::{Context, Result};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook};
use std::fs;
use std::path::Path;

/// Header row written into every template sheet
const HEADER: [&str; 2] = ["File pattern", "Destination subfolder"];

/// Example categories written when no rule document exists yet
const TEMPLATE: &[(&str, &[(&str, &str)])] = &[
    (
        "documents",
        &[("invoice.*.pdf", "Docs/Invoices"), ("*.pdf", "Docs/Misc")],
    ),
    (
        "models",
        &[("building.*.ifc", "BIM/Buildings"), ("*.ifc", "BIM/Models")],
    ),
];

/// Read every sheet of the workbook into a rule table
pub fn load_rule_table(path: &Path) -> Result<RuleTable> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("Failed to open workbook {}", path.display()))?;

    let mut table = RuleTable::new();
    for sheet in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&sheet)
            .with_context(|| format!("Failed to read sheet '{sheet}'"))?;
        let rules = rules_from_range(&range)
            .with_context(|| format!("Invalid rule in sheet '{sheet}'"))?;

        if rules.is_empty() {
            tracing::debug!("sheet '{}' has no usable rules, skipping", sheet);
        } else {
            tracing::debug!("sheet '{}': {} rule(s)", sheet, rules.len());
        }
        table.insert_category(&sheet, rules);
    }

    Ok(table)
}

/// Rows from the second sheet row on where both cells are non-empty
fn rules_from_range(range: &Range<Data>) -> Result<Vec<Rule>> {
    let (Some(start), Some(end)) = (range.start(), range.end()) else {
        return Ok(Vec::new());
    };

    let mut rules = Vec::new();
    for row in start.0.max(1)..=end.0 {
        let pattern = range.get_value((row, 0)).and_then(cell_text);
        let destination = range.get_value((row, 1)).and_then(cell_text);
        if let (Some(pattern), Some(destination)) = (pattern, destination) {
            tracing::debug!("  {} -> {}", pattern, destination);
            rules.push(Rule::new(&pattern, &destination)?);
        }
    }
    Ok(rules)
}

fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// Write the example workbook to `path`
pub fn write_template(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let header = Format::new().set_bold();
    let mut workbook = Workbook::new();

    for (category, rows) in TEMPLATE {
        let sheet = workbook.add_worksheet();
        sheet.set_name(*category)?;
        sheet.set_column_width(0, 28)?;
        sheet.set_column_width(1, 28)?;
        for (col, title) in HEADER.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *title, &header)?;
        }
        for (i, (pattern, destination)) in rows.iter().enumerate() {
            let row = i as u32 + 1;
            sheet.write_string(row, 0, *pattern)?;
            sheet.write_string(row, 1, *destination)?;
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to write template {}", path.display()))?;
    Ok(())
}
