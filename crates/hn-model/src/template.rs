//! Template text applied to an item's properties.
//!
//! ```text
//! Diameter	0.25
//! Friction Model	Hazen-Williams
//! Profile TABLE
//! Distance	Height
//! 0	10
//! 120	12.5
//! END_TABLE
//! ```
//!
//! The first row of a table block names the columns.

use tracing::warn;

use crate::error::{ModelError, ModelResult};
use crate::item::{Item, Severity};

const TABLE_SUFFIX: &str = " TABLE";
const END_TABLE: &str = "END_TABLE";

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateEntry {
    Value {
        line: usize,
        name: String,
        value: String,
    },
    Table {
        line: usize,
        name: String,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

impl TemplateEntry {
    pub fn name(&self) -> &str {
        match self {
            TemplateEntry::Value { name, .. } | TemplateEntry::Table { name, .. } => name,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            TemplateEntry::Value { line, .. } | TemplateEntry::Table { line, .. } => *line,
        }
    }
}

/// A line that could not be parsed, 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedLine {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTemplate {
    pub entries: Vec<TemplateEntry>,
    pub malformed: Vec<MalformedLine>,
}

fn fields(line: &str) -> Vec<String> {
    line.split('\t').map(|f| f.trim().to_string()).collect()
}

pub fn parse(text: &str) -> ParsedTemplate {
    let mut out = ParsedTemplate::default();
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l));
    while let Some((n, raw)) = lines.next() {
        let line = raw.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        if let Some(name) = line.strip_suffix(TABLE_SUFFIX) {
            let mut columns = None;
            let mut rows = Vec::new();
            let mut closed = false;
            for (_, raw) in lines.by_ref() {
                let row = raw.trim_end();
                if row.trim() == END_TABLE {
                    closed = true;
                    break;
                }
                if row.trim().is_empty() {
                    continue;
                }
                if columns.is_none() {
                    columns = Some(fields(row));
                } else {
                    rows.push(fields(row));
                }
            }
            if !closed {
                out.malformed.push(MalformedLine {
                    line: n,
                    reason: format!("table '{}' has no {END_TABLE}", name.trim()),
                });
                continue;
            }
            out.entries.push(TemplateEntry::Table {
                line: n,
                name: name.trim().to_string(),
                columns: columns.unwrap_or_default(),
                rows,
            });
            continue;
        }
        match line.split_once('\t') {
            Some((name, value)) if !name.trim().is_empty() => {
                out.entries.push(TemplateEntry::Value {
                    line: n,
                    name: name.trim().to_string(),
                    value: value.trim().to_string(),
                });
            }
            _ => out.malformed.push(MalformedLine {
                line: n,
                reason: "expected '<name>\\t<value>'".into(),
            }),
        }
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateReport {
    pub applied: usize,
    pub skipped: usize,
}

impl Item {
    /// Apply template text. Entries that fail are logged, recorded as item
    /// messages and skipped; the rest are applied.
    pub fn add_data_from_template(&mut self, text: &str) -> TemplateReport {
        let parsed = parse(text);
        let mut report = TemplateReport::default();
        for bad in &parsed.malformed {
            self.skip(bad.line, &bad.reason);
            report.skipped += 1;
        }
        for entry in &parsed.entries {
            match self.apply_entry(entry) {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    self.skip(entry.line(), &e.to_string());
                    report.skipped += 1;
                }
            }
        }
        report
    }

    fn skip(&mut self, line: usize, reason: &str) {
        warn!(item = %self.qualified_name(), line, reason, "template line skipped");
        self.add_message(
            format!("template line {line} skipped: {reason}"),
            Severity::Warning,
            0.0,
        );
    }

    fn apply_entry(&mut self, entry: &TemplateEntry) -> ModelResult<()> {
        match entry {
            TemplateEntry::Value { name, value, .. } => {
                let is_list = self.property(name)?.list_value().is_some();
                match value.parse::<f64>() {
                    Ok(v) if !is_list || v.fract() == 0.0 => self.set_scalar(name, v),
                    _ => self.set_scalar_text(name, value),
                }
            }
            TemplateEntry::Table {
                name,
                columns,
                rows,
                ..
            } => {
                let qualified = self.qualified_name();
                let table = self
                    .property_mut(name)?
                    .table_mut()
                    .map_err(|e| e.in_item(&qualified))?;
                let mut data = Vec::with_capacity(columns.len());
                for (c, column) in columns.iter().enumerate() {
                    let mut values = Vec::with_capacity(rows.len());
                    for row in rows {
                        let cell = row.get(c).map(String::as_str).unwrap_or("");
                        let v = cell.parse::<f64>().map_err(|_| {
                            ModelError::invalid(
                                &qualified,
                                format!("'{name}' column '{column}': '{cell}' is not a number"),
                            )
                        })?;
                        values.push(v);
                    }
                    data.push((column, values));
                }
                table.clear();
                for (column, values) in data {
                    table
                        .set_floats(column, values)
                        .map_err(|e| e.in_item(&qualified))?;
                }
                Ok(())
            }
        }
    }
}
