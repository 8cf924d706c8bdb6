//! Column tables backing table-bearing properties.

use std::collections::HashMap;

use hn_core::{UnitDimension, is_non_decreasing};
use tracing::warn;

use crate::error::{ModelError, ModelResult};

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Float,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Float(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    fn empty(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Float => ColumnData::Float(Vec::new()),
            ColumnKind::Text => ColumnData::Text(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Float(_) => ColumnKind::Float,
            ColumnData::Text(_) => ColumnKind::Text,
        }
    }

    fn resize(&mut self, n: usize) {
        match self {
            ColumnData::Float(v) => v.resize(n, 0.0),
            ColumnData::Text(v) => v.resize(n, String::new()),
        }
    }
}

/// Whether the first column is an ordinate that must not decrease ("T" tables).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableKind {
    Ordered,
    #[default]
    Free,
}

/// Column registration request, one per simulation-side table column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub description: String,
    pub unit: UnitDimension,
    pub key: i32,
    pub kind: ColumnKind,
    pub index: usize,
    pub column_number: u32,
    pub related_description: String,
    pub spec_code: String,
}

impl ColumnSpec {
    /// Float column with the given simulation key and column number 1.
    pub fn float(description: impl Into<String>, unit: UnitDimension, key: i32) -> Self {
        Self {
            description: description.into(),
            unit,
            key,
            kind: ColumnKind::Float,
            index: 0,
            column_number: 1,
            related_description: String::new(),
            spec_code: String::new(),
        }
    }

    pub fn text(description: impl Into<String>, key: i32) -> Self {
        Self {
            kind: ColumnKind::Text,
            ..Self::float(description, UnitDimension::Dimensionless, key)
        }
    }

    pub fn with_column_number(mut self, n: u32) -> Self {
        self.column_number = n;
        self
    }

    pub fn with_related(mut self, related: impl Into<String>) -> Self {
        self.related_description = related.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Description the column was registered under before disambiguation.
    pub base_description: String,
    pub kind: ColumnKind,
    pub index: usize,
    pub column_numbers: Vec<u32>,
    pub keys: Vec<i32>,
    pub related_descriptions: Vec<String>,
    pub unit: UnitDimension,
    pub spec_code: String,
    pub data: ColumnData,
}

impl Column {
    fn from_spec(spec: &ColumnSpec) -> Self {
        let related = if spec.related_description.is_empty() {
            Vec::new()
        } else {
            vec![spec.related_description.clone()]
        };
        Self {
            base_description: spec.description.clone(),
            kind: spec.kind,
            index: spec.index,
            column_numbers: vec![spec.column_number],
            keys: vec![spec.key],
            related_descriptions: related,
            unit: spec.unit,
            spec_code: spec.spec_code.clone(),
            data: ColumnData::empty(spec.kind),
        }
    }

    /// `keys` and `column_numbers` are parallel; a logical column is the pair.
    fn records(&self, key: i32, column_number: u32) -> bool {
        self.keys
            .iter()
            .zip(&self.column_numbers)
            .any(|(k, n)| *k == key && *n == column_number)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A named collection of typed columns sharing a row count.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    kind: TableKind,
    descriptions: Vec<String>,
    columns: HashMap<String, Column>,
    modified: bool,
}

impl Table {
    pub fn new(kind: TableKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    /// Column names in registration order.
    pub fn descriptions(&self) -> &[String] {
        &self.descriptions
    }

    pub fn column(&self, description: &str) -> Option<&Column> {
        self.columns.get(description)
    }

    pub fn has_column(&self, description: &str) -> bool {
        self.columns.contains_key(description)
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    /// Register a column and return the name it is stored under.
    ///
    /// One simulation-side property may expand into several table columns,
    /// each announced separately. A repeat of an already recorded
    /// (key, column number) is a no-op. The next column number of the same
    /// kind is merged into the existing column as a continuation. Anything
    /// else gets a disambiguated name `description + offset`.
    pub fn add_column(&mut self, spec: ColumnSpec) -> String {
        if let Some(existing) = self
            .descriptions
            .iter()
            .find(|d| {
                self.columns.get(*d).is_some_and(|c| {
                    c.base_description == spec.description
                        && c.records(spec.key, spec.column_number)
                })
            })
            .cloned()
        {
            return existing;
        }

        let Some(col) = self.columns.get_mut(&spec.description) else {
            self.descriptions.push(spec.description.clone());
            self.columns
                .insert(spec.description.clone(), Column::from_spec(&spec));
            return spec.description;
        };

        let last = col.column_numbers.last().copied().unwrap_or(0);
        if col.kind == spec.kind && spec.column_number == last + 1 {
            col.column_numbers.push(spec.column_number);
            col.keys.push(spec.key);
            if !spec.related_description.is_empty()
                && !col.related_descriptions.contains(&spec.related_description)
            {
                col.related_descriptions.push(spec.related_description);
            }
            return spec.description;
        }

        let mut offset = 2;
        let name = loop {
            let candidate = format!("{}{}", spec.description, offset);
            if !self.columns.contains_key(&candidate) {
                break candidate;
            }
            offset += 1;
        };
        self.descriptions.push(name.clone());
        self.columns.insert(name.clone(), Column::from_spec(&spec));
        name
    }

    /// Row count shared by every column, if they agree.
    pub fn row_count(&self) -> Option<usize> {
        let mut lens = self.descriptions.iter().filter_map(|d| self.columns.get(d)).map(Column::len);
        let first = lens.next()?;
        lens.all(|n| n == first).then_some(first)
    }

    /// True when every column has the same non-zero row count and, for an
    /// ordered table, the first column does not decrease.
    pub fn check(&self) -> bool {
        match self.row_count() {
            Some(n) if n > 0 => {}
            _ => return false,
        }
        if self.kind == TableKind::Ordered {
            let first = self.descriptions.first().and_then(|d| self.columns.get(d));
            return match first.map(|c| &c.data) {
                Some(ColumnData::Float(v)) => is_non_decreasing(v),
                _ => false,
            };
        }
        true
    }

    pub fn max_column_size(&self) -> usize {
        self.columns.values().map(Column::len).max().unwrap_or(0)
    }

    /// Resize every column to `n` rows. Zero is refused since it would wipe
    /// the table.
    pub fn resize_columns(&mut self, n: usize) {
        if n == 0 {
            warn!("refusing to resize table columns to zero rows");
            return;
        }
        for col in self.columns.values_mut() {
            col.data.resize(n);
        }
        self.modified = true;
    }

    pub fn clear(&mut self) {
        for col in self.columns.values_mut() {
            col.data = ColumnData::empty(col.kind);
        }
        self.modified = true;
    }

    fn column_or_err(&self, description: &str) -> ModelResult<&Column> {
        self.columns
            .get(description)
            .ok_or_else(|| ModelError::not_found("", "column", description))
    }

    fn column_mut_or_err(&mut self, description: &str) -> ModelResult<&mut Column> {
        self.columns
            .get_mut(description)
            .ok_or_else(|| ModelError::not_found("", "column", description))
    }

    pub fn floats(&self, description: &str) -> ModelResult<&[f64]> {
        match &self.column_or_err(description)?.data {
            ColumnData::Float(v) => Ok(v),
            ColumnData::Text(_) => Err(column_kind_mismatch(description, "a float column", "text")),
        }
    }

    pub fn floats_mut(&mut self, description: &str) -> ModelResult<&mut Vec<f64>> {
        self.modified = true;
        match &mut self.column_mut_or_err(description)?.data {
            ColumnData::Float(v) => Ok(v),
            ColumnData::Text(_) => Err(column_kind_mismatch(description, "a float column", "text")),
        }
    }

    pub fn set_floats(&mut self, description: &str, values: Vec<f64>) -> ModelResult<()> {
        *self.floats_mut(description)? = values;
        Ok(())
    }

    pub fn texts(&self, description: &str) -> ModelResult<&[String]> {
        match &self.column_or_err(description)?.data {
            ColumnData::Text(v) => Ok(v),
            ColumnData::Float(_) => Err(column_kind_mismatch(description, "a text column", "float")),
        }
    }

    pub fn set_texts(&mut self, description: &str, values: Vec<String>) -> ModelResult<()> {
        self.modified = true;
        match &mut self.column_mut_or_err(description)?.data {
            ColumnData::Text(v) => {
                *v = values;
                Ok(())
            }
            ColumnData::Float(_) => Err(column_kind_mismatch(description, "a text column", "float")),
        }
    }

    /// Column-wise copy of every non-empty column of `other`, each padded or
    /// cut to `other`'s longest column. Columns missing here are registered.
    pub fn copy_from(&mut self, other: &Table) {
        let n = other.max_column_size();
        for desc in &other.descriptions {
            let Some(src) = other.columns.get(desc) else {
                continue;
            };
            if src.is_empty() {
                continue;
            }
            let mut data = src.data.clone();
            data.resize(n);
            match self.columns.get_mut(desc) {
                Some(dst) if dst.kind == src.kind => dst.data = data,
                Some(_) => {
                    warn!(column = %desc, "not copying column of a different kind");
                }
                None => {
                    let mut col = src.clone();
                    col.data = data;
                    self.descriptions.push(desc.clone());
                    self.columns.insert(desc.clone(), col);
                }
            }
        }
        self.modified = true;
    }
}

fn column_kind_mismatch(description: &str, expected: &'static str, actual: &'static str) -> ModelError {
    ModelError::TypeMismatch {
        item: String::new(),
        property: description.to_string(),
        expected,
        actual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Table {
        let mut t = Table::new(TableKind::Ordered);
        t.add_column(ColumnSpec::float("Distance", UnitDimension::Length, 10));
        t.add_column(ColumnSpec::float("Height", UnitDimension::Length, 11));
        t
    }

    #[test]
    fn new_columns_keep_order() {
        let t = profile();
        assert_eq!(t.descriptions(), ["Distance", "Height"]);
    }

    #[test]
    fn recurring_column_is_a_no_op() {
        let mut t = profile();
        let name = t.add_column(ColumnSpec::float("Height", UnitDimension::Length, 11));
        assert_eq!(name, "Height");
        assert_eq!(t.descriptions().len(), 2);
    }

    #[test]
    fn continuation_column_merges() {
        let mut t = profile();
        let name = t.add_column(
            ColumnSpec::float("Height", UnitDimension::Length, 12)
                .with_column_number(2)
                .with_related("Height at outlet"),
        );
        assert_eq!(name, "Height");
        let col = t.column("Height").unwrap();
        assert_eq!(col.keys, vec![11, 12]);
        assert_eq!(col.column_numbers, vec![1, 2]);
        assert_eq!(col.related_descriptions, vec!["Height at outlet".to_string()]);
        assert_eq!(t.descriptions().len(), 2);
    }

    #[test]
    fn key_and_number_match_as_a_pair() {
        let mut t = profile();
        t.add_column(
            ColumnSpec::float("Height", UnitDimension::Length, 12).with_column_number(2),
        );
        let name = t.add_column(
            ColumnSpec::float("Height", UnitDimension::Length, 11).with_column_number(2),
        );
        assert_eq!(name, "Height2");
        assert_eq!(t.column("Height").unwrap().keys, vec![11, 12]);
    }

    #[test]
    fn clashing_column_is_disambiguated() {
        let mut t = profile();
        let name = t.add_column(ColumnSpec::text("Height", 99));
        assert_eq!(name, "Height2");
        let again = t.add_column(ColumnSpec::text("Height", 99));
        assert_eq!(again, "Height2");
        let third = t.add_column(ColumnSpec::text("Height", 100));
        assert_eq!(third, "Height3");
    }

    #[test]
    fn check_requires_equal_nonzero_rows() {
        let mut t = profile();
        assert!(!t.check());
        t.set_floats("Distance", vec![0.0, 1.0, 2.0]).unwrap();
        t.set_floats("Height", vec![0.0, 1.0]).unwrap();
        assert!(!t.check());
        t.resize_columns(3);
        assert!(t.check());
    }

    #[test]
    fn ordered_table_needs_sorted_first_column() {
        let mut t = profile();
        t.set_floats("Distance", vec![0.0, 2.0, 1.0]).unwrap();
        t.set_floats("Height", vec![0.0, 1.0, 2.0]).unwrap();
        assert!(!t.check());
        t.set_floats("Distance", vec![0.0, 1.0, 2.0]).unwrap();
        assert!(t.check());
    }

    #[test]
    fn zero_resize_keeps_data() {
        let mut t = profile();
        t.set_floats("Distance", vec![1.0, 2.0]).unwrap();
        t.resize_columns(0);
        assert_eq!(t.floats("Distance").unwrap(), &[1.0, 2.0]);
    }

    #[test]
    fn copy_skips_empty_source_columns() {
        let mut src = profile();
        src.set_floats("Distance", vec![0.0, 5.0, 10.0]).unwrap();
        let mut dst = profile();
        dst.set_floats("Height", vec![7.0]).unwrap();
        dst.copy_from(&src);
        assert_eq!(dst.floats("Distance").unwrap(), &[0.0, 5.0, 10.0]);
        assert_eq!(dst.floats("Height").unwrap(), &[7.0]);
    }

    #[test]
    fn wrong_column_kind_is_type_mismatch() {
        let mut t = profile();
        t.add_column(ColumnSpec::text("Label", 1));
        assert!(matches!(
            t.floats("Label"),
            Err(ModelError::TypeMismatch { .. })
        ));
        assert!(matches!(
            t.floats("Nope"),
            Err(ModelError::NotFound { .. })
        ));
    }
}
