//! Named, typed item attributes.
//!
//! A [`Property`] pairs shared metadata (description, dependency, masks,
//! unit dimension) with a [`PropertyValue`] variant. Callers that know the
//! variant can match on it directly; the convenience accessors on
//! [`Property`] return [`ModelError::TypeMismatch`] when used on the wrong
//! variant.

use std::sync::{Arc, Weak};

use hn_core::{UnitDimension, UnitTable};
use tracing::warn;

use crate::error::{ModelError, ModelResult};
use crate::series::{Extremes, ExtremesRef, SeriesBuffer, SeriesRef};
use crate::table::Table;

/// Reserved description of the per-item action table.
pub const ACTION_TABLE: &str = "Action Table";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Io {
    Input,
    Output,
}

/// Where an input value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputType {
    #[default]
    User,
    /// Derived from other inputs; never asked of the user.
    Computed,
}

/// A bounded scalar with spec status.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarValue {
    pub value: f64,
    pub default: f64,
    pub min: f64,
    pub max: f64,
    pub bound_checked: bool,
    pub specified: bool,
}

impl ScalarValue {
    /// Unbounded scalar holding `default`, not yet specified.
    pub fn new(default: f64) -> Self {
        Self {
            value: default,
            default,
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            bound_checked: false,
            specified: false,
        }
    }

    pub fn bounded(default: f64, min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            bound_checked: true,
            ..Self::new(default)
        }
    }

    pub fn get(&self) -> Option<f64> {
        self.specified.then_some(self.value)
    }

    /// Bound-checked assignment. The default value is always accepted.
    pub fn set(&mut self, v: f64) -> Result<(), f64> {
        if self.bound_checked && v < self.min && v != self.default {
            return Err(self.min);
        }
        self.value = v;
        self.specified = true;
        Ok(())
    }
}

/// An enumerated value; the selection is a 1-based index into `options`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListValue {
    pub options: Vec<String>,
    pub selection: usize,
    pub specified: bool,
}

impl ListValue {
    pub fn new(options: Vec<String>, default_selection: usize) -> Self {
        Self {
            options,
            selection: default_selection.max(1),
            specified: false,
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.options.get(self.selection.checked_sub(1)?).map(String::as_str)
    }

    /// 1-based position of `text`, compared case-insensitively.
    pub fn position(&self, text: &str) -> Option<usize> {
        let text = text.trim();
        self.options
            .iter()
            .position(|o| o.eq_ignore_ascii_case(text))
            .map(|i| i + 1)
    }
}

/// Weak handles to result buffers: index 0 is the whole item, 1..=N the
/// discretised elements.
#[derive(Debug, Clone, Default)]
pub struct SeriesBinding {
    element_count: usize,
    series: Vec<SeriesRef>,
    extremes: Vec<ExtremesRef>,
}

impl SeriesBinding {
    pub fn new(element_count: usize) -> Self {
        Self {
            element_count,
            series: vec![Weak::new(); element_count + 1],
            extremes: vec![Weak::new(); element_count + 1],
        }
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }

    pub fn set_element_count(&mut self, n: usize) {
        self.element_count = n;
        self.series = vec![Weak::new(); n + 1];
        self.extremes = vec![Weak::new(); n + 1];
    }

    pub fn is_loaded(&self) -> bool {
        self.series.first().is_some_and(|w| w.strong_count() > 0)
    }
}

// Binding equality ignores the weak handles; they are not part of the model.
impl PartialEq for SeriesBinding {
    fn eq(&self, other: &Self) -> bool {
        self.element_count == other.element_count
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    ScalarInput(ScalarValue),
    ScalarOutput(ScalarValue),
    List(ListValue),
    Table(Table),
    SeriesInput {
        scalar: ScalarValue,
        binding: SeriesBinding,
    },
    SeriesOutput {
        scalar: ScalarValue,
        binding: SeriesBinding,
    },
}

impl PropertyValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            PropertyValue::ScalarInput(_) => "a scalar input",
            PropertyValue::ScalarOutput(_) => "a scalar output",
            PropertyValue::List(_) => "a list",
            PropertyValue::Table(_) => "a table",
            PropertyValue::SeriesInput { .. } => "a series input",
            PropertyValue::SeriesOutput { .. } => "a series output",
        }
    }
}

fn type_mismatch(description: &str, expected: &'static str, value: &PropertyValue) -> ModelError {
    ModelError::TypeMismatch {
        item: String::new(),
        property: description.to_string(),
        expected,
        actual: value.kind_name(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    description: String,
    key: i32,
    io: Io,
    unit: UnitDimension,
    list_dependency: Option<String>,
    view_list_mask: u32,
    display_mask: u32,
    input_type: InputType,
    modified: bool,
    value: PropertyValue,
}

impl Property {
    pub fn new(description: impl Into<String>, value: PropertyValue) -> Self {
        let io = match value {
            PropertyValue::ScalarOutput(_) | PropertyValue::SeriesOutput { .. } => Io::Output,
            _ => Io::Input,
        };
        Self {
            description: description.into(),
            key: 0,
            io,
            unit: UnitDimension::Dimensionless,
            list_dependency: None,
            view_list_mask: 0,
            display_mask: 0,
            input_type: InputType::User,
            modified: false,
            value,
        }
    }

    pub fn scalar_input(description: impl Into<String>, scalar: ScalarValue) -> Self {
        Self::new(description, PropertyValue::ScalarInput(scalar))
    }

    pub fn scalar_output(description: impl Into<String>) -> Self {
        Self::new(description, PropertyValue::ScalarOutput(ScalarValue::new(0.0)))
    }

    pub fn list(description: impl Into<String>, options: Vec<String>, default: usize) -> Self {
        Self::new(description, PropertyValue::List(ListValue::new(options, default)))
    }

    pub fn table_of(description: impl Into<String>, table: Table) -> Self {
        Self::new(description, PropertyValue::Table(table))
    }

    pub fn series_input(description: impl Into<String>, scalar: ScalarValue, elements: usize) -> Self {
        Self::new(
            description,
            PropertyValue::SeriesInput {
                scalar,
                binding: SeriesBinding::new(elements),
            },
        )
    }

    pub fn series_output(description: impl Into<String>, elements: usize) -> Self {
        Self::new(
            description,
            PropertyValue::SeriesOutput {
                scalar: ScalarValue::new(0.0),
                binding: SeriesBinding::new(elements),
            },
        )
    }

    pub fn with_unit(mut self, unit: UnitDimension) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_key(mut self, key: i32) -> Self {
        self.key = key;
        self
    }

    pub fn with_io(mut self, io: Io) -> Self {
        self.io = io;
        self
    }

    /// Gate this property on `controller` holding one of the values in `mask`.
    pub fn with_dependency(mut self, controller: impl Into<String>, mask: u32) -> Self {
        self.list_dependency = Some(controller.into());
        self.view_list_mask = mask;
        self
    }

    pub fn with_display_mask(mut self, mask: u32) -> Self {
        self.display_mask = mask;
        self
    }

    pub fn with_input_type(mut self, input_type: InputType) -> Self {
        self.input_type = input_type;
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn key(&self) -> i32 {
        self.key
    }

    pub fn io(&self) -> Io {
        self.io
    }

    pub fn is_input(&self) -> bool {
        self.io == Io::Input
    }

    pub fn unit(&self) -> UnitDimension {
        self.unit
    }

    pub fn list_dependency(&self) -> Option<&str> {
        self.list_dependency.as_deref()
    }

    pub fn view_list_mask(&self) -> u32 {
        self.view_list_mask
    }

    pub fn display_mask(&self) -> u32 {
        self.display_mask
    }

    pub fn input_type(&self) -> InputType {
        self.input_type
    }

    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut PropertyValue {
        self.modified = true;
        &mut self.value
    }

    pub fn kind_name(&self) -> &'static str {
        self.value.kind_name()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
            || matches!(&self.value, PropertyValue::Table(t) if t.is_modified())
    }

    pub fn clear_modified(&mut self) {
        self.modified = false;
        if let PropertyValue::Table(t) = &mut self.value {
            t.set_modified(false);
        }
    }

    /// Visible when the display mask is unset or shares a bit with `global`.
    pub fn is_visible(&self, global: u32) -> bool {
        self.display_mask == 0 || self.display_mask & global != 0
    }

    fn mismatch(&self, expected: &'static str) -> ModelError {
        type_mismatch(&self.description, expected, &self.value)
    }

    fn scalar_ref(&self) -> Option<&ScalarValue> {
        match &self.value {
            PropertyValue::ScalarInput(s)
            | PropertyValue::ScalarOutput(s)
            | PropertyValue::SeriesInput { scalar: s, .. }
            | PropertyValue::SeriesOutput { scalar: s, .. } => Some(s),
            PropertyValue::List(_) | PropertyValue::Table(_) => None,
        }
    }

    /// Whether a value has been supplied (table: whether it passes `check`).
    /// A list always holds a selection.
    pub fn is_filled(&self) -> bool {
        match &self.value {
            PropertyValue::List(_) => true,
            PropertyValue::Table(t) => t.check(),
            _ => self.scalar_ref().is_some_and(|s| s.specified),
        }
    }

    /// Scalar value or 1-based list selection, `None` when not specified.
    /// An unwritten list still reports its default through [`Self::selection`].
    pub fn scalar_opt(&self) -> Option<f64> {
        match &self.value {
            PropertyValue::List(l) => l.specified.then_some(l.selection as f64),
            PropertyValue::Table(_) => None,
            _ => self.scalar_ref().and_then(ScalarValue::get),
        }
    }

    pub fn get_scalar(&self) -> ModelResult<f64> {
        if let PropertyValue::Table(_) = self.value {
            return Err(self.mismatch("a scalar"));
        }
        self.scalar_opt().ok_or_else(|| ModelError::NotSpecified {
            item: String::new(),
            property: self.description.clone(),
        })
    }

    /// Assign a scalar. Lists take an integral 1-based selection.
    pub fn set_scalar(&mut self, v: f64) -> ModelResult<()> {
        let description = self.description.clone();
        match &mut self.value {
            table @ PropertyValue::Table(_) => {
                return Err(type_mismatch(&description, "a scalar", table));
            }
            PropertyValue::List(l) => {
                let idx = v as usize;
                if v.fract() != 0.0 || idx == 0 || idx > l.options.len() {
                    return Err(ModelError::invalid(
                        "",
                        format!("'{description}' has no option {v}"),
                    ));
                }
                l.selection = idx;
                l.specified = true;
            }
            PropertyValue::ScalarInput(s)
            | PropertyValue::ScalarOutput(s)
            | PropertyValue::SeriesInput { scalar: s, .. }
            | PropertyValue::SeriesOutput { scalar: s, .. } => {
                s.set(v).map_err(|min| ModelError::BelowMinimum {
                    item: String::new(),
                    property: description,
                    value: v,
                    min,
                })?;
            }
        }
        self.modified = true;
        Ok(())
    }

    /// Select a drop-down option by text.
    ///
    /// Text that matches no option selects option 1 (logged).
    pub fn set_scalar_text(&mut self, text: &str) -> ModelResult<()> {
        let l = match &mut self.value {
            PropertyValue::List(l) => l,
            other => return Err(type_mismatch(&self.description, "a list", other)),
        };
        let idx = match l.position(text) {
            Some(idx) => idx,
            None => {
                warn!(
                    property = %self.description,
                    value = text,
                    "unknown option, selecting the first entry"
                );
                1
            }
        };
        l.selection = idx;
        l.specified = true;
        self.modified = true;
        Ok(())
    }

    pub fn list_value(&self) -> Option<&ListValue> {
        match &self.value {
            PropertyValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn selection(&self) -> Option<usize> {
        self.list_value().map(|l| l.selection)
    }

    pub fn selected_option(&self) -> Option<&str> {
        self.list_value().and_then(ListValue::selected)
    }

    /// Whether the current value lies above the advisory maximum.
    pub fn exceeds_maximum(&self) -> bool {
        self.scalar_ref()
            .is_some_and(|s| s.bound_checked && s.specified && s.value > s.max)
    }

    /// Drop the spec status; the value falls back to the default.
    pub fn unspecify(&mut self) {
        match &mut self.value {
            PropertyValue::List(l) => l.specified = false,
            PropertyValue::Table(t) => t.clear(),
            PropertyValue::ScalarInput(s)
            | PropertyValue::ScalarOutput(s)
            | PropertyValue::SeriesInput { scalar: s, .. }
            | PropertyValue::SeriesOutput { scalar: s, .. } => {
                s.value = s.default;
                s.specified = false;
            }
        }
        self.modified = true;
    }

    pub fn table(&self) -> ModelResult<&Table> {
        match &self.value {
            PropertyValue::Table(t) => Ok(t),
            _ => Err(self.mismatch("a table")),
        }
    }

    pub fn table_mut(&mut self) -> ModelResult<&mut Table> {
        match &mut self.value {
            PropertyValue::Table(t) => {
                self.modified = true;
                Ok(t)
            }
            other => Err(type_mismatch(&self.description, "a table", other)),
        }
    }

    fn binding(&self) -> ModelResult<&SeriesBinding> {
        match &self.value {
            PropertyValue::SeriesInput { binding, .. }
            | PropertyValue::SeriesOutput { binding, .. } => Ok(binding),
            _ => Err(self.mismatch("a series")),
        }
    }

    fn binding_mut(&mut self) -> ModelResult<&mut SeriesBinding> {
        match &mut self.value {
            PropertyValue::SeriesInput { binding, .. }
            | PropertyValue::SeriesOutput { binding, .. } => Ok(binding),
            other => Err(type_mismatch(&self.description, "a series", other)),
        }
    }

    /// Number of discretised elements (0 for undivided items).
    pub fn element_count(&self) -> usize {
        self.binding().map_or(0, SeriesBinding::element_count)
    }

    pub fn set_element_count(&mut self, n: usize) -> ModelResult<()> {
        self.binding_mut()?.set_element_count(n);
        Ok(())
    }

    fn check_element(&self, element: usize) -> ModelResult<&SeriesBinding> {
        let binding = self.binding()?;
        if element > binding.element_count {
            return Err(ModelError::IndexOutOfRange {
                item: String::new(),
                property: self.description.clone(),
                index: element,
                max: binding.element_count,
            });
        }
        Ok(binding)
    }

    fn not_loaded(&self, element: usize) -> ModelError {
        ModelError::DataNotLoaded {
            item: String::new(),
            property: self.description.clone(),
            element,
        }
    }

    /// Time series of element `element` (0 = whole item).
    pub fn series(&self, element: usize) -> ModelResult<Arc<SeriesBuffer>> {
        let binding = self.check_element(element)?;
        binding.series[element]
            .upgrade()
            .ok_or_else(|| self.not_loaded(element))
    }

    pub fn extremes(&self, element: usize) -> ModelResult<Extremes> {
        let binding = self.check_element(element)?;
        binding.extremes[element]
            .upgrade()
            .map(|e| *e)
            .ok_or_else(|| self.not_loaded(element))
    }

    pub fn bind_series(&mut self, element: usize, series: SeriesRef) -> ModelResult<()> {
        self.check_element(element)?;
        self.binding_mut()?.series[element] = series;
        Ok(())
    }

    pub fn bind_extremes(&mut self, element: usize, extremes: ExtremesRef) -> ModelResult<()> {
        self.check_element(element)?;
        self.binding_mut()?.extremes[element] = extremes;
        Ok(())
    }

    pub fn unbind_outputs(&mut self) {
        if let Ok(binding) = self.binding_mut() {
            let n = binding.element_count;
            binding.set_element_count(n);
        }
    }

    /// Copy the value of `other` into this property. Both must be scalars,
    /// both lists, or both tables.
    pub fn copy_data(&mut self, other: &Property) -> ModelResult<()> {
        let same_shape = matches!(
            (&self.value, &other.value),
            (PropertyValue::Table(_), PropertyValue::Table(_))
                | (PropertyValue::List(_), PropertyValue::List(_))
        ) || (self.scalar_ref().is_some() && other.scalar_ref().is_some());
        if !same_shape {
            return Err(self.mismatch(other.kind_name()));
        }
        if let (Some(src), Some(dst)) = (other.scalar_ref(), self.scalar_mut()) {
            dst.value = src.value;
            dst.specified = src.specified;
        }
        match (&mut self.value, &other.value) {
            (PropertyValue::Table(dst), PropertyValue::Table(src)) => dst.copy_from(src),
            (PropertyValue::List(dst), PropertyValue::List(src)) => {
                dst.selection = src.selection;
                dst.specified = src.specified;
            }
            _ => {}
        }
        self.modified = true;
        Ok(())
    }

    fn scalar_mut(&mut self) -> Option<&mut ScalarValue> {
        match &mut self.value {
            PropertyValue::ScalarInput(s)
            | PropertyValue::ScalarOutput(s)
            | PropertyValue::SeriesInput { scalar: s, .. }
            | PropertyValue::SeriesOutput { scalar: s, .. } => Some(s),
            PropertyValue::List(_) | PropertyValue::Table(_) => None,
        }
    }

    /// 1-based controller values this property is relevant for
    /// (bit i of the mask selects value i+1).
    pub fn view_list_numbers(&self) -> Vec<usize> {
        (0..32)
            .filter(|bit| self.view_list_mask & (1u32 << bit) != 0)
            .map(|bit| bit as usize + 1)
            .collect()
    }

    /// Value in the case's display unit.
    pub fn display_value(&self, units: &UnitTable) -> ModelResult<f64> {
        let si = self.get_scalar()?;
        if self.list_value().is_some() {
            return Ok(si);
        }
        Ok(units.from_si(self.unit, si))
    }

    pub fn set_display_value(&mut self, units: &UnitTable, v: f64) -> ModelResult<()> {
        if self.list_value().is_some() {
            return self.set_scalar(v);
        }
        self.set_scalar(units.to_si(self.unit, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableKind;

    fn diameter() -> Property {
        Property::scalar_input("Diameter", ScalarValue::bounded(0.0, 0.001, 10.0))
            .with_unit(UnitDimension::Length)
    }

    #[test]
    fn unwritten_scalar_is_not_specified() {
        let p = diameter();
        assert!(matches!(p.get_scalar(), Err(ModelError::NotSpecified { .. })));
        assert_eq!(p.scalar_opt(), None);
    }

    #[test]
    fn set_then_get() {
        let mut p = diameter();
        p.set_scalar(0.2).unwrap();
        assert_eq!(p.get_scalar().unwrap(), 0.2);
        assert!(p.is_filled());
        assert!(p.is_modified());
    }

    #[test]
    fn below_minimum_leaves_state() {
        let mut p = diameter();
        p.set_scalar(0.5).unwrap();
        let err = p.set_scalar(0.0001).unwrap_err();
        assert!(matches!(err, ModelError::BelowMinimum { .. }));
        assert_eq!(p.get_scalar().unwrap(), 0.5);
    }

    #[test]
    fn default_bypasses_minimum() {
        let mut p = diameter();
        p.set_scalar(0.0).unwrap();
        assert_eq!(p.get_scalar().unwrap(), 0.0);
    }

    #[test]
    fn maximum_is_advisory() {
        let mut p = diameter();
        p.set_scalar(25.0).unwrap();
        assert!(p.exceeds_maximum());
    }

    #[test]
    fn unknown_option_falls_back_to_first() {
        let mut p = Property::list(
            "Friction Model",
            vec!["Darcy".into(), "Hazen-Williams".into()],
            1,
        );
        p.set_scalar_text("hazen-williams").unwrap();
        assert_eq!(p.selection(), Some(2));
        // known quirk: no error for an unknown option
        p.set_scalar_text("Manning").unwrap();
        assert_eq!(p.selection(), Some(1));
        assert_eq!(p.get_scalar().unwrap(), 1.0);
    }

    #[test]
    fn unwritten_list_is_not_specified() {
        let mut p = Property::list("Mode", vec!["A".into(), "B".into()], 1);
        assert!(matches!(p.get_scalar(), Err(ModelError::NotSpecified { .. })));
        assert_eq!(p.scalar_opt(), None);
        assert_eq!(p.selection(), Some(1));
        p.set_scalar(2.0).unwrap();
        assert_eq!(p.get_scalar().unwrap(), 2.0);
        p.unspecify();
        assert_eq!(p.scalar_opt(), None);
    }

    #[test]
    fn text_on_scalar_is_mismatch() {
        let mut p = diameter();
        assert!(matches!(
            p.set_scalar_text("big"),
            Err(ModelError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn table_accessor_on_scalar_fails() {
        let p = diameter();
        assert!(matches!(p.table(), Err(ModelError::TypeMismatch { .. })));
        let t = Property::table_of("Profile", Table::new(TableKind::Ordered));
        assert!(t.table().is_ok());
        assert!(matches!(t.get_scalar(), Err(ModelError::TypeMismatch { .. })));
    }

    #[test]
    fn wrong_kind_writes_leave_the_property_clean() {
        let mut p = diameter();
        assert!(matches!(p.table_mut(), Err(ModelError::TypeMismatch { .. })));
        assert!(!p.is_modified());
        let mut t = Property::table_of("Profile", Table::new(TableKind::Ordered));
        let err = t.set_scalar(1.0).unwrap_err();
        assert!(err.to_string().contains("Profile"));
        assert!(!t.is_modified());
    }

    #[test]
    fn series_checks_range_then_binding() {
        let p = Property::series_output("Pressure", 3);
        assert!(matches!(
            p.series(4),
            Err(ModelError::IndexOutOfRange { index: 4, max: 3, .. })
        ));
        assert!(matches!(
            p.series(2),
            Err(ModelError::DataNotLoaded { element: 2, .. })
        ));
    }

    #[test]
    fn bound_series_is_weak() {
        let mut p = Property::series_output("Flow", 0);
        let buf = Arc::new(SeriesBuffer::new(Arc::new(vec![0.0, 1.0]), vec![3.0, 4.0]));
        p.bind_series(0, Arc::downgrade(&buf)).unwrap();
        assert_eq!(p.series(0).unwrap().last(), Some(4.0));
        drop(buf);
        assert!(matches!(p.series(0), Err(ModelError::DataNotLoaded { .. })));
    }

    #[test]
    fn view_list_numbers_decode_bits() {
        let p = diameter().with_dependency("Geometry Type", 0b1010);
        assert_eq!(p.view_list_numbers(), vec![2, 4]);
    }

    #[test]
    fn copy_between_kinds_fails() {
        let mut a = diameter();
        let b = Property::table_of("Profile", Table::new(TableKind::Free));
        assert!(matches!(a.copy_data(&b), Err(ModelError::TypeMismatch { .. })));

        let mut c = diameter();
        c.set_scalar(0.3).unwrap();
        a.copy_data(&c).unwrap();
        assert_eq!(a.get_scalar().unwrap(), 0.3);
    }

    #[test]
    fn display_value_uses_unit_table() {
        let mut units = UnitTable::si();
        units.set(UnitDimension::Length, "mm").unwrap();
        let mut p = diameter();
        p.set_display_value(&units, 250.0).unwrap();
        assert!((p.get_scalar().unwrap() - 0.25).abs() < 1e-12);
        assert!((p.display_value(&units).unwrap() - 250.0).abs() < 1e-9);
    }
}
