//! Component-type catalogue.
//!
//! Item types are data, not code: each type lists its connect points,
//! channels and property definitions. Items are instantiated from these
//! definitions when a case is loaded or when an item is added.

use hn_core::{ItemId, UnitDimension};
use serde::{Deserialize, Serialize};

use crate::component::{ActionTableMode, ComponentBody, ComponentClass, SignalType};
use crate::error::{ModelError, ModelResult};
use crate::item::{Item, ItemBody};
use crate::node::NodeBody;
use crate::property::{ACTION_TABLE, Property, PropertyValue, ScalarValue};
use crate::signal_line::SignalLineBody;
use crate::table::{ColumnSpec, Table, TableKind};

const BUILTIN: &str = include_str!("../data/builtin_catalogue.yaml");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Catalogue {
    pub version: u32,
    #[serde(default)]
    pub components: Vec<ComponentTypeDef>,
    #[serde(default)]
    pub nodes: Vec<NodeTypeDef>,
    #[serde(default)]
    pub signal_lines: Vec<SignalLineTypeDef>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ComponentCategory {
    Physical,
    Control,
    Sensor,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentTypeDef {
    pub name: String,
    pub prefix: String,
    pub class_sort_key: i32,
    pub category: ComponentCategory,
    pub connect_points: u32,
    #[serde(default)]
    pub core_quantities: Vec<String>,
    #[serde(default)]
    pub controllable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_input_type: Option<SignalType>,
    #[serde(default)]
    pub input_channels: Vec<SignalType>,
    #[serde(default)]
    pub output_channels: Vec<SignalType>,
    #[serde(default)]
    pub action_table: ActionTableMode,
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeTypeDef {
    pub name: String,
    pub prefix: String,
    pub class_sort_key: i32,
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalLineTypeDef {
    pub name: String,
    pub prefix: String,
    pub class_sort_key: i32,
    pub signal_type: SignalType,
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
}

/// Gate a property on the 1-based selections of another property.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DependencyDef {
    pub property: String,
    pub values: Vec<u32>,
}

impl DependencyDef {
    pub fn mask(&self) -> u32 {
        self.values
            .iter()
            .filter(|v| (1..=32).contains(*v))
            .fold(0, |m, v| m | (1u32 << (v - 1)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnDef {
    pub description: String,
    #[serde(default = "default_unit")]
    pub unit: UnitDimension,
    #[serde(default)]
    pub text: bool,
}

fn default_unit() -> UnitDimension {
    UnitDimension::Dimensionless
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueDef {
    Scalar {
        #[serde(default)]
        default: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    Output,
    List {
        options: Vec<String>,
        #[serde(default = "first")]
        default: usize,
    },
    Table {
        #[serde(default)]
        ordered: bool,
        columns: Vec<ColumnDef>,
    },
    SeriesInput {
        #[serde(default)]
        default: f64,
        #[serde(default)]
        elements: usize,
    },
    SeriesOutput {
        #[serde(default)]
        elements: usize,
    },
}

fn first() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyDef {
    pub description: String,
    #[serde(default)]
    pub key: i32,
    pub value: ValueDef,
    #[serde(default = "default_unit")]
    pub unit: UnitDimension,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<DependencyDef>,
    #[serde(default)]
    pub display_mask: u32,
    #[serde(default)]
    pub computed: bool,
}

impl PropertyDef {
    pub fn build(&self) -> Property {
        let value = match &self.value {
            ValueDef::Scalar { default, min, max } => {
                let scalar = match (min, max) {
                    (None, None) => ScalarValue::new(*default),
                    _ => ScalarValue::bounded(
                        *default,
                        min.unwrap_or(f64::NEG_INFINITY),
                        max.unwrap_or(f64::INFINITY),
                    ),
                };
                PropertyValue::ScalarInput(scalar)
            }
            ValueDef::Output => PropertyValue::ScalarOutput(ScalarValue::new(0.0)),
            ValueDef::List { options, default } => {
                return self.decorate(Property::list(
                    self.description.as_str(),
                    options.clone(),
                    *default,
                ));
            }
            ValueDef::Table { ordered, columns } => {
                let kind = if *ordered {
                    TableKind::Ordered
                } else {
                    TableKind::Free
                };
                let mut table = Table::new(kind);
                for (i, col) in columns.iter().enumerate() {
                    let mut spec = if col.text {
                        ColumnSpec::text(col.description.as_str(), self.key)
                    } else {
                        ColumnSpec::float(col.description.as_str(), col.unit, self.key)
                    };
                    spec.index = i;
                    table.add_column(spec);
                }
                table.set_modified(false);
                PropertyValue::Table(table)
            }
            ValueDef::SeriesInput { default, elements } => {
                return self.decorate(Property::series_input(
                    self.description.as_str(),
                    ScalarValue::new(*default),
                    *elements,
                ));
            }
            ValueDef::SeriesOutput { elements } => {
                return self.decorate(Property::series_output(
                    self.description.as_str(),
                    *elements,
                ));
            }
        };
        self.decorate(Property::new(self.description.as_str(), value))
    }

    fn decorate(&self, mut p: Property) -> Property {
        p = p
            .with_key(self.key)
            .with_unit(self.unit)
            .with_display_mask(self.display_mask);
        if let Some(dep) = &self.depends_on {
            p = p.with_dependency(dep.property.as_str(), dep.mask());
        }
        if self.computed {
            p = p.with_input_type(crate::property::InputType::Computed);
        }
        p
    }
}

fn catalogue_err(message: impl Into<String>) -> ModelError {
    ModelError::Catalogue {
        message: message.into(),
    }
}

impl Catalogue {
    /// Built-in types shipped with the crate.
    pub fn builtin() -> ModelResult<Self> {
        Self::from_yaml(BUILTIN)
    }

    pub fn from_yaml(text: &str) -> ModelResult<Self> {
        let catalogue: Catalogue =
            serde_yaml::from_str(text).map_err(|e| catalogue_err(e.to_string()))?;
        catalogue.check()?;
        Ok(catalogue)
    }

    pub fn load(path: &std::path::Path) -> ModelResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| catalogue_err(format!("{}: {e}", path.display())))?;
        Self::from_yaml(&text)
    }

    fn check(&self) -> ModelResult<()> {
        let mut names = std::collections::HashSet::new();
        let all = self
            .components
            .iter()
            .map(|c| (&c.name, &c.properties))
            .chain(self.nodes.iter().map(|n| (&n.name, &n.properties)))
            .chain(self.signal_lines.iter().map(|s| (&s.name, &s.properties)));
        for (name, properties) in all {
            if !names.insert(name.as_str()) {
                return Err(catalogue_err(format!("type '{name}' defined twice")));
            }
            let mut seen = std::collections::HashSet::new();
            for p in properties {
                if !seen.insert(p.description.as_str()) {
                    return Err(catalogue_err(format!(
                        "type '{name}' defines '{}' twice",
                        p.description
                    )));
                }
            }
        }
        for c in &self.components {
            if c.controllable && c.control_input_type.is_none() {
                return Err(catalogue_err(format!(
                    "controllable type '{}' has no control input type",
                    c.name
                )));
            }
            if let Some(bad) = c.output_channels.iter().find(|t| **t == SignalType::Both) {
                return Err(catalogue_err(format!(
                    "type '{}' declares a {bad:?} output channel",
                    c.name
                )));
            }
        }
        Ok(())
    }

    pub fn component_type(&self, name: &str) -> Option<&ComponentTypeDef> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn node_type(&self, name: &str) -> Option<&NodeTypeDef> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn signal_line_type(&self, name: &str) -> Option<&SignalLineTypeDef> {
        self.signal_lines.iter().find(|s| s.name == name)
    }

    /// Build an item of any kind from the type named `type_name`.
    pub fn instantiate(&self, id: ItemId, type_name: &str) -> ModelResult<Item> {
        if let Some(def) = self.component_type(type_name) {
            return def.instantiate(id);
        }
        if let Some(def) = self.node_type(type_name) {
            let mut item = Item::new(
                id,
                def.name.as_str(),
                def.prefix.as_str(),
                def.class_sort_key,
                ItemBody::Node(NodeBody::new(def.name.as_str())),
            );
            add_properties(&mut item, &def.properties)?;
            return Ok(item);
        }
        if let Some(def) = self.signal_line_type(type_name) {
            let mut item = Item::new(
                id,
                def.name.as_str(),
                def.prefix.as_str(),
                def.class_sort_key,
                ItemBody::SignalLine(SignalLineBody::new(def.signal_type)),
            );
            add_properties(&mut item, &def.properties)?;
            return Ok(item);
        }
        Err(ModelError::unknown("item type", type_name))
    }
}

impl ComponentTypeDef {
    pub fn instantiate(&self, id: ItemId) -> ModelResult<Item> {
        let class = match self.category {
            ComponentCategory::Physical => ComponentClass::Physical {
                physical_type: self.name.clone(),
            },
            ComponentCategory::Control | ComponentCategory::Sensor => ComponentClass::Control {
                control_type: self.name.clone(),
                sensor: self.category == ComponentCategory::Sensor,
            },
        };
        let mut body = ComponentBody::new(class, self.connect_points);
        body.controllable = self.controllable;
        body.control_input_type = self.control_input_type;
        body.core_quantities = self.core_quantities.clone();
        body.input_channels = self.input_channels.clone();
        body.output_channels = self.output_channels.clone();
        body.action_table = self.action_table;
        let mut item = Item::new(
            id,
            self.name.as_str(),
            self.prefix.as_str(),
            self.class_sort_key,
            ItemBody::Component(body),
        );
        add_properties(&mut item, &self.properties)?;
        if self.action_table != ActionTableMode::Unsupported && !item.has_property(ACTION_TABLE) {
            let mut table = Table::new(TableKind::Ordered);
            table.add_column(ColumnSpec::float("Time", UnitDimension::Time, 0));
            let mut action = ColumnSpec::float("Action", UnitDimension::Dimensionless, 0);
            action.index = 1;
            table.add_column(action);
            table.set_modified(false);
            item.add_property(Property::table_of(ACTION_TABLE, table))?;
        }
        Ok(item)
    }
}

fn add_properties(item: &mut Item, defs: &[PropertyDef]) -> ModelResult<()> {
    for def in defs {
        item.add_property(def.build())?;
    }
    Ok(())
}
