//! Case file schema definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseDef {
    pub version: u32,
    pub name: String,
    /// Dimension name → display unit name; dimensions not listed stay SI.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub units: BTreeMap<String, String>,
    #[serde(default = "all_views")]
    pub view_mask: u32,
    #[serde(default)]
    pub items: Vec<ItemDef>,
    #[serde(default)]
    pub connections: Vec<ConnectionDef>,
}

fn all_views() -> u32 {
    u32::MAX
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemDef {
    pub key: i32,
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
    #[serde(default)]
    pub position: [f64; 2],
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub polyline: Vec<[f64; 2]>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disused: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub action_table: bool,
    /// Property description → supplied value.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, ValueDef>,
}

fn is_false(v: &bool) -> bool {
    !*v
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueDef {
    Scalar { value: f64 },
    /// Drop-down option by its text.
    Choice { value: String },
    Table { columns: Vec<ColumnValuesDef> },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnValuesDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub texts: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DirectionDef {
    Input,
    Output,
}

/// Connections refer to items by key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionDef {
    Node {
        component: i32,
        node: i32,
        point: u32,
    },
    Signal {
        component: i32,
        line: i32,
        point: u32,
        direction: DirectionDef,
    },
}

impl ConnectionDef {
    /// Keys this connection references.
    pub fn keys(&self) -> [i32; 2] {
        match self {
            ConnectionDef::Node { component, node, .. } => [*component, *node],
            ConnectionDef::Signal {
                component, line, ..
            } => [*component, *line],
        }
    }
}
