//! Case definitions to networks and back.

use std::collections::BTreeMap;
use std::sync::Arc;

use hn_core::{ItemKey, UnitDimension};
use hn_model::{
    Catalogue, ColumnData, Item, ItemBody, Network, PropertyValue, SignalDirection,
};
use tracing::info;

use crate::CaseResult;
use crate::schema::{CaseDef, ColumnValuesDef, ConnectionDef, DirectionDef, ItemDef, ValueDef};
use crate::validate::{LATEST_VERSION, validate_case};

impl From<DirectionDef> for SignalDirection {
    fn from(d: DirectionDef) -> Self {
        match d {
            DirectionDef::Input => SignalDirection::Input,
            DirectionDef::Output => SignalDirection::Output,
        }
    }
}

impl From<SignalDirection> for DirectionDef {
    fn from(d: SignalDirection) -> Self {
        match d {
            SignalDirection::Input => DirectionDef::Input,
            SignalDirection::Output => DirectionDef::Output,
        }
    }
}

/// Build a network from a validated case.
pub fn build_network(case: &CaseDef, catalogue: Arc<Catalogue>) -> CaseResult<Network> {
    validate_case(case)?;
    let mut net = Network::new(catalogue);
    for (dimension, unit) in &case.units {
        let dimension: UnitDimension = dimension.parse()?;
        net.units.set(dimension, unit)?;
    }
    net.view_mask = case.view_mask;

    for def in &case.items {
        let id = net.insert_with_key(&def.type_name, &def.name, ItemKey(def.key))?;
        let item = net.item_mut(id)?;
        apply_item(item, def)?;
    }

    for connection in &case.connections {
        match *connection {
            ConnectionDef::Node {
                component,
                node,
                point,
            } => {
                let c = item_by_key(&net, component)?;
                let n = item_by_key(&net, node)?;
                net.connect_node(c, n, point)?;
            }
            ConnectionDef::Signal {
                component,
                line,
                point,
                direction,
            } => {
                let c = item_by_key(&net, component)?;
                let l = item_by_key(&net, line)?;
                net.connect_signal(c, l, point, direction.into())?;
            }
        }
    }

    net.clear_modified();
    info!(case = %case.name, items = net.len(), "case loaded");
    Ok(net)
}

fn item_by_key(net: &Network, key: i32) -> CaseResult<hn_core::ItemId> {
    net.find_by_key(ItemKey(key)).ok_or_else(|| {
        crate::validate::ValidationError::MissingReference {
            key,
            context: "connections".into(),
        }
        .into()
    })
}

fn apply_item(item: &mut Item, def: &ItemDef) -> CaseResult<()> {
    item.position = def.position;
    item.polyline = def.polyline.clone();
    item.set_comment(def.comment.as_str())?;
    item.set_keywords(def.keywords.clone())?;
    item.set_disused(def.disused);
    if def.action_table {
        item.set_action_table_enabled(true)?;
    }
    for (description, value) in &def.values {
        match value {
            ValueDef::Scalar { value } => item.set_scalar(description, *value)?,
            ValueDef::Choice { value } => item.set_scalar_text(description, value)?,
            ValueDef::Table { columns } => {
                let qualified = item.qualified_name();
                let table = item
                    .property_mut(description)?
                    .table_mut()
                    .map_err(|e| e.in_item(&qualified))?;
                table.clear();
                for column in columns {
                    let result = if column.texts.is_empty() {
                        table.set_floats(&column.name, column.values.clone())
                    } else {
                        table.set_texts(&column.name, column.texts.clone())
                    };
                    result.map_err(|e| e.in_item(&qualified))?;
                }
            }
        }
    }
    Ok(())
}

/// Capture the user-supplied state of a network as a case definition.
pub fn snapshot(network: &Network, name: &str) -> CaseDef {
    let mut items: Vec<&Item> = network.items().collect();
    items.sort_by_key(|i| i.key());

    let mut connections = Vec::new();
    let key_of = |id| network.get(id).map(|i: &Item| i.key().value());
    for item in &items {
        let ItemBody::Component(c) = item.body() else {
            continue;
        };
        let component = item.key().value();
        for (&point, &node) in &c.nodes {
            if let Some(node) = key_of(node) {
                connections.push(ConnectionDef::Node {
                    component,
                    node,
                    point,
                });
            }
        }
        for direction in [SignalDirection::Input, SignalDirection::Output] {
            for (&point, lines) in c.signals(direction) {
                for &line in lines {
                    if let Some(line) = key_of(line) {
                        connections.push(ConnectionDef::Signal {
                            component,
                            line,
                            point,
                            direction: direction.into(),
                        });
                    }
                }
            }
        }
    }

    CaseDef {
        version: LATEST_VERSION,
        name: name.to_string(),
        units: network
            .units
            .non_si()
            .into_iter()
            .map(|(d, u)| (d.name().to_string(), u))
            .collect(),
        view_mask: network.view_mask,
        items: items.into_iter().map(item_def).collect(),
        connections,
    }
}

fn item_def(item: &Item) -> ItemDef {
    let mut values = BTreeMap::new();
    for p in item.properties().iter().filter(|p| p.is_input()) {
        let value = match p.value() {
            PropertyValue::ScalarInput(s) | PropertyValue::SeriesInput { scalar: s, .. } => {
                s.specified.then_some(ValueDef::Scalar { value: s.value })
            }
            PropertyValue::List(l) => l.specified.then(|| ValueDef::Choice {
                value: l.selected().unwrap_or_default().to_string(),
            }),
            PropertyValue::Table(t) => {
                let columns: Vec<ColumnValuesDef> = t
                    .descriptions()
                    .iter()
                    .filter_map(|d| t.column(d).map(|c| (d, c)))
                    .filter(|(_, c)| !c.data.is_empty())
                    .map(|(d, c)| match &c.data {
                        ColumnData::Float(v) => ColumnValuesDef {
                            name: d.clone(),
                            values: v.clone(),
                            texts: Vec::new(),
                        },
                        ColumnData::Text(v) => ColumnValuesDef {
                            name: d.clone(),
                            values: Vec::new(),
                            texts: v.clone(),
                        },
                    })
                    .collect();
                (!columns.is_empty()).then_some(ValueDef::Table { columns })
            }
            PropertyValue::ScalarOutput(_) | PropertyValue::SeriesOutput { .. } => None,
        };
        if let Some(value) = value {
            values.insert(p.description().to_string(), value);
        }
    }
    ItemDef {
        key: item.key().value(),
        type_name: item.type_name().to_string(),
        name: item.name().to_string(),
        position: item.position,
        polyline: item.polyline.clone(),
        comment: item.comment().to_string(),
        keywords: item.keywords().to_vec(),
        disused: item.is_disused(),
        action_table: item
            .component()
            .is_some_and(|c| c.action_table_enabled),
        values,
    }
}
