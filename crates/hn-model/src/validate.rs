//! Required-input and connectivity validation.

use std::fmt;

use hn_core::ItemId;

use crate::error::{ModelError, ModelResult};
use crate::item::{Item, ItemBody};
use crate::network::Network;
use crate::property::{ACTION_TABLE, InputType, Property};

/// Descriptions of the input properties of `item` that still need a value,
/// in property order.
pub fn required_properties(item: &Item, view_mask: u32) -> ModelResult<Vec<String>> {
    let name = item.qualified_name();
    let mut missing = Vec::new();
    for p in item.properties() {
        if p.description() == ACTION_TABLE {
            continue;
        }
        if is_required(item, p, view_mask).map_err(|e| e.in_item(&name))? {
            missing.push(p.description().to_string());
        }
    }
    let action_required = item
        .component()
        .is_some_and(|c| c.action_table_required());
    if action_required {
        let filled = item.property(ACTION_TABLE)?.is_filled();
        if !filled {
            missing.push(ACTION_TABLE.to_string());
        }
    }
    Ok(missing)
}

/// Whether `property` must still be supplied.
pub fn is_required(item: &Item, property: &Property, view_mask: u32) -> ModelResult<bool> {
    if !property.is_input()
        || property.description() == ACTION_TABLE
        || property.input_type() == InputType::Computed
        || !property.is_visible(view_mask)
    {
        return Ok(false);
    }
    if !dependency_chain_open(item, property)? {
        return Ok(false);
    }
    Ok(!property.is_filled())
}

/// Walk the list-dependency chain starting at `property`.
///
/// Each link is open when the controlling property's current selection is
/// one of the values the dependent link is relevant for.
fn dependency_chain_open(item: &Item, property: &Property) -> ModelResult<bool> {
    let mut visited = vec![property.description()];
    let mut link = property;
    while let Some(controller_name) = link.list_dependency() {
        if visited.contains(&controller_name) {
            return Err(ModelError::DependencyCycle {
                item: String::new(),
                property: property.description().to_string(),
            });
        }
        let controller = item.property(controller_name)?;
        let Some(selection) = current_selection(controller) else {
            return Ok(false);
        };
        if !link.view_list_numbers().contains(&selection) {
            return Ok(false);
        }
        visited.push(controller_name);
        link = controller;
    }
    Ok(true)
}

/// Lists report their selection (default included); scalars count only
/// once specified.
fn current_selection(controller: &Property) -> Option<usize> {
    if let Some(sel) = controller.selection() {
        return Some(sel);
    }
    let v = controller.scalar_opt()?;
    (v >= 1.0 && v.fract() == 0.0).then_some(v as usize)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityIssue {
    /// A physical component or sensor point without a node.
    UnconnectedPoint { item: String, connect_point: u32 },
    /// A control block input channel without a signal.
    UnwiredInput { item: String, channel: u32 },
    OpenSignalLine { item: String },
    IsolatedNode { item: String },
}

impl fmt::Display for ConnectivityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectivityIssue::UnconnectedPoint {
                item,
                connect_point,
            } => write!(f, "{item}: connect point {connect_point} has no node"),
            ConnectivityIssue::UnwiredInput { item, channel } => {
                write!(f, "{item}: input channel {channel} has no signal")
            }
            ConnectivityIssue::OpenSignalLine { item } => {
                write!(f, "{item}: signal line has an open end")
            }
            ConnectivityIssue::IsolatedNode { item } => {
                write!(f, "{item}: node has no components")
            }
        }
    }
}

fn connectivity_issues(item: &Item) -> Vec<ConnectivityIssue> {
    let name = item.qualified_name();
    let mut issues = Vec::new();
    match item.body() {
        ItemBody::Component(c) => {
            if c.class.attaches_to_nodes() {
                for cp in 1..=c.connect_point_count {
                    if !c.nodes.contains_key(&cp) {
                        issues.push(ConnectivityIssue::UnconnectedPoint {
                            item: name.clone(),
                            connect_point: cp,
                        });
                    }
                }
            }
            if !c.class.is_physical() {
                for channel in 1..=c.input_channels.len() as u32 {
                    if c.signals_in.get(&channel).is_none_or(Vec::is_empty) {
                        issues.push(ConnectivityIssue::UnwiredInput {
                            item: name.clone(),
                            channel,
                        });
                    }
                }
            }
        }
        ItemBody::Node(n) => {
            if n.connected_components.is_empty() {
                issues.push(ConnectivityIssue::IsolatedNode { item: name });
            }
        }
        ItemBody::SignalLine(s) => {
            if s.is_open() {
                issues.push(ConnectivityIssue::OpenSignalLine { item: name });
            }
        }
    }
    issues
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub id: ItemId,
    pub name: String,
    pub missing: Vec<String>,
}

/// Outcome of validating a whole network. Disused items are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Items with at least one missing input.
    pub items: Vec<ItemReport>,
    pub connectivity: Vec<ConnectivityIssue>,
}

impl ValidationReport {
    pub fn is_complete(&self) -> bool {
        self.items.is_empty() && self.connectivity.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.items.iter().map(|r| r.missing.len()).sum()
    }
}

impl Network {
    pub fn validate(&self) -> ModelResult<ValidationReport> {
        let mut report = ValidationReport::default();
        for item in self.items().filter(|i| !i.is_disused()) {
            let missing = required_properties(item, self.view_mask)?;
            if !missing.is_empty() {
                report.items.push(ItemReport {
                    id: item.id(),
                    name: item.qualified_name(),
                    missing,
                });
            }
            report.connectivity.extend(connectivity_issues(item));
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemBody;
    use crate::node::NodeBody;
    use crate::property::ScalarValue;

    fn item_with(props: Vec<Property>) -> Item {
        let mut item = Item::new(
            ItemId::from_index(0),
            "Test",
            "T",
            1,
            ItemBody::Node(NodeBody::new("Test")),
        );
        item.set_name("X").unwrap();
        for p in props {
            item.add_property(p).unwrap();
        }
        item
    }

    fn mode() -> Property {
        Property::list("Mode", vec!["A".into(), "B".into(), "C".into()], 1)
    }

    #[test]
    fn list_gate_controls_requirement() {
        let b = Property::scalar_input("B", ScalarValue::new(0.0)).with_dependency("Mode", 0b10);
        let mut item = item_with(vec![mode(), b]);
        assert!(required_properties(&item, u32::MAX).unwrap().is_empty());

        item.set_scalar("Mode", 2.0).unwrap();
        assert_eq!(required_properties(&item, u32::MAX).unwrap(), vec!["B"]);

        item.set_scalar("Mode", 3.0).unwrap();
        assert!(required_properties(&item, u32::MAX).unwrap().is_empty());
    }

    #[test]
    fn two_link_chain() {
        let inner = Property::list("Inner", vec!["x".into(), "y".into()], 1)
            .with_dependency("Mode", 0b100);
        let c = Property::scalar_input("C", ScalarValue::new(0.0)).with_dependency("Inner", 0b10);
        let mut item = item_with(vec![mode(), inner, c]);
        item.set_scalar("Inner", 2.0).unwrap();
        // Mode is 1, so the Inner link is closed
        assert!(required_properties(&item, u32::MAX).unwrap().is_empty());
        item.set_scalar("Mode", 3.0).unwrap();
        assert_eq!(required_properties(&item, u32::MAX).unwrap(), vec!["C"]);
    }

    #[test]
    fn missing_controller_is_not_found() {
        let b = Property::scalar_input("B", ScalarValue::new(0.0)).with_dependency("Nope", 1);
        let item = item_with(vec![b]);
        let err = required_properties(&item, u32::MAX).unwrap_err();
        assert!(matches!(err, ModelError::NotFound { .. }));
        assert!(err.to_string().contains("T.X"));
    }

    #[test]
    fn cycle_is_reported() {
        let a = Property::list("A", vec!["1".into()], 1).with_dependency("B", 1);
        let b = Property::list("B", vec!["1".into()], 1).with_dependency("A", 1);
        let item = item_with(vec![a, b]);
        assert!(matches!(
            required_properties(&item, u32::MAX),
            Err(ModelError::DependencyCycle { .. })
        ));
    }

    #[test]
    fn computed_outputs_and_hidden_are_skipped() {
        let computed = Property::scalar_input("K", ScalarValue::new(0.0))
            .with_input_type(InputType::Computed);
        let out = Property::scalar_output("Q");
        let hidden = Property::scalar_input("H", ScalarValue::new(0.0)).with_display_mask(0b100);
        let item = item_with(vec![computed, out, hidden]);
        assert!(required_properties(&item, 0b011).unwrap().is_empty());
        assert_eq!(required_properties(&item, 0b100).unwrap(), vec!["H"]);
    }

    #[test]
    fn network_report_lists_open_points() {
        let mut net = Network::with_builtin().unwrap();
        let pipe = net.add_component("Pipe", "P1").unwrap();
        let n1 = net.add_node("Junction", "N1").unwrap();
        net.connect_node(pipe, n1, 1).unwrap();
        let report = net.validate().unwrap();
        assert!(report.connectivity.contains(&ConnectivityIssue::UnconnectedPoint {
            item: "PIPE.P1".into(),
            connect_point: 2,
        }));
        let pipe_report = report.items.iter().find(|r| r.id == pipe).unwrap();
        assert!(pipe_report.missing.contains(&"Length".to_string()));
        assert!(pipe_report.missing.contains(&"Diameter".to_string()));
        assert!(!pipe_report.missing.contains(&"Profile".to_string()));
    }
}
