//! Component bodies: physical devices and control blocks.

use std::collections::BTreeMap;

use hn_core::ItemId;
use serde::{Deserialize, Serialize};

/// Kind of value a signal channel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    Analog,
    Digital,
    /// Wildcard, accepted on component input channels only.
    Both,
}

impl SignalType {
    /// Whether a channel declared as `self` on the given side accepts a line of `line`.
    pub fn accepts(self, line: SignalType, direction: SignalDirection) -> bool {
        self == line || (self == SignalType::Both && direction == SignalDirection::Input)
    }
}

/// Direction of a signal connection seen from the component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalDirection {
    /// The line feeds the component.
    Input,
    /// The component drives the line.
    Output,
}

/// Whether a component type uses the per-item action table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTableMode {
    #[default]
    Unsupported,
    Optional,
    Mandatory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentClass {
    Physical { physical_type: String },
    /// `sensor` blocks may attach to nodes like physical components.
    Control { control_type: String, sensor: bool },
}

impl ComponentClass {
    pub fn is_physical(&self) -> bool {
        matches!(self, ComponentClass::Physical { .. })
    }

    pub fn is_sensor(&self) -> bool {
        matches!(self, ComponentClass::Control { sensor: true, .. })
    }

    /// Physical components and sensors may attach to nodes.
    pub fn attaches_to_nodes(&self) -> bool {
        self.is_physical() || self.is_sensor()
    }

    pub fn type_name(&self) -> &str {
        match self {
            ComponentClass::Physical { physical_type } => physical_type,
            ComponentClass::Control { control_type, .. } => control_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentBody {
    pub class: ComponentClass,
    pub connect_point_count: u32,
    /// At most one node per connect point.
    pub nodes: BTreeMap<u32, ItemId>,
    pub signals_in: BTreeMap<u32, Vec<ItemId>>,
    pub signals_out: BTreeMap<u32, Vec<ItemId>>,
    pub controllable: bool,
    pub control_input_type: Option<SignalType>,
    /// One label per connect point (e.g. "Pressure", "Flow").
    pub core_quantities: Vec<String>,
    pub input_channels: Vec<SignalType>,
    pub output_channels: Vec<SignalType>,
    pub action_table: ActionTableMode,
    pub action_table_enabled: bool,
}

impl ComponentBody {
    pub fn new(class: ComponentClass, connect_point_count: u32) -> Self {
        Self {
            class,
            connect_point_count,
            nodes: BTreeMap::new(),
            signals_in: BTreeMap::new(),
            signals_out: BTreeMap::new(),
            controllable: false,
            control_input_type: None,
            core_quantities: Vec::new(),
            input_channels: Vec::new(),
            output_channels: Vec::new(),
            action_table: ActionTableMode::Unsupported,
            action_table_enabled: false,
        }
    }

    /// The extra connect point a controllable physical component is driven through.
    pub fn control_point(&self) -> Option<u32> {
        (self.class.is_physical() && self.controllable).then_some(self.connect_point_count + 1)
    }

    /// Highest connect point usable for signal connections.
    pub fn max_signal_point(&self) -> u32 {
        self.control_point().unwrap_or(self.connect_point_count)
    }

    /// Declared channel type at `cp`, if the type declares one.
    pub fn channel_type(&self, cp: u32, direction: SignalDirection) -> Option<SignalType> {
        if Some(cp) == self.control_point() {
            return match direction {
                SignalDirection::Input => self.control_input_type,
                SignalDirection::Output => None,
            };
        }
        let idx = usize::try_from(cp).ok()?.checked_sub(1)?;
        match direction {
            SignalDirection::Input => self.input_channels.get(idx).copied(),
            SignalDirection::Output => self.output_channels.get(idx).copied(),
        }
    }

    pub fn signals(&self, direction: SignalDirection) -> &BTreeMap<u32, Vec<ItemId>> {
        match direction {
            SignalDirection::Input => &self.signals_in,
            SignalDirection::Output => &self.signals_out,
        }
    }

    pub fn signals_mut(&mut self, direction: SignalDirection) -> &mut BTreeMap<u32, Vec<ItemId>> {
        match direction {
            SignalDirection::Input => &mut self.signals_in,
            SignalDirection::Output => &mut self.signals_out,
        }
    }

    /// Connect point at which `other` is attached: nodes first, then input
    /// signals, then output signals.
    pub fn point_of(&self, other: ItemId) -> Option<u32> {
        self.nodes
            .iter()
            .find(|(_, id)| **id == other)
            .map(|(cp, _)| *cp)
            .or_else(|| find_in(&self.signals_in, other))
            .or_else(|| find_in(&self.signals_out, other))
    }

    /// Every item this component references, one entry per attachment.
    pub fn attachments(&self) -> Vec<ItemId> {
        let mut out: Vec<ItemId> = self.nodes.values().copied().collect();
        out.extend(self.signals_in.values().flatten().copied());
        out.extend(self.signals_out.values().flatten().copied());
        out
    }

    pub fn action_table_required(&self) -> bool {
        match self.action_table {
            ActionTableMode::Unsupported => false,
            ActionTableMode::Optional => self.action_table_enabled,
            ActionTableMode::Mandatory => true,
        }
    }
}

fn find_in(map: &BTreeMap<u32, Vec<ItemId>>, other: ItemId) -> Option<u32> {
    map.iter()
        .find(|(_, ids)| ids.contains(&other))
        .map(|(cp, _)| *cp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valve() -> ComponentBody {
        let mut body = ComponentBody::new(
            ComponentClass::Physical {
                physical_type: "Valve".into(),
            },
            2,
        );
        body.controllable = true;
        body.control_input_type = Some(SignalType::Analog);
        body
    }

    #[test]
    fn control_point_follows_connect_points() {
        let v = valve();
        assert_eq!(v.control_point(), Some(3));
        assert_eq!(v.max_signal_point(), 3);
        assert_eq!(v.channel_type(3, SignalDirection::Input), Some(SignalType::Analog));
        assert_eq!(v.channel_type(3, SignalDirection::Output), None);
    }

    #[test]
    fn wildcard_only_on_input() {
        assert!(SignalType::Both.accepts(SignalType::Digital, SignalDirection::Input));
        assert!(!SignalType::Both.accepts(SignalType::Digital, SignalDirection::Output));
        assert!(SignalType::Analog.accepts(SignalType::Analog, SignalDirection::Output));
    }

    #[test]
    fn point_of_searches_nodes_first() {
        let mut v = valve();
        let n = ItemId::from_index(4);
        let s = ItemId::from_index(5);
        v.nodes.insert(2, n);
        v.signals_in.entry(3).or_default().push(s);
        assert_eq!(v.point_of(n), Some(2));
        assert_eq!(v.point_of(s), Some(3));
        assert_eq!(v.point_of(ItemId::from_index(9)), None);
    }
}
