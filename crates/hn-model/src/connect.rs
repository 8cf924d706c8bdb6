//! Connect and disconnect operations on the network arena.
//!
//! Every successful change marks both ends modified.

use hn_core::ItemId;

use crate::component::{ComponentBody, SignalDirection};
use crate::error::{ModelError, ModelResult};
use crate::network::Network;
use crate::signal_line::SignalEnd;

impl Network {
    fn component_body(&self, id: ItemId) -> ModelResult<(&ComponentBody, String)> {
        let item = self.item(id)?;
        let name = item.qualified_name();
        let body = item.component().ok_or_else(|| ModelError::InvalidConnection {
            item: name.clone(),
            what: "not a component".into(),
        })?;
        Ok((body, name))
    }

    fn check_node_point(body: &ComponentBody, name: &str, cp: u32) -> ModelResult<()> {
        if cp == 0 || cp > body.connect_point_count {
            return Err(ModelError::invalid(
                name,
                format!(
                    "connect point {cp} outside 1..={}",
                    body.connect_point_count
                ),
            ));
        }
        Ok(())
    }

    fn mark(&mut self, id: ItemId) {
        if let Some(item) = self.get_mut(id) {
            item.mark_modified();
        }
    }

    /// Attach `node` at connect point `cp` of `component`, replacing any
    /// node already there.
    pub fn connect_node(&mut self, component: ItemId, node: ItemId, cp: u32) -> ModelResult<()> {
        let (body, name) = self.component_body(component)?;
        if !body.class.attaches_to_nodes() {
            return Err(ModelError::InvalidConnection {
                item: name,
                what: "only physical components and sensors attach to nodes".into(),
            });
        }
        Self::check_node_point(body, &name, cp)?;
        let target = self.item(node)?;
        if target.node().is_none() {
            return Err(ModelError::InvalidConnection {
                item: name,
                what: format!("'{}' is not a node", target.qualified_name()),
            });
        }
        let previous = body.nodes.get(&cp).copied();
        if previous == Some(node) {
            return Ok(());
        }

        let body = self.item_mut(component)?.component_mut();
        let still_attached = body.is_some_and(|b| {
            b.nodes.insert(cp, node);
            previous.is_some_and(|old| b.nodes.values().any(|n| *n == old))
        });
        self.mark(component);

        if let Some(old) = previous
            && !still_attached
        {
            if let Some(n) = self.get_mut(old).and_then(|i| i.node_mut()) {
                n.detach(component);
            }
            self.mark(old);
        }

        if let Some(n) = self.get_mut(node).and_then(|i| i.node_mut()) {
            n.attach(component);
        }
        self.mark(node);
        Ok(())
    }

    /// Attach signal line `line` at connect point `cp` of `component`.
    ///
    /// `Input` means the line feeds the component. Valid points are
    /// `1..=count`, plus `count + 1` on a controllable physical component.
    pub fn connect_signal(
        &mut self,
        component: ItemId,
        line: ItemId,
        cp: u32,
        direction: SignalDirection,
    ) -> ModelResult<()> {
        let (body, name) = self.component_body(component)?;
        let line_item = self.item(line)?;
        let line_name = line_item.qualified_name();
        let signal = line_item
            .signal_line()
            .ok_or_else(|| ModelError::InvalidConnection {
                item: name.clone(),
                what: format!("'{line_name}' is not a signal line"),
            })?;

        let max = body.max_signal_point();
        if cp == 0 || cp > max {
            return Err(ModelError::invalid(
                &name,
                format!("signal connect point {cp} outside 1..={max}"),
            ));
        }
        if let Some(channel) = body.channel_type(cp, direction)
            && !channel.accepts(signal.signal_type, direction)
        {
            return Err(ModelError::InvalidConnection {
                item: name,
                what: format!(
                    "channel {cp} is {channel:?}, '{line_name}' carries {:?}",
                    signal.signal_type
                ),
            });
        }
        if body
            .signals(direction)
            .get(&cp)
            .is_some_and(|ids| ids.contains(&line))
        {
            return Err(ModelError::InvalidConnection {
                item: name,
                what: format!("'{line_name}' is already attached at {cp}"),
            });
        }
        // one component may take the line at several points; the end keeps the first
        let primary = signal.end(direction);
        if let Some(end) = primary
            && end.component != component
        {
            let other = self.item(end.component)?.qualified_name();
            return Err(ModelError::InvalidConnection {
                item: line_name,
                what: format!("{direction:?} end already attached to '{other}'"),
            });
        }

        if let Some(b) = self.item_mut(component)?.component_mut() {
            b.signals_mut(direction).entry(cp).or_default().push(line);
        }
        self.mark(component);
        if primary.is_none()
            && let Some(s) = self.item_mut(line)?.signal_line_mut()
        {
            *s.end_mut(direction) = Some(SignalEnd {
                component,
                channel: cp,
            });
        }
        self.mark(line);
        Ok(())
    }

    /// Node attached at `cp`; `InvalidArgument` past the connect point
    /// count, `NotConnected` when the point is empty.
    pub fn connected_node(&self, component: ItemId, cp: u32) -> ModelResult<ItemId> {
        let (body, name) = self.component_body(component)?;
        Self::check_node_point(body, &name, cp)?;
        body.nodes
            .get(&cp)
            .copied()
            .ok_or_else(|| ModelError::NotConnected {
                item: name,
                what: format!("connect point {cp}"),
            })
    }

    /// Quiet variant of [`Network::connected_node`].
    pub fn node_at(&self, component: ItemId, cp: u32) -> Option<ItemId> {
        self.get(component)?.component()?.nodes.get(&cp).copied()
    }

    /// Connect point of `component` at which `other` is attached.
    pub fn connect_point(&self, component: ItemId, other: ItemId) -> ModelResult<u32> {
        let (body, name) = self.component_body(component)?;
        body.point_of(other).ok_or_else(|| ModelError::NotConnected {
            item: name,
            what: format!("item {other}"),
        })
    }

    pub fn disconnect_node(&mut self, component: ItemId, cp: u32) -> ModelResult<ItemId> {
        let (body, name) = self.component_body(component)?;
        Self::check_node_point(body, &name, cp)?;
        let Some(node) = body.nodes.get(&cp).copied() else {
            return Err(ModelError::NotConnected {
                item: name,
                what: format!("connect point {cp}"),
            });
        };
        let mut still_attached = false;
        if let Some(b) = self.item_mut(component)?.component_mut() {
            b.nodes.remove(&cp);
            still_attached = b.nodes.values().any(|n| *n == node);
        }
        self.mark(component);
        if !still_attached
            && let Some(n) = self.get_mut(node).and_then(|i| i.node_mut())
        {
            n.detach(component);
        }
        self.mark(node);
        Ok(node)
    }

    /// Detach `line` from `component` wherever it is attached.
    pub fn disconnect_signal(&mut self, component: ItemId, line: ItemId) -> ModelResult<()> {
        let (_, name) = self.component_body(component)?;
        let mut removed = Vec::new();
        if let Some(b) = self.item_mut(component)?.component_mut() {
            for direction in [SignalDirection::Input, SignalDirection::Output] {
                let map = b.signals_mut(direction);
                for ids in map.values_mut() {
                    let before = ids.len();
                    ids.retain(|id| *id != line);
                    if ids.len() != before {
                        removed.push(direction);
                    }
                }
                map.retain(|_, ids| !ids.is_empty());
            }
        }
        if removed.is_empty() {
            return Err(ModelError::NotConnected {
                item: name,
                what: format!("signal line {line}"),
            });
        }
        self.mark(component);
        if let Some(s) = self.get_mut(line).and_then(|i| i.signal_line_mut()) {
            for direction in removed {
                let end = s.end_mut(direction);
                if end.is_some_and(|e| e.component == component) {
                    *end = None;
                }
            }
        }
        self.mark(line);
        Ok(())
    }

    /// Remove every connection `id` takes part in. Returns how many were removed.
    pub fn disconnect_all(&mut self, id: ItemId) -> ModelResult<usize> {
        let item = self.item(id)?;
        let mut count = 0;
        if let Some(body) = item.component() {
            let points: Vec<u32> = body.nodes.keys().copied().collect();
            let lines: Vec<ItemId> = body
                .signals_in
                .values()
                .chain(body.signals_out.values())
                .flatten()
                .copied()
                .collect();
            for cp in points {
                self.disconnect_node(id, cp)?;
                count += 1;
            }
            let mut seen = Vec::new();
            for line in lines {
                if !seen.contains(&line) {
                    self.disconnect_signal(id, line)?;
                    seen.push(line);
                    count += 1;
                }
            }
        } else if let Some(node) = item.node() {
            for component in node.connected_components.clone() {
                let points: Vec<u32> = self
                    .get(component)
                    .and_then(|c| c.component())
                    .map(|b| {
                        b.nodes
                            .iter()
                            .filter(|(_, n)| **n == id)
                            .map(|(cp, _)| *cp)
                            .collect()
                    })
                    .unwrap_or_default();
                for cp in points {
                    self.disconnect_node(component, cp)?;
                    count += 1;
                }
            }
        } else if let Some(signal) = item.signal_line() {
            let ends: Vec<ItemId> = [signal.input_end, signal.output_end]
                .into_iter()
                .flatten()
                .map(|e| e.component)
                .collect();
            for component in ends {
                // a line looping back to one component is removed in one pass
                if self.connect_point(component, id).is_ok() {
                    self.disconnect_signal(component, id)?;
                    count += 1;
                }
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net() -> (Network, ItemId, ItemId, ItemId) {
        let mut net = Network::with_builtin().unwrap();
        let pipe = net.add_component("Pipe", "P1").unwrap();
        let n1 = net.add_node("Junction", "N1").unwrap();
        let n2 = net.add_node("Junction", "N2").unwrap();
        net.clear_modified();
        (net, pipe, n1, n2)
    }

    #[test]
    fn connect_then_query() {
        let (mut net, pipe, n1, _) = net();
        net.connect_node(pipe, n1, 1).unwrap();
        assert_eq!(net.connected_node(pipe, 1).unwrap(), n1);
        assert_eq!(net.connect_point(pipe, n1).unwrap(), 1);
        assert!(net.item(pipe).unwrap().is_modified());
        assert!(net.item(n1).unwrap().is_modified());
        assert_eq!(net.item(n1).unwrap().node().unwrap().connected_components, vec![pipe]);
    }

    #[test]
    fn point_out_of_range() {
        let (mut net, pipe, n1, _) = net();
        assert!(matches!(
            net.connect_node(pipe, n1, 3),
            Err(ModelError::InvalidArgument { .. })
        ));
        assert!(matches!(
            net.connected_node(pipe, 3),
            Err(ModelError::InvalidArgument { .. })
        ));
        assert!(matches!(
            net.connected_node(pipe, 2),
            Err(ModelError::NotConnected { .. })
        ));
    }

    #[test]
    fn replacing_a_node_detaches_the_old_one() {
        let (mut net, pipe, n1, n2) = net();
        net.connect_node(pipe, n1, 1).unwrap();
        net.connect_node(pipe, n2, 1).unwrap();
        assert!(net.item(n1).unwrap().node().unwrap().connected_components.is_empty());
        assert_eq!(net.node_at(pipe, 1), Some(n2));
    }

    #[test]
    fn node_kept_when_attached_twice() {
        let (mut net, pipe, n1, n2) = net();
        net.connect_node(pipe, n1, 1).unwrap();
        net.connect_node(pipe, n1, 2).unwrap();
        net.connect_node(pipe, n2, 2).unwrap();
        let comps = &net.item(n1).unwrap().node().unwrap().connected_components;
        assert_eq!(comps, &vec![pipe]);
    }

    #[test]
    fn control_block_cannot_take_node() {
        let (mut net, _, n1, _) = net();
        let gain = net.add_component("Gain", "G1").unwrap();
        assert!(matches!(
            net.connect_node(gain, n1, 1),
            Err(ModelError::InvalidConnection { .. })
        ));
        let sensor = net.add_component("Sensor", "S1").unwrap();
        net.connect_node(sensor, n1, 1).unwrap();
    }

    #[test]
    fn disconnect_unconnected_point() {
        let (mut net, pipe, _, _) = net();
        assert!(matches!(
            net.disconnect_node(pipe, 1),
            Err(ModelError::NotConnected { .. })
        ));
    }

    #[test]
    fn control_point_signal() {
        let (mut net, _, _, _) = net();
        let valve = net.add_component("Valve", "V1").unwrap();
        let gain = net.add_component("Gain", "G1").unwrap();
        let sig = net.add_signal_line("Signal", "S1").unwrap();
        let dsig = net.add_signal_line("Digital Signal", "D1").unwrap();

        net.connect_signal(gain, sig, 1, SignalDirection::Output).unwrap();
        net.connect_signal(valve, sig, 3, SignalDirection::Input).unwrap();
        let line = net.item(sig).unwrap().signal_line().unwrap();
        assert_eq!(line.output_end.unwrap().component, gain);
        assert_eq!(line.input_end.unwrap().channel, 3);

        assert!(matches!(
            net.connect_signal(valve, dsig, 3, SignalDirection::Input),
            Err(ModelError::InvalidConnection { .. })
        ));
        assert!(matches!(
            net.connect_signal(valve, dsig, 4, SignalDirection::Input),
            Err(ModelError::InvalidArgument { .. })
        ));
        // wildcard input channel takes any signal type
        net.connect_signal(gain, dsig, 1, SignalDirection::Input).unwrap();
    }

    #[test]
    fn duplicate_signal_rejected() {
        let (mut net, _, _, _) = net();
        let gain = net.add_component("Gain", "G1").unwrap();
        let sig = net.add_signal_line("Signal", "S1").unwrap();
        net.connect_signal(gain, sig, 1, SignalDirection::Input).unwrap();
        assert!(matches!(
            net.connect_signal(gain, sig, 1, SignalDirection::Input),
            Err(ModelError::InvalidConnection { .. })
        ));
    }

    #[test]
    fn line_may_repeat_across_points() {
        let (mut net, _, _, _) = net();
        let pic = net.add_component("PI Controller", "C1").unwrap();
        let gain = net.add_component("Gain", "G1").unwrap();
        let sig = net.add_signal_line("Signal", "S1").unwrap();
        net.connect_signal(pic, sig, 1, SignalDirection::Input).unwrap();
        net.connect_signal(pic, sig, 2, SignalDirection::Input).unwrap();

        let body = net.item(pic).unwrap().component().unwrap();
        assert_eq!(body.signals_in[&1], vec![sig]);
        assert_eq!(body.signals_in[&2], vec![sig]);
        let end = net.item(sig).unwrap().signal_line().unwrap().input_end.unwrap();
        assert_eq!((end.component, end.channel), (pic, 1));

        // the input end belongs to the controller now
        assert!(matches!(
            net.connect_signal(gain, sig, 1, SignalDirection::Input),
            Err(ModelError::InvalidConnection { .. })
        ));
        assert!(matches!(
            net.connect_signal(pic, sig, 2, SignalDirection::Input),
            Err(ModelError::InvalidConnection { .. })
        ));

        assert_eq!(net.disconnect_all(sig).unwrap(), 1);
        assert!(net.item(pic).unwrap().component().unwrap().signals_in.is_empty());
        assert!(net.item(sig).unwrap().signal_line().unwrap().input_end.is_none());
    }

    #[test]
    fn remove_requires_disconnect() {
        let (mut net, pipe, n1, n2) = net();
        net.connect_node(pipe, n1, 1).unwrap();
        net.connect_node(pipe, n2, 2).unwrap();
        assert!(matches!(
            net.remove_item(n1),
            Err(ModelError::StillConnected { count: 1, .. })
        ));
        assert_eq!(net.disconnect_all(pipe).unwrap(), 2);
        net.remove_item(n1).unwrap();
        net.remove_item(pipe).unwrap();
    }

    #[test]
    fn disconnect_signal_clears_line_end() {
        let (mut net, _, _, _) = net();
        let gain = net.add_component("Gain", "G1").unwrap();
        let sig = net.add_signal_line("Signal", "S1").unwrap();
        net.connect_signal(gain, sig, 1, SignalDirection::Output).unwrap();
        net.disconnect_signal(gain, sig).unwrap();
        assert!(net.item(sig).unwrap().signal_line().unwrap().output_end.is_none());
        assert!(matches!(
            net.disconnect_signal(gain, sig),
            Err(ModelError::NotConnected { .. })
        ));
    }
}
