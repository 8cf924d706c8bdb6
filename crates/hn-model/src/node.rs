use hn_core::ItemId;

/// Property holding a node's elevation above datum.
pub const ELEVATION: &str = "Elevation";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeBody {
    pub node_type: String,
    /// Unique, in attachment order.
    pub connected_components: Vec<ItemId>,
}

impl NodeBody {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            connected_components: Vec::new(),
        }
    }

    /// Record `component`; returns false if it was already attached.
    pub fn attach(&mut self, component: ItemId) -> bool {
        if self.connected_components.contains(&component) {
            return false;
        }
        self.connected_components.push(component);
        true
    }

    pub fn detach(&mut self, component: ItemId) -> bool {
        let before = self.connected_components.len();
        self.connected_components.retain(|c| *c != component);
        before != self.connected_components.len()
    }
}
