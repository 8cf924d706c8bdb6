//! Network items: identity, annotations and the owned property set.

use std::sync::Arc;

use hn_core::{ItemId, ItemKey};
use tracing::debug;

use crate::component::{ActionTableMode, ComponentBody};
use crate::error::{ModelError, ModelResult};
use crate::node::NodeBody;
use crate::property::Property;
use crate::series::{Extremes, SeriesBuffer};
use crate::signal_line::SignalLineBody;

pub const MAX_NAME_LEN: usize = 128;
pub const MAX_COMMENT_LEN: usize = 50;
/// Limit on the comma-joined keyword list.
pub const MAX_KEYWORDS_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Physical,
    Control,
    Node,
    SignalLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub text: String,
    pub severity: Severity,
    /// Simulation time the message refers to (0 outside a run).
    pub sim_time: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemBody {
    Component(ComponentBody),
    Node(NodeBody),
    SignalLine(SignalLineBody),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    id: ItemId,
    key: ItemKey,
    name: String,
    name_prefix: String,
    type_name: String,
    class_sort_key: i32,
    kind: ItemKind,
    pub position: [f64; 2],
    /// Diagram route points, kept as raw data.
    pub polyline: Vec<[f64; 2]>,
    comment: String,
    keywords: Vec<String>,
    disused: bool,
    modified: bool,
    is_new: bool,
    messages: Vec<Message>,
    properties: Vec<Property>,
    body: ItemBody,
}

impl Item {
    pub(crate) fn new(
        id: ItemId,
        type_name: impl Into<String>,
        name_prefix: impl Into<String>,
        class_sort_key: i32,
        body: ItemBody,
    ) -> Self {
        let kind = match &body {
            ItemBody::Component(c) if c.class.is_physical() => ItemKind::Physical,
            ItemBody::Component(_) => ItemKind::Control,
            ItemBody::Node(_) => ItemKind::Node,
            ItemBody::SignalLine(_) => ItemKind::SignalLine,
        };
        Self {
            id,
            key: ItemKey::UNASSIGNED,
            name: String::new(),
            name_prefix: name_prefix.into(),
            type_name: type_name.into(),
            class_sort_key,
            kind,
            position: [0.0, 0.0],
            polyline: Vec::new(),
            comment: String::new(),
            keywords: Vec::new(),
            disused: false,
            modified: false,
            is_new: false,
            messages: Vec::new(),
            properties: Vec::new(),
            body,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn key(&self) -> ItemKey {
        self.key
    }

    pub(crate) fn set_key(&mut self, key: ItemKey) {
        self.key = key;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_prefix(&self) -> &str {
        &self.name_prefix
    }

    /// `prefix.name`, or the bare name when the type has no prefix.
    pub fn qualified_name(&self) -> String {
        if self.name_prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name_prefix, self.name)
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn class_sort_key(&self) -> i32 {
        self.class_sort_key
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn body(&self) -> &ItemBody {
        &self.body
    }

    pub(crate) fn body_mut(&mut self) -> &mut ItemBody {
        &mut self.body
    }

    pub fn component(&self) -> Option<&ComponentBody> {
        match &self.body {
            ItemBody::Component(c) => Some(c),
            _ => None,
        }
    }

    pub(crate) fn component_mut(&mut self) -> Option<&mut ComponentBody> {
        match &mut self.body {
            ItemBody::Component(c) => Some(c),
            _ => None,
        }
    }

    pub fn node(&self) -> Option<&NodeBody> {
        match &self.body {
            ItemBody::Node(n) => Some(n),
            _ => None,
        }
    }

    pub(crate) fn node_mut(&mut self) -> Option<&mut NodeBody> {
        match &mut self.body {
            ItemBody::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn signal_line(&self) -> Option<&SignalLineBody> {
        match &self.body {
            ItemBody::SignalLine(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn signal_line_mut(&mut self) -> Option<&mut SignalLineBody> {
        match &mut self.body {
            ItemBody::SignalLine(s) => Some(s),
            _ => None,
        }
    }

    fn check_len(&self, field: &'static str, len: usize, max: usize) -> ModelResult<()> {
        if len > max {
            return Err(ModelError::LengthExceeded {
                item: self.qualified_name(),
                field,
                len,
                max,
            });
        }
        Ok(())
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> ModelResult<()> {
        let name = name.into();
        self.check_len("name", name.chars().count(), MAX_NAME_LEN)?;
        self.name = name;
        self.modified = true;
        Ok(())
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) -> ModelResult<()> {
        let comment = comment.into();
        self.check_len("comment", comment.chars().count(), MAX_COMMENT_LEN)?;
        self.comment = comment;
        self.modified = true;
        Ok(())
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Keywords as stored: comma-joined.
    pub fn encoded_keywords(&self) -> String {
        self.keywords.join(",")
    }

    pub fn set_keywords(&mut self, keywords: Vec<String>) -> ModelResult<()> {
        let encoded = keywords.join(",");
        self.check_len("keywords", encoded.chars().count(), MAX_KEYWORDS_LEN)?;
        self.keywords = keywords;
        self.modified = true;
        Ok(())
    }

    pub fn add_keyword(&mut self, keyword: impl Into<String>) -> ModelResult<()> {
        let mut keywords = self.keywords.clone();
        keywords.push(keyword.into());
        self.set_keywords(keywords)
    }

    pub fn is_disused(&self) -> bool {
        self.disused
    }

    pub fn set_disused(&mut self, disused: bool) {
        self.disused = disused;
        self.modified = true;
    }

    /// Switch an optional action table on or off.
    pub fn set_action_table_enabled(&mut self, enabled: bool) -> ModelResult<()> {
        let name = self.qualified_name();
        let Some(c) = self.component_mut() else {
            return Err(ModelError::invalid(&name, "only components carry an action table"));
        };
        if c.action_table == ActionTableMode::Unsupported {
            return Err(ModelError::invalid(&name, "type has no action table"));
        }
        c.action_table_enabled = enabled;
        self.modified = true;
        Ok(())
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub(crate) fn set_new(&mut self, is_new: bool) {
        self.is_new = is_new;
    }

    /// Own fields changed, or any property is marked modified.
    pub fn is_modified(&self) -> bool {
        self.modified || self.properties.iter().any(Property::is_modified)
    }

    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    pub fn clear_modified(&mut self) {
        self.modified = false;
        for p in &mut self.properties {
            p.clear_modified();
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn add_message(&mut self, text: impl Into<String>, severity: Severity, sim_time: f64) {
        self.messages.push(Message {
            text: text.into(),
            severity,
            sim_time,
        });
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> impl Iterator<Item = &mut Property> {
        self.properties.iter_mut()
    }

    pub fn has_property(&self, description: &str) -> bool {
        self.properties.iter().any(|p| p.description() == description)
    }

    pub fn add_property(&mut self, property: Property) -> ModelResult<()> {
        if self.has_property(property.description()) {
            return Err(ModelError::invalid(
                &self.qualified_name(),
                format!("duplicate property '{}'", property.description()),
            ));
        }
        self.properties.push(property);
        Ok(())
    }

    pub fn property(&self, description: &str) -> ModelResult<&Property> {
        self.properties
            .iter()
            .find(|p| p.description() == description)
            .ok_or_else(|| ModelError::not_found(&self.qualified_name(), "property", description))
    }

    pub fn property_mut(&mut self, description: &str) -> ModelResult<&mut Property> {
        let qualified = self.qualified_name();
        self.properties
            .iter_mut()
            .find(|p| p.description() == description)
            .ok_or_else(|| ModelError::not_found(&qualified, "property", description))
    }

    pub fn get_scalar(&self, description: &str) -> ModelResult<f64> {
        self.property(description)?
            .get_scalar()
            .map_err(|e| e.in_item(&self.qualified_name()))
    }

    /// Set a scalar; a value above the advisory maximum is kept and noted
    /// as a warning message.
    pub fn set_scalar(&mut self, description: &str, v: f64) -> ModelResult<()> {
        let qualified = self.qualified_name();
        let property = self.property_mut(description)?;
        property.set_scalar(v).map_err(|e| e.in_item(&qualified))?;
        if property.exceeds_maximum() {
            debug!(item = %qualified, property = description, value = v, "above maximum");
            self.add_message(
                format!("'{description}' value {v} is above the usual maximum"),
                Severity::Warning,
                0.0,
            );
        }
        Ok(())
    }

    pub fn set_scalar_text(&mut self, description: &str, text: &str) -> ModelResult<()> {
        let qualified = self.qualified_name();
        self.property_mut(description)?
            .set_scalar_text(text)
            .map_err(|e| e.in_item(&qualified))
    }

    fn check_in_use(&self, description: &str) -> ModelResult<()> {
        if self.disused {
            return Err(ModelError::DisusedItem {
                item: self.qualified_name(),
                property: description.to_string(),
            });
        }
        Ok(())
    }

    pub fn series(&self, description: &str, element: usize) -> ModelResult<Arc<SeriesBuffer>> {
        self.check_in_use(description)?;
        self.property(description)?
            .series(element)
            .map_err(|e| e.in_item(&self.qualified_name()))
    }

    pub fn extremes(&self, description: &str, element: usize) -> ModelResult<Extremes> {
        self.check_in_use(description)?;
        self.property(description)?
            .extremes(element)
            .map_err(|e| e.in_item(&self.qualified_name()))
    }
}
