//! hn-model: item, property and table model of a hydraulic network.
//!
//! Provides:
//! - Typed properties (scalar, list, table, series) with spec status
//! - Items, component/node/signal-line bodies and the network arena
//! - Connect/disconnect rules per connect point
//! - Required-input validation following list dependencies
//! - Pipe geometry reconciliation
//!
//! # Example
//!
//! ```
//! use hn_model::Network;
//!
//! let mut net = Network::with_builtin().unwrap();
//! let n1 = net.add_node("Junction", "N1").unwrap();
//! let n2 = net.add_node("Junction", "N2").unwrap();
//! let pipe = net.add_component("Pipe", "P1").unwrap();
//! net.connect_node(pipe, n1, 1).unwrap();
//! net.connect_node(pipe, n2, 2).unwrap();
//!
//! assert_eq!(net.connected_node(pipe, 2).unwrap(), n2);
//! ```

pub mod catalogue;
pub mod component;
mod connect;
pub mod error;
pub mod geometry;
pub mod item;
pub mod network;
pub mod node;
pub mod property;
pub mod series;
pub mod signal_line;
pub mod table;
pub mod template;
pub mod validate;

pub use catalogue::Catalogue;
pub use component::{ActionTableMode, ComponentBody, ComponentClass, SignalDirection, SignalType};
pub use error::{ErrorClass, ModelError, ModelResult};
pub use geometry::GeometryRepr;
pub use item::{Item, ItemBody, ItemKind, Message, Severity};
pub use network::Network;
pub use node::NodeBody;
pub use property::{InputType, Io, ListValue, Property, PropertyValue, ScalarValue};
pub use series::{Extremes, SeriesBuffer};
pub use signal_line::{SignalEnd, SignalLineBody};
pub use table::{ColumnData, ColumnKind, ColumnSpec, Table, TableKind};
pub use template::TemplateReport;
pub use validate::{ConnectivityIssue, ValidationReport, required_properties};
