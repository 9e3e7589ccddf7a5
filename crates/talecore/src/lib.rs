//! Core data model for the dialogue tree engine
//!
//! This crate provides the serialized graph representation, the value and
//! event types, and the host-facing contracts that all other components
//! depend on. It has no runtime behavior of its own.

mod document;
mod error;
mod events;
mod host;
mod settings;
mod value;

pub use document::{node_types, Connection, GraphDocument};
pub use error::{DialogueError, DocumentError, NodeError};
pub use events::{DialogueEvent, EventBus, InputOption, SessionId};
pub use host::{DialogueAction, DialogueCondition, DialogueHost, HostRegistry, NullHost};
pub use settings::{NodeTypeConfig, TreeSettings};
pub use value::Value;

/// Result type for dialogue operations
pub type Result<T> = std::result::Result<T, DialogueError>;
