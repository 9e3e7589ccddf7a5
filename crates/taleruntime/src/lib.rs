//! Execution engine for dialogue tree documents
//!
//! Interprets a `talecore::GraphDocument` as a single-focus interactive
//! state machine: node behavior objects are built lazily per index, exactly
//! one node holds focus while a session is active, and traversal through
//! non-suspending nodes resolves synchronously inside each engine call.

mod engine;
mod nodes;
mod variables;

pub use engine::DialogueEngine;
pub use variables::{
    EnumKind, VariableCondition, VariableKind, VariableRegistry, VariableSetter, ENUM_KIND,
};
