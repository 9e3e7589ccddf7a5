//! Runtime node behavior, one variant per built-in node kind.
//!
//! Node behavior never routes directly; it returns a [`Flow`] directive the
//! engine applies. That encodes the traversal contract in the type: one
//! activation produces exactly zero or one port output.

mod action;
mod call;
mod output;
mod start;
mod switch;
mod variable;

pub(crate) use action::{ActionInstance, ConditionInstance};
pub(crate) use call::{CallInstance, FunctionInstance};
pub(crate) use output::OutputInstance;
pub(crate) use start::StartInstance;
pub(crate) use switch::SwitchInstance;
pub(crate) use variable::{VariableConditionInstance, VariableInstance, VariableSetterInstance};

use crate::engine::DialogueEngine;
use talecore::{node_types, InputOption, NodeError, Value};

/// What a node activation asks the engine to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Stay focused and wait for dialogue input
    Wait,
    /// Send output on one of this node's ports
    Route(u32),
    /// Send output on port 0 of another node (the call indirection)
    RouteFrom(usize),
    /// End the session
    End,
}

/// Runtime behavior object bound to one graph node index.
///
/// Built lazily from the node's payload; a payload that does not decode
/// leaves the node `Inert` (every operation a no-op), matching the base
/// behavior of a node kind with no overrides.
pub(crate) enum NodeInstance {
    Start(StartInstance),
    Output(OutputInstance),
    Switch(SwitchInstance),
    Action(ActionInstance),
    Condition(ConditionInstance),
    Call(CallInstance),
    Function(FunctionInstance),
    Variable(VariableInstance),
    VariableSetter(VariableSetterInstance),
    VariableCondition(VariableConditionInstance),
    Inert,
}

impl NodeInstance {
    /// Builds the instance for a node, decoding its payload through the
    /// variant selected by `token`.
    pub(crate) fn build(
        token: &str,
        payload: &[Value],
        engine: &mut DialogueEngine,
    ) -> Result<NodeInstance, NodeError> {
        match token {
            node_types::START => Ok(NodeInstance::Start(StartInstance)),
            node_types::OUTPUT => OutputInstance::ready(payload).map(NodeInstance::Output),
            node_types::SWITCH => SwitchInstance::ready(payload).map(NodeInstance::Switch),
            node_types::ACTION => {
                ActionInstance::ready(payload, engine).map(NodeInstance::Action)
            }
            node_types::CONDITION => {
                ConditionInstance::ready(payload, engine).map(NodeInstance::Condition)
            }
            node_types::CALL => CallInstance::ready(payload).map(NodeInstance::Call),
            node_types::FUNCTION => Ok(NodeInstance::Function(FunctionInstance::ready(payload))),
            node_types::VARIABLE => VariableInstance::ready(payload).map(NodeInstance::Variable),
            node_types::VARIABLE_SET => {
                VariableSetterInstance::ready(payload, engine).map(NodeInstance::VariableSetter)
            }
            node_types::VARIABLE_CHECK => VariableConditionInstance::ready(payload, engine)
                .map(NodeInstance::VariableCondition),
            _ => Err(NodeError::UnknownNodeType(token.to_string())),
        }
    }

    /// Another node routed execution into one of this node's input ports
    pub(crate) fn receive_port_input(&mut self, port: u32, engine: &mut DialogueEngine) -> Flow {
        match self {
            NodeInstance::Output(node) => node.receive_port_input(port, engine),
            NodeInstance::Action(node) => node.receive_port_input(),
            NodeInstance::Condition(node) => node.receive_port_input(),
            NodeInstance::Call(node) => node.receive_port_input(engine),
            NodeInstance::VariableSetter(node) => node.receive_port_input(engine),
            NodeInstance::VariableCondition(node) => node.receive_port_input(engine),
            // Start, Function, Switch and Variable nodes have no port-input
            // behavior; being routed into leaves the session waiting.
            _ => Flow::Wait,
        }
    }

    /// The host delivered dialogue input while this node holds focus
    pub(crate) fn receive_dialogue_input(
        &mut self,
        input: &str,
        _parameters: &[Value],
    ) -> Flow {
        match self {
            NodeInstance::Output(node) => node.receive_dialogue_input(),
            NodeInstance::Switch(node) => node.receive_dialogue_input(input),
            _ => Flow::Wait,
        }
    }

    /// Legal input choices while this node holds focus
    pub(crate) fn input_options(&self) -> Vec<InputOption> {
        match self {
            NodeInstance::Output(node) => node.input_options(),
            NodeInstance::Switch(node) => node.input_options(),
            _ => Vec::new(),
        }
    }
}

/// Positional decode helper over a node's payload value-list
pub(crate) struct Payload<'a>(&'a [Value]);

impl<'a> Payload<'a> {
    pub fn new(values: &'a [Value]) -> Self {
        Self(values)
    }

    pub fn value_at(&self, index: usize) -> Result<&'a Value, NodeError> {
        self.0.get(index).ok_or(NodeError::MissingPayload { index })
    }

    pub fn str_at(&self, index: usize) -> Result<&'a str, NodeError> {
        let value = self.value_at(index)?;
        value.as_str().ok_or_else(|| NodeError::InvalidPayloadType {
            index,
            expected: "string",
            actual: value.type_name().to_string(),
        })
    }

    /// Decodes a node reference: a number, where negatives mean "none"
    pub fn index_at(&self, index: usize) -> Result<Option<usize>, NodeError> {
        let value = self.value_at(index)?;
        if value.as_f64().is_none() {
            return Err(NodeError::InvalidPayloadType {
                index,
                expected: "number",
                actual: value.type_name().to_string(),
            });
        }
        Ok(value.as_index())
    }

    pub fn array_at(&self, index: usize) -> Result<&'a [Value], NodeError> {
        let value = self.value_at(index)?;
        value
            .as_array()
            .ok_or_else(|| NodeError::InvalidPayloadType {
                index,
                expected: "array",
                actual: value.type_name().to_string(),
            })
    }

    /// Decodes an array of strings at `index`
    pub fn str_list_at(&self, index: usize) -> Result<Vec<String>, NodeError> {
        self.array_at(index)?
            .iter()
            .map(|value| {
                value
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| NodeError::InvalidPayloadType {
                        index,
                        expected: "array of strings",
                        actual: value.type_name().to_string(),
                    })
            })
            .collect()
    }
}
