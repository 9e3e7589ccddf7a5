use super::{Flow, Payload};
use crate::engine::DialogueEngine;
use talecore::{NodeError, Value};

/// Jumps to the function node at the stored index by firing that node's
/// port 0. A missing or wrong-kind target ends the dialogue.
pub struct CallInstance {
    function: Option<usize>,
}

impl CallInstance {
    pub(crate) fn ready(payload: &[Value]) -> Result<Self, NodeError> {
        let payload = Payload::new(payload);

        Ok(Self {
            function: payload.index_at(0)?,
        })
    }

    pub(crate) fn receive_port_input(&mut self, engine: &mut DialogueEngine) -> Flow {
        match self.function {
            Some(index) if engine.has_function_instance(index) => Flow::RouteFrom(index),
            _ => Flow::End,
        }
    }
}

/// Addressable anchor other nodes jump to. Carries its editor-assigned name
/// but has no behavior of its own.
pub struct FunctionInstance {
    name: String,
}

impl FunctionInstance {
    pub(crate) fn ready(payload: &[Value]) -> Self {
        let name = payload
            .first()
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Self { name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
