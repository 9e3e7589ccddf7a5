use super::{Flow, Payload};
use crate::engine::DialogueEngine;
use crate::variables::{VariableCondition, VariableSetter};
use talecore::{NodeError, Value};

/// Holds a named, typed mutable value plus the opaque kind definition its
/// setter and condition companions decode against.
pub struct VariableInstance {
    name: String,
    kind: String,
    value: Value,
    definition: Value,
}

impl VariableInstance {
    pub(crate) fn ready(payload: &[Value]) -> Result<Self, NodeError> {
        let payload = Payload::new(payload);

        Ok(Self {
            name: payload.str_at(0)?.to_string(),
            kind: payload.str_at(1)?.to_string(),
            value: payload.value_at(2)?.clone(),
            definition: payload.value_at(3)?.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn definition(&self) -> &Value {
        &self.definition
    }

    /// Commits a new value. The engine emits the value-changing notification
    /// before calling this.
    pub(crate) fn set_value(&mut self, value: Value) {
        self.value = value;
    }
}

/// Rewrites a variable through its kind's setter behavior, then advances on
/// port 0. An unresolved variable or kind skips the write but still
/// advances.
pub struct VariableSetterInstance {
    variable: Option<usize>,
    setter: Option<Box<dyn VariableSetter>>,
}

impl VariableSetterInstance {
    pub(crate) fn ready(payload: &[Value], engine: &mut DialogueEngine) -> Result<Self, NodeError> {
        let payload = Payload::new(payload);
        let target = payload.index_at(0)?;
        let setter_payload = payload.array_at(1)?.to_vec();

        let (variable, setter) = resolve_behavior(engine, target, |kind, definition| {
            kind.setter(&setter_payload, definition)
        });

        Ok(Self { variable, setter })
    }

    pub(crate) fn receive_port_input(&mut self, engine: &mut DialogueEngine) -> Flow {
        if let (Some(index), Some(setter)) = (self.variable, &self.setter) {
            if let Some(previous) = engine.variable_value(index) {
                let next = setter.apply(&previous);
                engine.set_variable_value(index, next);
            }
        }

        Flow::Route(0)
    }
}

/// Branches on a variable through its kind's condition behavior: true routes
/// port 0, anything unresolved or false routes port 1.
pub struct VariableConditionInstance {
    variable: Option<usize>,
    condition: Option<Box<dyn VariableCondition>>,
}

impl VariableConditionInstance {
    pub(crate) fn ready(payload: &[Value], engine: &mut DialogueEngine) -> Result<Self, NodeError> {
        let payload = Payload::new(payload);
        let target = payload.index_at(0)?;
        let condition_payload = payload.array_at(1)?.to_vec();

        let (variable, condition) = resolve_behavior(engine, target, |kind, definition| {
            kind.condition(&condition_payload, definition)
        });

        Ok(Self {
            variable,
            condition,
        })
    }

    pub(crate) fn receive_port_input(&mut self, engine: &mut DialogueEngine) -> Flow {
        if let (Some(index), Some(condition)) = (self.variable, &self.condition) {
            if let Some(value) = engine.variable_value(index) {
                if condition.evaluate(&value) {
                    return Flow::Route(0);
                }
            }
        }

        Flow::Route(1)
    }
}

/// Resolves the referenced variable node and builds a behavior from its
/// registered kind. Every failure mode (no reference, wrong-kind target,
/// unknown kind token, undecodable sub-payload) yields "no behavior".
fn resolve_behavior<B>(
    engine: &mut DialogueEngine,
    target: Option<usize>,
    build: impl FnOnce(&dyn crate::variables::VariableKind, &Value) -> Option<B>,
) -> (Option<usize>, Option<B>) {
    let Some(index) = target else {
        return (None, None);
    };

    let Some((kind_token, definition)) = engine.variable_parts(index) else {
        tracing::warn!(node = index, "Variable reference is not a variable node");
        return (None, None);
    };

    let Some(kind) = engine.variables().lookup(&kind_token) else {
        tracing::warn!(kind = %kind_token, "No registered behavior for variable kind");
        return (Some(index), None);
    };

    let behavior = build(kind.as_ref(), &definition);
    if behavior.is_none() {
        tracing::warn!(kind = %kind_token, "Variable behavior payload did not decode");
    }

    (Some(index), behavior)
}
