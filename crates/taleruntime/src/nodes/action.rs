use super::{Flow, Payload};
use crate::engine::DialogueEngine;
use std::sync::Arc;
use talecore::{DialogueAction, DialogueCondition, NodeError, Value};

/// Fires a host-resolved action and advances on port 0. A reference that
/// does not resolve skips the invocation but still advances.
pub struct ActionInstance {
    action: Option<Arc<dyn DialogueAction>>,
}

impl ActionInstance {
    pub(crate) fn ready(payload: &[Value], engine: &mut DialogueEngine) -> Result<Self, NodeError> {
        let payload = Payload::new(payload);
        let path = payload.str_at(0)?;

        let action = engine.host().resolve_action(path);
        if action.is_none() {
            tracing::warn!(path, "Dialogue action did not resolve");
        }

        Ok(Self { action })
    }

    pub(crate) fn receive_port_input(&mut self) -> Flow {
        if let Some(action) = &self.action {
            action.invoke(&[]);
        }

        Flow::Route(0)
    }
}

/// Evaluates a host-resolved predicate: true routes port 0, false (or an
/// unresolved reference) routes port 1.
pub struct ConditionInstance {
    condition: Option<Arc<dyn DialogueCondition>>,
}

impl ConditionInstance {
    pub(crate) fn ready(payload: &[Value], engine: &mut DialogueEngine) -> Result<Self, NodeError> {
        let payload = Payload::new(payload);
        let path = payload.str_at(0)?;

        let condition = engine.host().resolve_condition(path);
        if condition.is_none() {
            tracing::warn!(path, "Dialogue condition did not resolve");
        }

        Ok(Self { condition })
    }

    pub(crate) fn receive_port_input(&mut self) -> Flow {
        match &self.condition {
            Some(condition) if condition.invoke(&[]) => Flow::Route(0),
            _ => Flow::Route(1),
        }
    }
}
