use super::{Flow, Payload};
use crate::engine::DialogueEngine;
use talecore::{InputOption, NodeError, Value};

/// Emits a line of dialogue and suspends until the host sends input back.
/// Any input continues on port 0; the single declared option is the empty
/// string ("continue").
pub struct OutputInstance {
    text: String,
    speaker: String,
}

impl OutputInstance {
    pub(crate) fn ready(payload: &[Value]) -> Result<Self, NodeError> {
        let payload = Payload::new(payload);

        Ok(Self {
            text: payload.str_at(0)?.to_string(),
            speaker: payload.str_at(1)?.to_string(),
        })
    }

    pub(crate) fn receive_port_input(&mut self, _port: u32, engine: &mut DialogueEngine) -> Flow {
        engine.emit_output(&self.text, &self.speaker, &[]);
        Flow::Wait
    }

    pub(crate) fn receive_dialogue_input(&mut self) -> Flow {
        Flow::Route(0)
    }

    pub(crate) fn input_options(&self) -> Vec<InputOption> {
        vec![InputOption::new("")]
    }
}
