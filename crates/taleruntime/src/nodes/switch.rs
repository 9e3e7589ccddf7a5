use super::{Flow, Payload};
use talecore::{InputOption, NodeError, Value};

/// Branches on dialogue input: case-insensitive substring search of each
/// case text against the input, in case order, first match wins. No match
/// routes to the implicit else port at `case_texts.len()`.
///
/// The substring search is deliberate, inherited behavior: case "no" also
/// matches input "snow", and an empty case text matches every input.
pub struct SwitchInstance {
    case_texts: Vec<String>,
}

impl SwitchInstance {
    pub(crate) fn ready(payload: &[Value]) -> Result<Self, NodeError> {
        let payload = Payload::new(payload);

        Ok(Self {
            case_texts: payload.str_list_at(0)?,
        })
    }

    pub(crate) fn receive_dialogue_input(&mut self, input: &str) -> Flow {
        let input = input.to_lowercase();

        for (index, case_text) in self.case_texts.iter().enumerate() {
            if input.contains(&case_text.to_lowercase()) {
                return Flow::Route(index as u32);
            }
        }

        Flow::Route(self.case_texts.len() as u32)
    }

    pub(crate) fn input_options(&self) -> Vec<InputOption> {
        InputOption::from_texts(self.case_texts.iter().cloned())
    }
}
