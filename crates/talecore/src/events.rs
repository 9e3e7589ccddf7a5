use crate::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use uuid::Uuid;

/// Identifies one dialogue session, minted per `start_dialogue`
pub type SessionId = Uuid;

/// Events emitted while a dialogue session runs.
///
/// Emission is synchronous: every event is on the bus, in execution order,
/// before the engine call that produced it returns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum DialogueEvent {
    /// A line of dialogue was produced; the session is suspended until the
    /// host sends input back.
    Output {
        session_id: SessionId,
        text: String,
        speaker: String,
        parameters: Vec<Value>,
        timestamp: DateTime<Utc>,
    },

    /// Focus was lost with no further connection; the session is over
    Ended {
        session_id: SessionId,
        timestamp: DateTime<Utc>,
    },

    /// Fired immediately before a variable node's value changes, carrying
    /// the value about to be committed.
    VariableChanging {
        session_id: SessionId,
        node: usize,
        name: String,
        new_value: Value,
        timestamp: DateTime<Utc>,
    },

    /// The engine's document reference was swapped
    DocumentChanged { timestamp: DateTime<Utc> },
}

/// Fan-out event bus the host polls after each engine call.
///
/// Each subscriber gets its own channel; senders whose receiver was dropped
/// are pruned on the next emit.
pub struct EventBus {
    senders: Mutex<Vec<Sender<DialogueEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> Receiver<DialogueEvent> {
        let (sender, receiver) = mpsc::channel();
        self.lock_senders().push(sender);
        receiver
    }

    pub fn emit(&self, event: DialogueEvent) {
        self.lock_senders()
            .retain(|sender| sender.send(event.clone()).is_ok());
    }

    fn lock_senders(&self) -> std::sync::MutexGuard<'_, Vec<Sender<DialogueEvent>>> {
        // A poisoned lock only means another subscriber panicked mid-push;
        // the sender list itself is still usable.
        self.senders.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// One legal input choice while a node holds focus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputOption {
    pub text: String,
    pub parameters: Vec<Value>,
}

impl InputOption {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameters(text: impl Into<String>, parameters: Vec<Value>) -> Self {
        Self {
            text: text.into(),
            parameters,
        }
    }

    /// Builds one parameterless option per text
    pub fn from_texts<I, S>(texts: I) -> Vec<InputOption>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        texts.into_iter().map(InputOption::new).collect()
    }
}
