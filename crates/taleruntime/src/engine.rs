use crate::nodes::{Flow, NodeInstance};
use crate::variables::VariableRegistry;
use chrono::Utc;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use talecore::{
    node_types, DialogueEvent, DialogueHost, EventBus, GraphDocument, InputOption, NodeError,
    NullHost, SessionId, Value,
};

/// One entry of the instance cache. `Busy` marks an instance that is
/// currently executing or mid-instantiation; lookups that hit it observe
/// "no instance" instead of aliasing the running node.
enum Slot {
    Empty,
    Busy,
    Ready(NodeInstance),
}

/// Single-focus dialogue state machine.
///
/// Owns a [`GraphDocument`], lazily builds and caches one [`NodeInstance`]
/// per node index, and drives the start/input/output protocol. The engine is
/// either Idle (no focused node) or Active (exactly one focused node); all
/// traversal happens synchronously inside `start_dialogue` and `send_input`,
/// and every event is on the bus before those calls return.
///
/// The document is read-only here: the engine never mutates it, and swapping
/// it (even mid-session) resets the engine to Idle with a fresh cache.
pub struct DialogueEngine {
    document: Option<GraphDocument>,
    host: Arc<dyn DialogueHost>,
    variables: VariableRegistry,
    events: EventBus,
    instances: Vec<Slot>,
    focused: Option<usize>,
    session_id: SessionId,
}

impl DialogueEngine {
    /// Engine with no host capabilities and the built-in variable kinds
    pub fn new() -> Self {
        Self::with_parts(Arc::new(NullHost), VariableRegistry::builtin())
    }

    pub fn with_host(host: Arc<dyn DialogueHost>) -> Self {
        Self::with_parts(host, VariableRegistry::builtin())
    }

    pub fn with_parts(host: Arc<dyn DialogueHost>, variables: VariableRegistry) -> Self {
        Self {
            document: None,
            host,
            variables,
            events: EventBus::new(),
            instances: Vec::new(),
            focused: None,
            session_id: SessionId::new_v4(),
        }
    }

    pub fn document(&self) -> Option<&GraphDocument> {
        self.document.as_ref()
    }

    /// Swaps the document reference. An active session ends (the ended event
    /// fires), the instance cache is invalidated and resized, and a
    /// document-changed event is emitted.
    pub fn set_document(&mut self, document: Option<GraphDocument>) {
        if self.is_active() {
            self.end_dialogue();
        }

        let count = document.as_ref().map_or(0, GraphDocument::node_count);
        self.document = document;
        self.instances.clear();
        self.instances.resize_with(count, || Slot::Empty);

        self.events.emit(DialogueEvent::DocumentChanged {
            timestamp: Utc::now(),
        });
    }

    /// Whether a session is active (some node holds focus)
    pub fn is_active(&self) -> bool {
        self.focused.is_some()
    }

    /// Index of the focused node, if any
    pub fn focused(&self) -> Option<usize> {
        self.focused
    }

    pub fn host(&self) -> &Arc<dyn DialogueHost> {
        &self.host
    }

    pub fn variables(&self) -> &VariableRegistry {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut VariableRegistry {
        &mut self.variables
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribes a receiver to the engine's event bus
    pub fn subscribe(&self) -> Receiver<DialogueEvent> {
        self.events.subscribe()
    }

    /// Starts a session at the first start-type node in the document.
    /// Without a document or a start node the session ends immediately and
    /// only the ended event fires. Calling this while a session is active is
    /// unsupported; it re-focuses without ending the previous session.
    pub fn start_dialogue(&mut self) {
        self.session_id = SessionId::new_v4();

        let Some(document) = &self.document else {
            self.end_dialogue();
            return;
        };

        let start = (0..document.node_count()).find(|&index| {
            document
                .node_type(index)
                .map_or(false, |token| token == node_types::START)
        });

        let Some(index) = start else {
            tracing::info!(session = %self.session_id, "No start node, session ends immediately");
            self.end_dialogue();
            return;
        };

        if !self.ensure_instance(index) {
            self.end_dialogue();
            return;
        }

        tracing::info!(session = %self.session_id, node = index, "Dialogue started");
        self.focused = Some(index);

        let Some(instance) = self.take_instance(index) else {
            self.end_dialogue();
            return;
        };
        let flow = match &instance {
            NodeInstance::Start(start_node) => start_node.start(),
            _ => Flow::Wait,
        };
        self.put_instance(index, instance);
        self.apply_flow(index, flow);
    }

    /// Clears focus and fires the ended event. Usable by the host as a
    /// cancellation primitive at any time.
    pub fn end_dialogue(&mut self) {
        if self.focused.take().is_some() {
            tracing::info!(session = %self.session_id, "Dialogue ended");
        }

        self.events.emit(DialogueEvent::Ended {
            session_id: self.session_id,
            timestamp: Utc::now(),
        });
    }

    /// Delivers dialogue input to the focused node. A no-op while Idle.
    pub fn send_input(&mut self, input: &str, parameters: &[Value]) {
        let Some(index) = self.focused else { return };
        let Some(mut instance) = self.take_instance(index) else {
            return;
        };

        let flow = instance.receive_dialogue_input(input, parameters);
        self.put_instance(index, instance);
        self.apply_flow(index, flow);
    }

    /// The focused node's legal input choices; empty while Idle
    pub fn input_options(&self) -> Vec<InputOption> {
        match self.focused.and_then(|index| self.instances.get(index)) {
            Some(Slot::Ready(instance)) => instance.input_options(),
            _ => Vec::new(),
        }
    }

    /// Instantiates and returns every node whose `(type token, payload)`
    /// pair matches the predicate. The predicate sees save data rather than
    /// instances so that non-matching nodes are never instantiated.
    pub fn find_instances(
        &mut self,
        mut predicate: impl FnMut(&str, &[Value]) -> bool,
    ) -> Vec<usize> {
        let count = self.document.as_ref().map_or(0, GraphDocument::node_count);
        let mut found = Vec::new();

        for index in 0..count {
            let matched = {
                let Some(document) = self.document.as_ref() else {
                    break;
                };
                let Ok(token) = document.node_type(index) else {
                    continue;
                };
                let payload = document.node_payload(index).unwrap_or(&[]);
                predicate(token, payload)
            };

            if matched && self.ensure_instance(index) {
                found.push(index);
            }
        }

        found
    }

    /// Current value of the variable node at `index`; `None` when the index
    /// does not hold a variable node.
    pub fn variable_value(&mut self, index: usize) -> Option<Value> {
        if !self.ensure_instance(index) {
            return None;
        }

        match self.instances.get(index) {
            Some(Slot::Ready(NodeInstance::Variable(variable))) => Some(variable.value().clone()),
            _ => None,
        }
    }

    /// Assigns a variable node's value, emitting the value-changing event
    /// immediately before the new value is committed.
    pub fn set_variable_value(&mut self, index: usize, value: Value) -> bool {
        if !self.ensure_instance(index) {
            return false;
        }

        let name = match self.instances.get(index) {
            Some(Slot::Ready(NodeInstance::Variable(variable))) => variable.name().to_string(),
            _ => return false,
        };

        self.events.emit(DialogueEvent::VariableChanging {
            session_id: self.session_id,
            node: index,
            name,
            new_value: value.clone(),
            timestamp: Utc::now(),
        });

        match self.instances.get_mut(index) {
            Some(Slot::Ready(NodeInstance::Variable(variable))) => {
                variable.set_value(value);
                true
            }
            _ => false,
        }
    }

    /// Kind token and definition of the variable node at `index`
    pub(crate) fn variable_parts(&mut self, index: usize) -> Option<(String, Value)> {
        if !self.ensure_instance(index) {
            return None;
        }

        match self.instances.get(index) {
            Some(Slot::Ready(NodeInstance::Variable(variable))) => {
                Some((variable.kind().to_string(), variable.definition().clone()))
            }
            _ => None,
        }
    }

    /// Whether `index` resolves to a function node instance
    pub(crate) fn has_function_instance(&mut self, index: usize) -> bool {
        if !self.ensure_instance(index) {
            return false;
        }

        match self.instances.get(index) {
            Some(Slot::Ready(NodeInstance::Function(function))) => {
                tracing::debug!(node = index, name = function.name(), "Calling function node");
                true
            }
            _ => false,
        }
    }

    /// Emits the dialogue-output event for the current session
    pub(crate) fn emit_output(&self, text: &str, speaker: &str, parameters: &[Value]) {
        tracing::debug!(session = %self.session_id, speaker, "Dialogue output");

        self.events.emit(DialogueEvent::Output {
            session_id: self.session_id,
            text: text.to_string(),
            speaker: speaker.to_string(),
            parameters: parameters.to_vec(),
            timestamp: Utc::now(),
        });
    }

    fn apply_flow(&mut self, from: usize, flow: Flow) {
        match flow {
            Flow::Wait => {}
            Flow::End => self.end_dialogue(),
            Flow::Route(port) => self.route_port_output(from, port),
            Flow::RouteFrom(node) => self.route_port_output(node, 0),
        }
    }

    /// Follows the connection leaving `(from_node, from_port)` and keeps
    /// routing until a node suspends or the chain ends. Iterative rather
    /// than re-entrant, but observably identical to an unbroken synchronous
    /// call stack: non-suspending chains resolve inside one engine call.
    fn route_port_output(&mut self, mut from_node: usize, mut from_port: u32) {
        loop {
            let connection = self
                .document
                .as_ref()
                .and_then(|document| document.connection_from(from_node as u32, from_port));

            let Some(connection) = connection else {
                self.end_dialogue();
                return;
            };

            let target = connection.to_node as usize;

            if !self.ensure_instance(target) {
                self.end_dialogue();
                return;
            }

            self.focused = Some(target);
            tracing::debug!(
                from = from_node,
                port = from_port,
                to = target,
                "Routing port output"
            );

            let Some(mut instance) = self.take_instance(target) else {
                self.end_dialogue();
                return;
            };
            let flow = instance.receive_port_input(connection.to_port, self);
            self.put_instance(target, instance);

            match flow {
                Flow::Wait => return,
                Flow::End => {
                    self.end_dialogue();
                    return;
                }
                Flow::Route(port) => {
                    from_node = target;
                    from_port = port;
                }
                Flow::RouteFrom(node) => {
                    from_node = node;
                    from_port = 0;
                }
            }
        }
    }

    /// Returns whether the node at `index` has a usable cached instance,
    /// building one on first access. Out-of-range indices, unknown type
    /// tokens and busy slots all read as plain absence.
    fn ensure_instance(&mut self, index: usize) -> bool {
        let Some(count) = self.document.as_ref().map(GraphDocument::node_count) else {
            return false;
        };

        if index >= count {
            return false;
        }

        match self.instances.get(index) {
            Some(Slot::Ready(_)) => true,
            Some(Slot::Busy) => false,
            Some(Slot::Empty) => self.instantiate(index),
            None => false,
        }
    }

    fn instantiate(&mut self, index: usize) -> bool {
        let Some(document) = self.document.as_ref() else {
            return false;
        };

        let token = match document.node_type(index) {
            Ok(token) => token.to_string(),
            Err(error) => {
                tracing::warn!(node = index, %error, "Node type unreadable");
                return false;
            }
        };
        let payload = document
            .node_payload(index)
            .map(<[Value]>::to_vec)
            .unwrap_or_default();

        // Mark the slot before `ready` runs so that self-referential lookups
        // during instantiation observe absence instead of recursing.
        self.instances[index] = Slot::Busy;

        match NodeInstance::build(&token, &payload, self) {
            Ok(instance) => {
                self.instances[index] = Slot::Ready(instance);
                true
            }
            Err(NodeError::UnknownNodeType(unknown)) => {
                tracing::warn!(node = index, token = %unknown, "Unknown node type");
                self.instances[index] = Slot::Empty;
                false
            }
            Err(error) => {
                tracing::warn!(node = index, token = %token, %error, "Payload did not decode, node is inert");
                self.instances[index] = Slot::Ready(NodeInstance::Inert);
                true
            }
        }
    }

    fn take_instance(&mut self, index: usize) -> Option<NodeInstance> {
        let slot = self.instances.get_mut(index)?;

        match std::mem::replace(slot, Slot::Busy) {
            Slot::Ready(instance) => Some(instance),
            other => {
                *slot = other;
                None
            }
        }
    }

    fn put_instance(&mut self, index: usize, instance: NodeInstance) {
        if let Some(slot) = self.instances.get_mut(index) {
            *slot = Slot::Ready(instance);
        }
    }
}

impl Default for DialogueEngine {
    fn default() -> Self {
        Self::new()
    }
}
