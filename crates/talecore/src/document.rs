use crate::{DialogueError, DocumentError, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Type tokens of the built-in node kinds
pub mod node_types {
    pub const START: &str = "dialogue.start";
    pub const OUTPUT: &str = "dialogue.output";
    pub const SWITCH: &str = "dialogue.switch";
    pub const ACTION: &str = "dialogue.action";
    pub const CONDITION: &str = "dialogue.condition";
    pub const CALL: &str = "dialogue.call";
    pub const FUNCTION: &str = "dialogue.function";
    pub const VARIABLE: &str = "dialogue.variable";
    pub const VARIABLE_SET: &str = "dialogue.variable_set";
    pub const VARIABLE_CHECK: &str = "dialogue.variable_check";

    pub const ALL: [&str; 10] = [
        START,
        OUTPUT,
        SWITCH,
        ACTION,
        CONDITION,
        CALL,
        FUNCTION,
        VARIABLE,
        VARIABLE_SET,
        VARIABLE_CHECK,
    ];
}

/// Serialized, order-independent description of a dialogue graph.
///
/// Four co-indexed collections: a de-duplicated table of type tokens, a
/// per-node array of indices into that table, a flat integer array holding
/// four entries per connection, and a per-node list of opaque payload values.
/// A node's position in the parallel arrays is its only identity; the runtime
/// reads this structure but never mutates it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphDocument {
    #[serde(default)]
    type_table: Vec<String>,

    #[serde(default)]
    node_types: Vec<usize>,

    #[serde(default)]
    connections: Vec<u32>,

    #[serde(default)]
    node_payloads: Vec<Vec<Value>>,
}

/// Connection between two node ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub from_node: u32,
    pub from_port: u32,
    pub to_node: u32,
    pub to_port: u32,
}

impl Connection {
    pub fn new(from_node: u32, from_port: u32, to_node: u32, to_port: u32) -> Self {
        Self {
            from_node,
            from_port,
            to_node,
            to_port,
        }
    }
}

impl GraphDocument {
    /// Creates an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a document from `(type token, payload)` pairs and connections
    /// in one shot. Authoring convenience; funnels through the wholesale
    /// mutators so the type-table invariants hold.
    pub fn from_nodes<S: Into<String>>(
        nodes: Vec<(S, Vec<Value>)>,
        connections: &[Connection],
    ) -> Self {
        let mut document = Self::new();
        let (tokens, payloads): (Vec<String>, Vec<Vec<Value>>) = nodes
            .into_iter()
            .map(|(token, payload)| (token.into(), payload))
            .unzip();

        document.set_node_types(tokens);
        document.set_node_payloads(payloads);
        document.set_connections(connections);
        document
    }

    pub fn node_count(&self) -> usize {
        self.node_types.len()
    }

    /// Returns the type token of the node at `index`
    pub fn node_type(&self, index: usize) -> Result<&str, DocumentError> {
        let type_index = *self
            .node_types
            .get(index)
            .ok_or(DocumentError::IndexOutOfRange {
                index,
                count: self.node_count(),
            })?;

        self.type_table
            .get(type_index)
            .map(String::as_str)
            .ok_or(DocumentError::InvalidTypeIndex { index, type_index })
    }

    /// Returns the opaque payload of the node at `index`. The payload's shape
    /// is owned entirely by the node kind; the document never interprets it.
    pub fn node_payload(&self, index: usize) -> Result<&[Value], DocumentError> {
        if index >= self.node_count() {
            return Err(DocumentError::IndexOutOfRange {
                index,
                count: self.node_count(),
            });
        }

        self.node_payloads
            .get(index)
            .map(Vec::as_slice)
            .ok_or(DocumentError::PayloadLengthMismatch {
                payloads: self.node_payloads.len(),
                nodes: self.node_count(),
            })
    }

    /// The de-duplicated type token table, in first-seen order
    pub fn type_table(&self) -> &[String] {
        &self.type_table
    }

    /// Rebuilds the type table from one token per node, de-duplicating in
    /// first-seen order, and rewrites the per-node indices against the new
    /// table. This is the only path that mutates the table or the indices.
    /// Payload storage is resized to match the new node count.
    pub fn set_node_types<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table: Vec<String> = Vec::new();
        let mut indices: HashMap<String, usize> = HashMap::new();
        let mut node_types = Vec::new();

        for token in tokens {
            let token = token.into();
            let index = *indices.entry(token.clone()).or_insert_with(|| {
                table.push(token);
                table.len() - 1
            });
            node_types.push(index);
        }

        self.type_table = table;
        self.node_types = node_types;
        self.node_payloads.resize(self.node_types.len(), Vec::new());
    }

    /// Replaces all node payloads. The list is padded or truncated to the
    /// current node count so the parallel arrays stay the same length.
    pub fn set_node_payloads(&mut self, payloads: Vec<Vec<Value>>) {
        self.node_payloads = payloads;
        self.node_payloads.resize(self.node_types.len(), Vec::new());
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len() / 4
    }

    /// Returns the connection at logical index `index`
    pub fn connection(&self, index: usize) -> Result<Connection, DocumentError> {
        if index >= self.connection_count() {
            return Err(DocumentError::ConnectionIndexOutOfRange {
                index,
                count: self.connection_count(),
            });
        }

        let base = index * 4;
        Ok(Connection::new(
            self.connections[base],
            self.connections[base + 1],
            self.connections[base + 2],
            self.connections[base + 3],
        ))
    }

    /// Iterates all connections in document order
    pub fn connections(&self) -> impl Iterator<Item = Connection> + '_ {
        self.connections.chunks_exact(4).map(|chunk| {
            Connection::new(chunk[0], chunk[1], chunk[2], chunk[3])
        })
    }

    /// Returns the first connection (in document order) leaving the given
    /// output port, or `None` if the port is unconnected. When duplicate
    /// out-edges exist the first one wins; authoring tools are expected to
    /// prevent duplicates.
    pub fn connection_from(&self, from_node: u32, from_port: u32) -> Option<Connection> {
        self.connections()
            .find(|c| c.from_node == from_node && c.from_port == from_port)
    }

    /// Replaces all connections atomically, flattening into 4-wide storage
    pub fn set_connections(&mut self, connections: &[Connection]) {
        let mut flat = Vec::with_capacity(connections.len() * 4);

        for connection in connections {
            flat.push(connection.from_node);
            flat.push(connection.from_port);
            flat.push(connection.to_node);
            flat.push(connection.to_port);
        }

        self.connections = flat;
    }

    /// Empties all four collections
    pub fn clear(&mut self) {
        self.type_table.clear();
        self.node_types.clear();
        self.connections.clear();
        self.node_payloads.clear();
    }

    /// Structural check over the cross-referential invariants: type indices
    /// within the table, connection endpoints within the node range, payload
    /// storage parallel to the node list. Returns every problem found.
    pub fn validate(&self) -> Result<(), Vec<DocumentError>> {
        let mut problems = Vec::new();
        let count = self.node_count();

        if self.node_payloads.len() != count {
            problems.push(DocumentError::PayloadLengthMismatch {
                payloads: self.node_payloads.len(),
                nodes: count,
            });
        }

        for (index, &type_index) in self.node_types.iter().enumerate() {
            if type_index >= self.type_table.len() {
                problems.push(DocumentError::InvalidTypeIndex { index, type_index });
            }
        }

        for (index, connection) in self.connections().enumerate() {
            for node in [connection.from_node, connection.to_node] {
                if node as usize >= count {
                    problems.push(DocumentError::InvalidConnection { index, node });
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }

    /// Parses a document from its JSON form
    pub fn from_json(json: &str) -> Result<Self, DialogueError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes this document as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, DialogueError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads a document from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DialogueError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Saves this document as a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DialogueError> {
        Ok(std::fs::write(path, self.to_json()?)?)
    }
}
