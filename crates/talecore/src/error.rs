use thiserror::Error;

#[derive(Error, Debug)]
pub enum DialogueError {
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Structural problems in a `GraphDocument`. The runtime checks these
/// defensively and degrades instead of propagating them; they surface as
/// errors only from direct document accessors and `validate()`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Node index {index} out of range (node count {count})")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("Connection index {index} out of range (connection count {count})")]
    ConnectionIndexOutOfRange { index: usize, count: usize },

    #[error("Connection {index} references node {node} outside the document")]
    InvalidConnection { index: usize, node: u32 },

    #[error("Node {index} references type table entry {type_index} outside the table")]
    InvalidTypeIndex { index: usize, type_index: usize },

    #[error("Payload count {payloads} does not match node count {nodes}")]
    PayloadLengthMismatch { payloads: usize, nodes: usize },
}

#[derive(Error, Debug, Clone)]
pub enum NodeError {
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Missing payload entry at index {index}")]
    MissingPayload { index: usize },

    #[error("Invalid payload entry at index {index}: expected {expected}, got {actual}")]
    InvalidPayloadType {
        index: usize,
        expected: &'static str,
        actual: String,
    },
}
