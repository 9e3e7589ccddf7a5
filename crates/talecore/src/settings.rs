use crate::document::node_types;
use crate::GraphDocument;
use serde::{Deserialize, Serialize};

/// Designer-facing configuration for one node type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTypeConfig {
    pub token: String,

    /// Maximum number of nodes of this type per tree; `None` is unlimited
    pub node_limit: Option<usize>,

    /// How many nodes of this type a freshly seeded tree starts with
    pub include_in_new_trees: usize,
}

impl NodeTypeConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            node_limit: None,
            include_in_new_trees: 0,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.node_limit = Some(limit);
        self
    }

    pub fn with_seed_count(mut self, count: usize) -> Self {
        self.include_in_new_trees = count;
        self
    }
}

/// Global tree settings: the default-construction policy for new documents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeSettings {
    /// Template copied verbatim into every new document when present
    pub default_tree: Option<GraphDocument>,

    pub node_types: Vec<NodeTypeConfig>,
}

impl TreeSettings {
    /// Settings covering the built-in node kinds: one start node per new
    /// tree, at most one start node per tree overall.
    pub fn builtin() -> Self {
        let node_types = node_types::ALL
            .iter()
            .map(|&token| {
                if token == node_types::START {
                    NodeTypeConfig::new(token).with_limit(1).with_seed_count(1)
                } else {
                    NodeTypeConfig::new(token)
                }
            })
            .collect();

        Self {
            default_tree: None,
            node_types,
        }
    }

    pub fn node_type(&self, token: &str) -> Option<&NodeTypeConfig> {
        self.node_types.iter().find(|config| config.token == token)
    }

    /// Seeds a new document: a verbatim copy of `default_tree` when one is
    /// configured, otherwise the declared per-type node counts (capped at
    /// each type's limit) with empty payloads and no connections.
    pub fn seed_document(&self) -> GraphDocument {
        if let Some(template) = &self.default_tree {
            return template.clone();
        }

        let mut tokens = Vec::new();

        for config in &self.node_types {
            let count = config
                .include_in_new_trees
                .min(config.node_limit.unwrap_or(usize::MAX));

            for _ in 0..count {
                tokens.push(config.token.clone());
            }
        }

        let mut document = GraphDocument::new();
        document.set_node_types(tokens);
        document
    }
}
