use std::collections::HashMap;
use std::sync::Arc;
use talecore::Value;

/// Runtime setter behavior for one variable kind, built from a
/// variable-setter node's payload.
pub trait VariableSetter: Send + Sync {
    /// Computes the value to assign, given the variable's previous value
    fn apply(&self, previous: &Value) -> Value;
}

/// Runtime condition behavior for one variable kind, built from a
/// variable-condition node's payload.
pub trait VariableCondition: Send + Sync {
    fn evaluate(&self, value: &Value) -> bool;
}

/// Behavior factories for one variable kind.
///
/// This is the open extension point of the variable sub-system: registering
/// a new kind adds typed variables to the graph without touching the engine
/// or the node variants. A factory returning `None` means the payload did
/// not describe a usable behavior; the referencing node degrades.
pub trait VariableKind: Send + Sync {
    /// Kind token variables declare to select this entry
    fn token(&self) -> &str;

    /// The value a freshly defined variable of this kind starts with
    fn default_value(&self, definition: &Value) -> Value;

    /// The legal choices this kind's definition offers, for editors and
    /// hosts that present them (e.g. the labels of an enumerated set).
    fn definition_options(&self, definition: &Value) -> Vec<String>;

    fn setter(&self, payload: &[Value], definition: &Value) -> Option<Box<dyn VariableSetter>>;

    fn condition(&self, payload: &[Value], definition: &Value)
        -> Option<Box<dyn VariableCondition>>;
}

/// Registry of available variable kinds, keyed by token.
///
/// An unknown token is not an error: the engine treats it as "no behavior"
/// (setters are skipped, conditions evaluate false).
pub struct VariableRegistry {
    kinds: HashMap<String, Arc<dyn VariableKind>>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    /// Registry with the built-in kinds registered
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(EnumKind));
        registry
    }

    pub fn register(&mut self, kind: Arc<dyn VariableKind>) {
        let token = kind.token().to_string();
        tracing::debug!(token = %token, "Registering variable kind");
        self.kinds.insert(token, kind);
    }

    pub fn lookup(&self, token: &str) -> Option<Arc<dyn VariableKind>> {
        self.kinds.get(token).cloned()
    }

    /// All registered kind tokens
    pub fn kinds(&self) -> Vec<String> {
        self.kinds.keys().cloned().collect()
    }
}

impl Default for VariableRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Token of the built-in enumerated kind
pub const ENUM_KIND: &str = "enum";

/// Built-in closed string-set kind. The definition is an array of legal
/// labels; the setter payload names the label to assign and the condition
/// payload the label to compare against. The setter writes its label
/// verbatim, without checking it against the definition.
pub struct EnumKind;

impl VariableKind for EnumKind {
    fn token(&self) -> &str {
        ENUM_KIND
    }

    fn default_value(&self, definition: &Value) -> Value {
        self.definition_options(definition)
            .into_iter()
            .next()
            .map(Value::String)
            .unwrap_or(Value::Null)
    }

    fn definition_options(&self, definition: &Value) -> Vec<String> {
        definition
            .as_array()
            .unwrap_or(&[])
            .iter()
            .filter_map(|label| label.as_str().map(str::to_string))
            .collect()
    }

    fn setter(&self, payload: &[Value], _definition: &Value) -> Option<Box<dyn VariableSetter>> {
        let label = payload.first()?.as_str()?.to_string();
        Some(Box::new(EnumSetter { label }))
    }

    fn condition(
        &self,
        payload: &[Value],
        _definition: &Value,
    ) -> Option<Box<dyn VariableCondition>> {
        let label = payload.first()?.as_str()?.to_string();
        Some(Box::new(EnumCondition { label }))
    }
}

struct EnumSetter {
    label: String,
}

impl VariableSetter for EnumSetter {
    fn apply(&self, _previous: &Value) -> Value {
        Value::String(self.label.clone())
    }
}

struct EnumCondition {
    label: String,
}

impl VariableCondition for EnumCondition {
    fn evaluate(&self, value: &Value) -> bool {
        value.as_str() == Some(self.label.as_str())
    }
}
