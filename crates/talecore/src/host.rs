use crate::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// External side effect a dialogue graph can fire, resolved by path.
/// Fire-and-forget: no return value.
pub trait DialogueAction: Send + Sync {
    fn invoke(&self, parameters: &[Value]);
}

/// External boolean predicate a dialogue graph can branch on
pub trait DialogueCondition: Send + Sync {
    fn invoke(&self, parameters: &[Value]) -> bool;
}

/// Host-supplied resolver for action and condition references.
///
/// The engine never assumes a path resolves; a `None` means the node
/// degrades (actions are skipped, conditions evaluate false).
pub trait DialogueHost: Send + Sync {
    fn resolve_action(&self, path: &str) -> Option<Arc<dyn DialogueAction>>;
    fn resolve_condition(&self, path: &str) -> Option<Arc<dyn DialogueCondition>>;
}

/// Host that resolves nothing
pub struct NullHost;

impl DialogueHost for NullHost {
    fn resolve_action(&self, _path: &str) -> Option<Arc<dyn DialogueAction>> {
        None
    }

    fn resolve_condition(&self, _path: &str) -> Option<Arc<dyn DialogueCondition>> {
        None
    }
}

/// Path-keyed registry of host capabilities
pub struct HostRegistry {
    actions: HashMap<String, Arc<dyn DialogueAction>>,
    conditions: HashMap<String, Arc<dyn DialogueCondition>>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
            conditions: HashMap::new(),
        }
    }

    pub fn register_action(&mut self, path: impl Into<String>, action: Arc<dyn DialogueAction>) {
        let path = path.into();
        tracing::debug!(path = %path, "Registering dialogue action");
        self.actions.insert(path, action);
    }

    pub fn register_condition(
        &mut self,
        path: impl Into<String>,
        condition: Arc<dyn DialogueCondition>,
    ) {
        let path = path.into();
        tracing::debug!(path = %path, "Registering dialogue condition");
        self.conditions.insert(path, condition);
    }

    /// Registers a closure as an action
    pub fn action_fn<F>(&mut self, path: impl Into<String>, action: F)
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.register_action(path, Arc::new(FnAction(action)));
    }

    /// Registers a closure as a condition
    pub fn condition_fn<F>(&mut self, path: impl Into<String>, condition: F)
    where
        F: Fn(&[Value]) -> bool + Send + Sync + 'static,
    {
        self.register_condition(path, Arc::new(FnCondition(condition)));
    }
}

impl Default for HostRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DialogueHost for HostRegistry {
    fn resolve_action(&self, path: &str) -> Option<Arc<dyn DialogueAction>> {
        self.actions.get(path).cloned()
    }

    fn resolve_condition(&self, path: &str) -> Option<Arc<dyn DialogueCondition>> {
        self.conditions.get(path).cloned()
    }
}

struct FnAction<F>(F);

impl<F> DialogueAction for FnAction<F>
where
    F: Fn(&[Value]) + Send + Sync,
{
    fn invoke(&self, parameters: &[Value]) {
        (self.0)(parameters)
    }
}

struct FnCondition<F>(F);

impl<F> DialogueCondition for FnCondition<F>
where
    F: Fn(&[Value]) -> bool + Send + Sync,
{
    fn invoke(&self, parameters: &[Value]) -> bool {
        (self.0)(parameters)
    }
}
