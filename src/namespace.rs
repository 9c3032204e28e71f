//! Scripting namespaces hosting generated types and named instances.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::{BridgeError, BridgeResult};
use crate::value::ScriptValue;

/// Identity of a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamespaceId(usize);

/// A named scope of script bindings, the analogue of a scripting module.
#[derive(Debug)]
pub struct Namespace {
    name: String,
    bindings: RwLock<FxHashMap<String, ScriptValue>>,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            bindings: RwLock::new(FxHashMap::default()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> NamespaceId {
        NamespaceId(self as *const Self as usize)
    }

    /// Bind `value` under `name`. Existing bindings are never replaced.
    pub fn bind(&self, name: &str, value: ScriptValue) -> BridgeResult<()> {
        let mut bindings = self.bindings.write();
        if bindings.contains_key(name) {
            return Err(BridgeError::NamespaceRegistration {
                namespace: self.name.clone(),
                name: name.to_string(),
            });
        }
        bindings.insert(name.to_string(), value);
        Ok(())
    }

    pub fn unbind(&self, name: &str) -> Option<ScriptValue> {
        self.bindings.write().remove(name)
    }

    pub fn get(&self, name: &str) -> Option<ScriptValue> {
        self.bindings.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.read().contains_key(name)
    }

    /// Bound names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.bindings.read().keys().cloned().collect();
        names.sort();
        names
    }
}
