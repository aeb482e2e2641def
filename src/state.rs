//! Last-known component state, keyed by component name.
//!
//! Seeded once from the bootstrap snapshot and replaced wholesale whenever a
//! dispatch response carries `newState`. The dispatch engine is the only
//! writer.

#[cfg(test)]
#[path = "state_test.rs"]
mod state_test;

use serde_json::{Map, Value};

/// Mapping from component name to its state blob.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlobalState {
    snapshot: Map<String, Value>,
}

impl GlobalState {
    /// Build from a snapshot value. Anything but an object yields empty state.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(snapshot) => Self { snapshot },
            Value::Null => Self::default(),
            other => {
                log::warn!("ignoring non-object state snapshot: {other}");
                Self::default()
            }
        }
    }

    /// State for `name`, or an empty object when unknown.
    pub fn get(&self, name: &str) -> Value {
        self.snapshot
            .get(name)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// Replace the whole snapshot.
    pub fn replace(&mut self, value: Value) {
        *self = Self::from_value(value);
    }

    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }
}
