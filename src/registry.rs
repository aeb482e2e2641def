//! Component registry: which elements render which component.
//!
//! DESIGN
//! ======
//! One [`ComponentInstance`] per component name, not per element. Elements
//! sharing a name share the state record but keep their own handles. The
//! registry knows nothing about the DOM; callers pass the element handle and
//! its declared instance id, and supply a liveness predicate when pruning.

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

use serde_json::Value;

use crate::state::GlobalState;

/// Bookkeeping for one component name.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentInstance<N> {
    pub name: String,
    /// Elements currently rendering this component, in registration order.
    pub elements: Vec<N>,
    pub state: Value,
    /// Instance identifier declared by the first registered element.
    pub id: Option<String>,
}

/// Name → instance map, kept in first-registration order.
#[derive(Clone, Debug)]
pub struct Registry<N> {
    instances: Vec<ComponentInstance<N>>,
}

impl<N> Default for Registry<N> {
    fn default() -> Self {
        Self { instances: Vec::new() }
    }
}

impl<N: PartialEq + Clone> Registry<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `element` renders `name`.
    ///
    /// A new instance is seeded from `state` and `id`. For a known name the
    /// element is appended unless it is already present. Returns `true` when a
    /// new instance was created.
    pub fn register(&mut self, name: &str, element: N, id: Option<String>, state: &GlobalState) -> bool {
        if let Some(instance) = self.instances.iter_mut().find(|i| i.name == name) {
            if !instance.elements.contains(&element) {
                instance.elements.push(element);
            }
            return false;
        }
        self.instances.push(ComponentInstance {
            name: name.to_owned(),
            elements: vec![element],
            state: state.get(name),
            id,
        });
        true
    }

    pub fn get(&self, name: &str) -> Option<&ComponentInstance<N>> {
        self.instances.iter().find(|i| i.name == name)
    }

    /// Registered names, in first-registration order.
    pub fn names(&self) -> Vec<String> {
        self.instances.iter().map(|i| i.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Total element handles across all instances.
    pub fn element_count(&self) -> usize {
        self.instances.iter().map(|i| i.elements.len()).sum()
    }

    /// Drop element handles for which `is_live` is false. Instances are kept.
    ///
    /// Returns the number of handles dropped.
    pub fn prune(&mut self, mut is_live: impl FnMut(&N) -> bool) -> usize {
        let mut dropped = 0;
        for instance in &mut self.instances {
            let before = instance.elements.len();
            instance.elements.retain(|el| is_live(el));
            dropped += before - instance.elements.len();
        }
        dropped
    }

    /// Re-seed every instance's state from a fresh snapshot.
    pub fn sync_state(&mut self, state: &GlobalState) {
        for instance in &mut self.instances {
            instance.state = state.get(&instance.name);
        }
    }
}
