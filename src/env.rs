// ABOUTME: Lexical scope chain keyed by name, with resolver-distance indexed access

use crate::error::SagaError;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug)]
pub struct Environment {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates a new global environment with no parent.
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    /// Creates a new child environment (block entry / function entry).
    pub fn with_parent(parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent),
        })
    }

    /// Writes only to the innermost frame — shadowing is always allowed.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.bindings.borrow_mut().insert(name.into(), value);
    }

    /// Walks outward until found; errors (never panics) if undefined.
    pub fn get(&self, name: &str, line: u32, column: u32) -> Result<Value, SagaError> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Ok(value.clone());
        }
        if let Some(parent) = &self.parent {
            return parent.get(name, line, column);
        }
        Err(SagaError::new(
            line,
            column,
            format!("Undefined variable '{}'.", name),
        ))
    }

    /// Walks outward to locate an existing binding and overwrites it.
    /// Never creates a binding — assigning an undefined name is an error.
    pub fn assign(&self, name: &str, value: Value, line: u32, column: u32) -> Result<(), SagaError> {
        if self.bindings.borrow().contains_key(name) {
            self.bindings.borrow_mut().insert(name.to_string(), value);
            return Ok(());
        }
        if let Some(parent) = &self.parent {
            return parent.assign(name, value, line, column);
        }
        Err(SagaError::new(
            line,
            column,
            format!("Undefined variable '{}'.", name),
        ))
    }

    /// Steps exactly `distance` parents and returns that frame.
    pub fn ancestor(self: &Rc<Self>, distance: usize) -> Rc<Environment> {
        let mut env = Rc::clone(self);
        for _ in 0..distance {
            let parent = env
                .parent
                .clone()
                .expect("resolver distance must not exceed the live scope chain");
            env = parent;
        }
        env
    }

    /// Reads a binding from the frame exactly `distance` steps up, per the
    /// resolver's recorded scope distance (spec.md §4.6).
    pub fn get_at(self: &Rc<Self>, distance: usize, name: &str) -> Value {
        self.ancestor(distance)
            .bindings
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or(Value::Nil)
    }

    /// Writes a binding in the frame exactly `distance` steps up.
    pub fn assign_at(self: &Rc<Self>, distance: usize, name: &str, value: Value) {
        self.ancestor(distance)
            .bindings
            .borrow_mut()
            .insert(name.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_and_get() {
        let env = Environment::new();
        env.define("x", Value::Int(42));
        assert_eq!(env.get("x", 0, 0).unwrap(), Value::Int(42));
    }

    #[test]
    fn undefined_get_errors() {
        let env = Environment::new();
        assert!(env.get("undefined", 1, 1).is_err());
    }

    #[test]
    fn assign_to_undefined_errors_never_creates() {
        let env = Environment::new();
        assert!(env.assign("x", Value::Int(1), 1, 1).is_err());
        assert!(env.get("x", 1, 1).is_err());
    }

    #[test]
    fn shadowing_in_child_does_not_affect_parent() {
        let parent = Environment::new();
        parent.define("x", Value::Int(1));
        let child = Environment::with_parent(parent.clone());
        child.define("x", Value::Int(2));
        assert_eq!(child.get("x", 0, 0).unwrap(), Value::Int(2));
        assert_eq!(parent.get("x", 0, 0).unwrap(), Value::Int(1));
    }

    #[test]
    fn assign_in_child_updates_ancestor_binding() {
        let parent = Environment::new();
        parent.define("x", Value::Int(1));
        let child = Environment::with_parent(parent.clone());
        child.assign("x", Value::Int(9), 0, 0).unwrap();
        assert_eq!(parent.get("x", 0, 0).unwrap(), Value::Int(9));
    }

    #[test]
    fn ancestor_distance_lands_on_defining_frame() {
        let grandparent = Environment::new();
        grandparent.define("a", Value::Int(1));
        let parent = Environment::with_parent(grandparent);
        parent.define("b", Value::Int(2));
        let child = Environment::with_parent(parent);
        child.define("c", Value::Int(3));

        assert_eq!(child.get_at(0, "c"), Value::Int(3));
        assert_eq!(child.get_at(1, "b"), Value::Int(2));
        assert_eq!(child.get_at(2, "a"), Value::Int(1));
    }

    #[test]
    fn assign_at_only_touches_target_frame() {
        let parent = Environment::new();
        parent.define("x", Value::Int(1));
        let child = Environment::with_parent(parent.clone());
        child.assign_at(1, "x", Value::Int(99));
        assert_eq!(parent.get("x", 0, 0).unwrap(), Value::Int(99));
    }
}
