//! Lexical environments. An `Env` is a cheap handle; closures hold the
//! environment they were created in.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::runtime::value::Value;

#[derive(Clone)]
pub struct Env {
    inner: Rc<RefCell<EnvInner>>,
}

struct EnvInner {
    vars: HashMap<String, Value>,
    parent: Option<Env>,
}

impl Env {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(EnvInner {
                vars: HashMap::new(),
                parent: None,
            })),
        }
    }

    pub fn child(&self) -> Self {
        Self {
            inner: Rc::new(RefCell::new(EnvInner {
                vars: HashMap::new(),
                parent: Some(self.clone()),
            })),
        }
    }

    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.inner.borrow_mut().vars.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let inner = self.inner.borrow();
        match inner.vars.get(name) {
            Some(value) => Some(value.clone()),
            None => inner.parent.as_ref().and_then(|parent| parent.get(name)),
        }
    }

    /// Walks the chain to the owning scope. Returns false when the name was
    /// never defined.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        let mut inner = self.inner.borrow_mut();
        if let Some(slot) = inner.vars.get_mut(name) {
            *slot = value;
            return true;
        }
        match &inner.parent {
            Some(parent) => parent.assign(name, value),
            None => false,
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
