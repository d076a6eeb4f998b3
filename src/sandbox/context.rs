//! Execution context for one module load.
//!
//! A context is built fresh per load and discarded after its exports are
//! read; nothing is shared between loads except the `require` closure's
//! loader handle.

use std::cell::RefCell;
use std::rc::Rc;

use crate::runtime::builtins;
use crate::runtime::env::Env;
use crate::runtime::value::{NativeFunction, ObjectMap, ObjectRef, Value};

pub(crate) struct ModuleContext {
    pub env: Env,
    module: ObjectRef,
}

impl ModuleContext {
    pub(crate) fn new(require: NativeFunction) -> Self {
        let env = builtins::global_env();

        let exports = Value::object(ObjectMap::new());
        let mut module_map = ObjectMap::new();
        module_map.insert("exports".to_string(), exports.clone());
        let module = Rc::new(RefCell::new(module_map));

        env.define("module", Value::Object(module.clone()));
        env.define("exports", exports);
        env.define("require", Value::Native(require));

        Self { env, module }
    }

    /// Adds the default-unwrap helper the normalizer emits for default
    /// imports.
    pub(crate) fn with_interop(self) -> Self {
        self.env.define(
            "__interopDefault",
            Value::Native(NativeFunction::new("__interopDefault", |arguments| {
                let value = arguments.first().cloned().unwrap_or(Value::Undefined);
                Ok(value.unwrap_default())
            })),
        );
        self
    }

    /// Reads `module.exports` as left by the executed code, honoring a
    /// wholesale `module.exports = ...` reassignment.
    pub(crate) fn exports(&self) -> Value {
        self.module
            .borrow()
            .get("exports")
            .cloned()
            .unwrap_or(Value::Undefined)
    }
}
