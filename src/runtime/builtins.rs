//! Globals injected into every execution context.
//!
//! Matched modules are expected to be small data-constant libraries, so the
//! surface is deliberately tiny: `undefined` and a numeric `Math` namespace.

use crate::runtime::env::Env;
use crate::runtime::value::{NativeFunction, ObjectMap, Value};

pub fn global_env() -> Env {
    let env = Env::new();
    env.define("undefined", Value::Undefined);
    env.define("Math", math_namespace());
    env
}

fn math_namespace() -> Value {
    let mut math = ObjectMap::new();
    math.insert("PI".to_string(), Value::Number(std::f64::consts::PI));
    math.insert("E".to_string(), Value::Number(std::f64::consts::E));

    define_unary(&mut math, "floor", f64::floor);
    define_unary(&mut math, "ceil", f64::ceil);
    define_unary(&mut math, "round", f64::round);
    define_unary(&mut math, "abs", f64::abs);
    define_unary(&mut math, "sqrt", f64::sqrt);
    define_binary(&mut math, "pow", f64::powf);
    define_fold(&mut math, "min", f64::INFINITY, f64::min);
    define_fold(&mut math, "max", f64::NEG_INFINITY, f64::max);

    Value::object(math)
}

fn number_arg(arguments: &[Value], index: usize) -> f64 {
    match arguments.get(index) {
        Some(Value::Number(value)) => *value,
        _ => f64::NAN,
    }
}

fn define_unary(math: &mut ObjectMap, name: &'static str, op: fn(f64) -> f64) {
    math.insert(
        name.to_string(),
        Value::Native(NativeFunction::new(name, move |arguments| {
            Ok(Value::Number(op(number_arg(arguments, 0))))
        })),
    );
}

fn define_binary(math: &mut ObjectMap, name: &'static str, op: fn(f64, f64) -> f64) {
    math.insert(
        name.to_string(),
        Value::Native(NativeFunction::new(name, move |arguments| {
            Ok(Value::Number(op(
                number_arg(arguments, 0),
                number_arg(arguments, 1),
            )))
        })),
    );
}

fn define_fold(math: &mut ObjectMap, name: &'static str, init: f64, op: fn(f64, f64) -> f64) {
    math.insert(
        name.to_string(),
        Value::Native(NativeFunction::new(name, move |arguments| {
            let mut acc = init;
            for argument in arguments {
                match argument {
                    Value::Number(value) => acc = op(acc, *value),
                    _ => return Ok(Value::Number(f64::NAN)),
                }
            }
            Ok(Value::Number(acc))
        })),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::interpreter::Interpreter;
    use crate::syntax::parse_source;

    fn eval_with_globals(source: &str, binding: &str) -> Value {
        let program = parse_source(source, "test.js").expect("parse");
        let env = global_env();
        Interpreter::new("test.js")
            .run_program(&program, &env)
            .expect("run");
        env.get(binding).expect("binding")
    }

    #[test]
    fn test_math_functions() {
        assert_eq!(
            eval_with_globals("const v = Math.floor(2.9);", "v"),
            Value::Number(2.0)
        );
        assert_eq!(
            eval_with_globals("const v = Math.max(1, 5, 3);", "v"),
            Value::Number(5.0)
        );
        assert_eq!(
            eval_with_globals("const v = Math.pow(2, 10);", "v"),
            Value::Number(1024.0)
        );
    }

    #[test]
    fn test_undefined_global() {
        assert_eq!(eval_with_globals("const v = undefined;", "v"), Value::Undefined);
    }
}
