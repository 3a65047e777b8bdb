use std::collections::HashMap;
use std::fmt::{self, Display};
use std::rc::Rc;

use itertools::Itertools;

use crate::frontend::ast::Node;
use crate::interpreter::scope::Scope;

pub type NativeResult = Result<Value, String>;

/// Host callback: receives the call's receiver (`undefined` when called
/// without one) and the evaluated arguments.
pub type NativeCallback = dyn Fn(&Value, &[Value]) -> NativeResult;

#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Number(f64),
    Function(Rc<Function>),
    NativeFunction(Rc<NativeFunction>),
    Object(Rc<Object>),
}

/// A user function closed over the scope it was declared in.
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<Node>,
    pub scope: Scope,
}

pub struct NativeFunction {
    pub name: String,
    callback: Box<NativeCallback>,
}

#[derive(Debug, Default)]
pub struct Object {
    properties: HashMap<String, Value>,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Number(_) => "number",
            Value::Function(_) | Value::NativeFunction(_) => "function",
            Value::Object(_) => "object",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(num) => Some(*num),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::NativeFunction(_))
    }

    /// Whether this value reaches `scope` through a captured function scope.
    pub fn captures(&self, scope: &Scope) -> bool {
        match self {
            Value::Function(function) => function.scope.is_within(scope),
            Value::Object(object) => object
                .properties
                .values()
                .any(|value| value.captures(scope)),
            _ => false,
        }
    }

    pub fn native(
        name: impl Into<String>,
        callback: impl Fn(&Value, &[Value]) -> NativeResult + 'static,
    ) -> Value {
        Value::NativeFunction(Rc::new(NativeFunction::new(name, callback)))
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(Rc::new(object))
    }
}

// Numbers compare by value, everything else by identity
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::NativeFunction(a), Value::NativeFunction(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// Plain digits in [1e-6, 1e21), exponent form with an explicit sign
// outside it. Negative zero prints as `0`.
fn format_number(num: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if num.is_infinite() {
        return f.write_str(if num > 0.0 { "Infinity" } else { "-Infinity" });
    }
    if num == 0.0 {
        return f.write_str("0");
    }
    if (1e-6..1e21).contains(&num.abs()) {
        return write!(f, "{num}");
    }

    let formatted = format!("{num:e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            write!(f, "{mantissa}e+{exponent}")
        }
        _ => f.write_str(&formatted),
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Number(num) => format_number(*num, f),
            Value::Function(function) => write!(f, "[Function: {}]", function.name),
            Value::NativeFunction(native) => write!(f, "[Function: {}]", native.name),
            Value::Object(object) => Display::fmt(object, f),
        }
    }
}

impl NativeFunction {
    pub fn new(
        name: impl Into<String>,
        callback: impl Fn(&Value, &[Value]) -> NativeResult + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            callback: Box::new(callback),
        }
    }

    pub fn call(&self, this: &Value, args: &[Value]) -> NativeResult {
        (self.callback)(this, args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.properties.get(name).cloned()
    }
}

impl Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.properties.is_empty() {
            return f.write_str("{}");
        }

        let members = self
            .properties
            .iter()
            .sorted_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(name, value)| format!("{name}: {value}"))
            .join(", ");

        write!(f, "{{ {members} }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatting_numbers() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(0.5).to_string(), "0.5");
        assert_eq!(Value::Number(-2.25).to_string(), "-2.25");
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Value::Number(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Number(-0.0).to_string(), "0");
    }

    #[test]
    fn formatting_numbers_outside_plain_range() {
        assert_eq!(Value::Number(1e21).to_string(), "1e+21");
        assert_eq!(Value::Number(-1.5e300).to_string(), "-1.5e+300");
        assert_eq!(Value::Number(1e-7).to_string(), "1e-7");
        assert_eq!(Value::Number(2.5e-10).to_string(), "2.5e-10");
        assert_eq!(Value::Number(1e20).to_string(), "100000000000000000000");
        assert_eq!(Value::Number(0.000001).to_string(), "0.000001");
    }

    #[test]
    fn formatting_objects() {
        let object = Object::new()
            .with("b", Value::Number(2.0))
            .with("a", Value::native("a", |_, _| Ok(Value::Undefined)));

        assert_eq!(Value::from(object).to_string(), "{ a: [Function: a], b: 2 }");
        assert_eq!(Value::from(Object::new()).to_string(), "{}");
        assert_eq!(Value::Undefined.to_string(), "undefined");
    }

    #[test]
    fn reference_values_compare_by_identity() {
        let log = Value::native("log", |_, _| Ok(Value::Undefined));
        let other = Value::native("log", |_, _| Ok(Value::Undefined));

        assert_eq!(log, log.clone());
        assert_ne!(log, other);
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
        assert_ne!(Value::Undefined, Value::Number(0.0));
    }

    #[test]
    fn native_functions_receive_this() {
        let echo_this = NativeFunction::new("echo", |this, _| Ok(this.clone()));

        assert_eq!(
            echo_this.call(&Value::Number(7.0), &[]),
            Ok(Value::Number(7.0))
        );
    }
}
