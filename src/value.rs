// ABOUTME: Runtime value domain: nil | bool | int | float | string | Callable

use crate::ast::Stmt;
use crate::env::Environment;
use crate::error::SagaError;
use std::fmt;
use std::rc::Rc;

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Callable(Callable),
    Instance(Rc<Instance>),
}

#[derive(Clone)]
pub enum Callable {
    Function(Rc<LambdaFn>),
    Native(Rc<NativeFn>),
    Class(Rc<ClassDecl>),
}

/// A user-defined function: its declaration plus the environment live when
/// it was declared (the closure) — spec.md §3 "Lifecycles".
pub struct LambdaFn {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<Vec<Stmt>>,
    pub closure: Rc<Environment>,
}

pub struct NativeFn {
    pub name: &'static str,
    /// -1 means variadic (spec.md §4.7, currently only `input`).
    pub arity: i32,
    pub func: fn(&[Value]) -> Result<Value, SagaError>,
}

/// Methods are parsed and stored (original source parity) but never
/// dispatched: the expression grammar has no member-access operator, so
/// there is no syntax that could ever call one. See DESIGN.md.
pub struct ClassDecl {
    pub name: String,
    #[allow(dead_code)]
    pub methods: Vec<Rc<LambdaFn>>,
}

pub struct Instance {
    pub class_name: String,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Callable(_) => "callable",
            Value::Instance(_) => "instance",
        }
    }

    /// Truthiness per spec.md §4.5: nil and false are falsy, everything
    /// else (including 0 and "") is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Callable(Callable::Function(a)), Value::Callable(Callable::Function(b))) => {
                Rc::ptr_eq(a, b)
            }
            (Value::Callable(Callable::Native(a)), Value::Callable(Callable::Native(b))) => {
                Rc::ptr_eq(a, b)
            }
            (Value::Callable(Callable::Class(a)), Value::Callable(Callable::Class(b))) => {
                Rc::ptr_eq(a, b)
            }
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            // A number never equals a string, and different value kinds are never equal.
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => {
                if n.is_finite() && n.fract() == 0.0 {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::Callable(Callable::Function(fun)) => write!(f, "<fn {}>", fun.name),
            Value::Callable(Callable::Native(_)) => write!(f, "<native fn>"),
            Value::Callable(Callable::Class(c)) => write!(f, "<class {}>", c.name),
            Value::Instance(i) => write!(f, "<{} instance>", i.class_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_spec() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::String(String::new()).is_truthy());
    }

    #[test]
    fn number_never_equals_string() {
        assert_ne!(Value::Int(1), Value::String("1".to_string()));
    }

    #[test]
    fn nil_equals_nil() {
        assert_eq!(Value::Nil, Value::Nil);
    }

    #[test]
    fn mixed_int_float_equality() {
        assert_eq!(Value::Int(2), Value::Float(2.0));
    }

    #[test]
    fn display_matches_say_semantics() {
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::Int(7).to_string(), "7");
        assert_eq!(Value::String("hi".to_string()).to_string(), "hi");
    }

    #[test]
    fn whole_number_float_keeps_its_decimal_point() {
        assert_eq!(Value::Float(4.0).to_string(), "4.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
    }

    #[test]
    fn native_fn_displays_with_no_name() {
        let native = NativeFn { name: "clock", arity: 0, func: |_| Ok(Value::Nil) };
        let value = Value::Callable(Callable::Native(Rc::new(native)));
        assert_eq!(value.to_string(), "<native fn>");
    }
}
