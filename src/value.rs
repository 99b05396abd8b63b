//! Runtime value representation
//!
//! This module defines the [`Value`] enum, the uniform tagged type every
//! template expression evaluates to. Unlike a host language object model,
//! values are tagged and type-safe; all operators pattern-match on the
//! variant pair.
//!
//! # Value Types
//!
//! - [`Value::None`]: the absent value
//! - [`Value::Bool`]: boolean
//! - [`Value::Int`]: 64-bit signed integer
//! - [`Value::Float`]: double-precision float
//! - [`Value::Str`]: UTF-8 string
//! - [`Value::List`]: ordered sequence of values
//! - [`Value::Dict`]: string-keyed mapping (insertion order is not
//!   significant)
//! - [`Value::Callable`]: host function or template-defined function
//! - [`Value::Opaque`]: host-owned handle passed through transparently
//!
//! # Host values
//!
//! The engine never looks inside an opaque value. Attribute and item
//! lookups and calls are delegated through the [`OpaqueValue`] capability
//! trait, so hosts decide what their handles expose.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::parser::ast::NodeList;
use crate::render::errors::TemplateError;
use crate::scope::CapturedScope;

/// Depth limit when converting nested containers to display text.
/// Beyond this a placeholder is emitted instead of recursing further.
pub const MAX_DISPLAY_DEPTH: usize = 32;

/// A host-provided function callable from templates.
pub type HostFn = Rc<dyn Fn(&[Value]) -> Result<Value, TemplateError>>;

/// Capability trait for host-owned values.
///
/// `get_attr` backs `value.name`, `get_item` backs `value[key]`, and
/// `call` backs `value(args)`. Returning `None` means the capability is
/// not supported or the member does not exist; the engine reports the
/// appropriate error.
pub trait OpaqueValue: fmt::Debug {
    fn get_attr(&self, name: &str) -> Option<Value>;

    fn get_item(&self, key: &Value) -> Option<Value>;

    fn call(&self, args: &[Value]) -> Option<Result<Value, TemplateError>>;
}

/// A template-defined function created by the `def` action.
///
/// The body is shared with the parsed tree and the captured scope is the
/// snapshot of the defining frame, so invoking the function later renders
/// against the variables that were visible at definition time.
#[derive(Debug, Clone)]
pub struct TemplateFn {
    pub params: Vec<String>,
    pub body: Rc<NodeList>,
    pub captured: Rc<CapturedScope>,
}

/// A callable value: either a host function or a template function.
#[derive(Clone)]
pub enum Callable {
    Host(HostFn),
    Template(Rc<TemplateFn>),
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Host(_) => write!(f, "Callable::Host"),
            Callable::Template(t) => {
                write!(f, "Callable::Template({})", t.params.join(", "))
            }
        }
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Callable::Host(a), Callable::Host(b)) => Rc::ptr_eq(a, b),
            (Callable::Template(a), Callable::Template(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Runtime values in the template engine
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Dict(FxHashMap<String, Value>),
    Callable(Callable),
    Opaque(Rc<dyn OpaqueValue>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    /// Truthiness: none, false, zero, and empty strings/containers are
    /// false; everything else is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Dict(d) => !d.is_empty(),
            Value::Callable(_) | Value::Opaque(_) => true,
        }
    }

    /// The type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Callable(_) => "function",
            Value::Opaque(_) => "object",
        }
    }

    /// Get the string value, returns None if not a Str
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the integer value, returns None if not an Int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric value widened to float, returns None for non-numbers
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Convert to the text emitted for `{{ expr }}` and captured by the
    /// `var` and `section` actions. `none` renders as the empty string.
    pub fn to_display(&self) -> String {
        let mut out = String::new();
        self.write_display(&mut out, 0);
        out
    }

    fn write_display(&self, out: &mut String, depth: usize) {
        if depth > MAX_DISPLAY_DEPTH {
            out.push_str("...");
            return;
        }

        match self {
            Value::None => {}
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Int(n) => out.push_str(&n.to_string()),
            Value::Float(f) => out.push_str(&f.to_string()),
            Value::Str(s) => out.push_str(s),
            Value::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_display(out, depth + 1);
                }
                out.push(']');
            }
            Value::Dict(map) => {
                // Sorted so display text is deterministic
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                out.push('[');
                if keys.is_empty() {
                    out.push(':');
                }
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(key);
                    out.push_str(": ");
                    map[*key].write_display(out, depth + 1);
                }
                out.push(']');
            }
            Value::Callable(_) => out.push_str("<function>"),
            Value::Opaque(_) => out.push_str("<object>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::None.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(!Value::List(Vec::new()).is_truthy());
        assert!(!Value::Dict(FxHashMap::default()).is_truthy());

        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(Value::Float(0.5).is_truthy());
        assert!(Value::Str("x".to_string()).is_truthy());
        assert!(Value::List(vec![Value::None]).is_truthy());
    }

    #[test]
    fn test_display_scalars() {
        assert_eq!(Value::None.to_display(), "");
        assert_eq!(Value::Bool(true).to_display(), "true");
        assert_eq!(Value::Int(-7).to_display(), "-7");
        assert_eq!(Value::Float(1.5).to_display(), "1.5");
        assert_eq!(Value::Str("hi".to_string()).to_display(), "hi");
    }

    #[test]
    fn test_display_containers() {
        let list = Value::List(vec![Value::Int(1), Value::Str("a".to_string())]);
        assert_eq!(list.to_display(), "[1, a]");

        let mut map = FxHashMap::default();
        map.insert("b".to_string(), Value::Int(2));
        map.insert("a".to_string(), Value::Int(1));
        assert_eq!(Value::Dict(map).to_display(), "[a: 1, b: 2]");

        assert_eq!(Value::Dict(FxHashMap::default()).to_display(), "[:]");
    }

    #[test]
    fn test_display_depth_cap() {
        let mut value = Value::List(vec![Value::Int(1)]);
        for _ in 0..40 {
            value = Value::List(vec![value]);
        }
        let text = value.to_display();
        assert!(text.contains("..."));
    }

    #[test]
    fn test_structural_equality() {
        let a = Value::List(vec![Value::Int(1), Value::Str("x".to_string())]);
        let b = Value::List(vec![Value::Int(1), Value::Str("x".to_string())]);
        assert_eq!(a, b);
        assert_ne!(a, Value::List(vec![Value::Int(1)]));
        assert_ne!(Value::Int(1), Value::Float(1.0));
    }
}
