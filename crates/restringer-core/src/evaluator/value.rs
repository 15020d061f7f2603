//! Runtime value representation and the JS coercion rules the interpreter
//! needs (truthiness, ToNumber/ToString/ToPrimitive, equality).

use restringer_parser::ast::{Ast, NodeId};
use restringer_parser::codegen::format_number;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<String>),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<ObjectData>>),
    Function(Rc<FunctionValue>),
    /// Host-provided global (function or namespace): `atob`, `Math`, …
    Native(&'static str),
    /// A builtin method read off a receiver (`"".charAt`,
    /// `String.fromCharCode`), callable directly or via `.call`/`.apply`.
    Method(Rc<BoundMethod>),
}

pub struct BoundMethod {
    pub recv: Value,
    pub name: String,
}

/// Plain object: insertion-ordered own properties plus an optional
/// prototype link (set when constructed via `new`).
#[derive(Default)]
pub struct ObjectData {
    props: Vec<(String, Value)>,
    pub proto: Option<Rc<RefCell<ObjectData>>>,
}

impl ObjectData {
    pub fn with_proto(proto: Rc<RefCell<ObjectData>>) -> Self {
        ObjectData {
            props: Vec::new(),
            proto: Some(proto),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some((_, v)) = self.props.iter().find(|(k, _)| k == key) {
            return Some(v.clone());
        }
        self.proto.as_ref().and_then(|p| p.borrow().get(key))
    }

    pub fn get_own(&self, key: &str) -> Option<Value> {
        self.props
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    pub fn set(&mut self, key: &str, value: Value) {
        if let Some((_, slot)) = self.props.iter_mut().find(|(k, _)| k == key) {
            *slot = value;
        } else {
            self.props.push((key.to_string(), value));
        }
    }

    pub fn delete(&mut self, key: &str) -> bool {
        let before = self.props.len();
        self.props.retain(|(k, _)| k != key);
        self.props.len() != before
    }

    pub fn keys(&self) -> Vec<String> {
        self.props.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn entries(&self) -> &[(String, Value)] {
        &self.props
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }
}

/// A user-defined function value closing over its defining environment.
/// The body lives in the `Ast` the sandbox parsed it from.
pub struct FunctionValue {
    pub ast: Rc<Ast>,
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: NodeId,
    /// Arrow with a bare-expression body.
    pub expression_body: bool,
    pub is_arrow: bool,
    pub env: EnvRef,
    /// Created lazily on first `prototype` access or `new`.
    pub prototype: RefCell<Option<Rc<RefCell<ObjectData>>>>,
    /// Expando properties assigned onto the function itself.
    pub props: RefCell<ObjectData>,
}

impl FunctionValue {
    pub fn prototype_object(&self) -> Rc<RefCell<ObjectData>> {
        let mut slot = self.prototype.borrow_mut();
        slot.get_or_insert_with(|| Rc::new(RefCell::new(ObjectData::default())))
            .clone()
    }
}

pub type EnvRef = Rc<RefCell<Env>>;

pub struct Env {
    vars: FxHashMap<String, Value>,
    parent: Option<EnvRef>,
}

impl Env {
    pub fn root() -> EnvRef {
        Rc::new(RefCell::new(Env {
            vars: FxHashMap::default(),
            parent: None,
        }))
    }

    pub fn child(parent: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Env {
            vars: FxHashMap::default(),
            parent: Some(parent.clone()),
        }))
    }

    pub fn define(env: &EnvRef, name: &str, value: Value) {
        env.borrow_mut().vars.insert(name.to_string(), value);
    }

    pub fn lookup(env: &EnvRef, name: &str) -> Option<Value> {
        let borrowed = env.borrow();
        if let Some(v) = borrowed.vars.get(name) {
            return Some(v.clone());
        }
        let parent = borrowed.parent.clone()?;
        drop(borrowed);
        Env::lookup(&parent, name)
    }

    /// Walks the chain looking for an existing binding; falls back to
    /// defining on the outermost environment (sloppy-mode implicit
    /// global), which is fine inside a sandbox.
    pub fn assign(env: &EnvRef, name: &str, value: Value) {
        {
            let mut borrowed = env.borrow_mut();
            if borrowed.vars.contains_key(name) {
                borrowed.vars.insert(name.to_string(), value);
                return;
            }
        }
        let parent = env.borrow().parent.clone();
        match parent {
            Some(parent) => Env::assign(&parent, name, value),
            None => Env::define(env, name, value),
        }
    }
}

impl Value {
    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(Rc::new(s.into()))
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object() -> Value {
        Value::Object(Rc::new(RefCell::new(ObjectData::default())))
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Function(_) | Value::Native(_) | Value::Method(_) => "function",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Native(_) | Value::Method(_))
    }
}

/// ToPrimitive with the default hint, as far as plain data goes: arrays
/// and objects stringify (`valueOf` on plain data is the identity, so the
/// string path is the observable one).
pub fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) => Value::str(to_string(value)),
        other => other.clone(),
    }
}

pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Undefined => f64::NAN,
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => *n,
        Value::Str(s) => string_to_number(s),
        Value::Array(_) | Value::Object(_) => string_to_number(&to_string(value)),
        Value::Function(_) | Value::Native(_) | Value::Method(_) => f64::NAN,
    }
}

pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map(|v| v as f64).unwrap_or(f64::NAN);
    }
    if trimmed == "Infinity" || trimmed == "+Infinity" {
        return f64::INFINITY;
    }
    if trimmed == "-Infinity" {
        return f64::NEG_INFINITY;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

pub fn to_string(value: &Value) -> String {
    to_string_depth(value, 0)
}

fn to_string_depth(value: &Value, depth: usize) -> String {
    if depth > 16 {
        return String::new();
    }
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        Value::Number(n) => format_number(*n),
        Value::Str(s) => s.as_ref().clone(),
        Value::Array(items) => items
            .borrow()
            .iter()
            .map(|v| match v {
                Value::Undefined | Value::Null => String::new(),
                other => to_string_depth(other, depth + 1),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
        Value::Function(f) => match &f.name {
            Some(name) => format!("function {name}() {{ [code] }}"),
            None => "function () { [code] }".to_string(),
        },
        Value::Native(name) => format!("function {name}() {{ [native code] }}"),
        Value::Method(m) => format!("function {}() {{ [native code] }}", m.name),
    }
}

/// ToInt32 for bitwise operators.
pub fn to_i32(value: &Value) -> i32 {
    let n = to_number(value);
    if !n.is_finite() {
        return 0;
    }
    n as i64 as u32 as i32
}

pub fn to_u32(value: &Value) -> u32 {
    let n = to_number(value);
    if !n.is_finite() {
        return 0;
    }
    n as i64 as u32
}

pub fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => Rc::ptr_eq(x, y),
        (Value::Object(x), Value::Object(y)) => Rc::ptr_eq(x, y),
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        (Value::Native(x), Value::Native(y)) => x == y,
        _ => false,
    }
}

pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
        (Value::Number(_), Value::Number(_))
        | (Value::Str(_), Value::Str(_))
        | (Value::Bool(_), Value::Bool(_)) => strict_eq(a, b),
        (Value::Number(_), Value::Str(_)) | (Value::Str(_), Value::Number(_)) => {
            to_number(a) == to_number(b)
        }
        (Value::Bool(_), _) => loose_eq(&Value::Number(to_number(a)), b),
        (_, Value::Bool(_)) => loose_eq(a, &Value::Number(to_number(b))),
        (Value::Array(_) | Value::Object(_), Value::Number(_) | Value::Str(_)) => {
            loose_eq(&to_primitive(a), b)
        }
        (Value::Number(_) | Value::Str(_), Value::Array(_) | Value::Object(_)) => {
            loose_eq(a, &to_primitive(b))
        }
        _ => strict_eq(a, b),
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            other => write!(f, "{}", to_string(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_coercions_match_js() {
        let empty = Value::array(vec![]);
        assert_eq!(to_string(&empty), "");
        assert_eq!(to_number(&empty), 0.0);
        let one = Value::array(vec![Value::Number(5.0)]);
        assert_eq!(to_string(&one), "5");
        assert_eq!(to_number(&one), 5.0);
    }

    #[test]
    fn string_to_number_handles_hex_and_blank() {
        assert_eq!(string_to_number("0x10"), 16.0);
        assert_eq!(string_to_number("  "), 0.0);
        assert!(string_to_number("abc").is_nan());
    }

    #[test]
    fn loose_equality() {
        assert!(loose_eq(&Value::Null, &Value::Undefined));
        assert!(loose_eq(&Value::Number(1.0), &Value::str("1")));
        assert!(loose_eq(&Value::Bool(true), &Value::Number(1.0)));
        assert!(!loose_eq(&Value::Number(1.0), &Value::str("2")));
    }

    #[test]
    fn to_i32_wraps() {
        assert_eq!(to_i32(&Value::Number(4294967296.0)), 0);
        assert_eq!(to_i32(&Value::Number(-1.0)), -1);
        assert_eq!(to_u32(&Value::Number(-1.0)), 4294967295);
    }
}
