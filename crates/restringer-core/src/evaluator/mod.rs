//! Sandboxed expression evaluator.
//!
//! [`eval_in_vm`] runs a source fragment in an isolated interpreter and
//! reports either a value serializable back into the tree or the
//! BAD_VALUE sentinel ([`Evaluated::Bad`]). The interpreter has no host
//! filesystem/network/process builtins and enforces wall-clock, step and
//! growth budgets, so a hostile fragment degrades to `Bad` instead of
//! wedging the engine.

mod builtins;
mod interp;
mod value;

pub use interp::{EResult, EvalError, Interp, Limits};
pub use value::{to_number, to_string, Value};

use restringer_parser::ast::{Ast, Node, NodeId, PropertyKind, UnaryOp};
use restringer_parser::codegen::is_safe_property_name;
use restringer_parser::parse_program;
use restringer_parser::Span;
use std::rc::Rc;
use tracing::{debug, trace};

/// Result of a sandbox evaluation. `Bad` is the sentinel for every
/// non-resolution outcome; rules must check for it and skip.
#[derive(Debug)]
pub enum Evaluated {
    Value(Value),
    Bad,
}

impl Evaluated {
    pub fn is_bad(&self) -> bool {
        matches!(self, Evaluated::Bad)
    }
}

/// An isolated interpreter instance. A fresh sandbox is cheap; a prepared
/// one can receive `run` calls to establish declarations before the
/// fragment of interest is evaluated.
pub struct Sandbox {
    interp: Interp,
}

impl Default for Sandbox {
    fn default() -> Self {
        Sandbox::new()
    }
}

impl Sandbox {
    pub fn new() -> Self {
        Sandbox {
            interp: Interp::new(Limits::default()),
        }
    }

    pub fn with_limits(limits: Limits) -> Self {
        Sandbox {
            interp: Interp::new(limits),
        }
    }

    /// Parses and executes `code` in this sandbox's global environment,
    /// returning the completion value.
    pub fn run(&mut self, code: &str) -> EResult<Value> {
        let ast = parse_program(code).map_err(|e| EvalError::Parse(e.to_string()))?;
        let ast = Rc::new(ast);
        self.interp.reset_budget();
        self.interp.run(&ast)
    }
}

/// Evaluates `fragment`, in `sandbox` when given, otherwise in a fresh
/// one. Any error (parse, throw, budget) is flattened to [`Evaluated::Bad`].
pub fn eval_in_vm(fragment: &str, sandbox: Option<&mut Sandbox>) -> Evaluated {
    let mut fresh;
    let sandbox = match sandbox {
        Some(prepared) => prepared,
        None => {
            fresh = Sandbox::new();
            &mut fresh
        }
    };
    match sandbox.run(fragment) {
        Ok(value) => {
            trace!(?value, "fragment resolved");
            Evaluated::Value(value)
        }
        Err(err) => {
            let preview: String = fragment.chars().take(80).collect();
            debug!(%err, fragment = %preview, "fragment evaluation failed");
            Evaluated::Bad
        }
    }
}

/// Serializes a runtime value back into an AST node, or `None` for values
/// with no literal spelling (functions, cyclic or oversized data).
/// Negative numbers come back as `UnaryExpression(-, Literal)` the way a
/// parser would produce them.
pub fn value_to_node(value: &Value, ast: &mut Ast) -> Option<NodeId> {
    value_to_node_depth(value, ast, 0)
}

fn value_to_node_depth(value: &Value, ast: &mut Ast, depth: usize) -> Option<NodeId> {
    if depth > 32 {
        return None;
    }
    match value {
        Value::Undefined => Some(ast.ident("undefined")),
        Value::Null => Some(ast.lit_null()),
        Value::Bool(b) => Some(ast.lit_bool(*b)),
        Value::Number(n) => {
            if n.is_nan() {
                return Some(ast.ident("NaN"));
            }
            if n.is_infinite() {
                let inf = ast.ident("Infinity");
                if *n < 0.0 {
                    return Some(ast.alloc(
                        Node::UnaryExpression {
                            op: UnaryOp::Minus,
                            argument: inf,
                        },
                        Span::SYNTHETIC,
                    ));
                }
                return Some(inf);
            }
            if *n < 0.0 || (*n == 0.0 && n.is_sign_negative()) {
                let magnitude = ast.lit_number(-n);
                return Some(ast.alloc(
                    Node::UnaryExpression {
                        op: UnaryOp::Minus,
                        argument: magnitude,
                    },
                    Span::SYNTHETIC,
                ));
            }
            Some(ast.lit_number(*n))
        }
        Value::Str(s) => Some(ast.lit_string(s.as_ref().clone())),
        Value::Array(items) => {
            let items = items.borrow().clone();
            let mut elements = Vec::with_capacity(items.len());
            for item in &items {
                elements.push(Some(value_to_node_depth(item, ast, depth + 1)?));
            }
            Some(ast.alloc(Node::ArrayExpression { elements }, Span::SYNTHETIC))
        }
        Value::Object(data) => {
            let entries: Vec<(String, Value)> = data.borrow().entries().to_vec();
            let mut properties = Vec::with_capacity(entries.len());
            for (key, v) in &entries {
                let value_node = value_to_node_depth(v, ast, depth + 1)?;
                let key_node = if is_safe_property_name(key) {
                    ast.ident(key.clone())
                } else {
                    ast.lit_string(key.clone())
                };
                properties.push(ast.alloc(
                    Node::Property {
                        key: key_node,
                        value: value_node,
                        kind: PropertyKind::Init,
                        computed: false,
                        shorthand: false,
                    },
                    Span::SYNTHETIC,
                ));
            }
            Some(ast.alloc(Node::ObjectExpression { properties }, Span::SYNTHETIC))
        }
        Value::Function(_) | Value::Native(_) | Value::Method(_) => None,
    }
}

/// Whether a serialized replacement is meaningful: empty containers and
/// null/undefined usually signal over-resolution rather than progress.
pub fn is_meaningful_replacement(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => false,
        Value::Str(s) => !s.is_empty(),
        Value::Array(a) => !a.borrow().is_empty(),
        Value::Object(o) => !o.borrow().is_empty(),
        _ => true,
    }
}

/// Direct base64 decode used by the safe `atob` rule, bypassing the
/// sandbox entirely. `None` on malformed input (the rule swallows it).
pub fn atob_decode(encoded: &str) -> Option<String> {
    match builtins::atob(encoded) {
        Ok(v) => Some(to_string(&v)),
        Err(_) => None,
    }
}

/// Counterpart for `btoa`; `None` for non-latin-1 input.
pub fn btoa_encode(input: &str) -> Option<String> {
    match builtins::btoa(input) {
        Ok(v) => Some(to_string(&v)),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn eval_str(fragment: &str) -> String {
        match eval_in_vm(fragment, None) {
            Evaluated::Value(v) => to_string(&v),
            Evaluated::Bad => "BAD".to_string(),
        }
    }

    #[test]
    fn evaluates_arithmetic_and_strings() {
        assert_eq!(eval_str("1 + 2 * 3"), "7");
        assert_eq!(eval_str("'a' + 'b' + 'c'"), "abc");
        assert_eq!(eval_str("'5' - 2"), "3");
        assert_eq!(eval_str("'5' + 2"), "52");
    }

    #[test]
    fn evaluates_functions_and_closures() {
        assert_eq!(
            eval_str("function add(a, b) { return a + b; } add(2, 3)"),
            "5"
        );
        assert_eq!(
            eval_str("var make = function (n) { return function () { return n * 2; }; }; make(21)()"),
            "42"
        );
    }

    #[test]
    fn evaluates_jsfuck_idioms() {
        assert_eq!(eval_str("+[]"), "0");
        assert_eq!(eval_str("[] + []"), "");
        assert_eq!(eval_str("!+[]"), "true");
        assert_eq!(eval_str("+!+[]"), "1");
        assert_eq!(eval_str("[+!+[]] + [+[]]"), "10");
    }

    #[test]
    fn evaluates_string_array_rotation() {
        let fragment = r#"
            var arr = ['c', 'a', 'b'];
            (function (a, n) { while (n--) a.push(a.shift()); })(arr, 2);
            arr.join('')
        "#;
        assert_eq!(eval_str(fragment), "bca");
    }

    #[test]
    fn atob_is_host_safe() {
        assert_eq!(eval_str("atob('cGFzc3dvcmQ9aGFja01lOTQh')"), "password=hackMe94!");
        assert_eq!(eval_str("btoa('hi')"), "aGk=");
    }

    #[test]
    fn prototype_methods_resolve() {
        let fragment = r#"
            function Codec() { }
            Codec.prototype.twice = function (s) { return s + s; };
            new Codec().twice('ab')
        "#;
        assert_eq!(eval_str(fragment), "abab");
    }

    #[test]
    fn host_access_is_bad_value() {
        assert!(eval_in_vm("require('fs')", None).is_bad());
        assert!(eval_in_vm("fetch('http://example.com')", None).is_bad());
        assert!(eval_in_vm("process.exit(1)", None).is_bad());
        assert!(eval_in_vm("document.cookie", None).is_bad());
    }

    #[test]
    fn runaway_loops_hit_the_budget() {
        let mut sandbox = Sandbox::with_limits(Limits {
            timeout: Duration::from_millis(200),
            max_steps: 50_000,
            ..Limits::default()
        });
        assert!(eval_in_vm("while (true) { }", Some(&mut sandbox)).is_bad());
    }

    #[test]
    fn memory_growth_hits_the_budget() {
        let mut sandbox = Sandbox::with_limits(Limits {
            max_string: 4096,
            ..Limits::default()
        });
        assert!(eval_in_vm(
            "var s = 'x'; while (true) { s = s + s; } s",
            Some(&mut sandbox)
        )
        .is_bad());
    }

    #[test]
    fn thrown_values_are_bad_but_catchable_inside() {
        assert!(eval_in_vm("throw new Error('nope')", None).is_bad());
        assert_eq!(
            eval_str("try { missing(); } catch (e) { 'caught'; }"),
            "caught"
        );
    }

    #[test]
    fn prepared_sandbox_keeps_declarations() {
        let mut sandbox = Sandbox::new();
        sandbox.run("var key = 'se' + 'cret';").unwrap();
        match eval_in_vm("key.toUpperCase()", Some(&mut sandbox)) {
            Evaluated::Value(v) => assert_eq!(to_string(&v), "SECRET"),
            Evaluated::Bad => panic!("prepared declaration lost"),
        }
    }

    #[test]
    fn negative_numbers_serialize_as_unary_minus() {
        let mut ast = Ast::new("");
        let Evaluated::Value(v) = eval_in_vm("3 - 8", None) else {
            panic!("evaluation failed");
        };
        let node = value_to_node(&v, &mut ast).unwrap();
        let Node::UnaryExpression { op, argument } = ast.node(node) else {
            panic!("expected unary expression, got {:?}", ast.node(node));
        };
        assert_eq!(*op, UnaryOp::Minus);
        assert_eq!(ast.number_literal(*argument), Some(5.0));
    }

    #[test]
    fn number_radix_conversion() {
        assert_eq!(eval_str("(255).toString(16)"), "ff");
        assert_eq!(eval_str("parseInt('ff', 16)"), "255");
    }
}
