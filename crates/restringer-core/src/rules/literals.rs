//! Safe literal and string algebra.

use super::RuleCtx;
use crate::arborist::Arborist;
use crate::evaluator::atob_decode;
use restringer_parser::ast::{BinaryOp, LiteralValue, Node, NodeKind};
use restringer_parser::codegen::{format_number, is_safe_property_name};
use restringer_parser::Span;

/// `1 + 2` → `3`, `'a' + 'b'` → `'ab'`. Only operators with decidable
/// literal semantics; anything else is left for the evaluator-backed
/// rule.
pub fn fold_binary_literals(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    for id in arb.live_of_kind(NodeKind::BinaryExpression) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::BinaryExpression { op, left, right } = arb.ast().node(id) else {
            continue;
        };
        let (op, left, right) = (*op, *left, *right);
        let (Some(l), Some(r)) = (arb.ast().literal(left), arb.ast().literal(right)) else {
            continue;
        };
        let folded = match (l, r) {
            (LiteralValue::Number(a), LiteralValue::Number(b)) => {
                let result = match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    _ => continue,
                };
                if !result.is_finite() {
                    continue;
                }
                LiteralValue::Number(result)
            }
            (LiteralValue::String(a), LiteralValue::String(b)) if op == BinaryOp::Add => {
                LiteralValue::String(format!("{a}{b}"))
            }
            _ => continue,
        };
        let replacement = arb
            .ast_mut()
            .alloc(Node::Literal { value: folded }, Span::SYNTHETIC);
        arb.mark_node_replaced(id, replacement);
        staged += 1;
    }
    staged
}

/// Substitution-free templates (and templates whose substitutions are all
/// literals) collapse to a plain string literal.
pub fn fold_template_literals(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    for id in arb.live_of_kind(NodeKind::TemplateLiteral) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::TemplateLiteral {
            quasis,
            expressions,
        } = arb.ast().node(id)
        else {
            continue;
        };
        if !expressions
            .iter()
            .all(|e| arb.ast().literal(*e).is_some())
        {
            continue;
        }
        let mut out = String::new();
        let expressions = expressions.clone();
        for (i, quasi) in quasis.iter().enumerate() {
            out.push_str(&quasi.cooked);
            if i < expressions.len() {
                match arb.ast().literal(expressions[i]).expect("checked literal") {
                    LiteralValue::String(s) => out.push_str(s),
                    LiteralValue::Number(n) => out.push_str(&format_number(*n)),
                    LiteralValue::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
                    LiteralValue::Null => out.push_str("null"),
                    LiteralValue::Regex { .. } => out.clear(),
                }
            }
        }
        let replacement = arb.ast_mut().lit_string(out);
        arb.mark_node_replaced(id, replacement);
        staged += 1;
    }
    staged
}

/// `obj['name']` → `obj.name` when the key is a valid identifier; also
/// object property and class method keys. String keys count whether the
/// slot is computed (`['a']: 1`) or quoted (`'a': 1`).
pub fn normalize_computed_members(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;

    for id in arb.live_of_kind(NodeKind::Property) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::Property {
            key,
            value,
            kind,
            shorthand,
            ..
        } = arb.ast().node(id)
        else {
            continue;
        };
        let (key, value, kind, shorthand) = (*key, *value, *kind, *shorthand);
        let Some(name) = arb.ast().string_literal(key) else {
            continue;
        };
        if !is_safe_property_name(name) {
            continue;
        }
        let name = name.to_string();
        let new_key = arb.ast_mut().ident(name);
        let replacement = arb.ast_mut().alloc(
            Node::Property {
                key: new_key,
                value,
                kind,
                computed: false,
                shorthand,
            },
            Span::SYNTHETIC,
        );
        arb.mark_node_replaced(id, replacement);
        staged += 1;
    }

    for id in arb.live_of_kind(NodeKind::MethodDefinition) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::MethodDefinition {
            key,
            value,
            kind,
            is_static,
            ..
        } = arb.ast().node(id)
        else {
            continue;
        };
        let (key, value, kind, is_static) = (*key, *value, *kind, *is_static);
        let Some(name) = arb.ast().string_literal(key) else {
            continue;
        };
        if !is_safe_property_name(name) {
            continue;
        }
        let name = name.to_string();
        let new_key = arb.ast_mut().ident(name);
        let replacement = arb.ast_mut().alloc(
            Node::MethodDefinition {
                key: new_key,
                value,
                kind,
                computed: false,
                is_static,
            },
            Span::SYNTHETIC,
        );
        arb.mark_node_replaced(id, replacement);
        staged += 1;
    }

    for id in arb.live_of_kind(NodeKind::MemberExpression) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::MemberExpression {
            object,
            property,
            computed: true,
        } = arb.ast().node(id)
        else {
            continue;
        };
        let (object, property) = (*object, *property);
        let Some(name) = arb.ast().string_literal(property) else {
            continue;
        };
        if !is_safe_property_name(name) {
            continue;
        }
        let name = name.to_string();
        let new_property = arb.ast_mut().ident(name);
        let replacement = arb.ast_mut().alloc(
            Node::MemberExpression {
                object,
                property: new_property,
                computed: false,
            },
            Span::SYNTHETIC,
        );
        arb.mark_node_replaced(id, replacement);
        staged += 1;
    }

    staged
}

/// `atob('…')` on a string literal, with an unbound callee, decodes at
/// rewrite time. Malformed base64 is swallowed (the candidate is left
/// alone).
pub fn decode_atob_calls(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    for id in arb.live_of_kind(NodeKind::CallExpression) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::CallExpression { callee, arguments } = arb.ast().node(id) else {
            continue;
        };
        if arguments.len() != 1 {
            continue;
        }
        let (callee, argument) = (*callee, arguments[0]);
        if arb.ast().ident_name(callee) != Some("atob") {
            continue;
        }
        // A rebound `atob` is someone else's function.
        if arb.indexes().decl_of(callee).is_some() {
            continue;
        }
        let Some(encoded) = arb.ast().string_literal(argument) else {
            continue;
        };
        let Some(decoded) = atob_decode(encoded) else {
            continue;
        };
        let replacement = arb.ast_mut().lit_string(decoded);
        arb.mark_node_replaced(id, replacement);
        staged += 1;
    }
    staged
}

#[cfg(test)]
mod tests {
    use super::super::RuleCtx;
    use crate::arborist::Arborist;

    fn run(source: &str, rule: super::super::RuleFn) -> String {
        let mut arb = Arborist::parse(source).expect("parse failure");
        let mut ctx = RuleCtx::new();
        let staged = rule(&mut arb, &mut ctx);
        if staged > 0 {
            arb.commit().expect("commit failure");
        }
        arb.emit()
    }

    #[test]
    fn folds_string_concatenation() {
        assert_eq!(
            run("var x = 'a' + 'b';", super::fold_binary_literals),
            "var x = 'ab';\n"
        );
    }

    #[test]
    fn folds_numeric_arithmetic_but_not_division_by_zero() {
        assert_eq!(run("x = 6 * 7;", super::fold_binary_literals), "x = 42;\n");
        assert_eq!(run("x = 1 / 0;", super::fold_binary_literals), "x = 1 / 0;\n");
    }

    #[test]
    fn leaves_mixed_operands_to_the_evaluator() {
        assert_eq!(
            run("x = 'a' + 1;", super::fold_binary_literals),
            "x = 'a' + 1;\n"
        );
    }

    #[test]
    fn collapses_static_templates() {
        assert_eq!(
            run("var s = `a${1}b${'c'}`;", super::fold_template_literals),
            "var s = 'a1bc';\n"
        );
    }

    #[test]
    fn normalizes_computed_access() {
        assert_eq!(
            run("obj['name'] = obj['with space'];", super::normalize_computed_members),
            "obj.name = obj['with space'];\n"
        );
        assert_eq!(
            run("x = { 'a': 1 }['a'];", super::normalize_computed_members),
            "x = { a: 1 }.a;\n"
        );
    }

    #[test]
    fn keyword_keys_stay_computed() {
        assert_eq!(
            run("x = obj['delete'];", super::normalize_computed_members),
            "x = obj['delete'];\n"
        );
    }

    #[test]
    fn decodes_atob_literals() {
        assert_eq!(
            run(
                "const encoded = atob('cGFzc3dvcmQ9aGFja01lOTQh');",
                super::decode_atob_calls
            ),
            "const encoded = 'password=hackMe94!';\n"
        );
    }

    #[test]
    fn skips_bound_atob_and_bad_base64() {
        assert_eq!(
            run(
                "function atob(x) { return x; } var y = atob('zz');",
                super::decode_atob_calls
            ),
            "function atob(x) {\n    return x;\n}\nvar y = atob('zz');\n"
        );
        assert_eq!(
            run("var y = atob('!!!');", super::decode_atob_calls),
            "var y = atob('!!!');\n"
        );
    }
}
