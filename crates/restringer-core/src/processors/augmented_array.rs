//! Augmented-array bundle: resolves the rotation IIFE
//! `(function (arr, n) { while (n--) arr.push(arr.shift()); })(A, k)`
//! by executing it in a sandbox and baking the permuted array back into
//! `A`'s initializer.

use super::{ObfuscationKind, Processor};
use crate::arborist::Arborist;
use crate::context::context_source;
use crate::evaluator::{eval_in_vm, value_to_node, Evaluated, Sandbox};
use crate::rules::{NamedRule, RuleCtx};
use restringer_parser::ast::{Node, NodeId, NodeKind};
use tracing::debug;

pub fn processor() -> Processor {
    Processor {
        kind: ObfuscationKind::AugmentedArray,
        preprocessors: vec![NamedRule {
            name: "resolve-array-rotation-iifes",
            run: resolve_array_rotation_iifes,
        }],
        postprocessors: vec![NamedRule {
            name: "remove-dead-declarations",
            run: crate::rules::variables::remove_dead_declarations,
        }],
    }
}

/// Finds rotation IIFEs, replays them, rewrites the array initializer
/// with the permuted literal and deletes the IIFE statement.
pub fn resolve_array_rotation_iifes(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;

    for call in arb.live_of_kind(NodeKind::CallExpression) {
        if arb.is_stale(call) {
            continue;
        }
        let Node::CallExpression { callee, arguments } = arb.ast().node(call) else {
            continue;
        };
        let (callee, arguments) = (*callee, arguments.clone());
        let Node::FunctionExpression { body, .. } = arb.ast().node(callee) else {
            continue;
        };
        if !body_rotates(arb, *body) {
            continue;
        }
        // The rotated array is the first identifier argument declared
        // with an array initializer.
        let mut array_decl = None;
        for arg in &arguments {
            let Some(decl) = arb.indexes().decl_of(*arg) else {
                continue;
            };
            let Some(declarator) = arb.indexes().parent(decl) else {
                continue;
            };
            if let Node::VariableDeclarator {
                init: Some(init), ..
            } = arb.ast().node(declarator)
            {
                if arb.ast().kind(*init) == NodeKind::ArrayExpression {
                    array_decl = Some((decl, *init));
                    break;
                }
            }
        }
        let Some((array_decl, array_init)) = array_decl else {
            continue;
        };
        let Some(array_stmt) = arb.indexes().top_level_statement(arb.ast(), array_decl) else {
            continue;
        };
        let Some(iife_stmt) = arb.indexes().top_level_statement(arb.ast(), call) else {
            continue;
        };
        if array_stmt == iife_stmt {
            continue;
        }

        let array_name = match arb.ast().ident_name(array_decl) {
            Some(name) => name.to_string(),
            None => continue,
        };
        let prelude = context_source(arb, &[array_stmt, iife_stmt]);
        let mut sandbox = Sandbox::new();
        if sandbox.run(&prelude).is_err() {
            debug!("rotation IIFE failed to execute in sandbox");
            continue;
        }
        let Evaluated::Value(permuted) = eval_in_vm(&array_name, Some(&mut sandbox)) else {
            continue;
        };
        let Some(replacement) = value_to_node(&permuted, arb.ast_mut()) else {
            continue;
        };
        if arb.ast().kind(replacement) != NodeKind::ArrayExpression {
            continue;
        }
        arb.mark_node_replaced(array_init, replacement);
        arb.mark_node(iife_stmt);
        staged += 2;
    }
    staged
}

/// Loose shape check: the body must call both `push` and `shift` on the
/// same receiver inside a loop.
fn body_rotates(arb: &Arborist, body: NodeId) -> bool {
    let mut has_loop = false;
    let mut pushes = false;
    let mut shifts = false;
    arb.ast().walk(body, &mut |_, node| {
        match node {
            Node::WhileStatement { .. }
            | Node::ForStatement { .. }
            | Node::DoWhileStatement { .. } => has_loop = true,
            Node::CallExpression { callee, .. } => {
                if let Node::MemberExpression { property, .. } = arb.ast().node(*callee) {
                    match arb.ast().ident_name(*property) {
                        Some("push") => pushes = true,
                        Some("shift") => shifts = true,
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    });
    has_loop && pushes && shifts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_rotation_and_removes_iife() {
        let source = "var A = ['c', 'a', 'b'];\n(function (a, n) { while (n--) a.push(a.shift()); })(A, 2);\nuse(A[0]);";
        let mut arb = Arborist::parse(source).unwrap();
        let mut ctx = RuleCtx::new();
        assert!(resolve_array_rotation_iifes(&mut arb, &mut ctx) > 0);
        arb.commit().unwrap();
        let out = arb.emit();
        assert!(
            out.starts_with("var A = ['b', 'c', 'a'];"),
            "array not permuted: {out}"
        );
        assert!(!out.contains("shift"), "IIFE not removed: {out}");
    }

    #[test]
    fn non_rotating_iifes_are_ignored() {
        let source = "(function (a) { return a; })(x);";
        let mut arb = Arborist::parse(source).unwrap();
        let mut ctx = RuleCtx::new();
        assert_eq!(resolve_array_rotation_iifes(&mut arb, &mut ctx), 0);
    }
}
