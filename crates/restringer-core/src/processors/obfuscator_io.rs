//! obfuscator.io bundle: neutralizes the self-defending/debug-protection
//! scaffolding before the main loop touches it. The scaffolding probes
//! its own decompiled source; swapping the probed functions for a fixed
//! bypass string defuses the trap without altering the payload.

use super::{ObfuscationKind, Processor};
use crate::arborist::Arborist;
use crate::rules::{NamedRule, RuleCtx};
use restringer_parser::ast::{Node, NodeId, NodeKind};

const BYPASS: &str = "function () {return \"bypassed!\"}";

pub fn processor() -> Processor {
    Processor {
        kind: ObfuscationKind::ObfuscatorIo,
        preprocessors: vec![
            NamedRule {
                name: "bypass-debug-traps",
                run: bypass_debug_traps,
            },
            NamedRule {
                name: "resolve-array-rotation-iifes",
                run: super::augmented_array::resolve_array_rotation_iifes,
            },
        ],
        postprocessors: vec![NamedRule {
            name: "remove-dead-declarations",
            run: crate::rules::variables::remove_dead_declarations,
        }],
    }
}

/// `"newState"` marks the debug-trap worker: the enclosing function
/// expression is replaced wholesale. `"removeCookie"` marks the
/// self-defense property: its value is replaced. Both get a literal
/// carrying the bypass source.
pub fn bypass_debug_traps(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    for id in arb.live_of_kind(NodeKind::Literal) {
        if arb.is_stale(id) {
            continue;
        }
        let Some(marker) = arb.ast().string_literal(id) else {
            continue;
        };
        match marker {
            "newState" => {
                let Some(function) = enclosing_function_expression(arb, id) else {
                    continue;
                };
                if arb.is_stale(function) {
                    continue;
                }
                let replacement = arb.ast_mut().lit_string(BYPASS);
                arb.mark_node_replaced(function, replacement);
                staged += 1;
            }
            "removeCookie" => {
                let Some(link) = arb.indexes().parent_link(id).copied() else {
                    continue;
                };
                let Node::Property { value, .. } = arb.ast().node(link.parent) else {
                    continue;
                };
                let value = *value;
                if value == id || arb.is_stale(value) {
                    continue;
                }
                let replacement = arb.ast_mut().lit_string(BYPASS);
                arb.mark_node_replaced(value, replacement);
                staged += 1;
            }
            _ => {}
        }
    }
    staged
}

fn enclosing_function_expression(arb: &Arborist, id: NodeId) -> Option<NodeId> {
    let mut current = id;
    while let Some(parent) = arb.indexes().parent(current) {
        if arb.ast().kind(parent) == NodeKind::FunctionExpression {
            return Some(parent);
        }
        current = parent;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_new_state_worker() {
        let mut arb = Arborist::parse(
            "var trap = function () { var s = 'newState'; while (true) { } };",
        )
        .unwrap();
        let mut ctx = RuleCtx::new();
        assert_eq!(bypass_debug_traps(&mut arb, &mut ctx), 1);
        arb.commit().unwrap();
        assert_eq!(
            arb.emit(),
            "var trap = 'function () {return \"bypassed!\"}';\n"
        );
    }

    #[test]
    fn replaces_remove_cookie_value() {
        let mut arb = Arborist::parse(
            "var cfg = { 'removeCookie': function () { return 'dev'; } };",
        )
        .unwrap();
        let mut ctx = RuleCtx::new();
        assert_eq!(bypass_debug_traps(&mut arb, &mut ctx), 1);
        arb.commit().unwrap();
        let out = arb.emit();
        assert!(
            out.contains("'removeCookie': 'function () {return \"bypassed!\"}'"),
            "unexpected output: {out}"
        );
    }
}
