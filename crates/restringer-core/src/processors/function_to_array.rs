//! Function-to-array bundle: wrappers whose sole behavior is returning a
//! fixed array literal are replaced at every zero-argument call site, so
//! the indexing rules can see through them.

use super::{ObfuscationKind, Processor};
use crate::arborist::Arborist;
use crate::rules::{NamedRule, RuleCtx};
use restringer_parser::ast::{Node, NodeKind};

pub fn processor() -> Processor {
    Processor {
        kind: ObfuscationKind::FunctionToArray,
        preprocessors: vec![NamedRule {
            name: "resolve-array-returning-functions",
            run: resolve_array_returning_functions,
        }],
        postprocessors: vec![NamedRule {
            name: "remove-dead-declarations",
            run: crate::rules::variables::remove_dead_declarations,
        }],
    }
}

/// Cheap textual pre-check used by the detector.
pub fn source_has_array_factory(source: &str) -> bool {
    source.contains("return [") && source.contains("()")
}

/// `function table() { return ['a', 'b', …]; }` → every `table()` call
/// becomes a clone of the array literal.
pub fn resolve_array_returning_functions(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    for declaration in arb.live_of_kind(NodeKind::FunctionDeclaration) {
        let Node::FunctionDeclaration {
            id: name,
            params,
            body,
        } = arb.ast().node(declaration)
        else {
            continue;
        };
        if !params.is_empty() {
            continue;
        }
        let (name, body) = (*name, *body);
        let Node::BlockStatement { body: stmts } = arb.ast().node(body) else {
            continue;
        };
        if stmts.len() != 1 {
            continue;
        }
        let Node::ReturnStatement {
            argument: Some(array),
        } = arb.ast().node(stmts[0])
        else {
            continue;
        };
        let array = *array;
        let Node::ArrayExpression { elements } = arb.ast().node(array) else {
            continue;
        };
        let literal_only = elements
            .iter()
            .all(|e| e.is_some_and(|e| arb.ast().literal(e).is_some()));
        if !literal_only {
            continue;
        }
        for use_id in arb.indexes().refs_of(name).to_vec() {
            let Some(link) = arb.indexes().parent_link(use_id).copied() else {
                continue;
            };
            if link.key != "callee" || arb.ast().kind(link.parent) != NodeKind::CallExpression {
                continue;
            }
            let call = link.parent;
            if arb.is_stale(call) || arb.indexes().is_ancestor(declaration, call) {
                continue;
            }
            let Node::CallExpression { arguments, .. } = arb.ast().node(call) else {
                continue;
            };
            if !arguments.is_empty() {
                continue;
            }
            let replacement = arb.ast_mut().clone_subtree(array);
            arb.mark_node_replaced(call, replacement);
            staged += 1;
        }
    }
    staged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inlines_array_factories() {
        let mut arb = Arborist::parse(
            "function table() { return ['a', 'b']; } use(table()[1]);",
        )
        .unwrap();
        let mut ctx = RuleCtx::new();
        assert_eq!(resolve_array_returning_functions(&mut arb, &mut ctx), 1);
        arb.commit().unwrap();
        assert!(arb.emit().contains("use(['a', 'b'][1]);"));
    }

    #[test]
    fn dynamic_factories_are_ignored() {
        let mut arb = Arborist::parse(
            "function table() { return [now()]; } use(table());",
        )
        .unwrap();
        let mut ctx = RuleCtx::new();
        assert_eq!(resolve_array_returning_functions(&mut arb, &mut ctx), 0);
    }
}
