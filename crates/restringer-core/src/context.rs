//! Context extraction: the minimal transitive set of top-level statements
//! needed to evaluate expressions involving a declaration, fed to a
//! sandbox ahead of the fragment of interest.

use crate::arborist::Arborist;
use restringer_parser::ast::{Node, NodeId, NodeKind};
use restringer_parser::emit_statement;
use rustc_hash::FxHashSet;

/// Collects the self-contained slice for `node` (typically a declaration).
///
/// Closure rules, per design:
/// 1. seed with the innermost enclosing top-level statement;
/// 2. add the top-level statement of every declaration referenced from
///    the set;
/// 3. add statements whose assignments/updates mutate identifiers already
///    declared inside the set;
/// 4. unless `include_call_siblings`, statements that merely *call* into
///    the set (plain call expression statements) are excluded: they are
///    consumers, not context, and would re-enter the site being resolved.
///
/// Returned in original source order; may be empty when `node` has no
/// enclosing statement.
pub fn declaration_with_context(
    arb: &Arborist,
    node: NodeId,
    include_call_siblings: bool,
) -> Vec<NodeId> {
    let ast = arb.ast();
    let indexes = arb.indexes();

    let Some(seed) = indexes.top_level_statement(ast, node) else {
        return Vec::new();
    };

    let mut set: FxHashSet<NodeId> = FxHashSet::default();
    let mut worklist = vec![seed];

    while let Some(stmt) = worklist.pop() {
        if !set.insert(stmt) {
            continue;
        }

        // Rule 2: declarations referenced from this statement.
        let mut wanted = Vec::new();
        ast.walk(stmt, &mut |id, node| {
            if let Node::Identifier { .. } = node {
                if let Some(decl) = indexes.decl_of(id) {
                    wanted.push(decl);
                }
            }
        });
        for decl in wanted {
            if let Some(decl_stmt) = indexes.top_level_statement(ast, decl) {
                if decl_stmt != stmt && !set.contains(&decl_stmt) {
                    worklist.push(decl_stmt);
                }
            }
        }

        // Rule 3: mutations of identifiers declared inside the set.
        let mut tracked: FxHashSet<NodeId> = FxHashSet::default();
        for member in &set {
            ast.walk(*member, &mut |id, node| {
                if matches!(node, Node::Identifier { .. }) && indexes.is_declaration(id) {
                    tracked.insert(id);
                }
            });
        }
        for kind in [NodeKind::AssignmentExpression, NodeKind::UpdateExpression] {
            for candidate in indexes.of_kind(kind) {
                let target = match ast.node(*candidate) {
                    Node::AssignmentExpression { left, .. } => *left,
                    Node::UpdateExpression { argument, .. } => *argument,
                    _ => continue,
                };
                let bound = match ast.node(target) {
                    Node::Identifier { .. } => indexes.decl_of(target),
                    // `a.b = …` mutates `a`.
                    Node::MemberExpression { object, .. } => match ast.node(*object) {
                        Node::Identifier { .. } => indexes.decl_of(*object),
                        _ => None,
                    },
                    _ => None,
                };
                let Some(decl) = bound else { continue };
                if !tracked.contains(&decl) {
                    continue;
                }
                let Some(stmt) = indexes.top_level_statement(ast, *candidate) else {
                    continue;
                };
                if set.contains(&stmt) {
                    continue;
                }
                if !include_call_siblings && is_call_only_statement(arb, stmt) {
                    continue;
                }
                worklist.push(stmt);
            }
        }
    }

    let mut ordered: Vec<NodeId> = set.into_iter().collect();
    ordered.sort_by_key(|id| ast.span(*id).start);
    ordered
}

/// Context for evaluating an arbitrary expression: the closure over the
/// declarations its identifiers resolve to, *without* the expression's
/// own enclosing statement (which usually is the rewrite site itself).
pub fn context_for_expression(arb: &Arborist, expr: NodeId) -> Vec<NodeId> {
    let ast = arb.ast();
    let indexes = arb.indexes();
    let own = indexes.top_level_statement(ast, expr);

    let mut seeds = Vec::new();
    ast.walk(expr, &mut |id, node| {
        if let Node::Identifier { .. } = node {
            if let Some(decl) = indexes.decl_of(id) {
                seeds.push(decl);
            }
        }
    });

    let mut set: FxHashSet<NodeId> = FxHashSet::default();
    let mut ordered = Vec::new();
    for decl in seeds {
        for stmt in declaration_with_context(arb, decl, false) {
            if Some(stmt) != own && set.insert(stmt) {
                ordered.push(stmt);
            }
        }
    }
    ordered.sort_by_key(|id| ast.span(*id).start);
    ordered
}

/// An `ExpressionStatement` that is nothing but a call (or a sequence of
/// calls): a consumer of the declarations, not part of their setup.
fn is_call_only_statement(arb: &Arborist, stmt: NodeId) -> bool {
    let ast = arb.ast();
    let Node::ExpressionStatement { expression } = ast.node(stmt) else {
        return false;
    };
    fn calls_only(arb: &Arborist, id: NodeId) -> bool {
        match arb.ast().node(id) {
            Node::CallExpression { .. } => true,
            Node::SequenceExpression { expressions } => {
                expressions.iter().all(|e| calls_only(arb, *e))
            }
            _ => false,
        }
    }
    calls_only(arb, *expression)
}

/// Emits the context statements as a source prelude for a sandbox.
pub fn context_source(arb: &Arborist, statements: &[NodeId]) -> String {
    statements
        .iter()
        .map(|s| emit_statement(arb.ast(), *s))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arborist::Arborist;

    fn context_of_name(source: &str, name: &str) -> Vec<String> {
        let arb = Arborist::parse(source).expect("parse failure");
        let ast = arb.ast();
        let decl = arb
            .indexes()
            .of_kind(NodeKind::Identifier)
            .iter()
            .copied()
            .find(|id| ast.ident_name(*id) == Some(name) && arb.indexes().is_declaration(*id))
            .expect("declaration not found");
        declaration_with_context(&arb, decl, false)
            .into_iter()
            .map(|s| emit_statement(ast, s))
            .collect()
    }

    #[test]
    fn pulls_transitive_declarations() {
        let ctx = context_of_name(
            "var key = 'k'; var table = [key]; function get(i) { return table[i]; } get(0);",
            "get",
        );
        let joined = ctx.join("\n");
        assert!(joined.contains("var key"), "missing transitive decl: {joined}");
        assert!(joined.contains("var table"), "missing direct decl: {joined}");
        assert!(joined.contains("function get"), "missing seed: {joined}");
        assert!(
            !joined.contains("get(0)"),
            "call site must stay excluded: {joined}"
        );
    }

    #[test]
    fn pulls_mutations_of_tracked_names() {
        let ctx = context_of_name(
            "var state = 0; state = 41; function read() { return state + 1; }",
            "read",
        );
        let joined = ctx.join("\n");
        assert!(joined.contains("state = 41"), "mutation missing: {joined}");
    }

    #[test]
    fn emits_in_source_order() {
        let ctx = context_of_name(
            "var a = 1; var b = a + 1; function f() { return b; }",
            "f",
        );
        assert!(ctx[0].contains("var a"));
        assert!(ctx[1].contains("var b"));
        assert!(ctx[2].contains("function f"));
    }
}
