//! Safe control-flow simplification: empty statements, redundant blocks,
//! sequence extraction, deterministic branches, switch linearization.

use super::{is_side_effect_free, static_truthiness, RuleCtx};
use crate::arborist::Arborist;
use restringer_parser::ast::{
    AssignOp, LogicalOp, Node, NodeId, NodeKind, UnaryOp,
};
use restringer_parser::Span;
use rustc_hash::FxHashSet;

/// Empty statements in statement lists are dropped (control-flow bodies
/// keep theirs, so the tree stays syntactically valid through `remove`).
pub fn normalize_empty_statements(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    for id in arb.live_of_kind(NodeKind::EmptyStatement) {
        let Some(link) = arb.indexes().parent_link(id) else {
            continue;
        };
        let in_list = matches!(
            (arb.ast().kind(link.parent), link.key),
            (NodeKind::Program, "body")
                | (NodeKind::BlockStatement, "body")
                | (NodeKind::SwitchCase, "consequent")
        );
        if in_list {
            arb.mark_node(id);
            staged += 1;
        }
    }
    staged
}

/// A block directly inside a block (or the program) with no lexical
/// declarations adds nothing; its statements are lifted into the parent.
pub fn flatten_redundant_blocks(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    let mut spliced: FxHashSet<NodeId> = FxHashSet::default();
    for id in arb.live_of_kind(NodeKind::BlockStatement) {
        if arb.is_stale(id) {
            continue;
        }
        let Some(link) = arb.indexes().parent_link(id).copied() else {
            continue;
        };
        let liftable = matches!(
            (arb.ast().kind(link.parent), link.key),
            (NodeKind::Program, "body") | (NodeKind::BlockStatement, "body")
        );
        if !liftable {
            continue;
        }
        let Node::BlockStatement { body } = arb.ast().node(id) else {
            continue;
        };
        let body = body.clone();
        let scoped = body.iter().any(|s| {
            matches!(
                arb.ast().node(*s),
                Node::VariableDeclaration {
                    kind: restringer_parser::ast::DeclKind::Let
                        | restringer_parser::ast::DeclKind::Const,
                    ..
                } | Node::FunctionDeclaration { .. }
                    | Node::ClassDeclaration { .. }
            )
        });
        if scoped {
            continue;
        }
        if super::splice_statement(arb, &mut spliced, id, body) {
            staged += 1;
        }
    }
    staged
}

/// `a(), b(), c();` becomes three statements.
pub fn split_sequence_statements(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    let mut spliced: FxHashSet<NodeId> = FxHashSet::default();
    for id in arb.live_of_kind(NodeKind::ExpressionStatement) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::ExpressionStatement { expression } = arb.ast().node(id) else {
            continue;
        };
        let Node::SequenceExpression { expressions } = arb.ast().node(*expression) else {
            continue;
        };
        let expressions = expressions.clone();
        let replacements: Vec<NodeId> = expressions
            .iter()
            .map(|e| arb.ast_mut().expression_statement(*e))
            .collect();
        if super::splice_statement(arb, &mut spliced, id, replacements) {
            staged += 1;
        }
    }
    staged
}

/// `return (a, b, c);` → `a; b; return c;` and `if ((a, b, c)) …` →
/// `a; b; if (c) …`.
pub fn hoist_leading_sequences(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    let mut spliced: FxHashSet<NodeId> = FxHashSet::default();

    for id in arb.live_of_kind(NodeKind::ReturnStatement) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::ReturnStatement {
            argument: Some(argument),
        } = arb.ast().node(id)
        else {
            continue;
        };
        let Node::SequenceExpression { expressions } = arb.ast().node(*argument) else {
            continue;
        };
        let expressions = expressions.clone();
        let Some((&last, leading)) = expressions.split_last() else {
            continue;
        };
        let mut replacements: Vec<NodeId> = leading
            .iter()
            .map(|e| arb.ast_mut().expression_statement(*e))
            .collect();
        let ret = arb.ast_mut().alloc(
            Node::ReturnStatement {
                argument: Some(last),
            },
            Span::SYNTHETIC,
        );
        replacements.push(ret);
        if super::splice_statement(arb, &mut spliced, id, replacements) {
            staged += 1;
        }
    }

    for id in arb.live_of_kind(NodeKind::IfStatement) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::IfStatement {
            test,
            consequent,
            alternate,
        } = arb.ast().node(id)
        else {
            continue;
        };
        let (test, consequent, alternate) = (*test, *consequent, *alternate);
        let Node::SequenceExpression { expressions } = arb.ast().node(test) else {
            continue;
        };
        let expressions = expressions.clone();
        let Some((&last, leading)) = expressions.split_last() else {
            continue;
        };
        let mut replacements: Vec<NodeId> = leading
            .iter()
            .map(|e| arb.ast_mut().expression_statement(*e))
            .collect();
        let rebuilt = arb.ast_mut().alloc(
            Node::IfStatement {
                test: last,
                consequent,
                alternate,
            },
            Span::SYNTHETIC,
        );
        replacements.push(rebuilt);
        if super::splice_statement(arb, &mut spliced, id, replacements) {
            staged += 1;
        }
    }

    staged
}

fn is_empty_branch(arb: &Arborist, id: NodeId) -> bool {
    match arb.ast().node(id) {
        Node::EmptyStatement => true,
        Node::BlockStatement { body } => body.is_empty(),
        _ => false,
    }
}

/// `if (t) {} else {}` → `t;`; `if (t) {} else A` → `if (!t) A`;
/// `if (t) A else {}` → `if (t) A`.
pub fn simplify_empty_if_branches(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    for id in arb.live_of_kind(NodeKind::IfStatement) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::IfStatement {
            test,
            consequent,
            alternate,
        } = arb.ast().node(id)
        else {
            continue;
        };
        let (test, consequent, alternate) = (*test, *consequent, *alternate);
        let consequent_empty = is_empty_branch(arb, consequent);
        let alternate_empty = alternate.map(|a| is_empty_branch(arb, a));

        match (consequent_empty, alternate_empty) {
            (true, None) | (true, Some(true)) => {
                let replacement = arb.ast_mut().expression_statement(test);
                arb.mark_node_replaced(id, replacement);
                staged += 1;
            }
            (true, Some(false)) => {
                let negated = arb.ast_mut().alloc(
                    Node::UnaryExpression {
                        op: UnaryOp::Not,
                        argument: test,
                    },
                    Span::SYNTHETIC,
                );
                let rebuilt = arb.ast_mut().alloc(
                    Node::IfStatement {
                        test: negated,
                        consequent: alternate.expect("alternate checked"),
                        alternate: None,
                    },
                    Span::SYNTHETIC,
                );
                arb.mark_node_replaced(id, rebuilt);
                staged += 1;
            }
            (false, Some(true)) => {
                let rebuilt = arb.ast_mut().alloc(
                    Node::IfStatement {
                        test,
                        consequent,
                        alternate: None,
                    },
                    Span::SYNTHETIC,
                );
                arb.mark_node_replaced(id, rebuilt);
                staged += 1;
            }
            _ => {}
        }
    }
    staged
}

/// `if (true) A else B` → `A` (JS truthiness on statically decidable
/// tests). Both branches empty ⇒ the statement disappears.
pub fn resolve_literal_if_statements(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    for id in arb.live_of_kind(NodeKind::IfStatement) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::IfStatement {
            test,
            consequent,
            alternate,
        } = arb.ast().node(id)
        else {
            continue;
        };
        let (test, consequent, alternate) = (*test, *consequent, *alternate);
        let Some(truthy) = static_truthiness(arb, test) else {
            continue;
        };
        let taken = if truthy { Some(consequent) } else { alternate };
        match taken {
            Some(branch) if !is_empty_branch(arb, branch) => {
                arb.mark_node_replaced(id, branch);
                staged += 1;
            }
            _ => {
                arb.mark_node(id);
                staged += 1;
            }
        }
    }
    staged
}

/// `'x' ? a : b` → `a`; deterministic conditional expressions collapse to
/// the selected branch.
pub fn resolve_literal_conditionals(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    for id in arb.live_of_kind(NodeKind::ConditionalExpression) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::ConditionalExpression {
            test,
            consequent,
            alternate,
        } = arb.ast().node(id)
        else {
            continue;
        };
        let (test, consequent, alternate) = (*test, *consequent, *alternate);
        let Some(truthy) = static_truthiness(arb, test) else {
            continue;
        };
        let taken = if truthy { consequent } else { alternate };
        arb.mark_node_replaced(id, taken);
        staged += 1;
    }
    staged
}

/// Short-circuit truth table on `if` tests with one deterministic
/// operand: `if (truthy && x)` → `if (x)`, `if (truthy || x)` →
/// `if (truthy)`, etc. The dropped operand must be side-effect-free.
pub fn reduce_literal_logical_tests(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    for id in arb.live_of_kind(NodeKind::IfStatement) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::IfStatement { test, .. } = arb.ast().node(id) else {
            continue;
        };
        let test = *test;
        let Node::LogicalExpression { op, left, right } = arb.ast().node(test) else {
            continue;
        };
        let (op, left, right) = (*op, *left, *right);

        let reduced = match (op, static_truthiness(arb, left), static_truthiness(arb, right)) {
            // The left operand decides on its own.
            (LogicalOp::And, Some(false), _) | (LogicalOp::Or, Some(true), _) => Some(left),
            // The left operand always defers to the right.
            (LogicalOp::And, Some(true), _) | (LogicalOp::Or, Some(false), _) => Some(right),
            // A deterministic right operand can only be dropped when the
            // left side carries no effects.
            (LogicalOp::And, None, Some(true)) | (LogicalOp::Or, None, Some(false))
                if is_side_effect_free(arb, left) =>
            {
                Some(left)
            }
            (LogicalOp::And, None, Some(false)) if is_side_effect_free(arb, left) => {
                Some(right)
            }
            (LogicalOp::Or, None, Some(true)) if is_side_effect_free(arb, left) => Some(right),
            _ => None,
        };
        if let Some(kept) = reduced {
            arb.mark_node_replaced(test, kept);
            staged += 1;
        }
    }
    staged
}

/// `a && b();` → `if (a) b();` and `a || b();` → `if (!a) b();`.
pub fn rewrite_logical_expression_statements(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    for id in arb.live_of_kind(NodeKind::ExpressionStatement) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::ExpressionStatement { expression } = arb.ast().node(id) else {
            continue;
        };
        let Node::LogicalExpression { op, left, right } = arb.ast().node(*expression) else {
            continue;
        };
        let (op, left, right) = (*op, *left, *right);
        let test = match op {
            LogicalOp::And => left,
            LogicalOp::Or => arb.ast_mut().alloc(
                Node::UnaryExpression {
                    op: UnaryOp::Not,
                    argument: left,
                },
                Span::SYNTHETIC,
            ),
            LogicalOp::Nullish => continue,
        };
        let consequent = arb.ast_mut().expression_statement(right);
        let rebuilt = arb.ast_mut().alloc(
            Node::IfStatement {
                test,
                consequent,
                alternate: None,
            },
            Span::SYNTHETIC,
        );
        arb.mark_node_replaced(id, rebuilt);
        staged += 1;
    }
    staged
}

/// Flattens switch dispatchers whose discriminant is a literal-initialized
/// variable reassigned only by literal writes inside the cases: the case
/// chain is traced statically and replaced by the straight-line
/// statements. Bounded at 50 steps.
pub fn linearize_constant_switches(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    const MAX_STEPS: usize = 50;
    let mut staged = 0;

    'switches: for id in arb.live_of_kind(NodeKind::SwitchStatement) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::SwitchStatement {
            discriminant,
            cases,
        } = arb.ast().node(id)
        else {
            continue;
        };
        let (discriminant, cases) = (*discriminant, cases.clone());
        let Some(decl) = arb.indexes().decl_of(discriminant) else {
            continue;
        };
        let Some(declarator) = arb.indexes().parent(decl) else {
            continue;
        };
        let Node::VariableDeclarator {
            init: Some(init), ..
        } = arb.ast().node(declarator)
        else {
            continue;
        };
        let Some(initial) = arb.ast().literal(*init).cloned() else {
            continue;
        };

        // Every write to the discriminant must be `s = <literal>` inside
        // this switch.
        for r in arb.indexes().refs_of(decl) {
            if !arb.indexes().is_write_target(arb.ast(), *r) {
                continue;
            }
            if !arb.indexes().is_ancestor(id, *r) {
                continue 'switches;
            }
            let Some(assignment) = arb.indexes().parent(*r) else {
                continue 'switches;
            };
            let Node::AssignmentExpression {
                op: AssignOp::Assign,
                right,
                ..
            } = arb.ast().node(assignment)
            else {
                continue 'switches;
            };
            if arb.ast().literal(*right).is_none() {
                continue 'switches;
            }
        }

        let mut state = initial;
        let mut collected: Vec<NodeId> = Vec::new();
        let mut steps = 0;
        'trace: loop {
            steps += 1;
            if steps > MAX_STEPS {
                continue 'switches;
            }
            // Find the case matching the current state.
            let mut selected = None;
            for case in &cases {
                let Node::SwitchCase {
                    test: Some(test), ..
                } = arb.ast().node(*case)
                else {
                    continue;
                };
                if arb.ast().literal(*test) == Some(&state) {
                    selected = Some(*case);
                    break;
                }
            }
            let Some(case) = selected else {
                break 'trace;
            };
            let Node::SwitchCase { consequent, .. } = arb.ast().node(case) else {
                break 'trace;
            };
            let consequent = consequent.clone();
            let mut next_state = None;
            let mut saw_break = false;
            for stmt in consequent {
                match arb.ast().node(stmt) {
                    Node::BreakStatement { label: None } => {
                        saw_break = true;
                        break;
                    }
                    Node::ExpressionStatement { expression } => {
                        // A literal write to the discriminant is the state
                        // transition; it is consumed, not emitted.
                        if let Node::AssignmentExpression {
                            op: AssignOp::Assign,
                            left,
                            right,
                        } = arb.ast().node(*expression)
                        {
                            if arb.indexes().decl_of(*left) == Some(decl) {
                                next_state = arb.ast().literal(*right).cloned();
                                continue;
                            }
                        }
                        collected.push(stmt);
                    }
                    _ => collected.push(stmt),
                }
            }
            match (saw_break, next_state) {
                (true, Some(next)) => state = next,
                (true, None) => break 'trace,
                // Falling off the end of a case without a break is a
                // shape this trace cannot follow faithfully.
                (false, _) => continue 'switches,
            }
        }

        if collected.is_empty() {
            continue;
        }
        let cloned: Vec<NodeId> = collected
            .iter()
            .map(|s| arb.ast_mut().clone_subtree(*s))
            .collect();
        let block = arb.ast_mut().block(cloned);
        arb.mark_node_replaced(id, block);
        staged += 1;
    }
    staged
}

/// `f.call(this, …)` → `f(…)`; `f.apply(this, [a, b])` → `f(a, b)`.
/// Skipped when the receiver is `Function` or a function literal.
pub fn simplify_call_and_apply(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    for id in arb.live_of_kind(NodeKind::CallExpression) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::CallExpression { callee, arguments } = arb.ast().node(id) else {
            continue;
        };
        let (callee, arguments) = (*callee, arguments.clone());
        let Node::MemberExpression {
            object,
            property,
            computed: false,
        } = arb.ast().node(callee)
        else {
            continue;
        };
        let (object, property) = (*object, *property);
        let Some(method) = arb.ast().ident_name(property) else {
            continue;
        };
        if method != "call" && method != "apply" {
            continue;
        }
        if arb.ast().ident_name(object) == Some("Function")
            || matches!(
                arb.ast().kind(object),
                NodeKind::FunctionExpression | NodeKind::ArrowFunctionExpression
            )
        {
            continue;
        }
        if arguments.first().map(|a| arb.ast().kind(*a)) != Some(NodeKind::ThisExpression) {
            continue;
        }
        let direct_args: Vec<NodeId> = if method == "call" {
            arguments[1..].to_vec()
        } else {
            match arguments.get(1) {
                None => Vec::new(),
                Some(second) => match arb.ast().node(*second) {
                    Node::ArrayExpression { elements }
                        if elements.iter().all(Option::is_some) =>
                    {
                        elements.iter().map(|e| e.expect("checked")).collect()
                    }
                    _ => continue,
                },
            }
        };
        if arguments.len() > 2 && method == "apply" {
            continue;
        }
        let rebuilt = arb.ast_mut().alloc(
            Node::CallExpression {
                callee: object,
                arguments: direct_args,
            },
            Span::SYNTHETIC,
        );
        arb.mark_node_replaced(id, rebuilt);
        staged += 1;
    }
    staged
}

/// `let a = 1, b = 2;` → `let a = 1; let b = 2;` (not in for-loop heads).
pub fn split_variable_declarators(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    let mut spliced: FxHashSet<NodeId> = FxHashSet::default();
    for id in arb.live_of_kind(NodeKind::VariableDeclaration) {
        if arb.is_stale(id) {
            continue;
        }
        let Node::VariableDeclaration { kind, declarations } = arb.ast().node(id) else {
            continue;
        };
        if declarations.len() < 2 {
            continue;
        }
        let (kind, declarations) = (*kind, declarations.clone());
        let Some(link) = arb.indexes().parent_link(id) else {
            continue;
        };
        let in_list = matches!(
            (arb.ast().kind(link.parent), link.key),
            (NodeKind::Program, "body")
                | (NodeKind::BlockStatement, "body")
                | (NodeKind::SwitchCase, "consequent")
        );
        if !in_list {
            continue;
        }
        let replacements: Vec<NodeId> = declarations
            .iter()
            .map(|d| {
                arb.ast_mut().alloc(
                    Node::VariableDeclaration {
                        kind,
                        declarations: vec![*d],
                    },
                    Span::SYNTHETIC,
                )
            })
            .collect();
        if super::splice_statement(arb, &mut spliced, id, replacements) {
            staged += 1;
        }
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
        if rule(&mut arb, &mut ctx) > 0 {
            arb.commit().expect("commit failure");
        }
        arb.emit()
    }

    #[test]
    fn removes_stray_empty_statements() {
        assert_eq!(
            run("a();;; b();", super::normalize_empty_statements),
            "a();\nb();\n"
        );
        assert_eq!(
            run("while (x()) ;", super::normalize_empty_statements),
            "while (x()) ;\n"
        );
    }

    #[test]
    fn flattens_redundant_blocks() {
        assert_eq!(
            run("{ a(); b(); } c();", super::flatten_redundant_blocks),
            "a();\nb();\nc();\n"
        );
        // A block with lexical declarations keeps its scope.
        assert_eq!(
            run("{ let x = 1; f(x); }", super::flatten_redundant_blocks),
            "{\n    let x = 1;\n    f(x);\n}\n"
        );
    }

    #[test]
    fn splits_sequences_into_statements() {
        assert_eq!(
            run("a(), b(), c();", super::split_sequence_statements),
            "a();\nb();\nc();\n"
        );
    }

    #[test]
    fn hoists_sequences_out_of_returns_and_ifs() {
        assert_eq!(
            run(
                "function f() { return a(), b(), c(); }",
                super::hoist_leading_sequences
            ),
            "function f() {\n    a();\n    b();\n    return c();\n}\n"
        );
        assert_eq!(
            run("if ((a(), b())) go();", super::hoist_leading_sequences),
            "a();\nif (b()) go();\n"
        );
    }

    #[test]
    fn simplifies_empty_branches() {
        assert_eq!(
            run("if (t()) { } else { }", super::simplify_empty_if_branches),
            "t();\n"
        );
        assert_eq!(
            run("if (t) { } else { go(); }", super::simplify_empty_if_branches),
            "if (!t) {\n    go();\n}\n"
        );
        assert_eq!(
            run("if (t) go(); else { }", super::simplify_empty_if_branches),
            "if (t) go();\n"
        );
    }

    #[test]
    fn resolves_deterministic_ifs() {
        assert_eq!(
            run("if (true) do_a(); else do_b();", super::resolve_literal_if_statements),
            "do_a();\n"
        );
        assert_eq!(
            run("if (0) do_a(); else do_b();", super::resolve_literal_if_statements),
            "do_b();\n"
        );
        assert_eq!(
            run("if ('') do_a();", super::resolve_literal_if_statements),
            ""
        );
    }

    #[test]
    fn resolves_literal_conditionals() {
        assert_eq!(
            run("x = 'a' ? 1 : 2;", super::resolve_literal_conditionals),
            "x = 1;\n"
        );
    }

    #[test]
    fn reduces_literal_logical_tests() {
        assert_eq!(
            run("if (1 && ready()) go();", super::reduce_literal_logical_tests),
            "if (ready()) go();\n"
        );
        assert_eq!(
            run("if (flag && []) go();", super::reduce_literal_logical_tests),
            "if (flag) go();\n"
        );
        // Effectful left side cannot be dropped for a right-side decision.
        assert_eq!(
            run("if (step() || 1) go();", super::reduce_literal_logical_tests),
            "if (step() || 1) go();\n"
        );
    }

    #[test]
    fn rewrites_logical_statements_to_ifs() {
        assert_eq!(
            run("ready && go();", super::rewrite_logical_expression_statements),
            "if (ready) go();\n"
        );
        assert_eq!(
            run("done || retry();", super::rewrite_logical_expression_statements),
            "if (!done) retry();\n"
        );
    }

    #[test]
    fn linearizes_switch_dispatchers() {
        let out = run(
            "var s = 0; switch (s) { case 0: a(); s = 1; break; case 1: b(); break; }",
            super::linearize_constant_switches,
        );
        assert_eq!(out, "var s = 0;\n{\n    a();\n    b();\n}\n");
    }

    #[test]
    fn switch_with_external_writes_is_left_alone() {
        let source =
            "var s = 0; bump(); switch (s) { case 0: a(); break; } function bump() { s = 9; }";
        let out = run(source, super::linearize_constant_switches);
        assert!(out.contains("switch"), "must not linearize: {out}");
    }

    #[test]
    fn simplifies_call_and_apply() {
        assert_eq!(
            run("f.call(this, 1, 2);", super::simplify_call_and_apply),
            "f(1, 2);\n"
        );
        assert_eq!(
            run("f.apply(this, [1, 2]);", super::simplify_call_and_apply),
            "f(1, 2);\n"
        );
        assert_eq!(
            run("f.apply(this, args);", super::simplify_call_and_apply),
            "f.apply(this, args);\n"
        );
    }

    #[test]
    fn splits_chained_declarators() {
        assert_eq!(
            run("let a = 1, b = 2;", super::split_variable_declarators),
            "let a = 1;\nlet b = 2;\n"
        );
        assert_eq!(
            run(
                "for (var i = 0, n = 9; i < n; i++) f(i);",
                super::split_variable_declarators
            ),
            "for (var i = 0, n = 9; i < n; i++) f(i);\n"
        );
    }
}
