//! Safe function-unwrapping rules: value shells, proxy calls, IIFEs,
//! `Function` constructor and literal `eval` resolution.

use super::{captures_function_locals, import_fragment, replace_identifier_use, ImportedFragment, RuleCtx};
use crate::arborist::Arborist;
use restringer_parser::ast::{DeclKind, Node, NodeId, NodeKind};
use restringer_parser::Span;
use rustc_hash::FxHashSet;

/// The single `return` argument of a function body, if that is the whole
/// body.
fn sole_return_argument(arb: &Arborist, body: NodeId) -> Option<NodeId> {
    let Node::BlockStatement { body } = arb.ast().node(body) else {
        return None;
    };
    if body.len() != 1 {
        return None;
    }
    match arb.ast().node(body[0]) {
        Node::ReturnStatement {
            argument: Some(argument),
        } => Some(*argument),
        _ => None,
    }
}

/// Literal-or-identifier returned from a shell, checked against capture
/// of the shell's own locals.
fn shell_value(arb: &Arborist, function: NodeId, body: NodeId) -> Option<NodeId> {
    let value = sole_return_argument(arb, body)?;
    match arb.ast().node(value) {
        Node::Literal { .. } | Node::Identifier { .. } => {
            if captures_function_locals(arb, value, function) {
                None
            } else {
                Some(value)
            }
        }
        _ => None,
    }
}

/// `function f() { return L_or_id; }` → every *call* `f(…)` becomes the
/// value; other references to `f` stay.
pub fn replace_value_shell_functions(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    for declaration in arb.live_of_kind(NodeKind::FunctionDeclaration) {
        let Node::FunctionDeclaration { id: name, body, .. } = arb.ast().node(declaration) else {
            continue;
        };
        let (name, body) = (*name, *body);
        let Some(value) = shell_value(arb, declaration, body) else {
            continue;
        };
        for use_id in arb.indexes().refs_of(name).to_vec() {
            let Some(link) = arb.indexes().parent_link(use_id).copied() else {
                continue;
            };
            if link.key != "callee" || arb.ast().kind(link.parent) != NodeKind::CallExpression {
                continue;
            }
            if arb.is_stale(link.parent) {
                continue;
            }
            let replacement = arb.ast_mut().clone_subtree(value);
            arb.mark_node_replaced(link.parent, replacement);
            staged += 1;
        }
    }
    staged
}

/// `(function () { return L_or_id; })()` with zero arguments → the value.
pub fn replace_value_shell_iifes(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    for call in arb.live_of_kind(NodeKind::CallExpression) {
        if arb.is_stale(call) {
            continue;
        }
        let Node::CallExpression { callee, arguments } = arb.ast().node(call) else {
            continue;
        };
        if !arguments.is_empty() {
            continue;
        }
        let callee = *callee;
        let value = match arb.ast().node(callee) {
            Node::FunctionExpression { body, .. } => shell_value(arb, callee, *body),
            Node::ArrowFunctionExpression {
                body,
                expression: true,
                ..
            } => match arb.ast().node(*body) {
                Node::Literal { .. } | Node::Identifier { .. } => {
                    if captures_function_locals(arb, *body, callee) {
                        None
                    } else {
                        Some(*body)
                    }
                }
                _ => None,
            },
            Node::ArrowFunctionExpression {
                body,
                expression: false,
                ..
            } => shell_value(arb, callee, *body),
            _ => None,
        };
        let Some(value) = value else { continue };
        let replacement = arb.ast_mut().clone_subtree(value);
        arb.mark_node_replaced(call, replacement);
        staged += 1;
    }
    staged
}

/// `const f = () => g;` / `function f() { return g; }` used as `f()` →
/// `g`, so `f()(args)` collapses to `g(args)`.
pub fn unwrap_calls_returning_identifiers(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    for declarator in arb.live_of_kind(NodeKind::VariableDeclarator) {
        let Node::VariableDeclarator {
            id: name,
            init: Some(init),
        } = arb.ast().node(declarator)
        else {
            continue;
        };
        let (name, init) = (*name, *init);
        let returned = match arb.ast().node(init) {
            Node::ArrowFunctionExpression {
                body,
                expression: true,
                ..
            } => match arb.ast().node(*body) {
                Node::Identifier { .. } if !captures_function_locals(arb, *body, init) => {
                    Some(*body)
                }
                _ => None,
            },
            Node::FunctionExpression { body, .. } => match shell_value(arb, init, *body) {
                Some(v) if arb.ast().kind(v) == NodeKind::Identifier => Some(v),
                _ => None,
            },
            _ => None,
        };
        let Some(returned) = returned else { continue };
        if arb.indexes().references_modified(arb.ast(), name) {
            continue;
        }
        for use_id in arb.indexes().refs_of(name).to_vec() {
            let Some(link) = arb.indexes().parent_link(use_id).copied() else {
                continue;
            };
            if link.key != "callee" || arb.ast().kind(link.parent) != NodeKind::CallExpression {
                continue;
            }
            let Node::CallExpression { arguments, .. } = arb.ast().node(link.parent) else {
                continue;
            };
            if !arguments.is_empty() || arb.is_stale(link.parent) {
                continue;
            }
            let replacement = arb.ast_mut().clone_subtree(returned);
            arb.mark_node_replaced(link.parent, replacement);
            staged += 1;
        }
    }
    staged
}

/// `function op(a, b) { return a <op> b; }` → calls inline the operator,
/// operand counts enforced.
pub fn inline_operator_wrappers(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    enum Wrapper {
        Binary(restringer_parser::ast::BinaryOp),
        Logical(restringer_parser::ast::LogicalOp),
        Unary(restringer_parser::ast::UnaryOp),
    }

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
        let (name, params, body) = (*name, params.clone(), *body);
        let Some(returned) = sole_return_argument(arb, body) else {
            continue;
        };

        let param_matches = |slot: NodeId, param: NodeId| -> bool {
            arb.indexes().decl_of(slot) == Some(param)
        };

        let wrapper = match arb.ast().node(returned) {
            Node::BinaryExpression { op, left, right } if params.len() == 2 => {
                if param_matches(*left, params[0]) && param_matches(*right, params[1]) {
                    Some((Wrapper::Binary(*op), 2))
                } else {
                    None
                }
            }
            Node::LogicalExpression { op, left, right } if params.len() == 2 => {
                if param_matches(*left, params[0]) && param_matches(*right, params[1]) {
                    Some((Wrapper::Logical(*op), 2))
                } else {
                    None
                }
            }
            Node::UnaryExpression { op, argument } if params.len() == 1 => {
                if param_matches(*argument, params[0]) {
                    Some((Wrapper::Unary(*op), 1))
                } else {
                    None
                }
            }
            _ => None,
        };
        let Some((wrapper, arity)) = wrapper else { continue };

        for use_id in arb.indexes().refs_of(name).to_vec() {
            let Some(link) = arb.indexes().parent_link(use_id).copied() else {
                continue;
            };
            if link.key != "callee" || arb.ast().kind(link.parent) != NodeKind::CallExpression {
                continue;
            }
            let call = link.parent;
            if arb.is_stale(call) {
                continue;
            }
            let Node::CallExpression { arguments, .. } = arb.ast().node(call) else {
                continue;
            };
            if arguments.len() != arity
                || arguments
                    .iter()
                    .any(|a| arb.ast().kind(*a) == NodeKind::SpreadElement)
            {
                continue;
            }
            let arguments = arguments.clone();
            let replacement = match &wrapper {
                Wrapper::Binary(op) => {
                    let left = arb.ast_mut().clone_subtree(arguments[0]);
                    let right = arb.ast_mut().clone_subtree(arguments[1]);
                    arb.ast_mut().alloc(
                        Node::BinaryExpression {
                            op: *op,
                            left,
                            right,
                        },
                        Span::SYNTHETIC,
                    )
                }
                Wrapper::Logical(op) => {
                    let left = arb.ast_mut().clone_subtree(arguments[0]);
                    let right = arb.ast_mut().clone_subtree(arguments[1]);
                    arb.ast_mut().alloc(
                        Node::LogicalExpression {
                            op: *op,
                            left,
                            right,
                        },
                        Span::SYNTHETIC,
                    )
                }
                Wrapper::Unary(op) => {
                    let argument = arb.ast_mut().clone_subtree(arguments[0]);
                    arb.ast_mut().alloc(
                        Node::UnaryExpression { op: *op, argument },
                        Span::SYNTHETIC,
                    )
                }
            };
            arb.mark_node_replaced(call, replacement);
            staged += 1;
        }
    }
    staged
}

/// `function outer(a, b) { return inner(a, b); }` with parameters passed
/// through in order and count → uses of `outer` become `inner`.
pub fn replace_call_forwarders(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
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
        let (name, params, body) = (*name, params.clone(), *body);
        let Some(returned) = sole_return_argument(arb, body) else {
            continue;
        };
        let Node::CallExpression { callee, arguments } = arb.ast().node(returned) else {
            continue;
        };
        let (callee, arguments) = (*callee, arguments.clone());
        let Some(inner_name) = arb.ast().ident_name(callee).map(str::to_string) else {
            continue;
        };
        // The inner function must come from outside the forwarder.
        match arb.indexes().decl_of(callee) {
            Some(decl)
                if decl == name || arb.indexes().is_ancestor(declaration, decl) =>
            {
                continue
            }
            None => continue,
            _ => {}
        }
        if arguments.len() != params.len() {
            continue;
        }
        let pass_through = arguments
            .iter()
            .zip(params.iter())
            .all(|(arg, param)| arb.indexes().decl_of(*arg) == Some(*param));
        if !pass_through {
            continue;
        }
        for use_id in arb.indexes().refs_of(name).to_vec() {
            if arb.is_stale(use_id) {
                continue;
            }
            let replacement = arb.ast_mut().ident(inner_name.clone());
            replace_identifier_use(arb, use_id, replacement);
            staged += 1;
        }
    }
    staged
}

/// `function outer(p) { return (function inner() { … }).apply(this,
/// arguments); }` → `outer` becomes `inner`'s body, keeping `outer`'s
/// name, and its parameters when `inner` has none.
pub fn replace_apply_shells(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    for declaration in arb.live_of_kind(NodeKind::FunctionDeclaration) {
        if arb.is_stale(declaration) {
            continue;
        }
        let Node::FunctionDeclaration {
            id: name,
            params: outer_params,
            body,
        } = arb.ast().node(declaration)
        else {
            continue;
        };
        let (name, outer_params, body) = (*name, outer_params.clone(), *body);
        let Some(returned) = sole_return_argument(arb, body) else {
            continue;
        };
        let Node::CallExpression { callee, arguments } = arb.ast().node(returned) else {
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
        if arb.ast().ident_name(property) != Some("apply") {
            continue;
        }
        let Node::FunctionExpression {
            params: inner_params,
            body: inner_body,
            ..
        } = arb.ast().node(object)
        else {
            continue;
        };
        let (inner_params, inner_body) = (inner_params.clone(), *inner_body);
        if arguments.len() != 2 {
            continue;
        }
        let this_ok = arb.ast().kind(arguments[0]) == NodeKind::ThisExpression;
        let args_ok = arb.ast().ident_name(arguments[1]) == Some("arguments");
        if !this_ok || !args_ok {
            continue;
        }

        let new_name = arb.ast_mut().clone_subtree(name);
        let params_src = if inner_params.is_empty() {
            outer_params
        } else {
            inner_params
        };
        let new_params: Vec<NodeId> = params_src
            .iter()
            .map(|p| arb.ast_mut().clone_subtree(*p))
            .collect();
        let new_body = arb.ast_mut().clone_subtree(inner_body);
        let replacement = arb.ast_mut().alloc(
            Node::FunctionDeclaration {
                id: new_name,
                params: new_params,
                body: new_body,
            },
            Span::SYNTHETIC,
        );
        arb.mark_node_replaced(declaration, replacement);
        staged += 1;
    }
    staged
}

/// `const v = (function () { return X; })();` → `const v = X;`, plus the
/// multi-statement variant for `var` declarations, whose leading
/// statements are hoisted in front of the declaration.
pub fn unwrap_iife_initializers(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    let mut spliced: FxHashSet<NodeId> = FxHashSet::default();

    for declarator in arb.live_of_kind(NodeKind::VariableDeclarator) {
        if arb.is_stale(declarator) {
            continue;
        }
        let Node::VariableDeclarator {
            id: name,
            init: Some(init),
        } = arb.ast().node(declarator)
        else {
            continue;
        };
        let (name, init) = (*name, *init);
        let Node::CallExpression { callee, arguments } = arb.ast().node(init) else {
            continue;
        };
        if !arguments.is_empty() {
            continue;
        }
        let callee = *callee;
        let body = match arb.ast().node(callee) {
            Node::FunctionExpression { params, body, .. }
            | Node::ArrowFunctionExpression {
                params,
                body,
                expression: false,
            } if params.is_empty() => *body,
            Node::ArrowFunctionExpression {
                params,
                body,
                expression: true,
            } if params.is_empty() => {
                // Bare-expression arrow: the body *is* X.
                let body = *body;
                if captures_function_locals(arb, body, callee) {
                    continue;
                }
                let replacement = arb.ast_mut().clone_subtree(body);
                arb.mark_node_replaced(init, replacement);
                staged += 1;
                continue;
            }
            _ => continue,
        };

        let Node::BlockStatement { body: stmts } = arb.ast().node(body) else {
            continue;
        };
        let stmts = stmts.clone();
        let Some((&last, leading)) = stmts.split_last() else {
            continue;
        };
        let Node::ReturnStatement {
            argument: Some(returned),
        } = arb.ast().node(last)
        else {
            continue;
        };
        let returned = *returned;

        if leading.is_empty() {
            if captures_function_locals(arb, returned, callee) {
                continue;
            }
            let replacement = arb.ast_mut().clone_subtree(returned);
            arb.mark_node_replaced(init, replacement);
            staged += 1;
            continue;
        }

        // Multi-statement flattening: only for `var` (a replacement block
        // would hide lexical declarations), only expression statements,
        // and nothing may capture IIFE locals.
        let declaration = match arb.indexes().parent(declarator) {
            Some(d) => d,
            None => continue,
        };
        let Node::VariableDeclaration {
            kind: DeclKind::Var,
            declarations,
        } = arb.ast().node(declaration)
        else {
            continue;
        };
        if declarations.len() != 1 {
            continue;
        }
        let all_expressions = leading
            .iter()
            .all(|s| arb.ast().kind(*s) == NodeKind::ExpressionStatement);
        if !all_expressions {
            continue;
        }
        let captures = leading
            .iter()
            .chain(std::iter::once(&returned))
            .any(|s| captures_function_locals(arb, *s, callee));
        if captures {
            continue;
        }

        let mut replacement_stmts: Vec<NodeId> = Vec::new();
        for stmt in leading {
            let cloned = arb.ast_mut().clone_subtree(*stmt);
            replacement_stmts.push(cloned);
        }
        let new_name = arb.ast_mut().clone_subtree(name);
        let new_init = arb.ast_mut().clone_subtree(returned);
        let new_declarator = arb.ast_mut().alloc(
            Node::VariableDeclarator {
                id: new_name,
                init: Some(new_init),
            },
            Span::SYNTHETIC,
        );
        let new_declaration = arb.ast_mut().alloc(
            Node::VariableDeclaration {
                kind: DeclKind::Var,
                declarations: vec![new_declarator],
            },
            Span::SYNTHETIC,
        );
        replacement_stmts.push(new_declaration);
        if super::splice_statement(arb, &mut spliced, declaration, replacement_stmts) {
            staged += 1;
        }
    }
    staged
}

/// `Function.constructor('a', 'b', 'return a + b')` with literal
/// arguments → the spelled-out function expression.
pub fn resolve_function_constructor_calls(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    for call in arb.live_of_kind(NodeKind::CallExpression) {
        if arb.is_stale(call) {
            continue;
        }
        let Node::CallExpression { callee, arguments } = arb.ast().node(call) else {
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
        if arb.ast().ident_name(*property) != Some("constructor") {
            continue;
        }
        if arb.ast().ident_name(*object) != Some("Function") {
            continue;
        }
        if arguments.is_empty() {
            continue;
        }
        let mut strings = Vec::with_capacity(arguments.len());
        let mut all_literals = true;
        for arg in &arguments {
            match arb.ast().string_literal(*arg) {
                Some(s) => strings.push(s.to_string()),
                None => {
                    all_literals = false;
                    break;
                }
            }
        }
        if !all_literals {
            continue;
        }
        let (body, params) = strings.split_last().expect("nonempty checked");
        let source = format!("(function ({}) {{ {} }})", params.join(", "), body);
        let Some(ImportedFragment::Expression(function)) = import_fragment(arb, &source) else {
            continue;
        };
        if arb.ast().kind(function) != NodeKind::FunctionExpression {
            continue;
        }
        arb.mark_node_replaced(call, function);
        staged += 1;
    }
    staged
}

/// `new Function('…')()` with a literal body: the body is parsed and
/// spliced. A single expression replaces the call; a multi-statement
/// body replaces the enclosing expression statement.
pub fn parse_new_function_literals(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    let mut spliced: FxHashSet<NodeId> = FxHashSet::default();
    for call in arb.live_of_kind(NodeKind::CallExpression) {
        if arb.is_stale(call) {
            continue;
        }
        let Node::CallExpression { callee, arguments } = arb.ast().node(call) else {
            continue;
        };
        if !arguments.is_empty() {
            continue;
        }
        let callee = *callee;
        let Node::NewExpression {
            callee: ctor,
            arguments: ctor_args,
        } = arb.ast().node(callee)
        else {
            continue;
        };
        if arb.ast().ident_name(*ctor) != Some("Function")
            || arb.indexes().decl_of(*ctor).is_some()
            || ctor_args.len() != 1
        {
            continue;
        }
        let Some(body) = arb.ast().string_literal(ctor_args[0]).map(str::to_string) else {
            continue;
        };
        staged += splice_parsed_code(arb, &mut spliced, call, &body);
    }
    staged
}

/// `eval('…')` on a string literal parses and splices the payload; when
/// the eval call is itself a callee (`eval('f')(x)`), only the inner call
/// is replaced.
pub fn unfold_eval_literals(arb: &mut Arborist, _ctx: &mut RuleCtx) -> usize {
    let mut staged = 0;
    let mut spliced: FxHashSet<NodeId> = FxHashSet::default();
    for call in arb.live_of_kind(NodeKind::CallExpression) {
        if arb.is_stale(call) {
            continue;
        }
        let Node::CallExpression { callee, arguments } = arb.ast().node(call) else {
            continue;
        };
        if arguments.len() != 1 {
            continue;
        }
        let (callee, argument) = (*callee, arguments[0]);
        if arb.ast().ident_name(callee) != Some("eval")
            || arb.indexes().decl_of(callee).is_some()
        {
            continue;
        }
        let Some(code) = arb.ast().string_literal(argument).map(str::to_string) else {
            continue;
        };
        staged += splice_parsed_code(arb, &mut spliced, call, &code);
    }
    staged
}

/// Shared splicing for code recovered from strings: single expressions
/// replace the call; statement lists replace the enclosing expression
/// statement.
fn splice_parsed_code(
    arb: &mut Arborist,
    spliced: &mut FxHashSet<NodeId>,
    call: NodeId,
    code: &str,
) -> usize {
    match import_fragment(arb, code) {
        Some(ImportedFragment::Expression(expr)) => {
            arb.mark_node_replaced(call, expr);
            1
        }
        Some(ImportedFragment::Statements(stmts)) => {
            let Some(link) = arb.indexes().parent_link(call).copied() else {
                return 0;
            };
            if arb.ast().kind(link.parent) != NodeKind::ExpressionStatement
                || link.key != "expression"
            {
                return 0;
            }
            let statement = link.parent;
            if super::splice_statement(arb, spliced, statement, stmts) {
                1
            } else {
                0
            }
        }
        None => 0,
    }
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
    fn replaces_shell_function_calls() {
        assert_eq!(
            run(
                "function f() { return 42; } use(f()); keep(f);",
                super::replace_value_shell_functions
            ),
            "function f() {\n    return 42;\n}\nuse(42);\nkeep(f);\n"
        );
    }

    #[test]
    fn shell_returning_parameter_is_not_a_shell() {
        let source = "function f(x) {\n    return x;\n}\nuse(f(1));\n";
        assert_eq!(run(source, super::replace_value_shell_functions), source);
    }

    #[test]
    fn replaces_iife_shells() {
        assert_eq!(
            run("(function () { return 42; })();", super::replace_value_shell_iifes),
            "42;\n"
        );
        assert_eq!(
            run("var v = (() => 7)();", super::replace_value_shell_iifes),
            "var v = 7;\n"
        );
    }

    #[test]
    fn unwraps_calls_returning_identifiers() {
        assert_eq!(
            run(
                "const f = () => g; f()(1, 2);",
                super::unwrap_calls_returning_identifiers
            ),
            "const f = () => g;\ng(1, 2);\n"
        );
    }

    #[test]
    fn inlines_operator_wrappers() {
        assert_eq!(
            run(
                "function add(a, b) { return a + b; } x = add(y, 3);",
                super::inline_operator_wrappers
            ),
            "function add(a, b) {\n    return a + b;\n}\nx = y + 3;\n"
        );
    }

    #[test]
    fn operator_wrapper_enforces_arity() {
        let source = "function add(a, b) {\n    return a + b;\n}\nx = add(y);\n";
        assert_eq!(run(source, super::inline_operator_wrappers), source);
    }

    #[test]
    fn replaces_call_forwarders() {
        assert_eq!(
            run(
                "function inner(a) { return a * 2; } function outer(a) { return inner(a); } use(outer(3));",
                super::replace_call_forwarders
            ),
            "function inner(a) {\n    return a * 2;\n}\nfunction outer(a) {\n    return inner(a);\n}\nuse(inner(3));\n"
        );
    }

    #[test]
    fn replaces_apply_shells() {
        let out = run(
            "function outer(p) { return (function (q) { return q + 1; }).apply(this, arguments); }",
            super::replace_apply_shells,
        );
        assert_eq!(out, "function outer(q) {\n    return q + 1;\n}\n");
    }

    #[test]
    fn unwraps_iife_initializers() {
        assert_eq!(
            run(
                "const v = (function () { return 42; })();",
                super::unwrap_iife_initializers
            ),
            "const v = 42;\n"
        );
        assert_eq!(
            run(
                "var v = (function () { side(); return 42; })();",
                super::unwrap_iife_initializers
            ),
            "side();\nvar v = 42;\n"
        );
    }

    #[test]
    fn resolves_function_constructor_calls() {
        assert_eq!(
            run(
                "var f = Function.constructor('a', 'b', 'return a + b');",
                super::resolve_function_constructor_calls
            ),
            "var f = function (a, b) {\n    return a + b;\n};\n"
        );
    }

    #[test]
    fn parses_new_function_literals() {
        assert_eq!(
            run(
                "new Function('done(1)')();",
                super::parse_new_function_literals
            ),
            "done(1);\n"
        );
    }

    #[test]
    fn unfolds_eval_literals() {
        assert_eq!(
            run("eval('console.log(\"hi\")');", super::unfold_eval_literals),
            "console.log('hi');\n"
        );
        assert_eq!(
            run("eval('f')(2);", super::unfold_eval_literals),
            "f(2);\n"
        );
        assert_eq!(
            run("eval('a(); b();');", super::unfold_eval_literals),
            "a();\nb();\n"
        );
    }
}
