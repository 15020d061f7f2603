use crate::ast::{BinaryOp, DeclKind, LiteralValue, Node, NodeKind};
use crate::parser::parse_program;

fn parse_ok(source: &str) -> crate::ast::Ast {
    match parse_program(source) {
        Ok(ast) => ast,
        Err(e) => panic!("failed to parse {source:?}: {e}"),
    }
}

fn program_body(ast: &crate::ast::Ast) -> Vec<crate::ast::NodeId> {
    match ast.node(ast.root()) {
        Node::Program { body } => body.clone(),
        _ => panic!("root is not a program"),
    }
}

#[test]
fn parses_variable_declarations() {
    let ast = parse_ok("var a = 1, b; let c = 'x'; const d = [1, 2];");
    let body = program_body(&ast);
    assert_eq!(body.len(), 3);
    let Node::VariableDeclaration { kind, declarations } = ast.node(body[0]) else {
        panic!("expected variable declaration");
    };
    assert_eq!(*kind, DeclKind::Var);
    assert_eq!(declarations.len(), 2);
}

#[test]
fn parses_operator_precedence() {
    let ast = parse_ok("x = 1 + 2 * 3;");
    let body = program_body(&ast);
    let Node::ExpressionStatement { expression } = ast.node(body[0]) else {
        panic!("expected expression statement");
    };
    let Node::AssignmentExpression { right, .. } = ast.node(*expression) else {
        panic!("expected assignment");
    };
    let Node::BinaryExpression { op, right: mul, .. } = ast.node(*right) else {
        panic!("expected binary add");
    };
    assert_eq!(*op, BinaryOp::Add);
    let Node::BinaryExpression { op: mul_op, .. } = ast.node(*mul) else {
        panic!("expected nested multiply");
    };
    assert_eq!(*mul_op, BinaryOp::Mul);
}

#[test]
fn parses_functions_and_calls() {
    let ast = parse_ok("function f(a, b) { return a + b; } f(1, 2);");
    let body = program_body(&ast);
    assert_eq!(ast.kind(body[0]), NodeKind::FunctionDeclaration);
    let Node::ExpressionStatement { expression } = ast.node(body[1]) else {
        panic!("expected call statement");
    };
    assert_eq!(ast.kind(*expression), NodeKind::CallExpression);
}

#[test]
fn parses_iife() {
    let ast = parse_ok("(function () { return 42; })();");
    let body = program_body(&ast);
    let Node::ExpressionStatement { expression } = ast.node(body[0]) else {
        panic!("expected expression statement");
    };
    let Node::CallExpression { callee, arguments } = ast.node(*expression) else {
        panic!("expected call");
    };
    assert!(arguments.is_empty());
    assert_eq!(ast.kind(*callee), NodeKind::FunctionExpression);
}

#[test]
fn parses_arrow_functions() {
    let ast = parse_ok("const f = x => x + 1; const g = (a, b) => { return a; };");
    let body = program_body(&ast);
    assert_eq!(body.len(), 2);
    for stmt in body {
        let Node::VariableDeclaration { declarations, .. } = ast.node(stmt) else {
            panic!("expected declaration");
        };
        let Node::VariableDeclarator { init, .. } = ast.node(declarations[0]) else {
            panic!("expected declarator");
        };
        assert_eq!(ast.kind(init.unwrap()), NodeKind::ArrowFunctionExpression);
    }
}

#[test]
fn parses_member_chains_and_computed_access() {
    let ast = parse_ok("a.b['c'].d(e)[0];");
    let body = program_body(&ast);
    let Node::ExpressionStatement { expression } = ast.node(body[0]) else {
        panic!("expected expression statement");
    };
    let Node::MemberExpression { computed, .. } = ast.node(*expression) else {
        panic!("expected outer member access");
    };
    assert!(*computed);
}

#[test]
fn parses_switch_with_default() {
    let ast = parse_ok("switch (s) { case 0: a(); break; default: b(); }");
    let body = program_body(&ast);
    let Node::SwitchStatement { cases, .. } = ast.node(body[0]) else {
        panic!("expected switch");
    };
    assert_eq!(cases.len(), 2);
    let Node::SwitchCase { test, .. } = ast.node(cases[1]) else {
        panic!("expected case");
    };
    assert!(test.is_none());
}

#[test]
fn parses_for_variants() {
    let ast = parse_ok("for (var i = 0; i < 3; i++) f(i); for (var k in o) g(k); for (const v of a) h(v);");
    let body = program_body(&ast);
    assert_eq!(ast.kind(body[0]), NodeKind::ForStatement);
    assert_eq!(ast.kind(body[1]), NodeKind::ForInStatement);
    assert_eq!(ast.kind(body[2]), NodeKind::ForOfStatement);
}

#[test]
fn parses_try_catch_finally() {
    let ast = parse_ok("try { f(); } catch (e) { g(e); } finally { h(); }");
    let body = program_body(&ast);
    let Node::TryStatement {
        handler, finalizer, ..
    } = ast.node(body[0])
    else {
        panic!("expected try statement");
    };
    assert!(handler.is_some());
    assert!(finalizer.is_some());
}

#[test]
fn parses_template_literals() {
    let ast = parse_ok("var s = `a${x + 1}b`;");
    let mut found = false;
    ast.walk(ast.root(), &mut |_, node| {
        if let Node::TemplateLiteral {
            quasis,
            expressions,
        } = node
        {
            assert_eq!(quasis.len(), 2);
            assert_eq!(expressions.len(), 1);
            found = true;
        }
    });
    assert!(found, "template literal not parsed");
}

#[test]
fn parses_sequence_and_conditional() {
    let ast = parse_ok("x = (a(), b(), c ? 1 : 2);");
    let mut kinds = Vec::new();
    ast.walk(ast.root(), &mut |_, node| kinds.push(node.kind()));
    assert!(kinds.contains(&NodeKind::SequenceExpression));
    assert!(kinds.contains(&NodeKind::ConditionalExpression));
}

#[test]
fn parses_object_literals() {
    let ast = parse_ok("var o = { a: 1, 'b': 2, 3: three, [k]: 4, short, m() { return 1; } };");
    let mut props = 0;
    ast.walk(ast.root(), &mut |_, node| {
        if matches!(node, Node::Property { .. }) {
            props += 1;
        }
    });
    assert_eq!(props, 6);
}

#[test]
fn parses_class_declarations() {
    let ast = parse_ok("class A extends B { constructor() { } static m(x) { return x; } get v() { return 1; } }");
    let body = program_body(&ast);
    let Node::ClassDeclaration { body: members, .. } = ast.node(body[0]) else {
        panic!("expected class declaration");
    };
    assert_eq!(members.len(), 3);
}

#[test]
fn parses_new_without_arguments() {
    let ast = parse_ok("var d = new Date; var x = new Foo(1);");
    let mut news = 0;
    ast.walk(ast.root(), &mut |_, node| {
        if matches!(node, Node::NewExpression { .. }) {
            news += 1;
        }
    });
    assert_eq!(news, 2);
}

#[test]
fn asi_inserts_semicolons() {
    let ast = parse_ok("var a = 1\nvar b = 2\nf(a, b)");
    assert_eq!(program_body(&ast).len(), 3);
}

#[test]
fn keywords_allowed_after_dot() {
    let ast = parse_ok("cache.delete(key); map.new = 1;");
    assert_eq!(program_body(&ast).len(), 2);
}

#[test]
fn rejects_garbage() {
    assert!(parse_program("var = = 1;").is_err());
    assert!(parse_program("function () {").is_err());
    assert!(parse_program("if (").is_err());
}

#[test]
fn string_escapes_reach_literal_values() {
    let ast = parse_ok(r#"var s = '\x68\x69';"#);
    let mut value = None;
    ast.walk(ast.root(), &mut |_, node| {
        if let Node::Literal {
            value: LiteralValue::String(s),
        } = node
        {
            value = Some(s.clone());
        }
    });
    assert_eq!(value.as_deref(), Some("hi"));
}
