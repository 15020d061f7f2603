//! Deterministic JavaScript emitter.
//!
//! The rewrite driver detects its fixpoint by comparing emitted source
//! text between passes, so emission must be a pure function of the tree:
//! fixed indentation, canonical quoting, minimal precedence-driven
//! parenthesization, no configuration.

use crate::ast::{Ast, BinaryOp, LiteralValue, LogicalOp, MethodKind, Node, NodeId, PropertyKind};
use crate::lexer::is_identifier_name;

const INDENT: &str = "    ";

/// Emits the whole program rooted in `ast`.
pub fn emit_program(ast: &Ast) -> String {
    let mut emitter = Emitter {
        ast,
        out: String::new(),
        indent: 0,
    };
    let Node::Program { body } = ast.node(ast.root()) else {
        return String::new();
    };
    for stmt in body {
        emitter.emit_statement_line(*stmt);
    }
    emitter.out
}

/// Emits a single expression (used for cache keys and sandbox fragments).
pub fn emit_expression(ast: &Ast, id: NodeId) -> String {
    let mut emitter = Emitter {
        ast,
        out: String::new(),
        indent: 0,
    };
    emitter.emit_expr(id, 0);
    emitter.out
}

/// Emits a single statement without surrounding indentation.
pub fn emit_statement(ast: &Ast, id: NodeId) -> String {
    let mut emitter = Emitter {
        ast,
        out: String::new(),
        indent: 0,
    };
    emitter.emit_statement_bare(id);
    emitter.out
}

struct Emitter<'a> {
    ast: &'a Ast,
    out: String,
    indent: usize,
}

impl<'a> Emitter<'a> {
    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
    }

    fn emit_statement_line(&mut self, id: NodeId) {
        self.write_indent();
        self.emit_statement_bare(id);
        self.out.push('\n');
    }

    fn emit_statement_bare(&mut self, id: NodeId) {
        match self.ast.node(id) {
            Node::ExpressionStatement { expression } => {
                let needs_parens = self.starts_ambiguously(*expression);
                if needs_parens {
                    self.out.push('(');
                }
                self.emit_expr(*expression, 0);
                if needs_parens {
                    self.out.push(')');
                }
                self.out.push(';');
            }
            Node::BlockStatement { body } => {
                self.out.push_str("{\n");
                self.indent += 1;
                for stmt in body.clone() {
                    self.emit_statement_line(stmt);
                }
                self.indent -= 1;
                self.write_indent();
                self.out.push('}');
            }
            Node::EmptyStatement => self.out.push(';'),
            Node::DebuggerStatement => self.out.push_str("debugger;"),
            Node::VariableDeclaration { .. } => {
                self.emit_variable_declaration(id);
                self.out.push(';');
            }
            Node::FunctionDeclaration { id: name, params, body } => {
                let (name, params, body) = (*name, params.clone(), *body);
                self.out.push_str("function ");
                self.emit_expr(name, 0);
                self.emit_params(&params);
                self.out.push(' ');
                self.emit_statement_bare(body);
            }
            Node::ReturnStatement { argument } => {
                self.out.push_str("return");
                if let Some(arg) = argument {
                    self.out.push(' ');
                    self.emit_expr(*arg, 2);
                }
                self.out.push(';');
            }
            Node::IfStatement {
                test,
                consequent,
                alternate,
            } => {
                let (test, consequent, alternate) = (*test, *consequent, *alternate);
                self.out.push_str("if (");
                self.emit_expr(test, 0);
                self.out.push_str(") ");
                // Brace a dangling-else consequent so the `else` binds here.
                let dangling = alternate.is_some()
                    && matches!(
                        self.ast.node(consequent),
                        Node::IfStatement { alternate: None, .. }
                    );
                if dangling {
                    self.out.push_str("{\n");
                    self.indent += 1;
                    self.emit_statement_line(consequent);
                    self.indent -= 1;
                    self.write_indent();
                    self.out.push('}');
                } else {
                    self.emit_statement_bare(consequent);
                }
                if let Some(alt) = alternate {
                    self.out.push_str(" else ");
                    self.emit_statement_bare(alt);
                }
            }
            Node::ForStatement {
                init,
                test,
                update,
                body,
            } => {
                let (init, test, update, body) = (*init, *test, *update, *body);
                self.out.push_str("for (");
                if let Some(init) = init {
                    if matches!(self.ast.node(init), Node::VariableDeclaration { .. }) {
                        self.emit_variable_declaration(init);
                    } else {
                        self.emit_expr(init, 0);
                    }
                }
                self.out.push(';');
                if let Some(test) = test {
                    self.out.push(' ');
                    self.emit_expr(test, 0);
                }
                self.out.push(';');
                if let Some(update) = update {
                    self.out.push(' ');
                    self.emit_expr(update, 0);
                }
                self.out.push_str(") ");
                self.emit_statement_bare(body);
            }
            Node::ForInStatement { left, right, body } => {
                let (left, right, body) = (*left, *right, *body);
                self.emit_for_each("in", left, right, body);
            }
            Node::ForOfStatement { left, right, body } => {
                let (left, right, body) = (*left, *right, *body);
                self.emit_for_each("of", left, right, body);
            }
            Node::WhileStatement { test, body } => {
                let (test, body) = (*test, *body);
                self.out.push_str("while (");
                self.emit_expr(test, 0);
                self.out.push_str(") ");
                self.emit_statement_bare(body);
            }
            Node::DoWhileStatement { body, test } => {
                let (body, test) = (*body, *test);
                self.out.push_str("do ");
                self.emit_statement_bare(body);
                self.out.push_str(" while (");
                self.emit_expr(test, 0);
                self.out.push_str(");");
            }
            Node::SwitchStatement {
                discriminant,
                cases,
            } => {
                let (discriminant, cases) = (*discriminant, cases.clone());
                self.out.push_str("switch (");
                self.emit_expr(discriminant, 0);
                self.out.push_str(") {\n");
                self.indent += 1;
                for case in cases {
                    self.write_indent();
                    match self.ast.node(case) {
                        Node::SwitchCase { test, consequent } => {
                            let (test, consequent) = (*test, consequent.clone());
                            match test {
                                Some(test) => {
                                    self.out.push_str("case ");
                                    self.emit_expr(test, 0);
                                    self.out.push(':');
                                }
                                None => self.out.push_str("default:"),
                            }
                            self.out.push('\n');
                            self.indent += 1;
                            for stmt in consequent {
                                self.emit_statement_line(stmt);
                            }
                            self.indent -= 1;
                        }
                        _ => {}
                    }
                }
                self.indent -= 1;
                self.write_indent();
                self.out.push('}');
            }
            Node::BreakStatement { label } => {
                self.out.push_str("break");
                if let Some(label) = label {
                    self.out.push(' ');
                    self.out.push_str(label);
                }
                self.out.push(';');
            }
            Node::ContinueStatement { label } => {
                self.out.push_str("continue");
                if let Some(label) = label {
                    self.out.push(' ');
                    self.out.push_str(label);
                }
                self.out.push(';');
            }
            Node::LabeledStatement { label, body } => {
                let (label, body) = (label.clone(), *body);
                self.out.push_str(&label);
                self.out.push_str(": ");
                self.emit_statement_bare(body);
            }
            Node::ThrowStatement { argument } => {
                let argument = *argument;
                self.out.push_str("throw ");
                self.emit_expr(argument, 2);
                self.out.push(';');
            }
            Node::TryStatement {
                block,
                handler,
                finalizer,
            } => {
                let (block, handler, finalizer) = (*block, *handler, *finalizer);
                self.out.push_str("try ");
                self.emit_statement_bare(block);
                if let Some(handler) = handler {
                    if let Node::CatchClause { param, body } = self.ast.node(handler) {
                        let (param, body) = (*param, *body);
                        self.out.push_str(" catch ");
                        if let Some(param) = param {
                            self.out.push('(');
                            self.emit_expr(param, 0);
                            self.out.push_str(") ");
                        }
                        self.emit_statement_bare(body);
                    }
                }
                if let Some(finalizer) = finalizer {
                    self.out.push_str(" finally ");
                    self.emit_statement_bare(finalizer);
                }
            }
            Node::ClassDeclaration {
                id: name,
                superclass,
                body,
            } => {
                let (name, superclass, body) = (*name, *superclass, body.clone());
                self.out.push_str("class ");
                self.emit_expr(name, 0);
                if let Some(superclass) = superclass {
                    self.out.push_str(" extends ");
                    self.emit_expr(superclass, 19);
                }
                self.out.push_str(" {\n");
                self.indent += 1;
                for member in body {
                    self.write_indent();
                    self.emit_method_definition(member);
                    self.out.push('\n');
                }
                self.indent -= 1;
                self.write_indent();
                self.out.push('}');
            }
            // An expression in statement position (can appear transiently
            // inside rule-built fragments).
            _ => {
                self.emit_expr(id, 0);
                self.out.push(';');
            }
        }
    }

    fn emit_for_each(&mut self, word: &str, left: NodeId, right: NodeId, body: NodeId) {
        self.out.push_str("for (");
        if matches!(self.ast.node(left), Node::VariableDeclaration { .. }) {
            self.emit_variable_declaration(left);
        } else {
            self.emit_expr(left, 0);
        }
        self.out.push(' ');
        self.out.push_str(word);
        self.out.push(' ');
        self.emit_expr(right, 2);
        self.out.push_str(") ");
        self.emit_statement_bare(body);
    }

    fn emit_variable_declaration(&mut self, id: NodeId) {
        let Node::VariableDeclaration { kind, declarations } = self.ast.node(id) else {
            return;
        };
        let (kind, declarations) = (*kind, declarations.clone());
        self.out.push_str(kind.as_str());
        self.out.push(' ');
        for (i, decl) in declarations.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            if let Node::VariableDeclarator { id: name, init } = self.ast.node(*decl) {
                let (name, init) = (*name, *init);
                self.emit_expr(name, 0);
                if let Some(init) = init {
                    self.out.push_str(" = ");
                    self.emit_expr(init, 2);
                }
            }
        }
    }

    fn emit_method_definition(&mut self, id: NodeId) {
        let Node::MethodDefinition {
            key,
            value,
            kind,
            computed,
            is_static,
        } = self.ast.node(id)
        else {
            return;
        };
        let (key, value, kind, computed, is_static) = (*key, *value, *kind, *computed, *is_static);
        if is_static {
            self.out.push_str("static ");
        }
        match kind {
            MethodKind::Get => self.out.push_str("get "),
            MethodKind::Set => self.out.push_str("set "),
            MethodKind::Constructor | MethodKind::Method => {}
        }
        if computed {
            self.out.push('[');
            self.emit_expr(key, 0);
            self.out.push(']');
        } else {
            self.emit_expr(key, 0);
        }
        if let Node::FunctionExpression { params, body, .. } = self.ast.node(value) {
            let (params, body) = (params.clone(), *body);
            self.emit_params(&params);
            self.out.push(' ');
            self.emit_statement_bare(body);
        }
    }

    fn emit_params(&mut self, params: &[NodeId]) {
        self.out.push('(');
        for (i, p) in params.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.emit_expr(*p, 0);
        }
        self.out.push(')');
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Precedence of the produced expression form; parenthesize when it
    /// drops below the context's minimum.
    fn precedence(&self, id: NodeId) -> u8 {
        match self.ast.node(id) {
            Node::SequenceExpression { .. } => 1,
            Node::AssignmentExpression { .. }
            | Node::ConditionalExpression { .. }
            | Node::ArrowFunctionExpression { .. } => 2,
            Node::LogicalExpression { op, .. } => match op {
                LogicalOp::Nullish => 4,
                LogicalOp::Or => 4,
                LogicalOp::And => 5,
            },
            Node::BinaryExpression { op, .. } => match op {
                BinaryOp::BitOr => 6,
                BinaryOp::BitXor => 7,
                BinaryOp::BitAnd => 8,
                BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => 9,
                BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
                | BinaryOp::In
                | BinaryOp::Instanceof => 10,
                BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => 11,
                BinaryOp::Add | BinaryOp::Sub => 12,
                BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 13,
                BinaryOp::Pow => 14,
            },
            Node::UnaryExpression { .. } => 15,
            Node::UpdateExpression { prefix, .. } => {
                if *prefix {
                    15
                } else {
                    16
                }
            }
            Node::NewExpression { arguments, .. } if arguments.is_empty() => 17,
            Node::CallExpression { .. } | Node::NewExpression { .. } => 18,
            Node::MemberExpression { .. } => 19,
            // Negative number literals read as unary expressions.
            Node::Literal {
                value: LiteralValue::Number(n),
            } if *n < 0.0 => 15,
            _ => 20,
        }
    }

    fn emit_expr(&mut self, id: NodeId, min_prec: u8) {
        let prec = self.precedence(id);
        let parens = prec < min_prec;
        if parens {
            self.out.push('(');
        }
        self.emit_expr_inner(id);
        if parens {
            self.out.push(')');
        }
    }

    fn emit_expr_inner(&mut self, id: NodeId) {
        match self.ast.node(id) {
            Node::Identifier { name } => self.out.push_str(name),
            Node::ThisExpression => self.out.push_str("this"),
            Node::Literal { value } => {
                let value = value.clone();
                self.emit_literal(&value);
            }
            Node::TemplateLiteral {
                quasis,
                expressions,
            } => {
                let (quasis, expressions) = (quasis.clone(), expressions.clone());
                self.out.push('`');
                for (i, quasi) in quasis.iter().enumerate() {
                    self.push_template_chunk(&quasi.cooked);
                    if i < expressions.len() {
                        self.out.push_str("${");
                        self.emit_expr(expressions[i], 0);
                        self.out.push('}');
                    }
                }
                self.out.push('`');
            }
            Node::ArrayExpression { elements } => {
                let elements = elements.clone();
                self.out.push('[');
                let trailing_hole = matches!(elements.last(), Some(None));
                for (i, el) in elements.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    if let Some(el) = el {
                        self.emit_expr(*el, 2);
                    }
                }
                if trailing_hole {
                    self.out.push(',');
                }
                self.out.push(']');
            }
            Node::ObjectExpression { properties } => {
                let properties = properties.clone();
                if properties.is_empty() {
                    self.out.push_str("{}");
                } else {
                    self.out.push('{');
                    for (i, prop) in properties.iter().enumerate() {
                        if i > 0 {
                            self.out.push(',');
                        }
                        self.out.push(' ');
                        self.emit_property(*prop);
                    }
                    self.out.push_str(" }");
                }
            }
            Node::SpreadElement { argument } => {
                let argument = *argument;
                self.out.push_str("...");
                self.emit_expr(argument, 2);
            }
            Node::FunctionExpression { id: name, params, body } => {
                let (name, params, body) = (*name, params.clone(), *body);
                self.out.push_str("function ");
                if let Some(name) = name {
                    self.emit_expr(name, 0);
                }
                self.emit_params(&params);
                self.out.push(' ');
                self.emit_statement_bare(body);
            }
            Node::ArrowFunctionExpression {
                params,
                body,
                expression,
            } => {
                let (params, body, expression) = (params.clone(), *body, *expression);
                self.emit_params(&params);
                self.out.push_str(" => ");
                if expression {
                    // An object-literal body must be parenthesized.
                    let needs_parens = self.starts_ambiguously(body);
                    if needs_parens {
                        self.out.push('(');
                    }
                    self.emit_expr(body, 2);
                    if needs_parens {
                        self.out.push(')');
                    }
                } else {
                    self.emit_statement_bare(body);
                }
            }
            Node::UnaryExpression { op, argument } => {
                let (op, argument) = (*op, *argument);
                self.out.push_str(op.as_str());
                if op.as_str().len() > 1 {
                    self.out.push(' ');
                } else if let Node::UnaryExpression { op: inner, .. } = self.ast.node(argument) {
                    // `- -x` and `+ +x` must not fuse into `--x` / `++x`.
                    if inner.as_str() == op.as_str() {
                        self.out.push(' ');
                    }
                } else if matches!(
                    self.ast.node(argument),
                    Node::Literal { value: LiteralValue::Number(n) } if *n < 0.0
                ) && op.as_str() == "-"
                {
                    self.out.push(' ');
                }
                self.emit_expr(argument, 15);
            }
            Node::UpdateExpression {
                op,
                argument,
                prefix,
            } => {
                let (op, argument, prefix) = (*op, *argument, *prefix);
                if prefix {
                    self.out.push_str(op.as_str());
                    self.emit_expr(argument, 15);
                } else {
                    self.emit_expr(argument, 16);
                    self.out.push_str(op.as_str());
                }
            }
            Node::BinaryExpression { op, left, right } => {
                let (op, left, right) = (*op, *left, *right);
                let prec = self.precedence(id);
                // `**` is right-associative; its left operand also must
                // not be a bare unary expression.
                let (lmin, rmin) = if op == BinaryOp::Pow {
                    (16, prec)
                } else {
                    (prec, prec + 1)
                };
                self.emit_expr(left, lmin);
                self.out.push(' ');
                self.out.push_str(op.as_str());
                self.out.push(' ');
                self.emit_expr(right, rmin);
            }
            Node::LogicalExpression { op, left, right } => {
                let (op, left, right) = (*op, *left, *right);
                let prec = self.precedence(id);
                // `??` may not mix bare with `&&`/`||`.
                let force = |emitter: &mut Self, child: NodeId, min: u8| {
                    let clash = match (op, emitter.ast.node(child)) {
                        (LogicalOp::Nullish, Node::LogicalExpression { op: c, .. }) => {
                            !matches!(c, LogicalOp::Nullish)
                        }
                        (_, Node::LogicalExpression { op: LogicalOp::Nullish, .. }) => {
                            op != LogicalOp::Nullish
                        }
                        _ => false,
                    };
                    if clash {
                        emitter.out.push('(');
                        emitter.emit_expr(child, 0);
                        emitter.out.push(')');
                    } else {
                        emitter.emit_expr(child, min);
                    }
                };
                force(self, left, prec);
                self.out.push(' ');
                self.out.push_str(op.as_str());
                self.out.push(' ');
                force(self, right, prec + 1);
            }
            Node::AssignmentExpression { op, left, right } => {
                let (op, left, right) = (*op, *left, *right);
                self.emit_expr(left, 16);
                self.out.push(' ');
                self.out.push_str(op.as_str());
                self.out.push(' ');
                self.emit_expr(right, 2);
            }
            Node::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                let (test, consequent, alternate) = (*test, *consequent, *alternate);
                self.emit_expr(test, 3);
                self.out.push_str(" ? ");
                self.emit_expr(consequent, 2);
                self.out.push_str(" : ");
                self.emit_expr(alternate, 2);
            }
            Node::CallExpression { callee, arguments } => {
                let (callee, arguments) = (*callee, arguments.clone());
                self.emit_expr(callee, 18);
                self.emit_arguments(&arguments);
            }
            Node::NewExpression { callee, arguments } => {
                let (callee, arguments) = (*callee, arguments.clone());
                self.out.push_str("new ");
                self.emit_expr(callee, 19);
                self.emit_arguments(&arguments);
            }
            Node::MemberExpression {
                object,
                property,
                computed,
            } => {
                let (object, property, computed) = (*object, *property, *computed);
                // `5.x` lexes as a malformed number; keep the parens.
                let int_object = matches!(
                    self.ast.node(object),
                    Node::Literal { value: LiteralValue::Number(n) } if n.fract() == 0.0 && *n >= 0.0
                );
                if int_object {
                    self.out.push('(');
                    self.emit_expr(object, 0);
                    self.out.push(')');
                } else {
                    self.emit_expr(object, 18);
                }
                if computed {
                    self.out.push('[');
                    self.emit_expr(property, 0);
                    self.out.push(']');
                } else {
                    self.out.push('.');
                    self.emit_expr(property, 0);
                }
            }
            Node::SequenceExpression { expressions } => {
                let expressions = expressions.clone();
                for (i, expr) in expressions.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.emit_expr(*expr, 2);
                }
            }
            Node::Property { .. } => self.emit_property(id),
            // Statements reached via expression positions in malformed
            // rule output would be a bug; emit nothing rather than panic.
            _ => {}
        }
    }

    fn emit_arguments(&mut self, arguments: &[NodeId]) {
        self.out.push('(');
        for (i, arg) in arguments.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.emit_expr(*arg, 2);
        }
        self.out.push(')');
    }

    fn emit_property(&mut self, id: NodeId) {
        let Node::Property {
            key,
            value,
            kind,
            computed,
            shorthand,
        } = self.ast.node(id)
        else {
            if let Node::SpreadElement { argument } = self.ast.node(id) {
                let argument = *argument;
                self.out.push_str("...");
                self.emit_expr(argument, 2);
            }
            return;
        };
        let (key, value, kind, computed, shorthand) = (*key, *value, *kind, *computed, *shorthand);
        match kind {
            PropertyKind::Get | PropertyKind::Set => {
                self.out
                    .push_str(if kind == PropertyKind::Get { "get " } else { "set " });
                if computed {
                    self.out.push('[');
                    self.emit_expr(key, 0);
                    self.out.push(']');
                } else {
                    self.emit_expr(key, 0);
                }
                if let Node::FunctionExpression { params, body, .. } = self.ast.node(value) {
                    let (params, body) = (params.clone(), *body);
                    self.emit_params(&params);
                    self.out.push(' ');
                    self.emit_statement_bare(body);
                }
            }
            PropertyKind::Init => {
                if shorthand {
                    self.emit_expr(key, 0);
                    return;
                }
                if computed {
                    self.out.push('[');
                    self.emit_expr(key, 0);
                    self.out.push(']');
                } else {
                    self.emit_expr(key, 0);
                }
                self.out.push_str(": ");
                self.emit_expr(value, 2);
            }
        }
    }

    fn emit_literal(&mut self, value: &LiteralValue) {
        match value {
            LiteralValue::Null => self.out.push_str("null"),
            LiteralValue::Boolean(b) => self.out.push_str(if *b { "true" } else { "false" }),
            LiteralValue::Number(n) => {
                let formatted = format_number(*n);
                self.out.push_str(&formatted);
            }
            LiteralValue::String(s) => {
                let quoted = quote_string(s);
                self.out.push_str(&quoted);
            }
            LiteralValue::Regex { pattern, flags } => {
                self.out.push('/');
                self.out.push_str(pattern);
                self.out.push('/');
                self.out.push_str(flags);
            }
        }
    }

    fn push_template_chunk(&mut self, cooked: &str) {
        let mut chars = cooked.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '`' => self.out.push_str("\\`"),
                '\\' => self.out.push_str("\\\\"),
                '$' if chars.peek() == Some(&'{') => self.out.push_str("\\$"),
                _ => self.out.push(c),
            }
        }
    }

    /// Whether the leftmost token of `id` would be `{` or `function`,
    /// which are misread in statement position.
    fn starts_ambiguously(&self, id: NodeId) -> bool {
        match self.ast.node(id) {
            Node::ObjectExpression { .. } | Node::FunctionExpression { .. } => true,
            Node::BinaryExpression { left, .. }
            | Node::LogicalExpression { left, .. }
            | Node::AssignmentExpression { left, .. } => self.starts_ambiguously(*left),
            Node::ConditionalExpression { test, .. } => self.starts_ambiguously(*test),
            Node::SequenceExpression { expressions } => expressions
                .first()
                .is_some_and(|e| self.starts_ambiguously(*e)),
            Node::MemberExpression { object, .. } => self.starts_ambiguously(*object),
            Node::CallExpression { callee, .. } => self.starts_ambiguously(*callee),
            Node::UpdateExpression {
                argument,
                prefix: false,
                ..
            } => self.starts_ambiguously(*argument),
            _ => false,
        }
    }
}

/// Canonical number formatting: integers stay plain, huge magnitudes use
/// exponent form, non-finite folds are spelled as their global names.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n < 0.0 { "-Infinity" } else { "Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e21 {
        return format!("{n:.0}");
    }
    if n.abs() >= 1e21 {
        return format!("{n:e}");
    }
    format!("{n}")
}

/// Single-quote preferred quoting with full escaping.
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Whether `name` can be written after a `.` (used when normalizing
/// computed member access).
pub fn is_safe_property_name(name: &str) -> bool {
    is_identifier_name(name) && !crate::lexer::is_keyword(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    fn roundtrip(source: &str) -> String {
        let ast = parse_program(source).expect("parse failure");
        emit_program(&ast)
    }

    #[test]
    fn emits_statements_one_per_line() {
        assert_eq!(roundtrip("var a = 1; f(a)"), "var a = 1;\nf(a);\n");
    }

    #[test]
    fn preserves_precedence_with_parens() {
        assert_eq!(roundtrip("x = (1 + 2) * 3;"), "x = (1 + 2) * 3;\n");
        assert_eq!(roundtrip("x = 1 + 2 * 3;"), "x = 1 + 2 * 3;\n");
        assert_eq!(roundtrip("x = a - (b - c);"), "x = a - (b - c);\n");
    }

    #[test]
    fn emission_is_stable() {
        let first = roundtrip("function f(a) { return a + 1; } f(2);");
        let second = roundtrip(&first);
        assert_eq!(first, second, "emitting emitted source must be a fixpoint");
    }

    #[test]
    fn object_expression_statement_is_parenthesized() {
        let out = roundtrip("({ a: 1 });");
        assert_eq!(out, "({ a: 1 });\n");
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(40.0), "40");
        assert_eq!(format_number(-3.5), "-3.5");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
    }
}
