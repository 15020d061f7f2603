//! Recursive-descent JavaScript parser building directly into the node
//! arena. Statement parsing lives here; expression parsing (precedence
//! climbing, call/member chains, literals) is in `expressions`.

mod expressions;

#[cfg(test)]
mod tests;

use crate::ast::{Ast, DeclKind, MethodKind, Node, NodeId};
use crate::lexer::{is_keyword, LexError, Lexer, Punct, Token, TokenKind};
use crate::span::Span;
use std::fmt;

#[derive(Debug, Clone)]
pub struct ParserError {
    pub message: String,
    pub span: Span,
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

impl std::error::Error for ParserError {}

impl From<LexError> for ParserError {
    fn from(e: LexError) -> Self {
        ParserError {
            message: e.message,
            span: Span::new(e.offset, e.offset),
        }
    }
}

type PResult<T> = Result<T, ParserError>;

/// Parses a complete script into a fresh arena. The root `Program` is
/// always node 0.
pub fn parse_program(source: &str) -> Result<Ast, ParserError> {
    let tokens = Lexer::new(source, 0).tokenize()?;
    let mut ast = Ast::new(source);
    let mut parser = Parser {
        ast: &mut ast,
        tokens,
        pos: 0,
    };
    let mut body = Vec::new();
    while !parser.is_eof() {
        body.push(parser.parse_statement()?);
    }
    ast.set_program_body(body);
    Ok(ast)
}

pub(crate) struct Parser<'a> {
    pub(crate) ast: &'a mut Ast,
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
}

impl<'a> Parser<'a> {
    // ------------------------------------------------------------------
    // Token stream management
    // ------------------------------------------------------------------

    pub(crate) fn current(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .unwrap_or_else(|| self.tokens.last().expect("token stream never empty"))
    }

    pub(crate) fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    pub(crate) fn is_eof(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    pub(crate) fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if !self.is_eof() {
            self.pos += 1;
        }
        tok
    }

    pub(crate) fn check_punct(&self, p: Punct) -> bool {
        matches!(&self.current().kind, TokenKind::Punct(q) if *q == p)
    }

    pub(crate) fn eat_punct(&mut self, p: Punct) -> bool {
        if self.check_punct(p) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_punct(&mut self, p: Punct) -> PResult<Span> {
        if self.check_punct(p) {
            let span = self.current().span;
            self.pos += 1;
            Ok(span)
        } else {
            Err(self.unexpected(&format!("expected '{}'", p.as_str())))
        }
    }

    pub(crate) fn check_keyword(&self, kw: &str) -> bool {
        matches!(&self.current().kind, TokenKind::Ident(name) if name == kw)
    }

    pub(crate) fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.check_keyword(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_keyword(&mut self, kw: &str) -> PResult<Span> {
        if self.check_keyword(kw) {
            let span = self.current().span;
            self.pos += 1;
            Ok(span)
        } else {
            Err(self.unexpected(&format!("expected '{kw}'")))
        }
    }

    pub(crate) fn unexpected(&self, message: &str) -> ParserError {
        let tok = self.current();
        let found = match &tok.kind {
            TokenKind::Ident(name) => format!("'{name}'"),
            TokenKind::Number(n) => format!("number {n}"),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Template(_) => "template literal".to_string(),
            TokenKind::Regex { .. } => "regex literal".to_string(),
            TokenKind::Punct(p) => format!("'{}'", p.as_str()),
            TokenKind::Eof => "end of input".to_string(),
        };
        ParserError {
            message: format!("{message}, found {found}"),
            span: tok.span,
        }
    }

    /// Automatic semicolon insertion at statement end: an explicit `;`, a
    /// closing brace, end of input, or a preceding line terminator.
    fn end_statement(&mut self) -> PResult<()> {
        if self.eat_punct(Punct::Semi) || self.check_punct(Punct::RBrace) || self.is_eof() {
            return Ok(());
        }
        if self.current().newline_before {
            return Ok(());
        }
        Err(self.unexpected("expected ';'"))
    }

    pub(crate) fn parse_identifier(&mut self) -> PResult<NodeId> {
        match &self.current().kind {
            TokenKind::Ident(name) if !is_keyword(name) => {
                let name = name.clone();
                let span = self.current().span;
                self.pos += 1;
                Ok(self.ast.alloc(Node::Identifier { name }, span))
            }
            _ => Err(self.unexpected("expected identifier")),
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    pub(crate) fn parse_statement(&mut self) -> PResult<NodeId> {
        match &self.current().kind {
            TokenKind::Punct(Punct::LBrace) => self.parse_block(),
            TokenKind::Punct(Punct::Semi) => {
                let span = self.advance().span;
                Ok(self.ast.alloc(Node::EmptyStatement, span))
            }
            TokenKind::Ident(name) => match name.as_str() {
                "var" | "let" | "const" => self.parse_variable_statement(),
                "function" => self.parse_function_declaration(),
                "class" => self.parse_class_declaration(),
                "if" => self.parse_if(),
                "for" => self.parse_for(),
                "while" => self.parse_while(),
                "do" => self.parse_do_while(),
                "switch" => self.parse_switch(),
                "return" => self.parse_return(),
                "break" | "continue" => self.parse_break_continue(),
                "throw" => self.parse_throw(),
                "try" => self.parse_try(),
                "debugger" => {
                    let span = self.advance().span;
                    self.end_statement()?;
                    Ok(self.ast.alloc(Node::DebuggerStatement, span))
                }
                _ if !is_keyword(name)
                    && matches!(
                        self.peek(1).map(|t| &t.kind),
                        Some(TokenKind::Punct(Punct::Colon))
                    ) =>
                {
                    self.parse_labeled()
                }
                _ => self.parse_expression_statement(),
            },
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_expression_statement(&mut self) -> PResult<NodeId> {
        let start = self.current().span;
        let expression = self.parse_expression(false)?;
        self.end_statement()?;
        let span = start.combine(&self.prev_span());
        Ok(self.ast.alloc(Node::ExpressionStatement { expression }, span))
    }

    pub(crate) fn parse_block(&mut self) -> PResult<NodeId> {
        let start = self.expect_punct(Punct::LBrace)?;
        let mut body = Vec::new();
        while !self.check_punct(Punct::RBrace) {
            if self.is_eof() {
                return Err(self.unexpected("expected '}'"));
            }
            body.push(self.parse_statement()?);
        }
        let end = self.expect_punct(Punct::RBrace)?;
        Ok(self
            .ast
            .alloc(Node::BlockStatement { body }, start.combine(&end)))
    }

    fn parse_variable_statement(&mut self) -> PResult<NodeId> {
        let decl = self.parse_variable_declaration(false)?;
        self.end_statement()?;
        Ok(decl)
    }

    /// Parses `var`/`let`/`const` with its declarator list, without the
    /// trailing semicolon (for-loop heads reuse this).
    fn parse_variable_declaration(&mut self, no_in: bool) -> PResult<NodeId> {
        let start = self.current().span;
        let kind = match self.advance().kind {
            TokenKind::Ident(name) => match name.as_str() {
                "var" => DeclKind::Var,
                "let" => DeclKind::Let,
                "const" => DeclKind::Const,
                _ => return Err(self.unexpected("expected declaration keyword")),
            },
            _ => return Err(self.unexpected("expected declaration keyword")),
        };
        let mut declarations = Vec::new();
        loop {
            let id = self.parse_identifier()?;
            let init = if self.eat_punct(Punct::Assign) {
                Some(self.parse_assignment(no_in)?)
            } else {
                None
            };
            let span = self.ast.span(id).combine(&self.prev_span());
            declarations.push(self.ast.alloc(Node::VariableDeclarator { id, init }, span));
            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }
        let span = start.combine(&self.prev_span());
        Ok(self
            .ast
            .alloc(Node::VariableDeclaration { kind, declarations }, span))
    }

    fn parse_function_declaration(&mut self) -> PResult<NodeId> {
        let start = self.expect_keyword("function")?;
        let id = self.parse_identifier()?;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        let span = start.combine(&self.ast.span(body));
        Ok(self
            .ast
            .alloc(Node::FunctionDeclaration { id, params, body }, span))
    }

    pub(crate) fn parse_params(&mut self) -> PResult<Vec<NodeId>> {
        self.expect_punct(Punct::LParen)?;
        let mut params = Vec::new();
        while !self.check_punct(Punct::RParen) {
            params.push(self.parse_identifier()?);
            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }
        self.expect_punct(Punct::RParen)?;
        Ok(params)
    }

    fn parse_class_declaration(&mut self) -> PResult<NodeId> {
        let start = self.expect_keyword("class")?;
        let id = self.parse_identifier()?;
        let superclass = if self.eat_keyword("extends") {
            Some(self.parse_lhs_expression()?)
        } else {
            None
        };
        self.expect_punct(Punct::LBrace)?;
        let mut body = Vec::new();
        while !self.check_punct(Punct::RBrace) {
            if self.is_eof() {
                return Err(self.unexpected("expected '}'"));
            }
            if self.eat_punct(Punct::Semi) {
                continue;
            }
            body.push(self.parse_method_definition()?);
        }
        let end = self.expect_punct(Punct::RBrace)?;
        Ok(self.ast.alloc(
            Node::ClassDeclaration {
                id,
                superclass,
                body,
            },
            start.combine(&end),
        ))
    }

    fn parse_method_definition(&mut self) -> PResult<NodeId> {
        let start = self.current().span;
        let is_static = self.check_keyword("static")
            && !matches!(
                self.peek(1).map(|t| &t.kind),
                Some(TokenKind::Punct(Punct::LParen))
            );
        if is_static {
            self.pos += 1;
        }
        let mut kind = MethodKind::Method;
        if (self.check_keyword("get") || self.check_keyword("set"))
            && !matches!(
                self.peek(1).map(|t| &t.kind),
                Some(TokenKind::Punct(Punct::LParen))
            )
        {
            kind = if self.check_keyword("get") {
                MethodKind::Get
            } else {
                MethodKind::Set
            };
            self.pos += 1;
        }
        let (key, computed) = self.parse_property_key()?;
        if kind == MethodKind::Method
            && !computed
            && self.ast.ident_name(key) == Some("constructor")
        {
            kind = MethodKind::Constructor;
        }
        let params = self.parse_params()?;
        let fn_body = self.parse_block()?;
        let value_span = self.ast.span(key).combine(&self.ast.span(fn_body));
        let value = self.ast.alloc(
            Node::FunctionExpression {
                id: None,
                params,
                body: fn_body,
            },
            value_span,
        );
        let span = start.combine(&self.prev_span());
        Ok(self.ast.alloc(
            Node::MethodDefinition {
                key,
                value,
                kind,
                computed,
                is_static,
            },
            span,
        ))
    }

    fn parse_if(&mut self) -> PResult<NodeId> {
        let start = self.expect_keyword("if")?;
        self.expect_punct(Punct::LParen)?;
        let test = self.parse_expression(false)?;
        self.expect_punct(Punct::RParen)?;
        let consequent = self.parse_statement()?;
        let alternate = if self.eat_keyword("else") {
            Some(self.parse_statement()?)
        } else {
            None
        };
        let span = start.combine(&self.prev_span());
        Ok(self.ast.alloc(
            Node::IfStatement {
                test,
                consequent,
                alternate,
            },
            span,
        ))
    }

    fn parse_for(&mut self) -> PResult<NodeId> {
        let start = self.expect_keyword("for")?;
        self.expect_punct(Punct::LParen)?;

        // Empty init.
        if self.eat_punct(Punct::Semi) {
            return self.parse_for_tail(start, None);
        }

        let is_decl = self.check_keyword("var") || self.check_keyword("let") || self.check_keyword("const");
        let init = if is_decl {
            self.parse_variable_declaration(true)?
        } else {
            let expr = self.parse_expression(true)?;
            expr
        };

        if self.check_keyword("in") || self.check_keyword("of") {
            let of = self.eat_keyword("of");
            if !of {
                self.expect_keyword("in")?;
            }
            let right = self.parse_expression(false)?;
            self.expect_punct(Punct::RParen)?;
            let body = self.parse_statement()?;
            let span = start.combine(&self.prev_span());
            let node = if of {
                Node::ForOfStatement {
                    left: init,
                    right,
                    body,
                }
            } else {
                Node::ForInStatement {
                    left: init,
                    right,
                    body,
                }
            };
            return Ok(self.ast.alloc(node, span));
        }

        // Classic for: the init clause is followed by ';'.
        self.expect_punct(Punct::Semi)?;
        self.parse_for_tail(start, Some(init))
    }

    fn parse_for_tail(&mut self, start: Span, init: Option<NodeId>) -> PResult<NodeId> {
        let test = if self.check_punct(Punct::Semi) {
            None
        } else {
            Some(self.parse_expression(false)?)
        };
        self.expect_punct(Punct::Semi)?;
        let update = if self.check_punct(Punct::RParen) {
            None
        } else {
            Some(self.parse_expression(false)?)
        };
        self.expect_punct(Punct::RParen)?;
        let body = self.parse_statement()?;
        let span = start.combine(&self.prev_span());
        Ok(self.ast.alloc(
            Node::ForStatement {
                init,
                test,
                update,
                body,
            },
            span,
        ))
    }

    fn parse_while(&mut self) -> PResult<NodeId> {
        let start = self.expect_keyword("while")?;
        self.expect_punct(Punct::LParen)?;
        let test = self.parse_expression(false)?;
        self.expect_punct(Punct::RParen)?;
        let body = self.parse_statement()?;
        let span = start.combine(&self.prev_span());
        Ok(self.ast.alloc(Node::WhileStatement { test, body }, span))
    }

    fn parse_do_while(&mut self) -> PResult<NodeId> {
        let start = self.expect_keyword("do")?;
        let body = self.parse_statement()?;
        self.expect_keyword("while")?;
        self.expect_punct(Punct::LParen)?;
        let test = self.parse_expression(false)?;
        let end = self.expect_punct(Punct::RParen)?;
        self.eat_punct(Punct::Semi);
        Ok(self
            .ast
            .alloc(Node::DoWhileStatement { body, test }, start.combine(&end)))
    }

    fn parse_switch(&mut self) -> PResult<NodeId> {
        let start = self.expect_keyword("switch")?;
        self.expect_punct(Punct::LParen)?;
        let discriminant = self.parse_expression(false)?;
        self.expect_punct(Punct::RParen)?;
        self.expect_punct(Punct::LBrace)?;
        let mut cases = Vec::new();
        while !self.check_punct(Punct::RBrace) {
            if self.is_eof() {
                return Err(self.unexpected("expected '}'"));
            }
            let case_start = self.current().span;
            let test = if self.eat_keyword("case") {
                let t = self.parse_expression(false)?;
                Some(t)
            } else {
                self.expect_keyword("default")?;
                None
            };
            self.expect_punct(Punct::Colon)?;
            let mut consequent = Vec::new();
            while !self.check_punct(Punct::RBrace)
                && !self.check_keyword("case")
                && !self.check_keyword("default")
            {
                consequent.push(self.parse_statement()?);
            }
            let span = case_start.combine(&self.prev_span());
            cases.push(self.ast.alloc(Node::SwitchCase { test, consequent }, span));
        }
        let end = self.expect_punct(Punct::RBrace)?;
        Ok(self.ast.alloc(
            Node::SwitchStatement {
                discriminant,
                cases,
            },
            start.combine(&end),
        ))
    }

    fn parse_return(&mut self) -> PResult<NodeId> {
        let start = self.expect_keyword("return")?;
        let argument = if self.check_punct(Punct::Semi)
            || self.check_punct(Punct::RBrace)
            || self.is_eof()
            || self.current().newline_before
        {
            None
        } else {
            Some(self.parse_expression(false)?)
        };
        self.end_statement()?;
        let span = start.combine(&self.prev_span());
        Ok(self.ast.alloc(Node::ReturnStatement { argument }, span))
    }

    fn parse_break_continue(&mut self) -> PResult<NodeId> {
        let is_break = self.check_keyword("break");
        let start = self.advance().span;
        let label = match &self.current().kind {
            TokenKind::Ident(name)
                if !is_keyword(name) && !self.current().newline_before =>
            {
                let name = name.clone();
                self.pos += 1;
                Some(name)
            }
            _ => None,
        };
        self.end_statement()?;
        let span = start.combine(&self.prev_span());
        let node = if is_break {
            Node::BreakStatement { label }
        } else {
            Node::ContinueStatement { label }
        };
        Ok(self.ast.alloc(node, span))
    }

    fn parse_throw(&mut self) -> PResult<NodeId> {
        let start = self.expect_keyword("throw")?;
        if self.current().newline_before {
            return Err(self.unexpected("illegal newline after 'throw'"));
        }
        let argument = self.parse_expression(false)?;
        self.end_statement()?;
        let span = start.combine(&self.prev_span());
        Ok(self.ast.alloc(Node::ThrowStatement { argument }, span))
    }

    fn parse_try(&mut self) -> PResult<NodeId> {
        let start = self.expect_keyword("try")?;
        let block = self.parse_block()?;
        let handler = if self.eat_keyword("catch") {
            let catch_start = self.prev_span();
            let param = if self.eat_punct(Punct::LParen) {
                let p = self.parse_identifier()?;
                self.expect_punct(Punct::RParen)?;
                Some(p)
            } else {
                None
            };
            let body = self.parse_block()?;
            let span = catch_start.combine(&self.ast.span(body));
            Some(self.ast.alloc(Node::CatchClause { param, body }, span))
        } else {
            None
        };
        let finalizer = if self.eat_keyword("finally") {
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.unexpected("expected 'catch' or 'finally'"));
        }
        let span = start.combine(&self.prev_span());
        Ok(self.ast.alloc(
            Node::TryStatement {
                block,
                handler,
                finalizer,
            },
            span,
        ))
    }

    fn parse_labeled(&mut self) -> PResult<NodeId> {
        let start = self.current().span;
        let label = match self.advance().kind {
            TokenKind::Ident(name) => name,
            _ => return Err(self.unexpected("expected label")),
        };
        self.expect_punct(Punct::Colon)?;
        let body = self.parse_statement()?;
        let span = start.combine(&self.prev_span());
        Ok(self.ast.alloc(Node::LabeledStatement { label, body }, span))
    }
}
