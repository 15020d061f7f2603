//! Expression parsing: precedence climbing for binary/logical operators,
//! call/member chains, literals, arrow-function lookahead.

use super::{PResult, Parser};
use crate::ast::{
    AssignOp, BinaryOp, LiteralValue, LogicalOp, Node, NodeId, NodeKind, PropertyKind,
    TemplateElement, UnaryOp, UpdateOp,
};
use crate::lexer::{is_keyword, Lexer, Punct, TemplatePart, TokenKind};
use crate::span::Span;

impl<'a> Parser<'a> {
    /// Full expression including the comma operator.
    pub(crate) fn parse_expression(&mut self, no_in: bool) -> PResult<NodeId> {
        let start = self.current().span;
        let first = self.parse_assignment(no_in)?;
        if !self.check_punct(Punct::Comma) {
            return Ok(first);
        }
        let mut expressions = vec![first];
        while self.eat_punct(Punct::Comma) {
            expressions.push(self.parse_assignment(no_in)?);
        }
        let span = start.combine(&self.prev_span());
        Ok(self.ast.alloc(Node::SequenceExpression { expressions }, span))
    }

    pub(crate) fn parse_assignment(&mut self, no_in: bool) -> PResult<NodeId> {
        // Arrow function lookahead: `x =>` or `( params ) =>`.
        if let Some(arrow) = self.try_parse_arrow(no_in)? {
            return Ok(arrow);
        }

        let start = self.current().span;
        let left = self.parse_conditional(no_in)?;
        let op = match &self.current().kind {
            TokenKind::Punct(p) => match p {
                Punct::Assign => Some(AssignOp::Assign),
                Punct::PlusEq => Some(AssignOp::Add),
                Punct::MinusEq => Some(AssignOp::Sub),
                Punct::StarEq => Some(AssignOp::Mul),
                Punct::SlashEq => Some(AssignOp::Div),
                Punct::PercentEq => Some(AssignOp::Mod),
                Punct::StarStarEq => Some(AssignOp::Pow),
                Punct::ShlEq => Some(AssignOp::Shl),
                Punct::ShrEq => Some(AssignOp::Shr),
                Punct::UShrEq => Some(AssignOp::UShr),
                Punct::AmpEq => Some(AssignOp::BitAnd),
                Punct::PipeEq => Some(AssignOp::BitOr),
                Punct::CaretEq => Some(AssignOp::BitXor),
                Punct::AmpAmpEq => Some(AssignOp::And),
                Punct::PipePipeEq => Some(AssignOp::Or),
                Punct::QuestionQuestionEq => Some(AssignOp::Nullish),
                _ => None,
            },
            _ => None,
        };
        let Some(op) = op else {
            return Ok(left);
        };
        if !matches!(
            self.ast.kind(left),
            NodeKind::Identifier | NodeKind::MemberExpression
        ) {
            return Err(self.unexpected("invalid assignment target"));
        }
        self.pos += 1;
        let right = self.parse_assignment(no_in)?;
        let span = start.combine(&self.prev_span());
        Ok(self
            .ast
            .alloc(Node::AssignmentExpression { op, left, right }, span))
    }

    fn parse_conditional(&mut self, no_in: bool) -> PResult<NodeId> {
        let start = self.current().span;
        let test = self.parse_binary(0, no_in)?;
        if !self.eat_punct(Punct::Question) {
            return Ok(test);
        }
        let consequent = self.parse_assignment(false)?;
        self.expect_punct(Punct::Colon)?;
        let alternate = self.parse_assignment(no_in)?;
        let span = start.combine(&self.prev_span());
        Ok(self.ast.alloc(
            Node::ConditionalExpression {
                test,
                consequent,
                alternate,
            },
            span,
        ))
    }

    fn binary_op_of(&self, no_in: bool) -> Option<(u8, BinOrLogical)> {
        use BinOrLogical::*;
        match &self.current().kind {
            TokenKind::Punct(p) => match p {
                Punct::QuestionQuestion => Some((1, Logical(LogicalOp::Nullish))),
                Punct::PipePipe => Some((1, Logical(LogicalOp::Or))),
                Punct::AmpAmp => Some((2, Logical(LogicalOp::And))),
                Punct::Pipe => Some((3, Binary(BinaryOp::BitOr))),
                Punct::Caret => Some((4, Binary(BinaryOp::BitXor))),
                Punct::Amp => Some((5, Binary(BinaryOp::BitAnd))),
                Punct::EqEq => Some((6, Binary(BinaryOp::Eq))),
                Punct::NotEq => Some((6, Binary(BinaryOp::NotEq))),
                Punct::EqEqEq => Some((6, Binary(BinaryOp::StrictEq))),
                Punct::NotEqEq => Some((6, Binary(BinaryOp::StrictNotEq))),
                Punct::Lt => Some((7, Binary(BinaryOp::Lt))),
                Punct::LtEq => Some((7, Binary(BinaryOp::LtEq))),
                Punct::Gt => Some((7, Binary(BinaryOp::Gt))),
                Punct::GtEq => Some((7, Binary(BinaryOp::GtEq))),
                Punct::Shl => Some((8, Binary(BinaryOp::Shl))),
                Punct::Shr => Some((8, Binary(BinaryOp::Shr))),
                Punct::UShr => Some((8, Binary(BinaryOp::UShr))),
                Punct::Plus => Some((9, Binary(BinaryOp::Add))),
                Punct::Minus => Some((9, Binary(BinaryOp::Sub))),
                Punct::Star => Some((10, Binary(BinaryOp::Mul))),
                Punct::Slash => Some((10, Binary(BinaryOp::Div))),
                Punct::Percent => Some((10, Binary(BinaryOp::Mod))),
                Punct::StarStar => Some((11, Binary(BinaryOp::Pow))),
                _ => None,
            },
            TokenKind::Ident(name) => match name.as_str() {
                "in" if !no_in => Some((7, Binary(BinaryOp::In))),
                "instanceof" => Some((7, Binary(BinaryOp::Instanceof))),
                _ => None,
            },
            _ => None,
        }
    }

    fn parse_binary(&mut self, min_prec: u8, no_in: bool) -> PResult<NodeId> {
        let start = self.current().span;
        let mut left = self.parse_unary(no_in)?;
        while let Some((prec, op)) = self.binary_op_of(no_in) {
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            // `**` is right-associative; everything else is left.
            let next_min = if matches!(op, BinOrLogical::Binary(BinaryOp::Pow)) {
                prec
            } else {
                prec + 1
            };
            let right = self.parse_binary(next_min, no_in)?;
            let span = start.combine(&self.prev_span());
            left = match op {
                BinOrLogical::Binary(op) => {
                    self.ast
                        .alloc(Node::BinaryExpression { op, left, right }, span)
                }
                BinOrLogical::Logical(op) => {
                    self.ast
                        .alloc(Node::LogicalExpression { op, left, right }, span)
                }
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self, no_in: bool) -> PResult<NodeId> {
        let start = self.current().span;
        let op = match &self.current().kind {
            TokenKind::Punct(Punct::Bang) => Some(UnaryOp::Not),
            TokenKind::Punct(Punct::Tilde) => Some(UnaryOp::BitNot),
            TokenKind::Punct(Punct::Plus) => Some(UnaryOp::Plus),
            TokenKind::Punct(Punct::Minus) => Some(UnaryOp::Minus),
            TokenKind::Ident(name) => match name.as_str() {
                "typeof" => Some(UnaryOp::Typeof),
                "void" => Some(UnaryOp::Void),
                "delete" => Some(UnaryOp::Delete),
                _ => None,
            },
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            let argument = self.parse_unary(no_in)?;
            let span = start.combine(&self.prev_span());
            return Ok(self.ast.alloc(Node::UnaryExpression { op, argument }, span));
        }
        if self.check_punct(Punct::PlusPlus) || self.check_punct(Punct::MinusMinus) {
            let op = if self.check_punct(Punct::PlusPlus) {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            self.pos += 1;
            let argument = self.parse_unary(no_in)?;
            let span = start.combine(&self.prev_span());
            return Ok(self.ast.alloc(
                Node::UpdateExpression {
                    op,
                    argument,
                    prefix: true,
                },
                span,
            ));
        }
        self.parse_postfix(no_in)
    }

    fn parse_postfix(&mut self, _no_in: bool) -> PResult<NodeId> {
        let start = self.current().span;
        let argument = self.parse_lhs_expression()?;
        if (self.check_punct(Punct::PlusPlus) || self.check_punct(Punct::MinusMinus))
            && !self.current().newline_before
        {
            let op = if self.check_punct(Punct::PlusPlus) {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            self.pos += 1;
            let span = start.combine(&self.prev_span());
            return Ok(self.ast.alloc(
                Node::UpdateExpression {
                    op,
                    argument,
                    prefix: false,
                },
                span,
            ));
        }
        Ok(argument)
    }

    /// Member/call chain on top of a primary expression.
    pub(crate) fn parse_lhs_expression(&mut self) -> PResult<NodeId> {
        let start = self.current().span;
        let mut expr = if self.check_keyword("new") {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            if self.eat_punct(Punct::Dot) {
                let property = self.parse_property_name_after_dot()?;
                let span = start.combine(&self.prev_span());
                expr = self.ast.alloc(
                    Node::MemberExpression {
                        object: expr,
                        property,
                        computed: false,
                    },
                    span,
                );
            } else if self.eat_punct(Punct::LBracket) {
                let property = self.parse_expression(false)?;
                self.expect_punct(Punct::RBracket)?;
                let span = start.combine(&self.prev_span());
                expr = self.ast.alloc(
                    Node::MemberExpression {
                        object: expr,
                        property,
                        computed: true,
                    },
                    span,
                );
            } else if self.check_punct(Punct::LParen) {
                let arguments = self.parse_arguments()?;
                let span = start.combine(&self.prev_span());
                expr = self.ast.alloc(
                    Node::CallExpression {
                        callee: expr,
                        arguments,
                    },
                    span,
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// After `.` any identifier-shaped word is a property name, keywords
    /// included (`a.delete`, `a.in`).
    fn parse_property_name_after_dot(&mut self) -> PResult<NodeId> {
        match &self.current().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                let span = self.current().span;
                self.pos += 1;
                Ok(self.ast.alloc(Node::Identifier { name }, span))
            }
            _ => Err(self.unexpected("expected property name")),
        }
    }

    fn parse_arguments(&mut self) -> PResult<Vec<NodeId>> {
        self.expect_punct(Punct::LParen)?;
        let mut args = Vec::new();
        while !self.check_punct(Punct::RParen) {
            if self.check_punct(Punct::Ellipsis) {
                let start = self.advance().span;
                let argument = self.parse_assignment(false)?;
                let span = start.combine(&self.prev_span());
                args.push(self.ast.alloc(Node::SpreadElement { argument }, span));
            } else {
                args.push(self.parse_assignment(false)?);
            }
            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }
        self.expect_punct(Punct::RParen)?;
        Ok(args)
    }

    fn parse_new(&mut self) -> PResult<NodeId> {
        let start = self.expect_keyword("new")?;
        // Callee: primary plus member accesses, but no call; a following
        // argument list belongs to the `new` itself.
        let mut callee = if self.check_keyword("new") {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            if self.eat_punct(Punct::Dot) {
                let property = self.parse_property_name_after_dot()?;
                let span = start.combine(&self.prev_span());
                callee = self.ast.alloc(
                    Node::MemberExpression {
                        object: callee,
                        property,
                        computed: false,
                    },
                    span,
                );
            } else if self.eat_punct(Punct::LBracket) {
                let property = self.parse_expression(false)?;
                self.expect_punct(Punct::RBracket)?;
                let span = start.combine(&self.prev_span());
                callee = self.ast.alloc(
                    Node::MemberExpression {
                        object: callee,
                        property,
                        computed: true,
                    },
                    span,
                );
            } else {
                break;
            }
        }
        let arguments = if self.check_punct(Punct::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        let span = start.combine(&self.prev_span());
        Ok(self
            .ast
            .alloc(Node::NewExpression { callee, arguments }, span))
    }

    fn parse_primary(&mut self) -> PResult<NodeId> {
        let tok = self.current().clone();
        match tok.kind {
            TokenKind::Number(n) => {
                self.pos += 1;
                Ok(self.ast.alloc(
                    Node::Literal {
                        value: LiteralValue::Number(n),
                    },
                    tok.span,
                ))
            }
            TokenKind::Str(s) => {
                self.pos += 1;
                Ok(self.ast.alloc(
                    Node::Literal {
                        value: LiteralValue::String(s),
                    },
                    tok.span,
                ))
            }
            TokenKind::Regex { pattern, flags } => {
                self.pos += 1;
                Ok(self.ast.alloc(
                    Node::Literal {
                        value: LiteralValue::Regex { pattern, flags },
                    },
                    tok.span,
                ))
            }
            TokenKind::Template(parts) => {
                self.pos += 1;
                self.build_template(parts, tok.span)
            }
            TokenKind::Punct(Punct::LParen) => {
                self.pos += 1;
                let expr = self.parse_expression(false)?;
                self.expect_punct(Punct::RParen)?;
                Ok(expr)
            }
            TokenKind::Punct(Punct::LBracket) => self.parse_array_literal(),
            TokenKind::Punct(Punct::LBrace) => self.parse_object_literal(),
            TokenKind::Ident(name) => match name.as_str() {
                "this" => {
                    self.pos += 1;
                    Ok(self.ast.alloc(Node::ThisExpression, tok.span))
                }
                "true" | "false" => {
                    self.pos += 1;
                    Ok(self.ast.alloc(
                        Node::Literal {
                            value: LiteralValue::Boolean(name == "true"),
                        },
                        tok.span,
                    ))
                }
                "null" => {
                    self.pos += 1;
                    Ok(self.ast.alloc(
                        Node::Literal {
                            value: LiteralValue::Null,
                        },
                        tok.span,
                    ))
                }
                "function" => self.parse_function_expression(),
                "class" => Err(self.unexpected("class expressions are not supported")),
                _ if !is_keyword(&name) => {
                    self.pos += 1;
                    Ok(self.ast.alloc(Node::Identifier { name }, tok.span))
                }
                _ => Err(self.unexpected("unexpected keyword")),
            },
            _ => Err(self.unexpected("expected expression")),
        }
    }

    fn parse_function_expression(&mut self) -> PResult<NodeId> {
        let start = self.expect_keyword("function")?;
        let id = if matches!(&self.current().kind, TokenKind::Ident(n) if !is_keyword(n)) {
            Some(self.parse_identifier()?)
        } else {
            None
        };
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        let span = start.combine(&self.ast.span(body));
        Ok(self
            .ast
            .alloc(Node::FunctionExpression { id, params, body }, span))
    }

    fn parse_array_literal(&mut self) -> PResult<NodeId> {
        let start = self.expect_punct(Punct::LBracket)?;
        let mut elements = Vec::new();
        loop {
            if self.check_punct(Punct::RBracket) {
                break;
            }
            if self.eat_punct(Punct::Comma) {
                elements.push(None);
                continue;
            }
            let el = if self.check_punct(Punct::Ellipsis) {
                let spread_start = self.advance().span;
                let argument = self.parse_assignment(false)?;
                let span = spread_start.combine(&self.prev_span());
                self.ast.alloc(Node::SpreadElement { argument }, span)
            } else {
                self.parse_assignment(false)?
            };
            elements.push(Some(el));
            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }
        let end = self.expect_punct(Punct::RBracket)?;
        Ok(self
            .ast
            .alloc(Node::ArrayExpression { elements }, start.combine(&end)))
    }

    fn parse_object_literal(&mut self) -> PResult<NodeId> {
        let start = self.expect_punct(Punct::LBrace)?;
        let mut properties = Vec::new();
        while !self.check_punct(Punct::RBrace) {
            if self.check_punct(Punct::Ellipsis) {
                let spread_start = self.advance().span;
                let argument = self.parse_assignment(false)?;
                let span = spread_start.combine(&self.prev_span());
                properties.push(self.ast.alloc(Node::SpreadElement { argument }, span));
            } else {
                properties.push(self.parse_property()?);
            }
            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }
        let end = self.expect_punct(Punct::RBrace)?;
        Ok(self
            .ast
            .alloc(Node::ObjectExpression { properties }, start.combine(&end)))
    }

    fn parse_property(&mut self) -> PResult<NodeId> {
        let start = self.current().span;

        // Accessor properties: `get key() {}` / `set key(v) {}` where the
        // word is not itself the key.
        let accessor = (self.check_keyword("get") || self.check_keyword("set"))
            && !matches!(
                self.peek(1).map(|t| &t.kind),
                Some(TokenKind::Punct(Punct::Colon))
                    | Some(TokenKind::Punct(Punct::Comma))
                    | Some(TokenKind::Punct(Punct::RBrace))
                    | Some(TokenKind::Punct(Punct::LParen))
            );
        if accessor {
            let kind = if self.check_keyword("get") {
                PropertyKind::Get
            } else {
                PropertyKind::Set
            };
            self.pos += 1;
            let (key, computed) = self.parse_property_key()?;
            let params = self.parse_params()?;
            let body = self.parse_block()?;
            let fn_span = self.ast.span(key).combine(&self.ast.span(body));
            let value = self.ast.alloc(
                Node::FunctionExpression {
                    id: None,
                    params,
                    body,
                },
                fn_span,
            );
            let span = start.combine(&self.prev_span());
            return Ok(self.ast.alloc(
                Node::Property {
                    key,
                    value,
                    kind,
                    computed,
                    shorthand: false,
                },
                span,
            ));
        }

        let (key, computed) = self.parse_property_key()?;

        // Method shorthand.
        if self.check_punct(Punct::LParen) {
            let params = self.parse_params()?;
            let body = self.parse_block()?;
            let fn_span = self.ast.span(key).combine(&self.ast.span(body));
            let value = self.ast.alloc(
                Node::FunctionExpression {
                    id: None,
                    params,
                    body,
                },
                fn_span,
            );
            let span = start.combine(&self.prev_span());
            return Ok(self.ast.alloc(
                Node::Property {
                    key,
                    value,
                    kind: PropertyKind::Init,
                    computed,
                    shorthand: false,
                },
                span,
            ));
        }

        if self.eat_punct(Punct::Colon) {
            let value = self.parse_assignment(false)?;
            let span = start.combine(&self.prev_span());
            return Ok(self.ast.alloc(
                Node::Property {
                    key,
                    value,
                    kind: PropertyKind::Init,
                    computed,
                    shorthand: false,
                },
                span,
            ));
        }

        // Shorthand `{ a }`: the value is a reference to the same name.
        if computed {
            return Err(self.unexpected("expected ':' after computed property key"));
        }
        let name = self
            .ast
            .ident_name(key)
            .ok_or_else(|| self.unexpected("expected ':' after property key"))?
            .to_string();
        let value = self.ast.alloc(Node::Identifier { name }, self.ast.span(key));
        let span = start.combine(&self.prev_span());
        Ok(self.ast.alloc(
            Node::Property {
                key,
                value,
                kind: PropertyKind::Init,
                computed: false,
                shorthand: true,
            },
            span,
        ))
    }

    /// `ident`, `"string"`, `42`, keyword-as-name, or `[computed]`.
    pub(crate) fn parse_property_key(&mut self) -> PResult<(NodeId, bool)> {
        let tok = self.current().clone();
        match tok.kind {
            TokenKind::Punct(Punct::LBracket) => {
                self.pos += 1;
                let key = self.parse_assignment(false)?;
                self.expect_punct(Punct::RBracket)?;
                Ok((key, true))
            }
            TokenKind::Ident(name) => {
                self.pos += 1;
                Ok((self.ast.alloc(Node::Identifier { name }, tok.span), false))
            }
            TokenKind::Str(s) => {
                self.pos += 1;
                Ok((
                    self.ast.alloc(
                        Node::Literal {
                            value: LiteralValue::String(s),
                        },
                        tok.span,
                    ),
                    false,
                ))
            }
            TokenKind::Number(n) => {
                self.pos += 1;
                Ok((
                    self.ast.alloc(
                        Node::Literal {
                            value: LiteralValue::Number(n),
                        },
                        tok.span,
                    ),
                    false,
                ))
            }
            _ => Err(self.unexpected("expected property key")),
        }
    }

    // ------------------------------------------------------------------
    // Arrow functions
    // ------------------------------------------------------------------

    /// Detects and parses an arrow function at the current position.
    /// Returns `Ok(None)` when the tokens do not start one.
    fn try_parse_arrow(&mut self, _no_in: bool) -> PResult<Option<NodeId>> {
        let start = self.current().span;

        // Single-identifier parameter.
        if matches!(&self.current().kind, TokenKind::Ident(n) if !is_keyword(n))
            && matches!(
                self.peek(1).map(|t| &t.kind),
                Some(TokenKind::Punct(Punct::Arrow))
            )
        {
            let param = self.parse_identifier()?;
            self.expect_punct(Punct::Arrow)?;
            return Ok(Some(self.parse_arrow_body(start, vec![param])?));
        }

        // Parenthesized parameter list: scan for `) =>`.
        if self.check_punct(Punct::LParen) && self.paren_group_is_arrow_params() {
            let params = self.parse_params()?;
            self.expect_punct(Punct::Arrow)?;
            return Ok(Some(self.parse_arrow_body(start, params)?));
        }
        Ok(None)
    }

    fn paren_group_is_arrow_params(&self) -> bool {
        let mut depth = 0usize;
        let mut i = self.pos;
        while let Some(tok) = self.tokens.get(i) {
            match &tok.kind {
                TokenKind::Punct(Punct::LParen) => depth += 1,
                TokenKind::Punct(Punct::RParen) => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(
                            self.tokens.get(i + 1).map(|t| &t.kind),
                            Some(TokenKind::Punct(Punct::Arrow))
                        );
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            i += 1;
        }
        false
    }

    fn parse_arrow_body(&mut self, start: Span, params: Vec<NodeId>) -> PResult<NodeId> {
        let (body, expression) = if self.check_punct(Punct::LBrace) {
            (self.parse_block()?, false)
        } else {
            (self.parse_assignment(false)?, true)
        };
        let span = start.combine(&self.prev_span());
        Ok(self.ast.alloc(
            Node::ArrowFunctionExpression {
                params,
                body,
                expression,
            },
            span,
        ))
    }

    // ------------------------------------------------------------------
    // Template literals
    // ------------------------------------------------------------------

    fn build_template(&mut self, parts: Vec<TemplatePart>, span: Span) -> PResult<NodeId> {
        let mut quasis = Vec::new();
        let mut expressions = Vec::new();
        for part in parts {
            match part {
                TemplatePart::Chunk { cooked, raw } => {
                    quasis.push(TemplateElement { cooked, raw });
                }
                TemplatePart::Expr { source, offset } => {
                    expressions.push(self.parse_fragment_expression(&source, offset)?);
                }
            }
        }
        debug_assert_eq!(quasis.len(), expressions.len() + 1);
        Ok(self.ast.alloc(
            Node::TemplateLiteral {
                quasis,
                expressions,
            },
            span,
        ))
    }

    /// Parses a detached source fragment (a template substitution) by
    /// temporarily swapping the token stream.
    fn parse_fragment_expression(&mut self, source: &str, offset: u32) -> PResult<NodeId> {
        let fragment_tokens = Lexer::new(source, offset).tokenize()?;
        let saved_tokens = std::mem::replace(&mut self.tokens, fragment_tokens);
        let saved_pos = std::mem::replace(&mut self.pos, 0);
        let result = self.parse_expression(false).and_then(|id| {
            if self.is_eof() {
                Ok(id)
            } else {
                Err(self.unexpected("unexpected trailing tokens in template substitution"))
            }
        });
        self.tokens = saved_tokens;
        self.pos = saved_pos;
        result
    }

    pub(crate) fn prev_span(&self) -> Span {
        if self.pos == 0 {
            self.current().span
        } else {
            self.tokens[self.pos - 1].span
        }
    }
}

enum BinOrLogical {
    Binary(BinaryOp),
    Logical(LogicalOp),
}
