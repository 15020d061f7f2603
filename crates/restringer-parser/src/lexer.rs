//! Hand-written JavaScript lexer.
//!
//! Produces a flat token stream with byte spans. Template literals are
//! lexed as a single token whose substitution expressions are kept as raw
//! source fragments (with their absolute offsets); the parser re-lexes
//! those fragments. Regex literals are disambiguated from division by the
//! kind of the previous significant token.

use crate::span::Span;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Number(f64),
    Str(String),
    Template(Vec<TemplatePart>),
    Regex { pattern: String, flags: String },
    Punct(Punct),
    Eof,
}

/// A lexed piece of a template literal.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Chunk { cooked: String, raw: String },
    Expr { source: String, offset: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Dot,
    Ellipsis,
    Arrow,
    Colon,
    Question,
    Tilde,
    Bang,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    StarStar,
    EqEq,
    NotEq,
    EqEqEq,
    NotEqEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Shl,
    Shr,
    UShr,
    AmpAmp,
    PipePipe,
    QuestionQuestion,
    Amp,
    Pipe,
    Caret,
    PlusPlus,
    MinusMinus,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    StarStarEq,
    ShlEq,
    ShrEq,
    UShrEq,
    AmpEq,
    PipeEq,
    CaretEq,
    AmpAmpEq,
    PipePipeEq,
    QuestionQuestionEq,
}

impl Punct {
    pub fn as_str(self) -> &'static str {
        use Punct::*;
        match self {
            LParen => "(",
            RParen => ")",
            LBrace => "{",
            RBrace => "}",
            LBracket => "[",
            RBracket => "]",
            Semi => ";",
            Comma => ",",
            Dot => ".",
            Ellipsis => "...",
            Arrow => "=>",
            Colon => ":",
            Question => "?",
            Tilde => "~",
            Bang => "!",
            Assign => "=",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            StarStar => "**",
            EqEq => "==",
            NotEq => "!=",
            EqEqEq => "===",
            NotEqEq => "!==",
            Lt => "<",
            Gt => ">",
            LtEq => "<=",
            GtEq => ">=",
            Shl => "<<",
            Shr => ">>",
            UShr => ">>>",
            AmpAmp => "&&",
            PipePipe => "||",
            QuestionQuestion => "??",
            Amp => "&",
            Pipe => "|",
            Caret => "^",
            PlusPlus => "++",
            MinusMinus => "--",
            PlusEq => "+=",
            MinusEq => "-=",
            StarEq => "*=",
            SlashEq => "/=",
            PercentEq => "%=",
            StarStarEq => "**=",
            ShlEq => "<<=",
            ShrEq => ">>=",
            UShrEq => ">>>=",
            AmpEq => "&=",
            PipeEq => "|=",
            CaretEq => "^=",
            AmpAmpEq => "&&=",
            PipePipeEq => "||=",
            QuestionQuestionEq => "??=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Whether a line terminator appeared between the previous token and
    /// this one. Drives automatic semicolon insertion.
    pub newline_before: bool,
}

#[derive(Debug, Clone)]
pub struct LexError {
    pub message: String,
    pub offset: u32,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl std::error::Error for LexError {}

const KEYWORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "extends", "finally", "for", "function", "if", "in", "instanceof", "let", "new",
    "of", "return", "static", "switch", "this", "throw", "try", "typeof", "var", "void", "while",
    "yield",
];

pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

/// Whether `name` is a valid (non-keyword) identifier, used by the
/// computed-member normalization rule and the emitter.
pub fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

pub struct Lexer<'a> {
    source: &'a str,
    /// Current byte position within `source`.
    pos: usize,
    /// Added to every emitted span; non-zero when lexing a template
    /// substitution fragment.
    base: u32,
    tokens: Vec<Token>,
    newline_pending: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, base_offset: u32) -> Self {
        Lexer {
            source,
            pos: 0,
            base: base_offset,
            tokens: Vec::new(),
            newline_pending: false,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        loop {
            self.skip_trivia()?;
            let start = self.pos;
            let Some(ch) = self.peek() else {
                self.push(TokenKind::Eof, start, start);
                break;
            };
            if ch.is_ascii_digit() || (ch == '.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())) {
                self.lex_number(start)?;
            } else if ch == '"' || ch == '\'' {
                self.lex_string(start, ch)?;
            } else if ch == '`' {
                self.lex_template(start)?;
            } else if ch == '/' && self.regex_allowed() {
                self.lex_regex(start)?;
            } else if is_ident_start(ch) {
                self.lex_ident(start);
            } else {
                self.lex_punct(start)?;
            }
        }
        Ok(self.tokens)
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        let newline_before = self.newline_pending;
        self.newline_pending = false;
        self.tokens.push(Token {
            kind,
            span: Span::new(self.base + start as u32, self.base + end as u32),
            newline_before,
        });
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.source[self.pos..].starts_with(s)
    }

    fn error(&self, message: impl Into<String>, offset: usize) -> LexError {
        LexError {
            message: message.into(),
            offset: self.base + offset as u32,
        }
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(c) if c == '\n' || c == '\u{2028}' || c == '\u{2029}' => {
                    self.newline_pending = true;
                    self.bump();
                }
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.starts_with("//") => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.starts_with("/*") => {
                    let start = self.pos;
                    self.pos += 2;
                    loop {
                        if self.starts_with("*/") {
                            self.pos += 2;
                            break;
                        }
                        match self.bump() {
                            Some('\n') => self.newline_pending = true,
                            Some(_) => {}
                            None => return Err(self.error("unterminated block comment", start)),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// A `/` starts a regex literal when the previous significant token
    /// cannot end an expression.
    fn regex_allowed(&self) -> bool {
        match self.tokens.last().map(|t| &t.kind) {
            None => true,
            Some(TokenKind::Ident(name)) => is_keyword(name) && name != "this",
            Some(TokenKind::Number(_))
            | Some(TokenKind::Str(_))
            | Some(TokenKind::Template(_))
            | Some(TokenKind::Regex { .. }) => false,
            Some(TokenKind::Punct(p)) => !matches!(
                p,
                Punct::RParen | Punct::RBracket | Punct::PlusPlus | Punct::MinusMinus
            ),
            Some(TokenKind::Eof) => true,
        }
    }

    fn lex_ident(&mut self, start: usize) {
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                self.bump();
            } else {
                break;
            }
        }
        let text = self.source[start..self.pos].to_string();
        self.push(TokenKind::Ident(text), start, self.pos);
    }

    fn lex_number(&mut self, start: usize) -> Result<(), LexError> {
        let value = if self.starts_with("0x") || self.starts_with("0X") {
            self.pos += 2;
            self.lex_radix_digits(start, 16)?
        } else if self.starts_with("0o") || self.starts_with("0O") {
            self.pos += 2;
            self.lex_radix_digits(start, 8)?
        } else if self.starts_with("0b") || self.starts_with("0B") {
            self.pos += 2;
            self.lex_radix_digits(start, 2)?
        } else {
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
            if self.peek() == Some('.') {
                self.bump();
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            }
            if matches!(self.peek(), Some('e') | Some('E')) {
                self.bump();
                if matches!(self.peek(), Some('+') | Some('-')) {
                    self.bump();
                }
                if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    return Err(self.error("missing exponent digits", self.pos));
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            }
            self.source[start..self.pos]
                .parse::<f64>()
                .map_err(|_| self.error("malformed number literal", start))?
        };
        if self.peek().is_some_and(is_ident_start) {
            return Err(self.error("identifier starts immediately after number", self.pos));
        }
        self.push(TokenKind::Number(value), start, self.pos);
        Ok(())
    }

    fn lex_radix_digits(&mut self, start: usize, radix: u32) -> Result<f64, LexError> {
        let digits_start = self.pos;
        while self.peek().is_some_and(|c| c.is_digit(radix)) {
            self.bump();
        }
        if self.pos == digits_start {
            return Err(self.error("missing digits in number literal", start));
        }
        u64::from_str_radix(&self.source[digits_start..self.pos], radix)
            .map(|v| v as f64)
            .map_err(|_| self.error("number literal out of range", start))
    }

    fn lex_string(&mut self, start: usize, quote: char) -> Result<(), LexError> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string literal", start)),
                Some(c) if c == quote => break,
                Some('\\') => {
                    if let Some(decoded) = self.lex_escape(start)? {
                        value.push(decoded);
                    }
                }
                Some('\n') => return Err(self.error("unterminated string literal", start)),
                Some(c) => value.push(c),
            }
        }
        self.push(TokenKind::Str(value), start, self.pos);
        Ok(())
    }

    /// Decodes one escape sequence after a consumed backslash. Returns
    /// `None` for a line continuation.
    fn lex_escape(&mut self, literal_start: usize) -> Result<Option<char>, LexError> {
        let Some(c) = self.bump() else {
            return Err(self.error("unterminated escape sequence", literal_start));
        };
        let decoded = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '\n' => return Ok(None),
            'x' => {
                let code = self.lex_hex_digits(2)?;
                char::from_u32(code).ok_or_else(|| self.error("invalid \\x escape", self.pos))?
            }
            'u' => {
                if self.eat('{') {
                    let digits_start = self.pos;
                    while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                        self.bump();
                    }
                    let code = u32::from_str_radix(&self.source[digits_start..self.pos], 16)
                        .map_err(|_| self.error("invalid \\u{} escape", digits_start))?;
                    if !self.eat('}') {
                        return Err(self.error("unterminated \\u{} escape", digits_start));
                    }
                    char::from_u32(code)
                        .ok_or_else(|| self.error("invalid \\u{} escape", digits_start))?
                } else {
                    let code = self.lex_hex_digits(4)?;
                    // Surrogate pairs appear in obfuscated payloads; join
                    // them when the low half follows immediately.
                    if (0xd800..0xdc00).contains(&code) && self.starts_with("\\u") {
                        let save = self.pos;
                        self.pos += 2;
                        let low = self.lex_hex_digits(4)?;
                        if (0xdc00..0xe000).contains(&low) {
                            let joined = 0x10000 + ((code - 0xd800) << 10) + (low - 0xdc00);
                            char::from_u32(joined)
                                .ok_or_else(|| self.error("invalid surrogate pair", save))?
                        } else {
                            self.pos = save;
                            char::from_u32(0xfffd).unwrap()
                        }
                    } else {
                        char::from_u32(code).unwrap_or('\u{fffd}')
                    }
                }
            }
            '0'..='7' => {
                // Legacy octal escape, up to three digits.
                let mut code = c as u32 - '0' as u32;
                for _ in 0..2 {
                    match self.peek() {
                        Some(d @ '0'..='7') if code * 8 + (d as u32 - '0' as u32) <= 0xff => {
                            code = code * 8 + (d as u32 - '0' as u32);
                            self.bump();
                        }
                        _ => break,
                    }
                }
                char::from_u32(code).unwrap_or('\u{fffd}')
            }
            other => other,
        };
        Ok(Some(decoded))
    }

    fn lex_hex_digits(&mut self, count: usize) -> Result<u32, LexError> {
        let start = self.pos;
        for _ in 0..count {
            if !self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                return Err(self.error("invalid hex escape", start));
            }
            self.bump();
        }
        u32::from_str_radix(&self.source[start..self.pos], 16)
            .map_err(|_| self.error("invalid hex escape", start))
    }

    fn lex_template(&mut self, start: usize) -> Result<(), LexError> {
        self.bump();
        let mut parts = Vec::new();
        let mut cooked = String::new();
        let mut raw_start = self.pos;
        loop {
            if self.starts_with("${") {
                let raw = self.source[raw_start..self.pos].to_string();
                parts.push(TemplatePart::Chunk {
                    cooked: std::mem::take(&mut cooked),
                    raw,
                });
                self.pos += 2;
                let expr_start = self.pos;
                self.skip_template_expr(start)?;
                parts.push(TemplatePart::Expr {
                    source: self.source[expr_start..self.pos].to_string(),
                    offset: self.base + expr_start as u32,
                });
                // Consume the closing brace.
                self.bump();
                raw_start = self.pos;
                continue;
            }
            match self.bump() {
                None => return Err(self.error("unterminated template literal", start)),
                Some('`') => {
                    let raw = self.source[raw_start..self.pos - 1].to_string();
                    parts.push(TemplatePart::Chunk { cooked, raw });
                    break;
                }
                Some('\\') => {
                    if let Some(decoded) = self.lex_escape(start)? {
                        cooked.push(decoded);
                    }
                }
                Some(c) => cooked.push(c),
            }
        }
        self.push(TokenKind::Template(parts), start, self.pos);
        Ok(())
    }

    /// Advances to the `}` closing a `${` substitution, tracking nested
    /// braces, strings and templates. Leaves `pos` on the closing brace.
    fn skip_template_expr(&mut self, template_start: usize) -> Result<(), LexError> {
        let mut depth = 0usize;
        loop {
            let Some(c) = self.peek() else {
                return Err(self.error("unterminated template substitution", template_start));
            };
            match c {
                '}' if depth == 0 => return Ok(()),
                '{' => {
                    depth += 1;
                    self.bump();
                }
                '}' => {
                    depth -= 1;
                    self.bump();
                }
                '"' | '\'' => {
                    let quote = c;
                    self.bump();
                    loop {
                        match self.bump() {
                            None => {
                                return Err(self.error("unterminated string literal", template_start))
                            }
                            Some('\\') => {
                                self.bump();
                            }
                            Some(ch) if ch == quote => break,
                            Some(_) => {}
                        }
                    }
                }
                '`' => {
                    self.bump();
                    let mut inner_depth = 0usize;
                    loop {
                        match self.bump() {
                            None => {
                                return Err(self.error("unterminated template literal", template_start))
                            }
                            Some('\\') => {
                                self.bump();
                            }
                            Some('`') if inner_depth == 0 => break,
                            Some('$') if self.peek() == Some('{') => {
                                inner_depth += 1;
                                self.bump();
                            }
                            Some('}') if inner_depth > 0 => inner_depth -= 1,
                            Some(_) => {}
                        }
                    }
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn lex_regex(&mut self, start: usize) -> Result<(), LexError> {
        self.bump();
        let pattern_start = self.pos;
        let mut in_class = false;
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated regex literal", start)),
                Some('\\') => {
                    self.bump();
                }
                Some('[') => in_class = true,
                Some(']') => in_class = false,
                Some('/') if !in_class => break,
                Some('\n') => return Err(self.error("unterminated regex literal", start)),
                Some(_) => {}
            }
        }
        let pattern = self.source[pattern_start..self.pos - 1].to_string();
        let flags_start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        let flags = self.source[flags_start..self.pos].to_string();
        self.push(TokenKind::Regex { pattern, flags }, start, self.pos);
        Ok(())
    }

    fn lex_punct(&mut self, start: usize) -> Result<(), LexError> {
        use Punct::*;
        // Longest match first.
        const TABLE: &[(&str, Punct)] = &[
            (">>>=", UShrEq),
            ("...", Ellipsis),
            ("===", EqEqEq),
            ("!==", NotEqEq),
            (">>>", UShr),
            ("<<=", ShlEq),
            (">>=", ShrEq),
            ("**=", StarStarEq),
            ("&&=", AmpAmpEq),
            ("||=", PipePipeEq),
            ("??=", QuestionQuestionEq),
            ("=>", Arrow),
            ("==", EqEq),
            ("!=", NotEq),
            ("<=", LtEq),
            (">=", GtEq),
            ("<<", Shl),
            (">>", Shr),
            ("&&", AmpAmp),
            ("||", PipePipe),
            ("??", QuestionQuestion),
            ("++", PlusPlus),
            ("--", MinusMinus),
            ("+=", PlusEq),
            ("-=", MinusEq),
            ("*=", StarEq),
            ("/=", SlashEq),
            ("%=", PercentEq),
            ("&=", AmpEq),
            ("|=", PipeEq),
            ("^=", CaretEq),
            ("**", StarStar),
            ("(", LParen),
            (")", RParen),
            ("{", LBrace),
            ("}", RBrace),
            ("[", LBracket),
            ("]", RBracket),
            (";", Semi),
            (",", Comma),
            (".", Dot),
            (":", Colon),
            ("?", Question),
            ("~", Tilde),
            ("!", Bang),
            ("=", Assign),
            ("+", Plus),
            ("-", Minus),
            ("*", Star),
            ("/", Slash),
            ("%", Percent),
            ("<", Lt),
            (">", Gt),
            ("&", Amp),
            ("|", Pipe),
            ("^", Caret),
        ];
        for (text, punct) in TABLE {
            if self.starts_with(text) {
                self.pos += text.len();
                self.push(TokenKind::Punct(*punct), start, self.pos);
                return Ok(());
            }
        }
        Err(self.error(
            format!("unexpected character {:?}", self.peek().unwrap_or('\0')),
            start,
        ))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source, 0)
            .tokenize()
            .expect("lex failure")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_numbers() {
        assert_eq!(
            kinds("0x10 3.5 1e3 0b101"),
            vec![
                TokenKind::Number(16.0),
                TokenKind::Number(3.5),
                TokenKind::Number(1000.0),
                TokenKind::Number(5.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn decodes_string_escapes() {
        assert_eq!(
            kinds(r#"'\x6a\x51' "A" '\101'"#),
            vec![
                TokenKind::Str("jQ".into()),
                TokenKind::Str("A".into()),
                TokenKind::Str("A".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn regex_vs_division() {
        let toks = kinds("a / b; /re/g");
        assert!(matches!(toks[1], TokenKind::Punct(Punct::Slash)));
        assert!(matches!(toks[4], TokenKind::Regex { .. }));
    }

    #[test]
    fn template_with_substitution() {
        let toks = kinds("`a${x}b`");
        match &toks[0] {
            TokenKind::Template(parts) => {
                assert_eq!(parts.len(), 3);
                assert!(matches!(&parts[1], TemplatePart::Expr { source, .. } if source == "x"));
            }
            other => panic!("expected template, got {other:?}"),
        }
    }

    #[test]
    fn tracks_newline_before() {
        let toks = Lexer::new("a\nb", 0).tokenize().unwrap();
        assert!(!toks[0].newline_before);
        assert!(toks[1].newline_before);
    }
}
