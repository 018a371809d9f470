use log::{debug, trace};

use crate::config::LexerOptions;
use crate::error::{Diagnostic, DiagnosticSink};
use crate::span::Span;

/// Зарезервированные слова языка. Все остальное - идентификаторы.
pub const KEYWORDS: &[&str] = &[
    "dataset", "fn", "for", "in", "return", "if", "else", "while", "Int", "Float", "Void",
    "Vector", "Matrix", "to", "Dataset",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Literal,
    Operator,
    Delimiter,
    Comment,
    Unknown,
    Eof,
}

impl TokenKind {
    /// Имя вида токена в текстовом дампе
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Keyword => "KEYWORD",
            Self::Identifier => "IDENTIFIER",
            Self::Literal => "LITERAL",
            Self::Operator => "OPERATOR",
            Self::Delimiter => "DELIMITER",
            Self::Comment => "COMMENT",
            Self::Unknown => "UNKNOWN",
            Self::Eof => "END_OF_FILE",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        let kind = match name {
            "KEYWORD" => Self::Keyword,
            "IDENTIFIER" => Self::Identifier,
            "LITERAL" => Self::Literal,
            "OPERATOR" => Self::Operator,
            "DELIMITER" => Self::Delimiter,
            "COMMENT" => Self::Comment,
            "UNKNOWN" => Self::Unknown,
            "END_OF_FILE" => Self::Eof,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }

    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.is(TokenKind::Keyword, keyword)
    }

    pub fn is_delimiter(&self, delimiter: &str) -> bool {
        self.is(TokenKind::Delimiter, delimiter)
    }

    pub fn is_operator(&self, operator: &str) -> bool {
        self.is(TokenKind::Operator, operator)
    }

    pub fn line(&self) -> usize {
        self.span.line
    }

    pub fn column(&self) -> usize {
        self.span.column
    }
}

/// Разбивает исходник на токены с настройками по умолчанию.
pub fn tokenize(source: &str, sink: &mut dyn DiagnosticSink) -> Vec<Token> {
    tokenize_with(source, &LexerOptions::default(), sink)
}

/// Лексер никогда не падает: все непонятное превращается в `Unknown`
/// с диагностикой, а последовательность всегда заканчивается `Eof`.
pub fn tokenize_with(
    source: &str,
    options: &LexerOptions,
    sink: &mut dyn DiagnosticSink,
) -> Vec<Token> {
    let (tokens, diagnostics) = Lexer::new(source, options).run();
    debug!(
        "{}: {} tokens, {} lexical errors",
        options.filename,
        tokens.len(),
        diagnostics.len()
    );
    for diagnostic in diagnostics {
        sink.report(diagnostic);
    }
    tokens
}

/// Начало токена: строка, колонка и байтовое смещение
#[derive(Debug, Clone, Copy)]
struct Mark {
    line: usize,
    column: usize,
    offset: usize,
}

struct Lexer<'a> {
    source: &'a str,
    options: &'a LexerOptions,
    position: usize,
    line: usize,
    column: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, options: &'a LexerOptions) -> Self {
        Self {
            source,
            options,
            position: 0,
            line: 1,
            column: 1,
            diagnostics: Vec::new(),
        }
    }

    fn run(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            if self.is_at_end() {
                break;
            }
            let token = self.scan_token();
            trace!("{:?}", token);
            tokens.push(token);
        }

        let end = self.mark();
        tokens.push(self.token(end, TokenKind::Eof, ""));
        (tokens, self.diagnostics)
    }

    fn scan_token(&mut self) -> Token {
        let start = self.mark();
        let Some(ch) = self.advance() else {
            return self.token(start, TokenKind::Eof, "");
        };

        match ch {
            '(' | ')' | '{' | '}' | '[' | ']' | ',' | ':' | ';' | '<' | '>' => {
                self.token(start, TokenKind::Delimiter, ch.to_string())
            }
            '.' => {
                if self.peek() == Some('.') {
                    self.advance();
                    self.token(start, TokenKind::Operator, "..")
                } else {
                    self.token(start, TokenKind::Delimiter, ".")
                }
            }
            '+' | '*' | '=' => self.token(start, TokenKind::Operator, ch.to_string()),
            '-' => {
                if self.peek() == Some('>') {
                    self.advance();
                    self.token(start, TokenKind::Operator, "->")
                } else {
                    self.token(start, TokenKind::Operator, "-")
                }
            }
            '/' => {
                if self.peek() == Some('/') {
                    self.skip_comment();
                    self.token(start, TokenKind::Comment, "")
                } else {
                    self.token(start, TokenKind::Operator, "/")
                }
            }
            '"' => self.scan_string(start),
            c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(start, c),
            c if c.is_ascii_digit() => self.scan_number(start, c),
            _ => {
                self.error(start, format!("Unexpected character '{}'", ch));
                self.token(start, TokenKind::Unknown, ch.to_string())
            }
        }
    }

    fn scan_identifier(&mut self, start: Mark, first: char) -> Token {
        let mut value = first.to_string();
        while let Some(ch) = self.peek().filter(|c| is_identifier_char(*c)) {
            value.push(ch);
            self.advance();
        }

        if KEYWORDS.contains(&value.as_str()) {
            self.token(start, TokenKind::Keyword, value)
        } else {
            self.token(start, TokenKind::Identifier, value)
        }
    }

    fn scan_number(&mut self, start: Mark, first: char) -> Token {
        let mut value = first.to_string();
        let mut has_decimal_point = false;

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                value.push(ch);
                self.advance();
            } else if ch == '.' {
                // `0..5` - это число и оператор диапазона
                if self.peek_next() == Some('.') {
                    break;
                }
                value.push(ch);
                self.advance();
                if has_decimal_point {
                    self.error(start, format!("Invalid number '{}'", value));
                    return self.token(start, TokenKind::Unknown, value);
                }
                has_decimal_point = true;
            } else {
                break;
            }
        }

        // 3x: ни число, ни идентификатор
        if self
            .peek()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        {
            while let Some(ch) = self.peek().filter(|c| is_identifier_char(*c)) {
                value.push(ch);
                self.advance();
            }
            self.error(start, format!("Invalid identifier '{}'", value));
            return self.token(start, TokenKind::Unknown, value);
        }

        self.token(start, TokenKind::Literal, value)
    }

    fn scan_string(&mut self, start: Mark) -> Token {
        let mut value = String::new();

        while let Some(ch) = self.peek() {
            if ch == '"' || (ch == '\n' && self.options.strict_strings) {
                break;
            }
            value.push(ch);
            self.advance();
        }

        if self.peek() == Some('"') {
            self.advance(); // закрывающая кавычка
            self.token(start, TokenKind::Literal, value)
        } else {
            self.error(start, "Unterminated string literal");
            self.token(start, TokenKind::Unknown, value)
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\n')) {
            self.advance();
        }
    }

    fn skip_comment(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.advance();
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.position..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        self.source[self.position..].chars().nth(1)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.source.len()
    }

    fn mark(&self) -> Mark {
        Mark {
            line: self.line,
            column: self.column,
            offset: self.position,
        }
    }

    fn token(&self, start: Mark, kind: TokenKind, text: impl Into<String>) -> Token {
        Token::new(
            kind,
            text,
            Span::new(start.line, start.column, start.offset, self.position),
        )
    }

    fn error(&mut self, at: Mark, message: impl Into<String>) {
        let diagnostic = Diagnostic::error(&self.options.filename, at.line, at.column, message);
        debug!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}
