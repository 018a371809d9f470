use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CompileError, Diagnostic, DiagnosticSink};
use crate::parser::lexer::{Token, TokenKind};
use crate::span::Span;

/// <KIND, "TEXT"> [Line: L, Column: C]
static TOKEN_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<(\w+),\s*"(.*?)">\s*\[Line:\s*(\d+),\s*Column:\s*(-?\d+)\]"#)
        .expect("valid token regex")
});

/// Одна строка на токен: перевод строки внутри строкового литерала
/// пишется как `\n`, обратная косая черта как `\\`.
pub fn write_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        out.push_str(&format!(
            "<{}, \"{}\"> [Line: {}, Column: {}]\n",
            token.kind.wire_name(),
            escape(&token.text),
            token.line(),
            token.column()
        ));
    }
    out
}

/// Строки не по формату уходят в диагностики и отбрасываются.
/// Пустой результат - ошибка.
pub fn read_tokens(
    text: &str,
    filename: &str,
    sink: &mut dyn DiagnosticSink,
) -> Result<Vec<Token>, CompileError> {
    let mut tokens = Vec::new();

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_token_line(line) {
            Some(token) => tokens.push(token),
            None => sink.report(Diagnostic::warning(
                filename,
                index + 1,
                1,
                format!("Error parsing token from line: {}", line),
            )),
        }
    }

    if tokens.is_empty() {
        return Err(CompileError::WireFormat {
            line: 0,
            message: format!("No tokens read from {}", filename),
        });
    }

    debug!("read {} tokens from {}", tokens.len(), filename);
    Ok(tokens)
}

fn parse_token_line(line: &str) -> Option<Token> {
    let captures = TOKEN_LINE.captures(line)?;
    let kind = TokenKind::from_wire_name(&captures[1])?;
    let text = unescape(&captures[2]);
    let line_number: usize = captures[3].parse().ok()?;
    // Старые дампы бывают с отрицательной колонкой
    let column: i64 = captures[4].parse().ok()?;
    let column = column.max(1) as usize;

    Some(Token::new(kind, text, Span::at(line_number, column)))
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

/// Неизвестные экранирования остаются как есть.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
