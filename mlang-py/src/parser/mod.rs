pub mod lexer;
pub mod parser;

use crate::config::Config;
use crate::error::{CompileError, DiagnosticSink};
use crate::ir::ast;

/// Главная функция парсера - из текста в AST
pub fn parse(source: &str, config: &Config, sink: &mut dyn DiagnosticSink) -> Result<ast::Program, CompileError> {
    let tokens = lexer::tokenize_with(source, &config.lexer, sink);
    let program = parser::parse_tokens_with(tokens, &config.parser, sink)?;
    Ok(program)
}
