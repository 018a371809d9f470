//! Компилятор маленького типизированного скриптового языка в Python.
//!
//! Конвейер: лексер -> парсер -> AST -> бэкенд. Стадии - чистые функции,
//! данные между ними передаются в памяти.

pub mod backends;
pub mod config;
pub mod error;
pub mod ir;
pub mod parser;
pub mod span;
pub mod wire;

use backends::BackendType;
use config::Config;
use error::{CompileError, DiagnosticSink};

/// Весь конвейер целиком: исходник -> текст на целевом языке.
pub fn compile(
    source: &str,
    config: &Config,
    target: BackendType,
    sink: &mut dyn DiagnosticSink,
) -> Result<String, CompileError> {
    let program = parser::parse(source, config, sink)?;
    let mut backend = target.create(&config.codegen);
    backend.generate(&program)
}
