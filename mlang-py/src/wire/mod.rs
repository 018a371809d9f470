//! Текстовые дампы токенов и AST. Нужны для отладки и для запуска стадий
//! по отдельности; внутри конвейера данные передаются в памяти.

pub mod ast;
pub mod tokens;
