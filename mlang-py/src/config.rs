/// Настройки лексера
#[derive(Debug, Clone)]
pub struct LexerOptions {
    /// Имя файла для диагностик
    pub filename: String,
    /// Перевод строки внутри строкового литерала считается ошибкой
    pub strict_strings: bool,
}

impl Default for LexerOptions {
    fn default() -> Self {
        Self {
            filename: "input".to_string(),
            strict_strings: false,
        }
    }
}

/// Что делать с конструкциями, которые грамматика не поддерживает
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnsupportedPolicy {
    /// Предупреждение в диагностики и пропуск
    #[default]
    Report,
    /// Жесткая ошибка разбора
    Error,
}

#[derive(Debug, Clone)]
pub struct ParserOptions {
    pub filename: String,
    pub unsupported: UnsupportedPolicy,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            filename: "input".to_string(),
            unsupported: UnsupportedPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CodegenOptions {
    pub indent_width: usize,
    pub simplify: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            indent_width: 4,
            simplify: true,
        }
    }
}

/// Все настройки конвейера разом
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub lexer: LexerOptions,
    pub parser: ParserOptions,
    pub codegen: CodegenOptions,
}

impl Config {
    /// Проставляет имя файла во все стадии, которые пишут диагностики.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        let filename = filename.into();
        self.parser.filename = filename.clone();
        self.lexer.filename = filename;
        self
    }
}
