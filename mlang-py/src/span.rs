/// Позиция токена в исходнике. `line` и `column` считаются с единицы,
/// `start`/`end` - байтовые смещения.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(line: usize, column: usize, start: usize, end: usize) -> Self {
        Self { line, column, start, end }
    }

    /// Позиция без байтовых смещений (например, токен прочитан из дампа)
    pub fn at(line: usize, column: usize) -> Self {
        Self { line, column, start: 0, end: 0 }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self {
            line: 1,
            column: 1,
            start: 0,
            end: 0,
        }
    }
}
