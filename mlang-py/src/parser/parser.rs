use log::{debug, trace};

use super::lexer::{Token, TokenKind};
use crate::config::{ParserOptions, UnsupportedPolicy};
use crate::error::{CompileError, Diagnostic, DiagnosticSink};
use crate::ir::ast;
use crate::span::Span;

pub fn parse_tokens(
    tokens: Vec<Token>,
    sink: &mut dyn DiagnosticSink,
) -> Result<ast::Program, CompileError> {
    parse_tokens_with(tokens, &ParserOptions::default(), sink)
}

/// Разбор идет одним курсором вперед. Пропущенные конструкции попадают
/// в диагностики даже если потом разбор упал.
pub fn parse_tokens_with(
    tokens: Vec<Token>,
    options: &ParserOptions,
    sink: &mut dyn DiagnosticSink,
) -> Result<ast::Program, CompileError> {
    let mut parser = Parser::new(tokens, options);
    let result = parser.parse_program();
    for diagnostic in parser.diagnostics.drain(..) {
        sink.report(diagnostic);
    }
    result
}

/// Фатальными бывают только: нет `to`, плохой конец диапазона, нет `;`
/// после `return` и незакрытая `{`. Остальное - `Mismatch`: курсор
/// откатывается к началу конструкции, и она пропускается по `UnsupportedPolicy`.
#[derive(Debug)]
enum Failure {
    Fatal(CompileError),
    Mismatch(CompileError),
}

impl From<CompileError> for Failure {
    fn from(err: CompileError) -> Self {
        Failure::Fatal(err)
    }
}

type ParseResult<T> = Result<T, Failure>;

struct Parser<'a> {
    tokens: Vec<Token>,
    position: usize,
    options: &'a ParserOptions,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<Token>, options: &'a ParserOptions) -> Self {
        // Комментарии ничего не значат для грамматики
        let mut tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|t| t.kind != TokenKind::Comment)
            .collect();

        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let span = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", span));
        }

        Self {
            tokens,
            position: 0,
            options,
            diagnostics: Vec::new(),
        }
    }

    fn parse_program(&mut self) -> Result<ast::Program, CompileError> {
        let mut functions = Vec::new();

        while !self.is_at_end() {
            if !self.peek().is_keyword("fn") {
                self.skip_top_level(None)?;
                continue;
            }

            let start = self.position;
            match self.parse_function() {
                Ok(function) => {
                    debug!(
                        "parsed fn {} ({} params, {} statements)",
                        function.name,
                        function.parameters.len(),
                        function.body.statements.len()
                    );
                    functions.push(function);
                }
                Err(Failure::Mismatch(cause)) => {
                    self.position = start;
                    self.skip_top_level(Some(cause))?;
                }
                Err(Failure::Fatal(err)) => return Err(err),
            }
        }

        Ok(ast::Program { functions })
    }

    fn parse_function(&mut self) -> ParseResult<ast::Function> {
        self.advance(); // consume 'fn'

        let name = self.advance();
        if name.kind == TokenKind::Eof {
            return Err(self.mismatch(&name, "Expected function name after 'fn', found end of file"));
        }

        self.expect_delimiter("(", "after function name")?;
        let parameters = self.parse_parameters()?;

        let return_type = if self.peek().is_operator("->") {
            self.advance(); // consume '->'
            self.parse_return_type()?
        } else {
            String::new()
        };

        let open = self.expect_delimiter("{", "to open function body")?;
        let body = self.parse_block(&open)?;

        Ok(ast::Function {
            name: name.text,
            parameters,
            return_type,
            body,
        })
    }

    /// Параметры до закрывающей `)`. Запятые и скобки внутри `<...>`
    /// разделителями не считаются: `m: Matrix<Int, Float>` - один параметр.
    fn parse_parameters(&mut self) -> ParseResult<Vec<ast::Parameter>> {
        let mut parameters = Vec::new();
        let mut name = String::new();
        let mut type_name = String::new();
        let mut typed = false;
        let mut depth = 0usize;

        loop {
            let token = self.advance();
            if token.kind == TokenKind::Eof {
                return Err(self.mismatch(&token, "Unterminated parameter list, found end of file"));
            }

            if depth == 0 && (token.is_delimiter(")") || token.is_delimiter(",")) {
                if !name.is_empty() {
                    parameters.push(ast::Parameter {
                        name: std::mem::take(&mut name),
                        type_name: std::mem::take(&mut type_name),
                    });
                }
                type_name.clear();
                typed = false;
                if token.is_delimiter(")") {
                    break;
                }
                continue;
            }

            if depth == 0 && !typed && token.is_delimiter(":") {
                typed = true;
                continue;
            }

            if token.is_delimiter("<") {
                depth += 1;
            } else if token.is_delimiter(">") {
                if depth == 0 {
                    self.reject_unbalanced(&token)?;
                    continue;
                }
                depth -= 1;
            }

            if typed {
                type_name.push_str(&token.text);
            } else if name.is_empty() {
                name = token.text;
            } else {
                let description = format!("extra token {} in parameter name", describe(&token));
                self.reject(&token, description)?;
            }
        }

        Ok(parameters)
    }

    /// Тип после `->`: до парной `>` верхнего уровня или до `{`.
    fn parse_return_type(&mut self) -> ParseResult<String> {
        let mut type_name = String::new();
        let mut depth = 0usize;

        loop {
            let token = self.peek().clone();
            if token.kind == TokenKind::Eof {
                return Err(self.mismatch(&token, "Expected '{' after return type, found end of file"));
            }
            if depth == 0 && token.is_delimiter("{") {
                break;
            }

            self.advance();
            if depth == 0 && token.is_delimiter(">") {
                self.reject_unbalanced(&token)?;
                continue;
            }
            type_name.push_str(&token.text);

            if token.is_delimiter("<") {
                depth += 1;
            } else if token.is_delimiter(">") {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
        }

        // Лишние `>` после парной: `Vector<Int>>`
        while self.peek().is_delimiter(">") {
            let token = self.advance();
            self.reject_unbalanced(&token)?;
        }

        Ok(type_name)
    }

    /// Тело после уже съеденной `{`. Счетчик скобок начинается с 1,
    /// блок заканчивается, когда он возвращается к нулю.
    fn parse_block(&mut self, open: &Token) -> ParseResult<ast::Block> {
        let mut statements = Vec::new();
        let mut depth = 1usize;

        loop {
            let token = self.peek().clone();

            if token.kind == TokenKind::Eof {
                return Err(Failure::Fatal(self.error_at(
                    open,
                    format!(
                        "Mismatched braces: '{{' opened at line {}, column {} is never closed",
                        open.line(),
                        open.column()
                    ),
                )));
            }

            if token.is_delimiter("{") {
                depth += 1;
                self.advance();
            } else if token.is_delimiter("}") {
                depth -= 1;
                self.advance();
                if depth == 0 {
                    break;
                }
            } else if self.at_statement_start() {
                let start = self.position;
                match self.parse_statement() {
                    Ok(statement) => statements.push(statement),
                    Err(Failure::Mismatch(cause)) => {
                        self.position = start;
                        self.skip_statement(Some(cause))?;
                    }
                    Err(fatal) => return Err(fatal),
                }
            } else {
                self.skip_statement(None)?;
            }
        }

        Ok(ast::Block { statements })
    }

    fn parse_statement(&mut self) -> ParseResult<ast::Statement> {
        if self.peek().is_keyword("for") {
            self.parse_for()
        } else if self.peek().is_keyword("return") {
            self.parse_return()
        } else {
            self.parse_assignment()
        }
    }

    /// for <ident> in <expr> to <expr> { ... }
    fn parse_for(&mut self) -> ParseResult<ast::Statement> {
        self.advance(); // consume 'for'

        let variable = self.advance();
        if variable.kind != TokenKind::Identifier {
            return Err(self.mismatch(
                &variable,
                format!("Expected loop variable after 'for', found {}", describe(&variable)),
            ));
        }

        let keyword = self.peek().clone();
        if !keyword.is_keyword("in") {
            return Err(self.mismatch(
                &keyword,
                format!("Expected 'in' after loop variable, found {}", describe(&keyword)),
            ));
        }
        self.advance();

        let start = self.parse_expression()?;

        let keyword = self.peek().clone();
        if !keyword.is_keyword("to") {
            return Err(Failure::Fatal(self.error_at(
                &keyword,
                format!("Expected 'to' after range start, found {}", describe(&keyword)),
            )));
        }
        self.advance();

        let found = self.peek().clone();
        let end = self.parse_expression().map_err(|_| {
            Failure::Fatal(self.error_at(
                &found,
                format!("Expected range end expression after 'to', found {}", describe(&found)),
            ))
        })?;

        let open = self.expect_delimiter("{", "to open loop body")?;
        let body = self.parse_block(&open)?;

        Ok(ast::Statement::For {
            variable: variable.text,
            variable_type: ast::DEFAULT_LOOP_VARIABLE_TYPE.to_string(),
            start,
            end,
            body,
        })
    }

    /// return <expr> ;
    fn parse_return(&mut self) -> ParseResult<ast::Statement> {
        self.advance(); // consume 'return'

        if self.peek().is_delimiter(";") {
            self.advance();
            return Ok(ast::Statement::Return { value: None });
        }

        let value = self.parse_expression()?;

        let terminator = self.peek().clone();
        if !terminator.is_delimiter(";") {
            return Err(Failure::Fatal(self.error_at(
                &terminator,
                format!("Expected ';' after return statement, found {}", describe(&terminator)),
            )));
        }
        self.advance();

        Ok(ast::Statement::Return { value: Some(value) })
    }

    /// x = <expr> [;]
    fn parse_assignment(&mut self) -> ParseResult<ast::Statement> {
        let target = self.advance();
        self.advance(); // consume '='
        let value = self.parse_expression()?;

        if self.peek().is_delimiter(";") {
            self.advance();
        }

        Ok(ast::Statement::Assign {
            target: target.text,
            value,
        })
    }

    /// Операнд, затем пары (оператор, операнд) слева направо без приоритетов.
    fn parse_expression(&mut self) -> ParseResult<ast::Expression> {
        let mut left = self.parse_operand()?;

        while let Some(op) = self.peek_binary_operator() {
            self.advance(); // consume operator
            let right = self.parse_operand()?;
            left = ast::Expression::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_operand(&mut self) -> ParseResult<ast::Expression> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Literal => {
                self.advance();
                Ok(ast::Expression::Literal(token.text))
            }
            TokenKind::Identifier => {
                self.advance();
                if self.peek().is_delimiter("(") {
                    self.parse_call(token.text)
                } else {
                    Ok(ast::Expression::Identifier(token.text))
                }
            }
            _ => Err(self.mismatch(
                &token,
                format!("Expected literal or identifier, found {}", describe(&token)),
            )),
        }
    }

    fn parse_call(&mut self, name: String) -> ParseResult<ast::Expression> {
        self.advance(); // consume '('
        let mut arguments = Vec::new();

        if self.peek().is_delimiter(")") {
            self.advance();
            return Ok(ast::Expression::Call { name, arguments });
        }

        loop {
            arguments.push(self.parse_expression()?);

            let token = self.advance();
            if token.is_delimiter(")") {
                break;
            }
            if !token.is_delimiter(",") {
                return Err(self.mismatch(
                    &token,
                    format!("Expected ',' or ')' in call to '{}', found {}", name, describe(&token)),
                ));
            }
        }

        Ok(ast::Expression::Call { name, arguments })
    }

    /// Пропускает все до следующего `fn`.
    fn skip_top_level(&mut self, cause: Option<CompileError>) -> Result<(), CompileError> {
        let start = self.position;
        self.advance();
        while !self.is_at_end() && !self.peek().is_keyword("fn") {
            self.advance();
        }
        trace!("skipped {} top-level tokens", self.position - start);
        self.report_skipped(start, "top-level construct", cause)
    }

    /// Пропускает неподдерживаемую инструкцию до `;` или до скобки блока,
    /// чтобы счетчик скобок в `parse_block` остался верным.
    fn skip_statement(&mut self, cause: Option<CompileError>) -> Result<(), CompileError> {
        let start = self.position;
        let first = self.advance();
        if !first.is_delimiter(";") {
            while !self.is_at_end() && !self.at_statement_boundary() {
                self.advance();
            }
            if self.peek().is_delimiter(";") {
                self.advance();
            }
        }
        self.report_skipped(start, "statement", cause)
    }

    /// Один отчет на пропущенный кусок. Отчет ставится на первый токен,
    /// который еще никто не отрапортовал: `Unknown` уже отрапортовал лексер.
    fn report_skipped(
        &mut self,
        start: usize,
        what: &str,
        cause: Option<CompileError>,
    ) -> Result<(), CompileError> {
        let strict = self.options.unsupported == UnsupportedPolicy::Error;
        let cause = match (strict, cause) {
            (true, Some(cause)) => return Err(cause),
            (_, cause) => cause,
        };

        let Some(token) = self.tokens[start..self.position]
            .iter()
            .filter(|t| !t.is_delimiter(";"))
            .find(|t| strict || t.kind != TokenKind::Unknown)
            .cloned()
        else {
            return Ok(());
        };

        let mut description = format!("unsupported {} starting with {}", what, describe(&token));
        if let Some(CompileError::SyntaxError { message, .. }) = cause {
            description.push_str(&format!(" ({})", message));
        }
        self.reject(&token, description)
    }

    fn reject_unbalanced(&mut self, token: &Token) -> Result<(), CompileError> {
        self.reject(token, "unbalanced '>' in type annotation".to_string())
    }

    /// `Error` - сразу ошибка, `Report` - предупреждение, токены отбрасываются.
    fn reject(&mut self, token: &Token, description: String) -> Result<(), CompileError> {
        match self.options.unsupported {
            UnsupportedPolicy::Error => Err(self.error_at(token, capitalize(&description))),
            UnsupportedPolicy::Report => {
                let diagnostic = Diagnostic::warning(
                    &self.options.filename,
                    token.line(),
                    token.column(),
                    format!("Skipped {}", description),
                );
                debug!("{}", diagnostic);
                self.diagnostics.push(diagnostic);
                Ok(())
            }
        }
    }

    fn at_statement_start(&self) -> bool {
        let token = self.peek();
        token.is_keyword("for") || token.is_keyword("return") || self.at_assignment()
    }

    fn at_assignment(&self) -> bool {
        self.peek().kind == TokenKind::Identifier && self.lookahead(1).is_operator("=")
    }

    fn at_statement_boundary(&self) -> bool {
        let token = self.peek();
        token.is_delimiter("{")
            || token.is_delimiter("}")
            || token.is_delimiter(";")
            || self.at_statement_start()
    }

    fn peek_binary_operator(&self) -> Option<ast::BinaryOperator> {
        let token = self.peek();
        if token.kind == TokenKind::Operator {
            ast::BinaryOperator::from_symbol(&token.text)
        } else {
            None
        }
    }

    // Вспомогательные методы
    fn peek(&self) -> &Token {
        self.lookahead(0)
    }

    fn lookahead(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.position + n).min(last)]
    }

    /// На `Eof` курсор стоит на месте.
    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.position += 1;
        }
        token
    }

    fn expect_delimiter(&mut self, delimiter: &str, context: &str) -> ParseResult<Token> {
        let token = self.peek().clone();
        if token.is_delimiter(delimiter) {
            self.advance();
            Ok(token)
        } else {
            Err(self.mismatch(
                &token,
                format!("Expected '{}' {}, found {}", delimiter, context, describe(&token)),
            ))
        }
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn mismatch(&self, token: &Token, message: impl Into<String>) -> Failure {
        Failure::Mismatch(self.error_at(token, message))
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> CompileError {
        let Span { line, column, .. } = token.span;
        CompileError::syntax(line, column, message)
    }
}

fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::Eof => "end of file".to_string(),
        _ => format!("'{}'", token.text),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ast::{BinaryOperator, Expression, Statement};
    use crate::parser::lexer::tokenize;

    fn parse_source(source: &str) -> (Result<ast::Program, CompileError>, Vec<Diagnostic>) {
        parse_source_with(source, &ParserOptions::default())
    }

    fn parse_source_with(
        source: &str,
        options: &ParserOptions,
    ) -> (Result<ast::Program, CompileError>, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let tokens = tokenize(source, &mut diagnostics);
        let result = parse_tokens_with(tokens, options, &mut diagnostics);
        (result, diagnostics)
    }

    fn parse_ok(source: &str) -> ast::Program {
        match parse_source(source).0 {
            Ok(program) => program,
            Err(e) => panic!("unexpected parse error: {}", e),
        }
    }

    fn syntax_error(source: &str) -> (usize, usize, String) {
        match parse_source(source).0 {
            Err(CompileError::SyntaxError { line, column, message }) => (line, column, message),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    fn literal(text: &str) -> Expression {
        Expression::Literal(text.to_string())
    }

    #[test_log::test]
    fn minimal_function() {
        let program = parse_ok("fn f(x: Int) -> Int { return x + 0; }");
        assert_eq!(program.functions.len(), 1);

        let function = &program.functions[0];
        assert_eq!(function.name, "f");
        assert_eq!(function.return_type, "Int");
        assert_eq!(function.parameters.len(), 1);
        assert_eq!(function.parameters[0].name, "x");
        assert_eq!(function.parameters[0].type_name, "Int");
        assert_eq!(
            function.body.statements,
            vec![Statement::Return {
                value: Some(Expression::BinaryOp {
                    left: Box::new(Expression::Identifier("x".to_string())),
                    op: BinaryOperator::Add,
                    right: Box::new(literal("0")),
                }),
            }]
        );
    }

    #[test]
    fn generic_parameters_are_flattened() {
        let program = parse_ok(
            "fn f(v: Vector<Int>, m: Matrix<Vector<Float>>, pair: Dataset<Int, Float>, raw) -> Vector<Int> { }",
        );
        let function = &program.functions[0];
        let params: Vec<(&str, &str)> = function
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), p.type_name.as_str()))
            .collect();
        assert_eq!(
            params,
            vec![
                ("v", "Vector<Int>"),
                ("m", "Matrix<Vector<Float>>"),
                ("pair", "Dataset<Int,Float>"),
                ("raw", ""),
            ]
        );
        assert_eq!(function.return_type, "Vector<Int>");
        assert!(function.body.statements.is_empty());
    }

    #[test]
    fn missing_return_type_is_empty() {
        let program = parse_ok("fn main() { }");
        assert_eq!(program.functions[0].return_type, "");
        assert!(program.functions[0].parameters.is_empty());
    }

    #[test]
    fn expression_chain_is_left_associative() {
        let program = parse_ok("fn f() { return 1 - 2 * 3; }");
        let expected = Expression::BinaryOp {
            left: Box::new(Expression::BinaryOp {
                left: Box::new(literal("1")),
                op: BinaryOperator::Subtract,
                right: Box::new(literal("2")),
            }),
            op: BinaryOperator::Multiply,
            right: Box::new(literal("3")),
        };
        assert_eq!(
            program.functions[0].body.statements,
            vec![Statement::Return { value: Some(expected) }]
        );
    }

    #[test]
    fn call_operands() {
        let program = parse_ok("fn f() { return g(1, h()) / 2; }");
        let expected = Expression::BinaryOp {
            left: Box::new(Expression::Call {
                name: "g".to_string(),
                arguments: vec![
                    literal("1"),
                    Expression::Call {
                        name: "h".to_string(),
                        arguments: vec![],
                    },
                ],
            }),
            op: BinaryOperator::Divide,
            right: Box::new(literal("2")),
        };
        assert_eq!(
            program.functions[0].body.statements,
            vec![Statement::Return { value: Some(expected) }]
        );
    }

    #[test]
    fn bare_return() {
        let program = parse_ok("fn f() -> Void { return; }");
        assert_eq!(
            program.functions[0].body.statements,
            vec![Statement::Return { value: None }]
        );
    }

    #[test]
    fn for_loop_with_assignments() {
        let program = parse_ok("fn f() { for i in 0 to 5 { total = total + i; x = 1 } }");
        match &program.functions[0].body.statements[..] {
            [Statement::For { variable, variable_type, start, end, body }] => {
                assert_eq!(variable, "i");
                assert_eq!(variable_type, "Int");
                assert_eq!(start, &literal("0"));
                assert_eq!(end, &literal("5"));
                assert_eq!(body.statements.len(), 2);
                assert!(matches!(
                    &body.statements[1],
                    Statement::Assign { target, value } if target == "x" && value == &literal("1")
                ));
            }
            other => panic!("expected a single for loop, got {:?}", other),
        }
    }

    #[test]
    fn nested_for_loops_are_built() {
        let program = parse_ok("fn f() { for i in 0 to 3 { for j in i to 3 { y = j } } return 0; }");
        let statements = &program.functions[0].body.statements;
        assert_eq!(statements.len(), 2);
        let Statement::For { body, .. } = &statements[0] else {
            panic!("expected outer loop, got {:?}", statements[0]);
        };
        let Statement::For { variable, start, body: inner, .. } = &body.statements[0] else {
            panic!("expected inner loop, got {:?}", body.statements[0]);
        };
        assert_eq!(variable, "j");
        assert_eq!(start, &Expression::Identifier("i".to_string()));
        assert_eq!(inner.statements.len(), 1);
    }

    #[test]
    fn several_functions_and_comments() {
        let program = parse_ok(
            "// header\nfn a() -> Int { return 1; } // trailing\nfn b() -> Int { return 2; }",
        );
        let names: Vec<&str> = program.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn missing_to_is_fatal() {
        let (line, column, message) = syntax_error("fn f() {\n  for i in 0 { }\n}");
        assert_eq!((line, column), (2, 14));
        assert_eq!(message, "Expected 'to' after range start, found '{'");
    }

    #[test]
    fn missing_range_end_is_fatal() {
        let (line, column, message) = syntax_error("fn f() { for i in 0 to { } }");
        assert_eq!((line, column), (1, 24));
        assert_eq!(message, "Expected range end expression after 'to', found '{'");
    }

    #[test]
    fn missing_semicolon_is_fatal() {
        let (line, column, message) = syntax_error("fn f() -> Int { return 1 }");
        assert_eq!((line, column), (1, 26));
        assert_eq!(message, "Expected ';' after return statement, found '}'");
    }

    #[test]
    fn unclosed_body_is_mismatched_braces() {
        let (line, column, message) = syntax_error("fn f() -> Int {\n  return 1;\n");
        assert_eq!((line, column), (1, 15));
        assert!(message.starts_with("Mismatched braces"), "{}", message);
    }

    #[test]
    fn unclosed_loop_body_is_mismatched_braces() {
        let (_, _, message) = syntax_error("fn f() { for i in 0 to 2 { x = 1 }");
        assert!(message.starts_with("Mismatched braces"), "{}", message);
    }

    #[test]
    fn top_level_garbage_is_reported_and_skipped() {
        let (result, diagnostics) = parse_source("dataset d; fn f() { }");
        let program = result.expect("parse");
        assert_eq!(program.functions.len(), 1);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, crate::error::Severity::Warning);
        assert_eq!(
            diagnostics[0].message,
            "Skipped unsupported top-level construct starting with 'dataset'"
        );
    }

    #[test]
    fn unsupported_statement_is_skipped_up_to_semicolon() {
        let (result, diagnostics) = parse_source("fn f() { while 1; return 2; }");
        let program = result.expect("parse");
        assert_eq!(
            program.functions[0].body.statements,
            vec![Statement::Return { value: Some(literal("2")) }]
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!((diagnostics[0].line, diagnostics[0].column), (1, 10));
    }

    #[test]
    fn skipped_braces_keep_depth_balanced() {
        let (result, _) = parse_source("fn f() { if 1 { y = 2 } return 3; } fn g() { }");
        let program = result.expect("parse");
        assert_eq!(program.functions.len(), 2);
        assert_eq!(program.functions[0].body.statements.len(), 2);
    }

    #[test]
    fn strict_policy_turns_skips_into_errors() {
        let (result, diagnostics) = parse_source_with("fn f() { while 1; }", &strict());
        match result {
            Err(CompileError::SyntaxError { line, column, message }) => {
                assert_eq!((line, column), (1, 10));
                assert_eq!(message, "Unsupported statement starting with 'while'");
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn unknown_tokens_are_not_reported_twice() {
        let (result, diagnostics) = parse_source("fn f() { 3x; return 1; }");
        assert!(result.is_ok());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Invalid identifier '3x'");
    }

    #[test]
    fn token_stream_without_eof_is_accepted() {
        let tokens = vec![
            Token::new(TokenKind::Keyword, "fn", Span::at(1, 1)),
            Token::new(TokenKind::Identifier, "f", Span::at(1, 4)),
        ];
        let mut diagnostics = Vec::new();
        let program = parse_tokens(tokens, &mut diagnostics).expect("parse");
        assert!(program.functions.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].message,
            "Skipped unsupported top-level construct starting with 'fn' \
             (Expected '(' after function name, found end of file)"
        );
    }

    fn strict() -> ParserOptions {
        ParserOptions {
            unsupported: UnsupportedPolicy::Error,
            ..ParserOptions::default()
        }
    }

    #[test_log::test]
    fn bad_assignment_value_is_skipped() {
        let (result, diagnostics) = parse_source("fn f() { x = -1; return 2; }");
        let program = result.expect("parse");
        assert_eq!(
            program.functions[0].body.statements,
            vec![Statement::Return { value: Some(literal("2")) }]
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!((diagnostics[0].line, diagnostics[0].column), (1, 10));
        assert_eq!(
            diagnostics[0].message,
            "Skipped unsupported statement starting with 'x' \
             (Expected literal or identifier, found '-')"
        );
    }

    #[test]
    fn bad_assignment_in_loop_body_is_skipped() {
        let (result, diagnostics) = parse_source("fn f() { for i in 0 to 3 { y = Int } return 2; }");
        let program = result.expect("parse");
        let statements = &program.functions[0].body.statements;
        assert_eq!(statements.len(), 2);
        let Statement::For { body, .. } = &statements[0] else {
            panic!("expected loop, got {:?}", statements[0]);
        };
        assert!(body.statements.is_empty());
        assert_eq!(statements[1], Statement::Return { value: Some(literal("2")) });
        assert_eq!(diagnostics.len(), 1);
        assert_eq!((diagnostics[0].line, diagnostics[0].column), (1, 28));
    }

    #[test]
    fn bad_return_value_is_skipped() {
        let (result, diagnostics) = parse_source("fn f() { return * 2; return 3; }");
        let program = result.expect("parse");
        assert_eq!(
            program.functions[0].body.statements,
            vec![Statement::Return { value: Some(literal("3")) }]
        );
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn malformed_loop_header_is_skipped() {
        let (result, diagnostics) = parse_source("fn f() { for 1 in 0 to 3 { x = 1 } return 2; }");
        let program = result.expect("parse");
        assert_eq!(
            program.functions[0].body.statements,
            vec![
                Statement::Assign { target: "x".to_string(), value: literal("1") },
                Statement::Return { value: Some(literal("2")) },
            ]
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!((diagnostics[0].line, diagnostics[0].column), (1, 10));
    }

    #[test]
    fn strict_policy_reports_bad_assignment_at_operand() {
        let (result, _) = parse_source_with("fn f() { x = -1; }", &strict());
        match result {
            Err(CompileError::SyntaxError { line, column, message }) => {
                assert_eq!((line, column), (1, 14));
                assert_eq!(message, "Expected literal or identifier, found '-'");
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn malformed_function_header_is_skipped() {
        let (result, diagnostics) = parse_source("fn f { return 1; } fn g() { return 2; }");
        let program = result.expect("parse");
        let names: Vec<&str> = program.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["g"]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!((diagnostics[0].line, diagnostics[0].column), (1, 1));
        assert!(
            diagnostics[0].message.ends_with("(Expected '(' after function name, found '{')"),
            "{}",
            diagnostics[0].message
        );
    }

    #[test]
    fn unbalanced_angle_brackets_are_dropped_from_types() {
        let (result, diagnostics) = parse_source("fn f(x: Int>) -> Int> { return 1; }");
        let program = result.expect("parse");
        let function = &program.functions[0];
        assert_eq!(function.parameters[0].type_name, "Int");
        assert_eq!(function.return_type, "Int");
        assert_eq!(
            function.body.statements,
            vec![Statement::Return { value: Some(literal("1")) }]
        );

        let positions: Vec<(usize, usize)> =
            diagnostics.iter().map(|d| (d.line, d.column)).collect();
        assert_eq!(positions, vec![(1, 12), (1, 21)]);
        assert!(diagnostics
            .iter()
            .all(|d| d.message == "Skipped unbalanced '>' in type annotation"));
    }

    #[test]
    fn extra_closing_angle_after_return_type() {
        let (result, diagnostics) = parse_source("fn f() -> Vector<Int>> { return 1; }");
        assert_eq!(result.expect("parse").functions[0].return_type, "Vector<Int>");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!((diagnostics[0].line, diagnostics[0].column), (1, 22));
    }

    #[test]
    fn strict_policy_rejects_unbalanced_angle_bracket() {
        let (result, _) = parse_source_with("fn f(x: Int>) -> Int { return 1; }", &strict());
        match result {
            Err(CompileError::SyntaxError { line, column, message }) => {
                assert_eq!((line, column), (1, 12));
                assert_eq!(message, "Unbalanced '>' in type annotation");
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn extra_parameter_name_tokens_are_reported() {
        let (result, diagnostics) = parse_source("fn f(x y: Int) { }");
        let program = result.expect("parse");
        assert_eq!(program.functions[0].parameters[0].name, "x");
        assert_eq!(program.functions[0].parameters[0].type_name, "Int");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!((diagnostics[0].line, diagnostics[0].column), (1, 8));
        assert_eq!(diagnostics[0].message, "Skipped extra token 'y' in parameter name");

        let (strict_result, _) = parse_source_with("fn f(x y: Int) { }", &strict());
        assert!(matches!(
            strict_result,
            Err(CompileError::SyntaxError { line: 1, column: 8, .. })
        ));
    }

    #[test]
    fn skipped_run_is_reported_after_unknown_tokens() {
        let (result, diagnostics) = parse_source("@ dataset d; fn f() { }");
        assert_eq!(result.expect("parse").functions.len(), 1);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].message, "Unexpected character '@'");
        assert_eq!((diagnostics[1].line, diagnostics[1].column), (1, 3));
        assert_eq!(
            diagnostics[1].message,
            "Skipped unsupported top-level construct starting with 'dataset'"
        );
    }
}
