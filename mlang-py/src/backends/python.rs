use log::debug;

use super::simplify::simplify_expression;
use super::Backend;
use crate::config::CodegenOptions;
use crate::error::CompileError;
use crate::ir::ast;

pub struct PythonBackend {
    options: CodegenOptions,
    output: String,
    indent_level: usize,
}

impl Backend for PythonBackend {
    fn generate(&mut self, program: &ast::Program) -> Result<String, CompileError> {
        self.generate_program(program)
    }
}

impl PythonBackend {
    pub fn new(options: CodegenOptions) -> Self {
        Self {
            options,
            output: String::new(),
            indent_level: 0,
        }
    }

    pub fn generate_program(&mut self, program: &ast::Program) -> Result<String, CompileError> {
        self.output.clear();

        for (i, function) in program.functions.iter().enumerate() {
            // Пустая строка между функциями
            if i > 0 {
                self.output.push('\n');
            }
            self.generate_function(function);
        }

        debug!(
            "generated {} functions, {} bytes",
            program.functions.len(),
            self.output.len()
        );
        Ok(std::mem::take(&mut self.output))
    }

    fn generate_function(&mut self, function: &ast::Function) {
        self.indent_level = 0;

        let params: Vec<String> = function
            .parameters
            .iter()
            .map(|p| {
                if p.type_name.is_empty() {
                    p.name.clone()
                } else {
                    format!("{}: {}", p.name, p.type_name.to_lowercase())
                }
            })
            .collect();

        let header = if function.return_type.is_empty() {
            format!("def {}({}):", function.name, params.join(", "))
        } else {
            format!(
                "def {}({}) -> {}:",
                function.name,
                params.join(", "),
                function.return_type.to_lowercase()
            )
        };
        self.emit_line(&header);

        self.indent_level += 1;
        self.generate_block(&function.body);
        self.indent_level -= 1;
    }

    fn generate_block(&mut self, block: &ast::Block) {
        if block.statements.is_empty() {
            self.emit_line("pass");
            return;
        }
        for statement in &block.statements {
            self.generate_statement(statement);
        }
    }

    fn generate_statement(&mut self, statement: &ast::Statement) {
        match statement {
            ast::Statement::Assign { target, value } => {
                let value = self.simplify(&self.expression(value));
                self.emit_line(&format!("{} = {}", target, value));
            }
            ast::Statement::Return { value: Some(value) } => {
                let value = self.simplify(&self.expression(value));
                self.emit_line(&format!("return {}", value));
            }
            ast::Statement::Return { value: None } => {
                self.emit_line("return");
            }
            ast::Statement::For { variable, start, end, body, .. } => {
                self.generate_for(variable, start, end, body);
            }
        }
    }

    fn generate_for(
        &mut self,
        variable: &str,
        start: &ast::Expression,
        end: &ast::Expression,
        body: &ast::Block,
    ) {
        let start = self.simplify(&self.expression(start));
        let end = self.simplify(&self.expression(end));

        // Цикл без переменной или границ не выводим
        if variable.is_empty() || start.is_empty() || end.is_empty() {
            debug!("dropping incomplete for loop over '{}'", variable);
            return;
        }

        self.emit_line(&format!("for {} in range({}, {}):", variable, start, end));
        self.indent_level += 1;
        self.generate_block(body);
        self.indent_level -= 1;
    }

    /// Операнды упрощаются снизу вверх, так что `1 + 2 + 3` сворачивается целиком.
    fn expression(&self, expression: &ast::Expression) -> String {
        match expression {
            // Строки приходят от лексера без кавычек и выводятся как есть
            ast::Expression::Literal(value) => value.clone(),
            ast::Expression::Identifier(name) => name.clone(),
            ast::Expression::Call { name, arguments } => {
                let arguments: Vec<String> = arguments.iter().map(|a| self.expression(a)).collect();
                format!("{}({})", name, arguments.join(", "))
            }
            ast::Expression::BinaryOp { left, op, right } => {
                let text = format!(
                    "{} {} {}",
                    self.expression(left),
                    op.symbol(),
                    self.expression(right)
                );
                self.simplify(&text)
            }
        }
    }

    fn simplify(&self, text: &str) -> String {
        if self.options.simplify {
            simplify_expression(text)
        } else {
            text.to_string()
        }
    }

    fn emit_line(&mut self, line: &str) {
        let indent = self.indent_level * self.options.indent_width;
        self.output.push_str(&" ".repeat(indent));
        self.output.push_str(line);
        self.output.push('\n');
    }
}
