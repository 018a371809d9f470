//! Дамп AST: один узел на строку, `KIND` или `KIND: VALUE`, отступ по два
//! пробела на уровень. Значение отделяется первым двоеточием.

use log::{debug, warn};

use crate::error::CompileError;
use crate::ir::ast;

const INDENT: usize = 2;

pub fn write_program(program: &ast::Program) -> String {
    let mut writer = Writer::default();
    for function in &program.functions {
        writer.function(function);
    }
    writer.out
}

#[derive(Default)]
struct Writer {
    out: String,
}

impl Writer {
    fn node(&mut self, depth: usize, kind: &str) {
        self.out.push_str(&" ".repeat(depth * INDENT));
        self.out.push_str(kind);
        self.out.push('\n');
    }

    fn value(&mut self, depth: usize, kind: &str, value: &str) {
        self.node(depth, &format!("{}: {}", kind, value));
    }

    fn function(&mut self, function: &ast::Function) {
        self.node(0, "FUNCTION_DEFINITION");
        self.value(1, "FUNCTION_NAME", &function.name);
        self.value(1, "RETURN_TYPE", &function.return_type);
        self.node(1, "PARAMETERS");
        for param in &function.parameters {
            self.value(2, "PARAMETER", &typed(&param.name, &param.type_name));
        }
        self.node(1, "FUNCTION_BODY");
        self.block(2, &function.body);
    }

    fn block(&mut self, depth: usize, block: &ast::Block) {
        for statement in &block.statements {
            self.statement(depth, statement);
        }
    }

    fn statement(&mut self, depth: usize, statement: &ast::Statement) {
        match statement {
            ast::Statement::Return { value } => {
                self.node(depth, "RETURN_STATEMENT");
                if let Some(value) = value {
                    self.node(depth + 1, "EXPRESSION");
                    self.expression(depth + 2, value);
                }
            }
            ast::Statement::Assign { target, value } => {
                self.node(depth, "ASSIGNMENT_EXPRESSION");
                self.value(depth + 1, "IDENTIFIER", target);
                self.node(depth + 1, "EXPRESSION");
                self.expression(depth + 2, value);
            }
            ast::Statement::For {
                variable,
                variable_type,
                start,
                end,
                body,
            } => {
                self.node(depth, "FOR_LOOP");
                self.value(depth + 1, "LOOP_VARIABLE", &typed(variable, variable_type));
                self.node(depth + 1, "RANGE_START");
                self.expression(depth + 2, start);
                self.node(depth + 1, "RANGE_END");
                self.expression(depth + 2, end);
                self.node(depth + 1, "LOOP_BODY");
                self.block(depth + 2, body);
            }
        }
    }

    fn expression(&mut self, depth: usize, expression: &ast::Expression) {
        match expression {
            ast::Expression::Literal(value) => self.value(depth, "LITERAL_VALUE", value),
            ast::Expression::Identifier(name) => self.value(depth, "IDENTIFIER", name),
            ast::Expression::Call { name, arguments } => {
                self.value(depth, "FUNCTION_CALL", name);
                if !arguments.is_empty() {
                    self.node(depth + 1, "ARGUMENTS");
                    for argument in arguments {
                        self.expression(depth + 2, argument);
                    }
                }
            }
            ast::Expression::BinaryOp { left, op, right } => {
                self.value(depth, "OPERATOR", op.symbol());
                self.expression(depth + 1, left);
                self.expression(depth + 1, right);
            }
        }
    }
}

fn typed(name: &str, type_name: &str) -> String {
    if type_name.is_empty() {
        name.to_string()
    } else {
        format!("{} (TYPE: {})", name, type_name)
    }
}

fn split_typed(value: &str) -> (String, String) {
    match value.split_once(" (TYPE: ") {
        Some((name, rest)) => {
            let type_name = rest.strip_suffix(')').unwrap_or(rest);
            (name.to_string(), type_name.to_string())
        }
        None => (value.to_string(), String::new()),
    }
}

/// Узел дампа до разбора в типизированный AST
#[derive(Debug)]
struct DumpNode {
    kind: String,
    value: String,
    line: usize,
    children: Vec<DumpNode>,
}

struct DumpLine<'a> {
    depth: usize,
    number: usize,
    content: &'a str,
}

pub fn read_program(text: &str) -> Result<ast::Program, CompileError> {
    let lines: Vec<DumpLine> = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            let content = line.trim_start();
            DumpLine {
                depth: (line.len() - content.len()) / INDENT,
                number: index + 1,
                content,
            }
        })
        .collect();

    let mut position = 0;
    let roots = build_nodes(&lines, &mut position, None);

    let mut functions = Vec::new();
    for node in &roots {
        if node.kind == "FUNCTION_DEFINITION" {
            functions.push(lower_function(node)?);
        } else {
            warn!("line {}: ignoring top-level node {}", node.line, node.kind);
        }
    }

    debug!("read {} functions from AST dump", functions.len());
    Ok(ast::Program { functions })
}

/// Дети узла - все следующие строки с отступом больше, чем у него.
fn build_nodes(lines: &[DumpLine], position: &mut usize, parent_depth: Option<usize>) -> Vec<DumpNode> {
    let mut nodes = Vec::new();

    while let Some(line) = lines.get(*position) {
        if parent_depth.is_some_and(|depth| line.depth <= depth) {
            break;
        }
        *position += 1;

        let (kind, value) = match line.content.split_once(':') {
            Some((kind, value)) => (kind, value.strip_prefix(' ').unwrap_or(value)),
            None => (line.content, ""),
        };
        let children = build_nodes(lines, position, Some(line.depth));

        nodes.push(DumpNode {
            kind: kind.to_string(),
            value: value.to_string(),
            line: line.number,
            children,
        });
    }

    nodes
}

fn lower_function(node: &DumpNode) -> Result<ast::Function, CompileError> {
    let name = child(node, "FUNCTION_NAME")
        .map(|n| n.value.clone())
        .ok_or_else(|| malformed(node, "function without FUNCTION_NAME"))?;
    let return_type = child(node, "RETURN_TYPE")
        .map(|n| n.value.clone())
        .unwrap_or_default();

    let parameters = child(node, "PARAMETERS")
        .map(|params| {
            params
                .children
                .iter()
                .map(|p| {
                    let (name, type_name) = split_typed(&p.value);
                    ast::Parameter { name, type_name }
                })
                .collect()
        })
        .unwrap_or_default();

    let body = child(node, "FUNCTION_BODY")
        .ok_or_else(|| malformed(node, format!("function '{}' without FUNCTION_BODY", name)))?;

    Ok(ast::Function {
        name,
        parameters,
        return_type,
        body: lower_block(&body.children)?,
    })
}

fn lower_block(nodes: &[DumpNode]) -> Result<ast::Block, CompileError> {
    let mut statements = Vec::new();
    for node in nodes {
        if let Some(statement) = lower_statement(node)? {
            statements.push(statement);
        }
    }
    Ok(ast::Block { statements })
}

fn lower_statement(node: &DumpNode) -> Result<Option<ast::Statement>, CompileError> {
    let statement = match node.kind.as_str() {
        "RETURN_STATEMENT" => {
            let value = match child(node, "EXPRESSION") {
                Some(expression) => Some(lower_expression(expression)?),
                None => None,
            };
            ast::Statement::Return { value }
        }
        "ASSIGNMENT_EXPRESSION" => {
            let target = child(node, "IDENTIFIER")
                .ok_or_else(|| malformed(node, "assignment without IDENTIFIER"))?;
            let value = child(node, "EXPRESSION")
                .ok_or_else(|| malformed(node, "assignment without EXPRESSION"))?;
            ast::Statement::Assign {
                target: target.value.clone(),
                value: lower_expression(value)?,
            }
        }
        "FOR_LOOP" => {
            let (variable, mut variable_type) = child(node, "LOOP_VARIABLE")
                .map(|n| split_typed(&n.value))
                .unwrap_or_default();
            if variable_type.is_empty() {
                variable_type = ast::DEFAULT_LOOP_VARIABLE_TYPE.to_string();
            }
            let start = range_bound(node, "RANGE_START")?;
            let end = range_bound(node, "RANGE_END")?;
            let body = child(node, "LOOP_BODY")
                .ok_or_else(|| malformed(node, "for loop without LOOP_BODY"))?;

            ast::Statement::For {
                variable,
                variable_type,
                start,
                end,
                body: lower_block(&body.children)?,
            }
        }
        other => {
            warn!("line {}: skipping unsupported statement node {}", node.line, other);
            return Ok(None);
        }
    };
    Ok(Some(statement))
}

fn range_bound(node: &DumpNode, kind: &str) -> Result<ast::Expression, CompileError> {
    let bound = child(node, kind).ok_or_else(|| malformed(node, format!("for loop without {}", kind)))?;
    // Граница - либо значение прямо в строке, либо дочернее выражение
    match bound.children.first() {
        Some(expression) => lower_expression(expression),
        None if !bound.value.is_empty() => Ok(ast::Expression::Literal(bound.value.clone())),
        None => Err(malformed(bound, format!("empty {}", kind))),
    }
}

fn lower_expression(node: &DumpNode) -> Result<ast::Expression, CompileError> {
    match node.kind.as_str() {
        "EXPRESSION" => match node.children.as_slice() {
            [inner] => lower_expression(inner),
            children => Err(malformed(
                node,
                format!("EXPRESSION must wrap exactly one node, found {}", children.len()),
            )),
        },
        "LITERAL_VALUE" => Ok(ast::Expression::Literal(node.value.clone())),
        "IDENTIFIER" => Ok(ast::Expression::Identifier(node.value.clone())),
        "FUNCTION_CALL" => {
            let arguments = match child(node, "ARGUMENTS") {
                Some(arguments) => arguments
                    .children
                    .iter()
                    .map(lower_expression)
                    .collect::<Result<Vec<_>, _>>()?,
                None => Vec::new(),
            };
            Ok(ast::Expression::Call {
                name: node.value.clone(),
                arguments,
            })
        }
        "OPERATOR" => {
            let [left, right] = node.children.as_slice() else {
                return Err(malformed(
                    node,
                    format!(
                        "operator '{}' has {} operands, expected 2",
                        node.value,
                        node.children.len()
                    ),
                ));
            };
            let op = ast::BinaryOperator::from_symbol(&node.value)
                .ok_or_else(|| malformed(node, format!("unknown operator '{}'", node.value)))?;
            Ok(ast::Expression::BinaryOp {
                left: Box::new(lower_expression(left)?),
                op,
                right: Box::new(lower_expression(right)?),
            })
        }
        other => Err(malformed(node, format!("unexpected expression node {}", other))),
    }
}

fn child<'a>(node: &'a DumpNode, kind: &str) -> Option<&'a DumpNode> {
    node.children.iter().find(|c| c.kind == kind)
}

fn malformed(node: &DumpNode, message: impl Into<String>) -> CompileError {
    CompileError::MalformedAst {
        message: format!("line {}: {}", node.line, message.into()),
    }
}
