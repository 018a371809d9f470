#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub functions: Vec<Function>,
}

/// fn name(x: Int, v: Vector<Int>) -> Int { ... }
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub parameters: Vec<Parameter>,
    /// Может быть пустым, если `->` не было
    pub return_type: String,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    /// Склеенный текст типа, например `Vector<Int>`; пустой без аннотации
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// return x + 1;
    Return { value: Option<Expression> },
    /// x = 10
    Assign { target: String, value: Expression },
    /// for i in 0 to 10 { ... }
    For {
        variable: String,
        variable_type: String,
        start: Expression,
        end: Expression,
        body: Block,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// 10, 2.5, "text" - хранится как есть, без типа
    Literal(String),
    /// x
    Identifier(String),
    /// f(a, 1)
    Call {
        name: String,
        arguments: Vec<Expression>,
    },
    /// a + b, левоассоциативная цепочка без приоритетов
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,      // +
    Subtract, // -
    Multiply, // *
    Divide,   // /
}

impl BinaryOperator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Self::Add),
            "-" => Some(Self::Subtract),
            "*" => Some(Self::Multiply),
            "/" => Some(Self::Divide),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }
}

/// Тип переменной цикла, когда аннотации нет
pub const DEFAULT_LOOP_VARIABLE_TYPE: &str = "Int";
