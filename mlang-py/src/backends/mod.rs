pub mod python;
pub mod simplify;

use crate::config::CodegenOptions;
use crate::error::CompileError;
use crate::ir::ast;

pub trait Backend {
    fn generate(&mut self, program: &ast::Program) -> Result<String, CompileError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Python,
}

impl BackendType {
    pub fn all() -> Vec<Self> {
        vec![Self::Python]
    }

    pub fn from_name(name: &str) -> Result<Self, CompileError> {
        Self::all()
            .into_iter()
            .find(|b| b.name() == name)
            .ok_or_else(|| CompileError::UnknownTarget {
                name: name.to_string(),
            })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Python => "python",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Python => "Python 3 source with type hints",
        }
    }

    /// Расширение выходного файла по умолчанию
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Python => "py",
        }
    }

    pub fn create(&self, options: &CodegenOptions) -> Box<dyn Backend> {
        match self {
            Self::Python => Box::new(python::PythonBackend::new(options.clone())),
        }
    }
}
