//! Semantic diagnostics. Unlike syntax errors, these do not abort the
//! compiler: they are written to a sink and counted, and the parser consults
//! the count to decide whether a function body gets code generated.

use std::fmt;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    Redefinition(String),
    Redeclaration(String),
    ConflictingTypes(String),
    Undeclared(String),
    BreakNotWithinLoop,
    InvalidReturnType,
    ScalarRequired,
    LvalueRequired,
    InvalidBinaryOperands(&'static str),
    InvalidUnaryOperand(&'static str),
    InvalidSizeof,
    InvalidCast,
    NotAFunction,
    InvalidArguments,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Redefinition(name) => write!(f, "redefinition of '{name}'"),
            Self::Redeclaration(name) => write!(f, "redeclaration of '{name}'"),
            Self::ConflictingTypes(name) => write!(f, "conflicting types for '{name}'"),
            Self::Undeclared(name) => write!(f, "'{name}' undeclared"),
            Self::BreakNotWithinLoop => write!(f, "break statement not within loop"),
            Self::InvalidReturnType => write!(f, "invalid return type"),
            Self::ScalarRequired => write!(f, "scalar type required in statement"),
            Self::LvalueRequired => write!(f, "lvalue required in expression"),
            Self::InvalidBinaryOperands(op) => write!(f, "invalid operands to binary {op}"),
            Self::InvalidUnaryOperand(op) => write!(f, "invalid operand to unary {op}"),
            Self::InvalidSizeof => write!(f, "invalid operand in sizeof expression"),
            Self::InvalidCast => write!(f, "invalid operand in cast expression"),
            Self::NotAFunction => write!(f, "called object is not a function"),
            Self::InvalidArguments => write!(f, "invalid arguments to called function"),
        }
    }
}

/// The report sink: renders each diagnostic to the wrapped writer and keeps
/// the running error count.
#[derive(Debug)]
pub struct Reporter<E> {
    sink: E,
    errors: u32,
}

impl<E: Write> Reporter<E> {
    pub fn new(sink: E) -> Self {
        Self { sink, errors: 0 }
    }

    pub fn report(&mut self, diagnostic: &Diagnostic) {
        self.errors += 1;
        let _ = writeln!(self.sink, "{diagnostic}");
    }

    pub fn error_count(&self) -> u32 {
        self.errors
    }
}
