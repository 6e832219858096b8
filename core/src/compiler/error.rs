//! Compilation errors.
//!
//! The compiler fails fast: the first error aborts the run and the
//! compiler instance must be discarded (the scope stack may be mid-push).
//! Messages are plain sentences without source positions; their prefixes
//! are stable and callers may match on them.

use core::fmt;

use crate::String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// An infix operator outside the accepted set.
    UnknownOperator(String),
    /// An identifier or assignment target that no enclosing scope binds.
    UndefinedVariable(String),
    /// A `return` statement outside any function body.
    ReturnInRootScope,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UnknownOperator(op) => write!(f, "unknown operator: {}", op),
            CompileError::UndefinedVariable(name) => write!(f, "undefined variable {}", name),
            CompileError::ReturnInRootScope => {
                write!(f, "cannot have return statement in root scope")
            }
        }
    }
}
