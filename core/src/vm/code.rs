//! Compiled program artifacts handed to the VM.

use core::fmt;

use crate::{String, Vec};
use crate::vm::Instructions;

/// Compile-time-known values, addressed from the instruction stream by
/// constant pool index.
///
/// Booleans and null have dedicated opcodes and are never pooled. The pool
/// is append-only: interning the same value twice yields two entries, so an
/// index stays valid for the lifetime of the compilation that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i64),
    Str(String),
    Function(CompiledFunction),
}

/// A sealed function body: its instruction bytes plus the frame layout the
/// VM needs to call it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFunction {
    pub instructions: Instructions,

    /// Number of frame slots, parameters included.
    pub num_locals: usize,

    /// Parameters occupy the first `num_parameters` slots in declaration
    /// order.
    pub num_parameters: usize,
}

/// The complete output of one compilation: the root instruction stream and
/// the constant pool. Nested function bodies are reachable only through
/// [`Constant::Function`] entries.
#[derive(Clone, PartialEq)]
pub struct Bytecode {
    pub instructions: Instructions,
    pub constants: Vec<Constant>,
}

impl fmt::Debug for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bytecode {{")?;

        if self.constants.is_empty() {
            writeln!(f, "  constants: []")?;
        } else {
            writeln!(f, "  constants: [")?;
            for (i, constant) in self.constants.iter().enumerate() {
                match constant {
                    Constant::Function(function) => {
                        writeln!(
                            f,
                            "    [{}] = Function(locals={}, params={})",
                            i, function.num_locals, function.num_parameters
                        )?;
                        for line in
                            alloc::format!("{}", function.instructions).lines()
                        {
                            writeln!(f, "      {}", line)?;
                        }
                    }
                    other => writeln!(f, "    [{}] = {:?}", i, other)?,
                }
            }
            writeln!(f, "  ]")?;
        }

        writeln!(f, "  instructions:")?;
        for line in alloc::format!("{}", self.instructions).lines() {
            writeln!(f, "    {}", line)?;
        }

        write!(f, "}}")
    }
}
