//! Tarn - a bytecode compiler for a small dynamic language
//!
//! # Overview
//!
//! Tarn lowers a dynamically-typed, expression-oriented source language
//! into stack-based bytecode for a separately-shipped virtual machine.
//! This crate is the compiler front-half: the instruction assembler and
//! disassembler, the lexical symbol resolver (with automatic free-variable
//! capture for closures), and the tree-walking code generator.
//!
//! The lexer and parser are external collaborators: they hand over an
//! arena-allocated AST ([`ast`]), and the compiler hands back a
//! [`Bytecode`] artifact - a flat instruction stream plus a constant pool.
//!
//! # Quick Start
//!
//! ```
//! use bumpalo::Bump;
//! use tarn::ast::{Expr, Literal, Program, Stmt};
//! use tarn::compiler::Compiler;
//!
//! // The AST for `1 + 2;`, allocated the way the parser delivers it.
//! let arena = Bump::new();
//! let one = arena.alloc(Expr::Literal(Literal::Int(1)));
//! let two = arena.alloc(Expr::Literal(Literal::Int(2)));
//! let sum = arena.alloc(Expr::Binary { op: "+", left: one, right: two });
//! let program = Program {
//!     statements: arena.alloc_slice_copy(&[Stmt::Expression(sum)]),
//! };
//!
//! let mut compiler = Compiler::new();
//! compiler.compile(&program).unwrap();
//! let bytecode = compiler.finalize();
//!
//! assert_eq!(
//!     bytecode.instructions.to_string(),
//!     "[0000] Constant 0\n\
//!      [0003] Constant 1\n\
//!      [0006] Add\n\
//!      [0007] Pop\n",
//! );
//! ```
//!
//! # Errors
//!
//! Compilation fails fast with a [`CompileError`]; the messages are plain
//! sentences with stable prefixes (`unknown operator: ...`,
//! `undefined variable ...`). A compiler instance that returned an error
//! must be discarded - construct a fresh one per program.

// Re-export the public API from tarn-core
pub use tarn_core::ast;
pub use tarn_core::compiler::{self, CompileError, Compiler, Symbol, SymbolScope, SymbolTable};
pub use tarn_core::vm::{
    self, Bytecode, CompiledFunction, Constant, Definition, Instructions, Op, UnknownOpcode,
};
